//! Reference interpreters for both program forms.
//!
//! Used by the test suite to check semantic preservation: running the flat
//! block-based form and the reconstructed structured form on the same inputs
//! must produce the same return value and the same print order. Execution is
//! fuel-limited so a miscompiled loop fails the test instead of hanging it.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::entity::EntityRef;
use crate::ir::{
    BlockId, Constant, EffectOp, Function, Inst, Module, Stmt, StructuredFunction,
    StructuredModule, Terminator, ValueOp,
};

const DEFAULT_FUEL: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Float(f64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
        }
    }
}

/// Observable result of running a function: return value plus print output.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub ret: Option<Value>,
    pub prints: Vec<String>,
}

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("undefined variable `{0}`")]
    UndefinedVariable(String),
    #[error("wrong argument count for `{0}`")]
    ArityMismatch(String),
    #[error("type error in `{0}`")]
    TypeError(&'static str),
    #[error("division by zero")]
    DivisionByZero,
    #[error("fuel exhausted (non-terminating program?)")]
    FuelExhausted,
    #[error("control escaped the function: {0}")]
    ControlEscape(String),
}

type Env = HashMap<String, Value>;

fn lookup(env: &Env, name: &str) -> Result<Value, EvalError> {
    env.get(name)
        .copied()
        .ok_or_else(|| EvalError::UndefinedVariable(name.to_string()))
}

fn as_bool(value: Value) -> Result<bool, EvalError> {
    match value {
        Value::Bool(b) => Ok(b),
        _ => Err(EvalError::TypeError("branch condition")),
    }
}

fn eval_value_op(op: ValueOp, args: &[Value]) -> Result<Value, EvalError> {
    use Value::{Bool, Float, Int};

    let binary = |name| -> Result<(Value, Value), EvalError> {
        match args {
            [a, b] => Ok((*a, *b)),
            _ => Err(EvalError::TypeError(name)),
        }
    };

    match op {
        ValueOp::Add | ValueOp::Sub | ValueOp::Mul | ValueOp::Div => {
            let (a, b) = binary("arithmetic")?;
            match (a, b) {
                (Int(x), Int(y)) => {
                    if op == ValueOp::Div {
                        if y == 0 {
                            return Err(EvalError::DivisionByZero);
                        }
                        Ok(Int(x / y))
                    } else {
                        Ok(Int(match op {
                            ValueOp::Add => x.wrapping_add(y),
                            ValueOp::Sub => x.wrapping_sub(y),
                            _ => x.wrapping_mul(y),
                        }))
                    }
                }
                (Float(x), Float(y)) => Ok(Float(match op {
                    ValueOp::Add => x + y,
                    ValueOp::Sub => x - y,
                    ValueOp::Mul => x * y,
                    _ => x / y,
                })),
                _ => Err(EvalError::TypeError("arithmetic")),
            }
        }
        ValueOp::Eq | ValueOp::Lt | ValueOp::Gt | ValueOp::Le | ValueOp::Ge => {
            let (a, b) = binary("comparison")?;
            let result = match (a, b) {
                (Int(x), Int(y)) => match op {
                    ValueOp::Eq => x == y,
                    ValueOp::Lt => x < y,
                    ValueOp::Gt => x > y,
                    ValueOp::Le => x <= y,
                    _ => x >= y,
                },
                (Float(x), Float(y)) => match op {
                    ValueOp::Eq => x == y,
                    ValueOp::Lt => x < y,
                    ValueOp::Gt => x > y,
                    ValueOp::Le => x <= y,
                    _ => x >= y,
                },
                _ => return Err(EvalError::TypeError("comparison")),
            };
            Ok(Bool(result))
        }
        ValueOp::Not => match args {
            [Bool(b)] => Ok(Bool(!b)),
            _ => Err(EvalError::TypeError("not")),
        },
        ValueOp::And | ValueOp::Or => {
            let (a, b) = binary("logic")?;
            match (a, b) {
                (Bool(x), Bool(y)) => Ok(Bool(if op == ValueOp::And { x && y } else { x || y })),
                _ => Err(EvalError::TypeError("logic")),
            }
        }
        ValueOp::Id => match args {
            [v] => Ok(*v),
            _ => Err(EvalError::TypeError("id")),
        },
        // Calls are dispatched by the machines, not here.
        ValueOp::Call => Err(EvalError::TypeError("call")),
    }
}

fn constant_value(constant: &Constant) -> Value {
    match constant {
        Constant::Int(v) => Value::Int(*v),
        Constant::Bool(v) => Value::Bool(*v),
        Constant::Float(v) => Value::Float(*v),
    }
}

// -----------------------------------------------------------------------
// Flat form
// -----------------------------------------------------------------------

/// Runs `name` in the flat block-based module with a default fuel budget.
pub fn run_function(module: &Module, name: &str, args: &[Value]) -> Result<Outcome, EvalError> {
    run_function_with_fuel(module, name, args, DEFAULT_FUEL)
}

pub fn run_function_with_fuel(
    module: &Module,
    name: &str,
    args: &[Value],
    fuel: u64,
) -> Result<Outcome, EvalError> {
    let mut machine = FlatMachine {
        module,
        fuel,
        prints: Vec::new(),
    };
    let ret = machine.call(name, args)?;
    Ok(Outcome {
        ret,
        prints: machine.prints,
    })
}

struct FlatMachine<'a> {
    module: &'a Module,
    fuel: u64,
    prints: Vec<String>,
}

impl FlatMachine<'_> {
    fn burn(&mut self) -> Result<(), EvalError> {
        if self.fuel == 0 {
            return Err(EvalError::FuelExhausted);
        }
        self.fuel -= 1;
        Ok(())
    }

    fn call(&mut self, name: &str, args: &[Value]) -> Result<Option<Value>, EvalError> {
        let func = self
            .module
            .function_by_name(name)
            .ok_or_else(|| EvalError::UnknownFunction(name.to_string()))?;
        if func.params.len() != args.len() {
            return Err(EvalError::ArityMismatch(name.to_string()));
        }
        let mut env: Env = func
            .params
            .iter()
            .zip(args)
            .map(|(p, v)| (p.name.clone(), *v))
            .collect();
        self.run_blocks(func, &mut env)
    }

    fn run_blocks(
        &mut self,
        func: &Function,
        env: &mut Env,
    ) -> Result<Option<Value>, EvalError> {
        let mut bid = func.entry;
        loop {
            self.burn()?;
            let block = &func.blocks[bid];
            for inst in &block.insts {
                self.exec_inst(inst, env)?;
            }
            match &block.term {
                Some(Terminator::Jmp { target }) => bid = *target,
                Some(Terminator::Br {
                    cond,
                    then_target,
                    else_target,
                }) => {
                    bid = if as_bool(lookup(env, cond)?)? {
                        *then_target
                    } else {
                        *else_target
                    };
                }
                Some(Terminator::Ret { value }) => {
                    return value
                        .as_ref()
                        .map(|v| lookup(env, v))
                        .transpose();
                }
                None => {
                    let next = bid.index() + 1;
                    if next < func.blocks.len() {
                        bid = BlockId::new(next);
                    } else {
                        return Ok(None);
                    }
                }
            }
        }
    }

    fn exec_inst(&mut self, inst: &Inst, env: &mut Env) -> Result<(), EvalError> {
        match inst {
            Inst::Const { dest, value, .. } => {
                env.insert(dest.clone(), constant_value(value));
            }
            Inst::Value {
                op: ValueOp::Call,
                dest,
                args,
                funcs,
                ..
            } => {
                let callee = funcs
                    .first()
                    .ok_or(EvalError::TypeError("call without callee"))?;
                let arg_values = resolve_args(env, args)?;
                let ret = self.call(callee, &arg_values)?;
                let ret = ret.ok_or(EvalError::TypeError("void call used as value"))?;
                env.insert(dest.clone(), ret);
            }
            Inst::Value {
                op, dest, args, ..
            } => {
                let arg_values = resolve_args(env, args)?;
                env.insert(dest.clone(), eval_value_op(*op, &arg_values)?);
            }
            Inst::Effect { op, args, funcs } => match op {
                EffectOp::Print => {
                    let line = resolve_args(env, args)?
                        .iter()
                        .map(Value::to_string)
                        .collect::<Vec<_>>()
                        .join(" ");
                    self.prints.push(line);
                }
                EffectOp::Call => {
                    let callee = funcs
                        .first()
                        .ok_or(EvalError::TypeError("call without callee"))?;
                    let arg_values = resolve_args(env, args)?;
                    self.call(callee, &arg_values)?;
                }
                EffectOp::Nop => {}
            },
        }
        Ok(())
    }
}

fn resolve_args(env: &Env, args: &[String]) -> Result<Vec<Value>, EvalError> {
    args.iter().map(|a| lookup(env, a)).collect()
}

// -----------------------------------------------------------------------
// Structured form
// -----------------------------------------------------------------------

/// Runs `name` in a structured module with a default fuel budget.
pub fn run_structured(
    module: &StructuredModule,
    name: &str,
    args: &[Value],
) -> Result<Outcome, EvalError> {
    run_structured_with_fuel(module, name, args, DEFAULT_FUEL)
}

pub fn run_structured_with_fuel(
    module: &StructuredModule,
    name: &str,
    args: &[Value],
    fuel: u64,
) -> Result<Outcome, EvalError> {
    let mut machine = StructMachine {
        module,
        fuel,
        prints: Vec::new(),
    };
    let ret = machine.call(name, args)?;
    Ok(Outcome {
        ret,
        prints: machine.prints,
    })
}

/// The control-flow signal threaded out of a statement sequence.
enum Flow {
    Normal,
    Break(usize),
    Continue(usize),
    Return(Option<Value>),
}

struct StructMachine<'a> {
    module: &'a StructuredModule,
    fuel: u64,
    prints: Vec<String>,
}

impl StructMachine<'_> {
    fn burn(&mut self) -> Result<(), EvalError> {
        if self.fuel == 0 {
            return Err(EvalError::FuelExhausted);
        }
        self.fuel -= 1;
        Ok(())
    }

    fn call(&mut self, name: &str, args: &[Value]) -> Result<Option<Value>, EvalError> {
        let func: &StructuredFunction = self
            .module
            .function_by_name(name)
            .ok_or_else(|| EvalError::UnknownFunction(name.to_string()))?;
        if func.params.len() != args.len() {
            return Err(EvalError::ArityMismatch(name.to_string()));
        }
        let mut env: Env = func
            .params
            .iter()
            .zip(args)
            .map(|(p, v)| (p.name.clone(), *v))
            .collect();
        match self.exec_seq(&func.body, &mut env)? {
            Flow::Normal => Ok(None),
            Flow::Return(value) => Ok(value),
            Flow::Break(_) | Flow::Continue(_) => Err(EvalError::ControlEscape(
                "break/continue escaped the function body".to_string(),
            )),
        }
    }

    fn exec_seq(&mut self, stmts: &[Stmt], env: &mut Env) -> Result<Flow, EvalError> {
        for stmt in stmts {
            self.burn()?;
            match stmt {
                Stmt::Op(inst) => self.exec_inst(inst, env)?,
                Stmt::Ret { value } => {
                    let value = value.as_ref().map(|v| lookup(env, v)).transpose()?;
                    return Ok(Flow::Return(value));
                }
                Stmt::Break { depth } => return Ok(Flow::Break(*depth)),
                Stmt::Continue { depth } => return Ok(Flow::Continue(*depth)),
                Stmt::If {
                    cond,
                    then_body,
                    else_body,
                } => {
                    let arm = if as_bool(lookup(env, cond)?)? {
                        then_body
                    } else {
                        else_body
                    };
                    // An if arm counts as one construct for depth indices.
                    match self.exec_seq(arm, env)? {
                        Flow::Normal => {}
                        Flow::Break(0) => {}
                        Flow::Break(d) => return Ok(Flow::Break(d - 1)),
                        Flow::Continue(0) => {
                            return Err(EvalError::ControlEscape(
                                "continue targeting an if arm".to_string(),
                            ));
                        }
                        Flow::Continue(d) => return Ok(Flow::Continue(d - 1)),
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Stmt::Block { body } => match self.exec_seq(body, env)? {
                    Flow::Normal | Flow::Break(0) => {}
                    Flow::Break(d) => return Ok(Flow::Break(d - 1)),
                    Flow::Continue(0) => {
                        return Err(EvalError::ControlEscape(
                            "continue targeting a block".to_string(),
                        ));
                    }
                    Flow::Continue(d) => return Ok(Flow::Continue(d - 1)),
                    flow @ Flow::Return(_) => return Ok(flow),
                },
                Stmt::Loop { body } => loop {
                    self.burn()?;
                    match self.exec_seq(body, env)? {
                        Flow::Normal | Flow::Continue(0) => continue,
                        Flow::Break(0) => break,
                        Flow::Break(d) => return Ok(Flow::Break(d - 1)),
                        Flow::Continue(d) => return Ok(Flow::Continue(d - 1)),
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                },
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_inst(&mut self, inst: &Inst, env: &mut Env) -> Result<(), EvalError> {
        match inst {
            Inst::Const { dest, value, .. } => {
                env.insert(dest.clone(), constant_value(value));
            }
            Inst::Value {
                op: ValueOp::Call,
                dest,
                args,
                funcs,
                ..
            } => {
                let callee = funcs
                    .first()
                    .ok_or(EvalError::TypeError("call without callee"))?;
                let arg_values = resolve_args(env, args)?;
                let ret = self.call(callee, &arg_values)?;
                let ret = ret.ok_or(EvalError::TypeError("void call used as value"))?;
                env.insert(dest.clone(), ret);
            }
            Inst::Value {
                op, dest, args, ..
            } => {
                let arg_values = resolve_args(env, args)?;
                env.insert(dest.clone(), eval_value_op(*op, &arg_values)?);
            }
            Inst::Effect { op, args, funcs } => match op {
                EffectOp::Print => {
                    let line = resolve_args(env, args)?
                        .iter()
                        .map(Value::to_string)
                        .collect::<Vec<_>>()
                        .join(" ");
                    self.prints.push(line);
                }
                EffectOp::Call => {
                    let callee = funcs
                        .first()
                        .ok_or(EvalError::TypeError("call without callee"))?;
                    let arg_values = resolve_args(env, args)?;
                    self.call(callee, &arg_values)?;
                }
                EffectOp::Nop => {}
            },
        }
        Ok(())
    }
}
