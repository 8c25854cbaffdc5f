use std::fmt;

use serde::{Deserialize, Serialize};

/// A Bril value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    Int,
    Bool,
    Float,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Bool => write!(f, "bool"),
            Type::Float => write!(f, "float"),
        }
    }
}

/// A literal constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Constant {
    Int(i64),
    Bool(bool),
    Float(f64),
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(v) => write!(f, "{v}"),
            Constant::Bool(v) => write!(f, "{v}"),
            Constant::Float(v) => write!(f, "{v}"),
        }
    }
}

/// Opcodes that produce a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Lt,
    Gt,
    Le,
    Ge,
    Not,
    And,
    Or,
    Id,
    Call,
}

impl ValueOp {
    pub fn name(self) -> &'static str {
        match self {
            ValueOp::Add => "add",
            ValueOp::Sub => "sub",
            ValueOp::Mul => "mul",
            ValueOp::Div => "div",
            ValueOp::Eq => "eq",
            ValueOp::Lt => "lt",
            ValueOp::Gt => "gt",
            ValueOp::Le => "le",
            ValueOp::Ge => "ge",
            ValueOp::Not => "not",
            ValueOp::And => "and",
            ValueOp::Or => "or",
            ValueOp::Id => "id",
            ValueOp::Call => "call",
        }
    }
}

/// Opcodes executed only for their side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectOp {
    Print,
    Call,
    Nop,
}

impl EffectOp {
    pub fn name(self) -> &'static str {
        match self {
            EffectOp::Print => "print",
            EffectOp::Call => "call",
            EffectOp::Nop => "nop",
        }
    }
}

/// A non-terminator instruction. Variables are referenced by name; the input
/// language is not in SSA form and the reconstruction does not need it to be.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Inst {
    Const {
        dest: String,
        ty: Type,
        value: Constant,
    },
    Value {
        op: ValueOp,
        dest: String,
        ty: Type,
        args: Vec<String>,
        funcs: Vec<String>,
    },
    Effect {
        op: EffectOp,
        args: Vec<String>,
        funcs: Vec<String>,
    },
}

impl Inst {
    /// True for instructions with no semantic effect; these are dropped when
    /// block bodies are copied into structured output.
    pub fn is_nop(&self) -> bool {
        matches!(
            self,
            Inst::Effect {
                op: EffectOp::Nop,
                ..
            }
        )
    }
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inst::Const { dest, ty, value } => write!(f, "{dest}: {ty} = const {value}"),
            Inst::Value {
                op,
                dest,
                ty,
                args,
                funcs,
            } => {
                write!(f, "{dest}: {ty} = {}", op.name())?;
                for func in funcs {
                    write!(f, " @{func}")?;
                }
                for arg in args {
                    write!(f, " {arg}")?;
                }
                Ok(())
            }
            Inst::Effect { op, args, funcs } => {
                write!(f, "{}", op.name())?;
                for func in funcs {
                    write!(f, " @{func}")?;
                }
                for arg in args {
                    write!(f, " {arg}")?;
                }
                Ok(())
            }
        }
    }
}
