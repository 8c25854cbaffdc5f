//! The structured statement tree produced by reconstruction.
//!
//! This form has no labels and no jump targets: the only control-transfer
//! primitives are the loop/if/block nesting itself plus `break`/`continue`
//! counted by relative nesting depth.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

use super::func::Param;
use super::inst::{Inst, Type};

/// A structured statement.
///
/// `depth` indices count *every* enclosing construct (each `Loop`, each
/// `Block`, and each arm of an `If`), with 0 the innermost. A `Continue`
/// must resolve to a `Loop`; a `Break` to a `Loop` or a `Block`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// A straight-line instruction copied from a basic block.
    Op(Inst),
    /// `if cond { then_body } else { else_body }`
    If {
        cond: String,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
    /// `while true { body }`; exits only through `Break`.
    Loop { body: Vec<Stmt> },
    /// A nameless block, used purely as a `Break` target.
    Block { body: Vec<Stmt> },
    Break { depth: usize },
    Continue { depth: usize },
    Ret { value: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredFunction {
    pub name: String,
    pub params: Vec<Param>,
    pub return_ty: Option<Type>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuredModule {
    pub functions: Vec<StructuredFunction>,
}

impl StructuredModule {
    pub fn function_by_name(&self, name: &str) -> Option<&StructuredFunction> {
        self.functions.iter().find(|f| f.name == name)
    }
}

/// What a statement position is nested inside, for `verify`'s stack walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Construct {
    Loop,
    Block,
    IfArm,
}

/// Checks the structural soundness of a function: every `Break` and
/// `Continue` index must refer to an enclosing construct that exists at that
/// point and is a legal target.
pub fn verify(func: &StructuredFunction) -> Result<(), CoreError> {
    let mut stack = Vec::new();
    verify_seq(&func.body, &mut stack, &func.name)
}

fn verify_seq(
    stmts: &[Stmt],
    stack: &mut Vec<Construct>,
    function: &str,
) -> Result<(), CoreError> {
    for stmt in stmts {
        match stmt {
            Stmt::Op(_) | Stmt::Ret { .. } => {}
            Stmt::If {
                then_body,
                else_body,
                ..
            } => {
                stack.push(Construct::IfArm);
                let result = verify_seq(then_body, stack, function)
                    .and_then(|()| verify_seq(else_body, stack, function));
                stack.pop();
                result?;
            }
            Stmt::Loop { body } => {
                stack.push(Construct::Loop);
                let result = verify_seq(body, stack, function);
                stack.pop();
                result?;
            }
            Stmt::Block { body } => {
                stack.push(Construct::Block);
                let result = verify_seq(body, stack, function);
                stack.pop();
                result?;
            }
            Stmt::Break { depth } => match enclosing(stack, *depth) {
                Some(Construct::Loop) | Some(Construct::Block) => {}
                other => {
                    return Err(CoreError::InternalInvariant {
                        function: function.to_string(),
                        detail: format!("break {depth} resolves to {other:?}"),
                    });
                }
            },
            Stmt::Continue { depth } => match enclosing(stack, *depth) {
                Some(Construct::Loop) => {}
                other => {
                    return Err(CoreError::InternalInvariant {
                        function: function.to_string(),
                        detail: format!("continue {depth} resolves to {other:?}"),
                    });
                }
            },
        }
    }
    Ok(())
}

fn enclosing(stack: &[Construct], depth: usize) -> Option<Construct> {
    if depth < stack.len() {
        Some(stack[stack.len() - 1 - depth])
    } else {
        None
    }
}
