use std::fmt;

use serde::{Deserialize, Serialize};

use crate::define_entity;

use super::inst::Inst;

define_entity!(BlockId, "b");

/// The control-flow instruction ending a basic block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Terminator {
    /// Unconditional jump.
    Jmp { target: BlockId },
    /// Two-way conditional branch on a bool variable.
    Br {
        cond: String,
        then_target: BlockId,
        else_target: BlockId,
    },
    /// Return, with an optional value variable.
    Ret { value: Option<String> },
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Jmp { target } => write!(f, "jmp {target}"),
            Terminator::Br {
                cond,
                then_target,
                else_target,
            } => write!(f, "br {cond} {then_target} {else_target}"),
            Terminator::Ret { value: Some(v) } => write!(f, "ret {v}"),
            Terminator::Ret { value: None } => write!(f, "ret"),
        }
    }
}

/// A basic block: straight-line instructions plus an optional terminator.
///
/// `term: None` means the block falls through to the syntactically next
/// block (`bid + 1`), or returns if it is the last block of the function.
/// Blocks are immutable once the function is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Source label, if the block had one.
    pub label: Option<String>,
    pub insts: Vec<Inst>,
    pub term: Option<Terminator>,
}

impl Block {
    pub fn new(label: Option<String>) -> Self {
        Self {
            label,
            insts: Vec::new(),
            term: None,
        }
    }
}
