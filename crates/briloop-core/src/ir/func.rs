use std::fmt;

use serde::{Deserialize, Serialize};

use crate::define_entity;
use crate::entity::PrimaryMap;

use super::block::{Block, BlockId};
use super::inst::Type;

define_entity!(FuncId, "fn");

/// A typed function parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Type,
}

/// A function in the block-based IR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Param>,
    pub return_ty: Option<Type>,
    pub blocks: PrimaryMap<BlockId, Block>,
    /// Entry block; always the first block.
    pub entry: BlockId,
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", param.name, param.ty)?;
        }
        write!(f, ")")?;
        if let Some(ty) = self.return_ty {
            write!(f, ": {ty}")?;
        }
        writeln!(f, " {{")?;
        for (bid, block) in self.blocks.iter() {
            match &block.label {
                Some(label) => writeln!(f, "  {bid} (.{label}):")?,
                None => writeln!(f, "  {bid}:")?,
            }
            for inst in &block.insts {
                writeln!(f, "    {inst}")?;
            }
            if let Some(term) = &block.term {
                writeln!(f, "    {term}")?;
            }
        }
        write!(f, "}}")
    }
}
