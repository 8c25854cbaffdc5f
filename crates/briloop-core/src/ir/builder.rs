//! Block-at-a-time function construction.
//!
//! Used by the Bril frontend and pervasively by tests to assemble CFGs
//! without going through JSON.

use crate::entity::{EntityRef, PrimaryMap};

use super::block::{Block, BlockId, Terminator};
use super::func::{Function, Param};
use super::inst::{Constant, EffectOp, Inst, Type, ValueOp};

pub struct FunctionBuilder {
    name: String,
    params: Vec<Param>,
    return_ty: Option<Type>,
    blocks: PrimaryMap<BlockId, Block>,
    current: BlockId,
}

impl FunctionBuilder {
    /// Creates a builder with the entry block (`b0`) already current.
    pub fn new(name: &str, params: Vec<Param>, return_ty: Option<Type>) -> Self {
        let mut blocks = PrimaryMap::new();
        let entry = blocks.push(Block::new(None));
        Self {
            name: name.to_string(),
            params,
            return_ty,
            blocks,
            current: entry,
        }
    }

    /// Appends a new empty block (without switching to it).
    pub fn create_block(&mut self) -> BlockId {
        self.blocks.push(Block::new(None))
    }

    pub fn create_labeled_block(&mut self, label: &str) -> BlockId {
        self.blocks.push(Block::new(Some(label.to_string())))
    }

    pub fn switch_to_block(&mut self, block: BlockId) {
        assert!(self.blocks.contains_key(block), "no such block: {block}");
        self.current = block;
    }

    pub fn current_block(&self) -> BlockId {
        self.current
    }

    pub fn push(&mut self, inst: Inst) {
        let block = &mut self.blocks[self.current];
        debug_assert!(block.term.is_none(), "instruction after terminator");
        block.insts.push(inst);
    }

    pub fn const_int(&mut self, dest: &str, value: i64) {
        self.push(Inst::Const {
            dest: dest.to_string(),
            ty: Type::Int,
            value: Constant::Int(value),
        });
    }

    pub fn const_bool(&mut self, dest: &str, value: bool) {
        self.push(Inst::Const {
            dest: dest.to_string(),
            ty: Type::Bool,
            value: Constant::Bool(value),
        });
    }

    pub fn value_op(&mut self, op: ValueOp, dest: &str, ty: Type, args: &[&str]) {
        self.push(Inst::Value {
            op,
            dest: dest.to_string(),
            ty,
            args: args.iter().map(|a| a.to_string()).collect(),
            funcs: Vec::new(),
        });
    }

    pub fn call_value(&mut self, dest: &str, ty: Type, func: &str, args: &[&str]) {
        self.push(Inst::Value {
            op: ValueOp::Call,
            dest: dest.to_string(),
            ty,
            args: args.iter().map(|a| a.to_string()).collect(),
            funcs: vec![func.to_string()],
        });
    }

    pub fn print(&mut self, args: &[&str]) {
        self.push(Inst::Effect {
            op: EffectOp::Print,
            args: args.iter().map(|a| a.to_string()).collect(),
            funcs: Vec::new(),
        });
    }

    pub fn nop(&mut self) {
        self.push(Inst::Effect {
            op: EffectOp::Nop,
            args: Vec::new(),
            funcs: Vec::new(),
        });
    }

    fn terminate(&mut self, term: Terminator) {
        let block = &mut self.blocks[self.current];
        debug_assert!(block.term.is_none(), "block already terminated");
        block.term = Some(term);
    }

    pub fn jmp(&mut self, target: BlockId) {
        self.terminate(Terminator::Jmp { target });
    }

    pub fn br(&mut self, cond: &str, then_target: BlockId, else_target: BlockId) {
        self.terminate(Terminator::Br {
            cond: cond.to_string(),
            then_target,
            else_target,
        });
    }

    pub fn ret(&mut self, value: Option<&str>) {
        self.terminate(Terminator::Ret {
            value: value.map(|v| v.to_string()),
        });
    }

    pub fn build(self) -> Function {
        Function {
            name: self.name,
            params: self.params,
            return_ty: self.return_ty,
            blocks: self.blocks,
            entry: BlockId::new(0),
        }
    }
}

// Convenient in tests: `FunctionBuilder::new("f", params(&[("x", Type::Int)]), None)`.
pub fn params(pairs: &[(&str, Type)]) -> Vec<Param> {
    pairs
        .iter()
        .map(|(name, ty)| Param {
            name: name.to_string(),
            ty: *ty,
        })
        .collect()
}
