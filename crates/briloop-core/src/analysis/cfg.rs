//! Successor and predecessor maps for a function's CFG.

use std::collections::BTreeSet;

use crate::entity::{EntityRef, PrimaryMap};
use crate::error::CoreError;
use crate::ir::{BlockId, Function, Terminator};

/// The control-flow graph of one function.
///
/// Successor sets are deduplicated (a `br` with both targets equal
/// contributes one edge). A `ret` block has no successors; a block without a
/// terminator falls through to `bid + 1`, or returns if it is the last
/// block.
pub struct Cfg {
    succs: PrimaryMap<BlockId, Vec<BlockId>>,
    preds: PrimaryMap<BlockId, Vec<BlockId>>,
}

impl Cfg {
    pub fn compute(func: &Function) -> Result<Cfg, CoreError> {
        let n = func.blocks.len();
        let check = |target: BlockId, bid: BlockId| -> Result<BlockId, CoreError> {
            if target.index() < n {
                Ok(target)
            } else {
                Err(CoreError::MalformedCfg {
                    function: func.name.clone(),
                    detail: format!("block {bid} branches to nonexistent block {target}"),
                })
            }
        };

        let mut succs: PrimaryMap<BlockId, Vec<BlockId>> = PrimaryMap::with_capacity(n);
        for (bid, block) in func.blocks.iter() {
            let mut out = BTreeSet::new();
            match &block.term {
                Some(Terminator::Jmp { target }) => {
                    out.insert(check(*target, bid)?);
                }
                Some(Terminator::Br {
                    then_target,
                    else_target,
                    ..
                }) => {
                    out.insert(check(*then_target, bid)?);
                    out.insert(check(*else_target, bid)?);
                }
                Some(Terminator::Ret { .. }) => {}
                None => {
                    // Fallthrough; the last block implicitly returns.
                    if bid.index() + 1 < n {
                        out.insert(BlockId::new(bid.index() + 1));
                    }
                }
            }
            succs.push(out.into_iter().collect());
        }

        let mut preds: PrimaryMap<BlockId, Vec<BlockId>> =
            (0..n).map(|_| Vec::new()).collect();
        for (bid, targets) in succs.iter() {
            for &target in targets {
                preds[target].push(bid);
            }
        }

        Ok(Cfg { succs, preds })
    }

    pub fn num_blocks(&self) -> usize {
        self.succs.len()
    }

    pub fn succs(&self, block: BlockId) -> &[BlockId] {
        &self.succs[block]
    }

    pub fn preds(&self, block: BlockId) -> &[BlockId] {
        &self.preds[block]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::FunctionBuilder;

    #[test]
    fn branch_and_fallthrough_edges() {
        // b0: br c b1 b2 / b1: jmp b3 / b2: (fallthrough) / b3: ret
        let mut fb = FunctionBuilder::new("f", vec![], None);
        let b1 = fb.create_block();
        let b2 = fb.create_block();
        let b3 = fb.create_block();
        fb.br("c", b1, b2);
        fb.switch_to_block(b1);
        fb.jmp(b3);
        fb.switch_to_block(b3);
        fb.ret(None);
        let func = fb.build();

        let cfg = Cfg::compute(&func).unwrap();
        assert_eq!(cfg.succs(func.entry), &[b1, b2]);
        assert_eq!(cfg.succs(b1), &[b3]);
        assert_eq!(cfg.succs(b2), &[b3]); // fallthrough
        assert!(cfg.succs(b3).is_empty());
        assert_eq!(cfg.preds(b3), &[b1, b2]);
    }

    #[test]
    fn duplicate_branch_targets_deduplicated() {
        let mut fb = FunctionBuilder::new("f", vec![], None);
        let b1 = fb.create_block();
        fb.br("c", b1, b1);
        fb.switch_to_block(b1);
        fb.ret(None);
        let func = fb.build();

        let cfg = Cfg::compute(&func).unwrap();
        assert_eq!(cfg.succs(func.entry), &[b1]);
        assert_eq!(cfg.preds(b1).len(), 1);
    }

    #[test]
    fn last_block_without_terminator_has_no_successors() {
        let mut fb = FunctionBuilder::new("f", vec![], None);
        fb.const_int("x", 1);
        let func = fb.build();

        let cfg = Cfg::compute(&func).unwrap();
        assert!(cfg.succs(func.entry).is_empty());
    }

    #[test]
    fn out_of_range_target_is_malformed() {
        use crate::entity::EntityRef;
        use crate::ir::{Block, Terminator};

        let mut fb = FunctionBuilder::new("f", vec![], None);
        fb.ret(None);
        let mut func = fb.build();
        func.blocks[func.entry] = Block {
            label: None,
            insts: vec![],
            term: Some(Terminator::Jmp {
                target: BlockId::new(7),
            }),
        };

        assert!(matches!(
            Cfg::compute(&func),
            Err(CoreError::MalformedCfg { .. })
        ));
    }
}
