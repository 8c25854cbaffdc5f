//! Reverse-postorder numbering and the edge/node classification built on it.
//!
//! An edge `u -> v` is *backward* iff `rank(v) < rank(u)`; otherwise it is
//! forward. A *merge node* has two or more forward predecessors; a *loop
//! header* has at least one backward predecessor.

use std::collections::VecDeque;

use crate::entity::EntityRef;
use crate::ir::BlockId;

use super::cfg::Cfg;

/// Reverse-postorder ranks for the blocks reachable from the entry.
///
/// Ranks are a bijection onto `0..n` over reachable blocks, with the entry
/// at rank 0. Unreachable blocks have no rank.
pub struct Rpo {
    ranks: Vec<Option<usize>>,
    order: Vec<BlockId>,
}

impl Rpo {
    /// Iterative DFS postorder, reversed.
    ///
    /// The visit deque is inspected at the front: unvisited successors are
    /// pushed to the front (in reverse order, so the first successor is
    /// explored first); a front block with no unvisited successors is closed
    /// and appended to the postorder. No native recursion, so deep synthetic
    /// CFGs cannot overflow the stack.
    pub fn compute(cfg: &Cfg, entry: BlockId) -> Rpo {
        let n = cfg.num_blocks();
        let mut visited = vec![false; n];
        let mut closed = vec![false; n];
        let mut deque = VecDeque::new();
        let mut postorder = Vec::new();

        deque.push_back(entry);
        while let Some(&head) = deque.front() {
            visited[head.index()] = true;
            let mut pushed = false;
            for &succ in cfg.succs(head).iter().rev() {
                if !visited[succ.index()] {
                    pushed = true;
                    deque.push_front(succ);
                }
            }
            if !pushed {
                // A block reachable from two parents can sit in the deque
                // twice; only its first (deepest) close counts.
                if !closed[head.index()] {
                    closed[head.index()] = true;
                    postorder.push(head);
                }
                deque.pop_front();
            }
        }

        postorder.reverse();
        let mut ranks = vec![None; n];
        for (rank, &block) in postorder.iter().enumerate() {
            debug_assert!(ranks[block.index()].is_none());
            ranks[block.index()] = Some(rank);
        }
        Rpo {
            ranks,
            order: postorder,
        }
    }

    /// The rank of a block, or `None` if it is unreachable from the entry.
    pub fn rank(&self, block: BlockId) -> Option<usize> {
        self.ranks.get(block.index()).copied().flatten()
    }

    /// Reachable blocks in reverse-postorder.
    pub fn order(&self) -> &[BlockId] {
        &self.order
    }

    /// Number of reachable blocks.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// True iff `block` has two or more forward predecessors.
///
/// Unreachable predecessors (no rank) are ignored; they can never execute.
pub fn is_merge_node(block: BlockId, rpo: &Rpo, cfg: &Cfg) -> bool {
    let Some(rank) = rpo.rank(block) else {
        return false;
    };
    let forward = cfg
        .preds(block)
        .iter()
        .filter(|&&p| matches!(rpo.rank(p), Some(pr) if pr < rank))
        .count();
    forward >= 2
}

/// True iff `block` has at least one backward predecessor (it is the entry
/// of a natural loop).
pub fn is_loop_header(block: BlockId, rpo: &Rpo, cfg: &Cfg) -> bool {
    let Some(rank) = rpo.rank(block) else {
        return false;
    };
    cfg.preds(block)
        .iter()
        .any(|&p| matches!(rpo.rank(p), Some(pr) if pr >= rank))
}
