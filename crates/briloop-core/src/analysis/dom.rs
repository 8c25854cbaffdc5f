//! Dominator computation (Lengauer-Tarjan) and the immediate-dominator tree
//! the reconstruction walks.

use crate::entity::EntityRef;
use crate::error::CoreError;
use crate::ir::BlockId;

use super::cfg::Cfg;
use super::rpo::Rpo;

/// A node of the immediate-dominator tree: each child's block has this
/// node's block as its immediate dominator. Children are ordered by
/// ascending reverse-postorder rank. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomTree {
    pub block: BlockId,
    pub children: Vec<DomTree>,
}

/// Iterative path compression for the Lengauer-Tarjan union-find forest.
///
/// Updates `label` entries so each node records the vertex with minimum
/// `semi` value on its path to the forest root, and compresses ancestor
/// pointers for future lookups. `usize::MAX` in `ancestor` means "root".
fn lt_compress(v: usize, ancestor: &mut [usize], label: &mut [usize], semi: &[usize]) {
    let mut path = Vec::new();
    let mut u = v;
    while ancestor[u] != usize::MAX && ancestor[ancestor[u]] != usize::MAX {
        path.push(u);
        u = ancestor[u];
    }
    for &node in path.iter().rev() {
        let a = ancestor[node];
        if semi[label[a]] < semi[label[node]] {
            label[node] = label[a];
        }
        ancestor[node] = ancestor[a];
    }
}

/// EVAL: the vertex with minimum semidominator on the path from `v` to the
/// root of its tree in the forest.
fn lt_eval(v: usize, ancestor: &mut [usize], label: &mut [usize], semi: &[usize]) -> usize {
    if ancestor[v] == usize::MAX {
        return v;
    }
    lt_compress(v, ancestor, label, semi);
    label[v]
}

/// Lengauer-Tarjan immediate dominators, near-linear with path compression.
///
/// Returns a map indexed by block: `Some(idom)` for every reachable block
/// (the entry maps to itself), `None` for unreachable blocks.
pub fn immediate_dominators(cfg: &Cfg, entry: BlockId) -> Vec<Option<BlockId>> {
    let n_blocks = cfg.num_blocks();

    // Phase 1: iterative DFS numbering (no recursion on large functions).
    let mut dfnum = vec![usize::MAX; n_blocks];
    let mut vertex: Vec<BlockId> = Vec::new();
    let mut dfs_parent: Vec<usize> = Vec::new();
    let mut stack = vec![(entry, usize::MAX)];
    while let Some((block, parent_df)) = stack.pop() {
        if dfnum[block.index()] != usize::MAX {
            continue;
        }
        let df = vertex.len();
        dfnum[block.index()] = df;
        vertex.push(block);
        dfs_parent.push(parent_df);
        for &succ in cfg.succs(block).iter().rev() {
            if dfnum[succ.index()] == usize::MAX {
                stack.push((succ, df));
            }
        }
    }

    let n = vertex.len();
    let mut idom = vec![None; n_blocks];
    idom[entry.index()] = Some(entry);
    if n <= 1 {
        return idom;
    }

    // Phase 2: semidominators and provisional immediate dominators.
    let mut semi: Vec<usize> = (0..n).collect();
    let mut idom_idx: Vec<usize> = vec![0; n];
    let mut ancestor: Vec<usize> = vec![usize::MAX; n];
    let mut label: Vec<usize> = (0..n).collect();
    let mut bucket: Vec<Vec<usize>> = vec![Vec::new(); n];

    for i in (1..n).rev() {
        let w = vertex[i];
        let p = dfs_parent[i];

        for &v in cfg.preds(w) {
            let v_df = dfnum[v.index()];
            if v_df == usize::MAX {
                continue; // unreachable predecessor
            }
            let u = lt_eval(v_df, &mut ancestor, &mut label, &semi);
            if semi[u] < semi[i] {
                semi[i] = semi[u];
            }
        }

        bucket[semi[i]].push(i);
        ancestor[i] = p;

        for v in std::mem::take(&mut bucket[p]) {
            let u = lt_eval(v, &mut ancestor, &mut label, &semi);
            idom_idx[v] = if semi[u] < semi[v] { u } else { p };
        }
    }

    // Phase 3: adjust immediate dominators.
    for i in 1..n {
        if idom_idx[i] != semi[i] {
            idom_idx[i] = idom_idx[idom_idx[i]];
        }
    }

    for i in 1..n {
        idom[vertex[i].index()] = Some(vertex[idom_idx[i]]);
    }
    idom
}

/// Whether `a` dominates `b` (reflexively) under an idom map.
pub fn dominates(a: BlockId, b: BlockId, idom: &[Option<BlockId>]) -> bool {
    let mut cur = b;
    loop {
        if cur == a {
            return true;
        }
        match idom[cur.index()] {
            Some(parent) if parent != cur => cur = parent,
            _ => return false,
        }
    }
}

/// Builds the immediate-dominator tree rooted at the entry, with each node's
/// children ordered by ascending RPO rank.
///
/// Fails with an internal-invariant error if the dominator DFS and the RPO
/// disagree about which blocks are reachable.
pub fn compute_dominator_tree(
    cfg: &Cfg,
    rpo: &Rpo,
    entry: BlockId,
    function: &str,
) -> Result<DomTree, CoreError> {
    let idom = immediate_dominators(cfg, entry);

    let n = cfg.num_blocks();
    let mut children: Vec<Vec<BlockId>> = vec![Vec::new(); n];
    for block in (0..n).map(BlockId::new) {
        let Some(parent) = idom[block.index()] else {
            continue;
        };
        if rpo.rank(block).is_none() {
            return Err(CoreError::InternalInvariant {
                function: function.to_string(),
                detail: format!("block {block} is dominated but has no RPO rank"),
            });
        }
        if block != entry {
            children[parent.index()].push(block);
        }
    }
    for child_list in &mut children {
        child_list.sort_by_key(|&b| rpo.rank(b));
    }

    Ok(build_subtree(entry, &children))
}

fn build_subtree(block: BlockId, children: &[Vec<BlockId>]) -> DomTree {
    DomTree {
        block,
        children: children[block.index()]
            .iter()
            .map(|&c| build_subtree(c, children))
            .collect(),
    }
}
