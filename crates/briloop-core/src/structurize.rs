//! Structured control-flow reconstruction.
//!
//! Walks a function's immediate-dominator tree and emits a statement tree of
//! loops, ifs, nameless blocks, and depth-indexed `break`/`continue`; no
//! jump targets survive. The input CFG must be reducible: every loop has a
//! single entry block that dominates the whole loop. Anything else fails
//! with [`CoreError::Irreducible`]; the reconstruction never guesses.
//!
//! The walk is three mutually recursive procedures over the dominator tree:
//!
//! - `do_tree` emits everything dominated by one node, wrapping it in a
//!   `Loop` when the node's block is a loop header.
//! - `node_within` gives each merge point dominated by the node its own
//!   nameless `Block` wrapper, so a `break` can land on it by index, then
//!   translates the block body and its terminator.
//! - `do_branch` classifies one CFG edge: backward edges become `Continue`,
//!   edges to merge nodes become `Break`, and remaining forward edges
//!   descend into the dominator-tree child for the target.

use crate::analysis::{
    compute_dominator_tree, is_loop_header, is_merge_node, Cfg, DomTree, Rpo,
};
use crate::entity::EntityRef;
use crate::error::CoreError;
use crate::ir::{
    BlockId, Function, Module, Stmt, StructuredFunction, StructuredModule, Terminator,
};

/// One enclosing structured construct, from the generator's point of view.
///
/// `LoopHeadedBy` marks both real loop wrappers (pushed by `do_tree`) and
/// the nameless blocks that land on a merge point (pushed by `node_within`);
/// in both cases the payload is the block that a branch to it targets.
/// `IfThenElse` is pushed for each conditional arm purely to keep the
/// nesting-depth arithmetic right; it is never itself a branch target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContainingSyntax {
    LoopHeadedBy(BlockId),
    IfThenElse,
}

struct Reconstructor<'a> {
    func: &'a Function,
    cfg: &'a Cfg,
    rpo: &'a Rpo,
    /// Enclosing constructs, innermost last. Strict push/pop discipline:
    /// every push is popped on all exit paths of the same call.
    ctx: Vec<ContainingSyntax>,
}

impl Reconstructor<'_> {
    fn rank(&self, block: BlockId) -> Result<usize, CoreError> {
        self.rpo.rank(block).ok_or_else(|| CoreError::InternalInvariant {
            function: self.func.name.clone(),
            detail: format!("block {block} has no RPO rank"),
        })
    }

    /// Nesting depth (0 = innermost) of the marker targeting `block`.
    fn marker_depth(&self, block: BlockId) -> Option<usize> {
        self.ctx
            .iter()
            .rev()
            .position(|m| *m == ContainingSyntax::LoopHeadedBy(block))
    }

    fn irreducible(&self, block: BlockId, detail: String) -> CoreError {
        CoreError::Irreducible {
            function: self.func.name.clone(),
            block,
            detail,
        }
    }

    /// Emits the code for everything dominated by `node`.
    fn do_tree(&mut self, node: &DomTree) -> Result<Vec<Stmt>, CoreError> {
        // Merge children ordered by descending rank: the outermost wrapper
        // block belongs to the latest merge point, so every earlier merge
        // point's landing pad nests inside it and forward edges between
        // them resolve to an enclosing marker.
        let mut merge_children: Vec<&DomTree> = node
            .children
            .iter()
            .filter(|c| is_merge_node(c.block, self.rpo, self.cfg))
            .collect();
        merge_children.reverse(); // children are sorted by ascending rank

        if is_loop_header(node.block, self.rpo, self.cfg) {
            self.ctx.push(ContainingSyntax::LoopHeadedBy(node.block));
            let body = self.node_within(node, &merge_children);
            self.ctx.pop();
            Ok(vec![Stmt::Loop { body: body? }])
        } else {
            self.node_within(node, &merge_children)
        }
    }

    /// Translates `node`'s block with the given pending merge children.
    ///
    /// Inductive case: the first (highest-ranked) merge child gets a
    /// nameless block wrapping the processing of the rest, followed by the
    /// merge child's own subtree at the current level. Base case: copy the
    /// block's instructions and realize its terminator.
    fn node_within(
        &mut self,
        node: &DomTree,
        merge_children: &[&DomTree],
    ) -> Result<Vec<Stmt>, CoreError> {
        let Some((merge, rest)) = merge_children.split_first() else {
            return self.block_body(node);
        };

        self.ctx.push(ContainingSyntax::LoopHeadedBy(merge.block));
        let inner = self.node_within(node, rest);
        self.ctx.pop();

        let mut stmts = vec![Stmt::Block { body: inner? }];
        stmts.extend(self.do_tree(merge)?);
        Ok(stmts)
    }

    /// The base case of `node_within`: straight-line instructions plus the
    /// structural realization of the terminator.
    fn block_body(&mut self, node: &DomTree) -> Result<Vec<Stmt>, CoreError> {
        let block = &self.func.blocks[node.block];
        let mut stmts: Vec<Stmt> = block
            .insts
            .iter()
            .filter(|inst| !inst.is_nop())
            .cloned()
            .map(Stmt::Op)
            .collect();

        match &block.term {
            Some(Terminator::Jmp { target }) => {
                stmts.extend(self.do_branch(node, *target)?);
            }
            Some(Terminator::Br {
                cond,
                then_target,
                else_target,
            }) => {
                self.ctx.push(ContainingSyntax::IfThenElse);
                let arms = self.do_branch(node, *then_target).and_then(|then_body| {
                    self.do_branch(node, *else_target)
                        .map(|else_body| (then_body, else_body))
                });
                self.ctx.pop();
                let (then_body, else_body) = arms?;
                stmts.push(Stmt::If {
                    cond: cond.clone(),
                    then_body,
                    else_body,
                });
            }
            Some(Terminator::Ret { value }) => {
                stmts.push(Stmt::Ret {
                    value: value.clone(),
                });
            }
            None => {
                // Fallthrough to the syntactic successor; the last block of
                // a function implicitly returns.
                let next = node.block.index() + 1;
                if next < self.func.blocks.len() {
                    stmts.extend(self.do_branch(node, BlockId::new(next))?);
                } else {
                    stmts.push(Stmt::Ret { value: None });
                }
            }
        }
        Ok(stmts)
    }

    /// Classifies the edge `node.block -> target` and realizes it.
    fn do_branch(&mut self, node: &DomTree, target: BlockId) -> Result<Vec<Stmt>, CoreError> {
        let from_rank = self.rank(node.block)?;
        let target_rank = self.rank(target)?;

        if target_rank <= from_rank {
            // Backward edge (equal ranks only for a self-loop): the target
            // must be a loop header already on the context stack.
            let depth = self.marker_depth(target).ok_or_else(|| {
                self.irreducible(
                    node.block,
                    format!("backward edge to {target} has no enclosing loop"),
                )
            })?;
            Ok(vec![Stmt::Continue { depth }])
        } else if is_merge_node(target, self.rpo, self.cfg) {
            // Forward edge to a merge point: a wrapper for it must already
            // be in scope.
            let depth = self.marker_depth(target).ok_or_else(|| {
                self.irreducible(
                    node.block,
                    format!("merge target {target} has no enclosing block"),
                )
            })?;
            Ok(vec![Stmt::Break { depth }])
        } else {
            // Forward edge to a non-merge block: it has a single forward
            // predecessor, so it must be a direct dominator-tree child.
            let child = node
                .children
                .iter()
                .find(|c| c.block == target)
                .ok_or_else(|| {
                    self.irreducible(
                        node.block,
                        format!("branch target {target} is not a dominator-tree child"),
                    )
                })?;
            self.do_tree(child)
        }
    }
}

/// Reconstructs structured control flow for one function, computing the
/// CFG, RPO numbering, and dominator tree itself.
pub fn reconstruct(func: &Function) -> Result<StructuredFunction, CoreError> {
    let cfg = Cfg::compute(func)?;
    let rpo = Rpo::compute(&cfg, func.entry);
    let dtree = compute_dominator_tree(&cfg, &rpo, func.entry, &func.name)?;
    reconstruct_with(func, &cfg, &dtree, &rpo)
}

/// Reconstructs structured control flow from collaborator-supplied analyses.
///
/// The analyses must all describe `func`'s current CFG; a stale dominator
/// tree surfaces as an irreducibility or internal-invariant error.
pub fn reconstruct_with(
    func: &Function,
    cfg: &Cfg,
    dtree: &DomTree,
    rpo: &Rpo,
) -> Result<StructuredFunction, CoreError> {
    let mut r = Reconstructor {
        func,
        cfg,
        rpo,
        ctx: Vec::new(),
    };
    let body = r.do_tree(dtree)?;
    if !r.ctx.is_empty() {
        return Err(CoreError::InternalInvariant {
            function: func.name.clone(),
            detail: "context stack not empty after traversal".to_string(),
        });
    }
    Ok(StructuredFunction {
        name: func.name.clone(),
        params: func.params.clone(),
        return_ty: func.return_ty,
        body,
    })
}

/// Reconstructs every function of a module. Functions are independent; the
/// first failure aborts (callers wanting to skip bad functions can call
/// [`reconstruct`] per function).
pub fn reconstruct_module(module: &Module) -> Result<StructuredModule, CoreError> {
    let functions = module
        .functions
        .values()
        .map(reconstruct)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(StructuredModule { functions })
}
