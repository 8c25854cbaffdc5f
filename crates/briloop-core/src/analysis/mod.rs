//! Read-only CFG analyses: successor/predecessor maps, reverse-postorder
//! numbering with edge classification, and dominator trees.

pub mod cfg;
pub mod dom;
pub mod rpo;

pub use cfg::Cfg;
pub use dom::{compute_dominator_tree, dominates, immediate_dominators, DomTree};
pub use rpo::{is_loop_header, is_merge_node, Rpo};
