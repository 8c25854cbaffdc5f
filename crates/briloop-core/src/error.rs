use thiserror::Error;

use crate::ir::BlockId;

/// Errors surfaced by the core library.
///
/// All control-flow errors are unrecoverable for the function being
/// translated: the reconstruction never guesses a structure, since a wrong
/// guess would silently change program semantics. The caller decides whether
/// to skip the function or abort the whole program.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The input program is not valid Bril (JSON shape, opcode, or type).
    #[error("malformed program: {detail}")]
    MalformedProgram { detail: String },

    /// The CFG is not well formed: a terminator references a block outside
    /// the function, or the block layout is inconsistent.
    #[error("malformed CFG in function `{function}`: {detail}")]
    MalformedCfg { function: String, detail: String },

    /// A branch edge cannot be classified as backward, merge, or
    /// dominated-forward under the dominator tree. The input CFG is not
    /// reducible (or the dominator tree does not match it).
    #[error("irreducible control flow in function `{function}` at block {block}: {detail}")]
    Irreducible {
        function: String,
        block: BlockId,
        detail: String,
    },

    /// The analyses disagree with each other. Indicates a bug in this
    /// crate, not bad input.
    #[error("internal invariant violated in function `{function}`: {detail}")]
    InternalInvariant { function: String, detail: String },
}
