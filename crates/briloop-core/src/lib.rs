//! Structured control-flow reconstruction for Bril programs.
//!
//! Takes a Bril function as a flat list of basic blocks with `jmp`/`br`
//! terminators and rebuilds it as nested loops, ifs, and nameless blocks
//! whose only control transfers are depth-indexed `break` and `continue`.
//! The reconstruction walks the immediate-dominator tree in reverse
//! postorder and handles any reducible CFG; irreducible ones are rejected
//! with an error naming the offending block.
//!
//! The crate is organized as:
//!
//! - [`ir`]: the block-based input form, the structured output form, and a
//!   builder for assembling functions in tests.
//! - [`analysis`]: CFG edges, reverse-postorder numbering, and dominators.
//! - [`structurize`]: the reconstruction itself.
//! - [`bril`] / [`emit`]: the Bril JSON frontend and the structured
//!   ("briloop") JSON backend.
//! - [`interp`]: reference interpreters for both forms, used to check that
//!   reconstruction preserves behavior.

pub mod analysis;
pub mod bril;
pub mod emit;
pub mod entity;
pub mod error;
pub mod interp;
pub mod ir;
pub mod structurize;

pub use error::CoreError;
