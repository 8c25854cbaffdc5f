//! The block-based IR: a Bril program as basic blocks with explicit
//! terminators, plus the structured statement tree the reconstruction
//! produces.

pub mod block;
pub mod builder;
pub mod func;
pub mod inst;
pub mod module;
pub mod structured;

pub use block::{Block, BlockId, Terminator};
pub use builder::FunctionBuilder;
pub use func::{FuncId, Function, Param};
pub use inst::{Constant, EffectOp, Inst, Type, ValueOp};
pub use module::Module;
pub use structured::{Stmt, StructuredFunction, StructuredModule};
