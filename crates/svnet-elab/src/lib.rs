//! svnet-elab - Elaboration engine
//!
//! Lowers a fully-typed, constant-folded SystemVerilog AST into a
//! structural netlist. Three subsystems do the work:
//!
//! - expression lowering ([`eval`]): rvalue/lvalue translation of every
//!   expression kind into bit-vector signals, with eager constant folding
//!   through the cell [`builder`];
//! - procedural lowering ([`proc`]): `always`-family blocks and function
//!   bodies become case trees with blocking/nonblocking semantics and a
//!   staging layer committed on sync events;
//! - module population ([`populate`]) and the [`hierarchy`] driver, which
//!   walk the elaborated hierarchy and emit one module per instance body.
//!
//! Lowering is single-threaded and deterministic; emission order follows
//! AST traversal order. All failures are terminal.

pub mod attrs;
pub mod builder;
pub mod error;
pub mod eval;
pub mod hierarchy;
pub mod populate;
pub mod proc;

pub use builder::Builder;
pub use error::{ElabError, Result};
pub use eval::{evaluate_lhs, evaluate_rhs, translate_index, ModuleCx, ProcedureContext};
pub use hierarchy::elaborate;
