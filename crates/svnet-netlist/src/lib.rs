//! svnet-netlist - Structural netlist IR
//!
//! The target representation for elaboration: modules of typed bit-vector
//! wires, primitive cells, submodule instances, and behavioral processes
//! (case trees plus sync rules). Also home to the reference constant
//! folding the elaborator's eager folds must agree with, and the format
//! model for `$print` cells.

pub mod const_ops;
pub mod emit;
pub mod error;
pub mod fmt;
pub mod netlist;
pub mod sig;

pub use emit::emit_design;
pub use error::{FmtError, NetlistError};
pub use fmt::{Fmt, FmtArg, FmtBase, FmtPart};
pub use netlist::{
    escape_id, sig_x, sig_zero, unescape_id, CaseRule, Cell, Design, Module, Process, SigSig,
    SwitchRule, SyncKind, SyncRule, Wire,
};
pub use sig::{Const, SigBit, SigSpec, State, WireId};
