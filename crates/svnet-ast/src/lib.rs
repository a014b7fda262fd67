//! svnet-ast - Elaborated SystemVerilog AST model
//!
//! The data the external front end hands to the elaborator: a fully typed,
//! name-resolved, constant-folded design. Everything here is serde-
//! serializable so the handoff can cross a process boundary as JSON.
//!
//! The model deliberately captures only what netlist generation consumes:
//! fixed-size types, synthesizable statements, edge/implicit timing
//! controls, and elaborated hierarchy.

pub mod consts;
pub mod expr;
pub mod span;
pub mod stmt;
pub mod symbol;
pub mod types;

pub use consts::{ConstVal, Logic, SvInt};
pub use expr::{
    BinaryOp, Call, CallTarget, Condition, Expr, ExprKind, RangeSelectKind, UnaryOp,
};
pub use span::SourceSpan;
pub use stmt::{
    BlockKind, CaseCondition, CaseItem, EdgeKind, Stmt, StmtKind, TimingControl,
    UniquePriorityCheck,
};
pub use symbol::{
    Ast, Attribute, BodyId, Direction, InstanceBody, PortConnection, ProceduralBlockKind,
    Symbol, SymbolId, SymbolKind,
};
pub use types::{ConstantRange, StructField, Type};
