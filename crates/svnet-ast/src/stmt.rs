//! Procedural statements and timing controls

use crate::expr::{Condition, Expr};
use crate::span::SourceSpan;
use crate::symbol::SymbolId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeKind {
    None,
    PosEdge,
    NegEdge,
    BothEdges,
}

/// Event control attached to a timed statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TimingControl {
    SignalEvent {
        expr: Expr,
        edge: EdgeKind,
        iff: Option<Expr>,
    },
    ImplicitEvent,
    EventList(Vec<TimingControl>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    Sequential,
    Parallel,
}

/// Case statement comparison semantics (`case`, `casex`, `casez`, `inside`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseCondition {
    Normal,
    WildcardXOrZ,
    WildcardJustZ,
    Inside,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UniquePriorityCheck {
    None,
    Unique,
    Unique0,
    Priority,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseItem {
    pub expressions: Vec<Expr>,
    pub stmt: Stmt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub span: Option<SourceSpan>,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    Block {
        kind: BlockKind,
        body: Box<Stmt>,
    },
    List(Vec<Stmt>),
    /// Assignment or call in statement position.
    Expression(Expr),
    Conditional {
        conditions: Vec<Condition>,
        if_true: Box<Stmt>,
        if_false: Option<Box<Stmt>>,
    },
    Case {
        condition: CaseCondition,
        check: UniquePriorityCheck,
        expr: Expr,
        items: Vec<CaseItem>,
        default_case: Option<Box<Stmt>>,
    },
    Timed {
        timing: TimingControl,
        stmt: Box<Stmt>,
    },
    Empty,
    /// Declaration marker for a block-local variable; the symbol itself is
    /// reached through its enclosing statement block.
    VariableDecl(SymbolId),
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Self { span: None, kind }
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }

    /// A sequential `begin ... end` around the given statements.
    pub fn seq_block(stmts: Vec<Stmt>) -> Self {
        Stmt::new(StmtKind::Block {
            kind: BlockKind::Sequential,
            body: Box::new(Stmt::new(StmtKind::List(stmts))),
        })
    }

    pub fn expression(expr: Expr) -> Self {
        Stmt::new(StmtKind::Expression(expr))
    }
}
