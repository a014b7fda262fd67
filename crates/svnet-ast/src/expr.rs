//! Typed expression trees
//!
//! Every expression carries its elaborated type and, when the front end
//! could fold it, the folded constant. The elaborator trusts both.

use crate::consts::{ConstVal, SvInt};
use crate::span::SourceSpan;
use crate::symbol::SymbolId;
use crate::types::Type;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    LogicalNot,
    BitwiseNot,
    BitwiseOr,
    BitwiseAnd,
    BitwiseNand,
    BitwiseNor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Mod,
    BinaryAnd,
    BinaryOr,
    BinaryXor,
    BinaryXnor,
    Equality,
    Inequality,
    GreaterThanEqual,
    GreaterThan,
    LessThanEqual,
    LessThan,
    LogicalAnd,
    LogicalOr,
    LogicalShiftLeft,
    LogicalShiftRight,
    ArithmeticShiftLeft,
    ArithmeticShiftRight,
    Power,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeSelectKind {
    Simple,
    IndexedUp,
    IndexedDown,
}

/// A condition of an `if` statement or conditional expression. Patterns are
/// carried only so their presence can be diagnosed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub expr: Expr,
    pub has_pattern: bool,
}

impl Condition {
    pub fn plain(expr: Expr) -> Self {
        Self {
            expr,
            has_pattern: false,
        }
    }
}

/// Target of a call: an elaborated function symbol or a system subroutine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CallTarget {
    Function(SymbolId),
    System(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub target: CallTarget,
    pub args: Vec<Expr>,
}

impl Call {
    /// Name of the called system subroutine, if this is a system call.
    pub fn system_name(&self) -> Option<&str> {
        match &self.target {
            CallTarget::System(name) => Some(name),
            CallTarget::Function(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub ty: Type,
    pub span: Option<SourceSpan>,
    /// Present when the front end folded this expression to a constant.
    pub const_val: Option<ConstVal>,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    /// Reference to a net, variable, parameter, or formal argument.
    NamedValue(SymbolId),
    IntegerLiteral(SvInt),
    StringLiteral(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Width/signedness conversion inserted by the front end.
    Conversion {
        operand: Box<Expr>,
    },
    RangeSelect {
        select_kind: RangeSelectKind,
        value: Box<Expr>,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    ElementSelect {
        value: Box<Expr>,
        selector: Box<Expr>,
    },
    Concat {
        operands: Vec<Expr>,
    },
    Replication {
        count: Box<Expr>,
        concat: Box<Expr>,
    },
    Conditional {
        conditions: Vec<Condition>,
        if_true: Box<Expr>,
        if_false: Box<Expr>,
    },
    MemberAccess {
        value: Box<Expr>,
        member: String,
        bit_offset: usize,
    },
    Call(Call),
    /// Assignments appear as expressions, both in expression statements and
    /// in instance output port connections.
    Assignment {
        non_blocking: bool,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Placeholder right-hand side of an output port connection.
    EmptyArgument,
}

impl Expr {
    pub fn new(ty: Type, kind: ExprKind) -> Self {
        Self {
            ty,
            span: None,
            const_val: None,
            kind,
        }
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_const(mut self, value: impl Into<ConstVal>) -> Self {
        self.const_val = Some(value.into());
        self
    }

    /// A literal with its constant image attached, as the front end emits.
    pub fn literal(ty: Type, value: SvInt) -> Self {
        Self {
            ty,
            span: None,
            const_val: Some(ConstVal::Int(value.clone())),
            kind: ExprKind::IntegerLiteral(value),
        }
    }

    pub fn named(ty: Type, symbol: SymbolId) -> Self {
        Self::new(ty, ExprKind::NamedValue(symbol))
    }
}
