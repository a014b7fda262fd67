//! Elaboration diagnostics
//!
//! Every failure is terminal: the caller discards any partially-built
//! design. Unsupported-construct errors carry a pretty-printed dump of the
//! offending AST node plus the compiler-internal location that raised
//! them, so reports stay actionable without a debugger.

use serde::Serialize;
use svnet_ast::{Expr, InstanceBody, SourceSpan, Stmt, Symbol, TimingControl};
use svnet_netlist::{FmtError, NetlistError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ElabError>;

#[derive(Debug, Error)]
pub enum ElabError {
    /// `summary` already carries the failed condition and source line when
    /// they are known; `dump` is the serialized AST fragment.
    #[error("unsupported construct at {at}: {summary}\n{dump}")]
    Unsupported {
        summary: String,
        dump: String,
        span: Option<SourceSpan>,
        at: String,
        condition: Option<String>,
    },

    #[error("blocking and nonblocking assignments target the same bit")]
    MixedAssignment { span: Option<SourceSpan> },

    #[error("{what} must be constant")]
    NotConstant {
        what: String,
        span: Option<SourceSpan>,
    },

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Netlist(#[from] NetlistError),

    #[error(transparent)]
    Format(#[from] FmtError),
}

/// AST nodes that can be reported in diagnostics.
pub trait DiagNode {
    fn diag_span(&self) -> Option<SourceSpan>;
    fn diag_summary(&self) -> String;
    fn diag_dump(&self) -> String;
}

fn dump_of<T: Serialize>(node: &T) -> String {
    serde_json::to_string_pretty(node).unwrap_or_else(|_| "<unserializable>".to_string())
}

fn expr_kind_name(expr: &Expr) -> &'static str {
    use svnet_ast::ExprKind::*;
    match &expr.kind {
        NamedValue(_) => "NamedValue",
        IntegerLiteral(_) => "IntegerLiteral",
        StringLiteral(_) => "StringLiteral",
        Unary { .. } => "Unary",
        Binary { .. } => "Binary",
        Conversion { .. } => "Conversion",
        RangeSelect { .. } => "RangeSelect",
        ElementSelect { .. } => "ElementSelect",
        Concat { .. } => "Concat",
        Replication { .. } => "Replication",
        Conditional { .. } => "Conditional",
        MemberAccess { .. } => "MemberAccess",
        Call(_) => "Call",
        Assignment { .. } => "Assignment",
        EmptyArgument => "EmptyArgument",
    }
}

fn stmt_kind_name(stmt: &Stmt) -> &'static str {
    use svnet_ast::StmtKind::*;
    match &stmt.kind {
        Block { .. } => "Block",
        List(_) => "List",
        Expression(_) => "Expression",
        Conditional { .. } => "Conditional",
        Case { .. } => "Case",
        Timed { .. } => "Timed",
        Empty => "Empty",
        VariableDecl(_) => "VariableDecl",
    }
}

impl DiagNode for Expr {
    fn diag_span(&self) -> Option<SourceSpan> {
        self.span.clone()
    }

    fn diag_summary(&self) -> String {
        format!("{} expression", expr_kind_name(self))
    }

    fn diag_dump(&self) -> String {
        dump_of(self)
    }
}

impl DiagNode for Stmt {
    fn diag_span(&self) -> Option<SourceSpan> {
        self.span.clone()
    }

    fn diag_summary(&self) -> String {
        format!("{} statement", stmt_kind_name(self))
    }

    fn diag_dump(&self) -> String {
        dump_of(self)
    }
}

impl DiagNode for Symbol {
    fn diag_span(&self) -> Option<SourceSpan> {
        self.span.clone()
    }

    fn diag_summary(&self) -> String {
        format!("symbol `{}`", self.hier_path)
    }

    fn diag_dump(&self) -> String {
        dump_of(self)
    }
}

impl DiagNode for InstanceBody {
    fn diag_span(&self) -> Option<SourceSpan> {
        self.span.clone()
    }

    fn diag_summary(&self) -> String {
        format!("instance body `{}`", self.hier_path)
    }

    fn diag_dump(&self) -> String {
        dump_of(self)
    }
}

impl DiagNode for TimingControl {
    fn diag_span(&self) -> Option<SourceSpan> {
        None
    }

    fn diag_summary(&self) -> String {
        "timing control".to_string()
    }

    fn diag_dump(&self) -> String {
        dump_of(self)
    }
}

/// Build the error for an AST node the elaborator cannot lower.
pub fn unsupported_node(
    node: &dyn DiagNode,
    file: &str,
    line: u32,
    condition: Option<&str>,
) -> ElabError {
    let span = node.diag_span();
    let mut summary = node.diag_summary();
    if let Some(cond) = condition {
        summary.push_str(&format!(" (failed condition `{cond}`)"));
    }
    if let Some(span) = &span {
        summary.push_str(&format!(", source {}", span.display()));
    }
    ElabError::Unsupported {
        summary,
        dump: node.diag_dump(),
        span,
        at: format!("{file}:{line}"),
        condition: condition.map(str::to_string),
    }
}

/// Abort lowering of an AST node the elaborator does not handle.
macro_rules! unsupported {
    ($node:expr) => {
        return Err($crate::error::unsupported_node(
            $node,
            file!(),
            line!(),
            None,
        ))
    };
}

/// Require a property of an AST node, aborting with the node dump and the
/// failed condition otherwise.
macro_rules! require {
    ($node:expr, $cond:expr) => {
        if !$cond {
            return Err($crate::error::unsupported_node(
                $node,
                file!(),
                line!(),
                Some(stringify!($cond)),
            ));
        }
    };
}

pub(crate) use require;
pub(crate) use unsupported;
