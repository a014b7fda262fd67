//! Source location types for diagnostics and `src` attributes
//!
//! The front end resolves byte offsets into file/line/column form before
//! serializing the AST, so spans here are self-contained and the netlist
//! side never needs access to the original source text.

use serde::{Deserialize, Serialize};

/// A resolved source range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    /// File path as reported by the front end.
    pub file: String,
    /// Start line (1-indexed).
    pub line: u32,
    /// Start column (1-indexed).
    pub column: u32,
    /// End line.
    pub end_line: u32,
    /// End column.
    pub end_column: u32,
}

impl SourceSpan {
    /// Create a single-point span.
    pub fn point(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            end_line: line,
            end_column: column,
        }
    }

    /// Create a span covering a range.
    pub fn range(
        file: impl Into<String>,
        line: u32,
        column: u32,
        end_line: u32,
        end_column: u32,
    ) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            end_line,
            end_column,
        }
    }

    /// Render in the form used for netlist `src` attributes:
    /// `file:line.col` for points, `file:line.col-line.col` for ranges.
    pub fn attr_string(&self) -> String {
        if self.line == self.end_line && self.column == self.end_column {
            format!("{}:{}.{}", self.file, self.line, self.column)
        } else {
            format!(
                "{}:{}.{}-{}.{}",
                self.file, self.line, self.column, self.end_line, self.end_column
            )
        }
    }

    /// Short `file:line:column` form for log and error messages.
    pub fn display(&self) -> String {
        format!("{}:{}:{}", self.file, self.line, self.column)
    }
}

impl Default for SourceSpan {
    fn default() -> Self {
        Self {
            file: String::new(),
            line: 1,
            column: 1,
            end_line: 1,
            end_column: 1,
        }
    }
}
