//! Error types for netlist construction and checking

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetlistError {
    #[error("module {module}: {what} references an unknown wire")]
    UnknownWire { module: String, what: String },

    #[error("module {module}: bit {offset} out of range for wire {wire} of width {width}")]
    BitOutOfRange {
        module: String,
        wire: String,
        offset: usize,
        width: usize,
    },

    #[error("module {module}: action width mismatch ({lhs} bits vs {rhs} bits)")]
    ActionWidthMismatch {
        module: String,
        lhs: usize,
        rhs: usize,
    },

    #[error("module {module}: case compare width {compare} does not match switch signal width {signal}")]
    CompareWidthMismatch {
        module: String,
        signal: usize,
        compare: usize,
    },

    #[error("module {module}, process {process}: edge sync trigger must be a single bit, got {width}")]
    BadSyncSignal {
        module: String,
        process: String,
        width: usize,
    },
}

#[derive(Debug, Error)]
pub enum FmtError {
    #[error("{task}: unknown format conversion `%{conv}`")]
    UnknownConversion { task: String, conv: char },

    #[error("{task}: format string ends in the middle of a conversion")]
    TruncatedConversion { task: String },

    #[error("{task}: not enough arguments for format string")]
    MissingArgument { task: String },

    #[error("{task}: argument cannot be formatted with `%{conv}`")]
    BadArgument { task: String, conv: char },
}
