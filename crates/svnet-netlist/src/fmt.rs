//! Verilog-style format strings for `$print` cells
//!
//! `$display` arguments arrive classified as string literals, time
//! specials, or integer signals. String arguments are scanned for `%`
//! conversions, each of which consumes one following argument. The parsed
//! result renders back to a canonical format string stored on the cell,
//! with value signals concatenated onto the `ARGS` port.

use crate::error::FmtError;
use crate::netlist::Cell;
use crate::sig::{Const, SigSpec};
use std::collections::VecDeque;

/// A classified `$display` argument.
#[derive(Debug, Clone, PartialEq)]
pub enum FmtArg {
    String(String),
    Time { realtime: bool },
    Integer { sig: SigSpec, signed: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FmtBase {
    Binary,
    Octal,
    Decimal,
    Hex,
    Char,
    Str,
}

impl FmtBase {
    fn conv_char(self) -> char {
        match self {
            FmtBase::Binary => 'b',
            FmtBase::Octal => 'o',
            FmtBase::Decimal => 'd',
            FmtBase::Hex => 'h',
            FmtBase::Char => 'c',
            FmtBase::Str => 's',
        }
    }

    fn from_conv(conv: char) -> Option<Self> {
        match conv.to_ascii_lowercase() {
            'b' => Some(FmtBase::Binary),
            'o' => Some(FmtBase::Octal),
            'd' => Some(FmtBase::Decimal),
            'h' | 'x' => Some(FmtBase::Hex),
            'c' => Some(FmtBase::Char),
            's' => Some(FmtBase::Str),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FmtPart {
    Literal(String),
    Value {
        sig: SigSpec,
        signed: bool,
        base: FmtBase,
        width: Option<usize>,
        zero_pad: bool,
    },
    Time {
        realtime: bool,
    },
}

/// A parsed format: the flattened part list of one `$display` call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fmt {
    pub parts: Vec<FmtPart>,
}

impl Fmt {
    /// Parse a `$display`-style argument list. `default_base` applies to
    /// bare integer arguments outside any format string.
    pub fn parse_verilog(args: &[FmtArg], default_base: FmtBase, task: &str) -> Result<Fmt, FmtError> {
        let mut queue: VecDeque<&FmtArg> = args.iter().collect();
        let mut fmt = Fmt::default();
        while let Some(arg) = queue.pop_front() {
            match arg {
                FmtArg::String(s) => fmt.parse_string(s, &mut queue, task)?,
                FmtArg::Time { realtime } => fmt.parts.push(FmtPart::Time {
                    realtime: *realtime,
                }),
                FmtArg::Integer { sig, signed } => fmt.parts.push(FmtPart::Value {
                    sig: sig.clone(),
                    signed: *signed,
                    base: default_base,
                    width: None,
                    zero_pad: false,
                }),
            }
        }
        Ok(fmt)
    }

    fn parse_string(
        &mut self,
        s: &str,
        queue: &mut VecDeque<&FmtArg>,
        task: &str,
    ) -> Result<(), FmtError> {
        let mut literal = String::new();
        let mut chars = s.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }
            let mut zero_pad = false;
            let mut width = None;
            if chars.peek() == Some(&'0') {
                zero_pad = true;
                chars.next();
            }
            let mut digits = String::new();
            while let Some(d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                digits.push(*d);
                chars.next();
            }
            if !digits.is_empty() {
                width = Some(digits.parse().unwrap());
            }
            let conv = chars.next().ok_or_else(|| FmtError::TruncatedConversion {
                task: task.to_string(),
            })?;
            if conv == '%' {
                literal.push('%');
                continue;
            }
            if !literal.is_empty() {
                self.parts.push(FmtPart::Literal(std::mem::take(&mut literal)));
            }
            if conv == 't' || conv == 'T' {
                match queue.pop_front() {
                    Some(FmtArg::Time { realtime }) => self.parts.push(FmtPart::Time {
                        realtime: *realtime,
                    }),
                    Some(FmtArg::Integer { sig, signed }) => self.parts.push(FmtPart::Value {
                        sig: sig.clone(),
                        signed: *signed,
                        base: FmtBase::Decimal,
                        width,
                        zero_pad,
                    }),
                    _ => {
                        return Err(FmtError::MissingArgument {
                            task: task.to_string(),
                        })
                    }
                }
                continue;
            }
            let base = FmtBase::from_conv(conv).ok_or(FmtError::UnknownConversion {
                task: task.to_string(),
                conv,
            })?;
            match queue.pop_front() {
                Some(FmtArg::Integer { sig, signed }) => self.parts.push(FmtPart::Value {
                    sig: sig.clone(),
                    signed: *signed,
                    base,
                    width,
                    zero_pad,
                }),
                Some(_) => {
                    return Err(FmtError::BadArgument {
                        task: task.to_string(),
                        conv,
                    })
                }
                None => {
                    return Err(FmtError::MissingArgument {
                        task: task.to_string(),
                    })
                }
            }
        }
        if !literal.is_empty() {
            self.parts.push(FmtPart::Literal(literal));
        }
        Ok(())
    }

    /// Append literal text, e.g. the trailing newline.
    pub fn append_literal(&mut self, s: &str) {
        if let Some(FmtPart::Literal(last)) = self.parts.last_mut() {
            last.push_str(s);
        } else {
            self.parts.push(FmtPart::Literal(s.to_string()));
        }
    }

    /// Render back to a canonical Verilog format string. Literal `%` is
    /// escaped as `%%`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                FmtPart::Literal(s) => {
                    for c in s.chars() {
                        if c == '%' {
                            out.push_str("%%");
                        } else {
                            out.push(c);
                        }
                    }
                }
                FmtPart::Value {
                    base,
                    width,
                    zero_pad,
                    ..
                } => {
                    out.push('%');
                    if *zero_pad {
                        out.push('0');
                    }
                    if let Some(w) = width {
                        out.push_str(&w.to_string());
                    }
                    out.push(base.conv_char());
                }
                FmtPart::Time { .. } => out.push_str("%t"),
            }
        }
        out
    }

    /// Store the format onto a `$print` cell: `FORMAT` carries the rendered
    /// string, `ARGS` the concatenated value signals (first argument in the
    /// low bits), plus per-argument width and signedness parameters.
    pub fn emit_to_cell(&self, cell: &mut Cell) {
        let mut args = SigSpec::new();
        let mut index = 0;
        for part in &self.parts {
            if let FmtPart::Value { sig, signed, .. } = part {
                cell.set_param_int(format!("ARG{}_WIDTH", index), sig.len() as i64);
                cell.set_param_bool(format!("ARG{}_SIGNED", index), *signed);
                args.append(sig);
                index += 1;
            }
        }
        cell.set_param("FORMAT", Const::from_string(&self.render()));
        cell.set_param_int("ARG_COUNT", index as i64);
        cell.set_param_int("ARGS_WIDTH", args.len() as i64);
        cell.set_port("ARGS", args);
    }
}
