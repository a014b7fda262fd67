//! Four-state constant values
//!
//! The front end folds every compile-time expression before handing the AST
//! over; the folded results arrive as [`ConstVal`]s. Integers keep their full
//! four-state bit image so X/Z survive the trip into the netlist.

use serde::{Deserialize, Serialize};

/// A single four-state logic level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Logic {
    Zero,
    One,
    X,
    Z,
}

impl Logic {
    /// True for 0/1, false for X/Z.
    pub fn is_defined(self) -> bool {
        matches!(self, Logic::Zero | Logic::One)
    }

    pub fn from_bool(b: bool) -> Self {
        if b {
            Logic::One
        } else {
            Logic::Zero
        }
    }
}

/// A four-state integer of arbitrary width, least-significant bit first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SvInt {
    pub bits: Vec<Logic>,
    pub signed: bool,
}

impl SvInt {
    pub fn new(bits: Vec<Logic>, signed: bool) -> Self {
        Self { bits, signed }
    }

    /// Build an unsigned value from the low `width` bits of `value`.
    pub fn from_u64(value: u64, width: usize) -> Self {
        let bits = (0..width)
            .map(|i| Logic::from_bool(i < 64 && (value >> i) & 1 != 0))
            .collect();
        Self {
            bits,
            signed: false,
        }
    }

    /// Build a signed value in two's complement at the given width.
    pub fn from_i64(value: i64, width: usize) -> Self {
        let bits = (0..width)
            .map(|i| {
                let bit = if i < 64 {
                    (value >> i) & 1 != 0
                } else {
                    value < 0
                };
                Logic::from_bool(bit)
            })
            .collect();
        Self { bits, signed: true }
    }

    /// A value with every bit set to `fill`.
    pub fn filled(width: usize, fill: Logic) -> Self {
        Self {
            bits: vec![fill; width],
            signed: false,
        }
    }

    /// The image of a string literal: one byte per character, first
    /// character in the most significant position.
    pub fn string_image(s: &str) -> Self {
        let mut bits = Vec::with_capacity(s.len() * 8);
        for byte in s.bytes().rev() {
            for i in 0..8 {
                bits.push(Logic::from_bool((byte >> i) & 1 != 0));
            }
        }
        Self {
            bits,
            signed: false,
        }
    }

    pub fn width(&self) -> usize {
        self.bits.len()
    }

    pub fn is_fully_defined(&self) -> bool {
        self.bits.iter().all(|b| b.is_defined())
    }

    /// Interpret as an integer. X/Z anywhere yields `None`; values that do
    /// not fit in an `i64` also yield `None`.
    pub fn as_i64(&self) -> Option<i64> {
        if !self.is_fully_defined() {
            return None;
        }
        let negative = self.signed && self.bits.last() == Some(&Logic::One);
        let mut value: i64 = if negative { -1 } else { 0 };
        for (i, bit) in self.bits.iter().enumerate() {
            if i >= 63 {
                // Anything beyond what an i64 can carry must agree with the
                // sign fill or the value is out of range.
                let fill = if negative { Logic::One } else { Logic::Zero };
                if *bit != fill {
                    return None;
                }
                continue;
            }
            match bit {
                Logic::One if !negative => value |= 1 << i,
                Logic::Zero if negative => value &= !(1 << i),
                _ => {}
            }
        }
        Some(value)
    }
}

/// A folded constant: an integer, an unpacked aggregate, or a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstVal {
    Int(SvInt),
    Unpacked(Vec<ConstVal>),
    Str(String),
}

impl ConstVal {
    pub fn integer(&self) -> Option<&SvInt> {
        match self {
            ConstVal::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.integer().and_then(SvInt::as_i64)
    }

    /// Flattened width in bits.
    pub fn bitstream_width(&self) -> usize {
        match self {
            ConstVal::Int(v) => v.width(),
            ConstVal::Unpacked(elems) => elems.iter().map(ConstVal::bitstream_width).sum(),
            ConstVal::Str(s) => s.len() * 8,
        }
    }
}

impl From<SvInt> for ConstVal {
    fn from(v: SvInt) -> Self {
        ConstVal::Int(v)
    }
}
