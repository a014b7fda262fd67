//! Elaborated type representations
//!
//! Types arrive fully resolved: parameters substituted, typedefs collapsed,
//! struct layouts computed. Only fixed-size constructs are representable.

use crate::consts::{ConstVal, Logic, SvInt};
use serde::{Deserialize, Serialize};

/// A constant `[left:right]` range as written in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantRange {
    pub left: i64,
    pub right: i64,
}

impl ConstantRange {
    pub fn new(left: i64, right: i64) -> Self {
        Self { left, right }
    }

    pub fn width(&self) -> usize {
        (self.left - self.right).unsigned_abs() as usize + 1
    }

    pub fn lower(&self) -> i64 {
        self.left.min(self.right)
    }

    pub fn upper(&self) -> i64 {
        self.left.max(self.right)
    }

    /// Descending ranges (`[7:0]`) store their low index on the right.
    pub fn is_descending(&self) -> bool {
        self.right <= self.left
    }

    /// Translate a source index to a 0-based offset from the low end of the
    /// underlying bit storage.
    pub fn translate_index(&self, index: i64) -> i64 {
        if self.is_descending() {
            index - self.lower()
        } else {
            self.upper() - index
        }
    }
}

/// One field of a packed struct, with its precomputed bit offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructField {
    pub name: String,
    pub ty: Type,
    pub bit_offset: usize,
}

/// An elaborated, fixed-size type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
    /// A bit vector, optionally signed, two- or four-state, with the
    /// declared range if one was written.
    Bits {
        width: usize,
        signed: bool,
        four_state: bool,
        range: Option<ConstantRange>,
    },
    /// A fixed-size array of equally-sized elements.
    Array {
        elem: Box<Type>,
        range: ConstantRange,
    },
    /// A packed struct.
    Struct { fields: Vec<StructField> },
}

impl Type {
    /// Unsigned four-state vector, `logic [width-1:0]`.
    pub fn logic(width: usize) -> Self {
        Type::Bits {
            width,
            signed: false,
            four_state: true,
            range: None,
        }
    }

    /// Signed four-state vector.
    pub fn logic_signed(width: usize) -> Self {
        Type::Bits {
            width,
            signed: true,
            four_state: true,
            range: None,
        }
    }

    /// Two-state vector, `bit [width-1:0]`.
    pub fn bit(width: usize) -> Self {
        Type::Bits {
            width,
            signed: false,
            four_state: false,
            range: None,
        }
    }

    /// 32-bit signed two-state `int`.
    pub fn int() -> Self {
        Type::Bits {
            width: 32,
            signed: true,
            four_state: false,
            range: None,
        }
    }

    /// Number of bits the value occupies when flattened.
    pub fn bitstream_width(&self) -> usize {
        match self {
            Type::Bits { width, .. } => *width,
            Type::Array { elem, range } => elem.bitstream_width() * range.width(),
            Type::Struct { fields } => fields.iter().map(|f| f.ty.bitstream_width()).sum(),
        }
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, Type::Bits { signed: true, .. })
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, Type::Bits { .. })
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array { .. })
    }

    /// Everything representable here is fixed-size.
    pub fn is_fixed_size(&self) -> bool {
        true
    }

    /// The declared index range, for types that can be selected into.
    /// Vectors without an explicit range behave as `[width-1:0]`.
    pub fn fixed_range(&self) -> Option<ConstantRange> {
        match self {
            Type::Bits { width, range, .. } => {
                Some(range.unwrap_or(ConstantRange::new(*width as i64 - 1, 0)))
            }
            Type::Array { range, .. } => Some(*range),
            Type::Struct { .. } => None,
        }
    }

    fn is_four_state(&self) -> bool {
        match self {
            Type::Bits { four_state, .. } => *four_state,
            Type::Array { elem, .. } => elem.is_four_state(),
            Type::Struct { fields } => fields.iter().any(|f| f.ty.is_four_state()),
        }
    }

    /// The value a variable of this type holds before initialization:
    /// all-X for four-state types, all-0 for two-state.
    pub fn default_value(&self) -> ConstVal {
        let fill = if self.is_four_state() {
            Logic::X
        } else {
            Logic::Zero
        };
        ConstVal::Int(SvInt::filled(self.bitstream_width(), fill))
    }
}
