//! Four-state constants and the bit-vector signal algebra
//!
//! A [`SigSpec`] is an ordered sequence of bits, least significant first.
//! Each bit is either a constant logic level or a reference to one bit of a
//! module wire. Signals are plain values; wires are referenced by identity
//! (`WireId` plus offset), never by ownership.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A logic level: 0, 1, unknown, or high-impedance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum State {
    S0,
    S1,
    Sx,
    Sz,
}

impl State {
    pub fn is_defined(self) -> bool {
        matches!(self, State::S0 | State::S1)
    }

    pub fn from_bool(b: bool) -> Self {
        if b {
            State::S1
        } else {
            State::S0
        }
    }

    pub fn to_char(self) -> char {
        match self {
            State::S0 => '0',
            State::S1 => '1',
            State::Sx => 'x',
            State::Sz => 'z',
        }
    }
}

/// A constant bit vector, least significant bit first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Const {
    pub bits: Vec<State>,
    /// Marks constants that originate from string literals.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub flag_string: bool,
}

impl Const {
    pub fn new(bits: Vec<State>) -> Self {
        Self {
            bits,
            flag_string: false,
        }
    }

    /// Two's complement image of `value` at the given width.
    pub fn from_int(value: i64, width: usize) -> Self {
        let bits = (0..width)
            .map(|i| {
                let bit = if i < 64 {
                    (value >> i) & 1 != 0
                } else {
                    value < 0
                };
                State::from_bool(bit)
            })
            .collect();
        Self::new(bits)
    }

    pub fn from_bool(b: bool) -> Self {
        Self::new(vec![State::from_bool(b)])
    }

    /// String image: one byte per character, first character highest.
    pub fn from_string(s: &str) -> Self {
        let mut bits = Vec::with_capacity(s.len() * 8);
        for byte in s.bytes().rev() {
            for i in 0..8 {
                bits.push(State::from_bool((byte >> i) & 1 != 0));
            }
        }
        Self {
            bits,
            flag_string: true,
        }
    }

    pub fn filled(width: usize, fill: State) -> Self {
        Self::new(vec![fill; width])
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn bit(&self, index: usize) -> State {
        self.bits[index]
    }

    pub fn msb(&self) -> State {
        *self.bits.last().expect("msb of empty constant")
    }

    pub fn is_fully_def(&self) -> bool {
        self.bits.iter().all(|b| b.is_defined())
    }

    pub fn is_fully_zero(&self) -> bool {
        self.bits.iter().all(|b| *b == State::S0)
    }

    pub fn is_fully_ones(&self) -> bool {
        self.bits.iter().all(|b| *b == State::S1)
    }

    pub fn is_fully_undef(&self) -> bool {
        self.bits.iter().all(|b| !b.is_defined())
    }

    /// Integer interpretation; bits that are not `S1` count as zero, and a
    /// signed read takes the most significant bit as sign.
    pub fn as_int(&self, signed: bool) -> i64 {
        let negative = signed && self.bits.last() == Some(&State::S1);
        let mut value: i64 = if negative { -1 } else { 0 };
        for (i, bit) in self.bits.iter().enumerate().take(63) {
            if *bit == State::S1 {
                value |= 1 << i;
            } else if negative {
                value &= !(1 << i);
            }
        }
        value
    }

    /// True if any bit is 1.
    pub fn as_bool(&self) -> bool {
        self.bits.contains(&State::S1)
    }

    /// Resize to `width`, filling with the sign bit when `signed`, zero
    /// otherwise. Truncates when shrinking.
    pub fn extend_u0(&self, width: usize, signed: bool) -> Const {
        let mut bits = self.bits.clone();
        if bits.len() > width {
            bits.truncate(width);
        } else {
            let fill = if signed && !bits.is_empty() {
                *bits.last().unwrap()
            } else {
                State::S0
            };
            bits.resize(width, fill);
        }
        Const {
            bits,
            flag_string: false,
        }
    }

    /// Decode a string-flagged constant back into text.
    pub fn as_string(&self) -> String {
        let mut out = Vec::with_capacity(self.bits.len() / 8);
        for chunk in self.bits.chunks(8).rev() {
            let mut byte = 0u8;
            for (i, bit) in chunk.iter().enumerate() {
                if *bit == State::S1 {
                    byte |= 1 << i;
                }
            }
            out.push(byte);
        }
        String::from_utf8_lossy(&out).into_owned()
    }
}

/// Identity of a wire within its module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WireId(pub u32);

/// One bit of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SigBit {
    Const(State),
    Wire { wire: WireId, offset: u32 },
}

impl SigBit {
    pub fn wire(wire: WireId, offset: u32) -> Self {
        SigBit::Wire { wire, offset }
    }

    pub fn is_wire(&self) -> bool {
        matches!(self, SigBit::Wire { .. })
    }

    /// Ordering key: wire bits sort by identity, constants sort last.
    fn sort_key(&self) -> (u32, u32, u32) {
        match self {
            SigBit::Wire { wire, offset } => (0, wire.0, *offset),
            SigBit::Const(s) => (1, *s as u32, 0),
        }
    }
}

impl From<State> for SigBit {
    fn from(s: State) -> Self {
        SigBit::Const(s)
    }
}

/// An ordered sequence of signal bits, least significant first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SigSpec {
    bits: Vec<SigBit>,
}

impl SigSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_const(value: &Const) -> Self {
        Self {
            bits: value.bits.iter().map(|&s| SigBit::Const(s)).collect(),
        }
    }

    pub fn from_bit(bit: SigBit) -> Self {
        Self { bits: vec![bit] }
    }

    /// `width` copies of the given state.
    pub fn filled(state: State, width: usize) -> Self {
        Self {
            bits: vec![SigBit::Const(state); width],
        }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn bit(&self, index: usize) -> SigBit {
        self.bits[index]
    }

    pub fn msb(&self) -> SigBit {
        *self.bits.last().expect("msb of empty signal")
    }

    pub fn bits(&self) -> &[SigBit] {
        &self.bits
    }

    pub fn iter(&self) -> impl Iterator<Item = SigBit> + '_ {
        self.bits.iter().copied()
    }

    pub fn push(&mut self, bit: impl Into<SigBit>) {
        self.bits.push(bit.into());
    }

    /// Append `other` above the current most significant bit.
    pub fn append(&mut self, other: &SigSpec) {
        self.bits.extend_from_slice(&other.bits);
    }

    pub fn extract(&self, offset: usize, length: usize) -> SigSpec {
        SigSpec {
            bits: self.bits[offset..offset + length].to_vec(),
        }
    }

    pub fn remove(&mut self, index: usize) {
        self.bits.remove(index);
    }

    /// The whole signal repeated `count` times.
    pub fn repeat(&self, count: usize) -> SigSpec {
        let mut bits = Vec::with_capacity(self.bits.len() * count);
        for _ in 0..count {
            bits.extend_from_slice(&self.bits);
        }
        SigSpec { bits }
    }

    /// Rewrite every bit that appears as a key in `map`.
    pub fn replace(&mut self, map: &HashMap<SigBit, SigBit>) {
        for bit in &mut self.bits {
            if let Some(new) = map.get(bit) {
                *bit = *new;
            }
        }
    }

    /// `replace` on a copy.
    pub fn replaced(&self, map: &HashMap<SigBit, SigBit>) -> SigSpec {
        let mut copy = self.clone();
        copy.replace(map);
        copy
    }

    /// Resize, filling with the sign bit when `signed`, zero otherwise.
    pub fn extend_u0(&mut self, width: usize, signed: bool) {
        if self.bits.len() > width {
            self.bits.truncate(width);
        } else {
            let fill = if signed && !self.bits.is_empty() {
                *self.bits.last().unwrap()
            } else {
                SigBit::Const(State::S0)
            };
            self.bits.resize(width, fill);
        }
    }

    pub fn is_fully_const(&self) -> bool {
        self.bits.iter().all(|b| matches!(b, SigBit::Const(_)))
    }

    pub fn is_fully_def(&self) -> bool {
        self.bits
            .iter()
            .all(|b| matches!(b, SigBit::Const(s) if s.is_defined()))
    }

    pub fn is_fully_zero(&self) -> bool {
        self.bits
            .iter()
            .all(|b| matches!(b, SigBit::Const(State::S0)))
    }

    pub fn is_fully_ones(&self) -> bool {
        self.bits
            .iter()
            .all(|b| matches!(b, SigBit::Const(State::S1)))
    }

    /// The constant image of a fully-constant signal.
    ///
    /// Panics if any bit refers to a wire.
    pub fn as_const(&self) -> Const {
        let bits = self
            .bits
            .iter()
            .map(|b| match b {
                SigBit::Const(s) => *s,
                SigBit::Wire { .. } => panic!("as_const on non-constant signal"),
            })
            .collect();
        Const::new(bits)
    }

    pub fn as_bool(&self) -> bool {
        self.as_const().as_bool()
    }

    pub fn sort(&mut self) {
        self.bits.sort_by_key(|b| b.sort_key());
    }

    /// Sort by identity and drop duplicates.
    pub fn sort_and_unify(&mut self) {
        self.sort();
        self.bits.dedup();
    }

    /// Split into maximal runs that are either consecutive bits of one wire
    /// (ascending offsets) or constants.
    pub fn chunks(&self) -> Vec<SigSpec> {
        let mut out: Vec<SigSpec> = Vec::new();
        for &bit in &self.bits {
            let extends = match (out.last(), bit) {
                (Some(chunk), SigBit::Wire { wire, offset }) => match chunk.msb() {
                    SigBit::Wire {
                        wire: prev_wire,
                        offset: prev_offset,
                    } => prev_wire == wire && prev_offset + 1 == offset,
                    _ => false,
                },
                (Some(chunk), SigBit::Const(_)) => matches!(chunk.msb(), SigBit::Const(_)),
                (None, _) => false,
            };
            if extends {
                out.last_mut().unwrap().push(bit);
            } else {
                out.push(SigSpec::from_bit(bit));
            }
        }
        out
    }
}

impl From<Const> for SigSpec {
    fn from(value: Const) -> Self {
        SigSpec::from_const(&value)
    }
}

impl From<State> for SigSpec {
    fn from(state: State) -> Self {
        SigSpec::from_bit(SigBit::Const(state))
    }
}

impl std::ops::Index<usize> for SigSpec {
    type Output = SigBit;

    fn index(&self, index: usize) -> &SigBit {
        &self.bits[index]
    }
}
