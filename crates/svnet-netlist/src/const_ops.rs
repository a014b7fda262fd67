//! Reference constant folding for every primitive cell operator
//!
//! These functions define the IR's evaluation semantics over four-state
//! constants. Elaboration-time folding must match them bit for bit, so the
//! eager folds in the elaborator's builder all route through here.
//!
//! X/Z propagation rules: arithmetic with any undefined operand bit yields
//! an all-X result; bitwise operators use per-bit three-valued truth
//! tables; comparisons yield X unless decidable; shifts by an undefined
//! amount yield all-X.

use crate::sig::{Const, State};
use num_bigint::BigInt;
use num_traits::{One, Pow, Signed, ToPrimitive, Zero};

/// Integer image of a fully-defined constant, or `None` if any bit is X/Z.
fn to_big(value: &Const, signed: bool) -> Option<BigInt> {
    let mut out = BigInt::zero();
    for (i, bit) in value.bits.iter().enumerate() {
        match bit {
            State::S1 => out.set_bit(i as u64, true),
            State::S0 => {}
            _ => return None,
        }
    }
    if signed && value.bits.last() == Some(&State::S1) {
        out -= BigInt::one() << value.len();
    }
    Some(out)
}

/// Two's complement truncation of `value` to `width` bits.
fn from_big(value: &BigInt, width: usize) -> Const {
    let bits = (0..width)
        .map(|i| State::from_bool(value.bit(i as u64)))
        .collect();
    Const::new(bits)
}

fn undef(width: usize) -> Const {
    Const::filled(width, State::Sx)
}

fn bool_const(value: bool, width: usize) -> Const {
    Const::from_bool(value).extend_u0(width, false)
}

/// Three-valued truth value of a whole vector: 1 if any bit is 1, 0 if all
/// bits are defined zero, X otherwise.
fn bool3(value: &Const) -> State {
    if value.bits.contains(&State::S1) {
        State::S1
    } else if value.is_fully_def() {
        State::S0
    } else {
        State::Sx
    }
}

fn natural(result_len: Option<usize>, fallback: usize) -> usize {
    result_len.unwrap_or(fallback)
}

// --- arithmetic -----------------------------------------------------------

fn arith(
    a: &Const,
    b: &Const,
    signed_a: bool,
    signed_b: bool,
    width: usize,
    f: impl FnOnce(BigInt, BigInt) -> Option<BigInt>,
) -> Const {
    match (to_big(a, signed_a), to_big(b, signed_b)) {
        (Some(av), Some(bv)) => match f(av, bv) {
            Some(v) => from_big(&v, width),
            None => undef(width),
        },
        _ => undef(width),
    }
}

pub fn const_add(a: &Const, b: &Const, signed_a: bool, signed_b: bool, result_len: Option<usize>) -> Const {
    let width = natural(result_len, a.len().max(b.len()) + 1);
    arith(a, b, signed_a, signed_b, width, |x, y| Some(x + y))
}

pub fn const_sub(a: &Const, b: &Const, signed_a: bool, signed_b: bool, result_len: Option<usize>) -> Const {
    let width = natural(result_len, a.len().max(b.len()) + 1);
    arith(a, b, signed_a, signed_b, width, |x, y| Some(x - y))
}

pub fn const_mul(a: &Const, b: &Const, signed_a: bool, signed_b: bool, result_len: Option<usize>) -> Const {
    let width = natural(result_len, a.len() + b.len());
    arith(a, b, signed_a, signed_b, width, |x, y| Some(x * y))
}

/// Division truncating toward zero; division by zero is all-X.
pub fn const_div(a: &Const, b: &Const, signed_a: bool, signed_b: bool, result_len: Option<usize>) -> Const {
    let width = natural(result_len, a.len());
    arith(a, b, signed_a, signed_b, width, |x, y| {
        if y.is_zero() {
            None
        } else {
            Some(x / y)
        }
    })
}

/// Division rounding toward negative infinity.
pub fn const_divfloor(a: &Const, b: &Const, signed_a: bool, signed_b: bool, result_len: Option<usize>) -> Const {
    let width = natural(result_len, a.len());
    arith(a, b, signed_a, signed_b, width, |x, y| {
        if y.is_zero() {
            return None;
        }
        let q = &x / &y;
        let r = &x - &q * &y;
        if !r.is_zero() && (r.is_negative() != y.is_negative()) {
            Some(q - BigInt::one())
        } else {
            Some(q)
        }
    })
}

/// Remainder with the sign of the dividend.
pub fn const_mod(a: &Const, b: &Const, signed_a: bool, signed_b: bool, result_len: Option<usize>) -> Const {
    let width = natural(result_len, a.len());
    arith(a, b, signed_a, signed_b, width, |x, y| {
        if y.is_zero() {
            None
        } else {
            Some(x % y)
        }
    })
}

pub fn const_pow(a: &Const, b: &Const, signed_a: bool, signed_b: bool, result_len: Option<usize>) -> Const {
    let width = natural(result_len, a.len());
    arith(a, b, signed_a, signed_b, width, |base, exp| {
        if exp.is_negative() {
            // Only +/-1 survive a negative exponent in integer arithmetic.
            if base == BigInt::one() {
                Some(BigInt::one())
            } else if base == -BigInt::one() {
                let odd = exp.bit(0);
                Some(if odd { -BigInt::one() } else { BigInt::one() })
            } else {
                Some(BigInt::zero())
            }
        } else {
            let exp = exp.to_u32()?;
            Some(Pow::pow(base, exp))
        }
    })
}

pub fn const_neg(a: &Const, _b: &Const, signed_a: bool, _signed_b: bool, result_len: Option<usize>) -> Const {
    let width = natural(result_len, a.len() + 1);
    match to_big(a, signed_a) {
        Some(v) => from_big(&-v, width),
        None => undef(width),
    }
}

pub fn const_pos(a: &Const, _b: &Const, signed_a: bool, _signed_b: bool, result_len: Option<usize>) -> Const {
    let width = natural(result_len, a.len());
    a.extend_u0(width, signed_a)
}

// --- bitwise --------------------------------------------------------------

fn bit_and(a: State, b: State) -> State {
    match (a, b) {
        (State::S0, _) | (_, State::S0) => State::S0,
        (State::S1, State::S1) => State::S1,
        _ => State::Sx,
    }
}

fn bit_or(a: State, b: State) -> State {
    match (a, b) {
        (State::S1, _) | (_, State::S1) => State::S1,
        (State::S0, State::S0) => State::S0,
        _ => State::Sx,
    }
}

fn bit_xor(a: State, b: State) -> State {
    match (a, b) {
        (State::S0, State::S0) | (State::S1, State::S1) => State::S0,
        (State::S0, State::S1) | (State::S1, State::S0) => State::S1,
        _ => State::Sx,
    }
}

fn bit_not(a: State) -> State {
    match a {
        State::S0 => State::S1,
        State::S1 => State::S0,
        _ => State::Sx,
    }
}

fn bitwise(
    a: &Const,
    b: &Const,
    signed_a: bool,
    signed_b: bool,
    result_len: Option<usize>,
    f: impl Fn(State, State) -> State,
) -> Const {
    let inner = a.len().max(b.len());
    let ax = a.extend_u0(inner, signed_a);
    let bx = b.extend_u0(inner, signed_b);
    let bits = (0..inner).map(|i| f(ax.bit(i), bx.bit(i))).collect();
    Const::new(bits).extend_u0(natural(result_len, inner), signed_a && signed_b)
}

pub fn const_and(a: &Const, b: &Const, signed_a: bool, signed_b: bool, result_len: Option<usize>) -> Const {
    bitwise(a, b, signed_a, signed_b, result_len, bit_and)
}

pub fn const_or(a: &Const, b: &Const, signed_a: bool, signed_b: bool, result_len: Option<usize>) -> Const {
    bitwise(a, b, signed_a, signed_b, result_len, bit_or)
}

pub fn const_xor(a: &Const, b: &Const, signed_a: bool, signed_b: bool, result_len: Option<usize>) -> Const {
    bitwise(a, b, signed_a, signed_b, result_len, bit_xor)
}

pub fn const_xnor(a: &Const, b: &Const, signed_a: bool, signed_b: bool, result_len: Option<usize>) -> Const {
    bitwise(a, b, signed_a, signed_b, result_len, |x, y| {
        bit_not(bit_xor(x, y))
    })
}

pub fn const_not(a: &Const, _b: &Const, signed_a: bool, _signed_b: bool, result_len: Option<usize>) -> Const {
    let width = natural(result_len, a.len());
    let ax = a.extend_u0(width, signed_a);
    Const::new(ax.bits.iter().map(|&s| bit_not(s)).collect())
}

// --- logic and reductions -------------------------------------------------

fn logic_biop(
    a: &Const,
    b: &Const,
    result_len: Option<usize>,
    f: impl FnOnce(State, State) -> State,
) -> Const {
    let bit = f(bool3(a), bool3(b));
    Const::new(vec![bit]).extend_u0(natural(result_len, 1), false)
}

pub fn const_logic_and(a: &Const, b: &Const, _sa: bool, _sb: bool, result_len: Option<usize>) -> Const {
    logic_biop(a, b, result_len, bit_and)
}

pub fn const_logic_or(a: &Const, b: &Const, _sa: bool, _sb: bool, result_len: Option<usize>) -> Const {
    logic_biop(a, b, result_len, bit_or)
}

pub fn const_logic_not(a: &Const, _b: &Const, _sa: bool, _sb: bool, result_len: Option<usize>) -> Const {
    Const::new(vec![bit_not(bool3(a))]).extend_u0(natural(result_len, 1), false)
}

pub fn const_reduce_and(a: &Const, _b: &Const, _sa: bool, _sb: bool, result_len: Option<usize>) -> Const {
    let bit = if a.bits.contains(&State::S0) {
        State::S0
    } else if a.is_fully_def() {
        State::S1
    } else {
        State::Sx
    };
    Const::new(vec![bit]).extend_u0(natural(result_len, 1), false)
}

pub fn const_reduce_or(a: &Const, _b: &Const, _sa: bool, _sb: bool, result_len: Option<usize>) -> Const {
    Const::new(vec![bool3(a)]).extend_u0(natural(result_len, 1), false)
}

pub fn const_reduce_xor(a: &Const, _b: &Const, _sa: bool, _sb: bool, result_len: Option<usize>) -> Const {
    let bit = if a.is_fully_def() {
        let ones = a.bits.iter().filter(|&&b| b == State::S1).count();
        State::from_bool(ones % 2 == 1)
    } else {
        State::Sx
    };
    Const::new(vec![bit]).extend_u0(natural(result_len, 1), false)
}

pub fn const_reduce_xnor(a: &Const, b: &Const, sa: bool, sb: bool, result_len: Option<usize>) -> Const {
    let inner = const_reduce_xor(a, b, sa, sb, Some(1));
    Const::new(vec![bit_not(inner.bit(0))]).extend_u0(natural(result_len, 1), false)
}

pub fn const_reduce_bool(a: &Const, _b: &Const, _sa: bool, _sb: bool, result_len: Option<usize>) -> Const {
    Const::new(vec![bool3(a)]).extend_u0(natural(result_len, 1), false)
}

// --- comparisons ----------------------------------------------------------

pub fn const_eq(a: &Const, b: &Const, signed_a: bool, signed_b: bool, result_len: Option<usize>) -> Const {
    let inner = a.len().max(b.len());
    let ax = a.extend_u0(inner, signed_a);
    let bx = b.extend_u0(inner, signed_b);
    let mut matched = State::S1;
    for i in 0..inner {
        let (abit, bbit) = (ax.bit(i), bx.bit(i));
        if abit.is_defined() && bbit.is_defined() {
            if abit != bbit {
                matched = State::S0;
                break;
            }
        } else {
            matched = State::Sx;
        }
    }
    Const::new(vec![matched]).extend_u0(natural(result_len, 1), false)
}

pub fn const_ne(a: &Const, b: &Const, signed_a: bool, signed_b: bool, result_len: Option<usize>) -> Const {
    let eq = const_eq(a, b, signed_a, signed_b, Some(1));
    Const::new(vec![bit_not(eq.bit(0))]).extend_u0(natural(result_len, 1), false)
}

/// Four-state exact equality (`===`), always defined.
pub fn const_eqx(a: &Const, b: &Const, signed_a: bool, signed_b: bool, result_len: Option<usize>) -> Const {
    let inner = a.len().max(b.len());
    let ax = a.extend_u0(inner, signed_a);
    let bx = b.extend_u0(inner, signed_b);
    bool_const(ax.bits == bx.bits, natural(result_len, 1))
}

pub fn const_nex(a: &Const, b: &Const, signed_a: bool, signed_b: bool, result_len: Option<usize>) -> Const {
    let eqx = const_eqx(a, b, signed_a, signed_b, Some(1));
    bool_const(eqx.bit(0) == State::S0, natural(result_len, 1))
}

fn ordering(
    a: &Const,
    b: &Const,
    signed_a: bool,
    signed_b: bool,
    result_len: Option<usize>,
    f: impl FnOnce(&BigInt, &BigInt) -> bool,
) -> Const {
    let width = natural(result_len, 1);
    match (to_big(a, signed_a), to_big(b, signed_b)) {
        (Some(av), Some(bv)) => bool_const(f(&av, &bv), width),
        _ => undef(width),
    }
}

pub fn const_lt(a: &Const, b: &Const, sa: bool, sb: bool, result_len: Option<usize>) -> Const {
    ordering(a, b, sa, sb, result_len, |x, y| x < y)
}

pub fn const_le(a: &Const, b: &Const, sa: bool, sb: bool, result_len: Option<usize>) -> Const {
    ordering(a, b, sa, sb, result_len, |x, y| x <= y)
}

pub fn const_gt(a: &Const, b: &Const, sa: bool, sb: bool, result_len: Option<usize>) -> Const {
    ordering(a, b, sa, sb, result_len, |x, y| x > y)
}

pub fn const_ge(a: &Const, b: &Const, sa: bool, sb: bool, result_len: Option<usize>) -> Const {
    ordering(a, b, sa, sb, result_len, |x, y| x >= y)
}

// --- shifts ---------------------------------------------------------------

/// Shared kernel: result bit `j` reads `a[shift + j]`, filling with the
/// sign bit above `a` when `sign_fill`, with `fill` elsewhere out of range.
fn shift_kernel(a: &Const, shift: i64, width: usize, sign_fill: bool, fill: State) -> Const {
    let bits = (0..width as i64)
        .map(|j| {
            let i = shift + j;
            if i >= 0 && (i as usize) < a.len() {
                a.bit(i as usize)
            } else if sign_fill && i >= a.len() as i64 {
                a.msb()
            } else {
                fill
            }
        })
        .collect();
    Const::new(bits)
}

/// Logical shift left; the shift amount is always read unsigned.
pub fn const_shl(a: &Const, b: &Const, signed_a: bool, _signed_b: bool, result_len: Option<usize>) -> Const {
    let width = natural(result_len, a.len());
    match to_big(b, false) {
        Some(n) => {
            let ax = a.extend_u0(width, signed_a);
            match n.to_i64() {
                Some(n) => shift_kernel(&ax, -n, width, false, State::S0),
                None => Const::filled(width, State::S0),
            }
        }
        None => undef(width),
    }
}

pub fn const_sshl(a: &Const, b: &Const, signed_a: bool, signed_b: bool, result_len: Option<usize>) -> Const {
    const_shl(a, b, signed_a, signed_b, result_len)
}

/// Logical shift right, zero-filling.
pub fn const_shr(a: &Const, b: &Const, signed_a: bool, _signed_b: bool, result_len: Option<usize>) -> Const {
    let width = natural(result_len, a.len());
    match to_big(b, false) {
        Some(n) => {
            let ax = a.extend_u0(width.max(a.len()), signed_a);
            match n.to_i64() {
                Some(n) => shift_kernel(&ax, n, width, false, State::S0),
                None => Const::filled(width, State::S0),
            }
        }
        None => undef(width),
    }
}

/// Arithmetic shift right: sign-fills when `a` is signed.
pub fn const_sshr(a: &Const, b: &Const, signed_a: bool, _signed_b: bool, result_len: Option<usize>) -> Const {
    let width = natural(result_len, a.len());
    match to_big(b, false) {
        Some(n) => match n.to_i64() {
            Some(n) => shift_kernel(a, n, width, signed_a, State::S0),
            None => {
                let fill = if signed_a { a.msb() } else { State::S0 };
                Const::filled(width, fill)
            }
        },
        None => undef(width),
    }
}

/// Variable shifter: positive amounts shift right, negative shift left;
/// sign-fills above `a` when `a` is signed, zero-fills otherwise.
pub fn const_shift(a: &Const, b: &Const, signed_a: bool, signed_b: bool, result_len: Option<usize>) -> Const {
    let width = natural(result_len, a.len());
    match to_big(b, signed_b) {
        Some(n) => match n.to_i64() {
            Some(n) => shift_kernel(a, n, width, signed_a, State::S0),
            None => Const::filled(width, State::S0),
        },
        None => undef(width),
    }
}

/// Like `const_shift` but X-fills out-of-range bits and ignores the sign
/// of `a`.
pub fn const_shiftx(a: &Const, b: &Const, _signed_a: bool, signed_b: bool, result_len: Option<usize>) -> Const {
    let width = natural(result_len, a.len());
    match to_big(b, signed_b) {
        Some(n) => match n.to_i64() {
            Some(n) => shift_kernel(a, n, width, false, State::Sx),
            None => Const::filled(width, State::Sx),
        },
        None => undef(width),
    }
}

/// Dispatch a binary operator by cell kind name.
pub fn fold_biop(
    kind: &str,
    a: &Const,
    b: &Const,
    signed_a: bool,
    signed_b: bool,
    result_len: Option<usize>,
) -> Option<Const> {
    let f = match kind {
        "$add" => const_add,
        "$sub" => const_sub,
        "$mul" => const_mul,
        "$div" => const_div,
        "$divfloor" => const_divfloor,
        "$mod" => const_mod,
        "$pow" => const_pow,
        "$and" => const_and,
        "$or" => const_or,
        "$xor" => const_xor,
        "$xnor" => const_xnor,
        "$eq" => const_eq,
        "$ne" => const_ne,
        "$eqx" => const_eqx,
        "$nex" => const_nex,
        "$ge" => const_ge,
        "$gt" => const_gt,
        "$le" => const_le,
        "$lt" => const_lt,
        "$logic_and" => const_logic_and,
        "$logic_or" => const_logic_or,
        "$shl" => const_shl,
        "$shr" => const_shr,
        "$sshl" => const_sshl,
        "$sshr" => const_sshr,
        "$shift" => const_shift,
        "$shiftx" => const_shiftx,
        _ => return None,
    };
    Some(f(a, b, signed_a, signed_b, result_len))
}

/// Dispatch a unary operator by cell kind name.
pub fn fold_unop(
    kind: &str,
    a: &Const,
    signed_a: bool,
    result_len: Option<usize>,
) -> Option<Const> {
    let empty = Const::default();
    let f = match kind {
        "$pos" => const_pos,
        "$neg" => const_neg,
        "$not" => const_not,
        "$logic_not" => const_logic_not,
        "$reduce_and" => const_reduce_and,
        "$reduce_or" => const_reduce_or,
        "$reduce_xor" => const_reduce_xor,
        "$reduce_xnor" => const_reduce_xnor,
        "$reduce_bool" => const_reduce_bool,
        _ => return None,
    };
    Some(f(a, &empty, signed_a, false, result_len))
}
