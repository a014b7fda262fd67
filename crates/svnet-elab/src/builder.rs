//! Eagerly-folding cell constructors
//!
//! Each constructor returns a signal whose value equals the operator
//! applied to its inputs under the IR's semantics. When every operand is a
//! fully-defined constant the result is computed here via the IR's own
//! reference folding, so no cell is emitted; a handful of partial-constant
//! shapes also fold. Everything else lands as a cell on the canvas module.
//!
//! The builder never fails. Width preconditions are assertions.

use svnet_netlist::const_ops;
use svnet_netlist::{sig_zero, Const, Module, SigBit, SigSpec, State};

/// Three-valued logic over `{+1 (true), -1 (false), 0 (unknown)}`, used to
/// fold comparisons over signals containing X/Z.
pub mod three_valued {
    use svnet_netlist::{SigBit, State};

    pub fn and(a: i8, b: i8) -> i8 {
        if a < 0 || b < 0 {
            -1
        } else if a > 0 && b > 0 {
            1
        } else {
            0
        }
    }

    pub fn not(lit: i8) -> i8 {
        -lit
    }

    pub fn or(a: i8, b: i8) -> i8 {
        not(and(not(a), not(b)))
    }

    pub fn xor(a: i8, b: i8) -> i8 {
        or(and(a, not(b)), and(not(a), b))
    }

    pub fn xnor(a: i8, b: i8) -> i8 {
        not(xor(a, b))
    }

    pub fn carry(a: i8, b: i8, c: i8) -> i8 {
        if c > 0 {
            return or(a, b);
        }
        if c < 0 {
            return and(a, b);
        }
        or(and(a, b), and(c, or(a, b)))
    }

    /// Wire bits convert to unknown.
    pub fn convert(bit: SigBit) -> i8 {
        match bit {
            SigBit::Const(State::S1) => 1,
            SigBit::Const(State::S0) => -1,
            _ => 0,
        }
    }
}

pub struct Builder<'m> {
    pub canvas: &'m mut Module,
}

impl<'m> Builder<'m> {
    pub fn new(canvas: &'m mut Module) -> Self {
        Self { canvas }
    }

    fn cell_biop(
        &mut self,
        kind: &str,
        a: &SigSpec,
        b: &SigSpec,
        a_signed: bool,
        b_signed: bool,
        y_width: usize,
    ) -> SigSpec {
        let y = self.canvas.auto_wire(y_width);
        let name = self.canvas.auto_name("");
        let cell = self.canvas.add_cell(name, kind);
        cell.set_port("A", a.clone());
        cell.set_port("B", b.clone());
        cell.set_param_int("A_WIDTH", a.len() as i64);
        cell.set_param_int("B_WIDTH", b.len() as i64);
        cell.set_param_bool("A_SIGNED", a_signed);
        cell.set_param_bool("B_SIGNED", b_signed);
        cell.set_param_int("Y_WIDTH", y_width as i64);
        cell.set_port("Y", y.clone());
        y
    }

    fn cell_unop(&mut self, kind: &str, a: &SigSpec, a_signed: bool, y_width: usize) -> SigSpec {
        let y = self.canvas.auto_wire(y_width);
        let name = self.canvas.auto_name("");
        let cell = self.canvas.add_cell(name, kind);
        cell.set_port("A", a.clone());
        cell.set_param_int("A_WIDTH", a.len() as i64);
        cell.set_param_bool("A_SIGNED", a_signed);
        cell.set_param_int("Y_WIDTH", y_width as i64);
        cell.set_port("Y", y.clone());
        y
    }

    pub fn reduce_bool(&mut self, a: SigSpec) -> SigSpec {
        if a.is_fully_const() {
            return const_ops::const_reduce_bool(&a.as_const(), &Const::default(), false, false, Some(1))
                .into();
        }
        self.cell_unop("$reduce_bool", &a, false, 1)
    }

    pub fn sub(&mut self, a: SigSpec, b: SigSpec, is_signed: bool) -> SigSpec {
        if b.is_fully_ones() {
            return a;
        }
        if a.is_fully_const() && b.is_fully_const() {
            return const_ops::const_sub(
                &a.as_const(),
                &b.as_const(),
                is_signed,
                is_signed,
                Some(a.len().max(b.len()) + 1),
            )
            .into();
        }
        let y_width = a.len().max(b.len());
        self.cell_biop("$sub", &a, &b, is_signed, is_signed, y_width)
    }

    pub fn demux(&mut self, a: SigSpec, s: SigSpec) -> SigSpec {
        assert!(s.len() < 24);
        let zeropad = sig_zero(a.len());
        if s.is_fully_const() {
            let idx = s.as_const().as_int(false) as usize;
            let mut out = zeropad.repeat(idx);
            out.append(&a);
            out.append(&zeropad.repeat((1 << s.len()) - 1 - idx));
            return out;
        }
        let y_width = a.len() << s.len();
        let y = self.canvas.auto_wire(y_width);
        let name = self.canvas.auto_name("");
        let cell = self.canvas.add_cell(name, "$demux");
        cell.set_port("A", a.clone());
        cell.set_port("S", s.clone());
        cell.set_param_int("WIDTH", a.len() as i64);
        cell.set_param_int("S_WIDTH", s.len() as i64);
        cell.set_port("Y", y.clone());
        y
    }

    pub fn le(&mut self, a: SigSpec, b: SigSpec, is_signed: bool) -> SigSpec {
        if a.is_fully_const() && b.is_fully_const() {
            return const_ops::const_le(&a.as_const(), &b.as_const(), is_signed, is_signed, Some(1))
                .into();
        }
        self.cell_biop("$le", &a, &b, is_signed, is_signed, 1)
    }

    pub fn ge(&mut self, a: SigSpec, b: SigSpec, is_signed: bool) -> SigSpec {
        if a.is_fully_const() && b.is_fully_const() {
            return const_ops::const_ge(&a.as_const(), &b.as_const(), is_signed, is_signed, Some(1))
                .into();
        }
        self.cell_biop("$ge", &a, &b, is_signed, is_signed, 1)
    }

    pub fn lt(&mut self, a: SigSpec, b: SigSpec, is_signed: bool) -> SigSpec {
        if a.is_fully_const() && b.is_fully_const() {
            return const_ops::const_lt(&a.as_const(), &b.as_const(), is_signed, is_signed, Some(1))
                .into();
        }
        self.cell_biop("$lt", &a, &b, is_signed, is_signed, 1)
    }

    pub fn eq(&mut self, a: SigSpec, b: SigSpec) -> SigSpec {
        if a.is_fully_const() && b.is_fully_const() {
            return const_ops::const_eq(&a.as_const(), &b.as_const(), false, false, Some(1)).into();
        }
        self.cell_biop("$eq", &a, &b, false, false, 1)
    }

    /// Wildcard equality: X/Z bits of the constant `b` match anything.
    pub fn eq_wildcard(&mut self, a: SigSpec, b: SigSpec) -> SigSpec {
        assert_eq!(a.len(), b.len());
        assert!(b.is_fully_const());

        let mut a = a;
        let mut b = b;
        for i in (0..a.len()).rev() {
            if matches!(b[i], SigBit::Const(State::Sx) | SigBit::Const(State::Sz)) {
                a.remove(i);
                b.remove(i);
            }
        }
        assert_eq!(a.len(), b.len());
        if a.is_fully_const() && b.is_fully_const() {
            return const_ops::const_eq(&a.as_const(), &b.as_const(), false, false, Some(1)).into();
        }
        self.cell_biop("$eq", &a, &b, false, false, 1)
    }

    pub fn logic_and(&mut self, a: SigSpec, b: SigSpec) -> SigSpec {
        if a.is_fully_zero() || b.is_fully_zero() {
            return Const::from_int(0, 1).into();
        }
        if a.is_fully_def() && b.len() == 1 {
            return b;
        }
        if b.is_fully_def() && a.len() == 1 {
            return a;
        }
        self.cell_biop("$logic_and", &a, &b, false, false, 1)
    }

    pub fn logic_or(&mut self, a: SigSpec, b: SigSpec) -> SigSpec {
        if a.is_fully_ones() || b.is_fully_ones() {
            return Const::from_int(1, 1).into();
        }
        if a.is_fully_zero() && b.is_fully_zero() {
            return Const::from_int(0, 1).into();
        }
        self.cell_biop("$logic_or", &a, &b, false, false, 1)
    }

    pub fn logic_not(&mut self, a: SigSpec) -> SigSpec {
        if a.is_fully_const() {
            return const_ops::const_logic_not(&a.as_const(), &Const::default(), false, false, None)
                .into();
        }
        self.cell_unop("$logic_not", &a, false, 1)
    }

    pub fn mux(&mut self, a: SigSpec, b: SigSpec, s: SigSpec) -> SigSpec {
        assert_eq!(a.len(), b.len());
        assert_eq!(s.len(), 1);
        if s[0] == SigBit::Const(State::S0) {
            return a;
        }
        if s[0] == SigBit::Const(State::S1) {
            return b;
        }
        let y = self.canvas.auto_wire(a.len());
        let name = self.canvas.auto_name("");
        let cell = self.canvas.add_cell(name, "$mux");
        cell.set_param_int("WIDTH", a.len() as i64);
        cell.set_port("A", a);
        cell.set_port("B", b);
        cell.set_port("S", s);
        cell.set_port("Y", y.clone());
        y
    }

    /// Bit-wise mux: `s` selects per bit between `a` (0) and `b` (1).
    pub fn bwmux(&mut self, a: SigSpec, b: SigSpec, s: SigSpec) -> SigSpec {
        assert_eq!(a.len(), b.len());
        assert_eq!(a.len(), s.len());
        if s.is_fully_const() {
            let mut result = SigSpec::new();
            for i in 0..a.len() {
                result.push(match s[i] {
                    SigBit::Const(State::S0) => a[i],
                    SigBit::Const(State::S1) => b[i],
                    _ => SigBit::Const(State::Sx),
                });
            }
            return result;
        }
        let y = self.canvas.auto_wire(a.len());
        let name = self.canvas.auto_name("");
        let cell = self.canvas.add_cell(name, "$bwmux");
        cell.set_param_int("WIDTH", a.len() as i64);
        cell.set_port("A", a);
        cell.set_port("B", b);
        cell.set_port("S", s);
        cell.set_port("Y", y.clone());
        y
    }

    pub fn shift(
        &mut self,
        a: SigSpec,
        a_signed: bool,
        b: SigSpec,
        b_signed: bool,
        result_width: usize,
    ) -> SigSpec {
        if a.is_fully_const() && b.is_fully_const() {
            return const_ops::const_shift(
                &a.as_const(),
                &b.as_const(),
                a_signed,
                b_signed,
                Some(result_width),
            )
            .into();
        }

        if b.is_fully_const() && b.len() < 24 {
            assert!(!a.is_empty());
            let shift_amount = b.as_const().as_int(b_signed);
            let mut ret = SigSpec::new();
            let mut i = shift_amount;
            for _ in 0..result_width {
                if a_signed && i >= a.len() as i64 {
                    ret.push(a.msb());
                } else if i >= a.len() as i64 || i < 0 {
                    ret.push(State::S0);
                } else {
                    ret.push(a[i as usize]);
                }
                i += 1;
            }
            return ret;
        }

        self.cell_biop("$shift", &a, &b, a_signed, b_signed, result_width)
    }

    pub fn shiftx(
        &mut self,
        a: SigSpec,
        s: SigSpec,
        s_signed: bool,
        result_width: usize,
    ) -> SigSpec {
        if a.is_fully_const() && s.is_fully_const() {
            return const_ops::const_shiftx(
                &a.as_const(),
                &s.as_const(),
                false,
                s_signed,
                Some(result_width),
            )
            .into();
        }
        self.cell_biop("$shiftx", &a, &s, false, s_signed, result_width)
    }

    pub fn neg(&mut self, a: SigSpec, signed: bool) -> SigSpec {
        if a.is_fully_const() {
            return const_ops::const_neg(
                &a.as_const(),
                &Const::default(),
                signed,
                false,
                Some(a.len() + 1),
            )
            .into();
        }
        let y_width = a.len() + 1;
        self.cell_unop("$neg", &a, signed, y_width)
    }

    /// Bit-mux: select one stride-wide slot of `a` by index `s`.
    pub fn bmux(&mut self, a: SigSpec, s: SigSpec) -> SigSpec {
        assert!(a.len() % (1 << s.len()) == 0);
        assert!(a.len() >= 1 << s.len());
        let stride = a.len() >> s.len();
        if s.is_fully_def() {
            return a.extract(s.as_const().as_int(false) as usize * stride, stride);
        }
        let y = self.canvas.auto_wire(stride);
        let name = self.canvas.auto_name("");
        let cell = self.canvas.add_cell(name, "$bmux");
        cell.set_param_int("WIDTH", stride as i64);
        cell.set_param_int("S_WIDTH", s.len() as i64);
        cell.set_port("A", a);
        cell.set_port("S", s);
        cell.set_port("Y", y.clone());
        y
    }

    pub fn not(&mut self, a: SigSpec) -> SigSpec {
        if a.is_fully_const() {
            return const_ops::const_not(&a.as_const(), &Const::default(), false, false, None).into();
        }
        let y_width = a.len();
        self.cell_unop("$not", &a, false, y_width)
    }

    /// Generic binary operator by cell kind, with the comparison and logic
    /// short-circuits applied before any cell is emitted.
    pub fn biop(
        &mut self,
        kind: &str,
        a: SigSpec,
        b: SigSpec,
        a_signed: bool,
        b_signed: bool,
        y_width: usize,
    ) -> SigSpec {
        if a.is_fully_const() && b.is_fully_const() {
            if let Some(folded) = const_ops::fold_biop(
                kind,
                &a.as_const(),
                &b.as_const(),
                a_signed,
                b_signed,
                Some(y_width),
            ) {
                return folded.into();
            }
        }

        if matches!(kind, "$le" | "$lt" | "$gt" | "$ge") && !a.is_empty() && !b.is_empty() {
            // Defer to three-valued evaluation over a representation of the
            // operators; a definitively-known carry chain folds, an unknown
            // one falls through to the comparator cell below.
            let mut carry: i8 = if matches!(kind, "$le" | "$ge") { -1 } else { 1 };
            let width = a.len().max(b.len());
            let mut al = 0;
            let mut bl = 0;
            for i in 0..width {
                let abit = if i < a.len() {
                    a[i]
                } else if a_signed {
                    a.msb()
                } else {
                    SigBit::Const(State::S0)
                };
                let bbit = if i < b.len() {
                    b[i]
                } else if b_signed {
                    b.msb()
                } else {
                    SigBit::Const(State::S0)
                };
                al = three_valued::convert(abit);
                bl = three_valued::convert(bbit);
                if matches!(kind, "$gt" | "$ge") {
                    std::mem::swap(&mut al, &mut bl);
                }
                if i != width - 1 {
                    carry = three_valued::carry(al, three_valued::not(bl), carry);
                }
            }
            let result = three_valued::xor(carry, three_valued::xnor(al, bl));
            if result < 0 {
                return sig_zero(y_width);
            }
            if result > 0 {
                let mut ret: SigSpec = State::S1.into();
                ret.extend_u0(y_width, false);
                return ret;
            }
        }

        if kind == "$logic_and" && (a.is_fully_zero() || b.is_fully_zero()) {
            return sig_zero(y_width);
        }

        if kind == "$logic_or"
            && ((a.is_fully_const() && a.as_bool()) || (b.is_fully_const() && b.as_bool()))
        {
            let mut ret: SigSpec = State::S1.into();
            ret.extend_u0(y_width, false);
            return ret;
        }

        self.cell_biop(kind, &a, &b, a_signed, b_signed, y_width)
    }

    /// Generic unary operator by cell kind.
    pub fn unop(&mut self, kind: &str, a: SigSpec, a_signed: bool, y_width: usize) -> SigSpec {
        if a.is_fully_const() {
            if let Some(folded) =
                const_ops::fold_unop(kind, &a.as_const(), a_signed, Some(y_width))
            {
                return folded.into();
            }
        }
        self.cell_unop(kind, &a, a_signed, y_width)
    }
}
