//! Expression lowering
//!
//! Translates typed AST expressions into bit-vector signals, in two modes:
//! rvalue (reads and computations) and lvalue (assignment targets). The
//! rvalue path carries an optional procedure context holding the blocking-
//! assignment substitutions and function formal-argument bindings.
//!
//! Post-condition of every rvalue case: the returned signal is exactly as
//! wide as the expression type's bitstream width.

use std::collections::HashMap;

use svnet_ast::{
    Ast, BinaryOp, Call, CallTarget, ConstVal, ConstantRange, Expr, ExprKind, Logic,
    RangeSelectKind, SvInt, SymbolId, SymbolKind, UnaryOp,
};
use svnet_netlist::{escape_id, sig_x, Const, Module, SigBit, SigSpec, State};

use crate::builder::Builder;
use crate::error::{require, unsupported, Result};

/// Per-procedure evaluation state.
#[derive(Debug, Default)]
pub struct ProcedureContext {
    /// Latest blocking-assignment value for each written wire bit.
    pub rvalue_subs: HashMap<SigBit, SigBit>,
    /// Evaluated actuals of the function being inlined.
    pub args: HashMap<SymbolId, SigSpec>,
}

/// Everything expression lowering needs: the AST for symbol resolution and
/// the module under construction.
pub struct ModuleCx<'a> {
    pub ast: &'a Ast,
    pub module: &'a mut Module,
}

impl<'a> ModuleCx<'a> {
    /// The wire created for a value symbol by the wire-adding pass. Lookups
    /// never fail after that pass has run.
    pub fn wire_sig(&self, symbol: SymbolId) -> SigSpec {
        let sym = self.ast.symbol(symbol);
        let id = self
            .module
            .wire(&escape_id(&sym.hier_path))
            .unwrap_or_else(|| panic!("no wire for symbol {}", sym.hier_path));
        self.module.sig(id)
    }
}

/// Convert a four-state front-end integer into a netlist constant.
pub fn svint_to_const(value: &SvInt) -> Const {
    let bits = value
        .bits
        .iter()
        .map(|b| match b {
            Logic::Zero => State::S0,
            Logic::One => State::S1,
            Logic::X => State::Sx,
            Logic::Z => State::Sz,
        })
        .collect();
    Const::new(bits)
}

/// Convert a folded constant value, flattening unpacked aggregates with
/// later elements in the lower bits and marking string images.
pub fn const_to_const(value: &ConstVal) -> Const {
    match value {
        ConstVal::Int(v) => svint_to_const(v),
        ConstVal::Unpacked(elems) => {
            let mut out = Const::default();
            for elem in elems {
                let piece = const_to_const(elem);
                let mut bits = piece.bits;
                bits.extend_from_slice(&out.bits);
                out.bits = bits;
            }
            out
        }
        ConstVal::Str(s) => Const::from_string(s),
    }
}

pub fn const_to_sig(value: &ConstVal) -> SigSpec {
    SigSpec::from_const(&const_to_const(value))
}

fn ceil_log2(x: usize) -> usize {
    if x <= 1 {
        0
    } else {
        (usize::BITS - (x - 1).leading_zeros()) as usize
    }
}

/// Translate an array index expression into a 0-based index over the fixed
/// range plus a bounds-validity bit.
pub fn translate_index(
    cx: &mut ModuleCx,
    idxexpr: &Expr,
    range: ConstantRange,
    ctx: Option<&ProcedureContext>,
) -> Result<(SigSpec, SigBit)> {
    let mut idx = evaluate_rhs(cx, idxexpr, ctx)?;
    let idx_signed = idxexpr.ty.is_signed();

    if !idx_signed {
        idx.push(State::S0);
    }

    let mut b = Builder::new(cx.module);
    let upper: SigSpec = Const::from_int(range.upper(), 32).into();
    let lower: SigSpec = Const::from_int(range.lower(), 32).into();
    let le = b.le(idx.clone(), upper, true);
    let ge = b.ge(idx.clone(), lower, true);
    let valid = b.logic_and(le, ge)[0];

    let right: SigSpec = Const::from_int(range.right, 32).into();
    let mut raw_idx = if range.left > range.right {
        b.sub(idx, right, true)
    } else {
        b.sub(right, idx, true)
    };
    raw_idx.extend_u0(ceil_log2(range.width()), false);
    Ok((raw_idx, valid))
}

/// Lower an assignment target. Supports named values, constant simple range
/// selects, constant element selects, concatenations, and member accesses;
/// dynamic-index targets are handled by the procedural lowerer's etching
/// loop instead.
pub fn evaluate_lhs(cx: &mut ModuleCx, expr: &Expr) -> Result<SigSpec> {
    let ret = match &expr.kind {
        ExprKind::NamedValue(symbol) => cx.wire_sig(*symbol),
        ExprKind::RangeSelect {
            select_kind,
            value,
            left,
            right,
        } => {
            require!(expr, *select_kind == RangeSelectKind::Simple);
            require!(expr, left.const_val.is_some() && right.const_val.is_some());
            let left = left.const_val.as_ref().unwrap().as_i64().unwrap();
            let right = right.const_val.as_ref().unwrap().as_i64().unwrap();
            let range = match value.ty.fixed_range() {
                Some(range) => range,
                None => unsupported!(expr),
            };
            let raw_left = range.translate_index(left);
            let raw_right = range.translate_index(right);
            let value_width = value.ty.bitstream_width();
            assert!(value_width % range.width() == 0);
            let stride = value_width / range.width();
            evaluate_lhs(cx, value)?.extract(
                raw_right as usize * stride,
                stride * (raw_left - raw_right + 1) as usize,
            )
        }
        ExprKind::Concat { operands } => {
            let mut ret = SigSpec::new();
            for op in operands {
                let mut next = evaluate_lhs(cx, op)?;
                next.append(&ret);
                ret = next;
            }
            ret
        }
        ExprKind::ElementSelect { value, selector } => {
            require!(expr, selector.const_val.is_some());
            require!(expr, value.ty.is_array());
            let range = value.ty.fixed_range().unwrap();
            let idx = selector.const_val.as_ref().unwrap().as_i64().unwrap();
            let stride = expr.ty.bitstream_width();
            let raw_idx = range.translate_index(idx);
            evaluate_lhs(cx, value)?.extract(stride * raw_idx as usize, stride)
        }
        ExprKind::MemberAccess {
            value, bit_offset, ..
        } => evaluate_lhs(cx, value)?.extract(*bit_offset, expr.ty.bitstream_width()),
        _ => unsupported!(expr),
    };

    assert!(expr.ty.is_fixed_size());
    assert_eq!(ret.len(), expr.ty.bitstream_width());
    Ok(ret)
}

/// Lower an expression in rvalue position.
pub fn evaluate_rhs(
    cx: &mut ModuleCx,
    expr: &Expr,
    ctx: Option<&ProcedureContext>,
) -> Result<SigSpec> {
    // Anything the front end already folded comes back verbatim.
    if let Some(value) = &expr.const_val {
        let ret = const_to_sig(value);
        assert_eq!(ret.len(), expr.ty.bitstream_width());
        return Ok(ret);
    }

    let ret = match &expr.kind {
        ExprKind::NamedValue(symbol) => {
            let sym = cx.ast.symbol(*symbol);
            match &sym.kind {
                SymbolKind::Net { .. } | SymbolKind::Variable { .. } => {
                    let mut ret = cx.wire_sig(*symbol);
                    if let Some(ctx) = ctx {
                        ret.replace(&ctx.rvalue_subs);
                    }
                    ret
                }
                SymbolKind::Parameter { initializer, .. } => {
                    require!(sym, initializer.is_some());
                    let init = initializer.as_ref().unwrap();
                    require!(
                        sym,
                        matches!(init.const_val, Some(ConstVal::Int(_)))
                    );
                    const_to_sig(init.const_val.as_ref().unwrap())
                }
                SymbolKind::FormalArgument { .. } => {
                    require!(expr, ctx.is_some_and(|c| c.args.contains_key(symbol)));
                    ctx.unwrap().args[symbol].clone()
                }
                _ => unsupported!(sym),
            }
        }
        ExprKind::Unary { op, operand } => {
            let a = evaluate_rhs(cx, operand, ctx)?;
            let a_signed = operand.ty.is_signed();
            let y_width = expr.ty.bitstream_width();
            let (kind, invert) = match op {
                UnaryOp::LogicalNot => ("$logic_not", false),
                UnaryOp::BitwiseNot => ("$not", false),
                UnaryOp::BitwiseOr => ("$reduce_or", false),
                UnaryOp::BitwiseAnd => ("$reduce_and", false),
                UnaryOp::BitwiseNand => ("$reduce_and", true),
                UnaryOp::BitwiseNor => ("$reduce_or", true),
            };
            let mut b = Builder::new(cx.module);
            let mut ret = b.unop(kind, a, a_signed, y_width);
            if invert {
                ret = b.unop("$logic_not", ret, false, y_width);
            }
            ret
        }
        ExprKind::Binary { op, lhs, rhs } => {
            let a = evaluate_rhs(cx, lhs, ctx)?;
            let b_sig = evaluate_rhs(cx, rhs, ctx)?;
            let kind = match op {
                BinaryOp::Add => "$add",
                BinaryOp::Subtract => "$sub",
                BinaryOp::Multiply => "$mul",
                BinaryOp::Divide => "$divfloor",
                BinaryOp::Mod => "$mod",
                BinaryOp::BinaryAnd => "$and",
                BinaryOp::BinaryOr => "$or",
                BinaryOp::BinaryXor => "$xor",
                BinaryOp::BinaryXnor => "$xnor",
                BinaryOp::Equality => "$eq",
                BinaryOp::Inequality => "$ne",
                BinaryOp::GreaterThanEqual => "$ge",
                BinaryOp::GreaterThan => "$gt",
                BinaryOp::LessThanEqual => "$le",
                BinaryOp::LessThan => "$lt",
                BinaryOp::LogicalAnd => "$logic_and",
                BinaryOp::LogicalOr => "$logic_or",
                BinaryOp::LogicalShiftLeft => "$sshl",
                BinaryOp::LogicalShiftRight => "$sshr",
                BinaryOp::ArithmeticShiftLeft => "$shl",
                BinaryOp::ArithmeticShiftRight => "$shr",
                BinaryOp::Power => "$pow",
            };
            let mut a_signed = lhs.ty.is_signed();
            let mut b_signed = rhs.ty.is_signed();
            // The A-signedness of the arithmetic shifts travels through the
            // IR's own shift semantics instead.
            if kind == "$shr" {
                b_signed = false;
            }
            if kind == "$sshr" || kind == "$sshl" {
                a_signed = false;
                b_signed = false;
            }
            let y_width = expr.ty.bitstream_width();
            Builder::new(cx.module).biop(kind, a, b_sig, a_signed, b_signed, y_width)
        }
        ExprKind::Conversion { operand } => {
            let from = &operand.ty;
            let to = &expr.ty;
            require!(expr, from.is_integral());
            require!(expr, to.is_integral());
            require!(
                expr,
                from.is_signed() == to.is_signed()
                    || to.bitstream_width() <= from.bitstream_width()
            );
            let mut ret = evaluate_rhs(cx, operand, ctx)?;
            ret.extend_u0(to.bitstream_width(), to.is_signed());
            ret
        }
        ExprKind::IntegerLiteral(value) => svint_to_const(value).into(),
        ExprKind::RangeSelect {
            select_kind,
            value,
            left,
            right,
        } => {
            require!(expr, *select_kind == RangeSelectKind::Simple);
            require!(expr, left.const_val.is_some() && right.const_val.is_some());
            let left = left.const_val.as_ref().unwrap().as_i64().unwrap();
            let right = right.const_val.as_ref().unwrap().as_i64().unwrap();
            let range = match value.ty.fixed_range() {
                Some(range) => range,
                None => unsupported!(expr),
            };
            let raw_left = range.translate_index(left);
            let raw_right = range.translate_index(right);
            let value_width = value.ty.bitstream_width();
            assert!(value_width % range.width() == 0);
            let stride = value_width / range.width();
            evaluate_rhs(cx, value, ctx)?.extract(
                raw_right as usize * stride,
                stride * (raw_left - raw_right + 1) as usize,
            )
        }
        ExprKind::ElementSelect { value, selector } => {
            require!(expr, value.ty.is_array());
            let range = value.ty.fixed_range().unwrap();
            let stride = expr.ty.bitstream_width();
            let mut base = evaluate_rhs(cx, value, ctx)?;
            assert!(base.len() % stride == 0);
            let (raw_idx, valid) = translate_index(cx, selector, range, ctx)?;
            assert!(stride * (1 << raw_idx.len()) >= base.len());
            let pad = stride * (1 << raw_idx.len()) - base.len();
            base.append(&sig_x(pad));
            let mut b = Builder::new(cx.module);
            let picked = b.bmux(base, raw_idx);
            // out-of-range reads produce X
            b.mux(sig_x(stride), picked, SigSpec::from_bit(valid))
        }
        ExprKind::Concat { operands } => {
            let mut ret = SigSpec::new();
            for op in operands {
                let mut next = evaluate_rhs(cx, op, ctx)?;
                next.append(&ret);
                ret = next;
            }
            ret
        }
        ExprKind::Conditional {
            conditions,
            if_true,
            if_false,
        } => {
            require!(expr, conditions.len() == 1);
            require!(expr, !conditions[0].has_pattern);
            let false_sig = evaluate_rhs(cx, if_false, ctx)?;
            let true_sig = evaluate_rhs(cx, if_true, ctx)?;
            let cond = evaluate_rhs(cx, &conditions[0].expr, ctx)?;
            let mut b = Builder::new(cx.module);
            let sel = b.reduce_bool(cond);
            b.mux(false_sig, true_sig, sel)
        }
        ExprKind::Replication { count, concat } => {
            let Some(reps) = count.const_val.as_ref().and_then(|v| v.as_i64()) else {
                return Err(crate::error::ElabError::NotConstant {
                    what: "replication count".to_string(),
                    span: count.span.clone(),
                });
            };
            let concat = evaluate_rhs(cx, concat, ctx)?;
            let mut ret = SigSpec::new();
            for _ in 0..reps {
                ret.append(&concat);
            }
            ret
        }
        ExprKind::MemberAccess {
            value, bit_offset, ..
        } => evaluate_rhs(cx, value, ctx)?.extract(*bit_offset, expr.ty.bitstream_width()),
        ExprKind::Call(call) => match &call.target {
            CallTarget::System(name) => {
                require!(expr, name == "$signed");
                require!(expr, call.args.len() == 1);
                evaluate_rhs(cx, &call.args[0], ctx)?
            }
            CallTarget::Function(_) => evaluate_call(cx, call, ctx)?,
        },
        _ => unsupported!(expr),
    };

    assert!(expr.ty.is_fixed_size());
    assert_eq!(ret.len(), expr.ty.bitstream_width());
    Ok(ret)
}

fn evaluate_call(
    cx: &mut ModuleCx,
    call: &Call,
    ctx: Option<&ProcedureContext>,
) -> Result<SigSpec> {
    crate::proc::evaluate_function(cx, call, ctx)
}
