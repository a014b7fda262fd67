//! Expression lowering tests

mod common;

use common::*;
use svnet_ast::{
    BinaryOp, ConstantRange, Expr, ExprKind, RangeSelectKind, StructField, SvInt, Type, UnaryOp,
};
use svnet_elab::{evaluate_lhs, evaluate_rhs, ElabError, ModuleCx};
use svnet_netlist::{Module, SigBit, SigSpec, State};

/// Build a module with a wire per member of the test design, mirroring the
/// wire-adding pass.
fn module_for(td: &TestDesign) -> Module {
    let mut module = Module::new("\\top");
    for sym in &td.ast.symbols {
        if let Some(ty) = sym.value_type() {
            module.add_wire(
                svnet_netlist::escape_id(&sym.hier_path),
                ty.bitstream_width(),
            );
        }
    }
    module
}

fn wire(module: &Module, path: &str) -> SigSpec {
    module.sig(module.wire(&format!("\\{path}")).unwrap())
}

#[test]
fn rvalue_width_matches_type_width() {
    let mut td = TestDesign::new("top");
    let a = td.add_logic("a", 4);
    let mut module = module_for(&td);
    let mut cx = ModuleCx {
        ast: &td.ast,
        module: &mut module,
    };
    let expr = binop(BinaryOp::Add, Type::logic(4), td.named(a), lit(1, 4));
    let sig = evaluate_rhs(&mut cx, &expr, None).unwrap();
    assert_eq!(sig.len(), 4);
}

#[test]
fn prefolded_constant_returns_verbatim() {
    let td = TestDesign::new("top");
    let mut module = module_for(&td);
    let mut cx = ModuleCx {
        ast: &td.ast,
        module: &mut module,
    };
    // the front end folded this; the kind would otherwise be rejected
    let expr = Expr::new(
        Type::logic(8),
        ExprKind::Replication {
            count: Box::new(lit(0, 32)),
            concat: Box::new(lit(0, 8)),
        },
    )
    .with_const(SvInt::from_u64(0xd6, 8));
    let sig = evaluate_rhs(&mut cx, &expr, None).unwrap();
    assert!(sig.is_fully_const());
    assert_eq!(sig.as_const().as_int(false), 0xd6);
    assert!(cx.module.cells.is_empty());
}

#[test]
fn named_parameter_reads_folded_initializer() {
    let mut td = TestDesign::new("top");
    let p = td.add_member(
        "P",
        svnet_ast::SymbolKind::Parameter {
            ty: Type::int(),
            initializer: Some(lit(42, 32)),
        },
    );
    let mut module = module_for(&td);
    let mut cx = ModuleCx {
        ast: &td.ast,
        module: &mut module,
    };
    let sig = evaluate_rhs(&mut cx, &Expr::named(Type::int(), p), None).unwrap();
    assert_eq!(sig.as_const().as_int(true), 42);
}

#[test]
fn range_select_extracts_translated_slice() {
    let mut td = TestDesign::new("top");
    let a = td.add_logic("a", 8);
    let mut module = module_for(&td);
    let a_sig = wire(&module, "top.a");
    let mut cx = ModuleCx {
        ast: &td.ast,
        module: &mut module,
    };
    let expr = Expr::new(
        Type::logic(4),
        ExprKind::RangeSelect {
            select_kind: RangeSelectKind::Simple,
            value: Box::new(td.named(a)),
            left: Box::new(lit(5, 32)),
            right: Box::new(lit(2, 32)),
        },
    );
    let sig = evaluate_rhs(&mut cx, &expr, None).unwrap();
    assert_eq!(sig, a_sig.extract(2, 4));
}

#[test]
fn concat_puts_first_operand_high() {
    let mut td = TestDesign::new("top");
    let a = td.add_logic("a", 4);
    let b = td.add_logic("b", 4);
    let mut module = module_for(&td);
    let a_sig = wire(&module, "top.a");
    let b_sig = wire(&module, "top.b");
    let mut cx = ModuleCx {
        ast: &td.ast,
        module: &mut module,
    };
    let expr = Expr::new(
        Type::logic(8),
        ExprKind::Concat {
            operands: vec![td.named(a), td.named(b)],
        },
    );
    let sig = evaluate_rhs(&mut cx, &expr, None).unwrap();
    assert_eq!(sig.extract(0, 4), b_sig);
    assert_eq!(sig.extract(4, 4), a_sig);
}

#[test]
fn replication_repeats_operand() {
    let mut td = TestDesign::new("top");
    let a = td.add_logic("a", 4);
    let mut module = module_for(&td);
    let a_sig = wire(&module, "top.a");
    let mut cx = ModuleCx {
        ast: &td.ast,
        module: &mut module,
    };
    let expr = Expr::new(
        Type::logic(8),
        ExprKind::Replication {
            count: Box::new(lit(2, 32)),
            concat: Box::new(td.named(a)),
        },
    );
    let sig = evaluate_rhs(&mut cx, &expr, None).unwrap();
    assert_eq!(sig.extract(0, 4), a_sig);
    assert_eq!(sig.extract(4, 4), a_sig);
}

#[test]
fn member_access_extracts_field() {
    let struct_ty = Type::Struct {
        fields: vec![
            StructField {
                name: "lo".into(),
                ty: Type::logic(4),
                bit_offset: 0,
            },
            StructField {
                name: "hi".into(),
                ty: Type::logic(4),
                bit_offset: 4,
            },
        ],
    };
    let mut td = TestDesign::new("top");
    let s = td.add_var("s", struct_ty, None);
    let mut module = module_for(&td);
    let s_sig = wire(&module, "top.s");
    let mut cx = ModuleCx {
        ast: &td.ast,
        module: &mut module,
    };
    let expr = Expr::new(
        Type::logic(4),
        ExprKind::MemberAccess {
            value: Box::new(td.named(s)),
            member: "hi".into(),
            bit_offset: 4,
        },
    );
    let sig = evaluate_rhs(&mut cx, &expr, None).unwrap();
    assert_eq!(sig, s_sig.extract(4, 4));
}

#[test]
fn conditional_lowers_to_bool_selected_mux() {
    let mut td = TestDesign::new("top");
    let en = td.add_logic("en", 1);
    let a = td.add_logic("a", 4);
    let d = td.add_logic("d", 4);
    let mut module = module_for(&td);
    let a_sig = wire(&module, "top.a");
    let d_sig = wire(&module, "top.d");
    let mut cx = ModuleCx {
        ast: &td.ast,
        module: &mut module,
    };
    let expr = Expr::new(
        Type::logic(4),
        ExprKind::Conditional {
            conditions: vec![svnet_ast::Condition::plain(td.named(en))],
            if_true: Box::new(td.named(a)),
            if_false: Box::new(td.named(d)),
        },
    );
    evaluate_rhs(&mut cx, &expr, None).unwrap();
    let kinds: Vec<&str> = cx.module.cells.iter().map(|c| c.kind.as_str()).collect();
    assert_eq!(kinds, vec!["$reduce_bool", "$mux"]);
    let mux = &cx.module.cells[1];
    assert_eq!(mux.port("A").unwrap(), &d_sig);
    assert_eq!(mux.port("B").unwrap(), &a_sig);
}

#[test]
fn dynamic_element_select_muxes_with_bounds_check() {
    let mut td = TestDesign::new("top");
    let arr = td.add_var(
        "arr",
        Type::Array {
            elem: Box::new(Type::logic(4)),
            range: ConstantRange::new(3, 0),
        },
        None,
    );
    let idx = td.add_logic("idx", 2);
    let mut module = module_for(&td);
    let mut cx = ModuleCx {
        ast: &td.ast,
        module: &mut module,
    };
    let expr = Expr::new(
        Type::logic(4),
        ExprKind::ElementSelect {
            value: Box::new(td.named(arr)),
            selector: Box::new(td.named(idx)),
        },
    );
    let sig = evaluate_rhs(&mut cx, &expr, None).unwrap();
    assert_eq!(sig.len(), 4);
    let kinds: Vec<&str> = cx.module.cells.iter().map(|c| c.kind.as_str()).collect();
    for expected in ["$le", "$ge", "$logic_and", "$sub", "$bmux", "$mux"] {
        assert!(kinds.contains(&expected), "missing {expected} in {kinds:?}");
    }
}

#[test]
fn conversion_extends_and_narrows() {
    let mut td = TestDesign::new("top");
    let a = td.add_logic("a", 4);
    let s = td.add_var("s", Type::logic_signed(4), None);
    let mut module = module_for(&td);
    let a_sig = wire(&module, "top.a");
    let s_sig = wire(&module, "top.s");
    let mut cx = ModuleCx {
        ast: &td.ast,
        module: &mut module,
    };

    // unsigned widening zero-fills
    let expr = Expr::new(
        Type::logic(8),
        ExprKind::Conversion {
            operand: Box::new(td.named(a)),
        },
    );
    let sig = evaluate_rhs(&mut cx, &expr, None).unwrap();
    assert_eq!(sig.extract(0, 4), a_sig);
    assert!(sig.extract(4, 4).is_fully_zero());

    // signed widening replicates the sign bit
    let expr = Expr::new(
        Type::logic_signed(8),
        ExprKind::Conversion {
            operand: Box::new(td.named(s)),
        },
    );
    let sig = evaluate_rhs(&mut cx, &expr, None).unwrap();
    assert_eq!(sig[7], s_sig[3]);

    // changing signedness while widening is not lowerable
    let expr = Expr::new(
        Type::logic_signed(8),
        ExprKind::Conversion {
            operand: Box::new(td.named(a)),
        },
    );
    assert!(matches!(
        evaluate_rhs(&mut cx, &expr, None),
        Err(ElabError::Unsupported { .. })
    ));
}

#[test]
fn nand_reduction_inverts() {
    let mut td = TestDesign::new("top");
    let a = td.add_logic("a", 4);
    let mut module = module_for(&td);
    let mut cx = ModuleCx {
        ast: &td.ast,
        module: &mut module,
    };
    let expr = unop(UnaryOp::BitwiseNand, Type::logic(1), td.named(a));
    let sig = evaluate_rhs(&mut cx, &expr, None).unwrap();
    assert_eq!(sig.len(), 1);
    let kinds: Vec<&str> = cx.module.cells.iter().map(|c| c.kind.as_str()).collect();
    assert_eq!(kinds, vec!["$reduce_and", "$logic_not"]);
}

#[test]
fn shift_operators_force_unsigned_operands() {
    let mut td = TestDesign::new("top");
    let a = td.add_var("a", Type::logic_signed(8), None);
    let n = td.add_var("n", Type::logic_signed(3), None);
    let mut module = module_for(&td);
    let mut cx = ModuleCx {
        ast: &td.ast,
        module: &mut module,
    };

    let expr = binop(
        BinaryOp::ArithmeticShiftRight,
        Type::logic_signed(8),
        td.named(a),
        td.named(n),
    );
    evaluate_rhs(&mut cx, &expr, None).unwrap();
    let cell = cx.module.cells.last().unwrap();
    assert_eq!(cell.kind, "$shr");
    assert!(cell.parameters["A_SIGNED"].as_bool());
    assert!(!cell.parameters["B_SIGNED"].as_bool());

    let expr = binop(
        BinaryOp::LogicalShiftRight,
        Type::logic_signed(8),
        td.named(a),
        td.named(n),
    );
    evaluate_rhs(&mut cx, &expr, None).unwrap();
    let cell = cx.module.cells.last().unwrap();
    assert_eq!(cell.kind, "$sshr");
    assert!(!cell.parameters["A_SIGNED"].as_bool());
    assert!(!cell.parameters["B_SIGNED"].as_bool());
}

#[test]
fn signed_pass_through_call() {
    let mut td = TestDesign::new("top");
    let a = td.add_logic("a", 4);
    let mut module = module_for(&td);
    let a_sig = wire(&module, "top.a");
    let mut cx = ModuleCx {
        ast: &td.ast,
        module: &mut module,
    };
    let expr = Expr::new(
        Type::logic_signed(4),
        ExprKind::Call(svnet_ast::Call {
            target: svnet_ast::CallTarget::System("$signed".into()),
            args: vec![td.named(a)],
        }),
    );
    let sig = evaluate_rhs(&mut cx, &expr, None).unwrap();
    assert_eq!(sig, a_sig);
}

#[test]
fn lvalue_concat_and_slices() {
    let mut td = TestDesign::new("top");
    let a = td.add_logic("a", 4);
    let b = td.add_logic("b", 4);
    let mut module = module_for(&td);
    let a_sig = wire(&module, "top.a");
    let b_sig = wire(&module, "top.b");
    let mut cx = ModuleCx {
        ast: &td.ast,
        module: &mut module,
    };
    let expr = Expr::new(
        Type::logic(8),
        ExprKind::Concat {
            operands: vec![td.named(a), td.named(b)],
        },
    );
    let sig = evaluate_lhs(&mut cx, &expr).unwrap();
    assert_eq!(sig.extract(0, 4), b_sig);
    assert_eq!(sig.extract(4, 4), a_sig);

    // dynamic-index lvalues are not lowerable here
    let idx = td.add_logic("idx", 2);
    let mut module = module_for(&td);
    let mut cx = ModuleCx {
        ast: &td.ast,
        module: &mut module,
    };
    let expr = Expr::new(
        Type::logic(1),
        ExprKind::ElementSelect {
            value: Box::new(td.named(a)),
            selector: Box::new(td.named(idx)),
        },
    );
    assert!(matches!(
        evaluate_lhs(&mut cx, &expr),
        Err(ElabError::Unsupported { .. })
    ));
}

#[test]
fn out_of_range_constant_select_is_undefined() {
    // bounds checking of a constant index folds away the mux entirely
    let mut td = TestDesign::new("top");
    let arr = td.add_var(
        "arr",
        Type::Array {
            elem: Box::new(Type::logic(4)),
            range: ConstantRange::new(3, 0),
        },
        None,
    );
    let mut module = module_for(&td);
    let arr_sig = wire(&module, "top.arr");
    let mut cx = ModuleCx {
        ast: &td.ast,
        module: &mut module,
    };
    let expr = Expr::new(
        Type::logic(4),
        ExprKind::ElementSelect {
            value: Box::new(td.named(arr)),
            selector: Box::new(lit(2, 3)),
        },
    );
    let sig = evaluate_rhs(&mut cx, &expr, None).unwrap();
    // in-range constant index reduces to a static slice
    assert_eq!(sig, arr_sig.extract(8, 4));
    assert!(cx.module.cells.is_empty());

    let expr = Expr::new(
        Type::logic(4),
        ExprKind::ElementSelect {
            value: Box::new(td.named(arr)),
            selector: Box::new(lit(5, 3)),
        },
    );
    let sig = evaluate_rhs(&mut cx, &expr, None).unwrap();
    assert_eq!(sig, SigSpec::filled(State::Sx, 4));
}

#[test]
fn non_constant_replication_count_is_a_semantic_error() {
    let mut td = TestDesign::new("top");
    let a = td.add_logic("a", 4);
    let n = td.add_logic("n", 4);
    let mut module = module_for(&td);
    let mut cx = ModuleCx {
        ast: &td.ast,
        module: &mut module,
    };
    let expr = Expr::new(
        Type::logic(8),
        ExprKind::Replication {
            count: Box::new(td.named(n)),
            concat: Box::new(td.named(a)),
        },
    );
    assert!(matches!(
        evaluate_rhs(&mut cx, &expr, None),
        Err(ElabError::NotConstant { .. })
    ));
}

#[test]
fn formal_argument_requires_context() {
    let mut td = TestDesign::new("top");
    let arg = td.ast.add_symbol(
        "x",
        "top.f.x",
        svnet_ast::SymbolKind::FormalArgument { ty: Type::logic(4) },
    );
    let mut module = Module::new("\\top");
    module.add_wire("\\top.f.x", 4);
    let mut cx = ModuleCx {
        ast: &td.ast,
        module: &mut module,
    };
    let expr = Expr::named(Type::logic(4), arg);
    assert!(matches!(
        evaluate_rhs(&mut cx, &expr, None),
        Err(ElabError::Unsupported { .. })
    ));

    let mut ctx = svnet_elab::ProcedureContext::default();
    ctx.args
        .insert(arg, SigSpec::from_const(&svnet_netlist::Const::from_int(9, 4)));
    let sig = evaluate_rhs(&mut cx, &expr, Some(&ctx)).unwrap();
    assert_eq!(sig.as_const().as_int(false), 9);
}

#[test]
fn blocking_substitutions_apply_to_named_reads() {
    let mut td = TestDesign::new("top");
    let q = td.add_logic("q", 2);
    let mut module = module_for(&td);
    let q_sig = wire(&module, "top.q");
    let mut cx = ModuleCx {
        ast: &td.ast,
        module: &mut module,
    };
    let mut ctx = svnet_elab::ProcedureContext::default();
    ctx.rvalue_subs
        .insert(q_sig[0], SigBit::Const(State::S1));
    let sig = evaluate_rhs(&mut cx, &td.named(q), Some(&ctx)).unwrap();
    assert_eq!(sig[0], SigBit::Const(State::S1));
    assert_eq!(sig[1], q_sig[1]);
}
