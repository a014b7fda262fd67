//! Procedural lowering tests: case trees, staging, sync rules, `$display`

mod common;

use common::*;
use svnet_ast::{
    BinaryOp, CaseCondition, CaseItem, Condition, ConstantRange, EdgeKind, Expr, ExprKind, Stmt,
    StmtKind, TimingControl, Type, UnaryOp, UniquePriorityCheck,
};
use svnet_elab::ElabError;
use svnet_netlist::{Const, Design, Module, SigSpec, State, SyncKind};

fn top<'d>(design: &'d Design, td: &TestDesign) -> &'d Module {
    design
        .module(&svnet_netlist::escape_id(&td.top_path()))
        .expect("top module missing")
}

fn wire(module: &Module, path: &str) -> SigSpec {
    module.sig(module.wire(&format!("\\{path}")).unwrap())
}

#[test]
fn comb_conditional_writes_staging_and_commits_without_edges() {
    let mut td = TestDesign::new("top");
    let en = td.add_logic("en", 1);
    let d = td.add_logic("d", 4);
    let q = td.add_logic("q", 4);
    td.add_always_comb(Stmt::seq_block(vec![if_stmt(
        td.named(en),
        blocking(td.named(q), td.named(d)),
        None,
    )]));

    let design = td.elaborate();
    let module = top(&design, &td);
    let d_sig = wire(module, "top.d");
    let q_sig = wire(module, "top.q");

    assert_eq!(module.processes.len(), 1);
    let process = &module.processes[0];

    // a single implicit-event sync, no edge triggers
    assert_eq!(process.syncs.len(), 1);
    assert_eq!(process.syncs[0].kind, SyncKind::Always);
    assert!(process.syncs[0].signal.is_empty());

    // the commit: root case feeds the staged value back, the sync samples
    // the staged value into the original
    assert_eq!(process.root_case.actions.len(), 1);
    let (staged, original) = &process.root_case.actions[0];
    assert_eq!(original, &q_sig);
    assert_eq!(process.syncs[0].actions, vec![(q_sig.clone(), staged.clone())]);

    // the if lowers to a switch with a single [1] case writing d into the
    // staging wire
    let chain = &process.root_case.switches[0].cases[0];
    let if_switch = &chain.switches[0];
    assert_eq!(if_switch.cases.len(), 1);
    let branch = &if_switch.cases[0];
    assert_eq!(
        branch.compare,
        vec![SigSpec::from(Const::from_int(1, 1))]
    );
    assert_eq!(branch.actions[0], (staged.clone(), d_sig.clone()));
}

#[test]
fn blocking_assignments_substitute_into_later_reads() {
    let mut td = TestDesign::new("top");
    let d = td.add_logic("d", 4);
    let q = td.add_logic("q", 4);
    let y = td.add_logic("y", 4);
    td.add_always_comb(Stmt::seq_block(vec![
        blocking(td.named(q), td.named(d)),
        blocking(td.named(y), td.named(q)),
    ]));

    let design = td.elaborate();
    let module = top(&design, &td);
    let d_sig = wire(module, "top.d");

    let chain = &module.processes[0].root_case.switches[0].cases[0];
    assert_eq!(chain.actions.len(), 2);
    // the read of q in the second assignment sees the value just assigned
    assert_eq!(chain.actions[1].1, d_sig);
}

#[test]
fn switch_merge_gives_later_statements_the_merged_value() {
    let mut td = TestDesign::new("top");
    let en = td.add_logic("en", 1);
    let d = td.add_logic("d", 4);
    let q = td.add_logic("q", 4);
    let y = td.add_logic("y", 4);
    td.add_always_comb(Stmt::seq_block(vec![
        blocking(td.named(q), lit(0, 4)),
        if_stmt(td.named(en), blocking(td.named(q), td.named(d)), None),
        blocking(td.named(y), td.named(q)),
    ]));

    let design = td.elaborate();
    let module = top(&design, &td);
    let d_sig = wire(module, "top.d");

    let chain = &module.processes[0].root_case.switches[0].cases[0];
    // first action stages the constant write, second defaults the merge
    // wire to the pre-branch value
    assert_eq!(chain.actions.len(), 2);
    let merge_wire = chain.actions[1].0.clone();
    assert!(chain.actions[1].1.is_fully_zero());

    // the taken branch writes both the staging wire and the merge wire
    let branch = &chain.switches[0].cases[0];
    assert!(branch.actions.contains(&(merge_wire.clone(), d_sig.clone())));

    // after the if, reads of q resolve to the merge wire
    let after = &chain.switches[1].cases[0];
    assert_eq!(after.actions[0].1, merge_wire);
}

#[test]
fn ff_with_reset_and_inlined_function() {
    let mut td = TestDesign::new("top");
    let clk = td.add_logic("clk", 1);
    let rst_n = td.add_logic("rst_n", 1);
    let input = td.add_logic("in", 4);
    let o1 = td.add_logic("o1", 4);
    let my_sum = td.add_function("my_sum", &["a", "b"], 4, |args, ret| {
        let a = Expr::named(Type::logic(4), args[0]);
        let b = Expr::named(Type::logic(4), args[1]);
        blocking(
            Expr::named(Type::logic(4), ret),
            binop(BinaryOp::Add, Type::logic(4), a, b),
        )
    });

    let call = Expr::new(
        Type::logic(4),
        ExprKind::Call(svnet_ast::Call {
            target: svnet_ast::CallTarget::Function(my_sum),
            args: vec![td.named(input), lit(3, 4)],
        }),
    );
    let body = Stmt::seq_block(vec![if_stmt(
        unop(UnaryOp::LogicalNot, Type::logic(1), td.named(rst_n)),
        nonblocking(td.named(o1), lit(0, 4)),
        Some(nonblocking(td.named(o1), call)),
    )]);
    td.add_always_ff(
        event_list(vec![posedge(td.named(clk)), negedge(td.named(rst_n))]),
        body,
    );

    let design = td.elaborate();
    let module = top(&design, &td);
    let clk_sig = wire(module, "top.clk");
    let rst_sig = wire(module, "top.rst_n");
    let o1_sig = wire(module, "top.o1");

    // the inlined function got its own process, pushed before the owner
    assert_eq!(module.processes.len(), 2);
    let fn_proc = &module.processes[0];
    assert!(fn_proc.syncs.is_empty());
    assert!(fn_proc.root_case.actions.is_empty());

    let ff = &module.processes[1];
    assert_eq!(ff.syncs.len(), 2);
    assert_eq!(ff.syncs[0].kind, SyncKind::Posedge);
    assert_eq!(ff.syncs[0].signal, clk_sig);
    assert_eq!(ff.syncs[1].kind, SyncKind::Negedge);
    assert_eq!(ff.syncs[1].signal, rst_sig);

    // both edges commit the staged value of o1
    for sync in &ff.syncs {
        assert_eq!(sync.actions.len(), 1);
        assert_eq!(sync.actions[0].0, o1_sig);
    }

    // the function body produced an adder
    assert!(module.cells.iter().any(|c| c.kind == "$add"));

    // reset branch writes zero into staging; the else branch wires the
    // function's staged return value through
    let chain = &ff.root_case.switches[0].cases[0];
    let if_switch = &chain.switches[0];
    assert_eq!(if_switch.cases.len(), 2);
    assert!(if_switch.cases[0].actions[0].1.is_fully_zero());
    assert!(!if_switch.cases[1].actions[0].1.is_fully_const());
}

#[test]
fn mixing_blocking_and_nonblocking_on_one_bit_is_fatal() {
    let mut td = TestDesign::new("top");
    let d = td.add_logic("d", 4);
    let q = td.add_logic("q", 4);
    let clk = td.add_logic("clk", 1);
    td.add_always_ff(
        posedge(td.named(clk)),
        Stmt::seq_block(vec![
            blocking(td.named(q), td.named(d)),
            nonblocking(td.named(q), td.named(d)),
        ]),
    );

    assert!(matches!(
        td.try_elaborate(),
        Err(ElabError::MixedAssignment { .. })
    ));
}

#[test]
fn case_statement_builds_switch_and_ignores_priority_check() {
    let mut td = TestDesign::new("top");
    let sel = td.add_logic("sel", 2);
    let a = td.add_logic("a", 4);
    let b = td.add_logic("b", 4);
    let q = td.add_logic("q", 4);
    td.add_always_comb(Stmt::new(StmtKind::Case {
        condition: CaseCondition::Normal,
        check: UniquePriorityCheck::Unique,
        expr: td.named(sel),
        items: vec![CaseItem {
            expressions: vec![lit(0, 2)],
            stmt: blocking(td.named(q), td.named(a)),
        }],
        default_case: Some(Box::new(blocking(td.named(q), td.named(b)))),
    }));

    let design = td.elaborate();
    let module = top(&design, &td);
    let sel_sig = wire(module, "top.sel");

    let chain = &module.processes[0].root_case.switches[0].cases[0];
    let switch = &chain.switches[0];
    assert_eq!(switch.signal, sel_sig);
    assert_eq!(switch.cases.len(), 2);
    assert_eq!(
        switch.cases[0].compare,
        vec![SigSpec::from(Const::from_int(0, 2))]
    );
    assert!(switch.cases[1].compare.is_empty());
}

#[test]
fn wildcard_case_conditions_are_rejected() {
    let mut td = TestDesign::new("top");
    let sel = td.add_logic("sel", 2);
    let q = td.add_logic("q", 1);
    td.add_always_comb(Stmt::new(StmtKind::Case {
        condition: CaseCondition::WildcardXOrZ,
        check: UniquePriorityCheck::None,
        expr: td.named(sel),
        items: vec![CaseItem {
            expressions: vec![lit(0, 2)],
            stmt: blocking(td.named(q), lit(0, 1)),
        }],
        default_case: None,
    }));

    assert!(matches!(
        td.try_elaborate(),
        Err(ElabError::Unsupported { .. })
    ));
}

#[test]
fn display_emits_print_cell_with_trigger_and_enable() {
    let mut td = TestDesign::new("top");
    let clk = td.add_logic("clk", 1);
    let x = td.add_logic("x", 8);
    td.add_always_ff(
        posedge(td.named(clk)),
        Stmt::seq_block(vec![display_call(vec![
            string_lit("x=%0d"),
            td.named(x),
        ])]),
    );

    let design = td.elaborate();
    let module = top(&design, &td);
    let clk_sig = wire(module, "top.clk");
    let x_sig = wire(module, "top.x");

    let print = module
        .cells
        .iter()
        .find(|c| c.kind == "$print")
        .expect("no $print cell");
    assert!(print.parameters["TRG_ENABLE"].as_bool());
    assert_eq!(print.parameters["TRG_WIDTH"].as_int(false), 1);
    assert_eq!(print.parameters["TRG_POLARITY"].bits, vec![State::S1]);
    assert_eq!(print.parameters["PRIORITY"].as_int(true), -1);
    assert_eq!(print.parameters["FORMAT"].as_string(), "x=%0d\n");
    assert_eq!(print.parameters["ARG_COUNT"].as_int(false), 1);
    assert_eq!(print.parameters["ARG0_WIDTH"].as_int(false), 8);
    assert!(!print.parameters["ARG0_SIGNED"].as_bool());
    assert_eq!(print.port("TRG").unwrap(), &clk_sig);
    assert_eq!(print.port("ARGS").unwrap(), &x_sig);

    // the enable wire defaults to 0 at the root and is raised in the case
    // the $display sits in
    let en = print.port("EN").unwrap().clone();
    let process = &module.processes[0];
    assert!(process
        .root_case
        .actions
        .iter()
        .any(|(lhs, rhs)| *lhs == en && rhs.is_fully_zero()));
    let chain = &process.root_case.switches[0].cases[0];
    assert!(chain
        .actions
        .iter()
        .any(|(lhs, rhs)| *lhs == en && rhs.is_fully_ones()));
}

#[test]
fn range_select_assignment_stages_only_selected_bits() {
    let mut td = TestDesign::new("top");
    let d = td.add_logic("d", 2);
    let q = td.add_logic("q", 4);
    let lhs = Expr::new(
        Type::logic(2),
        ExprKind::RangeSelect {
            select_kind: svnet_ast::RangeSelectKind::Simple,
            value: Box::new(td.named(q)),
            left: Box::new(lit(3, 32)),
            right: Box::new(lit(2, 32)),
        },
    );
    td.add_always_comb(Stmt::seq_block(vec![blocking(lhs, td.named(d))]));

    let design = td.elaborate();
    let module = top(&design, &td);
    let q_sig = wire(module, "top.q");
    let d_sig = wire(module, "top.d");

    let process = &module.processes[0];
    // only q[3:2] is staged and committed
    assert_eq!(process.syncs[0].actions.len(), 1);
    assert_eq!(process.syncs[0].actions[0].0, q_sig.extract(2, 2));
    let chain = &process.root_case.switches[0].cases[0];
    assert_eq!(chain.actions[0].1, d_sig);
}

#[test]
fn dynamic_element_assignment_demuxes_the_mask() {
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
    let d = td.add_logic("d", 4);
    let lhs = Expr::new(
        Type::logic(4),
        ExprKind::ElementSelect {
            value: Box::new(td.named(arr)),
            selector: Box::new(td.named(idx)),
        },
    );
    td.add_always_comb(Stmt::seq_block(vec![blocking(lhs, td.named(d))]));

    let design = td.elaborate();
    let module = top(&design, &td);
    let kinds: Vec<&str> = module.cells.iter().map(|c| c.kind.as_str()).collect();
    assert!(kinds.contains(&"$demux"), "no demux in {kinds:?}");
    assert!(kinds.contains(&"$bwmux"), "no bwmux in {kinds:?}");

    // the whole array is staged; the sync commits all 16 bits
    let process = &module.processes[0];
    let arr_sig = wire(module, "top.arr");
    assert_eq!(process.syncs[0].actions[0].0, arr_sig);
}

#[test]
fn struct_member_assignment_writes_only_the_field() {
    let struct_ty = Type::Struct {
        fields: vec![
            svnet_ast::StructField {
                name: "lo".into(),
                ty: Type::logic(4),
                bit_offset: 0,
            },
            svnet_ast::StructField {
                name: "hi".into(),
                ty: Type::logic(4),
                bit_offset: 4,
            },
        ],
    };
    let mut td = TestDesign::new("top");
    let s = td.add_var("s", struct_ty, None);
    let d = td.add_logic("d", 4);
    let lhs = Expr::new(
        Type::logic(4),
        ExprKind::MemberAccess {
            value: Box::new(td.named(s)),
            member: "hi".into(),
            bit_offset: 4,
        },
    );
    td.add_always_comb(Stmt::seq_block(vec![blocking(lhs, td.named(d))]));

    let design = td.elaborate();
    let module = top(&design, &td);
    let s_sig = wire(module, "top.s");
    let process = &module.processes[0];
    assert_eq!(process.syncs[0].actions[0].0, s_sig.extract(4, 4));
}

#[test]
fn non_edge_event_becomes_implicit_sensitivity() {
    let mut td = TestDesign::new("top");
    let a = td.add_logic("a", 1);
    let q = td.add_logic("q", 1);
    let body = Stmt::seq_block(vec![blocking(td.named(q), td.named(a))]);
    td.add_procedural(
        svnet_ast::ProceduralBlockKind::Always,
        Stmt::new(StmtKind::Timed {
            timing: TimingControl::SignalEvent {
                expr: td.named(a),
                edge: EdgeKind::None,
                iff: None,
            },
            stmt: Box::new(body),
        }),
    );

    let design = td.elaborate();
    let module = top(&design, &td);
    let process = &module.processes[0];
    assert_eq!(process.syncs.len(), 1);
    assert_eq!(process.syncs[0].kind, SyncKind::Always);
    assert!(process.syncs[0].signal.is_empty());
}

#[test]
fn pattern_conditions_are_rejected() {
    let mut td = TestDesign::new("top");
    let en = td.add_logic("en", 1);
    let q = td.add_logic("q", 1);
    let mut cond = Condition::plain(td.named(en));
    cond.has_pattern = true;
    td.add_always_comb(Stmt::new(StmtKind::Conditional {
        conditions: vec![cond],
        if_true: Box::new(blocking(td.named(q), lit(0, 1))),
        if_false: None,
    }));

    assert!(matches!(
        td.try_elaborate(),
        Err(ElabError::Unsupported { .. })
    ));
}

#[test]
fn initial_blocks_are_rejected_and_final_blocks_ignored() {
    let mut td = TestDesign::new("top");
    td.add_procedural(
        svnet_ast::ProceduralBlockKind::Final,
        Stmt::seq_block(vec![]),
    );
    let design = td.elaborate();
    assert!(top(&design, &td).processes.is_empty());

    let mut td = TestDesign::new("top");
    td.add_procedural(
        svnet_ast::ProceduralBlockKind::Initial,
        Stmt::seq_block(vec![]),
    );
    assert!(matches!(
        td.try_elaborate(),
        Err(ElabError::Unsupported { .. })
    ));
}
