//! Procedural lowering
//!
//! Translates procedural statements into a process case tree. The lowering
//! context is three pieces of state: the active case rule, the blocking-
//! assignment substitution map, and the staging map that gives every
//! assigned lvalue bit a fresh wire, committed to the original bits when
//! the procedure finishes.
//!
//! Branches are lowered against a snapshot of the substitution map; a
//! [`SwitchBuilder`] diffs the map on branch exit and merges the union of
//! updates through fresh wires, so statements after the branch observe a
//! single merged value per written bit.

use std::collections::{HashMap, HashSet};
use std::mem;

use svnet_ast::{
    BlockKind, Call, CallTarget, CaseCondition, Expr, ExprKind, Stmt, StmtKind, SymbolKind,
    UniquePriorityCheck,
};
use svnet_netlist::{
    sig_zero, CaseRule, Const, Fmt, FmtArg, FmtBase, Module, Process, SigBit, SigSpec, State,
    SwitchRule, SyncKind,
};
use tracing::warn;

use crate::attrs::transfer_attrs;
use crate::builder::Builder;
use crate::error::{require, unsupported, ElabError, Result};
use crate::eval::{evaluate_lhs, evaluate_rhs, ModuleCx, ProcedureContext};

/// Remove the bits of `target` wherever the mask carries a constant zero.
fn crop_zero_mask(mask: &SigSpec, target: &mut SigSpec) {
    for i in (0..mask.len()).rev() {
        if mask[i] == SigBit::Const(State::S0) {
            target.remove(i);
        }
    }
}

/// Builds one switch: collects per-branch case rules together with the set
/// of substitution-map entries each branch changed, then merges.
struct SwitchBuilder {
    sw: SwitchRule,
    subs_save: HashMap<SigBit, SigBit>,
    /// `(case, changed bits, their new values)` per branch.
    branch_updates: Vec<(CaseRule, SigSpec, SigSpec)>,
}

impl SwitchBuilder {
    fn new(signal: SigSpec, subs: &HashMap<SigBit, SigBit>) -> Self {
        Self {
            sw: SwitchRule {
                signal,
                ..Default::default()
            },
            subs_save: subs.clone(),
            branch_updates: Vec::new(),
        }
    }

    /// Record a finished branch: diff the substitutions against the entry
    /// snapshot, remember the update set, and restore the snapshot for the
    /// next branch.
    fn end_branch(&mut self, case: CaseRule, subs: &mut HashMap<SigBit, SigBit>) {
        let mut update = SigSpec::new();
        for (bit, value) in subs.iter() {
            if self.subs_save.get(bit) != Some(value) {
                update.push(*bit);
            }
        }
        update.sort();
        let update_map = update.replaced(subs);
        self.branch_updates.push((case, update, update_map));
        *subs = self.subs_save.clone();
    }

    /// Merge: allocate a fresh wire per updated chunk, default it to the
    /// pre-branch value on the parent case, point the substitutions at it,
    /// and write each branch's actual values onto it inside that branch.
    fn finish(self, parent: &mut CaseRule, module: &mut Module, subs: &mut HashMap<SigBit, SigBit>) {
        let mut updated_anybranch = SigSpec::new();
        for (_, update, _) in &self.branch_updates {
            updated_anybranch.append(update);
        }
        updated_anybranch.sort_and_unify();

        for chunk in updated_anybranch.chunks() {
            let w = module.auto_wire(chunk.len());
            let w_default = chunk.replaced(subs);
            parent.actions.push((w.clone(), w_default));
            for i in 0..chunk.len() {
                subs.insert(chunk[i], w[i]);
            }
        }

        let mut sw = self.sw;
        for (mut case, update, update_map) in self.branch_updates {
            let mut done = 0;
            for chunk in update.chunks() {
                let target_w = chunk.replaced(subs);
                case.actions.push((target_w, update_map.extract(done, chunk.len())));
                done += chunk.len();
            }
            sw.cases.push(case);
        }
        parent.switches.push(sw);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LowerMode {
    /// An `always`-family block; staging commits through sync rules.
    Always,
    /// An inlined function body; the caller reads the result out of the
    /// staging map and nothing commits.
    Function,
}

pub struct ProcedureLowerer<'a, 'c> {
    cx: &'c mut ModuleCx<'a>,
    proc: Process,
    /// The active case, held detached from the tree while it is filled.
    current: CaseRule,
    /// Cases whose trailing empty switch the current case nests under.
    parents: Vec<CaseRule>,
    pub ctx: ProcedureContext,
    staging: HashMap<SigBit, SigBit>,
    assigned_blocking: HashSet<SigBit>,
    assigned_nonblocking: HashSet<SigBit>,
    print_priority: i64,
    mode: LowerMode,
}

impl<'a, 'c> ProcedureLowerer<'a, 'c> {
    /// `proc` arrives with its sync rules already populated.
    pub fn new(cx: &'c mut ModuleCx<'a>, proc: Process, mode: LowerMode) -> Self {
        Self {
            cx,
            proc,
            current: CaseRule::default(),
            parents: Vec::new(),
            ctx: ProcedureContext::default(),
            staging: HashMap::new(),
            assigned_blocking: HashSet::new(),
            assigned_nonblocking: HashSet::new(),
            print_priority: 0,
            mode,
        }
    }

    /// Map an lvalue through the staging layer, allocating fresh staging
    /// wires for bits seen for the first time.
    fn staging_signal(&mut self, lvalue: &SigSpec) -> SigSpec {
        let mut to_create = SigSpec::new();
        for bit in lvalue.iter() {
            assert!(bit.is_wire());
            if !self.staging.contains_key(&bit) {
                to_create.push(bit);
            }
        }

        to_create.sort_and_unify();
        for chunk in to_create.chunks() {
            let w = self.cx.module.auto_wire_suffix(chunk.len(), "staging");
            for i in 0..chunk.len() {
                self.staging.insert(chunk[i], w[i]);
            }
        }

        lvalue.replaced(&self.staging)
    }

    /// Commit the staging layer: the root case feeds every staged value
    /// back to its original bit, and each sync rule samples the staged
    /// value into the original on its trigger.
    pub fn staging_done(&mut self) {
        debug_assert_eq!(self.mode, LowerMode::Always);
        let mut all_driven = SigSpec::new();
        for bit in self.staging.keys() {
            all_driven.push(*bit);
        }
        all_driven.sort_and_unify();

        for chunk in all_driven.chunks() {
            let mapped = chunk.replaced(&self.staging);
            for sync in &mut self.proc.syncs {
                sync.actions.push((chunk.clone(), mapped.clone()));
            }
            self.proc.root_case.actions.push((mapped, chunk));
        }
    }

    /// Collapse descended cases back to the given nesting depth, attaching
    /// each dangling chain as the single case of an empty switch on its
    /// parent.
    fn unwind_to(&mut self, depth: usize) {
        while self.parents.len() > depth {
            let mut parent = self.parents.pop().unwrap();
            let mut sw = SwitchRule::default();
            sw.cases.push(mem::take(&mut self.current));
            parent.switches.push(sw);
            self.current = parent;
        }
    }

    /// Reattach the case chain under the anchoring top switch and yield the
    /// finished process plus its staging map.
    pub fn finish(mut self) -> (Process, HashMap<SigBit, SigBit>) {
        self.unwind_to(0);
        let mut anchor = SwitchRule::default();
        anchor.cases.push(self.current);
        self.proc.root_case.switches.insert(0, anchor);
        (self.proc, self.staging)
    }

    /// An enable bit that is 1 exactly when control reaches the current
    /// case: defaults to 0 on the process root, set to 1 here.
    fn context_enable(&mut self) -> SigSpec {
        let en = self.cx.module.auto_wire(1);
        self.proc.root_case.actions.push((en.clone(), sig_zero(1)));
        self.current
            .actions
            .push((en.clone(), SigSpec::from(State::S1)));
        en
    }

    pub fn lower_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match &stmt.kind {
            StmtKind::Block { kind, body } => {
                require!(stmt, *kind == BlockKind::Sequential);
                self.lower_stmt(body)
            }
            StmtKind::List(stmts) => {
                for stmt in stmts {
                    self.lower_stmt(stmt)?;
                }
                Ok(())
            }
            StmtKind::Expression(expr) => self.handle_expression(stmt, expr),
            StmtKind::Conditional {
                conditions,
                if_true,
                if_false,
            } => {
                require!(stmt, conditions.len() == 1);
                require!(stmt, !conditions[0].has_pattern);

                let cond = evaluate_rhs(self.cx, &conditions[0].expr, Some(&self.ctx))?;
                let condition = Builder::new(self.cx.module).reduce_bool(cond);
                let mut sb = SwitchBuilder::new(condition, &self.ctx.rvalue_subs);
                transfer_attrs(stmt, &mut sb.sw);

                self.branch(&mut sb, vec![SigSpec::from(State::S1)], if_true)?;
                if let Some(if_false) = if_false {
                    self.branch(&mut sb, vec![], if_false)?;
                }
                sb.finish(&mut self.current, self.cx.module, &mut self.ctx.rvalue_subs);

                self.descend();
                Ok(())
            }
            StmtKind::Case {
                condition,
                check,
                expr,
                items,
                default_case,
            } => {
                require!(stmt, *condition == CaseCondition::Normal);
                if *check != UniquePriorityCheck::None {
                    let src = stmt
                        .span
                        .as_ref()
                        .map(|s| s.display())
                        .unwrap_or_default();
                    warn!("{}: ignoring {:?} check on case statement", src, check);
                }

                let dispatch = evaluate_rhs(self.cx, expr, Some(&self.ctx))?;
                let mut sb = SwitchBuilder::new(dispatch.clone(), &self.ctx.rvalue_subs);
                transfer_attrs(stmt, &mut sb.sw);

                for item in items {
                    let mut compares = Vec::new();
                    for compare_expr in &item.expressions {
                        let compare = evaluate_rhs(self.cx, compare_expr, Some(&self.ctx))?;
                        assert_eq!(compare.len(), dispatch.len());
                        compares.push(compare);
                    }
                    require!(stmt, !compares.is_empty());
                    self.branch(&mut sb, compares, &item.stmt)?;
                }

                if let Some(default_case) = default_case {
                    self.branch(&mut sb, vec![], default_case)?;
                }

                sb.finish(&mut self.current, self.cx.module, &mut self.ctx.rvalue_subs);

                self.descend();
                Ok(())
            }
            StmtKind::Empty => Ok(()),
            StmtKind::VariableDecl(_) => Ok(()),
            _ => unsupported!(stmt),
        }
    }

    /// Lower one branch of a switch into its own case rule against a fresh
    /// copy of the substitution snapshot.
    fn branch(
        &mut self,
        sb: &mut SwitchBuilder,
        compare: Vec<SigSpec>,
        stmt: &Stmt,
    ) -> Result<()> {
        let depth = self.parents.len();
        let saved = mem::replace(&mut self.current, CaseRule::with_compare(compare));
        transfer_attrs(stmt, &mut self.current);
        let result = self.lower_stmt(stmt);
        // nested switches may have descended; fold their chains back into
        // this branch's case before handing it to the switch builder
        self.unwind_to(depth);
        let branch_case = mem::replace(&mut self.current, saved);
        result?;
        sb.end_branch(branch_case, &mut self.ctx.rvalue_subs);
        Ok(())
    }

    /// Descend into an empty switch so statements after a finished switch
    /// get later priority than its branches.
    fn descend(&mut self) {
        let parent = mem::replace(&mut self.current, CaseRule::default());
        self.parents.push(parent);
    }

    fn handle_expression(&mut self, stmt: &Stmt, expr: &Expr) -> Result<()> {
        match &expr.kind {
            ExprKind::Call(call) => self.handle_call(stmt, expr, call),
            ExprKind::Assignment { .. } => self.handle_assignment(stmt, expr),
            _ => unsupported!(expr),
        }
    }

    fn handle_call(&mut self, stmt: &Stmt, expr: &Expr, call: &Call) -> Result<()> {
        let name = match &call.target {
            CallTarget::System(name) => name.clone(),
            CallTarget::Function(symbol) => self.cx.ast.symbol(*symbol).name.clone(),
        };
        if name == "empty_statement" {
            let src = stmt.span.as_ref().map(|s| s.display()).unwrap_or_default();
            warn!("{}: ignoring call to empty_statement", src);
            return Ok(());
        }
        if name == "$display" {
            return self.handle_display(stmt, call, &name);
        }
        unsupported!(expr)
    }

    fn handle_display(&mut self, stmt: &Stmt, call: &Call, task: &str) -> Result<()> {
        let mut fmt_args = Vec::new();
        for arg in &call.args {
            let fmt_arg = match &arg.kind {
                ExprKind::StringLiteral(s) => FmtArg::String(s.clone()),
                ExprKind::Call(inner) if inner.system_name() == Some("$time") => {
                    FmtArg::Time { realtime: false }
                }
                ExprKind::Call(inner) if inner.system_name() == Some("$realtime") => {
                    FmtArg::Time { realtime: true }
                }
                _ => FmtArg::Integer {
                    sig: evaluate_rhs(self.cx, arg, Some(&self.ctx))?,
                    signed: arg.ty.is_signed(),
                },
            };
            fmt_args.push(fmt_arg);
        }
        let mut fmt = Fmt::parse_verilog(&fmt_args, FmtBase::Decimal, task)?;
        fmt.append_literal("\n");

        // Trigger set of the owning process: edge syncs become trigger
        // bits with polarity, an implicit sync disables triggering.
        let mut implicit = false;
        let mut triggers = SigSpec::new();
        let mut polarity = Vec::new();
        for sync in &self.proc.syncs {
            match sync.kind {
                SyncKind::Posedge | SyncKind::Negedge => {
                    assert_eq!(sync.signal.len(), 1);
                    triggers.append(&sync.signal);
                    polarity.push(if sync.kind == SyncKind::Posedge {
                        State::S1
                    } else {
                        State::S0
                    });
                }
                SyncKind::Always => implicit = true,
                SyncKind::Anyedge => {
                    return Err(ElabError::Internal(
                        "$display under a both-edges sensitivity".to_string(),
                    ))
                }
            }
        }
        assert!(!triggers.is_empty() || implicit);
        assert!(triggers.is_empty() || !implicit);

        let en = self.context_enable();
        self.print_priority -= 1;
        let priority = self.print_priority;

        let name = self.cx.module.auto_name("");
        let cell = self.cx.module.add_cell(name, "$print");
        transfer_attrs(stmt, cell);
        cell.set_param_bool("TRG_ENABLE", !implicit);
        cell.set_param_int("TRG_WIDTH", triggers.len() as i64);
        cell.set_param("TRG_POLARITY", Const::new(polarity));
        cell.set_param_int("PRIORITY", priority);
        cell.set_port("TRG", triggers);
        cell.set_port("EN", en);
        fmt.emit_to_cell(cell);
        Ok(())
    }

    fn handle_assignment(&mut self, stmt: &Stmt, expr: &Expr) -> Result<()> {
        let ExprKind::Assignment {
            non_blocking,
            lhs,
            rhs,
        } = &expr.kind
        else {
            unreachable!()
        };
        let blocking = !non_blocking;

        let rvalue = evaluate_rhs(self.cx, rhs, Some(&self.ctx))?;

        // Etch the lvalue: peel select/member layers off the target while
        // growing a write mask and an X-padded rvalue to the width of each
        // enclosing sub-lvalue.
        let mut raw_lexpr: &Expr = lhs;
        let mut raw_mask = SigSpec::filled(State::S1, rvalue.len());
        let mut raw_rvalue = rvalue;
        loop {
            match &raw_lexpr.kind {
                ExprKind::RangeSelect {
                    select_kind,
                    value,
                    left,
                    right,
                } => {
                    require!(expr, *select_kind == svnet_ast::RangeSelectKind::Simple);
                    require!(expr, left.const_val.is_some() && right.const_val.is_some());
                    let left = left.const_val.as_ref().unwrap().as_i64().unwrap();
                    let right = right.const_val.as_ref().unwrap().as_i64().unwrap();
                    let range = match value.ty.fixed_range() {
                        Some(range) => range,
                        None => unsupported!(expr),
                    };
                    let raw_left = range.translate_index(left) as usize;
                    let raw_right = range.translate_index(right) as usize;
                    let value_width = value.ty.bitstream_width();
                    assert!(value_width % range.width() == 0);
                    let stride = value_width / range.width();
                    let elem_0 = sig_zero(stride);
                    let elem_x = svnet_netlist::sig_x(stride);

                    let mut mask = elem_0.repeat(raw_right);
                    mask.append(&raw_mask);
                    mask.append(&elem_0.repeat(range.width() - raw_left - 1));
                    raw_mask = mask;

                    let mut padded = elem_x.repeat(raw_right);
                    padded.append(&raw_rvalue);
                    padded.append(&elem_x.repeat(range.width() - raw_left - 1));
                    raw_rvalue = padded;

                    raw_lexpr = value;
                }
                ExprKind::ElementSelect { value, selector } => {
                    require!(expr, value.ty.is_array());
                    let range = value.ty.fixed_range().unwrap();
                    let stride = raw_lexpr.ty.bitstream_width();
                    let (raw_idx, _valid) = crate::eval::translate_index(
                        self.cx,
                        selector,
                        range,
                        Some(&self.ctx),
                    )?;
                    // TODO: out-of-range writes should be masked off by the
                    // validity bit
                    let mut mask = Builder::new(self.cx.module).demux(raw_mask, raw_idx);
                    mask.extend_u0(stride * range.width(), false);
                    raw_mask = mask;
                    raw_rvalue = raw_rvalue.repeat(range.width());
                    raw_lexpr = value;
                }
                ExprKind::MemberAccess {
                    value, bit_offset, ..
                } => {
                    let pad = value.ty.bitstream_width()
                        - raw_lexpr.ty.bitstream_width()
                        - bit_offset;

                    let mut mask = sig_zero(*bit_offset);
                    mask.append(&raw_mask);
                    mask.append(&sig_zero(pad));
                    raw_mask = mask;

                    let mut padded = svnet_netlist::sig_x(*bit_offset);
                    padded.append(&raw_rvalue);
                    padded.append(&svnet_netlist::sig_x(pad));
                    raw_rvalue = padded;

                    raw_lexpr = value;
                }
                _ => break,
            }
            if raw_mask.len() != raw_lexpr.ty.bitstream_width() {
                unsupported!(expr);
            }
            assert_eq!(raw_rvalue.len(), raw_lexpr.ty.bitstream_width());
        }

        let mut lvalue = evaluate_lhs(self.cx, raw_lexpr)?;
        crop_zero_mask(&raw_mask, &mut lvalue);
        crop_zero_mask(&raw_mask, &mut raw_rvalue);
        let mask_copy = raw_mask.clone();
        crop_zero_mask(&mask_copy, &mut raw_mask);

        let masked_rvalue = if raw_mask.is_fully_ones() {
            raw_rvalue
        } else {
            let sampled_lvalue = lvalue.replaced(&self.ctx.rvalue_subs);
            Builder::new(self.cx.module).bwmux(sampled_lvalue, raw_rvalue, raw_mask)
        };

        assert_eq!(lvalue.len(), masked_rvalue.len());
        if blocking {
            if lvalue.iter().any(|b| self.assigned_nonblocking.contains(&b)) {
                return Err(ElabError::MixedAssignment {
                    span: stmt.span.clone(),
                });
            }
            for i in 0..lvalue.len() {
                self.ctx.rvalue_subs.insert(lvalue[i], masked_rvalue[i]);
                self.assigned_blocking.insert(lvalue[i]);
            }
        } else {
            if lvalue.iter().any(|b| self.assigned_blocking.contains(&b)) {
                return Err(ElabError::MixedAssignment {
                    span: stmt.span.clone(),
                });
            }
            for bit in lvalue.iter() {
                self.assigned_nonblocking.insert(bit);
            }
        }

        let staged = self.staging_signal(&lvalue);
        self.current.actions.push((staged, masked_rvalue));
        Ok(())
    }
}

/// Inline a function call: lower the body into a fresh process with the
/// formals bound to the evaluated actuals, then read the return value out
/// of the callee's staging map. This relies on the wire-adding pass having
/// pre-created a wire for the return-value symbol.
pub fn evaluate_function(
    cx: &mut ModuleCx,
    call: &Call,
    ctx: Option<&ProcedureContext>,
) -> Result<SigSpec> {
    let CallTarget::Function(symbol) = &call.target else {
        return Err(ElabError::Internal(
            "evaluate_function on a system call".to_string(),
        ));
    };
    let ast = cx.ast;
    let sym = ast.symbol(*symbol);
    let SymbolKind::Function {
        args,
        return_var,
        body,
    } = &sym.kind
    else {
        unsupported!(sym)
    };

    assert_eq!(call.args.len(), args.len());
    let mut bound = HashMap::new();
    for (formal, actual) in args.iter().zip(call.args.iter()) {
        bound.insert(*formal, evaluate_rhs(cx, actual, ctx)?);
    }

    let name = cx.module.auto_name("");
    let mut lowerer = ProcedureLowerer::new(cx, Process::new(name), LowerMode::Function);
    lowerer.ctx.args = bound;
    lowerer.lower_stmt(body)?;
    let (process, staging) = lowerer.finish();
    cx.module.push_process(process);

    // The wire-adding pass created a placeholder wire for the return-value
    // symbol; the staged bits of that wire carry the call's result.
    let mut ret = cx.wire_sig(*return_var);
    ret.replace(&staging);
    Ok(ret)
}
