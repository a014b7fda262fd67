//! Module population
//!
//! Two passes over an instance body. The wire-adding pass pre-creates a
//! wire for every fixed-size value symbol, descending into functions so
//! their formals and return variables get placeholder wires (function
//! inlining reads results through them). The populating pass then
//! dispatches on member kind: port directions, net initializers,
//! variable init attributes, continuous assigns, submodule instances,
//! and procedural blocks.

use svnet_ast::{
    Direction, EdgeKind, ExprKind, InstanceBody, ProceduralBlockKind, StmtKind, SymbolId,
    SymbolKind, TimingControl,
};
use svnet_netlist::{escape_id, Process, SigSpec, SyncKind, SyncRule};
use tracing::warn;

use crate::attrs::transfer_attrs;
use crate::error::{require, unsupported, Result};
use crate::eval::{const_to_const, evaluate_lhs, evaluate_rhs, ModuleCx};
use crate::proc::{LowerMode, ProcedureLowerer};

/// Create a wire for every value symbol reachable in the body, without
/// descending into other modules.
pub fn add_wires(cx: &mut ModuleCx, body: &InstanceBody) -> Result<()> {
    for &member in &body.members {
        add_wires_for(cx, member)?;
    }
    Ok(())
}

fn add_wires_for(cx: &mut ModuleCx, symbol: SymbolId) -> Result<()> {
    let ast = cx.ast;
    let sym = ast.symbol(symbol);
    match &sym.kind {
        SymbolKind::Net { ty, .. }
        | SymbolKind::Variable { ty, .. }
        | SymbolKind::Parameter { ty, .. }
        | SymbolKind::FormalArgument { ty } => {
            require!(sym, ty.is_fixed_size());
            let id = cx
                .module
                .add_wire(escape_id(&sym.hier_path), ty.bitstream_width());
            transfer_attrs(sym, cx.module.wire_data_mut(id));
        }
        SymbolKind::Function {
            args, return_var, ..
        } => {
            for &arg in args {
                add_wires_for(cx, arg)?;
            }
            add_wires_for(cx, *return_var)?;
        }
        SymbolKind::GenerateBlock {
            uninstantiated,
            members,
        } => {
            if !uninstantiated {
                for &member in members {
                    add_wires_for(cx, member)?;
                }
            }
        }
        SymbolKind::StatementBlock { members } => {
            for &member in members {
                add_wires_for(cx, member)?;
            }
        }
        // other modules get their own wires
        SymbolKind::Instance { .. } => {}
        SymbolKind::Port { .. }
        | SymbolKind::ContinuousAssign { .. }
        | SymbolKind::ProceduralBlock { .. } => {}
    }
    Ok(())
}

fn populate_sync(cx: &mut ModuleCx, proc: &mut Process, timing: &TimingControl) -> Result<()> {
    match timing {
        TimingControl::SignalEvent { expr, edge, iff } => {
            let sig = evaluate_rhs(cx, expr, None)?;
            require!(timing, iff.is_none());
            match edge {
                EdgeKind::None => {
                    let src = expr
                        .span
                        .as_ref()
                        .map(|s| s.display())
                        .unwrap_or_default();
                    warn!(
                        "{}: turning non-edge sensitivity into implicit sensitivity",
                        src
                    );
                    proc.syncs
                        .push(SyncRule::new(SyncKind::Always, SigSpec::new()));
                }
                EdgeKind::PosEdge => {
                    require!(timing, sig.len() == 1);
                    proc.syncs.push(SyncRule::new(SyncKind::Posedge, sig));
                }
                EdgeKind::NegEdge => {
                    require!(timing, sig.len() == 1);
                    proc.syncs.push(SyncRule::new(SyncKind::Negedge, sig));
                }
                EdgeKind::BothEdges => {
                    require!(timing, sig.len() == 1);
                    proc.syncs.push(SyncRule::new(SyncKind::Anyedge, sig));
                }
            }
        }
        TimingControl::ImplicitEvent => {
            proc.syncs
                .push(SyncRule::new(SyncKind::Always, SigSpec::new()));
        }
        TimingControl::EventList(events) => {
            for event in events {
                populate_sync(cx, proc, event)?;
            }
        }
    }
    Ok(())
}

/// Populate a module from its body members, in declaration order.
pub fn populate(cx: &mut ModuleCx, body: &InstanceBody) -> Result<()> {
    for &member in &body.members {
        populate_member(cx, member)?;
    }
    Ok(())
}

fn populate_member(cx: &mut ModuleCx, symbol: SymbolId) -> Result<()> {
    let ast = cx.ast;
    let sym = ast.symbol(symbol);
    match &sym.kind {
        SymbolKind::Parameter { .. } => {}
        SymbolKind::FormalArgument { .. } => {}

        SymbolKind::Port {
            internal,
            direction,
        } => {
            let internal_sym = ast.symbol(*internal);
            let id = cx
                .module
                .wire(&escape_id(&internal_sym.hier_path))
                .expect("port wire missing after wire-adding pass");
            let wire = cx.module.wire_data_mut(id);
            match direction {
                Direction::In => wire.port_input = true,
                Direction::Out => wire.port_output = true,
                Direction::InOut => {
                    wire.port_input = true;
                    wire.port_output = true;
                }
                Direction::Ref => {}
            }
        }

        SymbolKind::Net { initializer, .. } => {
            if let Some(init) = initializer {
                let lhs = cx.wire_sig(symbol);
                let rhs = evaluate_rhs(cx, init, None)?;
                cx.module.connect(lhs, rhs);
            }
        }

        SymbolKind::Variable { ty, initializer } => {
            let defvalue = match initializer {
                Some(init) => match &init.const_val {
                    Some(value) => value.clone(),
                    None => {
                        return Err(crate::error::ElabError::NotConstant {
                            what: format!("initializer of `{}`", sym.name),
                            span: init.span.clone(),
                        })
                    }
                },
                None => ty.default_value(),
            };
            let initval = const_to_const(&defvalue);
            if !initval.is_fully_undef() {
                let id = cx
                    .module
                    .wire(&escape_id(&sym.hier_path))
                    .expect("variable wire missing after wire-adding pass");
                cx.module
                    .wire_data_mut(id)
                    .attributes
                    .insert("init".to_string(), initval);
            }
        }

        SymbolKind::ContinuousAssign { assignment } => {
            let ExprKind::Assignment { lhs, rhs, .. } = &assignment.kind else {
                unsupported!(assignment)
            };
            let lhs = evaluate_lhs(cx, lhs)?;
            let rhs = evaluate_rhs(cx, rhs, None)?;
            cx.module.connect(lhs, rhs);
        }

        SymbolKind::Instance { body, connections } => {
            let child = ast.body(*body);
            let mut bound = Vec::new();
            for conn in connections {
                let Some(expr) = &conn.expr else { continue };
                let sig = match &expr.kind {
                    ExprKind::Assignment { lhs, rhs, .. } => {
                        require!(expr, matches!(rhs.kind, ExprKind::EmptyArgument));
                        evaluate_lhs(cx, lhs)?
                    }
                    _ => evaluate_rhs(cx, expr, None)?,
                };
                let port_sym = ast.symbol(conn.port);
                bound.push((escape_id(&port_sym.hier_path), sig));
            }
            let cell_name = escape_id(&sym.name);
            let cell = cx.module.add_cell(cell_name, escape_id(&child.hier_path));
            for (port, sig) in bound {
                cell.set_port(port, sig);
            }
            transfer_attrs(sym, cell);
        }

        SymbolKind::ProceduralBlock { kind, body } => match kind {
            ProceduralBlockKind::Always | ProceduralBlockKind::AlwaysFF => {
                require!(body, matches!(body.kind, StmtKind::Timed { .. }));
                let StmtKind::Timed { timing, stmt } = &body.kind else {
                    unreachable!()
                };
                let name = cx.module.auto_name("");
                let mut process = Process::new(name);
                populate_sync(cx, &mut process, timing)?;

                let mut lowerer = ProcedureLowerer::new(&mut *cx, process, LowerMode::Always);
                lowerer.lower_stmt(stmt)?;
                lowerer.staging_done();
                let (process, _) = lowerer.finish();
                cx.module.push_process(process);
            }
            ProceduralBlockKind::AlwaysComb => {
                let name = cx.module.auto_name("");
                let mut process = Process::new(name);
                process
                    .syncs
                    .push(SyncRule::new(SyncKind::Always, SigSpec::new()));

                let mut lowerer = ProcedureLowerer::new(&mut *cx, process, LowerMode::Always);
                lowerer.lower_stmt(body)?;
                lowerer.staging_done();
                let (process, _) = lowerer.finish();
                cx.module.push_process(process);
            }
            ProceduralBlockKind::Initial => {
                // not lowered yet; anything inside is rejected
                unsupported!(body)
            }
            ProceduralBlockKind::Final => {}
        },

        SymbolKind::GenerateBlock {
            uninstantiated,
            members,
        } => {
            if !uninstantiated {
                for &member in members {
                    populate_member(cx, member)?;
                }
            }
        }

        SymbolKind::StatementBlock { members } => {
            for &member in members {
                populate_member(cx, member)?;
            }
        }

        SymbolKind::Function { .. } => {}
    }
    Ok(())
}
