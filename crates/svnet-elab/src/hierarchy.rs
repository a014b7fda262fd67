//! Hierarchy driver
//!
//! Walks the elaborated instance tree. Each non-anonymous instance body
//! becomes one netlist module named by its escaped hierarchical path; both
//! population passes run, port positions are fixed up, the structural
//! check runs, and child instances are visited recursively.

use svnet_ast::{Ast, SymbolId, SymbolKind};
use svnet_netlist::{escape_id, Design, Module};

use crate::attrs::transfer_attrs;
use crate::error::{ElabError, Result};
use crate::eval::ModuleCx;
use crate::populate::{add_wires, populate};

/// Elaborate a whole design.
pub fn elaborate(ast: &Ast) -> Result<Design> {
    let mut design = Design::new();
    for &root in &ast.roots {
        elaborate_instance(ast, &mut design, root)?;
    }
    Ok(design)
}

fn elaborate_instance(ast: &Ast, design: &mut Design, symbol: SymbolId) -> Result<()> {
    let sym = ast.symbol(symbol);
    let SymbolKind::Instance { body, .. } = &sym.kind else {
        return Err(ElabError::Internal(format!(
            "hierarchy root `{}` is not an instance",
            sym.hier_path
        )));
    };

    // anonymous instances (e.g. from bind constructs) are ignored
    if sym.name.is_empty() {
        return Ok(());
    }

    let body = ast.body(*body);
    let mut module = Module::new(escape_id(&body.hier_path));
    transfer_attrs(body, &mut module);

    {
        let mut cx = ModuleCx {
            ast,
            module: &mut module,
        };
        add_wires(&mut cx, body)?;
        populate(&mut cx, body)?;
    }

    module.fixup_ports();
    module.check()?;
    design.add_module(module);

    visit_child_instances(ast, design, &body.members)
}

fn visit_child_instances(
    ast: &Ast,
    design: &mut Design,
    members: &[SymbolId],
) -> Result<()> {
    for &member in members {
        let sym = ast.symbol(member);
        match &sym.kind {
            SymbolKind::Instance { .. } => elaborate_instance(ast, design, member)?,
            SymbolKind::GenerateBlock {
                uninstantiated: false,
                members,
            } => visit_child_instances(ast, design, members)?,
            _ => {}
        }
    }
    Ok(())
}
