//! Text emitter for designs
//!
//! Renders a design into a line-oriented dump: attributes precede the
//! object they annotate, signals print as named slices or sized constants.

use crate::netlist::{CaseRule, Cell, Design, Module, Process, SwitchRule, SyncKind};
use crate::sig::{Const, SigBit, SigSpec};
use std::fmt::Write;

fn const_string(value: &Const) -> String {
    if value.flag_string {
        return format!("{:?}", value.as_string());
    }
    let mut digits: String = value.bits.iter().rev().map(|b| b.to_char()).collect();
    if digits.is_empty() {
        digits.push('0');
    }
    format!("{}'{}", value.len(), digits)
}

fn sig_string(module: &Module, sig: &SigSpec) -> String {
    let chunks = sig.chunks();
    let rendered: Vec<String> = chunks
        .iter()
        .map(|chunk| match chunk.bit(0) {
            SigBit::Const(_) => const_string(&chunk.as_const()),
            SigBit::Wire { wire, offset } => {
                let data = module.wire_data(wire);
                if offset == 0 && chunk.len() == data.width {
                    data.name.clone()
                } else if chunk.len() == 1 {
                    format!("{} [{}]", data.name, offset)
                } else {
                    format!(
                        "{} [{}:{}]",
                        data.name,
                        offset as usize + chunk.len() - 1,
                        offset
                    )
                }
            }
        })
        .collect();
    if rendered.len() == 1 {
        rendered.into_iter().next().unwrap()
    } else {
        // concatenations list the most significant chunk first
        let mut parts: Vec<String> = rendered;
        parts.reverse();
        format!("{{ {} }}", parts.join(" "))
    }
}

fn emit_attributes(
    out: &mut String,
    indent: &str,
    attrs: &indexmap::IndexMap<String, Const>,
) {
    for (name, value) in attrs {
        let _ = writeln!(out, "{indent}attribute {} {}", name, const_string(value));
    }
}

fn emit_case_body(out: &mut String, module: &Module, case: &CaseRule, indent: usize) {
    let pad = "  ".repeat(indent);
    for (lhs, rhs) in &case.actions {
        let _ = writeln!(
            out,
            "{pad}assign {} {}",
            sig_string(module, lhs),
            sig_string(module, rhs)
        );
    }
    for switch in &case.switches {
        emit_switch(out, module, switch, indent);
    }
}

fn emit_switch(out: &mut String, module: &Module, switch: &SwitchRule, indent: usize) {
    let pad = "  ".repeat(indent);
    emit_attributes(out, &pad, &switch.attributes);
    let _ = writeln!(out, "{pad}switch {}", sig_string(module, &switch.signal));
    for case in &switch.cases {
        let compare: Vec<String> = case
            .compare
            .iter()
            .map(|c| sig_string(module, c))
            .collect();
        let _ = writeln!(out, "{pad}  case {}", compare.join(", "));
        emit_case_body(out, module, case, indent + 2);
    }
    let _ = writeln!(out, "{pad}end");
}

fn emit_process(out: &mut String, module: &Module, process: &Process) {
    emit_attributes(out, "  ", &process.attributes);
    let _ = writeln!(out, "  process {}", process.name);
    emit_case_body(out, module, &process.root_case, 2);
    for sync in &process.syncs {
        let kind = match sync.kind {
            SyncKind::Posedge => "posedge",
            SyncKind::Negedge => "negedge",
            SyncKind::Anyedge => "edge",
            SyncKind::Always => "always",
        };
        if sync.signal.is_empty() {
            let _ = writeln!(out, "    sync {kind}");
        } else {
            let _ = writeln!(out, "    sync {kind} {}", sig_string(module, &sync.signal));
        }
        for (lhs, rhs) in &sync.actions {
            let _ = writeln!(
                out,
                "      update {} {}",
                sig_string(module, lhs),
                sig_string(module, rhs)
            );
        }
    }
    let _ = writeln!(out, "  end");
}

fn emit_cell(out: &mut String, module: &Module, cell: &Cell) {
    emit_attributes(out, "  ", &cell.attributes);
    let _ = writeln!(out, "  cell {} {}", cell.kind, cell.name);
    for (name, value) in &cell.parameters {
        let _ = writeln!(out, "    parameter {} {}", name, const_string(value));
    }
    for (name, sig) in &cell.ports {
        let _ = writeln!(out, "    connect {} {}", name, sig_string(module, sig));
    }
    let _ = writeln!(out, "  end");
}

fn emit_module(out: &mut String, module: &Module) {
    emit_attributes(out, "", &module.attributes);
    let _ = writeln!(out, "module {}", module.name);
    for (_, wire) in module.wires() {
        emit_attributes(out, "  ", &wire.attributes);
        let mut decl = format!("  wire width {}", wire.width);
        if wire.port_input {
            decl.push_str(" input");
        }
        if wire.port_output {
            decl.push_str(" output");
        }
        if let Some(id) = wire.port_id {
            let _ = write!(decl, " {}", id);
        }
        let _ = writeln!(out, "{} {}", decl, wire.name);
    }
    for cell in &module.cells {
        emit_cell(out, module, cell);
    }
    for process in &module.processes {
        emit_process(out, module, process);
    }
    for (lhs, rhs) in &module.connections {
        let _ = writeln!(
            out,
            "  connect {} {}",
            sig_string(module, lhs),
            sig_string(module, rhs)
        );
    }
    let _ = writeln!(out, "end");
}

/// Render the whole design as text.
pub fn emit_design(design: &Design) -> String {
    let mut out = String::new();
    for (i, module) in design.modules.values().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        emit_module(&mut out, module);
    }
    out
}
