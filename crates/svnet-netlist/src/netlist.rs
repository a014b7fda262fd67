//! The netlist object model
//!
//! A design is a set of modules; each module owns its wires, cells,
//! continuous connections, and processes. Wires are stored in an arena and
//! addressed by [`WireId`]; signals borrow wire bits by identity.

use crate::error::NetlistError;
use crate::sig::{Const, SigBit, SigSpec, State, WireId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Escape a user identifier into netlist id space: internal `$`-names pass
/// through, everything else gets a `\` prefix.
pub fn escape_id(name: &str) -> String {
    if name.starts_with('$') || name.starts_with('\\') || name.is_empty() {
        name.to_string()
    } else {
        format!("\\{}", name)
    }
}

/// Strip the escape prefix for display.
pub fn unescape_id(name: &str) -> &str {
    name.strip_prefix('\\').unwrap_or(name)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wire {
    pub name: String,
    pub width: usize,
    pub port_input: bool,
    pub port_output: bool,
    /// 1-based port position after `fixup_ports`.
    pub port_id: Option<usize>,
    pub attributes: IndexMap<String, Const>,
}

impl Wire {
    fn new(name: String, width: usize) -> Self {
        Self {
            name,
            width,
            port_input: false,
            port_output: false,
            port_id: None,
            attributes: IndexMap::new(),
        }
    }
}

/// A primitive cell or submodule instance. Primitive kinds are `$`-named;
/// instances use the escaped name of the instantiated module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub name: String,
    pub kind: String,
    pub ports: IndexMap<String, SigSpec>,
    pub parameters: IndexMap<String, Const>,
    pub attributes: IndexMap<String, Const>,
}

impl Cell {
    pub fn new(name: String, kind: impl Into<String>) -> Self {
        Self {
            name,
            kind: kind.into(),
            ports: IndexMap::new(),
            parameters: IndexMap::new(),
            attributes: IndexMap::new(),
        }
    }

    pub fn set_port(&mut self, name: impl Into<String>, signal: SigSpec) {
        self.ports.insert(name.into(), signal);
    }

    pub fn set_param(&mut self, name: impl Into<String>, value: Const) {
        self.parameters.insert(name.into(), value);
    }

    pub fn set_param_int(&mut self, name: impl Into<String>, value: i64) {
        self.set_param(name, Const::from_int(value, 32));
    }

    pub fn set_param_bool(&mut self, name: impl Into<String>, value: bool) {
        self.set_param(name, Const::from_bool(value));
    }

    pub fn port(&self, name: &str) -> Option<&SigSpec> {
        self.ports.get(name)
    }
}

/// An `(lvalue, rvalue)` assignment pair.
pub type SigSig = (SigSpec, SigSpec);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncKind {
    Posedge,
    Negedge,
    Anyedge,
    /// Implicit sensitivity; fires whenever any input changes.
    Always,
}

impl SyncKind {
    pub fn is_edge(self) -> bool {
        matches!(self, SyncKind::Posedge | SyncKind::Negedge | SyncKind::Anyedge)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRule {
    pub kind: SyncKind,
    pub signal: SigSpec,
    pub actions: Vec<SigSig>,
}

impl SyncRule {
    pub fn new(kind: SyncKind, signal: SigSpec) -> Self {
        Self {
            kind,
            signal,
            actions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CaseRule {
    /// Values the switch discriminator is compared against; empty means
    /// default.
    pub compare: Vec<SigSpec>,
    /// Applied in order; nested switches execute after the actions.
    pub actions: Vec<SigSig>,
    pub switches: Vec<SwitchRule>,
    pub attributes: IndexMap<String, Const>,
}

impl CaseRule {
    pub fn with_compare(compare: Vec<SigSpec>) -> Self {
        Self {
            compare,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SwitchRule {
    pub signal: SigSpec,
    pub cases: Vec<CaseRule>,
    pub attributes: IndexMap<String, Const>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    pub name: String,
    pub root_case: CaseRule,
    pub syncs: Vec<SyncRule>,
    pub attributes: IndexMap<String, Const>,
}

impl Process {
    pub fn new(name: String) -> Self {
        Self {
            name,
            root_case: CaseRule::default(),
            syncs: Vec::new(),
            attributes: IndexMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub attributes: IndexMap<String, Const>,
    wires: Vec<Wire>,
    wire_names: HashMap<String, WireId>,
    pub cells: Vec<Cell>,
    pub processes: Vec<Process>,
    pub connections: Vec<SigSig>,
    next_auto: u32,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: IndexMap::new(),
            wires: Vec::new(),
            wire_names: HashMap::new(),
            cells: Vec::new(),
            processes: Vec::new(),
            connections: Vec::new(),
            next_auto: 0,
        }
    }

    /// Create a named wire. Names must be unique within the module.
    pub fn add_wire(&mut self, name: impl Into<String>, width: usize) -> WireId {
        let name = name.into();
        assert!(
            !self.wire_names.contains_key(&name),
            "duplicate wire name {name}"
        );
        let id = WireId(self.wires.len() as u32);
        self.wire_names.insert(name.clone(), id);
        self.wires.push(Wire::new(name, width));
        id
    }

    /// A fresh internal name, optionally tagged with a suffix.
    pub fn auto_name(&mut self, suffix: &str) -> String {
        let n = self.next_auto;
        self.next_auto += 1;
        if suffix.is_empty() {
            format!("$auto${n}")
        } else {
            format!("$auto${n}${suffix}")
        }
    }

    /// A fresh anonymous wire, returned as a full-width signal.
    pub fn auto_wire(&mut self, width: usize) -> SigSpec {
        let name = self.auto_name("");
        let id = self.add_wire(name, width);
        self.sig(id)
    }

    pub fn auto_wire_suffix(&mut self, width: usize, suffix: &str) -> SigSpec {
        let name = self.auto_name(suffix);
        let id = self.add_wire(name, width);
        self.sig(id)
    }

    pub fn wire(&self, name: &str) -> Option<WireId> {
        self.wire_names.get(name).copied()
    }

    pub fn wire_data(&self, id: WireId) -> &Wire {
        &self.wires[id.0 as usize]
    }

    pub fn wire_data_mut(&mut self, id: WireId) -> &mut Wire {
        &mut self.wires[id.0 as usize]
    }

    pub fn wires(&self) -> impl Iterator<Item = (WireId, &Wire)> {
        self.wires
            .iter()
            .enumerate()
            .map(|(i, w)| (WireId(i as u32), w))
    }

    pub fn wire_count(&self) -> usize {
        self.wires.len()
    }

    /// The full-width signal of a wire.
    pub fn sig(&self, id: WireId) -> SigSpec {
        let mut sig = SigSpec::new();
        for offset in 0..self.wires[id.0 as usize].width {
            sig.push(SigBit::wire(id, offset as u32));
        }
        sig
    }

    pub fn add_cell(&mut self, name: String, kind: impl Into<String>) -> &mut Cell {
        self.cells.push(Cell::new(name, kind));
        self.cells.last_mut().unwrap()
    }

    pub fn push_process(&mut self, process: Process) {
        self.processes.push(process);
    }

    pub fn connect(&mut self, lhs: SigSpec, rhs: SigSpec) {
        assert_eq!(lhs.len(), rhs.len(), "connection width mismatch");
        self.connections.push((lhs, rhs));
    }

    /// Assign 1-based port positions to all port wires, in declaration
    /// order.
    pub fn fixup_ports(&mut self) {
        let mut next = 1;
        for wire in &mut self.wires {
            if wire.port_input || wire.port_output {
                wire.port_id = Some(next);
                next += 1;
            } else {
                wire.port_id = None;
            }
        }
    }

    fn check_sig(&self, sig: &SigSpec, what: &str) -> Result<(), NetlistError> {
        for bit in sig.iter() {
            if let SigBit::Wire { wire, offset } = bit {
                let data = self
                    .wires
                    .get(wire.0 as usize)
                    .ok_or_else(|| NetlistError::UnknownWire {
                        module: self.name.clone(),
                        what: what.to_string(),
                    })?;
                if offset as usize >= data.width {
                    return Err(NetlistError::BitOutOfRange {
                        module: self.name.clone(),
                        wire: data.name.clone(),
                        offset: offset as usize,
                        width: data.width,
                    });
                }
            }
        }
        Ok(())
    }

    fn check_case(&self, case: &CaseRule) -> Result<(), NetlistError> {
        for (lhs, rhs) in &case.actions {
            self.check_sig(lhs, "case action")?;
            self.check_sig(rhs, "case action")?;
            if lhs.len() != rhs.len() {
                return Err(NetlistError::ActionWidthMismatch {
                    module: self.name.clone(),
                    lhs: lhs.len(),
                    rhs: rhs.len(),
                });
            }
        }
        for sw in &case.switches {
            self.check_sig(&sw.signal, "switch signal")?;
            for case in &sw.cases {
                for compare in &case.compare {
                    self.check_sig(compare, "case compare")?;
                    if compare.len() != sw.signal.len() {
                        return Err(NetlistError::CompareWidthMismatch {
                            module: self.name.clone(),
                            signal: sw.signal.len(),
                            compare: compare.len(),
                        });
                    }
                }
                self.check_case(case)?;
            }
        }
        Ok(())
    }

    /// Structural consistency check: every referenced wire bit exists,
    /// widths line up, and edge sync rules have single-bit triggers.
    pub fn check(&self) -> Result<(), NetlistError> {
        for cell in &self.cells {
            for sig in cell.ports.values() {
                self.check_sig(sig, "cell port")?;
            }
        }
        for (lhs, rhs) in &self.connections {
            self.check_sig(lhs, "connection")?;
            self.check_sig(rhs, "connection")?;
            if lhs.len() != rhs.len() {
                return Err(NetlistError::ActionWidthMismatch {
                    module: self.name.clone(),
                    lhs: lhs.len(),
                    rhs: rhs.len(),
                });
            }
        }
        for process in &self.processes {
            self.check_case(&process.root_case)?;
            for sync in &process.syncs {
                self.check_sig(&sync.signal, "sync signal")?;
                if sync.kind.is_edge() && sync.signal.len() != 1 {
                    return Err(NetlistError::BadSyncSignal {
                        module: self.name.clone(),
                        process: process.name.clone(),
                        width: sync.signal.len(),
                    });
                }
                for (lhs, rhs) in &sync.actions {
                    self.check_sig(lhs, "sync action")?;
                    self.check_sig(rhs, "sync action")?;
                    if lhs.len() != rhs.len() {
                        return Err(NetlistError::ActionWidthMismatch {
                            module: self.name.clone(),
                            lhs: lhs.len(),
                            rhs: rhs.len(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// A complete design: modules keyed by their escaped hierarchical name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Design {
    pub modules: IndexMap<String, Module>,
}

impl Design {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_module(&mut self, module: Module) {
        assert!(
            !self.modules.contains_key(&module.name),
            "duplicate module {}",
            module.name
        );
        self.modules.insert(module.name.clone(), module);
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }
}

/// Convenience constant signal helpers used throughout lowering.
pub fn sig_zero(width: usize) -> SigSpec {
    SigSpec::filled(State::S0, width)
}

pub fn sig_x(width: usize) -> SigSpec {
    SigSpec::filled(State::Sx, width)
}
