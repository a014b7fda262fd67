//! Symbols, instance bodies, and the design root
//!
//! Symbols live in one design-wide arena and are addressed by [`SymbolId`].
//! Each elaborated instance gets its own body; member lists preserve source
//! declaration order, which downstream lowering depends on.

use crate::consts::SvInt;
use crate::expr::Expr;
use crate::span::SourceSpan;
use crate::stmt::Stmt;
use crate::types::Type;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BodyId(pub u32);

/// A user-defined attribute; the front end only admits integer values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: SvInt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    In,
    Out,
    InOut,
    Ref,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProceduralBlockKind {
    Always,
    AlwaysComb,
    AlwaysFF,
    Initial,
    Final,
}

/// Connection of one port of a submodule instance. Output connections are
/// `Assignment` expressions with an `EmptyArgument` right-hand side; inputs
/// are plain rvalue expressions. Unconnected ports carry `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortConnection {
    /// The port symbol inside the instantiated body.
    pub port: SymbolId,
    pub expr: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SymbolKind {
    Net {
        ty: Type,
        initializer: Option<Expr>,
    },
    Variable {
        ty: Type,
        initializer: Option<Expr>,
    },
    Parameter {
        ty: Type,
        initializer: Option<Expr>,
    },
    Port {
        /// The net or variable the port is bound to.
        internal: SymbolId,
        direction: Direction,
    },
    FormalArgument {
        ty: Type,
    },
    Function {
        args: Vec<SymbolId>,
        return_var: SymbolId,
        body: Stmt,
    },
    Instance {
        body: BodyId,
        connections: Vec<PortConnection>,
    },
    ContinuousAssign {
        assignment: Expr,
    },
    ProceduralBlock {
        kind: ProceduralBlockKind,
        body: Stmt,
    },
    GenerateBlock {
        uninstantiated: bool,
        members: Vec<SymbolId>,
    },
    /// A named or unnamed statement block hoisted by the front end; carries
    /// the variables declared inside it.
    StatementBlock {
        members: Vec<SymbolId>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    /// Dotted hierarchical path, unique within the design.
    pub hier_path: String,
    pub span: Option<SourceSpan>,
    pub attributes: Vec<Attribute>,
    pub kind: SymbolKind,
}

impl Symbol {
    /// The declared type, for symbols that hold a value.
    pub fn value_type(&self) -> Option<&Type> {
        match &self.kind {
            SymbolKind::Net { ty, .. }
            | SymbolKind::Variable { ty, .. }
            | SymbolKind::Parameter { ty, .. }
            | SymbolKind::FormalArgument { ty } => Some(ty),
            _ => None,
        }
    }
}

/// The body of one elaborated module instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceBody {
    pub id: BodyId,
    pub name: String,
    pub hier_path: String,
    pub span: Option<SourceSpan>,
    pub attributes: Vec<Attribute>,
    /// Members in declaration order.
    pub members: Vec<SymbolId>,
}

/// A fully elaborated design as handed over by the front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ast {
    pub name: String,
    pub symbols: Vec<Symbol>,
    pub bodies: Vec<InstanceBody>,
    /// Top-level instance symbols.
    pub roots: Vec<SymbolId>,
}

impl Ast {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbols: Vec::new(),
            bodies: Vec::new(),
            roots: Vec::new(),
        }
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }

    pub fn body(&self, id: BodyId) -> &InstanceBody {
        &self.bodies[id.0 as usize]
    }

    /// Allocate a symbol; the caller attaches it to a body or parent symbol.
    pub fn add_symbol(
        &mut self,
        name: impl Into<String>,
        hier_path: impl Into<String>,
        kind: SymbolKind,
    ) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol {
            id,
            name: name.into(),
            hier_path: hier_path.into(),
            span: None,
            attributes: Vec::new(),
            kind,
        });
        id
    }

    pub fn add_body(
        &mut self,
        name: impl Into<String>,
        hier_path: impl Into<String>,
    ) -> BodyId {
        let id = BodyId(self.bodies.len() as u32);
        self.bodies.push(InstanceBody {
            id,
            name: name.into(),
            hier_path: hier_path.into(),
            span: None,
            attributes: Vec::new(),
            members: Vec::new(),
        });
        id
    }

    pub fn add_member(&mut self, body: BodyId, member: SymbolId) {
        self.bodies[body.0 as usize].members.push(member);
    }
}
