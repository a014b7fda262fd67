//! Attribute transfer from AST nodes to netlist objects
//!
//! Spans become `src` attributes; user-defined AST attributes carry over
//! as integer constants.

use indexmap::IndexMap;
use svnet_ast::{Attribute, Expr, InstanceBody, SourceSpan, Stmt, Symbol};
use svnet_netlist::{escape_id, CaseRule, Cell, Const, Module, Process, SwitchRule, Wire};

use crate::eval::svint_to_const;

pub trait AttrSource {
    fn src_span(&self) -> Option<&SourceSpan>;

    fn user_attrs(&self) -> &[Attribute] {
        &[]
    }
}

impl AttrSource for Expr {
    fn src_span(&self) -> Option<&SourceSpan> {
        self.span.as_ref()
    }
}

impl AttrSource for Stmt {
    fn src_span(&self) -> Option<&SourceSpan> {
        self.span.as_ref()
    }
}

impl AttrSource for Symbol {
    fn src_span(&self) -> Option<&SourceSpan> {
        self.span.as_ref()
    }

    fn user_attrs(&self) -> &[Attribute] {
        &self.attributes
    }
}

impl AttrSource for InstanceBody {
    fn src_span(&self) -> Option<&SourceSpan> {
        self.span.as_ref()
    }

    fn user_attrs(&self) -> &[Attribute] {
        &self.attributes
    }
}

pub trait AttrTarget {
    fn attrs_mut(&mut self) -> &mut IndexMap<String, Const>;
}

macro_rules! impl_attr_target {
    ($($ty:ty),*) => {
        $(impl AttrTarget for $ty {
            fn attrs_mut(&mut self) -> &mut IndexMap<String, Const> {
                &mut self.attributes
            }
        })*
    };
}

impl_attr_target!(Wire, Cell, Process, CaseRule, SwitchRule, Module);

/// Copy the source location and user attributes of an AST node onto a
/// netlist object.
pub fn transfer_attrs(from: &dyn AttrSource, to: &mut dyn AttrTarget) {
    if let Some(span) = from.src_span() {
        if !span.file.is_empty() {
            to.attrs_mut()
                .insert("src".to_string(), Const::from_string(&span.attr_string()));
        }
    }
    for attr in from.user_attrs() {
        to.attrs_mut()
            .insert(escape_id(&attr.name), svint_to_const(&attr.value));
    }
}
