//! Helpers for building elaborated ASTs in tests

#![allow(dead_code)]

use svnet_ast::*;
use svnet_netlist::Design;

/// A single-module design under construction.
pub struct TestDesign {
    pub ast: Ast,
    pub body: BodyId,
}

impl TestDesign {
    pub fn new(top: &str) -> Self {
        let mut ast = Ast::new(top);
        let body = ast.add_body(top, top);
        let instance = ast.add_symbol(
            top,
            top,
            SymbolKind::Instance {
                body,
                connections: vec![],
            },
        );
        ast.roots.push(instance);
        Self { ast, body }
    }

    pub fn top_path(&self) -> String {
        self.ast.body(self.body).hier_path.clone()
    }

    fn member_path(&self, name: &str) -> String {
        format!("{}.{}", self.top_path(), name)
    }

    pub fn add_member(&mut self, name: &str, kind: SymbolKind) -> SymbolId {
        let path = self.member_path(name);
        let id = self.ast.add_symbol(name, path, kind);
        self.ast.add_member(self.body, id);
        id
    }

    /// A `logic [width-1:0]` variable.
    pub fn add_logic(&mut self, name: &str, width: usize) -> SymbolId {
        self.add_member(
            name,
            SymbolKind::Variable {
                ty: Type::logic(width),
                initializer: None,
            },
        )
    }

    pub fn add_var(&mut self, name: &str, ty: Type, initializer: Option<Expr>) -> SymbolId {
        self.add_member(name, SymbolKind::Variable { ty, initializer })
    }

    pub fn add_net(&mut self, name: &str, ty: Type, initializer: Option<Expr>) -> SymbolId {
        self.add_member(name, SymbolKind::Net { ty, initializer })
    }

    fn add_port(&mut self, name: &str, width: usize, direction: Direction) -> SymbolId {
        let internal = self.add_logic(name, width);
        let port_name = format!("{name}_port");
        let path = self.member_path(&port_name);
        let port = self.ast.add_symbol(
            name,
            path,
            SymbolKind::Port {
                internal,
                direction,
            },
        );
        self.ast.add_member(self.body, port);
        internal
    }

    pub fn add_input(&mut self, name: &str, width: usize) -> SymbolId {
        self.add_port(name, width, Direction::In)
    }

    pub fn add_output(&mut self, name: &str, width: usize) -> SymbolId {
        self.add_port(name, width, Direction::Out)
    }

    pub fn add_cont_assign(&mut self, lhs: Expr, rhs: Expr) {
        let ty = lhs.ty.clone();
        let assignment = Expr::new(
            ty,
            ExprKind::Assignment {
                non_blocking: false,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        );
        let n = self.ast.symbols.len();
        self.add_member(&format!("assign${n}"), SymbolKind::ContinuousAssign { assignment });
    }

    pub fn add_procedural(&mut self, kind: ProceduralBlockKind, body: Stmt) -> SymbolId {
        let n = self.ast.symbols.len();
        self.add_member(
            &format!("proc${n}"),
            SymbolKind::ProceduralBlock { kind, body },
        )
    }

    pub fn add_always_comb(&mut self, body: Stmt) -> SymbolId {
        self.add_procedural(ProceduralBlockKind::AlwaysComb, body)
    }

    pub fn add_always_ff(&mut self, timing: TimingControl, stmt: Stmt) -> SymbolId {
        self.add_procedural(
            ProceduralBlockKind::AlwaysFF,
            Stmt::new(StmtKind::Timed {
                timing,
                stmt: Box::new(stmt),
            }),
        )
    }

    /// A function with `logic [width-1:0]` formals and return value; the
    /// body is built by the caller from the formal/return symbol ids.
    pub fn add_function(
        &mut self,
        name: &str,
        arg_names: &[&str],
        width: usize,
        build_body: impl FnOnce(&[SymbolId], SymbolId) -> Stmt,
    ) -> SymbolId {
        let mut args = Vec::new();
        for arg_name in arg_names {
            let path = format!("{}.{}.{}", self.top_path(), name, arg_name);
            args.push(self.ast.add_symbol(
                *arg_name,
                path,
                SymbolKind::FormalArgument {
                    ty: Type::logic(width),
                },
            ));
        }
        let ret_path = format!("{}.{}.{}", self.top_path(), name, name);
        let return_var = self.ast.add_symbol(
            name,
            ret_path,
            SymbolKind::Variable {
                ty: Type::logic(width),
                initializer: None,
            },
        );
        let body = build_body(&args, return_var);
        self.add_member(
            name,
            SymbolKind::Function {
                args,
                return_var,
                body,
            },
        )
    }

    /// Reference a value symbol with its declared type.
    pub fn named(&self, symbol: SymbolId) -> Expr {
        let ty = self
            .ast
            .symbol(symbol)
            .value_type()
            .expect("named() needs a value symbol")
            .clone();
        Expr::named(ty, symbol)
    }

    pub fn elaborate(&self) -> Design {
        svnet_elab::elaborate(&self.ast).expect("elaboration failed")
    }

    pub fn try_elaborate(&self) -> svnet_elab::Result<Design> {
        svnet_elab::elaborate(&self.ast)
    }
}

/// An unsigned literal with its folded constant attached.
pub fn lit(value: u64, width: usize) -> Expr {
    Expr::literal(Type::logic(width), SvInt::from_u64(value, width))
}

pub fn binop(op: BinaryOp, ty: Type, lhs: Expr, rhs: Expr) -> Expr {
    Expr::new(
        ty,
        ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
    )
}

pub fn unop(op: UnaryOp, ty: Type, operand: Expr) -> Expr {
    Expr::new(
        ty,
        ExprKind::Unary {
            op,
            operand: Box::new(operand),
        },
    )
}

fn assignment(lhs: Expr, rhs: Expr, non_blocking: bool) -> Stmt {
    let ty = lhs.ty.clone();
    Stmt::expression(Expr::new(
        ty,
        ExprKind::Assignment {
            non_blocking,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
    ))
}

pub fn blocking(lhs: Expr, rhs: Expr) -> Stmt {
    assignment(lhs, rhs, false)
}

pub fn nonblocking(lhs: Expr, rhs: Expr) -> Stmt {
    assignment(lhs, rhs, true)
}

pub fn if_stmt(cond: Expr, if_true: Stmt, if_false: Option<Stmt>) -> Stmt {
    Stmt::new(StmtKind::Conditional {
        conditions: vec![Condition::plain(cond)],
        if_true: Box::new(if_true),
        if_false: if_false.map(Box::new),
    })
}

pub fn posedge(expr: Expr) -> TimingControl {
    TimingControl::SignalEvent {
        expr,
        edge: EdgeKind::PosEdge,
        iff: None,
    }
}

pub fn negedge(expr: Expr) -> TimingControl {
    TimingControl::SignalEvent {
        expr,
        edge: EdgeKind::NegEdge,
        iff: None,
    }
}

pub fn event_list(events: Vec<TimingControl>) -> TimingControl {
    TimingControl::EventList(events)
}

pub fn display_call(args: Vec<Expr>) -> Stmt {
    Stmt::expression(Expr::new(
        Type::logic(1),
        ExprKind::Call(Call {
            target: CallTarget::System("$display".to_string()),
            args,
        }),
    ))
}

pub fn string_lit(s: &str) -> Expr {
    Expr::new(
        Type::logic(8 * s.len()),
        ExprKind::StringLiteral(s.to_string()),
    )
}
