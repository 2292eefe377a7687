//! Source emission.
//!
//! `emit` is pure and total for well-formed trees. The pretty form places
//! one statement per line and indents gate bodies; the compact form joins
//! everything with single spaces. Both re-parse to structurally equivalent
//! trees.

use crate::node::{NodeId, NodeKind, UnaryOpKind};
use crate::tree::Ast;

const INDENT: &str = "    ";

/// Format a real literal so it re-lexes as a real (never as an integer).
fn format_real(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

impl Ast {
    /// Serialize the subtree rooted at `id` back to OPENQASM source.
    pub fn emit(&self, id: NodeId, pretty: bool) -> String {
        self.fmt_node(id, pretty, 0)
    }

    fn fmt_list(&self, id: NodeId, pretty: bool, indent: usize) -> String {
        self.children(id)
            .iter()
            .map(|&c| self.fmt_node(c, pretty, indent))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn fmt_stmts(&self, id: NodeId, pretty: bool, indent: usize) -> String {
        let pad = INDENT.repeat(indent);
        let parts: Vec<String> = self
            .children(id)
            .iter()
            .map(|&c| self.fmt_node(c, pretty, indent))
            .collect();
        if pretty {
            parts
                .into_iter()
                .map(|p| format!("{pad}{p}\n"))
                .collect::<String>()
        } else {
            parts.join(" ")
        }
    }

    /// Optional parenthesized classical-argument list: empty lists emit
    /// nothing at all.
    fn fmt_opt_args(&self, args: NodeId, pretty: bool) -> String {
        if self.child_count(args) == 0 {
            String::new()
        } else {
            format!("({})", self.fmt_list(args, pretty, 0))
        }
    }

    fn fmt_node(&self, id: NodeId, pretty: bool, indent: usize) -> String {
        match self.kind(id) {
            NodeKind::QasmVersion => {
                let version = self.children(id)[0];
                let stmts = self.children(id)[1];
                let sep = if pretty { "\n" } else { " " };
                format!(
                    "OPENQASM {};{sep}{}",
                    self.fmt_node(version, pretty, 0),
                    self.fmt_stmts(stmts, pretty, indent)
                )
            }

            NodeKind::Include => {
                let filename = self.children(id)[0];
                format!("include \"{}\";", self.fmt_node(filename, pretty, 0))
            }

            NodeKind::RegDecl { quantum } => {
                let keyword = if *quantum { "qreg" } else { "creg" };
                let name = self.children(id)[0];
                let size = self.children(id)[1];
                format!(
                    "{keyword} {}[{}];",
                    self.fmt_node(name, pretty, 0),
                    self.fmt_node(size, pretty, 0)
                )
            }

            NodeKind::GateSign => {
                let name = self.children(id)[0];
                let args = self.children(id)[1];
                let qargs = self.children(id)[2];
                format!(
                    "opaque {}{} {};",
                    self.fmt_node(name, pretty, 0),
                    self.fmt_opt_args(args, pretty),
                    self.fmt_list(qargs, pretty, 0)
                )
            }

            NodeKind::GateDecl => {
                let name = self.children(id)[0];
                let args = self.children(id)[1];
                let qargs = self.children(id)[2];
                let body = self.children(id)[3];
                let header = format!(
                    "gate {}{} {} {{",
                    self.fmt_node(name, pretty, 0),
                    self.fmt_opt_args(args, pretty),
                    self.fmt_list(qargs, pretty, 0)
                );
                if pretty {
                    let pad = INDENT.repeat(indent);
                    format!(
                        "{header}\n{}{pad}}}",
                        self.fmt_stmts(body, pretty, indent + 1)
                    )
                } else if self.child_count(body) == 0 {
                    format!("{header} }}")
                } else {
                    format!("{header} {} }}", self.fmt_stmts(body, pretty, 0))
                }
            }

            NodeKind::Measure => {
                let qbit = self.children(id)[0];
                let cbit = self.children(id)[1];
                format!(
                    "measure {} -> {};",
                    self.fmt_node(qbit, pretty, 0),
                    self.fmt_node(cbit, pretty, 0)
                )
            }

            NodeKind::Reset => {
                format!("reset {};", self.fmt_node(self.children(id)[0], pretty, 0))
            }

            NodeKind::Barrier => {
                format!(
                    "barrier {};",
                    self.fmt_list(self.children(id)[0], pretty, 0)
                )
            }

            NodeKind::Cx => {
                let lhs = self.children(id)[0];
                let rhs = self.children(id)[1];
                format!(
                    "CX {}, {};",
                    self.fmt_node(lhs, pretty, 0),
                    self.fmt_node(rhs, pretty, 0)
                )
            }

            NodeKind::U => {
                let args = self.children(id)[0];
                let qarg = self.children(id)[1];
                format!(
                    "U({}) {};",
                    self.fmt_list(args, pretty, 0),
                    self.fmt_node(qarg, pretty, 0)
                )
            }

            NodeKind::Generic => {
                let name = self.children(id)[0];
                let args = self.children(id)[1];
                let qargs = self.children(id)[2];
                format!(
                    "{}{} {};",
                    self.fmt_node(name, pretty, 0),
                    self.fmt_opt_args(args, pretty),
                    self.fmt_list(qargs, pretty, 0)
                )
            }

            NodeKind::BinOp(op) => {
                let lhs = self.children(id)[0];
                let rhs = self.children(id)[1];
                format!(
                    "({} {} {})",
                    self.fmt_node(lhs, pretty, 0),
                    op.symbol(),
                    self.fmt_node(rhs, pretty, 0)
                )
            }

            NodeKind::UnaryOp(op) => {
                let operand = self.fmt_node(self.children(id)[0], pretty, 0);
                if *op == UnaryOpKind::Neg {
                    format!("-({operand})")
                } else {
                    format!("{}({operand})", op.name())
                }
            }

            NodeKind::IdRef => {
                let name = self.children(id)[0];
                let index = self.children(id)[1];
                format!(
                    "{}[{}]",
                    self.fmt_node(name, pretty, 0),
                    self.fmt_node(index, pretty, 0)
                )
            }

            NodeKind::List => self.fmt_list(id, pretty, indent),

            NodeKind::StmtList | NodeKind::GOpList => self.fmt_stmts(id, pretty, indent),

            NodeKind::IfStmt => {
                let cond_id = self.children(id)[0];
                let cond_value = self.children(id)[1];
                let qop = self.children(id)[2];
                format!(
                    "if ({} == {}) {}",
                    self.fmt_node(cond_id, pretty, 0),
                    self.fmt_node(cond_value, pretty, 0),
                    self.fmt_node(qop, pretty, 0)
                )
            }

            NodeKind::LitInt(v) => v.to_string(),
            NodeKind::LitReal(v) => format_real(*v),
            NodeKind::LitString(s) => s.clone(),
        }
    }
}
