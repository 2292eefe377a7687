//! Visitor dispatch over node kinds.
//!
//! A visitor exposes one hook per concrete kind; every hook defaults to
//! [`Visitor::visit_children`], which recurses depth-first and
//! left-to-right. Overriding a hook without calling `visit_children` skips
//! the subtree. The framework keeps no hidden traversal state; anything a
//! pass accumulates lives on the visitor value itself.

use crate::node::{NodeId, NodeKind};
use crate::tree::Ast;

/// One hook per concrete node kind.
pub trait Visitor: Sized {
    /// Recurse into the children of `id`, in child order.
    fn visit_children(&mut self, ast: &Ast, id: NodeId) {
        for &child in ast.children(id) {
            ast.apply(child, self);
        }
    }

    fn visit_qasm_version(&mut self, ast: &Ast, id: NodeId) {
        self.visit_children(ast, id);
    }

    fn visit_include(&mut self, ast: &Ast, id: NodeId) {
        self.visit_children(ast, id);
    }

    fn visit_reg_decl(&mut self, ast: &Ast, id: NodeId) {
        self.visit_children(ast, id);
    }

    fn visit_gate_sign(&mut self, ast: &Ast, id: NodeId) {
        self.visit_children(ast, id);
    }

    fn visit_gate_decl(&mut self, ast: &Ast, id: NodeId) {
        self.visit_children(ast, id);
    }

    fn visit_measure(&mut self, ast: &Ast, id: NodeId) {
        self.visit_children(ast, id);
    }

    fn visit_reset(&mut self, ast: &Ast, id: NodeId) {
        self.visit_children(ast, id);
    }

    fn visit_barrier(&mut self, ast: &Ast, id: NodeId) {
        self.visit_children(ast, id);
    }

    fn visit_cx(&mut self, ast: &Ast, id: NodeId) {
        self.visit_children(ast, id);
    }

    fn visit_u(&mut self, ast: &Ast, id: NodeId) {
        self.visit_children(ast, id);
    }

    fn visit_generic(&mut self, ast: &Ast, id: NodeId) {
        self.visit_children(ast, id);
    }

    fn visit_bin_op(&mut self, ast: &Ast, id: NodeId) {
        self.visit_children(ast, id);
    }

    fn visit_unary_op(&mut self, ast: &Ast, id: NodeId) {
        self.visit_children(ast, id);
    }

    fn visit_id_ref(&mut self, ast: &Ast, id: NodeId) {
        self.visit_children(ast, id);
    }

    fn visit_list(&mut self, ast: &Ast, id: NodeId) {
        self.visit_children(ast, id);
    }

    fn visit_stmt_list(&mut self, ast: &Ast, id: NodeId) {
        self.visit_children(ast, id);
    }

    fn visit_gop_list(&mut self, ast: &Ast, id: NodeId) {
        self.visit_children(ast, id);
    }

    fn visit_if_stmt(&mut self, ast: &Ast, id: NodeId) {
        self.visit_children(ast, id);
    }

    fn visit_lit_int(&mut self, _ast: &Ast, _id: NodeId) {}

    fn visit_lit_real(&mut self, _ast: &Ast, _id: NodeId) {}

    fn visit_lit_string(&mut self, _ast: &Ast, _id: NodeId) {}
}

impl Ast {
    /// Double-dispatch: route `id` to the visitor hook matching its kind.
    pub fn apply<V: Visitor>(&self, id: NodeId, visitor: &mut V) {
        match self.kind(id) {
            NodeKind::QasmVersion => visitor.visit_qasm_version(self, id),
            NodeKind::Include => visitor.visit_include(self, id),
            NodeKind::RegDecl { .. } => visitor.visit_reg_decl(self, id),
            NodeKind::GateSign => visitor.visit_gate_sign(self, id),
            NodeKind::GateDecl => visitor.visit_gate_decl(self, id),
            NodeKind::Measure => visitor.visit_measure(self, id),
            NodeKind::Reset => visitor.visit_reset(self, id),
            NodeKind::Barrier => visitor.visit_barrier(self, id),
            NodeKind::Cx => visitor.visit_cx(self, id),
            NodeKind::U => visitor.visit_u(self, id),
            NodeKind::Generic => visitor.visit_generic(self, id),
            NodeKind::BinOp(_) => visitor.visit_bin_op(self, id),
            NodeKind::UnaryOp(_) => visitor.visit_unary_op(self, id),
            NodeKind::IdRef => visitor.visit_id_ref(self, id),
            NodeKind::List => visitor.visit_list(self, id),
            NodeKind::StmtList => visitor.visit_stmt_list(self, id),
            NodeKind::GOpList => visitor.visit_gop_list(self, id),
            NodeKind::IfStmt => visitor.visit_if_stmt(self, id),
            NodeKind::LitInt(_) => visitor.visit_lit_int(self, id),
            NodeKind::LitReal(_) => visitor.visit_lit_real(self, id),
            NodeKind::LitString(_) => visitor.visit_lit_string(self, id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Collects the kind names of every visited node, in visit order.
    #[derive(Default)]
    struct Trace {
        seen: Vec<&'static str>,
    }

    impl Visitor for Trace {
        fn visit_cx(&mut self, ast: &Ast, id: NodeId) {
            self.seen.push("Cx");
            self.visit_children(ast, id);
        }

        fn visit_id_ref(&mut self, ast: &Ast, id: NodeId) {
            self.seen.push("IdRef");
            self.visit_children(ast, id);
        }

        fn visit_lit_int(&mut self, _ast: &Ast, _id: NodeId) {
            self.seen.push("LitInt");
        }

        fn visit_lit_string(&mut self, _ast: &Ast, _id: NodeId) {
            self.seen.push("LitString");
        }
    }

    #[test]
    fn test_depth_first_left_to_right() {
        let mut ast = Ast::new();
        let q = ast.lit_id("q");
        let zero = ast.lit_int(0);
        let lhs = ast.id_ref(q, zero);
        let q = ast.lit_id("q");
        let one = ast.lit_int(1);
        let rhs = ast.id_ref(q, one);
        let cx = ast.cx(lhs, rhs);

        let mut trace = Trace::default();
        ast.apply(cx, &mut trace);

        assert_eq!(
            trace.seen,
            vec!["Cx", "IdRef", "LitString", "LitInt", "IdRef", "LitString", "LitInt"]
        );
    }

    /// A hook that does not call `visit_children` skips the subtree.
    struct SkipRhs {
        ids: usize,
    }

    impl Visitor for SkipRhs {
        fn visit_cx(&mut self, ast: &Ast, id: NodeId) {
            if let Some(&first) = ast.children(id).first() {
                ast.apply(first, self);
            }
        }

        fn visit_id_ref(&mut self, ast: &Ast, id: NodeId) {
            self.ids += 1;
            self.visit_children(ast, id);
        }
    }

    #[test]
    fn test_subtree_skipping() {
        let mut ast = Ast::new();
        let q = ast.lit_id("q");
        let zero = ast.lit_int(0);
        let lhs = ast.id_ref(q, zero);
        let q = ast.lit_id("q");
        let one = ast.lit_int(1);
        let rhs = ast.id_ref(q, one);
        let cx = ast.cx(lhs, rhs);

        let mut v = SkipRhs { ids: 0 };
        ast.apply(cx, &mut v);
        assert_eq!(v.ids, 1);
    }
}
