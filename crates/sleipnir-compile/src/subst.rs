//! Textual-identity substitution over operation subtrees.
//!
//! Shared by the inliner (formal → actual rewriting) and the rename pass
//! (program qubit → hardware qubit rewriting). A child is replaced when
//! its compact emission matches a table key; the replacement is a fresh
//! clone of the table's node, and freshly inserted clones are not
//! re-substituted.

use rustc_hash::FxHashMap;
use sleipnir_ast::{Ast, AstResult, NodeId, NodeKind};

/// Rewrite every reference in the operation subtree at `node` per `table`.
///
/// Gate-name children of invocations and the condition identifier of an
/// `if` are never touched; only argument and qubit-argument positions
/// (including expression subtrees in classical arguments) are rewritten.
pub(crate) fn substitute(
    ast: &mut Ast,
    node: NodeId,
    table: &FxHashMap<String, NodeId>,
) -> AstResult<()> {
    match ast.kind(node) {
        NodeKind::Generic => {
            let args = ast.child(node, 1)?;
            let qargs = ast.child(node, 2)?;
            substitute_children(ast, args, table)?;
            substitute_children(ast, qargs, table)
        }

        NodeKind::U => {
            let args = ast.child(node, 0)?;
            substitute_children(ast, args, table)?;
            replace_if_match(ast, node, 1, table)
        }

        NodeKind::Cx | NodeKind::Measure => {
            replace_if_match(ast, node, 0, table)?;
            replace_if_match(ast, node, 1, table)
        }

        NodeKind::Reset => replace_if_match(ast, node, 0, table),

        NodeKind::Barrier => {
            let qargs = ast.child(node, 0)?;
            substitute_children(ast, qargs, table)
        }

        NodeKind::IfStmt => {
            let qop = ast.child(node, 2)?;
            substitute(ast, qop, table)
        }

        NodeKind::List | NodeKind::BinOp(_) | NodeKind::UnaryOp(_) => {
            substitute_children(ast, node, table)
        }

        _ => Ok(()),
    }
}

/// Recurse into each child, then replace the child itself if its text
/// matches a table key.
fn substitute_children(
    ast: &mut Ast,
    parent: NodeId,
    table: &FxHashMap<String, NodeId>,
) -> AstResult<()> {
    for i in 0..ast.child_count(parent) {
        let child = ast.children(parent)[i];
        if matches!(
            ast.kind(child),
            NodeKind::List | NodeKind::BinOp(_) | NodeKind::UnaryOp(_)
        ) {
            substitute_children(ast, child, table)?;
        }
        replace_if_match(ast, parent, i, table)?;
    }
    Ok(())
}

fn replace_if_match(
    ast: &mut Ast,
    parent: NodeId,
    index: usize,
    table: &FxHashMap<String, NodeId>,
) -> AstResult<()> {
    let child = ast.child(parent, index)?;
    let text = ast.emit(child, false);
    if let Some(&replacement) = table.get(&text) {
        let clone = ast.clone_subtree(replacement);
        ast.set_child(parent, index, clone)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_cx_operands() {
        let mut ast = Ast::new();
        let x = ast.lit_id("x");
        let y = ast.lit_id("y");
        let cx = ast.cx(x, y);

        let q = ast.lit_id("q");
        let zero = ast.lit_int(0);
        let actual = ast.id_ref(q, zero);

        let mut table = FxHashMap::default();
        table.insert("x".to_string(), actual);
        substitute(&mut ast, cx, &table).unwrap();

        assert_eq!(ast.emit(cx, false), "CX q[0], y;");
    }

    #[test]
    fn test_substitute_leaves_gate_name_alone() {
        // A formal named like the invoked gate must not rewrite the name.
        let mut ast = Ast::new();
        let name = ast.lit_id("g");
        let args = ast.list();
        let qargs = ast.list();
        let operand = ast.lit_id("g");
        ast.list_push(qargs, operand).unwrap();
        let call = ast.call(name, args, qargs);

        let q = ast.lit_id("q");
        let one = ast.lit_int(1);
        let actual = ast.id_ref(q, one);
        let mut table = FxHashMap::default();
        table.insert("g".to_string(), actual);
        substitute(&mut ast, call, &table).unwrap();

        assert_eq!(ast.emit(call, false), "g q[1];");
    }

    #[test]
    fn test_substitute_inside_expressions() {
        let mut ast = Ast::new();
        let phi = ast.lit_id("phi");
        let two = ast.lit_int(2);
        let half = ast.bin_op(sleipnir_ast::BinOpKind::Div, phi, two);
        let args = ast.list();
        ast.list_push(args, half).unwrap();
        let qarg = ast.lit_id("a");
        let u = ast.u(args, qarg);

        let pi = ast.lit_id("pi");
        let mut table = FxHashMap::default();
        table.insert("phi".to_string(), pi);
        substitute(&mut ast, u, &table).unwrap();

        assert_eq!(ast.emit(u, false), "U((pi / 2)) a;");
    }

    #[test]
    fn test_substitute_only_if_body() {
        let mut ast = Ast::new();
        let a = ast.lit_id("c");
        let b = ast.lit_id("d");
        let cx = ast.cx(a, b);
        let cond = ast.lit_id("c");
        let value = ast.lit_int(1);
        let if_stmt = ast.if_stmt(cond, value, cx);

        let q = ast.lit_id("q");
        let zero = ast.lit_int(0);
        let actual = ast.id_ref(q, zero);
        let mut table = FxHashMap::default();
        table.insert("c".to_string(), actual);
        substitute(&mut ast, if_stmt, &table).unwrap();

        // The condition id stays; the qop operand is rewritten.
        assert_eq!(ast.emit(if_stmt, false), "if (c == 1) CX q[0], d;");
    }
}
