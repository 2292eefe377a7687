//! The arena tree: node storage, factory constructors, and the structural
//! mutators that keep parent links consistent.

use serde::{Deserialize, Serialize};

use crate::error::{AstError, AstResult};
use crate::node::{BinOpKind, Node, NodeId, NodeKind, UnaryOpKind};

/// An arena owning every node of one tree.
///
/// Nodes are created through the factory constructors (which enforce child
/// count and parent-linking) and mutated only through the child-set and
/// list operations, all of which preserve the `child.parent == self`
/// invariant. Detached subtrees stay in the arena until it is dropped.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Ast {
    nodes: Vec<Node>,
}

impl Ast {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes ever allocated in this arena (including detached ones).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Allocate a node, adopting `children` (which must be detached).
    fn add(&mut self, kind: NodeKind, children: Vec<NodeId>) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        for &child in &children {
            debug_assert!(
                self.node(child).parent.is_none(),
                "factory child {child:?} already has a parent"
            );
            self.nodes[child.index()].parent = Some(id);
        }
        self.nodes.push(Node {
            kind,
            children,
            parent: None,
            generated: false,
            in_include: false,
        });
        id
    }

    // ---- Accessors -------------------------------------------------------

    /// Kind tag of a node.
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    /// Ordered children of a node.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Number of children.
    pub fn child_count(&self, id: NodeId) -> usize {
        self.node(id).children.len()
    }

    /// The `i`-th child, or an error if the index is out of range.
    pub fn child(&self, id: NodeId, index: usize) -> AstResult<NodeId> {
        let node = self.node(id);
        node.children
            .get(index)
            .copied()
            .ok_or(AstError::ChildOutOfBounds {
                node: id,
                index,
                len: node.children.len(),
            })
    }

    /// Non-owning parent back-reference.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Whether this node was synthesized by the compiler.
    pub fn generated(&self, id: NodeId) -> bool {
        self.node(id).generated
    }

    /// Mark a node as compiler-synthesized.
    pub fn set_generated(&mut self, id: NodeId) {
        self.node_mut(id).generated = true;
    }

    /// Mark a whole subtree as compiler-synthesized.
    pub fn mark_generated(&mut self, id: NodeId) {
        self.node_mut(id).generated = true;
        for i in 0..self.child_count(id) {
            let child = self.node(id).children[i];
            self.mark_generated(child);
        }
    }

    /// Whether this node descends from an include node.
    pub fn in_include(&self, id: NodeId) -> bool {
        self.node(id).in_include
    }

    /// Mark a whole subtree as belonging to an include.
    pub fn mark_in_include(&mut self, id: NodeId) {
        self.node_mut(id).in_include = true;
        for i in 0..self.child_count(id) {
            let child = self.node(id).children[i];
            self.mark_in_include(child);
        }
    }

    /// Payload of a string literal (identifier or filename).
    pub fn str_val(&self, id: NodeId) -> AstResult<&str> {
        match &self.node(id).kind {
            NodeKind::LitString(s) => Ok(s),
            other => Err(AstError::KindMismatch {
                node: id,
                expected: "LitString",
                found: other.name(),
            }),
        }
    }

    /// Payload of an integer literal.
    pub fn int_val(&self, id: NodeId) -> AstResult<i64> {
        match self.node(id).kind {
            NodeKind::LitInt(v) => Ok(v),
            ref other => Err(AstError::KindMismatch {
                node: id,
                expected: "LitInt",
                found: other.name(),
            }),
        }
    }

    /// Payload of a real literal.
    pub fn real_val(&self, id: NodeId) -> AstResult<f64> {
        match self.node(id).kind {
            NodeKind::LitReal(v) => Ok(v),
            ref other => Err(AstError::KindMismatch {
                node: id,
                expected: "LitReal",
                found: other.name(),
            }),
        }
    }

    /// Operation name of a node: the gate id for invocations and
    /// declarations, the operator symbol for expressions, the statement
    /// keyword otherwise.
    pub fn operation(&self, id: NodeId) -> String {
        match &self.node(id).kind {
            NodeKind::QasmVersion => "OPENQASM".into(),
            NodeKind::Include => "include".into(),
            NodeKind::RegDecl { quantum: true } => "qreg".into(),
            NodeKind::RegDecl { quantum: false } => "creg".into(),
            NodeKind::GateSign => "opaque".into(),
            NodeKind::GateDecl | NodeKind::Generic => self
                .children(id)
                .first()
                .and_then(|&c| self.str_val(c).ok())
                .unwrap_or_default()
                .to_string(),
            NodeKind::Measure => "measure".into(),
            NodeKind::Reset => "reset".into(),
            NodeKind::Barrier => "barrier".into(),
            NodeKind::Cx => "CX".into(),
            NodeKind::U => "U".into(),
            NodeKind::BinOp(op) => op.symbol().into(),
            NodeKind::UnaryOp(op) => op.name().into(),
            NodeKind::IfStmt => "if".into(),
            NodeKind::LitInt(v) => v.to_string(),
            NodeKind::LitReal(v) => v.to_string(),
            NodeKind::LitString(s) => s.clone(),
            NodeKind::IdRef | NodeKind::List | NodeKind::StmtList | NodeKind::GOpList => {
                String::new()
            }
        }
    }

    // ---- Factory constructors --------------------------------------------

    /// `OPENQASM <version>;` followed by the program statements.
    pub fn qasm_version(&mut self, version: NodeId, stmts: NodeId) -> NodeId {
        self.add(NodeKind::QasmVersion, vec![version, stmts])
    }

    /// `include "<filename>";` with the included statements as inner child.
    pub fn include(&mut self, filename: NodeId, inner: NodeId) -> NodeId {
        self.add(NodeKind::Include, vec![filename, inner])
    }

    /// `qreg id[size];` or `creg id[size];`
    pub fn reg_decl(&mut self, quantum: bool, id: NodeId, size: NodeId) -> NodeId {
        self.add(NodeKind::RegDecl { quantum }, vec![id, size])
    }

    /// Opaque gate declaration: signature without a body.
    pub fn gate_sign(&mut self, id: NodeId, args: NodeId, qargs: NodeId) -> NodeId {
        self.add(NodeKind::GateSign, vec![id, args, qargs])
    }

    /// Gate declaration with a `GOpList` body.
    pub fn gate_decl(&mut self, id: NodeId, args: NodeId, qargs: NodeId, body: NodeId) -> NodeId {
        self.add(NodeKind::GateDecl, vec![id, args, qargs, body])
    }

    /// `measure q -> c;`
    pub fn measure(&mut self, qbit: NodeId, cbit: NodeId) -> NodeId {
        self.add(NodeKind::Measure, vec![qbit, cbit])
    }

    /// `reset q;`
    pub fn reset(&mut self, qarg: NodeId) -> NodeId {
        self.add(NodeKind::Reset, vec![qarg])
    }

    /// `barrier q0, q1, ...;` with the qargs in a `List`.
    pub fn barrier(&mut self, qargs: NodeId) -> NodeId {
        self.add(NodeKind::Barrier, vec![qargs])
    }

    /// `CX control, target;`
    pub fn cx(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.add(NodeKind::Cx, vec![lhs, rhs])
    }

    /// `U(theta, phi, lambda) q;` with the angles in a `List`.
    pub fn u(&mut self, args: NodeId, qarg: NodeId) -> NodeId {
        self.add(NodeKind::U, vec![args, qarg])
    }

    /// Invocation of a named gate: `id(args) qargs;`
    pub fn call(&mut self, id: NodeId, args: NodeId, qargs: NodeId) -> NodeId {
        self.add(NodeKind::Generic, vec![id, args, qargs])
    }

    /// Binary expression.
    pub fn bin_op(&mut self, op: BinOpKind, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.add(NodeKind::BinOp(op), vec![lhs, rhs])
    }

    /// Unary expression.
    pub fn unary_op(&mut self, op: UnaryOpKind, operand: NodeId) -> NodeId {
        self.add(NodeKind::UnaryOp(op), vec![operand])
    }

    /// Indexed register reference: `id[index]`.
    pub fn id_ref(&mut self, id: NodeId, index: NodeId) -> NodeId {
        self.add(NodeKind::IdRef, vec![id, index])
    }

    /// `if (cond_id == cond_value) qop`
    pub fn if_stmt(&mut self, cond_id: NodeId, cond_value: NodeId, qop: NodeId) -> NodeId {
        self.add(NodeKind::IfStmt, vec![cond_id, cond_value, qop])
    }

    /// Empty generic list.
    pub fn list(&mut self) -> NodeId {
        self.add(NodeKind::List, vec![])
    }

    /// Empty statement list.
    pub fn stmt_list(&mut self) -> NodeId {
        self.add(NodeKind::StmtList, vec![])
    }

    /// Empty gate-body operation list.
    pub fn gop_list(&mut self) -> NodeId {
        self.add(NodeKind::GOpList, vec![])
    }

    /// Integer literal leaf.
    pub fn lit_int(&mut self, value: i64) -> NodeId {
        self.add(NodeKind::LitInt(value), vec![])
    }

    /// Real literal leaf.
    pub fn lit_real(&mut self, value: f64) -> NodeId {
        self.add(NodeKind::LitReal(value), vec![])
    }

    /// String literal leaf, used for identifiers and filenames.
    pub fn lit_id(&mut self, value: impl Into<String>) -> NodeId {
        self.add(NodeKind::LitString(value.into()), vec![])
    }

    // ---- Structural mutators ---------------------------------------------

    /// Replace the `index`-th child of `parent` with `new`, returning the
    /// displaced child (now detached). `new` must itself be detached.
    pub fn set_child(&mut self, parent: NodeId, index: usize, new: NodeId) -> AstResult<NodeId> {
        let len = self.child_count(parent);
        if index >= len {
            return Err(AstError::ChildOutOfBounds {
                node: parent,
                index,
                len,
            });
        }
        if self.node(new).parent.is_some() {
            return Err(AstError::InvariantViolation(format!(
                "replacement node {new:?} already has a parent"
            )));
        }
        let old = self.node(parent).children[index];
        self.node_mut(old).parent = None;
        self.node_mut(new).parent = Some(parent);
        self.node_mut(parent).children[index] = new;
        Ok(old)
    }

    /// Append a detached node to a list-kind node.
    pub fn list_push(&mut self, list: NodeId, child: NodeId) -> AstResult<()> {
        let len = self.child_count(list);
        self.list_insert(list, len, child)
    }

    /// Insert a detached node into a list-kind node at `index`.
    pub fn list_insert(&mut self, list: NodeId, index: usize, child: NodeId) -> AstResult<()> {
        if !self.kind(list).is_list_kind() {
            return Err(AstError::KindMismatch {
                node: list,
                expected: "List",
                found: self.kind(list).name(),
            });
        }
        let len = self.child_count(list);
        if index > len {
            return Err(AstError::ChildOutOfBounds {
                node: list,
                index,
                len,
            });
        }
        if self.node(child).parent.is_some() {
            return Err(AstError::InvariantViolation(format!(
                "inserted node {child:?} already has a parent"
            )));
        }
        self.node_mut(child).parent = Some(list);
        self.node_mut(list).children.insert(index, child);
        Ok(())
    }

    /// Remove and return (detached) the `index`-th child of a list.
    pub fn list_remove(&mut self, list: NodeId, index: usize) -> AstResult<NodeId> {
        let len = self.child_count(list);
        if index >= len {
            return Err(AstError::ChildOutOfBounds {
                node: list,
                index,
                len,
            });
        }
        let child = self.node_mut(list).children.remove(index);
        self.node_mut(child).parent = None;
        Ok(child)
    }

    /// Position of `child` within `parent`'s child vector.
    pub fn position_of(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.node(parent).children.iter().position(|&c| c == child)
    }

    /// Replace `old` inside a list with a sequence of detached nodes,
    /// preserving position. Returns the index of the first replacement.
    /// `old` is detached, not destroyed.
    pub fn replace_in_list(
        &mut self,
        list: NodeId,
        old: NodeId,
        replacements: Vec<NodeId>,
    ) -> AstResult<usize> {
        let index = self
            .position_of(list, old)
            .ok_or(AstError::NotAChild { parent: list, child: old })?;
        self.list_remove(list, index)?;
        for (offset, node) in replacements.into_iter().enumerate() {
            self.list_insert(list, index + offset, node)?;
        }
        Ok(index)
    }

    // ---- Clone and equality ----------------------------------------------

    /// Deep-copy a subtree within this arena. Flags and literal payloads
    /// are preserved; the new root is detached.
    pub fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        let source = self.node(id).clone();
        let children: Vec<NodeId> = source
            .children
            .iter()
            .map(|&c| self.clone_subtree(c))
            .collect();
        let new_id = self.add(source.kind, children);
        self.node_mut(new_id).generated = source.generated;
        self.node_mut(new_id).in_include = source.in_include;
        new_id
    }

    /// Deep-copy a subtree out of another arena into this one.
    pub fn clone_from_tree(&mut self, other: &Ast, id: NodeId) -> NodeId {
        let source = other.node(id);
        let children: Vec<NodeId> = source
            .children
            .iter()
            .map(|&c| self.clone_from_tree(other, c))
            .collect();
        let new_id = self.add(source.kind.clone(), children);
        self.node_mut(new_id).generated = source.generated;
        self.node_mut(new_id).in_include = source.in_include;
        new_id
    }

    /// Recursive structural equality over kind, payload, and ordered
    /// children, within this arena.
    pub fn structural_eq(&self, a: NodeId, b: NodeId) -> bool {
        self.eq_across(a, self, b)
    }

    /// Structural equality between a subtree of this arena and a subtree of
    /// another arena.
    pub fn eq_across(&self, a: NodeId, other: &Ast, b: NodeId) -> bool {
        let na = self.node(a);
        let nb = other.node(b);
        na.kind == nb.kind
            && na.children.len() == nb.children.len()
            && na
                .children
                .iter()
                .zip(&nb.children)
                .all(|(&ca, &cb)| self.eq_across(ca, other, cb))
    }

    // ---- Checked downcasts -----------------------------------------------

    fn expect(&self, id: NodeId, want: &'static str, ok: bool) -> AstResult<()> {
        if ok {
            Ok(())
        } else {
            Err(AstError::KindMismatch {
                node: id,
                expected: want,
                found: self.kind(id).name(),
            })
        }
    }

    /// View a register declaration.
    pub fn as_reg_decl(&self, id: NodeId) -> AstResult<RegDeclView> {
        match *self.kind(id) {
            NodeKind::RegDecl { quantum } => Ok(RegDeclView {
                id: self.child(id, 0)?,
                size: self.child(id, 1)?,
                quantum,
            }),
            ref other => Err(AstError::KindMismatch {
                node: id,
                expected: "RegDecl",
                found: other.name(),
            }),
        }
    }

    /// View a gate declaration or opaque signature. `body` is `None` for
    /// opaque gates.
    pub fn as_gate(&self, id: NodeId) -> AstResult<GateView> {
        match self.kind(id) {
            NodeKind::GateDecl => Ok(GateView {
                id: self.child(id, 0)?,
                args: self.child(id, 1)?,
                qargs: self.child(id, 2)?,
                body: Some(self.child(id, 3)?),
            }),
            NodeKind::GateSign => Ok(GateView {
                id: self.child(id, 0)?,
                args: self.child(id, 1)?,
                qargs: self.child(id, 2)?,
                body: None,
            }),
            other => Err(AstError::KindMismatch {
                node: id,
                expected: "GateDecl",
                found: other.name(),
            }),
        }
    }

    /// View a generic gate invocation.
    pub fn as_call(&self, id: NodeId) -> AstResult<CallView> {
        self.expect(id, "Generic", matches!(self.kind(id), NodeKind::Generic))?;
        Ok(CallView {
            id: self.child(id, 0)?,
            args: self.child(id, 1)?,
            qargs: self.child(id, 2)?,
        })
    }

    /// View a measurement.
    pub fn as_measure(&self, id: NodeId) -> AstResult<MeasureView> {
        self.expect(id, "Measure", matches!(self.kind(id), NodeKind::Measure))?;
        Ok(MeasureView {
            qbit: self.child(id, 0)?,
            cbit: self.child(id, 1)?,
        })
    }

    /// View a `CX` primitive.
    pub fn as_cx(&self, id: NodeId) -> AstResult<CxView> {
        self.expect(id, "Cx", matches!(self.kind(id), NodeKind::Cx))?;
        Ok(CxView {
            lhs: self.child(id, 0)?,
            rhs: self.child(id, 1)?,
        })
    }

    /// View a `U` primitive.
    pub fn as_u(&self, id: NodeId) -> AstResult<UView> {
        self.expect(id, "U", matches!(self.kind(id), NodeKind::U))?;
        Ok(UView {
            args: self.child(id, 0)?,
            qarg: self.child(id, 1)?,
        })
    }

    /// View a conditional statement.
    pub fn as_if_stmt(&self, id: NodeId) -> AstResult<IfStmtView> {
        self.expect(id, "IfStmt", matches!(self.kind(id), NodeKind::IfStmt))?;
        Ok(IfStmtView {
            cond_id: self.child(id, 0)?,
            cond_value: self.child(id, 1)?,
            qop: self.child(id, 2)?,
        })
    }

    /// View an indexed register reference.
    pub fn as_id_ref(&self, id: NodeId) -> AstResult<IdRefView> {
        self.expect(id, "IdRef", matches!(self.kind(id), NodeKind::IdRef))?;
        Ok(IdRefView {
            id: self.child(id, 0)?,
            index: self.child(id, 1)?,
        })
    }
}

/// Checked view of a `RegDecl` node.
#[derive(Debug, Clone, Copy)]
pub struct RegDeclView {
    pub id: NodeId,
    pub size: NodeId,
    pub quantum: bool,
}

/// Checked view of a `GateDecl` or `GateSign` node.
#[derive(Debug, Clone, Copy)]
pub struct GateView {
    pub id: NodeId,
    pub args: NodeId,
    pub qargs: NodeId,
    pub body: Option<NodeId>,
}

impl GateView {
    /// Whether this is an opaque (declaration-only) gate.
    pub fn is_opaque(&self) -> bool {
        self.body.is_none()
    }
}

/// Checked view of a `Generic` invocation node.
#[derive(Debug, Clone, Copy)]
pub struct CallView {
    pub id: NodeId,
    pub args: NodeId,
    pub qargs: NodeId,
}

/// Checked view of a `Measure` node.
#[derive(Debug, Clone, Copy)]
pub struct MeasureView {
    pub qbit: NodeId,
    pub cbit: NodeId,
}

/// Checked view of a `Cx` node.
#[derive(Debug, Clone, Copy)]
pub struct CxView {
    pub lhs: NodeId,
    pub rhs: NodeId,
}

/// Checked view of a `U` node.
#[derive(Debug, Clone, Copy)]
pub struct UView {
    pub args: NodeId,
    pub qarg: NodeId,
}

/// Checked view of an `IfStmt` node.
#[derive(Debug, Clone, Copy)]
pub struct IfStmtView {
    pub cond_id: NodeId,
    pub cond_value: NodeId,
    pub qop: NodeId,
}

/// Checked view of an `IdRef` node.
#[derive(Debug, Clone, Copy)]
pub struct IdRefView {
    pub id: NodeId,
    pub index: NodeId,
}
