//! Node kinds and the node record stored in the [`Ast`](crate::Ast) arena.

use serde::{Deserialize, Serialize};

/// Stable handle to a node inside an [`Ast`](crate::Ast) arena.
///
/// Handles stay valid for the lifetime of the arena, across structural
/// edits. Detaching a subtree does not invalidate its handles; the nodes
/// are only destroyed when the arena itself is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Index of this node in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Binary operators allowed in classical argument expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOpKind {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinOpKind {
    /// The source-form symbol of the operator.
    pub fn symbol(self) -> &'static str {
        match self {
            BinOpKind::Add => "+",
            BinOpKind::Sub => "-",
            BinOpKind::Mul => "*",
            BinOpKind::Div => "/",
            BinOpKind::Pow => "^",
        }
    }
}

/// Unary operators allowed in classical argument expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOpKind {
    Sin,
    Cos,
    Tan,
    Exp,
    Ln,
    Sqrt,
    Neg,
}

impl UnaryOpKind {
    /// The source-form name of the operator. `Neg` has no name; it is
    /// emitted as a prefix `-`.
    pub fn name(self) -> &'static str {
        match self {
            UnaryOpKind::Sin => "sin",
            UnaryOpKind::Cos => "cos",
            UnaryOpKind::Tan => "tan",
            UnaryOpKind::Exp => "exp",
            UnaryOpKind::Ln => "ln",
            UnaryOpKind::Sqrt => "sqrt",
            UnaryOpKind::Neg => "-",
        }
    }
}

/// The discriminator tag of a node, together with any literal payload.
///
/// Child positions are significant and fixed per kind:
///
/// | Kind | Children |
/// |------|----------|
/// | `QasmVersion` | `[0]` version literal, `[1]` statement list |
/// | `Include` | `[0]` filename literal, `[1]` inner statement list |
/// | `RegDecl` | `[0]` id, `[1]` size literal |
/// | `GateSign` | `[0]` id, `[1]` args list, `[2]` qargs list |
/// | `GateDecl` | `[0]` id, `[1]` args list, `[2]` qargs list, `[3]` body |
/// | `Measure` | `[0]` qubit, `[1]` classical bit |
/// | `Reset` | `[0]` qubit |
/// | `Barrier` | `[0]` qargs list |
/// | `Cx` | `[0]` control, `[1]` target |
/// | `U` | `[0]` args list, `[1]` qubit |
/// | `Generic` | `[0]` id, `[1]` args list, `[2]` qargs list |
/// | `BinOp` | `[0]` lhs, `[1]` rhs |
/// | `UnaryOp` | `[0]` operand |
/// | `IdRef` | `[0]` id, `[1]` index literal |
/// | `IfStmt` | `[0]` condition id, `[1]` condition value, `[2]` qop |
/// | `List`/`StmtList`/`GOpList` | ordered, resizable |
/// | literals | none |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    QasmVersion,
    Include,
    RegDecl {
        /// `true` for `qreg`, `false` for `creg`.
        quantum: bool,
    },
    /// Opaque gate declaration (signature only).
    GateSign,
    GateDecl,
    Measure,
    Reset,
    Barrier,
    Cx,
    U,
    /// Invocation of a named gate.
    Generic,
    BinOp(BinOpKind),
    UnaryOp(UnaryOpKind),
    IdRef,
    List,
    StmtList,
    GOpList,
    IfStmt,
    LitInt(i64),
    LitReal(f64),
    /// String literal; used both for identifiers and filenames.
    LitString(String),
}

impl NodeKind {
    /// Human-readable kind name, used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::QasmVersion => "QasmVersion",
            NodeKind::Include => "Include",
            NodeKind::RegDecl { .. } => "RegDecl",
            NodeKind::GateSign => "GateSign",
            NodeKind::GateDecl => "GateDecl",
            NodeKind::Measure => "Measure",
            NodeKind::Reset => "Reset",
            NodeKind::Barrier => "Barrier",
            NodeKind::Cx => "Cx",
            NodeKind::U => "U",
            NodeKind::Generic => "Generic",
            NodeKind::BinOp(_) => "BinOp",
            NodeKind::UnaryOp(_) => "UnaryOp",
            NodeKind::IdRef => "IdRef",
            NodeKind::List => "List",
            NodeKind::StmtList => "StmtList",
            NodeKind::GOpList => "GOpList",
            NodeKind::IfStmt => "IfStmt",
            NodeKind::LitInt(_) => "LitInt",
            NodeKind::LitReal(_) => "LitReal",
            NodeKind::LitString(_) => "LitString",
        }
    }

    /// Whether this is one of the literal leaf kinds.
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            NodeKind::LitInt(_) | NodeKind::LitReal(_) | NodeKind::LitString(_)
        )
    }

    /// Whether this node holds an ordered, resizable child vector.
    pub fn is_list_kind(&self) -> bool {
        matches!(self, NodeKind::List | NodeKind::StmtList | NodeKind::GOpList)
    }

    /// Whether this is a quantum operation.
    pub fn is_qop(&self) -> bool {
        matches!(
            self,
            NodeKind::Measure
                | NodeKind::Reset
                | NodeKind::Barrier
                | NodeKind::Cx
                | NodeKind::U
                | NodeKind::Generic
        )
    }

    /// Whether this kind is legal as a `StmtList` child.
    pub fn is_statement(&self) -> bool {
        self.is_qop() || matches!(self, NodeKind::IfStmt)
    }

    /// Whether this kind is legal as a `GOpList` child.
    pub fn is_gate_op(&self) -> bool {
        matches!(
            self,
            NodeKind::U | NodeKind::Cx | NodeKind::Generic | NodeKind::Barrier | NodeKind::IfStmt
        )
    }
}

/// One node of the tree: tag, ordered children, non-owning parent link,
/// and the compiler-synthesis flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) generated: bool,
    pub(crate) in_include: bool,
}
