//! Sleipnir OPENQASM Abstract Syntax Tree
//!
//! This crate provides the tree representation shared by the whole Sleipnir
//! compilation stack. A program is stored in an [`Ast`] arena: every node
//! lives in the arena and is addressed by a stable [`NodeId`] handle, so
//! passes can keep identity-based references to statements across mutations
//! of the tree.
//!
//! # Overview
//!
//! - **Nodes**: [`NodeKind`] tags each node; children sit at fixed,
//!   kind-specific positions (e.g. `Measure[0]` is the qubit, `Measure[1]`
//!   the classical bit). List-kind nodes hold an ordered, resizable child
//!   vector.
//! - **Ownership**: children are exclusively owned by their parent node;
//!   the parent link is a non-owning back-reference maintained by every
//!   structural mutator.
//! - **Traversal**: [`Visitor`] offers one hook per concrete kind with
//!   depth-first, left-to-right defaults.
//! - **Emission**: [`Ast::emit`] serializes any well-formed subtree back to
//!   OPENQASM source, in pretty or compact form.
//!
//! # Example
//!
//! ```rust
//! use sleipnir_ast::Ast;
//!
//! let mut ast = Ast::new();
//! let q = ast.lit_id("q");
//! let zero = ast.lit_int(0);
//! let q0 = ast.id_ref(q, zero);
//! let q_again = ast.lit_id("q");
//! let one = ast.lit_int(1);
//! let q1 = ast.id_ref(q_again, one);
//! let cx = ast.cx(q0, q1);
//!
//! assert_eq!(ast.emit(cx, false), "CX q[0], q[1];");
//! assert_eq!(ast.parent(q0), Some(cx));
//! ```

pub mod error;
pub mod node;
pub mod tree;
pub mod visitor;

mod emit;

pub use error::{AstError, AstResult};
pub use node::{BinOpKind, NodeId, NodeKind, UnaryOpKind};
pub use tree::Ast;
pub use visitor::Visitor;
