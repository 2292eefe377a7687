//! OPENQASM 2.0 frontend for Sleipnir.
//!
//! The parser produces [`sleipnir_ast::Ast`] trees conforming to the fixed
//! child-position table of the AST crate; the compiler middle-end never
//! sees source text again after this point.
//!
//! Include directives are recorded as `Include` nodes with an empty inner
//! statement list; resolving the referenced file is the caller's concern.
//!
//! # Example
//!
//! ```rust
//! let (ast, root) = sleipnir_qasm::parse("OPENQASM 2.0; qreg q[2]; CX q[0], q[1];").unwrap();
//! assert!(ast.emit(root, true).contains("CX q[0], q[1];"));
//! ```

pub mod error;
pub mod lexer;
pub mod parser;

pub use error::{ParseError, ParseResult};
pub use parser::parse;
