//! Sleipnir Compiler Middle-End
//!
//! This crate hosts everything between the parser and the emitted source:
//! the module index, the pass framework, gate inlining, dependency
//! analysis, and the qubit allocator that maps program qubits onto a
//! hardware topology.
//!
//! # Architecture
//!
//! ```text
//! parsed AST
//!      │
//!      ▼
//! ┌─────────┐   run_pass   ┌───────────────────┐
//! │ QModule │ ───────────► │ XbitNumberingPass │  qubit ↔ id
//! └─────────┘              ├───────────────────┤
//!      │                   │ DependencyPass    │  (from → to) per call
//!      │ inline_all        ├───────────────────┤
//!      │                   │ RenamePass        │  textual rewriting
//!      ▼                   └───────────────────┘
//! ┌───────────┐  SolBuilder  ┌───────────┐
//! │ ArchGraph │ ───────────► │ Solution  │  CNOT / REV / LCNOT + cost
//! └───────────┘              └───────────┘
//!      │
//!      ▼
//! hardware-level source
//! ```
//!
//! # Example
//!
//! ```rust
//! use sleipnir_compile::{AllocConfig, AllocatorKind, ArchGraph, QModule, compile};
//!
//! let mut module = QModule::from_source(
//!     "OPENQASM 2.0; qreg q[3]; CX q[0], q[2];",
//! ).unwrap();
//!
//! let arch = ArchGraph::linear(4);
//! let solution = compile(
//!     &mut module,
//!     &arch,
//!     AllocatorKind::Simple,
//!     Some(&[]),
//!     &AllocConfig::default(),
//! ).unwrap();
//!
//! // The non-adjacent CX became a long CNOT through qubit 1.
//! assert_eq!(solution.cost, AllocConfig::default().lcnot_cost as u64);
//! assert!(module.to_source(true, true).contains("__long_cx__ Q[0], Q[1], Q[2];"));
//! ```

pub mod alloc;
pub mod arch;
pub mod driver;
pub mod error;
pub mod module;
pub mod pass;
pub mod passes;
pub mod path;

mod subst;

pub use alloc::{AllocConfig, Operation, OperationKind, SimpleSolBuilder, SolBuilder, Solution};
pub use arch::ArchGraph;
pub use driver::{AllocatorKind, compile, replace_with_arch_specs};
pub use error::{CompileError, CompileResult};
pub use module::QModule;
pub use pass::{Pass, PassPhases};
pub use passes::{
    Dependency, DependencyPass, RenamePass, XbitNumbering, XbitNumberingPass, inline_all,
    inline_call,
};
pub use path::BfsPathFinder;
