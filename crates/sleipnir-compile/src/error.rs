//! Error types for the compilation crate.

use thiserror::Error;

/// Errors that can occur during compilation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// Error from the AST crate.
    #[error("AST error: {0}")]
    Ast(#[from] sleipnir_ast::AstError),

    /// Error from the parser.
    #[error("Parse error: {0}")]
    Parse(#[from] sleipnir_qasm::ParseError),

    /// Register or gate name already registered.
    #[error("Duplicate identifier '{name}'")]
    DuplicateId { name: String },

    /// Reference to an undeclared register, bit, or gate.
    #[error("Unknown identifier '{name}'")]
    UnknownId { name: String },

    /// Call-site parameter count disagrees with the declaration.
    #[error("Gate '{gate}' expects {expected} arguments, got {got}")]
    ArityMismatch {
        gate: String,
        expected: usize,
        got: usize,
    },

    /// Attempt to inline an opaque gate.
    #[error("Cannot inline opaque gate '{gate}'")]
    OpaqueGate { gate: String },

    /// Cycle detected in gate expansion.
    #[error("Recursive gate definition involving '{gate}'")]
    RecursiveGate { gate: String },

    /// The inlining fuel cap was exhausted.
    #[error("Inlining did not reach a fixpoint within {fuel} steps")]
    InlineFuelExhausted { fuel: u32 },

    /// The path finder returned a path unusable for a long CNOT.
    #[error(
        "Cannot apply a long CNOT between hardware qubits {from} and {to}: \
         path length {path_len}, need 3"
    )]
    UnreachableLongCnot {
        from: u32,
        to: u32,
        path_len: usize,
    },

    /// No valid mapping exists for the program on the target.
    #[error("Program requires {required} hardware qubits but the architecture only has {available}")]
    AllocInfeasible { required: usize, available: usize },
}

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;
