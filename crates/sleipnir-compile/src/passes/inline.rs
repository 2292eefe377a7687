//! Gate inlining: single-call expansion and the fixpoint driver.

use rustc_hash::{FxHashMap, FxHashSet};
use sleipnir_ast::{NodeId, NodeKind};
use tracing::debug;

use crate::error::{CompileError, CompileResult};
use crate::module::QModule;
use crate::passes::deps::DependencyPass;
use crate::subst::substitute;

/// Replace a call to a non-opaque declared gate with a
/// substitution-renamed copy of its body.
///
/// If the call sits inside an `if`, every produced operation is wrapped
/// in a clone of that `if`. Returns the statement index of the first
/// inlined operation.
pub fn inline_call(module: &mut QModule, call: NodeId) -> CompileResult<usize> {
    let view = module.ast().as_call(call)?;
    let gate_name = module.ast().str_val(view.id)?.to_string();
    let gate = module.get_gate(&gate_name)?;
    let gate_view = module.ast().as_gate(gate)?;
    let Some(body) = gate_view.body else {
        return Err(CompileError::OpaqueGate { gate: gate_name });
    };

    // Zip formals against actuals by position, classical and quantum.
    let formal_args = module.ast().children(gate_view.args).to_vec();
    let actual_args = module.ast().children(view.args).to_vec();
    if formal_args.len() != actual_args.len() {
        return Err(CompileError::ArityMismatch {
            gate: gate_name,
            expected: formal_args.len(),
            got: actual_args.len(),
        });
    }
    let formal_qargs = module.ast().children(gate_view.qargs).to_vec();
    let actual_qargs = module.ast().children(view.qargs).to_vec();
    if formal_qargs.len() != actual_qargs.len() {
        return Err(CompileError::ArityMismatch {
            gate: gate_name,
            expected: formal_qargs.len(),
            got: actual_qargs.len(),
        });
    }

    let mut table: FxHashMap<String, NodeId> = FxHashMap::default();
    for (&formal, &actual) in formal_args.iter().zip(&actual_args) {
        table.insert(module.ast().emit(formal, false), actual);
    }
    for (&formal, &actual) in formal_qargs.iter().zip(&actual_qargs) {
        table.insert(module.ast().emit(formal, false), actual);
    }

    // The statement being replaced is the call itself, or its `if`
    // wrapper when the call is conditional.
    let (stmt, if_wrapper) = match module.ast().parent(call) {
        Some(p) if matches!(module.ast().kind(p), NodeKind::IfStmt) => (p, Some(p)),
        _ => (call, None),
    };

    let body_clone = module.ast_mut().clone_subtree(body);
    let mut replacements = Vec::new();
    while module.ast().child_count(body_clone) > 0 {
        let op = module.ast_mut().list_remove(body_clone, 0)?;
        substitute(module.ast_mut(), op, &table)?;
        let produced = if let Some(wrapper) = if_wrapper {
            let if_clone = module.ast_mut().clone_subtree(wrapper);
            module.ast_mut().set_child(if_clone, 2, op)?;
            if_clone
        } else {
            op
        };
        replacements.push(produced);
    }

    debug!(gate = %gate_name, ops = replacements.len(), "inlined gate call");
    module.replace_statement(stmt, replacements)
}

impl QModule {
    /// Method form of [`inline_call`].
    pub fn inline_call(&mut self, call: NodeId) -> CompileResult<usize> {
        inline_call(self, call)
    }
}

/// Repeatedly inline every statement-level call whose target is not in
/// `basis`, until none is eligible.
///
/// Numbering and dependency analysis are recomputed between sweeps (which
/// also detects recursive gate definitions before expansion can loop).
/// `fuel` bounds the total number of inline steps.
pub fn inline_all(module: &mut QModule, basis: &[String], fuel: u32) -> CompileResult<()> {
    let basis: FxHashSet<&str> = basis.iter().map(String::as_str).collect();
    let mut remaining = fuel;

    loop {
        let mut deps = DependencyPass::new();
        module.run_pass(&mut deps, true)?;

        let mut eligible = Vec::new();
        for stmt in module.statements().to_vec() {
            let qop = if matches!(module.ast().kind(stmt), NodeKind::IfStmt) {
                module.ast().child(stmt, 2)?
            } else {
                stmt
            };
            if !matches!(module.ast().kind(qop), NodeKind::Generic) {
                continue;
            }
            let name = module.ast().operation(qop);
            if basis.contains(name.as_str()) {
                continue;
            }
            let gate = module.get_gate(&name)?;
            if module.ast().as_gate(gate)?.is_opaque() {
                continue;
            }
            eligible.push(qop);
        }

        if eligible.is_empty() {
            return Ok(());
        }
        debug!(calls = eligible.len(), remaining, "inlining sweep");

        for call in eligible {
            if remaining == 0 {
                return Err(CompileError::InlineFuelExhausted { fuel });
            }
            remaining -= 1;
            inline_call(module, call)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_simple_call() {
        let mut module = QModule::from_source(
            "OPENQASM 2.0; gate cnot a, b { CX a, b; } qreg q[2]; \
             reset q[0]; cnot q[1], q[0]; reset q[1];",
        )
        .unwrap();

        let call = module.statements()[1];
        let pos = inline_call(&mut module, call).unwrap();

        assert_eq!(pos, 1);
        assert_eq!(module.statements().len(), 3);
        let inlined = module.statements()[1];
        assert_eq!(module.ast().emit(inlined, false), "CX q[1], q[0];");
        // The declaration itself is untouched.
        let gate = module.get_gate("cnot").unwrap();
        assert!(module.ast().emit(gate, false).contains("CX a, b;"));
    }

    #[test]
    fn test_inline_multi_op_body_with_classical_args() {
        let mut module = QModule::from_source(
            "OPENQASM 2.0; gate foo(t) a, b { U(t, 0, 0) a; CX a, b; } qreg q[2]; \
             foo(pi / 2) q[1], q[0];",
        )
        .unwrap();

        let call = module.statements()[0];
        inline_call(&mut module, call).unwrap();

        assert_eq!(module.statements().len(), 2);
        assert_eq!(
            module.ast().emit(module.statements()[0], false),
            "U((pi / 2), 0, 0) q[1];"
        );
        assert_eq!(
            module.ast().emit(module.statements()[1], false),
            "CX q[1], q[0];"
        );
    }

    #[test]
    fn test_inline_wraps_if_statement() {
        let mut module = QModule::from_source(
            "OPENQASM 2.0; gate pair a, b { CX a, b; CX b, a; } \
             qreg q[2]; creg c[1]; if (c == 1) pair q[0], q[1];",
        )
        .unwrap();

        let if_stmt = module.statements()[0];
        let call = module.ast().child(if_stmt, 2).unwrap();
        inline_call(&mut module, call).unwrap();

        assert_eq!(module.statements().len(), 2);
        assert_eq!(
            module.ast().emit(module.statements()[0], false),
            "if (c == 1) CX q[0], q[1];"
        );
        assert_eq!(
            module.ast().emit(module.statements()[1], false),
            "if (c == 1) CX q[1], q[0];"
        );
    }

    #[test]
    fn test_inline_opaque_fails() {
        let mut module = QModule::from_source(
            "OPENQASM 2.0; opaque magic a, b; qreg q[2]; magic q[0], q[1];",
        )
        .unwrap();
        let call = module.statements()[0];
        let err = inline_call(&mut module, call).unwrap_err();
        assert!(matches!(err, CompileError::OpaqueGate { gate } if gate == "magic"));
    }

    #[test]
    fn test_inline_unknown_gate_fails() {
        let mut module =
            QModule::from_source("OPENQASM 2.0; qreg q[2]; ghost q[0], q[1];").unwrap();
        let call = module.statements()[0];
        let err = inline_call(&mut module, call).unwrap_err();
        assert!(matches!(err, CompileError::UnknownId { name } if name == "ghost"));
    }

    #[test]
    fn test_inline_arity_mismatch() {
        let mut module = QModule::from_source(
            "OPENQASM 2.0; gate cnot a, b { CX a, b; } qreg q[3]; cnot q[0], q[1], q[2];",
        )
        .unwrap();
        let call = module.statements()[0];
        let err = inline_call(&mut module, call).unwrap_err();
        assert!(matches!(
            err,
            CompileError::ArityMismatch {
                expected: 2,
                got: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_inline_all_reaches_primitive_form() {
        let mut module = QModule::from_source(
            "OPENQASM 2.0; \
             gate cx2 a, b { CX a, b; } \
             gate entangle a, b, c { cx2 a, b; cx2 b, c; } \
             qreg q[3]; creg c[3]; \
             entangle q[0], q[1], q[2]; \
             if (c == 2) cx2 q[2], q[0]; \
             measure q[0] -> c[0]; barrier q[0], q[1];",
        )
        .unwrap();

        inline_all(&mut module, &[], 1024).unwrap();

        for &stmt in module.statements() {
            let qop = if matches!(module.ast().kind(stmt), NodeKind::IfStmt) {
                module.ast().child(stmt, 2).unwrap()
            } else {
                stmt
            };
            assert!(
                matches!(
                    module.ast().kind(qop),
                    NodeKind::Cx
                        | NodeKind::U
                        | NodeKind::Measure
                        | NodeKind::Reset
                        | NodeKind::Barrier
                ),
                "unexpected statement after inline_all: {}",
                module.ast().emit(stmt, false)
            );
        }
        assert_eq!(module.statements().len(), 5);
    }

    #[test]
    fn test_inline_all_respects_basis() {
        let mut module = QModule::from_source(
            "OPENQASM 2.0; \
             gate cx2 a, b { CX a, b; } \
             gate wrap a, b { cx2 a, b; } \
             qreg q[2]; wrap q[0], q[1];",
        )
        .unwrap();

        inline_all(&mut module, &["cx2".to_string()], 1024).unwrap();

        assert_eq!(module.statements().len(), 1);
        assert_eq!(
            module.ast().emit(module.statements()[0], false),
            "cx2 q[0], q[1];"
        );
    }

    #[test]
    fn test_inline_all_fuel_exhaustion() {
        let mut module = QModule::from_source(
            "OPENQASM 2.0; gate cnot a, b { CX a, b; } qreg q[2]; \
             cnot q[0], q[1]; cnot q[1], q[0];",
        )
        .unwrap();

        let err = inline_all(&mut module, &[], 1).unwrap_err();
        assert!(matches!(err, CompileError::InlineFuelExhausted { fuel: 1 }));
    }

    #[test]
    fn test_inline_all_detects_recursion() {
        let mut module = QModule::from_source(
            "OPENQASM 2.0; gate rec a, b { rec b, a; } qreg q[2]; rec q[0], q[1];",
        )
        .unwrap();

        let err = inline_all(&mut module, &[], 1024).unwrap_err();
        assert!(matches!(err, CompileError::RecursiveGate { .. }));
    }
}
