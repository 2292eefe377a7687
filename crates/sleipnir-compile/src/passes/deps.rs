//! Dependency analysis.
//!
//! Produces, per top-level two-qubit gate call, the ordered qubit-pair
//! dependencies implied by its (transitively expanded) body. Gate bodies
//! are expanded symbolically: formals are mapped to call-site qubits via
//! each gate's local numbering; nothing is ever inlined into the tree.

use rustc_hash::FxHashMap;
use sleipnir_ast::{NodeId, NodeKind};

use crate::error::{CompileError, CompileResult};
use crate::module::QModule;
use crate::pass::{Pass, PassPhases};
use crate::passes::xbit::{XbitNumbering, XbitNumberingPass};

/// One dependency entry: the originating top-level statement (or its
/// `if` wrapper) plus the ordered `(from → to)` pairs it implies.
#[derive(Debug, Clone)]
pub struct Dependency {
    pub call_point: NodeId,
    pub pairs: Vec<(u32, u32)>,
}

/// Pass computing the dependency vector of a module.
///
/// Depends on xbit numbering; a fresh numbering is computed on every run
/// so the result always reflects the current tree.
#[derive(Debug, Default)]
pub struct DependencyPass {
    numbering: XbitNumbering,
    deps: Vec<Dependency>,
    gate_deps: FxHashMap<String, Vec<(u32, u32)>>,
}

impl DependencyPass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dependency entries in source order.
    pub fn dependencies(&self) -> &[Dependency] {
        &self.deps
    }

    /// The dependency pairs of a gate's body, in the gate's local
    /// numbering. `None` if the gate was not seen.
    pub fn gate_dependencies(&self, name: &str) -> Option<&[(u32, u32)]> {
        self.gate_deps.get(name).map(Vec::as_slice)
    }

    /// The numbering this run was computed against.
    pub fn numbering(&self) -> &XbitNumbering {
        &self.numbering
    }

    /// Consume the pass, yielding the numbering and the dependencies.
    pub fn into_parts(self) -> (XbitNumbering, Vec<Dependency>) {
        (self.numbering, self.deps)
    }

    fn uid(&self, module: &QModule, node: NodeId, scope: Option<&str>) -> CompileResult<u32> {
        let text = module.ast().emit(node, false);
        self.numbering.qubit_id(&text, scope)
    }

    /// Dependency pairs of a gate's body in its local numbering, memoized.
    /// `stack` tracks the expansion chain for cycle detection.
    fn gate_pairs(
        &mut self,
        module: &QModule,
        name: &str,
        stack: &mut Vec<String>,
    ) -> CompileResult<Vec<(u32, u32)>> {
        if let Some(pairs) = self.gate_deps.get(name) {
            return Ok(pairs.clone());
        }
        if stack.iter().any(|g| g == name) {
            return Err(CompileError::RecursiveGate { gate: name.into() });
        }

        let gate = module.get_gate(name)?;
        let view = module.ast().as_gate(gate)?;
        let Some(body) = view.body else {
            // Opaque gates contribute no analyzable dependencies.
            self.gate_deps.insert(name.into(), Vec::new());
            return Ok(Vec::new());
        };

        stack.push(name.to_string());
        let mut pairs = Vec::new();
        for &op in module.ast().children(body) {
            self.collect_pairs(module, op, Some(name), stack, &mut pairs)?;
        }
        stack.pop();

        self.gate_deps.insert(name.into(), pairs.clone());
        Ok(pairs)
    }

    /// Collect the pairs implied by one operation, resolving qubit texts
    /// in `scope` (a gate scope, or the global scope for `None`).
    fn collect_pairs(
        &mut self,
        module: &QModule,
        op: NodeId,
        scope: Option<&str>,
        stack: &mut Vec<String>,
        out: &mut Vec<(u32, u32)>,
    ) -> CompileResult<()> {
        match module.ast().kind(op) {
            NodeKind::Cx => {
                let view = module.ast().as_cx(op)?;
                let from = self.uid(module, view.lhs, scope)?;
                let to = self.uid(module, view.rhs, scope)?;
                out.push((from, to));
            }

            NodeKind::Generic => {
                let call = module.ast().as_call(op)?;
                let callee = module.ast().str_val(call.id)?.to_string();
                let callee_pairs = self.gate_pairs(module, &callee, stack)?;
                if callee_pairs.is_empty() {
                    return Ok(());
                }

                let qargs = module.ast().children(call.qargs).to_vec();
                let declared = module.get_gate(&callee)?;
                let formal_count = module
                    .ast()
                    .child_count(module.ast().as_gate(declared)?.qargs);
                if qargs.len() != formal_count {
                    return Err(CompileError::ArityMismatch {
                        gate: callee,
                        expected: formal_count,
                        got: qargs.len(),
                    });
                }

                for (local_from, local_to) in callee_pairs {
                    let from = self.uid(module, qargs[local_from as usize], scope)?;
                    let to = self.uid(module, qargs[local_to as usize], scope)?;
                    out.push((from, to));
                }
            }

            NodeKind::IfStmt => {
                let qop = module.ast().child(op, 2)?;
                self.collect_pairs(module, qop, scope, stack, out)?;
            }

            // Single-qubit and classical-interface operations imply no
            // qubit-to-qubit dependency.
            NodeKind::U | NodeKind::Barrier | NodeKind::Measure | NodeKind::Reset => {}

            _ => {}
        }
        Ok(())
    }
}

impl Pass for DependencyPass {
    fn name(&self) -> &'static str {
        "dependency-analysis"
    }

    fn phases(&self) -> PassPhases {
        PassPhases {
            registers: false,
            gates: true,
            statements: true,
        }
    }

    fn initialize(&mut self, module: &mut QModule) -> CompileResult<()> {
        let mut xbit = XbitNumberingPass::new();
        module.run_pass(&mut xbit, true)?;
        self.numbering = xbit.into_result();
        self.deps.clear();
        self.gate_deps.clear();
        Ok(())
    }

    fn run_on_gate(&mut self, module: &mut QModule, gate: NodeId) -> CompileResult<()> {
        let view = module.ast().as_gate(gate)?;
        let name = module.ast().str_val(view.id)?.to_string();
        let mut stack = Vec::new();
        self.gate_pairs(module, &name, &mut stack)?;
        Ok(())
    }

    fn run_on_statement(&mut self, module: &mut QModule, stmt: NodeId) -> CompileResult<()> {
        let qop = if matches!(module.ast().kind(stmt), NodeKind::IfStmt) {
            module.ast().child(stmt, 2)?
        } else {
            stmt
        };

        let mut pairs = Vec::new();
        let mut stack = Vec::new();
        self.collect_pairs(module, qop, None, &mut stack, &mut pairs)?;

        if !pairs.is_empty() {
            self.deps.push(Dependency {
                call_point: stmt,
                pairs,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> (QModule, DependencyPass) {
        let mut module = QModule::from_source(source).unwrap();
        let mut pass = DependencyPass::new();
        module.run_pass(&mut pass, false).unwrap();
        (module, pass)
    }

    #[test]
    fn test_gate_local_dependency() {
        let (_, pass) = run("OPENQASM 2.0; gate cnot x, y { CX x, y; }");

        assert_eq!(pass.gate_dependencies("cnot").unwrap(), &[(0, 1)]);
        // `y` has no outgoing dependency.
        assert!(
            pass.gate_dependencies("cnot")
                .unwrap()
                .iter()
                .all(|&(from, _)| from == 0)
        );
    }

    #[test]
    fn test_transitive_gate_expansion() {
        let (_, pass) = run(
            "OPENQASM 2.0; \
             gate cx x, y { CX x, y; } \
             gate cnot x, y { cx x, y; }",
        );

        assert_eq!(pass.gate_dependencies("cx").unwrap(), &[(0, 1)]);
        assert_eq!(pass.gate_dependencies("cnot").unwrap(), &[(0, 1)]);
    }

    #[test]
    fn test_argument_permutation() {
        let (_, pass) = run(
            "OPENQASM 2.0; \
             gate cx x, y { CX x, y; } \
             gate rcnot x, y { cx y, x; }",
        );

        assert_eq!(pass.gate_dependencies("rcnot").unwrap(), &[(1, 0)]);
    }

    #[test]
    fn test_program_level_pair() {
        let (module, pass) = run("OPENQASM 2.0; qreg q[2]; CX q[0], q[1];");

        let deps = pass.dependencies();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].pairs, vec![(0, 1)]);
        assert_eq!(deps[0].call_point, module.statements()[0]);
    }

    #[test]
    fn test_call_point_of_if_is_the_wrapper() {
        let (module, pass) = run(
            "OPENQASM 2.0; qreg q[2]; creg c[1]; if (c == 1) CX q[0], q[1];",
        );

        let deps = pass.dependencies();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].call_point, module.statements()[0]);
        assert!(matches!(
            module.ast().kind(deps[0].call_point),
            NodeKind::IfStmt
        ));
    }

    #[test]
    fn test_source_order_and_filtering() {
        let (module, pass) = run(
            "OPENQASM 2.0; \
             gate cnot a, b { CX a, b; } \
             qreg q[3]; creg c[3]; \
             U(0.0, 0.0, 0.0) q[0]; \
             CX q[0], q[1]; \
             measure q[0] -> c[0]; \
             cnot q[2], q[0]; \
             reset q[1]; \
             barrier q[0], q[1], q[2];",
        );

        let deps = pass.dependencies();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].pairs, vec![(0, 1)]);
        assert_eq!(deps[1].pairs, vec![(2, 0)]);
        // Call points appear in source order.
        let p0 = module.statement_position(deps[0].call_point).unwrap();
        let p1 = module.statement_position(deps[1].call_point).unwrap();
        assert!(p0 < p1);
    }

    #[test]
    fn test_multi_pair_gate_call() {
        let (_, pass) = run(
            "OPENQASM 2.0; \
             gate ladder a, b, c { CX a, b; CX b, c; } \
             qreg q[4]; \
             ladder q[3], q[1], q[2];",
        );

        let deps = pass.dependencies();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].pairs, vec![(3, 1), (1, 2)]);
    }

    #[test]
    fn test_recursive_gate_detected() {
        let mut module =
            QModule::from_source("OPENQASM 2.0; gate rec x, y { rec x, y; }").unwrap();
        let mut pass = DependencyPass::new();
        let err = module.run_pass(&mut pass, false).unwrap_err();
        assert!(matches!(err, CompileError::RecursiveGate { gate } if gate == "rec"));
    }

    #[test]
    fn test_opaque_gate_contributes_nothing() {
        let (_, pass) = run(
            "OPENQASM 2.0; opaque mystery a, b; qreg q[2]; mystery q[0], q[1];",
        );

        assert_eq!(pass.gate_dependencies("mystery").unwrap(), &[]);
        assert!(pass.dependencies().is_empty());
    }

    #[test]
    fn test_arity_mismatch_in_expansion() {
        let mut module = QModule::from_source(
            "OPENQASM 2.0; gate cnot a, b { CX a, b; } qreg q[3]; cnot q[0], q[1], q[2];",
        )
        .unwrap();
        let mut pass = DependencyPass::new();
        let err = module.run_pass(&mut pass, false).unwrap_err();
        assert!(matches!(err, CompileError::ArityMismatch { .. }));
    }
}
