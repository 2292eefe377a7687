//! Qubit allocation: the solution model and the reference builder.
//!
//! A builder receives an initial program→hardware mapping, the dependency
//! vector, and the architecture, and resolves every dependency into a
//! sequence of adjacency-respecting operations. Each dependency moves
//! from pending to exactly one resolved form (plain CNOT, reversal CNOT,
//! or long CNOT); any failure aborts the whole allocation.

use serde::{Deserialize, Serialize};
use sleipnir_ast::NodeId;
use tracing::debug;

use crate::arch::ArchGraph;
use crate::error::{CompileError, CompileResult};
use crate::passes::deps::Dependency;
use crate::path::BfsPathFinder;

/// Allocator configuration. Costs are explicit parameters rather than
/// process-wide state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocConfig {
    /// Cost of realizing a CNOT against a directed edge.
    pub rev_cost: u32,
    /// Cost of realizing a CNOT across a distance-2 pair.
    pub lcnot_cost: u32,
    /// Upper bound on total inline steps during gate expansion.
    pub inline_fuel: u32,
}

impl Default for AllocConfig {
    fn default() -> Self {
        Self {
            rev_cost: 4,
            lcnot_cost: 10,
            inline_fuel: 4096,
        }
    }
}

/// How one dependency was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    Cnot,
    Rev,
    Lcnot,
}

/// One rewritten operation over program-qubit ids. `w` is the
/// intermediate qubit of a long CNOT and absent otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OperationKind,
    pub a: u32,
    pub b: u32,
    pub w: Option<u32>,
}

/// Allocation result: the initial mapping, one operation sequence per
/// dependency entry (parallel to the dependency vector, keyed by call
/// point), and the aggregate cost.
#[derive(Debug, Clone)]
pub struct Solution {
    pub initial_mapping: Vec<u32>,
    pub ops: Vec<(NodeId, Vec<Operation>)>,
    pub cost: u64,
}

/// Strategy contract for solution builders.
///
/// The reference implementation is [`SimpleSolBuilder`]; other builders
/// plug in through this trait and may interleave swap operations that
/// mutate the mapping as they go.
pub trait SolBuilder {
    fn build(
        &self,
        initial: &[u32],
        deps: &[Dependency],
        graph: &ArchGraph,
        config: &AllocConfig,
    ) -> CompileResult<Solution>;
}

/// The reference builder: resolves each dependency against the fixed
/// initial mapping, never moving qubits.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleSolBuilder;

impl SolBuilder for SimpleSolBuilder {
    fn build(
        &self,
        initial: &[u32],
        deps: &[Dependency],
        graph: &ArchGraph,
        config: &AllocConfig,
    ) -> CompileResult<Solution> {
        let mapping = initial.to_vec();
        let hardware = graph.num_qubits() as usize;

        // Inverse assignment, hardware → program.
        let mut assignment = vec![u32::MAX; hardware];
        for (program, &hw) in mapping.iter().enumerate() {
            if (hw as usize) >= hardware || assignment[hw as usize] != u32::MAX {
                return Err(CompileError::AllocInfeasible {
                    required: mapping.len(),
                    available: hardware,
                });
            }
            assignment[hw as usize] = u32::try_from(program).unwrap_or(u32::MAX);
        }

        let finder = BfsPathFinder::new();
        let mut ops = Vec::with_capacity(deps.len());
        let mut cost = 0u64;

        for dep in deps {
            let mut entry_ops = Vec::with_capacity(dep.pairs.len());
            for &(a, b) in &dep.pairs {
                if (a as usize) >= mapping.len() || (b as usize) >= mapping.len() {
                    return Err(CompileError::AllocInfeasible {
                        required: (a.max(b) as usize) + 1,
                        available: mapping.len(),
                    });
                }
                let u = mapping[a as usize];
                let v = mapping[b as usize];

                let op = if graph.has_edge(u, v) {
                    Operation {
                        kind: OperationKind::Cnot,
                        a,
                        b,
                        w: None,
                    }
                } else if graph.is_reverse_edge(u, v) {
                    cost += u64::from(config.rev_cost);
                    Operation {
                        kind: OperationKind::Rev,
                        a,
                        b,
                        w: None,
                    }
                } else {
                    let path = finder.find(graph, u, v);
                    if path.len() != 3 {
                        return Err(CompileError::UnreachableLongCnot {
                            from: u,
                            to: v,
                            path_len: path.len(),
                        });
                    }
                    let w_hw = path[1] as usize;
                    let w = assignment[w_hw];
                    if w == u32::MAX {
                        return Err(CompileError::AllocInfeasible {
                            required: w_hw + 1,
                            available: mapping.len(),
                        });
                    }
                    cost += u64::from(config.lcnot_cost);
                    Operation {
                        kind: OperationKind::Lcnot,
                        a,
                        b,
                        w: Some(w),
                    }
                };
                entry_ops.push(op);
            }
            ops.push((dep.call_point, entry_ops));
        }

        debug!(entries = ops.len(), cost, "built allocation solution");
        Ok(Solution {
            initial_mapping: mapping,
            ops,
            cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sleipnir_ast::Ast;

    fn dep(ast: &mut Ast, pairs: Vec<(u32, u32)>) -> Dependency {
        Dependency {
            call_point: ast.lit_int(0),
            pairs,
        }
    }

    fn identity(n: u32) -> Vec<u32> {
        (0..n).collect()
    }

    #[test]
    fn test_adjacent_cnot_is_free() {
        let arch = ArchGraph::linear(4);
        let mut ast = Ast::new();
        let deps = vec![dep(&mut ast, vec![(0, 1)])];

        let solution = SimpleSolBuilder
            .build(&identity(4), &deps, &arch, &AllocConfig::default())
            .unwrap();

        assert_eq!(solution.cost, 0);
        assert_eq!(solution.ops.len(), 1);
        assert_eq!(
            solution.ops[0].1,
            vec![Operation {
                kind: OperationKind::Cnot,
                a: 0,
                b: 1,
                w: None
            }]
        );
    }

    #[test]
    fn test_linear_chain_long_cnot() {
        // Arch is the path 0—1—2—3; CX q[0], q[2] under the identity
        // mapping needs the intermediate qubit 1.
        let arch = ArchGraph::linear(4);
        let mut ast = Ast::new();
        let deps = vec![dep(&mut ast, vec![(0, 2)])];
        let config = AllocConfig::default();

        let solution = SimpleSolBuilder
            .build(&identity(4), &deps, &arch, &config)
            .unwrap();

        assert_eq!(solution.cost, u64::from(config.lcnot_cost));
        assert_eq!(
            solution.ops[0].1,
            vec![Operation {
                kind: OperationKind::Lcnot,
                a: 0,
                b: 2,
                w: Some(1)
            }]
        );
    }

    #[test]
    fn test_reverse_edge_rewrite() {
        // Only the directed edge 1 → 0 exists; CX q[0], q[1] goes against
        // it.
        let arch = ArchGraph::from_edges("Q", 2, &[(1, 0)]);
        let mut ast = Ast::new();
        let deps = vec![dep(&mut ast, vec![(0, 1)])];
        let config = AllocConfig::default();

        let solution = SimpleSolBuilder
            .build(&identity(2), &deps, &arch, &config)
            .unwrap();

        assert_eq!(solution.cost, u64::from(config.rev_cost));
        assert_eq!(solution.ops[0].1[0].kind, OperationKind::Rev);
    }

    #[test]
    fn test_cost_aggregation() {
        // One REV (against 1 → 0), one LCNOT (0..2), one free CNOT (1 → 0
        // direction itself).
        let arch = ArchGraph::from_edges("Q", 3, &[(1, 0), (1, 2), (2, 1)]);
        let mut ast = Ast::new();
        let deps = vec![
            dep(&mut ast, vec![(0, 1)]),
            dep(&mut ast, vec![(0, 2)]),
            dep(&mut ast, vec![(1, 0)]),
        ];
        let config = AllocConfig {
            rev_cost: 3,
            lcnot_cost: 11,
            inline_fuel: 16,
        };

        let solution = SimpleSolBuilder
            .build(&identity(3), &deps, &arch, &config)
            .unwrap();

        let rev_count = solution
            .ops
            .iter()
            .flat_map(|(_, ops)| ops)
            .filter(|op| op.kind == OperationKind::Rev)
            .count() as u64;
        let lcnot_count = solution
            .ops
            .iter()
            .flat_map(|(_, ops)| ops)
            .filter(|op| op.kind == OperationKind::Lcnot)
            .count() as u64;
        assert_eq!(rev_count, 1);
        assert_eq!(lcnot_count, 1);
        assert_eq!(
            solution.cost,
            rev_count * u64::from(config.rev_cost) + lcnot_count * u64::from(config.lcnot_cost)
        );
    }

    #[test]
    fn test_every_resolution_is_justified() {
        let arch = ArchGraph::from_edges("Q", 4, &[(0, 1), (1, 2), (3, 2)]);
        let mut ast = Ast::new();
        let deps = vec![
            dep(&mut ast, vec![(0, 1)]),
            dep(&mut ast, vec![(2, 3)]),
            dep(&mut ast, vec![(0, 2)]),
        ];

        let mapping = identity(4);
        let solution = SimpleSolBuilder
            .build(&mapping, &deps, &arch, &AllocConfig::default())
            .unwrap();

        let finder = BfsPathFinder::new();
        for (_, ops) in &solution.ops {
            for op in ops {
                let u = mapping[op.a as usize];
                let v = mapping[op.b as usize];
                match op.kind {
                    OperationKind::Cnot => assert!(arch.has_edge(u, v)),
                    OperationKind::Rev => assert!(arch.is_reverse_edge(u, v)),
                    OperationKind::Lcnot => {
                        let path = finder.find(&arch, u, v);
                        assert_eq!(path.len(), 3);
                        assert_eq!(mapping[op.w.unwrap() as usize], path[1]);
                    }
                }
            }
        }
    }

    #[test]
    fn test_unreachable_long_cnot() {
        // Distance 3: no 3-vertex path exists between 0 and 3.
        let arch = ArchGraph::linear(4);
        let mut ast = Ast::new();
        let deps = vec![dep(&mut ast, vec![(0, 3)])];

        let err = SimpleSolBuilder
            .build(&identity(4), &deps, &arch, &AllocConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnreachableLongCnot { path_len: 4, .. }
        ));
    }

    #[test]
    fn test_non_injective_mapping_rejected() {
        let arch = ArchGraph::linear(3);
        let mut ast = Ast::new();
        let deps = vec![dep(&mut ast, vec![(0, 1)])];

        let err = SimpleSolBuilder
            .build(&[0, 0], &deps, &arch, &AllocConfig::default())
            .unwrap_err();
        assert!(matches!(err, CompileError::AllocInfeasible { .. }));
    }
}
