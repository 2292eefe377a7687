//! The compilation driver: inline, map onto the architecture, allocate,
//! rewrite, rename.

use rustc_hash::FxHashMap;
use sleipnir_ast::{NodeId, NodeKind};
use tracing::info;

use crate::alloc::{AllocConfig, Operation, OperationKind, SimpleSolBuilder, SolBuilder, Solution};
use crate::arch::ArchGraph;
use crate::error::{CompileError, CompileResult};
use crate::module::{LONG_CX_GATE, QModule, REV_CX_GATE};
use crate::passes::deps::DependencyPass;
use crate::passes::inline::inline_all;
use crate::passes::rename::RenamePass;
use crate::passes::xbit::{XbitNumbering, XbitNumberingPass};

static SIMPLE: SimpleSolBuilder = SimpleSolBuilder;

/// Allocator strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AllocatorKind {
    /// The reference builder: fixed mapping, rewrites only.
    #[default]
    Simple,
}

impl AllocatorKind {
    fn builder(self) -> &'static dyn SolBuilder {
        match self {
            AllocatorKind::Simple => &SIMPLE,
        }
    }
}

/// Compile a module for an architecture.
///
/// When `basis` is present, user gates outside the basis are first
/// inlined to fixpoint. Program qubits are then renamed onto the
/// architecture register in declaration order, the dependency vector is
/// rebuilt, the chosen builder resolves every dependency, and the
/// resulting operations replace their call points. The transformed
/// module emits hardware-level source; the solution (with its cost) is
/// returned.
pub fn compile(
    module: &mut QModule,
    arch: &ArchGraph,
    allocator: AllocatorKind,
    basis: Option<&[String]>,
    config: &AllocConfig,
) -> CompileResult<Solution> {
    info!(
        hardware_qubits = arch.num_qubits(),
        ?allocator,
        "compiling module"
    );

    module.validate()?;
    if let Some(basis) = basis {
        inline_all(module, basis, config.inline_fuel)?;
    }

    replace_with_arch_specs(module, arch)?;

    let mut dep_pass = DependencyPass::new();
    module.run_pass(&mut dep_pass, true)?;
    let (numbering, deps) = dep_pass.into_parts();

    let initial: Vec<u32> = (0..arch.num_qubits()).collect();
    let solution = allocator.builder().build(&initial, &deps, arch, config)?;

    apply_solution(module, &solution, &numbering)?;
    rename_with_mapping(module, &solution.initial_mapping, &numbering, arch)?;

    info!(
        cost = solution.cost,
        dependencies = solution.ops.len(),
        "allocation complete"
    );
    Ok(solution)
}

/// Rename program qubits onto the architecture register (in declaration
/// order) and swap the quantum register table for the architecture's
/// declaration. Classical registers survive.
pub fn replace_with_arch_specs(module: &mut QModule, arch: &ArchGraph) -> CompileResult<()> {
    let mut xbit = XbitNumberingPass::new();
    module.run_pass(&mut xbit, true)?;
    let numbering = xbit.into_result();

    let required = numbering.qubit_count(None);
    let available = arch.num_qubits() as usize;
    if required > available {
        return Err(CompileError::AllocInfeasible {
            required,
            available,
        });
    }

    let mut table = FxHashMap::default();
    for i in 0..required {
        let text = numbering.qubit_text(i as u32, None)?.to_string();
        table.insert(text, arch_ref(module, arch, i as u32));
    }
    let mut rename = RenamePass::new(table);
    module.run_pass(&mut rename, true)?;

    let mut new_regs = Vec::new();
    {
        let ast = module.ast_mut();
        let name = ast.lit_id(arch.reg_name());
        let size = ast.lit_int(i64::from(arch.num_qubits()));
        let qreg = ast.reg_decl(true, name, size);
        ast.mark_generated(qreg);
        new_regs.push(qreg);
    }
    let cregs: Vec<NodeId> = module
        .regs()
        .filter(|&reg| {
            module
                .ast()
                .as_reg_decl(reg)
                .is_ok_and(|view| !view.quantum)
        })
        .collect();
    new_regs.extend(cregs);
    module.replace_all_regs_with(new_regs)
}

/// Fresh detached `Q[i]`-style reference node for a hardware qubit.
fn arch_ref(module: &mut QModule, arch: &ArchGraph, qubit: u32) -> NodeId {
    let ast = module.ast_mut();
    let name = ast.lit_id(arch.reg_name());
    let index = ast.lit_int(i64::from(qubit));
    let node = ast.id_ref(name, index);
    ast.mark_generated(node);
    node
}

/// Replace every call point with the concrete operations the builder
/// chose for it, re-wrapping in the enclosing `if` where the original
/// statement was conditional.
fn apply_solution(
    module: &mut QModule,
    solution: &Solution,
    numbering: &XbitNumbering,
) -> CompileResult<()> {
    let kinds: Vec<OperationKind> = solution
        .ops
        .iter()
        .flat_map(|(_, ops)| ops.iter().map(|op| op.kind))
        .collect();
    if kinds.contains(&OperationKind::Rev) {
        module.register_rev_cx_gate()?;
    }
    if kinds.contains(&OperationKind::Lcnot) {
        module.register_long_cx_gate()?;
    }

    for (call_point, entry_ops) in &solution.ops {
        let wrap = matches!(module.ast().kind(*call_point), NodeKind::IfStmt);
        let mut replacements = Vec::with_capacity(entry_ops.len());
        for op in entry_ops {
            let node = build_operation(module, numbering, op)?;
            let produced = if wrap {
                let if_clone = module.ast_mut().clone_subtree(*call_point);
                module.ast_mut().set_child(if_clone, 2, node)?;
                if_clone
            } else {
                node
            };
            replacements.push(produced);
        }
        module.replace_statement(*call_point, replacements)?;
    }
    Ok(())
}

fn qubit_operand(
    module: &mut QModule,
    numbering: &XbitNumbering,
    id: u32,
) -> CompileResult<NodeId> {
    let canonical = numbering.qubit_node(id, None)?;
    Ok(module.ast_mut().clone_subtree(canonical))
}

fn build_operation(
    module: &mut QModule,
    numbering: &XbitNumbering,
    op: &Operation,
) -> CompileResult<NodeId> {
    let node = match op.kind {
        OperationKind::Cnot => {
            let lhs = qubit_operand(module, numbering, op.a)?;
            let rhs = qubit_operand(module, numbering, op.b)?;
            module.ast_mut().cx(lhs, rhs)
        }
        OperationKind::Rev => intrinsic_call(module, numbering, REV_CX_GATE, &[op.a, op.b])?,
        OperationKind::Lcnot => {
            let w = op.w.ok_or_else(|| {
                sleipnir_ast::AstError::InvariantViolation(
                    "long CNOT operation without an intermediate qubit".into(),
                )
            })?;
            intrinsic_call(module, numbering, LONG_CX_GATE, &[op.a, w, op.b])?
        }
    };
    module.ast_mut().mark_generated(node);
    Ok(node)
}

fn intrinsic_call(
    module: &mut QModule,
    numbering: &XbitNumbering,
    gate: &str,
    operands: &[u32],
) -> CompileResult<NodeId> {
    let mut cloned = Vec::with_capacity(operands.len());
    for &operand in operands {
        cloned.push(qubit_operand(module, numbering, operand)?);
    }
    let ast = module.ast_mut();
    let name = ast.lit_id(gate);
    let args = ast.list();
    let qargs = ast.list();
    for node in cloned {
        ast.list_push(qargs, node)?;
    }
    Ok(ast.call(name, args, qargs))
}

/// Rename every program-qubit reference to the hardware reference its
/// mapping image points at.
fn rename_with_mapping(
    module: &mut QModule,
    mapping: &[u32],
    numbering: &XbitNumbering,
    arch: &ArchGraph,
) -> CompileResult<()> {
    let mut table = FxHashMap::default();
    for (program, &hw) in mapping.iter().enumerate() {
        let text = numbering.qubit_text(program as u32, None)?.to_string();
        if text == arch.qubit_ref(hw) {
            continue;
        }
        table.insert(text, arch_ref(module, arch, hw));
    }
    if table.is_empty() {
        return Ok(());
    }
    let mut pass = RenamePass::new(table);
    module.run_pass(&mut pass, true)
}
