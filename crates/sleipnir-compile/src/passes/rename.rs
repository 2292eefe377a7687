//! Qubit renaming.

use rustc_hash::FxHashMap;
use sleipnir_ast::NodeId;

use crate::error::CompileResult;
use crate::module::QModule;
use crate::pass::{Pass, PassPhases};
use crate::subst::substitute;

/// Rewrites every qubit reference in the statement list per a rename
/// table keyed by the reference's textual form.
///
/// Replacement values are detached nodes living in the module's arena;
/// each rewrite inserts a fresh clone. Register declarations are not
/// touched here — they are swapped atomically through
/// [`QModule::replace_all_regs_with`].
#[derive(Debug, Default)]
pub struct RenamePass {
    table: FxHashMap<String, NodeId>,
}

impl RenamePass {
    pub fn new(table: FxHashMap<String, NodeId>) -> Self {
        Self { table }
    }
}

impl Pass for RenamePass {
    fn name(&self) -> &'static str {
        "rename-qubits"
    }

    fn phases(&self) -> PassPhases {
        PassPhases {
            registers: false,
            gates: false,
            statements: true,
        }
    }

    fn run_on_statement(&mut self, module: &mut QModule, stmt: NodeId) -> CompileResult<()> {
        Ok(substitute(module.ast_mut(), stmt, &self.table)?)
    }
}
