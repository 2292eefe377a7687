//! Xbit-to-number analysis.
//!
//! Assigns stable integer ids to every concrete qubit and classical bit
//! (not registers: under `qreg r[3];`, `r[0]`..`r[2]` are xbits but `r`
//! alone is not), and to every formal quantum parameter of each gate
//! declaration. Ids follow declaration order and are stable for the
//! lifetime of the numbering.

use rustc_hash::FxHashMap;
use sleipnir_ast::NodeId;

use crate::error::{CompileError, CompileResult};
use crate::module::QModule;
use crate::pass::{Pass, PassPhases};

#[derive(Debug, Default, Clone)]
struct Scope {
    /// id → (textual form, canonical node).
    entries: Vec<(String, NodeId)>,
    /// textual form → id.
    ids: FxHashMap<String, u32>,
}

impl Scope {
    fn insert(&mut self, text: String, node: NodeId) {
        let id = u32::try_from(self.entries.len()).unwrap_or(u32::MAX);
        self.ids.insert(text.clone(), id);
        self.entries.push((text, node));
    }
}

/// The numbering produced by [`XbitNumberingPass`].
///
/// One scope exists per gate declaration (keyed by the globally unique
/// gate name) plus the global scope; classical bits have their own global
/// numbering. Each id keeps a canonical node representing the xbit, used
/// later for rewriting.
#[derive(Debug, Default, Clone)]
pub struct XbitNumbering {
    global_q: Scope,
    global_c: Scope,
    reg_ranges: FxHashMap<String, Vec<u32>>,
    gate_scopes: FxHashMap<String, Scope>,
}

impl XbitNumbering {
    fn scope(&self, gate: Option<&str>) -> CompileResult<&Scope> {
        match gate {
            None => Ok(&self.global_q),
            Some(name) => self
                .gate_scopes
                .get(name)
                .ok_or_else(|| CompileError::UnknownId { name: name.into() }),
        }
    }

    /// Scope-local id of a qubit's textual form.
    pub fn qubit_id(&self, text: &str, gate: Option<&str>) -> CompileResult<u32> {
        self.scope(gate)?
            .ids
            .get(text)
            .copied()
            .ok_or_else(|| CompileError::UnknownId { name: text.into() })
    }

    /// Global id of a classical bit's textual form.
    pub fn classical_id(&self, text: &str) -> CompileResult<u32> {
        self.global_c
            .ids
            .get(text)
            .copied()
            .ok_or_else(|| CompileError::UnknownId { name: text.into() })
    }

    /// Textual form of a qubit id.
    pub fn qubit_text(&self, id: u32, gate: Option<&str>) -> CompileResult<&str> {
        self.scope(gate)?
            .entries
            .get(id as usize)
            .map(|(text, _)| text.as_str())
            .ok_or_else(|| CompileError::UnknownId {
                name: format!("qubit #{id}"),
            })
    }

    /// Canonical node of a qubit id.
    pub fn qubit_node(&self, id: u32, gate: Option<&str>) -> CompileResult<NodeId> {
        self.scope(gate)?
            .entries
            .get(id as usize)
            .map(|&(_, node)| node)
            .ok_or_else(|| CompileError::UnknownId {
                name: format!("qubit #{id}"),
            })
    }

    /// Number of qubits in a scope.
    pub fn qubit_count(&self, gate: Option<&str>) -> usize {
        self.scope(gate).map_or(0, |scope| scope.entries.len())
    }

    /// Number of classical bits (global scope).
    pub fn classical_count(&self) -> usize {
        self.global_c.entries.len()
    }

    /// The contiguous ids covering one register's bits.
    pub fn register_ids(&self, reg: &str) -> CompileResult<&[u32]> {
        self.reg_ranges
            .get(reg)
            .map(Vec::as_slice)
            .ok_or_else(|| CompileError::UnknownId { name: reg.into() })
    }
}

/// Pass computing an [`XbitNumbering`] for a module.
#[derive(Debug, Default)]
pub struct XbitNumberingPass {
    result: XbitNumbering,
}

impl XbitNumberingPass {
    pub fn new() -> Self {
        Self::default()
    }

    /// The numbering computed by the last run.
    pub fn result(&self) -> &XbitNumbering {
        &self.result
    }

    /// Consume the pass, yielding the numbering.
    pub fn into_result(self) -> XbitNumbering {
        self.result
    }
}

impl Pass for XbitNumberingPass {
    fn name(&self) -> &'static str {
        "xbit-numbering"
    }

    fn phases(&self) -> PassPhases {
        PassPhases {
            registers: true,
            gates: true,
            statements: false,
        }
    }

    fn initialize(&mut self, _module: &mut QModule) -> CompileResult<()> {
        self.result = XbitNumbering::default();
        Ok(())
    }

    fn run_on_register(&mut self, module: &mut QModule, reg: NodeId) -> CompileResult<()> {
        let view = module.ast().as_reg_decl(reg)?;
        let name = module.ast().str_val(view.id)?.to_string();
        let size = module.ast().int_val(view.size)?;
        if size < 0 {
            return Err(sleipnir_ast::AstError::InvariantViolation(format!(
                "register '{name}' declared with negative size {size}"
            ))
            .into());
        }

        let mut ids = Vec::with_capacity(size as usize);
        for i in 0..size {
            let text = format!("{name}[{i}]");
            // Canonical reference node for this bit, kept detached in the
            // module arena.
            let ast = module.ast_mut();
            let id = ast.lit_id(name.clone());
            let index = ast.lit_int(i);
            let node = ast.id_ref(id, index);
            ast.mark_generated(node);

            let scope = if view.quantum {
                &mut self.result.global_q
            } else {
                &mut self.result.global_c
            };
            ids.push(u32::try_from(scope.entries.len()).unwrap_or(u32::MAX));
            scope.insert(text, node);
        }
        self.result.reg_ranges.insert(name, ids);
        Ok(())
    }

    fn run_on_gate(&mut self, module: &mut QModule, gate: NodeId) -> CompileResult<()> {
        let view = module.ast().as_gate(gate)?;
        let name = module.ast().str_val(view.id)?.to_string();
        let mut scope = Scope::default();
        for &formal in module.ast().children(view.qargs) {
            let text = module.ast().str_val(formal)?.to_string();
            scope.insert(text, formal);
        }
        self.result.gate_scopes.insert(name, scope);
        Ok(())
    }
}
