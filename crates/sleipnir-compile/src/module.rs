//! The `QModule`: module-level index over one program tree.
//!
//! A module owns the AST arena plus the version node, the include list,
//! the register and gate tables (insertion order preserved for
//! reproducible emission), and the top-level statement list. All tree
//! mutation performed by passes goes through the module's rewrite API so
//! parent links stay consistent.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use sleipnir_ast::{Ast, AstError, NodeId, NodeKind, Visitor};

use crate::error::{CompileError, CompileResult};
use crate::pass::Pass;

/// Collects the name of every invoked gate in a subtree.
#[derive(Default)]
struct CalledGates {
    names: Vec<String>,
}

impl Visitor for CalledGates {
    fn visit_generic(&mut self, ast: &Ast, id: NodeId) {
        self.names.push(ast.operation(id));
        self.visit_children(ast, id);
    }
}

/// Name of the synthesized swap gate.
pub const SWAP_GATE: &str = "__swap__";
/// Name of the synthesized reversal-CNOT gate.
pub const REV_CX_GATE: &str = "__rev_cx__";
/// Name of the synthesized long-CNOT gate.
pub const LONG_CX_GATE: &str = "__long_cx__";
/// Name of the Hadamard helper gate the intrinsics decompose into.
pub const H_GATE: &str = "h";

/// Top-level container for one program.
#[derive(Debug)]
pub struct QModule {
    ast: Ast,
    version: Option<NodeId>,
    includes: Vec<NodeId>,
    reg_order: Vec<String>,
    regs: FxHashMap<String, NodeId>,
    gate_order: Vec<String>,
    gates: FxHashMap<String, NodeId>,
    statements: NodeId,
    applied: FxHashSet<&'static str>,
}

impl Default for QModule {
    fn default() -> Self {
        Self::new()
    }
}

impl QModule {
    /// Create an empty module.
    pub fn new() -> Self {
        let mut ast = Ast::new();
        let statements = ast.stmt_list();
        Self {
            ast,
            version: None,
            includes: Vec::new(),
            reg_order: Vec::new(),
            regs: FxHashMap::default(),
            gate_order: Vec::new(),
            gates: FxHashMap::default(),
            statements,
            applied: FxHashSet::default(),
        }
    }

    /// Parse a source string and build a module from it.
    pub fn from_source(source: &str) -> CompileResult<Self> {
        let (ast, root) = sleipnir_qasm::parse(source)?;
        Self::from_ast(ast, root)
    }

    /// Build a module from a parsed tree rooted at a `QasmVersion` node.
    ///
    /// Declarations are lifted out of the statement list into the register
    /// and gate tables; includes are recorded and their inner statements
    /// processed with the `in-include` flag set.
    pub fn from_ast(mut ast: Ast, root: NodeId) -> CompileResult<Self> {
        if !matches!(ast.kind(root), NodeKind::QasmVersion) {
            return Err(AstError::KindMismatch {
                node: root,
                expected: "QasmVersion",
                found: ast.kind(root).name(),
            }
            .into());
        }

        // Detach the parsed statement list, leaving the version node with
        // an empty one for emission.
        let fresh = ast.stmt_list();
        let parsed = ast.set_child(root, 1, fresh)?;

        let statements = ast.stmt_list();
        let mut module = Self {
            ast,
            version: Some(root),
            includes: Vec::new(),
            reg_order: Vec::new(),
            regs: FxHashMap::default(),
            gate_order: Vec::new(),
            gates: FxHashMap::default(),
            statements,
            applied: FxHashSet::default(),
        };
        module.adopt_statements(parsed, false)?;
        Ok(module)
    }

    fn adopt_statements(&mut self, list: NodeId, in_include: bool) -> CompileResult<()> {
        while self.ast.child_count(list) > 0 {
            let stmt = self.ast.list_remove(list, 0)?;
            if in_include {
                self.ast.mark_in_include(stmt);
            }
            match self.ast.kind(stmt) {
                NodeKind::RegDecl { .. } => self.insert_reg(stmt)?,
                NodeKind::GateDecl | NodeKind::GateSign => self.insert_gate(stmt)?,
                NodeKind::Include => {
                    let inner = self.ast.child(stmt, 1)?;
                    self.adopt_statements(inner, true)?;
                    self.includes.push(stmt);
                }
                _ => self.ast.list_push(self.statements, stmt)?,
            }
        }
        Ok(())
    }

    // ---- Tree access -----------------------------------------------------

    /// The arena holding every node of this module.
    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    /// Mutable arena access. Structural edits to the statement list should
    /// go through the module's own rewrite API instead.
    pub fn ast_mut(&mut self) -> &mut Ast {
        &mut self.ast
    }

    /// The version node, if the source carried one.
    pub fn version(&self) -> Option<NodeId> {
        self.version
    }

    /// The recorded include nodes, in source order.
    pub fn includes(&self) -> &[NodeId] {
        &self.includes
    }

    /// The top-level statement list node.
    pub fn statements_node(&self) -> NodeId {
        self.statements
    }

    /// The top-level statements, in source order.
    pub fn statements(&self) -> &[NodeId] {
        self.ast.children(self.statements)
    }

    // ---- Register and gate tables ----------------------------------------

    /// Insert a register declaration. Fails with `DuplicateId` if the name
    /// is taken.
    pub fn insert_reg(&mut self, decl: NodeId) -> CompileResult<()> {
        let view = self.ast.as_reg_decl(decl)?;
        let name = self.ast.str_val(view.id)?.to_string();
        if self.regs.contains_key(&name) {
            return Err(CompileError::DuplicateId { name });
        }
        self.reg_order.push(name.clone());
        self.regs.insert(name, decl);
        Ok(())
    }

    /// Insert a gate declaration (opaque or with body). Fails with
    /// `DuplicateId` if the name is taken.
    pub fn insert_gate(&mut self, decl: NodeId) -> CompileResult<()> {
        let view = self.ast.as_gate(decl)?;
        let name = self.ast.str_val(view.id)?.to_string();
        if self.gates.contains_key(&name) {
            return Err(CompileError::DuplicateId { name });
        }
        self.gate_order.push(name.clone());
        self.gates.insert(name, decl);
        Ok(())
    }

    /// Look up a register declaration by name.
    pub fn get_reg(&self, name: &str) -> CompileResult<NodeId> {
        self.regs
            .get(name)
            .copied()
            .ok_or_else(|| CompileError::UnknownId { name: name.into() })
    }

    /// Look up a gate declaration by name.
    pub fn get_gate(&self, name: &str) -> CompileResult<NodeId> {
        self.gates
            .get(name)
            .copied()
            .ok_or_else(|| CompileError::UnknownId { name: name.into() })
    }

    /// Whether a gate with this name is declared.
    pub fn has_gate(&self, name: &str) -> bool {
        self.gates.contains_key(name)
    }

    /// Register declarations in insertion order.
    pub fn regs(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.reg_order.iter().map(|name| self.regs[name])
    }

    /// Gate declarations in insertion order.
    pub fn gates(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.gate_order.iter().map(|name| self.gates[name])
    }

    /// Atomically replace the register table. The previous declarations
    /// are detached but remain in the arena.
    pub fn replace_all_regs_with(&mut self, new_regs: Vec<NodeId>) -> CompileResult<()> {
        let mut order = Vec::with_capacity(new_regs.len());
        let mut table = FxHashMap::default();
        for decl in new_regs {
            let view = self.ast.as_reg_decl(decl)?;
            let name = self.ast.str_val(view.id)?.to_string();
            if table.contains_key(&name) {
                return Err(CompileError::DuplicateId { name });
            }
            order.push(name.clone());
            table.insert(name, decl);
        }
        self.reg_order = order;
        self.regs = table;
        Ok(())
    }

    // ---- Statement list editing ------------------------------------------

    /// Insert a statement at the front of the list.
    pub fn insert_statement_front(&mut self, stmt: NodeId) -> CompileResult<()> {
        Ok(self.ast.list_insert(self.statements, 0, stmt)?)
    }

    /// Append a statement at the end of the list.
    pub fn insert_statement_last(&mut self, stmt: NodeId) -> CompileResult<()> {
        Ok(self.ast.list_push(self.statements, stmt)?)
    }

    /// Insert a statement before position `pos`.
    pub fn insert_statement_before(&mut self, pos: usize, stmt: NodeId) -> CompileResult<()> {
        Ok(self.ast.list_insert(self.statements, pos, stmt)?)
    }

    /// Insert a statement after position `pos`.
    pub fn insert_statement_after(&mut self, pos: usize, stmt: NodeId) -> CompileResult<()> {
        Ok(self.ast.list_insert(self.statements, pos + 1, stmt)?)
    }

    /// Replace a top-level statement with a sequence, preserving position.
    /// Returns the index of the first replacement.
    pub fn replace_statement(
        &mut self,
        old: NodeId,
        replacements: Vec<NodeId>,
    ) -> CompileResult<usize> {
        Ok(self.ast.replace_in_list(self.statements, old, replacements)?)
    }

    /// Position of a statement in the list.
    pub fn statement_position(&self, stmt: NodeId) -> Option<usize> {
        self.ast.position_of(self.statements, stmt)
    }

    // ---- Synthesized gates -----------------------------------------------

    /// Register the Hadamard helper gate used by the synthesized
    /// decompositions: `gate h a { U((pi / 2), 0, pi) a; }`
    fn register_h_gate(&mut self) -> CompileResult<()> {
        if self.has_gate(H_GATE) {
            return Ok(());
        }
        let ast = &mut self.ast;
        let name = ast.lit_id(H_GATE);
        let args = ast.list();
        let qargs = ast.list();
        let a = ast.lit_id("a");
        ast.list_push(qargs, a)?;

        let body = ast.gop_list();
        let pi = ast.lit_id("pi");
        let two = ast.lit_int(2);
        let half_pi = ast.bin_op(sleipnir_ast::BinOpKind::Div, pi, two);
        let zero = ast.lit_int(0);
        let pi_again = ast.lit_id("pi");
        let u_args = ast.list();
        ast.list_push(u_args, half_pi)?;
        ast.list_push(u_args, zero)?;
        ast.list_push(u_args, pi_again)?;
        let qarg = ast.lit_id("a");
        let u = ast.u(u_args, qarg);
        ast.list_push(body, u)?;

        let decl = ast.gate_decl(name, args, qargs, body);
        ast.mark_generated(decl);
        self.insert_gate(decl)
    }

    /// Build `CX <a>, <b>;` over fresh formal references.
    fn formal_cx(&mut self, a: &str, b: &str) -> NodeId {
        let lhs = self.ast.lit_id(a);
        let rhs = self.ast.lit_id(b);
        self.ast.cx(lhs, rhs)
    }

    /// Build `h <q>;` over a fresh formal reference.
    fn formal_h(&mut self, q: &str) -> CompileResult<NodeId> {
        let name = self.ast.lit_id(H_GATE);
        let args = self.ast.list();
        let qargs = self.ast.list();
        let arg = self.ast.lit_id(q);
        self.ast.list_push(qargs, arg)?;
        Ok(self.ast.call(name, args, qargs))
    }

    /// Lazily register the synthesized swap gate:
    /// `gate __swap__ a, b { CX a, b; h a; h b; CX a, b; h a; h b; CX a, b; }`
    pub fn register_swap_gate(&mut self) -> CompileResult<()> {
        if self.has_gate(SWAP_GATE) {
            return Ok(());
        }
        self.register_h_gate()?;

        let ops = [
            self.formal_cx("a", "b"),
            self.formal_h("a")?,
            self.formal_h("b")?,
            self.formal_cx("a", "b"),
            self.formal_h("a")?,
            self.formal_h("b")?,
            self.formal_cx("a", "b"),
        ];
        self.register_two_formal_gate(SWAP_GATE, &["a", "b"], &ops)
    }

    /// Lazily register the synthesized reversal-CNOT gate:
    /// `gate __rev_cx__ a, b { h a; h b; CX b, a; h a; h b; }`
    pub fn register_rev_cx_gate(&mut self) -> CompileResult<()> {
        if self.has_gate(REV_CX_GATE) {
            return Ok(());
        }
        self.register_h_gate()?;

        let ops = [
            self.formal_h("a")?,
            self.formal_h("b")?,
            self.formal_cx("b", "a"),
            self.formal_h("a")?,
            self.formal_h("b")?,
        ];
        self.register_two_formal_gate(REV_CX_GATE, &["a", "b"], &ops)
    }

    /// Lazily register the synthesized long-CNOT gate:
    /// `gate __long_cx__ a, w, b { CX a, w; CX w, b; CX a, w; CX w, b; }`
    pub fn register_long_cx_gate(&mut self) -> CompileResult<()> {
        if self.has_gate(LONG_CX_GATE) {
            return Ok(());
        }

        let ops = [
            self.formal_cx("a", "w"),
            self.formal_cx("w", "b"),
            self.formal_cx("a", "w"),
            self.formal_cx("w", "b"),
        ];
        self.register_two_formal_gate(LONG_CX_GATE, &["a", "w", "b"], &ops)
    }

    fn register_two_formal_gate(
        &mut self,
        name: &str,
        formals: &[&str],
        ops: &[NodeId],
    ) -> CompileResult<()> {
        let ast = &mut self.ast;
        let name = ast.lit_id(name);
        let args = ast.list();
        let qargs = ast.list();
        for formal in formals {
            let f = ast.lit_id(*formal);
            ast.list_push(qargs, f)?;
        }
        let body = ast.gop_list();
        for &op in ops {
            ast.list_push(body, op)?;
        }
        let decl = ast.gate_decl(name, args, qargs, body);
        ast.mark_generated(decl);
        self.insert_gate(decl)
    }

    /// Insert a `__swap__ lhs, rhs;` invocation before statement position
    /// `pos`, registering the swap gate on first use. The operand nodes
    /// are cloned, not moved.
    pub fn insert_swap_before(
        &mut self,
        pos: usize,
        lhs: NodeId,
        rhs: NodeId,
    ) -> CompileResult<()> {
        let swap = self.make_swap_call(lhs, rhs)?;
        self.insert_statement_before(pos, swap)
    }

    /// Insert a `__swap__ lhs, rhs;` invocation after statement position
    /// `pos`, registering the swap gate on first use.
    pub fn insert_swap_after(&mut self, pos: usize, lhs: NodeId, rhs: NodeId) -> CompileResult<()> {
        let swap = self.make_swap_call(lhs, rhs)?;
        self.insert_statement_after(pos, swap)
    }

    fn make_swap_call(&mut self, lhs: NodeId, rhs: NodeId) -> CompileResult<NodeId> {
        self.register_swap_gate()?;
        let ast = &mut self.ast;
        let name = ast.lit_id(SWAP_GATE);
        let args = ast.list();
        let qargs = ast.list();
        let lhs = ast.clone_subtree(lhs);
        let rhs = ast.clone_subtree(rhs);
        ast.list_push(qargs, lhs)?;
        ast.list_push(qargs, rhs)?;
        let call = ast.call(name, args, qargs);
        ast.mark_generated(call);
        Ok(call)
    }

    // ---- Pass execution --------------------------------------------------

    /// Run a pass across this module.
    ///
    /// If the pass has already been applied here and `force` is false,
    /// this is a no-op. Otherwise the pass is initialized, applied to
    /// registers, then gates, then statements (each in insertion order,
    /// honoring the pass's phase flags), finalized, and recorded as
    /// applied.
    pub fn run_pass(&mut self, pass: &mut dyn Pass, force: bool) -> CompileResult<()> {
        if self.applied.contains(pass.name()) && !force {
            debug!(pass = pass.name(), "skipping memoized pass");
            return Ok(());
        }
        debug!(pass = pass.name(), force, "running pass");

        pass.initialize(self)?;
        let phases = pass.phases();

        if phases.registers {
            let regs: Vec<NodeId> = self.regs().collect();
            for reg in regs {
                pass.run_on_register(self, reg)?;
            }
        }
        if phases.gates {
            let gates: Vec<NodeId> = self.gates().collect();
            for gate in gates {
                pass.run_on_gate(self, gate)?;
            }
        }
        if phases.statements {
            let stmts: Vec<NodeId> = self.statements().to_vec();
            for stmt in stmts {
                pass.run_on_statement(self, stmt)?;
            }
        }

        pass.finalize(self)?;
        self.applied.insert(pass.name());
        Ok(())
    }

    /// Whether a pass id has been recorded as applied on this module.
    pub fn was_applied(&self, name: &str) -> bool {
        self.applied.contains(name)
    }

    /// Check the table invariant: every gate invoked by a statement or by
    /// another gate's body must be declared (opaque gates count as
    /// declarations).
    pub fn validate(&self) -> CompileResult<()> {
        let mut visitor = CalledGates::default();
        for &stmt in self.statements() {
            self.ast.apply(stmt, &mut visitor);
        }
        for gate in self.gates() {
            if let Some(body) = self.ast.as_gate(gate)?.body {
                self.ast.apply(body, &mut visitor);
            }
        }
        for name in visitor.names {
            if !self.has_gate(&name) {
                return Err(CompileError::UnknownId { name });
            }
        }
        Ok(())
    }

    // ---- Clone and emission ----------------------------------------------

    /// Deep copy: the clone shares no storage with the original, and its
    /// pass-application record starts empty.
    pub fn deep_clone(&self) -> Self {
        Self {
            ast: self.ast.clone(),
            version: self.version,
            includes: self.includes.clone(),
            reg_order: self.reg_order.clone(),
            regs: self.regs.clone(),
            gate_order: self.gate_order.clone(),
            gates: self.gates.clone(),
            statements: self.statements,
            applied: FxHashSet::default(),
        }
    }

    /// Serialize the module: version, includes, gates (insertion order,
    /// skipping include-owned ones), registers (insertion order), then
    /// statements.
    pub fn to_source(&self, pretty: bool, include_gates: bool) -> String {
        let mut pieces: Vec<String> = Vec::new();

        if let Some(version) = self.version {
            pieces.push(self.ast.emit(version, pretty));
        }
        for &incl in &self.includes {
            pieces.push(self.ast.emit(incl, pretty));
        }
        if include_gates {
            for gate in self.gates() {
                if !self.ast.in_include(gate) {
                    pieces.push(self.ast.emit(gate, pretty));
                }
            }
        }
        for reg in self.regs() {
            pieces.push(self.ast.emit(reg, pretty));
        }
        pieces.push(self.ast.emit(self.statements, pretty));

        let mut out = String::new();
        for piece in pieces {
            let piece = piece.trim_end();
            if piece.is_empty() {
                continue;
            }
            out.push_str(piece);
            out.push(if pretty { '\n' } else { ' ' });
        }
        if !pretty {
            out.truncate(out.trim_end().len());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pass::PassPhases;

    #[test]
    fn test_from_source_builds_tables() {
        let module = QModule::from_source(
            "OPENQASM 2.0; gate cnot a, b { CX a, b; } qreg q[2]; creg c[2]; \
             cnot q[0], q[1]; measure q[0] -> c[0];",
        )
        .unwrap();

        assert!(module.get_gate("cnot").is_ok());
        assert!(module.get_reg("q").is_ok());
        assert!(module.get_reg("c").is_ok());
        assert_eq!(module.statements().len(), 2);
        assert!(matches!(
            module.get_gate("nope"),
            Err(CompileError::UnknownId { .. })
        ));
    }

    #[test]
    fn test_duplicate_register_rejected() {
        let err = QModule::from_source("OPENQASM 2.0; qreg q[2]; qreg q[3];").unwrap_err();
        assert!(matches!(err, CompileError::DuplicateId { name } if name == "q"));
    }

    #[test]
    fn test_emission_order() {
        let module = QModule::from_source(
            "OPENQASM 2.0; qreg q[1]; gate noop a { } creg c[1]; noop q[0];",
        )
        .unwrap();
        let out = module.to_source(true, true);
        let gate_pos = out.find("gate noop").unwrap();
        let qreg_pos = out.find("qreg q[1];").unwrap();
        let creg_pos = out.find("creg c[1];").unwrap();
        let call_pos = out.find("noop q[0];").unwrap();
        assert!(out.starts_with("OPENQASM 2.0;"));
        assert!(gate_pos < qreg_pos && qreg_pos < creg_pos && creg_pos < call_pos);
    }

    #[test]
    fn test_swap_gate_registered_lazily() {
        let mut module = QModule::from_source(
            "OPENQASM 2.0; qreg q[2]; CX q[0], q[1];",
        )
        .unwrap();
        assert!(!module.has_gate(SWAP_GATE));

        let stmt = module.statements()[0];
        let lhs = module.ast().children(stmt)[0];
        let rhs = module.ast().children(stmt)[1];
        module.insert_swap_before(0, lhs, rhs).unwrap();

        assert!(module.has_gate(SWAP_GATE));
        assert!(module.has_gate(H_GATE));
        assert_eq!(module.statements().len(), 2);
        let swap_stmt = module.statements()[0];
        assert_eq!(module.ast().operation(swap_stmt), SWAP_GATE);
        assert!(module.ast().generated(swap_stmt));

        // Registering twice is a no-op.
        module.register_swap_gate().unwrap();
        let decl = module.get_gate(SWAP_GATE).unwrap();
        let body = module.ast().as_gate(decl).unwrap().body.unwrap();
        assert_eq!(module.ast().child_count(body), 7);
    }

    #[test]
    fn test_replace_all_regs_atomic() {
        let mut module =
            QModule::from_source("OPENQASM 2.0; qreg a[2]; qreg b[3];").unwrap();
        let ast = module.ast_mut();
        let name = ast.lit_id("Q");
        let size = ast.lit_int(5);
        let decl = ast.reg_decl(true, name, size);
        module.replace_all_regs_with(vec![decl]).unwrap();

        assert!(module.get_reg("a").is_err());
        assert!(module.get_reg("Q").is_ok());
        assert!(module.to_source(true, false).contains("qreg Q[5];"));
    }

    /// Counts how often each hook fires.
    #[derive(Default)]
    struct CountingPass {
        initialized: usize,
        regs: usize,
        stmts: usize,
    }

    impl Pass for CountingPass {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn phases(&self) -> PassPhases {
            PassPhases {
                registers: true,
                gates: false,
                statements: true,
            }
        }

        fn initialize(&mut self, _module: &mut QModule) -> CompileResult<()> {
            self.initialized += 1;
            Ok(())
        }

        fn run_on_register(&mut self, _module: &mut QModule, _reg: NodeId) -> CompileResult<()> {
            self.regs += 1;
            Ok(())
        }

        fn run_on_statement(&mut self, _module: &mut QModule, _stmt: NodeId) -> CompileResult<()> {
            self.stmts += 1;
            Ok(())
        }
    }

    #[test]
    fn test_run_pass_memoization() {
        let mut module = QModule::from_source(
            "OPENQASM 2.0; qreg q[2]; CX q[0], q[1]; reset q[0];",
        )
        .unwrap();

        let mut pass = CountingPass::default();
        module.run_pass(&mut pass, false).unwrap();
        module.run_pass(&mut pass, false).unwrap();
        assert_eq!(pass.initialized, 1);
        assert_eq!(pass.regs, 1);
        assert_eq!(pass.stmts, 2);

        module.run_pass(&mut pass, true).unwrap();
        assert_eq!(pass.initialized, 2);
    }

    #[test]
    fn test_validate_gate_table_invariant() {
        let module = QModule::from_source(
            "OPENQASM 2.0; gate wrap a, b { inner a, b; } qreg q[2]; wrap q[0], q[1];",
        )
        .unwrap();
        let err = module.validate().unwrap_err();
        assert!(matches!(err, CompileError::UnknownId { name } if name == "inner"));

        let ok = QModule::from_source(
            "OPENQASM 2.0; gate inner a, b { CX a, b; } gate wrap a, b { inner a, b; } \
             qreg q[2]; wrap q[0], q[1];",
        )
        .unwrap();
        ok.validate().unwrap();
    }

    #[test]
    fn test_deep_clone_shares_nothing() {
        let module = QModule::from_source(
            "OPENQASM 2.0; qreg q[2]; CX q[0], q[1];",
        )
        .unwrap();
        let mut copy = module.deep_clone();
        assert_eq!(
            module.to_source(true, true),
            copy.to_source(true, true)
        );

        let stmt = copy.statements()[0];
        copy.replace_statement(stmt, vec![]).unwrap();
        assert_eq!(copy.statements().len(), 0);
        assert_eq!(module.statements().len(), 1);
    }
}
