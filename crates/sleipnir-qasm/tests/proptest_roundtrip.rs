//! Property-based tests for parse → emit → parse round-tripping.
//!
//! Emission must reproduce a structurally equivalent tree in both the
//! pretty and the compact form, for any program the generator can build.

use proptest::prelude::*;
use sleipnir_qasm::parse;

/// Statements that can appear after the register declarations.
#[derive(Debug, Clone)]
enum Stmt {
    Cx(u32, u32),
    U(u32),
    Measure(u32),
    Reset(u32),
    Barrier(u32),
    IfCx(i64, u32, u32),
}

impl Stmt {
    fn render(&self) -> String {
        match self {
            Stmt::Cx(a, b) => format!("CX q[{a}], q[{b}];"),
            Stmt::U(q) => format!("U(pi / 2, 0.0, -(pi / 4)) q[{q}];"),
            Stmt::Measure(q) => format!("measure q[{q}] -> c[{q}];"),
            Stmt::Reset(q) => format!("reset q[{q}];"),
            Stmt::Barrier(q) => format!("barrier q[{q}];"),
            Stmt::IfCx(v, a, b) => format!("if (c == {v}) CX q[{a}], q[{b}];"),
        }
    }
}

fn arb_stmt(num_qubits: u32) -> impl Strategy<Value = Stmt> {
    let q = 0..num_qubits;
    if num_qubits < 2 {
        prop_oneof![
            q.clone().prop_map(Stmt::U),
            q.clone().prop_map(Stmt::Measure),
            q.clone().prop_map(Stmt::Reset),
            q.prop_map(Stmt::Barrier),
        ]
        .boxed()
    } else {
        let pair = (0..num_qubits, 0..num_qubits)
            .prop_filter("distinct qubits", |(a, b)| a != b);
        prop_oneof![
            pair.clone().prop_map(|(a, b)| Stmt::Cx(a, b)),
            q.clone().prop_map(Stmt::U),
            q.clone().prop_map(Stmt::Measure),
            q.clone().prop_map(Stmt::Reset),
            q.prop_map(Stmt::Barrier),
            (0_i64..4, pair).prop_map(|(v, (a, b))| Stmt::IfCx(v, a, b)),
        ]
        .boxed()
    }
}

fn arb_program() -> impl Strategy<Value = String> {
    (1_u32..=5).prop_flat_map(|num_qubits| {
        prop::collection::vec(arb_stmt(num_qubits), 1..=10).prop_map(move |stmts| {
            let mut src = String::from("OPENQASM 2.0;\n");
            src.push_str(&format!("qreg q[{num_qubits}];\n"));
            src.push_str(&format!("creg c[{num_qubits}];\n"));
            for stmt in &stmts {
                src.push_str(&stmt.render());
                src.push('\n');
            }
            src
        })
    })
}

proptest! {
    #[test]
    fn roundtrip_pretty(src in arb_program()) {
        let (ast1, root1) = parse(&src).unwrap();
        let emitted = ast1.emit(root1, true);
        let (ast2, root2) = parse(&emitted).unwrap();
        prop_assert!(ast1.eq_across(root1, &ast2, root2));
    }

    #[test]
    fn roundtrip_compact(src in arb_program()) {
        let (ast1, root1) = parse(&src).unwrap();
        let emitted = ast1.emit(root1, false);
        let (ast2, root2) = parse(&emitted).unwrap();
        prop_assert!(ast1.eq_across(root1, &ast2, root2));
    }

    #[test]
    fn emission_is_stable(src in arb_program()) {
        let (ast1, root1) = parse(&src).unwrap();
        let first = ast1.emit(root1, true);
        let (ast2, root2) = parse(&first).unwrap();
        prop_assert_eq!(first, ast2.emit(root2, true));
    }
}
