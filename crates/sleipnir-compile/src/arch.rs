//! Hardware architecture graph.
//!
//! A directed graph over `N` hardware qubits, each addressable through a
//! program-level register reference (`Q[3]`). The allocator consumes
//! architectures exclusively through this interface; concrete topologies
//! arrive from the catalog as plain edge lists.

use petgraph::graphmap::DiGraphMap;

/// Directed adjacency over hardware qubits with a stable index ↔ textual
/// reference mapping. Adjacency iteration follows edge insertion order.
#[derive(Debug, Clone)]
pub struct ArchGraph {
    reg: String,
    num_qubits: u32,
    edges: Vec<(u32, u32)>,
    graph: DiGraphMap<u32, ()>,
}

impl ArchGraph {
    /// Create a graph of `num_qubits` isolated hardware qubits addressed
    /// through register `reg`.
    pub fn new(reg: impl Into<String>, num_qubits: u32) -> Self {
        let mut graph = DiGraphMap::new();
        for q in 0..num_qubits {
            graph.add_node(q);
        }
        Self {
            reg: reg.into(),
            num_qubits,
            edges: Vec::new(),
            graph,
        }
    }

    /// Add a directed edge. Out-of-range endpoints and duplicates are
    /// ignored.
    pub fn add_edge(&mut self, from: u32, to: u32) {
        if from >= self.num_qubits || to >= self.num_qubits || self.has_edge(from, to) {
            return;
        }
        self.edges.push((from, to));
        self.graph.add_edge(from, to, ());
    }

    /// Whether the directed edge `from → to` exists.
    pub fn has_edge(&self, from: u32, to: u32) -> bool {
        self.graph.contains_edge(from, to)
    }

    /// True iff only the opposite direction exists.
    pub fn is_reverse_edge(&self, from: u32, to: u32) -> bool {
        self.has_edge(to, from) && !self.has_edge(from, to)
    }

    /// Undirected neighborhood of a qubit, in edge insertion order.
    /// Qubits connected in both directions appear twice; BFS callers
    /// deduplicate through their visited set.
    pub fn neighbors(&self, qubit: u32) -> impl Iterator<Item = u32> + '_ {
        self.graph
            .neighbors_directed(qubit, petgraph::Direction::Outgoing)
            .chain(
                self.graph
                    .neighbors_directed(qubit, petgraph::Direction::Incoming),
            )
    }

    /// Number of hardware qubits.
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    /// The hardware register name.
    pub fn reg_name(&self) -> &str {
        &self.reg
    }

    /// Textual register reference of a hardware qubit.
    pub fn qubit_ref(&self, qubit: u32) -> String {
        format!("{}[{qubit}]", self.reg)
    }

    /// The directed edges, in insertion order.
    pub fn edges(&self) -> &[(u32, u32)] {
        &self.edges
    }

    /// Build a graph from explicit directed edges.
    pub fn from_edges(
        reg: impl Into<String>,
        num_qubits: u32,
        edges: &[(u32, u32)],
    ) -> Self {
        let mut arch = Self::new(reg, num_qubits);
        for &(from, to) in edges {
            arch.add_edge(from, to);
        }
        arch
    }

    /// Bidirectional linear chain `0 — 1 — ... — n-1`.
    pub fn linear(num_qubits: u32) -> Self {
        let mut arch = Self::new("Q", num_qubits);
        for q in 0..num_qubits.saturating_sub(1) {
            arch.add_edge(q, q + 1);
            arch.add_edge(q + 1, q);
        }
        arch
    }

    /// Bidirectional ring `0 — 1 — ... — n-1 — 0`.
    pub fn ring(num_qubits: u32) -> Self {
        let mut arch = Self::linear(num_qubits);
        if num_qubits > 2 {
            arch.add_edge(num_qubits - 1, 0);
            arch.add_edge(0, num_qubits - 1);
        }
        arch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_edges() {
        let arch = ArchGraph::linear(4);
        assert!(arch.has_edge(0, 1));
        assert!(arch.has_edge(1, 0));
        assert!(!arch.has_edge(0, 2));
        assert!(!arch.is_reverse_edge(0, 1));
    }

    #[test]
    fn test_reverse_edge() {
        let arch = ArchGraph::from_edges("Q", 2, &[(1, 0)]);
        assert!(!arch.has_edge(0, 1));
        assert!(arch.has_edge(1, 0));
        assert!(arch.is_reverse_edge(0, 1));
        assert!(!arch.is_reverse_edge(1, 0));
    }

    #[test]
    fn test_neighbors_insertion_order() {
        let arch = ArchGraph::from_edges("Q", 4, &[(0, 2), (0, 1), (3, 0)]);
        let neighbors: Vec<u32> = arch.neighbors(0).collect();
        assert_eq!(neighbors, vec![2, 1, 3]);
    }

    #[test]
    fn test_duplicate_edges_ignored() {
        let mut arch = ArchGraph::new("Q", 3);
        arch.add_edge(0, 1);
        arch.add_edge(0, 1);
        arch.add_edge(0, 7);
        assert_eq!(arch.edges(), &[(0, 1)]);
    }

    #[test]
    fn test_qubit_ref() {
        let arch = ArchGraph::linear(5);
        assert_eq!(arch.qubit_ref(3), "Q[3]");
        assert_eq!(arch.reg_name(), "Q");
    }
}
