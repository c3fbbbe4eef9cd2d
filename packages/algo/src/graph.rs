//! Prerequisite graph over the catalog arena.
//!
//! Nodes carry catalog indices and are added in catalog order, so a node's
//! `NodeIndex` equals its catalog index. Edges point from prerequisite to
//! dependent.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};
use petgraph::Direction;
use serde::Serialize;

use crate::catalog::Catalog;
use crate::types::KcId;

/// Cycles found in the catalog, for the content-authoring side
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    /// Each strongly connected group of KCs, sorted by curriculum order
    pub cycles: Vec<Vec<KcId>>,
    /// KCs downstream of a cycle (not on it) that cannot be sequenced either
    pub blocked: Vec<KcId>,
}

impl CycleReport {
    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }
}

pub struct PrereqGraph {
    graph: DiGraph<usize, ()>,
    /// Declared prerequisites that are not in the catalog, per node
    missing: HashMap<usize, Vec<KcId>>,
}

impl PrereqGraph {
    pub fn build(catalog: &Catalog) -> Self {
        let mut graph = DiGraph::with_capacity(catalog.len(), catalog.len());
        for idx in 0..catalog.len() {
            graph.add_node(idx);
        }

        let mut missing: HashMap<usize, Vec<KcId>> = HashMap::new();
        for (idx, kc) in catalog.iter().enumerate() {
            for prereq in &kc.prerequisites {
                match catalog.index_of(prereq) {
                    Some(p) => {
                        let (from, to) = (NodeIndex::new(p), NodeIndex::new(idx));
                        if graph.find_edge(from, to).is_none() {
                            graph.add_edge(from, to, ());
                        }
                    }
                    None => missing.entry(idx).or_default().push(prereq.clone()),
                }
            }
        }

        Self { graph, missing }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Unknown prerequisites declared by this KC
    pub fn missing_prerequisites(&self, idx: usize) -> &[KcId] {
        self.missing.get(&idx).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Strongly connected groups that form cycles, including self-loops
    pub fn cycle_groups(&self) -> Vec<Vec<usize>> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || self.graph.find_edge(scc[0], scc[0]).is_some()
            })
            .map(|scc| scc.into_iter().map(NodeIndex::index).collect())
            .collect()
    }

    /// Nodes on a cycle plus everything that depends on them
    pub fn cycle_affected(&self) -> HashSet<usize> {
        let mut affected = HashSet::new();
        for group in self.cycle_groups() {
            for start in group {
                if affected.contains(&start) {
                    continue;
                }
                let mut dfs = Dfs::new(&self.graph, NodeIndex::new(start));
                while let Some(node) = dfs.next(&self.graph) {
                    affected.insert(node.index());
                }
            }
        }
        affected
    }

    pub fn cycle_report(&self, catalog: &Catalog) -> CycleReport {
        let groups = self.cycle_groups();
        if groups.is_empty() {
            return CycleReport::default();
        }

        let on_cycle: HashSet<usize> = groups.iter().flatten().copied().collect();
        let mut cycles: Vec<Vec<KcId>> = groups
            .into_iter()
            .map(|group| ordered_ids(catalog, group))
            .collect();
        cycles.sort();

        let downstream: Vec<usize> = self
            .cycle_affected()
            .into_iter()
            .filter(|idx| !on_cycle.contains(idx))
            .collect();

        CycleReport {
            cycles,
            blocked: ordered_ids(catalog, downstream),
        }
    }

    /// Transitive prerequisites of a node (excluding itself)
    pub fn ancestors(&self, idx: usize) -> Vec<usize> {
        let reversed = Reversed(&self.graph);
        let mut dfs = Dfs::new(reversed, NodeIndex::new(idx));
        let mut found = Vec::new();
        while let Some(node) = dfs.next(reversed) {
            if node.index() != idx {
                found.push(node.index());
            }
        }
        found
    }

    /// Direct prerequisites that are present in the catalog
    pub fn prerequisites(&self, idx: usize) -> Vec<usize> {
        self.graph
            .neighbors_directed(NodeIndex::new(idx), Direction::Incoming)
            .map(NodeIndex::index)
            .collect()
    }

    /// Kahn's algorithm over a subset, ties broken by curriculum order.
    ///
    /// Only edges inside the subset count. Nodes that never become ready
    /// (cycle members and their dependents) are left out of the result.
    pub fn topo_order(&self, catalog: &Catalog, subset: &BTreeSet<usize>) -> Vec<usize> {
        let mut in_degree: HashMap<usize, usize> = subset
            .iter()
            .map(|&idx| {
                let degree = self
                    .prerequisites(idx)
                    .into_iter()
                    .filter(|p| subset.contains(p))
                    .count();
                (idx, degree)
            })
            .collect();

        let mut ready = BinaryHeap::new();
        for (&idx, &degree) in &in_degree {
            if degree == 0 {
                let kc = catalog.at(idx);
                ready.push(Reverse((kc.position, kc.id.clone(), idx)));
            }
        }

        let mut order = Vec::with_capacity(subset.len());
        while let Some(Reverse((_, _, idx))) = ready.pop() {
            order.push(idx);
            for next in self
                .graph
                .neighbors_directed(NodeIndex::new(idx), Direction::Outgoing)
            {
                let next = next.index();
                if let Some(degree) = in_degree.get_mut(&next) {
                    *degree -= 1;
                    if *degree == 0 {
                        let kc = catalog.at(next);
                        ready.push(Reverse((kc.position, kc.id.clone(), next)));
                    }
                }
            }
        }

        order
    }
}

fn ordered_ids(catalog: &Catalog, indices: impl IntoIterator<Item = usize>) -> Vec<KcId> {
    let mut kcs: Vec<_> = indices.into_iter().map(|idx| catalog.at(idx)).collect();
    kcs.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
    kcs.into_iter().map(|kc| kc.id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KnowledgeComponent;

    fn kc(id: &str, position: i64, prereqs: &[&str]) -> KnowledgeComponent {
        KnowledgeComponent::new(id, position).requires(prereqs.iter().copied())
    }

    fn ids(catalog: &Catalog, order: Vec<usize>) -> Vec<String> {
        order.into_iter().map(|i| catalog.at(i).id.clone()).collect()
    }

    #[test]
    fn test_topo_order_respects_edges_and_positions() {
        let catalog = Catalog::from_components(vec![
            kc("c", 1, &["a", "b"]),
            kc("b", 3, &[]),
            kc("a", 2, &[]),
            kc("d", 0, &[]),
        ]);
        let graph = PrereqGraph::build(&catalog);
        let all: BTreeSet<usize> = (0..catalog.len()).collect();
        assert_eq!(ids(&catalog, graph.topo_order(&catalog, &all)), vec!["d", "a", "b", "c"]);
    }

    #[test]
    fn test_topo_order_ignores_edges_outside_subset() {
        let catalog = Catalog::from_components(vec![kc("a", 5, &[]), kc("b", 1, &["a"])]);
        let graph = PrereqGraph::build(&catalog);
        let only_b: BTreeSet<usize> = [1].into_iter().collect();
        assert_eq!(ids(&catalog, graph.topo_order(&catalog, &only_b)), vec!["b"]);
    }

    #[test]
    fn test_cycle_detection() {
        let catalog = Catalog::from_components(vec![
            kc("a", 0, &["c"]),
            kc("b", 1, &["a"]),
            kc("c", 2, &["b"]),
            kc("d", 3, &["c"]),
            kc("e", 4, &[]),
        ]);
        let graph = PrereqGraph::build(&catalog);
        let report = graph.cycle_report(&catalog);
        assert_eq!(report.cycles, vec![vec!["a", "b", "c"]]);
        assert_eq!(report.blocked, vec!["d"]);

        let affected = graph.cycle_affected();
        assert_eq!(affected.len(), 4);
        assert!(!affected.contains(&4));

        let all: BTreeSet<usize> = (0..catalog.len()).collect();
        assert_eq!(ids(&catalog, graph.topo_order(&catalog, &all)), vec!["e"]);
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let catalog = Catalog::from_components(vec![kc("a", 0, &["a"]), kc("b", 1, &[])]);
        let graph = PrereqGraph::build(&catalog);
        assert_eq!(graph.cycle_report(&catalog).cycles, vec![vec!["a"]]);
    }

    #[test]
    fn test_missing_prerequisites_and_ancestors() {
        let catalog = Catalog::from_components(vec![
            kc("a", 0, &["ghost"]),
            kc("b", 1, &["a"]),
            kc("c", 2, &["b"]),
        ]);
        let graph = PrereqGraph::build(&catalog);
        assert_eq!(graph.missing_prerequisites(0).to_vec(), vec!["ghost".to_string()]);
        assert!(graph.missing_prerequisites(2).is_empty());

        let mut ancestors = graph.ancestors(2);
        ancestors.sort();
        assert_eq!(ancestors, vec![0, 1]);
        assert!(graph.cycle_report(&catalog).is_empty());
    }
}
