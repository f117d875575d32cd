#![forbid(unsafe_code)]
#![doc = "VF2-style backtracking search for the isomorphisms between two graphs of equal order."]

use std::collections::HashMap;
use std::collections::HashSet;

use epunfold_graph::Mapping;
use epunfold_graph::UndirectedGraph;
use log::trace;

/// Returns every bijection `V(g1) -> V(g2)` that preserves edges in both
/// directions, trimmed of identity entries. Returns an empty vector if the
/// graphs have a different number of vertices.
pub fn find_isomorphisms(g1: &UndirectedGraph, g2: &UndirectedGraph) -> Vec<Mapping> {
    if g1.num_of_nodes() != g2.num_of_nodes() {
        return Vec::new();
    }

    let mut order1: Vec<usize> = g1.nodes().collect();
    order1.sort_by_key(|&v| std::cmp::Reverse(g1.degree(v)));

    let nodes2: Vec<usize> = g2.nodes().collect();

    let mut assignment = HashMap::new();
    let mut used2 = HashSet::new();
    let mut results = Vec::new();

    search(g1, g2, &order1, &nodes2, 0, &mut assignment, &mut used2, &mut results);

    trace!("Found {} isomorphisms", results.len());
    results
}

#[allow(clippy::too_many_arguments)]
fn search(
    g1: &UndirectedGraph,
    g2: &UndirectedGraph,
    order1: &[usize],
    nodes2: &[usize],
    index: usize,
    assignment: &mut HashMap<usize, usize>,
    used2: &mut HashSet<usize>,
    results: &mut Vec<Mapping>,
) {
    if index == order1.len() {
        results.push(Mapping::from_pairs(assignment.iter().map(|(&from, &to)| (from, to))));
        return;
    }

    let v = order1[index];
    for &candidate in nodes2 {
        if used2.contains(&candidate) || g1.degree(v) != g2.degree(candidate) {
            continue;
        }

        if is_consistent(g1, g2, v, candidate, assignment) {
            assignment.insert(v, candidate);
            used2.insert(candidate);

            search(g1, g2, order1, nodes2, index + 1, assignment, used2, results);

            assignment.remove(&v);
            used2.remove(&candidate);
        }
    }
}

/// Checks that mapping `v -> candidate` is consistent with every already
/// decided pair: `v` and `u` must be related by an edge in `g1` exactly when
/// `candidate` and `f(u)` are related by an edge in `g2`.
fn is_consistent(
    g1: &UndirectedGraph,
    g2: &UndirectedGraph,
    v: usize,
    candidate: usize,
    assignment: &HashMap<usize, usize>,
) -> bool {
    assignment
        .iter()
        .all(|(&u, &fu)| g1.has_edge(u, v) == g2.has_edge(fu, candidate))
}
