#![forbid(unsafe_code)]
#![doc = "Backtracking search for the homomorphic retractions of a graph — the single hottest code path of an epunfold run."]

use epunfold_graph::Mapping;
use epunfold_graph::UndirectedGraph;
use log::trace;

/// Returns every non-identity retraction of `graph`: idempotent vertex
/// mappings `r` that are graph homomorphisms and fix their own image
/// pointwise. See `core()` for how these are narrowed down to a single
/// minimum retract.
///
/// Vertices are processed in descending-degree order, per the symmetry
/// break prescribed for this search: a vertex with more constraints is
/// decided first, so that inconsistent branches are pruned earlier. A
/// vertex can retract onto any other vertex, including one not yet
/// reached in this order — that target is then pinned as a fixed point
/// ahead of its own turn, so the search covers every candidate image
/// subset rather than only ones built by a single forward pass.
pub fn find_retractions(graph: &UndirectedGraph) -> Vec<Mapping> {
    let mut order: Vec<usize> = graph.nodes().collect();
    order.sort_unstable();
    order.sort_by_key(|&v| std::cmp::Reverse(graph.degree(v)));

    let neighbors: Vec<(usize, Vec<usize>)> = order.iter().map(|&v| (v, graph.neighbors(v))).collect();

    let mut assignment: std::collections::HashMap<usize, usize> = std::collections::HashMap::new();
    let mut results = Vec::new();

    search(graph, &order, &neighbors, 0, &mut assignment, &mut results);

    trace!("Found {} non-identity retractions", results.len());
    results
}

fn search(
    graph: &UndirectedGraph,
    order: &[usize],
    neighbors: &[(usize, Vec<usize>)],
    index: usize,
    assignment: &mut std::collections::HashMap<usize, usize>,
    results: &mut Vec<Mapping>,
) {
    if index == order.len() {
        if is_valid_retraction(graph, assignment) {
            let mapping = Mapping::from_pairs(assignment.iter().map(|(&from, &to)| (from, to)));
            if !mapping.is_identity() {
                results.push(mapping);
            }
        }
        return;
    }

    let v = order[index];
    let v_neighbors = &neighbors[index].1;

    // v may already be pinned: an earlier vertex chose it as a retraction
    // target (Option B below), ahead of its own turn in `order`. It is
    // then a forced fixed point; just recheck consistency against whatever
    // neighbors have been assigned since the pin was made.
    if let Some(&target) = assignment.get(&v) {
        debug_assert_eq!(target, v, "a pinned vertex is always fixed to itself");
        if is_locally_consistent(graph, v, v, v_neighbors, assignment) {
            search(graph, order, neighbors, index + 1, assignment, results);
        }
        return;
    }

    // Option A: v joins the image, fixed to itself.
    if is_locally_consistent(graph, v, v, v_neighbors, assignment) {
        assignment.insert(v, v);
        search(graph, order, neighbors, index + 1, assignment, results);
        assignment.remove(&v);
    }

    // Option B: v retracts onto some other vertex w, whether w is already
    // fixed or not reached yet — pinning w as a fixed point in the latter
    // case, for the duration of this branch.
    for &w in order {
        if w == v {
            continue;
        }
        if let Some(&rw) = assignment.get(&w)
            && rw != w
        {
            continue; // w itself retracts elsewhere; not a valid target.
        }

        if is_locally_consistent(graph, v, w, v_neighbors, assignment) {
            let pinned_now = !assignment.contains_key(&w);
            assignment.insert(v, w);
            if pinned_now {
                assignment.insert(w, w);
            }

            search(graph, order, neighbors, index + 1, assignment, results);

            assignment.remove(&v);
            if pinned_now {
                assignment.remove(&w);
            }
        }
    }
}

/// Checks the homomorphism constraint for `v ↦ target` against neighbors of
/// `v` that have already been assigned. This is a prune, not the full
/// check — [`is_valid_retraction`] re-verifies every edge once the whole
/// mapping is decided.
fn is_locally_consistent(
    graph: &UndirectedGraph,
    v: usize,
    target: usize,
    v_neighbors: &[usize],
    assignment: &std::collections::HashMap<usize, usize>,
) -> bool {
    for &u in v_neighbors {
        if let Some(&ru) = assignment.get(&u)
            && !graph.has_edge(target, ru)
        {
            return false;
        }
    }
    true
}

fn is_valid_retraction(graph: &UndirectedGraph, assignment: &std::collections::HashMap<usize, usize>) -> bool {
    for (u, v) in graph.edges() {
        let ru = assignment[&u];
        let rv = assignment[&v];
        if !graph.has_edge(ru, rv) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnected_self_loops_collapse_onto_either_vertex() {
        // Two vertices with only self-loops and no edge between them: nothing
        // distinguishes them, so each retracts onto the other.
        let mut graph = UndirectedGraph::new();
        graph.add_edge(0, 0);
        graph.add_edge(1, 1);

        let retractions = find_retractions(&graph);
        assert!(retractions.iter().any(|m| m.entries().collect::<Vec<_>>() == vec![(0, 1)]));
        assert!(retractions.iter().any(|m| m.entries().collect::<Vec<_>>() == vec![(1, 0)]));
    }

    #[test]
    fn test_reflexive_edge_retracts_onto_either_endpoint() {
        // Two self-looped vertices joined by an edge: each retracts onto the
        // other, since both are valid homomorphic images of the pair.
        let mut graph = UndirectedGraph::new();
        graph.add_edge(0, 0);
        graph.add_edge(1, 1);
        graph.add_edge(0, 1);

        let retractions = find_retractions(&graph);
        assert!(retractions.iter().any(|m| m.entries().collect::<Vec<_>>() == vec![(0, 1)]));
        assert!(retractions.iter().any(|m| m.entries().collect::<Vec<_>>() == vec![(1, 0)]));
    }

    #[test]
    fn test_random_small_graphs_only_yield_idempotent_homomorphic_retractions() {
        use epunfold_utilities::random_test;
        use rand::Rng;

        random_test(50, |rng| {
            let vertex_count = rng.random_range(1..=6);
            let mut graph = UndirectedGraph::new();
            for v in 0..vertex_count {
                graph.add_edge(v, v);
            }
            for u in 0..vertex_count {
                for v in (u + 1)..vertex_count {
                    if rng.random_bool(0.4) {
                        graph.add_edge(u, v);
                    }
                }
            }

            for mapping in find_retractions(&graph) {
                for v in 0..vertex_count {
                    let image = mapping.apply(v);
                    assert_eq!(mapping.apply(image), image, "retraction must be idempotent");
                }
                for (u, v) in graph.edges() {
                    assert!(
                        graph.has_edge(mapping.apply(u), mapping.apply(v)),
                        "retraction must be a graph homomorphism"
                    );
                }
            }
        });
    }

    #[test]
    fn test_max_degree_vertex_can_retract_onto_a_lower_degree_one() {
        // Reflexive path 0-1-2: vertex 1 has the highest degree (2) and is
        // processed first, but {1 -> 0, 2 -> 0} is still a valid retraction —
        // the search must not force the first-processed vertex to be fixed.
        let mut graph = UndirectedGraph::new();
        for v in 0..3 {
            graph.add_edge(v, v);
        }
        graph.add_edge(0, 1);
        graph.add_edge(1, 2);

        let retractions = find_retractions(&graph);
        let mut expected: Vec<(usize, usize)> = vec![(1, 0), (2, 0)];
        expected.sort_unstable();
        assert!(
            retractions.iter().any(|m| m.entries().collect::<Vec<_>>() == expected),
            "expected {{1 -> 0, 2 -> 0}} among {:?}",
            retractions
        );
    }

    #[test]
    fn test_triangle_retracts_down_to_a_single_vertex() {
        // A triangle with self-loops: every vertex has an identical neighborhood,
        // so the whole triangle collapses onto any single vertex.
        let mut graph = UndirectedGraph::new();
        for v in 0..3 {
            graph.add_edge(v, v);
        }
        graph.add_edge(0, 1);
        graph.add_edge(0, 2);
        graph.add_edge(1, 2);

        let retractions = find_retractions(&graph);
        assert!(!retractions.is_empty());
        assert!(retractions.iter().any(|m| m.len() == 2));
    }
}
