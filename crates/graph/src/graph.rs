#![forbid(unsafe_code)]

use ahash::AHashSet;

/// An undirected graph over a dense set of `usize` vertex labels, with
/// self-loops allowed. Edges are stored as an unordered set of
/// canonically-ordered pairs `(lo, hi)` with `lo <= hi`.
///
/// This is the small in-house graph kernel used by the retraction and
/// isomorphism finders, in place of a general-purpose graph library: every
/// epistemic model keeps one of these per player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndirectedGraph {
    nodes: AHashSet<usize>,
    edges: AHashSet<(usize, usize)>,
}

fn canonical(u: usize, v: usize) -> (usize, usize) {
    if u <= v { (u, v) } else { (v, u) }
}

impl UndirectedGraph {
    /// Returns an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures the vertex is present, without adding any edge.
    pub fn add_node(&mut self, v: usize) {
        self.nodes.insert(v);
    }

    /// Adds an edge between `u` and `v`, adding both as vertices if needed.
    /// `u == v` adds a self-loop.
    pub fn add_edge(&mut self, u: usize, v: usize) {
        self.nodes.insert(u);
        self.nodes.insert(v);
        self.edges.insert(canonical(u, v));
    }

    /// Returns whether the edge `(u, v)` is present (in either direction).
    pub fn has_edge(&self, u: usize, v: usize) -> bool {
        self.edges.contains(&canonical(u, v))
    }

    /// Returns the number of vertices.
    pub fn num_of_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Iterates over all vertices, in no particular order.
    pub fn nodes(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes.iter().copied()
    }

    /// Iterates over all edges as canonical `(lo, hi)` pairs, including
    /// self-loops.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.edges.iter().copied()
    }

    /// Returns the neighbors of `v`, excluding `v` itself even if it carries
    /// a self-loop.
    pub fn neighbors(&self, v: usize) -> Vec<usize> {
        let mut result: Vec<usize> = self
            .edges
            .iter()
            .filter_map(|&(a, b)| {
                if a == v && b != v {
                    Some(b)
                } else if b == v && a != v {
                    Some(a)
                } else {
                    None
                }
            })
            .collect();
        result.sort_unstable();
        result
    }

    /// Returns the number of distinct neighbors of `v` (self-loops not
    /// counted), used as the degree ordering for the retraction and
    /// isomorphism searches' symmetry breaks.
    pub fn degree(&self, v: usize) -> usize {
        self.neighbors(v).len()
    }

    /// Partitions the vertex set into maximal connected subsets. A vertex
    /// that only carries a self-loop forms a singleton component.
    pub fn connected_components(&self) -> Vec<Vec<usize>> {
        let mut uf = UnionFind::new(self.nodes.iter().copied());
        for &(u, v) in &self.edges {
            uf.union(u, v);
        }
        uf.components()
    }

    /// Returns the vertex-induced subgraph on `vertices`.
    pub fn subgraph(&self, vertices: &[usize]) -> UndirectedGraph {
        let keep: AHashSet<usize> = vertices.iter().copied().collect();
        let mut result = UndirectedGraph::new();
        for &v in vertices {
            result.add_node(v);
        }
        for &(u, v) in &self.edges {
            if keep.contains(&u) && keep.contains(&v) {
                result.add_edge(u, v);
            }
        }
        result
    }

    /// Renames every vertex `v` to `mapping(v)`, merging any edges that
    /// collide as a result.
    pub fn relabel(&self, mapping: impl Fn(usize) -> usize) -> UndirectedGraph {
        let mut result = UndirectedGraph::new();
        for v in self.nodes() {
            result.add_node(mapping(v));
        }
        for (u, v) in self.edges() {
            result.add_edge(mapping(u), mapping(v));
        }
        result
    }

    /// Bijectively renames the vertices to the dense range `0..n`, in
    /// ascending order of the original label. Returns the relabeled graph
    /// together with the inverse mapping (`old_label[new_index]`), mirroring
    /// `networkx.convert_node_labels_to_integers`.
    pub fn convert_labels_to_integers(&self) -> (UndirectedGraph, Vec<usize>) {
        let mut old_labels: Vec<usize> = self.nodes().collect();
        old_labels.sort_unstable();

        let new_index_of = |old: usize| old_labels.binary_search(&old).expect("vertex must be in the graph");

        let relabeled = self.relabel(new_index_of);
        (relabeled, old_labels)
    }
}

/// A union-find over an explicit, possibly sparse, set of elements.
struct UnionFind {
    parent: ahash::AHashMap<usize, usize>,
}

impl UnionFind {
    fn new(elements: impl Iterator<Item = usize>) -> Self {
        let parent = elements.map(|e| (e, e)).collect();
        Self { parent }
    }

    fn find(&mut self, x: usize) -> usize {
        let p = *self.parent.get(&x).expect("element must have been registered");
        if p == x {
            x
        } else {
            let root = self.find(p);
            self.parent.insert(x, root);
            root
        }
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent.insert(ra, rb);
        }
    }

    fn components(&mut self) -> Vec<Vec<usize>> {
        let elements: Vec<usize> = self.parent.keys().copied().collect();
        let mut by_root: ahash::AHashMap<usize, Vec<usize>> = ahash::AHashMap::default();
        for e in elements {
            let root = self.find(e);
            by_root.entry(root).or_default().push(e);
        }
        let mut components: Vec<Vec<usize>> = by_root.into_values().collect();
        for component in &mut components {
            component.sort_unstable();
        }
        components.sort_by_key(|c| c[0]);
        components
    }
}
