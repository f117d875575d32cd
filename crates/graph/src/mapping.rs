#![forbid(unsafe_code)]

/// A partial vertex-to-vertex map, trimmed of identity entries and stored as
/// a sorted `(from, to)` sequence so that two mappings can be compared and
/// hashed by value rather than by object identity (see the "stable
/// representation" design note for `core()` and `is_isomorphic()`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Mapping(Vec<(usize, usize)>);

impl Mapping {
    /// Builds a mapping from an iterator of `(from, to)` pairs, dropping any
    /// pair where `from == to` and sorting the rest for a stable
    /// representation.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let mut entries: Vec<(usize, usize)> = pairs.into_iter().filter(|&(from, to)| from != to).collect();
        entries.sort_unstable();
        Mapping(entries)
    }

    /// The identity mapping (the empty trimmed mapping).
    pub fn identity() -> Self {
        Mapping(Vec::new())
    }

    /// Returns whether this is the identity mapping.
    pub fn is_identity(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of vertices this mapping actually moves.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the `(from, to)` entries in ascending order of `from`.
    pub fn entries(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.0.iter().copied()
    }

    /// Returns the image of `v` under the mapping (`v` itself if not moved).
    pub fn apply(&self, v: usize) -> usize {
        match self.0.binary_search_by_key(&v, |&(from, _)| from) {
            Ok(index) => self.0[index].1,
            Err(_) => v,
        }
    }
}

/// Returns the sublist of `mappings` whose entries all preserve `partition`:
/// a mapping `f` preserves `partition` iff `partition[x] == partition[f(x)]`
/// for every `x` in its domain.
pub fn partition_preserving<S: PartialEq>(mappings: Vec<Mapping>, partition: &[S]) -> Vec<Mapping> {
    mappings
        .into_iter()
        .filter(|mapping| mapping.entries().all(|(x, fx)| partition[x] == partition[fx]))
        .collect()
}

/// Returns the mappings common to both lists, by value equality. Used to
/// intersect per-player retraction/isomorphism sets in `core()` and
/// `is_isomorphic()`.
pub fn intersect_mappings(left: Vec<Mapping>, right: &[Mapping]) -> Vec<Mapping> {
    left.into_iter().filter(|mapping| right.contains(mapping)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pairs_drops_identity_entries_and_sorts() {
        let mapping = Mapping::from_pairs([(2, 2), (1, 0), (0, 1)]);
        assert_eq!(mapping.entries().collect::<Vec<_>>(), vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn test_partition_preserving_filters_out_distinguishing_maps() {
        let partition = vec![0, 0, 1];
        let preserved = Mapping::from_pairs([(0, 1)]);
        let violating = Mapping::from_pairs([(0, 2)]);

        let result = partition_preserving(vec![preserved.clone(), violating], &partition);
        assert_eq!(result, vec![preserved]);
    }

    #[test]
    fn test_intersect_mappings_is_value_equality_not_identity() {
        let a = Mapping::from_pairs([(0, 1)]);
        let b = Mapping::from_pairs([(0, 1)]);
        assert_eq!(intersect_mappings(vec![a], &[b]).len(), 1);
    }
}
