//! Union-find (disjoint set union) with component sizes.
//!
//! Each trial joins positions of an implicit random permutation and needs the
//! size of the component that just grew, so this structure tracks sizes
//! rather than ranks and merges by size.

use std::num::NonZeroUsize;

use crate::error::UnionFindError;

/// Union-find over `0..n` supporting path compression and union by size.
///
/// `component_size(i)` always equals the exact number of elements sharing a
/// representative with `i`.
///
/// # Examples
/// ```
/// use prisoners_core::DisjointSet;
///
/// let mut set = DisjointSet::new(4).expect("four elements are valid");
/// assert_eq!(set.union(0, 1), 2);
/// assert_eq!(set.union(2, 1), 3);
/// assert_eq!(set.component_size(3), 1);
/// assert_eq!(set.find(0), set.find(2));
/// ```
#[derive(Clone, Debug)]
pub struct DisjointSet {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSet {
    /// Creates `elements` singleton components.
    ///
    /// # Errors
    /// Returns [`UnionFindError::Empty`] when `elements` is zero.
    pub fn new(elements: usize) -> Result<Self, UnionFindError> {
        let elements = NonZeroUsize::new(elements).ok_or(UnionFindError::Empty)?;
        Ok(Self::with_elements(elements))
    }

    /// Creates singleton components for a count already known to be non-zero.
    #[must_use]
    pub fn with_elements(elements: NonZeroUsize) -> Self {
        let elements = elements.get();
        Self {
            parent: (0..elements).collect(),
            size: vec![1; elements],
        }
    }

    /// Resets the structure to `elements` singleton components, discarding all
    /// previous unions.
    ///
    /// # Errors
    /// Returns [`UnionFindError::Empty`] when `elements` is zero; the existing
    /// state is left untouched in that case.
    pub fn init(&mut self, elements: usize) -> Result<(), UnionFindError> {
        if elements == 0 {
            return Err(UnionFindError::Empty);
        }
        self.parent.clear();
        self.parent.extend(0..elements);
        self.size.clear();
        self.size.resize(elements, 1);
        Ok(())
    }

    /// Number of elements tracked by the structure.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.parent.len()
    }

    /// Returns the representative of `node`, compressing the path behind it.
    pub fn find(&mut self, mut node: usize) -> usize {
        let mut root = node;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        while self.parent[node] != node {
            let parent = self.parent[node];
            self.parent[node] = root;
            node = parent;
        }

        root
    }

    /// Merges the components of `left` and `right` and returns the size of
    /// the merged component.
    ///
    /// The smaller root is attached beneath the larger one; ties keep the
    /// root of `left`. Joining two members of the same component changes
    /// nothing and returns its current size.
    pub fn union(&mut self, left: usize, right: usize) -> usize {
        let mut survivor = self.find(left);
        let mut absorbed = self.find(right);
        if survivor == absorbed {
            return self.size[survivor];
        }
        if self.size[survivor] < self.size[absorbed] {
            std::mem::swap(&mut survivor, &mut absorbed);
        }
        self.parent[absorbed] = survivor;
        self.size[survivor] += self.size[absorbed];
        self.size[survivor]
    }

    /// Size of the component containing `node`.
    pub fn component_size(&mut self, node: usize) -> usize {
        let root = self.find(node);
        self.size[root]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use rstest::rstest;

    fn brute_force_sizes(set: &mut DisjointSet) -> Vec<usize> {
        let roots: Vec<usize> = (0..set.element_count()).map(|i| set.find(i)).collect();
        roots
            .iter()
            .map(|root| roots.iter().filter(|other| *other == root).count())
            .collect()
    }

    #[rstest]
    fn new_rejects_zero_elements() {
        let err = DisjointSet::new(0).expect_err("zero elements must be rejected");
        assert_eq!(err, UnionFindError::Empty);
    }

    #[rstest]
    #[case(1)]
    #[case(7)]
    fn new_starts_with_singletons(#[case] elements: usize) {
        let mut set = DisjointSet::new(elements).expect("non-zero elements are valid");
        for node in 0..elements {
            assert_eq!(set.find(node), node);
            assert_eq!(set.component_size(node), 1);
        }
    }

    #[rstest]
    fn union_attaches_smaller_component_under_larger() {
        let mut set = DisjointSet::new(5).expect("valid size");
        set.union(0, 1);
        set.union(0, 2);
        let big_root = set.find(0);
        assert_eq!(set.union(3, 0), 4);
        assert_eq!(set.find(3), big_root);
    }

    #[rstest]
    fn union_within_component_is_a_no_op() {
        let mut set = DisjointSet::new(3).expect("valid size");
        assert_eq!(set.union(0, 1), 2);
        let root = set.find(1);
        assert_eq!(set.union(1, 0), 2);
        assert_eq!(set.union(0, 0), 2);
        assert_eq!(set.find(0), root);
        assert_eq!(set.component_size(2), 1);
    }

    #[rstest]
    fn init_discards_previous_unions() {
        let mut set = DisjointSet::new(4).expect("valid size");
        set.union(0, 1);
        set.union(2, 3);
        set.init(6).expect("non-zero reset is valid");
        assert_eq!(set.element_count(), 6);
        assert_eq!(brute_force_sizes(&mut set), vec![1; 6]);
    }

    #[rstest]
    fn init_rejects_zero_and_keeps_state() {
        let mut set = DisjointSet::new(2).expect("valid size");
        set.union(0, 1);
        assert_eq!(set.init(0), Err(UnionFindError::Empty));
        assert_eq!(set.component_size(0), 2);
    }

    fn unions_strategy() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
        (1_usize..64).prop_flat_map(|elements| {
            let pair = (0..elements, 0..elements);
            (Just(elements), proptest::collection::vec(pair, 0..128))
        })
    }

    proptest! {
        #[test]
        fn sizes_match_brute_force_after_every_union((elements, unions) in unions_strategy()) {
            let mut set = DisjointSet::new(elements).expect("strategy yields non-zero sizes");
            for (left, right) in unions {
                let merged = set.union(left, right);
                prop_assert_eq!(merged, set.component_size(left));
                let expected = brute_force_sizes(&mut set);
                for (node, &cardinality) in expected.iter().enumerate() {
                    prop_assert_eq!(set.component_size(node), cardinality);
                }
            }
        }

        #[test]
        fn find_is_idempotent((elements, unions) in unions_strategy()) {
            let mut set = DisjointSet::new(elements).expect("strategy yields non-zero sizes");
            for (left, right) in unions {
                set.union(left, right);
            }
            for node in 0..elements {
                let root = set.find(node);
                prop_assert_eq!(set.find(root), root);
            }
        }
    }
}
