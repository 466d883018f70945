//! Row-major index iteration
//!
//! A [`LoopNest`] enumerates every index tuple of a shape, last axis fastest,
//! exactly like a stack of nested `for` loops. Iteration is lazy and can be
//! restarted any number of times.

use std::convert::Infallible;
use std::iter::FusedIterator;

use crate::shape::numel;

/// Nested loops over the dimensions of a shape
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoopNest {
    dims: Vec<usize>,
}

impl LoopNest {
    pub fn new(dims: impl Into<Vec<usize>>) -> Self {
        Self { dims: dims.into() }
    }

    /// Wrap `inner` in one more outer loop of `head` iterations
    pub fn from_dims(head: usize, inner: LoopNest) -> Self {
        let mut dims = Vec::with_capacity(inner.dims.len() + 1);
        dims.push(head);
        dims.extend(inner.dims);
        Self { dims }
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Number of index tuples produced
    ///
    /// Rank 0 produces one (empty) tuple; any zero dimension produces none.
    /// Counts past `usize::MAX` saturate.
    pub fn len(&self) -> usize {
        numel(&self.dims).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> Indices<'_> {
        Indices {
            dims: &self.dims,
            current: vec![0; self.dims.len()],
            remaining: self.len(),
        }
    }

    /// Fold `f` over every index, stopping at the first error
    ///
    /// The index slice is reused between calls, so nothing is allocated per
    /// element.
    pub fn try_fold<A, E, F>(&self, init: A, mut f: F) -> Result<A, E>
    where
        F: FnMut(A, &[usize]) -> Result<A, E>,
    {
        let mut indices = vec![0; self.dims.len()];
        let mut acc = init;

        for _ in 0..self.len() {
            acc = f(acc, &indices)?;
            advance(&mut indices, &self.dims);
        }
        Ok(acc)
    }

    /// Fold `f` over every index in iteration order
    pub fn reduce<A, F>(&self, init: A, mut f: F) -> A
    where
        F: FnMut(A, &[usize]) -> A,
    {
        match self.try_fold(init, |acc, index| Ok::<A, Infallible>(f(acc, index))) {
            Ok(acc) => acc,
            Err(never) => match never {},
        }
    }
}

/// Odometer step: bump the last axis, carrying into earlier ones
fn advance(indices: &mut [usize], dims: &[usize]) {
    for dim in (0..dims.len()).rev() {
        indices[dim] += 1;
        if indices[dim] < dims[dim] {
            return;
        }
        indices[dim] = 0;
    }
}

/// Iterator over the index tuples of a [`LoopNest`]
#[derive(Debug, Clone)]
pub struct Indices<'a> {
    dims: &'a [usize],
    current: Vec<usize>,
    remaining: usize,
}

impl Iterator for Indices<'_> {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let item = self.current.clone();
        self.remaining -= 1;
        advance(&mut self.current, self.dims);
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Indices<'_> {}

impl FusedIterator for Indices<'_> {}

impl<'a> IntoIterator for &'a LoopNest {
    type Item = Vec<usize>;
    type IntoIter = Indices<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_row_major_order() {
        let nest = LoopNest::new([2, 3]);
        let all: Vec<Vec<usize>> = nest.iter().collect();
        assert_eq!(
            all,
            vec![vec![0, 0], vec![0, 1], vec![0, 2], vec![1, 0], vec![1, 1], vec![1, 2]]
        );
    }

    #[test]
    fn test_rank_zero_yields_one_empty_index() {
        let nest = LoopNest::new(Vec::new());
        assert_eq!(nest.len(), 1);
        assert_eq!(nest.iter().collect::<Vec<_>>(), vec![Vec::<usize>::new()]);
    }

    #[test]
    fn test_zero_dim_yields_nothing() {
        let nest = LoopNest::new([3, 0, 2]);
        assert!(nest.is_empty());
        assert_eq!(nest.iter().count(), 0);
        assert_eq!(nest.reduce(0, |n, _| n + 1), 0);
    }

    #[test]
    fn test_restartable() {
        let nest = LoopNest::new([2, 2]);
        let first: Vec<_> = (&nest).into_iter().collect();
        let second: Vec<_> = nest.iter().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_reduce_visits_in_order() {
        let nest = LoopNest::new([2, 3]);
        let flat = nest.reduce(Vec::new(), |mut acc, index| {
            acc.push(index[0] * 3 + index[1]);
            acc
        });
        assert_eq!(flat, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_try_fold_stops_at_error() {
        let nest = LoopNest::new([4]);
        let result = nest.try_fold(0, |n, index| if index[0] == 2 { Err(n) } else { Ok(n + 1) });
        assert_eq!(result, Err(2));
    }

    #[test]
    fn test_from_dims_matches_flat_nest() {
        let nested = LoopNest::from_dims(2, LoopNest::from_dims(3, LoopNest::new([4])));
        assert_eq!(nested, LoopNest::new([2, 3, 4]));
        assert_eq!(nested.iter().count(), 24);
    }

    proptest! {
        #[test]
        fn prop_count_matches_product(dims in prop::collection::vec(0usize..5, 0..4)) {
            let nest = LoopNest::new(dims.clone());
            let expected: usize = dims.iter().product();
            prop_assert_eq!(nest.iter().len(), expected);
            prop_assert_eq!(nest.iter().count(), expected);

            // Strictly increasing in lexicographic order
            let all: Vec<_> = nest.iter().collect();
            for pair in all.windows(2) {
                prop_assert!(pair[0] < pair[1]);
            }
        }
    }
}
