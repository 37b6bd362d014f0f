//! Partition of the sinogram bins into the ordered subsets of OSEM.
//!
//! Subset index sets come from a `SubsetIndexProvider`, are converted to
//! compact `u32` storage exactly once, and are validated to form a partition
//! of the full bin range: every bin in exactly one subset.

/// An ordered sequence of sinogram-bin indices.
///
/// Cheap to clone: the indices are shared, so that deferred projection jobs
/// can hold on to them while they wait in the accelerator queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subset {
    indices: Arc<[u32]>,
}

impl Subset {

    pub fn new(indices: Vec<u32>) -> Self { Self { indices: indices.into() } }

    /// A single subset covering bins `0..n_bins`, as used by plain MLEM
    pub fn full(n_bins: usize) -> Self {
        Self::new((0..n_bins as u32).collect())
    }

    pub fn len(&self) -> usize { self.indices.len() }

    pub fn is_empty(&self) -> bool { self.indices.is_empty() }

    pub fn as_slice(&self) -> &[u32] { &self.indices }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().map(|&bin| bin as usize)
    }
}

/// Source of subset index sets, typically derived from scanner geometry.
pub trait SubsetIndexProvider {

    /// Total number of bins in the (gap-free) sinogram
    fn n_bins(&self) -> usize;

    /// The bin indices belonging to subset `n` out of `n_subsets`
    fn subset(&self, n: usize, n_subsets: usize) -> Vec<usize>;
}

/// Assign all bins of view `v` to subset `v mod Sn`, so that every subset
/// samples the full angular range.
///
/// Assumes a view-major bin layout: the bins of one view are contiguous.
#[derive(Clone, Copy, Debug)]
pub struct ViewInterleaved {
    pub views: usize,
    pub bins_per_view: usize,
}

impl SubsetIndexProvider for ViewInterleaved {

    fn n_bins(&self) -> usize { self.views * self.bins_per_view }

    fn subset(&self, n: usize, n_subsets: usize) -> Vec<usize> {
        (n..self.views)
            .step_by(n_subsets.max(1))
            .flat_map(|view| {
                let first = view * self.bins_per_view;
                first..first + self.bins_per_view
            })
            .collect()
    }
}

/// A validated partition of `0..n_bins` into ordered subsets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subsets {
    n_bins: usize,
    subsets: Vec<Subset>,
}

impl Subsets {

    pub fn from_provider(provider: &impl SubsetIndexProvider, n_subsets: usize) -> Result<Self> {
        let index_sets = (0..n_subsets)
            .map(|n| provider.subset(n, n_subsets))
            .collect();
        Self::new(provider.n_bins(), index_sets)
    }

    /// Validate that `index_sets` partition `0..n_bins` and convert them to
    /// compact storage.
    pub fn new(n_bins: usize, index_sets: Vec<Vec<usize>>) -> Result<Self> {
        if index_sets.is_empty() { return Err(Error::NoSubsets) }
        // Bins are stored as u32
        if n_bins > u32::MAX as usize {
            return Err(Error::ShapeMismatch { what: "sinogram bins (u32 storage)", expected: u32::MAX as usize, found: n_bins });
        }
        // Which subset claimed each bin
        let mut owner: Vec<Option<usize>> = vec![None; n_bins];
        for (subset, bins) in index_sets.iter().enumerate() {
            if bins.is_empty() { return Err(Error::EmptySubset { subset }) }
            for &bin in bins {
                match owner.get(bin).copied() {
                    None              => return Err(Error::BinOutOfRange { subset, bin, n_bins }),
                    Some(Some(first)) => return Err(Error::OverlappingSubsets { bin, first, second: subset }),
                    Some(None)        => owner[bin] = Some(subset),
                }
            }
        }
        if let Some(bin) = owner.iter().position(Option::is_none) {
            return Err(Error::UncoveredBin { bin });
        }
        let subsets = index_sets
            .into_iter()
            .map(|bins| Subset::new(bins.into_iter().map(|bin| bin as u32).collect()))
            .collect();
        Ok(Self { n_bins, subsets })
    }

    /// Number of subsets, `Sn`
    pub fn len(&self) -> usize { self.subsets.len() }

    pub fn is_empty(&self) -> bool { self.subsets.is_empty() }

    pub fn n_bins(&self) -> usize { self.n_bins }

    pub fn iter(&self) -> std::slice::Iter<'_, Subset> { self.subsets.iter() }

    pub fn get(&self, n: usize) -> Option<&Subset> { self.subsets.get(n) }
}

impl core::ops::Index<usize> for Subsets {
    type Output = Subset;
    fn index(&self, n: usize) -> &Subset { &self.subsets[n] }
}

impl<'a> IntoIterator for &'a Subsets {
    type Item = &'a Subset;
    type IntoIter = std::slice::Iter<'a, Subset>;
    fn into_iter(self) -> Self::IntoIter { self.subsets.iter() }
}

// ----- Imports ------------------------------------------------------------------------------------------
use std::sync::Arc;

use crate::{Error, Result};

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    #[test]
    fn views_are_interleaved() -> Result<()> {
        let provider = ViewInterleaved { views: 5, bins_per_view: 2 };
        let subsets = Subsets::from_provider(&provider, 2)?;
        assert_eq!(subsets.len(), 2);
        assert_eq!(subsets[0].as_slice(), &[0, 1, 4, 5, 8, 9]);
        assert_eq!(subsets[1].as_slice(), &[2, 3, 6, 7]);
        Ok(())
    }

    #[rstest]
    #[case(vec![]                        , "NoSubsets")]
    #[case(vec![vec![0, 1], vec![]]      , "EmptySubset")]
    #[case(vec![vec![0, 1], vec![2, 4]]  , "BinOutOfRange")]
    #[case(vec![vec![0, 1], vec![1, 2]]  , "OverlappingSubsets")]
    #[case(vec![vec![0, 3], vec![1]]     , "UncoveredBin")]
    #[case(vec![vec![0, 0, 1, 2, 3]]     , "OverlappingSubsets")]
    fn partition_violations_are_rejected(#[case] sets: Vec<Vec<usize>>, #[case] expected: &str) {
        let err = Subsets::new(4, sets).unwrap_err();
        assert!(format!("{err:?}").starts_with(expected), "{err:?}");
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn bins_beyond_u32_storage_are_a_shape_error() {
        let n_bins = u32::MAX as usize + 1;
        assert!(matches!(
            Subsets::new(n_bins, vec![vec![0]]),
            Err(Error::ShapeMismatch { what: "sinogram bins (u32 storage)", found, .. }) if found == n_bins
        ));
    }

    #[test]
    fn too_many_subsets_leave_one_empty() {
        let provider = ViewInterleaved { views: 3, bins_per_view: 4 };
        assert!(matches!(Subsets::from_provider(&provider, 4), Err(Error::EmptySubset { subset: 3 })));
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn interleaved_subsets_partition_the_bins(
            views         in 1..60_usize,
            bins_per_view in 1..20_usize,
            n_subsets     in 1..15_usize,
        ) {
            prop_assume!(n_subsets <= views);
            let provider = ViewInterleaved { views, bins_per_view };
            let subsets = Subsets::from_provider(&provider, n_subsets).unwrap();
            let mut all = subsets.iter().flat_map(Subset::iter).collect::<Vec<_>>();
            all.sort_unstable();
            prop_assert_eq!(all, (0..views * bins_per_view).collect::<Vec<_>>());
            // Roughly total / Sn bins each
            let largest  = subsets.iter().map(Subset::len).max().unwrap();
            let smallest = subsets.iter().map(Subset::len).min().unwrap();
            prop_assert!(largest - smallest <= bins_per_view);
        }
    }
}
