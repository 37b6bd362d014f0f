//! Projection-domain data: gap-free 1-D arrays indexed by detector-pair bin.

/// Measured counts, attenuation, normalization, randoms, scatter or any
/// elementwise combination of them.
#[derive(Clone, Debug, PartialEq)]
pub struct Sinogram {
    data: Vec<Countsf32>,
}

impl Sinogram {

    pub fn new(data: Vec<Countsf32>) -> Self { Self { data } }

    pub fn filled(n_bins: usize, value: Countsf32) -> Self { Self::new(vec![value; n_bins]) }

    pub fn len(&self) -> usize { self.data.len() }

    pub fn is_empty(&self) -> bool { self.data.is_empty() }

    pub fn as_slice(&self) -> &[Countsf32] { &self.data }

    pub fn into_vec(self) -> Vec<Countsf32> { self.data }

    pub fn sum(&self) -> f64 { self.data.iter().map(|&x| x as f64).sum() }

    /// The values of the bins belonging to `subset`, in subset order
    pub fn restrict(&self, subset: &Subset) -> Vec<Countsf32> {
        subset.iter().map(|bin| self.data[bin]).collect()
    }

    /// Fail unless the sinogram has exactly `n_bins` bins
    pub fn expect_len(&self, what: &'static str, n_bins: usize) -> Result<()> {
        if self.len() != n_bins {
            return Err(Error::ShapeMismatch { what, expected: n_bins, found: self.len() });
        }
        Ok(())
    }

    pub fn from_raw_file(path: &Path) -> Result<Self> {
        Ok(Self::new(raw::read_vec(path)?))
    }

    pub fn write_to_raw_file(&self, path: &Path) -> Result<()> {
        raw::write(self.data.iter().copied(), path)?;
        Ok(())
    }
}

impl From<Vec<Countsf32>> for Sinogram {
    fn from(data: Vec<Countsf32>) -> Self { Self::new(data) }
}

impl core::ops::Index<usize> for Sinogram {
    type Output = Countsf32;
    #[inline]
    fn index(&self, bin: usize) -> &Self::Output { &self.data[bin] }
}

// ----- Imports ------------------------------------------------------------------------------------------
use std::path::Path;

use units::todo::Countsf32;

use crate::{
    Error, Result,
    io::raw,
    subsets::Subset,
};
