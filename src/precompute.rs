//! Time-invariant inputs of the OSEM loop, computed once per reconstruction.

/// The five gap-free sinograms produced by data preparation.
#[derive(Clone, Debug)]
pub struct RawData {
    /// Measured prompts `m`
    pub measured: Sinogram,
    /// Attenuation factors `A`
    pub attenuation: Sinogram,
    /// Detector normalization `N`
    pub normalization: Sinogram,
    /// Randoms estimate `r`
    pub randoms: Sinogram,
    /// Scatter estimate `s`
    pub scatter: Sinogram,
}

impl RawData {

    pub fn n_bins(&self) -> usize { self.measured.len() }

    /// Read the five sinograms from raw `f32` files
    pub fn from_raw_files(
        measured: &Path,
        attenuation: &Path,
        normalization: &Path,
        randoms: &Path,
        scatter: &Path
    ) -> Result<Self> {
        Ok(Self {
            measured     : Sinogram::from_raw_file(measured)?,
            attenuation  : Sinogram::from_raw_file(attenuation)?,
            normalization: Sinogram::from_raw_file(normalization)?,
            randoms      : Sinogram::from_raw_file(randoms)?,
            scatter      : Sinogram::from_raw_file(scatter)?,
        })
    }

    /// Fail unless all five sinograms have `n_bins` bins
    fn check(&self, n_bins: usize) -> Result<()> {
        self.measured     .expect_len("measured sinogram"     , n_bins)?;
        self.attenuation  .expect_len("attenuation sinogram"  , n_bins)?;
        self.normalization.expect_len("normalization sinogram", n_bins)?;
        self.randoms      .expect_len("randoms sinogram"      , n_bins)?;
        self.scatter      .expect_len("scatter sinogram"      , n_bins)?;
        Ok(())
    }
}

/// Everything the OSEM loop reads but never modifies.
#[derive(Clone, Debug)]
pub struct Precomputed {
    pub subsets: Subsets,
    /// `A * N`
    pub an: Sinogram,
    /// Back projection of `AN` through each subset
    pub sensitivity: Vec<Image>,
    /// `1 / sensitivity` inside the FOV mask, 0 outside
    pub inverse_sensitivity: Vec<Image>,
    /// `m` restricted to each subset
    pub measured: Vec<Vec<Countsf32>>,
    /// `(r + s) / AN` restricted to each subset
    pub background: Vec<Vec<Countsf32>>,
    pub mask: FovMask,
}

impl Precomputed {

    pub fn new(raw: &RawData, mask: FovMask, subsets: Subsets, projector: &dyn Projector) -> Result<Self> {
        let n_bins = subsets.n_bins();
        raw.check(n_bins)?;
        check_same_len("projector sinogram bins", n_bins, projector.n_bins())?;
        let fov = projector.fov();
        if fov.n != mask.fov.n {
            return Err(Error::ShapeMismatch {
                what: "FOV mask voxels", expected: fov.n_voxels(), found: mask.fov.n_voxels()
            });
        }

        // AN = A * N
        let mut an = vec![0.0; n_bins];
        kernels::multiply(
            &mut an,
            Operand::Input(raw.attenuation.as_slice()),
            Operand::Input(raw.normalization.as_slice()),
        );
        let an = Sinogram::new(an);

        // (r + s) / AN
        let mut background = vec![0.0; n_bins];
        kernels::add(&mut background, Operand::Input(raw.randoms.as_slice()), Operand::Input(raw.scatter.as_slice()));
        kernels::divide_with_default(&mut background, Operand::Output, Operand::Input(an.as_slice()), 1.0);
        let background = Sinogram::new(background);

        let mut sensitivity         = Vec::with_capacity(subsets.len());
        let mut inverse_sensitivity = Vec::with_capacity(subsets.len());
        for (n, subset) in subsets.iter().enumerate() {
            let mut sen = Image::zeros(fov);
            projector.back_project(&an.restrict(subset), subset, &mut sen.data);
            let inv = invert_within_mask(n, &sen, &mask)?;
            debug!("subset {n:>3}: {:>9} bins, sensitivity {:.4e} .. {:.4e}",
                   group_digits(subset.len()), min(&sen.data), max(&sen.data));
            sensitivity.push(sen);
            inverse_sensitivity.push(inv);
        }

        let measured   = subsets.iter().map(|subset| raw.measured.restrict(subset)).collect();
        let background = subsets.iter().map(|subset|     background.restrict(subset)).collect();

        info!("precomputed {} subsets over {} bins and {} voxels ({} inside the mask)",
              subsets.len(), group_digits(n_bins), group_digits(fov.n_voxels()), group_digits(mask.count()));
        Ok(Self { subsets, an, sensitivity, inverse_sensitivity, measured, background, mask })
    }

    pub fn n_subsets(&self) -> usize { self.subsets.len() }

    pub fn fov(&self) -> FOV { self.mask.fov }
}

/// `1 / sensitivity` inside `mask`, exactly 0 outside.
///
/// Sensitivity inside the mask is a sum of positive projector weights, so a
/// value which is not strictly positive there means the geometry upstream is
/// broken.
fn invert_within_mask(subset: usize, sensitivity: &Image, mask: &FovMask) -> Result<Image> {
    if let Some((voxel, &value)) = sensitivity.data
        .iter()
        .enumerate()
        .find(|&(voxel, &value)| mask.contains(voxel) && value.partial_cmp(&0.0) != Some(Ordering::Greater))
    {
        return Err(Error::NonPositiveSensitivity { subset, voxel, value });
    }
    let mut inverse = Image::zeros(sensitivity.fov);
    azip!((inv in &mut inverse.data, &sen in &sensitivity.data, &inside in mask.as_slice()) {
        *inv = if inside { 1.0 / sen } else { 0.0 }
    });
    Ok(inverse)
}

fn min(data: &[f32]) -> f32 { data.iter().copied().fold(f32::INFINITY    , f32::min) }
fn max(data: &[f32]) -> f32 { data.iter().copied().fold(f32::NEG_INFINITY, f32::max) }

// ----- Imports ------------------------------------------------------------------------------------------
use std::cmp::Ordering;
use std::path::Path;

use ndarray::azip;
use tracing::{debug, info};

use units::todo::Countsf32;

use crate::{
    Error, Result,
    execution::check_same_len,
    fov::{FOV, FovMask},
    image::Image,
    kernels::{self, Operand},
    projector::Projector,
    sinogram::Sinogram,
    subsets::Subsets,
    utils::group_digits,
};

#[cfg(test)]
mod test {
    use super::*;
    use crate::projector::{SystemMatrix, SystemMatrixRow};
    use units::mm;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    // 2 voxels, 4 bins: bins 0 and 2 see voxel 0, bins 1 and 3 see voxel 1
    fn projector() -> SystemMatrix {
        let fov = FOV::new((mm(2.0), mm(1.0), mm(1.0)), (2, 1, 1));
        let rows = [0, 1, 0, 1].map(|voxel| SystemMatrixRow(vec![(voxel, 1.0)]));
        SystemMatrix::from_rows(fov, rows).unwrap()
    }

    fn raw(n: usize) -> RawData {
        RawData {
            measured     : Sinogram::new((0..n).map(|i| i as f32).collect()),
            attenuation  : Sinogram::new(vec![0.5; n]),
            normalization: Sinogram::new(vec![4.0; n]),
            randoms      : Sinogram::new(vec![1.0; n]),
            scatter      : Sinogram::new(vec![3.0; n]),
        }
    }

    fn subsets() -> Subsets { Subsets::new(4, vec![vec![0, 1], vec![3, 2]]).unwrap() }

    #[test]
    fn quantities_are_restricted_to_each_subset() -> Result<()> {
        let p = projector();
        let pre = Precomputed::new(&raw(4), FovMask::everything(p.fov()), subsets(), &p)?;
        assert_eq!(pre.an.as_slice(), &[2.0; 4]);
        assert_eq!(pre.measured, vec![vec![0.0, 1.0], vec![3.0, 2.0]]);
        assert_eq!(pre.background, vec![vec![2.0, 2.0], vec![2.0, 2.0]]);
        assert_eq!(pre.sensitivity[0].data, vec![2.0, 2.0]);
        assert_eq!(pre.inverse_sensitivity[1].data, vec![0.5, 0.5]);
        Ok(())
    }

    #[test]
    fn inverse_sensitivity_vanishes_outside_the_mask() -> Result<()> {
        let p = projector();
        let mask = FovMask::new(p.fov(), vec![true, false])?;
        let pre = Precomputed::new(&raw(4), mask, subsets(), &p)?;
        for inv in &pre.inverse_sensitivity {
            assert_eq!(inv.data[1], 0.0);
            assert_eq!(inv.data[0], 0.5);
        }
        Ok(())
    }

    #[test]
    fn zero_attenuation_and_normalization_give_default_background() -> Result<()> {
        let p = projector();
        let mut data = raw(4);
        data.normalization = Sinogram::new(vec![4.0, 4.0, 0.0, 4.0]);
        // Bin 2 is voxel 0's only view in subset 1, so keep voxel 0 out of the mask
        let mask = FovMask::new(p.fov(), vec![false, true])?;
        let pre = Precomputed::new(&data, mask, subsets(), &p)?;
        assert_eq!(pre.background[1], vec![2.0, 1.0]);
        assert!(pre.background.iter().flatten().all(|x| x.is_finite()));
        Ok(())
    }

    #[test]
    fn blind_voxel_inside_the_mask_is_an_error() {
        let p = projector();
        let mut data = raw(4);
        // Subset 1 = bins {3, 2}; bin 2 is voxel 0's only view in that subset
        data.attenuation = Sinogram::new(vec![0.5, 0.5, 0.0, 0.5]);
        let result = Precomputed::new(&data, FovMask::everything(p.fov()), subsets(), &p);
        assert!(matches!(result, Err(Error::NonPositiveSensitivity { subset: 1, voxel: 0, .. })));
    }

    #[test]
    fn blind_voxel_outside_the_mask_is_fine() -> Result<()> {
        let p = projector();
        let mut data = raw(4);
        data.attenuation = Sinogram::new(vec![0.5, 0.5, 0.0, 0.5]);
        let mask = FovMask::new(p.fov(), vec![false, true])?;
        let pre = Precomputed::new(&data, mask, subsets(), &p)?;
        assert_eq!(pre.inverse_sensitivity[1].data, vec![0.0, 0.5]);
        Ok(())
    }

    #[test]
    fn sinogram_lengths_are_checked() {
        let p = projector();
        let mut data = raw(4);
        data.scatter = Sinogram::new(vec![0.0; 3]);
        let result = Precomputed::new(&data, FovMask::everything(p.fov()), subsets(), &p);
        assert!(matches!(result, Err(Error::ShapeMismatch { expected: 4, found: 3, .. })));
    }
}
