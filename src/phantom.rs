//! Synthetic acquisitions, so that reconstructions can be run and benchmarked
//! without a scanner.
//!
//! The object is a water cylinder filling the FOV mask, with uniform activity
//! apart from a hot rod (4x background) and a cold rod (no activity), placed
//! symmetrically about the axis at half the inscribed radius.
//!
//! The expected measurement in bin `i` is
//!
//!   `A_i N_i (X λ)_i + r_i + s_i`
//!
//! which is exactly the model whose maximum-likelihood solution OSEM
//! approaches.

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Params {
    /// Seed of the random number generator: equal seeds give equal data
    pub seed: u64,
    /// Expected counts per unit activity per mm of line of response
    pub scale: f32,
    /// Total randoms as a fraction of total trues
    pub randoms_fraction: f32,
    /// Total scatter as a fraction of total trues
    pub scatter_fraction: f32,
    /// Draw Poisson-distributed counts rather than using expected values
    pub noise: bool,
}

impl Default for Params {
    fn default() -> Self {
        Self { seed: 42, scale: 1.0, randoms_fraction: 0.1, scatter_fraction: 0.15, noise: true }
    }
}

/// Linear attenuation coefficient of water at 511 keV, per mm
pub const MU_WATER: f32 = 0.0096;

const HOT: Intensityf32 = 4.0;
const COLD: Intensityf32 = 0.0;

pub struct Phantom {
    /// True activity distribution
    pub activity: Image,
    /// Simulated acquisition of `activity`
    pub raw: RawData,
}

pub fn activity(mask: &FovMask) -> Image {
    let fov = mask.fov;
    let r = mm_(fov.inscribed_radius());
    let rod_radius_squared = (r / 4.0).powi(2);
    let in_rod = |x: f32, y: f32, cx: f32| (x - cx).powi(2) + y.powi(2) <= rod_radius_squared;
    let data = (0..fov.n_voxels())
        .map(|voxel| {
            if !mask.contains(voxel) { return 0.0 }
            let [x, y, _] = fov.voxel_centre1(voxel).map(mm_);
            if      in_rod(x, y,  r / 2.0) { HOT  }
            else if in_rod(x, y, -r / 2.0) { COLD }
            else                           { 1.0  }
        })
        .collect();
    Image { fov, data }
}

/// Simulate the acquisition of [`activity`] with `projector`
pub fn simulate(projector: &dyn Projector, mask: &FovMask, params: &Params) -> Result<Phantom> {
    let fov = projector.fov();
    if fov.n != mask.fov.n {
        return Err(Error::ShapeMismatch {
            what: "FOV mask voxels", expected: fov.n_voxels(), found: mask.fov.n_voxels()
        });
    }
    let n_bins = projector.n_bins();
    let all = Subset::full(n_bins);
    let mut rng = StdRng::seed_from_u64(params.seed);

    let activity = activity(mask);
    let mut projected = vec![0.0; n_bins];
    projector.forward_project(&activity.data, &all, &mut projected);

    // Attenuation: A = exp(-∫μ)
    let mu = mask.as_slice().iter().map(|&inside| if inside { MU_WATER } else { 0.0 }).collect::<Vec<_>>();
    let mut attenuation = vec![0.0; n_bins];
    projector.forward_project(&mu, &all, &mut attenuation);
    attenuation.iter_mut().for_each(|a| *a = (-*a).exp());

    let efficiency = Uniform::new_inclusive(0.8_f32, 1.2);
    let normalization = (0..n_bins).map(|_| efficiency.sample(&mut rng)).collect::<Vec<_>>();

    let trues = izip!(&projected, &attenuation, &normalization)
        .map(|(p, a, n)| params.scale * a * n * p)
        .collect::<Vec<_>>();
    let mean_trues = trues.iter().map(|&t| t as f64).sum::<f64>() / n_bins.max(1) as f64;
    let mean_attenuation = attenuation.iter().map(|&a| a as f64).sum::<f64>() / n_bins.max(1) as f64;

    // Flat randoms; scatter follows the attenuation of the object
    let randoms = vec![(params.randoms_fraction as f64 * mean_trues) as f32; n_bins];
    let scatter = attenuation.iter()
        .map(|&a| (params.scatter_fraction as f64 * mean_trues * a as f64 / mean_attenuation) as f32)
        .collect::<Vec<_>>();

    let mut measured = izip!(&trues, &randoms, &scatter).map(|(t, r, s)| t + r + s).collect::<Vec<_>>();
    if params.noise {
        for m in &mut measured { *m = poisson(*m, &mut rng); }
    }

    let raw = RawData {
        measured     : Sinogram::new(measured),
        attenuation  : Sinogram::new(attenuation),
        normalization: Sinogram::new(normalization),
        randoms      : Sinogram::new(randoms),
        scatter      : Sinogram::new(scatter),
    };
    let total = raw.measured.sum();
    info!("simulated {} bins, {} counts", group_digits(n_bins), group_digits(total.round() as u64));
    info!("Randoms: {:.3}%", raw.randoms.sum() / total * 100.0);
    info!("Scatter: {:.3}%", raw.scatter.sum() / total * 100.0);
    Ok(Phantom { activity, raw })
}

fn poisson(mean: f32, rng: &mut StdRng) -> f32 {
    // Poisson requires a strictly positive, finite mean
    match Poisson::new(mean) {
        Ok(distribution) => distribution.sample(rng),
        Err(_)           => 0.0,
    }
}

// ----- Imports ------------------------------------------------------------------------------------------
use itertools::izip;
use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Poisson, Uniform};
use serde::Deserialize;
use tracing::info;

use units::{mm_, todo::Intensityf32};

use crate::{
    Error, Result,
    fov::FovMask,
    image::Image,
    precompute::RawData,
    projector::Projector,
    sinogram::Sinogram,
    subsets::Subset,
    utils::group_digits,
};

#[cfg(test)]
mod test {
    use super::*;
    use crate::{fov::FOV, projector::ParallelBeam};
    use units::mm;
    use float_eq::assert_float_eq;

    fn setup() -> (crate::projector::SystemMatrix, FovMask) {
        let fov = FOV::new((mm(80.0), mm(80.0), mm(20.0)), (8, 8, 2));
        let matrix = ParallelBeam::covering(&fov, 8).system_matrix(fov).unwrap();
        (matrix, fov.cylinder_mask(fov.inscribed_radius()))
    }

    #[test]
    fn activity_has_background_hot_and_cold_regions() {
        let (_, mask) = setup();
        let image = activity(&mask);
        let mut values = image.data.clone();
        values.sort_by(f32::total_cmp);
        values.dedup();
        assert_eq!(values, vec![0.0, 1.0, HOT]);
        // Nothing outside the mask
        for (voxel, &a) in image.data.iter().enumerate() {
            if !mask.contains(voxel) { assert_eq!(a, 0.0) }
        }
    }

    #[test]
    fn same_seed_same_data() -> Result<()> {
        let (matrix, mask) = setup();
        let params = Params::default();
        let a = simulate(&matrix, &mask, &params)?;
        let b = simulate(&matrix, &mask, &params)?;
        assert_eq!(a.raw.measured, b.raw.measured);
        let c = simulate(&matrix, &mask, &Params { seed: params.seed + 1, ..params })?;
        assert_ne!(a.raw.measured, c.raw.measured);
        Ok(())
    }

    #[test]
    fn noiseless_data_follow_the_forward_model() -> Result<()> {
        let (matrix, mask) = setup();
        let params = Params { noise: false, ..Params::default() };
        let Phantom { raw, .. } = simulate(&matrix, &mask, &params)?;
        let total = raw.measured.sum();
        assert_float_eq!(raw.randoms.sum() / total, 0.1 / 1.25, rmax <= 1e-4);
        assert_float_eq!(raw.scatter.sum() / total, 0.15 / 1.25, rmax <= 1e-4);
        assert!(raw.attenuation.as_slice().iter().all(|&a| a > 0.0 && a <= 1.0));
        assert!(raw.normalization.as_slice().iter().all(|&n| (0.8..=1.2).contains(&n)));
        Ok(())
    }

    #[test]
    fn counts_are_whole_numbers_with_noise() -> Result<()> {
        let (matrix, mask) = setup();
        let Phantom { raw, .. } = simulate(&matrix, &mask, &Params::default())?;
        assert!(raw.measured.as_slice().iter().all(|&m| m >= 0.0 && m.fract() == 0.0));
        Ok(())
    }
}
