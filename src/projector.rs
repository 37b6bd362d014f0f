//! Forward (image -> sinogram) and back (sinogram -> image) projection.
//!
//! The OSEM engine only ever sees the [`Projector`] trait. Both operations are
//! restricted to the bins of one subset: the sinogram slices passed in and out
//! hold one value per subset bin, in subset order.
//!
//! Two implementations are provided:
//!
//! + [`SystemMatrix`]: a sparse, precomputed system matrix
//!
//! + [`siddon::ParallelBeam`], which is not itself a projector but generates a
//!   `SystemMatrix` for a stack of parallel-beam planes, by tracing each line
//!   through the voxel grid.

pub mod matrix;
pub mod siddon;

pub use matrix::{SystemMatrix, SystemMatrixElement, SystemMatrixRow};
pub use siddon::ParallelBeam;

/// Linear projection operators with non-negative weights.
///
/// Implementations must overwrite every element of their output: the
/// buffer-reusing execution path hands them buffers holding stale values from
/// previous subsets.
pub trait Projector: Send + Sync {

    /// Image geometry expected and produced by this projector
    fn fov(&self) -> FOV;

    /// Number of bins in the full sinogram
    fn n_bins(&self) -> usize;

    /// Project `image` into the bins of `subset`, writing one value per subset
    /// bin into `sinogram`
    fn forward_project(&self, image: &[Intensityf32], subset: &Subset, sinogram: &mut [Countsf32]);

    /// Project the subset-restricted `sinogram` back into `image`
    fn back_project(&self, sinogram: &[Countsf32], subset: &Subset, image: &mut [Intensityf32]);
}

// ----- Imports ------------------------------------------------------------------------------------------
use units::todo::{Countsf32, Intensityf32};

use crate::{fov::FOV, subsets::Subset};
