//! Sparse system matrix in compressed-row form: one row per sinogram bin,
//! holding the voxels coupled to that bin and their weights.

/// Voxel index and weight of one non-zero system matrix element
pub type SystemMatrixElement = (u32, Weightf32);

/// The non-zero elements of a single row, used while building a matrix.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SystemMatrixRow(pub Vec<SystemMatrixElement>);

impl SystemMatrixRow {
    pub fn iter(&self) -> std::slice::Iter<SystemMatrixElement> { self.0.iter() }
    pub fn clear(&mut self) { self.0.clear(); }
}

impl<'a> IntoIterator for &'a SystemMatrixRow {
    type Item = SystemMatrixElement;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, Self::Item>>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter().copied()
    }
}

pub struct SystemMatrix {
    fov: FOV,
    /// `elements[row_start[bin]..row_start[bin + 1]]` is the row of `bin`
    row_start: Vec<usize>,
    elements: Vec<SystemMatrixElement>,
}

impl SystemMatrix {

    pub fn from_rows(fov: FOV, rows: impl IntoIterator<Item = SystemMatrixRow>) -> Result<Self> {
        let n_voxels = fov.n_voxels();
        let mut row_start = vec![0];
        let mut elements = vec![];
        for row in rows {
            for (voxel, weight) in &row {
                if voxel as usize >= n_voxels {
                    return Err(Error::ShapeMismatch {
                        what: "system matrix voxel index", expected: n_voxels, found: voxel as usize + 1
                    });
                }
                elements.push((voxel, weight));
            }
            row_start.push(elements.len());
        }
        Ok(Self { fov, row_start, elements })
    }

    #[inline]
    pub fn row(&self, bin: usize) -> &[SystemMatrixElement] {
        &self.elements[self.row_start[bin]..self.row_start[bin + 1]]
    }

    /// Number of non-zero elements
    pub fn n_elements(&self) -> usize { self.elements.len() }
}

impl Projector for SystemMatrix {

    fn fov(&self) -> FOV { self.fov }

    fn n_bins(&self) -> usize { self.row_start.len() - 1 }

    fn forward_project(&self, image: &[Intensityf32], subset: &Subset, sinogram: &mut [Countsf32]) {
        assert_eq!(image.len(), self.fov.n_voxels(), "image does not match projector FOV");
        assert_eq!(sinogram.len(), subset.len(), "sinogram does not match subset");
        sinogram
            .par_iter_mut()
            .zip(subset.as_slice().par_iter())
            .for_each(|(value, &bin)| *value = forward_project(self.row(bin as usize), image));
    }

    fn back_project(&self, sinogram: &[Countsf32], subset: &Subset, image: &mut [Intensityf32]) {
        assert_eq!(image.len(), self.fov.n_voxels(), "image does not match projector FOV");
        assert_eq!(sinogram.len(), subset.len(), "sinogram does not match subset");

        // Rayon is too eager in spawning small jobs, each of which requires the
        // construction and subsequent combination of expensive accumulators
        // (whole images). So here we try to limit it to one job per thread.
        let job_size = subset.len().div_ceil(rayon::current_num_threads()).max(1);

        // Chunk boundaries depend only on the subset size and thread count, and
        // partial images are combined in chunk order, so the rounding is the
        // same on every call.
        let partial_backprojections = subset.as_slice()
            .par_chunks(job_size)
            .zip(sinogram.par_chunks(job_size))
            .map(|(bins, values)| {
                let mut backprojection = vec![0.0; image.len()];
                for (&bin, &value) in bins.iter().zip(values) {
                    back_project(&mut backprojection, self.row(bin as usize), value);
                }
                backprojection
            })
            .collect::<Vec<_>>();

        image.fill(0.0);
        for partial in &partial_backprojections {
            azip!((voxel in &mut *image, &p in partial.as_slice()) *voxel += p);
        }
    }
}

#[inline]
fn forward_project(row: &[SystemMatrixElement], image: &[Intensityf32]) -> Countsf32 {
    let mut projection = 0.0;
    for &(j, w) in row {
        projection += w * image[j as usize]
    }
    projection
}

#[inline]
fn back_project(backprojection: &mut [Intensityf32], row: &[SystemMatrixElement], value: Countsf32) {
    for &(j, w) in row {
        backprojection[j as usize] += w * value;
    }
}

// ----- Imports ------------------------------------------------------------------------------------------
use ndarray::azip;
use rayon::prelude::*;

use units::todo::{Countsf32, Intensityf32, Weightf32};

use crate::{
    Error, Result,
    fov::FOV,
    projector::Projector,
    subsets::Subset,
};

#[cfg(test)]
mod test {
    use super::*;
    use units::mm;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    // 2x2x1 image, 3 bins
    fn tiny() -> SystemMatrix {
        let fov = FOV::new((mm(2.0), mm(2.0), mm(1.0)), (2, 2, 1));
        let rows = vec![
            SystemMatrixRow(vec![(0, 1.0), (1, 1.0)]),
            SystemMatrixRow(vec![(2, 2.0)]),
            SystemMatrixRow(vec![(1, 0.5), (3, 0.5)]),
        ];
        SystemMatrix::from_rows(fov, rows).unwrap()
    }

    #[test]
    fn forward_projection_of_subset() {
        let m = tiny();
        let image = [1.0, 2.0, 3.0, 4.0];
        let mut sino = [f32::NAN; 2];
        m.forward_project(&image, &Subset::new(vec![2, 0]), &mut sino);
        assert_eq!(sino, [3.0, 3.0]);
    }

    #[test]
    fn back_projection_overwrites_stale_values() {
        let m = tiny();
        let mut image = [f32::NAN; 4];
        m.back_project(&[1.0, 10.0, 4.0], &Subset::full(3), &mut image);
        assert_eq!(image, [1.0, 3.0, 20.0, 2.0]);
    }

    #[test]
    fn back_projection_is_the_adjoint_of_forward_projection() {
        // <Ax, s> == <x, A^T s>
        let m = tiny();
        let subset = Subset::full(3);
        let x = [0.5, 1.5, 2.0, 3.0];
        let s = [2.0, 1.0, 4.0];
        let mut ax = [0.0; 3];
        let mut ats = [0.0; 4];
        m.forward_project(&x, &subset, &mut ax);
        m.back_project(&s, &subset, &mut ats);
        let lhs: f32 = ax.iter().zip(&s).map(|(a, b)| a * b).sum();
        let rhs: f32 = x.iter().zip(&ats).map(|(a, b)| a * b).sum();
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn out_of_range_voxel_is_rejected() {
        let fov = FOV::new((mm(2.0), mm(2.0), mm(1.0)), (2, 2, 1));
        let result = SystemMatrix::from_rows(fov, vec![SystemMatrixRow(vec![(4, 1.0)])]);
        assert!(matches!(result, Err(Error::ShapeMismatch { expected: 4, found: 5, .. })));
    }
}
