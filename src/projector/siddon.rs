//! System matrix of a stack of parallel-beam planes, one plane per image
//! slice, computed by tracing each line of response through the voxel grid.
//!
//! Within a plane the algorithm is Siddon's: find the parameters at which the
//! line crosses every voxel boundary, sort them, and the gaps between
//! consecutive crossings are the lengths of the line inside successive voxels.
//!
//! Sinogram bins are laid out view-major:
//! `bin = (view * n_slices + slice) * radial_bins + radial`, so the bins of a
//! single view are contiguous (see [`ViewInterleaved`]).

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParallelBeam {
    /// Number of projection angles, uniformly distributed over `[0, π)`
    pub views: usize,
    /// Number of parallel lines per view and plane
    pub radial_bins: usize,
    /// Distance between neighbouring parallel lines
    pub bin_width: Length,
}

impl ParallelBeam {

    /// Lines spaced one voxel apart, covering the whole transaxial extent of
    /// `fov` at every angle
    pub fn covering(fov: &FOV, views: usize) -> Self {
        let [vx, vy, _] = fov.voxel_size;
        Self::with_bin_width(fov, views, if vx < vy { vx } else { vy })
    }

    /// As many lines `bin_width` apart as it takes to cover `fov` at every angle
    pub fn with_bin_width(fov: &FOV, views: usize, bin_width: Length) -> Self {
        let [hx, hy, _] = fov.half_width.map(mm_);
        let diameter = 2.0 * (hx * hx + hy * hy).sqrt();
        let mut radial_bins = (diameter / mm_(bin_width)).ceil() as usize;
        // With lines one voxel apart, matching parity puts the lines of the
        // axis-aligned views through voxel centres rather than along voxel
        // boundaries
        if radial_bins % 2 != fov.n[0] % 2 { radial_bins += 1 }
        Self { views, radial_bins, bin_width }
    }

    pub fn n_bins(&self, fov: &FOV) -> usize { self.views * fov.n[2] * self.radial_bins }

    /// Subset provider matching this geometry's bin layout
    pub fn subsets(&self, fov: &FOV) -> ViewInterleaved {
        ViewInterleaved { views: self.views, bins_per_view: fov.n[2] * self.radial_bins }
    }

    /// Angle and signed distance from the z-axis of the line of `(view, radial)`
    fn line(&self, view: usize, radial: usize) -> (Angle, Length) {
        let phi = turn(0.5) * (view as f32 / self.views as f32);
        let offset = self.bin_width * (radial as f32 - (self.radial_bins as f32 - 1.0) / 2.0);
        (phi, offset)
    }

    pub fn system_matrix(&self, fov: FOV) -> Result<SystemMatrix> {
        let [nx, ny, nz] = fov.n;
        let voxels_per_slice = nx * ny;
        // The in-plane rows are the same in every slice: trace them once
        let planar = (0..self.views * self.radial_bins)
            .into_par_iter()
            .map(|k| {
                let (phi, offset) = self.line(k / self.radial_bins, k % self.radial_bins);
                let mut row = SystemMatrixRow(Vec::with_capacity(nx + ny));
                trace_in_plane(&mut row, &fov, phi, offset);
                row
            })
            .collect::<Vec<_>>();
        let rows = iproduct!(0..self.views, 0..nz, 0..self.radial_bins)
            .map(|(view, slice, radial)| {
                let shift = (slice * voxels_per_slice) as u32;
                let planar = &planar[view * self.radial_bins + radial];
                SystemMatrixRow(planar.iter().map(|&(j, w)| (j + shift, w)).collect())
            });
        SystemMatrix::from_rows(fov, rows)
    }
}

/// Place the in-plane (`z` slice 0) voxels crossed by the line at angle `phi`
/// and distance `offset` from the axis, and the lengths of the crossings, in
/// `row`.
pub fn trace_in_plane(row: &mut SystemMatrixRow, fov: &FOV, phi: Angle, offset: Length) {
    row.clear();
    let phi = radian_(phi);
    let s = mm_(offset);
    // Point on the line closest to the axis, and unit direction along it
    let p0 = [s * phi.cos(), s * phi.sin()];
    let d  = [-phi.sin(), phi.cos()];
    let h  = [mm_(fov.half_width[0]), mm_(fov.half_width[1])];
    let v  = [mm_(fov.voxel_size[0]), mm_(fov.voxel_size[1])];
    let n  = [fov.n[0], fov.n[1]];

    // Parametric interval over which the line is inside the FOV
    let (mut t_in, mut t_out) = (f32::NEG_INFINITY, f32::INFINITY);
    for k in 0..2 {
        if d[k].abs() < PARALLEL {
            if p0[k].abs() >= h[k] { return }
        } else {
            let a = (-h[k] - p0[k]) / d[k];
            let b = ( h[k] - p0[k]) / d[k];
            t_in  = t_in .max(a.min(b));
            t_out = t_out.min(a.max(b));
        }
    }
    if t_out <= t_in { return }

    // Voxel boundary crossings inside the FOV
    let mut crossings = vec![t_in, t_out];
    for k in 0..2 {
        if d[k].abs() < PARALLEL { continue }
        for i in 1..n[k] {
            let t = (-h[k] + i as f32 * v[k] - p0[k]) / d[k];
            if t > t_in && t < t_out { crossings.push(t) }
        }
    }
    crossings.sort_by(f32::total_cmp);

    for pair in crossings.windows(2) {
        let length = pair[1] - pair[0];
        if length <= 0.0 { continue }
        let mid = (pair[0] + pair[1]) / 2.0;
        let index = |k: usize| {
            let i = ((p0[k] + mid * d[k] + h[k]) / v[k]).floor() as isize;
            i.clamp(0, n[k] as isize - 1) as usize
        };
        row.0.push(((index(0) + index(1) * n[0]) as u32, length));
    }
}

/// Direction components smaller than this are treated as exactly parallel to
/// the corresponding axis
const PARALLEL: f32 = 1e-6;

// ----- Imports ------------------------------------------------------------------------------------------
use itertools::iproduct;
use rayon::prelude::*;

use units::{Angle, Length, mm_, radian_, turn};

use crate::{
    Result,
    fov::FOV,
    projector::{SystemMatrix, SystemMatrixRow},
    subsets::ViewInterleaved,
};
