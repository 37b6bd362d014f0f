/// The size and granularity of the Field of View (FOV) in which images are
/// reconstructed, and the mask of voxels which are physically meaningful.

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FOV {
    pub half_width: [Length; 3],
    pub n: BoxDim_u,
    pub voxel_size: [Length; 3],
}

impl FOV {

    pub fn new(
        full_size: (Length, Length, Length),
        (nx, ny, nz): (usize, usize, usize)
    ) -> Self {
        let (dx, dy, dz) = full_size;
        let half_width = [dx / 2.0, dy / 2.0, dz / 2.0];
        let n = [nx, ny, nz];
        let voxel_size = Self::voxel_size(n, half_width);
        Self { half_width, n, voxel_size }
    }

    fn voxel_size(n: BoxDim_u, half_width: [Length; 3]) -> [Length; 3] {
        [0, 1, 2].map(|d| half_width[d] * 2.0 / n[d] as f32)
    }

    /// Total number of voxels
    pub fn n_voxels(&self) -> usize { self.n.iter().product() }

    /// Find centre of voxel with given 3D index
    pub fn voxel_centre(&self, i: Index3_u) -> [Length; 3] {
        [0, 1, 2].map(|d| (i[d] as f32 + 0.5) * self.voxel_size[d] - self.half_width[d])
    }

    /// Find centre of voxel with given 1D index
    pub fn voxel_centre1(&self, i: Index1_u) -> [Length; 3] {
        self.voxel_centre(index1_to_3(i, self.n))
    }

    /// Radius of the largest z-aligned cylinder which fits inside the FOV
    pub fn inscribed_radius(&self) -> Length {
        let [hx, hy, _] = self.half_width;
        if hx < hy { hx } else { hy }
    }

    /// Mark voxels whose centres lie within `radius` of the z-axis
    pub fn cylinder_mask(&self, radius: Length) -> FovMask {
        let r2 = mm_(radius).powi(2);
        let inside = (0..self.n_voxels())
            .map(|i| {
                let [x, y, _] = self.voxel_centre1(i);
                mm_(x).powi(2) + mm_(y).powi(2) <= r2
            })
            .collect();
        FovMask { fov: *self, inside }
    }
}

/// Boolean image marking the voxels within the physically valid
/// reconstruction volume.
#[derive(Clone, Debug, PartialEq)]
pub struct FovMask {
    pub fov: FOV,
    inside: Vec<bool>,
}

impl FovMask {

    pub fn new(fov: FOV, inside: Vec<bool>) -> Result<Self> {
        if inside.len() != fov.n_voxels() {
            return Err(Error::ShapeMismatch { what: "FOV mask", expected: fov.n_voxels(), found: inside.len() });
        }
        Ok(Self { fov, inside })
    }

    /// Mask which accepts every voxel in `fov`
    pub fn everything(fov: FOV) -> Self {
        Self { fov, inside: vec![true; fov.n_voxels()] }
    }

    #[inline]
    pub fn contains(&self, voxel: Index1_u) -> bool { self.inside[voxel] }

    pub fn as_slice(&self) -> &[bool] { &self.inside }

    pub fn count(&self) -> usize { self.inside.iter().filter(|&&b| b).count() }
}

// ----- Imports ------------------------------------------------------------------------------------------
use units::{Length, mm_};

use crate::{
    Error, Result,
    image::{BoxDim_u, Index1_u, Index3_u, index1_to_3},
};

#[cfg(test)]
mod test_fov {
    use super::*;
    use rstest::rstest;
    use units::mm;
    use float_eq::assert_float_eq;

    #[rstest]
    #[case([0,0,0], [-1.0, -1.0, -1.0])]
    #[case([0,0,1], [-1.0, -1.0,  1.0])]
    #[case([0,1,0], [-1.0,  1.0, -1.0])]
    #[case([1,0,1], [ 1.0, -1.0,  1.0])]
    #[case([1,1,1], [ 1.0,  1.0,  1.0])]
    fn voxel_centre(#[case] index: Index3_u, #[case] expected_position: [f32; 3]) {
        let fov = FOV::new((mm(4.0), mm(4.0), mm(4.0)), (2,2,2));
        let c = fov.voxel_centre(index).map(mm_);
        assert_float_eq!(c, expected_position, ulps <= [1, 1, 1]);
    }

    #[test]
    fn cylinder_mask_excludes_corners() {
        // 4x4 grid of 10 mm voxels: centres at +-5 and +-15 mm
        let fov = FOV::new((mm(40.0), mm(40.0), mm(10.0)), (4, 4, 1));
        let mask = fov.cylinder_mask(mm(20.0));
        // Corner centres are at sqrt(15^2 + 15^2) = 21.2 mm
        let corners = [0, 3, 12, 15];
        for voxel in 0..16 {
            assert_eq!(mask.contains(voxel), !corners.contains(&voxel), "voxel {voxel}");
        }
        assert_eq!(mask.count(), 12);
    }

    #[test]
    fn cylinder_mask_is_the_same_in_every_slice() {
        let fov = FOV::new((mm(60.0), mm(60.0), mm(30.0)), (6, 6, 3));
        let mask = fov.cylinder_mask(fov.inscribed_radius());
        let slices = mask.as_slice().chunks(36).collect::<Vec<_>>();
        assert_eq!(slices[0], slices[1]);
        assert_eq!(slices[1], slices[2]);
    }

    #[test]
    fn mask_with_wrong_size_is_rejected() {
        let fov = FOV::new((mm(4.0), mm(4.0), mm(4.0)), (2,2,2));
        assert!(matches!(
            FovMask::new(fov, vec![true; 7]),
            Err(Error::ShapeMismatch { expected: 8, found: 7, .. })
        ));
    }
}
