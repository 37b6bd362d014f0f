/// Quantities which are simply type aliases for `f32` rather than having an
/// implementation as a `uom` `Quantity`.
///
/// These flow through the hot elementwise loops of the reconstruction, where
/// the buffers are plain `f32` slices shared with the projectors. The aliases
/// still give some clues in the source as to what the numbers represent.

/// Voxel activity (reconstruction estimate, sensitivity, inverse sensitivity)
pub type Intensityf32 = f32;

/// Sinogram bin contents (measured counts, randoms, scatter, AN, projections)
pub type Countsf32    = f32;

/// System matrix element: intersection length of a LOR with a voxel, in mm
pub type Weightf32    = f32;
