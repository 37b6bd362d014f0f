//! On-disk formats: raw little-endian `f32` arrays for sinograms and images.
pub mod raw;
