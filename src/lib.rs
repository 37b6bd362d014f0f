//! Ordered-Subset Expectation-Maximization (OSEM) image reconstruction, with
//! two interchangeable execution paths for its arithmetic: one allocating on
//! every operation, one reusing buffers and deferring synchronization.

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub mod execution;
pub mod fov;
pub mod image;
pub mod io;
pub mod kernels;
pub mod osem;
pub mod phantom;
pub mod precompute;
pub mod projector;
pub mod sinogram;
pub mod subsets;
pub mod utils;

pub use execution::{BufferReuse, ExecutionPath, Immediate, PathKind};
pub use fov::{FOV, FovMask};
pub use image::Image;
pub use osem::{Osem, Reconstruction};
pub use precompute::{Precomputed, RawData};
pub use sinogram::Sinogram;
pub use subsets::{Subset, Subsets};
