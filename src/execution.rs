//! Interchangeable implementations of the numeric operators used by the OSEM
//! engine.
//!
//! + [`Immediate`]: every operator allocates its result and is complete by the
//!   time it returns.
//!
//! + [`BufferReuse`]: operators write into caller-supplied output buffers held
//!   by an accelerator, and may return before the work has been done. The
//!   accelerator executes work strictly in submission order, so dependent
//!   operations see correct inputs without waiting; the host must call
//!   [`ExecutionPath::force_completion`] (or `download`, which does so) before
//!   looking at results.
//!
//! Both paths delegate the arithmetic to [`crate::kernels`], so their results
//! are bit-identical.

pub mod device;
pub mod immediate;
pub mod reuse;

pub use device::{Device, DeviceBuffer};
pub use immediate::Immediate;
pub use reuse::BufferReuse;

/// The operator vocabulary of the OSEM engine.
///
/// Every operator takes an optional `output` buffer. Paths which reuse storage
/// write the result into it (it may be one of the inputs) and return a handle
/// to it; paths which don't simply ignore it. Callers must therefore always
/// continue with the returned buffer.
pub trait ExecutionPath {

    type Buffer: Send;

    /// Short human-readable name, for reports
    fn name(&self) -> &'static str;

    /// Copy host data into a new buffer
    fn upload(&self, data: &[f32]) -> Result<Self::Buffer>;

    /// Copy buffer contents back to the host, after completing all
    /// outstanding work
    fn download(&self, buffer: &Self::Buffer) -> Result<Vec<f32>>;

    fn ones_like (&self, like: &Self::Buffer, output: Option<&Self::Buffer>) -> Result<Self::Buffer>;
    fn zeros_like(&self, like: &Self::Buffer, output: Option<&Self::Buffer>) -> Result<Self::Buffer>;

    fn add     (&self, a: &Self::Buffer, b: &Self::Buffer, output: Option<&Self::Buffer>) -> Result<Self::Buffer>;
    fn multiply(&self, a: &Self::Buffer, b: &Self::Buffer, output: Option<&Self::Buffer>) -> Result<Self::Buffer>;

    /// `a / b`, or `default` where `|b|` is below [`crate::kernels::NEAR_ZERO`]
    fn divide_with_default(
        &self,
        a: &Self::Buffer,
        b: &Self::Buffer,
        default: f32,
        output: Option<&Self::Buffer>
    ) -> Result<Self::Buffer>;

    /// Image to subset-restricted sinogram
    fn forward_project(
        &self,
        projector: &Arc<dyn Projector>,
        image: &Self::Buffer,
        subset: &Subset,
        output: Option<&Self::Buffer>,
    ) -> Result<Self::Buffer>;

    /// Subset-restricted sinogram to image
    fn back_project(
        &self,
        projector: &Arc<dyn Projector>,
        sinogram: &Self::Buffer,
        subset: &Subset,
        output: Option<&Self::Buffer>,
    ) -> Result<Self::Buffer>;

    /// Block until all submitted work has finished
    fn force_completion(&self) -> Result<()>;
}

/// Selects an execution path in configuration files and on the command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PathKind {
    Immediate,
    #[default]
    BufferReuse,
}

impl std::fmt::Display for PathKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathKind::Immediate   => write!(f, "immediate"),
            PathKind::BufferReuse => write!(f, "buffer-reuse"),
        }
    }
}

/// Fail unless two operands hold the same number of elements
pub(crate) fn check_same_len(what: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(Error::ShapeMismatch { what, expected, found });
    }
    Ok(())
}

// ----- Imports ------------------------------------------------------------------------------------------
use std::sync::Arc;

use clap::ValueEnum;
use serde::Deserialize;

use crate::{
    Error, Result,
    projector::Projector,
    subsets::Subset,
};
