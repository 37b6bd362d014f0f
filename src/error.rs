//! Failures of the reconstruction pipeline.
//!
//! Every variant is fatal: OSEM is deterministic given its inputs, so nothing
//! here is worth retrying. Near-zero denominators are *not* errors; they are
//! absorbed by `kernels::divide_with_default`.

#[derive(Debug, thiserror::Error)]
pub enum Error {

    // ----- Subset partition violations ------------------------------------------------
    #[error("at least one subset is required")]
    NoSubsets,

    #[error("subset {subset} contains no sinogram bins")]
    EmptySubset { subset: usize },

    #[error("bin {bin} of subset {subset} lies outside the {n_bins} sinogram bins")]
    BinOutOfRange { subset: usize, bin: usize, n_bins: usize },

    #[error("bin {bin} appears in both subset {first} and subset {second}")]
    OverlappingSubsets { bin: usize, first: usize, second: usize },

    #[error("bin {bin} is not covered by any subset")]
    UncoveredBin { bin: usize },

    // ----- Geometry and precomputation ------------------------------------------------
    #[error("{what}: expected {expected} elements, found {found}")]
    ShapeMismatch { what: &'static str, expected: usize, found: usize },

    #[error("sensitivity of subset {subset} is {value} at voxel {voxel}, inside the FOV mask")]
    NonPositiveSensitivity { subset: usize, voxel: usize, value: f32 },

    // ----- Engine ---------------------------------------------------------------------
    #[error("at least one iteration is required")]
    NoIterations,

    #[error("execution backend unavailable: {0}")]
    BackendUnavailable(#[source] std::io::Error),

    #[error("accelerator queue stopped before completing submitted work")]
    DeviceLost,

    // ----- Ambient --------------------------------------------------------------------
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid configuration: `{setting}` {requirement}")]
    InvalidSetting { setting: &'static str, requirement: &'static str },
}

pub type Result<T> = std::result::Result<T, Error>;
