/// Command line interface for `osem` executable
#[derive(clap::Parser, Debug, Clone)]
#[clap(
    name = "osem",
    about = "Ordered-Subset Expectation-Maximization reconstruction benchmark",
)]
pub (super) struct Cli {
    /// TOML configuration file; the options below override its values
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Number of OSEM iterations to perform [default: 4]
    #[clap(short, long)]
    pub iterations: Option<usize>,

    /// Number of subsets per iteration [default: 14]
    #[clap(short, long)]
    pub subsets: Option<usize>,

    /// Execution path [default: buffer-reuse]
    #[clap(short, long, value_enum)]
    pub path: Option<PathKind>,

    /// Wait for every buffer-reuse operation to complete before issuing the next
    #[clap(long)]
    pub sync: bool,

    /// Number of voxels in each dimension [default: 60,60,16]
    #[clap(short, long, value_parser = parse_triplet::<usize>)]
    pub n_voxels: Option<(usize, usize, usize)>,

    /// Voxel box full-widths, with units [default: "180 mm,180 mm,48 mm"]
    #[clap(long, value_parser = parse_triplet::<Length>)]
    pub size: Option<(Length, Length, Length)>,

    /// Number of projection angles in the simulated scanner [default: 84]
    #[clap(long)]
    pub views: Option<usize>,

    /// Write the reconstructed image to this file (raw little-endian f32)
    #[clap(short, long)]
    pub out: Option<PathBuf>,

    /// Maximum number of rayon threads
    #[clap(short = 'j', long)]
    pub threads: Option<usize>,

    /// Also run the other execution path and report the largest difference
    #[clap(long)]
    pub compare: bool,
}

impl Cli {

    /// Settings from the configuration file (or built-in defaults) with the
    /// command line overrides applied
    pub (super) fn settings(&self) -> osem::Result<Config> {
        let mut config = match &self.config {
            Some(path) => read_config_file(path)?,
            None       => defaults(),
        };
        if let Some(n) = self.iterations { config.iterations = n }
        if let Some(n) = self.subsets    { config.subsets    = n }
        if let Some(p) = self.path       { config.path       = p }
        if let Some(n) = self.n_voxels   { config.nvoxels    = n }
        if let Some(s) = self.size       { config.fov_size   = s }
        if let Some(v) = self.views      { config.scanner.views = v }
        if self.sync { config.deferred = false }
        config.validate()?;
        Ok(config)
    }
}

fn defaults() -> Config {
    Config {
        iterations: 4,
        subsets: 14,
        path: PathKind::default(),
        deferred: true,
        nvoxels: (60, 60, 16),
        fov_size: (mm(180.0), mm(180.0), mm(48.0)),
        mask_radius: None,
        scanner: Scanner::default(),
        input: None,
        phantom: phantom::Params::default(),
    }
}

// ----- Imports ------------------------------------------------------------------------------------------
use std::path::PathBuf;

use osem::{
    PathKind,
    config::osem::{Config, Scanner, read_config_file},
    phantom,
    utils::parse_triplet,
};
use units::{Length, mm};

#[cfg(test)]
mod test {
    use super::*;
    use clap::Parser;

    #[test]
    fn flags_override_defaults() -> osem::Result<()> {
        let cli = Cli::parse_from(["osem", "-i", "2", "-p", "immediate", "--sync", "-n", "8,8,4"]);
        let config = cli.settings()?;
        assert_eq!(config.iterations, 2);
        assert_eq!(config.subsets, 14);
        assert_eq!(config.path, PathKind::Immediate);
        assert!(!config.deferred);
        assert_eq!(config.nvoxels, (8, 8, 4));
        Ok(())
    }

    #[test]
    fn zero_views_are_rejected() {
        let cli = Cli::parse_from(["osem", "--views", "0"]);
        assert!(matches!(cli.settings(), Err(osem::Error::InvalidSetting { setting: "scanner.views", .. })));
    }

    #[test]
    fn sizes_take_units() {
        let cli = Cli::parse_from(["osem", "--size", "100 mm, 200 mm, 3 mm"]);
        assert_eq!(cli.size, Some((mm(100.0), mm(200.0), mm(3.0))));
    }
}
