mod cli;
mod progress;

fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = args.settings()?;

    if let Some(threads) = args.threads {
        // Set the maximum number of threads used by rayon for parallel iteration
        match rayon::ThreadPoolBuilder::new().num_threads(threads).build_global() {
            Err(e) => println!("{}", e),
            Ok(_)  => println!("Using up to {} threads.", threads),
        }
    }

    let mut progress = Progress::new();

    // --- Geometry ------------------------------------------------------------------
    let fov = config.fov();
    let mask = config.mask();
    let scanner = config.scanner();
    progress.start("Computing system matrix");
    let matrix = scanner.system_matrix(fov)?;
    progress.done();
    println!("    {} views x {} radial bins x {} slices = {} bins, {} non-zero weights",
             scanner.views, scanner.radial_bins, fov.n[2],
             group_digits(matrix.n_bins()), group_digits(matrix.n_elements()));
    let projector: Arc<dyn Projector> = Arc::new(matrix);

    // --- Data ----------------------------------------------------------------------
    let raw = match &config.input {
        Some(input) => {
            progress.start("Reading sinograms");
            let raw = input.read()?;
            progress.done();
            raw
        }
        None => {
            progress.start("Simulating acquisition");
            let phantom = phantom::simulate(projector.as_ref(), &mask, &config.phantom)?;
            progress.done();
            phantom.raw
        }
    };

    progress.start(&format!("Precomputing sensitivities of {} subsets", config.subsets));
    let subsets = Subsets::from_provider(&scanner.subsets(&fov), config.subsets)?;
    let data = Precomputed::new(&raw, mask, subsets, projector.as_ref())?;
    progress.done();

    // --- Reconstruction ------------------------------------------------------------
    let iterations = config.iterations;
    let image = match config.path {
        PathKind::Immediate   => reconstruct(Immediate, &projector, &data, iterations)?,
        PathKind::BufferReuse => reconstruct(BufferReuse::new(config.deferred)?, &projector, &data, iterations)?,
    };

    if args.compare {
        let other = match config.path {
            PathKind::Immediate   => reconstruct(BufferReuse::new(config.deferred)?, &projector, &data, iterations)?,
            PathKind::BufferReuse => reconstruct(Immediate, &projector, &data, iterations)?,
        };
        println!("Largest relative difference between paths: {:.3e}",
                 max_relative_difference(&image.data, &other.data));
    }

    if let Some(out) = &args.out {
        // If the directory where results will be written does not exist yet, make it
        if let Some(dir) = out.parent() { create_dir_all(dir)? }
        image.write_to_raw_file(out)?;
        println!("Wrote image to {}", out.display());
    }
    Ok(())
}

fn reconstruct<E: ExecutionPath>(
    path: E,
    projector: &Arc<dyn Projector>,
    data: &Precomputed,
    iterations: usize,
) -> osem::Result<Image> {
    let bar = SubsetBar::new(path.name(), iterations, data.n_subsets());
    let mut engine = Osem::new(path, Arc::clone(projector));
    let Reconstruction { image, timestamps } = engine.run_with_progress(data, iterations, |step| bar.step(step))?;
    bar.finish();
    println!("{:>24}: Time elapsed: {}", engine.path().name(), timestamps.summary());
    Ok(image)
}

/// Largest elementwise `|a - b| / max(|a|, |b|)`
fn max_relative_difference(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let scale = x.abs().max(y.abs());
            if scale == 0.0 { 0.0 } else { (x - y).abs() / scale }
        })
        .fold(0.0, f32::max)
}

// ----- Imports ------------------------------------------------------------------------------------------
use std::{error::Error, fs::create_dir_all, sync::Arc};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use osem::{
    BufferReuse, ExecutionPath, Image, Immediate, Osem, PathKind, Precomputed, Reconstruction, Subsets,
    phantom,
    projector::Projector,
    utils::{group_digits, timing::Progress},
};

use cli::Cli;
use progress::SubsetBar;
