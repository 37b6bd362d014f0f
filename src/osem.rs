//! The OSEM iteration.
//!
//! For every iteration, for every subset `n` in order `0..Sn`:
//!
//! ```text
//! Xy  = forward(y, n) + rs[n]
//! crr = m[n] / Xy          (1 where Xy is near zero)
//! bim = back(crr, n)
//! y   = y * (bim * inv_sen[n])
//! ```
//!
//! Every subset update reads the estimate written by the previous one, so the
//! loop is strictly sequential. `y` starts at 1 everywhere and, with
//! non-negative data and projector weights, never becomes negative.

/// Where an [`Osem`] engine is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Idle,
    Iterating { iteration: usize, subset: usize },
    Done,
}

/// Reported after every subset update
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Step {
    pub iteration: usize,
    pub subset: usize,
    pub n_subsets: usize,
}

#[derive(Clone, Debug)]
pub struct Reconstruction {
    pub image: Image,
    /// `nitr + 1` instants: before each iteration, and after the last
    pub timestamps: Timestamps,
}

pub struct Osem<E: ExecutionPath> {
    path: E,
    projector: Arc<dyn Projector>,
    state: State,
}

impl<E: ExecutionPath> Osem<E> {

    pub fn new(path: E, projector: Arc<dyn Projector>) -> Self {
        Self { path, projector, state: State::Idle }
    }

    pub fn state(&self) -> State { self.state }

    pub fn path(&self) -> &E { &self.path }

    pub fn run(&mut self, data: &Precomputed, nitr: usize) -> Result<Reconstruction> {
        self.run_with_progress(data, nitr, |_| ())
    }

    /// Like `run`, calling `observe` after every subset update.
    ///
    /// With a deferring execution path the update has been submitted, but not
    /// necessarily completed, when `observe` is called.
    pub fn run_with_progress(
        &mut self,
        data: &Precomputed,
        nitr: usize,
        observe: impl FnMut(Step),
    ) -> Result<Reconstruction> {
        let result = self.iterate(data, nitr, observe);
        self.transition(if result.is_ok() { State::Done } else { State::Idle });
        result
    }

    fn iterate(&mut self, data: &Precomputed, nitr: usize, mut observe: impl FnMut(Step)) -> Result<Reconstruction> {
        if nitr == 0 { return Err(Error::NoIterations) }
        let fov = self.projector.fov();
        if fov.n != data.fov().n {
            return Err(Error::ShapeMismatch {
                what: "projector FOV voxels", expected: data.fov().n_voxels(), found: fov.n_voxels()
            });
        }
        check_same_len("projector sinogram bins", data.subsets.n_bins(), self.projector.n_bins())?;
        let n_subsets = data.n_subsets();
        let path = &self.path;

        // Time-invariant inputs live on the path for the whole run
        let inv_sen = data.inverse_sensitivity.iter().map(|image| path.upload(&image.data)).collect::<Result<Vec<_>>>()?;
        let measured   = data.measured  .iter().map(|m | path.upload(m )).collect::<Result<Vec<_>>>()?;
        let background = data.background.iter().map(|rs| path.upload(rs)).collect::<Result<Vec<_>>>()?;

        let mut y = path.ones_like(&inv_sen[0], None)?;
        // Transient buffers, reused across subsets by paths which can
        let (mut xy, mut crr, mut bim, mut mul) = (None, None, None, None);

        let mut timestamps = Timestamps::with_capacity(nitr + 1);
        for iteration in 0..nitr {
            path.force_completion()?;
            timestamps.record();
            for (subset_index, subset) in data.subsets.iter().enumerate() {
                self.state = State::Iterating { iteration, subset: subset_index };
                let n = subset_index;
                let sino   = path.forward_project(&self.projector, &y, subset, xy.as_ref())?;
                let sino   = path.add(&sino, &background[n], Some(&sino))?;
                let ratio  = path.divide_with_default(&measured[n], &sino, 1.0, crr.as_ref())?;
                let back   = path.back_project(&self.projector, &ratio, subset, bim.as_ref())?;
                let factor = path.multiply(&back, &inv_sen[n], mul.as_ref())?;
                y = path.multiply(&y, &factor, Some(&y))?;
                (xy, crr, bim, mul) = (Some(sino), Some(ratio), Some(back), Some(factor));
                observe(Step { iteration, subset: subset_index, n_subsets });
            }
            trace!("iteration {} submitted", iteration + 1);
        }
        path.force_completion()?;
        timestamps.record();

        let image = Image::new(fov, path.download(&y)?)?;
        debug!("{} iterations of {} subsets on the {} path: {}",
               nitr, n_subsets, path.name(), timestamps.summary());
        Ok(Reconstruction { image, timestamps })
    }

    fn transition(&mut self, state: State) {
        debug!("engine state {:?} -> {:?}", self.state, state);
        self.state = state;
    }
}

/// Run `nitr` OSEM iterations on `path`
pub fn run<E: ExecutionPath>(
    path: E,
    projector: Arc<dyn Projector>,
    data: &Precomputed,
    nitr: usize,
) -> Result<Reconstruction> {
    Osem::new(path, projector).run(data, nitr)
}

// ----- Imports ------------------------------------------------------------------------------------------
use std::sync::Arc;

use tracing::{debug, trace};

use crate::{
    Error, Result,
    execution::{ExecutionPath, check_same_len},
    image::Image,
    precompute::Precomputed,
    projector::Projector,
    utils::timing::Timestamps,
};
