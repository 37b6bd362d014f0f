/// Progress bar over the subset updates of one reconstruction
pub (super) struct SubsetBar(ProgressBar);

impl SubsetBar {

    pub (super) fn new(label: &str, iterations: usize, subsets: usize) -> Self {
        let bar = ProgressBar::new((iterations * subsets) as u64).with_prefix(label.to_string());
        bar.set_style(ProgressStyle::default_bar()
                      .template("{prefix:>24} [{elapsed_precise}] {wide_bar} {pos}/{len} subsets {msg}")
                      .unwrap_or_else(|_| ProgressStyle::default_bar())
        );
        Self(bar)
    }

    pub (super) fn step(&self, step: Step) {
        if step.subset == 0 {
            self.0.set_message(format!("(iteration {})", step.iteration + 1));
        }
        self.0.inc(1);
    }

    pub (super) fn finish(&self) { self.0.finish_and_clear() }
}

// ----- Imports -----------------------------------------------------------------------------------------
use indicatif::{ProgressBar, ProgressStyle};

use osem::osem::Step;
