/// Parse comma-separated triplets such as `60,60,32`
pub fn parse_triplet<T: std::str::FromStr>(s: &str) -> Result<(T,T,T), String>
where
    <T as std::str::FromStr>::Err: std::fmt::Display,
{
    let v = s.split(',').map(str::trim).collect::<Vec<_>>();
    if v.len() != 3 {
        return Err(format!("expected 3 comma-separated values, found {} in `{s}`", v.len()));
    }
    let parse = |x: &str| x.parse::<T>().map_err(|e| format!("`{x}`: {e}"));
    Ok((parse(v[0])?, parse(v[1])?, parse(v[2])?))
}

/// Group numeric digits to facilitate reading long numbers
pub fn group_digits<F: std::fmt::Display>(n: F) -> String {
    use numsep::{separate, Locale};
    separate(n, Locale::English)
}


pub mod timing {

    use super::group_digits;
    use std::fmt;
    use std::time::{Duration, Instant};
    use std::io::Write;

    /// Human-facing stage timer: `message ... 1,234 ms`
    pub struct Progress {
        previous: Instant,
    }

    impl Progress {

        #[allow(clippy::new_without_default)]
        pub fn new() -> Self { Self { previous: Instant::now() } }

        /// Print message, append ellipsis, flush stdout, stay on same line, start timer.
        pub fn start(&mut self, message: &str) {
            print!("{message} ... ");
            // Output is cosmetic: a failed flush only delays it
            let _ = std::io::stdout().flush();
            self.start_timer();
        }

        // Print time elapsed since last start or done
        pub fn done(&mut self) {
            println!("{} ms", group_digits(self.previous.elapsed().as_millis()));
            self.start_timer();
        }

        fn start_timer(&mut self) { self.previous = Instant::now() }
    }

    /// Wall-clock instants bracketing the iterations of a reconstruction: one
    /// before each iteration and one after the last.
    #[derive(Clone, Debug, Default, PartialEq, Eq)]
    pub struct Timestamps(Vec<Instant>);

    impl Timestamps {

        pub fn new() -> Self { Self(vec![]) }

        pub fn with_capacity(n: usize) -> Self { Self(Vec::with_capacity(n)) }

        pub fn record(&mut self) { self.0.push(Instant::now()) }

        pub fn len(&self) -> usize { self.0.len() }

        pub fn is_empty(&self) -> bool { self.0.is_empty() }

        pub fn as_slice(&self) -> &[Instant] { &self.0 }

        /// Time taken by each iteration
        pub fn durations(&self) -> Vec<Duration> {
            self.0.windows(2).map(|w| w[1] - w[0]).collect()
        }

        /// Time from the first to the last timestamp
        pub fn total(&self) -> Duration {
            match (self.0.first(), self.0.last()) {
                (Some(&first), Some(&last)) => last - first,
                _                           => Duration::ZERO,
            }
        }

        /// Mean and standard error of the per-iteration times
        pub fn summary(&self) -> Summary {
            let seconds = self.durations().iter().map(Duration::as_secs_f64).collect::<Vec<_>>();
            let n = seconds.len();
            let mean = if n == 0 { 0.0 } else { seconds.iter().sum::<f64>() / n as f64 };
            let standard_error = if n < 2 { 0.0 } else {
                let variance = seconds.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
                (variance / n as f64).sqrt()
            };
            Summary {
                iterations: n,
                total: self.total(),
                mean: Duration::from_secs_f64(mean),
                standard_error: Duration::from_secs_f64(standard_error),
            }
        }
    }

    impl From<Vec<Instant>> for Timestamps {
        fn from(instants: Vec<Instant>) -> Self { Self(instants) }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Summary {
        pub iterations: usize,
        pub total: Duration,
        pub mean: Duration,
        pub standard_error: Duration,
    }

    impl fmt::Display for Summary {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{:.3} s ({:.3} ± {:.3} s per iteration, {} iterations)",
                   self.total.as_secs_f64(),
                   self.mean.as_secs_f64(),
                   self.standard_error.as_secs_f64(),
                   self.iterations)
        }
    }

}
