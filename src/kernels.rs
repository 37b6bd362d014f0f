//! Elementwise arithmetic shared by both execution paths.
//!
//! Both paths call exactly these functions, so their results are
//! bit-identical: only allocation and synchronization differ between them.
//!
//! The output may alias one or both inputs, which the buffer-reusing path
//! relies on (e.g. `y = y * m` written back into `y`). Such inputs are passed
//! as [`Operand::Output`].

/// Denominators smaller than this in magnitude are treated as zero by
/// [`divide_with_default`]
pub const NEAR_ZERO: f32 = 1e-9;

/// Source of one input of a binary kernel
#[derive(Clone, Copy, Debug)]
pub enum Operand<'a> {
    /// Read the input from the output buffer itself, before overwriting it
    Output,
    Input(&'a [f32]),
}

pub fn add(out: &mut [f32], a: Operand, b: Operand) {
    binary(out, a, b, |x, y| x + y)
}

pub fn multiply(out: &mut [f32], a: Operand, b: Operand) {
    binary(out, a, b, |x, y| x * y)
}

/// `a / b` elementwise, except `default` wherever `|b| < NEAR_ZERO`
pub fn divide_with_default(out: &mut [f32], a: Operand, b: Operand, default: f32) {
    binary(out, a, b, move |x, y| if y.abs() < NEAR_ZERO { default } else { x / y })
}

pub fn fill(out: &mut [f32], value: f32) {
    out.par_iter_mut().for_each(|o| *o = value);
}

fn binary(out: &mut [f32], a: Operand, b: Operand, op: impl Fn(f32, f32) -> f32 + Sync + Send) {
    use Operand::*;
    let n = out.len();
    for input in [a, b] {
        if let Input(x) = input { assert_eq!(x.len(), n, "operand length differs from output length") }
    }
    match (a, b) {
        (Input(a), Input(b)) => Zip::from(out).and(a).and(b).par_for_each(|o, &x, &y| *o = op( x,  y)),
        (Output  , Input(b)) => Zip::from(out).and(b)       .par_for_each(|o,     &y| *o = op(*o,  y)),
        (Input(a), Output  ) => Zip::from(out).and(a)       .par_for_each(|o, &x    | *o = op( x, *o)),
        (Output  , Output  ) => out.par_iter_mut()          .for_each    (|o        | *o = op(*o, *o)),
    }
}

// ----- Imports ------------------------------------------------------------------------------------------
use ndarray::Zip;
use rayon::prelude::*;
