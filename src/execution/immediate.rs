//! Allocate on every operation, compute synchronously on the calling thread.

#[derive(Clone, Copy, Debug, Default)]
pub struct Immediate;

impl ExecutionPath for Immediate {

    type Buffer = Vec<f32>;

    fn name(&self) -> &'static str { "immediate" }

    fn upload(&self, data: &[f32]) -> Result<Vec<f32>> { Ok(data.to_vec()) }

    fn download(&self, buffer: &Vec<f32>) -> Result<Vec<f32>> { Ok(buffer.clone()) }

    fn ones_like(&self, like: &Vec<f32>, _: Option<&Vec<f32>>) -> Result<Vec<f32>> {
        Ok(vec![1.0; like.len()])
    }

    fn zeros_like(&self, like: &Vec<f32>, _: Option<&Vec<f32>>) -> Result<Vec<f32>> {
        Ok(vec![0.0; like.len()])
    }

    fn add(&self, a: &Vec<f32>, b: &Vec<f32>, _: Option<&Vec<f32>>) -> Result<Vec<f32>> {
        binary(a, b, kernels::add)
    }

    fn multiply(&self, a: &Vec<f32>, b: &Vec<f32>, _: Option<&Vec<f32>>) -> Result<Vec<f32>> {
        binary(a, b, kernels::multiply)
    }

    fn divide_with_default(&self, a: &Vec<f32>, b: &Vec<f32>, default: f32, _: Option<&Vec<f32>>) -> Result<Vec<f32>> {
        binary(a, b, |out, a, b| kernels::divide_with_default(out, a, b, default))
    }

    fn forward_project(
        &self,
        projector: &Arc<dyn Projector>,
        image: &Vec<f32>,
        subset: &Subset,
        _: Option<&Vec<f32>>,
    ) -> Result<Vec<f32>> {
        check_same_len("forward projection input image", projector.fov().n_voxels(), image.len())?;
        let mut sinogram = vec![0.0; subset.len()];
        projector.forward_project(image, subset, &mut sinogram);
        Ok(sinogram)
    }

    fn back_project(
        &self,
        projector: &Arc<dyn Projector>,
        sinogram: &Vec<f32>,
        subset: &Subset,
        _: Option<&Vec<f32>>,
    ) -> Result<Vec<f32>> {
        check_same_len("back projection input sinogram", subset.len(), sinogram.len())?;
        let mut image = vec![0.0; projector.fov().n_voxels()];
        projector.back_project(sinogram, subset, &mut image);
        Ok(image)
    }

    fn force_completion(&self) -> Result<()> { Ok(()) }
}

fn binary(a: &[f32], b: &[f32], kernel: impl FnOnce(&mut [f32], Operand, Operand)) -> Result<Vec<f32>> {
    check_same_len("elementwise operand", a.len(), b.len())?;
    let mut out = vec![0.0; a.len()];
    kernel(&mut out, Operand::Input(a), Operand::Input(b));
    Ok(out)
}

// ----- Imports ------------------------------------------------------------------------------------------
use std::sync::Arc;

use crate::{
    Result,
    execution::{ExecutionPath, check_same_len},
    kernels::{self, Operand},
    projector::Projector,
    subsets::Subset,
};
