//! Write into caller-supplied buffers on the accelerator, optionally without
//! waiting for the work to finish.

pub struct BufferReuse {
    device: Device,
    /// Return from operators as soon as the work has been submitted
    deferred: bool,
}

impl BufferReuse {

    pub fn new(deferred: bool) -> Result<Self> {
        Ok(Self { device: Device::new()?, deferred })
    }

    pub fn deferred(&self) -> bool { self.deferred }

    /// Submit `job`, waiting for it unless deferred
    fn submit(&self, job: impl FnOnce() + Send + 'static) -> Result<()> {
        self.device.launch(job)?;
        if !self.deferred { self.device.synchronize()?; }
        Ok(())
    }

    /// The buffer an operator producing `len` elements writes into
    fn target(output: Option<&DeviceBuffer>, len: usize) -> DeviceBuffer {
        match output {
            Some(buffer) => buffer.resized(len),
            None         => DeviceBuffer::unallocated(len),
        }
    }

    fn binary(
        &self,
        a: &DeviceBuffer,
        b: &DeviceBuffer,
        output: Option<&DeviceBuffer>,
        kernel: impl FnOnce(&mut [f32], Operand, Operand) + Send + 'static,
    ) -> Result<DeviceBuffer> {
        check_same_len("elementwise operand", a.len(), b.len())?;
        let out = Self::target(output, a.len());
        let (job_out, a, b) = (out.clone(), a.clone(), b.clone());
        self.submit(move || {
            let n = job_out.len();
            let mut data = job_out.take();
            data.resize(n, 0.0);
            {
                // Inputs aliasing the output are read from `data` itself;
                // every other distinct buffer is locked exactly once
                let a_guard = (!a.shares(&job_out)).then(|| a.lock());
                let b_guard = (!b.shares(&job_out) && !b.shares(&a)).then(|| b.lock());
                let a_op = match &a_guard {
                    Some(guard) => Operand::Input(guard.as_slice()),
                    None        => Operand::Output,
                };
                let b_op = match (&b_guard, b.shares(&a)) {
                    (Some(guard), _) => Operand::Input(guard.as_slice()),
                    (None,     true) => a_op,
                    (None,    false) => Operand::Output,
                };
                kernel(&mut data, a_op, b_op);
            }
            job_out.put_back(data);
        })?;
        Ok(out)
    }

    fn fill(&self, len: usize, value: f32, output: Option<&DeviceBuffer>) -> Result<DeviceBuffer> {
        let out = Self::target(output, len);
        let job_out = out.clone();
        self.submit(move || {
            let mut data = job_out.take();
            data.resize(len, 0.0);
            kernels::fill(&mut data, value);
            job_out.put_back(data);
        })?;
        Ok(out)
    }

    /// Run `project` from `input` into `output`, which holds `out_len` values
    fn project(
        &self,
        input: &DeviceBuffer,
        output: Option<&DeviceBuffer>,
        out_len: usize,
        project: impl FnOnce(&[f32], &mut [f32]) + Send + 'static,
    ) -> Result<DeviceBuffer> {
        let out = Self::target(output, out_len);
        let (job_out, input) = (out.clone(), input.clone());
        self.submit(move || {
            let mut data = job_out.take();
            if input.shares(&job_out) {
                // Every output element depends on every input element
                let source = std::mem::take(&mut data);
                data.resize(out_len, 0.0);
                project(&source, &mut data);
            } else {
                data.resize(out_len, 0.0);
                project(&input.lock(), &mut data);
            }
            job_out.put_back(data);
        })?;
        Ok(out)
    }
}

impl ExecutionPath for BufferReuse {

    type Buffer = DeviceBuffer;

    fn name(&self) -> &'static str {
        if self.deferred { "buffer-reuse (deferred)" } else { "buffer-reuse" }
    }

    fn upload(&self, data: &[f32]) -> Result<DeviceBuffer> { Ok(DeviceBuffer::new(data.to_vec())) }

    fn download(&self, buffer: &DeviceBuffer) -> Result<Vec<f32>> {
        self.force_completion()?;
        let data = buffer.lock();
        check_same_len("downloaded buffer", buffer.len(), data.len())?;
        Ok(data.clone())
    }

    fn ones_like(&self, like: &DeviceBuffer, output: Option<&DeviceBuffer>) -> Result<DeviceBuffer> {
        self.fill(like.len(), 1.0, output)
    }

    fn zeros_like(&self, like: &DeviceBuffer, output: Option<&DeviceBuffer>) -> Result<DeviceBuffer> {
        self.fill(like.len(), 0.0, output)
    }

    fn add(&self, a: &DeviceBuffer, b: &DeviceBuffer, output: Option<&DeviceBuffer>) -> Result<DeviceBuffer> {
        self.binary(a, b, output, kernels::add)
    }

    fn multiply(&self, a: &DeviceBuffer, b: &DeviceBuffer, output: Option<&DeviceBuffer>) -> Result<DeviceBuffer> {
        self.binary(a, b, output, kernels::multiply)
    }

    fn divide_with_default(
        &self,
        a: &DeviceBuffer,
        b: &DeviceBuffer,
        default: f32,
        output: Option<&DeviceBuffer>
    ) -> Result<DeviceBuffer> {
        self.binary(a, b, output, move |out, a, b| kernels::divide_with_default(out, a, b, default))
    }

    fn forward_project(
        &self,
        projector: &Arc<dyn Projector>,
        image: &DeviceBuffer,
        subset: &Subset,
        output: Option<&DeviceBuffer>,
    ) -> Result<DeviceBuffer> {
        check_same_len("forward projection input image", projector.fov().n_voxels(), image.len())?;
        let (projector, subset) = (Arc::clone(projector), subset.clone());
        self.project(image, output, subset.len(), move |image, sinogram| {
            projector.forward_project(image, &subset, sinogram)
        })
    }

    fn back_project(
        &self,
        projector: &Arc<dyn Projector>,
        sinogram: &DeviceBuffer,
        subset: &Subset,
        output: Option<&DeviceBuffer>,
    ) -> Result<DeviceBuffer> {
        check_same_len("back projection input sinogram", subset.len(), sinogram.len())?;
        let n_voxels = projector.fov().n_voxels();
        let (projector, subset) = (Arc::clone(projector), subset.clone());
        self.project(sinogram, output, n_voxels, move |sinogram, image| {
            projector.back_project(sinogram, &subset, image)
        })
    }

    fn force_completion(&self) -> Result<()> { self.device.synchronize() }
}

// ----- Imports ------------------------------------------------------------------------------------------
use std::sync::Arc;

use crate::{
    Result,
    execution::{Device, DeviceBuffer, ExecutionPath, check_same_len},
    kernels::{self, Operand},
    projector::Projector,
    subsets::Subset,
};
