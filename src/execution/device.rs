//! A simulated accelerator: a dedicated worker thread executing submitted work
//! strictly in submission order, and buffers whose storage it owns.
//!
//! Work is submitted without waiting for it to run. The only ways for the host
//! to wait are [`Device::synchronize`] and reading a buffer after
//! synchronizing.

enum Command {
    Launch(Box<dyn FnOnce() + Send>),
    /// Reply as soon as every earlier command has been executed
    Fence(Sender<()>),
}

pub struct Device {
    queue: Option<Sender<Command>>,
    worker: Option<JoinHandle<()>>,
}

impl Device {

    pub fn new() -> Result<Self> {
        let (queue, commands) = unbounded::<Command>();
        let worker = thread::Builder::new()
            .name("osem-device".into())
            .spawn(move || {
                for command in commands {
                    match command {
                        Command::Launch(job) => job(),
                        // Nobody waiting any more is not our problem
                        Command::Fence(reached) => { let _ = reached.send(()); }
                    }
                }
            })
            .map_err(Error::BackendUnavailable)?;
        debug!("accelerator worker started");
        Ok(Self { queue: Some(queue), worker: Some(worker) })
    }

    /// Enqueue `job` and return without waiting for it
    pub fn launch(&self, job: impl FnOnce() + Send + 'static) -> Result<()> {
        self.send(Command::Launch(Box::new(job)))
    }

    /// Block until everything launched so far has completed
    pub fn synchronize(&self) -> Result<()> {
        let (reached, wait) = bounded(1);
        self.send(Command::Fence(reached))?;
        wait.recv().map_err(|_| Error::DeviceLost)
    }

    fn send(&self, command: Command) -> Result<()> {
        self.queue
            .as_ref()
            .ok_or(Error::DeviceLost)?
            .send(command)
            .map_err(|_| Error::DeviceLost)
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        // Closing the queue lets the worker drain it and stop
        self.queue.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Handle to storage owned by the device.
///
/// Clones share storage. The element count is known on the host as soon as
/// the operation producing the buffer has been submitted, while the contents
/// are only valid once that operation has run.
#[derive(Clone, Debug)]
pub struct DeviceBuffer {
    storage: Arc<Mutex<Vec<f32>>>,
    len: usize,
}

impl DeviceBuffer {

    pub(crate) fn new(data: Vec<f32>) -> Self {
        Self { len: data.len(), storage: Arc::new(Mutex::new(data)) }
    }

    /// Empty storage which the first operation writing into it will size
    pub(crate) fn unallocated(len: usize) -> Self {
        Self { len, storage: Arc::new(Mutex::new(Vec::new())) }
    }

    /// A handle to the same storage, holding `len` elements
    pub(crate) fn resized(&self, len: usize) -> Self {
        Self { storage: Arc::clone(&self.storage), len }
    }

    pub fn len(&self) -> usize { self.len }

    pub fn is_empty(&self) -> bool { self.len == 0 }

    /// Whether `self` and `other` refer to the same storage
    pub fn shares(&self, other: &Self) -> bool { Arc::ptr_eq(&self.storage, &other.storage) }

    /// Number of elements the storage can hold without reallocating
    pub fn capacity(&self) -> usize { self.lock().capacity() }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Vec<f32>> {
        // A panicking job loses the device anyway: see `Device::synchronize`
        self.storage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove the contents, leaving the storage empty until `put_back`
    pub(crate) fn take(&self) -> Vec<f32> { std::mem::take(&mut *self.lock()) }

    pub(crate) fn put_back(&self, data: Vec<f32>) { *self.lock() = data; }
}

// ----- Imports ------------------------------------------------------------------------------------------
use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread::{self, JoinHandle},
};

use crossbeam_channel::{Sender, bounded, unbounded};
use tracing::debug;

use crate::{Error, Result};
