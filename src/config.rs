//! Configuration files

pub mod osem;
