//! Core data model.
//!
//! A job is a typed unit of work with a monotonic lifecycle. A track is one
//! catalog entry in the dataset the comparables search runs over.

pub mod job;
pub mod track;

pub use job::*;
pub use track::*;
