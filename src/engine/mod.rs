//! Per-process engine: the poll loop that claims and runs jobs.

pub mod dispatcher;

pub use dispatcher::{Dispatcher, DispatcherConfig};
