//! # trackq
//!
//! Postgres-backed job queue with single-claim workers.
//!
//! Producers enqueue typed jobs; any number of worker processes claim them
//! with `FOR UPDATE SKIP LOCKED`, run the matching handler, and record the
//! result. Handlers cover a delay/echo task, wholesale ingestion of a track
//! dataset, and a nearest-neighbor search for comparable tracks.

pub mod config;
pub mod dataset;
pub mod db;
pub mod engine;
pub mod error;
pub mod handler;
pub mod model;
pub mod similarity;
pub mod telemetry;
