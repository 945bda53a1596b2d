//! Secret handling utilities.
//!
//! Re-exports the secrecy types callers need to read the database URL
//! out of a [`Config`](super::Config).

pub use secrecy::{ExposeSecret, SecretString};
