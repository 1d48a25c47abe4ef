//! Shared types for the LRC streaming aggregator.
//!
//! Holds the error taxonomy, the clean-record and term-summary data model,
//! term-label ordering, course-code derivations and command-line settings.

pub mod courses;
pub mod error;
pub mod models;
pub mod settings;
pub mod terms;

pub use error::{Result, StreamingError};
