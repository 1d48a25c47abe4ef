//! Data layer for the LRC streaming aggregator.
//!
//! Reads raw and reviewed usage tables from xlsx or CSV, normalizes raw rows
//! into clean per-course records, writes the processed workbook and folds
//! reviewed records into per-term summaries.

pub mod aggregator;
pub mod normalizer;
pub mod reader;
pub mod table;
pub mod writer;

pub use streaming_core as core;
