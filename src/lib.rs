//! VALUEBOT: daily sports value-play selector.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod model;
pub mod strategy;
pub mod providers;
pub mod storage;
pub mod engine;
pub mod dashboard;
