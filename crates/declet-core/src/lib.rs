#![forbid(unsafe_code)]

//! Core: reactive values, single-tick scheduling, configuration, and logging.

pub mod config;
pub mod error;
pub mod logging;
pub mod reactive;
pub mod schedule;

pub use error::BoxError;
