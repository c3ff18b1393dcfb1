//! Core shared library for the GDM rule engine.
//!
//! This crate exposes the plumbing every other crate in the workspace leans
//! on: the canonical error type, configuration loading, logging setup and
//! the lenient (de)serialization helpers used for stored rule data.

pub mod config;
pub mod errors;
pub mod logging;
pub mod serde_utils;

pub use config::{CoreConfig, Environment};
pub use errors::{ConfigError, GdmError, Result as CoreResult};
