//! Configuration model for courtfile.
//!
//! This module defines the Config struct that represents `{data_dir}/config.yaml`.
//! It supports forward-compatible YAML parsing (unknown fields are ignored),
//! sensible defaults for optional fields, and one-shot environment overrides.

mod model;
mod operations;
pub mod types;


// Re-export public API
pub use model::Config;
pub use types::{Knob, RetrySettings, clamp_float, clamp_int};
