//! Configuration types and defaults for courtfile.
//!
//! This module defines the tunable knob type, the retry section, and the
//! default value functions used by the Config struct.

use serde::{Deserialize, Serialize};

/// A numeric tuning value as written by an operator.
///
/// Knobs come from YAML (where `3`, `2.5` and `"3"` are all plausible) and
/// from environment variables (always text). Interpretation is deferred to
/// the consumer, which falls back to its own default when the value is not
/// numeric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Knob {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Knob {
    /// Integer reading of the knob. Fractional values are truncated.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Knob::Int(v) => Some(*v),
            Knob::Float(v) if v.is_finite() => Some(v.trunc() as i64),
            Knob::Float(_) => None,
            Knob::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v.trunc() as i64))
            }
        }
    }

    /// Floating-point reading of the knob.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Knob::Int(v) => Some(*v as f64),
            Knob::Float(v) => Some(*v).filter(|v| v.is_finite()),
            Knob::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }
}

/// Read an integer knob clamped to `[min, max]`, or `default` when absent or not numeric.
pub fn clamp_int(knob: Option<&Knob>, default: u64, min: u64, max: u64) -> u64 {
    match knob.and_then(Knob::as_int) {
        Some(v) if v < min as i64 => min,
        Some(v) if v > max as i64 => max,
        Some(v) => v as u64,
        None => default,
    }
}

/// Read a float knob clamped to `[min, max]`, or `default` when absent or not numeric.
pub fn clamp_float(knob: Option<&Knob>, default: f64, min: f64, max: f64) -> f64 {
    match knob.and_then(Knob::as_float) {
        Some(v) => v.clamp(min, max),
        None => default,
    }
}

/// Retry and timeout overrides.
///
/// Every field is optional; the retry policy derives its defaults from the
/// execution mode and only consults these when present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Per-attempt agent timeout in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<Knob>,

    /// Maximum number of agent attempts per filing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<Knob>,

    /// Wait before the second attempt, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_delay_ms: Option<Knob>,

    /// Multiplier applied to the wait after each retry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff_factor: Option<Knob>,

    /// Upper bound for any single wait, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<Knob>,
}

pub(crate) fn default_agents_dir() -> String {
    "agents".to_string()
}
