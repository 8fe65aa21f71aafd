//! Filesystem utilities for courtfile.
//!
//! This module provides safe filesystem operations, particularly atomic writes
//! for the credential record and key.

pub mod atomic;

pub use atomic::atomic_write_private;
