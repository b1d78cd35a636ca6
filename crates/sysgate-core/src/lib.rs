//! sysgate-core: shared types for the sysgate workspace
//!
//! This crate provides the foundational types used by all sysgate sub-crates:
//! - Error taxonomy for policy compilation and filter loading
//! - Runtime capability detection (seccomp availability, privilege lock state)

pub mod capabilities;
pub mod error;

pub use capabilities::SystemCapabilities;
pub use error::{CompileError, LoaderError};
