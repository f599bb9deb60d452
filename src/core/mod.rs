//! Core types for toolstash-check.
//!
//! This module holds the run configuration (`Options`) and the environment
//! snapshot the workflow reads from and hands to external commands.

pub mod env;
pub mod options;

// Re-export key types for convenience
pub use env::{AmbientEnv, ToolchainEnv};
pub use options::Options;
