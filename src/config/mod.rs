//! Configuration module for the job scanner
//!
//! This module provides the `ScannerConfig` struct and its builder for
//! configuring the browser, pacing, pagination and scheduling bounds with
//! validation and sensible defaults.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod methods;
pub mod types;

// Re-exports for public API
pub use builder::ScannerConfigBuilder;
pub use types::ScannerConfig;

/// Environment variable naming a JSON config file for the binary
pub const CONFIG_ENV_VAR: &str = "JOBPROBE_CONFIG";
