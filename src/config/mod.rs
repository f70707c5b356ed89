//! Configuration Module
//!
//! TOML configuration for input parsing, optional normalizer filters, chart
//! and report layout, and the session server.
//!
//! ## Loading Order
//!
//! 1. `--config PATH` on the command line (must load)
//! 2. `CBM_CONFIG` environment variable (path to TOML file)
//! 3. `cbm_config.toml` in the current working directory
//! 4. Built-in defaults
//!
//! The loaded config is passed down explicitly; there is no global instance.

mod app_config;
pub mod defaults;
pub mod validation;

pub use app_config::*;
