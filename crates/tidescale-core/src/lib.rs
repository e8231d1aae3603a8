//! tidescale-core — shared types for scheduled autoscaling and daemon config.

pub mod config;
pub mod types;

pub use config::{ConfigError, ControllerTimings, TideConfig};
pub use types::*;
