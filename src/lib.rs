//! xesysman - sysfs-based GPU system management library
//!
//! This library discovers the hardware domains of a GPU (clock frequency,
//! memory, performance factors, temperature sensors and firmware
//! diagnostics) and exposes a uniform enumerate/query/control API over
//! them, backed by sysfs nodes and PMT telemetry.
//!
//! # Modules
//!
//! - [`cli`]: Command-line interface definitions
//! - [`commands`]: Command handlers
//! - [`config`]: Configuration system
//! - [`domain`]: Domain models with validation
//! - [`error`]: Error types
//! - [`linux`]: Linux sysfs backend
//! - [`pmt`]: Platform monitoring telemetry decoder
//! - [`services`]: Business logic services
//! - [`sysfs`]: Raw filesystem access and layout adapter
//! - [`sysman`]: Domain registry and device facade

pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod linux;
pub mod pmt;
pub mod services;
pub mod sysfs;
pub mod sysman;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::{AppError, Result};
pub use sysman::Sysman;
