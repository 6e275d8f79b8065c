//! Unified error types for xesysman
//!
//! This module defines all error types used throughout the application.
//! Uses thiserror for ergonomic error definitions.

use std::io;
use std::path::Path;

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a sysman domain operation
    #[error("Sysman error: {0}")]
    Sysman(#[from] SysmanError),

    /// Error from raw sysfs access outside of a domain controller
    #[error("Sysfs access error: {0}")]
    Access(#[from] AccessError),

    /// Error from configuration parsing/validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error from domain type validation
    #[error("Domain validation error: {0}")]
    Domain(#[from] DomainError),

    /// No DRM card found at the requested index
    #[error("GPU not found: card{0}")]
    DeviceNotFound(u32),

    /// Domain handle index out of range
    #[error("No {kind} domain at index {index}")]
    HandleNotFound { kind: &'static str, index: usize },

    /// IO error (output, file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the raw filesystem access layer
///
/// These carry filesystem-shaped detail and are translated to
/// [`SysmanError`] at the controller boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// The file or directory does not exist
    #[error("No such file: {0}")]
    NotFound(String),

    /// The caller lacks permission for the access
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The file content could not be parsed as the requested type
    #[error("Cannot parse '{value}' read from {path}")]
    Parse { path: String, value: String },

    /// Any other OS error
    #[error("IO error on {path}: {message}")]
    Io { path: String, message: String },
}

impl AccessError {
    /// Classify an `io::Error` raised while accessing `path`
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        let path = path.display().to_string();
        match err.kind() {
            io::ErrorKind::NotFound => AccessError::NotFound(path),
            io::ErrorKind::PermissionDenied => AccessError::PermissionDenied(path),
            _ => AccessError::Io {
                path,
                message: err.to_string(),
            },
        }
    }
}

/// Errors surfaced by sysman domain operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SysmanError {
    /// Feature does not exist for this domain, hardware or driver generation
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    /// Value could not be obtained right now
    #[error("Not available: {0}")]
    NotAvailable(String),

    /// Caller-supplied value violates a precondition
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A required companion resource is entirely absent
    #[error("Dependency unavailable: {0}")]
    DependencyUnavailable(String),

    /// Insufficient permissions
    #[error("Insufficient permissions: {0}. Try running with sudo.")]
    InsufficientPermissions(String),

    /// Unexpected OS or file error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<AccessError> for SysmanError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::NotFound(path) => SysmanError::Unsupported(path),
            AccessError::PermissionDenied(path) => SysmanError::InsufficientPermissions(path),
            other => SysmanError::Unknown(other.to_string()),
        }
    }
}

/// Errors from domain type validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Frequency range with min above max
    #[error("Invalid frequency range: {min} MHz - {max} MHz (min must not exceed max)")]
    InvalidFrequencyRange { min: f64, max: f64 },

    /// Performance factor outside 0-100
    #[error("Invalid performance factor: {0} (must be 0-100)")]
    InvalidPerformanceFactor(f64),

    /// Unknown engine name
    #[error("Unknown engine type: {0}")]
    UnknownEngine(String),

    /// Invalid value provided
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Errors from configuration parsing and validation
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// Invalid config value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Errors from service operations
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Domain operation failed
    #[error("Sysman operation failed: {0}")]
    Sysman(#[from] SysmanError),

    /// Domain validation failed
    #[error("Validation failed: {0}")]
    Domain(#[from] DomainError),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Sysman(e) => AppError::Sysman(e),
            ServiceError::Domain(e) => AppError::Domain(e),
        }
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_not_found_maps_to_unsupported() {
        let err: SysmanError = AccessError::NotFound("gt_min_freq_mhz".into()).into();
        assert_eq!(err, SysmanError::Unsupported("gt_min_freq_mhz".into()));
    }

    #[test]
    fn test_access_permission_maps_to_permissions() {
        let err: SysmanError = AccessError::PermissionDenied("rps_max_freq_mhz".into()).into();
        assert!(matches!(err, SysmanError::InsufficientPermissions(_)));
    }

    #[test]
    fn test_access_io_stays_unknown() {
        let err: SysmanError = AccessError::Io {
            path: "telem".into(),
            message: "device busy".into(),
        }
        .into();
        assert!(matches!(err, SysmanError::Unknown(ref m) if m.contains("device busy")));
    }

    #[test]
    fn test_from_io_classifies_kind() {
        let path = Path::new("/sys/class/drm/card0/gt_max_freq_mhz");
        let err = AccessError::from_io(path, io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, AccessError::NotFound(p) if p.ends_with("gt_max_freq_mhz")));

        let err = AccessError::from_io(path, io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, AccessError::PermissionDenied(_)));
    }

    #[test]
    fn test_domain_error_display() {
        let err = DomainError::InvalidFrequencyRange {
            min: 1200.0,
            max: 300.0,
        };
        assert!(err.to_string().contains("1200 MHz"));
    }

    #[test]
    fn test_service_error_conversion() {
        let service_err = ServiceError::Sysman(SysmanError::Unsupported("x".into()));
        let app_err: AppError = service_err.into();
        assert!(matches!(app_err, AppError::Sysman(_)));
    }
}
