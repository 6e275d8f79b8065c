//! Performance factor domain types
//!
//! A performance factor (0-100) biases the hardware toward one engine class.

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Highest performance factor
pub const MAX_PERFORMANCE_FACTOR: f64 = 100.0;

/// Half of the maximum performance factor
pub const HALF_PERFORMANCE_FACTOR: f64 = 50.0;

/// Engine class a performance factor applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineType {
    Media,
    Compute,
    Other,
}

impl EngineType {
    /// All engine classes, in enumeration order
    pub const ALL: [EngineType; 3] = [Self::Media, Self::Compute, Self::Other];
}

impl fmt::Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Media => write!(f, "media"),
            Self::Compute => write!(f, "compute"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl FromStr for EngineType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "media" => Ok(Self::Media),
            "compute" => Ok(Self::Compute),
            "other" => Ok(Self::Other),
            _ => Err(DomainError::UnknownEngine(s.to_string())),
        }
    }
}

/// Performance factor in the 0-100 range
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct PerformanceFactor(f64);

impl PerformanceFactor {
    /// Create a validated performance factor
    pub fn new(value: f64) -> Result<Self, DomainError> {
        if !(0.0..=MAX_PERFORMANCE_FACTOR).contains(&value) {
            return Err(DomainError::InvalidPerformanceFactor(value));
        }
        Ok(Self(value))
    }

    /// Get the raw factor
    #[inline]
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for PerformanceFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Static properties of a performance factor domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceProperties {
    /// Whether the handle lives on a subdevice
    pub on_subdevice: bool,
    /// Subdevice id (0 when not on a subdevice)
    pub subdevice_id: u32,
    /// Engine class the factor applies to
    pub engine: EngineType,
}
