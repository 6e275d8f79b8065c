//! Frequency domain types
//!
//! Clock domains, frequency ranges, state snapshots and throttle reasons.

use crate::error::DomainError;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel for a frequency or voltage field that could not be read
pub const FREQUENCY_UNKNOWN: f64 = -1.0;

/// Clock domain a frequency handle controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrequencyDomain {
    /// Core (render/compute) clock
    Gpu,
    /// Media clock
    Media,
}

impl fmt::Display for FrequencyDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpu => write!(f, "GPU"),
            Self::Media => write!(f, "Media"),
        }
    }
}

/// Frequency range in MHz
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyRange {
    /// Minimum frequency
    pub min: f64,
    /// Maximum frequency
    pub max: f64,
}

impl FrequencyRange {
    /// Create a new range (not validated)
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// The "restore defaults" request
    pub const fn defaults() -> Self {
        Self::new(FREQUENCY_UNKNOWN, FREQUENCY_UNKNOWN)
    }

    /// Both bounds rounded to whole MHz
    pub fn rounded(&self) -> Self {
        Self::new(self.min.round(), self.max.round())
    }

    /// Whether this is the "restore defaults" request
    pub fn is_default_request(&self) -> bool {
        let r = self.rounded();
        r.min == FREQUENCY_UNKNOWN && r.max == FREQUENCY_UNKNOWN
    }

    /// Validate that min does not exceed max
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.min > self.max {
            return Err(DomainError::InvalidFrequencyRange {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

impl fmt::Display for FrequencyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} MHz - {} MHz", self.min, self.max)
    }
}

bitflags! {
    /// Reasons the hardware reduced frequency below the request
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ThrottleReasons: u32 {
        /// Sustained (PL1) power limit
        const AVE_PWR_CAP = 1 << 0;
        /// Burst (PL2) power limit
        const BURST_PWR_CAP = 1 << 1;
        /// Current (PL4) limit
        const CURRENT_LIMIT = 1 << 2;
        /// Thermal limit
        const THERMAL_LIMIT = 1 << 3;
        /// Power supply alert
        const PSU_ALERT = 1 << 4;
        /// Software range clamp
        const SW_RANGE = 1 << 5;
        /// Hardware range clamp
        const HW_RANGE = 1 << 6;
    }
}

impl ThrottleReasons {
    /// Human-readable names of the set flags
    pub fn active_reasons(&self) -> Vec<&'static str> {
        let mut reasons = Vec::new();
        if self.contains(Self::AVE_PWR_CAP) {
            reasons.push("PL1");
        }
        if self.contains(Self::BURST_PWR_CAP) {
            reasons.push("PL2");
        }
        if self.contains(Self::CURRENT_LIMIT) {
            reasons.push("PL4");
        }
        if self.contains(Self::THERMAL_LIMIT) {
            reasons.push("Thermal");
        }
        if self.contains(Self::PSU_ALERT) {
            reasons.push("PSU Alert");
        }
        if self.contains(Self::SW_RANGE) {
            reasons.push("SW Range");
        }
        if self.contains(Self::HW_RANGE) {
            reasons.push("HW Range");
        }
        reasons
    }
}

/// Static properties of a frequency domain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyProperties {
    /// Clock domain
    pub domain: FrequencyDomain,
    /// Whether the handle lives on a subdevice
    pub on_subdevice: bool,
    /// Subdevice id (0 when not on a subdevice)
    pub subdevice_id: u32,
    /// Whether the range can be changed
    pub can_control: bool,
    /// Whether throttle events are reported
    pub is_throttle_event_supported: bool,
    /// Lowest frequency the hardware supports
    pub min: f64,
    /// Highest frequency the hardware supports
    pub max: f64,
}

/// Snapshot of the current frequency state
///
/// Fields that could not be read hold [`FREQUENCY_UNKNOWN`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyState {
    /// Current voltage in volts
    pub current_voltage: f64,
    /// Frequency requested by the driver
    pub request: f64,
    /// Frequency sustainable at TDP
    pub tdp: f64,
    /// Most power-efficient frequency
    pub efficient: f64,
    /// Frequency the hardware is actually running at
    pub actual: f64,
    /// Active throttle reasons
    pub throttle_reasons: ThrottleReasons,
}

impl Default for FrequencyState {
    fn default() -> Self {
        Self {
            current_voltage: FREQUENCY_UNKNOWN,
            request: FREQUENCY_UNKNOWN,
            tdp: FREQUENCY_UNKNOWN,
            efficient: FREQUENCY_UNKNOWN,
            actual: FREQUENCY_UNKNOWN,
            throttle_reasons: ThrottleReasons::empty(),
        }
    }
}

/// Synthesize the discrete clock list for a [min, max] range and step
pub fn clock_grid(min: f64, max: f64, step: f64) -> Vec<f64> {
    if step <= 0.0 || max < min {
        return Vec::new();
    }
    let count = ((max - min) / step).round() as usize + 1;
    (0..count).map(|i| (min + step * i as f64).round()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_request() {
        assert!(FrequencyRange::defaults().is_default_request());
        assert!(FrequencyRange::new(-1.2, -0.6).is_default_request());
        assert!(!FrequencyRange::new(-1.0, 300.0).is_default_request());
    }

    #[test]
    fn test_range_validation() {
        assert!(FrequencyRange::new(300.0, 1200.0).validate().is_ok());
        assert!(FrequencyRange::new(600.0, 600.0).validate().is_ok());
        assert!(FrequencyRange::new(1200.0, 300.0).validate().is_err());
    }

    #[test]
    fn test_clock_grid_whole_step() {
        let clocks = clock_grid(300.0, 500.0, 50.0);
        assert_eq!(clocks, vec![300.0, 350.0, 400.0, 450.0, 500.0]);
    }

    #[test]
    fn test_clock_grid_fractional_step() {
        let clocks = clock_grid(300.0, 400.0, 50.0 / 3.0);
        assert_eq!(
            clocks,
            vec![300.0, 317.0, 333.0, 350.0, 367.0, 383.0, 400.0]
        );
    }

    #[test]
    fn test_clock_grid_degenerate() {
        assert_eq!(clock_grid(0.0, 0.0, 50.0), vec![0.0]);
        assert!(clock_grid(500.0, 300.0, 50.0).is_empty());
    }

    #[test]
    fn test_throttle_reason_names() {
        let reasons = ThrottleReasons::AVE_PWR_CAP | ThrottleReasons::THERMAL_LIMIT;
        assert_eq!(reasons.active_reasons(), vec!["PL1", "Thermal"]);
        assert!(ThrottleReasons::empty().active_reasons().is_empty());
    }

    #[test]
    fn test_state_default_is_unknown() {
        let state = FrequencyState::default();
        assert_eq!(state.actual, FREQUENCY_UNKNOWN);
        assert!(state.throttle_reasons.is_empty());
    }
}
