//! Diagnostics domain types
//!
//! Test suites are executed by firmware; these types describe the request
//! bounds and the per-test outcome.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of the first test in a suite
pub const FIRST_TEST_INDEX: u32 = 0;

/// Sentinel meaning "through the last test in the suite"
pub const LAST_TEST_INDEX: u32 = u32::MAX;

/// Properties of one diagnostics suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagProperties {
    /// Whether the suite lives on a subdevice
    pub on_subdevice: bool,
    /// Subdevice id (0 when not on a subdevice)
    pub subdevice_id: u32,
    /// Suite name
    pub name: String,
    /// Whether individual tests can be listed and selected
    pub have_tests: bool,
}

/// One test inside a suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagTest {
    pub index: u32,
    pub name: String,
}

/// Overall result of a diagnostics run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagResult {
    /// Every selected test passed
    NoErrors,
    /// Firmware aborted the suite
    AbortSuite,
    /// Failures were found and cannot be repaired
    FailCantRepair,
    /// Failures were repaired; a reboot is needed to apply
    RebootForRepair,
}

impl DiagResult {
    /// Parse the result keyword reported by firmware
    pub fn from_firmware(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "no_errors" => Some(Self::NoErrors),
            "abort" => Some(Self::AbortSuite),
            "fail_cant_repair" => Some(Self::FailCantRepair),
            "reboot_for_repair" => Some(Self::RebootForRepair),
            _ => None,
        }
    }
}

impl fmt::Display for DiagResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoErrors => "No errors",
            Self::AbortSuite => "Suite aborted",
            Self::FailCantRepair => "Failed, cannot repair",
            Self::RebootForRepair => "Reboot required for repair",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of a single test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagTestOutcome {
    pub index: u32,
    pub passed: bool,
}

/// Report of a diagnostics run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagRunReport {
    /// Overall result
    pub result: DiagResult,
    /// Per-test outcome, in test index order
    pub per_test: Vec<DiagTestOutcome>,
}

impl DiagRunReport {
    /// Indices of failed tests
    pub fn failed(&self) -> Vec<u32> {
        self.per_test
            .iter()
            .filter(|t| !t.passed)
            .map(|t| t.index)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_parsing() {
        assert_eq!(DiagResult::from_firmware("no_errors"), Some(DiagResult::NoErrors));
        assert_eq!(
            DiagResult::from_firmware(" REBOOT_FOR_REPAIR\n"),
            Some(DiagResult::RebootForRepair)
        );
        assert_eq!(DiagResult::from_firmware("maybe"), None);
    }

    #[test]
    fn test_failed_indices() {
        let report = DiagRunReport {
            result: DiagResult::FailCantRepair,
            per_test: vec![
                DiagTestOutcome { index: 0, passed: true },
                DiagTestOutcome { index: 1, passed: false },
                DiagTestOutcome { index: 2, passed: false },
            ],
        };
        assert_eq!(report.failed(), vec![1, 2]);
    }
}
