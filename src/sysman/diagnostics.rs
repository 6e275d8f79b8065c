//! Diagnostic suite domains
//!
//! Test execution is delegated to firmware; this layer bounds the request.

use crate::domain::{DiagProperties, DiagRunReport, DiagTest, FIRST_TEST_INDEX, LAST_TEST_INDEX};
use crate::error::SysmanError;
use crate::sysman::os::{OsDiagnostics, OsSysman};

/// One firmware diagnostic suite
pub struct Diagnostics {
    os: Box<dyn OsDiagnostics>,
    properties: DiagProperties,
}

impl Diagnostics {
    /// Keep the suite only if the firmware can drive it
    pub fn try_new(os: Box<dyn OsDiagnostics>) -> Option<Self> {
        if !os.is_supported() {
            return None;
        }
        let properties = os.properties();
        Some(Self { os, properties })
    }

    pub fn properties(&self) -> &DiagProperties {
        &self.properties
    }

    /// Tests of the suite, in index order
    pub fn tests(&self) -> Result<Vec<DiagTest>, SysmanError> {
        self.os.tests()
    }

    /// Run tests `start..=end`
    ///
    /// `LAST_TEST_INDEX` as `end` means "through the last test". Suites
    /// without individual tests only accept the whole-suite bounds.
    pub fn run_tests(&self, start: u32, end: u32) -> Result<DiagRunReport, SysmanError> {
        let (start, end) = self.bounds(start, end)?;
        log::info!(
            "Running diagnostic suite {} tests {}..={}",
            self.properties.name,
            start,
            end
        );
        self.os.run_tests(start, end)
    }

    fn bounds(&self, start: u32, end: u32) -> Result<(u32, u32), SysmanError> {
        if start > end {
            return Err(SysmanError::InvalidArgument(format!(
                "start test {} is after end test {}",
                start, end
            )));
        }

        let tests = self.os.tests()?;
        let Some(last) = tests.iter().map(|t| t.index).max() else {
            if start == FIRST_TEST_INDEX && end == LAST_TEST_INDEX {
                return Ok((start, end));
            }
            return Err(SysmanError::InvalidArgument(format!(
                "suite {} has no individual tests",
                self.properties.name
            )));
        };

        if start > last {
            return Err(SysmanError::InvalidArgument(format!(
                "start test {} is beyond the last test {}",
                start, last
            )));
        }
        Ok((start, end.min(last)))
    }
}

/// Build one device-level domain per suite, dropping suites the firmware cannot run
///
/// Suites run on the device firmware, so tiles do not get their own copies.
pub fn discover(os: &dyn OsSysman) -> Vec<Diagnostics> {
    let suites = os.diagnostic_suites().unwrap_or_else(|e| {
        log::warn!("Cannot list diagnostic suites: {}", e);
        Vec::new()
    });

    suites
        .iter()
        .filter_map(|suite| Diagnostics::try_new(os.create_diagnostics(suite)))
        .collect()
}
