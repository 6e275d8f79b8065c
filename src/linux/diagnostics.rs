//! Firmware diagnostic suite backend
//!
//! The graphics security controller firmware publishes one directory per
//! suite under `device/gsc/diag/`:
//!
//! - `tests`: one test name per line, the line number is the test index
//! - `run`: writing `<start> <end>` executes the tests in that range
//! - `result`: overall outcome of the last run
//! - `test_results`: `<index> <pass|fail>` per executed test

use crate::domain::{DiagProperties, DiagResult, DiagRunReport, DiagTest, DiagTestOutcome};
use crate::error::SysmanError;
use crate::sysfs::FsAccess;
use crate::sysman::OsDiagnostics;

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Suite directory relative to the card directory
pub const DIAG_DIR: &str = "device/gsc/diag";

/// Firmware that executes diagnostic suites
pub trait FirmwareInterface: Send + Sync {
    /// Names of the suites the firmware offers
    fn suites(&self) -> Result<Vec<String>, SysmanError>;

    /// Tests of a suite, in index order
    fn tests(&self, suite: &str) -> Result<Vec<DiagTest>, SysmanError>;

    /// Execute tests `start..=end` of a suite
    fn run(&self, suite: &str, start: u32, end: u32) -> Result<DiagRunReport, SysmanError>;
}

/// Firmware reached through its sysfs directory
pub struct SysfsFirmware {
    fs: Arc<dyn FsAccess>,
    dir: PathBuf,
}

impl SysfsFirmware {
    /// Attach to the firmware of a card, if it exposes diagnostics
    pub fn probe(fs: Arc<dyn FsAccess>, card_dir: &Path) -> Option<Self> {
        let dir = card_dir.join(DIAG_DIR);
        if !fs.directory_exists(&dir) {
            log::debug!("No diagnostics firmware at {}", dir.display());
            return None;
        }
        Some(Self { fs, dir })
    }

    fn suite_file(&self, suite: &str, file: &str) -> PathBuf {
        self.dir.join(suite).join(file)
    }

    fn outcomes(&self, suite: &str, start: u32, end: u32) -> Vec<DiagTestOutcome> {
        let path = self.suite_file(suite, "test_results");
        let Ok(content) = self.fs.read_string(&path) else {
            return Vec::new();
        };

        content
            .lines()
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                let index = fields.next()?.parse::<u32>().ok()?;
                let passed = match fields.next()? {
                    "pass" => true,
                    "fail" => false,
                    other => {
                        log::warn!("Unexpected outcome '{}' for test {}", other, index);
                        return None;
                    }
                };
                Some(DiagTestOutcome { index, passed })
            })
            .filter(|outcome| (start..=end).contains(&outcome.index))
            .collect()
    }
}

impl FirmwareInterface for SysfsFirmware {
    fn suites(&self) -> Result<Vec<String>, SysmanError> {
        Ok(self
            .fs
            .list_directory(&self.dir)?
            .into_iter()
            .filter(|name| self.fs.directory_exists(&self.dir.join(name)))
            .collect())
    }

    fn tests(&self, suite: &str) -> Result<Vec<DiagTest>, SysmanError> {
        let path = self.suite_file(suite, "tests");
        if !self.fs.file_exists(&path) {
            return Ok(Vec::new());
        }

        Ok(self
            .fs
            .read_string(&path)?
            .lines()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .enumerate()
            .map(|(index, name)| DiagTest {
                index: index as u32,
                name: name.to_string(),
            })
            .collect())
    }

    fn run(&self, suite: &str, start: u32, end: u32) -> Result<DiagRunReport, SysmanError> {
        self.fs
            .write_string(&self.suite_file(suite, "run"), &format!("{} {}", start, end))?;

        let raw = self.fs.read_string(&self.suite_file(suite, "result"))?;
        let result = DiagResult::from_firmware(&raw).ok_or_else(|| {
            SysmanError::Unknown(format!("unexpected result '{}' from suite {}", raw, suite))
        })?;

        Ok(DiagRunReport {
            result,
            per_test: self.outcomes(suite, start, end),
        })
    }
}

/// One firmware suite of the device
pub struct LinuxDiagnostics {
    firmware: Option<Arc<dyn FirmwareInterface>>,
    suite: String,
}

impl LinuxDiagnostics {
    pub fn new(firmware: Option<Arc<dyn FirmwareInterface>>, suite: &str) -> Self {
        Self {
            firmware,
            suite: suite.to_string(),
        }
    }

    fn firmware(&self) -> Result<&Arc<dyn FirmwareInterface>, SysmanError> {
        self.firmware.as_ref().ok_or_else(|| {
            SysmanError::DependencyUnavailable("diagnostics firmware interface".to_string())
        })
    }
}

impl OsDiagnostics for LinuxDiagnostics {
    fn is_supported(&self) -> bool {
        self.firmware
            .as_ref()
            .and_then(|fw| fw.suites().ok())
            .is_some_and(|suites| suites.contains(&self.suite))
    }

    fn properties(&self) -> DiagProperties {
        DiagProperties {
            on_subdevice: false,
            subdevice_id: 0,
            name: self.suite.clone(),
            have_tests: self.tests().is_ok_and(|tests| !tests.is_empty()),
        }
    }

    fn tests(&self) -> Result<Vec<DiagTest>, SysmanError> {
        self.firmware()?.tests(&self.suite)
    }

    fn run_tests(&self, start: u32, end: u32) -> Result<DiagRunReport, SysmanError> {
        self.firmware()?.run(&self.suite, start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockFs;

    const CARD: &str = "/sys/class/drm/card0";

    fn suite(file: &str) -> String {
        format!("{}/{}/array/{}", CARD, DIAG_DIR, file)
    }

    fn firmware_fs() -> MockFs {
        MockFs::new()
            .with_file(suite("tests"), "walking_ones\nchecker\n\nmarch_c\n")
            .with_file(suite("run"), "")
            .with_file(suite("result"), "fail_cant_repair")
            .with_file(suite("test_results"), "0 pass\n1 fail\n2 pass\n")
            .with_dir(format!("{}/{}/scan", CARD, DIAG_DIR))
    }

    fn firmware(fs: Arc<MockFs>) -> Arc<dyn FirmwareInterface> {
        Arc::new(SysfsFirmware::probe(fs, Path::new(CARD)).unwrap())
    }

    #[test]
    fn test_probe_requires_directory() {
        let fs: Arc<dyn FsAccess> = Arc::new(MockFs::new().with_dir(CARD));
        assert!(SysfsFirmware::probe(fs, Path::new(CARD)).is_none());
    }

    #[test]
    fn test_suites_and_tests() {
        let fw = firmware(Arc::new(firmware_fs()));
        assert_eq!(fw.suites().unwrap(), vec!["array", "scan"]);

        let tests = fw.tests("array").unwrap();
        assert_eq!(tests.len(), 3);
        assert_eq!(
            tests[2],
            DiagTest {
                index: 2,
                name: "march_c".to_string()
            }
        );
        assert!(fw.tests("scan").unwrap().is_empty());
    }

    #[test]
    fn test_run_writes_request_and_parses_report() {
        let fs = Arc::new(firmware_fs());
        let diag = LinuxDiagnostics::new(Some(firmware(fs.clone())), "array");
        assert!(diag.is_supported());
        assert!(diag.properties().have_tests);
        assert!(!diag.properties().on_subdevice);

        let report = diag.run_tests(1, 2).unwrap();
        assert_eq!(fs.contents(suite("run")).as_deref(), Some("1 2"));
        assert_eq!(report.result, DiagResult::FailCantRepair);
        assert_eq!(report.per_test.len(), 2);
        assert_eq!(report.failed(), vec![1]);
    }

    #[test]
    fn test_missing_firmware() {
        let diag = LinuxDiagnostics::new(None, "array");
        assert!(!diag.is_supported());
        assert!(matches!(
            diag.run_tests(0, 0),
            Err(SysmanError::DependencyUnavailable(_))
        ));
    }

    #[test]
    fn test_unknown_suite_is_unsupported() {
        let diag = LinuxDiagnostics::new(Some(firmware(Arc::new(firmware_fs()))), "memory");
        assert!(!diag.is_supported());
    }
}
