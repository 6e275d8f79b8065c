//! Frequency range service
//!
//! Applies a configured clock range to frequency domains.

use crate::domain::FrequencyRange;
use crate::error::ServiceError;
use crate::sysman::Frequency;

/// Service for managing clock limits
pub struct FrequencyService {
    target_range: Option<FrequencyRange>,
    dry_run: bool,
}

impl FrequencyService {
    /// Create a new frequency service
    pub fn new(target_range: Option<FrequencyRange>, dry_run: bool) -> Self {
        Self {
            target_range,
            dry_run,
        }
    }

    /// Apply the configured range to a domain
    pub fn apply_range(&self, domain: &Frequency) -> Result<Option<FrequencyRange>, ServiceError> {
        let Some(range) = self.target_range else {
            return Ok(None);
        };
        range.validate()?;

        let properties = domain.properties();
        let range = domain.check_range(range)?;

        if self.dry_run {
            log::info!(
                "DRY RUN: Would set {} range to {}",
                properties.domain,
                range
            );
            return Ok(Some(range));
        }

        domain.set_range(range)?;
        log::debug!("Applied {} range {}", properties.domain, range);

        Ok(Some(range))
    }

    /// Restore the hardware default range of a domain
    pub fn reset(&self, domain: &Frequency) -> Result<(), ServiceError> {
        let properties = domain.properties();
        if self.dry_run {
            log::info!("DRY RUN: Would restore default {} range", properties.domain);
            return Ok(());
        }

        domain.set_range(FrequencyRange::defaults())?;
        log::debug!("Restored default {} range", properties.domain);
        Ok(())
    }

    /// Get the configured target range
    pub fn target_range(&self) -> Option<FrequencyRange> {
        self.target_range
    }

    /// Check if in dry-run mode
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FrequencyDomain, FrequencyProperties, FrequencyState, ThrottleReasons};
    use crate::error::SysmanError;
    use crate::sysman::OsFrequency;
    use std::sync::{Arc, Mutex};

    struct Recorder {
        can_control: bool,
        applied: Mutex<Vec<FrequencyRange>>,
    }

    impl OsFrequency for Arc<Recorder> {
        fn properties(&self) -> FrequencyProperties {
            FrequencyProperties {
                domain: FrequencyDomain::Gpu,
                on_subdevice: false,
                subdevice_id: 0,
                can_control: self.can_control,
                is_throttle_event_supported: false,
                min: 300.0,
                max: 1300.0,
            }
        }

        fn step(&self) -> f64 {
            50.0
        }

        fn range(&self) -> Result<FrequencyRange, SysmanError> {
            Ok(FrequencyRange::new(300.0, 1300.0))
        }

        fn set_range(&self, range: FrequencyRange) -> Result<(), SysmanError> {
            self.applied.lock().unwrap().push(range);
            Ok(())
        }

        fn state(&self) -> Result<FrequencyState, SysmanError> {
            Ok(FrequencyState::default())
        }

        fn throttle_reasons(&self) -> ThrottleReasons {
            ThrottleReasons::empty()
        }
    }

    fn domain(can_control: bool) -> (Frequency, Arc<Recorder>) {
        let recorder = Arc::new(Recorder {
            can_control,
            applied: Mutex::new(Vec::new()),
        });
        (Frequency::new(Box::new(recorder.clone())), recorder)
    }

    #[test]
    fn test_no_target_is_noop() {
        let (freq, recorder) = domain(true);
        let service = FrequencyService::new(None, false);
        assert_eq!(service.apply_range(&freq).unwrap(), None);
        assert!(recorder.applied.lock().unwrap().is_empty());
    }

    #[test]
    fn test_dry_run_does_not_write() {
        let (freq, recorder) = domain(true);
        let service = FrequencyService::new(Some(FrequencyRange::new(500.0, 900.0)), true);
        assert!(service.is_dry_run());
        assert_eq!(
            service.apply_range(&freq).unwrap(),
            Some(FrequencyRange::new(500.0, 900.0))
        );
        service.reset(&freq).unwrap();
        assert!(recorder.applied.lock().unwrap().is_empty());
    }

    #[test]
    fn test_apply_and_reset() {
        let (freq, recorder) = domain(true);
        let service = FrequencyService::new(Some(FrequencyRange::new(500.0, 900.0)), false);
        service.apply_range(&freq).unwrap();
        service.reset(&freq).unwrap();
        assert_eq!(
            recorder.applied.lock().unwrap().as_slice(),
            &[FrequencyRange::new(500.0, 900.0), FrequencyRange::defaults()]
        );
    }

    #[test]
    fn test_inverted_target_fails_validation() {
        let (freq, _) = domain(true);
        let service = FrequencyService::new(Some(FrequencyRange::new(900.0, 500.0)), true);
        assert!(matches!(
            service.apply_range(&freq),
            Err(ServiceError::Domain(_))
        ));
    }

    #[test]
    fn test_dry_run_rejects_off_grid_target() {
        let (freq, recorder) = domain(true);
        let service = FrequencyService::new(Some(FrequencyRange::new(510.0, 900.0)), true);
        assert!(matches!(
            service.apply_range(&freq),
            Err(ServiceError::Sysman(SysmanError::InvalidArgument(_)))
        ));
        assert!(recorder.applied.lock().unwrap().is_empty());
    }

    #[test]
    fn test_dry_run_reports_rounded_range() {
        let (freq, _) = domain(true);
        let service = FrequencyService::new(Some(FrequencyRange::new(499.7, 900.2)), true);
        assert_eq!(
            service.apply_range(&freq).unwrap(),
            Some(FrequencyRange::new(500.0, 900.0))
        );
    }

    #[test]
    fn test_uncontrollable_domain() {
        let (freq, _) = domain(false);
        let service = FrequencyService::new(Some(FrequencyRange::new(500.0, 900.0)), true);
        assert!(matches!(
            service.apply_range(&freq),
            Err(ServiceError::Sysman(SysmanError::Unsupported(_)))
        ));
    }
}
