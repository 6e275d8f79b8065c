//! Clock frequency domains
//!
//! Validates requests against the cached properties and clock grid before
//! handing them to the OS backend.

use crate::domain::{
    clock_grid, FrequencyProperties, FrequencyRange, FrequencyState, ThrottleReasons,
};
use crate::error::SysmanError;
use crate::sysman::os::{OsFrequency, OsSysman};
use crate::sysman::registry::{copy_page, subdevice_ids};

/// One clock domain on one subdevice
pub struct Frequency {
    os: Box<dyn OsFrequency>,
    properties: FrequencyProperties,
    clocks: Vec<f64>,
}

impl Frequency {
    /// Wrap a backend, caching its properties and clock list
    pub fn new(os: Box<dyn OsFrequency>) -> Self {
        let properties = os.properties();
        let clocks = clock_grid(properties.min, properties.max, os.step());
        Self {
            os,
            properties,
            clocks,
        }
    }

    /// Static properties
    pub fn properties(&self) -> &FrequencyProperties {
        &self.properties
    }

    /// Every clock the domain can run at, ascending
    pub fn clocks(&self) -> &[f64] {
        &self.clocks
    }

    /// Two-call enumeration over the clock list
    pub fn available_clocks(&self, count: &mut u32, out: Option<&mut Vec<f64>>) {
        copy_page(&self.clocks, count, out);
    }

    /// Currently applied limits
    pub fn range(&self) -> Result<FrequencyRange, SysmanError> {
        self.os.range()
    }

    /// Apply new limits, or restore the defaults with `(-1, -1)`
    pub fn set_range(&self, range: FrequencyRange) -> Result<(), SysmanError> {
        let range = self.check_range(range)?;
        log::debug!("Setting {} range to {}", self.properties.domain, range);
        self.os.set_range(range)
    }

    /// Round `range` to whole MHz and check it against the clock grid
    ///
    /// Returns the range `set_range` would write, without writing it.
    pub fn check_range(&self, range: FrequencyRange) -> Result<FrequencyRange, SysmanError> {
        if !self.properties.can_control {
            return Err(SysmanError::Unsupported(format!(
                "{} frequency control",
                self.properties.domain
            )));
        }

        let range = range.rounded();
        if !range.is_default_request() {
            range
                .validate()
                .map_err(|e| SysmanError::InvalidArgument(e.to_string()))?;
            for bound in [range.min, range.max] {
                if !self.clocks.contains(&bound) {
                    return Err(SysmanError::InvalidArgument(format!(
                        "{} MHz is not a supported clock",
                        bound
                    )));
                }
            }
        }
        Ok(range)
    }

    /// Live frequencies
    pub fn state(&self) -> Result<FrequencyState, SysmanError> {
        self.os.state()
    }

    /// Currently active throttle reasons
    pub fn throttle_reasons(&self) -> ThrottleReasons {
        self.os.throttle_reasons()
    }
}

/// Build one domain per (subdevice, clock domain) the platform reports
pub fn discover(os: &dyn OsSysman) -> Vec<Frequency> {
    let mut handles = Vec::new();
    for subdevice in subdevice_ids(os.subdevice_count()) {
        let domains = os.frequency_domains(subdevice).unwrap_or_else(|e| {
            log::warn!("Cannot list frequency domains: {}", e);
            Vec::new()
        });
        for domain in domains {
            handles.push(Frequency::new(os.create_frequency(subdevice, domain)));
        }
    }
    handles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FrequencyDomain;
    use std::sync::Mutex;

    struct FakeFrequency {
        properties: FrequencyProperties,
        applied: Mutex<Vec<FrequencyRange>>,
    }

    impl FakeFrequency {
        fn new(can_control: bool) -> Self {
            Self {
                properties: FrequencyProperties {
                    domain: FrequencyDomain::Gpu,
                    on_subdevice: false,
                    subdevice_id: 0,
                    can_control,
                    is_throttle_event_supported: false,
                    min: 300.0,
                    max: 2050.0,
                },
                applied: Mutex::new(Vec::new()),
            }
        }
    }

    impl OsFrequency for std::sync::Arc<FakeFrequency> {
        fn properties(&self) -> FrequencyProperties {
            self.properties
        }

        fn step(&self) -> f64 {
            50.0
        }

        fn range(&self) -> Result<FrequencyRange, SysmanError> {
            Ok(self
                .applied
                .lock()
                .unwrap()
                .last()
                .copied()
                .unwrap_or(FrequencyRange::new(300.0, 2050.0)))
        }

        fn set_range(&self, range: FrequencyRange) -> Result<(), SysmanError> {
            self.applied.lock().unwrap().push(range);
            Ok(())
        }

        fn state(&self) -> Result<FrequencyState, SysmanError> {
            Ok(FrequencyState::default())
        }

        fn throttle_reasons(&self) -> ThrottleReasons {
            ThrottleReasons::THERMAL_LIMIT
        }
    }

    fn domain(can_control: bool) -> (Frequency, std::sync::Arc<FakeFrequency>) {
        let fake = std::sync::Arc::new(FakeFrequency::new(can_control));
        (Frequency::new(Box::new(fake.clone())), fake)
    }

    #[test]
    fn test_clock_list_from_properties() {
        let (freq, _) = domain(true);
        assert_eq!(freq.clocks().len(), 36);
        assert_eq!(freq.clocks()[0], 300.0);
        assert_eq!(freq.clocks()[35], 2050.0);

        let mut count = 0;
        freq.available_clocks(&mut count, None);
        assert_eq!(count, 36);

        let mut count = 3;
        let mut out = Vec::new();
        freq.available_clocks(&mut count, Some(&mut out));
        assert_eq!(out, vec![300.0, 350.0, 400.0]);
    }

    #[test]
    fn test_set_range_rounds_and_forwards() {
        let (freq, fake) = domain(true);
        freq.set_range(FrequencyRange::new(599.6, 1200.2)).unwrap();
        assert_eq!(freq.range().unwrap(), FrequencyRange::new(600.0, 1200.0));
        assert_eq!(fake.applied.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_inverted_range_is_rejected_without_writes() {
        let (freq, fake) = domain(true);
        assert!(matches!(
            freq.set_range(FrequencyRange::new(1200.0, 600.0)),
            Err(SysmanError::InvalidArgument(_))
        ));
        assert!(fake.applied.lock().unwrap().is_empty());
    }

    #[test]
    fn test_off_grid_bound_is_rejected() {
        let (freq, fake) = domain(true);
        assert!(matches!(
            freq.set_range(FrequencyRange::new(610.0, 1200.0)),
            Err(SysmanError::InvalidArgument(_))
        ));
        assert!(matches!(
            freq.set_range(FrequencyRange::new(600.0, 2100.0)),
            Err(SysmanError::InvalidArgument(_))
        ));
        assert!(fake.applied.lock().unwrap().is_empty());
    }

    #[test]
    fn test_default_request_skips_grid_check() {
        let (freq, fake) = domain(true);
        freq.set_range(FrequencyRange::defaults()).unwrap();
        assert_eq!(
            fake.applied.lock().unwrap().as_slice(),
            &[FrequencyRange::defaults()]
        );
    }

    #[test]
    fn test_uncontrollable_domain_is_unsupported() {
        let (freq, fake) = domain(false);
        assert!(matches!(
            freq.set_range(FrequencyRange::new(600.0, 1200.0)),
            Err(SysmanError::Unsupported(_))
        ));
        assert!(fake.applied.lock().unwrap().is_empty());
        assert_eq!(freq.throttle_reasons(), ThrottleReasons::THERMAL_LIMIT);
    }
}
