//! Sysfs clock domain backend
//!
//! Limits are written so the hardware never holds `min > max`, even
//! between the two writes of one request.

use crate::domain::{
    FrequencyDomain, FrequencyProperties, FrequencyRange, FrequencyState, ThrottleReasons,
    FREQUENCY_UNKNOWN,
};
use crate::error::SysmanError;
use crate::sysfs::{FsAccess, KeyScope, PathResolver, SysfsKey, SysfsLocation};
use crate::sysman::OsFrequency;

use std::path::PathBuf;
use std::sync::Arc;

const THROTTLE_REASON_KEYS: [(SysfsKey, ThrottleReasons); 4] = [
    (SysfsKey::ThrottleReasonPl1, ThrottleReasons::AVE_PWR_CAP),
    (SysfsKey::ThrottleReasonPl2, ThrottleReasons::BURST_PWR_CAP),
    (SysfsKey::ThrottleReasonPl4, ThrottleReasons::CURRENT_LIMIT),
    (SysfsKey::ThrottleReasonThermal, ThrottleReasons::THERMAL_LIMIT),
];

/// One clock domain backed by sysfs
pub struct LinuxFrequency {
    fs: Arc<dyn FsAccess>,
    card_dir: PathBuf,
    resolver: PathResolver,
    location: SysfsLocation,
    per_tile: bool,
    properties: FrequencyProperties,
    step: f64,
    boost: Option<PathBuf>,
}

impl LinuxFrequency {
    /// Probe the layout and hardware limits of a clock domain
    pub fn new(
        fs: Arc<dyn FsAccess>,
        card_dir: PathBuf,
        resolver: PathResolver,
        location: SysfsLocation,
        domain: FrequencyDomain,
        subdevice: Option<u32>,
        step: f64,
    ) -> Self {
        let per_tile = resolver.probe_per_tile(fs.as_ref(), &card_dir, KeyScope::Gt, location);

        let boost = if resolver.supports_boost_frequency(per_tile) {
            resolver
                .resolve(SysfsKey::BoostFrequency, location, per_tile)
                .map(|p| card_dir.join(p))
                .filter(|p| fs.file_exists(p))
        } else {
            None
        };

        let mut backend = Self {
            fs,
            card_dir,
            resolver,
            location,
            per_tile,
            properties: FrequencyProperties {
                domain,
                on_subdevice: subdevice.is_some(),
                subdevice_id: subdevice.unwrap_or(0),
                can_control: false,
                is_throttle_event_supported: false,
                min: 0.0,
                max: 0.0,
            },
            step,
            boost,
        };

        match (
            backend.read(SysfsKey::MinValueFrequency),
            backend.read(SysfsKey::MaxValueFrequency),
        ) {
            (Ok(min), Ok(max)) => {
                backend.properties.can_control = true;
                backend.properties.min = min;
                backend.properties.max = max;
            }
            (min, max) => {
                log::debug!(
                    "{} clock limits unreadable ({:?}, {:?}), control disabled",
                    domain,
                    min.err(),
                    max.err()
                );
            }
        }

        backend
    }

    fn path(&self, key: SysfsKey) -> Result<PathBuf, SysmanError> {
        self.resolver
            .resolve(key, self.location, self.per_tile)
            .map(|p| self.card_dir.join(p))
            .ok_or_else(|| {
                SysmanError::Unsupported(format!(
                    "{:?} on {}",
                    key,
                    self.resolver.generation()
                ))
            })
    }

    fn read(&self, key: SysfsKey) -> Result<f64, SysmanError> {
        Ok(self.fs.read_f64(&self.path(key)?)?)
    }

    fn write(&self, key: SysfsKey, value: f64) -> Result<(), SysmanError> {
        let path = self.path(key)?;
        self.fs.write_f64(&path, value)?;
        log::debug!("Wrote {} to {}", value, path.display());
        Ok(())
    }

    fn read_or_unknown(&self, key: SysfsKey) -> f64 {
        self.read(key).unwrap_or(FREQUENCY_UNKNOWN)
    }

    fn flag(&self, key: SysfsKey) -> bool {
        self.path(key)
            .ok()
            .and_then(|p| self.fs.read_u64(&p).ok())
            .is_some_and(|v| v != 0)
    }

    /// Write the max limit, mirroring it to the boost ceiling
    fn write_max(&self, value: f64) -> Result<(), SysmanError> {
        self.write(SysfsKey::MaxFrequency, value)?;
        if let Some(boost) = &self.boost {
            self.fs.write_f64(boost, value)?;
        }
        Ok(())
    }

    fn defaults(&self) -> Option<FrequencyRange> {
        if !self.resolver.supports_default_frequency(self.per_tile) {
            return None;
        }
        let min = self.read(SysfsKey::MinDefaultFrequency).ok()?;
        let max = self.read(SysfsKey::MaxDefaultFrequency).ok()?;
        Some(FrequencyRange::new(min, max))
    }
}

impl OsFrequency for LinuxFrequency {
    fn properties(&self) -> FrequencyProperties {
        self.properties
    }

    fn step(&self) -> f64 {
        self.step
    }

    fn range(&self) -> Result<FrequencyRange, SysmanError> {
        Ok(FrequencyRange::new(
            self.read(SysfsKey::MinFrequency)?,
            self.read(SysfsKey::MaxFrequency)?,
        ))
    }

    fn set_range(&self, range: FrequencyRange) -> Result<(), SysmanError> {
        let range = range.rounded();

        if range.is_default_request() {
            if let Some(defaults) = self.defaults() {
                self.write_max(defaults.max)?;
                self.write(SysfsKey::MinFrequency, defaults.min)?;
                log::info!("Restored default {} range {}", self.properties.domain, defaults);
                return Ok(());
            }
        }

        let current_max = self.read(SysfsKey::MaxFrequency)?;
        if range.min > current_max {
            self.write_max(range.max)?;
            self.write(SysfsKey::MinFrequency, range.min)?;
        } else {
            self.write(SysfsKey::MinFrequency, range.min)?;
            self.write_max(range.max)?;
        }

        log::info!("Set {} range to {}", self.properties.domain, range);
        Ok(())
    }

    fn state(&self) -> Result<FrequencyState, SysmanError> {
        let tdp = if self.resolver.supports_tdp_frequency(self.per_tile) {
            self.read_or_unknown(SysfsKey::TdpFrequency)
        } else {
            FREQUENCY_UNKNOWN
        };

        Ok(FrequencyState {
            current_voltage: FREQUENCY_UNKNOWN,
            request: self.read_or_unknown(SysfsKey::RequestFrequency),
            tdp,
            efficient: self.read_or_unknown(SysfsKey::EfficientFrequency),
            actual: self.read_or_unknown(SysfsKey::ActualFrequency),
            throttle_reasons: self.throttle_reasons(),
        })
    }

    fn throttle_reasons(&self) -> ThrottleReasons {
        if !self.flag(SysfsKey::ThrottleReasonStatus) {
            return ThrottleReasons::empty();
        }

        THROTTLE_REASON_KEYS
            .iter()
            .filter(|(key, _)| self.flag(*key))
            .fold(ThrottleReasons::empty(), |mask, (_, reason)| mask | *reason)
    }
}
