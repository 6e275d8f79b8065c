//! Sysfs layout adapter
//!
//! Translates semantic keys into concrete sysfs paths for each kernel driver
//! generation. i915 exposes a per-tile nested layout (`gt/gt<N>/...`) and a
//! legacy flat layout (`gt_<key>` at the card root); Xe only has its nested
//! `device/tile<N>/gt<M>/...` layout.

use crate::domain::FrequencyDomain;
use crate::sysfs::traits::FsAccess;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Kernel driver generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KmdGeneration {
    /// Mainline i915
    I915Upstream,
    /// i915 with the prelim uAPI backport
    I915Prelim,
    /// Xe driver
    Xe,
}

impl KmdGeneration {
    /// Detect the generation from the bound driver name
    pub fn detect(driver: &str, has_prelim_marker: bool) -> Option<Self> {
        match driver {
            "xe" => Some(Self::Xe),
            "i915" if has_prelim_marker => Some(Self::I915Prelim),
            "i915" => Some(Self::I915Upstream),
            _ => None,
        }
    }

    /// Kernel module name
    pub fn driver_name(&self) -> &'static str {
        match self {
            Self::I915Upstream | Self::I915Prelim => "i915",
            Self::Xe => "xe",
        }
    }
}

impl fmt::Display for KmdGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I915Upstream => write!(f, "i915"),
            Self::I915Prelim => write!(f, "i915 (prelim)"),
            Self::Xe => write!(f, "xe"),
        }
    }
}

/// Which directory level a key lives under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyScope {
    Gt,
    Tile,
}

/// Semantic sysfs key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SysfsKey {
    MinFrequency,
    MaxFrequency,
    MinDefaultFrequency,
    MaxDefaultFrequency,
    BoostFrequency,
    RequestFrequency,
    TdpFrequency,
    ActualFrequency,
    EfficientFrequency,
    MaxValueFrequency,
    MinValueFrequency,
    ThrottleReasonStatus,
    ThrottleReasonPl1,
    ThrottleReasonPl2,
    ThrottleReasonPl4,
    ThrottleReasonThermal,
    MediaFrequencyFactor,
    MediaFrequencyFactorScale,
    BaseFrequencyFactor,
    BaseFrequencyFactorScale,
    MemoryHealth,
    MemoryTotal,
    MemoryAvailable,
    CriticalTemperature,
}

impl SysfsKey {
    /// Directory level of the key
    pub fn scope(&self) -> KeyScope {
        match self {
            Self::MemoryHealth
            | Self::MemoryTotal
            | Self::MemoryAvailable
            | Self::CriticalTemperature => KeyScope::Tile,
            _ => KeyScope::Gt,
        }
    }
}

/// Tile and GT a key is resolved for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SysfsLocation {
    pub tile: u32,
    pub gt: u32,
}

impl SysfsLocation {
    pub fn new(tile: u32, gt: u32) -> Self {
        Self { tile, gt }
    }
}

/// Unit a sysfs value is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SysfsValueUnit {
    Unit,
    Milli,
    Micro,
}

impl SysfsValueUnit {
    fn exponent(&self) -> i32 {
        match self {
            Self::Unit => 0,
            Self::Milli => -3,
            Self::Micro => -6,
        }
    }
}

/// Convert `value` expressed in `from` units into `to` units
pub fn convert_value(value: f64, from: SysfsValueUnit, to: SysfsValueUnit) -> f64 {
    let shift = from.exponent() - to.exponent();
    // 10^-n has no exact binary form, so scale down by division
    if shift >= 0 {
        value * 10f64.powi(shift)
    } else {
        value / 10f64.powi(-shift)
    }
}

struct KeyPaths {
    per_tile: Option<&'static str>,
    legacy: Option<&'static str>,
}

const fn both(per_tile: &'static str, legacy: &'static str) -> KeyPaths {
    KeyPaths {
        per_tile: Some(per_tile),
        legacy: Some(legacy),
    }
}

const fn nested(per_tile: &'static str) -> KeyPaths {
    KeyPaths {
        per_tile: Some(per_tile),
        legacy: None,
    }
}

const NONE: KeyPaths = KeyPaths {
    per_tile: None,
    legacy: None,
};

/// Path resolver for one kernel driver generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathResolver {
    generation: KmdGeneration,
}

impl PathResolver {
    /// Create a resolver for a driver generation
    pub fn new(generation: KmdGeneration) -> Self {
        Self { generation }
    }

    /// Driver generation this resolver targets
    pub fn generation(&self) -> KmdGeneration {
        self.generation
    }

    fn i915_paths(&self, key: SysfsKey) -> KeyPaths {
        use SysfsKey::*;
        let prelim = self.generation == KmdGeneration::I915Prelim;
        match key {
            MinFrequency => both("gt/gt{gt}/rps_min_freq_mhz", "gt_min_freq_mhz"),
            MaxFrequency => both("gt/gt{gt}/rps_max_freq_mhz", "gt_max_freq_mhz"),
            MinDefaultFrequency => nested("gt/gt{gt}/.defaults/rps_min_freq_mhz"),
            MaxDefaultFrequency => nested("gt/gt{gt}/.defaults/rps_max_freq_mhz"),
            BoostFrequency => both("gt/gt{gt}/rps_boost_freq_mhz", "gt_boost_freq_mhz"),
            RequestFrequency => both("gt/gt{gt}/punit_req_freq_mhz", "gt_cur_freq_mhz"),
            TdpFrequency => both("gt/gt{gt}/rapl_PL1_freq_mhz", "rapl_PL1_freq_mhz"),
            ActualFrequency => both("gt/gt{gt}/rps_act_freq_mhz", "gt_act_freq_mhz"),
            EfficientFrequency => both("gt/gt{gt}/rps_RP1_freq_mhz", "gt_RP1_freq_mhz"),
            MaxValueFrequency => both("gt/gt{gt}/rps_RP0_freq_mhz", "gt_RP0_freq_mhz"),
            MinValueFrequency => both("gt/gt{gt}/rps_RPn_freq_mhz", "gt_RPn_freq_mhz"),
            ThrottleReasonStatus => both(
                "gt/gt{gt}/throttle_reason_status",
                "gt_throttle_reason_status",
            ),
            ThrottleReasonPl1 => both(
                "gt/gt{gt}/throttle_reason_pl1",
                "gt_throttle_reason_status_pl1",
            ),
            ThrottleReasonPl2 => both(
                "gt/gt{gt}/throttle_reason_pl2",
                "gt_throttle_reason_status_pl2",
            ),
            ThrottleReasonPl4 => both(
                "gt/gt{gt}/throttle_reason_pl4",
                "gt_throttle_reason_status_pl4",
            ),
            ThrottleReasonThermal => both(
                "gt/gt{gt}/throttle_reason_thermal",
                "gt_throttle_reason_status_thermal",
            ),
            MediaFrequencyFactor if prelim => nested("gt/gt{gt}/media_freq_factor"),
            MediaFrequencyFactorScale if prelim => nested("gt/gt{gt}/media_freq_factor.scale"),
            BaseFrequencyFactor if prelim => nested("gt/gt{gt}/base_freq_factor"),
            BaseFrequencyFactorScale if prelim => nested("gt/gt{gt}/base_freq_factor.scale"),
            MediaFrequencyFactor
            | MediaFrequencyFactorScale
            | BaseFrequencyFactor
            | BaseFrequencyFactorScale => NONE,
            MemoryHealth => both("device/tile{tile}/memory_health", "memory_health"),
            MemoryTotal => both("device/tile{tile}/lmem_total_bytes", "lmem_total_bytes"),
            MemoryAvailable => both("device/tile{tile}/lmem_avail_bytes", "lmem_avail_bytes"),
            CriticalTemperature => both("device/tile{tile}/temp_crit", "temp_crit"),
        }
    }

    fn xe_paths(&self, key: SysfsKey) -> KeyPaths {
        use SysfsKey::*;
        match key {
            MinFrequency => nested("device/tile{tile}/gt{gt}/freq0/min_freq"),
            MaxFrequency => nested("device/tile{tile}/gt{gt}/freq0/max_freq"),
            RequestFrequency => nested("device/tile{tile}/gt{gt}/freq0/cur_freq"),
            ActualFrequency => nested("device/tile{tile}/gt{gt}/freq0/act_freq"),
            EfficientFrequency => nested("device/tile{tile}/gt{gt}/freq0/rpe_freq"),
            MaxValueFrequency => nested("device/tile{tile}/gt{gt}/freq0/rp0_freq"),
            MinValueFrequency => nested("device/tile{tile}/gt{gt}/freq0/rpn_freq"),
            ThrottleReasonStatus => nested("device/tile{tile}/gt{gt}/freq0/throttle/status"),
            ThrottleReasonPl1 => nested("device/tile{tile}/gt{gt}/freq0/throttle/reason_pl1"),
            ThrottleReasonPl2 => nested("device/tile{tile}/gt{gt}/freq0/throttle/reason_pl2"),
            ThrottleReasonPl4 => nested("device/tile{tile}/gt{gt}/freq0/throttle/reason_pl4"),
            ThrottleReasonThermal => {
                nested("device/tile{tile}/gt{gt}/freq0/throttle/reason_thermal")
            }
            MemoryHealth => nested("device/tile{tile}/memory_health"),
            MemoryTotal => nested("device/tile{tile}/physical_vram_size_bytes"),
            MemoryAvailable => nested("device/tile{tile}/vram_avail_bytes"),
            CriticalTemperature => nested("device/tile{tile}/temp_crit"),
            MinDefaultFrequency
            | MaxDefaultFrequency
            | BoostFrequency
            | TdpFrequency
            | MediaFrequencyFactor
            | MediaFrequencyFactorScale
            | BaseFrequencyFactor
            | BaseFrequencyFactorScale => NONE,
        }
    }

    fn paths(&self, key: SysfsKey) -> KeyPaths {
        match self.generation {
            KmdGeneration::I915Upstream | KmdGeneration::I915Prelim => self.i915_paths(key),
            KmdGeneration::Xe => self.xe_paths(key),
        }
    }

    /// Per-tile base directory for a scope, relative to the card directory
    pub fn base_dir(&self, scope: KeyScope, location: SysfsLocation) -> PathBuf {
        let template = match (self.generation, scope) {
            (KmdGeneration::Xe, KeyScope::Gt) => "device/tile{tile}/gt{gt}",
            (_, KeyScope::Gt) => "gt/gt{gt}",
            (_, KeyScope::Tile) => "device/tile{tile}",
        };
        PathBuf::from(expand(template, location))
    }

    /// Whether the per-tile layout is present for a scope
    ///
    /// Decided once by each controller at construction.
    pub fn probe_per_tile(
        &self,
        fs: &dyn FsAccess,
        card_dir: &Path,
        scope: KeyScope,
        location: SysfsLocation,
    ) -> bool {
        let per_tile = fs.directory_exists(&card_dir.join(self.base_dir(scope, location)));
        log::debug!(
            "{} layout for {:?} scope at tile {} gt {}",
            if per_tile { "per-tile" } else { "legacy" },
            scope,
            location.tile,
            location.gt
        );
        per_tile
    }

    /// Path of `key` relative to the card directory, if this layout exposes it
    pub fn resolve(
        &self,
        key: SysfsKey,
        location: SysfsLocation,
        per_tile: bool,
    ) -> Option<PathBuf> {
        let paths = self.paths(key);
        let template = if per_tile { paths.per_tile } else { paths.legacy }?;
        Some(PathBuf::from(expand(template, location)))
    }

    /// Whether default min/max frequency files are exposed
    pub fn supports_default_frequency(&self, per_tile: bool) -> bool {
        let location = SysfsLocation::default();
        self.resolve(SysfsKey::MinDefaultFrequency, location, per_tile)
            .is_some()
            && self
                .resolve(SysfsKey::MaxDefaultFrequency, location, per_tile)
                .is_some()
    }

    /// Whether a boost frequency file is exposed
    pub fn supports_boost_frequency(&self, per_tile: bool) -> bool {
        self.resolve(SysfsKey::BoostFrequency, SysfsLocation::default(), per_tile)
            .is_some()
    }

    /// Whether a TDP frequency file is exposed
    pub fn supports_tdp_frequency(&self, per_tile: bool) -> bool {
        self.resolve(SysfsKey::TdpFrequency, SysfsLocation::default(), per_tile)
            .is_some()
    }

    /// GT index backing a clock domain on a tile
    ///
    /// Returns `None` when the generation has no GT for that domain.
    pub fn gt_id(&self, tile: u32, domain: FrequencyDomain, has_subdevices: bool) -> Option<u32> {
        match (self.generation, domain) {
            (KmdGeneration::Xe, FrequencyDomain::Gpu) => Some(tile * 2),
            (KmdGeneration::Xe, FrequencyDomain::Media) => Some(tile * 2 + 1),
            (_, FrequencyDomain::Gpu) => Some(tile),
            (_, FrequencyDomain::Media) if has_subdevices => None,
            (_, FrequencyDomain::Media) => Some(1),
        }
    }

    /// Unit the driver uses for a key
    pub fn native_unit(&self, key: SysfsKey) -> SysfsValueUnit {
        match key {
            SysfsKey::CriticalTemperature => SysfsValueUnit::Milli,
            _ => SysfsValueUnit::Unit,
        }
    }

    /// Convert a raw sysfs value into `unit`
    pub fn from_native(&self, key: SysfsKey, raw: f64, unit: SysfsValueUnit) -> f64 {
        convert_value(raw, self.native_unit(key), unit)
    }

    /// Convert a value in `unit` into the driver's unit for `key`
    pub fn to_native(&self, key: SysfsKey, value: f64, unit: SysfsValueUnit) -> f64 {
        convert_value(value, unit, self.native_unit(key))
    }
}

fn expand(template: &str, location: SysfsLocation) -> String {
    template
        .replace("{tile}", &location.tile.to_string())
        .replace("{gt}", &location.gt.to_string())
}
