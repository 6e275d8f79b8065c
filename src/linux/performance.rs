//! Sysfs performance factor backend
//!
//! The factor files hold a raw multiplier; the value is `raw * scale`, with
//! the scale read from the companion `.scale` file.

use crate::domain::{
    EngineType, FrequencyDomain, HardwareInfo, PerformanceProperties, ProductFamily,
    HALF_PERFORMANCE_FACTOR, MAX_PERFORMANCE_FACTOR,
};
use crate::error::SysmanError;
use crate::sysfs::{FsAccess, KeyScope, PathResolver, SysfsKey, SysfsLocation};
use crate::sysman::OsPerformance;

use std::path::PathBuf;
use std::sync::Arc;

const MULTIPLIER_EPSILON: f64 = 1e-6;

fn factor_keys(engine: EngineType) -> Option<(SysfsKey, SysfsKey)> {
    match engine {
        EngineType::Media => Some((
            SysfsKey::MediaFrequencyFactor,
            SysfsKey::MediaFrequencyFactorScale,
        )),
        EngineType::Compute => Some((
            SysfsKey::BaseFrequencyFactor,
            SysfsKey::BaseFrequencyFactorScale,
        )),
        EngineType::Other => None,
    }
}

fn family_supports(family: ProductFamily, engine: EngineType) -> bool {
    match engine {
        EngineType::Media => matches!(family, ProductFamily::Dg2 | ProductFamily::Pvc),
        EngineType::Compute => family == ProductFamily::Pvc,
        EngineType::Other => false,
    }
}

/// Performance factor of one engine class
pub struct LinuxPerformance {
    fs: Arc<dyn FsAccess>,
    engine: EngineType,
    subdevice: Option<u32>,
    supported: bool,
    files: Option<(PathBuf, PathBuf)>,
}

impl LinuxPerformance {
    pub fn new(
        fs: Arc<dyn FsAccess>,
        card_dir: PathBuf,
        resolver: PathResolver,
        subdevice: Option<u32>,
        engine: EngineType,
        hardware: HardwareInfo,
    ) -> Self {
        let tile = subdevice.unwrap_or(0);
        let gt = resolver
            .gt_id(tile, FrequencyDomain::Gpu, subdevice.is_some())
            .unwrap_or(tile);
        let location = SysfsLocation::new(tile, gt);
        let per_tile = resolver.probe_per_tile(fs.as_ref(), &card_dir, KeyScope::Gt, location);

        let files = factor_keys(engine).and_then(|(factor, scale)| {
            Some((
                card_dir.join(resolver.resolve(factor, location, per_tile)?),
                card_dir.join(resolver.resolve(scale, location, per_tile)?),
            ))
        });

        let supported = family_supports(hardware.family, engine)
            && files.as_ref().is_some_and(|(factor, _)| fs.file_exists(factor));

        Self {
            fs,
            engine,
            subdevice,
            supported,
            files,
        }
    }

    fn files(&self) -> Result<&(PathBuf, PathBuf), SysmanError> {
        self.files
            .as_ref()
            .ok_or_else(|| SysmanError::Unsupported(format!("{} performance factor", self.engine)))
    }

    fn multiplier(&self) -> Result<f64, SysmanError> {
        let (factor, scale) = self.files()?;
        Ok(self.fs.read_f64(factor)? * self.fs.read_f64(scale)?)
    }

    fn set_multiplier(&self, multiplier: f64) -> Result<(), SysmanError> {
        let (factor, scale) = self.files()?;
        let scale = self.fs.read_f64(scale)?;
        if scale <= 0.0 {
            return Err(SysmanError::Unknown(format!(
                "invalid scale {} for {} factor",
                scale, self.engine
            )));
        }
        let raw = (multiplier / scale).round() as u64;
        self.fs.write_u64(factor, raw)?;
        log::info!("Set {} frequency multiplier to {}", self.engine, multiplier);
        Ok(())
    }
}

impl OsPerformance for LinuxPerformance {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn properties(&self) -> PerformanceProperties {
        PerformanceProperties {
            on_subdevice: self.subdevice.is_some(),
            subdevice_id: self.subdevice.unwrap_or(0),
            engine: self.engine,
        }
    }

    fn factor(&self) -> Result<f64, SysmanError> {
        let multiplier = self.multiplier()?;
        match self.engine {
            EngineType::Media if (multiplier - 1.0).abs() < MULTIPLIER_EPSILON => {
                Ok(MAX_PERFORMANCE_FACTOR)
            }
            EngineType::Media if (multiplier - 0.5).abs() < MULTIPLIER_EPSILON => {
                Ok(HALF_PERFORMANCE_FACTOR)
            }
            EngineType::Media => Err(SysmanError::Unknown(format!(
                "unexpected media frequency multiplier {}",
                multiplier
            ))),
            _ => Ok(multiplier * MAX_PERFORMANCE_FACTOR),
        }
    }

    fn set_factor(&self, factor: f64) -> Result<(), SysmanError> {
        let multiplier = match self.engine {
            EngineType::Media if factor > HALF_PERFORMANCE_FACTOR => 1.0,
            EngineType::Media => 0.5,
            _ => factor / MAX_PERFORMANCE_FACTOR,
        };
        self.set_multiplier(multiplier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockFs;
    use crate::sysfs::KmdGeneration;

    const CARD: &str = "/sys/class/drm/card0";
    const SCALE: &str = "0.000244140625";

    fn gt(file: &str) -> String {
        format!("{}/gt/gt0/{}", CARD, file)
    }

    fn factor_fs() -> MockFs {
        MockFs::new()
            .with_file(gt("media_freq_factor"), 4096)
            .with_file(gt("media_freq_factor.scale"), SCALE)
            .with_file(gt("base_freq_factor"), 2048)
            .with_file(gt("base_freq_factor.scale"), SCALE)
    }

    fn backend(
        fs: Arc<MockFs>,
        generation: KmdGeneration,
        engine: EngineType,
        device_id: u16,
    ) -> LinuxPerformance {
        LinuxPerformance::new(
            fs,
            PathBuf::from(CARD),
            PathResolver::new(generation),
            None,
            engine,
            HardwareInfo::from_device_id(device_id),
        )
    }

    #[test]
    fn test_support_requires_prelim_family_and_file() {
        let fs = Arc::new(factor_fs());
        let pvc = 0x0bd5;
        assert!(backend(fs.clone(), KmdGeneration::I915Prelim, EngineType::Media, pvc).is_supported());
        assert!(backend(fs.clone(), KmdGeneration::I915Prelim, EngineType::Compute, pvc).is_supported());
        assert!(!backend(fs.clone(), KmdGeneration::I915Prelim, EngineType::Other, pvc).is_supported());
        assert!(!backend(fs.clone(), KmdGeneration::I915Upstream, EngineType::Media, pvc).is_supported());
        assert!(!backend(fs.clone(), KmdGeneration::I915Prelim, EngineType::Compute, 0x56a0).is_supported());

        let empty = Arc::new(MockFs::new().with_dir(format!("{}/gt/gt0", CARD)));
        assert!(!backend(empty, KmdGeneration::I915Prelim, EngineType::Media, pvc).is_supported());
    }

    #[test]
    fn test_media_factor_is_quantized() {
        let fs = Arc::new(factor_fs());
        let media = backend(fs.clone(), KmdGeneration::I915Prelim, EngineType::Media, 0x0bd5);
        assert_eq!(media.factor().unwrap(), 100.0);

        media.set_factor(50.0).unwrap();
        assert_eq!(fs.contents(gt("media_freq_factor")).as_deref(), Some("2048"));
        assert_eq!(media.factor().unwrap(), 50.0);

        media.set_factor(51.0).unwrap();
        assert_eq!(fs.contents(gt("media_freq_factor")).as_deref(), Some("4096"));
        assert_eq!(media.factor().unwrap(), 100.0);
    }

    #[test]
    fn test_unexpected_media_multiplier_is_unknown() {
        let fs = Arc::new(factor_fs().with_file(gt("media_freq_factor"), 1024));
        let media = backend(fs, KmdGeneration::I915Prelim, EngineType::Media, 0x0bd5);
        assert!(matches!(media.factor(), Err(SysmanError::Unknown(_))));
    }

    #[test]
    fn test_compute_factor_scales_multiplier() {
        let fs = Arc::new(factor_fs());
        let compute = backend(fs.clone(), KmdGeneration::I915Prelim, EngineType::Compute, 0x0bd5);
        assert_eq!(compute.factor().unwrap(), 50.0);

        compute.set_factor(25.0).unwrap();
        assert_eq!(fs.contents(gt("base_freq_factor")).as_deref(), Some("1024"));
        assert_eq!(compute.factor().unwrap(), 25.0);
    }
}
