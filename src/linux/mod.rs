//! Linux sysfs backend
//!
//! Builds every domain backend from sysfs nodes under the DRM card
//! directory and the PMT telemetry nodes of the device's PCI hierarchy.

pub mod device;
pub mod diagnostics;
pub mod frequency;
pub mod memory;
pub mod performance;
pub mod temperature;

pub use device::DrmDevice;
pub use diagnostics::{FirmwareInterface, LinuxDiagnostics, SysfsFirmware};
pub use frequency::LinuxFrequency;
pub use memory::LinuxMemory;
pub use performance::LinuxPerformance;
pub use temperature::LinuxTemperature;

use crate::domain::{EngineType, FrequencyDomain, HardwareInfo, TemperatureSensor};
use crate::error::SysmanError;
use crate::pmt::PlatformMonitoringTech;
use crate::sysfs::{DeviceInfo, FsAccess, KeyScope, PathResolver, SysfsLocation};
use crate::sysman::{
    OsDiagnostics, OsFrequency, OsMemory, OsPerformance, OsSysman, OsTemperature,
};

use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::sync::Arc;

/// Linux platform for one device
pub struct LinuxSysman {
    fs: Arc<dyn FsAccess>,
    device: Arc<dyn DeviceInfo>,
    resolver: PathResolver,
    pmt: OnceCell<Option<Arc<PlatformMonitoringTech>>>,
    firmware: Option<Arc<dyn FirmwareInterface>>,
}

impl LinuxSysman {
    pub fn new(fs: Arc<dyn FsAccess>, device: Arc<dyn DeviceInfo>) -> Self {
        let resolver = PathResolver::new(device.kmd_generation());
        let firmware = SysfsFirmware::probe(fs.clone(), device.sysfs_dir())
            .map(|fw| Arc::new(fw) as Arc<dyn FirmwareInterface>);
        Self {
            fs,
            device,
            resolver,
            pmt: OnceCell::new(),
            firmware,
        }
    }

    /// Builder: replace the firmware interface used for diagnostics
    pub fn with_firmware(mut self, firmware: Arc<dyn FirmwareInterface>) -> Self {
        self.firmware = Some(firmware);
        self
    }

    /// Telemetry of the device, discovered on first use
    pub fn telemetry(&self) -> Option<Arc<PlatformMonitoringTech>> {
        self.pmt
            .get_or_init(|| {
                let pmt = PlatformMonitoringTech::create(
                    self.fs.clone(),
                    self.device.pci_root_path(),
                );
                if pmt.is_none() {
                    log::debug!(
                        "No telemetry under {}",
                        self.device.pci_root_path().display()
                    );
                }
                pmt.map(Arc::new)
            })
            .clone()
    }

    fn card_dir(&self) -> PathBuf {
        self.device.sysfs_dir().to_path_buf()
    }

    fn has_subdevices(&self) -> bool {
        self.device.subdevice_count() > 0
    }
}

impl OsSysman for LinuxSysman {
    fn subdevice_count(&self) -> u32 {
        self.device.subdevice_count()
    }

    fn hardware_info(&self) -> HardwareInfo {
        self.device.hardware_info()
    }

    fn frequency_domains(
        &self,
        subdevice: Option<u32>,
    ) -> Result<Vec<FrequencyDomain>, SysmanError> {
        let mut domains = vec![FrequencyDomain::Gpu];

        if self.device.hardware_info().supports_images() {
            let tile = subdevice.unwrap_or(0);
            let media_gt = self
                .resolver
                .gt_id(tile, FrequencyDomain::Media, self.has_subdevices());
            if let Some(gt) = media_gt {
                let location = SysfsLocation::new(tile, gt);
                let dir = self
                    .card_dir()
                    .join(self.resolver.base_dir(KeyScope::Gt, location));
                if self.fs.directory_exists(&dir) {
                    domains.push(FrequencyDomain::Media);
                }
            }
        }

        Ok(domains)
    }

    fn create_frequency(
        &self,
        subdevice: Option<u32>,
        domain: FrequencyDomain,
    ) -> Box<dyn OsFrequency> {
        let tile = subdevice.unwrap_or(0);
        let gt = self
            .resolver
            .gt_id(tile, domain, self.has_subdevices())
            .unwrap_or(tile);
        Box::new(LinuxFrequency::new(
            self.fs.clone(),
            self.card_dir(),
            self.resolver,
            SysfsLocation::new(tile, gt),
            domain,
            subdevice,
            self.device.hardware_info().family.frequency_step(),
        ))
    }

    fn create_memory(&self, subdevice: Option<u32>) -> Box<dyn OsMemory> {
        let hardware = self.device.hardware_info();
        let pmt = if hardware.has_local_memory() {
            self.telemetry()
        } else {
            None
        };
        Box::new(LinuxMemory::new(
            self.fs.clone(),
            self.card_dir(),
            self.resolver,
            subdevice,
            hardware,
            pmt,
        ))
    }

    fn create_performance(
        &self,
        subdevice: Option<u32>,
        engine: EngineType,
    ) -> Box<dyn OsPerformance> {
        Box::new(LinuxPerformance::new(
            self.fs.clone(),
            self.card_dir(),
            self.resolver,
            subdevice,
            engine,
            self.device.hardware_info(),
        ))
    }

    fn temperature_sensors(
        &self,
        _subdevice: Option<u32>,
    ) -> Result<Vec<TemperatureSensor>, SysmanError> {
        Ok(self
            .telemetry()
            .map(|pmt| temperature::sensors_for(&pmt))
            .unwrap_or_default())
    }

    fn create_temperature(
        &self,
        subdevice: Option<u32>,
        sensor: TemperatureSensor,
    ) -> Box<dyn OsTemperature> {
        Box::new(LinuxTemperature::new(
            self.fs.as_ref(),
            self.device.sysfs_dir(),
            self.resolver,
            subdevice,
            sensor,
            self.device.hardware_info().family,
            self.telemetry(),
        ))
    }

    fn diagnostic_suites(&self) -> Result<Vec<String>, SysmanError> {
        match &self.firmware {
            Some(firmware) => firmware.suites(),
            None => Ok(Vec::new()),
        }
    }

    fn create_diagnostics(&self, suite: &str) -> Box<dyn OsDiagnostics> {
        Box::new(LinuxDiagnostics::new(self.firmware.clone(), suite))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockDevice, MockFs};
    use crate::pmt::PMT_CLASS_DIR;
    use crate::sysfs::KmdGeneration;

    const ROOT: &str = "/sys/devices/pci0000:00/0000:00:01.0";

    fn platform(fs: MockFs, device: MockDevice) -> LinuxSysman {
        LinuxSysman::new(Arc::new(fs), Arc::new(device))
    }

    #[test]
    fn test_media_domain_needs_directory() {
        let dg2 = HardwareInfo::from_device_id(0x56a0);
        let flat = platform(MockFs::new(), MockDevice::new(dg2));
        assert_eq!(flat.frequency_domains(None).unwrap(), vec![FrequencyDomain::Gpu]);

        let nested = platform(
            MockFs::new().with_dir("/sys/class/drm/card0/gt/gt1"),
            MockDevice::new(dg2),
        );
        assert_eq!(
            nested.frequency_domains(None).unwrap(),
            vec![FrequencyDomain::Gpu, FrequencyDomain::Media]
        );
    }

    #[test]
    fn test_xe_media_gt_per_tile() {
        let dg2 = HardwareInfo::from_device_id(0x56a0);
        let fs = MockFs::new().with_dir("/sys/class/drm/card0/device/tile1/gt3");
        let xe = platform(
            fs,
            MockDevice::new(dg2)
                .with_generation(KmdGeneration::Xe)
                .with_subdevices(2),
        );
        assert_eq!(xe.frequency_domains(Some(0)).unwrap(), vec![FrequencyDomain::Gpu]);
        assert_eq!(
            xe.frequency_domains(Some(1)).unwrap(),
            vec![FrequencyDomain::Gpu, FrequencyDomain::Media]
        );
    }

    #[test]
    fn test_no_telemetry_means_no_sensors() {
        let sysman = platform(
            MockFs::new().with_dir(PMT_CLASS_DIR),
            MockDevice::new(HardwareInfo::from_device_id(0x56a0)),
        );
        assert!(sysman.telemetry().is_none());
        assert!(sysman.temperature_sensors(None).unwrap().is_empty());
    }

    #[test]
    fn test_telemetry_is_discovered_once() {
        let dir = format!("{}/intel_pmt/telem1", ROOT);
        let fs = MockFs::new()
            .with_symlink(format!("{}/telem1", PMT_CLASS_DIR), &dir)
            .with_file(format!("{}/guid", dir), "0x4f9302")
            .with_file(format!("{}/offset", dir), 0)
            .with_binary(format!("{}/telem", dir), vec![0u8; 0x400]);
        let sysman = platform(fs, MockDevice::new(HardwareInfo::from_device_id(0x56a0)));

        let first = sysman.telemetry().unwrap();
        let second = sysman.telemetry().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            sysman.temperature_sensors(None).unwrap(),
            vec![
                TemperatureSensor::Global,
                TemperatureSensor::Gpu,
                TemperatureSensor::Memory
            ]
        );
    }

    #[test]
    fn test_diagnostics_without_firmware() {
        let sysman = platform(
            MockFs::new(),
            MockDevice::new(HardwareInfo::from_device_id(0x0bd5)),
        );
        assert!(sysman.diagnostic_suites().unwrap().is_empty());
        assert!(!sysman.create_diagnostics("array").is_supported());
    }

    #[test]
    fn test_diagnostics_suite_listed_once_per_device() {
        let diag = "/sys/class/drm/card0/device/gsc/diag/array";
        let fs = MockFs::new()
            .with_file(format!("{}/tests", diag), "walking_ones\nchecker")
            .with_file(format!("{}/run", diag), "")
            .with_file(format!("{}/result", diag), "no_errors");
        let tiled = MockDevice::new(HardwareInfo::from_device_id(0x0bd5)).with_subdevices(2);
        let sysman = crate::sysman::Sysman::new(Box::new(platform(fs, tiled)));

        let suites: Vec<_> = sysman
            .diagnostics()
            .iter()
            .map(|d| d.properties().clone())
            .collect();
        assert_eq!(suites.len(), 1);
        assert_eq!(suites[0].name, "array");
        assert!(!suites[0].on_subdevice);
    }
}
