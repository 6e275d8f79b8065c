//! Telemetry temperature backend

use crate::domain::{max_packed_byte, ProductFamily, TemperatureProperties, TemperatureSensor};
use crate::error::SysmanError;
use crate::pmt::tables::{
    vr_temperature_key, KEY_CORE_TEMPERATURES, KEY_SOC_TEMPERATURES, KEY_VRAM_TEMPERATURES,
    MAX_VR_SENSORS,
};
use crate::pmt::PlatformMonitoringTech;
use crate::sysfs::{FsAccess, KeyScope, PathResolver, SysfsKey, SysfsLocation, SysfsValueUnit};
use crate::sysman::OsTemperature;

use std::path::Path;
use std::sync::Arc;

/// Sensors a telemetry set can report
pub fn sensors_for(pmt: &PlatformMonitoringTech) -> Vec<TemperatureSensor> {
    let mut sensors = Vec::new();
    if pmt.has_key(KEY_SOC_TEMPERATURES) {
        sensors.push(TemperatureSensor::Global);
    }
    if pmt.has_key(KEY_CORE_TEMPERATURES) {
        sensors.push(TemperatureSensor::Gpu);
    }
    if pmt.has_key(KEY_VRAM_TEMPERATURES) {
        sensors.push(TemperatureSensor::Memory);
    }
    sensors.extend(
        (0..MAX_VR_SENSORS)
            .filter(|i| pmt.has_key(&vr_temperature_key(*i)))
            .map(TemperatureSensor::VoltageRegulator),
    );
    sensors
}

/// Shutdown temperature used when the driver does not report one
fn default_max_temperature(family: ProductFamily, sensor: TemperatureSensor) -> f64 {
    match (family, sensor) {
        (_, TemperatureSensor::Memory) => 85.0,
        (_, TemperatureSensor::VoltageRegulator(_)) => 125.0,
        (ProductFamily::Pvc, _) => 105.0,
        (ProductFamily::Dg2, _) => 100.0,
        _ => 95.0,
    }
}

/// One telemetry-backed temperature sensor
pub struct LinuxTemperature {
    pmt: Option<Arc<PlatformMonitoringTech>>,
    subdevice: Option<u32>,
    properties: TemperatureProperties,
}

impl LinuxTemperature {
    pub fn new(
        fs: &dyn FsAccess,
        card_dir: &Path,
        resolver: PathResolver,
        subdevice: Option<u32>,
        sensor: TemperatureSensor,
        family: ProductFamily,
        pmt: Option<Arc<PlatformMonitoringTech>>,
    ) -> Self {
        let location = SysfsLocation::new(subdevice.unwrap_or(0), 0);
        let per_tile = resolver.probe_per_tile(fs, card_dir, KeyScope::Tile, location);
        let key = SysfsKey::CriticalTemperature;
        let critical = resolver
            .resolve(key, location, per_tile)
            .and_then(|p| fs.read_f64(&card_dir.join(p)).ok())
            .map(|raw| resolver.from_native(key, raw, SysfsValueUnit::Unit));

        Self {
            pmt,
            subdevice,
            properties: TemperatureProperties {
                sensor,
                on_subdevice: subdevice.is_some(),
                subdevice_id: subdevice.unwrap_or(0),
                max_temperature: critical
                    .unwrap_or_else(|| default_max_temperature(family, sensor)),
                is_critical_temp_supported: critical.is_some(),
            },
        }
    }

    fn packed_max(
        &self,
        pmt: &PlatformMonitoringTech,
        key: &str,
        bytes: usize,
    ) -> Result<f64, SysmanError> {
        let word = if bytes > 4 {
            pmt.read_u64(key, self.subdevice)?
        } else {
            u64::from(pmt.read_u32(key, self.subdevice)?)
        };
        Ok(f64::from(max_packed_byte(word, bytes)))
    }

    fn voltage_regulator(&self, pmt: &PlatformMonitoringTech, index: u32) -> Result<f64, SysmanError> {
        let raw = pmt.read_u32(&vr_temperature_key(index), self.subdevice)?;
        if index == 0 {
            // Deci-degrees
            Ok(f64::from(raw) / 10.0)
        } else {
            Ok(f64::from(raw & 0xff))
        }
    }
}

impl OsTemperature for LinuxTemperature {
    fn properties(&self) -> TemperatureProperties {
        self.properties
    }

    fn reading(&self) -> Result<f64, SysmanError> {
        let pmt = self.pmt.as_ref().ok_or_else(|| {
            SysmanError::DependencyUnavailable("no telemetry for temperature".to_string())
        })?;

        match self.properties.sensor {
            TemperatureSensor::Global => {
                let mut hottest = self
                    .packed_max(pmt, KEY_SOC_TEMPERATURES, 8)?
                    .max(self.packed_max(pmt, KEY_CORE_TEMPERATURES, 8)?);
                if pmt.has_key(KEY_VRAM_TEMPERATURES) {
                    hottest = hottest.max(self.packed_max(pmt, KEY_VRAM_TEMPERATURES, 4)?);
                }
                Ok(hottest)
            }
            TemperatureSensor::Gpu => self.packed_max(pmt, KEY_CORE_TEMPERATURES, 8),
            TemperatureSensor::Memory => self.packed_max(pmt, KEY_VRAM_TEMPERATURES, 4),
            TemperatureSensor::VoltageRegulator(index) => self.voltage_regulator(pmt, index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockFs;
    use crate::pmt::{key_offset_table, PMT_CLASS_DIR};
    use crate::sysfs::KmdGeneration;

    const CARD: &str = "/sys/class/drm/card0";
    const ROOT: &str = "/sys/devices/pci0000:00/0000:00:01.0";
    const PVC_GUID: &str = "0xb15a0edc";

    fn telemetry(values: &[(&str, u64, usize)]) -> MockFs {
        let table = key_offset_table(PVC_GUID).unwrap();
        let mut region = vec![0u8; 0x400];
        for (key, value, width) in values {
            let offset = table.offset(key).unwrap() as usize;
            region[offset..offset + width].copy_from_slice(&value.to_le_bytes()[..*width]);
        }
        let dir = format!("{}/intel_pmt/telem2", ROOT);
        MockFs::new()
            .with_symlink(format!("{}/telem2", PMT_CLASS_DIR), &dir)
            .with_file(format!("{}/guid", dir), PVC_GUID)
            .with_file(format!("{}/offset", dir), 0)
            .with_binary(format!("{}/telem", dir), region)
    }

    fn sensor(fs: MockFs, sensor: TemperatureSensor, with_pmt: bool) -> LinuxTemperature {
        let fs: Arc<dyn FsAccess> = Arc::new(fs);
        let pmt = if with_pmt {
            PlatformMonitoringTech::create(fs.clone(), Path::new(ROOT)).map(Arc::new)
        } else {
            None
        };
        LinuxTemperature::new(
            fs.as_ref(),
            Path::new(CARD),
            PathResolver::new(KmdGeneration::Xe),
            None,
            sensor,
            ProductFamily::Pvc,
            pmt,
        )
    }

    #[test]
    fn test_sensor_list_follows_telemetry_keys() {
        let fs: Arc<dyn FsAccess> = Arc::new(telemetry(&[]));
        let pmt = PlatformMonitoringTech::create(fs, Path::new(ROOT)).unwrap();
        assert_eq!(
            sensors_for(&pmt),
            vec![
                TemperatureSensor::Global,
                TemperatureSensor::Gpu,
                TemperatureSensor::Memory,
                TemperatureSensor::VoltageRegulator(0),
                TemperatureSensor::VoltageRegulator(1),
                TemperatureSensor::VoltageRegulator(2),
                TemperatureSensor::VoltageRegulator(3),
            ]
        );
    }

    #[test]
    fn test_packed_readings() {
        let values = [
            (KEY_SOC_TEMPERATURES, 0x0000_0000_2d40_3a31, 8),
            (KEY_CORE_TEMPERATURES, 0x0000_3c00_3700_0000, 8),
            (KEY_VRAM_TEMPERATURES, 0x0000_0046, 4),
        ];
        let global = sensor(telemetry(&values), TemperatureSensor::Global, true);
        assert_eq!(global.reading().unwrap(), 0x46 as f64);

        let gpu = sensor(telemetry(&values), TemperatureSensor::Gpu, true);
        assert_eq!(gpu.reading().unwrap(), 0x3c as f64);

        let memory = sensor(telemetry(&values), TemperatureSensor::Memory, true);
        assert_eq!(memory.reading().unwrap(), 0x46 as f64);
    }

    #[test]
    fn test_voltage_regulator_rule() {
        let vr0 = vr_temperature_key(0);
        let vr2 = vr_temperature_key(2);
        let values = [(vr0.as_str(), 455, 4), (vr2.as_str(), 0x1234_5641, 4)];

        let first = sensor(telemetry(&values), TemperatureSensor::VoltageRegulator(0), true);
        assert_eq!(first.reading().unwrap(), 45.5);

        let third = sensor(telemetry(&values), TemperatureSensor::VoltageRegulator(2), true);
        assert_eq!(third.reading().unwrap(), 0x41 as f64);
    }

    #[test]
    fn test_no_telemetry_is_dependency_unavailable() {
        let temp = sensor(MockFs::new(), TemperatureSensor::Gpu, false);
        assert!(matches!(
            temp.reading(),
            Err(SysmanError::DependencyUnavailable(_))
        ));
    }

    #[test]
    fn test_critical_temperature_from_sysfs() {
        let fs = MockFs::new().with_file(format!("{}/device/tile0/temp_crit", CARD), 98_000);
        let temp = sensor(fs, TemperatureSensor::Global, false);
        assert!(temp.properties().is_critical_temp_supported);
        assert_eq!(temp.properties().max_temperature, 98.0);

        let temp = sensor(MockFs::new(), TemperatureSensor::Memory, false);
        assert!(!temp.properties().is_critical_temp_supported);
        assert_eq!(temp.properties().max_temperature, 85.0);
    }
}
