//! Performance factor service
//!
//! Applies configured per-engine performance factors.

use crate::domain::{EngineType, PerformanceFactor};
use crate::error::ServiceError;
use crate::sysman::Performance;

/// Service for managing performance factors
pub struct PerformanceService {
    media: Option<PerformanceFactor>,
    compute: Option<PerformanceFactor>,
    dry_run: bool,
}

impl PerformanceService {
    /// Create a new performance service
    pub fn new(
        media: Option<PerformanceFactor>,
        compute: Option<PerformanceFactor>,
        dry_run: bool,
    ) -> Self {
        Self {
            media,
            compute,
            dry_run,
        }
    }

    /// Configured factor for an engine
    pub fn target_for(&self, engine: EngineType) -> Option<PerformanceFactor> {
        match engine {
            EngineType::Media => self.media,
            EngineType::Compute => self.compute,
            EngineType::Other => None,
        }
    }

    /// Apply the configured factor for the domain's engine
    pub fn apply_factor(
        &self,
        domain: &Performance,
    ) -> Result<Option<PerformanceFactor>, ServiceError> {
        let engine = domain.properties().engine;
        let Some(factor) = self.target_for(engine) else {
            return Ok(None);
        };

        if self.dry_run {
            log::info!(
                "DRY RUN: Would set {} performance factor to {}",
                engine,
                factor
            );
            return Ok(Some(factor));
        }

        domain.set_factor(factor.value())?;
        log::debug!("Applied {} performance factor {}", engine, factor);

        Ok(Some(factor))
    }

    /// Check if in dry-run mode
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PerformanceProperties;
    use crate::error::SysmanError;
    use crate::sysman::OsPerformance;
    use std::sync::{Arc, Mutex};

    struct Engine {
        engine: EngineType,
        factor: Mutex<f64>,
    }

    impl OsPerformance for Arc<Engine> {
        fn is_supported(&self) -> bool {
            true
        }

        fn properties(&self) -> PerformanceProperties {
            PerformanceProperties {
                on_subdevice: false,
                subdevice_id: 0,
                engine: self.engine,
            }
        }

        fn factor(&self) -> Result<f64, SysmanError> {
            Ok(*self.factor.lock().unwrap())
        }

        fn set_factor(&self, factor: f64) -> Result<(), SysmanError> {
            *self.factor.lock().unwrap() = factor;
            Ok(())
        }
    }

    fn domain(engine: EngineType) -> (Performance, Arc<Engine>) {
        let fake = Arc::new(Engine {
            engine,
            factor: Mutex::new(100.0),
        });
        (Performance::try_new(Box::new(fake.clone())).unwrap(), fake)
    }

    #[test]
    fn test_applies_matching_engine_only() {
        let service = PerformanceService::new(None, Some(PerformanceFactor::new(40.0).unwrap()), false);

        let (media, media_fake) = domain(EngineType::Media);
        assert_eq!(service.apply_factor(&media).unwrap(), None);
        assert_eq!(*media_fake.factor.lock().unwrap(), 100.0);

        let (compute, compute_fake) = domain(EngineType::Compute);
        assert_eq!(
            service.apply_factor(&compute).unwrap().map(|f| f.value()),
            Some(40.0)
        );
        assert_eq!(*compute_fake.factor.lock().unwrap(), 40.0);
    }

    #[test]
    fn test_dry_run_does_not_write() {
        let service = PerformanceService::new(Some(PerformanceFactor::new(50.0).unwrap()), None, true);
        let (media, fake) = domain(EngineType::Media);
        assert!(service.apply_factor(&media).unwrap().is_some());
        assert_eq!(*fake.factor.lock().unwrap(), 100.0);
    }
}
