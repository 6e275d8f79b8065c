//! Service layer for domain control operations
//!
//! Services apply configured targets to domain handles, honoring dry-run.

pub mod frequency_service;
pub mod performance_service;

pub use frequency_service::FrequencyService;
pub use performance_service::PerformanceService;
