//! Sysfs abstraction layer
//!
//! Provides the raw access collaborator, its real implementation and the
//! layout adapter that maps semantic keys to driver-specific paths.

pub mod access;
pub mod layout;
pub mod traits;

pub use access::SysfsAccess;
pub use layout::{KeyScope, KmdGeneration, PathResolver, SysfsKey, SysfsLocation, SysfsValueUnit};
pub use traits::{DeviceInfo, FsAccess};
