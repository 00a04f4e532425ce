pub mod db;
pub mod error;
pub mod model;
pub mod monitor;
pub mod registry;

pub use db::device;
pub use error::{DeviceError, Result};
pub use model::{Device, DeviceFilter, DeviceStatus, DEFAULT_REPORTING_INTERVAL};
pub use monitor::LivenessMonitor;
pub use registry::DeviceRegistry;
