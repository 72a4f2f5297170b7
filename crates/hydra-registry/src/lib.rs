//! Node Registry and Health Monitor (spec §4.2, §4.3).

pub mod discovery;
pub mod health;
pub mod registry;

pub use health::{HealthMonitor, HealthMonitorConfig};
pub use registry::NodeRegistry;
