pub mod config;
pub mod error;
pub mod telemetry;
pub mod types;

pub use config::{Config, CostConfig, DiscoveryConfig, EnrichmentConfig, SchedulerConfig};
pub use error::SourcingError;
pub use types::*;
