pub mod cost;
pub mod delay;
pub mod discovery;
pub mod enrichment;
pub mod filter;
pub mod orchestrator;
pub mod repository;
pub mod research;
pub mod risk;
pub mod scheduling;
pub mod search;
pub mod stats;

pub use cost::{CostInput, CostResult, LandedCostCalculator};
pub use orchestrator::Pipeline;
pub use stats::RunStats;
