pub mod budget;
pub mod scheduler;

pub use budget::{OperationCost, RunBudget};
pub use scheduler::KeywordScheduler;
