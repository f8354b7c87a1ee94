//! Intent execution pipeline: parse, dry-run, execute, record.

pub mod executor;
pub mod orchestrator;
pub mod parser;
pub mod simulator;

pub use orchestrator::Orchestrator;
pub use parser::ActionRegistry;
