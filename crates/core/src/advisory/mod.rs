pub mod classifier;
pub mod orchestrator;

pub use classifier::classify;
pub use orchestrator::AdvisoryOrchestrator;
