pub mod batch_log;
pub mod dashboard;
pub mod notify;
pub mod orchestrator;
