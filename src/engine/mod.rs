pub mod lifecycle;
pub mod orchestrator;
pub mod proximity;
pub mod rate_limit;
