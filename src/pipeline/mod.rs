//! Aggregation, validation and rendering stages

pub mod aggregator;
pub mod generator;
pub mod orchestrator;
pub mod validator;

pub use aggregator::aggregate;
pub use generator::ResultGenerator;
pub use orchestrator::{Pipeline, PipelineRun, write_atomic};
pub use validator::{StreamValidator, ValidationReport};
