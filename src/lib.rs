pub mod cache;
pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod reporting;
pub mod sources;
pub mod utils;
