pub mod chain;
pub mod config;
pub mod constants;
pub mod errors;
pub mod metrics;
pub mod pricing;
pub mod storage;
pub mod utils;
