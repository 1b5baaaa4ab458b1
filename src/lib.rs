pub mod apis;
pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod limiter;
pub mod logging;
pub mod metrics;
pub mod normalize;
pub mod sample;
pub mod search;
pub mod server;
pub mod types;
