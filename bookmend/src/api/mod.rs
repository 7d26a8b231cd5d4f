//! HTTP API handlers

pub mod catalog;
pub mod fixes;
pub mod health;
pub mod pipeline;
pub mod worker;

pub use catalog::catalog_routes;
pub use fixes::fix_routes;
pub use health::health_routes;
pub use pipeline::pipeline_routes;
pub use worker::worker_routes;
