//! HTTP gateway to the readings system of record.
//!
//! [`HttpRecordSystem`] implements [`reading_coverage::record::RecordSystem`]
//! over `reqwest`, configured from the `[record_system]` TOML section.

pub mod client;
pub mod config;
pub mod errors;
pub mod wire;

pub use client::HttpRecordSystem;
pub use config::{GatewayConfig, load_gateway_config_path, load_gateway_config_str};
pub use errors::GatewayInitError;
