//! Configuration value objects

mod app_config;
mod naming;

pub use app_config::{AppConfig, DEFAULT_FILE_STEM, DEFAULT_LOG_LEVEL};
pub use naming::NamingPolicy;
