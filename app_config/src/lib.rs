pub mod clap;
pub mod config;
pub mod log_level_wrapper;
pub mod rolling_appender_rotation;
pub mod secret_string;

pub use crate::clap::ClapArgs;
pub use crate::config::AppConfig;
