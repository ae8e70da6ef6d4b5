use app_config::AppConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEPENDENCY_LOG_LEVEL: &str = "warn";

pub fn setup_logging_config(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
  let Some(log_level) = config.log_level() else {
    println!("Logging is disabled.");

    return Ok(());
  };

  let filter_string = format!(
    "{},reqwest={dependency_level},hyper={dependency_level}",
    log_level,
    dependency_level = DEPENDENCY_LOG_LEVEL
  );
  let env_filter = EnvFilter::new(filter_string);

  let subscriber_builder = tracing_subscriber::fmt()
    .with_env_filter(env_filter)
    .with_ansi(false);

  if let Some(logging_dir) = config.logging_dir() {
    println!("Logging to file");

    let filename_prefix = PathBuf::from(config.logging_filename_prefix());
    let logging_file = config.logging_file_roll_appender().clone();

    subscriber_builder
      .with_writer(logging_file.to_file_appender(logging_dir.to_path_buf(), filename_prefix)?)
      .init();
  } else {
    println!("Logging to stdout.");

    subscriber_builder.init();
  }

  Ok(())
}
