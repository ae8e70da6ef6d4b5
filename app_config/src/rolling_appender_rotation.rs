use anyhow::anyhow;
use std::path::Path;
use tracing_appender::rolling::{self, RollingFileAppender};

/// How often the log file in `logging_dir` is rotated. Read case-insensitively from
/// `minutely`, `hourly`, `daily` or `never`.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RollingAppenderRotation {
  Minutely,
  Hourly,
  #[default]
  Daily,
  Never,
  /// Rejected once the appender is built.
  Unknown(String),
}

impl RollingAppenderRotation {
  pub fn to_file_appender<P: AsRef<Path>>(
    self,
    logging_dir: P,
    filename_prefix: P,
  ) -> anyhow::Result<RollingFileAppender> {
    match self {
      Self::Minutely => Ok(rolling::minutely(logging_dir, filename_prefix)),
      Self::Hourly => Ok(rolling::hourly(logging_dir, filename_prefix)),
      Self::Daily => Ok(rolling::daily(logging_dir, filename_prefix)),
      Self::Never => Ok(rolling::never(logging_dir, filename_prefix)),
      Self::Unknown(value) => Err(anyhow!(
        "Unknown log rotation `{}`. Expected one of minutely, hourly, daily or never.",
        value
      )),
    }
  }
}

impl<S> From<S> for RollingAppenderRotation
where
  S: AsRef<str>,
{
  fn from(rotation: S) -> Self {
    match rotation.as_ref().trim().to_lowercase().as_str() {
      "minutely" => Self::Minutely,
      "hourly" => Self::Hourly,
      "daily" => Self::Daily,
      "never" => Self::Never,
      _ => Self::Unknown(rotation.as_ref().to_string()),
    }
  }
}

impl From<RollingAppenderRotation> for String {
  fn from(rotation: RollingAppenderRotation) -> Self {
    match rotation {
      RollingAppenderRotation::Minutely => "minutely".to_string(),
      RollingAppenderRotation::Hourly => "hourly".to_string(),
      RollingAppenderRotation::Daily => "daily".to_string(),
      RollingAppenderRotation::Never => "never".to_string(),
      RollingAppenderRotation::Unknown(value) => value,
    }
  }
}
