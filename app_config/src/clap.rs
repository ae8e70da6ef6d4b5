use clap::{Arg, Command};
use std::path::PathBuf;

pub struct ClapArgs {
  args: clap::ArgMatches,
}

impl ClapArgs {
  const CONFIG_PATH: &'static str = "config_path";
  const CHECK_CONFIG: &'static str = "check_config";

  pub fn new() -> Self {
    let args = Self::setup_args().get_matches();

    Self { args }
  }

  /// The config path passed in with `--config`, if any.
  ///
  /// Takes priority over the `CONFIG_PATH` environment variable.
  pub fn config_path(&self) -> Option<PathBuf> {
    self
      .args
      .get_one::<String>(Self::CONFIG_PATH)
      .map(PathBuf::from)
  }

  pub fn check_config_flag(&self) -> bool {
    self.args.get_flag(Self::CHECK_CONFIG)
  }

  fn setup_args() -> Command {
    Command::new("Twitch Chat Notifier")
      .arg(
        Arg::new(Self::CONFIG_PATH)
          .short('c')
          .long("config")
          .action(clap::ArgAction::Set)
          .help("Path to the YAML config file. Defaults to ./config/config.yml."),
      )
      .arg(
        Arg::new(Self::CHECK_CONFIG)
          .long("check-config")
          .action(clap::ArgAction::SetTrue)
          .help("Loads and validates the config, then exits without connecting."),
      )
  }
}

impl Default for ClapArgs {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn config_path_is_read_from_the_long_flag() {
    let args = ClapArgs {
      args: ClapArgs::setup_args().get_matches_from(["notifier", "--config", "./other.yml"]),
    };

    assert_eq!(args.config_path(), Some(PathBuf::from("./other.yml")));
    assert!(!args.check_config_flag());
  }

  #[test]
  fn no_flags_means_no_overrides() {
    let args = ClapArgs {
      args: ClapArgs::setup_args().get_matches_from(["notifier", "--check-config"]),
    };

    assert_eq!(args.config_path(), None);
    assert!(args.check_config_flag());
  }
}
