use app_config::{AppConfig, ClapArgs};
use twitch_chat_notifier::processes::run_main_process;

#[tokio::main]
async fn main() {
  let args = ClapArgs::new();

  let config = match AppConfig::load(args.config_path()) {
    Ok(config) => config,
    Err(error) => {
      eprintln!("Failed to load the config. Reason: {:?}", error);

      std::process::exit(1);
    }
  };

  if args.check_config_flag() {
    println!("Config is valid.");

    return;
  }

  if let Err(error) = twitch_chat_notifier::logging::setup_logging_config(&config) {
    eprintln!("Failed to set up logging. Reason: {}", error);

    std::process::exit(1);
  }

  if let Err(error) = run_main_process(&config).await {
    tracing::error!("The main process stopped. Reason: {}", error);

    std::process::exit(1);
  }
}
