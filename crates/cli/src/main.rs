use afk::{BotConfig, Edition};
use afk_cli::{app, cli::Cli, logging};
use clap::Parser;
use colored::Colorize;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let mut config = match BotConfig::from_env() {
		Ok(config) => config,
		Err(err) => {
			eprintln!("{} {err}", "error:".red().bold());
			std::process::exit(2);
		}
	};
	if let Some(driver) = cli.java_driver {
		config.set_driver(Edition::Java, driver);
	}
	if let Some(driver) = cli.bedrock_driver {
		config.set_driver(Edition::Bedrock, driver);
	}

	// Exit explicitly: the runtime would otherwise wait on the blocking
	// stdin reader during shutdown.
	match app::run(config).await {
		Ok(()) => std::process::exit(0),
		Err(err) => {
			eprintln!("{} {err:#}", "error:".red().bold());
			std::process::exit(1);
		}
	}
}
