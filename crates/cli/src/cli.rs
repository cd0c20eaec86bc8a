use clap::Parser;

use crate::styles::cli_styles;

#[derive(Parser, Debug)]
#[command(name = "afk")]
#[command(about = "Keeps an idle presence on Java and Bedrock servers and relays console chat")]
#[command(version)]
#[command(styles = cli_styles())]
#[command(after_help = "Connection settings come from the environment (JAVA_ENABLED, HOST, PORT, BEDROCK_ENABLED, ...).")]
pub struct Cli {
	/// Increase verbosity (-v debug, -vv trace)
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Java driver: a command line or ws:// URL (overrides JAVA_DRIVER)
	#[arg(long, value_name = "ENDPOINT")]
	pub java_driver: Option<String>,

	/// Bedrock driver: a command line or ws:// URL (overrides BEDROCK_DRIVER)
	#[arg(long, value_name = "ENDPOINT")]
	pub bedrock_driver: Option<String>,
}
