use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Default filter directive for a `-v` count.
pub fn filter_for(verbosity: u8) -> &'static str {
	// 0 = lifecycle lines from the bot, warnings from everything else
	// 1 (-v) = debug for the bot's crates (transitions, keep-alive, driver frames)
	// 2+ (-vv) = trace for everything
	match verbosity {
		0 => "warn,afk=info,afk_runtime=info,afk_cli=info",
		1 => "warn,afk=debug,afk_runtime=debug,afk_cli=debug",
		_ => "trace",
	}
}

pub fn init_logging(verbosity: u8) {
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_for(verbosity)));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.compact()
		.init();
}
