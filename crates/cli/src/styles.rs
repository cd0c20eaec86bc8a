//! Help output and console styling.

use afk::Edition;
use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use colored::{ColoredString, Colorize};

/// clap styles in cargo's palette.
pub fn cli_styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Green.on_default().bold())
		.usage(AnsiColor::Green.on_default().bold())
		.literal(AnsiColor::Cyan.on_default())
		.placeholder(AnsiColor::Cyan.on_default())
		.valid(AnsiColor::Cyan.on_default())
}

/// Edition tag as shown on the console.
pub fn tag(edition: Edition) -> ColoredString {
	match edition {
		Edition::Java => edition.tag().green().bold(),
		Edition::Bedrock => edition.tag().cyan().bold(),
	}
}
