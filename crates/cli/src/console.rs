//! Operator console.
//!
//! Reads one command per line and hands chat to the supervisor:
//!
//! | Input | Action |
//! |-------|--------|
//! | `/quit` | stop everything and exit |
//! | `/clear` | clear the screen and reprint help |
//! | `/java <text>`, `/stateful <text>` | send through Java |
//! | `/bedrock <text>`, `/datagram <text>` | send through Bedrock |
//! | other text | send through the default session |
//! | empty line | nothing |
//!
//! End of input is treated as `/quit`.

use std::future::Future;
use std::io::Write;

use afk::{ConnectionSupervisor, Edition, RouteError, SendError};
use anyhow::{Context, Result};
use colored::Colorize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::info;

use crate::styles::tag;

const PROMPT: &str = "> ";
const CLEAR_SCREEN: &str = "\x1B[2J\x1B[1;1H";

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
	Quit,
	Clear,
	/// Chat for an explicit edition, or the default one when `None`.
	Send { edition: Option<Edition>, text: String },
	/// An edition command with nothing to send.
	MissingText(Edition),
	Empty,
}

impl Command {
	pub fn parse(line: &str) -> Self {
		let line = line.trim();
		match line {
			"" => return Command::Empty,
			"/quit" => return Command::Quit,
			"/clear" => return Command::Clear,
			_ => {}
		}

		let (head, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
		let edition = head.strip_prefix('/').and_then(|name| name.parse::<Edition>().ok());

		match edition {
			Some(edition) if rest.trim().is_empty() => Command::MissingText(edition),
			Some(edition) => Command::Send {
				edition: Some(edition),
				text: rest.trim().to_string(),
			},
			None => Command::Send {
				edition: None,
				text: line.to_string(),
			},
		}
	}
}

/// Why the console loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
	Quit,
	EndOfInput,
	Interrupted,
}

/// Line-oriented command loop over arbitrary input and output.
pub struct CommandRouter<R, W> {
	input: R,
	output: W,
}

impl<R, W> CommandRouter<R, W>
where
	R: AsyncBufRead + Unpin,
	W: Write,
{
	pub fn new(input: R, output: W) -> Self {
		Self { input, output }
	}

	/// Runs until `/quit`, end of input, or `shutdown` resolves.
	///
	/// `shutdown` yields the name of whatever asked for the stop.
	pub async fn run<S>(&mut self, supervisor: &ConnectionSupervisor, shutdown: S) -> Result<Exit>
	where
		S: Future<Output = &'static str>,
	{
		tokio::pin!(shutdown);
		self.print_help("Chat input enabled. Type messages to send to the server.")?;

		loop {
			self.prompt()?;
			let mut line = String::new();

			tokio::select! {
				signal = &mut shutdown => {
					writeln!(self.output)?;
					info!(target = "afk", signal, "received {signal}, shutting down");
					return Ok(Exit::Interrupted);
				}
				read = self.input.read_line(&mut line) => {
					if read.context("Failed to read console input")? == 0 {
						writeln!(self.output)?;
						return Ok(Exit::EndOfInput);
					}
					if self.execute(Command::parse(&line), supervisor).await? {
						return Ok(Exit::Quit);
					}
				}
			}
		}
	}

	/// Executes one command. Returns `true` when the console should exit.
	pub async fn execute(&mut self, command: Command, supervisor: &ConnectionSupervisor) -> Result<bool> {
		match command {
			Command::Quit => return Ok(true),
			Command::Clear => {
				write!(self.output, "{CLEAR_SCREEN}")?;
				self.print_help("Console cleared. Chat input enabled.")?;
			}
			Command::Send { edition, text } => {
				let outcome = supervisor.route(edition, &text).await;
				self.report(outcome, &text)?;
			}
			Command::MissingText(edition) => {
				writeln!(self.output, "Usage: /{} <message>", edition.name())?;
			}
			Command::Empty => {}
		}
		Ok(false)
	}

	fn report(&mut self, outcome: std::result::Result<Edition, RouteError>, text: &str) -> Result<()> {
		match outcome {
			Ok(edition) => writeln!(self.output, "{} Sending: {text}", tag(edition))?,
			Err(RouteError::NoSession) => writeln!(self.output, "{}", "No clients are connected".yellow())?,
			Err(RouteError::Disabled(edition))
			| Err(RouteError::Send {
				edition,
				source: SendError::NotConnected,
			}) => writeln!(self.output, "{} {}", tag(edition), "Client is not connected or disabled".yellow())?,
			Err(RouteError::Send { edition, source }) => {
				writeln!(self.output, "{} {}", tag(edition), format!("Failed to send: {source}").red())?
			}
		}
		Ok(())
	}

	fn prompt(&mut self) -> Result<()> {
		write!(self.output, "{PROMPT}")?;
		self.output.flush().context("Failed to flush console")
	}

	fn print_help(&mut self, heading: &str) -> Result<()> {
		writeln!(self.output, "{}", heading.bold())?;
		for line in [
			r#"Use "/java <message>" to send a message from the Java client"#,
			r#"Use "/bedrock <message>" to send a message from the Bedrock client"#,
			r#"Use "/clear" to clear the console"#,
			r#"Use "/quit" to disconnect and exit"#,
		] {
			writeln!(self.output, "{line}")?;
		}
		Ok(())
	}
}
