//! Driver discovery
//!
//! Resolves where an edition's protocol driver lives. A driver is either a
//! command line (spawned and spoken to over stdio) or a WebSocket URL.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use afk_protocol::Edition;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Environment variable pointing at a directory of `<edition>.js` driver scripts.
pub const DRIVERS_DIR_ENV: &str = "AFK_DRIVERS_DIR";

/// Environment variable overriding the node executable used for `.js` drivers.
pub const NODE_EXE_ENV: &str = "AFK_NODE_EXE";

/// Where to reach a driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEndpoint {
	/// Spawn `program args...` and speak length-prefixed JSON over its stdio.
	Command { program: PathBuf, args: Vec<String> },
	/// Connect to an already running driver.
	WebSocket(String),
}

impl DriverEndpoint {
	/// Interprets a user-supplied endpoint string.
	///
	/// `ws://` and `wss://` URLs select the WebSocket transport. Anything else
	/// is a whitespace-separated command line; a lone `.js` script is run with
	/// node.
	pub fn parse(raw: &str) -> Result<Self> {
		let raw = raw.trim();
		if raw.starts_with("ws://") || raw.starts_with("wss://") {
			return Ok(DriverEndpoint::WebSocket(raw.to_string()));
		}

		let mut parts = raw.split_whitespace().map(str::to_string);
		let program = parts.next().ok_or_else(|| Error::InvalidEndpoint(raw.to_string()))?;
		let args: Vec<String> = parts.collect();

		if is_script(Path::new(&program)) {
			let mut script_args = vec![program];
			script_args.extend(args);
			let node = find_node_executable()?;
			return Ok(DriverEndpoint::Command {
				program: node,
				args: script_args,
			});
		}

		Ok(DriverEndpoint::Command {
			program: PathBuf::from(program),
			args,
		})
	}

	/// Short description for log lines.
	pub fn describe(&self) -> String {
		match self {
			DriverEndpoint::Command { program, args } if args.is_empty() => program.display().to_string(),
			DriverEndpoint::Command { program, args } => format!("{} {}", program.display(), args.join(" ")),
			DriverEndpoint::WebSocket(url) => url.clone(),
		}
	}
}

/// Environment key holding the explicit driver endpoint for `edition`.
pub fn driver_env_key(edition: Edition) -> &'static str {
	match edition {
		Edition::Java => "JAVA_DRIVER",
		Edition::Bedrock => "BEDROCK_DRIVER",
	}
}

/// Resolves the driver for `edition`.
///
/// Search order, first hit wins:
/// 1. `explicit` endpoint (CLI flag or `JAVA_DRIVER` / `BEDROCK_DRIVER`)
/// 2. `$AFK_DRIVERS_DIR/<edition>.js`
/// 3. `<data dir>/afk-bot/drivers/<edition>.js`
///
/// # Errors
///
/// Returns [`Error::DriverNotFound`] if no candidate exists.
pub fn locate_driver(edition: Edition, explicit: Option<&str>) -> Result<DriverEndpoint> {
	if let Some(raw) = explicit.filter(|s| !s.trim().is_empty()) {
		return DriverEndpoint::parse(raw);
	}

	let mut dirs = Vec::new();
	if let Ok(dir) = std::env::var(DRIVERS_DIR_ENV) {
		dirs.push(PathBuf::from(dir));
	}
	if let Some(data) = dirs::data_dir() {
		dirs.push(data.join("afk-bot").join("drivers"));
	}

	let script = find_driver_script(edition, &dirs).ok_or(Error::DriverNotFound {
		edition,
		key: driver_env_key(edition),
	})?;

	debug!(target = "afk", edition = %edition, script = %script.display(), "found driver script");
	let node = find_node_executable()?;
	Ok(DriverEndpoint::Command {
		program: node,
		args: vec![script.display().to_string()],
	})
}

/// Returns the first `<edition>.js` present in `dirs`.
pub fn find_driver_script(edition: Edition, dirs: &[PathBuf]) -> Option<PathBuf> {
	dirs.iter()
		.map(|dir| dir.join(format!("{}.js", edition.name())))
		.find(|candidate| candidate.is_file())
}

fn is_script(path: &Path) -> bool {
	matches!(path.extension().and_then(|e| e.to_str()), Some("js" | "mjs" | "cjs"))
}

/// Finds a runnable node executable.
///
/// `AFK_NODE_EXE` wins when it points at a working node; otherwise `PATH` is
/// searched.
fn find_node_executable() -> Result<PathBuf> {
	let from_path = || {
		which::which("node")
			.map_err(|e| Error::LaunchFailed(format!("Node.js executable not found ({e}). Install Node.js or set {NODE_EXE_ENV}.")))
	};

	match std::env::var(NODE_EXE_ENV) {
		Ok(node) => resolve_node_with_fallback(PathBuf::from(node), from_path),
		Err(_) => from_path(),
	}
}

fn resolve_node_with_fallback<F>(candidate: PathBuf, find_node: F) -> Result<PathBuf>
where
	F: Fn() -> Result<PathBuf>,
{
	if node_is_usable(&candidate) {
		return Ok(candidate);
	}

	warn!(
		target = "afk",
		node = %candidate.display(),
		"{NODE_EXE_ENV} is not runnable; falling back to node on PATH"
	);

	let fallback = find_node()?;
	if fallback == candidate || !node_is_usable(&fallback) {
		return Err(Error::LaunchFailed(format!("No runnable node executable (tried {})", candidate.display())));
	}
	Ok(fallback)
}

fn node_is_usable(node: &Path) -> bool {
	Command::new(node)
		.arg("--version")
		.stdout(Stdio::null())
		.stderr(Stdio::null())
		.status()
		.map(|status| status.success())
		.unwrap_or(false)
}

#[cfg(test)]
mod tests {
	use std::fs;
	#[cfg(unix)]
	use std::os::unix::fs::PermissionsExt;

	use tempfile::TempDir;

	use super::*;

	#[cfg(unix)]
	fn write_mock_node(path: &Path, exit_code: i32) {
		let script = format!("#!/bin/sh\n[ \"$1\" = \"--version\" ]\nexit {}\n", exit_code);
		fs::write(path, script).unwrap();
		let mut perms = fs::metadata(path).unwrap().permissions();
		perms.set_mode(0o755);
		fs::set_permissions(path, perms).unwrap();
	}

	#[test]
	fn websocket_urls_select_websocket_transport() {
		assert_eq!(
			DriverEndpoint::parse("ws://127.0.0.1:8090/java").unwrap(),
			DriverEndpoint::WebSocket("ws://127.0.0.1:8090/java".to_string())
		);
		assert!(matches!(
			DriverEndpoint::parse(" wss://bridge.example/bedrock ").unwrap(),
			DriverEndpoint::WebSocket(_)
		));
	}

	#[test]
	fn command_lines_split_on_whitespace() {
		let endpoint = DriverEndpoint::parse("/usr/local/bin/java-driver --quiet --offline").unwrap();
		assert_eq!(
			endpoint,
			DriverEndpoint::Command {
				program: PathBuf::from("/usr/local/bin/java-driver"),
				args: vec!["--quiet".to_string(), "--offline".to_string()],
			}
		);
		assert_eq!(endpoint.describe(), "/usr/local/bin/java-driver --quiet --offline");
	}

	#[test]
	fn blank_endpoint_is_invalid() {
		assert!(matches!(DriverEndpoint::parse("   "), Err(Error::InvalidEndpoint(_))));
	}

	#[test]
	fn script_lookup_prefers_earlier_directories() {
		let first = TempDir::new().unwrap();
		let second = TempDir::new().unwrap();
		fs::write(second.path().join("bedrock.js"), "// driver").unwrap();
		fs::write(first.path().join("java.js"), "// driver").unwrap();

		let dirs = vec![first.path().to_path_buf(), second.path().to_path_buf()];
		assert_eq!(find_driver_script(Edition::Java, &dirs), Some(first.path().join("java.js")));
		assert_eq!(find_driver_script(Edition::Bedrock, &dirs), Some(second.path().join("bedrock.js")));
	}

	#[test]
	fn script_lookup_misses_cleanly() {
		let empty = TempDir::new().unwrap();
		assert!(find_driver_script(Edition::Java, &[empty.path().to_path_buf()]).is_none());
	}

	#[test]
	fn only_js_files_count_as_scripts() {
		assert!(is_script(Path::new("drivers/java.js")));
		assert!(is_script(Path::new("bedrock.mjs")));
		assert!(!is_script(Path::new("java-driver")));
	}

	#[cfg(unix)]
	#[test]
	fn unusable_node_falls_back() {
		let temp = TempDir::new().unwrap();
		let broken = temp.path().join("broken-node");
		let working = temp.path().join("working-node");
		write_mock_node(&broken, 1);
		write_mock_node(&working, 0);

		let resolved = resolve_node_with_fallback(broken, || Ok(working.clone())).unwrap();
		assert_eq!(resolved, working);
	}

	#[cfg(unix)]
	#[test]
	fn usable_node_is_kept() {
		let temp = TempDir::new().unwrap();
		let node = temp.path().join("node");
		write_mock_node(&node, 0);

		let resolved = resolve_node_with_fallback(node.clone(), || {
			panic!("fallback should not be consulted when the candidate works");
		})
		.unwrap();
		assert_eq!(resolved, node);
	}

	#[cfg(unix)]
	#[test]
	fn same_broken_fallback_is_an_error() {
		let temp = TempDir::new().unwrap();
		let broken = temp.path().join("node");
		write_mock_node(&broken, 1);

		let result = resolve_node_with_fallback(broken.clone(), || Ok(broken.clone()));
		assert!(matches!(result, Err(Error::LaunchFailed(_))));
	}
}
