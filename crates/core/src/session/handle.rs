use afk_protocol::Edition;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::LifecycleState;
use crate::error::SendError;

/// Requests delivered to a running session task.
#[derive(Debug)]
pub enum SessionCommand {
	Chat {
		text: String,
		reply: oneshot::Sender<Result<(), SendError>>,
	},
	Stop,
}

/// Owner-side handle to a session task.
///
/// Dropping the handle stops the session.
#[derive(Debug)]
pub struct SessionHandle {
	edition: Edition,
	commands: mpsc::UnboundedSender<SessionCommand>,
	state: watch::Receiver<LifecycleState>,
	logins: watch::Receiver<u64>,
	task: Option<JoinHandle<()>>,
}

impl SessionHandle {
	pub(crate) fn new(
		edition: Edition,
		commands: mpsc::UnboundedSender<SessionCommand>,
		state: watch::Receiver<LifecycleState>,
		logins: watch::Receiver<u64>,
		task: JoinHandle<()>,
	) -> Self {
		Self {
			edition,
			commands,
			state,
			logins,
			task: Some(task),
		}
	}

	pub fn edition(&self) -> Edition {
		self.edition
	}

	/// Current lifecycle state.
	pub fn state(&self) -> LifecycleState {
		*self.state.borrow()
	}

	/// Receiver for lifecycle transitions.
	pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
		self.state.clone()
	}

	/// Receiver for the number of completed handshakes so far.
	pub fn logins(&self) -> watch::Receiver<u64> {
		self.logins.clone()
	}

	pub fn login_count(&self) -> u64 {
		*self.logins.borrow()
	}

	/// Sends a chat line through the session's link.
	///
	/// Fails with [`SendError::NotConnected`] without touching the link unless
	/// the session is connected.
	pub async fn send_chat(&self, text: &str) -> Result<(), SendError> {
		match self.state() {
			LifecycleState::Connected => {}
			LifecycleState::Shutdown => return Err(SendError::Stopped),
			_ => return Err(SendError::NotConnected),
		}

		let (reply, response) = oneshot::channel();
		self.commands
			.send(SessionCommand::Chat {
				text: text.to_string(),
				reply,
			})
			.map_err(|_| SendError::Stopped)?;
		response.await.map_err(|_| SendError::Stopped)?
	}

	/// Stops the session and waits for its task to finish.
	///
	/// Safe to call repeatedly.
	pub async fn stop(&mut self) {
		let Some(task) = self.task.take() else {
			return;
		};
		let _ = self.commands.send(SessionCommand::Stop);
		if let Err(e) = task.await {
			if e.is_panic() {
				tracing::error!(target = "afk", edition = %self.edition, "{} session task panicked", self.edition.tag());
			}
		}
	}

	pub fn is_stopped(&self) -> bool {
		self.task.is_none()
	}
}
