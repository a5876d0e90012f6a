//! Status messages flowing from the worker to whatever is showing them

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

pub fn status_channel() -> (StatusSink, StatusFeed) {
	let (tx, rx) = mpsc::channel();
	(StatusSink { tx }, StatusFeed { rx })
}

/// Worker side. Every update is also logged.
#[derive(Clone, Debug)]
pub struct StatusSink {
	tx: Sender<String>,
}

impl StatusSink {
	pub fn update(&self, msg: impl Into<String>) {
		let msg = msg.into();
		tracing::info!("[status] {msg}");
		// a closed window must not take the worker down with it
		let _ = self.tx.send(msg);
	}
}

/// UI side
#[derive(Debug)]
pub struct StatusFeed {
	rx: Receiver<String>,
}

impl StatusFeed {
	/// Consume everything queued, keep the newest. Never blocks.
	pub fn drain_latest(&self) -> Option<String> {
		let mut latest = None;
		loop {
			match self.rx.try_recv() {
				Ok(msg) => latest = Some(msg),
				Err(TryRecvError::Empty | TryRecvError::Disconnected) => return latest,
			}
		}
	}

	/// Consume everything queued, oldest first
	pub fn drain_all(&self) -> Vec<String> {
		self.rx.try_iter().collect()
	}
}
