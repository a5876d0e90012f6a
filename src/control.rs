//! Pause/stop gating shared between the control surface and the worker.
//!
//! The window (or console) holds a [`Controller`]; the worker holds a [`Gate`].
//! Both sides see the same [`RunState`] through a `tokio::sync::watch` channel,
//! so a worker parked in [`Gate::sleep`] wakes the moment the user presses a button.

use std::{sync::Arc, time::Duration};

use tokio::sync::watch;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RunState {
	Running,
	Paused,
	/// Terminal; nothing leaves this state
	Stopped,
}

/// Why the worker had to drop what it was doing
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Interrupted {
	#[error("task paused")]
	Paused,
	#[error("task stopped")]
	Stopped,
}

/// What a control action actually did, so the UI can pick its label
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
	Changed,
	AlreadyInState,
	/// The process is stopping; pause/resume no longer apply
	Rejected,
}

/// A user request from the window or the console
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Action {
	Pause,
	Resume,
	Stop,
}

impl Action {
	/// Console spelling: `p`/`pause`, `s`/`start`/`resume`, `q`/`stop`/`quit`
	pub fn parse(input: &str) -> Option<Self> {
		match input.trim().to_ascii_lowercase().as_str() {
			"p" | "pause" => Some(Action::Pause),
			"s" | "start" | "resume" => Some(Action::Resume),
			"q" | "stop" | "quit" | "exit" => Some(Action::Stop),
			_ => None,
		}
	}

	/// Status line for the result of applying this action
	pub fn describe(self, outcome: Outcome) -> &'static str {
		match (self, outcome) {
			(Action::Pause, Outcome::Changed) => "Paused by user, press Start to continue",
			(Action::Pause, Outcome::AlreadyInState) => "Task is already paused",
			(Action::Resume, Outcome::Changed) => "Started by user, running the learning flow",
			(Action::Resume, Outcome::AlreadyInState) => "Task is already running",
			(Action::Pause | Action::Resume, Outcome::Rejected) => "Process is stopping, cannot continue",
			(Action::Stop, _) => "Stopping: closing Chrome and exiting",
		}
	}
}

/// Build a linked controller/gate pair. Starts paused: the user logs in first.
pub fn control_pair() -> (Controller, Gate) {
	let (tx, rx) = watch::channel(RunState::Paused);
	(Controller { tx: Arc::new(tx) }, Gate { rx })
}

#[derive(Clone, Debug)]
pub struct Controller {
	tx: Arc<watch::Sender<RunState>>,
}

impl Controller {
	pub fn state(&self) -> RunState {
		*self.tx.borrow()
	}

	pub fn pause(&self) -> Outcome {
		self.transition(RunState::Paused)
	}

	pub fn resume(&self) -> Outcome {
		self.transition(RunState::Running)
	}

	pub fn stop(&self) -> Outcome {
		self.transition(RunState::Stopped)
	}

	pub fn apply(&self, action: Action) -> Outcome {
		match action {
			Action::Pause => self.pause(),
			Action::Resume => self.resume(),
			Action::Stop => self.stop(),
		}
	}

	/// A worker-side gate watching the same state
	pub fn gate(&self) -> Gate {
		Gate { rx: self.tx.subscribe() }
	}

	fn transition(&self, to: RunState) -> Outcome {
		let mut outcome = Outcome::Changed;
		// send_if_modified works with zero receivers, unlike send
		self.tx.send_if_modified(|state| {
			outcome = match (*state, to) {
				(RunState::Stopped, RunState::Stopped) => Outcome::AlreadyInState,
				(RunState::Stopped, _) => Outcome::Rejected,
				(from, to) if from == to => Outcome::AlreadyInState,
				_ => Outcome::Changed,
			};
			if outcome == Outcome::Changed {
				*state = to;
				true
			} else {
				false
			}
		});
		outcome
	}
}

#[derive(Clone, Debug)]
pub struct Gate {
	rx: watch::Receiver<RunState>,
}

impl Gate {
	pub fn state(&self) -> RunState {
		*self.rx.borrow()
	}

	/// Err when the worker should not keep going
	pub fn checkpoint(&self) -> Result<(), Interrupted> {
		match self.state() {
			RunState::Running => Ok(()),
			RunState::Paused => Err(Interrupted::Paused),
			RunState::Stopped => Err(Interrupted::Stopped),
		}
	}

	/// Sleep for `duration`, cut short as soon as the state leaves Running
	pub async fn sleep(&mut self, duration: Duration) -> Result<(), Interrupted> {
		self.checkpoint()?;
		let deadline = tokio::time::sleep(duration);
		tokio::pin!(deadline);
		loop {
			tokio::select! {
				_ = &mut deadline => return Ok(()),
				changed = self.rx.changed() => {
					if changed.is_err() {
						// controller gone, nobody can resume us
						return Err(Interrupted::Stopped);
					}
					self.checkpoint()?;
				}
			}
		}
	}

	/// Park while paused. Err only when stopped.
	pub async fn wait_until_running(&mut self) -> Result<(), Interrupted> {
		let state = self.rx.wait_for(|s| *s != RunState::Paused).await.map(|s| *s);
		match state {
			Ok(RunState::Running) => Ok(()),
			_ => Err(Interrupted::Stopped),
		}
	}
}

/// The pause/stop buried in an error chain, if that is what it is
pub fn interruption(e: &color_eyre::Report) -> Option<Interrupted> {
	e.chain().find_map(|cause| cause.downcast_ref::<Interrupted>().copied())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn starts_paused() {
		let (controller, gate) = control_pair();
		assert_eq!(controller.state(), RunState::Paused);
		assert_eq!(gate.checkpoint(), Err(Interrupted::Paused));
	}

	#[test]
	fn transitions_report_outcome() {
		let (controller, _gate) = control_pair();
		assert_eq!(controller.pause(), Outcome::AlreadyInState);
		assert_eq!(controller.resume(), Outcome::Changed);
		assert_eq!(controller.resume(), Outcome::AlreadyInState);
		assert_eq!(controller.pause(), Outcome::Changed);
		assert_eq!(controller.stop(), Outcome::Changed);
		assert_eq!(controller.resume(), Outcome::Rejected);
		assert_eq!(controller.pause(), Outcome::Rejected);
		assert_eq!(controller.stop(), Outcome::AlreadyInState);
		assert_eq!(controller.state(), RunState::Stopped);
	}

	#[test]
	fn parse_console_commands() {
		assert_eq!(Action::parse(" S \n"), Some(Action::Resume));
		assert_eq!(Action::parse("pause"), Some(Action::Pause));
		assert_eq!(Action::parse("quit"), Some(Action::Stop));
		assert_eq!(Action::parse(""), None);
		assert_eq!(Action::parse("go"), None);
	}

	#[test]
	fn resume_after_stop_is_described_as_rejected() {
		let (controller, _gate) = control_pair();
		let outcome = controller.apply(Action::Stop);
		assert_eq!(Action::Stop.describe(outcome), "Stopping: closing Chrome and exiting");
		let outcome = controller.apply(Action::Resume);
		assert_eq!(outcome, Outcome::Rejected);
		assert_eq!(Action::Resume.describe(outcome), "Process is stopping, cannot continue");
	}

	#[test]
	fn works_after_all_gates_dropped() {
		let (controller, gate) = control_pair();
		drop(gate);
		assert_eq!(controller.resume(), Outcome::Changed);
		assert_eq!(controller.state(), RunState::Running);
	}

	#[tokio::test(start_paused = true)]
	async fn sleep_runs_to_completion_when_running() {
		let (controller, mut gate) = control_pair();
		controller.resume();
		let started = tokio::time::Instant::now();
		assert_eq!(gate.sleep(Duration::from_secs(10)).await, Ok(()));
		assert!(started.elapsed() >= Duration::from_secs(10));
	}

	#[tokio::test(start_paused = true)]
	async fn pause_cuts_sleep_short() {
		let (controller, mut gate) = control_pair();
		controller.resume();
		let pauser = controller.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_secs(1)).await;
			pauser.pause();
		});
		let started = tokio::time::Instant::now();
		assert_eq!(gate.sleep(Duration::from_secs(10)).await, Err(Interrupted::Paused));
		assert!(started.elapsed() < Duration::from_secs(10));
	}

	#[tokio::test(start_paused = true)]
	async fn wait_until_running_unblocks_on_resume_and_fails_on_stop() {
		let (controller, mut gate) = control_pair();
		let resumer = controller.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_secs(5)).await;
			resumer.resume();
		});
		assert_eq!(gate.wait_until_running().await, Ok(()));

		controller.pause();
		let stopper = controller.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_secs(5)).await;
			stopper.stop();
		});
		assert_eq!(gate.wait_until_running().await, Err(Interrupted::Stopped));
	}

	#[tokio::test]
	async fn dropped_controller_counts_as_stop() {
		let (controller, mut gate) = control_pair();
		controller.resume();
		drop(controller);
		assert_eq!(gate.sleep(Duration::from_secs(60)).await, Err(Interrupted::Stopped));
	}
}
