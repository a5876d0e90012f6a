//! Windowless control from the terminal

use std::time::Duration;

use color_eyre::{Result, eyre::eyre};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use v_utils::log;

use crate::{
	control::{Action, Controller},
	status::{StatusFeed, StatusSink},
};

const TICK: Duration = Duration::from_millis(200);

/// Read commands from stdin until stopped, Ctrl+C, or `worker_done` reports the worker has exited
pub fn run(controller: &Controller, status: &StatusSink, feed: &StatusFeed, worker_done: impl Fn() -> bool) -> Result<()> {
	let (tx, rx) = unbounded_channel();
	spawn_stdin_reader(tx)?;

	let rt = tokio::runtime::Builder::new_current_thread()
		.enable_all()
		.build()
		.map_err(|e| eyre!("Failed to start console runtime: {}", e))?;
	rt.block_on(drive(controller, status, feed, rx, worker_done));
	Ok(())
}

/// Blocking reads live on their own thread so nothing waits on a pending line at exit
fn spawn_stdin_reader(tx: UnboundedSender<String>) -> Result<()> {
	std::thread::Builder::new()
		.name("console-stdin".to_string())
		.spawn(move || {
			for line in std::io::stdin().lines() {
				let Ok(line) = line else { break };
				if tx.send(line).is_err() {
					break;
				}
			}
		})
		.map(|_| ())
		.map_err(|e| eyre!("Failed to spawn stdin reader: {}", e))
}

/// Apply console lines to the controller until a stop, Ctrl+C, or the worker exiting
pub async fn drive(controller: &Controller, status: &StatusSink, feed: &StatusFeed, mut lines: UnboundedReceiver<String>, worker_done: impl Fn() -> bool) {
	log!("Console mode: log in inside Chrome, then type `s` + Enter to start. `p` pauses, `q` stops.");
	let mut stdin_open = true;
	let mut tick = tokio::time::interval(TICK);
	loop {
		tokio::select! {
			line = lines.recv(), if stdin_open => {
				let Some(line) = line else {
					// stdin closed: keep running, Ctrl+C still works
					stdin_open = false;
					continue;
				};
				let Some(action) = Action::parse(&line) else {
					if !line.trim().is_empty() {
						log!("Unknown command {:?}; use s, p or q", line.trim());
					}
					continue;
				};
				status.update(action.describe(controller.apply(action)));
				if action == Action::Stop {
					break;
				}
			}
			_ = tokio::signal::ctrl_c() => {
				status.update(Action::Stop.describe(controller.stop()));
				break;
			}
			_ = tick.tick() => {
				// statuses are already logged by the sink; just keep the queue short
				let _ = feed.drain_all();
				if worker_done() {
					break;
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		control::{RunState, control_pair},
		status::status_channel,
	};

	const LIMIT: Duration = Duration::from_secs(5);

	#[tokio::test]
	async fn returns_when_worker_exits_with_stdin_still_open() {
		let (controller, _gate) = control_pair();
		let (sink, feed) = status_channel();
		let (_tx, rx) = unbounded_channel::<String>();

		let done = tokio::time::timeout(LIMIT, drive(&controller, &sink, &feed, rx, || true)).await;
		assert!(done.is_ok());
		assert_eq!(controller.state(), RunState::Paused);
	}

	#[tokio::test]
	async fn start_line_resumes() {
		let (controller, _gate) = control_pair();
		let (sink, feed) = status_channel();
		let (tx, rx) = unbounded_channel();
		tx.send("what".to_string()).unwrap();
		tx.send(" s ".to_string()).unwrap();

		let watched = controller.clone();
		let done = tokio::time::timeout(LIMIT, drive(&controller, &sink, &feed, rx, move || watched.state() == RunState::Running)).await;
		assert!(done.is_ok());
		assert_eq!(controller.state(), RunState::Running);
	}

	#[tokio::test]
	async fn quit_line_stops_and_returns() {
		let (controller, _gate) = control_pair();
		let (sink, feed) = status_channel();
		let (tx, rx) = unbounded_channel();
		tx.send("s".to_string()).unwrap();
		tx.send("q".to_string()).unwrap();

		let done = tokio::time::timeout(LIMIT, drive(&controller, &sink, &feed, rx, || false)).await;
		assert!(done.is_ok());
		assert_eq!(controller.state(), RunState::Stopped);
	}

	#[tokio::test]
	async fn closed_stdin_keeps_waiting_for_worker() {
		let (controller, _gate) = control_pair();
		let (sink, feed) = status_channel();
		let (tx, rx) = unbounded_channel::<String>();
		drop(tx);

		let ticks = std::cell::Cell::new(0);
		let done = tokio::time::timeout(
			LIMIT,
			drive(&controller, &sink, &feed, rx, || {
				ticks.set(ticks.get() + 1);
				ticks.get() >= 3
			}),
		)
		.await;
		assert!(done.is_ok());
		assert_eq!(ticks.get(), 3);
	}
}
