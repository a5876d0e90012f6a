//! The learning loop: continue a course, watch its progress, go back, repeat

use std::time::Duration;

use color_eyre::{Result, eyre::WrapErr};

use crate::{
	browser::{ClickMethod, Session},
	config::AppConfig,
	control::{Controller, Gate, Interrupted, RunState, interruption},
	progress::ProgressReading,
	retry::retry,
	site::{self, Locator},
	status::StatusSink,
};

/// The page operations the loop needs. [`Session`] drives a real Chrome.
#[allow(async_fn_in_trait)]
pub trait Driver {
	type Element;

	async fn find_present(&self, gate: &mut Gate, locator: Locator, timeout: Duration) -> Result<Self::Element>;
	async fn find_clickable(&self, gate: &mut Gate, locator: Locator, timeout: Duration) -> Result<Self::Element>;
	async fn click(&self, element: &Self::Element) -> Option<ClickMethod>;
	async fn text(&self, element: &Self::Element) -> Result<String>;
}

impl Driver for Session {
	type Element = chromiumoxide::element::Element;

	async fn find_present(&self, gate: &mut Gate, locator: Locator, timeout: Duration) -> Result<Self::Element> {
		Session::find_present(self, gate, locator, timeout).await
	}

	async fn find_clickable(&self, gate: &mut Gate, locator: Locator, timeout: Duration) -> Result<Self::Element> {
		Session::find_clickable(self, gate, locator, timeout).await
	}

	async fn click(&self, element: &Self::Element) -> Option<ClickMethod> {
		self.safe_click(element).await
	}

	async fn text(&self, element: &Self::Element) -> Result<String> {
		Session::text(self, element).await
	}
}

/// Launch Chrome, open the site, and run the loop until stopped. The browser is closed on every exit path.
pub async fn run(config: AppConfig, controller: Controller, status: StatusSink) -> Result<()> {
	status.update("Launching Chrome");
	let mut session = match Session::launch(&config).await {
		Ok(session) => session,
		Err(e) => {
			status.update(format!("Could not launch Chrome: {e}"));
			return Err(e);
		}
	};

	let result = async {
		status.update("Opening the site: log in by hand (popups are not handled)");
		session.open(&config.target_url).await?;
		// not gated: the task starts out paused anyway
		tokio::time::sleep(config.initial_load()).await;
		if controller.state() == RunState::Stopped {
			return Ok(());
		}
		status.update("Page open, task paused: log in, close any popups, then press Start");
		Runner::new(&session, &config, controller.clone(), status.clone()).drive().await
	}
	.await;

	if let Err(e) = &result {
		if interruption(e).is_none() {
			status.update(format!("Task failed: {e}"));
			tracing::error!("task failed: {e:?}");
		}
	}

	status.update("Closing Chrome");
	if let Err(e) = session.close().await {
		tracing::warn!("{e}");
	}
	status.update("Task finished, resources released");
	result
}

pub struct Runner<'a, D: Driver> {
	driver: &'a D,
	config: &'a AppConfig,
	controller: Controller,
	gate: Gate,
	status: StatusSink,
	initialized: bool,
	cycle: u32,
}

impl<'a, D: Driver> Runner<'a, D> {
	pub fn new(driver: &'a D, config: &'a AppConfig, controller: Controller, status: StatusSink) -> Self {
		let gate = controller.gate();
		Self {
			driver,
			config,
			controller,
			gate,
			status,
			initialized: false,
			cycle: 0,
		}
	}

	pub fn cycles(&self) -> u32 {
		self.cycle
	}

	/// Loop until the controller is stopped
	pub async fn drive(&mut self) -> Result<()> {
		loop {
			if self.gate.state() == RunState::Paused {
				self.status.update("Waiting: after logging in, press Start");
			}
			if self.gate.wait_until_running().await.is_err() {
				return Ok(());
			}

			self.cycle += 1;
			self.status.update(format!("Starting learning cycle {}", self.cycle));

			match self.run_cycle().await {
				Ok(()) => {}
				Err(e) => match interruption(&e) {
					Some(Interrupted::Stopped) => return Ok(()),
					Some(Interrupted::Paused) => self.status.update(format!("Cycle {} interrupted by pause", self.cycle)),
					None => {
						self.status.update(format!("Cycle {} failed, task paused: {e}", self.cycle));
						tracing::error!("cycle {} failed: {e:?}", self.cycle);
						self.controller.pause();
					}
				},
			}
		}
	}

	async fn run_cycle(&mut self) -> Result<()> {
		if !self.initialized {
			self.status.update("First run: opening my learning, then all years");
			self.init_learn_flow().await.wrap_err("learning flow init failed")?;
		}

		let n = self.cycle;
		self.status.update(format!("Cycle {n}: clicking continue learning"));
		let button = self.find_with_retry(site::CONTINUE_LEARNING, self.config.wait_timeout(), true, "continue learning button").await?;
		self.click(&button).await;
		self.gate.checkpoint()?;

		self.status.update(format!("Cycle {n}: watching course progress"));
		self.watch_progress().await?;

		self.status.update(format!("Cycle {n}: clicking back"));
		self.click_back().await?;
		self.gate.sleep(self.config.settle()).await?;
		self.status.update(format!("Cycle {n}: back on the course list, next cycle"));
		Ok(())
	}

	/// "My learning" then "all years". Runs once per process.
	async fn init_learn_flow(&mut self) -> Result<()> {
		let my_learning = self.find_with_retry(site::MY_LEARNING, self.config.menu_timeout(), true, "my learning entry").await?;
		self.click(&my_learning).await;
		self.gate.sleep(self.config.settle()).await?;

		self.status.update("Init: clicking all years");
		let all_years = self.find_with_retry(site::ALL_YEARS, self.config.wait_timeout(), true, "all years tab").await?;
		self.click(&all_years).await;
		self.gate.sleep(self.config.settle()).await?;

		self.initialized = true;
		self.status.update("Init done: on the all years page");
		Ok(())
	}

	/// Poll the progress label until it reports completion
	async fn watch_progress(&mut self) -> Result<()> {
		let n = self.cycle;
		let mut checks: u32 = 0;
		loop {
			self.gate.checkpoint()?;
			checks += 1;
			if checks % self.config.heartbeat_every.max(1) == 0 {
				self.status.update(format!("Cycle {n}: watching progress (heartbeat {checks})"));
			}

			match self.read_progress().await {
				Ok(reading) => {
					self.status.update(format!("Cycle {n}: progress {reading}"));
					if reading.finished() {
						self.status.update(format!("Cycle {n}: course finished, going back"));
						return Ok(());
					}
				}
				Err(e) => {
					if let Some(interrupted) = interruption(&e) {
						return Err(interrupted.into());
					}
					self.status.update(format!("Cycle {n}: progress check failed, retrying in {}s", self.config.poll_interval_secs));
					tracing::warn!("progress check failed: {e}");
				}
			}
			self.gate.sleep(self.config.poll_interval()).await?;
		}
	}

	async fn read_progress(&mut self) -> Result<ProgressReading> {
		let label = self.find_with_retry(site::PROGRESS, self.config.wait_timeout(), false, "progress label").await?;
		let text = self.driver.text(&label).await?;
		Ok(ProgressReading::from_text(&text))
	}

	async fn click_back(&mut self) -> Result<()> {
		let timeout = self.config.back_timeout();
		let back = match self.find_with_retry(site::BACK, timeout, true, "back button").await {
			Ok(back) => back,
			Err(e) => {
				if let Some(interrupted) = interruption(&e) {
					return Err(interrupted.into());
				}
				self.status.update("Back button container not found, trying the icon itself");
				self.find_with_retry(site::BACK_ICON, timeout, true, "back icon").await?
			}
		};
		self.click(&back).await;
		Ok(())
	}

	async fn find_with_retry(&mut self, locator: Locator, timeout: Duration, clickable: bool, label: &str) -> Result<D::Element> {
		let driver = self.driver;
		let attempts = self.config.retry_times;
		let delay = self.config.retry_delay();
		// each attempt polls with its own handle; the shared one paces the retries
		let attempt_gate = self.gate.clone();
		retry(&mut self.gate, attempts, delay, label, || {
			let mut gate = attempt_gate.clone();
			async move {
				if clickable {
					driver.find_clickable(&mut gate, locator, timeout).await
				} else {
					driver.find_present(&mut gate, locator, timeout).await
				}
			}
		})
		.await
	}

	async fn click(&self, element: &D::Element) {
		match self.driver.click(element).await {
			Some(ClickMethod::Script) => self.status.update("Clicked via script"),
			Some(ClickMethod::Mouse) => self.status.update("Clicked via mouse fallback"),
			None => self.status.update("Click failed with both script and mouse"),
		}
	}
}
