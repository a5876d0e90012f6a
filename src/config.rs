use std::{
	path::{Path, PathBuf},
	time::Duration,
};

use color_eyre::{Result, eyre::eyre};
use serde::Deserialize;

/// Learner home page; login happens here by hand
pub const DEFAULT_TARGET_URL: &str = "https://sdld-gxk.yxlearning.com/my/index";

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
	/// Page opened at startup (default: the learner index)
	#[serde(default = "default_target_url")]
	pub target_url: String,
	/// How long to wait for an element to show up, in seconds (default: 30)
	#[serde(default = "default_wait_timeout_secs")]
	pub wait_timeout_secs: u64,
	/// Attempts per element lookup before giving up (default: 3)
	#[serde(default = "default_retry_times")]
	pub retry_times: u32,
	/// Fixed delay between lookup attempts, in seconds (default: 2)
	#[serde(default = "default_retry_delay_secs")]
	pub retry_delay_secs: u64,
	/// Delay between progress checks, in seconds (default: 10)
	#[serde(default = "default_poll_interval_secs")]
	pub poll_interval_secs: u64,
	/// Pause after navigation clicks to let the page settle, in seconds (default: 5)
	#[serde(default = "default_settle_secs")]
	pub settle_secs: u64,
	/// Timeout for the "my learning" menu entry, in seconds (default: 10)
	#[serde(default = "default_short_timeout_secs")]
	pub menu_timeout_secs: u64,
	/// Timeout for the back button, in seconds (default: 10)
	#[serde(default = "default_short_timeout_secs")]
	pub back_timeout_secs: u64,
	/// Emit a heartbeat status every N progress checks (default: 3)
	#[serde(default = "default_heartbeat_every")]
	pub heartbeat_every: u32,
	/// Wait after opening the target page, in seconds (default: 2)
	#[serde(default = "default_initial_load_secs")]
	pub initial_load_secs: u64,
	/// Log file path (default: auto_learn_log.log)
	#[serde(default = "default_log_file")]
	pub log_file: PathBuf,
	/// Chrome binary to launch instead of the auto-detected one
	#[serde(default)]
	pub chrome_executable: Option<PathBuf>,
	#[serde(default)]
	pub window: WindowConfig,
}

/// Placement and look of the floating control window
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowConfig {
	#[serde(default = "default_window_width")]
	pub width: f32,
	#[serde(default = "default_window_height")]
	pub height: f32,
	#[serde(default = "default_window_pos")]
	pub x: f32,
	#[serde(default = "default_window_pos")]
	pub y: f32,
	/// 0.0 is fully transparent, 1.0 opaque (default: 0.9)
	#[serde(default = "default_window_opacity")]
	pub opacity: f32,
}

fn default_target_url() -> String {
	DEFAULT_TARGET_URL.to_string()
}

fn default_wait_timeout_secs() -> u64 {
	30
}

fn default_retry_times() -> u32 {
	3
}

fn default_retry_delay_secs() -> u64 {
	2
}

fn default_poll_interval_secs() -> u64 {
	10
}

fn default_settle_secs() -> u64 {
	5
}

fn default_short_timeout_secs() -> u64 {
	10
}

fn default_heartbeat_every() -> u32 {
	3
}

fn default_initial_load_secs() -> u64 {
	2
}

fn default_log_file() -> PathBuf {
	PathBuf::from("auto_learn_log.log")
}

fn default_window_width() -> f32 {
	400.0
}

fn default_window_height() -> f32 {
	150.0
}

fn default_window_pos() -> f32 {
	100.0
}

fn default_window_opacity() -> f32 {
	0.9
}

impl Default for AppConfig {
	fn default() -> Self {
		Self {
			target_url: default_target_url(),
			wait_timeout_secs: default_wait_timeout_secs(),
			retry_times: default_retry_times(),
			retry_delay_secs: default_retry_delay_secs(),
			poll_interval_secs: default_poll_interval_secs(),
			settle_secs: default_settle_secs(),
			menu_timeout_secs: default_short_timeout_secs(),
			back_timeout_secs: default_short_timeout_secs(),
			heartbeat_every: default_heartbeat_every(),
			initial_load_secs: default_initial_load_secs(),
			log_file: default_log_file(),
			chrome_executable: None,
			window: WindowConfig::default(),
		}
	}
}

impl Default for WindowConfig {
	fn default() -> Self {
		Self {
			width: default_window_width(),
			height: default_window_height(),
			x: default_window_pos(),
			y: default_window_pos(),
			opacity: default_window_opacity(),
		}
	}
}

impl AppConfig {
	/// Load from a TOML file, or fall back to defaults when no path is given
	pub fn load(path: Option<&Path>) -> Result<Self> {
		let Some(path) = path else {
			return Ok(Self::default());
		};
		let raw = std::fs::read_to_string(path).map_err(|e| eyre!("Failed to read config {}: {}", path.display(), e))?;
		Self::from_toml(&raw).map_err(|e| eyre!("Invalid config {}: {}", path.display(), e))
	}

	pub fn from_toml(raw: &str) -> Result<Self> {
		let config: Self = toml::from_str(raw)?;
		if config.retry_times == 0 {
			return Err(eyre!("retry_times must be at least 1"));
		}
		if config.heartbeat_every == 0 {
			return Err(eyre!("heartbeat_every must be at least 1"));
		}
		Ok(config)
	}

	pub fn wait_timeout(&self) -> Duration {
		Duration::from_secs(self.wait_timeout_secs)
	}

	pub fn retry_delay(&self) -> Duration {
		Duration::from_secs(self.retry_delay_secs)
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_secs(self.poll_interval_secs)
	}

	pub fn settle(&self) -> Duration {
		Duration::from_secs(self.settle_secs)
	}

	pub fn menu_timeout(&self) -> Duration {
		Duration::from_secs(self.menu_timeout_secs)
	}

	pub fn back_timeout(&self) -> Duration {
		Duration::from_secs(self.back_timeout_secs)
	}

	pub fn initial_load(&self) -> Duration {
		Duration::from_secs(self.initial_load_secs)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_toml_gives_defaults() {
		let config = AppConfig::from_toml("").unwrap();
		assert_eq!(config.target_url, DEFAULT_TARGET_URL);
		assert_eq!(config.wait_timeout(), Duration::from_secs(30));
		assert_eq!(config.retry_times, 3);
		assert_eq!(config.retry_delay(), Duration::from_secs(2));
		assert_eq!(config.poll_interval(), Duration::from_secs(10));
		assert_eq!(config.window.width, 400.0);
		assert_eq!(config.window.opacity, 0.9);
	}

	#[test]
	fn partial_override_keeps_other_defaults() {
		let config = AppConfig::from_toml("poll_interval_secs = 3\n[window]\nx = 20.0\n").unwrap();
		assert_eq!(config.poll_interval_secs, 3);
		assert_eq!(config.settle_secs, 5);
		assert_eq!(config.window.x, 20.0);
		assert_eq!(config.window.y, 100.0);
	}

	#[test]
	fn unknown_key_is_rejected() {
		assert!(AppConfig::from_toml("poll_every = 3").is_err());
	}

	#[test]
	fn zero_retries_is_rejected() {
		assert!(AppConfig::from_toml("retry_times = 0").is_err());
	}
}
