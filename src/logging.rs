use std::{fmt, path::Path};

use color_eyre::{Result, eyre::eyre};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
	EnvFilter,
	fmt::{format::Writer, time::FormatTime},
	layer::SubscriberExt,
	util::SubscriberInitExt,
};

/// Local wall-clock timer with a strftime pattern
struct LocalTime(&'static str);

impl FormatTime for LocalTime {
	fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
		write!(w, "{}", chrono::Local::now().format(self.0))
	}
}

/// Console layer plus a plain-text file layer. Keep the guard alive until exit or the file loses its tail.
pub fn init(log_file: &Path) -> Result<WorkerGuard> {
	let dir = match log_file.parent() {
		Some(dir) if !dir.as_os_str().is_empty() => dir,
		_ => Path::new("."),
	};
	std::fs::create_dir_all(dir).map_err(|e| eyre!("Failed to create log dir {}: {}", dir.display(), e))?;
	let file_name = log_file.file_name().ok_or_else(|| eyre!("Log path has no file name: {}", log_file.display()))?;

	let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,chromiumoxide=warn"));

	tracing_subscriber::registry()
		.with(filter)
		.with(tracing_subscriber::fmt::layer().with_timer(LocalTime("%H:%M:%S")).with_target(false))
		.with(
			tracing_subscriber::fmt::layer()
				.with_writer(writer)
				.with_ansi(false)
				.with_thread_names(true)
				.with_timer(LocalTime("%Y-%m-%d %H:%M:%S")),
		)
		.try_init()
		.map_err(|e| eyre!("Failed to install log subscriber: {}", e))?;

	Ok(guard)
}
