use std::{path::PathBuf, thread::JoinHandle};

use auto_learn::{
	config::AppConfig,
	console,
	control::{Controller, control_pair},
	gui, logging, runner,
	status::{StatusSink, status_channel},
};
use clap::Parser;
use color_eyre::{Result, eyre::eyre};
use v_utils::elog;

#[derive(Debug, Parser)]
#[command(name = "auto_learn")]
#[command(about = "Keeps an online course playing: continue, wait for 100%, go back, repeat", long_about = None)]
struct Args {
	/// TOML config file (all keys optional)
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Page to open for the manual login (overrides config)
	#[arg(short, long)]
	url: Option<String>,

	/// Chrome binary to launch (overrides config)
	#[arg(long)]
	chrome: Option<PathBuf>,

	/// No floating window; control the task from stdin instead
	#[arg(long)]
	console: bool,
}

fn main() -> Result<()> {
	color_eyre::install()?;
	let args = Args::parse();

	let mut config = AppConfig::load(args.config.as_deref())?;
	if let Some(url) = args.url {
		config.target_url = url;
	}
	if let Some(chrome) = args.chrome {
		config.chrome_executable = Some(chrome);
	}

	let _log_guard = logging::init(&config.log_file)?;
	tracing::info!("{}", "=".repeat(50));
	tracing::info!("auto_learn {} starting", env!("CARGO_PKG_VERSION"));
	tracing::info!("target: {}, log file: {}", config.target_url, config.log_file.display());
	tracing::info!("{}", "=".repeat(50));

	let (controller, _) = control_pair();
	let (status, feed) = status_channel();
	let worker = spawn_worker(config.clone(), controller.clone(), status.clone())?;

	let ui = if args.console {
		console::run(&controller, &status, &feed, || worker.is_finished())
	} else {
		tracing::info!("floating window up");
		gui::run(&config.window, controller.clone(), status.clone(), feed)
	};

	// however the window went away, the worker has to wind down
	controller.stop();
	match worker.join() {
		Ok(Ok(())) => {}
		Ok(Err(e)) => elog!("Worker exited with error: {e}"),
		Err(_) => elog!("Worker panicked"),
	}
	ui?;

	tracing::info!("program exited");
	Ok(())
}

fn spawn_worker(config: AppConfig, controller: Controller, status: StatusSink) -> Result<JoinHandle<Result<()>>> {
	std::thread::Builder::new()
		.name("auto-learn-worker".to_string())
		.spawn(move || {
			let rt = tokio::runtime::Builder::new_multi_thread()
				.enable_all()
				.build()
				.map_err(|e| eyre!("Failed to start worker runtime: {}", e))?;
			rt.block_on(runner::run(config, controller, status))
		})
		.map_err(|e| eyre!("Failed to spawn worker thread: {}", e))
}
