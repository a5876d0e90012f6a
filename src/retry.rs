use std::{future::Future, time::Duration};

use color_eyre::{Result, eyre::eyre};

use crate::control::{Gate, interruption};

/// Run `op` up to `attempts` times with a fixed `delay` in between.
///
/// The gate is checked before every attempt and the delay is interruptible, so a pause or stop
/// surfaces immediately as an [`Interrupted`](crate::control::Interrupted) error (downcastable)
/// instead of burning the remaining attempts.
pub async fn retry<T, F, Fut>(gate: &mut Gate, attempts: u32, delay: Duration, label: &str, mut op: F) -> Result<T>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T>>, {
	let attempts = attempts.max(1);
	for attempt in 1..=attempts {
		gate.checkpoint()?;
		match op().await {
			Ok(value) => return Ok(value),
			Err(e) => {
				if let Some(interrupted) = interruption(&e) {
					return Err(interrupted.into());
				}
				tracing::warn!("[retry {attempt}/{attempts}] {label} failed: {e}");
				if attempt < attempts {
					gate.sleep(delay).await?;
				}
			}
		}
	}
	Err(eyre!("{label} failed after {attempts} attempts"))
}
