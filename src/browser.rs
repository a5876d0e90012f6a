//! Chrome session: launching, locating, clicking

use std::time::{Duration, Instant};

use chromiumoxide::{
	Page,
	browser::{Browser, BrowserConfig},
	element::Element,
};
use color_eyre::{Result, eyre::eyre};
use futures::StreamExt;
use tokio::task::JoinHandle;

use crate::{config::AppConfig, control::Gate, site::Locator};

const POLL_START: Duration = Duration::from_millis(100);
const POLL_CAP: Duration = Duration::from_secs(1);

const IS_CLICKABLE_JS: &str = r#"
	function() {
		const rect = this.getBoundingClientRect();
		const style = window.getComputedStyle(this);
		return rect.width > 0
			&& rect.height > 0
			&& style.visibility !== 'hidden'
			&& style.display !== 'none'
			&& style.pointerEvents !== 'none'
			&& !this.disabled;
	}
"#;

// svg elements have no click(); this throws for them and we fall back to a mouse click
const JS_CLICK: &str = "function() { this.click(); }";

#[derive(Clone, Copy, Debug)]
enum Readiness {
	Present,
	Clickable,
}

/// How an element ended up being clicked
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClickMethod {
	Script,
	Mouse,
}

pub struct Session {
	browser: Browser,
	handler: JoinHandle<()>,
	page: Option<Page>,
	closed: bool,
}

impl Session {
	/// Launch a visible Chrome. Login is manual, so there is no headless mode.
	pub async fn launch(config: &AppConfig) -> Result<Self> {
		let mut builder = BrowserConfig::builder()
			.with_head()
			.viewport(None)
			.request_timeout(config.wait_timeout())
			.arg("--disable-blink-features=AutomationControlled")
			.arg("--disable-infobars")
			.arg("--disable-cache")
			.arg("--disk-cache-size=0")
			.arg("--start-maximized");
		if let Some(exe) = &config.chrome_executable {
			builder = builder.chrome_executable(exe);
		}
		let browser_config = builder.build().map_err(|e| eyre!("Failed to build browser config: {}", e))?;

		let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| eyre!("Failed to launch browser: {}", e))?;

		// the handler stream has to be polled or every CDP call hangs
		let handler = tokio::spawn(async move {
			while let Some(event) = handler.next().await {
				if let Err(e) = event {
					tracing::debug!("browser handler event error: {e}");
				}
			}
		});

		Ok(Self {
			browser,
			handler,
			page: None,
			closed: false,
		})
	}

	/// Open `url` in a fresh tab, which becomes the working page
	pub async fn open(&mut self, url: &str) -> Result<()> {
		let page = self.browser.new_page(url).await.map_err(|e| eyre!("Failed to open {}: {}", url, e))?;
		self.page = Some(page);
		Ok(())
	}

	pub fn page(&self) -> Result<&Page> {
		self.page.as_ref().ok_or_else(|| eyre!("No page open"))
	}

	/// Wait until at least one element matches
	pub async fn find_present(&self, gate: &mut Gate, locator: Locator, timeout: Duration) -> Result<Element> {
		self.poll(gate, locator, timeout, Readiness::Present).await
	}

	/// Wait until a match is rendered with a non-empty box and can take clicks
	pub async fn find_clickable(&self, gate: &mut Gate, locator: Locator, timeout: Duration) -> Result<Element> {
		self.poll(gate, locator, timeout, Readiness::Clickable).await
	}

	async fn poll(&self, gate: &mut Gate, locator: Locator, timeout: Duration, readiness: Readiness) -> Result<Element> {
		let page = self.page()?;
		let started = Instant::now();
		let mut interval = POLL_START;
		loop {
			gate.checkpoint()?;
			if let Ok(element) = locate(page, locator).await {
				let ready = match readiness {
					Readiness::Present => true,
					Readiness::Clickable => is_clickable(&element).await.unwrap_or(false),
				};
				if ready {
					return Ok(element);
				}
			}
			if started.elapsed() >= timeout {
				return Err(eyre!("Element not found within {}s: {}", timeout.as_secs(), locator));
			}
			gate.sleep(interval).await?;
			interval = (interval * 2).min(POLL_CAP);
		}
	}

	/// Click through JS first, then with a real mouse event. None when both fail.
	pub async fn safe_click(&self, element: &Element) -> Option<ClickMethod> {
		match js_click(element).await {
			Ok(()) => return Some(ClickMethod::Script),
			Err(e) => tracing::warn!("script click failed: {e}, falling back to mouse click"),
		}
		match element.click().await {
			Ok(_) => Some(ClickMethod::Mouse),
			Err(e) => {
				tracing::warn!("mouse click failed: {e}");
				None
			}
		}
	}

	pub async fn text(&self, element: &Element) -> Result<String> {
		let text = element.inner_text().await.map_err(|e| eyre!("Failed to read element text: {}", e))?;
		Ok(text.unwrap_or_default().trim().to_string())
	}

	/// Close the browser; safe to call more than once
	pub async fn close(&mut self) -> Result<()> {
		if self.closed {
			return Ok(());
		}
		self.closed = true;
		self.page = None;
		let closed = self.browser.close().await.map_err(|e| eyre!("Failed to close browser: {}", e));
		let _ = self.browser.wait().await;
		self.handler.abort();
		closed.map(|_| ())
	}
}

async fn locate(page: &Page, locator: Locator) -> Result<Element> {
	let found = match locator {
		Locator::XPath(xpath) => page.find_xpath(xpath).await,
		Locator::Css(css) => page.find_element(css).await,
	};
	found.map_err(|e| eyre!("{}: {}", locator, e))
}

async fn is_clickable(element: &Element) -> Result<bool> {
	let returns = element.call_js_fn(IS_CLICKABLE_JS, false).await.map_err(|e| eyre!("Failed to probe element: {}", e))?;
	Ok(returns.result.value.and_then(|v| v.as_bool()).unwrap_or(false))
}

async fn js_click(element: &Element) -> Result<()> {
	let returns = element.call_js_fn(JS_CLICK, false).await.map_err(|e| eyre!("{}", e))?;
	if let Some(details) = returns.exception_details {
		return Err(eyre!("{}", details.text));
	}
	Ok(())
}
