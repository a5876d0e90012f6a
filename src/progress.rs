//! Reading the course-hours progress label, e.g. `总学时进度（26.47%）`

use std::fmt;

/// Marker the site shows instead of a number once a course is done
pub const FINISHED_MARKER: &str = "已完成";

const PERCENT_PATTERN: &str = r"(\d+\.?\d*)%";

/// First `NN.NN%` in the text; 100 if the text says the course is finished; 0 otherwise
pub fn extract_percent(text: &str) -> f64 {
	let parsed = regex::Regex::new(PERCENT_PATTERN)
		.ok()
		.and_then(|re| re.captures(text).and_then(|caps| caps.get(1)).and_then(|m| m.as_str().parse::<f64>().ok()));
	match parsed {
		Some(percent) => percent,
		None if text.contains(FINISHED_MARKER) => 100.0,
		None => 0.0,
	}
}

pub fn is_finished(text: &str) -> bool {
	extract_percent(text) >= 100.0 || text.contains(FINISHED_MARKER)
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProgressReading {
	pub text: String,
	pub percent: f64,
}

impl ProgressReading {
	pub fn from_text(text: &str) -> Self {
		let text = text.trim().to_string();
		let percent = extract_percent(&text);
		Self { text, percent }
	}

	pub fn finished(&self) -> bool {
		is_finished(&self.text)
	}
}

impl fmt::Display for ProgressReading {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} ({}%)", self.text, self.percent)
	}
}
