//! Locators for the learner pages. These track the site's current markup.

use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Locator {
	XPath(&'static str),
	Css(&'static str),
}

impl fmt::Display for Locator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Locator::XPath(xpath) => write!(f, "xpath `{xpath}`"),
			Locator::Css(css) => write!(f, "css `{css}`"),
		}
	}
}

/// "My learning" entry in the top navigation
pub const MY_LEARNING: Locator = Locator::XPath("//*[contains(text(), '我的学习')]");

/// "All years" tab on the my-learning page
pub const ALL_YEARS: Locator = Locator::XPath("//div[@class='yearItem bg-white' and .//p[@class='year' and text()='全部年度']]");

/// "Continue learning" button on a course card
pub const CONTINUE_LEARNING: Locator = Locator::XPath("//div[contains(text(), '继续学习') and contains(@class, 'item-bottom-btn')]");

/// Course-hours progress label on the player page
pub const PROGRESS: Locator = Locator::Css(".jindu-span");

/// Clickable container around the back arrow. The arrow is an svg, so the name test has to
/// go through local-name() to match outside the HTML namespace.
pub const BACK: Locator = Locator::XPath("//*[local-name()='svg' and contains(@class, 'back-icon')]/parent::*[1]");

/// The back arrow itself, used when its parent cannot be found
pub const BACK_ICON: Locator = Locator::Css("svg.back-icon");

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn display_names_kind() {
		assert_eq!(PROGRESS.to_string(), "css `.jindu-span`");
		assert!(CONTINUE_LEARNING.to_string().starts_with("xpath `//div"));
	}
}
