//! Floating control window
pub mod app;

pub use app::run;
