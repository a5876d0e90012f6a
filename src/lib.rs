pub mod browser;
pub mod config;
pub mod console;
pub mod control;
pub mod gui;
pub mod logging;
pub mod progress;
pub mod retry;
pub mod runner;
pub mod site;
pub mod status;
