use std::time::Duration;

use color_eyre::{Result, eyre::eyre};
use eframe::egui::{self, Color32, RichText, ViewportBuilder, ViewportCommand};

use crate::{
	config::WindowConfig,
	control::{Action, Controller},
	status::{StatusFeed, StatusSink},
};

const STATUS_POLL: Duration = Duration::from_millis(100);
const INITIAL_STATUS: &str = "Page opening: log in by hand and close any popups, then press Start";

/// Blocks the calling thread until the window closes
pub fn run(window: &WindowConfig, controller: Controller, status: StatusSink, feed: StatusFeed) -> Result<()> {
	let options = eframe::NativeOptions {
		viewport: ViewportBuilder::default()
			.with_title("Learning task monitor")
			.with_inner_size([window.width, window.height])
			.with_position([window.x, window.y])
			.with_always_on_top()
			.with_decorations(false)
			.with_transparent(true)
			.with_resizable(false),
		..Default::default()
	};
	let opacity = window.opacity.clamp(0.0, 1.0);

	eframe::run_native(
		"auto_learn",
		options,
		Box::new(move |_cc| Ok(Box::new(FloatWindow::new(controller, status, feed, opacity)))),
	)
	.map_err(|e| eyre!("GUI failed: {}", e))
}

pub struct FloatWindow {
	controller: Controller,
	status: StatusSink,
	feed: StatusFeed,
	label: String,
	fill: Color32,
}

impl FloatWindow {
	pub fn new(controller: Controller, status: StatusSink, feed: StatusFeed, opacity: f32) -> Self {
		let alpha = (opacity * 255.0).round() as u8;
		Self {
			controller,
			status,
			feed,
			label: INITIAL_STATUS.to_string(),
			fill: Color32::from_rgba_unmultiplied(32, 32, 36, alpha),
		}
	}

	fn act(&self, ctx: &egui::Context, action: Action) {
		let outcome = self.controller.apply(action);
		self.status.update(action.describe(outcome));
		if action == Action::Stop {
			ctx.send_viewport_cmd(ViewportCommand::Close);
		}
	}
}

impl eframe::App for FloatWindow {
	fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
		[0.0; 4]
	}

	fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
		if let Some(latest) = self.feed.drain_latest() {
			self.label = latest;
		}

		let frame = egui::Frame::new().fill(self.fill).inner_margin(egui::Margin::same(10));
		egui::CentralPanel::default().frame(frame).show(ctx, |ui| {
			// no title bar, so the background is the drag handle
			let background = ui.interact(ui.max_rect(), ui.id().with("drag"), egui::Sense::drag());
			if background.drag_started() {
				ctx.send_viewport_cmd(ViewportCommand::StartDrag);
			}

			ui.add(egui::Label::new(RichText::new(format!("Status: {}", self.label)).color(Color32::WHITE).size(14.0)).wrap());
			ui.add_space(8.0);

			ui.horizontal(|ui| {
				let width = (ui.available_width() - 2.0 * ui.spacing().item_spacing.x) / 3.0;
				let size = egui::vec2(width, 28.0);
				if ui.add_sized(size, egui::Button::new("Pause task")).clicked() {
					self.act(ctx, Action::Pause);
				}
				if ui.add_sized(size, egui::Button::new("Start task")).clicked() {
					self.act(ctx, Action::Resume);
				}
				if ui.add_sized(size, egui::Button::new(RichText::new("Stop process").color(Color32::from_rgb(230, 70, 70)))).clicked() {
					self.act(ctx, Action::Stop);
				}
			});
		});

		ctx.request_repaint_after(STATUS_POLL);
	}
}
