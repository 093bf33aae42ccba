use anyhow::{anyhow, bail, ensure, Context, Result};
use tracing::{debug, error, info, trace, warn};

use crate::ui::ui_types::App;

pub const CONFIG_PATH: &str = "config.toml";

impl App {
    pub fn options(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            self._options(ui);
        });
    }

    fn _options(&mut self, ui: &mut egui::Ui) {
        egui::widgets::global_theme_preference_buttons(ui);

        ui.separator();

        egui::Grid::new("options_grid").num_columns(2).show(ui, |ui| {
            ui.label("GIF directory:");
            ui.label(self.settings.gif_directory.display().to_string());
            ui.end_row();

            ui.label("Results file:");
            ui.label(self.settings.results_file.display().to_string());
            ui.end_row();

            ui.label("Extension:");
            ui.label(&self.settings.extension);
            ui.end_row();

            ui.label("Canvas:");
            ui.label(format!(
                "{} x {}",
                self.settings.canvas_width, self.settings.canvas_height
            ));
            ui.end_row();

            ui.label("Labels on disk:");
            ui.label(self.labels.as_ref().map_or(0, |l| l.len()).to_string());
            ui.end_row();

            ui.label("Default frame delay (ms):");
            let resp = ui.add(
                egui::DragValue::new(&mut self.settings.default_frame_delay_ms)
                    .speed(1.0)
                    .range(10..=1000),
            );
            if resp.changed() {
                debug!(
                    "Default frame delay now {} ms, applies from the next GIF",
                    self.settings.default_frame_delay_ms
                );
            }
            ui.end_row();

            ui.label("Line length:");
            ui.add(egui::Slider::new(&mut self.settings.line_length, 0.1..=1.0));
            ui.end_row();
        });

        ui.separator();

        if ui.button("Save config").clicked() {
            if let Err(e) = self.settings.save_to_file(CONFIG_PATH) {
                error!("Failed to save {}: {:#}", CONFIG_PATH, e);
                self.push_error(format!("Failed to save {}: {:#}", CONFIG_PATH, e));
            } else {
                info!("Saved {}", CONFIG_PATH);
            }
        }
    }
}
