use egui::{Color32, Pos2, RichText, Stroke};
use egui_extras::{Size, StripBuilder};

use crate::{angle::line_endpoint, session::Selection};

use super::ui_types::App;

const LINE_COLOR: Color32 = Color32::from_rgb(255, 0, 0);

impl App {
    pub fn data_labeling(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let canvas_height = self.settings.canvas_height as f32;
            StripBuilder::new(ui)
                .size(Size::exact(canvas_height + 8.))
                .size(Size::remainder())
                .vertical(|mut strip| {
                    strip.cell(|ui| self.canvas(ui));
                    strip.cell(|ui| self.labeling_controls(ui));
                });
        });
    }

    fn canvas(&mut self, ui: &mut egui::Ui) {
        let size = egui::vec2(
            self.settings.canvas_width as f32,
            self.settings.canvas_height as f32,
        );
        let (response, painter) = ui.allocate_painter(size, egui::Sense::click());
        let rect = response.rect;

        painter.rect_filled(rect, 0.0, Color32::BLACK);

        let Some(current) = &self.current else {
            return;
        };

        painter.image(
            current.texture.id(),
            rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            Color32::WHITE,
        );

        let anchor = self.settings.anchor();
        let to_local = |p: Pos2| ((p.x - rect.min.x) as f64, (p.y - rect.min.y) as f64);
        let to_screen = |(x, y): (f64, f64)| Pos2::new(rect.min.x + x as f32, rect.min.y + y as f32);

        /// pointer anywhere in the window steers the preview line
        if let Some(pos) = ui.input(|i| i.pointer.hover_pos()) {
            self.session.pointer_moved(anchor, to_local(pos));
        }

        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                self.session.click(anchor, to_local(pos));
            }
        }
        if response.secondary_clicked() {
            self.session.unlock();
        }

        let length = (self.settings.line_length * size.x.min(size.y) / 2.) as f64;
        let start = to_screen(anchor);

        if let Some(hover) = self.session.hover() {
            let end = to_screen(line_endpoint(anchor, hover, length));
            painter.extend(egui::Shape::dashed_line(
                &[start, end],
                Stroke::new(2., LINE_COLOR),
                4.,
                4.,
            ));
        }

        if let Selection::Locked(angle) = self.session.selection() {
            let end = to_screen(line_endpoint(anchor, angle, length));
            painter.line_segment([start, end], Stroke::new(2., LINE_COLOR));
        }
    }

    fn labeling_controls(&mut self, ui: &mut egui::Ui) {
        let ctx = ui.ctx().clone();

        if self.session.is_complete() {
            let (saved, skipped, failed) = self.session.counts();
            ui.label(RichText::new("All GIFs are labeled.").size(16.));
            ui.label(format!(
                "Saved {}, skipped {}, failed {} this run.",
                saved, skipped, failed
            ));
        } else {
            let filename = self.current.as_ref().map_or("N/A", |c| c.filename.as_str());
            ui.label(format!("Filename: {}", filename));
            let (pos, total) = self.session.progress();
            ui.label(format!("Progress: {}/{}", pos, total));

            let text = match (self.session.hover(), self.session.selection()) {
                (Some(h), Selection::Locked(a)) => {
                    format!("Hover: {:.1}° | Selected: {:.1}°", h, a)
                }
                (None, Selection::Locked(a)) => format!("Selected: {:.1}°", a),
                (Some(h), Selection::Unlocked) => format!("Angle: {:.1}°", h),
                (None, Selection::Unlocked) => "Move mouse to select angle".to_string(),
            };
            ui.label(RichText::new(text).size(16.));
        }

        ui.add_space(8.);

        ui.horizontal(|ui| {
            let active = !self.session.is_complete();
            let locked = self.session.selection().locked().is_some();

            if ui
                .add_enabled(active && locked, egui::Button::new(RichText::new("Save & Next").size(16.)))
                .clicked()
            {
                self.save_and_next(&ctx);
            }

            if ui
                .add_enabled(active, egui::Button::new(RichText::new("Skip (→)").size(16.)))
                .clicked()
            {
                self.skip(&ctx);
            }

            if ui.button(RichText::new("Quit").size(16.)).clicked() {
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        });

        if !self.errors.is_empty() {
            ui.separator();
            ui.horizontal(|ui| {
                ui.label(RichText::new("Errors").color(Color32::RED));
                if ui.button("Clear").clicked() {
                    self.errors.clear();
                }
            });
            egui::ScrollArea::vertical().show(ui, |ui| {
                for e in self.errors.iter().rev() {
                    ui.label(RichText::new(e).color(Color32::RED));
                }
            });
        }
    }
}
