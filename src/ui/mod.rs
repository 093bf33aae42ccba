pub mod data_labeling;
pub mod options;
pub mod ui_types;

use std::time::{Duration, Instant};

use ui_types::*;

use anyhow::{anyhow, bail, ensure, Context, Result};
use tracing::{debug, error, info, trace, warn};

use crate::{
    animation::{AnimatedGif, Playback},
    appconfig::AppSettings,
    labels::LabelStore,
    session::{list_candidates, SaveOutcome, Session},
};

/// New
impl App {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>, settings: AppSettings) -> Self {
        let mut out: Self = if let Some(storage) = cc.storage {
            eframe::get_value(storage, eframe::APP_KEY).unwrap_or_default()
        } else {
            Default::default()
        };

        out.settings = settings;
        out.start_session();

        out
    }

    /// Reads the results file and the candidate directory once.
    pub fn start_session(&mut self) {
        let labels = match LabelStore::load(&self.settings.results_file) {
            Ok(labels) => labels,
            Err(e) => {
                error!("{:#}", e);
                self.push_error(format!(
                    "Could not read {:?}, labeling disabled: {:#}",
                    self.settings.results_file, e
                ));
                return;
            }
        };

        let files = match list_candidates(&self.settings.gif_directory, &self.settings.extension)
        {
            Ok(files) => files,
            Err(e) => {
                error!("{:#}", e);
                self.push_error(format!("{:#}", e));
                vec![]
            }
        };

        self.session = Session::new(files, &labels);
        self.labels = Some(labels);
    }
}

/// errors
impl App {
    /// Appends to the error list, unless it repeats the latest entry.
    pub fn push_error(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        if self.errors.last() == Some(&msg) {
            return;
        }
        self.errors.push(msg);
    }
}

/// loading and playback
impl App {
    /// Loads the session's current item, auto-skipping anything that fails to decode.
    pub fn load_current(&mut self, ctx: &egui::Context) {
        self.current = None;

        while let Some(filename) = self.session.current().map(|s| s.to_string()) {
            let path = self.settings.gif_directory.join(&filename);
            let size = (self.settings.canvas_width, self.settings.canvas_height);
            let delay = Duration::from_millis(self.settings.default_frame_delay_ms);

            match AnimatedGif::load(&path, size, delay) {
                Ok(gif) => {
                    let texture =
                        ctx.load_texture(&filename, gif.color_image(0), Default::default());
                    let playback = Playback::new(gif.delays.clone());
                    self.current = Some(LoadedGif {
                        filename,
                        gif,
                        playback,
                        texture,
                    });
                    self.last_tick = Some(Instant::now());
                    return;
                }
                Err(e) => {
                    self.push_error(format!("Could not load {}: {:#}", filename, e));
                    self.session.mark_failed(&e);
                }
            }
        }
    }

    /// Advances the animation by wall-clock time and schedules the next repaint.
    fn tick(&mut self, ctx: &egui::Context) {
        let now = Instant::now();
        let dt = self.last_tick.map_or(Duration::ZERO, |t| now - t);
        self.last_tick = Some(now);

        let Some(current) = self.current.as_mut() else {
            return;
        };

        if current.playback.advance(dt) {
            let image = current.gif.color_image(current.playback.index());
            current.texture.set(image, Default::default());
        }

        if let Some(next) = current.playback.time_until_next() {
            ctx.request_repaint_after(next);
        }
    }

    pub fn save_and_next(&mut self, ctx: &egui::Context) {
        let Some(labels) = self.labels.as_mut() else {
            self.push_error("No results file loaded");
            return;
        };

        match self.session.save_and_next(labels) {
            Ok(SaveOutcome::Saved { .. }) => self.load_current(ctx),
            Ok(SaveOutcome::NotLocked) => {
                debug!("Save & Next without a locked angle");
                self.push_error("Please click on the image to select an angle before saving.");
            }
            Err(e) => {
                error!("{:#}", e);
                self.push_error(format!("{:#}", e));
            }
        }
    }

    pub fn skip(&mut self, ctx: &egui::Context) {
        if self.session.is_complete() {
            return;
        }
        self.session.skip();
        self.load_current(ctx);
    }
}

impl eframe::App for App {
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, self);
    }

    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        if self.current.is_none() && !self.session.is_complete() {
            self.load_current(ctx);
        }

        if self.current_tab == Tab::Labeling {
            if ctx.input(|i| i.key_pressed(egui::Key::ArrowRight)) {
                self.skip(ctx);
            }
            if ctx.input(|i| i.key_pressed(egui::Key::Enter)) {
                self.save_and_next(ctx);
            }
        }

        self.tick(ctx);

        egui::TopBottomPanel::top("tabs").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.current_tab, Tab::Labeling, "Labeling");
                ui.selectable_value(&mut self.current_tab, Tab::Options, "Options");
            });
        });

        match self.current_tab {
            Tab::Labeling => self.data_labeling(ctx),
            Tab::Options => self.options(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::tests::scratch_dir;

    #[test]
    fn repeated_error_is_listed_once() {
        let mut app = App::default();
        app.push_error("disk full");
        app.push_error("disk full");
        assert_eq!(app.errors, vec!["disk full".to_string()]);

        app.push_error("other");
        app.push_error("disk full");
        assert_eq!(app.errors.len(), 3);
    }

    #[test]
    fn enter_spam_without_lock_leaves_one_message() {
        let dir = scratch_dir("ui_enter_spam");
        let labels = LabelStore::empty(dir.join("labels.csv"));
        let mut app = App {
            session: Session::new(vec!["a.gif".to_string()], &labels),
            labels: Some(labels),
            ..Default::default()
        };
        let ctx = egui::Context::default();

        for _ in 0..20 {
            app.save_and_next(&ctx);
        }
        assert_eq!(app.errors.len(), 1);
        assert_eq!(app.session.current(), Some("a.gif"));
    }
}
