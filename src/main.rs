#![allow(unused_variables)]
#![allow(unused_imports)]
#![allow(unused_mut)]
#![allow(dead_code)]
#![allow(unused_doc_comments)]
// #![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

pub mod angle;
pub mod animation;
pub mod appconfig;
pub mod labels;
pub mod logging;
pub mod overlay;
pub mod session;
pub mod ui;

use anyhow::{anyhow, bail, ensure, Context, Result};
use tracing::{debug, error, info, trace, warn};

/// Overlay compositor batch job
#[cfg(feature = "overlay")]
fn main() -> Result<()> {
    let _guard = logging::init_logs();

    let settings: appconfig::OverlaySettings =
        appconfig::read_settings_from_file("overlay.toml")?;
    debug!("Overlay settings: {:?}", settings);

    if let Err(e) = overlay::run(&settings) {
        error!("Overlay failed: {:#}", e);
        return Err(e);
    }

    Ok(())
}

/// Main App
#[cfg(not(feature = "overlay"))]
fn main() -> eframe::Result<()> {
    use ui::ui_types::App;

    let _guard = logging::init_logs();

    let settings: appconfig::AppSettings =
        match appconfig::read_settings_from_file(ui::options::CONFIG_PATH) {
            Ok(settings) => settings,
            Err(e) => {
                error!("{:#}, using defaults", e);
                Default::default()
            }
        };
    debug!("Settings: {:?}", settings);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("GIF Angle Labeler")
            .with_inner_size([
                settings.canvas_width as f32 + 40.,
                settings.canvas_height as f32 + 260.,
            ])
            .with_min_inner_size([300.0, 200.0]),
        ..Default::default()
    };
    eframe::run_native(
        "gif_angle_labeler",
        native_options,
        Box::new(|cc| Ok(Box::new(App::new(cc, settings)))),
    )
}
