use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, ensure, Context, Result};
use tracing::{debug, error, info, trace, warn};

use serde::{Deserialize, Serialize};

/// Labeler settings, read from `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub gif_directory: PathBuf,
    pub results_file: PathBuf,
    pub extension: String,
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// used for frames that carry no delay of their own
    pub default_frame_delay_ms: u64,
    /// fraction of the shorter canvas side
    pub line_length: f32,
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            gif_directory: "gifs".into(),
            results_file: "labels.csv".into(),
            extension: "gif".to_string(),
            canvas_width: 400,
            canvas_height: 200,
            default_frame_delay_ms: 100,
            line_length: 0.95,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerShape {
    #[default]
    Circle,
    Crosshair,
    /// ticks every 10 degrees over the half circle facing the coordinate's `direction`
    Dial,
}

/// Compositor settings, read from `overlay.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    pub frames_dir: PathBuf,
    pub coords_file: PathBuf,
    pub output: PathBuf,
    pub frame_extensions: Vec<String>,
    pub marker_radius: u32,
    pub marker_shape: MarkerShape,
    pub marker_color: [u8; 4],
    /// GIF delays are stored in 10 ms steps
    pub frame_duration_ms: u64,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        OverlaySettings {
            frames_dir: "frames".into(),
            coords_file: "coords.json".into(),
            output: "overlay.gif".into(),
            frame_extensions: vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()],
            marker_radius: 3,
            marker_shape: MarkerShape::Circle,
            marker_color: [255, 0, 0, 255],
            frame_duration_ms: 40,
        }
    }
}

impl AppSettings {
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let s = toml::to_string_pretty(self).context("Failed to serialize AppSettings to TOML")?;
        std::fs::write(path, s)?;
        Ok(())
    }

    pub fn anchor(&self) -> (f64, f64) {
        (self.canvas_width as f64 / 2., self.canvas_height as f64 / 2.)
    }
}

/// Missing file means defaults. A file that exists but does not parse is an error.
pub fn read_settings_from_file<T, P>(path: P) -> Result<T>
where
    T: serde::de::DeserializeOwned + Default,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let s = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No {:?}, using defaults", path);
            return Ok(T::default());
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to read {:?}", path)),
    };
    let out = toml::from_str(&s).with_context(|| format!("Failed to parse {:?}", path))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::tests::scratch_dir;

    #[test]
    fn partial_file_fills_defaults() {
        let dir = scratch_dir("config_partial");
        let path = dir.join("config.toml");
        std::fs::write(&path, "gif_directory = \"clips\"\ncanvas_width = 640\n").unwrap();

        let s: AppSettings = read_settings_from_file(&path).unwrap();
        assert_eq!(s.gif_directory, PathBuf::from("clips"));
        assert_eq!(s.canvas_width, 640);
        assert_eq!(s.canvas_height, 200);
        assert_eq!(s.anchor(), (320., 100.));
    }

    #[test]
    fn missing_file_is_default() {
        let dir = scratch_dir("config_missing");
        let s: OverlaySettings = read_settings_from_file(dir.join("overlay.toml")).unwrap();
        assert_eq!(s, OverlaySettings::default());
    }

    #[test]
    fn dial_marker_from_file() {
        let dir = scratch_dir("config_dial");
        let path = dir.join("overlay.toml");
        std::fs::write(&path, "marker_shape = \"dial\"\nmarker_radius = 128\n").unwrap();
        let s: OverlaySettings = read_settings_from_file(&path).unwrap();
        assert_eq!(s.marker_shape, MarkerShape::Dial);
        assert_eq!(s.marker_radius, 128);
    }

    #[test]
    fn bad_file_is_error() {
        let dir = scratch_dir("config_bad");
        let path = dir.join("overlay.toml");
        std::fs::write(&path, "marker_shape = \"hexagon\"\n").unwrap();
        assert!(read_settings_from_file::<OverlaySettings, _>(&path).is_err());
    }

    #[test]
    fn settings_roundtrip_through_file() {
        let dir = scratch_dir("config_save");
        let path = dir.join("config.toml");
        let s = AppSettings {
            extension: "GIF".to_string(),
            ..Default::default()
        };
        s.save_to_file(&path).unwrap();
        let back: AppSettings = read_settings_from_file(&path).unwrap();
        assert_eq!(back, s);
    }
}
