use std::time::Instant;

use crate::{
    animation::{AnimatedGif, Playback},
    appconfig::AppSettings,
    labels::LabelStore,
    session::Session,
};

#[derive(serde::Serialize, serde::Deserialize, Default)]
pub struct App {
    #[serde(skip)]
    pub errors: Vec<String>,

    #[serde(skip)]
    pub settings: AppSettings,

    /// None when the results file could not be read
    #[serde(skip)]
    pub labels: Option<LabelStore>,

    #[serde(skip)]
    pub session: Session,

    #[serde(skip)]
    pub current: Option<LoadedGif>,

    #[serde(skip)]
    pub last_tick: Option<Instant>,

    pub current_tab: Tab,
}

/// The candidate on screen, decoded and uploaded.
pub struct LoadedGif {
    pub filename: String,
    pub gif: AnimatedGif,
    pub playback: Playback,
    pub texture: egui::TextureHandle,
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, Debug, PartialEq, PartialOrd)]
pub enum Tab {
    Labeling,
    Options,
}

impl Default for Tab {
    fn default() -> Self {
        Tab::Labeling
    }
}
