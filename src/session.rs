use std::path::Path;

use anyhow::{anyhow, bail, ensure, Context, Result};
use tracing::{debug, error, info, trace, warn};

use crate::{angle::angle_from_pointer, labels::LabelStore};

/// Angle selection for the item on screen.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Selection {
    /// Preview only, the line follows the pointer.
    #[default]
    Unlocked,
    Locked(f64),
}

impl Selection {
    pub fn locked(&self) -> Option<f64> {
        match self {
            Selection::Unlocked => None,
            Selection::Locked(a) => Some(*a),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Nothing was selected, nothing written.
    NotLocked,
    Saved { filename: String, angle: f64 },
}

/// Animation file names in `dir` with the given extension, in natural order.
///
/// A missing directory is treated as empty.
pub fn list_candidates<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<String>> {
    let dir = dir.as_ref();

    let read = match std::fs::read_dir(dir) {
        Ok(read) => read,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Directory {:?} not found, nothing to label", dir);
            return Ok(vec![]);
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to list {:?}", dir)),
    };

    let mut out = vec![];
    for entry in read {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| e.eq_ignore_ascii_case(extension));
        if !matches {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => out.push(name),
            Err(name) => warn!("Skipping non UTF-8 file name {:?}", name),
        }
    }

    alphanumeric_sort::sort_str_slice(&mut out);
    Ok(out)
}

/// Labeling session state, independent of the GUI.
#[derive(Debug, Clone, Default)]
pub struct Session {
    candidates: Vec<String>,
    cursor: usize,
    selection: Selection,
    hover: Option<f64>,
    saved: usize,
    skipped: usize,
    failed: usize,
}

impl Session {
    /// Candidates are `all_files` minus anything already in `labels`, order kept.
    pub fn new(all_files: Vec<String>, labels: &LabelStore) -> Self {
        let total = all_files.len();
        let candidates: Vec<String> = all_files
            .into_iter()
            .filter(|f| !labels.contains(f))
            .collect();

        info!(
            "{} files, {} already labeled, {} to go",
            total,
            total - candidates.len(),
            candidates.len()
        );

        Self {
            candidates,
            ..Default::default()
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.candidates.get(self.cursor).map(|s| s.as_str())
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= self.candidates.len()
    }

    /// (1-based position, total)
    pub fn progress(&self) -> (usize, usize) {
        let total = self.candidates.len();
        ((self.cursor + 1).min(total), total)
    }

    pub fn remaining(&self) -> usize {
        self.candidates.len().saturating_sub(self.cursor)
    }

    /// (saved, skipped, failed) so far this run
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.saved, self.skipped, self.failed)
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn hover(&self) -> Option<f64> {
        self.hover
    }

    pub fn pointer_moved(&mut self, anchor: (f64, f64), pos: (f64, f64)) {
        if self.is_complete() {
            return;
        }
        self.hover = angle_from_pointer(anchor, pos);
    }

    /// Locks the angle at `pos`. A second click re-locks at the new position.
    pub fn click(&mut self, anchor: (f64, f64), pos: (f64, f64)) -> Option<f64> {
        if self.is_complete() {
            return None;
        }
        let angle = angle_from_pointer(anchor, pos)?;
        self.hover = Some(angle);
        self.selection = Selection::Locked(angle);
        trace!("Locked {:.1}", angle);
        Some(angle)
    }

    pub fn unlock(&mut self) {
        self.selection = Selection::Unlocked;
    }

    /// Saves the locked angle for the current item and moves on.
    ///
    /// On a write error the cursor stays put so the save can be retried.
    pub fn save_and_next(&mut self, labels: &mut LabelStore) -> Result<SaveOutcome> {
        let Some(filename) = self.current().map(|s| s.to_string()) else {
            return Ok(SaveOutcome::NotLocked);
        };
        let Selection::Locked(angle) = self.selection else {
            debug!("Save requested with no angle locked");
            return Ok(SaveOutcome::NotLocked);
        };

        labels
            .insert_and_save(&filename, angle)
            .with_context(|| format!("Failed to save label for {}", filename))?;

        info!("Saved {} = {:.2}", filename, angle);
        self.saved += 1;
        self.advance();

        Ok(SaveOutcome::Saved { filename, angle })
    }

    pub fn skip(&mut self) {
        if let Some(f) = self.current() {
            debug!("Skipping {}", f);
            self.skipped += 1;
            self.advance();
        }
    }

    /// The current item could not be loaded: log and move on without a label.
    pub fn mark_failed(&mut self, reason: &anyhow::Error) {
        if let Some(f) = self.current() {
            error!("Could not load {}: {:#}", f, reason);
            self.failed += 1;
            self.advance();
        }
    }

    fn advance(&mut self) {
        self.cursor += 1;
        self.selection = Selection::Unlocked;
        self.hover = None;

        if self.is_complete() {
            info!(
                "Session complete: {} saved, {} skipped, {} failed",
                self.saved, self.skipped, self.failed
            );
        }
    }
}
