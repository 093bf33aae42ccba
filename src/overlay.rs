use std::{
    collections::{HashMap, HashSet},
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, bail, ensure, Context, Result};
use tracing::{debug, error, info, trace, warn};

use image::{
    codecs::gif::{GifEncoder, Repeat},
    Delay, Frame, Rgba, RgbaImage,
};
use rayon::prelude::*;

use crate::{
    angle::line_endpoint,
    appconfig::{MarkerShape, OverlaySettings},
};

/// Dial orientation when a coordinate carries no `direction`: straight up.
pub const DEFAULT_DIAL_DIRECTION: f64 = 90.;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    /// degrees, 0 right and 90 up; only the dial marker uses it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<f64>,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            direction: None,
        }
    }
}

/// Coordinate file: JSON object of `key -> {"x": .., "y": .., "direction": ..}`.
///
/// A key names a frame by file name, file stem, or zero-based index.
pub fn load_coordinates<P: AsRef<Path>>(path: P) -> Result<HashMap<String, Point>> {
    let path = path.as_ref();
    let s = std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let coords: HashMap<String, Point> =
        serde_json::from_str(&s).with_context(|| format!("Failed to parse {:?}", path))?;
    debug!("Loaded {} coordinates from {:?}", coords.len(), path);
    Ok(coords)
}

/// Still images in `dir` matching any of `extensions`, in natural order.
pub fn list_frames<P: AsRef<Path>>(dir: P, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut out = vec![];
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to list {:?}", dir))? {
        let path = entry?.path();
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if path.is_file() && extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
            out.push(path);
        }
    }
    alphanumeric_sort::sort_path_slice(&mut out);
    Ok(out)
}

/// Resolves each frame's coordinate.
///
/// File names win over stems, stems over indices. A key that names some
/// frame is never reused as an index for another one.
pub fn assign_coordinates(paths: &[PathBuf], coords: &HashMap<String, Point>) -> Vec<Option<Point>> {
    let mut out: Vec<Option<Point>> = vec![None; paths.len()];
    let mut claimed: HashSet<&str> = HashSet::new();

    let names: Vec<(Option<&str>, Option<&str>)> = paths
        .iter()
        .map(|p| {
            (
                p.file_name().and_then(|n| n.to_str()),
                p.file_stem().and_then(|n| n.to_str()),
            )
        })
        .collect();

    for (i, (name, _)) in names.iter().enumerate() {
        if let Some((k, p)) = name.and_then(|n| coords.get_key_value(n)) {
            claimed.insert(k.as_str());
            out[i] = Some(*p);
        }
    }

    for (i, (_, stem)) in names.iter().enumerate() {
        if let Some((k, p)) = stem.and_then(|n| coords.get_key_value(n)) {
            claimed.insert(k.as_str());
            if out[i].is_none() {
                out[i] = Some(*p);
            }
        }
    }

    for (i, slot) in out.iter_mut().enumerate() {
        if slot.is_some() {
            continue;
        }
        let key = i.to_string();
        if claimed.contains(key.as_str()) {
            continue;
        }
        if let Some((k, p)) = coords.get_key_value(&key) {
            claimed.insert(k.as_str());
            *slot = Some(*p);
        }
    }

    let mut unused: Vec<&str> = coords
        .keys()
        .map(|k| k.as_str())
        .filter(|k| !claimed.contains(k))
        .collect();
    if !unused.is_empty() {
        unused.sort();
        debug!("{} coordinates have no matching frame: {:?}", unused.len(), unused);
    }

    out
}

/// Draws the marker centred on `center`, clipped to the image.
///
/// Only pixels inside the marker footprint (within `radius` of the centre, plus
/// rounding for the dial ticks) are touched.
/// Centres that are not finite, or whose footprint misses the image, draw nothing.
pub fn draw_marker(
    img: &mut RgbaImage,
    center: Point,
    radius: u32,
    shape: MarkerShape,
    color: Rgba<u8>,
) {
    let (w, h) = (img.width() as f64, img.height() as f64);
    let (fx, fy) = (center.x.round(), center.y.round());
    let r = radius as f64;

    if !fx.is_finite() || !fy.is_finite() {
        return;
    }
    if fx + r < 0. || fy + r < 0. || fx - r >= w || fy - r >= h {
        return;
    }

    /// in range now, the casts cannot saturate
    let (cx, cy, r) = (fx as i64, fy as i64, radius as i64);
    let (w, h) = (w as i64, h as i64);

    if let MarkerShape::Dial = shape {
        let direction = center.direction.unwrap_or(DEFAULT_DIAL_DIRECTION);
        draw_dial(img, (fx, fy), radius as f64, direction, color);
        return;
    }

    let r2 = (r as i128) * (r as i128);
    for y in (cy - r).max(0)..=(cy + r).min(h - 1) {
        for x in (cx - r).max(0)..=(cx + r).min(w - 1) {
            let (dx, dy) = ((x - cx) as i128, (y - cy) as i128);
            let inside = match shape {
                MarkerShape::Circle => dx * dx + dy * dy <= r2,
                MarkerShape::Crosshair => dx == 0 || dy == 0,
                MarkerShape::Dial => false,
            };
            if inside {
                img.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

/// Tick marks every 10 degrees across the half circle facing `direction`,
/// each running from 0.9 of the radius out to the rim.
fn draw_dial(img: &mut RgbaImage, center: (f64, f64), radius: f64, direction: f64, color: Rgba<u8>) {
    let (w, h) = (img.width() as f64, img.height() as f64);

    for step in 0..=18 {
        let angle = direction - 90. + 10. * step as f64;
        let start = line_endpoint(center, angle, 0.9 * radius);
        let end = line_endpoint(center, angle, radius);

        let len = ((end.0 - start.0).powi(2) + (end.1 - start.1).powi(2)).sqrt();
        let samples = (len * 2.).ceil().max(1.) as usize;
        for s in 0..=samples {
            let t = s as f64 / samples as f64;
            let x = (start.0 + (end.0 - start.0) * t).round();
            let y = (start.1 + (end.1 - start.1) * t).round();
            if x >= 0. && y >= 0. && x < w && y < h {
                img.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

/// Decodes every frame and draws its marker. Any unreadable frame fails the whole batch.
pub fn composite_frames(
    paths: &[PathBuf],
    coords: &HashMap<String, Point>,
    settings: &OverlaySettings,
) -> Result<Vec<RgbaImage>> {
    let color = Rgba(settings.marker_color);
    let assigned = assign_coordinates(paths, coords);

    let frames = paths
        .par_iter()
        .zip(assigned.par_iter())
        .map(|(path, point)| -> Result<RgbaImage> {
            let mut img = image::open(path)
                .with_context(|| format!("Failed to read frame {:?}", path))?
                .into_rgba8();
            match point {
                Some(p) => draw_marker(
                    &mut img,
                    *p,
                    settings.marker_radius,
                    settings.marker_shape,
                    color,
                ),
                None => trace!("No coordinate for {:?}, leaving as is", path),
            }
            Ok(img)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(frames)
}

/// Encodes `frames` as one infinitely looping GIF.
///
/// The whole GIF is encoded in memory, then written and synced to a temporary
/// sibling and renamed, so a failed run leaves nothing at `output`.
pub fn write_gif<P: AsRef<Path>>(
    frames: Vec<RgbaImage>,
    output: P,
    frame_duration: Duration,
) -> Result<()> {
    let output = output.as_ref();
    ensure!(!frames.is_empty(), "No frames to encode");

    let ms = frame_duration.as_millis() as u32;
    let mut bytes: Vec<u8> = vec![];
    {
        let mut encoder = GifEncoder::new(&mut bytes);
        encoder.set_repeat(Repeat::Infinite)?;
        for img in frames {
            encoder.encode_frame(Frame::from_parts(img, 0, 0, Delay::from_numer_denom_ms(ms, 1)))?;
        }
    }

    let tmp = crate::labels::tmp_path(output);
    let res = (|| -> Result<()> {
        let mut f =
            std::fs::File::create(&tmp).with_context(|| format!("Failed to create {:?}", tmp))?;
        f.write_all(&bytes)?;
        f.sync_all()?;
        std::fs::rename(&tmp, output)
            .with_context(|| format!("Failed to move output to {:?}", output))?;
        Ok(())
    })();

    if let Err(e) = res {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

pub fn run(settings: &OverlaySettings) -> Result<()> {
    let paths = list_frames(&settings.frames_dir, &settings.frame_extensions)?;
    ensure!(!paths.is_empty(), "No frames found in {:?}", settings.frames_dir);

    let coords = load_coordinates(&settings.coords_file)?;

    info!("Compositing {} frames with {} coordinates", paths.len(), coords.len());
    let frames = composite_frames(&paths, &coords, settings)?;

    write_gif(frames, &settings.output, Duration::from_millis(settings.frame_duration_ms))?;
    info!("Wrote {:?}", settings.output);

    Ok(())
}
