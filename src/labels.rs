use std::{
    collections::HashMap,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, ensure, Context, Result};
use tracing::{debug, error, info, trace, warn};

pub const HEADER: [&str; 2] = ["filename", "angle"];

/// One row of the results file.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct LabelRecord {
    filename: String,
    #[serde(serialize_with = "two_decimals")]
    angle: f64,
}

fn two_decimals<S: serde::Serializer>(angle: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("{:.2}", angle))
}

/// Filename -> angle labels, backed by a CSV results file.
///
/// The file is always rewritten whole, so it never holds duplicate rows
/// once this store has saved it.
#[derive(Debug, Clone)]
pub struct LabelStore {
    path: PathBuf,
    labels: HashMap<String, f64>,
}

impl LabelStore {
    pub fn empty<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            labels: HashMap::new(),
        }
    }

    /// A missing file is an empty store. Later rows override earlier ones.
    ///
    /// The header row is optional, a leading UTF-8 BOM is ignored.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut out = Self::empty(&path);

        let s = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No results file at {:?}, starting fresh", out.path);
                return Ok(out);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {:?}", out.path));
            }
        };
        let s = s.strip_prefix('\u{feff}').unwrap_or(&s);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(s.as_bytes());

        let mut duplicates = 0;
        for (i, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("Failed to parse {:?}", out.path))?;
            let line = record.position().map_or(i as u64 + 1, |p| p.line());

            if i == 0 && record.iter().eq(HEADER) {
                continue;
            }
            ensure!(
                record.len() == 2,
                "{:?} line {}: expected 2 columns, found {}",
                out.path,
                line,
                record.len()
            );
            let row: LabelRecord = record.deserialize(None).with_context(|| {
                format!("{:?} line {}: bad angle {:?}", out.path, line, &record[1])
            })?;
            if out.labels.insert(row.filename, row.angle).is_some() {
                duplicates += 1;
            }
        }

        if duplicates > 0 {
            warn!(
                "{} duplicate rows in {:?}, keeping the last of each",
                duplicates, out.path
            );
        }
        debug!("Loaded {} labels from {:?}", out.labels.len(), out.path);

        Ok(out)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.labels.contains_key(filename)
    }

    pub fn get(&self, filename: &str) -> Option<f64> {
        self.labels.get(filename).copied()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Rows in natural filename order.
    pub fn sorted(&self) -> Vec<(&str, f64)> {
        let mut out: Vec<(&str, f64)> =
            self.labels.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        out.sort_by(|a, b| alphanumeric_sort::compare_str(a.0, b.0));
        out
    }

    /// Sets the label and rewrites the results file.
    ///
    /// If the write fails the in-memory state is rolled back, so the store
    /// always matches what is on disk.
    pub fn insert_and_save(&mut self, filename: &str, angle: f64) -> Result<()> {
        let prev = self.labels.insert(filename.to_string(), angle);

        if let Err(e) = self.save() {
            match prev {
                Some(prev) => self.labels.insert(filename.to_string(), prev),
                None => self.labels.remove(filename),
            };
            return Err(e);
        }

        Ok(())
    }

    /// Writes the full contents to a sibling temp file, then renames it over the results file.
    pub fn save(&self) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(vec![]);
        writer.write_record(HEADER)?;
        for (filename, angle) in self.sorted() {
            writer.serialize(LabelRecord {
                filename: filename.to_string(),
                angle,
            })?;
        }
        let bytes = writer.into_inner().map_err(|e| e.into_error())?;

        let tmp = tmp_path(&self.path);
        let res = (|| -> Result<()> {
            let mut f = std::fs::File::create(&tmp)
                .with_context(|| format!("Failed to create {:?}", tmp))?;
            f.write_all(&bytes)?;
            f.sync_all()?;
            std::fs::rename(&tmp, &self.path)
                .with_context(|| format!("Failed to replace {:?}", self.path))?;
            Ok(())
        })();

        if let Err(e) = res {
            let _ = std::fs::remove_file(&tmp);
            error!("Could not write {:?}: {:#}", self.path, e);
            return Err(e);
        }

        trace!("Saved {} labels to {:?}", self.labels.len(), self.path);
        Ok(())
    }
}

pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "out".into());
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "gif_angle_labeler_{}_{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = scratch_dir("labels_missing");
        let store = LabelStore::load(dir.join("labels.csv")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn last_row_wins() {
        let dir = scratch_dir("labels_dupes");
        let path = dir.join("labels.csv");
        std::fs::write(&path, "filename,angle\na.gif,10.00\nb.gif,20\na.gif,30.5\n").unwrap();

        let store = LabelStore::load(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a.gif"), Some(30.5));
        assert_eq!(store.get("b.gif"), Some(20.));
    }

    #[test]
    fn headerless_file_loads() {
        let dir = scratch_dir("labels_noheader");
        let path = dir.join("labels.csv");
        std::fs::write(&path, "a.gif,1\r\n\r\nb.gif,2\r\n").unwrap();

        let store = LabelStore::load(&path).unwrap();
        assert_eq!(store.get("a.gif"), Some(1.));
        assert_eq!(store.get("b.gif"), Some(2.));
    }

    #[test]
    fn bom_and_crlf_from_spreadsheets() {
        let dir = scratch_dir("labels_bom");
        let path = dir.join("labels.csv");
        std::fs::write(&path, "\u{feff}filename,angle\r\na.gif,10.00\r\n").unwrap();

        let store = LabelStore::load(&path).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a.gif"), Some(10.));
    }

    #[test]
    fn wrong_column_count_is_an_error() {
        let dir = scratch_dir("labels_columns");
        let path = dir.join("labels.csv");
        std::fs::write(&path, "filename,angle\na.gif,1,extra\n").unwrap();
        let err = LabelStore::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("expected 2 columns"));
    }

    #[test]
    fn bad_angle_is_an_error() {
        let dir = scratch_dir("labels_bad");
        let path = dir.join("labels.csv");
        std::fs::write(&path, "filename,angle\na.gif,north\n").unwrap();
        let err = LabelStore::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[test]
    fn relabel_overwrites_instead_of_duplicating() {
        let dir = scratch_dir("labels_overwrite");
        let path = dir.join("labels.csv");
        let mut store = LabelStore::load(&path).unwrap();

        store.insert_and_save("b.gif", 45.).unwrap();
        store.insert_and_save("a.gif", 90.).unwrap();
        store.insert_and_save("b.gif", 123.456).unwrap();

        let s = std::fs::read_to_string(&path).unwrap();
        assert_eq!(s, "filename,angle\na.gif,90.00\nb.gif,123.46\n");
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn quoted_names_survive() {
        let dir = scratch_dir("labels_quoted");
        let path = dir.join("labels.csv");
        let mut store = LabelStore::empty(&path);
        store.insert_and_save("odd, \"name\".gif", 12.).unwrap();

        let store = LabelStore::load(&path).unwrap();
        assert_eq!(store.get("odd, \"name\".gif"), Some(12.));
    }

    #[test]
    fn failed_save_rolls_back() {
        let dir = scratch_dir("labels_unwritable");
        let path = dir.join("missing_subdir").join("labels.csv");
        let mut store = LabelStore::empty(&path);

        assert!(store.insert_and_save("a.gif", 10.).is_err());
        assert!(!store.contains("a.gif"));
    }

    #[test]
    fn natural_order() {
        let mut store = LabelStore::empty("unused.csv");
        store.labels.insert("gif_10.gif".to_string(), 1.);
        store.labels.insert("gif_2.gif".to_string(), 2.);
        let names: Vec<_> = store.sorted().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["gif_2.gif", "gif_10.gif"]);
    }
}
