//! Workload loading: one job length per line.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};
use walkdir::WalkDir;

use taskgrid_core::SimResult;

static UNSAFE_NAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_.\-]").expect("static regex"));

/// Ordered job lengths of one dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workload {
    pub label: String,
    pub source: Option<PathBuf>,
    pub lengths: Vec<u64>,
    /// Non-empty lines that were not a positive integer.
    pub skipped: usize,
}

impl Workload {
    /// Parse one length per line. Blank lines are ignored; malformed,
    /// non-UTF-8 or non-positive values are counted in `skipped` and
    /// otherwise dropped. Only read failures are errors.
    pub fn parse<R: BufRead>(label: &str, reader: R) -> SimResult<Self> {
        let mut lengths = Vec::new();
        let mut skipped = 0;

        for line in reader.split(b'\n') {
            let line = line?;
            let Ok(text) = std::str::from_utf8(&line) else {
                skipped += 1;
                continue;
            };
            let value = text.trim();
            if value.is_empty() {
                continue;
            }
            match value.parse::<u64>() {
                Ok(len) if len > 0 => lengths.push(len),
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            debug!(dataset = label, skipped, "skipped malformed workload lines");
        }

        Ok(Self {
            label: label.to_string(),
            source: None,
            lengths,
            skipped,
        })
    }

    pub fn from_lengths(label: &str, lengths: Vec<u64>) -> Self {
        Self {
            label: label.to_string(),
            source: None,
            lengths,
            skipped: 0,
        }
    }

    /// Load a dataset file; the label defaults to the file stem.
    pub fn from_file(path: &Path, label: Option<&str>) -> SimResult<Self> {
        let label = label.map(str::to_string).unwrap_or_else(|| default_label(path));
        let file = File::open(path)?;
        let mut workload = Self::parse(&label, BufReader::new(file))?;
        workload.source = Some(path.to_path_buf());
        if workload.lengths.is_empty() {
            warn!(dataset = %label, path = %path.display(), "dataset has no valid job lengths");
        }
        Ok(workload)
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }
}

/// File name without its final extension.
pub fn default_label(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string())
}

/// Name of the directory holding the dataset, or `"dataset"`.
pub fn folder_tag(path: &Path) -> String {
    path.parent()
        .and_then(Path::file_name)
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string())
}

/// Replace anything outside `[A-Za-z0-9_.-]` so the label is a safe file name.
pub fn sanitize_label(label: &str) -> String {
    UNSAFE_NAME_CHARS.replace_all(label, "_").into_owned()
}

/// `*.txt` files directly inside `dir`, sorted by file name.
///
/// A missing or unreadable directory yields an empty list.
pub fn list_datasets(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
        })
        .map(|e| e.into_path())
        .collect()
}
