use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::capture::alert_event::AlertEvent;
use crate::shared::constants::LOG_HEADER;

/// Append-only CSV history of alerts: `timestamp,filename`.
///
/// Rows are never rewritten; the file is reopened in append mode per row so
/// an external reader always sees complete lines.
pub struct AlertLog {
    path: PathBuf,
}

impl AlertLog {
    /// Opens the log, creating it (and its directory) with the header row if
    /// absent. An existing file is left untouched.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        if !path.exists() {
            fs::write(&path, format!("{LOG_HEADER}\n"))?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, event: &AlertEvent) -> io::Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        let filename = event.image_path.to_string_lossy();
        writeln!(
            file,
            "{},{}",
            csv_field(&event.timestamp),
            csv_field(&filename)
        )?;
        file.flush()
    }
}

/// RFC 4180 quoting: wrap in quotes when the value contains a separator,
/// quote or line break, doubling embedded quotes.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(ts: &str, path: &str) -> AlertEvent {
        AlertEvent {
            timestamp: ts.to_string(),
            image_path: PathBuf::from(path),
        }
    }

    #[test]
    fn test_open_creates_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("danger_log.csv");
        AlertLog::open(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "timestamp,filename\n");
    }

    #[test]
    fn test_open_keeps_existing_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("danger_log.csv");
        fs::write(&path, "timestamp,filename\nold,row.jpg\n").unwrap();

        let log = AlertLog::open(&path).unwrap();
        log.append(&event("20250101_120000_001", "danger_shots/a.jpg"))
            .unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "timestamp,filename\nold,row.jpg\n20250101_120000_001,danger_shots/a.jpg\n"
        );
    }

    #[test]
    fn test_append_quotes_awkward_paths() {
        let dir = tempfile::tempdir().unwrap();
        let log = AlertLog::open(dir.path().join("log.csv")).unwrap();
        log.append(&event("t", "shots, \"cam 1\"/a.jpg")).unwrap();

        let content = fs::read_to_string(log.path()).unwrap();
        assert!(content.ends_with("t,\"shots, \"\"cam 1\"\"/a.jpg\"\n"));
    }

    #[test]
    fn test_csv_field_plain_value_unchanged() {
        assert_eq!(csv_field("danger_20250101.jpg"), "danger_20250101.jpg");
    }
}
