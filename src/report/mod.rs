use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{TrackerError, TrackerResult};
use crate::types::{ActivityRecord, ACTIVITY_COLUMNS};

/// The CSV/JSON pair written for one environment in one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunArtifact {
    pub csv_path: PathBuf,
    pub json_path: PathBuf,
}

impl RunArtifact {
    /// File name of the CSV artifact, as quoted in notifications.
    pub fn file_name(&self) -> String {
        self.csv_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

pub fn artifact_base_name(label: &str, run_label: &str) -> String {
    format!("stream-changes-{}-{}", label, run_label)
}

/// Writes run artifacts under a log directory
pub struct ReportWriter {
    log_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
        }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn write(
        &self,
        label: &str,
        run_label: &str,
        records: &[ActivityRecord],
    ) -> TrackerResult<RunArtifact> {
        fs::create_dir_all(&self.log_dir).map_err(|e| write_error(&self.log_dir, e))?;

        let base = artifact_base_name(label, run_label);
        let artifact = RunArtifact {
            csv_path: self.log_dir.join(format!("{base}.csv")),
            json_path: self.log_dir.join(format!("{base}.json")),
        };

        let written = write_csv(&artifact.csv_path, records)
            .and_then(|_| write_json(&artifact.json_path, records));
        if let Err(e) = written {
            discard(&artifact);
            return Err(e);
        }
        Ok(artifact)
    }
}

// A half-written pair must not be left behind for operators to read.
fn discard(artifact: &RunArtifact) {
    for path in [&artifact.csv_path, &artifact.json_path] {
        if !path.is_file() {
            continue;
        }
        match fs::remove_file(path) {
            Ok(()) => debug!("Removed partial artifact {}", path.display()),
            Err(e) => warn!("Could not remove partial artifact {}: {}", path.display(), e),
        }
    }
}

fn write_csv(path: &Path, records: &[ActivityRecord]) -> TrackerResult<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| write_error(path, e))?;
    // Written explicitly so an empty set still gets a header.
    writer
        .write_record(ACTIVITY_COLUMNS)
        .map_err(|e| write_error(path, e))?;
    for record in records {
        writer
            .write_record([
                record.created.format("%Y-%m-%d %H:%M:%S").to_string(),
                record.user_id.to_string(),
                record.summary.clone(),
                record.action.clone(),
                record.context.clone(),
            ])
            .map_err(|e| write_error(path, e))?;
    }
    writer.flush().map_err(|e| write_error(path, e))
}

fn write_json(path: &Path, records: &[ActivityRecord]) -> TrackerResult<()> {
    let file = File::create(path).map_err(|e| write_error(path, e))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, records).map_err(|e| write_error(path, e))?;
    out.flush().map_err(|e| write_error(path, e))
}

fn write_error(path: &Path, err: impl std::fmt::Display) -> TrackerError {
    TrackerError::Write {
        path: path.to_path_buf(),
        detail: err.to_string(),
    }
}
