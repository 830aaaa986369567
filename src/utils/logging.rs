//! Plain-text transcript of a chat session, appended to a user-chosen file.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

pub struct TranscriptLog {
    file_path: Option<PathBuf>,
}

impl TranscriptLog {
    pub fn disabled() -> Self {
        Self { file_path: None }
    }

    /// Open (or create) the transcript file and write a session header.
    pub fn new(log_file: Option<PathBuf>) -> Result<Self, Box<dyn std::error::Error>> {
        let log = Self {
            file_path: log_file,
        };
        if log.is_active() {
            log.append(&format!(
                "## Session started {}",
                Local::now().format("%Y-%m-%d %H:%M:%S")
            ))?;
        }
        Ok(log)
    }

    pub fn is_active(&self) -> bool {
        self.file_path.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Append one entry. Multi-line content keeps its line breaks; a blank
    /// line separates entries.
    pub fn append(&self, content: &str) -> Result<(), Box<dyn std::error::Error>> {
        let Some(file_path) = self.file_path.as_ref() else {
            return Ok(());
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;
        let mut writer = BufWriter::new(file);

        for line in content.lines() {
            writeln!(writer, "{line}")?;
        }
        writeln!(writer)?;

        writer.flush()?;
        Ok(())
    }
}
