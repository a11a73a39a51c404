//! Durable save strategies.
//!
//! A strategy receives the serialized corpus and reports where it went.
//! Version-control backed strategies implement the same trait outside this
//! crate.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

pub trait DurableSave: Send {
    /// Writes `content` for the document at `path`. `message` describes the
    /// change, for strategies that keep a log.
    fn save(&mut self, path: &Path, content: &str, message: &str) -> io::Result<PathBuf>;
}

/// Writes next to the original, as `<file><suffix>`
#[derive(Debug, Clone)]
pub struct BackupFile {
    suffix: String,
}

impl BackupFile {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    pub fn target(&self, path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(&self.suffix);
        PathBuf::from(name)
    }
}

impl Default for BackupFile {
    fn default() -> Self {
        Self::new(".2")
    }
}

impl DurableSave for BackupFile {
    fn save(&mut self, path: &Path, content: &str, message: &str) -> io::Result<PathBuf> {
        let target = self.target(path);
        fs::write(&target, content)?;
        info!(path = %target.display(), message, "saved backup");
        Ok(target)
    }
}

/// Overwrites the original file
#[derive(Debug, Clone, Copy, Default)]
pub struct InPlace;

impl DurableSave for InPlace {
    fn save(&mut self, path: &Path, content: &str, message: &str) -> io::Result<PathBuf> {
        fs::write(path, content)?;
        info!(path = %path.display(), message, "saved");
        Ok(path.to_path_buf())
    }
}

/// Keeps every save in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub saves: Vec<(PathBuf, String, String)>,

    /// Makes every save fail with this message
    pub fail_with: Option<String>,
}

impl MemorySink {
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            saves: Vec::new(),
            fail_with: Some(message.into()),
        }
    }

    pub fn last_content(&self) -> Option<&str> {
        self.saves.last().map(|(_, content, _)| content.as_str())
    }
}

impl DurableSave for MemorySink {
    fn save(&mut self, path: &Path, content: &str, message: &str) -> io::Result<PathBuf> {
        if let Some(reason) = &self.fail_with {
            return Err(io::Error::other(reason.clone()));
        }
        self.saves
            .push((path.to_path_buf(), content.to_string(), message.to_string()));
        Ok(path.to_path_buf())
    }
}
