use anyhow::Context;
use jaccard_core::{Error, Log, Result, Task};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loads a log from a newline-delimited text file, one member per line.
///
/// Empty lines are skipped and a trailing `\r` is stripped. Item
/// identifiers are paths, resolved against `base` when one is set.
#[derive(Debug, Clone, Default)]
pub struct FileLoader {
    base: Option<PathBuf>,
}

impl FileLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base<P: AsRef<Path>>(base: P) -> Self {
        Self {
            base: Some(base.as_ref().to_path_buf()),
        }
    }

    pub fn resolve(&self, item: &str) -> PathBuf {
        match &self.base {
            Some(base) => base.join(item),
            None => PathBuf::from(item),
        }
    }

    /// Read one log. A missing or unreadable file is a loader failure.
    pub async fn read(&self, item: &str) -> Result<Option<Log>> {
        let path = self.resolve(item);
        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading log file {}", path.display()))
            .map_err(Error::loader)?;
        let log = parse_log(&text);
        debug!(path = %path.display(), members = log.len(), "log file loaded");
        Ok(Some(log))
    }

    pub fn loader(&self) -> Task<String, Option<Log>> {
        let files = self.clone();
        Task::from_async(move |item: String| {
            let files = files.clone();
            async move { files.read(&item).await }
        })
    }
}

/// Split newline-delimited text into a log, dropping empty lines.
pub fn parse_log(text: &str) -> Log {
    Log::new(
        text.split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter(|line| !line.is_empty()),
    )
}
