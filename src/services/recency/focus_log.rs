use crate::config::RecencyConfig;
use crate::debug_if_enabled;
use crate::error::Result;
use crate::utils::Clock;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Одна запись журнала фокуса: `<unix-seconds>:<entityId>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusLogEntry {
    pub timestamp_secs: u64,
    pub entity_id: u64,
}

impl FocusLogEntry {
    /// `None` for anything that is not exactly two unsigned integers around a colon.
    pub fn parse(line: &str) -> Option<Self> {
        let (secs, id) = line.trim().split_once(':')?;
        Some(Self {
            timestamp_secs: secs.trim().parse().ok()?,
            entity_id: id.trim().parse().ok()?,
        })
    }

    pub fn to_line(&self) -> String {
        format!("{}:{}\n", self.timestamp_secs, self.entity_id)
    }
}

/// Append-only focus log written by the window manager's signal hook.
///
/// Readers tolerate a half-written trailing line from a concurrent writer:
/// lines that do not parse are skipped. Once the file grows past
/// `rotate_after_lines` it is cut down to the newest `keep_lines` entries.
pub struct FocusLog {
    path: PathBuf,
    rotate_after_lines: usize,
    keep_lines: usize,
    clock: Arc<dyn Clock>,
}

impl FocusLog {
    pub fn new(config: &RecencyConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: config.focus_log_path.clone(),
            rotate_after_lines: config.rotate_after_lines,
            keep_lines: config.keep_lines,
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Latest focus time in seconds per entity id. A missing or unreadable
    /// log is an empty map.
    pub async fn read(&self) -> HashMap<u64, u64> {
        let contents = match fs::read(&self.path).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) if e.kind() == ErrorKind::NotFound => return HashMap::new(),
            Err(e) => {
                warn!("Не удалось прочитать журнал фокуса {:?}: {}", self.path, e);
                return HashMap::new();
            }
        };

        let mut latest = HashMap::new();
        let mut skipped = 0usize;

        for line in contents.lines().filter(|l| !l.trim().is_empty()) {
            match FocusLogEntry::parse(line) {
                Some(entry) => {
                    let slot = latest.entry(entry.entity_id).or_insert(0);
                    *slot = (*slot).max(entry.timestamp_secs);
                }
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            debug_if_enabled!("Пропущено {} нераспознанных строк журнала фокуса", skipped);
        }

        latest
    }

    /// Append a focus event for `entity_id` stamped with the current time.
    pub async fn append(&self, entity_id: u64) -> Result<FocusLogEntry> {
        let entry = FocusLogEntry {
            timestamp_secs: self.clock.now_secs(),
            entity_id,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(entry.to_line().as_bytes()).await?;
        file.flush().await?;
        drop(file);

        self.rotate_if_needed().await?;
        Ok(entry)
    }

    /// Keep only the newest `keep_lines` lines once the log exceeds
    /// `rotate_after_lines`. Returns whether the file was rewritten.
    pub async fn rotate_if_needed(&self) -> Result<bool> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        let lines: Vec<&str> = contents.lines().collect();
        if lines.len() <= self.rotate_after_lines {
            return Ok(false);
        }

        let mut kept = lines[lines.len().saturating_sub(self.keep_lines)..].join("\n");
        kept.push('\n');

        // Через временный файл, чтобы читатель не увидел усечённый журнал
        let tmp_path = self.path.with_extension("log.tmp");
        fs::write(&tmp_path, kept).await?;
        fs::rename(&tmp_path, &self.path).await?;

        info!(
            "Журнал фокуса сокращён с {} до {} записей",
            lines.len(),
            self.keep_lines
        );
        Ok(true)
    }
}
