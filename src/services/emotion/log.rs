//! 情绪日志：每次采样追加一行 JSON

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::models::{Emotion, Stage};
use crate::observability::ComponentSpan;

/// 日志条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionLogEntry {
    pub timestamp: DateTime<Utc>,
    pub stage: Stage,
    pub text: String,
    pub emotion: Emotion,
}

impl EmotionLogEntry {
    pub fn new(stage: Stage, text: impl Into<String>, emotion: Emotion) -> Self {
        Self {
            timestamp: Utc::now(),
            stage,
            text: text.into(),
            emotion,
        }
    }
}

/// JSONL 情绪日志
#[derive(Debug, Clone)]
pub struct EmotionLog {
    path: PathBuf,
    log: ComponentSpan,
}

impl EmotionLog {
    pub fn new(path: impl Into<PathBuf>, log: ComponentSpan) -> Self {
        Self {
            path: path.into(),
            log,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一条记录
    pub async fn append(&self, entry: &EmotionLogEntry) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// 追加记录，写入失败只记日志
    pub async fn record(&self, stage: Stage, text: &str, emotion: &Emotion) {
        let entry = EmotionLogEntry::new(stage, text, emotion.clone());
        if let Err(e) = self.append(&entry).await {
            let _span = self.log.enter();
            tracing::warn!(path = %self.path.display(), "Failed to write emotion log: {}", e);
        }
    }

    /// 读取已有日志
    pub fn load(path: impl AsRef<Path>) -> Result<Vec<EmotionLogEntry>> {
        let raw = std::fs::read_to_string(path)?;
        raw.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(Into::into))
            .collect()
    }
}
