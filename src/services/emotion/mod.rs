//! 情绪识别适配器
//!
//! 抓取一帧画面 → 调用分类服务 → 按置信度阈值折算成情绪标签。
//! 任何一步失败都退化为 neutral，不会影响对话流程。

pub mod log;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use crate::config::EmotionConfig;
use crate::error::{AppError, Result};
use crate::models::{Emotion, EmotionReading, Stage};
use crate::observability::ComponentSpan;

pub use log::{EmotionLog, EmotionLogEntry};

const PATH_TOKEN: &str = "{path}";

/// 画面来源
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// 抓取一帧并写入 `dest`
    async fn capture(&self, dest: &Path) -> Result<()>;
}

/// 情绪分类器
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmotionClassifier: Send + Sync {
    async fn classify(&self, image: &Path) -> Result<EmotionReading>;
}

/// 对话引擎使用的采样能力
#[async_trait]
pub trait EmotionSampler: Send + Sync {
    /// 采样一次情绪；永不失败
    async fn sample(&self, stage: Stage, text: &str) -> Emotion;
}

// ===== Frame Source =====

/// 调用外部命令抓帧（如 fswebcam）
#[derive(Debug, Clone)]
pub struct CommandFrameSource {
    argv: Vec<String>,
    timeout: Duration,
}

impl CommandFrameSource {
    pub fn new(argv: Vec<String>, timeout: Duration) -> Result<Self> {
        if argv.is_empty() {
            return Err(AppError::Config("Capture command is empty".into()));
        }
        Ok(Self { argv, timeout })
    }
}

#[async_trait]
impl FrameSource for CommandFrameSource {
    async fn capture(&self, dest: &Path) -> Result<()> {
        let dest_str = dest.to_string_lossy();
        let args: Vec<String> = self.argv[1..]
            .iter()
            .map(|arg| arg.replace(PATH_TOKEN, &dest_str))
            .collect();

        let child = tokio::process::Command::new(&self.argv[0])
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AppError::Emotion(format!("Could not start {}: {}", self.argv[0], e)))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| AppError::Emotion("Frame capture timed out".into()))??;

        if !output.status.success() {
            return Err(AppError::Emotion(format!(
                "Capture command exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let written = tokio::fs::metadata(dest).await.map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            return Err(AppError::Emotion("Capture command produced no image".into()));
        }

        Ok(())
    }
}

// ===== Classifier =====

/// DeepFace 风格 HTTP 分类服务客户端
#[derive(Debug, Clone)]
pub struct DeepFaceClassifier {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct AnalyzeResponse {
    #[serde(default)]
    results: Vec<AnalyzeResult>,
}

#[derive(Deserialize)]
struct AnalyzeResult {
    dominant_emotion: String,
    #[serde(default)]
    emotion: HashMap<String, f64>,
}

impl DeepFaceClassifier {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl EmotionClassifier for DeepFaceClassifier {
    async fn classify(&self, image: &Path) -> Result<EmotionReading> {
        let bytes = tokio::fs::read(image).await?;
        let img = format!("data:image/jpeg;base64,{}", STANDARD.encode(&bytes));

        let response = self
            .client
            .post(format!("{}/analyze", self.base_url))
            .json(&serde_json::json!({
                "img": img,
                "actions": ["emotion"],
            }))
            .send()
            .await
            .map_err(|e| AppError::Emotion(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Emotion(format!(
                "Emotion analysis failed: {}",
                error_text
            )));
        }

        let analysis: AnalyzeResponse = response
            .json()
            .await
            .map_err(|e| AppError::Emotion(e.to_string()))?;
        let first = analysis
            .results
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Emotion("No face found in frame".into()))?;

        let confidence = first
            .emotion
            .get(&first.dominant_emotion)
            .copied()
            .unwrap_or(0.0);

        Ok(EmotionReading {
            label: Emotion::from_label(&first.dominant_emotion),
            confidence,
        })
    }
}

// ===== Samplers =====

/// 摄像头情绪采样
pub struct EmotionAdapter {
    frames: Arc<dyn FrameSource>,
    classifier: Arc<dyn EmotionClassifier>,
    confidence_threshold: f64,
    emotion_log: Option<EmotionLog>,
    log: ComponentSpan,
}

impl EmotionAdapter {
    pub fn new(
        frames: Arc<dyn FrameSource>,
        classifier: Arc<dyn EmotionClassifier>,
        confidence_threshold: f64,
        log: ComponentSpan,
    ) -> Self {
        Self {
            frames,
            classifier,
            confidence_threshold,
            emotion_log: None,
            log,
        }
    }

    pub fn with_log(mut self, emotion_log: EmotionLog) -> Self {
        self.emotion_log = Some(emotion_log);
        self
    }

    async fn detect(&self) -> Result<Emotion> {
        // 临时文件在离开作用域时删除，无论成功与否
        let frame = tempfile::Builder::new()
            .prefix("sentient-frame-")
            .suffix(".jpg")
            .tempfile()?;

        self.frames.capture(frame.path()).await?;
        let reading = self.classifier.classify(frame.path()).await?;

        if reading.confidence < self.confidence_threshold {
            tracing::debug!(
                label = %reading.label,
                confidence = reading.confidence,
                "Low confidence, treating as neutral"
            );
            return Ok(Emotion::Neutral);
        }
        Ok(reading.label)
    }
}

#[async_trait]
impl EmotionSampler for EmotionAdapter {
    async fn sample(&self, stage: Stage, text: &str) -> Emotion {
        let emotion = match self.detect().await {
            Ok(emotion) => emotion,
            Err(e) => {
                let _span = self.log.enter();
                tracing::warn!(%stage, "Error logging emotion: {}", e);
                Emotion::Neutral
            }
        };

        {
            let _span = self.log.enter();
            tracing::info!(%stage, %emotion, "Emotion sampled");
        }
        if let Some(emotion_log) = &self.emotion_log {
            emotion_log.record(stage, text, &emotion).await;
        }
        emotion
    }
}

/// 关闭摄像头时使用，始终返回 neutral
#[derive(Debug, Clone, Default)]
pub struct DisabledEmotionSampler;

#[async_trait]
impl EmotionSampler for DisabledEmotionSampler {
    async fn sample(&self, _stage: Stage, _text: &str) -> Emotion {
        Emotion::Neutral
    }
}

/// 根据配置创建情绪采样器
pub fn create_emotion_sampler(config: &EmotionConfig) -> Result<Arc<dyn EmotionSampler>> {
    if !config.enabled {
        tracing::info!("Emotion sampling disabled");
        return Ok(Arc::new(DisabledEmotionSampler));
    }

    let timeout = Duration::from_secs(config.capture_timeout);
    let frames = CommandFrameSource::new(config.capture_command.clone(), timeout)?;
    let classifier = DeepFaceClassifier::new(&config.classifier_url, timeout)?;
    let adapter = EmotionAdapter::new(
        Arc::new(frames),
        Arc::new(classifier),
        config.confidence_threshold,
        ComponentSpan::new("emotion"),
    )
    .with_log(EmotionLog::new(
        &config.log_path,
        ComponentSpan::new("emotion_log"),
    ));

    Ok(Arc::new(adapter))
}
