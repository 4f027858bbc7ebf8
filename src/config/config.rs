use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 语言模型配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Ollama 服务器地址
    pub base_url: String,
    /// 模型名称
    pub name: String,
    /// 请求超时（秒）
    pub timeout: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            name: "llama3.2".into(),
            timeout: 120,
        }
    }
}

/// 提示词与题库文件
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// 阶段提示词配置（JSON）
    pub settings_path: PathBuf,
    /// 题库（JSON，trait -> [questions]）
    pub questions_path: PathBuf,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            settings_path: PathBuf::from("data/settings.json"),
            questions_path: PathBuf::from("data/questions.json"),
        }
    }
}

/// 评估策略
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStrategy {
    /// 每个特质问完全部种子问题
    EveryQuestion,
    /// 每个特质只问第一题，随后标记完成
    OnePerTrait,
}

impl Default for AssessmentStrategy {
    fn default() -> Self {
        AssessmentStrategy::EveryQuestion
    }
}

/// 对话流程配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// 寒暄阶段的交流次数
    pub greeting_exchanges: usize,
    /// 评估策略
    pub assessment_strategy: AssessmentStrategy,
    /// 是否让模型改写种子问题
    pub rephrase_questions: bool,
    /// 是否向用户展示特质分析
    pub show_analysis: bool,
    /// 无操作超时（秒）
    pub inactivity_timeout: u64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            greeting_exchanges: 2,
            assessment_strategy: AssessmentStrategy::EveryQuestion,
            rephrase_questions: true,
            show_analysis: false,
            inactivity_timeout: 42,
        }
    }
}

/// 情绪识别配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionConfig {
    /// 是否启用摄像头情绪采样
    pub enabled: bool,
    /// 抓帧命令，`{path}` 会被替换为临时图片路径
    pub capture_command: Vec<String>,
    /// 抓帧超时（秒）
    pub capture_timeout: u64,
    /// 情绪分类服务地址
    pub classifier_url: String,
    /// 置信度阈值（0-100），低于该值视为 neutral
    pub confidence_threshold: f64,
    /// 情绪日志文件
    pub log_path: PathBuf,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capture_command: vec![
                "fswebcam".into(),
                "-q".into(),
                "--no-banner".into(),
                "-r".into(),
                "640x480".into(),
                "{path}".into(),
            ],
            capture_timeout: 10,
            classifier_url: "http://localhost:5005".into(),
            confidence_threshold: 60.0,
            log_path: PathBuf::from("logs/emotion_log.jsonl"),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 结构化日志格式
    pub structured: bool,
    /// 日志文件目录
    pub log_dir: Option<PathBuf>,
    /// 日志文件名前缀
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            structured: false,
            log_dir: Some(PathBuf::from("logs")),
            file_prefix: "sentient-5.log".into(),
        }
    }
}

/// 终端界面配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// 打字机效果每个字符的间隔（毫秒），0 表示直接输出
    pub typewriter_delay_ms: u64,
    /// 加载画面停留时间（毫秒）
    pub loading_delay_ms: u64,
    /// 待机动画每帧间隔（毫秒）
    pub idle_frame_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            typewriter_delay_ms: 50,
            loading_delay_ms: 3000,
            idle_frame_ms: 1000,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// 语言模型配置
    pub model: ModelConfig,
    /// 提示词文件配置
    pub prompts: PromptsConfig,
    /// 对话流程配置
    pub conversation: ConversationConfig,
    /// 情绪识别配置
    pub emotion: EmotionConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 终端界面配置
    pub ui: UiConfig,
}

impl AppConfig {
    /// 创建开发环境配置：关闭摄像头与打字机效果，日志输出更详细
    pub fn development() -> Self {
        let mut config = Self::default();
        config.emotion.enabled = false;
        config.logging.level = "debug".into();
        config.ui.typewriter_delay_ms = 0;
        config.ui.loading_delay_ms = 0;
        config
    }
}
