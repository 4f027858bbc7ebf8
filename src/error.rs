//! 错误处理模块
//!
//! 定义应用程序的错误类型和错误处理逻辑。

use thiserror::Error;

use crate::models::stage::Stage;

/// 应用程序错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 阶段模板不存在
    #[error("阶段模板不存在: '{stage}'（语言 '{language}'）")]
    StageNotFound { stage: String, language: String },

    /// 模板引用了未知占位符
    #[error("模板 '{template}' 引用了未知占位符 '{{{placeholder}}}'")]
    UnknownPlaceholder {
        template: String,
        placeholder: String,
    },

    /// 阶段回退
    #[error("阶段不能回退: {from} -> {to}")]
    StageRegression { from: Stage, to: Stage },

    /// 阶段切换失败（已向用户展示）
    #[error("切换到阶段 {stage} 失败: {message}")]
    Transition { stage: Stage, message: String },

    /// 模型调用错误
    #[error("模型调用失败: {0}")]
    Model(String),

    /// 情绪采样错误
    #[error("情绪识别失败: {0}")]
    Emotion(String),

    /// 会话因无操作而超时
    #[error("长时间无操作，会话已重置")]
    Inactive,

    /// 用户关闭输入流
    #[error("输入流已关闭")]
    InputClosed,

    /// 终端界面错误
    #[error("终端界面错误: {0}")]
    Ui(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    Serialization(String),

    /// 超时错误
    #[error("操作超时: {0}")]
    Timeout(String),

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(String),
}

impl AppError {
    /// 错误是否已经以用户可见的方式展示过
    pub fn is_user_surfaced(&self) -> bool {
        matches!(self, AppError::Transition { .. })
    }

    /// 是否属于会话正常结束之外的“软”中断
    pub fn is_interruption(&self) -> bool {
        matches!(self, AppError::Inactive | AppError::InputClosed)
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Serialization(e.to_string())
    }
}

impl From<figment::Error> for AppError {
    fn from(e: figment::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AppError::Timeout(e.to_string())
        } else {
            AppError::Model(e.to_string())
        }
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;
