//! 语言模型能力
//!
//! 对话引擎只依赖 [`ChatModel`]：给定完整消息序列，返回一条助手回复。

pub mod ollama;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::ModelConfig;
use crate::error::Result;
use crate::models::Turn;

pub use ollama::OllamaChatModel;

/// 对话模型
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// 发送消息序列，返回去除首尾空白后的回复
    async fn chat(&self, messages: &[Turn]) -> Result<String>;

    /// 模型名称（用于日志）
    fn model_name(&self) -> &str;
}

/// 根据配置创建对话模型
pub fn create_chat_model(config: &ModelConfig) -> Result<Arc<dyn ChatModel>> {
    let model = OllamaChatModel::new(&config.base_url, &config.name, config.timeout)?;
    Ok(Arc::new(model))
}
