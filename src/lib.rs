//! Sentient-5 - 终端人格评估对话装置
//!
//! 通过本地语言模型与用户寒暄、按五大人格特质逐题提问并打分，
//! 结合摄像头情绪识别，最后给出总结与批判。

pub mod app;
pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod models;
pub mod observability;
pub mod services;
pub mod ui;
