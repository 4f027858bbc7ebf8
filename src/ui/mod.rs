//! 终端界面边界
//!
//! 对话引擎只通过 [`ConversationUi`] 与用户交互。

pub mod art;
pub mod keys;
pub mod terminal;

use async_trait::async_trait;

use crate::error::Result;

pub use terminal::TerminalUi;

/// 对话界面
#[async_trait]
pub trait ConversationUi: Send + Sync {
    /// 展示一条消息
    async fn display_message(&self, message: &str) -> Result<()>;

    /// 读取一行输入
    ///
    /// 空行返回 `Ok(None)`；输入流关闭时返回 `AppError::InputClosed`。
    /// 调用方可能在读完一行之前取消这次读取。
    async fn get_user_input(&self, prompt: &str) -> Result<Option<String>>;

    /// 待机画面，直到用户按键；之前缓冲的按键不算数
    async fn display_idle_screen(&self) -> Result<()>;

    /// 启动画面
    async fn display_loading_screen(&self) -> Result<()>;

    /// 退出提示
    async fn display_exit_message(&self) -> Result<()>;
}
