//! 应用外壳：组装各组件，循环运行会话

use std::sync::Arc;
use tracing::Instrument;

use crate::config::AppConfig;
use crate::conversation::ConversationEngine;
use crate::error::{AppError, Result};
use crate::llm::create_chat_model;
use crate::observability::{ComponentSpan, session_span};
use crate::services::{PromptBuilder, QuestionBank, create_emotion_sampler};
use crate::ui::{ConversationUi, TerminalUi};

/// Sentient-5 应用
pub struct SentientApp {
    engine: ConversationEngine,
    ui: Arc<dyn ConversationUi>,
    run_once: bool,
}

impl SentientApp {
    pub fn new(engine: ConversationEngine, ui: Arc<dyn ConversationUi>) -> Self {
        Self {
            engine,
            ui,
            run_once: false,
        }
    }

    /// 按配置创建应用（终端界面 + Ollama + 摄像头）
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let prompts = PromptBuilder::load(
            &config.prompts.settings_path,
            ComponentSpan::new("prompts"),
        )?;
        prompts.ensure_stages()?;

        let questions = QuestionBank::load(&config.prompts.questions_path)?;
        if questions.is_empty() {
            tracing::warn!("Question bank is empty, assessment will be skipped");
        }
        tracing::info!(
            traits = questions.entries().len(),
            questions = questions.total_questions(),
            "Question bank loaded"
        );

        let model = create_chat_model(&config.model)?;
        tracing::info!("Chat model initialized: {}", model.model_name());

        let emotions = create_emotion_sampler(&config.emotion)?;

        let engine = ConversationEngine::new(
            model,
            Arc::new(prompts),
            Arc::new(questions),
            emotions,
            config.conversation.clone(),
            ComponentSpan::new("conversation"),
        );
        let ui = TerminalUi::new(config.ui.clone(), ComponentSpan::new("ui"));

        Ok(Self::new(engine, Arc::new(ui)))
    }

    /// 只运行一次会话
    pub fn with_run_once(mut self, run_once: bool) -> Self {
        self.run_once = run_once;
        self
    }

    pub fn engine(&self) -> &ConversationEngine {
        &self.engine
    }

    /// 运行会话循环
    ///
    /// 会话结束、超时或出错后都回到待机画面；输入流关闭时退出。
    pub async fn run(&self) -> Result<()> {
        loop {
            self.engine.reset();
            let session_id = uuid::Uuid::new_v4().to_string();
            let span = session_span(&session_id);
            span.in_scope(|| tracing::info!("Session started"));

            let outcome = self
                .engine
                .run_conversation(self.ui.as_ref())
                .instrument(span.clone())
                .await;

            match outcome {
                Ok(()) => span.in_scope(|| tracing::info!("Session finished")),
                Err(AppError::InputClosed) => {
                    span.in_scope(|| tracing::info!("Input closed, shutting down"));
                    self.engine.reset();
                    return self.ui.display_exit_message().await;
                }
                Err(AppError::Inactive) => {
                    span.in_scope(|| tracing::info!("Session reset after inactivity"))
                }
                Err(e) if self.run_once => {
                    self.engine.reset();
                    return Err(e);
                }
                Err(e) => span.in_scope(|| tracing::warn!("Session ended with error: {}", e)),
            }

            if self.run_once {
                self.engine.reset();
                return self.ui.display_exit_message().await;
            }
        }
    }
}
