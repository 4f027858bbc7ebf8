//! 对话状态机
//!
//! 按 `greeting -> assessment -> katarsis` 的顺序推进一次会话：
//! 每个阶段开始前注入系统提示词并丢弃模型的过渡回复，
//! 评估阶段逐题提问、采样情绪并打分，终局阶段输出分数总结与批判。

pub mod session;
pub mod watchdog;

use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

use crate::config::{AssessmentStrategy, ConversationConfig};
use crate::error::{AppError, Result};
use crate::llm::ChatModel;
use crate::models::{ExchangeMetadata, PersonalityTrait, Stage, Transcript, Turn};
use crate::observability::ComponentSpan;
use crate::services::scoring::strip_score_marker;
use crate::services::{EmotionSampler, PromptBuilder, QuestionBank, TraitScores};
use crate::ui::ConversationUi;

pub use session::{Session, SharedSession};
pub use watchdog::{Armed, InactivityWatchdog};

/// 通用错误提示
pub const ERROR_MESSAGE: &str = "An error occurred. Please restart the application.";
/// 阶段切换失败提示
pub const TRANSITION_ERROR_MESSAGE: &str =
    "An error occurred during stage transition. Please restart the application.";
/// 终局总结的标题
pub const SUMMARY_HEADER: &str = "Here's what I've learned about you:";

const INPUT_PROMPT: &str = ">";
const RESPONSE_PROMPT: &str = "Your response:";

/// 对话引擎
pub struct ConversationEngine {
    model: Arc<dyn ChatModel>,
    prompts: Arc<PromptBuilder>,
    questions: Arc<QuestionBank>,
    emotions: Arc<dyn EmotionSampler>,
    settings: ConversationConfig,
    session: SharedSession,
    watchdog: InactivityWatchdog,
    log: ComponentSpan,
}

impl ConversationEngine {
    pub fn new(
        model: Arc<dyn ChatModel>,
        prompts: Arc<PromptBuilder>,
        questions: Arc<QuestionBank>,
        emotions: Arc<dyn EmotionSampler>,
        settings: ConversationConfig,
        log: ComponentSpan,
    ) -> Self {
        let session = Session::shared(ComponentSpan::new("scoring"));
        let target = Arc::clone(&session);
        let watchdog = InactivityWatchdog::new(
            Duration::from_secs(settings.inactivity_timeout),
            move || target.lock().reset(),
            ComponentSpan::new("watchdog"),
        );

        {
            let _span = log.enter();
            tracing::info!(
                model = model.model_name(),
                greeting_exchanges = settings.greeting_exchanges,
                strategy = ?settings.assessment_strategy,
                "ConversationEngine initialized"
            );
        }

        Self {
            model,
            prompts,
            questions,
            emotions,
            settings,
            session,
            watchdog,
            log,
        }
    }

    pub fn session(&self) -> SharedSession {
        Arc::clone(&self.session)
    }

    pub fn stage(&self) -> Stage {
        self.session.lock().stage
    }

    pub fn transcript(&self) -> Transcript {
        self.session.lock().transcript.clone()
    }

    pub fn scores(&self) -> TraitScores {
        *self.session.lock().scoring.scores()
    }

    /// 清空记录、回到寒暄阶段、分数归零
    pub fn reset(&self) {
        let _span = self.log.enter();
        tracing::info!("Resetting conversation");
        self.session.lock().reset();
    }

    /// 运行一次完整会话
    ///
    /// 任何阶段出错都会记录日志、向用户展示一次提示，然后结束本次会话。
    pub async fn run_conversation(&self, ui: &dyn ConversationUi) -> Result<()> {
        let outcome = self
            .drive(ui)
            .instrument(self.log.span().clone())
            .await;

        if let Err(e) = &outcome {
            if e.is_interruption() {
                let _span = self.log.enter();
                tracing::info!("Conversation interrupted: {}", e);
            } else {
                {
                    let _span = self.log.enter();
                    tracing::error!(stage = %self.stage(), "Error during conversation: {}", e);
                }
                if !e.is_user_surfaced() {
                    if let Err(ui_err) = ui.display_message(ERROR_MESSAGE).await {
                        tracing::warn!("Could not display error message: {}", ui_err);
                    }
                }
            }
        }

        outcome
    }

    async fn drive(&self, ui: &dyn ConversationUi) -> Result<()> {
        tracing::info!("Starting conversation loop");
        ui.display_idle_screen().await?;
        ui.display_loading_screen().await?;
        self.open_greeting(ui).await?;

        loop {
            let stage = self.stage();
            if stage.is_terminal() {
                self.stage_katarsis(ui).await?;
                tracing::info!("Conversation complete");
                return Ok(());
            }

            let last_input = match stage {
                Stage::Greeting => self.stage_greeting(ui).await?,
                _ => self.stage_assessment(ui).await?,
            };

            if let Some(next) = stage.next() {
                self.advance(ui, next, last_input.as_deref()).await?;
            }
        }
    }

    // ===== Stage Transitions =====

    /// 切换到指定阶段
    ///
    /// 与当前阶段相同时什么也不做；向前切换会追加阶段系统提示词并发起一次回复被丢弃的模型调用；
    /// 向后切换返回 `StageRegression`，会话保持不变。
    pub async fn transition_to(&self, stage: Stage, last_input: Option<&str>) -> Result<()> {
        let current = self.stage();
        if stage == current {
            let _span = self.log.enter();
            tracing::warn!("Already in stage: {}. Skipping transition.", stage);
            return Ok(());
        }
        if stage < current {
            return Err(AppError::StageRegression {
                from: current,
                to: stage,
            });
        }

        {
            let _span = self.log.enter();
            tracing::info!(from = %current, to = %stage, "Transitioning to stage");
        }
        self.inject_stage_prompt(stage, last_input).await?;
        self.session.lock().stage = stage;
        Ok(())
    }

    /// 追加阶段提示词并调用模型；系统轮次在调用前写入，调用失败时保留
    async fn inject_stage_prompt(&self, stage: Stage, last_input: Option<&str>) -> Result<()> {
        let messages = {
            let mut session = self.session.lock();
            let summary = (stage == Stage::Katarsis).then(|| session.scoring.summarize());
            let prompt = self
                .prompts
                .stage_prompt(stage, last_input, summary.as_deref())?;
            session.transcript.push(Turn::system(prompt));
            session.transcript.turns().to_vec()
        };

        let reply = self.model.chat(&messages).await?;
        let _span = self.log.enter();
        tracing::debug!(%stage, "Discarded transition reply: {}", reply);
        Ok(())
    }

    async fn advance(
        &self,
        ui: &dyn ConversationUi,
        stage: Stage,
        last_input: Option<&str>,
    ) -> Result<()> {
        let result = self.transition_to(stage, last_input).await;
        self.surface_transition(ui, stage, result).await
    }

    /// 模型调用失败只向用户展示一次切换失败提示；配置类错误原样交给外层
    async fn surface_transition(
        &self,
        ui: &dyn ConversationUi,
        stage: Stage,
        result: Result<()>,
    ) -> Result<()> {
        match result {
            Ok(()) => Ok(()),
            Err(
                e @ (AppError::StageRegression { .. }
                | AppError::StageNotFound { .. }
                | AppError::UnknownPlaceholder { .. }),
            ) => Err(e),
            Err(e) => Err(self.surface_transition_failure(ui, stage, e).await),
        }
    }

    async fn surface_transition_failure(
        &self,
        ui: &dyn ConversationUi,
        stage: Stage,
        error: AppError,
    ) -> AppError {
        tracing::error!(%stage, "Error during stage transition: {}", error);
        if let Err(ui_err) = ui.display_message(TRANSITION_ERROR_MESSAGE).await {
            tracing::warn!("Could not display transition error: {}", ui_err);
        }
        AppError::Transition {
            stage,
            message: error.to_string(),
        }
    }

    // ===== Input =====

    /// 等待用户输入，期间启动无操作计时
    async fn read_input(&self, ui: &dyn ConversationUi, prompt: &str) -> Result<Option<String>> {
        let armed = self.watchdog.arm();
        let input = tokio::select! {
            input = ui.get_user_input(prompt) => input,
            _ = self.watchdog.expired(armed) => Err(AppError::Inactive),
        };
        self.watchdog.disarm();

        if self.watchdog.has_fired(armed) {
            return Err(AppError::Inactive);
        }

        Ok(input?
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty()))
    }

    // ===== Greeting =====

    async fn open_greeting(&self, ui: &dyn ConversationUi) -> Result<()> {
        tracing::info!("Injecting stage prompt for: {}", Stage::Greeting);
        let result = self.inject_stage_prompt(Stage::Greeting, None).await;
        self.surface_transition(ui, Stage::Greeting, result).await?;

        let greeting = self.prompts.initial_greeting();
        self.session
            .lock()
            .transcript
            .push(Turn::assistant(greeting.as_str()));
        ui.display_message(&greeting).await
    }

    async fn stage_greeting(&self, ui: &dyn ConversationUi) -> Result<Option<String>> {
        tracing::info!("Entering greeting stage");
        let exchanges = self.settings.greeting_exchanges;
        let mut last_input = None;

        for exchange in 0..exchanges {
            let is_final_exchange = exchange + 1 == exchanges;
            match self.read_input(ui, INPUT_PROMPT).await? {
                Some(input) => {
                    self.greeting_exchange(ui, &input, is_final_exchange)
                        .await?;
                    last_input = Some(input);
                }
                None => tracing::warn!("No user input received; skipping to next iteration."),
            }
        }

        Ok(last_input)
    }

    async fn greeting_exchange(
        &self,
        ui: &dyn ConversationUi,
        input: &str,
        is_final_exchange: bool,
    ) -> Result<()> {
        tracing::info!(is_final_exchange, "User input received: {}", input);

        let concluding = if is_final_exchange {
            Some(self.prompts.concluding_prompt(input)?)
        } else {
            None
        };

        let messages = {
            let mut session = self.session.lock();
            session.transcript.push(Turn::user(input));
            match concluding {
                Some(instruction) => session.transcript.with_ephemeral(Turn::system(instruction)),
                None => session.transcript.turns().to_vec(),
            }
        };

        let reply = self.model.chat(&messages).await?;
        tracing::info!("Sentient-5 response generated: {}", reply);
        self.session
            .lock()
            .transcript
            .push(Turn::assistant(reply.as_str()));
        ui.display_message(&reply).await?;

        let emotion = self.emotions.sample(Stage::Greeting, &reply).await;
        tracing::info!(%emotion, "Captured emotion for greeting");
        Ok(())
    }

    // ===== Assessment =====

    async fn stage_assessment(&self, ui: &dyn ConversationUi) -> Result<Option<String>> {
        tracing::info!("Entering assessment stage");
        let strategy = self.settings.assessment_strategy;
        let mut last_input = None;

        for entry in self.questions.entries() {
            let asked = match strategy {
                AssessmentStrategy::EveryQuestion => &entry.questions[..],
                AssessmentStrategy::OnePerTrait => {
                    &entry.questions[..entry.questions.len().min(1)]
                }
            };

            for base_question in asked {
                if let Some(answer) = self
                    .assessment_exchange(ui, entry.personality_trait, base_question)
                    .await?
                {
                    last_input = Some(answer);
                }
            }
            tracing::debug!(personality_trait = %entry.personality_trait, "Trait complete");
        }

        tracing::info!("All traits assessed");
        Ok(last_input)
    }

    async fn assessment_exchange(
        &self,
        ui: &dyn ConversationUi,
        personality_trait: PersonalityTrait,
        base_question: &str,
    ) -> Result<Option<String>> {
        let question = self.pose_question(personality_trait, base_question).await?;
        ui.display_message(&question).await?;

        let Some(answer) = self.read_input(ui, RESPONSE_PROMPT).await? else {
            tracing::warn!("No user input received; skipping to next question.");
            return Ok(None);
        };

        {
            let mut session = self.session.lock();
            session.transcript.push(Turn::assistant(question.as_str()));
            session.transcript.push(Turn::user(answer.as_str()));
        }

        let emotion = self.emotions.sample(Stage::Assessment, &answer).await;
        let directive = self.prompts.analysis_prompt(&ExchangeMetadata {
            personality_trait,
            question: &question,
            response: &answer,
            emotion: &emotion,
        })?;
        let analysis = self.model.chat(&[Turn::system(directive)]).await?;
        tracing::info!(%personality_trait, %emotion, "Trait estimation generated: {}", analysis);

        let visible = strip_score_marker(&analysis);
        let update = {
            let mut session = self.session.lock();
            if !visible.is_empty() {
                session.analyses.push((personality_trait, visible.clone()));
            }
            session
                .scoring
                .update(personality_trait, &analysis, Some(&emotion))
        };
        tracing::debug!(source = ?update.source, deltas = ?update.deltas, "Scores updated");

        if self.settings.show_analysis && !visible.is_empty() {
            ui.display_message(&visible).await?;
        }

        Ok(Some(answer))
    }

    /// 生成要展示的问题：模型改写或原样使用种子问题
    async fn pose_question(
        &self,
        personality_trait: PersonalityTrait,
        base_question: &str,
    ) -> Result<String> {
        tracing::info!(%personality_trait, "Asking orientation question: {}", base_question);
        if !self.settings.rephrase_questions {
            return Ok(base_question.to_string());
        }

        let directive = self.prompts.question_prompt(personality_trait, base_question)?;
        let messages = self
            .session
            .lock()
            .transcript
            .with_ephemeral(Turn::system(directive));
        let question = self.model.chat(&messages).await?;
        tracing::info!("Generated question for user: {}", question);
        Ok(question)
    }

    // ===== Katarsis =====

    async fn stage_katarsis(&self, ui: &dyn ConversationUi) -> Result<()> {
        tracing::info!("Entering katarsis stage");
        let (summary, analyses) = {
            let session = self.session.lock();
            (session.scoring.summarize(), session.analyses.clone())
        };
        ui.display_message(&format!("{}\n{}", SUMMARY_HEADER, summary))
            .await?;

        let directive = self.prompts.critique_prompt(&summary, &analyses)?;
        let messages = {
            let mut session = self.session.lock();
            session.transcript.push(Turn::system(directive));
            session.transcript.turns().to_vec()
        };

        let critique = self.model.chat(&messages).await?;
        tracing::info!("Generated critique: {}", critique);
        self.session
            .lock()
            .transcript
            .push(Turn::assistant(critique.as_str()));
        ui.display_message(&critique).await?;

        let emotion = self.emotions.sample(Stage::Katarsis, &critique).await;
        tracing::info!(%emotion, "Emotion after critique");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockChatModel;
    use crate::models::Role;
    use crate::services::{DisabledEmotionSampler, PromptSettings};

    fn engine(model: MockChatModel) -> ConversationEngine {
        let settings: PromptSettings = serde_json::from_value(serde_json::json!({
            "stage_prompts": {
                "en": {
                    "greeting": "Be warm.",
                    "assessment": "Assess. Last input: {last_input}",
                    "katarsis": "Reveal:\n{summary}"
                }
            }
        }))
        .unwrap();

        ConversationEngine::new(
            Arc::new(model),
            Arc::new(PromptBuilder::new(settings, ComponentSpan::disabled("prompts")).unwrap()),
            Arc::new(QuestionBank::default()),
            Arc::new(DisabledEmotionSampler),
            ConversationConfig::default(),
            ComponentSpan::disabled("conversation"),
        )
    }

    fn mock_model() -> MockChatModel {
        let mut model = MockChatModel::new();
        model.expect_model_name().return_const("mock".to_string());
        model
    }

    #[tokio::test]
    async fn test_same_stage_transition_makes_no_call() {
        let mut model = mock_model();
        model.expect_chat().times(0);
        let engine = engine(model);

        engine.transition_to(Stage::Greeting, Some("hi")).await.unwrap();
        assert!(engine.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_forward_transition_appends_directive_and_discards_reply() {
        let mut model = mock_model();
        model
            .expect_chat()
            .withf(|messages| {
                messages.len() == 1
                    && messages[0].role == Role::System
                    && messages[0].content == "Assess. Last input: I am well"
            })
            .times(1)
            .returning(|_| Ok("Let us begin.".into()));
        let engine = engine(model);

        engine
            .transition_to(Stage::Assessment, Some("  I am well "))
            .await
            .unwrap();

        assert_eq!(engine.stage(), Stage::Assessment);
        let transcript = engine.transcript();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.turns()[0].role, Role::System);
    }

    #[tokio::test]
    async fn test_katarsis_directive_carries_summary() {
        let mut model = mock_model();
        model
            .expect_chat()
            .withf(|messages| {
                messages
                    .last()
                    .is_some_and(|t| t.content.starts_with("Reveal:\nOpenness: 0\n"))
            })
            .times(1)
            .returning(|_| Ok("ok".into()));
        let engine = engine(model);

        engine.transition_to(Stage::Katarsis, None).await.unwrap();
        assert_eq!(engine.stage(), Stage::Katarsis);
    }

    #[tokio::test]
    async fn test_failed_transition_keeps_directive_and_stage() {
        let mut model = mock_model();
        model
            .expect_chat()
            .times(1)
            .returning(|_| Err(AppError::Model("connection refused".into())));
        let engine = engine(model);

        let err = engine
            .transition_to(Stage::Assessment, None)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Model(_)));
        assert_eq!(engine.stage(), Stage::Greeting);
        assert_eq!(
            engine.transcript().last().map(|t| t.content.clone()),
            Some("Assess. Last input: ".to_string())
        );
    }

    #[tokio::test]
    async fn test_backward_transition_leaves_session_untouched() {
        let mut model = mock_model();
        model.expect_chat().times(1).returning(|_| Ok("ok".into()));
        let engine = engine(model);

        engine.transition_to(Stage::Katarsis, None).await.unwrap();
        let before = engine.transcript().len();

        let err = engine
            .transition_to(Stage::Assessment, Some("again"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StageRegression { .. }));
        assert_eq!(engine.stage(), Stage::Katarsis);
        assert_eq!(engine.transcript().len(), before);
    }
}
