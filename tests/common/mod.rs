// 集成测试共用的脚本化替身

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use sentient::config::{AssessmentStrategy, ConversationConfig};
use sentient::conversation::ConversationEngine;
use sentient::error::{AppError, Result};
use sentient::llm::ChatModel;
use sentient::models::{Emotion, Role, Stage, Turn};
use sentient::observability::ComponentSpan;
use sentient::services::{EmotionSampler, PromptBuilder, PromptSettings, QuestionBank};
use sentient::ui::ConversationUi;

pub const ANALYSIS_SCORES: &str = "A thoughtful answer.\nScores: 1 0 0 0 -1";

/// 按最后一条系统消息的前缀决定回复的模型替身
#[derive(Default)]
pub struct ScriptedModel {
    calls: Mutex<Vec<Vec<Turn>>>,
    fail_on: Mutex<Option<String>>,
    analysis_reply: Mutex<Option<String>>,
}

impl ScriptedModel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 最后一条消息以该前缀开头时调用失败
    pub fn fail_when(&self, prefix: &str) {
        *self.fail_on.lock() = Some(prefix.to_string());
    }

    pub fn set_analysis_reply(&self, reply: &str) {
        *self.analysis_reply.lock() = Some(reply.to_string());
    }

    pub fn calls(&self) -> Vec<Vec<Turn>> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn chat(&self, messages: &[Turn]) -> Result<String> {
        self.calls.lock().push(messages.to_vec());
        let last = messages.last().map(|t| t.content.clone()).unwrap_or_default();

        if let Some(prefix) = self.fail_on.lock().as_deref() {
            if last.starts_with(prefix) {
                return Err(AppError::Model("scripted failure".into()));
            }
        }

        if let Some(question) = last.strip_prefix("ASK ") {
            return Ok(format!("Rephrased: {}", question));
        }
        if last.starts_with("ANALYZE") {
            return Ok(self
                .analysis_reply
                .lock()
                .clone()
                .unwrap_or_else(|| ANALYSIS_SCORES.to_string()));
        }
        if last.starts_with("CRITIQUE") {
            return Ok("You are more than five numbers.".into());
        }
        if last.starts_with("CONCLUDE") {
            return Ok("Nice to meet you.".into());
        }
        Ok(format!("reply #{}", self.calls.lock().len()))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// 输入脚本中的一步
#[derive(Debug, Clone)]
pub enum Input {
    Line(&'static str),
    Empty,
    /// 永远不返回，用于触发无操作超时
    Hang,
}

/// 脚本化终端界面
#[derive(Default)]
pub struct ScriptedUi {
    inputs: Mutex<VecDeque<Input>>,
    displayed: Mutex<Vec<String>>,
    idle_screens: Mutex<usize>,
    loading_screens: Mutex<usize>,
    exits: Mutex<usize>,
}

impl ScriptedUi {
    pub fn new(inputs: Vec<Input>) -> Arc<Self> {
        Arc::new(Self {
            inputs: Mutex::new(inputs.into()),
            ..Default::default()
        })
    }

    pub fn displayed(&self) -> Vec<String> {
        self.displayed.lock().clone()
    }

    pub fn count_displayed(&self, message: &str) -> usize {
        self.displayed.lock().iter().filter(|m| *m == message).count()
    }

    pub fn remaining_inputs(&self) -> usize {
        self.inputs.lock().len()
    }

    pub fn idle_screens(&self) -> usize {
        *self.idle_screens.lock()
    }

    pub fn loading_screens(&self) -> usize {
        *self.loading_screens.lock()
    }

    pub fn exits(&self) -> usize {
        *self.exits.lock()
    }
}

#[async_trait]
impl ConversationUi for ScriptedUi {
    async fn display_message(&self, message: &str) -> Result<()> {
        self.displayed.lock().push(message.to_string());
        Ok(())
    }

    async fn get_user_input(&self, _prompt: &str) -> Result<Option<String>> {
        let next = self.inputs.lock().pop_front();
        match next {
            Some(Input::Line(text)) => Ok(Some(text.to_string())),
            Some(Input::Empty) => Ok(None),
            Some(Input::Hang) => std::future::pending().await,
            None => Err(AppError::InputClosed),
        }
    }

    async fn display_idle_screen(&self) -> Result<()> {
        *self.idle_screens.lock() += 1;
        Ok(())
    }

    async fn display_loading_screen(&self) -> Result<()> {
        *self.loading_screens.lock() += 1;
        Ok(())
    }

    async fn display_exit_message(&self) -> Result<()> {
        *self.exits.lock() += 1;
        Ok(())
    }
}

/// 固定情绪，并记录每次采样的阶段与文本
pub struct FixedEmotion {
    emotion: Emotion,
    samples: Mutex<Vec<(Stage, String)>>,
}

impl FixedEmotion {
    pub fn new(emotion: Emotion) -> Arc<Self> {
        Arc::new(Self {
            emotion,
            samples: Mutex::new(Vec::new()),
        })
    }

    pub fn samples(&self) -> Vec<(Stage, String)> {
        self.samples.lock().clone()
    }
}

#[async_trait]
impl EmotionSampler for FixedEmotion {
    async fn sample(&self, stage: Stage, text: &str) -> Emotion {
        self.samples.lock().push((stage, text.to_string()));
        self.emotion.clone()
    }
}

pub fn prompts() -> Arc<PromptBuilder> {
    let settings: PromptSettings = serde_json::from_value(serde_json::json!({
        "language": "en",
        "stage_prompts": {
            "en": {
                "initial_greeting": "Hello, I am Sentient-5. How are you feeling today?",
                "greeting": "GREETING be warm",
                "assessment": "ASSESSMENT last said '{last_input}'",
                "katarsis": "KATARSIS scores:\n{summary}",
                "critique": "CRITIQUE {summary}\nANALYSES\n{analyses}",
                "concluding": "CONCLUDE they said '{last_input}'",
                "question": "ASK {trait}: {question}",
                "analysis": "ANALYZE {trait} | {question} | {response} | {emotion}"
            }
        }
    }))
    .unwrap();
    Arc::new(PromptBuilder::new(settings, ComponentSpan::disabled("prompts")).unwrap())
}

pub fn questions() -> Arc<QuestionBank> {
    Arc::new(
        QuestionBank::from_json(
            r#"{
                "openness": ["What did you try lately?", "What would you study for a year?"],
                "neuroticism": ["How do you handle stress?", "What keeps you awake?"]
            }"#,
        )
        .unwrap(),
    )
}

pub fn settings(strategy: AssessmentStrategy) -> ConversationConfig {
    ConversationConfig {
        greeting_exchanges: 2,
        assessment_strategy: strategy,
        rephrase_questions: true,
        show_analysis: false,
        inactivity_timeout: 42,
    }
}

pub fn engine_with(
    model: Arc<ScriptedModel>,
    emotions: Arc<dyn EmotionSampler>,
    settings: ConversationConfig,
) -> ConversationEngine {
    ConversationEngine::new(
        model,
        prompts(),
        questions(),
        emotions,
        settings,
        ComponentSpan::disabled("conversation"),
    )
}

pub fn engine(model: Arc<ScriptedModel>) -> ConversationEngine {
    engine_with(
        model,
        FixedEmotion::new(Emotion::Neutral),
        settings(AssessmentStrategy::EveryQuestion),
    )
}

pub fn roles(turns: &[Turn]) -> Vec<Role> {
    turns.iter().map(|t| t.role).collect()
}
