//! 提示词构建
//!
//! 从配置文件加载各阶段的系统提示词，并生成问题改写、回答分析、总结批判等指令。
//! 所有模板在加载时校验占位符，运行时只会因为缺少阶段模板而失败。

pub mod template;

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::{ExchangeMetadata, PersonalityTrait, Stage};
use crate::observability::ComponentSpan;

pub use template::{
    ANALYSIS_PLACEHOLDERS, Bindings, CRITIQUE_PLACEHOLDERS, Placeholder, QUESTION_PLACEHOLDERS,
    STAGE_PLACEHOLDERS, Template,
};

/// 配置中缺少 `initial_greeting` 时使用的开场白
pub const DEFAULT_INITIAL_GREETING: &str = "Hello, I am Sentient-5. How are you feeling today?";

const INITIAL_GREETING_KEY: &str = "initial_greeting";
const CRITIQUE_KEY: &str = "critique";
const CONCLUDING_KEY: &str = "concluding";
const QUESTION_KEY: &str = "question";
const ANALYSIS_KEY: &str = "analysis";

const DEFAULT_CRITIQUE: &str = "Here is the personality profile you have assembled:\n{summary}\n\
Based on the following analysis:\n{analyses}\n\
Deliver an ironic critique of this profile and of what it means that a machine produced it \
from a short conversation and a camera.";

const DEFAULT_CONCLUDING: &str = "You are now concluding this part of the conversation. \
The user said: '{last_input}'. Do not ask any new questions. Simply and plainly address their \
input, answering any earlier questions if applicable. Do not mention that a phase is ending.";

const DEFAULT_QUESTION: &str = "You are assessing the user's personality. The current trait is \
'{trait}'. Using the following orientation question: '{question}', formulate one question for \
the user that helps evaluate this trait. Reply with the question only.";

const DEFAULT_ANALYSIS: &str = "The user was asked: '{question}' about the trait '{trait}'. \
Their response was: '{response}' with detected emotion: '{emotion}'. \
Briefly evaluate what this response reveals about the user's personality. \
End your answer with a single line of the exact form 'Scores: O C E A N', where each letter \
is replaced by an integer (-1, 0 or 1) for openness, conscientiousness, extraversion, \
agreeableness and neuroticism, in that order.";

/// 提示词配置文件
#[derive(Debug, Clone, Deserialize)]
pub struct PromptSettings {
    #[serde(default = "default_language")]
    pub language: String,
    pub stage_prompts: BTreeMap<String, BTreeMap<String, String>>,
}

fn default_language() -> String {
    "en".to_string()
}

impl PromptSettings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!(
                "Settings file not found at {}: {}",
                path.display(),
                e
            ))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            AppError::Config(format!(
                "Error decoding settings file {}: {}",
                path.display(),
                e
            ))
        })
    }
}

/// 提示词构建器
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    language: String,
    templates: BTreeMap<String, Template>,
    log: ComponentSpan,
}

impl PromptBuilder {
    /// 从配置构建，所有模板在这里一次性校验
    pub fn new(settings: PromptSettings, log: ComponentSpan) -> Result<Self> {
        let span = log.span().clone();
        let _span = span.enter();
        let language = settings.language;

        let mut stage_prompts = settings
            .stage_prompts
            .into_iter()
            .find(|(lang, _)| *lang == language)
            .map(|(_, prompts)| prompts)
            .ok_or_else(|| {
                AppError::Config(format!(
                    "No stage prompts configured for language '{}'",
                    language
                ))
            })?;

        let mut templates = BTreeMap::new();
        for (key, fallback, allowed) in [
            (CRITIQUE_KEY, DEFAULT_CRITIQUE, CRITIQUE_PLACEHOLDERS),
            (CONCLUDING_KEY, DEFAULT_CONCLUDING, STAGE_PLACEHOLDERS),
            (QUESTION_KEY, DEFAULT_QUESTION, QUESTION_PLACEHOLDERS),
            (ANALYSIS_KEY, DEFAULT_ANALYSIS, ANALYSIS_PLACEHOLDERS),
        ] {
            let body = stage_prompts.remove(key).unwrap_or_else(|| {
                tracing::debug!(key, "Using built-in directive");
                fallback.to_string()
            });
            templates.insert(key.to_string(), Template::new(key, body, allowed)?);
        }

        for (key, body) in stage_prompts {
            let template = Template::new(key.clone(), body, STAGE_PLACEHOLDERS)?;
            templates.insert(key, template);
        }

        tracing::info!(
            %language,
            templates = templates.len(),
            "Prompt templates loaded"
        );

        Ok(Self {
            language,
            templates,
            log,
        })
    }

    /// 从配置文件加载
    pub fn load(path: impl AsRef<Path>, log: ComponentSpan) -> Result<Self> {
        let path = path.as_ref();
        {
            let _span = log.enter();
            tracing::info!("Loading settings from: {}", path.display());
        }
        Self::new(PromptSettings::load(path)?, log)
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// 启动时确认每个阶段都有提示词
    pub fn ensure_stages(&self) -> Result<()> {
        for stage in Stage::ALL {
            self.lookup(stage.as_str())?;
        }
        Ok(())
    }

    fn lookup(&self, key: &str) -> Result<&Template> {
        self.templates
            .get(key)
            .ok_or_else(|| AppError::StageNotFound {
                stage: key.to_string(),
                language: self.language.clone(),
            })
    }

    /// 阶段系统提示词
    pub fn stage_prompt(
        &self,
        stage: Stage,
        last_input: Option<&str>,
        summary: Option<&str>,
    ) -> Result<String> {
        let _span = self.log.enter();
        let prompt = self.lookup(stage.as_str())?.render(
            &Bindings::new()
                .with_opt(Placeholder::LastInput, last_input)
                .with_opt(Placeholder::Summary, summary),
        )?;
        tracing::debug!(%stage, "Rendered stage prompt");
        Ok(prompt)
    }

    /// 开场白；未配置时使用内置文本
    pub fn initial_greeting(&self) -> String {
        let _span = self.log.enter();
        match self
            .templates
            .get(INITIAL_GREETING_KEY)
            .map(|t| t.render(&Bindings::new()))
        {
            Some(Ok(greeting)) => greeting,
            _ => {
                tracing::warn!("Initial greeting not found in settings, using default");
                DEFAULT_INITIAL_GREETING.to_string()
            }
        }
    }

    /// 寒暄最后一轮的收尾指令
    pub fn concluding_prompt(&self, last_input: &str) -> Result<String> {
        self.lookup(CONCLUDING_KEY)?
            .render(&Bindings::new().with(Placeholder::LastInput, last_input))
    }

    /// 特质问题改写指令
    pub fn question_prompt(
        &self,
        personality_trait: PersonalityTrait,
        base_question: &str,
    ) -> Result<String> {
        self.lookup(QUESTION_KEY)?.render(
            &Bindings::new()
                .with(Placeholder::Trait, personality_trait.as_str())
                .with(Placeholder::Question, base_question),
        )
    }

    /// 回答分析指令，要求模型以 `Scores:` 行结尾
    pub fn analysis_prompt(&self, exchange: &ExchangeMetadata<'_>) -> Result<String> {
        self.lookup(ANALYSIS_KEY)?.render(
            &Bindings::new()
                .with(Placeholder::Trait, exchange.personality_trait.as_str())
                .with(Placeholder::Question, exchange.question)
                .with(Placeholder::Response, exchange.response)
                .with(Placeholder::Emotion, exchange.emotion.as_str()),
        )
    }

    /// 总结批判指令，附带评估阶段每个特质的分析
    pub fn critique_prompt(
        &self,
        summary: &str,
        analyses: &[(PersonalityTrait, String)],
    ) -> Result<String> {
        let analyses = analyses
            .iter()
            .map(|(t, analysis)| format!("- {}: {}", t.as_str(), analysis))
            .collect::<Vec<_>>()
            .join("\n");
        self.lookup(CRITIQUE_KEY)?.render(
            &Bindings::new()
                .with(Placeholder::Summary, summary)
                .with(Placeholder::Analyses, &analyses),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Emotion;
    use std::io::Write;

    fn settings(prompts: serde_json::Value) -> PromptSettings {
        serde_json::from_value(serde_json::json!({
            "language": "en",
            "stage_prompts": { "en": prompts }
        }))
        .unwrap()
    }

    fn full_builder() -> PromptBuilder {
        PromptBuilder::new(
            settings(serde_json::json!({
                "initial_greeting": "Welcome, human.",
                "greeting": "Be warm.",
                "assessment": "The user last said '{last_input}'. Start assessing.",
                "katarsis": "Scores so far:\n{summary}",
                "critique": "Mock this profile: {summary}\nNotes:\n{analyses}"
            })),
            ComponentSpan::disabled("prompts"),
        )
        .unwrap()
    }

    #[test]
    fn test_stage_prompt_substitutes_last_input() {
        let builder = full_builder();
        let prompt = builder
            .stage_prompt(Stage::Assessment, Some(" I am fine "), None)
            .unwrap();
        assert_eq!(prompt, "The user last said 'I am fine'. Start assessing.");
        builder.ensure_stages().unwrap();
    }

    #[test]
    fn test_missing_stage_is_stage_not_found() {
        let builder = PromptBuilder::new(
            settings(serde_json::json!({ "greeting": "hi" })),
            ComponentSpan::disabled("prompts"),
        )
        .unwrap();

        let err = builder
            .stage_prompt(Stage::Katarsis, None, None)
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::StageNotFound { ref stage, ref language } if stage == "katarsis" && language == "en"
        ));
        assert!(builder.ensure_stages().is_err());
    }

    #[test]
    fn test_initial_greeting_falls_back() {
        let builder = PromptBuilder::new(
            settings(serde_json::json!({ "greeting": "hi" })),
            ComponentSpan::disabled("prompts"),
        )
        .unwrap();
        assert_eq!(builder.initial_greeting(), DEFAULT_INITIAL_GREETING);
        assert_eq!(full_builder().initial_greeting(), "Welcome, human.");
    }

    #[test]
    fn test_unknown_placeholder_rejected_at_load() {
        let err = PromptBuilder::new(
            settings(serde_json::json!({ "greeting": "Hi {username}" })),
            ComponentSpan::disabled("prompts"),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::UnknownPlaceholder { .. }));
    }

    #[test]
    fn test_missing_language_is_config_error() {
        let settings: PromptSettings = serde_json::from_value(serde_json::json!({
            "language": "de",
            "stage_prompts": { "en": { "greeting": "hi" } }
        }))
        .unwrap();
        let err = PromptBuilder::new(settings, ComponentSpan::disabled("prompts")).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_analysis_prompt_requests_score_line() {
        let builder = full_builder();
        let emotion = Emotion::Sad;
        let prompt = builder
            .analysis_prompt(&ExchangeMetadata {
                personality_trait: PersonalityTrait::Neuroticism,
                question: "Do you worry often?",
                response: "All the time",
                emotion: &emotion,
            })
            .unwrap();

        assert!(prompt.contains("'Do you worry often?'"));
        assert!(prompt.contains("'neuroticism'"));
        assert!(prompt.contains("'sad'"));
        assert!(prompt.contains("Scores: O C E A N"));
    }

    #[test]
    fn test_critique_and_question_directives() {
        let builder = full_builder();
        let analyses = vec![
            (PersonalityTrait::Openness, "Loves new things.".to_string()),
            (PersonalityTrait::Neuroticism, "Rarely worried.".to_string()),
        ];
        assert_eq!(
            builder.critique_prompt("Openness: 2", &analyses).unwrap(),
            "Mock this profile: Openness: 2\nNotes:\n- openness: Loves new things.\n- neuroticism: Rarely worried."
        );
        let question = builder
            .question_prompt(PersonalityTrait::Openness, "What did you try lately?")
            .unwrap();
        assert!(question.contains("'openness'"));
        assert!(question.contains("'What did you try lately?'"));
        assert!(
            builder
                .concluding_prompt("bye")
                .unwrap()
                .contains("'bye'")
        );
    }

    #[test]
    fn test_default_critique_lists_analyses() {
        let builder = PromptBuilder::new(
            settings(serde_json::json!({ "greeting": "hi" })),
            ComponentSpan::disabled("prompts"),
        )
        .unwrap();
        let prompt = builder
            .critique_prompt(
                "Openness: 1",
                &[(PersonalityTrait::Openness, "Curious about everything.".to_string())],
            )
            .unwrap();
        assert!(prompt.contains("Based on the following analysis:\n- openness: Curious about everything."));
        assert!(prompt.contains("Openness: 1"));
    }

    #[test]
    fn test_analyses_placeholder_only_allowed_in_critique() {
        let err = PromptBuilder::new(
            settings(serde_json::json!({ "katarsis": "Reveal {analyses}" })),
            ComponentSpan::disabled("prompts"),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::UnknownPlaceholder { ref placeholder, .. } if placeholder == "analyses"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"stage_prompts": {{"en": {{"greeting": "g", "assessment": "a", "katarsis": "k"}}}}}}"#
        )
        .unwrap();

        let builder = PromptBuilder::load(file.path(), ComponentSpan::disabled("prompts")).unwrap();
        assert_eq!(builder.language(), "en");
        builder.ensure_stages().unwrap();

        let err = PromptBuilder::load("/nonexistent/settings.json", ComponentSpan::disabled("prompts"))
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
