//! 提示词模板渲染
//!
//! 模板中的 `{name}` 只能引用枚举内的命名占位符；引用未知占位符会直接报错，
//! 已知但未提供值的占位符替换为空字符串。

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::{AppError, Result};

static PLACEHOLDER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid placeholder pattern"));

/// 命名占位符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    LastInput,
    Summary,
    Trait,
    Question,
    Response,
    Emotion,
    Analyses,
}

impl Placeholder {
    pub fn name(&self) -> &'static str {
        match self {
            Placeholder::LastInput => "last_input",
            Placeholder::Summary => "summary",
            Placeholder::Trait => "trait",
            Placeholder::Question => "question",
            Placeholder::Response => "response",
            Placeholder::Emotion => "emotion",
            Placeholder::Analyses => "analyses",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "last_input" => Some(Placeholder::LastInput),
            "summary" => Some(Placeholder::Summary),
            "trait" => Some(Placeholder::Trait),
            "question" => Some(Placeholder::Question),
            "response" => Some(Placeholder::Response),
            "emotion" => Some(Placeholder::Emotion),
            "analyses" => Some(Placeholder::Analyses),
            _ => None,
        }
    }
}

/// 阶段提示词允许的占位符
pub const STAGE_PLACEHOLDERS: &[Placeholder] = &[Placeholder::LastInput, Placeholder::Summary];
/// 批判指令允许的占位符
pub const CRITIQUE_PLACEHOLDERS: &[Placeholder] = &[Placeholder::Summary, Placeholder::Analyses];
/// 问题改写指令允许的占位符
pub const QUESTION_PLACEHOLDERS: &[Placeholder] = &[Placeholder::Trait, Placeholder::Question];
/// 回答分析指令允许的占位符
pub const ANALYSIS_PLACEHOLDERS: &[Placeholder] = &[
    Placeholder::Trait,
    Placeholder::Question,
    Placeholder::Response,
    Placeholder::Emotion,
];

/// 占位符取值
#[derive(Debug, Default, Clone)]
pub struct Bindings<'a> {
    values: Vec<(Placeholder, &'a str)>,
}

impl<'a> Bindings<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, placeholder: Placeholder, value: &'a str) -> Self {
        self.values.push((placeholder, value));
        self
    }

    pub fn with_opt(self, placeholder: Placeholder, value: Option<&'a str>) -> Self {
        match value {
            Some(v) => self.with(placeholder, v),
            None => self,
        }
    }

    fn get(&self, placeholder: Placeholder) -> Option<&'a str> {
        self.values
            .iter()
            .rev()
            .find(|(p, _)| *p == placeholder)
            .map(|(_, v)| *v)
    }
}

/// 具名模板
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    body: String,
    allowed: &'static [Placeholder],
}

impl Template {
    /// 构造并校验模板，引用了不允许的占位符时失败
    pub fn new(
        name: impl Into<String>,
        body: impl Into<String>,
        allowed: &'static [Placeholder],
    ) -> Result<Self> {
        let template = Self {
            name: name.into(),
            body: body.into(),
            allowed,
        };
        template.check()?;
        Ok(template)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn check(&self) -> Result<()> {
        for caps in PLACEHOLDER_PATTERN.captures_iter(&self.body) {
            self.resolve(&caps[1])?;
        }
        Ok(())
    }

    fn resolve(&self, name: &str) -> Result<Placeholder> {
        Placeholder::from_name(name)
            .filter(|p| self.allowed.contains(p))
            .ok_or_else(|| AppError::UnknownPlaceholder {
                template: self.name.clone(),
                placeholder: name.to_string(),
            })
    }

    /// 渲染模板
    pub fn render(&self, bindings: &Bindings<'_>) -> Result<String> {
        let mut failure = None;
        let rendered = PLACEHOLDER_PATTERN.replace_all(&self.body, |caps: &Captures<'_>| {
            match self.resolve(&caps[1]) {
                Ok(placeholder) => bindings
                    .get(placeholder)
                    .map(|v| v.trim().to_string())
                    .unwrap_or_default(),
                Err(e) => {
                    failure.get_or_insert(e);
                    String::new()
                }
            }
        });

        match failure {
            Some(e) => Err(e),
            None => Ok(rendered.into_owned()),
        }
    }
}
