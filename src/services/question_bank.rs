//! 题库
//!
//! trait -> 有序种子问题列表。加载后不可变，特质与问题都保持文件中的顺序。

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde_json::Value;
use std::fmt;
use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::PersonalityTrait;

/// 题库条目
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionEntry {
    pub personality_trait: PersonalityTrait,
    pub questions: Vec<String>,
}

/// 题库
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    entries: Vec<QuestionEntry>,
}

impl QuestionBank {
    /// 从条目直接构造；重复的特质会被拒绝
    pub fn new(entries: Vec<QuestionEntry>) -> Result<Self> {
        for (i, entry) in entries.iter().enumerate() {
            if entries[..i]
                .iter()
                .any(|e| e.personality_trait == entry.personality_trait)
            {
                return Err(AppError::Config(format!(
                    "Trait '{}' appears more than once in the question bank",
                    entry.personality_trait
                )));
            }
        }
        Ok(Self { entries })
    }

    /// 从 JSON 文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!(
                "Questions file not found at {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&raw).map_err(|e| match e {
            AppError::Serialization(msg) => AppError::Config(format!(
                "Error decoding questions file {}: {}",
                path.display(),
                msg
            )),
            other => other,
        })
    }

    /// 从 JSON 文本解析
    ///
    /// 期望格式：`{ "openness": ["q1", "q2"], ... }`。重复的键不会被合并，而是交给 `new` 拒绝。
    pub fn from_json(raw: &str) -> Result<Self> {
        let RawEntries(raw_entries) = serde_json::from_str(raw)?;
        let mut entries = Vec::with_capacity(raw_entries.len());

        for (name, value) in raw_entries {
            let personality_trait: PersonalityTrait = name.parse()?;
            let questions: Vec<String> = serde_json::from_value(value).map_err(|e| {
                AppError::Config(format!("Questions for '{}' must be a list of strings: {}", name, e))
            })?;
            entries.push(QuestionEntry {
                personality_trait,
                questions,
            });
        }

        Self::new(entries)
    }

    pub fn entries(&self) -> &[QuestionEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|e| e.questions.is_empty())
    }

    /// 问题总数
    pub fn total_questions(&self) -> usize {
        self.entries.iter().map(|e| e.questions.len()).sum()
    }
}

/// 按文件顺序保留全部键值对（包括重复键）
struct RawEntries(Vec<(String, Value)>);

impl<'de> Deserialize<'de> for RawEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = RawEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping trait names to question lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<RawEntries, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(5));
                while let Some(entry) = map.next_entry::<String, Value>()? {
                    entries.push(entry);
                }
                Ok(RawEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "neuroticism": ["How do you handle stress?", "Do you worry often?"],
        "openness": ["What new thing did you try lately?"]
    }"#;

    #[test]
    fn test_file_order_is_preserved() {
        let bank = QuestionBank::from_json(SAMPLE).unwrap();
        let traits: Vec<_> = bank.entries().iter().map(|e| e.personality_trait).collect();
        assert_eq!(
            traits,
            vec![PersonalityTrait::Neuroticism, PersonalityTrait::Openness]
        );
        assert_eq!(bank.entries()[0].questions[1], "Do you worry often?");
        assert_eq!(bank.total_questions(), 3);
    }

    #[test]
    fn test_repeated_trait_key_is_rejected() {
        let err = QuestionBank::from_json(
            r#"{"openness": ["First?"], "extraversion": ["Parties?"], "openness": ["Second?"]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Config(ref msg) if msg.contains("openness")));
    }

    #[test]
    fn test_top_level_must_be_an_object() {
        let err = QuestionBank::from_json(r#"["openness"]"#).unwrap_err();
        assert!(matches!(err, AppError::Serialization(_)));
    }

    #[test]
    fn test_unknown_trait_is_rejected() {
        let err = QuestionBank::from_json(r#"{"humour": ["Tell me a joke"]}"#).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_non_string_questions_are_rejected() {
        let err = QuestionBank::from_json(r#"{"openness": [1, 2]}"#).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = QuestionBank::load("/nonexistent/questions.json").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
