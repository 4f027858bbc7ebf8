//! 情绪标签与单次交流的元数据

use serde::{Deserialize, Serialize};

use crate::models::personality::PersonalityTrait;

/// 粗粒度情绪标签
///
/// 与常见人脸情绪分类器的输出类别一致，未知标签保留原文。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
    Other(String),
}

impl Emotion {
    /// 从分类器标签解析，大小写不敏感
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "angry" => Emotion::Angry,
            "disgust" => Emotion::Disgust,
            "fear" => Emotion::Fear,
            "happy" => Emotion::Happy,
            "sad" => Emotion::Sad,
            "surprise" => Emotion::Surprise,
            "neutral" | "" => Emotion::Neutral,
            other => Emotion::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Surprise => "surprise",
            Emotion::Neutral => "neutral",
            Emotion::Other(label) => label,
        }
    }

    pub fn is_neutral(&self) -> bool {
        matches!(self, Emotion::Neutral)
    }
}

impl Default for Emotion {
    fn default() -> Self {
        Emotion::Neutral
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Emotion {
    fn from(label: String) -> Self {
        Emotion::from_label(&label)
    }
}

impl From<Emotion> for String {
    fn from(emotion: Emotion) -> Self {
        emotion.as_str().to_string()
    }
}

/// 分类器的单次读数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionReading {
    pub label: Emotion,
    /// 主导类别的置信度（0-100）
    pub confidence: f64,
}

/// 评估阶段一次问答的元数据，只在一次分析调用中存活
#[derive(Debug, Clone)]
pub struct ExchangeMetadata<'a> {
    pub personality_trait: PersonalityTrait,
    pub question: &'a str,
    pub response: &'a str,
    pub emotion: &'a Emotion,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip_through_serde() {
        let json = serde_json::to_string(&Emotion::Happy).unwrap();
        assert_eq!(json, "\"happy\"");
        let parsed: Emotion = serde_json::from_str("\"Sad\"").unwrap();
        assert_eq!(parsed, Emotion::Sad);
    }

    #[test]
    fn test_unknown_label_is_preserved() {
        let emotion = Emotion::from_label("Contempt");
        assert_eq!(emotion, Emotion::Other("contempt".into()));
        assert_eq!(emotion.to_string(), "contempt");
        assert!(Emotion::from_label("").is_neutral());
    }
}
