//! Big Five 人格特质

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::AppError;

/// 五个固定人格特质，声明顺序即打分顺序
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum PersonalityTrait {
    Openness,
    Conscientiousness,
    Extraversion,
    Agreeableness,
    Neuroticism,
}

impl PersonalityTrait {
    /// 固定顺序：`Scores:` 标记中的五个整数按此顺序对应
    pub const ALL: [PersonalityTrait; 5] = [
        PersonalityTrait::Openness,
        PersonalityTrait::Conscientiousness,
        PersonalityTrait::Extraversion,
        PersonalityTrait::Agreeableness,
        PersonalityTrait::Neuroticism,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PersonalityTrait::Openness => "openness",
            PersonalityTrait::Conscientiousness => "conscientiousness",
            PersonalityTrait::Extraversion => "extraversion",
            PersonalityTrait::Agreeableness => "agreeableness",
            PersonalityTrait::Neuroticism => "neuroticism",
        }
    }

    /// 首字母大写形式，用于摘要
    pub fn label(&self) -> &'static str {
        match self {
            PersonalityTrait::Openness => "Openness",
            PersonalityTrait::Conscientiousness => "Conscientiousness",
            PersonalityTrait::Extraversion => "Extraversion",
            PersonalityTrait::Agreeableness => "Agreeableness",
            PersonalityTrait::Neuroticism => "Neuroticism",
        }
    }

    /// 在固定顺序中的位置
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for PersonalityTrait {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PersonalityTrait {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        PersonalityTrait::ALL
            .into_iter()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| AppError::Config(format!("Unknown personality trait: '{}'", s)))
    }
}
