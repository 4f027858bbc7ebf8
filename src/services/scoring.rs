//! 打分引擎
//!
//! 优先从文本中提取 `Scores: o c e a n` 结构化分数；提取失败时退回关键词与情绪启发式。

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{Emotion, PersonalityTrait};
use crate::observability::ComponentSpan;

/// 结构化分数标记：同一行内以空白分隔的带符号整数
static SCORE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Scores:[ \t]*([+-]?\d+(?:[ \t]+[+-]?\d+)*)\b").expect("valid score pattern")
});

/// 每个特质关联的关键词
const KEYWORDS: [(PersonalityTrait, [&str; 3]); 5] = [
    (PersonalityTrait::Openness, ["creative", "curious", "adventurous"]),
    (
        PersonalityTrait::Conscientiousness,
        ["organized", "responsible", "disciplined"],
    ),
    (PersonalityTrait::Extraversion, ["social", "outgoing", "energetic"]),
    (PersonalityTrait::Agreeableness, ["kind", "empathetic", "cooperative"]),
    (PersonalityTrait::Neuroticism, ["anxious", "nervous", "moody"]),
];

/// 情绪对特质的固定修正
fn emotion_adjustment(emotion: &Emotion) -> &'static [(PersonalityTrait, i64)] {
    match emotion {
        Emotion::Happy => &[
            (PersonalityTrait::Extraversion, 1),
            (PersonalityTrait::Agreeableness, 1),
        ],
        Emotion::Sad => &[(PersonalityTrait::Neuroticism, 1)],
        Emotion::Angry => &[
            (PersonalityTrait::Neuroticism, 1),
            (PersonalityTrait::Agreeableness, -1),
        ],
        _ => &[],
    }
}

/// 五个特质的累加分数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitScores([i64; 5]);

impl TraitScores {
    pub fn get(&self, personality_trait: PersonalityTrait) -> i64 {
        self.0[personality_trait.index()]
    }

    pub fn add(&mut self, personality_trait: PersonalityTrait, delta: i64) {
        let slot = &mut self.0[personality_trait.index()];
        *slot = slot.saturating_add(delta);
    }

    pub fn add_all(&mut self, deltas: &TraitScores) {
        for t in PersonalityTrait::ALL {
            self.add(t, deltas.get(t));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (PersonalityTrait, i64)> + '_ {
        PersonalityTrait::ALL.into_iter().map(|t| (t, self.get(t)))
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|v| *v == 0)
    }
}

impl From<[i64; 5]> for TraitScores {
    fn from(values: [i64; 5]) -> Self {
        Self(values)
    }
}

/// 一次更新走的路径
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    /// 从 `Scores:` 标记提取
    Extracted,
    /// 关键词 + 情绪启发式
    Heuristic,
}

/// 一次更新的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreUpdate {
    pub source: ScoreSource,
    pub deltas: TraitScores,
}

/// 从文本中提取结构化分数
///
/// 找到 `Scores:` 后跟恰好五个整数时返回，按固定特质顺序对应。
pub fn extract_scores(text: &str) -> Option<TraitScores> {
    SCORE_PATTERN.captures_iter(text).find_map(|caps| {
        let values: Vec<i64> = caps[1]
            .split_whitespace()
            .map(|token| token.parse::<i64>())
            .collect::<Result<_, _>>()
            .ok()?;
        let values: [i64; 5] = values.try_into().ok()?;
        Some(TraitScores::from(values))
    })
}

/// 去掉文本中的 `Scores:` 行（展示给用户前使用）
pub fn strip_score_marker(text: &str) -> String {
    text.lines()
        .filter(|line| !SCORE_PATTERN.is_match(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// 关键词与情绪启发式
pub fn heuristic_scores(text: &str, emotion: Option<&Emotion>) -> TraitScores {
    let lower = text.to_lowercase();
    let mut deltas = TraitScores::default();

    for (personality_trait, keywords) in KEYWORDS {
        let hits: usize = keywords.iter().map(|k| lower.matches(k).count()).sum();
        deltas.add(personality_trait, hits as i64);
    }

    if let Some(emotion) = emotion {
        for (personality_trait, delta) in emotion_adjustment(emotion) {
            deltas.add(*personality_trait, *delta);
        }
    }

    deltas
}

/// 打分引擎
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    scores: TraitScores,
    log: ComponentSpan,
}

impl ScoringEngine {
    pub fn new(log: ComponentSpan) -> Self {
        Self {
            scores: TraitScores::default(),
            log,
        }
    }

    /// 全部特质一起清零
    pub fn reset(&mut self) {
        let _span = self.log.enter();
        tracing::info!("Resetting scores");
        self.scores = TraitScores::default();
    }

    /// 根据文本更新分数
    pub fn update(
        &mut self,
        personality_trait: PersonalityTrait,
        source_text: &str,
        emotion: Option<&Emotion>,
    ) -> ScoreUpdate {
        let _span = self.log.enter();

        let update = match extract_scores(source_text) {
            Some(deltas) => {
                tracing::info!(%personality_trait, ?deltas, "Extracted structured scores");
                ScoreUpdate {
                    source: ScoreSource::Extracted,
                    deltas,
                }
            }
            None => {
                tracing::info!(
                    %personality_trait,
                    emotion = emotion.map(|e| e.as_str()).unwrap_or("none"),
                    "No valid scores found, falling back to heuristic analysis"
                );
                ScoreUpdate {
                    source: ScoreSource::Heuristic,
                    deltas: heuristic_scores(source_text, emotion),
                }
            }
        };

        self.scores.add_all(&update.deltas);
        tracing::debug!(scores = ?self.scores, "Scores updated");
        update
    }

    pub fn scores(&self) -> &TraitScores {
        &self.scores
    }

    /// 每个特质一行，固定顺序
    pub fn summarize(&self) -> String {
        let summary = self
            .scores
            .iter()
            .map(|(t, score)| format!("{}: {}", t.label(), score))
            .collect::<Vec<_>>()
            .join("\n");
        let _span = self.log.enter();
        tracing::info!("Summarized scores: {}", summary.replace('\n', ", "));
        summary
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(ComponentSpan::disabled("scoring"))
    }
}
