//! 会话状态：对话记录、当前阶段、特质分数与逐题分析

use parking_lot::Mutex;
use std::sync::Arc;

use crate::models::{PersonalityTrait, Stage, Transcript};
use crate::observability::ComponentSpan;
use crate::services::ScoringEngine;

/// 会话状态
///
/// 对话循环与无操作计时器共享同一个会话，二者都只在短临界区内持锁。
#[derive(Debug)]
pub struct Session {
    pub transcript: Transcript,
    pub stage: Stage,
    pub scoring: ScoringEngine,
    /// 评估阶段每次回答的分析（已去掉 `Scores:` 行），按提问顺序
    pub analyses: Vec<(PersonalityTrait, String)>,
}

/// 共享会话句柄
pub type SharedSession = Arc<Mutex<Session>>;

impl Session {
    pub fn new(scoring_log: ComponentSpan) -> Self {
        Self {
            transcript: Transcript::new(),
            stage: Stage::Greeting,
            scoring: ScoringEngine::new(scoring_log),
            analyses: Vec::new(),
        }
    }

    pub fn shared(scoring_log: ComponentSpan) -> SharedSession {
        Arc::new(Mutex::new(Self::new(scoring_log)))
    }

    /// 清空记录、回到寒暄阶段、分数归零；可重复调用
    pub fn reset(&mut self) {
        self.transcript = Transcript::new();
        self.stage = Stage::Greeting;
        self.scoring.reset();
        self.analyses.clear();
    }

    /// 会话是否处于初始状态
    pub fn is_pristine(&self) -> bool {
        self.transcript.is_empty()
            && self.stage == Stage::Greeting
            && self.scoring.scores().is_zero()
            && self.analyses.is_empty()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(ComponentSpan::disabled("scoring"))
    }
}
