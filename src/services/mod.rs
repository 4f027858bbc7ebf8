//! 服务模块

pub mod emotion;
pub mod prompt;
pub mod question_bank;
pub mod scoring;

pub use emotion::{
    CommandFrameSource, DeepFaceClassifier, DisabledEmotionSampler, EmotionAdapter,
    EmotionClassifier, EmotionLog, EmotionLogEntry, EmotionSampler, FrameSource,
    create_emotion_sampler,
};
pub use prompt::{DEFAULT_INITIAL_GREETING, PromptBuilder, PromptSettings};
pub use question_bank::{QuestionBank, QuestionEntry};
pub use scoring::{ScoreSource, ScoreUpdate, ScoringEngine, TraitScores};
