//! 数据模型模块

pub mod emotion;
pub mod personality;
pub mod stage;
pub mod turn;

pub use emotion::{Emotion, EmotionReading, ExchangeMetadata};
pub use personality::PersonalityTrait;
pub use stage::Stage;
pub use turn::{Role, Transcript, Turn};
