use serde::{Deserialize, Serialize};

/// 消息角色
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// 系统指令
    System,
    /// 用户消息
    User,
    /// 助手回复
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 对话轮次
///
/// 发送给模型的最小单元，序列化格式与 Ollama chat 接口的 message 一致。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// 对话记录
///
/// 只追加、不删除、不重排。会话重置时整体替换为新的空记录。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一轮
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// 复制当前记录并附加一条临时消息（不写回记录本身）
    pub fn with_ephemeral(&self, turn: Turn) -> Vec<Turn> {
        let mut messages = Vec::with_capacity(self.turns.len() + 1);
        messages.extend_from_slice(&self.turns);
        messages.push(turn);
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_appends_in_order() {
        let mut transcript = Transcript::new();
        assert!(transcript.is_empty());

        transcript.push(Turn::system("be kind"));
        transcript.push(Turn::user("hi"));
        transcript.push(Turn::assistant("hello"));

        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript.turns()[0].role, Role::System);
        assert_eq!(transcript.last().map(|t| t.content.as_str()), Some("hello"));
    }

    #[test]
    fn test_ephemeral_turn_is_not_stored() {
        let mut transcript = Transcript::new();
        transcript.push(Turn::user("hi"));

        let messages = transcript.with_ephemeral(Turn::system("wrap up"));

        assert_eq!(messages.len(), 2);
        assert_eq!(transcript.len(), 1);
    }

    #[test]
    fn test_turn_serializes_like_chat_message() {
        let json = serde_json::to_value(Turn::assistant("ok")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "assistant", "content": "ok"}));
    }
}
