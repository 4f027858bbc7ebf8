//! 对话阶段

use serde::{Deserialize, Serialize};

/// 对话阶段
///
/// 只能按 `Greeting -> Assessment -> Katarsis` 的顺序前进。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// 寒暄，建立信任
    Greeting,
    /// 按特质逐题评估
    Assessment,
    /// 终局：总结与批判
    #[serde(alias = "katharsis")]
    Katarsis,
}

impl Stage {
    /// 全部阶段，按规范顺序
    pub const ALL: [Stage; 3] = [Stage::Greeting, Stage::Assessment, Stage::Katarsis];

    /// 配置文件中的模板键
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Greeting => "greeting",
            Stage::Assessment => "assessment",
            Stage::Katarsis => "katarsis",
        }
    }

    /// 下一个阶段，终局阶段返回 None
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Greeting => Some(Stage::Assessment),
            Stage::Assessment => Some(Stage::Katarsis),
            Stage::Katarsis => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.next().is_none()
    }
}

impl Default for Stage {
    fn default() -> Self {
        Stage::Greeting
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_is_monotonic() {
        assert!(Stage::Greeting < Stage::Assessment);
        assert!(Stage::Assessment < Stage::Katarsis);
        assert_eq!(Stage::Greeting.next(), Some(Stage::Assessment));
        assert_eq!(Stage::Assessment.next(), Some(Stage::Katarsis));
        assert!(Stage::Katarsis.is_terminal());
    }

    #[test]
    fn test_katharsis_spelling_is_accepted() {
        let stage: Stage = serde_json::from_str("\"katharsis\"").unwrap();
        assert_eq!(stage, Stage::Katarsis);
        assert!(serde_json::from_str::<Stage>("\"epilogue\"").is_err());
    }
}
