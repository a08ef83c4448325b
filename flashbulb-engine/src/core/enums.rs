use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// 信号类型枚举，定义所有支持的检测维度
#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Html,
    Script,
    Header,
    Meta,
    Cookie,
    Url,
}

impl SignalKind {
    /// 匹配阶段的固定遍历顺序，决定检测结果的发现顺序
    pub const EVALUATION_ORDER: [SignalKind; 6] = [
        SignalKind::Html,
        SignalKind::Script,
        SignalKind::Header,
        SignalKind::Meta,
        SignalKind::Cookie,
        SignalKind::Url,
    ];

    /// 版本择优时的信号权威度，数值越小越权威
    pub fn priority(self) -> u8 {
        match self {
            SignalKind::Html => 0,
            SignalKind::Script => 1,
            SignalKind::Header => 2,
            SignalKind::Meta => 3,
            SignalKind::Cookie => 4,
            SignalKind::Url => 5,
        }
    }

    /// 是否为键值型信号（Header/Meta/Cookie）
    pub fn is_keyed(self) -> bool {
        matches!(self, SignalKind::Header | SignalKind::Meta | SignalKind::Cookie)
    }

    /// 键名是否大小写不敏感（Header/Meta 统一小写，Cookie 保持原样）
    pub fn folds_key_case(self) -> bool {
        matches!(self, SignalKind::Header | SignalKind::Meta)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::Html => "html",
            SignalKind::Script => "script",
            SignalKind::Header => "header",
            SignalKind::Meta => "meta",
            SignalKind::Cookie => "cookie",
            SignalKind::Url => "url",
        }
    }
}

impl Display for SignalKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 匹配类型枚举，标记每条模式的匹配方式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum MatchType {
    Contains,
    StartsWith,
    #[default]
    Regex,
    /// 存在性检测（仅用于键值型信号的空表达式）
    Exists,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_follows_evaluation_order() {
        let priorities: Vec<u8> = SignalKind::EVALUATION_ORDER
            .iter()
            .map(|k| k.priority())
            .collect();
        assert_eq!(priorities, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_keyed_kinds() {
        assert!(SignalKind::Header.is_keyed());
        assert!(SignalKind::Cookie.is_keyed());
        assert!(!SignalKind::Url.is_keyed());
        assert!(!SignalKind::Cookie.folds_key_case());
        assert_eq!(SignalKind::Meta.to_string(), "meta");
    }
}
