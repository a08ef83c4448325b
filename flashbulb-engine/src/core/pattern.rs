use regex::Regex;

use super::enums::MatchType;
use super::version::VersionRule;

/// 运行时匹配器（加载阶段一次性构建）
#[derive(Debug, Clone)]
pub enum Matcher {
    /// 包含匹配（纯字面量）
    Contains(String),
    /// 前缀匹配（^ + 纯字面量）
    StartsWith(String),
    /// 存在匹配（键存在即命中）
    Exists,
    /// 预编译正则
    Regex(Regex),
}

impl Matcher {
    #[inline(always)]
    pub fn is_exists(&self) -> bool {
        matches!(self, Matcher::Exists)
    }

    pub fn match_type(&self) -> MatchType {
        match self {
            Matcher::Contains(_) => MatchType::Contains,
            Matcher::StartsWith(_) => MatchType::StartsWith,
            Matcher::Exists => MatchType::Exists,
            Matcher::Regex(_) => MatchType::Regex,
        }
    }

    /// 描述匹配器规则（用于日志/调试输出）
    pub fn describe(&self) -> String {
        match self {
            Matcher::Contains(s) => format!("contains: {}", s),
            Matcher::StartsWith(s) => format!("starts_with: {}", s),
            Matcher::Exists => "exists".to_string(),
            Matcher::Regex(re) => format!("regex: {}", re.as_str()),
        }
    }

    /// 执行匹配，命中时返回捕获组（下标0为整体匹配）
    /// 字面量匹配器只有整体匹配一个分组
    pub fn find<'t>(&self, input: &'t str) -> Option<Vec<Option<&'t str>>> {
        match self {
            Matcher::Contains(needle) => input
                .find(needle.as_str())
                .map(|start| vec![Some(&input[start..start + needle.len()])]),
            Matcher::StartsWith(prefix) => input
                .starts_with(prefix.as_str())
                .then(|| vec![Some(&input[..prefix.len()])]),
            Matcher::Exists => Some(vec![Some("")]),
            Matcher::Regex(re) => re
                .captures(input)
                .map(|caps| caps.iter().map(|m| m.map(|m| m.as_str())).collect()),
        }
    }
}

/// 单条编译后的签名模式
#[derive(Debug, Clone)]
pub struct Pattern {
    /// 去掉后缀后的原始表达式（日志与检测结果中展示）
    pub expression: String,
    pub matcher: Matcher,
    /// 命中时贡献的置信度（0-100）
    pub confidence: u8,
    pub version: Option<VersionRule>,
}

impl Pattern {
    pub fn new(expression: impl Into<String>, matcher: Matcher) -> Self {
        Self {
            expression: expression.into(),
            matcher,
            confidence: 100,
            version: None,
        }
    }

    pub fn with_confidence(mut self, confidence: u8) -> Self {
        self.confidence = confidence.min(100);
        self
    }

    pub fn with_version(mut self, version: VersionRule) -> Self {
        self.version = Some(version);
        self
    }

    /// 对单个输入求值：未命中返回 None，命中返回 Some(提取到的版本)
    pub fn evaluate(&self, input: &str) -> Option<Option<String>> {
        let groups = self.matcher.find(input)?;
        Some(self.version.as_ref().and_then(|rule| rule.apply(&groups)))
    }
}

/// 键值型模式组（Header/Meta/Cookie 专用）
#[derive(Debug, Clone)]
pub struct KeyedPatterns {
    /// 键名；Header/Meta 已转小写，Cookie 保持原样，可含一个 `*` 通配
    pub key: String,
    pub patterns: Vec<Pattern>,
}

impl KeyedPatterns {
    pub fn is_wildcard(&self) -> bool {
        self.key.contains('*')
    }

    /// 判断信号中的键名是否对应本组模式
    pub fn matches_name(&self, name: &str) -> bool {
        match self.key.split_once('*') {
            None => self.key == name,
            Some((prefix, suffix)) => {
                name.len() >= prefix.len() + suffix.len()
                    && name.starts_with(prefix)
                    && name.ends_with(suffix)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_returns_whole_match() {
        let m = Matcher::Contains("wp-content".into());
        assert_eq!(m.find("/wp-content/themes"), Some(vec![Some("wp-content")]));
        assert_eq!(m.find("/static"), None);
    }

    #[test]
    fn test_starts_with() {
        let m = Matcher::StartsWith("nginx".into());
        assert!(m.find("nginx/1.2").is_some());
        assert!(m.find("openresty nginx").is_none());
    }

    #[test]
    fn test_pattern_extracts_version() {
        let re = Regex::new(r"nginx(?:/([\d.]+))?").unwrap();
        let pattern = Pattern::new("nginx", Matcher::Regex(re)).with_version(VersionRule::first_group());
        assert_eq!(pattern.evaluate("nginx/1.25.3"), Some(Some("1.25.3".into())));
        assert_eq!(pattern.evaluate("nginx"), Some(None));
        assert_eq!(pattern.evaluate("apache"), None);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let pattern = Pattern::new("x", Matcher::Exists).with_confidence(250);
        assert_eq!(pattern.confidence, 100);
    }

    #[test]
    fn test_wildcard_key() {
        let keyed = KeyedPatterns {
            key: "_ga_*".into(),
            patterns: vec![],
        };
        assert!(keyed.is_wildcard());
        assert!(keyed.matches_name("_ga_ABC123"));
        assert!(!keyed.matches_name("_gat"));

        let exact = KeyedPatterns {
            key: "PHPSESSID".into(),
            patterns: vec![],
        };
        assert!(exact.matches_name("PHPSESSID"));
        assert!(!exact.matches_name("phpsessid"));
    }
}
