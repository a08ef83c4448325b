//! 模式字符串后缀解析：`表达式\;confidence:NN\;version:模板`
use serde_json::Value;

use crate::core::Relation;

/// 后缀分隔符（JSON 中写作 `\\;`）
const SUFFIX_DELIMITER: &str = "\\;";

/// 拆分后的模式字符串
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSpec {
    pub expression: String,
    pub confidence: u8,
    pub version: Option<String>,
}

/// 解析单条模式字符串
/// 未知的 `key:value` 后缀忽略；置信度非数字时返回错误原因
pub fn parse_pattern_string(raw: &str) -> Result<PatternSpec, String> {
    let mut parts = raw.split(SUFFIX_DELIMITER);
    let expression = parts.next().unwrap_or_default().to_string();
    let mut confidence = 100u8;
    let mut version = None;

    for part in parts {
        let Some((key, value)) = part.split_once(':') else {
            continue;
        };
        match key.trim() {
            "confidence" => confidence = parse_confidence(value)?,
            "version" => version = Some(value.to_string()),
            _ => {}
        }
    }

    Ok(PatternSpec {
        expression,
        confidence,
        version,
    })
}

/// 置信度解析：允许小数（截断），结果限制在 0..=100
fn parse_confidence(value: &str) -> Result<u8, String> {
    let parsed: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid confidence `{}`", value))?;
    if !parsed.is_finite() {
        return Err(format!("invalid confidence `{}`", value));
    }
    Ok(parsed.clamp(0.0, 100.0) as u8)
}

/// 解析 implies/excludes 条目
pub fn parse_relation(raw: &str) -> Result<Relation, String> {
    let spec = parse_pattern_string(raw)?;
    let target = spec.expression.trim();
    if target.is_empty() {
        return Err("empty relation target".to_string());
    }
    Ok(Relation {
        target: target.to_string(),
        confidence: spec.confidence,
    })
}

/// 提取模式字段中的字符串：单字符串或字符串数组
/// 返回（有效字符串, 被忽略的非字符串条目数）；字段本身类型错误时返回 Err
pub fn pattern_strings(value: &Value) -> Result<(Vec<&str>, usize), &'static str> {
    match value {
        Value::String(s) => Ok((vec![s.as_str()], 0)),
        Value::Array(items) => {
            let strings: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            let ignored = items.len() - strings.len();
            Ok((strings, ignored))
        }
        _ => Err("expected a string or an array of strings"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_expression() {
        let spec = parse_pattern_string("wp-content").unwrap();
        assert_eq!(spec.expression, "wp-content");
        assert_eq!(spec.confidence, 100);
        assert_eq!(spec.version, None);
    }

    #[test]
    fn test_suffixes() {
        let spec =
            parse_pattern_string(r"jquery-([\d.]+)\.js\;confidence:50\;version:\1").unwrap();
        assert_eq!(spec.expression, r"jquery-([\d.]+)\.js");
        assert_eq!(spec.confidence, 50);
        assert_eq!(spec.version.as_deref(), Some(r"\1"));
    }

    #[test]
    fn test_ternary_version_keeps_colon() {
        let spec = parse_pattern_string(r"(modern)?\;version:\1?next:legacy").unwrap();
        assert_eq!(spec.version.as_deref(), Some(r"\1?next:legacy"));
    }

    #[test]
    fn test_confidence_is_clamped_and_validated() {
        assert_eq!(parse_pattern_string(r"x\;confidence:250").unwrap().confidence, 100);
        assert_eq!(parse_pattern_string(r"x\;confidence:42.9").unwrap().confidence, 42);
        assert!(parse_pattern_string(r"x\;confidence:high").is_err());
    }

    #[test]
    fn test_unknown_suffix_is_ignored() {
        let spec = parse_pattern_string(r"x\;foo:bar\;nonsense").unwrap();
        assert_eq!(spec.expression, "x");
        assert_eq!(spec.confidence, 100);
    }

    #[test]
    fn test_relation() {
        let rel = parse_relation(r"PHP\;confidence:50").unwrap();
        assert_eq!(rel.target, "PHP");
        assert_eq!(rel.confidence, 50);
        assert_eq!(parse_relation("MySQL").unwrap().confidence, 100);
        assert!(parse_relation("  ").is_err());
    }

    #[test]
    fn test_pattern_strings() {
        let value = json!(["a", 1, "b"]);
        let (strings, ignored) = pattern_strings(&value).unwrap();
        assert_eq!(strings, vec!["a", "b"]);
        assert_eq!(ignored, 1);
        assert!(pattern_strings(&json!({ "a": 1 })).is_err());
    }
}
