//! 签名文档原始结构（Wappalyzer 风格 JSON）
//! 模式字段保持 `serde_json::Value`，兼容单字符串/数组/对象多种写法，由编译阶段再做校验
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{CoreError, CoreResult};

/// 已解析的签名文档（根节点已校验）
/// 技术条目逐条保留为 Value，单条结构错误只影响该技术本身
#[derive(Debug, Clone, Default)]
pub struct SignatureDocument {
    pub technologies: Map<String, Value>,
    pub categories: Map<String, Value>,
}

impl SignatureDocument {
    /// 校验根节点：必须是对象，且包含 `apps` 或 `technologies` 对象
    pub fn from_value(value: Value) -> CoreResult<Self> {
        let Value::Object(mut root) = value else {
            return Err(CoreError::InvalidDocument(
                "root must be a JSON object".to_string(),
            ));
        };

        let technologies = match root.remove("apps").or_else(|| root.remove("technologies")) {
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(CoreError::InvalidDocument(format!(
                    "technology table must be an object, got {}",
                    json_type(&other)
                )))
            }
            None => {
                return Err(CoreError::InvalidDocument(
                    "missing `apps` / `technologies` table".to_string(),
                ))
            }
        };

        let categories = match root.remove("categories") {
            Some(Value::Object(map)) => map,
            Some(Value::Null) | None => Map::new(),
            Some(other) => {
                log::warn!(
                    "Ignoring category table with unexpected type: {}",
                    json_type(&other)
                );
                Map::new()
            }
        };

        Ok(Self {
            technologies,
            categories,
        })
    }
}

/// 原始分类定义
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCategory {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub priority: Option<u32>,
}

/// 原始技术条目
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTechnology {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "cats", alias = "categories")]
    pub categories: Option<Value>,

    /// 顶层直接声明的信号模式
    #[serde(flatten)]
    pub signals: RawSignals,
    /// `patterns: { header: {...}, html: [...] }` 形式的嵌套声明
    #[serde(default)]
    pub patterns: Option<RawSignals>,

    #[serde(default)]
    pub implies: Option<Value>,
    #[serde(default)]
    pub excludes: Option<Value>,

    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cpe: Option<String>,
}

impl RawTechnology {
    /// 所有信号声明块（顶层 + 嵌套）
    pub fn signal_blocks(&self) -> impl Iterator<Item = &RawSignals> {
        std::iter::once(&self.signals).chain(self.patterns.iter())
    }
}

/// 按信号类型分组的原始模式
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSignals {
    #[serde(default)]
    pub html: Option<Value>,
    #[serde(default)]
    pub scripts: Option<Value>,
    #[serde(default, rename = "scriptSrc")]
    pub script_src: Option<Value>,
    #[serde(default)]
    pub script: Option<Value>,
    #[serde(default)]
    pub url: Option<Value>,
    #[serde(default)]
    pub headers: Option<Value>,
    #[serde(default)]
    pub header: Option<Value>,
    #[serde(default)]
    pub meta: Option<Value>,
    #[serde(default)]
    pub cookies: Option<Value>,
    #[serde(default)]
    pub cookie: Option<Value>,
}

impl RawSignals {
    /// 所有映射到 script 信号的字段
    pub fn script_values(&self) -> impl Iterator<Item = &Value> {
        [&self.scripts, &self.script_src, &self.script]
            .into_iter()
            .flatten()
    }

    /// 映射到 header 信号的字段（`headers` / `header`）
    pub fn header_values(&self) -> impl Iterator<Item = &Value> {
        [&self.headers, &self.header].into_iter().flatten()
    }

    /// 映射到 cookie 信号的字段（`cookies` / `cookie`）
    pub fn cookie_values(&self) -> impl Iterator<Item = &Value> {
        [&self.cookies, &self.cookie].into_iter().flatten()
    }
}

/// 分类引用统一为字符串 id（兼容数字/字符串/数组）
pub fn category_ids(value: Option<&Value>) -> Vec<String> {
    fn one(value: &Value) -> Option<String> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    let mut ids: Vec<String> = match value {
        Some(Value::Array(items)) => items.iter().filter_map(one).collect(),
        Some(v) => one(v).into_iter().collect(),
        None => Vec::new(),
    };
    let mut seen = rustc_hash::FxHashSet::default();
    ids.retain(|id| seen.insert(id.clone()));
    ids
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accepts_apps_or_technologies() {
        let doc = SignatureDocument::from_value(json!({ "apps": { "nginx": {} } })).unwrap();
        assert!(doc.technologies.contains_key("nginx"));
        assert!(doc.categories.is_empty());

        let doc =
            SignatureDocument::from_value(json!({ "technologies": { "React": {} } })).unwrap();
        assert!(doc.technologies.contains_key("React"));
    }

    #[test]
    fn test_rejects_invalid_root() {
        assert!(matches!(
            SignatureDocument::from_value(json!([1, 2])),
            Err(CoreError::InvalidDocument(_))
        ));
        assert!(matches!(
            SignatureDocument::from_value(json!({ "apps": "nope" })),
            Err(CoreError::InvalidDocument(_))
        ));
        assert!(matches!(
            SignatureDocument::from_value(json!({ "categories": {} })),
            Err(CoreError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_raw_technology_shapes() {
        let raw: RawTechnology = serde_json::from_value(json!({
            "cats": [22, "webServers"],
            "scriptSrc": "jquery\\.js",
            "patterns": { "header": { "Server": "nginx" } },
            "unknownField": true
        }))
        .unwrap();

        assert_eq!(category_ids(raw.categories.as_ref()), vec!["22", "webServers"]);
        assert_eq!(raw.signals.script_values().count(), 1);
        assert_eq!(raw.signal_blocks().count(), 2);
        assert_eq!(raw.patterns.unwrap().header_values().count(), 1);
    }

    #[test]
    fn test_categories_alias() {
        let raw: RawTechnology =
            serde_json::from_value(json!({ "categories": ["webServers"] })).unwrap();
        assert_eq!(category_ids(raw.categories.as_ref()), vec!["webServers"]);
    }
}
