//! 采集阶段交付的原始观测数据
//! 宽松反序列化：字段缺失或类型不符时置空并告警，不让一次残缺的采集失去价值
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// HTTP 响应状态
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageStatus {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub text: Option<String>,
}

/// 原始观测记录
/// 信号字段保留原始 JSON 形态，由 SignalNormalizer 负责解释
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Value")]
pub struct RawObservation {
    /// 最终页面地址（`url` 或 `finalUrl`）
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_url: Option<String>,
    /// 渲染后的 HTML（`html` 或 `content`）
    pub html: String,
    /// 字符串数组，或 `{url, contentType}` 对象数组
    pub scripts: Value,
    /// `{name: value | [values]}`
    pub headers: Value,
    /// `[{name, value}]` 或 `{name: value | [values]}`
    pub cookies: Value,
    /// `{name: value | [values]}` 或 `[{name, content}]`
    pub meta: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PageStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

impl RawObservation {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn from_json_str(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    /// 报告中的起始地址：未提供 startUrl 时退回最终地址
    pub fn start_url_or_final(&self) -> &str {
        self.start_url.as_deref().unwrap_or(&self.url)
    }

    /// 序列化后的字节长度，用于选择交接方式
    pub fn payload_len(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len()).unwrap_or(usize::MAX)
    }
}

impl From<Value> for RawObservation {
    fn from(value: Value) -> Self {
        let mut map = match value {
            Value::Object(map) => map,
            other => {
                warn!(
                    "Malformed observation | Expected object, got {} | Using empty observation",
                    json_type(&other)
                );
                return Self::default();
            }
        };

        let status = match map.remove("status") {
            None | Some(Value::Null) => None,
            Some(raw) => match serde_json::from_value::<PageStatus>(raw) {
                Ok(status) => Some(status),
                Err(e) => {
                    warn!("Malformed observation field | Field: status | Reason: {}", e);
                    None
                }
            },
        };

        Self {
            url: take_string(&mut map, &["finalUrl", "url"]).unwrap_or_default(),
            start_url: take_string(&mut map, &["startUrl"]),
            html: take_string(&mut map, &["html", "content"]).unwrap_or_default(),
            scripts: map.remove("scripts").unwrap_or(Value::Null),
            headers: map.remove("headers").unwrap_or(Value::Null),
            cookies: map.remove("cookies").unwrap_or(Value::Null),
            meta: map.remove("meta").unwrap_or(Value::Null),
            title: take_string(&mut map, &["title"]),
            status,
            ip_address: take_string(&mut map, &["ipAddress"]),
        }
    }
}

/// 按候选键名依次取第一个字符串值；类型不符时告警并跳过
fn take_string(map: &mut Map<String, Value>, keys: &[&str]) -> Option<String> {
    let mut found = None;
    for key in keys {
        match map.remove(*key) {
            None | Some(Value::Null) => {}
            Some(Value::String(s)) => {
                found.get_or_insert(s);
            }
            Some(other) => warn!(
                "Malformed observation field | Field: {} | Expected string, got {}",
                key,
                json_type(&other)
            ),
        }
    }
    found
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
