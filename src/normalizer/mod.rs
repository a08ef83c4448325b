//! Signal normalizer
//! 原始观测 → 匹配器使用的 SignalBundle
//! 不产生错误：字段缺失或形状不符时置空并告警

pub mod header_converter;
pub mod html_extractor;
pub mod observation;
pub mod script_filter;

pub use header_converter::HeaderConverter;
pub use html_extractor::{ExtractResult, HtmlExtractor};
pub use observation::{PageStatus, RawObservation};

use flashbulb_engine::SignalBundle;
use log::warn;
use serde_json::Value;
use url::Url;

use observation::json_type;

/// 信号规范化器
#[derive(Debug, Clone, Copy)]
pub struct SignalNormalizer {
    extract_from_html: bool,
}

impl Default for SignalNormalizer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SignalNormalizer {
    pub fn new(extract_from_html: bool) -> Self {
        Self { extract_from_html }
    }

    pub fn normalize(&self, obs: &RawObservation) -> SignalBundle {
        let mut bundle = SignalBundle::new(obs.url.clone()).with_html(obs.html.clone());

        // Set-Cookie / Cookie 解析出的 Cookie 排在显式 Cookie 列表之后
        let header_cookies = normalize_headers(&obs.headers, &mut bundle);
        normalize_cookies(&obs.cookies, &mut bundle);
        for (name, value) in header_cookies {
            let seen = bundle
                .cookies
                .get(&name)
                .is_some_and(|values| values.contains(&value));
            if !seen {
                bundle.add_cookie(&name, value);
            }
        }

        normalize_meta(&obs.meta, &mut bundle);
        normalize_scripts(&obs.scripts, &mut bundle);

        if self.extract_from_html && !obs.html.is_empty() {
            merge_html_signals(&mut bundle);
        }

        log::debug!(
            "Normalized observation | Url: {} | Scripts: {} | Headers: {} | Cookies: {} | Meta: {}",
            bundle.url,
            bundle.scripts.len(),
            bundle.headers.len(),
            bundle.cookies.len(),
            bundle.meta.len()
        );
        bundle
    }
}

fn malformed(field: &str, expected: &str, value: &Value) {
    warn!(
        "Malformed observation field | Field: {} | Expected {}, got {} | Using empty container",
        field,
        expected,
        json_type(value)
    );
}

/// `"v"` 或 `["v1", "v2"]`；数字/布尔按文本处理，其他类型跳过
fn string_values(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Number(n) => vec![n.to_string()],
        Value::Bool(b) => vec![b.to_string()],
        Value::Array(items) => items.iter().flat_map(string_values).collect(),
        Value::Null | Value::Object(_) => Vec::new(),
    }
}

/// 写入 headers，返回从 Set-Cookie / Cookie 中解析出的 Cookie
fn normalize_headers(raw: &Value, bundle: &mut SignalBundle) -> Vec<(String, String)> {
    let mut cookies = Vec::new();
    let map = match raw {
        Value::Null => return cookies,
        Value::Object(map) => map,
        other => {
            malformed("headers", "object", other);
            return cookies;
        }
    };

    for (name, value) in map {
        let lower = name.trim().to_ascii_lowercase();
        for raw_value in string_values(value) {
            for value in HeaderConverter::split_values(&raw_value) {
                match lower.as_str() {
                    "set-cookie" => cookies.extend(HeaderConverter::parse_set_cookie(value)),
                    "cookie" => cookies.extend(HeaderConverter::parse_request_cookie(value)),
                    _ => {}
                }
                bundle.add_header(&lower, value);
            }
        }
    }
    cookies
}

/// `[{name, value}]`（可重复）或 `{name: value | [values]}`
fn normalize_cookies(raw: &Value, bundle: &mut SignalBundle) {
    match raw {
        Value::Null => {}
        Value::Array(items) => {
            for item in items {
                let Some(name) = item.get("name").and_then(Value::as_str) else {
                    malformed("cookies[]", "{name, value} object", item);
                    continue;
                };
                let value = item
                    .get("value")
                    .map(string_values)
                    .and_then(|v| v.into_iter().next())
                    .unwrap_or_default();
                bundle.add_cookie(name, value);
            }
        }
        Value::Object(map) => {
            for (name, value) in map {
                for value in string_values(value) {
                    bundle.add_cookie(name, value);
                }
            }
        }
        other => malformed("cookies", "array or object", other),
    }
}

/// `{name: content | [contents]}` 或 `[{name, content}]`
fn normalize_meta(raw: &Value, bundle: &mut SignalBundle) {
    match raw {
        Value::Null => {}
        Value::Object(map) => {
            for (name, value) in map {
                for value in string_values(value) {
                    bundle.add_meta(name, value);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                let name = item
                    .get("name")
                    .or_else(|| item.get("property"))
                    .and_then(Value::as_str);
                match (name, item.get("content").and_then(Value::as_str)) {
                    (Some(name), Some(content)) => bundle.add_meta(name, content),
                    _ => malformed("meta[]", "{name, content} object", item),
                }
            }
        }
        other => malformed("meta", "object or array", other),
    }
}

/// 网络层观测到的脚本：字符串或 `{url, contentType}`，只保留 JavaScript 资源
fn normalize_scripts(raw: &Value, bundle: &mut SignalBundle) {
    let items = match raw {
        Value::Null => return,
        Value::Array(items) => items,
        other => {
            malformed("scripts", "array", other);
            return;
        }
    };

    for item in items {
        let (src, content_type) = match item {
            Value::String(s) => (s.as_str(), None),
            Value::Object(obj) => match obj.get("url").and_then(Value::as_str) {
                Some(src) => (
                    src,
                    obj.get("contentType")
                        .or_else(|| obj.get("content_type"))
                        .and_then(Value::as_str),
                ),
                None => {
                    malformed("scripts[]", "{url, contentType} object", item);
                    continue;
                }
            },
            other => {
                malformed("scripts[]", "string or object", other);
                continue;
            }
        };
        let src = src.trim();
        if script_filter::is_javascript(src, content_type) {
            bundle.add_script(src);
        }
    }
}

/// HTML 中的 meta 只补充缺失的名称；script src 解析为绝对地址后追加在网络脚本之后
fn merge_html_signals(bundle: &mut SignalBundle) {
    let extracted = HtmlExtractor::extract(&bundle.html);
    let base = Url::parse(&bundle.url).ok();

    let mut html_meta: Vec<(String, String)> = Vec::new();
    for (name, content) in extracted.meta_tags {
        if !bundle.meta.contains_key(&name) {
            html_meta.push((name, content));
        }
    }
    for (name, content) in html_meta {
        bundle.add_meta(&name, content);
    }

    for src in extracted.script_srcs {
        let resolved = script_filter::resolve_src(base.as_ref(), &src);
        if script_filter::has_js_extension(&resolved) {
            bundle.add_script(resolved);
        }
    }
}
