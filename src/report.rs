//! 页面报告：观测数据 + 技术识别结果，以及存储对象键的命名规则
use crate::normalizer::{PageStatus, RawObservation};
use flashbulb_engine::Resolution;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 单个目标的分析报告
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageReport {
    pub start_url: String,
    pub final_url: String,
    #[serde(default)]
    pub status: Option<PageStatus>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    /// 截图对象键
    pub screenshot: String,
    pub technologies: Vec<Resolution>,
}

impl PageReport {
    pub fn new(obs: &RawObservation, prefix: &str, technologies: Vec<Resolution>) -> Self {
        let keys = ObjectKeys::new(prefix, obs.start_url_or_final());
        Self {
            start_url: obs.start_url_or_final().to_string(),
            final_url: obs.url.clone(),
            status: obs.status.clone(),
            title: obs.title.clone(),
            ip_address: obs.ip_address.clone(),
            screenshot: keys.screenshot,
            technologies,
        }
    }
}

/// 地址 → 可作对象键的安全名：首个 `://` 换成 `-`，所有 `/` 换成 `__`
pub fn safe_url(url: &str) -> String {
    url.replacen("://", "-", 1).replace('/', "__")
}

/// 去掉开头的 `/`，非空前缀保证以 `/` 结尾
pub fn normalize_prefix(prefix: &str) -> String {
    let mut prefix = prefix.strip_prefix('/').unwrap_or(prefix).to_string();
    if !prefix.is_empty() && !prefix.ends_with('/') {
        prefix.push('/');
    }
    prefix
}

/// 单个目标对应的三个对象键
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKeys {
    pub report: String,
    pub screenshot: String,
    pub error: String,
}

impl ObjectKeys {
    /// `prefix` 需已规范化
    pub fn new(prefix: &str, start_url: &str) -> Self {
        let safe = safe_url(start_url);
        Self {
            report: format!("{prefix}{safe}.json"),
            screenshot: format!("{prefix}{safe}.png"),
            error: format!("{prefix}errors/{safe}.txt"),
        }
    }
}

/// 合并多份报告：`{"targets": [...]}`
pub fn combine_reports<I>(reports: I) -> Value
where
    I: IntoIterator<Item = Value>,
{
    serde_json::json!({ "targets": reports.into_iter().collect::<Vec<_>>() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_safe_url() {
        assert_eq!(safe_url("https://example.com/a/b"), "https-example.com__a__b");
        assert_eq!(safe_url("http://a.test/x?u=http://b"), "http-a.test__x?u=http:____b");
        assert_eq!(safe_url("example.com"), "example.com");
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix("/scans"), "scans/");
        assert_eq!(normalize_prefix("scans/2024/"), "scans/2024/");
    }

    #[test]
    fn test_object_keys() {
        let keys = ObjectKeys::new("scans/", "https://example.com/");
        assert_eq!(keys.report, "scans/https-example.com__.json");
        assert_eq!(keys.screenshot, "scans/https-example.com__.png");
        assert_eq!(keys.error, "scans/errors/https-example.com__.txt");
    }

    #[test]
    fn test_page_report_shape() {
        let obs = RawObservation::from(json!({
            "startUrl": "http://example.com",
            "finalUrl": "https://example.com/",
            "title": "Example",
            "status": { "code": 200, "text": "OK" },
            "ipAddress": "93.184.216.34"
        }));
        let report = PageReport::new(&obs, "", Vec::new());
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["startUrl"], "http://example.com");
        assert_eq!(value["finalUrl"], "https://example.com/");
        assert_eq!(value["screenshot"], "http-example.com.png");
        assert_eq!(value["status"]["code"], 200);
        assert_eq!(value["ipAddress"], "93.184.216.34");
        assert_eq!(value["technologies"], json!([]));

        let back: PageReport = serde_json::from_value(value).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_combine_reports() {
        let combined = combine_reports(vec![json!({ "startUrl": "a" }), json!({ "startUrl": "b" })]);
        assert_eq!(combined["targets"].as_array().map(Vec::len), Some(2));
        assert_eq!(combine_reports(Vec::new()), json!({ "targets": [] }));
    }
}
