//! 信号匹配：按固定信号顺序遍历全部签名，产出原始检测记录（不去重）
use crate::core::{Detection, KeyedPatterns, Pattern, SignalBundle, SignalKind, TechnologySignature};
use crate::store::SignatureStore;
use crate::utils::preview::preview_compact;

/// 信号匹配器，借用只读签名库，可在多线程间并发使用
#[derive(Debug, Clone, Copy)]
pub struct SignalMatcher<'s> {
    store: &'s SignatureStore,
}

impl<'s> SignalMatcher<'s> {
    pub fn new(store: &'s SignatureStore) -> Self {
        Self { store }
    }

    /// 对全部信号类型执行匹配
    /// 结果顺序：信号类型（html → script → header → meta → cookie → url）优先，其次为签名库顺序
    pub fn run(&self, bundle: &SignalBundle) -> Vec<Detection> {
        let mut detections = Vec::new();
        for kind in SignalKind::EVALUATION_ORDER {
            self.run_kind(kind, bundle, &mut detections);
        }
        log::debug!(
            "Matching finished | Url: {} | Detections: {}",
            preview_compact(&bundle.url, 120),
            detections.len()
        );
        detections
    }

    /// 对单个信号类型执行匹配，结果追加到 `out`
    pub fn run_kind(&self, kind: SignalKind, bundle: &SignalBundle, out: &mut Vec<Detection>) {
        if kind.is_keyed() {
            self.run_keyed(kind, bundle, out);
        } else {
            self.run_list(kind, bundle, out);
        }
    }

    fn run_list(&self, kind: SignalKind, bundle: &SignalBundle, out: &mut Vec<Detection>) {
        let inputs: Vec<&str> = match kind {
            SignalKind::Html => vec![bundle.html.as_str()],
            SignalKind::Url => vec![bundle.url.as_str()],
            SignalKind::Script => bundle.scripts.iter().map(String::as_str).collect(),
            SignalKind::Header | SignalKind::Meta | SignalKind::Cookie => return,
        };
        let inputs: Vec<&str> = inputs.into_iter().filter(|s| !s.is_empty()).collect();
        if inputs.is_empty() {
            return;
        }

        for tech in self.store.technologies() {
            for pattern in tech.patterns.list(kind) {
                if let Some((value, version)) = first_hit(pattern, inputs.iter().copied()) {
                    out.push(record_hit(tech, kind, None, pattern, value, version));
                }
            }
        }
    }

    fn run_keyed(&self, kind: SignalKind, bundle: &SignalBundle, out: &mut Vec<Detection>) {
        let Some(signals) = bundle.keyed(kind) else {
            return;
        };
        if signals.is_empty() {
            return;
        }

        for tech in self.store.technologies() {
            for group in tech.patterns.keyed(kind) {
                let Some(values) = collect_values(group, signals) else {
                    continue;
                };
                for pattern in &group.patterns {
                    let hit = if pattern.matcher.is_exists() {
                        pattern.evaluate("").map(|version| ("", version))
                    } else {
                        first_hit(pattern, values.iter().copied())
                    };
                    if let Some((value, version)) = hit {
                        out.push(record_hit(tech, kind, Some(&group.key), pattern, value, version));
                    }
                }
            }
        }
    }
}

/// 取出模式组对应键名下的全部值；键名不存在时返回 None
/// 通配键按键名排序后依次拼接，保证结果稳定
fn collect_values<'b>(
    group: &KeyedPatterns,
    signals: &'b rustc_hash::FxHashMap<String, Vec<String>>,
) -> Option<Vec<&'b str>> {
    if !group.is_wildcard() {
        return signals
            .get(&group.key)
            .map(|values| values.iter().map(String::as_str).collect());
    }

    let mut names: Vec<&String> = signals.keys().filter(|n| group.matches_name(n)).collect();
    if names.is_empty() {
        return None;
    }
    names.sort();
    Some(
        names
            .into_iter()
            .flat_map(|n| signals[n].iter().map(String::as_str))
            .collect(),
    )
}

/// 依次评估每个值：优先返回第一个能提取出版本的命中，否则返回第一个命中
fn first_hit<'v>(
    pattern: &Pattern,
    values: impl IntoIterator<Item = &'v str>,
) -> Option<(&'v str, Option<String>)> {
    let mut first = None;
    for value in values {
        match pattern.evaluate(value) {
            Some(Some(version)) => return Some((value, Some(version))),
            Some(None) => {
                first.get_or_insert((value, None));
            }
            None => {}
        }
    }
    first
}

fn record_hit(
    tech: &TechnologySignature,
    kind: SignalKind,
    key: Option<&str>,
    pattern: &Pattern,
    value: &str,
    version: Option<String>,
) -> Detection {
    log::debug!(
        "Match hit | Tech: {} | Kind: {} | Key: {} | Value: {} | Version: {} | Confidence: {} | Rule: {}",
        tech.id,
        kind,
        key.unwrap_or("-"),
        preview_compact(value, 120),
        version.as_deref().unwrap_or("-"),
        pattern.confidence,
        pattern.matcher.describe()
    );
    Detection {
        technology_id: tech.id.clone(),
        kind,
        key: key.map(str::to_string),
        pattern: pattern.expression.clone(),
        confidence: pattern.confidence,
        version,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LoadOptions;
    use serde_json::json;

    fn store() -> SignatureStore {
        SignatureStore::from_value(
            json!({
                "apps": {
                    "WordPress": {
                        "html": "wp-content",
                        "meta": { "generator": "^WordPress ?([\\d.]+)?\\;version:\\1" },
                        "cookies": { "wordpress_logged_in_*": "" }
                    },
                    "jQuery": { "scriptSrc": "jquery[.-]([\\d.]*\\d)[^/]*\\.js\\;version:\\1" },
                    "nginx": { "headers": { "Server": "nginx(?:/([\\d.]+))?" } },
                    "Envoy": { "headers": { "Server": "^envoy$", "x-envoy-upstream-service-time": "" } },
                    "Shopify": { "url": "^https?://[^/]+\\.myshopify\\.com" },
                    "PHP": { "cookies": { "PHPSESSID": "" } }
                }
            }),
            &LoadOptions::default(),
        )
        .unwrap()
    }

    fn ids(detections: &[Detection]) -> Vec<&str> {
        detections.iter().map(|d| d.technology_id.as_str()).collect()
    }

    #[test]
    fn test_html_contains() {
        let store = store();
        let bundle = SignalBundle::new("https://a.test").with_html("<link href=/wp-content/x.css>");
        let detections = SignalMatcher::new(&store).run(&bundle);
        assert_eq!(ids(&detections), vec!["WordPress"]);
        assert_eq!(detections[0].kind, SignalKind::Html);
        assert_eq!(detections[0].confidence, 100);
    }

    #[test]
    fn test_every_script_url_is_checked() {
        let store = store();
        let bundle = SignalBundle::default()
            .with_script("https://cdn.test/app.js")
            .with_script("https://cdn.test/jquery-3.6.0.min.js");
        let detections = SignalMatcher::new(&store).run(&bundle);
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].version.as_deref(), Some("3.6.0"));
    }

    #[test]
    fn test_multi_valued_header() {
        let store = store();
        let bundle = SignalBundle::default()
            .with_header("Server", "cloudflare")
            .with_header("Server", "nginx/1.18.0");
        let detections = SignalMatcher::new(&store).run(&bundle);
        assert_eq!(ids(&detections), vec!["nginx"]);
        assert_eq!(detections[0].key.as_deref(), Some("server"));
        assert_eq!(detections[0].version.as_deref(), Some("1.18.0"));
    }

    #[test]
    fn test_version_bearing_value_preferred() {
        let store = store();
        let bundle = SignalBundle::default()
            .with_header("Server", "nginx")
            .with_header("Server", "nginx/1.25.1");
        let detections = SignalMatcher::new(&store).run(&bundle);
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].version.as_deref(), Some("1.25.1"));
    }

    #[test]
    fn test_exists_and_wildcard_cookies() {
        let store = store();
        let bundle = SignalBundle::default()
            .with_cookie("PHPSESSID", "abc")
            .with_cookie("wordpress_logged_in_5f2a", "admin");
        let detections = SignalMatcher::new(&store).run(&bundle);
        assert_eq!(ids(&detections), vec!["PHP", "WordPress"]);
        assert!(detections.iter().all(|d| d.kind == SignalKind::Cookie));
    }

    #[test]
    fn test_header_exists_without_value_pattern() {
        let store = store();
        let bundle = SignalBundle::default().with_header("X-Envoy-Upstream-Service-Time", "3");
        let detections = SignalMatcher::new(&store).run(&bundle);
        assert_eq!(ids(&detections), vec!["Envoy"]);
    }

    #[test]
    fn test_meta_and_url() {
        let store = store();
        let bundle = SignalBundle::new("https://demo.myshopify.com/products")
            .with_meta("generator", "WordPress 6.4.2");
        let detections = SignalMatcher::new(&store).run(&bundle);
        assert_eq!(ids(&detections), vec!["WordPress", "Shopify"]);
        assert_eq!(detections[0].version.as_deref(), Some("6.4.2"));
        assert_eq!(detections[1].kind, SignalKind::Url);
    }

    #[test]
    fn test_detections_follow_kind_order() {
        let store = store();
        let bundle = SignalBundle::new("https://a.test")
            .with_html("wp-content")
            .with_header("Server", "nginx")
            .with_meta("generator", "WordPress");
        let detections = SignalMatcher::new(&store).run(&bundle);
        let kinds: Vec<SignalKind> = detections.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![SignalKind::Html, SignalKind::Header, SignalKind::Meta]);
    }

    #[test]
    fn test_empty_bundle_yields_nothing() {
        let store = store();
        let bundle = SignalBundle::default();
        assert!(SignalMatcher::new(&store).run(&bundle).is_empty());
    }
}
