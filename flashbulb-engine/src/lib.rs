// 错误定义
pub mod error;
// 核心公共结构体+枚举
pub mod core;
// 签名文档解析
pub mod source;
// 正则修复+加载统计
pub mod cleaner;
// 签名库（加载+编译+索引）
pub mod store;
// 信号匹配
pub mod matcher;
// 检测结果归并（聚合/推导/排除）
pub mod resolver;
pub mod utils;

// 顶层导出常用类型
pub use crate::core::{
    Category, CategoryRef, Detection, KeyedPatterns, MatchType, Matcher, Pattern, Relation,
    Resolution, SignalBundle, SignalKind, SignaturePatterns, TechnologySignature, VersionRule,
};
pub use cleaner::LoadStats;
pub use error::{CoreError, CoreResult};
pub use matcher::SignalMatcher;
pub use resolver::Resolver;
pub use store::{LoadOptions, SignatureStore};
pub use utils::preview;

/// 匹配 + 归并：信号集合 → 最终技术列表
pub fn resolve_bundle(store: &SignatureStore, bundle: &SignalBundle) -> Vec<Resolution> {
    let detections = SignalMatcher::new(store).run(bundle);
    Resolver::new(store).resolve(&detections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> SignatureStore {
        SignatureStore::from_value(
            json!({
                "categories": {
                    "webServers": { "name": "Web servers", "priority": 8 },
                    "cms": { "name": "CMS", "priority": 1 },
                    "languages": { "name": "Programming languages", "priority": 4 }
                },
                "apps": {
                    "nginx": {
                        "categories": ["webServers"],
                        "patterns": { "header": { "Server": "nginx(?:/([\\d.]+))?" } }
                    },
                    "WordPress": {
                        "cats": ["cms"],
                        "html": "wp-content",
                        "meta": { "generator": "^WordPress ?([\\d.]+)?\\;version:\\1" },
                        "implies": "PHP\\;confidence:80"
                    },
                    "PHP": { "cats": ["languages"], "headers": { "X-Powered-By": "^php/?([\\d.]+)?" } },
                    "Joomla": { "cats": ["cms"], "html": "joomla", "excludes": "WordPress" }
                }
            }),
            &LoadOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_end_to_end_nginx() {
        let store = store();
        let bundle = SignalBundle::new("https://example.com").with_header("Server", "nginx/1.18.0");
        let out = resolve_bundle(&store, &bundle);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "nginx");
        assert_eq!(out[0].version.as_deref(), Some("1.18.0"));
        assert_eq!(out[0].categories[0].id, "webServers");

        let value = serde_json::to_value(&out[0]).unwrap();
        assert_eq!(value["categories"], json!([{ "id": "webServers", "name": "Web servers" }]));
    }

    #[test]
    fn test_empty_bundle_resolves_to_nothing() {
        let store = store();
        assert!(resolve_bundle(&store, &SignalBundle::default()).is_empty());
    }

    #[test]
    fn test_implied_technology_is_reported() {
        let store = store();
        let bundle = SignalBundle::new("https://blog.test")
            .with_html("<link href='/wp-content/style.css'>")
            .with_meta("Generator", "WordPress 6.4.2");
        let out = resolve_bundle(&store, &bundle);

        let names: Vec<&str> = out.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["WordPress", "PHP"]);
        assert_eq!(out[0].version.as_deref(), Some("6.4.2"));
        assert_eq!(out[1].confidence, 80);
        assert_eq!(out[1].implied_by, vec!["WordPress"]);
    }

    #[test]
    fn test_exclusion_end_to_end() {
        let store = store();
        let bundle = SignalBundle::default().with_html("joomla wp-content");
        let out = resolve_bundle(&store, &bundle);
        let names: Vec<&str> = out.iter().map(|r| r.name.as_str()).collect();
        assert!(names.contains(&"Joomla"));
        assert!(!names.contains(&"WordPress"));
        // 推导在排除之前完成
        assert!(names.contains(&"PHP"));
    }
}
