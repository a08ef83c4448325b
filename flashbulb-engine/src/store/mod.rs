//! 签名库：进程内加载一次，之后只读共享（`Arc<SignatureStore>`）
mod compiler;

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::cleaner::LoadStats;
use crate::core::{Category, TechnologySignature};
use crate::error::CoreResult;
use crate::source::SignatureDocument;

use compiler::SignatureCompiler;

/// 签名加载选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// 所有模式按大小写不敏感编译
    pub case_insensitive: bool,
    /// 单条正则编译后的程序大小上限，超出视为无效模式
    pub regex_size_limit: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            case_insensitive: false,
            regex_size_limit: 10 * (1 << 20),
        }
    }
}

/// 不可变签名库
/// 技术按 id 排序存放在 arena 中，通过 id → 下标索引定位
#[derive(Debug, Clone, Default)]
pub struct SignatureStore {
    technologies: Vec<TechnologySignature>,
    index: FxHashMap<String, usize>,
    categories: FxHashMap<String, Category>,
    stats: LoadStats,
}

impl SignatureStore {
    /// 从 JSON 文本加载
    pub fn from_json_str(content: &str, options: &LoadOptions) -> CoreResult<Self> {
        let value: Value = serde_json::from_str(content)?;
        Self::from_value(value, options)
    }

    /// 从 JSON 字节流加载
    pub fn from_slice(bytes: &[u8], options: &LoadOptions) -> CoreResult<Self> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_value(value, options)
    }

    /// 从已解析的 JSON 文档加载
    /// 仅文档根结构无效时返回错误；单条签名错误记录后跳过
    pub fn from_value(value: Value, options: &LoadOptions) -> CoreResult<Self> {
        let document = SignatureDocument::from_value(value)?;
        Ok(SignatureCompiler::new(options).compile(document))
    }

    /// 直接由已构建的签名组装（测试夹具/自定义来源）
    pub fn from_parts(
        mut technologies: Vec<TechnologySignature>,
        categories: Vec<Category>,
    ) -> Self {
        technologies.sort_by(|a, b| a.id.cmp(&b.id));
        technologies.dedup_by(|a, b| a.id == b.id);
        let index = technologies
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();
        let categories = categories.into_iter().map(|c| (c.id.clone(), c)).collect();
        Self {
            technologies,
            index,
            categories,
            stats: LoadStats::default(),
        }
    }

    pub(crate) fn with_stats(mut self, stats: LoadStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn get(&self, id: &str) -> Option<&TechnologySignature> {
        self.index.get(id).map(|&i| &self.technologies[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// 按 id 排序的全部技术签名
    pub fn technologies(&self) -> &[TechnologySignature] {
        &self.technologies
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.get(id)
    }

    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.technologies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.technologies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SignalKind;
    use serde_json::json;

    fn fixture() -> serde_json::Value {
        json!({
            "categories": {
                "22": { "name": "Web servers", "priority": 8 },
                "1": { "name": "CMS", "priority": 1 }
            },
            "apps": {
                "nginx": {
                    "cats": [22],
                    "headers": { "Server": "nginx(?:/([\\d.]+))?\\;version:\\1" }
                },
                "WordPress": {
                    "cats": [1],
                    "html": ["<link rel=[\"']stylesheet[\"'] [^>]+wp-(?:content|includes)", "wp-content"],
                    "meta": { "generator": "^WordPress ?([\\d.]+)?\\;version:\\1" },
                    "cookies": { "wordpress_test_cookie": "" },
                    "implies": ["PHP", "MySQL\\;confidence:50"]
                },
                "PHP": { "cats": [27], "headers": { "X-Powered-By": "php/?([\\d.]+)?" } },
                "MySQL": { "cats": [34] },
                "Broken": { "html": "foo\\;confidence:oops", "headers": "not-an-object" },
                "Garbage": 42
            }
        })
    }

    #[test]
    fn test_load_document() {
        let store = SignatureStore::from_value(fixture(), &LoadOptions::default()).unwrap();

        assert_eq!(store.len(), 5);
        assert!(store.get("Garbage").is_none());
        assert_eq!(store.stats().discarded_technologies, 1);
        assert_eq!(store.category("22").map(|c| c.name.as_str()), Some("Web servers"));

        let nginx = store.get("nginx").unwrap();
        assert_eq!(nginx.category_ids, vec!["22"]);
        let headers = nginx.patterns.keyed(SignalKind::Header);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].key, "server");

        let wp = store.get("WordPress").unwrap();
        assert_eq!(wp.patterns.html.len(), 2);
        assert_eq!(wp.implies.len(), 2);
        assert_eq!(wp.implies[1].target, "MySQL");
        assert_eq!(wp.implies[1].confidence, 50);
        assert!(wp.patterns.cookies[0].patterns[0].matcher.is_exists());
    }

    #[test]
    fn test_malformed_patterns_are_isolated() {
        let store = SignatureStore::from_value(fixture(), &LoadOptions::default()).unwrap();
        let broken = store.get("Broken").unwrap();
        assert!(broken.patterns.is_empty());
        assert_eq!(store.stats().skipped_patterns, 2);
        assert!(store.get("nginx").is_some());
    }

    #[test]
    fn test_technologies_sorted_by_id() {
        let store = SignatureStore::from_value(fixture(), &LoadOptions::default()).unwrap();
        let ids: Vec<&str> = store.technologies().iter().map(|t| t.id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_nested_patterns_block() {
        let doc = json!({
            "apps": {
                "nginx": {
                    "categories": ["webServers"],
                    "patterns": { "header": { "Server": "nginx(?:/([\\d.]+))?" } }
                }
            }
        });
        let store = SignatureStore::from_value(doc, &LoadOptions::default()).unwrap();
        let nginx = store.get("nginx").unwrap();
        assert_eq!(nginx.category_ids, vec!["webServers"]);
        assert_eq!(nginx.patterns.headers.len(), 1);
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(SignatureStore::from_json_str("{ nope", &LoadOptions::default()).is_err());
    }

    #[test]
    fn test_store_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SignatureStore>();
    }
}
