use serde::{Deserialize, Serialize};

use super::enums::SignalKind;
use super::pattern::{KeyedPatterns, Pattern};

/// 分类定义
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
    /// 展示优先级，数值越小越靠前
    #[serde(default)]
    pub priority: u32,
}

/// 推导/排除关系（`implies` / `excludes` 条目）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Relation {
    pub target: String,
    /// 关系自身的置信度上限（0-100），未声明时为100
    pub confidence: u8,
}

impl Relation {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            confidence: 100,
        }
    }
}

/// 按信号类型归类的编译后模式
#[derive(Debug, Clone, Default)]
pub struct SignaturePatterns {
    pub html: Vec<Pattern>,
    pub script: Vec<Pattern>,
    pub url: Vec<Pattern>,
    /// 键值型模式按键名排序存储，保证遍历顺序稳定
    pub headers: Vec<KeyedPatterns>,
    pub meta: Vec<KeyedPatterns>,
    pub cookies: Vec<KeyedPatterns>,
}

impl SignaturePatterns {
    /// 列表型信号的模式（键值型信号返回空切片）
    pub fn list(&self, kind: SignalKind) -> &[Pattern] {
        match kind {
            SignalKind::Html => &self.html,
            SignalKind::Script => &self.script,
            SignalKind::Url => &self.url,
            SignalKind::Header | SignalKind::Meta | SignalKind::Cookie => &[],
        }
    }

    /// 键值型信号的模式组（列表型信号返回空切片）
    pub fn keyed(&self, kind: SignalKind) -> &[KeyedPatterns] {
        match kind {
            SignalKind::Header => &self.headers,
            SignalKind::Meta => &self.meta,
            SignalKind::Cookie => &self.cookies,
            SignalKind::Html | SignalKind::Script | SignalKind::Url => &[],
        }
    }

    pub fn len(&self) -> usize {
        let keyed = |groups: &[KeyedPatterns]| -> usize {
            groups.iter().map(|g| g.patterns.len()).sum()
        };
        self.html.len()
            + self.script.len()
            + self.url.len()
            + keyed(&self.headers)
            + keyed(&self.meta)
            + keyed(&self.cookies)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 单个技术的完整签名
#[derive(Debug, Clone)]
pub struct TechnologySignature {
    /// 签名库中的唯一标识（文档中的键）
    pub id: String,
    /// 展示名称，文档未声明时与 id 相同
    pub name: String,
    pub category_ids: Vec<String>,
    pub patterns: SignaturePatterns,
    pub implies: Vec<Relation>,
    pub excludes: Vec<Relation>,
    pub website: Option<String>,
    pub icon: Option<String>,

    #[cfg(feature = "full-meta")]
    pub description: Option<String>,
    #[cfg(feature = "full-meta")]
    pub cpe: Option<String>,
}

impl TechnologySignature {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            category_ids: Vec::new(),
            patterns: SignaturePatterns::default(),
            implies: Vec::new(),
            excludes: Vec::new(),
            website: None,
            icon: None,
            #[cfg(feature = "full-meta")]
            description: None,
            #[cfg(feature = "full-meta")]
            cpe: None,
        }
    }
}
