use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::enums::SignalKind;

/// 规范化后的页面信号集合，匹配器的唯一输入
/// Header/Meta 键名统一小写；Cookie 键名保持原样；多值按出现顺序保存
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalBundle {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub scripts: Vec<String>,
    #[serde(default)]
    pub headers: FxHashMap<String, Vec<String>>,
    #[serde(default)]
    pub cookies: FxHashMap<String, Vec<String>>,
    #[serde(default)]
    pub meta: FxHashMap<String, Vec<String>>,
}

impl SignalBundle {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = html.into();
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.add_header(name, value);
        self
    }

    pub fn with_cookie(mut self, name: &str, value: impl Into<String>) -> Self {
        self.add_cookie(name, value);
        self
    }

    pub fn with_meta(mut self, name: &str, value: impl Into<String>) -> Self {
        self.add_meta(name, value);
        self
    }

    pub fn with_script(mut self, src: impl Into<String>) -> Self {
        self.add_script(src);
        self
    }

    pub fn add_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers
            .entry(name.trim().to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    pub fn add_cookie(&mut self, name: &str, value: impl Into<String>) {
        self.cookies
            .entry(name.trim().to_string())
            .or_default()
            .push(value.into());
    }

    pub fn add_meta(&mut self, name: &str, value: impl Into<String>) {
        self.meta
            .entry(name.trim().to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// 追加脚本地址，已存在的地址不重复添加
    pub fn add_script(&mut self, src: impl Into<String>) -> bool {
        let src = src.into();
        if src.is_empty() || self.scripts.iter().any(|s| s == &src) {
            return false;
        }
        self.scripts.push(src);
        true
    }

    /// 指定键值型信号的原始映射
    pub fn keyed(&self, kind: SignalKind) -> Option<&FxHashMap<String, Vec<String>>> {
        match kind {
            SignalKind::Header => Some(&self.headers),
            SignalKind::Meta => Some(&self.meta),
            SignalKind::Cookie => Some(&self.cookies),
            SignalKind::Html | SignalKind::Script | SignalKind::Url => None,
        }
    }

    /// 所有信号是否都为空
    pub fn is_empty(&self) -> bool {
        self.url.is_empty()
            && self.html.is_empty()
            && self.scripts.is_empty()
            && self.headers.is_empty()
            && self.cookies.is_empty()
            && self.meta.is_empty()
    }
}
