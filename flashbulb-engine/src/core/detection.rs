use serde::{Deserialize, Serialize};

use super::enums::SignalKind;

/// 单条模式命中产生的检测记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub technology_id: String,
    pub kind: SignalKind,
    /// 键值型信号的键名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// 命中模式的表达式
    pub pattern: String,
    pub confidence: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// 结果中的分类引用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: String,
    pub name: String,
    #[serde(skip)]
    pub priority: u32,
}

/// 归并后的单个技术结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    #[serde(rename = "id")]
    pub technology_id: String,
    pub name: String,
    pub confidence: u8,
    pub version: Option<String>,
    pub categories: Vec<CategoryRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// 仅由推导得到时记录推导来源
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implied_by: Vec<String>,
}

impl Resolution {
    /// 是否仅由推导得到（没有任何直接命中）
    pub fn is_implied(&self) -> bool {
        !self.implied_by.is_empty()
    }
}
