//! Header格式转换工具
use crate::error::FlashResult;
use http::header::HeaderMap;
use log::warn;
use rustc_hash::FxHashMap;
use serde_json::Value;

/// 单个响应的 Header 数量上限，超出部分丢弃
const MAX_HEADER_ENTRIES: usize = 1000;

/// Header转换工具
pub struct HeaderConverter;

impl HeaderConverter {
    /// 将HeaderMap转换为FxHashMap<String, Vec<String>>
    /// 键名小写，值原样保留；非可见 ASCII 的值视为无效输入
    pub fn to_hashmap(header_map: &HeaderMap) -> FlashResult<FxHashMap<String, Vec<String>>> {
        let mut map: FxHashMap<String, Vec<String>> = FxHashMap::default();

        for (iter_count, (key, value)) in header_map.iter().enumerate() {
            if iter_count >= MAX_HEADER_ENTRIES {
                warn!("Header count exceeds {}, truncating", MAX_HEADER_ENTRIES);
                break;
            }
            map.entry(key.as_str().to_ascii_lowercase())
                .or_default()
                .push(value.to_str()?.to_string());
        }
        Ok(map)
    }

    /// 转换为观测记录中的 headers 字段（`{name: [values]}`）
    pub fn to_json(header_map: &HeaderMap) -> FlashResult<Value> {
        let map = Self::to_hashmap(header_map)?;
        let object = map
            .into_iter()
            .map(|(k, v)| (k, Value::from(v)))
            .collect::<serde_json::Map<_, _>>();
        Ok(Value::Object(object))
    }

    /// 拆分换行拼接的重复 Header 值（无头浏览器会把同名 Header 用 `\n` 合并）
    pub fn split_values(raw: &str) -> impl Iterator<Item = &str> {
        raw.split('\n').map(str::trim).filter(|s| !s.is_empty())
    }

    /// 解析 Set-Cookie：只取首段 name=value，过滤 deleted Cookie
    pub fn parse_set_cookie(raw_cookie: &str) -> Option<(String, String)> {
        let cookie_str = raw_cookie.trim();
        if cookie_str.is_empty() {
            return None;
        }

        let core_kv = cookie_str
            .split(';')
            .map(str::trim)
            .find(|s| !s.is_empty())?;
        split_pair(core_kv)
    }

    /// 解析请求侧 Cookie：`a=1; b=2`
    pub fn parse_request_cookie(raw_cookie: &str) -> Vec<(String, String)> {
        raw_cookie
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(split_pair)
            .collect()
    }
}

/// name 不能为空，值不能是 deleted
fn split_pair(core_kv: &str) -> Option<(String, String)> {
    let pos = core_kv.find('=')?;
    let name = core_kv[..pos].trim();
    let value = core_kv[pos + 1..].trim().trim_matches('"');
    if name.is_empty() || value.eq_ignore_ascii_case("deleted") {
        return None;
    }
    Some((name.to_string(), value.to_string()))
}
