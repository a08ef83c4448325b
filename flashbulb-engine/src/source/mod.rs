// 签名文档解析 (Wappalyzer 风格 JSON)
pub mod document;
// 模式字符串后缀解析
pub mod pattern_parser;

pub use document::{category_ids, RawCategory, RawSignals, RawTechnology, SignatureDocument};
pub use pattern_parser::{parse_pattern_string, parse_relation, pattern_strings, PatternSpec};
