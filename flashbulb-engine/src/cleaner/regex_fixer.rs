//! 负责所有正则相关的修复逻辑（JS 正则 → Rust regex 语法）
use once_cell::sync::Lazy;
use regex::Regex;

use super::load_stats::LoadStats;

// 粗略匹配所有环视（支持一层嵌套括号），非精确解析
static LOOK_AROUND_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\(\?\s*(?:=|!|<=|<!)((?:[^()]|\([^()]*\))*)\)"#)
        .expect("look-around pattern is valid")
});

/// 正则修复器
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexFixer;

impl RegexFixer {
    /// 依次执行全部修复，并把修复结果计入统计
    pub fn repair(&self, pattern: &str, stats: &mut LoadStats) -> String {
        let mut repaired = false;

        let (cleaned, fixed) = self.remove_look_around(pattern);
        if fixed {
            stats.fixed_look_around_count += 1;
            repaired = true;
        }

        let (cleaned, fixed) = self.clean_invalid_escapes(&cleaned);
        if fixed {
            stats.fixed_invalid_escapes_count += 1;
            repaired = true;
        }

        let (cleaned, fixed) = self.fix_charset_hyphen(&cleaned);
        if fixed {
            stats.fixed_charset_hyphen_count += 1;
            repaired = true;
        }

        let (cleaned, fixed) = self.fix_unbalanced_groups(&cleaned);
        if fixed {
            stats.fixed_unbalanced_groups_count += 1;
            repaired = true;
        }

        if repaired {
            stats.repaired_regex_count += 1;
            log::trace!("Regex repaired: {} -> {}", pattern, cleaned);
        }
        cleaned
    }

    /// 移除环视语法（(?=)(?!)(?<=)(?<!)，Rust regex 不支持）
    pub fn remove_look_around(&self, pattern: &str) -> (String, bool) {
        let cleaned = LOOK_AROUND_REGEX.replace_all(pattern, "");
        let fixed = cleaned.len() != pattern.len();
        (cleaned.into_owned(), fixed)
    }

    /// 清理 Rust 不支持的转义：丢弃反斜杠，保留字面字符
    /// 典型场景：`\<` `\>`（Rust 中为单词边界）、`\1` 反向引用、`\c` 控制字符
    pub fn clean_invalid_escapes(&self, pattern: &str) -> (String, bool) {
        let mut cleaned = String::with_capacity(pattern.len());
        let mut fixed = false;
        let mut in_charset = false;
        let mut chars = pattern.chars();

        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(next) if is_supported_escape(next, in_charset) => {
                        cleaned.push('\\');
                        cleaned.push(next);
                    }
                    Some(next) => {
                        cleaned.push(next);
                        fixed = true;
                    }
                    None => {
                        // 末尾孤立的反斜杠按字面量处理
                        cleaned.push_str("\\\\");
                        fixed = true;
                    }
                },
                '[' if !in_charset => {
                    in_charset = true;
                    cleaned.push(c);
                }
                ']' if in_charset => {
                    in_charset = false;
                    cleaned.push(c);
                }
                _ => cleaned.push(c),
            }
        }

        (cleaned, fixed)
    }

    /// 修复字符集中与类转义相邻的连字符（如 `[\w-.]`），转义为 `\-`
    /// 合法场景不修改：`[a-z]`、`[-abc]`、`[abc-]`；未闭合的 `[` 转义为字面量
    pub fn fix_charset_hyphen(&self, pattern: &str) -> (String, bool) {
        let chars: Vec<char> = pattern.chars().collect();
        let mut cleaned = String::with_capacity(pattern.len());
        let mut fixed = false;
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '\\' => {
                    cleaned.push('\\');
                    if let Some(&next) = chars.get(i + 1) {
                        cleaned.push(next);
                    }
                    i += 2;
                }
                '[' => match find_charset_end(&chars, i + 1) {
                    Some(end) => {
                        let body = tokenize_charset(&chars[i + 1..end]);
                        cleaned.push('[');
                        cleaned.push_str(&rebuild_charset(&body, &mut fixed));
                        cleaned.push(']');
                        i = end + 1;
                    }
                    None => {
                        cleaned.push_str("\\[");
                        fixed = true;
                        i += 1;
                    }
                },
                c => {
                    cleaned.push(c);
                    i += 1;
                }
            }
        }

        (cleaned, fixed)
    }

    /// 修复不平衡的分组：多余的 `)` 转义，缺失的 `)` 补齐
    pub fn fix_unbalanced_groups(&self, pattern: &str) -> (String, bool) {
        let mut open_groups = 0usize;
        let mut cleaned = String::with_capacity(pattern.len() + 2);
        let mut fixed = false;
        let mut is_escaping = false;
        let mut in_charset = false;

        for c in pattern.chars() {
            if is_escaping {
                cleaned.push(c);
                is_escaping = false;
                continue;
            }
            match c {
                '\\' => {
                    cleaned.push(c);
                    is_escaping = true;
                }
                '[' if !in_charset => {
                    in_charset = true;
                    cleaned.push(c);
                }
                ']' if in_charset => {
                    in_charset = false;
                    cleaned.push(c);
                }
                '(' if !in_charset => {
                    open_groups += 1;
                    cleaned.push(c);
                }
                ')' if !in_charset => {
                    if open_groups > 0 {
                        open_groups -= 1;
                        cleaned.push(c);
                    } else {
                        cleaned.push_str("\\)");
                        fixed = true;
                    }
                }
                _ => cleaned.push(c),
            }
        }

        for _ in 0..open_groups {
            cleaned.push(')');
            fixed = true;
        }

        (cleaned, fixed)
    }
}

/// Rust regex 支持的转义
fn is_supported_escape(c: char, in_charset: bool) -> bool {
    match c {
        '<' | '>' => false,
        c if c.is_ascii_punctuation() => true,
        'd' | 'D' | 'w' | 'W' | 's' | 'S' | 'n' | 'r' | 't' | 'f' | 'v' | 'x' | 'u' | 'p'
        | 'P' => true,
        // 断言类转义不能出现在字符集中
        'b' | 'B' | 'A' | 'z' => !in_charset,
        _ => false,
    }
}

#[derive(Debug, PartialEq)]
enum CharsetItem {
    Literal(String),
    /// \d \w \s \p{..} 等类转义，不能作为范围端点
    ClassEscape(String),
    Hyphen,
}

/// 查找字符集结束位置（`[` 或 `[^` 之后紧跟的 `]` 视为字面量）
fn find_charset_end(chars: &[char], body_start: usize) -> Option<usize> {
    let mut i = body_start;
    if chars.get(i) == Some(&'^') {
        i += 1;
    }
    if chars.get(i) == Some(&']') {
        i += 1;
    }
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            ']' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

fn tokenize_charset(body: &[char]) -> Vec<CharsetItem> {
    let mut items = Vec::new();
    let mut i = 0;
    while i < body.len() {
        match body[i] {
            '\\' => {
                let Some(&next) = body.get(i + 1) else {
                    items.push(CharsetItem::Literal("\\".to_string()));
                    break;
                };
                let mut text = format!("\\{}", next);
                i += 2;
                match next {
                    'p' | 'P' if body.get(i) == Some(&'{') => {
                        while i < body.len() {
                            text.push(body[i]);
                            i += 1;
                            if body[i - 1] == '}' {
                                break;
                            }
                        }
                        items.push(CharsetItem::ClassEscape(text));
                    }
                    'd' | 'D' | 'w' | 'W' | 's' | 'S' | 'p' | 'P' => {
                        items.push(CharsetItem::ClassEscape(text))
                    }
                    _ => items.push(CharsetItem::Literal(text)),
                }
            }
            '-' => {
                items.push(CharsetItem::Hyphen);
                i += 1;
            }
            c => {
                items.push(CharsetItem::Literal(c.to_string()));
                i += 1;
            }
        }
    }
    items
}

fn rebuild_charset(items: &[CharsetItem], fixed: &mut bool) -> String {
    let mut out = String::new();
    for (idx, item) in items.iter().enumerate() {
        match item {
            CharsetItem::Literal(text) | CharsetItem::ClassEscape(text) => out.push_str(text),
            CharsetItem::Hyphen => {
                let prev = idx.checked_sub(1).and_then(|p| items.get(p));
                let next = items.get(idx + 1);
                let at_edge = prev.is_none() || next.is_none();
                let touches_class = matches!(prev, Some(CharsetItem::ClassEscape(_)))
                    || matches!(next, Some(CharsetItem::ClassEscape(_)));
                if !at_edge && touches_class {
                    out.push_str("\\-");
                    *fixed = true;
                } else {
                    out.push('-');
                }
            }
        }
    }
    out
}
