//! 版本模板：加载时一次性解析为片段序列，匹配时只做替换
//! 支持 `\N` / `$N` / `${N}` 分组引用，以及 `\N?有值:无值` 三元形式

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{Display, Formatter};

/// 隐式 `\1` 只接受形如版本号的捕获（`1.25.3`、`v2`、`4.0-rc1`）
static VERSION_LIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[vV]?\d[\w.\-+]*$").expect("VERSION_LIKE regex is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
enum VersionPart {
    Literal(String),
    Group(usize),
    /// 三元形式会吞掉模板剩余部分，两个分支内部仍可引用分组
    Ternary {
        group: usize,
        present: Vec<VersionPart>,
        absent: Vec<VersionPart>,
    },
}

/// 解析后的版本模板
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRule {
    template: String,
    parts: Vec<VersionPart>,
    /// 未声明模板时的默认规则
    implicit: bool,
}

impl VersionRule {
    pub fn parse(template: &str) -> Self {
        Self {
            template: template.to_string(),
            parts: parse_parts(template),
            implicit: false,
        }
    }

    /// 带捕获组的正则在未声明模板时使用的默认模板
    /// 捕获内容不像版本号时（如 `(row|col)` 这类分支分组）视为无版本
    pub fn first_group() -> Self {
        Self {
            implicit: true,
            ..Self::parse("\\1")
        }
    }

    /// 用捕获组渲染模板
    /// `groups[0]` 为整体匹配，缺失或越界的分组按空串处理；结果去空白后为空则视为无版本
    pub fn apply(&self, groups: &[Option<&str>]) -> Option<String> {
        let mut rendered = String::new();
        render(&self.parts, groups, &mut rendered);
        let version = rendered.trim();
        if version.is_empty() || (self.implicit && !VERSION_LIKE.is_match(version)) {
            None
        } else {
            Some(version.to_string())
        }
    }
}

impl Display for VersionRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.template)
    }
}

fn render(parts: &[VersionPart], groups: &[Option<&str>], out: &mut String) {
    for part in parts {
        match part {
            VersionPart::Literal(text) => out.push_str(text),
            VersionPart::Group(index) => out.push_str(group_value(groups, *index)),
            VersionPart::Ternary {
                group,
                present,
                absent,
            } => {
                if group_value(groups, *group).is_empty() {
                    render(absent, groups, out);
                } else {
                    render(present, groups, out);
                }
            }
        }
    }
}

#[inline]
fn group_value<'a>(groups: &[Option<&'a str>], index: usize) -> &'a str {
    groups.get(index).copied().flatten().unwrap_or("")
}

fn parse_parts(template: &str) -> Vec<VersionPart> {
    let chars: Vec<char> = template.chars().collect();
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\\' || c == '$' {
            if let Some((group, next)) = read_group_ref(&chars, i + 1) {
                if !literal.is_empty() {
                    parts.push(VersionPart::Literal(std::mem::take(&mut literal)));
                }
                if chars.get(next) == Some(&'?') {
                    let rest: String = chars[next + 1..].iter().collect();
                    if let Some((present, absent)) = rest.split_once(':') {
                        parts.push(VersionPart::Ternary {
                            group,
                            present: parse_parts(present),
                            absent: parse_parts(absent),
                        });
                        return parts;
                    }
                }
                parts.push(VersionPart::Group(group));
                i = next;
                continue;
            }
        }
        literal.push(c);
        i += 1;
    }

    if !literal.is_empty() {
        parts.push(VersionPart::Literal(literal));
    }
    parts
}

/// 读取 `N` 或 `{N}` 形式的分组编号，返回（编号, 下一个字符位置）
fn read_group_ref(chars: &[char], start: usize) -> Option<(usize, usize)> {
    let braced = chars.get(start) == Some(&'{');
    let digits_start = if braced { start + 1 } else { start };

    let mut end = digits_start;
    while end < chars.len() && chars[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        return None;
    }

    let number: String = chars[digits_start..end].iter().collect();
    let index = number.parse::<usize>().ok()?;

    if braced {
        if chars.get(end) != Some(&'}') {
            return None;
        }
        end += 1;
    }
    Some((index, end))
}
