//! 签名加载统计：定义、更新与格式化输出

use serde::Serialize;

use crate::core::{MatchType, SignalKind};

/// 签名加载统计信息
/// 记录加载过程中的各类指标：
/// 1. 技术签名总数/保留数/丢弃数
/// 2. 各信号类型的有效模式数、被跳过的模式数
/// 3. 匹配类型分布
/// 4. 正则修复统计
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    // ========== 技术签名统计 ==========
    pub total_technologies: u32,
    pub kept_technologies: u32,
    /// 整条签名结构无效被丢弃的数量
    pub discarded_technologies: u32,
    pub categories: u32,

    // ========== 模式数量统计 ==========
    pub valid_html_patterns: u32,
    pub valid_script_patterns: u32,
    pub valid_url_patterns: u32,
    pub valid_header_patterns: u32,
    pub valid_meta_patterns: u32,
    pub valid_cookie_patterns: u32,
    /// 无法解析或编译、被跳过的模式
    pub skipped_patterns: u32,
    /// 无法解析的 implies/excludes 条目
    pub skipped_relations: u32,

    // ========== 匹配类型统计 ==========
    pub contains_count: u32,
    pub starts_with_count: u32,
    pub exists_count: u32,
    pub regex_count: u32,

    // ========== 正则修复统计 ==========
    pub repaired_regex_count: u32,
    pub fixed_look_around_count: u32,
    pub fixed_invalid_escapes_count: u32,
    pub fixed_charset_hyphen_count: u32,
    pub fixed_unbalanced_groups_count: u32,
}

impl LoadStats {
    /// 记录一条有效模式
    pub fn record_valid_pattern(&mut self, kind: SignalKind, match_type: MatchType) {
        match kind {
            SignalKind::Html => self.valid_html_patterns += 1,
            SignalKind::Script => self.valid_script_patterns += 1,
            SignalKind::Url => self.valid_url_patterns += 1,
            SignalKind::Header => self.valid_header_patterns += 1,
            SignalKind::Meta => self.valid_meta_patterns += 1,
            SignalKind::Cookie => self.valid_cookie_patterns += 1,
        }
        match match_type {
            MatchType::Contains => self.contains_count += 1,
            MatchType::StartsWith => self.starts_with_count += 1,
            MatchType::Exists => self.exists_count += 1,
            MatchType::Regex => self.regex_count += 1,
        }
    }

    pub fn valid_patterns(&self) -> u32 {
        self.valid_html_patterns
            + self.valid_script_patterns
            + self.valid_url_patterns
            + self.valid_header_patterns
            + self.valid_meta_patterns
            + self.valid_cookie_patterns
    }

    /// 格式化输出统计信息（结构化日志）
    pub fn print_stats(&self, total_time: std::time::Duration) {
        log::info!(
            "Signatures loaded | Time: {:?} | Technologies: {} (kept {} / discarded {}) | Categories: {} | Patterns: {} (skipped {})",
            total_time,
            self.total_technologies,
            self.kept_technologies,
            self.discarded_technologies,
            self.categories,
            self.valid_patterns(),
            self.skipped_patterns
        );

        log::debug!(
            "Pattern stats: HTML {} | Script {} | URL {} | Header {} | Meta {} | Cookie {} | Skipped relations {}",
            self.valid_html_patterns,
            self.valid_script_patterns,
            self.valid_url_patterns,
            self.valid_header_patterns,
            self.valid_meta_patterns,
            self.valid_cookie_patterns,
            self.skipped_relations
        );

        log::debug!(
            "Match type stats: Contains {} | StartsWith {} | Exists {} | Regex {}",
            self.contains_count,
            self.starts_with_count,
            self.exists_count,
            self.regex_count
        );

        log::debug!(
            "Regex fix stats: Total {} (look-around {} | invalid escapes {} | charset hyphen {} | unbalanced groups {})",
            self.repaired_regex_count,
            self.fixed_look_around_count,
            self.fixed_invalid_escapes_count,
            self.fixed_charset_hyphen_count,
            self.fixed_unbalanced_groups_count
        );
    }
}
