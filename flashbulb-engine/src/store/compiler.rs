//! 签名编译：原始文档 → 不可变签名库
//! 单条模式/单个技术的错误只记录并跳过，不影响其他签名

use std::time::Instant;

use regex::RegexBuilder;
use regex_syntax::ast::{parse::ParserBuilder, Ast};
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::cleaner::{LoadStats, RegexFixer};
use crate::core::{
    Category, KeyedPatterns, Matcher, Pattern, Relation, SignalKind, TechnologySignature,
    VersionRule,
};
use crate::error::{CoreError, CoreResult};
use crate::source::{
    category_ids, parse_pattern_string, parse_relation, pattern_strings, RawCategory,
    RawTechnology, SignatureDocument,
};

use super::{LoadOptions, SignatureStore};

/// 签名编译器（一次加载使用一个实例）
pub(crate) struct SignatureCompiler<'a> {
    options: &'a LoadOptions,
    fixer: RegexFixer,
    stats: LoadStats,
}

impl<'a> SignatureCompiler<'a> {
    pub(crate) fn new(options: &'a LoadOptions) -> Self {
        Self {
            options,
            fixer: RegexFixer,
            stats: LoadStats::default(),
        }
    }

    pub(crate) fn compile(mut self, document: SignatureDocument) -> SignatureStore {
        let start = Instant::now();

        let mut categories = FxHashMap::default();
        for (id, value) in document.categories {
            match serde_json::from_value::<RawCategory>(value) {
                Ok(raw) => {
                    let category = Category {
                        name: raw.name.filter(|n| !n.trim().is_empty()).unwrap_or_else(|| id.clone()),
                        priority: raw.priority.unwrap_or(u32::MAX),
                        id: id.clone(),
                    };
                    categories.insert(id, category);
                }
                Err(e) => log::warn!("Skipping malformed category {}: {}", id, e),
            }
        }

        // serde_json::Map 默认按键排序，技术顺序与文档写法无关
        let mut technologies = Vec::with_capacity(document.technologies.len());
        for (id, value) in document.technologies {
            self.stats.total_technologies += 1;
            match serde_json::from_value::<RawTechnology>(value) {
                Ok(raw) => {
                    technologies.push(self.compile_technology(&id, raw));
                    self.stats.kept_technologies += 1;
                }
                Err(e) => {
                    self.stats.discarded_technologies += 1;
                    log::warn!("Skipping malformed technology {}: {}", id, e);
                }
            }
        }

        self.stats.categories = categories.len() as u32;
        self.stats.print_stats(start.elapsed());
        SignatureStore::from_parts(technologies, categories.into_values().collect())
            .with_stats(self.stats)
    }

    fn compile_technology(&mut self, id: &str, raw: RawTechnology) -> TechnologySignature {
        let mut signature = TechnologySignature::new(id);
        if let Some(name) = raw.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            signature.name = name.to_string();
        }
        signature.category_ids = category_ids(raw.categories.as_ref());

        let mut headers = Vec::new();
        let mut meta = Vec::new();
        let mut cookies = Vec::new();
        for block in raw.signal_blocks() {
            let patterns = &mut signature.patterns;
            if let Some(value) = &block.html {
                self.compile_list(id, SignalKind::Html, value, &mut patterns.html);
            }
            for value in block.script_values() {
                self.compile_list(id, SignalKind::Script, value, &mut patterns.script);
            }
            if let Some(value) = &block.url {
                self.compile_list(id, SignalKind::Url, value, &mut patterns.url);
            }
            for value in block.header_values() {
                self.compile_keyed(id, SignalKind::Header, value, &mut headers);
            }
            if let Some(value) = &block.meta {
                self.compile_keyed(id, SignalKind::Meta, value, &mut meta);
            }
            for value in block.cookie_values() {
                self.compile_keyed(id, SignalKind::Cookie, value, &mut cookies);
            }
        }
        signature.patterns.headers = headers;
        signature.patterns.meta = meta;
        signature.patterns.cookies = cookies;
        for groups in [
            &mut signature.patterns.headers,
            &mut signature.patterns.meta,
            &mut signature.patterns.cookies,
        ] {
            groups.sort_by(|a, b| a.key.cmp(&b.key));
        }

        signature.implies = self.compile_relations(id, "implies", raw.implies.as_ref());
        signature.excludes = self.compile_relations(id, "excludes", raw.excludes.as_ref());
        signature.website = raw.website;
        signature.icon = raw.icon;
        #[cfg(feature = "full-meta")]
        {
            signature.description = raw.description;
            signature.cpe = raw.cpe;
        }

        if signature.patterns.is_empty() && signature.implies.is_empty() {
            log::trace!("Technology {} carries no usable patterns", id);
        }
        signature
    }

    fn compile_list(&mut self, tech: &str, kind: SignalKind, value: &Value, out: &mut Vec<Pattern>) {
        for raw in self.collect_strings(tech, kind, value) {
            if let Some(pattern) = self.compile_or_skip(tech, kind, raw) {
                out.push(pattern);
            }
        }
    }

    fn compile_keyed(
        &mut self,
        tech: &str,
        kind: SignalKind,
        value: &Value,
        out: &mut Vec<KeyedPatterns>,
    ) {
        let Value::Object(map) = value else {
            self.stats.skipped_patterns += 1;
            log::warn!(
                "Skipping {} patterns of {}: expected an object keyed by name",
                kind,
                tech
            );
            return;
        };

        for (name, value) in map {
            let key = if kind.folds_key_case() {
                name.trim().to_ascii_lowercase()
            } else {
                name.trim().to_string()
            };
            if key.is_empty() {
                self.stats.skipped_patterns += 1;
                log::warn!("Skipping {} pattern of {} with an empty name", kind, tech);
                continue;
            }

            let mut patterns = Vec::new();
            for raw in self.collect_strings(tech, kind, value) {
                if let Some(pattern) = self.compile_or_skip(tech, kind, raw) {
                    patterns.push(pattern);
                }
            }
            if patterns.is_empty() {
                continue;
            }
            match out.iter_mut().find(|group| group.key == key) {
                Some(group) => group.patterns.extend(patterns),
                None => out.push(KeyedPatterns { key, patterns }),
            }
        }
    }

    fn collect_strings<'v>(&mut self, tech: &str, kind: SignalKind, value: &'v Value) -> Vec<&'v str> {
        match pattern_strings(value) {
            Ok((strings, ignored)) => {
                if ignored > 0 {
                    self.stats.skipped_patterns += ignored as u32;
                    log::warn!("Ignoring {} non-string {} patterns of {}", ignored, kind, tech);
                }
                strings
            }
            Err(reason) => {
                self.stats.skipped_patterns += 1;
                log::warn!("Skipping {} patterns of {}: {}", kind, tech, reason);
                Vec::new()
            }
        }
    }

    fn compile_or_skip(&mut self, tech: &str, kind: SignalKind, raw: &str) -> Option<Pattern> {
        match self.compile_pattern(tech, kind, raw) {
            Ok(pattern) => {
                self.stats
                    .record_valid_pattern(kind, pattern.matcher.match_type());
                Some(pattern)
            }
            Err(e) => {
                self.stats.skipped_patterns += 1;
                log::warn!("{}", e);
                None
            }
        }
    }

    /// 编译单条模式：选择匹配类型 → 修复正则 → 预编译
    pub(crate) fn compile_pattern(
        &mut self,
        tech: &str,
        kind: SignalKind,
        raw: &str,
    ) -> CoreResult<Pattern> {
        let spec = parse_pattern_string(raw)
            .map_err(|reason| CoreError::malformed(tech, kind.as_str(), raw, reason))?;
        let expression = spec.expression.trim();
        let explicit_version = spec.version.as_deref().map(VersionRule::parse);

        let build = |matcher: Matcher, version: Option<VersionRule>| {
            let pattern = Pattern::new(expression, matcher).with_confidence(spec.confidence);
            match version {
                Some(rule) => pattern.with_version(rule),
                None => pattern,
            }
        };

        if expression.is_empty() {
            if kind.is_keyed() {
                return Ok(build(Matcher::Exists, explicit_version));
            }
            return Err(CoreError::malformed(
                tech,
                kind.as_str(),
                raw,
                "empty expression",
            ));
        }

        if !self.options.case_insensitive {
            if let Some(literal) = literal_text(expression) {
                return Ok(build(Matcher::Contains(literal), explicit_version));
            }
            if let Some(literal) = expression.strip_prefix('^').and_then(literal_text) {
                return Ok(build(Matcher::StartsWith(literal), explicit_version));
            }
        }

        let repaired = self.fixer.repair(expression, &mut self.stats);
        let regex = RegexBuilder::new(&repaired)
            .case_insensitive(self.options.case_insensitive)
            .size_limit(self.options.regex_size_limit)
            .build()
            .map_err(|e| CoreError::malformed(tech, kind.as_str(), raw, e.to_string()))?;

        let version = explicit_version
            .or_else(|| (regex.captures_len() > 1).then(VersionRule::first_group));
        Ok(build(Matcher::Regex(regex), version))
    }

    fn compile_relations(&mut self, tech: &str, field: &str, value: Option<&Value>) -> Vec<Relation> {
        let Some(value) = value else {
            return Vec::new();
        };
        let strings = match pattern_strings(value) {
            Ok((strings, 0)) => strings,
            Ok((strings, ignored)) => {
                self.stats.skipped_relations += ignored as u32;
                log::warn!("Ignoring {} non-string {} entries of {}", ignored, field, tech);
                strings
            }
            Err(reason) => {
                self.stats.skipped_relations += 1;
                log::warn!("Skipping {} of {}: {}", field, tech, reason);
                return Vec::new();
            }
        };

        let mut relations: Vec<Relation> = Vec::with_capacity(strings.len());
        for raw in strings {
            match parse_relation(raw) {
                Ok(relation) if relation.target == tech => {
                    log::debug!("Ignoring self-referencing {} entry of {}", field, tech);
                }
                Ok(relation) => {
                    if !relations.iter().any(|r| r.target == relation.target) {
                        relations.push(relation);
                    }
                }
                Err(reason) => {
                    self.stats.skipped_relations += 1;
                    log::warn!("Skipping {} entry `{}` of {}: {}", field, raw, tech, reason);
                }
            }
        }
        relations
    }
}

/// 表达式为纯字面量时返回其文本（通过 regex-syntax AST 判定）
fn literal_text(expression: &str) -> Option<String> {
    let ast = ParserBuilder::new().build().parse(expression).ok()?;
    let literal: String = match &ast {
        Ast::Literal(lit) => lit.c.to_string(),
        Ast::Concat(concat) => concat
            .asts
            .iter()
            .map(|node| match node {
                Ast::Literal(lit) => Some(lit.c),
                _ => None,
            })
            .collect::<Option<String>>()?,
        _ => return None,
    };
    (!literal.is_empty()).then_some(literal)
}
