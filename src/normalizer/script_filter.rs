//! JavaScript 资源过滤：按扩展名或 Content-Type 判断
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static JS_PATH_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.[mc]?js$").expect("static regex is valid"));

/// 地址路径以 .js / .mjs / .cjs 结尾（忽略查询串与片段）
pub fn has_js_extension(src: &str) -> bool {
    let path = match Url::parse(src) {
        Ok(url) => url.path().to_string(),
        // 相对地址：手动去掉查询串与片段
        Err(_) => src.split(['?', '#']).next().unwrap_or_default().to_string(),
    };
    JS_PATH_REGEX.is_match(&path)
}

pub fn is_js_content_type(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.contains("javascript") || content_type.contains("ecmascript")
}

/// 任一条件满足即视为脚本资源
pub fn is_javascript(src: &str, content_type: Option<&str>) -> bool {
    has_js_extension(src) || content_type.is_some_and(is_js_content_type)
}

/// 以页面地址为基准解析相对地址；无法解析时原样返回
pub fn resolve_src(base: Option<&Url>, src: &str) -> String {
    match base.map(|b| b.join(src)) {
        Some(Ok(resolved)) => resolved.to_string(),
        _ => src.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_filter() {
        assert!(has_js_extension("https://cdn.test/jquery-3.6.0.min.js"));
        assert!(has_js_extension("https://cdn.test/app.mjs?v=3#x"));
        assert!(has_js_extension("/static/bundle.CJS"));
        assert!(has_js_extension("vendor.js?ver=6.4.2"));
        assert!(!has_js_extension("https://cdn.test/style.css"));
        assert!(!has_js_extension("https://cdn.test/json"));
        assert!(!has_js_extension("https://cdn.test/page?file=a.js"));
    }

    #[test]
    fn test_content_type_filter() {
        assert!(is_javascript("https://api.test/loader", Some("application/javascript; charset=utf-8")));
        assert!(is_javascript("https://api.test/loader", Some("text/ECMAScript")));
        assert!(!is_javascript("https://api.test/loader", Some("text/html")));
        assert!(!is_javascript("https://api.test/loader", None));
    }

    #[test]
    fn test_resolve_src() {
        let base = Url::parse("https://example.com/blog/post").ok();
        assert_eq!(resolve_src(base.as_ref(), "/a.js"), "https://example.com/a.js");
        assert_eq!(resolve_src(base.as_ref(), "b.js"), "https://example.com/blog/b.js");
        assert_eq!(
            resolve_src(base.as_ref(), "//cdn.test/c.js"),
            "https://cdn.test/c.js"
        );
        assert_eq!(resolve_src(None, "/a.js"), "/a.js");
    }
}
