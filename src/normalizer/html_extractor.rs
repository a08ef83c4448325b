//! HTML 标签提取器
//! 负责从 HTML 中提取 <script src> 和 <meta> 标签
use flashbulb_engine::preview::preview_compact;
use lol_html::{element, HtmlRewriter, Settings};

const MAX_SCRIPT_SRC_LEN: usize = 2048;
const MAX_META_CONTENT_LEN: usize = 4096;

/// 提取结果结构体
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractResult {
    /// 文档顺序的 script src（未解析为绝对地址）
    pub script_srcs: Vec<String>,
    /// (小写 name, content)
    pub meta_tags: Vec<(String, String)>,
}

fn push_script_src(script_srcs: &mut Vec<String>, src: &str) {
    let src = src.trim();
    if src.is_empty() || src.len() > MAX_SCRIPT_SRC_LEN || src.contains(['<', '>', '\n', '\r']) {
        return;
    }
    script_srcs.push(src.to_owned());
}

fn push_meta_tag(meta_tags: &mut Vec<(String, String)>, name: &str, content: String) {
    let name = name.trim();
    if !name.is_empty() && content.len() <= MAX_META_CONTENT_LEN {
        meta_tags.push((name.to_ascii_lowercase(), content));
    }
}

/// 流式 HTML 提取器，只读不改写
#[derive(Debug, Default)]
pub struct HtmlExtractor;

impl HtmlExtractor {
    pub fn extract(html: &str) -> ExtractResult {
        let mut result = ExtractResult::default();
        Self::scan(html, &mut result.script_srcs, &mut result.meta_tags);
        result
    }

    fn scan(html: &str, script_srcs: &mut Vec<String>, meta_tags: &mut Vec<(String, String)>) {
        let settings = Settings {
            strict: false, // 兼容畸形HTML/大小写标签/残缺标签
            element_content_handlers: vec![
                element!("script[src]", |el| {
                    if let Some(src) = el.get_attribute("src") {
                        push_script_src(script_srcs, &src);
                    }
                    Ok(())
                }),
                element!("meta", |el| {
                    let name = el.get_attribute("name").or_else(|| el.get_attribute("property"));
                    if let (Some(n), Some(c)) = (name, el.get_attribute("content")) {
                        push_meta_tag(meta_tags, &n, c);
                    }
                    Ok(())
                }),
            ],
            ..Settings::default()
        };

        let mut rewriter = HtmlRewriter::new(settings, |_: &[u8]| {});
        let outcome = rewriter.write(html.as_bytes()).and_then(|_| rewriter.end());
        if let Err(e) = outcome {
            log::warn!(
                "HTML extraction stopped early | Reason: {} | Html: {}",
                e,
                preview_compact(html, 80)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_extractor() {
        let html = r#"
            <!DOCTYPE html>
            <html>
            <head>
                <script src="/jquery.min.js"></script>
                <meta name="author" content="test_user">
                <META NAME="Generator" content="WordPress 6.0" />
                <script src="/vue.global.js"></script>
                <script>console.log('inline')</script>
                <meta property="og:site_name" content="Demo">
                <meta charset="utf-8">
            </head>
            </html>
        "#;

        let result = HtmlExtractor::extract(html);
        assert_eq!(result.script_srcs, vec!["/jquery.min.js", "/vue.global.js"]);
        assert_eq!(
            result.meta_tags,
            vec![
                ("author".to_string(), "test_user".to_string()),
                ("generator".to_string(), "WordPress 6.0".to_string()),
                ("og:site_name".to_string(), "Demo".to_string()),
            ]
        );
    }

    #[test]
    fn test_malformed_html_is_tolerated() {
        let result = HtmlExtractor::extract("<div><script src='/a.js'><p>unclosed");
        assert_eq!(result.script_srcs, vec!["/a.js"]);
    }

    #[test]
    fn test_empty_html() {
        assert_eq!(HtmlExtractor::extract(""), ExtractResult::default());
    }
}
