use std::fmt::{self, Write};

/// 日志预览：连续空白折叠为单个空格，超过上限时截断并追加省略号
/// 只在格式化时遍历原串，不产生中间 String
#[inline]
pub fn preview_compact(s: &str, max_len: usize) -> impl fmt::Display + '_ {
    CompactView {
        source: s,
        max_len,
    }
}

struct CompactView<'a> {
    source: &'a str,
    max_len: usize,
}

impl fmt::Display for CompactView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut written = 0;
        let mut last_was_whitespace = false;

        for ch in self.source.trim().chars() {
            if written >= self.max_len {
                return f.write_char('…');
            }
            if ch.is_whitespace() {
                if last_was_whitespace {
                    continue;
                }
                f.write_char(' ')?;
                last_was_whitespace = true;
            } else {
                f.write_char(ch)?;
                last_was_whitespace = false;
            }
            written += 1;
        }
        Ok(())
    }
}
