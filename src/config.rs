//! 全局分析配置管理
use flashbulb_engine::LoadOptions;
use std::path::PathBuf;
use std::time::Duration;

/// 异步交接的默认载荷上限（256 KiB）
pub const DEFAULT_ASYNC_PAYLOAD_LIMIT: usize = 256 * 1024;

/// 签名库来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureOrigin {
    LocalFile(PathBuf), // 本地签名文件
    Inline(String),     // 内存中的 JSON 文本
    Remote {
        url: String,
        timeout: Duration,
        retry: RetryPolicy,
    }, // 远程签名库（需开启 remote-loader）
}

impl Default for SignatureOrigin {
    fn default() -> Self {
        SignatureOrigin::LocalFile(PathBuf::from("data/apps.json"))
    }
}

/// 重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    Never,     // 不重试
    Times(u8), // 固定次数重试（不含第一次）
}

impl RetryPolicy {
    pub fn max_retries(&self) -> usize {
        match self {
            RetryPolicy::Never => 0,
            RetryPolicy::Times(n) => *n as usize,
        }
    }
}

/// 完整分析配置
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub signature_origin: SignatureOrigin,
    pub load_options: LoadOptions,
    /// 是否从 HTML 中补充提取 meta / script src
    pub extract_from_html: bool,
    /// 本地报告输出目录
    pub output_dir: PathBuf,
    /// 对象键前缀（已规范化）
    pub prefix: String,
    /// 序列化后的观测数据不超过该大小时走异步交接
    pub async_payload_limit: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            signature_origin: SignatureOrigin::default(),
            load_options: LoadOptions::default(),
            extract_from_html: true,
            output_dir: PathBuf::from("flashbulb-output"),
            prefix: String::new(),
            async_payload_limit: DEFAULT_ASYNC_PAYLOAD_LIMIT,
        }
    }
}

impl AnalyzerConfig {
    /// 本地签名文件
    pub fn local_file(path: impl Into<PathBuf>) -> Self {
        AnalyzerConfigBuilder::new()
            .origin(SignatureOrigin::LocalFile(path.into()))
            .build()
    }

    /// 内存中的签名文档
    pub fn inline(document: impl Into<String>) -> Self {
        AnalyzerConfigBuilder::new()
            .origin(SignatureOrigin::Inline(document.into()))
            .build()
    }

    /// 远程签名库
    pub fn remote(url: impl Into<String>, timeout: Duration, retry: RetryPolicy) -> Self {
        AnalyzerConfigBuilder::new()
            .origin(SignatureOrigin::Remote {
                url: url.into(),
                timeout,
                retry,
            })
            .build()
    }
}

/// 自定义构建器（链式 API）
#[derive(Debug, Clone, Default)]
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn origin(mut self, origin: SignatureOrigin) -> Self {
        self.config.signature_origin = origin;
        self
    }

    pub fn load_options(mut self, options: LoadOptions) -> Self {
        self.config.load_options = options;
        self
    }

    pub fn case_insensitive(mut self, enabled: bool) -> Self {
        self.config.load_options.case_insensitive = enabled;
        self
    }

    pub fn extract_from_html(mut self, enabled: bool) -> Self {
        self.config.extract_from_html = enabled;
        self
    }

    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_dir = path.into();
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.prefix = prefix.into();
        self
    }

    pub fn async_payload_limit(mut self, limit: usize) -> Self {
        self.config.async_payload_limit = limit;
        self
    }

    /// 构建时统一规范化前缀
    pub fn build(mut self) -> AnalyzerConfig {
        self.config.prefix = crate::report::normalize_prefix(&self.config.prefix);
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalyzerConfig::default();
        assert!(config.extract_from_html);
        assert_eq!(config.async_payload_limit, 256 * 1024);
        assert!(!config.load_options.case_insensitive);
        assert!(config.prefix.is_empty());
    }

    #[test]
    fn test_builder_normalizes_prefix() {
        let config = AnalyzerConfigBuilder::new()
            .origin(SignatureOrigin::Inline("{}".into()))
            .prefix("/scans/2024")
            .case_insensitive(true)
            .extract_from_html(false)
            .build();
        assert_eq!(config.prefix, "scans/2024/");
        assert!(config.load_options.case_insensitive);
        assert!(!config.extract_from_html);
        assert_eq!(config.signature_origin, SignatureOrigin::Inline("{}".into()));
    }

    #[test]
    fn test_retry_policy() {
        assert_eq!(RetryPolicy::Never.max_retries(), 0);
        assert_eq!(RetryPolicy::Times(3).max_retries(), 3);
    }
}
