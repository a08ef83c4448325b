//! flashbulb - 页面技术指纹识别：信号规范化、签名匹配、页面报告

pub mod analyzer;
pub mod config;
pub mod error;
pub mod loader;
pub mod normalizer;
pub mod report;
#[cfg(feature = "async-io")]
pub mod dispatch;
#[cfg(feature = "async-io")]
pub mod sink;

// 导出全局错误类型
pub use self::error::{FlashResult, FlashbulbError};

// 导出配置模块核心结构体与构建器
pub use crate::config::{AnalyzerConfig, AnalyzerConfigBuilder, RetryPolicy, SignatureOrigin};

pub use crate::analyzer::TechAnalyzer;
pub use crate::loader::SignatureLoader;
pub use crate::normalizer::{HeaderConverter, HtmlExtractor, RawObservation, SignalNormalizer};
pub use crate::report::{combine_reports, normalize_prefix, safe_url, ObjectKeys, PageReport};
#[cfg(feature = "async-io")]
pub use crate::dispatch::{DispatchOutcome, Dispatcher, HandoffMode};
#[cfg(feature = "async-io")]
pub use crate::sink::{LocalDirSink, ReportSink};

// 核心库常用类型
pub use flashbulb_engine::{
    Detection, LoadOptions, LoadStats, Resolution, SignalBundle, SignalKind, SignatureStore,
};

/// 将 `log` 记录转发到 `tracing`（仅在宿主程序使用 tracing 订阅器时需要）
#[cfg(feature = "tracing")]
pub fn init_log_tracer() -> FlashResult<()> {
    tracing_log::LogTracer::init()
        .map_err(|e| FlashbulbError::InvalidInput(format!("log tracer already set: {}", e)))?;
    tracing::debug!("log records are now forwarded to tracing");
    Ok(())
}
