//! Tech analyzer core module
//! 技术分析器：签名库只加载一次，之后规范化 → 匹配 → 归并全程只读，可跨线程共享

use crate::config::AnalyzerConfig;
use crate::error::FlashResult;
use crate::loader::SignatureLoader;
use crate::normalizer::{RawObservation, SignalNormalizer};
use crate::report::PageReport;
use flashbulb_engine::{Resolution, SignalBundle, SignalMatcher, Resolver, SignatureStore};
use std::sync::Arc;
use std::time::Instant;

/// 技术分析器
#[derive(Debug, Clone)]
pub struct TechAnalyzer {
    /// 不可变签名库（Arc 共享，避免重复编译）
    store: Arc<SignatureStore>,
    normalizer: SignalNormalizer,
    config: AnalyzerConfig,
}

impl TechAnalyzer {
    /// 使用已加载的签名库创建分析器（测试夹具 / 自定义来源）
    pub fn with_store(store: Arc<SignatureStore>, config: AnalyzerConfig) -> Self {
        Self {
            store,
            normalizer: SignalNormalizer::new(config.extract_from_html),
            config,
        }
    }

    /// 同步加载签名库（本地文件 / 内存文本）
    pub fn new_sync(config: AnalyzerConfig) -> FlashResult<Self> {
        let store = SignatureLoader::new().load_sync(&config.signature_origin, &config.load_options)?;
        Ok(Self::with_store(Arc::new(store), config))
    }

    /// 异步加载签名库（支持远程来源）
    #[cfg(feature = "async-io")]
    pub async fn new(config: AnalyzerConfig) -> FlashResult<Self> {
        let store = SignatureLoader::new()
            .load(&config.signature_origin, &config.load_options)
            .await?;
        Ok(Self::with_store(Arc::new(store), config))
    }

    pub fn store(&self) -> &Arc<SignatureStore> {
        &self.store
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// 规范化后的信号 → 最终技术列表
    pub fn analyze_bundle(&self, bundle: &SignalBundle) -> Vec<Resolution> {
        let start = Instant::now();
        let detections = SignalMatcher::new(&self.store).run(bundle);
        let resolutions = Resolver::new(&self.store).resolve(&detections);
        log::debug!(
            "Analysis finished | Url: {} | Detections: {} | Technologies: {} | Time: {}µs",
            bundle.url,
            detections.len(),
            resolutions.len(),
            start.elapsed().as_micros()
        );
        resolutions
    }

    /// 原始观测 → 最终技术列表
    pub fn analyze(&self, obs: &RawObservation) -> Vec<Resolution> {
        let bundle = self.normalizer.normalize(obs);
        self.analyze_bundle(&bundle)
    }

    /// 原始观测 → 页面报告
    pub fn report(&self, obs: &RawObservation) -> PageReport {
        let technologies = self.analyze(obs);
        PageReport::new(obs, &self.config.prefix, technologies)
    }
}
