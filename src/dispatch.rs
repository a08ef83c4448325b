//! Analysis dispatch module
//! 按观测数据大小选择交接方式：小载荷异步投递（即发即忘），大载荷同步执行
use crate::analyzer::TechAnalyzer;
use crate::error::FlashResult;
use crate::normalizer::RawObservation;
use crate::report::{ObjectKeys, PageReport};
use crate::sink::ReportSink;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// 交接方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffMode {
    Synchronous,
    Asynchronous,
}

impl HandoffMode {
    /// 载荷不超过上限 → 异步；超过 → 同步
    pub fn select(payload_len: usize, limit: usize) -> Self {
        if payload_len <= limit {
            HandoffMode::Asynchronous
        } else {
            HandoffMode::Synchronous
        }
    }
}

/// 交接结果
#[derive(Debug)]
pub enum DispatchOutcome {
    /// 同步执行完毕
    Completed(PageReport),
    /// 已投递到后台任务，不保证送达
    Queued(JoinHandle<()>),
}

/// 分析调度器
#[derive(Clone)]
pub struct Dispatcher {
    analyzer: TechAnalyzer,
    sink: Arc<dyn ReportSink>,
}

impl Dispatcher {
    pub fn new(analyzer: TechAnalyzer, sink: Arc<dyn ReportSink>) -> Self {
        Self { analyzer, sink }
    }

    pub fn mode_for(&self, obs: &RawObservation) -> HandoffMode {
        HandoffMode::select(obs.payload_len(), self.analyzer.config().async_payload_limit)
    }

    /// 需在 tokio 运行时内调用
    pub async fn dispatch(&self, obs: RawObservation) -> FlashResult<DispatchOutcome> {
        match self.mode_for(&obs) {
            HandoffMode::Synchronous => {
                log::debug!("Dispatching synchronously | Url: {}", obs.start_url_or_final());
                Ok(DispatchOutcome::Completed(self.run(&obs).await?))
            }
            HandoffMode::Asynchronous => {
                log::debug!("Dispatching asynchronously | Url: {}", obs.start_url_or_final());
                let this = self.clone();
                let handle = tokio::spawn(async move {
                    if let Err(e) = this.run(&obs).await {
                        log::warn!(
                            "Background analysis failed | Url: {} | Reason: {}",
                            obs.start_url_or_final(),
                            e
                        );
                    }
                });
                Ok(DispatchOutcome::Queued(handle))
            }
        }
    }

    /// 分析并持久化；存储失败时写入错误记录后返回错误
    pub async fn run(&self, obs: &RawObservation) -> FlashResult<PageReport> {
        let keys = ObjectKeys::new(&self.analyzer.config().prefix, obs.start_url_or_final());
        let report = self.analyzer.report(obs);
        match self.sink.store_report(&keys, &report).await {
            Ok(_) => Ok(report),
            Err(e) => {
                self.sink.store_error(&keys, &e.to_string()).await;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnalyzerConfigBuilder, SignatureOrigin};
    use crate::error::FlashbulbError;
    use crate::sink::LocalDirSink;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const DOC: &str = r#"{ "apps": { "nginx": { "headers": { "Server": "nginx(?:/([\\d.]+))?" } } } }"#;

    fn analyzer(limit: usize) -> TechAnalyzer {
        let config = AnalyzerConfigBuilder::new()
            .origin(SignatureOrigin::Inline(DOC.into()))
            .async_payload_limit(limit)
            .build();
        TechAnalyzer::new_sync(config).unwrap()
    }

    fn observation() -> RawObservation {
        RawObservation::from(serde_json::json!({
            "url": "https://example.com",
            "headers": { "Server": "nginx/1.25.3" }
        }))
    }

    /// 总是写入失败的存储，记录错误写入
    #[derive(Default)]
    struct FailingSink {
        errors: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ReportSink for FailingSink {
        async fn store_report(&self, _keys: &ObjectKeys, _report: &PageReport) -> FlashResult<String> {
            Err(FlashbulbError::SinkError("bucket unavailable".into()))
        }

        async fn store_error(&self, keys: &ObjectKeys, message: &str) {
            self.errors
                .lock()
                .unwrap()
                .push(format!("{}: {}", keys.error, message));
        }
    }

    #[test]
    fn test_mode_selection() {
        assert_eq!(HandoffMode::select(100, 256), HandoffMode::Asynchronous);
        assert_eq!(HandoffMode::select(256, 256), HandoffMode::Asynchronous);
        assert_eq!(HandoffMode::select(257, 256), HandoffMode::Synchronous);
    }

    #[tokio::test]
    async fn test_large_payload_runs_inline() {
        let root = std::env::temp_dir().join(format!("flashbulb-dispatch-sync-{}", std::process::id()));
        let dispatcher = Dispatcher::new(analyzer(8), Arc::new(LocalDirSink::new(&root)));

        match dispatcher.dispatch(observation()).await.unwrap() {
            DispatchOutcome::Completed(report) => {
                assert_eq!(report.technologies[0].name, "nginx");
                assert_eq!(report.technologies[0].version.as_deref(), Some("1.25.3"));
            }
            DispatchOutcome::Queued(_) => panic!("expected synchronous handoff"),
        }
        assert!(root.join("https-example.com.json").exists());
        let _ = tokio::fs::remove_dir_all(root).await;
    }

    #[tokio::test]
    async fn test_small_payload_is_queued() {
        let root = std::env::temp_dir().join(format!("flashbulb-dispatch-async-{}", std::process::id()));
        let dispatcher = Dispatcher::new(analyzer(1 << 20), Arc::new(LocalDirSink::new(&root)));

        match dispatcher.dispatch(observation()).await.unwrap() {
            DispatchOutcome::Queued(handle) => handle.await.unwrap(),
            DispatchOutcome::Completed(_) => panic!("expected asynchronous handoff"),
        }
        assert!(root.join("https-example.com.json").exists());
        let _ = tokio::fs::remove_dir_all(root).await;
    }

    #[tokio::test]
    async fn test_sink_failure_writes_error_artifact() {
        let sink = Arc::new(FailingSink::default());
        let dispatcher = Dispatcher::new(analyzer(8), sink.clone());

        assert!(dispatcher.run(&observation()).await.is_err());
        let errors = sink.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("errors/https-example.com.txt"));
    }
}
