//! Report sink module
//! 报告持久化：对象存储的本地目录替身，键名规则见 report::ObjectKeys
use crate::config::AnalyzerConfig;
use crate::error::{FlashResult, FlashbulbError};
use crate::report::{ObjectKeys, PageReport};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// 报告存储接口
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// 写入报告，返回对象键
    async fn store_report(&self, keys: &ObjectKeys, report: &PageReport) -> FlashResult<String>;

    /// 写入错误记录；尽力而为，失败只记日志
    async fn store_error(&self, keys: &ObjectKeys, message: &str);
}

/// 写入本地目录：`<output_dir>/<object key>`
#[derive(Debug, Clone)]
pub struct LocalDirSink {
    root: PathBuf,
}

impl LocalDirSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 输出目录取自分析配置
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self::new(config.output_dir.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    async fn write(&self, key: &str, body: &[u8]) -> FlashResult<PathBuf> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, body).await?;
        Ok(path)
    }
}

#[async_trait]
impl ReportSink for LocalDirSink {
    async fn store_report(&self, keys: &ObjectKeys, report: &PageReport) -> FlashResult<String> {
        let body = serde_json::to_vec(report)?;
        let path = self.write(&keys.report, &body).await.map_err(|e| {
            FlashbulbError::SinkError(format!("写入报告[{}]失败: {}", keys.report, e))
        })?;
        log::info!(
            "Report stored | Key: {} | Path: {} | Technologies: {}",
            keys.report,
            path.display(),
            report.technologies.len()
        );
        Ok(keys.report.clone())
    }

    async fn store_error(&self, keys: &ObjectKeys, message: &str) {
        if let Err(e) = self.write(&keys.error, message.as_bytes()).await {
            log::warn!("Failed to store error artifact | Key: {} | Reason: {}", keys.error, e);
        }
    }
}
