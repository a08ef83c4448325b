//! Signature loader module
//! 签名库加载：本地文件 / 内存文本 / 远程地址 → 不可变 SignatureStore
//! 核心库不做任何 I/O，文件与网络读取只在这里发生

use crate::config::SignatureOrigin;
#[cfg(feature = "remote-loader")]
use crate::config::RetryPolicy;
use crate::error::{FlashResult, FlashbulbError};
use flashbulb_engine::{LoadOptions, SignatureStore};
#[cfg(feature = "remote-loader")]
use reqwest::Client;
use std::time::Instant;

/// 签名库加载器（无状态）
#[derive(Debug, Default, Clone, Copy)]
pub struct SignatureLoader;

impl SignatureLoader {
    pub fn new() -> Self {
        Self
    }

    /// 同步加载（本地文件 / 内存文本）
    /// 远程来源需要异步运行时，同步路径直接报错
    pub fn load_sync(
        &self,
        origin: &SignatureOrigin,
        options: &LoadOptions,
    ) -> FlashResult<SignatureStore> {
        let start = Instant::now();
        let store = match origin {
            SignatureOrigin::LocalFile(path) => {
                let bytes = std::fs::read(path).map_err(|e| {
                    FlashbulbError::SignatureLoadError(format!(
                        "读取本地签名文件[{}]失败: {}",
                        path.display(),
                        e
                    ))
                })?;
                SignatureStore::from_slice(&bytes, options)?
            }
            SignatureOrigin::Inline(content) => SignatureStore::from_json_str(content, options)?,
            SignatureOrigin::Remote { url, .. } => {
                return Err(FlashbulbError::SignatureLoadError(format!(
                    "远程签名库[{}]只能通过异步接口加载",
                    url
                )))
            }
        };
        log_loaded(origin, &store, start);
        Ok(store)
    }

    /// 异步加载（本地文件走 tokio::fs，远程走 reqwest）
    #[cfg(feature = "async-io")]
    pub async fn load(
        &self,
        origin: &SignatureOrigin,
        options: &LoadOptions,
    ) -> FlashResult<SignatureStore> {
        let start = Instant::now();
        let store = match origin {
            SignatureOrigin::LocalFile(path) => {
                let bytes = tokio::fs::read(path).await.map_err(|e| {
                    FlashbulbError::SignatureLoadError(format!(
                        "读取本地签名文件[{}]失败: {}",
                        path.display(),
                        e
                    ))
                })?;
                SignatureStore::from_slice(&bytes, options)?
            }
            SignatureOrigin::Inline(content) => SignatureStore::from_json_str(content, options)?,
            SignatureOrigin::Remote {
                url,
                timeout,
                retry,
            } => self.load_remote(url, *timeout, *retry, options).await?,
        };
        log_loaded(origin, &store, start);
        Ok(store)
    }

    #[cfg(all(feature = "async-io", feature = "remote-loader"))]
    async fn load_remote(
        &self,
        url: &str,
        timeout: std::time::Duration,
        retry: RetryPolicy,
        options: &LoadOptions,
    ) -> FlashResult<SignatureStore> {
        let client = Client::builder().timeout(timeout).build()?;
        let bytes = fetch_with_retry(&client, url, retry.max_retries()).await?;
        Ok(SignatureStore::from_slice(&bytes, options)?)
    }

    #[cfg(all(feature = "async-io", not(feature = "remote-loader")))]
    async fn load_remote(
        &self,
        url: &str,
        _timeout: std::time::Duration,
        _retry: crate::config::RetryPolicy,
        _options: &LoadOptions,
    ) -> FlashResult<SignatureStore> {
        Err(FlashbulbError::SignatureLoadError(format!(
            "remote-loader feature is not enabled, cannot fetch {}",
            url
        )))
    }
}

/// 拉取远程签名文档，失败后按固定 1 秒间隔重试
#[cfg(feature = "remote-loader")]
async fn fetch_with_retry(client: &Client, url: &str, max_retries: usize) -> FlashResult<Vec<u8>> {
    let mut last_err: Option<FlashbulbError> = None;

    for attempt in 0..=max_retries {
        match fetch_once(client, url).await {
            Ok(bytes) => {
                log::debug!("Fetched remote signatures | Url: {} | Bytes: {}", url, bytes.len());
                return Ok(bytes);
            }
            Err(e) => {
                last_err = Some(e);
                if attempt < max_retries {
                    log::warn!(
                        "Request failed, retrying (attempt {}/{})",
                        attempt + 1,
                        max_retries
                    );
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                }
            }
        }
    }

    Err(last_err.unwrap_or_else(|| {
        FlashbulbError::SignatureLoadError("All retry attempts exhausted".to_string())
    }))
}

#[cfg(feature = "remote-loader")]
async fn fetch_once(client: &Client, url: &str) -> FlashResult<Vec<u8>> {
    let response = client
        .get(url)
        .header("User-Agent", concat!("flashbulb/", env!("CARGO_PKG_VERSION")))
        .header("Accept-Encoding", "gzip, deflate")
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(FlashbulbError::SignatureLoadError(format!(
            "Failed to fetch signatures: URL {} returned status code {}",
            url,
            response.status()
        )));
    }

    Ok(response.bytes().await?.to_vec())
}

fn log_loaded(origin: &SignatureOrigin, store: &SignatureStore, start: Instant) {
    let source = match origin {
        SignatureOrigin::LocalFile(path) => path.display().to_string(),
        SignatureOrigin::Inline(_) => "<inline>".to_string(),
        SignatureOrigin::Remote { url, .. } => url.clone(),
    };
    log::info!(
        "Signature store ready | Source: {} | Technologies: {} | Time: {}ms",
        source,
        store.len(),
        start.elapsed().as_millis()
    );
}
