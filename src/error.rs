//! 全局错误类型定义
use flashbulb_engine::CoreError;
use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;
use thiserror::Error;
use url::ParseError as UrlParseError;

#[derive(Error, Debug)]
pub enum FlashbulbError {
    // 签名库相关错误
    #[error("签名库加载失败：{0}")]
    SignatureLoadError(String),
    #[error("签名库解析失败：{0}")]
    Core(#[from] CoreError),

    // 网络相关错误
    #[cfg(feature = "remote-loader")]
    #[error("远程签名库拉取失败：{0}")]
    RemoteError(#[from] reqwest::Error),
    #[error("Header 字段转字符串失败：{0}")]
    HeaderToStrError(#[from] http::header::ToStrError),

    // 持久化相关错误
    #[error("报告写入失败：{0}")]
    SinkError(String),

    // 序列化/反序列化错误
    #[error("JSON解析失败：{0}")]
    JsonError(#[from] SerdeJsonError),

    // 基础错误
    #[error("IO操作失败：{0}")]
    IoError(#[from] IoError),
    #[error("URL解析失败：{0}")]
    UrlError(#[from] UrlParseError),
    #[error("无效输入：{0}")]
    InvalidInput(String),

    #[error("异步任务执行失败：{0}")]
    AsyncTaskError(String),
}

// 全局Result类型
pub type FlashResult<T> = Result<T, FlashbulbError>;
