//! flashbulb-engine 内核错误定义
//! 封装签名加载、模式编译相关的全部内核错误，与业务层错误解耦
use thiserror::Error;

use regex::Error as RegexError;

/// 内核核心错误枚举
#[derive(Error, Debug)]
pub enum CoreError {
    // ===================== 文档相关错误 =====================
    /// 签名文档整体结构无效（缺少根节点、根节点类型错误等），整个文档被拒绝
    #[error("Invalid signature document: {0}")]
    InvalidDocument(String),

    /// 单条签名模式无效（修复后仍无法编译、置信度非数字等）
    /// 加载阶段只记录并跳过，不会中断整个文档
    #[error("Malformed signature pattern for {technology} ({kind}): {pattern} | {reason}")]
    MalformedSignature {
        technology: String,
        kind: String,
        pattern: String,
        reason: String,
    },

    /// JSON 反序列化失败
    #[error("Signature JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),

    // ===================== 编译相关错误 =====================
    /// 正则表达式编译失败
    #[error("Regex compilation failed: {0}")]
    RegexCompile(#[from] RegexError),
}

impl CoreError {
    /// 构造单条模式错误
    pub fn malformed(
        technology: impl Into<String>,
        kind: impl Into<String>,
        pattern: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CoreError::MalformedSignature {
            technology: technology.into(),
            kind: kind.into(),
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }
}

/// 内核层全局Result类型别名
pub type CoreResult<T> = Result<T, CoreError>;
