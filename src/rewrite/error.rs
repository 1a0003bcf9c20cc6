//! 改写模块统一错误处理
//!
//! 提供结构化错误类型。调用改写服务时出现的传输、协议、契约三类错误在调用器边界
//! 被折叠成同一个“批次失败”信号，分类只用于日志。

use std::fmt;

use thiserror::Error;

use crate::env::EnvError;

/// 改写错误类型
#[derive(Error, Debug, Clone)]
pub enum RewriteError {
    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 网络传输错误
    #[error("网络错误: {0}")]
    TransportError(String),

    /// 超时错误
    #[error("请求超时: {0}")]
    TimeoutError(String),

    /// 协议错误（非 2xx 状态码、响应体无法解析）
    #[error("协议错误: {0}")]
    ProtocolError(String),

    /// 契约错误：返回的片段数与请求不一致
    #[error("片段数不一致: 期望 {expected}，实际 {actual}")]
    ContractError { expected: usize, actual: usize },

    /// 解析错误
    #[error("解析错误: {0}")]
    ParseError(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    SerializationError(String),

    /// IO 错误
    #[error("IO错误: {0}")]
    IoError(String),
}

impl RewriteError {
    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            RewriteError::TransportError(_) | RewriteError::TimeoutError(_) => {
                ErrorCategory::Transport
            }
            RewriteError::ProtocolError(_) => ErrorCategory::Protocol,
            RewriteError::ContractError { .. } => ErrorCategory::Contract,
            RewriteError::ConfigError(_) => ErrorCategory::Configuration,
            RewriteError::ParseError(_) | RewriteError::SerializationError(_) => {
                ErrorCategory::Input
            }
            RewriteError::IoError(_) => ErrorCategory::Internal,
        }
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Transport | ErrorCategory::Protocol | ErrorCategory::Contract => {
                ErrorSeverity::Warning
            }
            ErrorCategory::Input => ErrorSeverity::Error,
            ErrorCategory::Configuration | ErrorCategory::Internal => ErrorSeverity::Critical,
        }
    }

    /// 是否属于调用改写服务时的批次失败
    pub fn is_batch_failure(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Transport | ErrorCategory::Protocol | ErrorCategory::Contract
        )
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(self, context: T) -> Self {
        let new_msg = |msg: String| format!("{} (上下文: {})", msg, context);

        match self {
            RewriteError::ConfigError(msg) => RewriteError::ConfigError(new_msg(msg)),
            RewriteError::TransportError(msg) => RewriteError::TransportError(new_msg(msg)),
            RewriteError::TimeoutError(msg) => RewriteError::TimeoutError(new_msg(msg)),
            RewriteError::ProtocolError(msg) => RewriteError::ProtocolError(new_msg(msg)),
            RewriteError::ParseError(msg) => RewriteError::ParseError(new_msg(msg)),
            RewriteError::SerializationError(msg) => {
                RewriteError::SerializationError(new_msg(msg))
            }
            RewriteError::IoError(msg) => RewriteError::IoError(new_msg(msg)),
            contract @ RewriteError::ContractError { .. } => contract,
        }
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Transport,
    Protocol,
    Contract,
    Configuration,
    Input,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Transport => "transport",
            ErrorCategory::Protocol => "protocol",
            ErrorCategory::Contract => "contract",
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Input => "input",
            ErrorCategory::Internal => "internal",
        };
        f.write_str(name)
    }
}

impl From<reqwest::Error> for RewriteError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            RewriteError::TimeoutError(error.to_string())
        } else if error.is_decode() {
            RewriteError::ProtocolError(format!("响应体无法解析: {}", error))
        } else if error.is_builder() {
            RewriteError::ConfigError(format!("HTTP 客户端配置无效: {}", error))
        } else {
            RewriteError::TransportError(error.to_string())
        }
    }
}

impl From<std::io::Error> for RewriteError {
    fn from(error: std::io::Error) -> Self {
        RewriteError::IoError(error.to_string())
    }
}

impl From<serde_json::Error> for RewriteError {
    fn from(error: serde_json::Error) -> Self {
        RewriteError::SerializationError(format!("JSON序列化错误: {}", error))
    }
}

impl From<toml::de::Error> for RewriteError {
    fn from(error: toml::de::Error) -> Self {
        RewriteError::ParseError(format!("TOML解析错误: {}", error))
    }
}

impl From<tokio::time::error::Elapsed> for RewriteError {
    fn from(error: tokio::time::error::Elapsed) -> Self {
        RewriteError::TimeoutError(format!("异步操作超时: {}", error))
    }
}

impl From<EnvError> for RewriteError {
    fn from(error: EnvError) -> Self {
        RewriteError::ConfigError(error.to_string())
    }
}

/// 错误结果类型别名
pub type RewriteResult<T> = Result<T, RewriteError>;

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 按严重程度记录错误
    pub fn log_error(error: &RewriteError) {
        match error.severity() {
            ErrorSeverity::Info => tracing::info!(category = %error.category(), "改写信息: {}", error),
            ErrorSeverity::Warning => {
                tracing::warn!(category = %error.category(), "改写警告: {}", error)
            }
            ErrorSeverity::Error => {
                tracing::error!(category = %error.category(), "改写错误: {}", error)
            }
            ErrorSeverity::Critical => {
                tracing::error!(category = %error.category(), "改写严重错误: {}", error)
            }
        }
    }

    /// 创建协议错误
    pub fn protocol_error<T: fmt::Display>(msg: T) -> RewriteError {
        RewriteError::ProtocolError(msg.to_string())
    }
}
