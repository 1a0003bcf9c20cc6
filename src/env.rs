//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量访问，配置管理器在加载配置文件之后用它做覆盖。

use std::env;
use std::fmt;
use std::time::Duration;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => match Self::DEFAULT {
                Some(default) => Ok(default),
                None => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Required environment variable not set".to_string(),
                }),
            },
        }
    }

    /// 只在变量被显式设置时返回值；设置了但无法解析时返回错误
    fn get_if_set() -> EnvResult<Option<T>> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value).map(Some),
            Err(_) => Ok(None),
        }
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "REPROSE_LOG_LEVEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("info".to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            match value.trim().to_lowercase().as_str() {
                level @ ("trace" | "debug" | "info" | "warn" | "error") => Ok(level.to_string()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }
}

/// 改写服务相关环境变量
pub mod rewrite {
    use super::*;

    /// 改写服务地址
    pub struct ApiUrl;
    impl EnvVar<String> for ApiUrl {
        const NAME: &'static str = "REPROSE_API_URL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Rewrite service endpoint URL";

        fn parse(value: &str) -> EnvResult<String> {
            let url = value.trim();
            if url.starts_with("http://") || url.starts_with("https://") {
                Ok(url.to_string())
            } else {
                Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "API URL must start with http:// or https://".to_string(),
                })
            }
        }
    }

    /// 每批最多片段数
    pub struct BatchSize;
    impl EnvVar<usize> for BatchSize {
        const NAME: &'static str = "REPROSE_BATCH_SIZE";
        const DEFAULT: Option<usize> = Some(40);
        const DESCRIPTION: &'static str = "Maximum number of segments per rewrite request";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 60)
        }
    }

    /// 最大并发请求数
    pub struct MaxConcurrency;
    impl EnvVar<usize> for MaxConcurrency {
        const NAME: &'static str = "REPROSE_MAX_CONCURRENCY";
        const DEFAULT: Option<usize> = Some(5);
        const DESCRIPTION: &'static str = "Maximum outstanding requests to the rewrite service";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 64)
        }
    }

    /// 单次请求超时
    pub struct RequestTimeout;
    impl EnvVar<Duration> for RequestTimeout {
        const NAME: &'static str = "REPROSE_REQUEST_TIMEOUT";
        const DEFAULT: Option<Duration> = Some(Duration::from_secs(25));
        const DESCRIPTION: &'static str = "Per-request timeout in seconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            let seconds = parse_positive_usize(value.trim(), Self::NAME, 1, 300)?;
            Ok(Duration::from_secs(seconds as u64))
        }
    }

    /// 整次改写共用的引导语
    pub struct Directive;
    impl EnvVar<String> for Directive {
        const NAME: &'static str = "REPROSE_DIRECTIVE";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Steering directive sent with every rewrite request";

        fn parse(value: &str) -> EnvResult<String> {
            let directive = value.trim();
            if directive.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Directive must not be blank".to_string(),
                });
            }
            Ok(directive.to_string())
        }
    }
}

fn parse_positive_usize(value: &str, var_name: &str, min: usize, max: usize) -> EnvResult<usize> {
    let num: usize = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid positive number".to_string(),
    })?;

    if num < min {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} is below minimum {}", num, min),
        });
    }

    if num > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} exceeds maximum {}", num, max),
        });
    }

    Ok(num)
}

/// 列出所有支持的环境变量（名称、说明）
pub fn describe_all() -> Vec<(&'static str, &'static str)> {
    vec![
        (core::LogLevel::NAME, core::LogLevel::DESCRIPTION),
        (rewrite::ApiUrl::NAME, rewrite::ApiUrl::DESCRIPTION),
        (rewrite::BatchSize::NAME, rewrite::BatchSize::DESCRIPTION),
        (rewrite::MaxConcurrency::NAME, rewrite::MaxConcurrency::DESCRIPTION),
        (rewrite::RequestTimeout::NAME, rewrite::RequestTimeout::DESCRIPTION),
        (rewrite::Directive::NAME, rewrite::Directive::DESCRIPTION),
    ]
}
