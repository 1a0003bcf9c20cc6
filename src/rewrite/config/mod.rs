//! 改写配置管理模块
//!
//! 提供简化的配置管理，支持环境变量、配置文件和默认值

pub mod manager;

// 重新导出主要类型
pub use manager::{ConfigManager, RewriteConfig};

/// 配置常量
pub mod constants {
    use std::time::Duration;

    // 批次处理相关
    pub const DEFAULT_BATCH_SIZE: usize = 40;
    /// 改写服务单次请求接受的最大片段数，本地批次大小不得超过它
    pub const MAX_SERVICE_SEGMENTS: usize = 60;
    pub const DEFAULT_MAX_CONCURRENCY: usize = 5;
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(25);
    pub const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

    // 默认API设置
    pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8787/api/rewrite";
    /// 错误响应体写进日志时保留的最大字符数
    pub const ERROR_BODY_PREVIEW_CHARS: usize = 300;

    // 片段筛选相关
    pub const MIN_ALPHA_RUN: usize = 3;
    pub const MAX_COLLECT_DEPTH: usize = 512;

    /// 不参与改写的元素（非正文）
    pub const SKIP_ELEMENTS: &[&str] = &[
        "script", "style", "noscript", "code", "pre", "math", "kbd", "samp", "svg",
    ];

    /// class 中出现这些子串的容器被视为引用、导航框、目录、编辑入口或元数据
    pub const SKIP_CLASS_HINTS: &[&str] = &[
        "reference",
        "reflist",
        "mw-editsection",
        "navbox",
        "toc",
        "metadata",
        "infobox-above",
    ];

    // 本地兜底改写
    /// 按顺序执行的整词替换（大小写不敏感）
    pub const FALLBACK_SUBSTITUTIONS: &[(&str, &str)] = &[
        ("very", "tremendous"),
        ("important", "very important, believe me"),
        ("successful", "incredibly successful"),
        ("many", "so many"),
        ("widely", "very widely"),
        ("according to", "according to many people"),
        ("notable", "highly notable"),
        ("strong", "strong, really strong"),
    ];
    pub const FALLBACK_MARKER: &str = "Folks,";
    pub const FALLBACK_MARKER_MIN_CHARS: usize = 90;

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "reprose.toml",
        ".reprose.toml",
        "~/.config/reprose/config.toml",
    ];

    pub const ENV_FILES: &[&str] = &[".env.local", ".env"];
}

/// 加载配置，失败时退回默认值
pub fn load_rewrite_config(api_url: Option<&str>) -> RewriteConfig {
    match ConfigManager::new() {
        Ok(manager) => manager.with_api_url(api_url),
        Err(e) => {
            tracing::warn!("配置加载失败，使用默认配置: {}", e);
            RewriteConfig::default_with_api_url(api_url)
        }
    }
}
