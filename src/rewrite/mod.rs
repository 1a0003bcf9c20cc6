//! 改写模块
//!
//! 就地改写长文正文，保留结构（标签、链接、媒体）：
//! - **core**: 改写服务、调用器、并发处理器
//! - **pipeline**: 片段收集、过滤、批次切分、空白修复、本地兜底
//! - **config**: 配置管理
//! - **error**: 错误处理
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use reprose::rewrite::rewrite_html_fragment;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let rewritten = rewrite_html_fragment("<p>Many people live here.</p>", None).await?;
//! println!("{} ({})", rewritten.html, rewritten.mode);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// 子模块声明
// ============================================================================

/// 配置管理模块
pub mod config;

/// 核心模块 - 改写服务、调用器和处理器
pub mod core;

/// 错误处理模块
pub mod error;

/// 文本处理管道模块 - 收集、过滤、批次以及两个纯文本变换
pub mod pipeline;

// ============================================================================
// 核心API导出
// ============================================================================

pub use self::core::{
    HttpRewriteClient, RewriteMode, RewriteReport, RewriteService, RewrittenDocument,
    SegmentRewriter, ServiceStats,
};

pub use config::{constants, ConfigManager, RewriteConfig};

pub use error::{ErrorCategory, ErrorSeverity, RewriteError, RewriteResult};

// ============================================================================
// 高级API导出
// ============================================================================

pub use pipeline::{
    heuristic_rewrite, reconcile_whitespace, Batch, BatchManager, Candidate, TextCollector,
    TextFilter,
};

// ============================================================================
// 便利函数
// ============================================================================

/// 改写一段文章 HTML
///
/// 按默认配置来源创建服务，`api_url` 覆盖配置中的服务地址。
pub async fn rewrite_html_fragment(
    html: &str,
    api_url: Option<&str>,
) -> RewriteResult<RewrittenDocument> {
    let service = RewriteService::create_default(api_url)?;
    service.rewrite_html_fragment(html, |_| {}).await
}
