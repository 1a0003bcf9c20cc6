//! # Reprose Library
//!
//! 就地改写 HTML 文章正文的工具库：保留标签、链接和媒体，只替换文本。
//!
//! ## 模块组织
//!
//! - `env` - 类型化的环境变量
//! - `parsers` - HTML 解析与序列化
//! - `rewrite` - 改写管道（收集、批次、调用、兜底、调度）

pub mod env;
pub mod parsers;
pub mod rewrite;

// Re-export commonly used items for convenience
pub use parsers::*;
pub use rewrite::{RewriteConfig, RewriteMode, RewriteReport, RewriteResult, RewriteService};
