//! 改写系统核心模块
//!
//! ## 模块依赖关系
//!
//! ```text
//! RewriteService (service.rs)
//!     ├── TextCollector (pipeline/collector.rs)
//!     ├── BatchManager (pipeline/batch.rs)
//!     └── RewriteProcessor (processor.rs)
//!             ├── RewriteInvoker (invoker.rs)
//!             │       └── SegmentRewriter (client.rs)
//!             ├── reconcile_whitespace / heuristic_rewrite (pipeline/)
//!             └── RewriteMode (outcome.rs)
//! ```

pub mod client;
pub mod invoker;
pub mod outcome;
pub mod processor;
pub mod service;

/// 改写服务边界与 HTTP 实现
pub use client::{HttpRewriteClient, SegmentRewriter};

pub use invoker::{InvokerStats, InvokerStatsSnapshot, RewriteInvoker};

/// 运行结果分级
pub use outcome::RewriteMode;

pub use processor::{PipelineRun, ProcessorConfig, RewriteProcessor, RunCounters};

/// 统一改写服务 - 主要的对外接口
pub use service::{
    RewriteReport, RewriteService, RewrittenDocument, ServiceStats, ServiceStatsSnapshot,
};
