//! 改写管道模块
//!
//! 提供片段收集、过滤、批次切分，以及两个纯文本变换：边界空白修复和本地兜底改写

pub mod batch;
pub mod collector;
pub mod filters;
pub mod heuristic;
pub mod whitespace;

// 重新导出主要类型
pub use batch::{Batch, BatchManager, BatchManagerConfig};
pub use collector::{Candidate, CollectionStats, CollectorConfig, TextCollector};
pub use filters::TextFilter;
pub use heuristic::heuristic_rewrite;
pub use whitespace::reconcile_whitespace;
