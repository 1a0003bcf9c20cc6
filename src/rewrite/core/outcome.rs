//! 改写结果分级

use std::fmt;

use serde::{Deserialize, Serialize};

/// 一次改写运行的质量标签
///
/// 只是提示信息，不会改变已经写入文档的内容。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RewriteMode {
    /// 所有批次都由改写服务完成
    Llm,
    /// 部分批次使用了本地兜底
    LlmPartial,
    /// 没有任何批次由改写服务完成
    Heuristic,
}

impl RewriteMode {
    /// 按成功、失败批次数分级
    pub fn classify(success_count: usize, failure_count: usize) -> Self {
        match (success_count, failure_count) {
            (0, _) => RewriteMode::Heuristic,
            (_, 0) => RewriteMode::Llm,
            _ => RewriteMode::LlmPartial,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RewriteMode::Llm => "llm",
            RewriteMode::LlmPartial => "llm-partial",
            RewriteMode::Heuristic => "heuristic",
        }
    }
}

impl fmt::Display for RewriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
