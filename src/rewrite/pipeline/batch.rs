//! 批次管理模块
//!
//! 把有序的候选片段按固定大小连续切分成批次，不重排

use crate::rewrite::config::{constants, RewriteConfig};
use crate::rewrite::pipeline::collector::Candidate;

/// 一个改写批次
///
/// 批内顺序即请求顺序：第 i 个结果对应第 i 个片段。
#[derive(Debug, Clone)]
pub struct Batch {
    /// 批次序号（从 0 开始）
    pub index: usize,
    /// 片段列表
    pub items: Vec<Candidate>,
    /// 字符总数
    pub estimated_chars: usize,
}

impl Batch {
    /// 创建新批次
    pub fn new(index: usize, items: Vec<Candidate>) -> Self {
        let estimated_chars = items.iter().map(Candidate::char_count).sum();
        Self {
            index,
            items,
            estimated_chars,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 按批内顺序取出原始文本
    pub fn texts(&self) -> Vec<String> {
        self.items.iter().map(|item| item.text.clone()).collect()
    }

    /// 获取批次摘要
    pub fn summary(&self) -> String {
        format!(
            "批次 #{}: {} 个片段, {} 字符",
            self.index + 1,
            self.items.len(),
            self.estimated_chars
        )
    }
}

/// 批次管理器配置
#[derive(Debug, Clone)]
pub struct BatchManagerConfig {
    /// 每批最多片段数
    pub max_batch_size: usize,
}

impl Default for BatchManagerConfig {
    fn default() -> Self {
        Self {
            max_batch_size: constants::DEFAULT_BATCH_SIZE,
        }
    }
}

impl From<&RewriteConfig> for BatchManagerConfig {
    fn from(config: &RewriteConfig) -> Self {
        Self {
            max_batch_size: config.batch_size,
        }
    }
}

/// 批次管理器
#[derive(Debug, Clone, Default)]
pub struct BatchManager {
    config: BatchManagerConfig,
}

impl BatchManager {
    pub fn new(config: BatchManagerConfig) -> Self {
        Self { config }
    }

    /// 实际使用的批次大小（至少为 1）
    pub fn batch_size(&self) -> usize {
        self.config.max_batch_size.max(1)
    }

    /// 创建批次
    ///
    /// 第 k 批包含候选项 `[k*S, min((k+1)*S, n))`。每批至少 1 个、至多 S 个片段。
    pub fn create_batches(&self, candidates: Vec<Candidate>) -> Vec<Batch> {
        let size = self.batch_size();
        let mut batches = Vec::with_capacity(candidates.len().div_ceil(size));
        let mut remaining = candidates.into_iter().peekable();

        while remaining.peek().is_some() {
            let items: Vec<Candidate> = remaining.by_ref().take(size).collect();
            batches.push(Batch::new(batches.len(), items));
        }

        tracing::debug!("创建了 {} 个批次（每批最多 {} 个片段）", batches.len(), size);
        batches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::str_to_dom;
    use crate::rewrite::pipeline::collector::TextCollector;
    use markup5ever_rcdom::RcDom;

    fn dom_with_paragraphs(n: usize) -> RcDom {
        let html: String = (0..n)
            .map(|i| format!("<p>Paragraph number {}</p>", i))
            .collect();
        str_to_dom(&html)
    }

    fn manager(size: usize) -> BatchManager {
        BatchManager::new(BatchManagerConfig {
            max_batch_size: size,
        })
    }

    #[test]
    fn chunks_contiguously() {
        let dom = dom_with_paragraphs(42);
        let candidates = TextCollector::default().collect_candidates(&dom.document);
        assert_eq!(candidates.len(), 42);

        let batches = manager(15).create_batches(candidates);
        let sizes: Vec<usize> = batches.iter().map(Batch::len).collect();
        assert_eq!(sizes, vec![15, 15, 12]);

        // 顺序保持不变
        assert_eq!(batches[1].items[0].text, "Paragraph number 15");
        assert_eq!(batches[2].items[11].text, "Paragraph number 41");
        assert_eq!(batches[2].index, 2);
    }

    #[test]
    fn exact_multiple_and_empty_input() {
        let dom = dom_with_paragraphs(30);
        let candidates = TextCollector::default().collect_candidates(&dom.document);
        let batches = manager(15).create_batches(candidates);
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.len() == 15));

        assert!(manager(15).create_batches(Vec::new()).is_empty());
    }

    #[test]
    fn zero_size_is_treated_as_one() {
        let dom = dom_with_paragraphs(3);
        let candidates = TextCollector::default().collect_candidates(&dom.document);
        let batches = manager(0).create_batches(candidates);
        assert_eq!(batches.len(), 3);
        assert!(batches.iter().all(|b| !b.is_empty() && b.len() == 1));
    }

    #[test]
    fn summary_mentions_size() {
        let dom = dom_with_paragraphs(2);
        let candidates = TextCollector::default().collect_candidates(&dom.document);
        let batch = &manager(5).create_batches(candidates)[0];
        assert_eq!(batch.estimated_chars, 36);
        assert!(batch.summary().contains("2 个片段"));
    }
}
