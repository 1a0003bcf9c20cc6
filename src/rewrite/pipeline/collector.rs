//! 片段收集器模块
//!
//! 先序遍历 DOM，按文档顺序收集可改写的文本节点

use std::rc::Rc;

use markup5ever_rcdom::{Handle, NodeData, WeakHandle};

use crate::parsers::html::dom::{get_node_attr, set_text};
use crate::rewrite::config::constants;
use crate::rewrite::pipeline::filters::TextFilter;

/// 一个待改写的文本单元
///
/// 只持有文本节点的弱引用：收集器和调度器都不拥有文档，文档释放后写入变为空操作。
#[derive(Debug, Clone)]
pub struct Candidate {
    /// 原始文本，首尾空白是有意义的
    pub text: String,
    node: WeakHandle,
}

impl Candidate {
    /// 从文本节点创建候选项
    pub fn new(text: String, node: &Handle) -> Self {
        Self {
            text,
            node: Rc::downgrade(node),
        }
    }

    /// 字符数
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// 把结果写回文档中对应的文本节点
    ///
    /// 文档已释放或节点不是文本节点时返回 false。
    pub fn write(&self, value: &str) -> bool {
        match self.node.upgrade() {
            Some(node) => set_text(&node, value),
            None => false,
        }
    }

    /// 两个候选项是否指向同一个文本节点
    pub fn same_position(&self, other: &Candidate) -> bool {
        self.node.ptr_eq(&other.node)
    }
}

/// 收集器配置
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 最大遍历深度
    pub max_depth: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_depth: constants::MAX_COLLECT_DEPTH,
        }
    }
}

/// 收集统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionStats {
    pub nodes_visited: usize,
    pub subtrees_skipped: usize,
    pub texts_rejected: usize,
    pub candidates: usize,
}

impl CollectionStats {
    pub fn reset(&mut self) {
        *self = Default::default();
    }
}

/// DOM 片段收集器
#[derive(Debug, Clone, Default)]
pub struct TextCollector {
    config: CollectorConfig,
    filter: TextFilter,
    stats: CollectionStats,
}

impl TextCollector {
    /// 创建新的收集器
    pub fn new(config: CollectorConfig, filter: TextFilter) -> Self {
        Self {
            config,
            filter,
            stats: CollectionStats::default(),
        }
    }

    /// 收集可改写的文本节点
    ///
    /// 只读遍历，不修改文档。没有可改写内容时返回空列表。
    pub fn collect_candidates(&mut self, root: &Handle) -> Vec<Candidate> {
        self.stats.reset();

        let mut candidates = Vec::new();
        self.collect_recursive(root, &mut candidates, 0);
        self.stats.candidates = candidates.len();

        tracing::debug!(
            "收集完成: 访问 {} 个节点，跳过 {} 个子树，得到 {} 个片段",
            self.stats.nodes_visited,
            self.stats.subtrees_skipped,
            candidates.len()
        );

        candidates
    }

    /// 最近一次收集的统计
    pub fn stats(&self) -> &CollectionStats {
        &self.stats
    }

    fn collect_recursive(&mut self, node: &Handle, candidates: &mut Vec<Candidate>, depth: usize) {
        if depth > self.config.max_depth {
            tracing::debug!("超过最大遍历深度 {}，忽略更深的节点", self.config.max_depth);
            return;
        }

        self.stats.nodes_visited += 1;

        match node.data {
            NodeData::Text { ref contents } => {
                let text = contents.borrow().to_string();
                if self.filter.should_rewrite(&text) {
                    candidates.push(Candidate::new(text, node));
                } else {
                    self.stats.texts_rejected += 1;
                }
            }
            NodeData::Element { ref name, .. } => {
                if self.should_skip_container(node, name.local.as_ref()) {
                    self.stats.subtrees_skipped += 1;
                    return;
                }

                for child in node.children.borrow().iter() {
                    self.collect_recursive(child, candidates, depth + 1);
                }
            }
            NodeData::Document => {
                for child in node.children.borrow().iter() {
                    self.collect_recursive(child, candidates, depth + 1);
                }
            }
            // 注释、doctype、处理指令不含正文
            _ => {}
        }
    }

    /// 非正文标签，或 class 命中引用/导航/目录/编辑/元数据提示的容器，整棵子树跳过
    fn should_skip_container(&self, node: &Handle, tag_name: &str) -> bool {
        if self.filter.is_skipped_element(tag_name) {
            return true;
        }

        get_node_attr(node, "class").is_some_and(|class| self.filter.matches_skip_hint(&class))
    }
}
