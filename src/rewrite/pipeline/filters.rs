//! 文本过滤器模块
//!
//! 判断文本节点及其所在容器是否适合改写

use std::collections::HashSet;

use crate::rewrite::config::constants;

/// 文本过滤器
#[derive(Debug, Clone)]
pub struct TextFilter {
    skip_elements: HashSet<String>,
    skip_class_hints: Vec<String>,
    min_alpha_run: usize,
}

impl Default for TextFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl TextFilter {
    /// 使用默认跳过列表创建过滤器
    pub fn new() -> Self {
        Self::with_rules(
            constants::SKIP_ELEMENTS.iter().map(|s| s.to_string()),
            constants::SKIP_CLASS_HINTS.iter().map(|s| s.to_string()),
        )
    }

    /// 使用自定义跳过列表创建过滤器
    pub fn with_rules<E, H>(skip_elements: E, skip_class_hints: H) -> Self
    where
        E: IntoIterator<Item = String>,
        H: IntoIterator<Item = String>,
    {
        Self {
            skip_elements: skip_elements
                .into_iter()
                .map(|tag| tag.to_ascii_lowercase())
                .collect(),
            skip_class_hints: skip_class_hints.into_iter().collect(),
            min_alpha_run: constants::MIN_ALPHA_RUN,
        }
    }

    /// 判断文本本身是否值得改写
    ///
    /// 去掉首尾空白后非空，并且至少包含一段连续的字母（默认 3 个），
    /// 纯标点、纯数字、引用编号之类的碎片不会通过。
    pub fn should_rewrite(&self, text: &str) -> bool {
        !text.trim().is_empty() && self.has_alpha_run(text)
    }

    /// 是否包含足够长的连续字母
    pub fn has_alpha_run(&self, text: &str) -> bool {
        let mut run = 0;
        for c in text.chars() {
            if c.is_alphabetic() {
                run += 1;
                if run >= self.min_alpha_run {
                    return true;
                }
            } else {
                run = 0;
            }
        }
        false
    }

    /// 元素是否属于非正文标签
    pub fn is_skipped_element(&self, tag_name: &str) -> bool {
        self.skip_elements.contains(&tag_name.to_ascii_lowercase())
    }

    /// class 是否命中跳过提示
    pub fn matches_skip_hint(&self, class_attr: &str) -> bool {
        self.skip_class_hints
            .iter()
            .any(|hint| class_attr.contains(hint.as_str()))
    }
}
