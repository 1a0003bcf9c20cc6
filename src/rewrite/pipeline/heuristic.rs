//! 本地兜底改写
//!
//! 改写服务无法给出结果时使用的确定性文本变换。纯函数，不会失败。

use std::sync::OnceLock;

use regex::{NoExpand, Regex};

use crate::rewrite::config::constants;

/// 编译好的整词替换规则，顺序与常量表一致
fn substitution_rules() -> &'static [(Regex, &'static str)] {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        constants::FALLBACK_SUBSTITUTIONS
            .iter()
            .filter_map(|(word, replacement)| {
                let pattern = format!(r"(?i)\b{}\b", regex::escape(word));
                match Regex::new(&pattern) {
                    Ok(re) => Some((re, *replacement)),
                    Err(e) => {
                        tracing::error!("兜底替换规则编译失败 '{}': {}", word, e);
                        None
                    }
                }
            })
            .collect()
    })
}

/// 兜底改写单个片段
///
/// 1. 依次执行整词替换（大小写不敏感，每条规则一遍）；
/// 2. 去掉首尾空白后的原文超过阈值长度、以大写字母开头、且不以标记语开头时，
///    在替换结果中找到该原文第一次出现的位置，在其前面加上标记语。
///    原文已被替换改动时不加。
///
/// 空串或纯空白原样返回。
pub fn heuristic_rewrite(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return input.to_string();
    }

    let mut output = input.to_string();
    for (pattern, replacement) in substitution_rules() {
        output = pattern
            .replace_all(&output, NoExpand(replacement))
            .into_owned();
    }

    if wants_marker(trimmed) {
        // 替换改动了原文时找不到原文，不加标记
        if let Some(at) = output.find(trimmed) {
            output.insert_str(at, &format!("{} ", constants::FALLBACK_MARKER));
        }
    }

    output
}

fn wants_marker(trimmed: &str) -> bool {
    trimmed.chars().count() > constants::FALLBACK_MARKER_MIN_CHARS
        && trimmed.chars().next().is_some_and(char::is_uppercase)
        && !trimmed.starts_with(constants::FALLBACK_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_whole_words_case_insensitively() {
        assert_eq!(
            heuristic_rewrite("A very notable and Strong result"),
            "A tremendous highly notable and strong, really strong result"
        );
        // 不匹配词的一部分
        assert_eq!(heuristic_rewrite("everywhere, manyfold"), "everywhere, manyfold");
    }

    #[test]
    fn rules_run_in_fixed_order() {
        // "important" 产生的 "very" 不会再被第一条规则替换
        assert_eq!(
            heuristic_rewrite("It is important."),
            "It is very important, believe me."
        );
        assert_eq!(
            heuristic_rewrite("according to the census"),
            "according to many people the census"
        );
    }

    #[test]
    fn blank_input_is_untouched() {
        assert_eq!(heuristic_rewrite(""), "");
        assert_eq!(heuristic_rewrite("  \n\t"), "  \n\t");
    }

    #[test]
    fn long_capitalised_text_gets_marker_after_leading_space() {
        let body = "The settlement grew quickly during the nineteenth century as the railway reached the valley floor.";
        assert!(body.chars().count() > 90);

        let out = heuristic_rewrite(&format!("  {body} "));
        assert!(out.starts_with("  Folks, The settlement"));
        assert!(out.ends_with("valley floor. "));

        // 已有标记语时不重复添加
        let marked = format!("Folks, {body}");
        assert_eq!(heuristic_rewrite(&marked), marked);
    }

    #[test]
    fn substituted_text_gets_no_marker() {
        let body = "The settlement had many residents who worked the fields along the river through the long valley.";
        assert!(body.chars().count() > 90);

        let out = heuristic_rewrite(body);
        assert_eq!(
            out,
            "The settlement had so many residents who worked the fields along the river through the long valley."
        );
        assert!(!out.contains("Folks,"));
    }

    #[test]
    fn short_or_lowercase_text_gets_no_marker() {
        assert_eq!(heuristic_rewrite("The end."), "The end.");
        let lower = "the settlement grew quickly during the nineteenth century as the railway reached the valley floor.";
        assert_eq!(heuristic_rewrite(lower), lower);
    }

    #[test]
    fn deterministic() {
        let input = " Many strong and very successful teams were widely notable. ";
        assert_eq!(heuristic_rewrite(input), heuristic_rewrite(input));
        assert_eq!(
            heuristic_rewrite(input),
            " so many strong, really strong and tremendous incredibly successful teams were very widely highly notable. "
        );
    }
}
