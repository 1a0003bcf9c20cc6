//! 边界空白修复
//!
//! 相邻内联文本节点之间的空白决定了词与词是否粘连，改写服务并不可靠地保留它们，
//! 这里按原文把首尾空白补回去。

/// 原文开头的空白
pub fn leading_whitespace(s: &str) -> &str {
    &s[..s.len() - s.trim_start().len()]
}

/// 原文结尾的空白
pub fn trailing_whitespace(s: &str) -> &str {
    &s[s.trim_end().len()..]
}

/// 按原文修复改写结果的首尾空白
///
/// 改写结果不以原文的开头空白开头时，去掉它自己的开头空白再补上原文的；结尾同理。
/// 结果总是以原文的开头空白开头、以原文的结尾空白结尾。
pub fn reconcile_whitespace(original: &str, rewrite: &str) -> String {
    let lead = leading_whitespace(original);
    let trail = trailing_whitespace(original);

    let body = rewrite
        .strip_prefix(lead)
        .unwrap_or_else(|| rewrite.trim_start());

    let mut out = String::with_capacity(lead.len() + body.len() + trail.len());
    out.push_str(lead);
    out.push_str(body);

    if !out.ends_with(trail) {
        out.truncate(lead.len() + body.trim_end().len());
        out.push_str(trail);
    }

    out
}
