use encoding_rs::Encoding;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// 将 HTML 字节转换为 DOM
///
/// 编码标签无法识别时按 UTF-8（有损）解码。
pub fn html_to_dom(data: &[u8], document_encoding: &str) -> RcDom {
    let s = match Encoding::for_label(document_encoding.as_bytes()) {
        Some(encoding) => encoding.decode(data).0.into_owned(),
        None => String::from_utf8_lossy(data).into_owned(),
    };

    str_to_dom(&s)
}

/// 解析 HTML 字节并按文档自身声明的字符集重新解码
///
/// 先按 `default_encoding` 解析；文档中的 meta 声明了可识别的其他字符集时，
/// 用该字符集重新解析。返回 DOM 和实际使用的编码名。
pub fn html_to_dom_detect(data: &[u8], default_encoding: &str) -> (RcDom, String) {
    let dom = html_to_dom(data, default_encoding);

    let declared = get_charset(&dom.document)
        .and_then(|charset| Encoding::for_label_no_replacement(charset.trim().as_bytes()));
    let current = Encoding::for_label(default_encoding.as_bytes());

    match declared {
        Some(encoding) if Some(encoding) != current => {
            tracing::debug!("文档声明字符集 {}，重新解析", encoding.name());
            (html_to_dom(data, encoding.name()), encoding.name().to_string())
        }
        _ => (dom, default_encoding.to_string()),
    }
}

/// 读取文档 meta 中声明的字符集
///
/// 支持 `<meta charset="...">` 和
/// `<meta http-equiv="content-type" content="text/html; charset=...">` 两种写法。
pub fn get_charset(node: &Handle) -> Option<String> {
    if get_node_name(node) == Some("meta") {
        if let Some(charset) = get_node_attr(node, "charset") {
            return Some(charset);
        }

        let is_content_type = get_node_attr(node, "http-equiv")
            .is_some_and(|value| value.eq_ignore_ascii_case("content-type"));
        if is_content_type {
            if let Some(charset) = get_node_attr(node, "content")
                .as_deref()
                .and_then(charset_from_content_type)
            {
                return Some(charset);
            }
        }
    }

    node.children.borrow().iter().find_map(get_charset)
}

fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|part| {
        let (key, value) = part.trim().split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_string())
    })
}

/// 将 HTML 字符串解析为 DOM
pub fn str_to_dom(html: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(html)
}

/// 按 id 属性查找第一个匹配的元素（先序遍历）
pub fn find_element_by_id(node: &Handle, id: &str) -> Option<Handle> {
    if get_node_attr(node, "id").as_deref() == Some(id) {
        return Some(node.clone());
    }

    node.children
        .borrow()
        .iter()
        .find_map(|child| find_element_by_id(child, id))
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 读取文本节点内容，非文本节点返回 None
pub fn get_text(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Text { contents } => Some(contents.borrow().to_string()),
        _ => None,
    }
}

/// 覆盖文本节点内容
///
/// 返回是否写入成功（节点不是文本节点时不做任何修改）。
pub fn set_text(node: &Handle, value: &str) -> bool {
    match &node.data {
        NodeData::Text { contents } => {
            let mut contents = contents.borrow_mut();
            contents.clear();
            contents.push_slice(value);
            true
        }
        _ => false,
    }
}

/// 按文档顺序收集子树内全部文本
pub fn text_content(node: &Handle) -> String {
    let mut out = String::new();
    push_text(node, &mut out);
    out
}

fn push_text(node: &Handle, out: &mut String) {
    if let NodeData::Text { contents } = &node.data {
        out.push_str(&contents.borrow());
    }

    for child in node.children.borrow().iter() {
        push_text(child, out);
    }
}
