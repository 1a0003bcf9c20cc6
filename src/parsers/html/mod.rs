//! HTML解析和处理模块
//!
//! - `dom`: 解析、节点查找、文本节点读写
//! - `serializer`: 文档与子树序列化

pub mod dom;
pub mod serializer;

pub use dom::{
    find_element_by_id, get_charset, get_node_attr, get_node_name, get_text, html_to_dom,
    html_to_dom_detect, set_text, str_to_dom, text_content,
};
pub use serializer::{serialize_children, serialize_document};
