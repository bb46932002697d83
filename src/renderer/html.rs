//! HTML serialization.
//!
//! Elements serialize with their attributes in declaration order and
//! lowercased attribute names. Comment nodes (container anchors) are omitted.
//! Text and attribute values are escaped.

use super::dom::{NodeKind, NodeRef};

/// Serialize a node and its subtree.
pub fn to_html(node: &NodeRef) -> String {
    let mut out = String::new();
    write_node(&mut out, node);
    out
}

/// Serialize only the children of a node.
pub fn inner_html(node: &NodeRef) -> String {
    let mut out = String::new();
    for child in node.borrow().children() {
        write_node(&mut out, child);
    }
    out
}

fn write_node(out: &mut String, node: &NodeRef) {
    let n = node.borrow();
    match n.kind() {
        NodeKind::Text(text) => escape_into(out, text, false),
        NodeKind::Comment(_) => {}
        NodeKind::Element(el) => {
            out.push('<');
            out.push_str(&el.tag);
            for (name, value) in &el.attrs {
                out.push(' ');
                out.push_str(&name.to_ascii_lowercase());
                out.push_str("=\"");
                escape_into(out, value, true);
                out.push('"');
            }
            out.push('>');
            for child in n.children() {
                write_node(out, child);
            }
            out.push_str("</");
            out.push_str(&el.tag);
            out.push('>');
        }
    }
}

fn escape_into(out: &mut String, text: &str, attribute: bool) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}
