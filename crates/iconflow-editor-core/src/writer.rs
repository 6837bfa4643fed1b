//! HTML export.
//!
//! Serialization is structural and deterministic: equivalent documents
//! produce byte-identical output. Text runs open their marks in canonical
//! order, so a strong+em run always renders as
//! `<strong><em>..</em></strong>` no matter in which order the marks were
//! applied. Unknown node types render as their concatenated children.

use iconflow_model::{Elem, Node, Schema, Text};
use serde_json::Value;

use crate::icons::IconSet;

/// Render a document (or any subtree) to an HTML string. The root `doc`
/// node itself produces no wrapper.
pub fn to_html(schema: &Schema, node: &Node, icons: &IconSet) -> String {
    let mut out = String::new();
    write_node(&mut out, schema, icons, node);
    out
}

fn write_node(out: &mut String, schema: &Schema, icons: &IconSet, node: &Node) {
    match node {
        Node::Text(t) => write_text(out, t),
        Node::Elem(e) => write_elem(out, schema, icons, e),
    }
}

fn write_elem(out: &mut String, schema: &Schema, icons: &IconSet, e: &Elem) {
    match e.name.as_str() {
        "doc" => write_children(out, schema, icons, e),
        "paragraph" => wrap(out, schema, icons, e, "p"),
        "heading" => {
            let level = e
                .attrs
                .get("level")
                .and_then(Value::as_u64)
                .unwrap_or(1)
                .clamp(1, 6);
            out.push_str("<h");
            out.push_str(&level.to_string());
            out.push('>');
            write_children(out, schema, icons, e);
            out.push_str("</h");
            out.push_str(&level.to_string());
            out.push('>');
        }
        "blockquote" => wrap(out, schema, icons, e, "blockquote"),
        "bullet_list" => wrap(out, schema, icons, e, "ul"),
        "ordered_list" => {
            let order = e.attrs.get("order").and_then(Value::as_i64).unwrap_or(1);
            if order == 1 {
                out.push_str("<ol>");
            } else {
                out.push_str("<ol start=\"");
                out.push_str(&order.to_string());
                out.push_str("\">");
            }
            write_children(out, schema, icons, e);
            out.push_str("</ol>");
        }
        "list_item" => wrap(out, schema, icons, e, "li"),
        "hard_break" => out.push_str("<br>"),
        "icon" => write_icon(out, icons, e),
        // Unknown types contribute their children without a wrapper.
        _ => write_children(out, schema, icons, e),
    }
}

fn wrap(out: &mut String, schema: &Schema, icons: &IconSet, e: &Elem, tag: &str) {
    out.push('<');
    out.push_str(tag);
    out.push('>');
    write_children(out, schema, icons, e);
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn write_children(out: &mut String, schema: &Schema, icons: &IconSet, e: &Elem) {
    for child in e.content.children() {
        write_node(out, schema, icons, child);
    }
}

fn write_icon(out: &mut String, icons: &IconSet, e: &Elem) {
    let name = e
        .attrs
        .get("iconName")
        .and_then(Value::as_str)
        .unwrap_or_else(|| icons.default_key());
    out.push_str("<span class=\"iconflow-icon\" data-icon=\"");
    escape_attr_into(out, name);
    out.push_str("\">");
    // SVG markup comes from the catalog and is emitted as-is.
    out.push_str(icons.svg_for(name));
    out.push_str("</span>");
}

fn mark_tag(name: &str) -> Option<&'static str> {
    match name {
        "strong" => Some("strong"),
        "em" => Some("em"),
        "code" => Some("code"),
        _ => None,
    }
}

fn write_text(out: &mut String, t: &Text) {
    // Canonical set order: the first mark is the outermost wrapper.
    for mark in &t.marks {
        if let Some(tag) = mark_tag(&mark.name) {
            out.push('<');
            out.push_str(tag);
            out.push('>');
        }
    }
    escape_into(out, &t.text);
    for mark in t.marks.iter().rev() {
        if let Some(tag) = mark_tag(&mark.name) {
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}
