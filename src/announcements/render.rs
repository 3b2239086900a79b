//! Long-description rendering.

use serde_json::Value;

use super::models::{FeatureAnnouncementData, RawAnnouncement};
use crate::notifications::{Notification, NotificationData, FEATURES_ANNOUNCEMENT};

/// Turns a rich text document into display markup.
pub trait RichTextRenderer: Send + Sync {
    fn render(&self, document: &Value) -> String;
}

/// Minimal HTML renderer for rich text documents.
///
/// Handles paragraphs, headings, lists, quotes, rules, hyperlinks and the
/// bold/italic/underline/code marks. Unknown nodes render their children.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl RichTextRenderer for HtmlRenderer {
    fn render(&self, document: &Value) -> String {
        let mut out = String::new();
        render_node(document, &mut out);
        out
    }
}

fn render_children(node: &Value, out: &mut String) {
    if let Some(children) = node.get("content").and_then(Value::as_array) {
        for child in children {
            render_node(child, out);
        }
    }
}

fn wrap(tag: &str, node: &Value, out: &mut String) {
    out.push_str(&format!("<{}>", tag));
    render_children(node, out);
    out.push_str(&format!("</{}>", tag));
}

fn render_node(node: &Value, out: &mut String) {
    let node_type = node.get("nodeType").and_then(Value::as_str).unwrap_or_default();
    match node_type {
        "text" => render_text(node, out),
        "paragraph" => wrap("p", node, out),
        "heading-1" => wrap("h1", node, out),
        "heading-2" => wrap("h2", node, out),
        "heading-3" => wrap("h3", node, out),
        "heading-4" => wrap("h4", node, out),
        "heading-5" => wrap("h5", node, out),
        "heading-6" => wrap("h6", node, out),
        "unordered-list" => wrap("ul", node, out),
        "ordered-list" => wrap("ol", node, out),
        "list-item" => wrap("li", node, out),
        "blockquote" => wrap("blockquote", node, out),
        "hr" => out.push_str("<hr/>"),
        "hyperlink" => {
            let uri = node
                .get("data")
                .and_then(|d| d.get("uri"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            out.push_str(&format!("<a href=\"{}\">", escape(uri)));
            render_children(node, out);
            out.push_str("</a>");
        }
        _ => render_children(node, out),
    }
}

fn render_text(node: &Value, out: &mut String) {
    let mut text = escape(node.get("value").and_then(Value::as_str).unwrap_or_default());
    let marks = node.get("marks").and_then(Value::as_array);
    for mark in marks.into_iter().flatten() {
        let tag = match mark.get("type").and_then(Value::as_str) {
            Some("bold") => "b",
            Some("italic") => "i",
            Some("underline") => "u",
            Some("code") => "code",
            _ => continue,
        };
        text = format!("<{}>{}</{}>", tag, text, tag);
    }
    out.push_str(&text);
}

fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Render the long description and wrap the announcement as an unread notification.
pub fn render(raw: RawAnnouncement, renderer: &dyn RichTextRenderer) -> Notification {
    let long_description = renderer.render(&raw.long_description);
    Notification {
        id: raw.id.clone(),
        notification_type: FEATURES_ANNOUNCEMENT.to_string(),
        created_at: raw.created_at,
        is_read: false,
        data: NotificationData::FeatureAnnouncement(FeatureAnnouncementData {
            id: raw.id,
            category: raw.category,
            title: raw.title,
            short_description: raw.short_description,
            long_description,
            image: raw.image,
            extension_link: raw.extension_link,
            link: raw.link,
        }),
    }
}
