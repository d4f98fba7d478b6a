use crate::models::{RichTextNode, Span};
use ammonia::Builder;
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Final pass over rendered bodies. Link and image URLs outside http, https
/// and mailto are dropped.
static SANITIZER: Lazy<Builder<'static>> = Lazy::new(|| {
    let tags: HashSet<&str> = [
        "p", "h1", "h2", "h3", "h4", "h5", "h6", "pre", "ul", "ol", "li", "strong", "em", "a",
        "img", "br",
    ]
    .into_iter()
    .collect();
    let schemes: HashSet<&str> = ["http", "https", "mailto"].into_iter().collect();

    let mut sanitizer = Builder::default();
    sanitizer
        .tags(tags)
        .url_schemes(schemes)
        .add_allowed_classes("p", &["block-img"])
        .link_rel(Some("noopener noreferrer"));
    sanitizer
});

/// Plain text of a rich-text body, nodes joined with a single space.
pub fn as_text(nodes: &[RichTextNode]) -> String {
    nodes
        .iter()
        .map(|n| n.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Renders a rich-text body to sanitized HTML. Consecutive list items are
/// grouped into one `<ul>`/`<ol>`.
pub fn as_html(nodes: &[RichTextNode]) -> String {
    SANITIZER.clean(&render_html(nodes)).to_string()
}

fn render_html(nodes: &[RichTextNode]) -> String {
    let mut html = String::new();
    let mut open_list: Option<&'static str> = None;

    for node in nodes {
        let list = match node.kind.as_str() {
            "list-item" => Some("ul"),
            "o-list-item" => Some("ol"),
            _ => None,
        };

        if open_list != list {
            if let Some(tag) = open_list {
                html.push_str(&format!("</{}>", tag));
            }
            if let Some(tag) = list {
                html.push_str(&format!("<{}>", tag));
            }
            open_list = list;
        }

        html.push_str(&render_node(node));
    }

    if let Some(tag) = open_list {
        html.push_str(&format!("</{}>", tag));
    }

    html
}

fn render_node(node: &RichTextNode) -> String {
    let inner = || render_spans(&node.text, &node.spans);
    match node.kind.as_str() {
        "heading1" | "heading2" | "heading3" | "heading4" | "heading5" | "heading6" => {
            let level = &node.kind["heading".len()..];
            format!("<h{}>{}</h{}>", level, inner(), level)
        }
        "list-item" | "o-list-item" => format!("<li>{}</li>", inner()),
        "preformatted" => format!("<pre>{}</pre>", inner()),
        "image" => match node.url {
            Some(ref url) => format!(
                r#"<p class="block-img"><img src="{}" alt="{}"></p>"#,
                escape(url),
                escape(node.alt.as_deref().unwrap_or(""))
            ),
            None => String::new(),
        },
        _ => format!("<p>{}</p>", inner()),
    }
}

fn open_tag(span: &Span) -> String {
    match span.kind.as_str() {
        "strong" => "<strong>".to_string(),
        "em" => "<em>".to_string(),
        "hyperlink" => match span.link_url() {
            Some(url) => format!(r#"<a href="{}">"#, escape(url)),
            None => "<a>".to_string(),
        },
        _ => String::new(),
    }
}

fn close_tag(span: &Span) -> &'static str {
    match span.kind.as_str() {
        "strong" => "</strong>",
        "em" => "</em>",
        "hyperlink" => "</a>",
        _ => "",
    }
}

/// Applies inline spans to `text`. Span offsets count UTF-16 code units, as
/// the content source reports them. Spans that overlap without nesting are
/// closed and reopened so the output stays well formed.
fn render_spans(text: &str, spans: &[Span]) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    let mut units = Vec::with_capacity(len);
    let mut offset = 0;
    for ch in &chars {
        units.push(offset);
        offset += ch.len_utf16();
    }
    let to_char = |unit: usize| units.partition_point(|&u| u < unit);

    let spans: Vec<Span> = spans
        .iter()
        .map(|s| Span {
            start: to_char(s.start),
            end: to_char(s.end),
            ..s.clone()
        })
        .collect();

    let mut ordered: Vec<&Span> = spans
        .iter()
        .filter(|s| s.start < s.end && s.start < len)
        .collect();
    ordered.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut out = String::new();
    let mut stack: Vec<&Span> = Vec::new();
    let mut pending = ordered.into_iter().peekable();

    for (pos, ch) in chars.iter().enumerate() {
        close_ending(&mut out, &mut stack, pos);

        while let Some(span) = pending.next_if(|s| s.start == pos) {
            out.push_str(&open_tag(span));
            stack.push(span);
        }

        push_escaped(&mut out, *ch);
    }

    close_ending(&mut out, &mut stack, len);
    while let Some(span) = stack.pop() {
        out.push_str(close_tag(span));
    }

    out
}

fn close_ending<'a>(out: &mut String, stack: &mut Vec<&'a Span>, pos: usize) {
    // Unwind from the outermost span ending here, then reopen the ones
    // still running.
    let Some(first_ending) = stack.iter().position(|s| s.end <= pos) else {
        return;
    };
    let unwound: Vec<&'a Span> = stack.drain(first_ending..).collect();
    for span in unwound.iter().rev() {
        out.push_str(close_tag(span));
    }
    for span in unwound {
        if span.end > pos {
            out.push_str(&open_tag(span));
            stack.push(span);
        }
    }
}

fn push_escaped(out: &mut String, ch: char) {
    match ch {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '"' => out.push_str("&quot;"),
        '\n' => out.push_str("<br>"),
        c => out.push(c),
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\n' => out.push('\n'),
            c => push_escaped(&mut out, c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize, kind: &str) -> Span {
        Span {
            start,
            end,
            kind: kind.to_string(),
            data: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_plain_paragraph_escaped() {
        let html = as_html(&[RichTextNode::paragraph("a < b & c")]);
        assert_eq!(html, "<p>a &lt; b &amp; c</p>");
    }

    #[test]
    fn test_nested_spans() {
        let mut node = RichTextNode::paragraph("bold and italic");
        node.spans = vec![span(0, 15, "strong"), span(9, 15, "em")];
        assert_eq!(
            as_html(&[node]),
            "<p><strong>bold and <em>italic</em></strong></p>"
        );
    }

    #[test]
    fn test_overlapping_spans_stay_well_formed() {
        let mut node = RichTextNode::paragraph("abcdef");
        node.spans = vec![span(0, 4, "strong"), span(2, 6, "em")];
        assert_eq!(
            as_html(&[node]),
            "<p><strong>ab<em>cd</em></strong><em>ef</em></p>"
        );
    }

    #[test]
    fn test_hyperlink_span() {
        let mut node = RichTextNode::paragraph("see docs");
        node.spans = vec![Span {
            start: 4,
            end: 8,
            kind: "hyperlink".into(),
            data: serde_json::json!({"link_type": "Web", "url": "https://example.com"}),
        }];
        assert_eq!(
            as_html(&[node]),
            r#"<p>see <a href="https://example.com" rel="noopener noreferrer">docs</a></p>"#
        );
    }

    #[test]
    fn test_script_links_are_stripped() {
        for url in ["javascript:alert(document.cookie)", "data:text/html,<script>x</script>"] {
            let mut node = RichTextNode::paragraph("click");
            node.spans = vec![Span {
                start: 0,
                end: 5,
                kind: "hyperlink".into(),
                data: serde_json::json!({ "link_type": "Web", "url": url }),
            }];

            let html = as_html(&[node]);

            assert!(!html.contains("href"), "kept {} in {}", url, html);
            assert!(html.contains("click"));
        }
    }

    #[test]
    fn test_image_with_script_src_dropped() {
        let node = RichTextNode {
            kind: "image".into(),
            url: Some("javascript:alert(1)".into()),
            alt: Some("x".into()),
            ..RichTextNode::paragraph("")
        };
        let html = as_html(&[node]);
        assert!(!html.contains("javascript"));
        assert!(html.contains(r#"class="block-img""#));
    }

    #[test]
    fn test_span_offsets_count_utf16_units() {
        // the rocket is two UTF-16 units but one char
        let mut node = RichTextNode::paragraph("\u{1F680} go");
        node.spans = vec![span(3, 5, "strong")];
        assert_eq!(as_html(&[node]), "<p>\u{1F680} <strong>go</strong></p>");
    }

    #[test]
    fn test_list_items_grouped() {
        let item = |t: &str, kind: &str| RichTextNode {
            kind: kind.into(),
            ..RichTextNode::paragraph(t)
        };
        let html = as_html(&[
            item("one", "list-item"),
            item("two", "list-item"),
            RichTextNode::paragraph("between"),
            item("first", "o-list-item"),
        ]);
        assert_eq!(
            html,
            "<ul><li>one</li><li>two</li></ul><p>between</p><ol><li>first</li></ol>"
        );
    }

    #[test]
    fn test_heading_level() {
        let node = RichTextNode {
            kind: "heading3".into(),
            ..RichTextNode::paragraph("Title")
        };
        assert_eq!(as_html(&[node]), "<h3>Title</h3>");
    }

    #[test]
    fn test_as_text_joins_with_space() {
        let nodes = vec![RichTextNode::paragraph("c d"), RichTextNode::paragraph("e")];
        assert_eq!(as_text(&nodes), "c d e");
    }
}
