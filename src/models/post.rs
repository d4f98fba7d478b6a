use super::RawDocument;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSummary {
    pub uid: String,
    pub first_publication_date: Option<String>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

impl PostSummary {
    pub fn from_document(doc: &RawDocument) -> Self {
        Self {
            uid: doc.uid().to_string(),
            first_publication_date: doc.first_publication_date.clone(),
            title: text_field(&doc.data, "title"),
            subtitle: text_field(&doc.data, "subtitle"),
            author: text_field(&doc.data, "author"),
        }
    }
}

/// The listing payload handed to the index page: the posts loaded so far and
/// the cursor for the next batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostsPagination {
    pub results: Vec<PostSummary>,
    pub next_page: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    pub url: String,
    pub alt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub heading: String,
    pub body: Vec<RichTextNode>,
}

/// A structured-text node: a paragraph, heading, list item, preformatted
/// block or image, with inline spans addressed by character offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichTextNode {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub spans: Vec<Span>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

impl RichTextNode {
    pub fn paragraph(text: &str) -> Self {
        Self {
            kind: "paragraph".to_string(),
            text: text.to_string(),
            spans: Vec::new(),
            url: None,
            alt: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl Span {
    pub fn link_url(&self) -> Option<&str> {
        self.data.get("url").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPage {
    pub uid: String,
    pub first_publication_date: Option<String>,
    pub last_publication_date: Option<String>,
    pub title: String,
    pub banner: Banner,
    pub author: String,
    pub content: Vec<ContentBlock>,
}

impl PostPage {
    /// Projects a raw document into a post page. Content blocks whose body
    /// does not have the expected shape are dropped with a warning instead of
    /// failing the whole page.
    pub fn from_document(doc: &RawDocument) -> Self {
        let banner = doc
            .data
            .get("banner")
            .map(|b| Banner {
                url: b.get("url").and_then(Value::as_str).unwrap_or_default().to_string(),
                alt: b.get("alt").and_then(Value::as_str).map(str::to_string),
            })
            .unwrap_or_default();

        let content = doc
            .data
            .get("content")
            .and_then(Value::as_array)
            .map(|blocks| {
                blocks
                    .iter()
                    .enumerate()
                    .filter_map(|(i, block)| parse_block(doc.uid(), i, block))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            uid: doc.uid().to_string(),
            first_publication_date: doc.first_publication_date.clone(),
            last_publication_date: doc.last_publication_date.clone(),
            title: text_field(&doc.data, "title"),
            banner,
            author: text_field(&doc.data, "author"),
            content,
        }
    }
}

fn parse_block(uid: &str, index: usize, block: &Value) -> Option<ContentBlock> {
    if !block.is_object() {
        tracing::warn!("Post '{}': content block {} is not an object, skipping", uid, index);
        return None;
    }

    let body = match block.get("body") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(nodes)) => nodes
            .iter()
            .filter_map(|node| match serde_json::from_value::<RichTextNode>(node.clone()) {
                Ok(n) => Some(n),
                Err(e) => {
                    tracing::warn!("Post '{}': dropping malformed rich text node: {}", uid, e);
                    None
                }
            })
            .collect(),
        Some(_) => {
            tracing::warn!("Post '{}': content block {} has a non-array body, skipping", uid, index);
            return None;
        }
    };

    Some(ContentBlock {
        heading: text_field(block, "heading"),
        body,
    })
}

/// Reads a text-like field: a plain string, or a structured-text array whose
/// node texts are joined with spaces. Anything else reads as empty.
pub(crate) fn text_field(data: &Value, key: &str) -> String {
    match data.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(nodes)) => nodes
            .iter()
            .filter_map(|n| n.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(" "),
        _ => String::new(),
    }
}

/// Neighbours of a post in the full, publication-ordered collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Navigation {
    pub previous: Option<PostPage>,
    pub next: Option<PostPage>,
}
