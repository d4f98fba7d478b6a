//! Content source abstraction: the read-only query surface the listing and
//! detail flows are written against.

pub mod memory;
pub mod prismic;

pub use memory::MemorySource;
pub use prismic::PrismicClient;

use crate::models::{QueryResponse, RawDocument};
use async_trait::async_trait;
use thiserror::Error;

/// Ordering applied to every post query so paginated display order and the
/// full collection used for navigation agree.
pub const PUBLICATION_ORDER: &str = "[document.first_publication_date desc]";

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("content source unavailable: {0}")]
    Unavailable(String),
    #[error("no {doc_type} document with uid '{uid}'")]
    NotFound { doc_type: String, uid: String },
    #[error("malformed response from content source: {0}")]
    MalformedResponse(String),
}

impl SourceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::Unavailable(err.to_string())
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub page_size: usize,
    /// 1-based page number.
    pub page: u32,
    /// Pins the query to a specific content version (preview/release).
    pub content_ref: Option<String>,
    pub orderings: Option<String>,
}

impl QueryOptions {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            page: 1,
            content_ref: None,
            orderings: Some(PUBLICATION_ORDER.to_string()),
        }
    }

    pub fn with_ref(mut self, content_ref: Option<&str>) -> Self {
        self.content_ref = content_ref.map(str::to_string);
        self
    }
}

#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Returns one page of documents of the given type.
    async fn query(
        &self,
        doc_type: &str,
        options: &QueryOptions,
    ) -> Result<QueryResponse, SourceError>;

    /// Looks a single document up by uid. Fails with `NotFound` when absent.
    async fn get_by_uid(
        &self,
        doc_type: &str,
        uid: &str,
        content_ref: Option<&str>,
    ) -> Result<RawDocument, SourceError>;

    /// Follows a `next_page` cursor returned by an earlier query.
    async fn fetch_page(&self, cursor: &str) -> Result<QueryResponse, SourceError>;
}
