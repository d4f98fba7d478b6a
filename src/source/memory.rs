//! In-memory content source backed by a fixed list of documents, served in
//! the order given. Cursors use the `memory://` scheme.

use super::{ContentSource, QueryOptions, SourceError};
use crate::models::{QueryResponse, RawDocument};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use url::Url;

#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    documents: Vec<RawDocument>,
    releases: HashMap<String, Vec<RawDocument>>,
}

impl MemorySource {
    pub fn new(documents: Vec<RawDocument>) -> Self {
        Self {
            documents,
            releases: HashMap::new(),
        }
    }

    /// Loads a JSON array of documents.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read fixture '{}'", path.display()))?;
        let documents: Vec<RawDocument> = serde_json::from_str(&raw)
            .with_context(|| format!("Fixture '{}' is not a JSON array of documents", path.display()))?;
        tracing::info!("Loaded {} documents from {}", documents.len(), path.display());
        Ok(Self::new(documents))
    }

    /// Registers the document set visible under a content reference, as a
    /// preview release would be.
    pub fn with_release(mut self, content_ref: &str, documents: Vec<RawDocument>) -> Self {
        self.releases.insert(content_ref.to_string(), documents);
        self
    }

    fn documents_for(&self, content_ref: Option<&str>) -> &[RawDocument] {
        content_ref
            .and_then(|r| self.releases.get(r))
            .unwrap_or(&self.documents)
    }

    fn page_of(
        &self,
        doc_type: &str,
        page: u32,
        page_size: usize,
        content_ref: Option<&str>,
    ) -> QueryResponse {
        let matching: Vec<&RawDocument> = self
            .documents_for(content_ref)
            .iter()
            .filter(|d| d.doc_type == doc_type)
            .collect();

        let page_size = page_size.max(1);
        let page = page.max(1);
        let total = matching.len();
        let total_pages = total.div_ceil(page_size);
        let offset = (page as usize - 1) * page_size;

        let results: Vec<RawDocument> = matching
            .into_iter()
            .skip(offset)
            .take(page_size)
            .cloned()
            .collect();

        let next_page = ((page as usize) < total_pages)
            .then(|| cursor(doc_type, page + 1, page_size, content_ref));

        QueryResponse {
            page,
            total_pages: total_pages as u32,
            results_size: results.len() as u32,
            total_results_size: total as u32,
            next_page,
            results,
        }
    }
}

fn cursor(doc_type: &str, page: u32, page_size: usize, content_ref: Option<&str>) -> String {
    let mut url = format!("memory://{}?page={}&pageSize={}", doc_type, page, page_size);
    if let Some(r) = content_ref {
        url.push_str("&ref=");
        url.push_str(r);
    }
    url
}

#[async_trait]
impl ContentSource for MemorySource {
    async fn query(
        &self,
        doc_type: &str,
        options: &QueryOptions,
    ) -> Result<QueryResponse, SourceError> {
        Ok(self.page_of(
            doc_type,
            options.page,
            options.page_size,
            options.content_ref.as_deref(),
        ))
    }

    async fn get_by_uid(
        &self,
        doc_type: &str,
        uid: &str,
        content_ref: Option<&str>,
    ) -> Result<RawDocument, SourceError> {
        self.documents_for(content_ref)
            .iter()
            .find(|d| d.doc_type == doc_type && d.uid() == uid)
            .cloned()
            .ok_or_else(|| SourceError::NotFound {
                doc_type: doc_type.to_string(),
                uid: uid.to_string(),
            })
    }

    async fn fetch_page(&self, cursor: &str) -> Result<QueryResponse, SourceError> {
        let url = Url::parse(cursor)
            .map_err(|e| SourceError::MalformedResponse(format!("invalid cursor: {}", e)))?;
        if url.scheme() != "memory" {
            return Err(SourceError::MalformedResponse(format!(
                "cursor '{}' does not belong to this source",
                cursor
            )));
        }

        let doc_type = url.host_str().unwrap_or_default().to_string();
        let mut page = 1;
        let mut page_size = 20;
        let mut content_ref = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "page" => page = value.parse().unwrap_or(1),
                "pageSize" => page_size = value.parse().unwrap_or(20),
                "ref" => content_ref = Some(value.into_owned()),
                _ => {}
            }
        }

        Ok(self.page_of(&doc_type, page, page_size, content_ref.as_deref()))
    }
}
