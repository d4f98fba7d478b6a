//! Post listing: the first page fetched at build time and the "load more"
//! pages appended afterwards.

use crate::models::{PostSummary, PostsPagination, QueryResponse};
use crate::source::{ContentSource, QueryOptions, SourceError};
use std::collections::HashSet;
use std::sync::Arc;

pub struct ListingLoader {
    source: Arc<dyn ContentSource>,
    doc_type: String,
    page_size: usize,
}

impl ListingLoader {
    pub fn new(source: Arc<dyn ContentSource>, doc_type: &str, page_size: usize) -> Self {
        Self {
            source,
            doc_type: doc_type.to_string(),
            page_size,
        }
    }

    pub async fn load_initial(
        &self,
        content_ref: Option<&str>,
    ) -> Result<PostsPagination, SourceError> {
        let options = QueryOptions::new(self.page_size).with_ref(content_ref);
        let response = self.source.query(&self.doc_type, &options).await?;
        tracing::debug!(
            "Loaded {} of {} posts",
            response.results.len(),
            response.total_results_size
        );
        Ok(to_pagination(response))
    }

    pub async fn load_more(&self, cursor: &str) -> Result<PostsPagination, SourceError> {
        let response = self.source.fetch_page(cursor).await?;
        Ok(to_pagination(response))
    }

    /// Runs one load-more round trip against `state`. On failure the
    /// returned state has the same posts and cursor as before, with the busy
    /// flag cleared so the caller can retry.
    pub async fn advance(
        &self,
        state: &ListingState,
    ) -> Result<ListingState, (ListingState, SourceError)> {
        let Some((loading, cursor)) = state.begin_load() else {
            return Ok(state.clone());
        };

        match self.load_more(&cursor).await {
            Ok(page) => Ok(loading.complete(page)),
            Err(e) => {
                tracing::warn!("Error fetching more posts: {}", e);
                Err((loading.fail(), e))
            }
        }
    }

    /// Loads the first page and follows cursors until the collection is
    /// exhausted.
    pub async fn load_all(&self, content_ref: Option<&str>) -> Result<ListingState, SourceError> {
        let mut state = ListingState::new(self.load_initial(content_ref).await?);
        while state.has_more() {
            state = self.advance(&state).await.map_err(|(_, e)| e)?;
        }
        Ok(state)
    }
}

fn to_pagination(response: QueryResponse) -> PostsPagination {
    PostsPagination {
        results: response
            .results
            .iter()
            .map(PostSummary::from_document)
            .collect(),
        next_page: response.next_page,
    }
}

/// The listing as one view holds it. Transitions return a new state and
/// never modify the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingState {
    pub posts: Vec<PostSummary>,
    pub next_page: Option<String>,
    pub loading: bool,
}

impl ListingState {
    pub fn new(initial: PostsPagination) -> Self {
        Self {
            posts: initial.results,
            next_page: initial.next_page,
            loading: false,
        }
    }

    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }

    /// Marks the listing busy and hands out the cursor to fetch. `None` when
    /// a load is already outstanding or there is nothing left to load.
    pub fn begin_load(&self) -> Option<(Self, String)> {
        if self.loading {
            return None;
        }
        let cursor = self.next_page.clone()?;
        let next = Self {
            loading: true,
            ..self.clone()
        };
        Some((next, cursor))
    }

    pub fn complete(&self, page: PostsPagination) -> Self {
        let mut seen: HashSet<String> = self.posts.iter().map(|p| p.uid.clone()).collect();
        let mut posts = self.posts.clone();
        for post in page.results {
            if seen.insert(post.uid.clone()) {
                posts.push(post);
            }
        }

        Self {
            posts,
            next_page: page.next_page,
            loading: false,
        }
    }

    pub fn fail(&self) -> Self {
        Self {
            loading: false,
            ..self.clone()
        }
    }
}
