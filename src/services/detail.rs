use crate::models::{ContentBlock, Navigation, PostPage};
use crate::services::dates::DateFormatter;
use crate::services::richtext;
use crate::source::{ContentSource, QueryOptions, SourceError};
use serde::Serialize;
use std::sync::Arc;

pub const WORDS_PER_MINUTE: usize = 200;

/// Page size used when walking the whole collection for navigation.
const COLLECTION_PAGE_SIZE: usize = 100;

/// Everything a post page renders.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub post: PostPage,
    pub published_at: String,
    pub updated_at: Option<String>,
    pub reading_time: u32,
    pub navigation: Navigation,
    pub preview: bool,
}

pub struct DetailAssembler {
    source: Arc<dyn ContentSource>,
    doc_type: String,
    dates: DateFormatter,
}

impl DetailAssembler {
    pub fn new(source: Arc<dyn ContentSource>, doc_type: &str, dates: DateFormatter) -> Self {
        Self {
            source,
            doc_type: doc_type.to_string(),
            dates,
        }
    }

    pub async fn load_post(
        &self,
        uid: &str,
        content_ref: Option<&str>,
    ) -> Result<PostPage, SourceError> {
        let doc = self
            .source
            .get_by_uid(&self.doc_type, uid, content_ref)
            .await?;
        Ok(PostPage::from_document(&doc))
    }

    /// Fetches the whole collection in publication order and returns the
    /// neighbours of `uid`. A uid missing from the collection (an unpublished
    /// preview, say) has no neighbours.
    pub async fn compute_navigation(
        &self,
        uid: &str,
        content_ref: Option<&str>,
    ) -> Result<Navigation, SourceError> {
        let posts = self.load_collection(content_ref).await?;
        if !posts.iter().any(|p| p.uid == uid) {
            tracing::warn!("Post '{}' is not in the published collection", uid);
        }
        Ok(navigation_for(uid, &posts))
    }

    pub async fn load_collection(
        &self,
        content_ref: Option<&str>,
    ) -> Result<Vec<PostPage>, SourceError> {
        let options = QueryOptions::new(COLLECTION_PAGE_SIZE).with_ref(content_ref);
        let mut response = self.source.query(&self.doc_type, &options).await?;
        let mut posts: Vec<PostPage> = response.results.iter().map(PostPage::from_document).collect();

        while let Some(cursor) = response.next_page.take() {
            response = self.source.fetch_page(&cursor).await?;
            posts.extend(response.results.iter().map(PostPage::from_document));
        }

        Ok(posts)
    }

    pub async fn assemble(
        &self,
        uid: &str,
        content_ref: Option<&str>,
    ) -> Result<PostView, SourceError> {
        let post = self.load_post(uid, content_ref).await?;
        let navigation = self.compute_navigation(uid, content_ref).await?;

        Ok(PostView {
            published_at: self.dates.format_date(post.first_publication_date.as_deref()),
            updated_at: self
                .dates
                .format_updated_at(post.last_publication_date.as_deref()),
            reading_time: estimate_reading_time(&post.content),
            navigation,
            preview: content_ref.is_some(),
            post,
        })
    }
}

/// Minutes to read `content` at 200 words per minute, rounded up.
pub fn estimate_reading_time(content: &[ContentBlock]) -> u32 {
    let words: usize = content
        .iter()
        .map(|block| {
            block.heading.split_whitespace().count()
                + richtext::as_text(&block.body).split_whitespace().count()
        })
        .sum();

    words.div_ceil(WORDS_PER_MINUTE) as u32
}

pub fn navigation_for(uid: &str, posts: &[PostPage]) -> Navigation {
    let Some(index) = posts.iter().position(|p| p.uid == uid) else {
        return Navigation::default();
    };

    Navigation {
        previous: index.checked_sub(1).and_then(|i| posts.get(i)).cloned(),
        next: posts.get(index + 1).cloned(),
    }
}
