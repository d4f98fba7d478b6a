use crate::services::listing::{ListingLoader, ListingState};
use crate::source::ContentSource;
use crate::Config;
use anyhow::Result;
use std::sync::Arc;

pub async fn run(
    config: Config,
    source: Arc<dyn ContentSource>,
    all: bool,
    content_ref: Option<&str>,
) -> Result<()> {
    let loader = ListingLoader::new(
        source,
        &config.source.document_type,
        config.source.page_size,
    );
    let dates = config.date_formatter();

    let state = if all {
        loader.load_all(content_ref).await?
    } else {
        ListingState::new(loader.load_initial(content_ref).await?)
    };

    if state.posts.is_empty() {
        println!("No posts found.");
        return Ok(());
    }

    println!("{:<30} {:<14} {:<20} TITLE", "UID", "PUBLISHED", "AUTHOR");
    println!("{}", "-".repeat(90));
    for post in &state.posts {
        println!(
            "{:<30} {:<14} {:<20} {}",
            post.uid,
            dates.format_date(post.first_publication_date.as_deref()),
            post.author,
            post.title
        );
    }

    if let Some(next) = &state.next_page {
        println!();
        println!("More posts available: {}", next);
    }

    Ok(())
}
