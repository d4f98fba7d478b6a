use crate::services::detail::DetailAssembler;
use crate::source::ContentSource;
use crate::Config;
use anyhow::{bail, Result};
use std::sync::Arc;

pub async fn run(
    config: Config,
    source: Arc<dyn ContentSource>,
    uid: &str,
    content_ref: Option<&str>,
) -> Result<()> {
    let detail = DetailAssembler::new(
        source,
        &config.source.document_type,
        config.date_formatter(),
    );

    let view = match detail.assemble(uid, content_ref).await {
        Ok(view) => view,
        Err(e) if e.is_not_found() => bail!("Post '{}' not found", uid),
        Err(e) => return Err(e.into()),
    };

    println!("{}", view.post.title);
    println!("  by {} | {} | {} min", view.post.author, view.published_at, view.reading_time);
    if let Some(updated) = &view.updated_at {
        println!("  {}", updated);
    }
    println!("  {} content blocks", view.post.content.len());

    if let Some(prev) = &view.navigation.previous {
        println!("  previous: {} ({})", prev.title, prev.uid);
    }
    if let Some(next) = &view.navigation.next {
        println!("  next:     {} ({})", next.title, next.uid);
    }

    Ok(())
}
