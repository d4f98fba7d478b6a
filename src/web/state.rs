use crate::services::dates::DateFormatter;
use crate::services::detail::DetailAssembler;
use crate::services::listing::ListingLoader;
use crate::source::ContentSource;
use crate::web::cache::PageCache;
use crate::Config;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tera::{Tera, Value};

pub struct AppState {
    pub config: Config,
    pub source: Arc<dyn ContentSource>,
    pub templates: Tera,
    pub listing: ListingLoader,
    pub detail: DetailAssembler,
    pub dates: DateFormatter,
    pub cache: PageCache,
}

impl AppState {
    pub fn new(config: Config, source: Arc<dyn ContentSource>) -> Result<Self> {
        let dates = config.date_formatter();

        let mut templates = Tera::default();
        templates.register_filter(
            "format_date",
            move |value: &Value, args: &HashMap<String, Value>| {
                format_date_filter(&dates, value, args)
            },
        );
        templates.add_raw_templates(vec![
            ("css/bundle.css", include_str!("../../templates/css/bundle.css")),
            ("base.html", include_str!("../../templates/base.html")),
            ("public/index.html", include_str!("../../templates/public/index.html")),
            ("public/post.html", include_str!("../../templates/public/post.html")),
            ("public/fallback.html", include_str!("../../templates/public/fallback.html")),
            ("public/404.html", include_str!("../../templates/public/404.html")),
        ])?;

        let doc_type = config.source.document_type.clone();
        let listing = ListingLoader::new(source.clone(), &doc_type, config.source.page_size);
        let detail = DetailAssembler::new(source.clone(), &doc_type, dates);

        Ok(Self {
            config,
            source,
            templates,
            listing,
            detail,
            dates,
            cache: PageCache::new(),
        })
    }
}

fn format_date_filter(
    dates: &DateFormatter,
    value: &Value,
    args: &HashMap<String, Value>,
) -> tera::Result<Value> {
    let timestamp = match value {
        Value::Null => None,
        Value::String(s) => Some(s.as_str()),
        _ => return Err(tera::Error::msg("format_date requires a string or null")),
    };

    let with_time = args
        .get("time")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    let formatted = if with_time {
        dates.format_date_time(timestamp)
    } else {
        dates.format_date(timestamp)
    };
    Ok(Value::String(formatted))
}
