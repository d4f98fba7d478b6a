use async_trait::async_trait;
use serde_json::json;
use spacetraveling::models::{QueryResponse, RawDocument};
use spacetraveling::services::listing::{ListingLoader, ListingState};
use spacetraveling::source::{ContentSource, MemorySource, QueryOptions, SourceError};
use spacetraveling::Config;
use std::sync::Arc;

const CONFIG: &str = r#"
[site]
title = "spacetraveling"

[source]
endpoint = "https://spacetraveling.cdn.prismic.io/api/v2"
page_size = 2

[comments]
repo = "owner/repo"
"#;

fn test_config() -> Config {
    Config::parse(CONFIG).expect("Failed to parse test config")
}

fn post_doc(uid: &str, title: &str, published: &str, words: usize) -> RawDocument {
    let body = vec!["palavra"; words].join(" ");
    serde_json::from_value(json!({
        "id": format!("id-{}", uid),
        "uid": uid,
        "type": "posts",
        "first_publication_date": published,
        "last_publication_date": published,
        "data": {
            "title": title,
            "subtitle": format!("Subtitle of {}", title),
            "author": "Danilo Vieira",
            "banner": { "url": format!("https://images.example.com/{}.png", uid), "alt": null },
            "content": [
                {
                    "heading": "Introduction",
                    "body": [{ "type": "paragraph", "text": body, "spans": [] }]
                }
            ]
        }
    }))
    .expect("Failed to build test document")
}

/// Newest first, as the content source orders them.
fn sample_posts() -> Vec<RawDocument> {
    vec![
        post_doc("mars-landing", "Mars Landing", "2021-04-10T12:00:00+0000", 450),
        post_doc("lunar-base", "Lunar Base", "2021-03-25T19:25:28+0000", 120),
        post_doc("orbital-mechanics", "Orbital Mechanics", "2021-03-01T08:00:00+0000", 30),
        post_doc("launch-day", "Launch Day", "2021-02-14T10:00:00+0000", 5),
        post_doc("first-steps", "First Steps", "2021-01-02T09:00:00+0000", 200),
    ]
}

/// Wraps a source and fails every cursor fetch.
struct FailingPages {
    inner: MemorySource,
}

#[async_trait]
impl ContentSource for FailingPages {
    async fn query(
        &self,
        doc_type: &str,
        options: &QueryOptions,
    ) -> Result<QueryResponse, SourceError> {
        self.inner.query(doc_type, options).await
    }

    async fn get_by_uid(
        &self,
        doc_type: &str,
        uid: &str,
        content_ref: Option<&str>,
    ) -> Result<RawDocument, SourceError> {
        self.inner.get_by_uid(doc_type, uid, content_ref).await
    }

    async fn fetch_page(&self, _cursor: &str) -> Result<QueryResponse, SourceError> {
        Err(SourceError::Unavailable("connection reset".to_string()))
    }
}

mod listing_integration_tests {
    use super::*;

    fn loader(source: Arc<dyn ContentSource>, page_size: usize) -> ListingLoader {
        ListingLoader::new(source, "posts", page_size)
    }

    #[tokio::test]
    async fn test_initial_page() {
        let listing = loader(Arc::new(MemorySource::new(sample_posts())), 2);

        let page = listing.load_initial(None).await.expect("Failed to load");

        let uids: Vec<_> = page.results.iter().map(|p| p.uid.as_str()).collect();
        assert_eq!(uids, vec!["mars-landing", "lunar-base"]);
        assert!(page.next_page.is_some());
        assert_eq!(page.results[0].author, "Danilo Vieira");
    }

    #[tokio::test]
    async fn test_load_more_until_exhausted() {
        let listing = loader(Arc::new(MemorySource::new(sample_posts())), 2);

        let mut state = ListingState::new(listing.load_initial(None).await.unwrap());
        let mut rounds = 0;
        while state.has_more() {
            state = listing.advance(&state).await.expect("Load more failed");
            rounds += 1;
        }

        assert_eq!(rounds, 2);
        assert!(!state.loading);
        let uids: Vec<_> = state.posts.iter().map(|p| p.uid.clone()).collect();
        let expected: Vec<_> = sample_posts().iter().map(|d| d.uid().to_string()).collect();
        assert_eq!(uids, expected);
    }

    #[tokio::test]
    async fn test_load_all_matches_full_collection() {
        let listing = loader(Arc::new(MemorySource::new(sample_posts())), 1);

        let state = listing.load_all(None).await.unwrap();

        assert_eq!(state.posts.len(), 5);
        assert!(state.next_page.is_none());
    }

    #[tokio::test]
    async fn test_failed_load_more_keeps_listing() {
        let source = FailingPages {
            inner: MemorySource::new(sample_posts()),
        };
        let listing = loader(Arc::new(source), 2);

        let state = ListingState::new(listing.load_initial(None).await.unwrap());
        let (after, err) = listing.advance(&state).await.unwrap_err();

        assert!(matches!(err, SourceError::Unavailable(_)));
        assert_eq!(after, state);
        assert!(!after.loading);
        assert!(after.begin_load().is_some(), "retry should be possible");
    }

    #[tokio::test]
    async fn test_empty_collection() {
        let listing = loader(Arc::new(MemorySource::new(Vec::new())), 2);

        let page = listing.load_initial(None).await.unwrap();

        assert!(page.results.is_empty());
        assert!(page.next_page.is_none());
    }

    #[tokio::test]
    async fn test_other_document_types_are_ignored() {
        let mut docs = sample_posts();
        let mut page_doc = post_doc("about", "About", "2021-05-01T00:00:00+0000", 10);
        page_doc.doc_type = "page".to_string();
        docs.insert(0, page_doc);
        let listing = loader(Arc::new(MemorySource::new(docs)), 10);

        let page = listing.load_initial(None).await.unwrap();

        assert_eq!(page.results.len(), 5);
        assert!(page.results.iter().all(|p| p.uid != "about"));
    }

    #[tokio::test]
    async fn test_foreign_cursor_rejected() {
        let listing = loader(Arc::new(MemorySource::new(sample_posts())), 2);

        let err = listing
            .load_more("https://evil.example.com/api/v2/documents/search?page=2")
            .await
            .unwrap_err();

        assert!(matches!(err, SourceError::MalformedResponse(_)));
    }
}

mod detail_integration_tests {
    use super::*;
    use spacetraveling::services::dates::DateFormatter;
    use spacetraveling::services::detail::DetailAssembler;

    fn assembler(source: MemorySource) -> DetailAssembler {
        DetailAssembler::new(Arc::new(source), "posts", DateFormatter::default())
    }

    #[tokio::test]
    async fn test_assemble_post() {
        let detail = assembler(MemorySource::new(sample_posts()));

        let view = detail.assemble("lunar-base", None).await.expect("Failed to assemble");

        assert_eq!(view.post.title, "Lunar Base");
        assert_eq!(view.published_at, "25 mar 2021");
        assert_eq!(
            view.updated_at.as_deref(),
            Some("editado em 25 mar 2021, às 19:25")
        );
        // 120 body words plus the one-word heading
        assert_eq!(view.reading_time, 1);
        assert!(!view.preview);
        assert_eq!(view.navigation.previous.unwrap().uid, "mars-landing");
        assert_eq!(view.navigation.next.unwrap().uid, "orbital-mechanics");
    }

    #[tokio::test]
    async fn test_reading_time_rounds_up() {
        let detail = assembler(MemorySource::new(sample_posts()));

        let view = detail.assemble("mars-landing", None).await.unwrap();

        assert_eq!(view.reading_time, 3);
        assert!(view.navigation.previous.is_none());
    }

    #[tokio::test]
    async fn test_navigation_spans_many_pages() {
        let docs: Vec<RawDocument> = (0..250)
            .map(|i| post_doc(&format!("post-{}", i), "Post", "2021-01-01T00:00:00+0000", 1))
            .collect();
        let detail = assembler(MemorySource::new(docs));

        let nav = detail.compute_navigation("post-200", None).await.unwrap();

        assert_eq!(nav.previous.unwrap().uid, "post-199");
        assert_eq!(nav.next.unwrap().uid, "post-201");
    }

    #[tokio::test]
    async fn test_unknown_uid_is_not_found() {
        let detail = assembler(MemorySource::new(sample_posts()));

        let err = detail.assemble("missing", None).await.unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_preview_ref_reads_release() {
        let draft = post_doc("draft-post", "Draft", "2021-06-01T00:00:00+0000", 10);
        let mut release = sample_posts();
        release.insert(0, draft);
        let source = MemorySource::new(sample_posts()).with_release("preview-ref", release);
        let detail = assembler(source);

        assert!(detail.assemble("draft-post", None).await.is_err());
        let view = detail.assemble("draft-post", Some("preview-ref")).await.unwrap();
        assert!(view.preview);
        assert_eq!(view.navigation.next.unwrap().uid, "mars-landing");
    }
}

mod web_integration_tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use spacetraveling::web::cache::NOT_FOUND_CAPACITY;
    use spacetraveling::web::{self, AppState, Lookup, PageKey};
    use std::time::Duration;
    use tower::ServiceExt;

    fn app_state(source: MemorySource) -> Arc<AppState> {
        Arc::new(AppState::new(test_config(), Arc::new(source)).expect("Failed to build state"))
    }

    async fn get(state: &Arc<AppState>, uri: &str) -> (StatusCode, axum::http::HeaderMap, String) {
        get_with(state, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
    }

    async fn get_with(
        state: &Arc<AppState>,
        request: Request<Body>,
    ) -> (StatusCode, axum::http::HeaderMap, String) {
        let app = web::router(state.clone()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, String::from_utf8(body.to_vec()).unwrap())
    }

    async fn wait_for_generation(state: &Arc<AppState>, path: &str) {
        for _ in 0..100 {
            if !state.cache.is_generating(path) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("generation of {} did not finish", path);
    }

    #[tokio::test]
    async fn test_index_lists_first_page() {
        let state = app_state(MemorySource::new(sample_posts()));

        let (status, headers, body) = get(&state, "/").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Mars Landing"));
        assert!(body.contains("Lunar Base"));
        assert!(!body.contains("Orbital Mechanics"));
        assert!(body.contains("id=\"load-more\""));
        assert!(body.contains("10 abr 2021"));
        assert!(headers.contains_key(header::CONTENT_SECURITY_POLICY));
    }

    #[tokio::test]
    async fn test_index_without_more_posts_has_no_button() {
        let state = app_state(MemorySource::new(sample_posts()[..2].to_vec()));

        let (_, _, body) = get(&state, "/").await;

        assert!(!body.contains("id=\"load-more\""));
    }

    #[tokio::test]
    async fn test_index_is_cached() {
        let state = app_state(MemorySource::new(sample_posts()));

        get(&state, "/").await;

        assert!(matches!(
            state.cache.lookup("/", Duration::from_secs(60)),
            Lookup::Fresh(_)
        ));
    }

    #[tokio::test]
    async fn test_prerendered_post() {
        let state = app_state(MemorySource::new(sample_posts()));
        let count = web::prerender(&state).await.expect("Prerender failed");
        assert_eq!(count, 3);

        let (status, _, body) = get(&state, "/post/lunar-base").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Lunar Base"));
        assert!(body.contains("1 min"));
        assert!(body.contains("editado em 25 mar 2021, às 19:25"));
        assert!(body.contains("href=\"/post/mars-landing\""));
        assert!(body.contains("href=\"/post/orbital-mechanics\""));
        assert!(body.contains("utteranc.es/client.js"));
    }

    #[tokio::test]
    async fn test_uncached_post_gets_fallback_then_page() {
        let state = app_state(MemorySource::new(sample_posts()));

        let (status, headers, body) = get(&state, "/post/first-steps").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "no-store");
        assert!(body.contains("http-equiv=\"refresh\""));

        wait_for_generation(&state, "/post/first-steps").await;

        let (status, _, body) = get(&state, "/post/first-steps").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("First Steps"));
        assert!(!body.contains("http-equiv=\"refresh\""));
    }

    #[tokio::test]
    async fn test_unknown_post_ends_as_not_found() {
        let state = app_state(MemorySource::new(sample_posts()));

        get(&state, "/post/nowhere").await;
        wait_for_generation(&state, "/post/nowhere").await;

        let (status, _, body) = get(&state, "/post/nowhere").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Post não encontrado"));
    }

    #[tokio::test]
    async fn test_unknown_uids_do_not_grow_cache_unbounded() {
        let state = app_state(MemorySource::new(Vec::new()));
        let requests = NOT_FOUND_CAPACITY + 50;

        for i in 0..requests {
            let path = format!("/post/junk-{}", i);
            get(&state, &path).await;
            wait_for_generation(&state, &path).await;
        }

        assert_eq!(state.cache.len(), NOT_FOUND_CAPACITY);
    }

    #[tokio::test]
    async fn test_rendered_post_drops_script_links() {
        let mut doc = post_doc("unsafe-link", "Unsafe Link", "2021-01-01T00:00:00+0000", 1);
        doc.data["content"] = json!([{
            "heading": "Links",
            "body": [{
                "type": "paragraph",
                "text": "click here",
                "spans": [{
                    "start": 0,
                    "end": 5,
                    "type": "hyperlink",
                    "data": { "link_type": "Web", "url": "javascript:alert(document.cookie)" }
                }]
            }]
        }]);
        let state = app_state(MemorySource::new(vec![doc]));

        let (status, _, body) = get(&state, "/post/unsafe-link?ref=master").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("click"));
        assert!(!body.contains("javascript:"));
    }

    #[tokio::test]
    async fn test_preview_bypasses_cache() {
        let draft = post_doc("draft-post", "Secret Draft", "2021-06-01T00:00:00+0000", 10);
        let source = MemorySource::new(sample_posts()).with_release("preview-ref", vec![draft]);
        let state = app_state(source);

        let (status, headers, body) = get(&state, "/post/draft-post?ref=preview-ref").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Secret Draft"));
        assert!(body.contains("Sair do modo Preview"));
        assert_eq!(
            headers.get(header::CACHE_CONTROL).unwrap(),
            "private, no-store"
        );
        assert!(state.cache.is_empty());
        assert!(!state.cache.is_generating(&PageKey::Post("draft-post".into()).path()));
    }

    #[tokio::test]
    async fn test_preview_cookie() {
        let draft = post_doc("draft-post", "Secret Draft", "2021-06-01T00:00:00+0000", 10);
        let source = MemorySource::new(sample_posts()).with_release("preview-ref", vec![draft]);
        let state = app_state(source);

        let request = Request::builder()
            .uri("/")
            .header(header::COOKIE, "io.prismic.preview=preview-ref")
            .body(Body::empty())
            .unwrap();
        let (_, _, body) = get_with(&state, request).await;

        assert!(body.contains("Secret Draft"));
        assert!(!body.contains("Mars Landing"));
    }

    #[tokio::test]
    async fn test_exit_preview_clears_cookie() {
        let state = app_state(MemorySource::new(sample_posts()));

        let request = Request::builder()
            .uri("/api/exit-preview")
            .header(header::COOKIE, "io.prismic.preview=preview-ref")
            .body(Body::empty())
            .unwrap();
        let (status, headers, _) = get_with(&state, request).await;

        assert!(status.is_redirection());
        assert_eq!(headers.get(header::LOCATION).unwrap(), "/");
        let cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("io.prismic.preview="));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let state = app_state(MemorySource::new(sample_posts()));

        let (status, _, _) = get(&state, "/nothing/here").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

mod prismic_integration_tests {
    use super::*;
    use axum::extract::{Query, State};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::Value;
    use spacetraveling::source::PrismicClient;
    use std::collections::HashMap;

    /// Serves the subset of the REST API the client uses, with page size 2.
    async fn fake_prismic(docs: Vec<RawDocument>) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/api/v2", listener.local_addr().unwrap());

        let api = Router::new()
            .route(
                "/api/v2",
                get(|| async {
                    Json(json!({
                        "refs": [
                            { "id": "release", "ref": "release-ref", "isMasterRef": false },
                            { "id": "master", "ref": "master-ref", "isMasterRef": true }
                        ]
                    }))
                }),
            )
            .route("/api/v2/documents/search", get(search))
            .with_state((Arc::new(docs), base.clone()));

        tokio::spawn(async move {
            axum::serve(listener, api).await.unwrap();
        });

        base
    }

    async fn search(
        State((docs, base)): State<(Arc<Vec<RawDocument>>, String)>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Result<Json<Value>, axum::http::StatusCode> {
        if params.get("ref").map(String::as_str) != Some("master-ref") {
            return Err(axum::http::StatusCode::BAD_REQUEST);
        }

        let q = params.get("q").cloned().unwrap_or_default();
        let matching: Vec<&RawDocument> = if let Some(rest) = q.strip_prefix("[[at(my.posts.uid,\"") {
            let uid = rest.trim_end_matches("\")]]");
            docs.iter().filter(|d| d.uid() == uid).collect()
        } else {
            docs.iter().collect()
        };

        let page: usize = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
        let page_size: usize = params
            .get("pageSize")
            .and_then(|p| p.parse().ok())
            .unwrap_or(20);
        let total_pages = matching.len().div_ceil(page_size);
        let results: Vec<&RawDocument> = matching
            .iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .copied()
            .collect();
        let next_page = (page < total_pages).then(|| {
            format!(
                "{}/documents/search?ref=master-ref&q={}&page={}&pageSize={}",
                base,
                url::form_urlencoded::byte_serialize(q.as_bytes()).collect::<String>(),
                page + 1,
                page_size
            )
        });

        Ok(Json(json!({
            "page": page,
            "results_per_page": page_size,
            "results_size": results.len(),
            "total_results_size": matching.len(),
            "total_pages": total_pages,
            "next_page": next_page,
            "prev_page": null,
            "results": results,
        })))
    }

    #[tokio::test]
    async fn test_query_and_follow_cursor() {
        let base = fake_prismic(sample_posts()).await;
        let client = PrismicClient::new(&base, None).unwrap();

        let first = client.query("posts", &QueryOptions::new(2)).await.unwrap();
        assert_eq!(first.results.len(), 2);
        assert_eq!(first.total_results_size, 5);
        let cursor = first.next_page.expect("expected a next page");

        let second = client.fetch_page(&cursor).await.unwrap();
        assert_eq!(second.page, 2);
        assert_eq!(second.results[0].uid(), "orbital-mechanics");
    }

    #[tokio::test]
    async fn test_listing_through_client() {
        let base = fake_prismic(sample_posts()).await;
        let client: Arc<dyn ContentSource> = Arc::new(PrismicClient::new(&base, None).unwrap());
        let listing = ListingLoader::new(client, "posts", 2);

        let state = listing.load_all(None).await.unwrap();

        assert_eq!(state.posts.len(), 5);
        assert_eq!(state.posts[4].uid, "first-steps");
    }

    #[tokio::test]
    async fn test_get_by_uid() {
        let base = fake_prismic(sample_posts()).await;
        let client = PrismicClient::new(&base, None).unwrap();

        let doc = client.get_by_uid("posts", "launch-day", None).await.unwrap();
        assert_eq!(doc.uid(), "launch-day");

        let err = client.get_by_uid("posts", "missing", None).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_unknown_ref_is_unavailable() {
        let base = fake_prismic(sample_posts()).await;
        let client = PrismicClient::new(&base, None).unwrap();

        let err = client
            .query("posts", &QueryOptions::new(2).with_ref(Some("stale-ref")))
            .await
            .unwrap_err();

        assert!(matches!(err, SourceError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_unreachable_source() {
        let client = PrismicClient::new("http://127.0.0.1:9/api/v2", None).unwrap();

        let err = client.query("posts", &QueryOptions::new(1)).await.unwrap_err();

        assert!(matches!(err, SourceError::Unavailable(_)));
    }
}

mod build_integration_tests {
    use super::*;
    use spacetraveling::cli::build;

    #[tokio::test]
    async fn test_build_writes_every_post() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("dist");

        build::run(test_config(), Arc::new(MemorySource::new(sample_posts())), &output)
            .await
            .expect("Build failed");

        assert!(output.join("index.html").exists());
        assert!(output.join("404.html").exists());
        for doc in sample_posts() {
            let page = output.join("post").join(doc.uid()).join("index.html");
            assert!(page.exists(), "missing {}", page.display());
        }

        let html = std::fs::read_to_string(output.join("post/launch-day/index.html")).unwrap();
        assert!(html.contains("Launch Day"));
    }

    #[tokio::test]
    async fn test_build_skips_unsafe_uids() {
        let dir = tempfile::tempdir().unwrap();
        let mut docs = sample_posts();
        docs.push(post_doc("../escape", "Escape", "2020-01-01T00:00:00+0000", 5));

        build::run(test_config(), Arc::new(MemorySource::new(docs)), dir.path())
            .await
            .unwrap();

        assert!(!dir.path().join("escape").exists());
        assert!(dir.path().join("post/first-steps/index.html").exists());
    }
}
