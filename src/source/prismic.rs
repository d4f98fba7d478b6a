//! Prismic REST API v2 client.

use super::{ContentSource, QueryOptions, SourceError};
use crate::models::{ApiInfo, QueryResponse, RawDocument};
use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use url::Url;

#[derive(Clone)]
pub struct PrismicClient {
    http: reqwest::Client,
    endpoint: Url,
    access_token: Option<String>,
}

impl PrismicClient {
    /// `endpoint` is the API root, e.g. `https://my-repo.cdn.prismic.io/api/v2`.
    pub fn new(endpoint: &str, access_token: Option<String>) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| anyhow::anyhow!("Invalid content source endpoint '{}': {}", endpoint, e))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            bail!(
                "Content source endpoint must be http or https, got '{}'",
                endpoint.scheme()
            );
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("spacetraveling/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            access_token: access_token.filter(|t| !t.is_empty()),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Returns `content_ref` when given, otherwise the repository's current
    /// master ref.
    async fn resolve_ref(&self, content_ref: Option<&str>) -> Result<String, SourceError> {
        if let Some(r) = content_ref {
            return Ok(r.to_string());
        }

        let mut url = self.endpoint.clone();
        self.authorize(&mut url);
        let info: ApiInfo = self.get_json(url).await?;
        info.master_ref()
            .map(str::to_string)
            .ok_or_else(|| SourceError::MalformedResponse("API root lists no master ref".into()))
    }

    fn search_url(&self, reference: &str, predicate: &str, options: &QueryOptions) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["documents", "search"]);
        }

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("ref", reference)
                .append_pair("q", predicate)
                .append_pair("pageSize", &options.page_size.to_string())
                .append_pair("page", &options.page.to_string());
            if let Some(ref orderings) = options.orderings {
                pairs.append_pair("orderings", orderings);
            }
        }
        self.authorize(&mut url);
        url
    }

    fn authorize(&self, url: &mut Url) {
        if let Some(ref token) = self.access_token {
            if !url.query_pairs().any(|(k, _)| k == "access_token") {
                url.query_pairs_mut().append_pair("access_token", token);
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, SourceError> {
        tracing::debug!("GET {}", url.path());
        let response = self.http.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Unavailable(format!(
                "{} responded with {}",
                url.path(),
                status
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| SourceError::MalformedResponse(e.to_string()))
    }
}

fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[async_trait]
impl ContentSource for PrismicClient {
    async fn query(
        &self,
        doc_type: &str,
        options: &QueryOptions,
    ) -> Result<QueryResponse, SourceError> {
        let reference = self.resolve_ref(options.content_ref.as_deref()).await?;
        let predicate = format!(r#"[[at(document.type,"{}")]]"#, quote(doc_type));
        let url = self.search_url(&reference, &predicate, options);
        self.get_json(url).await
    }

    async fn get_by_uid(
        &self,
        doc_type: &str,
        uid: &str,
        content_ref: Option<&str>,
    ) -> Result<RawDocument, SourceError> {
        let reference = self.resolve_ref(content_ref).await?;
        let predicate = format!(r#"[[at(my.{}.uid,"{}")]]"#, doc_type, quote(uid));
        let options = QueryOptions {
            page_size: 1,
            page: 1,
            content_ref: None,
            orderings: None,
        };
        let url = self.search_url(&reference, &predicate, &options);
        let response: QueryResponse = self.get_json(url).await?;

        response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::NotFound {
                doc_type: doc_type.to_string(),
                uid: uid.to_string(),
            })
    }

    async fn fetch_page(&self, cursor: &str) -> Result<QueryResponse, SourceError> {
        let mut url = Url::parse(cursor)
            .map_err(|e| SourceError::MalformedResponse(format!("invalid cursor: {}", e)))?;
        if url.origin() != self.endpoint.origin() {
            return Err(SourceError::MalformedResponse(format!(
                "cursor host '{}' is not the content source",
                url.host_str().unwrap_or_default()
            )));
        }
        self.authorize(&mut url);
        self.get_json(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_carries_query() {
        let client = PrismicClient::new("https://blog.cdn.prismic.io/api/v2", None).unwrap();
        let url = client.search_url(
            "master-ref",
            r#"[[at(document.type,"posts")]]"#,
            &QueryOptions::new(1),
        );

        assert_eq!(url.path(), "/api/v2/documents/search");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("ref".into(), "master-ref".into())));
        assert!(pairs.contains(&("pageSize".into(), "1".into())));
        assert!(pairs.contains(&(
            "orderings".into(),
            "[document.first_publication_date desc]".into()
        )));
        assert!(!pairs.iter().any(|(k, _)| k == "access_token"));
    }

    #[test]
    fn test_access_token_added_once() {
        let client =
            PrismicClient::new("https://blog.cdn.prismic.io/api/v2/", Some("secret".into()))
                .unwrap();
        let mut url =
            Url::parse("https://blog.cdn.prismic.io/api/v2/documents/search?access_token=secret")
                .unwrap();
        client.authorize(&mut url);
        assert_eq!(url.query_pairs().filter(|(k, _)| k == "access_token").count(), 1);

        let url = client.search_url("r", "q", &QueryOptions::new(5));
        assert_eq!(url.path(), "/api/v2/documents/search");
        assert_eq!(url.query_pairs().filter(|(k, _)| k == "access_token").count(), 1);
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        assert!(PrismicClient::new("ftp://blog.example.com/api", None).is_err());
        assert!(PrismicClient::new("not a url", None).is_err());
    }

    #[tokio::test]
    async fn test_foreign_cursor_rejected_without_request() {
        let client = PrismicClient::new("https://blog.cdn.prismic.io/api/v2", None).unwrap();
        let err = client
            .fetch_page("https://evil.example.com/api/v2/documents/search?page=2")
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::MalformedResponse(_)));
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote(r#"a"b"#), r#"a\"b"#);
    }
}
