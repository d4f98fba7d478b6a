use serde::{Deserialize, Serialize};

/// A document as returned by the content source, before projection into one
/// of the typed post models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDocument {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(rename = "type", default)]
    pub doc_type: String,
    #[serde(default)]
    pub first_publication_date: Option<String>,
    #[serde(default)]
    pub last_publication_date: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl RawDocument {
    pub fn uid(&self) -> &str {
        self.uid.as_deref().unwrap_or_default()
    }
}

/// One page of a document query. `next_page` is the cursor for the
/// following page, `None` once the collection is exhausted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub results_size: u32,
    #[serde(default)]
    pub total_results_size: u32,
    #[serde(default)]
    pub next_page: Option<String>,
    #[serde(default)]
    pub results: Vec<RawDocument>,
}

fn default_page() -> u32 {
    1
}

/// A content reference advertised by the API root (`master` or a release).
#[derive(Debug, Clone, Deserialize)]
pub struct ApiRef {
    pub id: String,
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(rename = "isMasterRef", default)]
    pub is_master_ref: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiInfo {
    #[serde(default)]
    pub refs: Vec<ApiRef>,
}

impl ApiInfo {
    pub fn master_ref(&self) -> Option<&str> {
        self.refs
            .iter()
            .find(|r| r.is_master_ref)
            .or_else(|| self.refs.iter().find(|r| r.id == "master"))
            .map(|r| r.reference.as_str())
    }
}
