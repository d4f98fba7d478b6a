use crate::services::dates::{DateFormatter, Locale};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub revalidate: RevalidateConfig,
    #[serde(default)]
    pub comments: CommentsConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub dates: DatesConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    /// API root, e.g. `https://my-repo.cdn.prismic.io/api/v2`.
    pub endpoint: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_document_type")]
    pub document_type: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

/// How long a generated page is served before it is regenerated.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RevalidateConfig {
    #[serde(default = "default_listing_secs")]
    pub listing_secs: u64,
    #[serde(default = "default_post_secs")]
    pub post_secs: u64,
}

impl Default for RevalidateConfig {
    fn default() -> Self {
        Self {
            listing_secs: default_listing_secs(),
            post_secs: default_post_secs(),
        }
    }
}

impl RevalidateConfig {
    pub fn listing(&self) -> Duration {
        Duration::from_secs(self.listing_secs)
    }

    pub fn post(&self) -> Duration {
        Duration::from_secs(self.post_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommentsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_comments_src")]
    pub script_src: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default = "default_issue_term")]
    pub issue_term: String,
    #[serde(default = "default_comments_theme")]
    pub theme: String,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            script_src: default_comments_src(),
            repo: String::new(),
            issue_term: default_issue_term(),
            theme: default_comments_theme(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PreviewConfig {
    #[serde(default = "default_preview_cookie")]
    pub cookie: String,
    #[serde(default = "default_exit_url")]
    pub exit_url: String,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            cookie: default_preview_cookie(),
            exit_url: default_exit_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatesConfig {
    /// IANA timezone dates are displayed in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for DatesConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

fn default_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_language() -> String {
    "pt-BR".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_document_type() -> String {
    "posts".to_string()
}

fn default_page_size() -> usize {
    1
}

fn default_listing_secs() -> u64 {
    60 * 60 * 24
}

fn default_post_secs() -> u64 {
    60 * 30
}

fn default_true() -> bool {
    true
}

fn default_comments_src() -> String {
    "https://utteranc.es/client.js".to_string()
}

fn default_issue_term() -> String {
    "pathname".to_string()
}

fn default_comments_theme() -> String {
    "photon-dark".to_string()
}

fn default_preview_cookie() -> String {
    "io.prismic.preview".to_string()
}

fn default_exit_url() -> String {
    "/api/exit-preview".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!(
                "Could not read config file '{}': {}. Run 'spacetraveling init' to create one.",
                path.display(),
                e
            )
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.endpoint.trim().is_empty() {
            anyhow::bail!("source.endpoint must be set");
        }
        if self.source.document_type.trim().is_empty() {
            anyhow::bail!("source.document_type must not be empty");
        }
        if self.source.page_size == 0 {
            anyhow::bail!("source.page_size must be greater than 0");
        }
        if self.source.page_size > 100 {
            anyhow::bail!("source.page_size must be 100 or less");
        }
        if self.revalidate.listing_secs == 0 || self.revalidate.post_secs == 0 {
            anyhow::bail!("revalidate intervals must be greater than 0");
        }
        if self.comments.enabled && self.comments.repo.trim().is_empty() {
            anyhow::bail!("comments.repo must be set when comments are enabled");
        }
        if self.site.language.parse::<Locale>().is_err() {
            anyhow::bail!(
                "Unsupported site.language '{}'. Supported: pt-BR, en",
                self.site.language
            );
        }
        if self.dates.timezone.parse::<chrono_tz::Tz>().is_err() {
            anyhow::bail!("Unknown dates.timezone '{}'", self.dates.timezone);
        }
        Ok(())
    }

    pub fn locale(&self) -> Locale {
        self.site.language.parse().unwrap_or_default()
    }

    pub fn date_formatter(&self) -> DateFormatter {
        let tz = self.dates.timezone.parse().unwrap_or(chrono_tz::Tz::UTC);
        DateFormatter::new(self.locale(), tz)
    }
}
