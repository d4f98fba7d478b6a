pub mod build;
pub mod init;
pub mod post;
pub mod posts;
pub mod serve;

use crate::source::{ContentSource, MemorySource, PrismicClient};
use crate::Config;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "spacetraveling")]
#[command(version)]
#[command(about = "Blog front-end for a Prismic repository", long_about = None)]
pub struct Cli {
    #[arg(short, long, default_value = "spacetraveling.toml")]
    pub config: PathBuf,

    /// Content source access token; overrides `source.access_token`.
    #[arg(long, env = "SPACETRAVELING_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a starter configuration file
    Init {
        #[arg(default_value = ".")]
        path: PathBuf,
        #[arg(long)]
        name: Option<String>,
        /// Prismic API endpoint, e.g. https://my-repo.cdn.prismic.io/api/v2
        #[arg(long)]
        endpoint: Option<String>,
    },
    /// Generate the static site
    Build {
        #[arg(short, long, default_value = "./dist")]
        output: PathBuf,
        /// Read documents from a JSON file instead of the content source
        #[arg(long)]
        fixture: Option<PathBuf>,
    },
    /// Serve the site, regenerating pages as they expire
    Serve {
        #[arg(short = 'H', long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
        #[arg(long)]
        fixture: Option<PathBuf>,
    },
    /// List posts in publication order
    Posts {
        /// Keep loading pages until the listing is exhausted
        #[arg(long)]
        all: bool,
        /// Content reference to query instead of the published content
        #[arg(long = "ref")]
        content_ref: Option<String>,
        #[arg(long)]
        fixture: Option<PathBuf>,
    },
    /// Show one post's reading time and navigation
    Post {
        uid: String,
        #[arg(long = "ref")]
        content_ref: Option<String>,
        #[arg(long)]
        fixture: Option<PathBuf>,
    },
}

pub fn load_config(path: &Path, access_token: Option<String>) -> Result<Config> {
    let mut config = Config::load(path)?;
    if access_token.is_some() {
        config.source.access_token = access_token;
    }
    Ok(config)
}

/// The configured content source, or a fixture file standing in for it.
pub fn connect_source(config: &Config, fixture: Option<&Path>) -> Result<Arc<dyn ContentSource>> {
    match fixture {
        Some(path) => Ok(Arc::new(MemorySource::from_file(path)?)),
        None => {
            tracing::debug!("Using content source at {}", config.source.endpoint);
            Ok(Arc::new(PrismicClient::new(
                &config.source.endpoint,
                config.source.access_token.clone(),
            )?))
        }
    }
}
