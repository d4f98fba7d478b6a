use anyhow::{bail, Result};
use std::path::PathBuf;

pub async fn run(path: PathBuf, name: Option<String>, endpoint: Option<String>) -> Result<()> {
    let site_name = name.unwrap_or_else(|| "spacetraveling".to_string());
    let endpoint =
        endpoint.unwrap_or_else(|| "https://your-repo.cdn.prismic.io/api/v2".to_string());

    std::fs::create_dir_all(&path)?;

    let config_path = path.join("spacetraveling.toml");
    if config_path.exists() {
        bail!("{} already exists", config_path.display());
    }

    let config = format!(
        r#"[site]
title = "{}"
description = "A blog about space travel"
url = "http://localhost:3000"
language = "pt-BR"

[server]
host = "127.0.0.1"
port = 3000

[source]
endpoint = "{}"
# access_token = "" # or set SPACETRAVELING_ACCESS_TOKEN
document_type = "posts"
page_size = 1

[revalidate]
listing_secs = 86400
post_secs = 1800

[comments]
enabled = false
repo = ""
issue_term = "pathname"
theme = "photon-dark"

[preview]
cookie = "io.prismic.preview"
exit_url = "/api/exit-preview"

[dates]
timezone = "UTC"
"#,
        site_name.replace('"', r#"\""#),
        endpoint.replace('"', r#"\""#)
    );

    std::fs::write(&config_path, config)?;

    tracing::info!("Created {}", config_path.display());
    tracing::info!("Run 'spacetraveling serve' to start the server");

    Ok(())
}
