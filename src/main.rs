use clap::Parser;
use spacetraveling::cli::{Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spacetraveling=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init {
            path,
            name,
            endpoint,
        }) => {
            spacetraveling::cli::init::run(path, name, endpoint).await?;
        }
        Some(Commands::Build { output, fixture }) => {
            let config = spacetraveling::cli::load_config(&cli.config, cli.access_token)?;
            let source = spacetraveling::cli::connect_source(&config, fixture.as_deref())?;
            spacetraveling::cli::build::run(config, source, &output).await?;
        }
        Some(Commands::Serve {
            host,
            port,
            fixture,
        }) => {
            let config = spacetraveling::cli::load_config(&cli.config, cli.access_token)?;
            let source = spacetraveling::cli::connect_source(&config, fixture.as_deref())?;
            spacetraveling::cli::serve::run(config, source, host, port).await?;
        }
        Some(Commands::Posts {
            all,
            content_ref,
            fixture,
        }) => {
            let config = spacetraveling::cli::load_config(&cli.config, cli.access_token)?;
            let source = spacetraveling::cli::connect_source(&config, fixture.as_deref())?;
            spacetraveling::cli::posts::run(config, source, all, content_ref.as_deref()).await?;
        }
        Some(Commands::Post {
            uid,
            content_ref,
            fixture,
        }) => {
            let config = spacetraveling::cli::load_config(&cli.config, cli.access_token)?;
            let source = spacetraveling::cli::connect_source(&config, fixture.as_deref())?;
            spacetraveling::cli::post::run(config, source, &uid, content_ref.as_deref()).await?;
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
        }
    }

    Ok(())
}
