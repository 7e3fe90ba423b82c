use clap::Parser;

mod commands;
mod config;

#[derive(Parser, Clone)]
#[clap(name = "dashcap", version, about)]
struct DashcapArgs {
    /// Path to a TOML file with default settings
    #[clap(short, long, global = true, env = "DASHCAP_CONFIG")]
    config: Option<std::path::PathBuf>,

    #[clap(subcommand)]
    command: commands::DashcapCommand,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .try_from_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = DashcapArgs::parse();
    let config = config::Config::load(args.config.as_deref())?;
    args.command.run(&config).await
}
