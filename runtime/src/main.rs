use anyhow::Result;
use clap::{Parser, Subcommand};
use loadkit::cli;
use loadkit::config::LoaderConfig;
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser)]
#[command(name = "loadkit", version, about = "Load scripts and stylesheets as named bundles")]
struct Cli {
    /// Config file (defaults to ~/.loadkit/config.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit machine-readable JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Suppress human-readable output
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load paths, optionally as a named bundle
    Load {
        #[arg(required = true)]
        paths: Vec<String>,

        /// Bundle id to register the paths under
        #[arg(long, short)]
        bundle: Option<String>,

        /// Ask the host to preserve execution order
        #[arg(long)]
        sync: bool,
    },
    /// Load every bundle declared in a manifest file
    Manifest { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.json {
        std::env::set_var("LOADKIT_JSON", "1");
    }
    if cli.quiet {
        std::env::set_var("LOADKIT_QUIET", "1");
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("loadkit=info".parse()?),
        )
        .init();

    let config = LoaderConfig::load(cli.config.as_deref())?;
    debug!(?config, "resolved config");

    let ok = match cli.command {
        Command::Load {
            paths,
            bundle,
            sync,
        } => cli::load_cmd::run(&config, paths, bundle.as_deref(), sync).await?,
        Command::Manifest { file } => cli::manifest_cmd::run(&config, &file).await?,
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
