//! # indexpages CLI
//!
//! Builds, inspects and serves the index pages of a content directory.

mod commands;
mod project;
mod state;

use clap::{Parser, Subcommand};
use project::ProjectOptions;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "indexpages")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory of Markdown content
    #[arg(long, default_value = "content", env = "INDEXPAGES_CONTENT")]
    content: PathBuf,

    /// Path to the index configuration
    #[arg(long, default_value = "index-pages.yaml", env = "INDEXPAGES_CONFIG")]
    config: PathBuf,

    /// Extra flag passed to the index pages plugin, e.g. `index-pages=skip-build`
    #[arg(short = 'f', long = "extra-flag", value_name = "KEY[=VALUE]")]
    extra_flags: Vec<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every index page into the output directory
    Build {
        /// Output directory
        #[arg(short, long, default_value = "public")]
        output: PathBuf,

        /// Site title used by the templates
        #[arg(long, default_value = "Index Pages")]
        site_title: String,
    },

    /// Resolve a virtual path (`/blog@index-pages/year-index/2020`) or a URL
    Resolve {
        /// Virtual path, or URL path with --url
        path: String,

        /// Treat PATH as a URL path
        #[arg(long)]
        url: bool,

        /// Alternative to resolve in
        #[arg(long, default_value = "_primary")]
        alt: String,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List the index nodes of every configured index
    List {
        /// Alternative to list
        #[arg(long, default_value = "_primary")]
        alt: String,
    },

    /// Serve index pages on demand
    Serve {
        /// Server port
        #[arg(long, default_value = "8000")]
        port: u16,

        /// Site title used by the templates
        #[arg(long, default_value = "Index Pages")]
        site_title: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let options = ProjectOptions {
        content_dir: cli.content,
        config_path: cli.config,
        extra_flags: cli.extra_flags,
    };

    match cli.command {
        Commands::Build { output, site_title } => commands::build_indexes(&options, &output, &site_title),
        Commands::Resolve { path, url, alt, json } => commands::resolve_path(&options, &path, url, &alt, json),
        Commands::List { alt } => commands::list_indexes(&options, &alt),
        Commands::Serve { port, site_title } => commands::serve(options, port, site_title).await,
    }
}
