//! mailsift - search an IMAP mailbox and print the matches as JSON.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use mailsift_core::{MailConfig, Mailsift};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(version, about, long_about = None)]
#[command(name = "mailsift")]
struct Cli {
    /// Path to the JSON account configuration
    #[arg(short, long, default_value = "mailsift.json")]
    config: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Messages whose subject contains TITLE (empty matches all)
    Title {
        /// Text to look for in the subject
        #[arg(default_value = "")]
        title: String,
    },
    /// The newest COUNT messages, envelope fields only
    Recent {
        /// Number of messages
        count: u32,
    },
    /// Messages whose body or key header contains TEXT
    Content {
        /// Text to look for
        text: String,
    },
    /// Check that the server accepts the configured credentials
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = MailConfig::from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    let default_filter = if config.debug {
        "mailsift=debug,mailsift_core=debug,mailsift_imap=debug,mailsift_mime=debug"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(host = %config.host, mailbox = %config.mailbox, "starting mailsift");
    let mailsift = Mailsift::new(config)?;

    let results = match cli.command {
        Commands::Title { title } => mailsift.search_by_title(&title).await?,
        Commands::Recent { count } => mailsift.search_by_recent(count).await?,
        Commands::Content { text } => mailsift.search_by_content(&text).await?,
        Commands::Health => {
            let healthy = mailsift.is_health().await;
            println!("{}", serde_json::json!({ "healthy": healthy }));
            if !healthy {
                anyhow::bail!("health check failed");
            }
            return Ok(());
        }
    };

    info!(count = results.len(), "search finished");
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
