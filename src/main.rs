use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use inbox_miner::config::MinerConfig;
use inbox_miner::error::{Error, MailError};
use inbox_miner::handoff::{ExtractorRequest, Handoff, JsonFileHandoff, render_input};
use inbox_miner::mail::ImapSession;
use inbox_miner::pipeline::{MinedIssues, mine_session};

#[derive(Parser, Debug)]
#[command(
    name = "inbox-miner",
    version,
    about = "Mine a mailbox for new-issue notifications and prepare extractor input"
)]
struct Cli {
    /// Path to the JSON configuration file
    config: PathBuf,
    #[arg(long, help = "Print the extractor input instead of writing it")]
    dry_run: bool,
    #[arg(long, help = "Override parser.output_dir from the config file")]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = MinerConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(dir) = cli.output_dir {
        config.parser.output_dir = dir;
    }

    eprintln!("📬 inbox-miner v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Mailbox: {} on {}", config.parser.addr, config.parser.host.imap_domain());
    eprintln!("   Sender: {}", config.parser.sender.from_name());
    eprintln!("   Repo: {}\n", config.parser.repo);

    let mined = mine_mailbox(config.clone()).await?;

    eprintln!("   Issues found: {:?}", mined.issues());
    eprintln!("   Issue range to mine: {}", mined.range());
    if !mined.is_contiguous() {
        eprintln!("   Runs: {:?}", mined.runs());
    }

    let request = ExtractorRequest::for_config(&config, &mined);

    if cli.dry_run {
        let input = render_input(&config.extractor, &request)?;
        println!("{}", serde_json::to_string_pretty(&input)?);
        return Ok(());
    }

    let sink = JsonFileHandoff::new(config.extractor.clone());
    let path = sink.submit(&request).await?;
    eprintln!("   Extractor input: {}", path.display());

    Ok(())
}

/// Open the mailbox and run the pipeline on a blocking thread.
async fn mine_mailbox(config: MinerConfig) -> Result<MinedIssues, Error> {
    tokio::task::spawn_blocking(move || -> Result<MinedIssues, Error> {
        let mut session = ImapSession::open(&config.parser)?;
        mine_session(&mut session, &config.parser.repo, config.parser.sender)
    })
    .await
    .unwrap_or_else(|e| Err(MailError::Task(e.to_string()).into()))
}
