use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use renamed::{PdfSplitOptions, RenameOptions, RenamedClient, SplitMode, Submission};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// renamed - AI-assisted document renaming and PDF splitting
///
/// Results are printed to stdout as JSON.
///
/// Examples:
///   renamed rename scan.pdf            # Suggest a filename for scan.pdf
///   renamed split bundle.pdf --wait    # Split bundle.pdf and wait for the documents
#[derive(Parser, Debug)]
#[command(author, version = env!("RENAMED_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API key (also via RENAMED_API_KEY)
    #[arg(long = "api-key", env = "RENAMED_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// API base URL (defaults to https://www.renamed.to/api/v1)
    #[arg(long = "base-url", env = "RENAMED_BASE_URL", value_name = "URL", global = true)]
    pub base_url: Option<String>,

    /// Retries for requests that fail to reach the service
    #[arg(long = "max-retries", value_name = "N", global = true)]
    pub max_retries: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long = "timeout", value_name = "SECS", global = true)]
    pub timeout: Option<u64>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Show the account behind the API key
    User,

    /// Suggest a filename and folder for a document
    Rename(RenameArgs),

    /// Split a PDF into its constituent documents
    Split(SplitArgs),
}

#[derive(clap::Args, Debug)]
pub struct RenameArgs {
    /// The document to rename
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Naming template, e.g. "{date}_{vendor}_{type}"
    #[arg(long)]
    pub template: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct SplitArgs {
    /// The PDF to split
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Split strategy: auto, pages, or blank
    #[arg(long)]
    pub mode: Option<SplitMode>,

    /// Pages per document when --mode=pages
    #[arg(long = "pages-per-split", value_name = "N")]
    pub pages_per_split: Option<u32>,

    /// Wait for the job to finish instead of printing its status URL
    #[arg(long, short = 'w')]
    pub wait: bool,

    /// Milliseconds between status checks
    #[arg(long = "poll-interval", value_name = "MS")]
    pub poll_interval: Option<u64>,

    /// Status checks before giving up
    #[arg(long = "max-attempts", value_name = "N")]
    pub max_attempts: Option<u32>,
}

fn build_client(cli: &Cli, split: Option<&SplitArgs>) -> Result<RenamedClient> {
    let mut builder = RenamedClient::builder().api_key(cli.api_key.clone().unwrap_or_default());
    if let Some(url) = &cli.base_url {
        builder = builder.base_url(url);
    }
    if let Some(n) = cli.max_retries {
        builder = builder.max_retries(n);
    }
    if let Some(secs) = cli.timeout {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    if let Some(args) = split {
        if let Some(ms) = args.poll_interval {
            builder = builder.poll_interval(Duration::from_millis(ms));
        }
        if let Some(n) = args.max_attempts {
            builder = builder.max_poll_attempts(n);
        }
    }
    builder
        .build()
        .context("Set --api-key or the RENAMED_API_KEY environment variable")
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn split(client: &RenamedClient, args: &SplitArgs) -> Result<()> {
    let options = PdfSplitOptions {
        mode: args.mode,
        pages_per_split: args.pages_per_split,
    };
    let submission = client.pdf_split_file(&args.file, Some(&options)).await?;

    match submission {
        Submission::Ready(result) => print_json(&result),
        Submission::Pending(job) if !args.wait => {
            print_json(&serde_json::json!({ "statusUrl": job.status_url() }))
        }
        Submission::Pending(mut job) => {
            let cancel = CancellationToken::new();
            let on_ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_ctrl_c.cancel();
                }
            });

            let result = job
                .wait_with_cancel(&cancel, |status| {
                    info!("Job {}: {} ({}%)", status.job_id, status.status, status.progress);
                    eprintln!("{}%", status.progress);
                })
                .await?;
            print_json(&result)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::User => {
            let client = build_client(&cli, None)?;
            print_json(&client.get_user().await?)?
        }
        Commands::Rename(args) => {
            let client = build_client(&cli, None)?;
            let options = RenameOptions {
                template: args.template.clone(),
            };
            print_json(&client.rename_file(&args.file, Some(&options)).await?)?
        }
        Commands::Split(args) => {
            let client = build_client(&cli, Some(args))?;
            split(&client, args).await?
        }
    }
    Ok(())
}
