use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{LevelFilter, error, info, warn};

use docharvest::config::CrawlConfig;
use docharvest::download::{self, DownloadConfig};
use docharvest::frontier::session::CrawlSession;
use docharvest::renderer::ChromiumRenderer;
use docharvest::upload::{self, NotebookLmCli, UploadConfig};

#[derive(Parser)]
#[command(
    name = "docharvest",
    version,
    about = "Harvest documentation sites: crawl navigation, download pages, upload collections"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl a documentation site's navigation and write the link list
    Crawl(CrawlArgs),
    /// Download a crawled link list as Markdown files
    Download(DownloadArgs),
    /// Upload Markdown files into quota-sized remote collections
    Upload(UploadArgs),
}

#[derive(Args)]
struct CrawlArgs {
    /// Seed URL, typically the documentation root
    url: String,

    /// Path for the structured link output
    #[arg(short, long, default_value = "sidebar_links.json")]
    output: PathBuf,

    /// Resume from the checkpoint left by an interrupted crawl
    #[arg(long)]
    resume: bool,

    /// Seconds to wait between page loads
    #[arg(long, default_value_t = 1)]
    delay: u64,

    /// Stop after this many pages even if URLs are still pending
    #[arg(long, default_value_t = 1000)]
    max_pages: u64,

    /// Session cookie as name=value, for gated docs
    #[arg(long)]
    cookie: Option<String>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    headed: bool,

    /// Keep URL fragments; for sites that route pages via #fragment
    #[arg(long)]
    fragment_routing: bool,
}

#[derive(Args)]
struct DownloadArgs {
    /// Link list from the crawl stage (JSON or one URL per line)
    #[arg(short, long, default_value = "sidebar_links.json")]
    input: PathBuf,

    /// Directory for the Markdown files
    #[arg(short, long, default_value = "docs_markdown")]
    output: PathBuf,

    /// Seconds between fetch starts
    #[arg(long, default_value_t = 1)]
    delay: u64,

    /// How many fetches may run at once
    #[arg(long, default_value_t = 1)]
    concurrent: usize,

    /// Session cookie as name=value
    #[arg(long)]
    cookie: Option<String>,

    /// Only process the first N links
    #[arg(long)]
    max_files: Option<usize>,
}

#[derive(Args)]
struct UploadArgs {
    /// Directory of Markdown files to upload
    #[arg(short, long, default_value = "docs_markdown")]
    input: PathBuf,

    /// Base collection name; overflow batches get " (2)", " (3)", ...
    #[arg(short, long)]
    collection: String,

    /// Items per collection (service maximum 50)
    #[arg(long, default_value_t = upload::SERVICE_MAX_QUOTA)]
    quota: usize,

    /// File name filter inside the input directory
    #[arg(long, default_value = "*.md")]
    pattern: String,

    /// Seconds between item uploads
    #[arg(long, default_value_t = 1)]
    delay: u64,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    yes: bool,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_module("docharvest", level)
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Crawl(args) => run_crawl(args).await,
        Command::Download(args) => run_download(args).await,
        Command::Upload(args) => run_upload(args).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run_crawl(args: CrawlArgs) -> Result<ExitCode> {
    let config = CrawlConfig::builder(&args.url)
        .output_path(&args.output)
        .resume(args.resume)
        .delay(Duration::from_secs(args.delay))
        .max_pages(args.max_pages)
        .headless(!args.headed)
        .cookie(args.cookie)
        .fragment_routing(args.fragment_routing)
        .build();

    let renderer = ChromiumRenderer::launch(&config)
        .await
        .context("launch browser")?;
    let session = CrawlSession::new(renderer, config);

    let outcome = session.run().await?;
    if outcome.reached_page_ceiling {
        warn!("stopped at the page ceiling; rerun with --resume and a higher --max-pages to continue");
    }
    info!(
        "crawl done: {} links from {} pages ({} pages failed)",
        outcome.discovered.len(),
        outcome.pages_processed,
        outcome.failed_pages.len()
    );
    session.into_renderer().shutdown().await?;
    Ok(ExitCode::SUCCESS)
}

async fn run_download(args: DownloadArgs) -> Result<ExitCode> {
    let config = DownloadConfig {
        input: args.input,
        output_dir: args.output,
        delay: Duration::from_secs(args.delay),
        concurrent: args.concurrent,
        cookie: args.cookie,
        max_files: args.max_files,
    };

    let report = download::run(&config).await?;
    info!(
        "download done: {} saved, {} skipped, {} failed",
        report.completed,
        report.skipped,
        report.failed.len()
    );
    if let Some(path) = &report.failure_list_path {
        warn!("failed URLs listed in {}", path.display());
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_upload(args: UploadArgs) -> Result<ExitCode> {
    let mut config = UploadConfig::new(args.input, args.collection);
    config.quota = args.quota;
    config.pattern = args.pattern;
    config.delay = Duration::from_secs(args.delay);

    let (files, batch_plan) = upload::plan_upload(&config)?;
    if batch_plan.is_empty() {
        warn!(
            "no files matching {:?} in {}",
            config.pattern,
            config.input_dir.display()
        );
        return Ok(ExitCode::SUCCESS);
    }

    println!(
        "{} files in {} batch(es) of up to {}:",
        files.len(),
        batch_plan.batches.len(),
        config.quota
    );
    for batch in &batch_plan.batches {
        println!("  {:24} {} items", batch.name, batch.items.len());
    }
    if !args.yes && !confirm("Proceed with upload?")? {
        println!("aborted");
        return Ok(ExitCode::FAILURE);
    }

    let sink = NotebookLmCli::new();
    let summary = upload::run(&sink, &config, &batch_plan).await?;
    if summary.fully_succeeded() {
        Ok(ExitCode::SUCCESS)
    } else {
        error!(
            "{} of {} items failed; see _failed_uploads.txt",
            summary.failed,
            summary.uploaded + summary.failed
        );
        Ok(ExitCode::FAILURE)
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    std::io::stdout().flush().context("flush stdout")?;
    let mut answer = String::new();
    std::io::stdin()
        .read_line(&mut answer)
        .context("read confirmation")?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "YES"))
}
