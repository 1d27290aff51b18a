//! Tankobon main entry point
//!
//! This is the command-line interface for the Tankobon manga downloader.

use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tankobon::config::{load_config, load_config_with_hash, save_config, Config, ConfigUpdate};
use tankobon::download::{ChapterSelection, FetchPolicy, ImageFetcher, Runner};
use tankobon::output::{print_summary, RunStatus};
use tankobon::progress::Progress;
use tankobon::source::{build_source, Listing};
use tankobon::{ConfigError, TankobonError};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Tankobon: a concurrent manga chapter downloader
///
/// Tankobon searches a manga site, downloads the selected chapters page by
/// page, post-processes every page for e-readers and stores each chapter as
/// a CBZ archive.
#[derive(Parser, Debug)]
#[command(name = "tankobon")]
#[command(version)]
#[command(about = "A concurrent manga chapter downloader", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, global = true, value_name = "CONFIG", default_value = "tankobon.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search titles and show their chapters
    Search {
        /// Title to search for
        name: String,

        /// Index of the title to pick from the search results
        #[arg(long)]
        pick: Option<usize>,

        /// Print every chapter label of the picked title
        #[arg(long)]
        list_chapters: bool,
    },

    /// Download chapters as CBZ archives
    Install {
        /// Title to search for
        name: String,

        /// Chapters to install: a position (5), a range (9-18) or 'all'
        chapters: Option<String>,

        /// Index of the title to pick from the search results
        #[arg(long)]
        pick: Option<usize>,
    },

    /// Show or change the persisted configuration
    Config {
        #[arg(long)]
        source: Option<String>,

        #[arg(long)]
        output_dir: Option<PathBuf>,

        #[arg(long)]
        staging_dir: Option<PathBuf>,

        #[arg(long)]
        concurrency: Option<u32>,

        /// Keep colour pages (false converts to grayscale)
        #[arg(long, action = clap::ArgAction::Set)]
        color: Option<bool>,

        /// Crop blank page margins
        #[arg(long, action = clap::ArgAction::Set)]
        crop: Option<bool>,

        #[arg(long)]
        width: Option<u32>,

        #[arg(long)]
        height: Option<u32>,

        /// Use the screen size of a known device (e.g. boox_go_7)
        #[arg(long)]
        device: Option<String>,

        /// Stop resizing pages
        #[arg(long, conflicts_with_all = ["width", "height", "device"])]
        clear_dimensions: bool,

        /// Print the configuration without changing it
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(RunStatus::Completed) => ExitCode::SUCCESS,
        Ok(RunStatus::CompletedWithFailures(_)) => ExitCode::from(2),
        Ok(RunStatus::Aborted) | Err(TankobonError::Cancelled) => {
            println!("Final status: {}", RunStatus::Aborted);
            ExitCode::from(130)
        }
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tankobon=info,warn"),
            1 => EnvFilter::new("tankobon=debug,info"),
            2 => EnvFilter::new("tankobon=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

async fn run(cli: Cli) -> tankobon::Result<RunStatus> {
    match cli.command {
        Command::Search {
            name,
            pick,
            list_chapters,
        } => {
            let config = load(&cli.config)?;
            handle_search(config, &name, pick, list_chapters, cli.quiet).await?;
            Ok(RunStatus::Completed)
        }
        Command::Install {
            name,
            chapters,
            pick,
        } => {
            // Reject a bad selection before touching the network
            let selection = ChapterSelection::parse(chapters.as_deref())?;
            let config = load(&cli.config)?;
            handle_install(config, &name, pick, selection, cli.quiet).await
        }
        Command::Config {
            source,
            output_dir,
            staging_dir,
            concurrency,
            color,
            crop,
            width,
            height,
            device,
            clear_dimensions,
            show,
        } => {
            let update = ConfigUpdate {
                source,
                output_dir,
                staging_dir,
                concurrency,
                color,
                crop,
                width,
                height,
                device,
                clear_dimensions,
            };
            handle_config(&cli.config, update, show)?;
            Ok(RunStatus::Completed)
        }
    }
}

fn load(path: &Path) -> Result<Config, ConfigError> {
    tracing::info!("Loading configuration from: {}", path.display());
    match load_config_with_hash(path) {
        Ok((config, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok(config)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            Err(e)
        }
    }
}

/// Builds a runner whose run token is cancelled by Ctrl-C
fn build_runner(config: Config, quiet: bool) -> tankobon::Result<Runner> {
    let source = build_source(&config)?;
    let run_token = CancellationToken::new();

    let token = run_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, shutting down");
            token.cancel();
        }
    });

    let fetcher = ImageFetcher::new(FetchPolicy::default())?;
    Ok(Runner::new(
        config,
        source,
        run_token,
        fetcher,
        Progress::new(!quiet),
    ))
}

/// Handles the search command: lists titles, picks one and counts chapters
async fn handle_search(
    config: Config,
    name: &str,
    pick: Option<usize>,
    list_chapters: bool,
    quiet: bool,
) -> tankobon::Result<()> {
    let mut runner = build_runner(config, quiet)?;

    let result = async {
        let (title, locator) = pick_title(&mut runner, name, pick).await?;
        let chapters = runner.chapters(&locator).await?;

        println!("{}: {} chapters", title, chapters.len());
        if list_chapters {
            for (position, label) in chapters.names().enumerate() {
                println!("  {:>4}  {}", position + 1, label);
            }
        }
        Ok::<(), TankobonError>(())
    }
    .await;

    let closed = runner.close().await;
    result?;
    closed.map(|_| ())
}

/// Handles the install command
async fn handle_install(
    config: Config,
    name: &str,
    pick: Option<usize>,
    selection: ChapterSelection,
    quiet: bool,
) -> tankobon::Result<RunStatus> {
    let mut runner = build_runner(config, quiet)?;

    let result = async {
        let (title, locator) = pick_title(&mut runner, name, pick).await?;
        let chapters = runner.chapters(&locator).await?;
        runner.install(&title, &chapters, selection).await
    }
    .await;

    let closed = runner.close().await;
    let summary = result?;
    closed?;

    print_summary(&summary);
    Ok(summary.status)
}

/// Searches titles and resolves the one to use
async fn pick_title(
    runner: &mut Runner,
    name: &str,
    pick: Option<usize>,
) -> tankobon::Result<(String, String)> {
    let titles = runner.search(name).await?;

    println!("Titles matching '{}':", name);
    for (index, title) in titles.names().enumerate() {
        println!("  {:>3}  {}", index, title);
    }

    let index = match pick {
        Some(index) => index,
        None if titles.len() == 1 => 0,
        None => prompt_index(&titles).await?,
    };

    titles
        .get_index(index)
        .map(|(title, locator)| (title.to_string(), locator.to_string()))
        .ok_or(TankobonError::InvalidPick {
            pick: index.to_string(),
            available: titles.len(),
        })
}

async fn prompt_index(titles: &Listing) -> tankobon::Result<usize> {
    let available = titles.len();
    let line = tokio::task::spawn_blocking(|| -> std::io::Result<String> {
        print!("Pick a title: ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        Ok(line)
    })
    .await
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))??;

    let pick = line.trim();
    pick.parse().map_err(|_| TankobonError::InvalidPick {
        pick: pick.to_string(),
        available,
    })
}

/// Handles the config command: applies changes and persists them
fn handle_config(path: &Path, update: ConfigUpdate, show: bool) -> tankobon::Result<()> {
    let config = load_config(path)?;

    let config = if show || update.is_empty() {
        config
    } else {
        let updated = update.apply(&config)?;
        save_config(&updated, path)?;
        tracing::info!("Saved configuration to {}", path.display());
        updated
    };

    let rendered = toml::to_string_pretty(&config).map_err(ConfigError::from)?;
    println!("# {}\n{}", path.display(), rendered);
    Ok(())
}
