mod catalog;
mod checkpoint;
mod error;
mod extract;
mod fallback;
mod fetch;
mod ledger;
mod review;
mod runner;
mod settings;
mod specialized;
mod store;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use catalog::{Catalog, ScrapeStatus};
use checkpoint::{Checkpointer, GitCheckpointer, NoCheckpoint};
use fetch::HttpFetcher;
use ledger::ProgressLedger;
use runner::{EnrichmentRunner, PassMode, PassSummary, RunOptions, Selection};
use settings::Settings;
use store::{JsonStore, StateStore};

#[derive(Parser)]
#[command(
    name = "catalog_enricher",
    about = "Fill in catalog item images and prices from their source pages"
)]
struct Cli {
    /// Settings file (default: ./enricher.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and extract every item not yet completed
    Scrape(PassArgs),
    /// Fetch errored items again
    Retry(PassArgs),
    /// Resolve errored items from the domain fallback table (no network)
    Fallback(PassArgs),
    /// Resolve errored items with a URL-derived image, e.g. video thumbnails (no network)
    Specialized(PassArgs),
    /// Flag remaining errored items for manual review and write the review queue
    Manual(PassArgs),
    /// List errored items
    Errors {
        /// Also write the errored indices as a JSON array
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Show progress counts
    Stats,
}

#[derive(Args)]
struct PassArgs {
    /// Lowest index to consider
    #[arg(short, long, default_value = "0")]
    start: usize,
    /// Max items to process (default: all remaining)
    #[arg(short = 'n', long)]
    limit: Option<usize>,
    /// Delay between requests in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,
    /// Items per checkpoint
    #[arg(long)]
    batch_size: Option<usize>,
    /// Commit state to git after every batch
    #[arg(long)]
    checkpoint: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    let store = JsonStore::new(&settings.items_path, &settings.progress_path);

    let result = match cli.command {
        Commands::Scrape(args) => run_pass(&settings, &store, PassMode::Primary, args).await,
        Commands::Retry(args) => run_pass(&settings, &store, PassMode::Retry, args).await,
        Commands::Fallback(args) => run_pass(&settings, &store, PassMode::Fallback, args).await,
        Commands::Specialized(args) => {
            run_pass(&settings, &store, PassMode::Specialized, args).await
        }
        Commands::Manual(args) => run_pass(&settings, &store, PassMode::Manual, args).await,
        Commands::Errors { export } => {
            let (catalog, ledger) = load_state(&store)?;
            if ledger.errors().is_empty() {
                println!("No errored items.");
                return Ok(());
            }
            for (i, e) in ledger.errors().iter().enumerate() {
                let url = catalog.get(e.index).map(|it| it.url.as_str()).unwrap_or("?");
                println!(
                    "{:>4}. [{}] {} - {} ({})",
                    i + 1,
                    e.index,
                    truncate(&e.name, 40),
                    e.reason,
                    url
                );
            }
            println!(
                "\n{} errors | {} completed of {}",
                ledger.errors().len(),
                ledger.completed_count(),
                catalog.len()
            );
            if let Some(path) = export {
                let n = review::export_error_indices(&path, &ledger)?;
                println!("Wrote {} error indices to {}", n, path.display());
            }
            Ok(())
        }
        Commands::Stats => {
            let (catalog, ledger) = load_state(&store)?;
            println!("Items:     {}", catalog.len());
            println!("Completed: {}", ledger.completed_count());
            println!("Errors:    {}", ledger.errors().len());
            println!("Skipped:   {}", ledger.skipped().len());
            let with_image = catalog.items.iter().filter(|i| i.image_url.is_some()).count();
            let with_price = catalog
                .items
                .iter()
                .filter(|i| i.current_price.is_some())
                .count();
            println!("With image: {}", with_image);
            println!("With price: {}", with_price);
            println!("\n--- Status ---");
            for status in ScrapeStatus::ALL {
                let n = catalog.count_status(status);
                if n > 0 {
                    println!("  {:<12} {}", status.as_str(), n);
                }
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn load_state(store: &JsonStore) -> anyhow::Result<(Catalog, ProgressLedger)> {
    let catalog = store
        .load_catalog()
        .with_context(|| format!("Failed to load catalog {:?}", store.items_path()))?;
    let ledger = store
        .load_ledger()
        .with_context(|| format!("Failed to load ledger {:?}", store.progress_path()))?;
    Ok((catalog, ledger))
}

async fn run_pass(
    settings: &Settings,
    store: &JsonStore,
    mode: PassMode,
    args: PassArgs,
) -> anyhow::Result<()> {
    let (mut catalog, mut ledger) = load_state(store)?;
    let fetcher = HttpFetcher::new(&settings.user_agent, settings.timeout(), settings.max_redirects)
        .context("Failed to build HTTP client")?;
    let options = RunOptions {
        batch_size: args.batch_size.unwrap_or(settings.batch_size),
        delay: args
            .delay_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| settings.delay()),
    };
    let selection = Selection {
        start: args.start,
        limit: args.limit,
    };

    println!(
        "{} pass: {} items, {} completed, {} errors",
        mode.label(),
        catalog.len(),
        ledger.completed_count(),
        ledger.errors().len()
    );

    let summary = if args.checkpoint || settings.checkpoint {
        let git = GitCheckpointer::new(
            vec![settings.items_path.clone(), settings.progress_path.clone()],
            settings.checkpoint_push,
        );
        execute(&fetcher, store, &git, options, mode, &mut catalog, &mut ledger, selection).await?
    } else {
        execute(&fetcher, store, &NoCheckpoint, options, mode, &mut catalog, &mut ledger, selection)
            .await?
    };

    if summary.selected == 0 {
        println!("Nothing to do for this pass.");
        return Ok(());
    }
    summary.print();

    if mode == PassMode::Manual {
        let queue = review::review_queue(&catalog, &ledger);
        review::write_review_queue(&settings.review_path, &queue)?;
        println!(
            "Wrote {} items for review to {}",
            queue.len(),
            settings.review_path.display()
        );
    }

    println!(
        "Completed: {}/{} ({} errors remaining)",
        ledger.completed_count(),
        catalog.len(),
        ledger.errors().len()
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn execute<C: Checkpointer>(
    fetcher: &HttpFetcher,
    store: &JsonStore,
    checkpointer: &C,
    options: RunOptions,
    mode: PassMode,
    catalog: &mut Catalog,
    ledger: &mut ProgressLedger,
    selection: Selection,
) -> anyhow::Result<PassSummary> {
    let runner = EnrichmentRunner::new(fetcher, store, checkpointer, options);
    let summary = runner
        .run(mode, catalog, ledger, selection)
        .await
        .context("Pass aborted: could not persist state")?;
    Ok(summary)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
