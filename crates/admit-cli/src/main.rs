//! Command-line driver for the admissions post pipeline.
//!
//! Ties the fetch, storage and processing crates together behind one
//! `admit` binary. Each subcommand is a complete operation over the
//! shared Postgres store; `run` chains a fetch and a processing batch.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use admit_core::{
    AppConfig, ExtractMethodId, LabelMethodId, LlmClient, LoggingConfig, PostOutcome, RunReport,
};
use admit_extract::create_llm_client;
use admit_fetch::RedditClient;
use admit_pipeline::Pipeline;
use admit_store::{PostRepository, PostStore};

#[derive(Parser)]
#[command(name = "admit")]
#[command(about = "Fetch, normalize, and label university admissions posts")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the configured subreddits into the store
    Fetch,

    /// Run stored unprocessed posts through the pipeline
    Process {
        /// Most posts to take in this batch
        #[arg(long, default_value_t = 1000)]
        limit: i64,
    },

    /// Fetch, then process what arrived
    Run {
        /// Most posts to take in the processing batch
        #[arg(long, default_value_t = 1000)]
        limit: i64,
    },

    /// Print corpus and run statistics
    Stats,

    /// Write processed posts as JSON Lines
    Export {
        /// Destination file
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    init_tracing(&config.logging);

    let store = PostStore::new(&config.database).await?;
    store.setup().await?;

    match cli.command {
        Commands::Fetch => run_fetch(&config, &store).await?,
        Commands::Process { limit } => run_process(&config, &store, limit).await?,
        Commands::Run { limit } => {
            run_fetch(&config, &store).await?;
            run_process(&config, &store, limit).await?;
        }
        Commands::Stats => run_stats(&store).await?,
        Commands::Export { output } => run_export(&store, &output).await?,
    }

    Ok(())
}

/// Load the configuration file, apply environment overrides, and
/// validate the result. The file is optional; the environment can
/// carry everything.
fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let config = if path.exists() {
        AppConfig::from_file(path)?
    } else {
        AppConfig::default()
    };
    let config = config.with_env_override()?;
    config.validate()?;
    Ok(config)
}

/// `RUST_LOG` wins when set; otherwise the configured level applies to
/// the workspace crates.
fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("admit={}", logging.level).into());

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Build the shared LLM client when any configured method needs one.
fn llm_client(config: &AppConfig) -> anyhow::Result<Option<Arc<dyn LlmClient>>> {
    let wanted = config.smart_extraction.methods.contains(&ExtractMethodId::Llm)
        || config.smart_labeling.methods.contains(&LabelMethodId::Llm);
    if !wanted {
        return Ok(None);
    }
    Ok(Some(create_llm_client(&config.llm)?))
}

async fn run_fetch(config: &AppConfig, store: &PostStore) -> anyhow::Result<()> {
    let client = RedditClient::from_config(&config.reddit)?;
    let posts = client.fetch_all().await?;

    for post in &posts {
        store.upsert_raw(post).await?;
    }

    tracing::info!(count = posts.len(), "stored fetched posts");
    println!("Fetched {} posts", posts.len());
    Ok(())
}

async fn run_process(config: &AppConfig, store: &PostStore, limit: i64) -> anyhow::Result<()> {
    let posts = store.fetch_unprocessed(limit).await?;
    if posts.is_empty() {
        println!("No unprocessed posts");
        return Ok(());
    }

    let llm = llm_client(config)?;
    let pipeline = Pipeline::from_config(config, llm).await;
    let batch = pipeline.process(posts).await;

    for clean in &batch.cleaned {
        store.save_clean(clean).await?;
    }
    for outcome in &batch.outcomes {
        store.save_outcome(outcome).await?;
    }

    // Under drop_duplicates, flagged posts carry no outcome of their
    // own; settle them from the report so they are not fetched again.
    let settled: HashSet<&str> = batch.outcomes.iter().map(|o| o.id()).collect();
    for group in &batch.report.duplicate_groups {
        for id in &group.duplicate_ids {
            if settled.contains(id.as_str()) {
                continue;
            }
            let outcome = PostOutcome::Duplicate {
                id: id.clone(),
                canonical_id: group.canonical_id.clone(),
            };
            store.save_outcome(&outcome).await?;
        }
    }

    store.save_run(&batch.report).await?;
    print_report(&batch.report);
    Ok(())
}

async fn run_stats(store: &PostStore) -> anyhow::Result<()> {
    let stats = store.stats().await?;

    println!("Posts: {}", stats.total_posts);
    for (status, count) in &stats.status_counts {
        println!("  {status}: {count}");
    }
    println!(
        "Entity coverage: university {}, major {}, program {}",
        stats.with_university, stats.with_major, stats.with_program
    );
    print_distribution("Difficulty", &stats.difficulty);
    print_distribution("Course evaluation", &stats.course_evaluation);
    print_distribution("Sentiment", &stats.sentiment);
    println!("Recorded runs: {}", stats.runs);
    Ok(())
}

async fn run_export(store: &PostStore, output: &Path) -> anyhow::Result<()> {
    let count = store.export_jsonl(output).await?;
    println!("Exported {} records to {}", count, output.display());
    Ok(())
}

fn print_distribution(name: &str, counts: &[(String, i64)]) {
    println!("{name}:");
    for (label, count) in counts {
        println!("  {label}: {count}");
    }
}

fn print_report(report: &RunReport) {
    let counts = &report.counts;
    println!("Run {}", report.run_id);
    println!("  input:             {}", counts.input);
    println!("  normalized:        {}", counts.normalized);
    println!("  language filtered: {}", counts.language_filtered);
    println!("  invalid length:    {}", counts.invalid_length);
    println!("  duplicates:        {}", counts.duplicates);
    println!("  extracted:         {}", counts.extracted);
    println!("  labeled:           {}", counts.labeled);
    println!("  abstained:         {}", counts.abstained);
    if !report.duplicate_groups.is_empty() {
        println!("  duplicate groups:  {}", report.duplicate_groups.len());
    }
}
