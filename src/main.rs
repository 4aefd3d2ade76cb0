use aiblock::db::{query_log, Db};
use aiblock::embeddings::storage;
use aiblock::{Config, Pipeline, SchemaCorpus};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "aiblock")]
#[command(version, about = "Answer questions about Kusama blockchain data via GraphQL")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index the schema corpus and serve the HTTP API (default)
    Serve,
    /// Embed and store the schema corpus, then exit
    Index,
    /// Show the schema fragments most similar to a question
    Search {
        query: String,
        /// Number of fragments to return
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Run the full pipeline for one question
    Ask {
        query: String,
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Print index and query log statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load().context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", config.log_level.as_str()),
    )
    .init();

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config).await,
        Command::Index => index(&config).await,
        Command::Search { query, k } => search(&config, &query, k).await,
        Command::Ask { query, k } => ask(&config, &query, k).await,
        Command::Stats => stats(&config).await,
    }
}

async fn build(config: &Config) -> Result<Pipeline> {
    log::info!("Database path: {}", config.db_path().display());
    let pipeline = Pipeline::from_config(config)
        .await
        .context("Failed to initialize pipeline")?;
    let report = pipeline
        .index(&SchemaCorpus::kusama())
        .await
        .context("Failed to index schema corpus")?;
    log::info!(
        "Schema corpus ready: {} fragments ({} embedded, {} unchanged, {} pruned)",
        report.total,
        report.embedded,
        report.skipped,
        report.pruned
    );
    Ok(pipeline)
}

async fn serve(config: &Config) -> Result<()> {
    let pipeline = Arc::new(build(config).await?);
    aiblock::http::serve(pipeline, &config.server).await?;
    Ok(())
}

async fn index(config: &Config) -> Result<()> {
    let pipeline = build(config).await?;
    let stats = pipeline.store().stats();
    println!(
        "Collection {}: {} fragments indexed with {} ({})",
        stats.collection, stats.count, stats.embedding_model, stats.status
    );
    Ok(())
}

async fn search(config: &Config, query: &str, k: Option<usize>) -> Result<()> {
    let pipeline = build(config).await?;
    let k = pipeline.resolve_max_chunks(k)?;
    let chunks = pipeline.search(query, k).await?;

    if chunks.is_empty() {
        println!("No fragments found.");
        return Ok(());
    }
    for chunk in chunks {
        println!(
            "{:>2}. {} [{}] score={:.4}",
            chunk.rank, chunk.id, chunk.metadata.category, chunk.score
        );
    }
    Ok(())
}

async fn ask(config: &Config, query: &str, k: Option<usize>) -> Result<()> {
    let pipeline = build(config).await?;
    let k = pipeline.resolve_max_chunks(k)?;
    let answer = pipeline.answer(query, k).await?;

    println!("GraphQL query:\n{}\n", answer.graphql_query);
    println!("{}", answer.answer);
    Ok(())
}

/// Reads the database only; no external services are contacted
async fn stats(config: &Config) -> Result<()> {
    let db = Db::new(config.db_path());
    db.migrate().await?;

    let fragments = storage::load_fragment_states(&db, &config.store.collection).await?;
    let embedded = storage::embedded_by_model(&fragments);
    let queries = query_log::summarize(&db).await?;

    println!("\n=== AI Block Statistics ===\n");
    println!("Collection:        {}", config.store.collection);
    println!("Stored fragments:  {}", fragments.len());
    println!("Configured model:  {}", config.embedding_model());
    if embedded.is_empty() {
        println!("Embedded:          0");
    }
    // A provider fallback stores vectors under a model other than the configured one
    for (model, count) in &embedded {
        println!("Embedded ({}): {}", model, count);
    }
    println!("Corpus size:       {}", SchemaCorpus::kusama().len());
    println!("Completion model:  {}", config.completion_model());
    println!("GraphQL endpoint:  {}", config.graphql.endpoint);
    println!("Queries served:    {}", queries.total);
    println!("Queries failed:    {}", queries.failed);
    if let Some(avg) = queries.avg_latency_ms {
        println!("Avg latency:       {:.1} ms", avg);
    }
    Ok(())
}
