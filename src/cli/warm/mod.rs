//! Warm command - answers common questions so later askers hit the cache

use std::path::PathBuf;

use clap::Args;

use crate::cli::{init_console_logging, load_config, read_queries};
use crate::infrastructure::services::WARM_UP_QUERIES;

#[derive(Args, Debug)]
pub struct WarmArgs {
    /// File with one question per line; the built-in list is used otherwise
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Print each answer
    #[arg(long)]
    pub show: bool,

    /// Questions answered at the same time
    #[arg(long, default_value_t = 4)]
    pub concurrency: usize,
}

pub async fn run(args: WarmArgs) -> anyhow::Result<()> {
    let config = load_config()?;
    init_console_logging(&config);

    let queries = match &args.file {
        Some(path) => read_queries(path).await?,
        None => WARM_UP_QUERIES.iter().map(|q| q.to_string()).collect(),
    };

    let runtime = crate::create_runtime(&config).await?;
    println!("Pre-entrenando caché con {} consultas...", queries.len());

    let report = runtime
        .assistant
        .warm_with_concurrency(queries.as_slice(), args.concurrency)
        .await;

    if args.show {
        for (query, answer) in &report.answers {
            println!("\n{}\n{}", query, answer);
        }
    }

    println!(
        "\nNuevas: {}  Ya en caché: {}  Sin clave: {}  Fallidas: {}",
        report.warmed, report.already_cached, report.uncacheable, report.failed
    );
    let stats = runtime.assistant.cache_stats();
    println!("Entradas en caché: {}/{}", stats.size, stats.max_size);

    runtime.save_cache().await;
    Ok(())
}
