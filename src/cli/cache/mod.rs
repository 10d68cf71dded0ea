//! Cache command - works on the persisted snapshot, no model access needed

use anyhow::bail;
use clap::Subcommand;

use crate::cli::{init_console_logging, load_config};
use crate::domain::{CacheStats, SemanticCache};
use crate::infrastructure::semantic_cache::{CachePersistence, InMemorySemanticCache};

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show cache statistics
    Stats,

    /// Remove every cached answer
    Clear {
        /// Also zero the hit and miss counters
        #[arg(long)]
        reset_stats: bool,
    },
}

pub async fn run(command: CacheCommand) -> anyhow::Result<()> {
    let config = load_config()?;
    init_console_logging(&config);

    let Some(path) = config.cache.persistence_path.clone() else {
        bail!("cache.persistence_path is not configured, there is no saved cache");
    };
    let persistence = CachePersistence::new(path);
    let cache = InMemorySemanticCache::from_config(&config.cache);
    persistence.restore_into(&cache).await;

    match command {
        CacheCommand::Stats => print_stats(&cache.stats()),
        CacheCommand::Clear { reset_stats } => {
            clear(&cache, reset_stats);
            persistence.save(&cache.snapshot()).await?;
            println!("Caché limpiado.");
            print_stats(&cache.stats());
        }
    }

    Ok(())
}

fn clear(cache: &dyn SemanticCache, reset_stats: bool) {
    cache.clear();
    if reset_stats {
        cache.reset_stats();
    }
}

fn print_stats(stats: &CacheStats) {
    println!("Entradas:   {}/{}", stats.size, stats.max_size);
    println!("Aciertos:   {}", stats.hits);
    println!("Fallos:     {}", stats.misses);
    println!("Tasa:       {:.1}%", stats.hit_rate * 100.0);
    println!("Desalojos:  {}", stats.evictions);
}
