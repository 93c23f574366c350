//! `fieldbook cache` command - Manage the query cache
//!
//! The cache is a local SQLite database holding recent backend responses,
//! one partition per record kind. It is user-local and disposable: clearing
//! it only means the next reads go to the backend.

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::commands::utils::load_config;
use crate::cli::GlobalOpts;
use crate::core::{Config, QueryCache, RecordKind};

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show cache statistics
    Status,

    /// Drop cached responses
    Clear {
        /// Only this record kind (fields, crops, field-works)
        #[arg(long)]
        kind: Option<RecordKind>,
    },
}

pub fn run(cmd: CacheCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CacheCommands::Status => run_status(global),
        CacheCommands::Clear { kind } => run_clear(kind, global),
    }
}

fn open(config: &Config) -> Result<Option<QueryCache>> {
    let path = Config::cache_path()
        .ok_or_else(|| miette::miette!("Could not determine the cache directory"))?;
    if !path.exists() {
        return Ok(None);
    }
    Ok(Some(QueryCache::open(&path, config.cache_max_age())?))
}

fn run_status(global: &GlobalOpts) -> Result<()> {
    let config = load_config(global);
    let location = Config::cache_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(unknown)".to_string());

    println!("{}", style("Cache Status").bold());
    println!("{}", style("─".repeat(40)).dim());
    println!("  Location:        {}", location);
    println!(
        "  Enabled:         {}",
        if config.cache_enabled() {
            style("yes").green()
        } else {
            style("no").yellow()
        }
    );
    println!("  Max age:         {}s", config.cache_max_age().as_secs());

    let Some(cache) = open(&config)? else {
        println!("  {}", style("(not created)").dim());
        return Ok(());
    };

    let stats = cache.statistics()?;
    println!("  Total entries:   {}", style(stats.total_entries).cyan());
    println!("  Stale entries:   {}", style(stats.stale_entries).cyan());
    println!(
        "  Database size:   {} KB",
        style(stats.db_size_bytes / 1024).cyan()
    );

    if !stats.by_partition.is_empty() {
        println!();
        println!("  {}", style("By Kind:").bold());
        for (partition, count) in &stats.by_partition {
            println!("    {:<12} {}", partition, count);
        }
    }

    Ok(())
}

fn run_clear(kind: Option<RecordKind>, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global);
    let Some(cache) = open(&config)? else {
        println!("No cache to clear");
        return Ok(());
    };

    let removed = match kind {
        Some(kind) => cache.invalidate(kind)?,
        None => cache.clear()?,
    };

    let scope = kind
        .map(|k| format!(" ({})", k))
        .unwrap_or_default();
    println!(
        "{} Cache cleared{}: {} entr{} removed",
        style("✓").green(),
        scope,
        removed,
        if removed == 1 { "y" } else { "ies" }
    );

    Ok(())
}
