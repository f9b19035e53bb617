//! Store management commands

use std::sync::Arc;

use colored::Colorize;

use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::cli::context::{open_store, store_dir};
use crate::config::Config;
use crate::error::Result;
use crate::models::CacheEntryDisplay;
use crate::output::formatters::{format_datetime, format_size};
use crate::output::{Formattable, print_json};
use crate::resource::{CachedResourceSet, ResourceType};
use crate::store::key::resource_key;
use crate::store::{KeyValueStore, get_json};

/// Summarize every resource set in `store`.
///
/// Reads the persisted sets directly so no API key is needed.
pub fn cache_entries(store: &dyn KeyValueStore, config: &Config) -> Vec<CacheEntryDisplay> {
    ResourceType::ALL
        .iter()
        .map(|rt| {
            let set = match get_json::<CachedResourceSet<serde_json::Value>>(store, &resource_key(*rt))
            {
                Ok(Some(set)) => set,
                Ok(None) => CachedResourceSet::empty(*rt),
                Err(e) => {
                    log::warn!("Unreadable cached {}: {}", rt, e);
                    CachedResourceSet::empty(*rt)
                }
            };
            let expires_at = set.expires_at(config.resources.cache_duration(*rt));
            CacheEntryDisplay::new(*rt, set.items.len(), set.last_queried_at, expires_at)
        })
        .collect()
}

fn location(opts: &GlobalOptions) -> String {
    match store_dir(opts.store_ref()) {
        Ok(Some(dir)) => dir.display().to_string(),
        Ok(None) => "in memory".to_string(),
        Err(_) => "unknown".to_string(),
    }
}

/// Show cached resource sets and store statistics
pub fn status(opts: &GlobalOptions) -> Result<()> {
    let config = Config::load_at(opts.config_ref()).unwrap_or_default();
    let store: Arc<dyn KeyValueStore> = open_store(opts.store_ref())?;
    let stats = store.stats()?;
    let entries = cache_entries(store.as_ref(), &config);

    match opts.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "path": location(opts),
                "resources": entries,
                "pending_challenges": stats.pending_challenges,
                "total_entries": stats.total_entries,
                "total_size_bytes": stats.total_size_bytes,
                "oldest_update_timestamp": stats.oldest_update,
                "newest_update_timestamp": stats.newest_update,
            });
            print_json(&json)?;
        }
        OutputFormat::Table => {
            println!("Store Status");
            println!("────────────────────────────────────────");
            println!("Location:            {}", location(opts));
            println!("Entries:             {}", stats.total_entries);
            println!("Pending challenges:  {}", stats.pending_challenges);
            println!("Total size:          {}", format_size(stats.total_size_bytes));
            if let Some(newest) = stats.newest_update {
                let at = chrono::DateTime::from_timestamp(newest, 0);
                println!("Last write:          {}", format_datetime(at));
            }
            println!();
            entries.print(opts.format)?;
        }
    }

    Ok(())
}

/// Delete every cached resource set and challenge
pub fn clear(opts: &GlobalOptions) -> Result<()> {
    let store = open_store(opts.store_ref())?;
    let stats = store.clear()?;

    match opts.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "entries_removed": stats.entries_removed,
                "success": true,
            });
            print_json(&json)?;
        }
        OutputFormat::Table => {
            if stats.entries_removed > 0 {
                println!(
                    "{} Cleared {} store entries",
                    "✓".green(),
                    stats.entries_removed
                );
            } else {
                println!("Store was already empty");
            }
        }
    }

    Ok(())
}

/// Print the store location
pub fn path(opts: &GlobalOptions) -> Result<()> {
    println!("{}", location(opts));
    Ok(())
}
