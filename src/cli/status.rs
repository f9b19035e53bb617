//! Status command implementation

use colored::Colorize;

use crate::cli::args::GlobalOptions;
use crate::cli::cache::cache_entries;
use crate::cli::context::{open_store, store_dir};
use crate::config::Config;
use crate::error::Result;
use crate::output::formatters::format_duration;

/// Run the status command to display configuration status
pub fn run(opts: &GlobalOptions) -> Result<()> {
    println!("{}\n", "kitgate Configuration Status".bold());

    let config = match Config::load_at(opts.config_ref()) {
        Ok(config) => config,
        Err(_) => {
            println!("{} Configuration not found", "✗".red());
            println!();
            println!(
                "Run {} to create a configuration file.",
                "kitgate init".cyan()
            );
            println!();
            return Ok(());
        }
    };

    let config_path = Config::resolve_path(opts.config_ref())?;
    println!("Config file: {}", config_path.display().to_string().cyan());
    println!();

    if config.validate_auth().is_ok() {
        println!("{} API key configured", "✓".green());
    } else {
        println!("{} API key not configured", "✗".red());
        println!("  → Run 'kitgate init' to configure");
    }

    match config.signing_secret_bytes() {
        Ok(_) => println!("{} Signing secret configured", "✓".green()),
        Err(e) => {
            println!("{} Signing secret unusable: {}", "✗".red(), e);
            println!("  → Run 'kitgate init' to generate one");
        }
    }

    let host = opts.api_host_ref().or(config.api_host.as_deref());
    if let Some(host) = host {
        println!("{} Custom API host: {}", "○".dimmed(), host.cyan());
    }

    let rc = &config.restrict_content;
    println!(
        "{} Codes expire after {}, proofs after {}",
        "○".dimmed(),
        format_duration(std::time::Duration::from_secs(rc.code_ttl_secs)),
        format_duration(std::time::Duration::from_secs(rc.proof_ttl_secs))
    );
    if rc.permit_crawlers {
        println!(
            "{} Crawlers allowed from {} ranges",
            "○".dimmed(),
            rc.crawler_ip_ranges.len()
        );
    }

    println!();

    match store_dir(opts.store_ref()) {
        Ok(Some(dir)) => println!("Store: {}", dir.display().to_string().cyan()),
        Ok(None) => println!("Store: {}", "in memory".cyan()),
        Err(e) => println!("{} Store unavailable: {}", "⚠".yellow(), e),
    }

    match open_store(opts.store_ref()) {
        Ok(store) => {
            for entry in cache_entries(store.as_ref(), &config) {
                let marker = if entry.last_queried_at.is_none() {
                    "○".dimmed()
                } else if entry.expires.starts_with("expired") {
                    "⚠".yellow()
                } else {
                    "✓".green()
                };
                println!(
                    "{} {:<14} {:>5} items  (expires: {})",
                    marker,
                    entry.resource_type.to_string(),
                    entry.items,
                    entry.expires
                );
            }
        }
        Err(e) => println!("{} Could not open store: {}", "⚠".yellow(), e),
    }

    println!();
    Ok(())
}
