//! Resource cache commands

use std::time::Duration;

use colored::Colorize;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use serde::Serialize;

use crate::cli::args::GlobalOptions;
use crate::cli::{CommandContext, OutputFormat, PaginationArgs};
use crate::client::models::{CustomField, Form, LandingPage, Post, Product, Sequence, Tag};
use crate::error::{Error, Result};
use crate::models::ResourceDisplay;
use crate::output::table::format_details;
use crate::output::{Formattable, print_json};
use crate::resource::{CacheOptions, Resource, ResourceCache, ResourceType};
use crate::scheduler::{JobScheduler, TokioScheduler};

/// Outcome of refreshing one resource type
#[derive(Debug, Serialize)]
struct RefreshOutcome {
    resource_type: ResourceType,
    items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

// ============================================================================
// List Command
// ============================================================================

/// List one page of a cached resource type, refreshing it when expired
pub async fn list(
    opts: &GlobalOptions,
    resource_type: ResourceType,
    pagination: &PaginationArgs,
) -> Result<()> {
    let ctx = CommandContext::new(opts)?;

    match resource_type {
        ResourceType::Forms => list_type::<Form>(&ctx, pagination).await,
        ResourceType::LandingPages => list_type::<LandingPage>(&ctx, pagination).await,
        ResourceType::Tags => list_type::<Tag>(&ctx, pagination).await,
        ResourceType::Sequences => list_type::<Sequence>(&ctx, pagination).await,
        ResourceType::CustomFields => list_type::<CustomField>(&ctx, pagination).await,
        ResourceType::Posts => list_type::<Post>(&ctx, pagination).await,
        ResourceType::Products => list_type::<Product>(&ctx, pagination).await,
    }
}

async fn list_type<R>(ctx: &CommandContext, pagination: &PaginationArgs) -> Result<()>
where
    R: Resource,
    for<'a> ResourceDisplay: From<&'a R>,
{
    let options = pagination.apply(CacheOptions::from_settings(&ctx.config.resources, R::TYPE));
    let cache: ResourceCache<R> = ctx.cache_with(options);
    load_or_warn(ctx, &cache).await;

    let subset = cache.get_paginated_subset(pagination.page, pagination.per_page);
    debug!(
        "Showing page {}/{} of {} ({} items)",
        subset.page,
        subset.total_pages,
        R::TYPE,
        cache.count()
    );

    match ctx.format {
        OutputFormat::Json => print_json(&subset)?,
        OutputFormat::Table => {
            let rows: Vec<ResourceDisplay> = subset.items.iter().map(ResourceDisplay::from).collect();
            rows.print(ctx.format)?;
            if subset.total_pages > 1 {
                println!(
                    "{}",
                    format!("Page {} of {}", subset.page, subset.total_pages).dimmed()
                );
            }
        }
    }

    cache.finish_background_refresh().await;
    Ok(())
}

/// Load a cache, warning instead of failing when the API is unreachable
async fn load_or_warn<R: Resource>(ctx: &CommandContext, cache: &ResourceCache<R>) {
    if let Err(e) = cache.load().await {
        log::warn!("Refreshing {} failed: {}", R::TYPE, e);
        let what = if cache.exist() { "cached" } else { "no" };
        eprintln!(
            "{} Could not refresh {}, showing {} data",
            "⚠".yellow(),
            R::TYPE,
            what
        );
        if ctx.config.debug {
            eprintln!("  {}", e.to_string().dimmed());
        }
    }
}

// ============================================================================
// Get Command
// ============================================================================

/// Show one cached record
pub async fn get(opts: &GlobalOptions, resource_type: ResourceType, id: u64) -> Result<()> {
    let ctx = CommandContext::new(opts)?;

    match resource_type {
        ResourceType::Forms => get_type::<Form>(&ctx, id).await,
        ResourceType::LandingPages => get_type::<LandingPage>(&ctx, id).await,
        ResourceType::Tags => get_type::<Tag>(&ctx, id).await,
        ResourceType::Sequences => get_type::<Sequence>(&ctx, id).await,
        ResourceType::CustomFields => get_type::<CustomField>(&ctx, id).await,
        ResourceType::Posts => get_type::<Post>(&ctx, id).await,
        ResourceType::Products => get_type::<Product>(&ctx, id).await,
    }
}

async fn get_type<R: Resource>(ctx: &CommandContext, id: u64) -> Result<()> {
    let cache: ResourceCache<R> = ctx.cache();
    load_or_warn(ctx, &cache).await;

    let record = cache.get_by_id(id);
    cache.finish_background_refresh().await;
    let record = record.ok_or_else(|| Error::NotFound(format!("{} {}", R::TYPE, id)))?;

    match ctx.format {
        OutputFormat::Json => print_json(&record)?,
        OutputFormat::Table => {
            let value = serde_json::to_value(&record)?;
            let pairs: Vec<(&str, String)> = match value.as_object() {
                Some(fields) => fields
                    .iter()
                    .map(|(k, v)| {
                        let v = match v {
                            serde_json::Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        (k.as_str(), v)
                    })
                    .collect(),
                None => vec![("value", value.to_string())],
            };
            println!("{}", format_details(&pairs));
        }
    }

    Ok(())
}

// ============================================================================
// Refresh Command
// ============================================================================

/// Refresh one resource type, or every type concurrently
pub async fn refresh(opts: &GlobalOptions, resource_type: Option<ResourceType>) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let types: Vec<ResourceType> = match resource_type {
        Some(rt) => vec![rt],
        None => ResourceType::ALL.to_vec(),
    };

    let spinner = spinner(ctx.format);
    spinner.set_message(format!("Refreshing {} resource types...", types.len()));

    let mut pending: FuturesUnordered<BoxFuture<'_, (ResourceType, Result<usize>)>> =
        types.iter().map(|rt| refresh_type(&ctx, *rt)).collect();

    let mut results = Vec::with_capacity(types.len());
    while let Some((rt, result)) = pending.next().await {
        spinner.set_message(format!("Refreshed {}", rt));
        results.push((rt, result));
    }
    spinner.finish_and_clear();
    results.sort_by_key(|(rt, _)| *rt);

    let outcomes: Vec<RefreshOutcome> = results
        .iter()
        .map(|(rt, result)| RefreshOutcome {
            resource_type: *rt,
            items: result.as_ref().ok().copied(),
            error: result.as_ref().err().map(|e| e.to_string()),
        })
        .collect();

    match ctx.format {
        OutputFormat::Json => print_json(&outcomes)?,
        OutputFormat::Table => {
            for outcome in &outcomes {
                match (&outcome.items, &outcome.error) {
                    (Some(items), _) => {
                        println!("{} {} ({} items)", "✓".green(), outcome.resource_type, items)
                    }
                    (None, Some(error)) => {
                        println!("{} {}: {}", "✗".red(), outcome.resource_type, error)
                    }
                    (None, None) => {}
                }
            }
        }
    }

    // Partial failures are reported above; fail only when nothing refreshed
    if results.iter().all(|(_, result)| result.is_err())
        && let Some((_, Err(e))) = results.into_iter().next()
    {
        return Err(e);
    }

    Ok(())
}

fn refresh_type(
    ctx: &CommandContext,
    resource_type: ResourceType,
) -> BoxFuture<'_, (ResourceType, Result<usize>)> {
    match resource_type {
        ResourceType::Forms => Box::pin(refresh_one::<Form>(ctx)),
        ResourceType::LandingPages => Box::pin(refresh_one::<LandingPage>(ctx)),
        ResourceType::Tags => Box::pin(refresh_one::<Tag>(ctx)),
        ResourceType::Sequences => Box::pin(refresh_one::<Sequence>(ctx)),
        ResourceType::CustomFields => Box::pin(refresh_one::<CustomField>(ctx)),
        ResourceType::Posts => Box::pin(refresh_one::<Post>(ctx)),
        ResourceType::Products => Box::pin(refresh_one::<Product>(ctx)),
    }
}

async fn refresh_one<R: Resource>(ctx: &CommandContext) -> (ResourceType, Result<usize>) {
    let cache: ResourceCache<R> = ctx.cache();
    let result = cache.refresh().await.map(|items| items.len());
    if let Err(e) = &result {
        debug!("Failed to refresh {}: {}", R::TYPE, e);
    }
    (R::TYPE, result)
}

fn spinner(format: OutputFormat) -> ProgressBar {
    if format == OutputFormat::Json {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

// ============================================================================
// Watch Command
// ============================================================================

/// Keep every resource type fresh until Ctrl-C
pub async fn watch(opts: &GlobalOptions, interval: Option<u64>) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let interval = match interval {
        Some(secs) => Duration::from_secs(secs.max(1)),
        None => ctx.config.resources.refresh_interval(),
    };

    let scheduler = TokioScheduler::new();
    schedule_type::<Form>(&ctx, &scheduler, interval);
    schedule_type::<LandingPage>(&ctx, &scheduler, interval);
    schedule_type::<Tag>(&ctx, &scheduler, interval);
    schedule_type::<Sequence>(&ctx, &scheduler, interval);
    schedule_type::<CustomField>(&ctx, &scheduler, interval);
    schedule_type::<Post>(&ctx, &scheduler, interval);
    schedule_type::<Product>(&ctx, &scheduler, interval);

    eprintln!(
        "{} Refreshing {} resource types every {}s. Press Ctrl-C to stop.",
        "○".dimmed(),
        scheduler.job_names().len(),
        interval.as_secs()
    );

    tokio::signal::ctrl_c().await?;

    for name in scheduler.job_names() {
        scheduler.unschedule(&name);
    }
    eprintln!("{} Stopped", "✓".green());
    Ok(())
}

fn schedule_type<R: Resource>(ctx: &CommandContext, scheduler: &TokioScheduler, interval: Duration) {
    let cache: ResourceCache<R> = ctx.cache();
    if !cache.schedule_periodic_refresh(scheduler, interval) {
        log::warn!("Refresh of {} already scheduled", R::TYPE);
    }
}
