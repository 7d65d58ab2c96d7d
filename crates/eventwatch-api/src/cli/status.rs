//! Catalog status dashboard and reconciliation commands.

use anyhow::Result;
use console::style;

use eventwatch_core::catalog::query::catalog_stats;
use eventwatch_core::catalog::vector::VectorIndex;

use crate::state::AppState;

/// Display the catalog status dashboard.
///
/// Shows event counts by type and category, store sizes, and the dedup
/// settings in effect.
pub async fn status(state: &AppState, json: bool) -> Result<()> {
    let records = state.catalog.list().await?;
    let stats = catalog_stats(&records);
    let indexed = state.catalog.vector_index().count().await?;
    let config = &state.config;

    if json {
        let status = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": state.data_dir.display().to_string(),
            "events": stats,
            "indexed": indexed,
            "dedup": {
                "threshold": state.catalog.threshold(),
                "distance": config.vector.distance.to_string(),
                "embedding_model": config.embedding.model,
            },
            "pipeline_enabled": state.pipeline.is_some(),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} eventwatch v{}",
        style("⚡").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();

    println!("  {}", style("── Events ──").dim());
    println!("  Total:     {}", style(stats.total_events).bold());
    println!("  Indexed:   {}", index_count_style(indexed, stats.total_events));
    println!("  Locations: {}", stats.locations);
    println!();

    if !stats.by_event_type.is_empty() {
        println!("  {}", style("── By type ──").dim());
        for (event_type, count) in &stats.by_event_type {
            println!("  {:<24}{}", event_type, style(count).bold());
        }
        println!();
    }

    if !stats.by_category.is_empty() {
        println!("  {}", style("── By category ──").dim());
        for (category, count) in &stats.by_category {
            println!("  {:<40}{}", category, style(count).bold());
        }
        println!();
    }

    println!("  {}", style("── Dedup ──").dim());
    println!(
        "  Threshold: {} ({})",
        state.catalog.threshold(),
        config.vector.distance
    );
    println!("  Embedder:  {}", config.embedding.model);
    println!(
        "  Pipeline:  {}",
        if state.pipeline.is_some() {
            style(format!("enabled ({})", config.llm.model)).green()
        } else {
            style(format!("disabled (set {})", config.llm.api_key_env)).yellow()
        }
    );
    println!();
    println!("  Data: {}", style(state.data_dir.display()).dim());
    println!();

    Ok(())
}

fn index_count_style(indexed: u64, records: usize) -> console::StyledObject<String> {
    let text = indexed.to_string();
    if indexed == records as u64 {
        style(text).green()
    } else {
        style(format!("{text} (run `evwatch reconcile`)")).yellow()
    }
}

/// Run a reconciliation pass and report what changed.
pub async fn reconcile(state: &AppState, json: bool) -> Result<()> {
    let report = state.catalog.reconcile().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    if report.is_clean() {
        println!(
            "  {} Catalog consistent ({} events)",
            style("✓").green().bold(),
            report.records
        );
    } else {
        println!(
            "  {} Catalog repaired: {} re-indexed, {} orphaned entries pruned ({} events)",
            style("↻").yellow().bold(),
            report.reindexed,
            report.pruned,
            report.records
        );
    }
    println!();
    Ok(())
}
