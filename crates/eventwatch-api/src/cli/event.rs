//! Event CLI commands: ingest, submit, list, show, delete.

use anyhow::{Context, Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use tokio::io::AsyncReadExt;

use eventwatch_core::catalog::query::filter_events;
use eventwatch_core::ingest::payload::{IngestPayload, parse_payload};
use eventwatch_core::ingest::pipeline::PipelineOutcome;
use eventwatch_types::error::CatalogError;
use eventwatch_types::event::{DedupOutcome, EventBody, EventFilter, EventId, EventRecord};

use crate::state::AppState;

/// Read a payload argument; `-` means stdin.
async fn read_payload_arg(arg: &str) -> Result<String> {
    if arg != "-" {
        return Ok(arg.to_string());
    }
    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("failed to read payload from stdin")?;
    Ok(input)
}

/// Decode CLI input into a payload. Input that is not JSON at all is kept
/// as raw text so the parser reports it as an invalid JSON string.
pub fn payload_from_input(input: &str) -> IngestPayload {
    serde_json::from_str::<IngestPayload>(input)
        .unwrap_or_else(|_| IngestPayload::Raw(input.to_string()))
}

fn parse_id(raw: &str) -> Result<EventId> {
    raw.trim()
        .parse()
        .with_context(|| format!("'{raw}' is not a valid event id"))
}

fn print_outcome(outcome: &DedupOutcome) {
    match outcome {
        DedupOutcome::Inserted { id } => println!(
            "  {} New event {}",
            style("✓").green().bold(),
            style(id).cyan()
        ),
        DedupOutcome::Updated { id, distance } => println!(
            "  {} Merged into {} {}",
            style("↻").yellow().bold(),
            style(id).cyan(),
            style(format!("(distance {distance:.4})")).dim()
        ),
    }
}

/// Catalog an already-extracted event.
pub async fn ingest(state: &AppState, payload: &str, json: bool) -> Result<()> {
    let input = read_payload_arg(payload).await?;
    let body = parse_payload(payload_from_input(&input))?;
    let outcome = state.catalog.decide_and_apply(body).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!();
    print_outcome(&outcome);
    println!();
    Ok(())
}

/// Run a report through the classify/extract pipeline.
pub async fn submit(state: &AppState, text: &str, json: bool) -> Result<()> {
    let Some(pipeline) = &state.pipeline else {
        bail!(
            "report submission is disabled: set {} to enable it",
            state.config.llm.api_key_env
        );
    };

    let outcome = pipeline.submit(text).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!();
    match &outcome {
        PipelineOutcome::NotInformative => println!(
            "  {} This report doesn't contain any disaster related information.",
            style("i").blue().bold()
        ),
        PipelineOutcome::Catalogued { category, outcome } => {
            if let Some(category) = category {
                println!("  {}  {}", style("Category:").bold(), category);
            }
            print_outcome(outcome);
        }
    }
    println!();
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

/// List events in a table, optionally filtered.
pub async fn list(state: &AppState, filter: EventFilter, json: bool) -> Result<()> {
    let records = state.catalog.list().await?;
    let events = if filter.is_empty() {
        records
    } else {
        filter_events(&records, &filter)
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }

    if events.is_empty() {
        println!();
        println!(
            "  {} No events found. Add one with: {}",
            style("i").blue().bold(),
            style("evwatch ingest '{\"summary\": \"...\"}'").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Type").fg(Color::White),
        Cell::new("Locations").fg(Color::White),
        Cell::new("Category").fg(Color::White),
        Cell::new("Summary").fg(Color::White),
    ]);

    for event in &events {
        let body = &event.body;
        table.add_row(vec![
            Cell::new(event.id.to_string()).fg(Color::DarkGrey),
            Cell::new(body.event_type().as_deref().unwrap_or("-")).fg(Color::Cyan),
            Cell::new(locations_cell(body)),
            Cell::new(body.category().as_deref().unwrap_or("-")).fg(Color::Yellow),
            Cell::new(truncate(&body.summary, 60)),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} event{}",
        style(events.len()).bold(),
        if events.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

fn locations_cell(body: &EventBody) -> String {
    let locations = body.location_list();
    if locations.is_empty() {
        "-".to_string()
    } else {
        locations.join(", ")
    }
}

/// Attributes shown first, with their labels, in this order.
const KNOWN_ATTRIBUTES: &[(&str, &str)] = &[
    ("event_type", "Type:"),
    ("category", "Category:"),
    ("locations", "Locations:"),
    ("people_killed", "Killed:"),
    ("people_trapped", "Trapped:"),
    ("infrastructure_damage", "Damage:"),
    ("timestamp", "Reported:"),
];

fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items.iter().map(display_value).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

fn print_record(record: &EventRecord) {
    let body = &record.body;
    let field = |label: &str, value: String| {
        println!("  {:<16}{}", style(label).bold(), value);
    };

    println!();
    println!("  {}", style(&body.summary).cyan().bold());
    println!();
    field("ID:", record.id.to_string());
    for (key, label) in KNOWN_ATTRIBUTES {
        if let Some(value) = body.attribute(key).filter(|v| !v.is_null()) {
            field(label, display_value(value));
        }
    }
    for (key, value) in &body.attributes {
        if !KNOWN_ATTRIBUTES.iter().any(|(known, _)| known == key) {
            field(&format!("{key}:"), display_value(value));
        }
    }
    println!();
}

/// Show one event.
pub async fn show(state: &AppState, id: &str, json: bool) -> Result<()> {
    let id = parse_id(id)?;
    let record = state
        .catalog
        .get(&id)
        .await?
        .ok_or(CatalogError::NotFound(id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    print_record(&record);
    Ok(())
}

/// Delete an event from both stores.
pub async fn delete(state: &AppState, id: &str, json: bool) -> Result<()> {
    let id = parse_id(id)?;
    let deleted = state.catalog.delete(&id).await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "id": id, "deleted": deleted }))?
        );
        return Ok(());
    }

    if !deleted {
        return Err(CatalogError::NotFound(id).into());
    }
    println!();
    println!("  {} Deleted event {}", style("✓").green().bold(), style(id).cyan());
    println!();
    Ok(())
}
