//! Read-side queries over a catalog snapshot.
//!
//! Pure functions over `&[EventRecord]`; callers take a snapshot from the
//! record store without holding the mutation lock.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use eventwatch_types::event::{EventFilter, EventRecord};

/// Distinct `event_type` values, sorted.
pub fn distinct_event_types(records: &[EventRecord]) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.body.event_type().map(|t| t.into_owned()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct place names across every record's `locations`, sorted.
pub fn distinct_locations(records: &[EventRecord]) -> Vec<String> {
    records
        .iter()
        .flat_map(|r| r.body.location_list())
        .map(|loc| loc.into_owned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct `category` values, sorted.
pub fn distinct_categories(records: &[EventRecord]) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.body.category().map(|c| c.into_owned()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Whether a record passes `filter`.
pub fn matches(record: &EventRecord, filter: &EventFilter) -> bool {
    let body = &record.body;

    if !filter.event_types.is_empty()
        && !body
            .event_type()
            .is_some_and(|t| filter.event_types.iter().any(|wanted| *wanted == *t))
    {
        return false;
    }

    if !filter.locations.is_empty()
        && !body
            .location_list()
            .iter()
            .any(|loc| filter.locations.iter().any(|wanted| *wanted == **loc))
    {
        return false;
    }

    if !filter.categories.is_empty()
        && !body
            .category()
            .is_some_and(|c| filter.categories.iter().any(|wanted| *wanted == *c))
    {
        return false;
    }

    true
}

/// Records passing `filter`, in catalog order.
pub fn filter_events(records: &[EventRecord], filter: &EventFilter) -> Vec<EventRecord> {
    records
        .iter()
        .filter(|r| matches(r, filter))
        .cloned()
        .collect()
}

/// Aggregate counts for dashboards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub total_events: usize,
    pub by_event_type: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
    pub locations: usize,
}

pub fn catalog_stats(records: &[EventRecord]) -> CatalogStats {
    let mut stats = CatalogStats {
        total_events: records.len(),
        locations: distinct_locations(records).len(),
        ..Default::default()
    };

    for record in records {
        let event_type = record.body.event_type().unwrap_or(Cow::Borrowed("unknown"));
        *stats.by_event_type.entry(event_type.into_owned()).or_default() += 1;

        let category = record.body.category().unwrap_or(Cow::Borrowed("unknown"));
        *stats.by_category.entry(category.into_owned()).or_default() += 1;
    }

    stats
}
