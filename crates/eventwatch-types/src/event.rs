use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a catalogued event, wrapping a UUID v7 (time-sortable).
///
/// Assigned by the record store on first insertion and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Create a new EventId using UUID v7.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create an EventId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EventId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// The body of an event record: everything except the store-assigned id.
///
/// Only `summary` has a fixed shape. Every other attribute is kept as the
/// JSON value it arrived as and persisted verbatim; the accessors below give
/// the read side typed views of the well-known ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventBody {
    /// Free-text description of the event. Required and non-empty.
    pub summary: String,

    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl EventBody {
    /// Create a body carrying only a summary.
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set_attribute(key, value);
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Set an attribute, returning the previous value.
    pub fn set_attribute(&mut self, key: &str, value: impl Into<Value>) -> Option<Value> {
        self.attributes.insert(key.to_string(), value.into())
    }

    /// Text view of a scalar attribute. Strings are returned as-is, numbers
    /// and booleans rendered; null, arrays and objects have no text view.
    pub fn text_attribute(&self, key: &str) -> Option<Cow<'_, str>> {
        self.attribute(key).and_then(scalar_text)
    }

    pub fn event_type(&self) -> Option<Cow<'_, str>> {
        self.text_attribute("event_type")
    }

    pub fn category(&self) -> Option<Cow<'_, str>> {
        self.text_attribute("category")
    }

    /// Place names from `locations`, which is either a comma-joined string or
    /// an array of names. Trimmed, empty entries skipped.
    pub fn location_list(&self) -> Vec<Cow<'_, str>> {
        let names: Vec<Cow<'_, str>> = match self.attribute("locations") {
            Some(Value::String(raw)) => raw.split(',').map(Cow::Borrowed).collect(),
            Some(Value::Array(items)) => items.iter().filter_map(scalar_text).collect(),
            Some(other) => scalar_text(other).into_iter().collect(),
            None => Vec::new(),
        };
        names
            .into_iter()
            .filter_map(|name| match name {
                Cow::Borrowed(s) => Some(Cow::Borrowed(s.trim())).filter(|n| !n.is_empty()),
                Cow::Owned(s) => Some(Cow::<str>::Owned(s.trim().to_string())).filter(|n| !n.is_empty()),
            })
            .collect()
    }

    /// Stamp the time the report was received.
    pub fn set_reported_at(&mut self, at: DateTime<Utc>) {
        self.set_attribute("timestamp", at.to_rfc3339());
    }

    /// The `timestamp` attribute, when it holds an RFC 3339 string.
    pub fn reported_at(&self) -> Option<DateTime<Utc>> {
        match self.attribute("timestamp")? {
            Value::String(raw) => DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|t| t.with_timezone(&Utc)),
            _ => None,
        }
    }
}

fn scalar_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        _ => None,
    }
}

/// A stored event: a body with its store-assigned id re-attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: EventId,

    #[serde(flatten)]
    pub body: EventBody,
}

impl EventRecord {
    pub fn new(id: EventId, body: EventBody) -> Self {
        Self { id, body }
    }
}

/// What `decide_and_apply` did with a candidate event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DedupOutcome {
    /// The candidate was a new, distinct event and got a fresh id.
    Inserted { id: EventId },
    /// The candidate matched an existing event at `distance` and replaced it.
    Updated { id: EventId, distance: f32 },
}

impl DedupOutcome {
    /// The id of the record that was written.
    pub fn id(&self) -> EventId {
        match self {
            DedupOutcome::Inserted { id } | DedupOutcome::Updated { id, .. } => *id,
        }
    }
}

impl fmt::Display for DedupOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DedupOutcome::Inserted { id } => write!(f, "inserted {id}"),
            DedupOutcome::Updated { id, distance } => {
                write!(f, "updated {id} (distance {distance:.4})")
            }
        }
    }
}

/// Read-side filter over the catalog.
///
/// Dimensions are AND-ed together; values within one dimension are OR-ed.
/// An empty dimension does not constrain the result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventFilter {
    #[serde(default)]
    pub event_types: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl EventFilter {
    pub fn is_empty(&self) -> bool {
        self.event_types.is_empty() && self.locations.is_empty() && self.categories.is_empty()
    }
}

/// Humanitarian information category assigned to informative reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HumanitarianCategory {
    AffectedIndividuals,
    InfrastructureAndUtilityDamage,
    InjuredOrDeadPeople,
    MissingOrFoundPeople,
    NotHumanitarian,
    OtherRelevantInformation,
    RescueVolunteeringOrDonationEffort,
    VehicleDamage,
}

impl HumanitarianCategory {
    pub const ALL: [HumanitarianCategory; 8] = [
        HumanitarianCategory::AffectedIndividuals,
        HumanitarianCategory::InfrastructureAndUtilityDamage,
        HumanitarianCategory::InjuredOrDeadPeople,
        HumanitarianCategory::MissingOrFoundPeople,
        HumanitarianCategory::NotHumanitarian,
        HumanitarianCategory::OtherRelevantInformation,
        HumanitarianCategory::RescueVolunteeringOrDonationEffort,
        HumanitarianCategory::VehicleDamage,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            HumanitarianCategory::AffectedIndividuals => "affected_individuals",
            HumanitarianCategory::InfrastructureAndUtilityDamage => {
                "infrastructure_and_utility_damage"
            }
            HumanitarianCategory::InjuredOrDeadPeople => "injured_or_dead_people",
            HumanitarianCategory::MissingOrFoundPeople => "missing_or_found_people",
            HumanitarianCategory::NotHumanitarian => "not_humanitarian",
            HumanitarianCategory::OtherRelevantInformation => "other_relevant_information",
            HumanitarianCategory::RescueVolunteeringOrDonationEffort => {
                "rescue_volunteering_or_donation_effort"
            }
            HumanitarianCategory::VehicleDamage => "vehicle_damage",
        }
    }
}

impl fmt::Display for HumanitarianCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for HumanitarianCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.label() == normalized)
            .ok_or_else(|| format!("unknown humanitarian category: '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_id_roundtrip_through_string() {
        let id = EventId::new();
        let parsed: EventId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_event_id_serializes_as_plain_string() {
        let id = EventId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap());
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, json!("550e8400-e29b-41d4-a716-446655440000"));
    }

    #[test]
    fn test_body_keeps_attributes_verbatim() {
        let input = json!({
            "summary": "Flood in Riverside",
            "event_type": "flood",
            "people_killed": 3,
            "locations": ["Riverside", "Lakeside"],
            "timestamp": 1714557600,
            "rescue_boats": {"deployed": 12}
        });
        let body: EventBody = serde_json::from_value(input.clone()).unwrap();

        assert_eq!(body.summary, "Flood in Riverside");
        assert_eq!(body.attribute("people_killed"), Some(&json!(3)));
        assert_eq!(serde_json::to_value(&body).unwrap(), input);
    }

    #[test]
    fn test_text_views_of_scalar_attributes() {
        let body = EventBody::new("x")
            .with_attribute("event_type", 5)
            .with_attribute("category", "vehicle_damage")
            .with_attribute("verified", true)
            .with_attribute("details", json!({"a": 1}));

        assert_eq!(body.event_type().as_deref(), Some("5"));
        assert_eq!(body.category().as_deref(), Some("vehicle_damage"));
        assert_eq!(body.text_attribute("verified").as_deref(), Some("true"));
        assert!(body.text_attribute("details").is_none());
        assert!(body.text_attribute("missing").is_none());
    }

    #[test]
    fn test_body_without_summary_fails_to_deserialize() {
        let result: Result<EventBody, _> = serde_json::from_value(json!({"event_type": "fire"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_record_flattens_body_next_to_id() {
        let id = EventId::new();
        let body = EventBody::new("Wildfire near Crestview")
            .with_attribute("category", "affected_individuals");
        let record = EventRecord::new(id, body);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], json!(id.to_string()));
        assert_eq!(value["summary"], json!("Wildfire near Crestview"));
        assert_eq!(value["category"], json!("affected_individuals"));

        let parsed: EventRecord = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, record);
        assert!(!parsed.body.attributes.contains_key("id"));
    }

    #[test]
    fn test_location_list_from_string_or_array() {
        let body = EventBody::new("x").with_attribute("locations", " Riverside, Crestview ,, Lakeside");
        assert_eq!(body.location_list(), vec!["Riverside", "Crestview", "Lakeside"]);

        let body = EventBody::new("x").with_attribute("locations", json!(["Riverside ", "", 12]));
        assert_eq!(body.location_list(), vec!["Riverside", "12"]);

        assert!(EventBody::new("x").location_list().is_empty());
        assert!(EventBody::new("x").with_attribute("locations", json!(null)).location_list().is_empty());
    }

    #[test]
    fn test_reported_at_roundtrip() {
        let mut body = EventBody::new("x");
        assert!(body.reported_at().is_none());

        let now = Utc::now();
        body.set_reported_at(now);
        assert_eq!(body.reported_at().map(|t| t.timestamp_micros()), Some(now.timestamp_micros()));

        body.set_attribute("timestamp", "2024-05-01 10:00");
        assert!(body.reported_at().is_none());
    }

    #[test]
    fn test_outcome_serializes_with_action_tag() {
        let id = EventId::new();
        let inserted = serde_json::to_value(DedupOutcome::Inserted { id }).unwrap();
        assert_eq!(inserted["action"], json!("inserted"));

        let updated = serde_json::to_value(DedupOutcome::Updated { id, distance: 0.25 }).unwrap();
        assert_eq!(updated["action"], json!("updated"));
        assert_eq!(updated["distance"], json!(0.25));
        assert_eq!(DedupOutcome::Updated { id, distance: 0.25 }.id(), id);
    }

    #[test]
    fn test_humanitarian_category_parse() {
        assert_eq!(
            "Injured_Or_Dead_People".parse::<HumanitarianCategory>().unwrap(),
            HumanitarianCategory::InjuredOrDeadPeople
        );
        assert!("earthquake".parse::<HumanitarianCategory>().is_err());
        for category in HumanitarianCategory::ALL {
            assert_eq!(category.label().parse::<HumanitarianCategory>().unwrap(), category);
        }
    }

    #[test]
    fn test_empty_filter() {
        assert!(EventFilter::default().is_empty());
        let filter = EventFilter {
            categories: vec!["vehicle_damage".into()],
            ..Default::default()
        };
        assert!(!filter.is_empty());
    }
}
