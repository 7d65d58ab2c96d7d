//! Report classification port.
//!
//! A report is first judged informative or not; informative reports also
//! get a humanitarian category. Implementations live in eventwatch-infra.

use std::future::Future;

use serde::Deserialize;

use eventwatch_types::error::PipelineError;
use eventwatch_types::event::HumanitarianCategory;

/// Result of classifying one report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub informative: bool,
    /// Only meaningful when `informative` is true.
    pub category: Option<HumanitarianCategory>,
}

impl Classification {
    pub fn not_informative() -> Self {
        Self {
            informative: false,
            category: None,
        }
    }

    pub fn informative(category: HumanitarianCategory) -> Self {
        Self {
            informative: true,
            category: Some(category),
        }
    }
}

/// Trait for report classifiers.
pub trait Classifier: Send + Sync {
    fn classify(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<Classification, PipelineError>> + Send;
}

/// Build the prompt an LLM-backed classifier sends for `text`.
pub fn classification_prompt(text: &str) -> String {
    let labels: Vec<&str> = HumanitarianCategory::ALL.iter().map(|c| c.label()).collect();
    format!(
        "You classify short social media reports about disasters.\n\
         Decide whether the report is informative, meaning it carries concrete \
         disaster-related information. If it is, pick exactly one humanitarian \
         category from: {}.\n\n\
         Report: \"{text}\"\n\n\
         Respond only in JSON of the form \
         {{\"informative\": true, \"category\": \"<label>\"}}.",
        labels.join(", ")
    )
}

#[derive(Deserialize)]
struct RawClassification {
    informative: bool,
    #[serde(default)]
    category: Option<String>,
}

/// Parse a model reply produced from [`classification_prompt`].
///
/// An informative reply with a missing or unknown label falls back to
/// `other_relevant_information` rather than failing the whole report.
pub fn parse_classification(reply: &str) -> Result<Classification, PipelineError> {
    let trimmed = reply
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    let raw: RawClassification = serde_json::from_str(trimmed)
        .map_err(|e| PipelineError::Classifier(format!("unparseable classification: {e}")))?;

    if !raw.informative {
        return Ok(Classification::not_informative());
    }

    let category = raw
        .category
        .and_then(|label| label.parse().ok())
        .unwrap_or(HumanitarianCategory::OtherRelevantInformation);
    Ok(Classification::informative(category))
}
