//! Structured-event extraction port.

use std::future::Future;

use eventwatch_types::error::PipelineError;

/// Trait for extractors that turn a report into event JSON text.
///
/// The returned string is handed to
/// [`parse_payload`](super::payload::parse_payload) unchanged; extractors
/// need not validate it.
pub trait Extractor: Send + Sync {
    fn extract(
        &self,
        text: &str,
        existing_summary: Option<&str>,
    ) -> impl Future<Output = Result<String, PipelineError>> + Send;
}

/// Build the extraction prompt for `text`.
pub fn extraction_prompt(text: &str, existing_summary: Option<&str>) -> String {
    format!(
        "You are an expert in extracting structured information from reports about disasters.\n\
         Given the report and the existing event summary, return a JSON object with the \
         important details of the event. The JSON may include the following fields:\n\
         - event_type\n\
         - locations (separated by comma)\n\
         - people_killed (just a number)\n\
         - people_trapped (just a number)\n\
         - infrastructure_damage\n\
         - any other details you find relevant\n\
         - summary (updated, more detailed)\n\
         - category (the category named at the end of the report)\n\n\
         Report: \"{text}\"\n\
         Existing Event Summary: \"{}\"\n\n\
         Respond only in JSON format.",
        existing_summary.unwrap_or("None")
    )
}
