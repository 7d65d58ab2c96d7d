//! Classify, extract, and catalog one report.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use eventwatch_types::error::{CatalogError, PipelineError};
use eventwatch_types::event::{DedupOutcome, HumanitarianCategory};

use super::classifier::Classifier;
use super::extractor::Extractor;
use super::payload::{IngestPayload, parse_payload};
use crate::catalog::engine::EventCatalog;
use crate::catalog::store::RecordStore;
use crate::catalog::vector::VectorIndex;

/// What happened to a submitted report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// The classifier judged the report not disaster-related; nothing stored.
    NotInformative,
    Catalogued {
        category: Option<HumanitarianCategory>,
        #[serde(flatten)]
        outcome: DedupOutcome,
    },
}

/// Report ingestion in front of an [`EventCatalog`].
pub struct IngestionPipeline<C, X, R, V>
where
    C: Classifier,
    X: Extractor,
    R: RecordStore,
    V: VectorIndex,
{
    classifier: C,
    extractor: X,
    catalog: Arc<EventCatalog<R, V>>,
}

impl<C, X, R, V> IngestionPipeline<C, X, R, V>
where
    C: Classifier,
    X: Extractor,
    R: RecordStore,
    V: VectorIndex,
{
    pub fn new(classifier: C, extractor: X, catalog: Arc<EventCatalog<R, V>>) -> Self {
        Self {
            classifier,
            extractor,
            catalog,
        }
    }

    pub fn catalog(&self) -> &Arc<EventCatalog<R, V>> {
        &self.catalog
    }

    /// Run one free-text report through classification and extraction,
    /// then hand the extracted event to the dedup engine.
    ///
    /// The category label is appended to the text before extraction so the
    /// extractor can echo it; if the extracted event still lacks one, the
    /// classifier's label is filled in. The timestamp is always stamped here.
    #[tracing::instrument(name = "submit_report", skip_all, fields(len = text.len()))]
    pub async fn submit(&self, text: &str) -> Result<PipelineOutcome, PipelineError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CatalogError::validation("report text must not be empty").into());
        }

        let classification = self.classifier.classify(text).await?;
        if !classification.informative {
            info!("Report is not informative, skipping");
            return Ok(PipelineOutcome::NotInformative);
        }

        let annotated = match classification.category {
            Some(category) => format!("{text}, Category: {category}"),
            None => text.to_string(),
        };
        debug!(category = ?classification.category, "Report classified");

        let extracted = self.extractor.extract(&annotated, None).await?;
        let mut body = parse_payload(IngestPayload::Raw(extracted))?;

        if body.category().is_none() {
            if let Some(category) = classification.category {
                body.set_attribute("category", category.label());
            }
        }
        body.set_reported_at(Utc::now());

        let outcome = self.catalog.decide_and_apply(body).await?;
        Ok(PipelineOutcome::Catalogued {
            category: classification.category,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::catalog::box_embedder::BoxEmbedder;
    use crate::catalog::testing::{MockEmbedder, MockRecordStore, MockVectorIndex};
    use crate::ingest::classifier::Classification;

    struct FixedClassifier(Result<Classification, String>);

    impl Classifier for FixedClassifier {
        async fn classify(&self, _text: &str) -> Result<Classification, PipelineError> {
            self.0.clone().map_err(PipelineError::Classifier)
        }
    }

    /// Returns a canned reply and records the text it was given.
    struct CannedExtractor {
        reply: String,
        seen: Mutex<Vec<String>>,
    }

    impl CannedExtractor {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl Extractor for CannedExtractor {
        async fn extract(
            &self,
            text: &str,
            existing_summary: Option<&str>,
        ) -> Result<String, PipelineError> {
            assert!(existing_summary.is_none());
            self.seen.lock().unwrap().push(text.to_string());
            Ok(self.reply.clone())
        }
    }

    fn catalog() -> Arc<EventCatalog<MockRecordStore, MockVectorIndex>> {
        Arc::new(EventCatalog::new(
            MockRecordStore::new(),
            MockVectorIndex::new(),
            Arc::new(BoxEmbedder::new(
                MockEmbedder::new()
                    .with("Flood in Riverside", vec![0.0])
                    .with("Major flood hits Riverside area", vec![0.3]),
            )),
            0.6,
        ))
    }

    fn pipeline(
        classification: Result<Classification, String>,
        reply: &str,
    ) -> IngestionPipeline<FixedClassifier, CannedExtractor, MockRecordStore, MockVectorIndex> {
        IngestionPipeline::new(
            FixedClassifier(classification),
            CannedExtractor::new(reply),
            catalog(),
        )
    }

    #[tokio::test]
    async fn test_informative_report_is_catalogued() {
        let pipeline = pipeline(
            Ok(Classification::informative(
                HumanitarianCategory::AffectedIndividuals,
            )),
            r#"{"summary": "Flood in Riverside", "event_type": "flood"}"#,
        );

        let outcome = pipeline.submit("Water everywhere in Riverside").await.unwrap();
        let PipelineOutcome::Catalogued { category, outcome } = outcome else {
            panic!("expected a catalogued outcome");
        };
        assert_eq!(category, Some(HumanitarianCategory::AffectedIndividuals));
        assert!(matches!(outcome, DedupOutcome::Inserted { .. }));

        let seen = pipeline.extractor.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec!["Water everywhere in Riverside, Category: affected_individuals"]
        );

        let stored = pipeline.catalog().record_store().snapshot();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].body.category().as_deref(), Some("affected_individuals"));
        assert!(stored[0].body.reported_at().is_some());
    }

    #[tokio::test]
    async fn test_extracted_category_is_kept() {
        let pipeline = pipeline(
            Ok(Classification::informative(
                HumanitarianCategory::AffectedIndividuals,
            )),
            r#"{"summary": "Flood in Riverside", "category": "injured_or_dead_people"}"#,
        );

        pipeline.submit("Flood").await.unwrap();
        let stored = pipeline.catalog().record_store().snapshot();
        assert_eq!(stored[0].body.category().as_deref(), Some("injured_or_dead_people"));
    }

    #[tokio::test]
    async fn test_second_similar_report_updates() {
        let catalog = catalog();
        let classifier = || {
            FixedClassifier(Ok(Classification::informative(
                HumanitarianCategory::AffectedIndividuals,
            )))
        };
        let first = IngestionPipeline::new(
            classifier(),
            CannedExtractor::new(r#"{"summary": "Flood in Riverside"}"#),
            Arc::clone(&catalog),
        );
        let second = IngestionPipeline::new(
            classifier(),
            CannedExtractor::new(r#"{"summary": "Major flood hits Riverside area"}"#),
            Arc::clone(&catalog),
        );

        first.submit("flood").await.unwrap();
        let outcome = second.submit("bigger flood").await.unwrap();
        assert!(matches!(
            outcome,
            PipelineOutcome::Catalogued {
                outcome: DedupOutcome::Updated { .. },
                ..
            }
        ));
        assert_eq!(catalog.record_store().snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_not_informative_stores_nothing() {
        let pipeline = pipeline(Ok(Classification::not_informative()), "unused");

        let outcome = pipeline.submit("nice weather today").await.unwrap();
        assert_eq!(outcome, PipelineOutcome::NotInformative);
        assert!(pipeline.extractor.seen.lock().unwrap().is_empty());
        assert!(pipeline.catalog().record_store().snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected() {
        let pipeline = pipeline(Ok(Classification::not_informative()), "unused");
        let err = pipeline.submit("   ").await.unwrap_err();
        assert!(matches!(err, PipelineError::Catalog(CatalogError::Validation(_))));
    }

    #[tokio::test]
    async fn test_classifier_failure_propagates() {
        let pipeline = pipeline(Err("model offline".to_string()), "unused");
        let err = pipeline.submit("flood").await.unwrap_err();
        assert!(matches!(err, PipelineError::Classifier(msg) if msg == "model offline"));
    }

    #[tokio::test]
    async fn test_extractor_reply_without_summary_is_validation_error() {
        let pipeline = pipeline(
            Ok(Classification::informative(HumanitarianCategory::VehicleDamage)),
            r#"{"event_type": "crash"}"#,
        );
        let err = pipeline.submit("car crash").await.unwrap_err();
        assert!(matches!(err, PipelineError::Catalog(CatalogError::Validation(_))));
        assert!(pipeline.catalog().record_store().snapshot().is_empty());
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = PipelineOutcome::NotInformative;
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            serde_json::json!({"status": "not_informative"})
        );
    }
}
