//! LanceDB-backed vector index over event summaries.
//!
//! Implements `VectorIndex` from `eventwatch-core`. One table holds one row
//! per event: the id, the summary the vector was computed from, the model
//! that produced it, and the vector itself. Writes go through
//! `merge_insert` keyed on `id`, so an upsert replaces a row in a single
//! table commit.

use std::sync::Arc;

use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
};
use arrow_schema::{DataType, Field};
use futures_util::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};

use eventwatch_core::catalog::vector::{IndexedSummary, Neighbor, VectorIndex};
use eventwatch_types::config::DistanceMetric;
use eventwatch_types::error::RepositoryError;
use eventwatch_types::event::EventId;

use super::lance::LanceVectorStore;
use super::schema::{event_vector_schema, vector_dimension, ID_COLUMN, SUMMARY_COLUMN};

/// Vector index over a single LanceDB table.
pub struct LanceVectorIndex {
    table: lancedb::Table,
    dimension: usize,
    distance: DistanceMetric,
    embedding_model: String,
}

impl LanceVectorIndex {
    /// Open (or create) `table_name` for vectors of width `dimension`.
    ///
    /// Fails with [`RepositoryError::Conflict`] if the table already exists
    /// with a different vector width, which happens when the embedding
    /// model is changed without rebuilding the index.
    pub async fn open(
        store: &LanceVectorStore,
        table_name: &str,
        dimension: usize,
        distance: DistanceMetric,
        embedding_model: &str,
    ) -> Result<Self, RepositoryError> {
        let table = store
            .ensure_table(table_name, Arc::new(event_vector_schema(dimension)))
            .await
            .map_err(|e| RepositoryError::Query(format!("Failed to ensure event table: {e}")))?;

        let schema = table
            .schema()
            .await
            .map_err(|e| RepositoryError::Query(format!("Failed to read table schema: {e}")))?;
        match vector_dimension(&schema) {
            Some(existing) if existing == dimension => {}
            existing => {
                return Err(RepositoryError::Conflict(format!(
                    "table '{table_name}' holds {existing:?}-dimensional vectors, embedder produces {dimension}"
                )));
            }
        }

        tracing::debug!(table = table_name, dimension, %distance, "Vector index opened");
        Ok(Self {
            table,
            dimension,
            distance,
            embedding_model: embedding_model.to_string(),
        })
    }

    pub fn distance(&self) -> DistanceMetric {
        self.distance
    }

    fn lance_distance(&self) -> lancedb::DistanceType {
        match self.distance {
            DistanceMetric::L2 => lancedb::DistanceType::L2,
            DistanceMetric::Cosine => lancedb::DistanceType::Cosine,
            DistanceMetric::Dot => lancedb::DistanceType::Dot,
        }
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), RepositoryError> {
        if vector.len() != self.dimension {
            return Err(RepositoryError::Query(format!(
                "vector has {} dimensions, index expects {}",
                vector.len(),
                self.dimension
            )));
        }
        Ok(())
    }

    /// Build a single-row RecordBatch for one event.
    fn build_record_batch(
        &self,
        id: &EventId,
        summary: &str,
        vector: &[f32],
    ) -> Result<RecordBatch, RepositoryError> {
        let schema = Arc::new(event_vector_schema(self.dimension));

        let values = Float32Array::from(vector.to_vec());
        let field = Arc::new(Field::new("item", DataType::Float32, true));
        let vector_array =
            FixedSizeListArray::new(field, self.dimension as i32, Arc::new(values), None);

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec![id.to_string()])),
                Arc::new(StringArray::from(vec![summary.to_string()])),
                Arc::new(StringArray::from(vec![self.embedding_model.clone()])),
                Arc::new(vector_array),
            ],
        )
        .map_err(|e| RepositoryError::Query(format!("Failed to build record batch: {e}")))
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, RepositoryError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| RepositoryError::Query(format!("result batch lacks string column '{name}'")))
}

fn parse_id(raw: &str) -> Result<EventId, RepositoryError> {
    raw.parse()
        .map_err(|_| RepositoryError::Query(format!("malformed event id in index: '{raw}'")))
}

impl VectorIndex for LanceVectorIndex {
    async fn upsert(&self, id: &EventId, summary: &str, vector: &[f32]) -> Result<(), RepositoryError> {
        self.check_dimension(vector)?;

        let batch = self.build_record_batch(id, summary, vector)?;
        let schema = batch.schema();
        let reader = RecordBatchIterator::new(vec![Ok(batch)], schema);

        let mut merge = self.table.merge_insert(&[ID_COLUMN]);
        merge.when_matched_update_all(None).when_not_matched_insert_all();
        merge
            .execute(Box::new(reader))
            .await
            .map_err(|e| RepositoryError::Query(format!("Failed to upsert event vector: {e}")))?;

        Ok(())
    }

    async fn query_nearest(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>, RepositoryError> {
        self.check_dimension(vector)?;
        if k == 0 || self.count().await? == 0 {
            return Ok(Vec::new());
        }

        let results = self
            .table
            .vector_search(vector)
            .map_err(|e| RepositoryError::Query(format!("Vector search setup failed: {e}")))?
            .distance_type(self.lance_distance())
            .limit(k)
            .execute()
            .await
            .map_err(|e| RepositoryError::Query(format!("Vector search failed: {e}")))?;

        let batches: Vec<RecordBatch> = results
            .try_collect()
            .await
            .map_err(|e| RepositoryError::Query(format!("Failed to collect results: {e}")))?;

        let mut neighbors = Vec::with_capacity(k);
        for batch in &batches {
            if batch.num_rows() == 0 {
                continue;
            }

            let ids = string_column(batch, ID_COLUMN)?;
            // The _distance column is added by LanceDB vector search
            let distances = batch
                .column_by_name("_distance")
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
                .ok_or_else(|| RepositoryError::Query("search result lacks _distance".into()))?;

            for i in 0..batch.num_rows() {
                neighbors.push(Neighbor {
                    id: parse_id(ids.value(i))?,
                    distance: distances.value(i),
                });
            }
        }

        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        neighbors.truncate(k);
        Ok(neighbors)
    }

    async fn delete(&self, id: &EventId) -> Result<(), RepositoryError> {
        self.table
            .delete(&format!("{ID_COLUMN} = '{id}'"))
            .await
            .map_err(|e| RepositoryError::Query(format!("Failed to delete event vector: {e}")))?;
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<IndexedSummary>, RepositoryError> {
        let total = self.count().await?;
        if total == 0 {
            return Ok(Vec::new());
        }

        let results = self
            .table
            .query()
            .select(lancedb::query::Select::columns(&[ID_COLUMN, SUMMARY_COLUMN]))
            .limit(total as usize)
            .execute()
            .await
            .map_err(|e| RepositoryError::Query(format!("Failed to scan event table: {e}")))?;

        let batches: Vec<RecordBatch> = results
            .try_collect()
            .await
            .map_err(|e| RepositoryError::Query(format!("Failed to collect rows: {e}")))?;

        let mut entries = Vec::with_capacity(total as usize);
        for batch in &batches {
            let ids = string_column(batch, ID_COLUMN)?;
            let summaries = string_column(batch, SUMMARY_COLUMN)?;
            for i in 0..batch.num_rows() {
                if ids.is_null(i) {
                    continue;
                }
                entries.push(IndexedSummary {
                    id: parse_id(ids.value(i))?,
                    summary: summaries.value(i).to_string(),
                });
            }
        }

        Ok(entries)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let count = self
            .table
            .count_rows(None)
            .await
            .map_err(|e| RepositoryError::Query(format!("Failed to count rows: {e}")))?;
        Ok(count as u64)
    }
}
