//! Arrow schema for the LanceDB event table.
//!
//! Arrow versions MUST match lancedb's transitive dependency (57.3 for lancedb 0.26).

use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema};

/// Column holding the event id (UUID string).
pub const ID_COLUMN: &str = "id";
/// Column holding the summary text the vector was computed from.
pub const SUMMARY_COLUMN: &str = "summary";
pub const MODEL_COLUMN: &str = "embedding_model";
pub const VECTOR_COLUMN: &str = "vector";

/// Schema for the event vector table with `dimension`-wide embeddings.
pub fn event_vector_schema(dimension: usize) -> Schema {
    Schema::new(vec![
        Field::new(ID_COLUMN, DataType::Utf8, false),
        Field::new(SUMMARY_COLUMN, DataType::Utf8, false),
        Field::new(MODEL_COLUMN, DataType::Utf8, false),
        Field::new(
            VECTOR_COLUMN,
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                dimension as i32,
            ),
            false,
        ),
    ])
}

/// The vector width recorded in an existing table's schema, if any.
pub fn vector_dimension(schema: &Schema) -> Option<usize> {
    match schema.field_with_name(VECTOR_COLUMN).ok()?.data_type() {
        DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
        _ => None,
    }
}
