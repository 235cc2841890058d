//! Arrow layout of a collection table and conversions to and from it.
//!
//! | column     | type                              |
//! |------------|-----------------------------------|
//! | `id`       | Utf8                              |
//! | `text`     | Utf8                              |
//! | `metadata` | Utf8 (JSON object)                |
//! | `vector`   | FixedSizeList<Float32>[dim]       |

use anyhow::{anyhow, bail, Context, Result};
use arrow_array::types::Float32Type;
use arrow_array::{Array, FixedSizeListArray, Float32Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use std::sync::Arc;

use rag_core::{Document, Metadata, ScoredDocument};

pub const ID_COLUMN: &str = "id";
pub const TEXT_COLUMN: &str = "text";
pub const METADATA_COLUMN: &str = "metadata";
pub const VECTOR_COLUMN: &str = "vector";
/// Added by LanceDB to vector search results.
pub const DISTANCE_COLUMN: &str = "_distance";

pub fn build_arrow_schema(dim: usize) -> Result<SchemaRef> {
    Ok(Arc::new(Schema::new(vec![
        Field::new(ID_COLUMN, DataType::Utf8, false),
        Field::new(TEXT_COLUMN, DataType::Utf8, false),
        Field::new(METADATA_COLUMN, DataType::Utf8, false),
        Field::new(
            VECTOR_COLUMN,
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), list_size(dim)?),
            true,
        ),
    ])))
}

/// Dimension of the `vector` column, if the schema has one.
pub fn vector_dim(schema: &Schema) -> Option<usize> {
    match schema.field_with_name(VECTOR_COLUMN).ok()?.data_type() {
        DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
        _ => None,
    }
}

fn list_size(dim: usize) -> Result<i32> {
    i32::try_from(dim).map_err(|_| anyhow!("embedding dimension {dim} does not fit an Arrow list"))
}

/// One record batch for `docs`, row `i` holding `ids[i]`, `docs[i]` and `vectors[i]`.
pub fn documents_to_batch(ids: &[String], docs: &[Document], vectors: &[Vec<f32>], dim: usize) -> Result<RecordBatch> {
    if ids.len() != docs.len() || vectors.len() != docs.len() {
        bail!("mismatched lengths: {} ids, {} documents, {} vectors", ids.len(), docs.len(), vectors.len());
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
        bail!("embedding has {} dimensions, collection expects {dim}", bad.len());
    }
    let mut texts = Vec::with_capacity(docs.len());
    let mut metadata = Vec::with_capacity(docs.len());
    for doc in docs {
        texts.push(doc.page_content.as_str());
        metadata.push(serde_json::to_string(&doc.metadata).context("failed to encode metadata")?);
    }
    let vectors = vectors.iter().map(|v| Some(v.iter().copied().map(Some).collect::<Vec<_>>()));
    let batch = RecordBatch::try_new(build_arrow_schema(dim)?, vec![
        Arc::new(StringArray::from_iter_values(ids)),
        Arc::new(StringArray::from(texts)),
        Arc::new(StringArray::from(metadata)),
        Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors, list_size(dim)?)),
    ])?;
    Ok(batch)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| anyhow!("result batch has no Utf8 column {name:?}"))
}

/// Decode search results. Score is `1 - distance`; rows without a distance
/// column score 0.
pub fn batch_to_scored(batch: &RecordBatch) -> Result<Vec<ScoredDocument>> {
    let ids = string_column(batch, ID_COLUMN)?;
    let texts = string_column(batch, TEXT_COLUMN)?;
    let metadata = string_column(batch, METADATA_COLUMN)?;
    let distances = batch.column_by_name(DISTANCE_COLUMN).and_then(|c| c.as_any().downcast_ref::<Float32Array>());

    let mut out = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let meta: Metadata = if metadata.is_null(i) || metadata.value(i).is_empty() {
            Metadata::new()
        } else {
            serde_json::from_str(metadata.value(i))
                .with_context(|| format!("bad metadata JSON for row {}", ids.value(i)))?
        };
        let score = distances.map_or(0.0, |d| 1.0 - d.value(i));
        out.push(ScoredDocument {
            id: ids.value(i).to_string(),
            document: Document::with_metadata(texts.value(i), meta),
            score,
        });
    }
    Ok(out)
}
