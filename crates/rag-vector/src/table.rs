//! LanceDB connection and table helpers.

use anyhow::{bail, Context, Result};
use arrow_array::{RecordBatch, RecordBatchIterator};
use lancedb::{connect, Connection, Table};
use std::path::Path;

use crate::schema::vector_dim;

pub async fn open_db(dir: &Path) -> Result<Connection> {
    let uri = dir.to_string_lossy();
    connect(uri.as_ref()).execute().await.with_context(|| format!("failed to open LanceDB at {uri}"))
}

pub async fn open_table_if_exists(conn: &Connection, name: &str) -> Result<Option<Table>> {
    let names = conn.table_names().execute().await?;
    if !names.iter().any(|n| n == name) {
        return Ok(None);
    }
    Ok(Some(conn.open_table(name).execute().await?))
}

/// Fail if `table` stores vectors of a different width than `dim`.
pub async fn check_dim(table: &Table, dim: usize) -> Result<()> {
    let schema = table.schema().await?;
    match vector_dim(&schema) {
        Some(existing) if existing == dim => Ok(()),
        Some(existing) => bail!(
            "collection {} stores {existing}-d vectors but the embedder produces {dim}-d",
            table.name()
        ),
        None => bail!("collection {} has no vector column", table.name()),
    }
}

/// Append `batch` to `name`, creating the table from the batch's schema when
/// it does not exist yet.
pub async fn append(conn: &Connection, name: &str, batch: RecordBatch) -> Result<Table> {
    let schema = batch.schema();
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
    match open_table_if_exists(conn, name).await? {
        Some(table) => {
            table.add(reader).execute().await?;
            Ok(table)
        }
        None => {
            tracing::info!(collection = name, "creating collection");
            Ok(conn.create_table(name, reader).execute().await?)
        }
    }
}
