//! Warehouse loading
//!
//! The warehouse is reached through the `Warehouse` trait so the collector can
//! be handed any backend. `NdjsonWarehouse` writes newline-delimited JSON, the
//! batch format cloud warehouses ingest directly, and reads it back for
//! queries.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Table holding one row per match
pub const MATCHES_TABLE: &str = "matches";

/// Errors that can occur when loading rows
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// Reading or writing a table file failed
    #[error("Warehouse I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A row could not be serialized
    #[error("Failed to serialize row: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The table name is not usable
    #[error("Invalid table name: '{0}'")]
    InvalidTable(String),

    /// A stored line is not a JSON row
    #[error("Malformed row at {table}:{line}: {source}")]
    MalformedRow {
        table: String,
        line: usize,
        source: serde_json::Error,
    },
}

/// Destination for transformed rows
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Appends `rows` to `table`
    ///
    /// # Returns
    /// The number of rows written
    async fn insert_rows(&self, table: &str, rows: &[Value]) -> Result<usize, WarehouseError>;

    /// Reads every row of `table` in insertion order
    ///
    /// A table that was never written to has no rows.
    async fn read_rows(&self, table: &str) -> Result<Vec<Value>, WarehouseError>;
}

/// Warehouse backed by one `<table>.ndjson` file per table
#[derive(Debug, Clone)]
pub struct NdjsonWarehouse {
    dir: PathBuf,
}

impl NdjsonWarehouse {
    /// Opens (and creates if needed) a warehouse directory
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, WarehouseError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `table`
    pub fn table_path(&self, table: &str) -> Result<PathBuf, WarehouseError> {
        let valid = !table.is_empty()
            && table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(WarehouseError::InvalidTable(table.to_string()));
        }
        Ok(self.dir.join(format!("{}.ndjson", table)))
    }
}

#[async_trait]
impl Warehouse for NdjsonWarehouse {
    async fn insert_rows(&self, table: &str, rows: &[Value]) -> Result<usize, WarehouseError> {
        let path = self.table_path(table)?;
        if rows.is_empty() {
            return Ok(0);
        }

        let mut buffer = Vec::new();
        for row in rows {
            serde_json::to_writer(&mut buffer, row)?;
            buffer.push(b'\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(&buffer).await?;
        file.flush().await?;

        tracing::info!(table, rows = rows.len(), path = %path.display(), "Rows loaded");
        Ok(rows.len())
    }

    async fn read_rows(&self, table: &str) -> Result<Vec<Value>, WarehouseError> {
        let path = self.table_path(table)?;
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                serde_json::from_str(line).map_err(|source| WarehouseError::MalformedRow {
                    table: table.to_string(),
                    line: index + 1,
                    source,
                })
            })
            .collect()
    }
}
