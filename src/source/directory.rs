use std::path::{Path, PathBuf};

use super::{rows_from_value, Row, Table, TableSource};
use crate::error::{Error, Result};

/// Reads tables from `{dir}/{table}.json`, each a JSON array of objects.
/// This is the format `export` writes.
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn table_path(&self, table: Table) -> PathBuf {
        self.dir.join(format!("{}.json", table.name()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl TableSource for DirectorySource {
    async fn fetch_table(&self, table: Table) -> Result<Vec<Row>> {
        let path = self.table_path(table);
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::Fetch {
                table: table.name().to_string(),
                message: format!("{}: {e}", path.display()),
            })?;
        let body: serde_json::Value = serde_json::from_str(&raw).map_err(|e| Error::Fetch {
            table: table.name().to_string(),
            message: format!("{}: {e}", path.display()),
        })?;
        let rows = rows_from_value(table, body)?;
        log::info!("Read {} rows for {table} from {}", rows.len(), path.display());
        Ok(rows)
    }
}

/// Write fetched rows to `{dir}/{table}.json`, creating `dir` if needed.
pub async fn write_table(dir: &Path, table: Table, rows: &[Row]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{}.json", table.name()));
    let body = serde_json::to_vec_pretty(rows)?;
    tokio::fs::write(&path, body).await?;
    Ok(path)
}
