//! CSV table access for the inventory tools.
//!
//! Files are read in full on every call; nothing is cached.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::warn;

/// One table row: header name → cell text.
pub type Row = Map<String, Value>;

/// Read every row of a headed CSV file.
pub fn read_rows(path: &Path) -> Result<Vec<Row>, csv::Error> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row = headers
            .iter()
            .zip(record.iter())
            .map(|(header, cell)| (header.to_string(), Value::String(cell.to_string())))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Read a table off the async runtime, degrading to an empty table on
/// any failure.
pub async fn load_rows(path: PathBuf) -> Vec<Row> {
    let shown = path.display().to_string();
    match tokio::task::spawn_blocking(move || read_rows(&path)).await {
        Ok(Ok(rows)) => rows,
        Ok(Err(e)) => {
            warn!("Failed to read {}: {}", shown, e);
            Vec::new()
        }
        Err(e) => {
            warn!("Reader task for {} failed: {}", shown, e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_read_rows() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("items.csv");
        fs::write(&path, "id,name,stock\n1,fan,10\n2,heater,3\n").unwrap();

        let rows = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "fan");
        assert_eq!(rows[1]["stock"], "3");
    }

    #[test]
    fn test_read_rows_quoted_cells() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("items.csv");
        fs::write(&path, "id,name\n1,\"coat, wool\"\n").unwrap();

        let rows = read_rows(&path).unwrap();
        assert_eq!(rows[0]["name"], "coat, wool");
    }

    #[tokio::test]
    async fn test_load_rows_off_runtime() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("items.csv");
        fs::write(&path, "id,name\n1,fan\n").unwrap();

        let rows = load_rows(path).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "1");
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let rows = load_rows(PathBuf::from("/nonexistent/path/products.csv")).await;
        assert!(rows.is_empty());
    }
}
