//! Query ingestion from a CSV file.

use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::path::Path;

/// Column the search terms are read from.
const ITEM_COLUMN: &str = "Item Name";

/// Read search terms from the `Item Name` column.
///
/// Values are trimmed, empties dropped, and duplicates removed
/// case-insensitively (first-seen casing wins) so no term is retrieved
/// twice in a batch.
pub fn read_queries(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("reading input file {}", path.display()))?;

    let headers = reader.headers().context("reading input headers")?.clone();
    let Some(column) = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(ITEM_COLUMN))
    else {
        bail!("input file must contain an '{ITEM_COLUMN}' column");
    };

    let mut seen = HashSet::new();
    let mut items = Vec::new();
    for record in reader.records() {
        let record = record.context("reading input row")?;
        let value = record.get(column).unwrap_or("").trim();
        if value.is_empty() {
            continue;
        }
        if seen.insert(value.to_lowercase()) {
            items.push(value.to_string());
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write");
        file
    }

    #[test]
    fn test_reads_trims_and_dedups_case_insensitively() {
        let file = write_csv(
            "Item Name,Notes\n  Hex Bolt ,a\nhex bolt,b\nSocket Set,c\n   ,d\nHEX BOLT,e\n",
        );
        let items = read_queries(file.path()).expect("read");
        assert_eq!(items, vec!["Hex Bolt", "Socket Set"]);
    }

    #[test]
    fn test_header_match_is_case_insensitive() {
        let file = write_csv("item name\nWidget\n");
        let items = read_queries(file.path()).expect("read");
        assert_eq!(items, vec!["Widget"]);
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let file = write_csv("Product,Qty\nWidget,1\n");
        let err = read_queries(file.path()).expect_err("should fail");
        assert!(err.to_string().contains("Item Name"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(read_queries(Path::new("/nonexistent/items.csv")).is_err());
    }
}
