//! Result export to a CSV file.

use crate::records::ScoredProduct;
use anyhow::{Context, Result};
use std::path::Path;

const HEADERS: [&str; 9] = [
    "Search Term",
    "Product Title",
    "Product URL",
    "Product Price",
    "SKU",
    "Brand",
    "Image URL",
    "Downloaded Image Path",
    "Match Score",
];

/// Write all result rows, one per scored product (sentinels included).
pub fn write_results(path: &Path, results: &[ScoredProduct]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating output file {}", path.display()))?;

    writer.write_record(HEADERS).context("writing header row")?;
    for r in results {
        writer
            .write_record([
                r.search_term.as_str(),
                r.title.as_str(),
                r.url.as_str(),
                r.price.as_str(),
                r.sku.as_str(),
                r.brand.as_str(),
                r.image_url.as_str(),
                r.image_path.as_str(),
                &r.match_score.to_string(),
            ])
            .context("writing result row")?;
    }
    writer.flush().context("flushing output file")?;
    Ok(())
}
