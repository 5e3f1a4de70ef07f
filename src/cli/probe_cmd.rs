//! `forager probe <term>` — run a single search and print what matched.
//!
//! Diagnostic command: no image downloads, no output file, no sentinel.

use crate::cli::output::Styled;
use crate::config::Config;
use crate::pipeline::Pipeline;
use anyhow::Result;

pub async fn run(config: Config, term: &str, json: bool) -> Result<()> {
    let s = Styled::new();
    let threshold = config.match_threshold;

    let pipeline = Pipeline::new(config, None)?;
    let results = pipeline.search(term).await;
    pipeline.shutdown().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        eprintln!(
            "  {} no candidates scored at or above {threshold} for '{term}'",
            s.warn_sym()
        );
        return Ok(());
    }

    eprintln!("  {} {} match(es) for '{term}':", s.ok_sym(), results.len());
    for (rank, product) in results.iter().enumerate() {
        eprintln!(
            "  {:>2}. [{:>3}] {} {}",
            rank + 1,
            product.match_score,
            s.bold(&product.title),
            s.dim(&product.url)
        );
        if !product.price.is_empty() || !product.sku.is_empty() {
            eprintln!(
                "      {}",
                s.dim(&format!("price: {}  sku: {}", product.price, product.sku))
            );
        }
    }
    Ok(())
}
