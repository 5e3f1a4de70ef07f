//! `forager run` — process a batch of search terms into a result dataset.

use crate::cli::output::Styled;
use crate::config::Config;
use crate::io::{input, output};
use crate::pipeline::Pipeline;
use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Instant;

pub async fn run(
    config: Config,
    input_path: &Path,
    output_path: &Path,
    seed: Option<u64>,
) -> Result<()> {
    let s = Styled::new();
    let start = Instant::now();

    let queries = input::read_queries(input_path)?;
    if queries.is_empty() {
        bail!("no usable search terms in {}", input_path.display());
    }
    eprintln!(
        "  Searching {} for {} terms",
        s.bold(&config.base_url),
        queries.len()
    );

    let pipeline = Pipeline::new(config, seed)?;

    let progress = ProgressBar::new(queries.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("  [{bar:30}] {pos}/{len} {msg}")
            .expect("valid template")
            .progress_chars("=> "),
    );

    let results = pipeline
        .run(&queries, |term, _rows| {
            progress.set_message(term.to_string());
            progress.inc(1);
        })
        .await;
    progress.finish_and_clear();

    pipeline.shutdown().await;

    let write_result = output::write_results(output_path, &results);

    let found = results.iter().filter(|r| !r.is_not_found()).count();
    let missed = results.iter().filter(|r| r.is_not_found()).count();
    let with_images = results.iter().filter(|r| !r.image_path.is_empty()).count();

    eprintln!();
    eprintln!(
        "  {} {} products matched ({} with images), {} terms without results",
        s.ok_sym(),
        found,
        with_images,
        missed
    );
    eprintln!(
        "  {}",
        s.dim(&format!("finished in {:.1}s", start.elapsed().as_secs_f64()))
    );

    write_result?;
    eprintln!("  Results written to {}", s.bold(&output_path.display().to_string()));
    Ok(())
}
