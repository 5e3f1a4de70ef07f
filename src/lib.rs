//! Forager — resilient product-listing retrieval from bot-defended
//! storefronts.
//!
//! The pipeline retrieves result pages through an ordered chain of fetch
//! backends (rendering proxy, challenge-aware headless browser, plain
//! HTTP), extracts product cards with cascading structural rules, scores
//! candidates against the query with fuzzy string similarity, and emits a
//! bounded, ranked result set per search term.

pub mod cli;
pub mod config;
pub mod extract;
pub mod fetch;
pub mod io;
pub mod matching;
pub mod pipeline;
pub mod records;
pub mod stealth;

pub use config::Config;
pub use pipeline::Pipeline;
pub use records::{RawCandidate, ScoredProduct};
