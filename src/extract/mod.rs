//! Structural extraction of product candidates from result-page markup.
//!
//! A fixed, ordered list of selection rules runs most-specific-first and
//! the first rule that matches anything wins outright. Precise markers are
//! high-precision; generic anchor matching is high-recall but low-precision
//! and must never inject extra matches once a precise rule has succeeded.

pub mod fields;

use crate::records::RawCandidate;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::debug;

/// Locate candidate units and extract their fields, in document order.
///
/// Collection stops as soon as `max_records` viable candidates have been
/// accepted; pathological pages with thousands of generic anchors stay
/// cheap. A page without any structural marker yields an empty list.
pub fn extract_candidates(html: &str, base_url: &str, max_records: usize) -> Vec<RawCandidate> {
    let document = Html::parse_document(html);

    let (cards, rule) = locate_cards(&document);
    debug!(rule, count = cards.len(), "structural rule applied");

    let mut results = Vec::new();
    for card in cards {
        let candidate = fields::extract_fields(card, base_url);
        if !candidate.is_viable() {
            continue;
        }
        results.push(candidate);
        if results.len() >= max_records {
            break;
        }
    }
    results
}

/// Apply the structural rules in priority order; the first rule yielding
/// at least one unit wins. No merging across rules.
fn locate_cards<'a>(document: &'a Html) -> (Vec<ElementRef<'a>>, &'static str) {
    let card_sel = Selector::parse("a[data-test='productCard']").expect("valid selector");
    let cards: Vec<ElementRef> = document.select(&card_sel).collect();
    if !cards.is_empty() {
        return (cards, "product-card");
    }

    // Title markers sometimes survive layout changes that drop the card
    // marker; climb from each title to its enclosing anchor.
    let title_sel = Selector::parse("[data-test='productCardTitle']").expect("valid selector");
    let mut seen = HashSet::new();
    let mut anchors = Vec::new();
    for title in document.select(&title_sel) {
        let anchor = title
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "a");
        if let Some(anchor) = anchor {
            if seen.insert(anchor.id()) {
                anchors.push(anchor);
            }
        }
    }
    if !anchors.is_empty() {
        return (anchors, "title-ancestor");
    }

    // Last resort: any detail-page link.
    let generic_sel = Selector::parse("a[href*='/i/']").expect("valid selector");
    let generic: Vec<ElementRef> = document.select(&generic_sel).collect();
    if !generic.is_empty() {
        return (generic, "detail-anchor");
    }

    (Vec::new(), "none")
}
