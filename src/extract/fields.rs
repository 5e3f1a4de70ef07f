//! Per-field extraction from a candidate unit.
//!
//! Every field has its own ordered sub-rule list, tried until one yields
//! non-empty text, and the five fields are independent: a missing price
//! never blocks title or URL extraction. Absence is an empty string, a
//! legitimate terminal value, never an error.

use crate::records::RawCandidate;
use regex::Regex;
use scraper::{ElementRef, Selector};
use url::Url;

/// Extract all fields from one candidate unit.
pub fn extract_fields(card: ElementRef, base_url: &str) -> RawCandidate {
    RawCandidate {
        title: extract_title(card),
        url: extract_url(card, base_url),
        price: select_text(card, &["[data-test='productCardPrice']", "[data-test='price']"]),
        sku: extract_sku(card),
        brand: select_text(
            card,
            &["[data-test='product-brand']", "[data-test='brand-name']"],
        ),
        image_url: extract_image(card),
    }
}

/// First non-empty text among the given selectors, whitespace-collapsed.
fn select_text(card: ElementRef, selectors: &[&str]) -> String {
    for selector_str in selectors {
        let selector = Selector::parse(selector_str).expect("valid selector");
        if let Some(el) = card.select(&selector).next() {
            let text = collapse_text(el);
            if !text.is_empty() {
                return text;
            }
        }
    }
    String::new()
}

fn collapse_text(el: ElementRef) -> String {
    el.text().collect::<Vec<_>>().join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn extract_title(card: ElementRef) -> String {
    let from_markers = select_text(
        card,
        &["[data-test='productCardTitle']", "[data-test='product-title']"],
    );
    if !from_markers.is_empty() {
        return from_markers;
    }
    if let Some(label) = card.value().attr("aria-label") {
        let label = label.trim();
        if !label.is_empty() {
            return label.to_string();
        }
    }
    let own_text = collapse_text(card);
    if !own_text.is_empty() {
        return own_text;
    }
    select_text(card, &["div, span, h2, h3"])
}

fn extract_url(card: ElementRef, base_url: &str) -> String {
    let Some(href) = card.value().attr("href") else {
        return String::new();
    };
    if href.is_empty() {
        return String::new();
    }
    // Absolute references are kept verbatim; everything else resolves
    // against the site origin.
    if href.starts_with("http") {
        return href.to_string();
    }
    match Url::parse(base_url).and_then(|base| base.join(href)) {
        Ok(joined) => joined.to_string(),
        Err(_) => format!("{}{}", base_url.trim_end_matches('/'), href),
    }
}

fn extract_sku(card: ElementRef) -> String {
    let selector = Selector::parse("span, div").expect("valid selector");
    let label = Regex::new(r"(?i)^sku\s*[#:]*\s*").expect("valid regex");
    for el in card.select(&selector) {
        let text = collapse_text(el);
        if text.to_uppercase().starts_with("SKU") {
            return label.replace(&text, "").replace('#', "").trim().to_string();
        }
    }
    String::new()
}

fn extract_image(card: ElementRef) -> String {
    let selector = Selector::parse("img").expect("valid selector");
    let Some(img) = card.select(&selector).next() else {
        return String::new();
    };
    for attr in ["src", "data-src", "data-original"] {
        if let Some(value) = img.value().attr(attr) {
            if !value.trim().is_empty() {
                return value.trim().to_string();
            }
        }
    }
    String::new()
}
