//! Record types flowing through the retrieval pipeline.
//!
//! Fields are plain strings; an empty string is the legitimate "absent"
//! value for every field except `search_term`. No open-ended maps: the
//! field extractor's missing-field policy is enforced by the type.

use serde::{Deserialize, Serialize};

/// A structurally-located but not-yet-scored product unit.
///
/// The only invariant is "title present OR URL present"; everything else
/// may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCandidate {
    pub title: String,
    pub url: String,
    pub price: String,
    pub sku: String,
    pub brand: String,
    pub image_url: String,
}

impl RawCandidate {
    /// A candidate with neither title nor URL carries no usable signal.
    pub fn is_viable(&self) -> bool {
        !self.title.is_empty() || !self.url.is_empty()
    }

    /// Promote to a scored product for the given search term.
    pub fn into_scored(self, search_term: &str, match_score: u8) -> ScoredProduct {
        ScoredProduct {
            search_term: search_term.to_string(),
            title: self.title,
            url: self.url,
            price: self.price,
            sku: self.sku,
            brand: self.brand,
            image_url: self.image_url,
            image_path: String::new(),
            match_score,
        }
    }
}

/// A scored, accepted product result. Immutable once `image_path` is
/// filled in by the image store; flows unchanged into export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoredProduct {
    pub search_term: String,
    pub title: String,
    pub url: String,
    pub price: String,
    pub sku: String,
    pub brand: String,
    pub image_url: String,
    pub image_path: String,
    pub match_score: u8,
}

impl ScoredProduct {
    /// Sentinel row emitted when a query yields no accepted candidates,
    /// so every input query has at least one output row.
    pub fn not_found(search_term: &str) -> Self {
        Self {
            search_term: search_term.to_string(),
            title: "Not found".to_string(),
            url: String::new(),
            price: String::new(),
            sku: String::new(),
            brand: String::new(),
            image_url: String::new(),
            image_path: String::new(),
            match_score: 0,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.match_score == 0 && self.title == "Not found"
    }
}

/// Convert a string into a filesystem-friendly slug.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_sep = false;
    for c in value.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(c);
        } else {
            pending_sep = true;
        }
    }
    if slug.is_empty() {
        "item".to_string()
    } else {
        slug
    }
}

/// Deterministic base filename for a result's image: query slug, SKU slug
/// when present, then 1-based rank.
pub fn image_basename(search_term: &str, sku: &str, rank: usize) -> String {
    if sku.is_empty() {
        format!("{}_{rank}", slugify(search_term))
    } else {
        format!("{}_{}_{rank}", slugify(search_term), slugify(sku))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("3/8 Drive Ratchet"), "3_8_drive_ratchet");
        assert_eq!(slugify("  Hex Bolt  "), "hex_bolt");
        assert_eq!(slugify("a--b__c"), "a_b_c");
        assert_eq!(slugify("!!!"), "item");
        assert_eq!(slugify(""), "item");
    }

    #[test]
    fn test_image_basename() {
        assert_eq!(image_basename("Hex Bolt", "", 1), "hex_bolt_1");
        assert_eq!(image_basename("Hex Bolt", "G123-44", 2), "hex_bolt_g123_44_2");
    }

    #[test]
    fn test_viability() {
        let mut c = RawCandidate::default();
        assert!(!c.is_viable());
        c.url = "https://example.com/i/1".to_string();
        assert!(c.is_viable());
        c.url.clear();
        c.title = "Widget".to_string();
        assert!(c.is_viable());
    }

    #[test]
    fn test_sentinel_shape() {
        let s = ScoredProduct::not_found("Widget XYZ");
        assert_eq!(s.search_term, "Widget XYZ");
        assert_eq!(s.title, "Not found");
        assert_eq!(s.match_score, 0);
        assert!(s.url.is_empty() && s.price.is_empty() && s.image_url.is_empty());
        assert!(s.is_not_found());
    }
}
