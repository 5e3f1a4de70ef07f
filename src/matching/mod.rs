//! Fuzzy relevance scoring between a search term and candidate titles.
//!
//! Three complementary similarity measures run over case/punctuation
//! normalized forms of both strings and the strongest one wins. Taking the
//! maximum is a recall-biased policy: any one metric agreeing strongly is
//! sufficient evidence of a match.
//!
//! All scores are integers in `[0, 100]`.

use crate::records::{RawCandidate, ScoredProduct};

/// Lowercase and collapse every run of non-alphanumeric characters to a
/// single space. Scores depend only on this normalized token content.
pub fn normalize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_space = false;
    for c in s.chars() {
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            for lc in c.to_lowercase() {
                out.push(lc);
            }
        } else {
            pending_space = true;
        }
    }
    out
}

/// Longest common subsequence length, two-row dynamic programming.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn ratio_chars(a: &[char], b: &[char]) -> u8 {
    if a.is_empty() && b.is_empty() {
        return 100;
    }
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let lcs = lcs_len(a, b);
    (200.0 * lcs as f64 / (a.len() + b.len()) as f64).round() as u8
}

/// Indel similarity of two raw strings: `200 * lcs / (len_a + len_b)`.
pub fn ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

fn sorted_tokens(normalized: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = normalized.split_whitespace().collect();
    tokens.sort_unstable();
    tokens
}

/// Similarity after sorting tokens alphabetically; handles word reordering.
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    let (na, nb) = (normalize(a), normalize(b));
    ratio(&sorted_tokens(&na).join(" "), &sorted_tokens(&nb).join(" "))
}

/// Order- and duplicate-insensitive token overlap similarity.
///
/// Compares the sorted token intersection against each side's full sorted
/// token set; a side that is a subset of the other scores 100.
pub fn token_set_ratio(a: &str, b: &str) -> u8 {
    let (na, nb) = (normalize(a), normalize(b));
    let ta: std::collections::BTreeSet<&str> = na.split_whitespace().collect();
    let tb: std::collections::BTreeSet<&str> = nb.split_whitespace().collect();

    let sect: Vec<&str> = ta.intersection(&tb).copied().collect();
    let diff_a: Vec<&str> = ta.difference(&tb).copied().collect();
    let diff_b: Vec<&str> = tb.difference(&ta).copied().collect();

    let joined_sect = sect.join(" ");
    let joined_a = join_groups(&sect, &diff_a);
    let joined_b = join_groups(&sect, &diff_b);

    ratio(&joined_sect, &joined_a)
        .max(ratio(&joined_sect, &joined_b))
        .max(ratio(&joined_a, &joined_b))
}

fn join_groups(sect: &[&str], diff: &[&str]) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(sect.len() + diff.len());
    parts.extend_from_slice(sect);
    parts.extend_from_slice(diff);
    parts.join(" ")
}

/// Best alignment of the shorter string against any same-length window of
/// the longer one; handles truncated titles.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let na: Vec<char> = normalize(a).chars().collect();
    let nb: Vec<char> = normalize(b).chars().collect();
    let (shorter, longer) = if na.len() <= nb.len() { (&na, &nb) } else { (&nb, &na) };
    if shorter.is_empty() {
        return if longer.is_empty() { 100 } else { 0 };
    }
    let window = shorter.len();
    let mut best = 0u8;
    for start in 0..=(longer.len() - window) {
        best = best.max(ratio_chars(shorter, &longer[start..start + window]));
        if best == 100 {
            break;
        }
    }
    best
}

/// Strongest fuzzy score between a query and a candidate title.
///
/// Returns 0 when either side normalizes to nothing.
pub fn best_score(query: &str, candidate: &str) -> u8 {
    if normalize(query).is_empty() || normalize(candidate).is_empty() {
        return 0;
    }
    token_set_ratio(query, candidate)
        .max(token_sort_ratio(query, candidate))
        .max(partial_ratio(query, candidate))
}

/// Score candidates against the term, gate by threshold, rank descending
/// and cap. The sort is stable so equal scores keep document order.
///
/// Candidates below threshold are dropped silently; a query may
/// legitimately yield zero results.
pub fn rank_candidates(
    search_term: &str,
    candidates: Vec<RawCandidate>,
    threshold: u8,
    cap: usize,
) -> Vec<ScoredProduct> {
    let mut scored: Vec<ScoredProduct> = candidates
        .into_iter()
        .filter(RawCandidate::is_viable)
        .filter_map(|c| {
            let score = best_score(search_term, &c.title);
            if score >= threshold {
                Some(c.into_scored(search_term, score))
            } else {
                None
            }
        })
        .collect();
    scored.sort_by(|x, y| y.match_score.cmp(&x.match_score));
    scored.truncate(cap);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("HEX-BOLT!!"), "hex bolt");
        assert_eq!(normalize("  3/8\" Drive  "), "3 8 drive");
        assert_eq!(normalize("???"), "");
    }

    #[test]
    fn test_ratio_basics() {
        assert_eq!(ratio("abc", "abc"), 100);
        assert_eq!(ratio("", ""), 100);
        assert_eq!(ratio("abc", ""), 0);
        // lcs("abc", "abd") = 2 -> 200 * 2 / 6
        assert_eq!(ratio("abc", "abd"), 67);
    }

    #[test]
    fn test_token_sort_handles_reordering() {
        assert_eq!(token_sort_ratio("hex bolt", "bolt hex"), 100);
    }

    #[test]
    fn test_token_set_handles_subsets() {
        assert_eq!(token_set_ratio("hex bolt", "hex bolt grade 8"), 100);
        assert_eq!(token_set_ratio("hex bolt", "bolt hex bolt"), 100);
    }

    #[test]
    fn test_partial_handles_truncation() {
        assert_eq!(partial_ratio("ratchet", "3/8 drive ratchet wrench"), 100);
    }

    #[test]
    fn test_score_symmetric_under_normalization() {
        assert_eq!(best_score("Hex Bolt", "HEX-BOLT!!"), 100);
        assert_eq!(
            best_score("Hex Bolt", "HEX-BOLT!!"),
            best_score("hex bolt", "hex bolt")
        );
    }

    #[test]
    fn test_score_empty_inputs() {
        assert_eq!(best_score("", "anything"), 0);
        assert_eq!(best_score("anything", ""), 0);
        assert_eq!(best_score("!!!", "anything"), 0);
    }

    #[test]
    fn test_close_match_scores_high() {
        let score = best_score("3/8 Drive Ratchet", "3/8in Drive Ratchet Wrench");
        assert!(score >= 90, "expected >= 90, got {score}");
    }

    #[test]
    fn test_unrelated_scores_lower_than_match() {
        let hit = best_score("3/8 Drive Ratchet", "3/8in Drive Ratchet Wrench");
        let miss = best_score("3/8 Drive Ratchet", "Impact Driver");
        assert!(miss < hit);
        assert!(miss < 70, "expected < 70, got {miss}");
    }

    fn candidate(title: &str) -> RawCandidate {
        RawCandidate {
            title: title.to_string(),
            url: format!("https://example.com/i/{}", title.len()),
            ..Default::default()
        }
    }

    #[test]
    fn test_rank_gates_and_caps() {
        let candidates = vec![
            candidate("Impact Driver"),
            candidate("3/8in Drive Ratchet Wrench"),
            candidate("Socket Set"),
            candidate("3/8 Drive Ratchet"),
        ];
        let ranked = rank_candidates("3/8 Drive Ratchet", candidates, 70, 5);
        assert_eq!(ranked.len(), 2);
        // Exact match ranks first, wrench variant second.
        assert_eq!(ranked[0].title, "3/8 Drive Ratchet");
        assert_eq!(ranked[1].title, "3/8in Drive Ratchet Wrench");
        assert!(ranked.iter().all(|p| p.match_score >= 70));
    }

    #[test]
    fn test_rank_respects_cap() {
        let candidates: Vec<RawCandidate> =
            (0..10).map(|_| candidate("Hex Bolt")).collect();
        let ranked = rank_candidates("Hex Bolt", candidates, 50, 5);
        assert_eq!(ranked.len(), 5);
    }

    #[test]
    fn test_rank_drops_non_viable() {
        let ranked = rank_candidates("Hex Bolt", vec![RawCandidate::default()], 0, 5);
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_ties_keep_document_order() {
        let mut a = candidate("Hex Bolt");
        a.sku = "first".to_string();
        let mut b = candidate("Hex Bolt");
        b.sku = "second".to_string();
        let ranked = rank_candidates("Hex Bolt", vec![a, b], 50, 5);
        assert_eq!(ranked[0].sku, "first");
        assert_eq!(ranked[1].sku, "second");
    }
}
