//! Approximate name matching over a catalog snapshot.
//!
//! The [`SimilarityIndex`] answers "which catalog names look like this
//! query?" with a distance-like score in `[0, 1]`: **lower is more similar**,
//! `0` is an exact (case-insensitive) match. Callers compare scores against
//! a cutoff with `<`, so the polarity must never be flipped.
//!
//! # Scoring
//!
//! For each name the query is aligned against the best-fitting substring of
//! the name (semi-global edit distance, Sellers' variant of the
//! Smith-Waterman family). The raw score of an alignment is
//!
//! ```text
//! errors / query_len + |start - location| / distance
//! ```
//!
//! so typos, transpositions and missing or extra characters cost in
//! proportion to the query length, and matches far from the expected
//! position cost extra. Names whose best raw score exceeds the threshold
//! are not returned. With field-length normalization enabled the accepted
//! score is raised to `1 / sqrt(word_count)`, which penalizes long
//! multi-word names.

use lineup_types::OccurrenceRecord;

/// Smallest score reported for an inexact match, so that only true
/// equality scores `0`.
const MIN_INEXACT_SCORE: f64 = 0.001;

/// Tuning knobs for the similarity index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityOptions {
    /// Maximum raw score accepted as a hit (`0` = exact only, `1` = anything).
    pub threshold: f64,
    /// Expected start position of the match inside a name.
    pub location: usize,
    /// Characters away from `location` at which a match counts as a full
    /// miss. `0` disables partial matches away from `location`.
    pub distance: usize,
    /// Whether to apply field-length normalization.
    pub field_norm: bool,
}

impl Default for SimilarityOptions {
    fn default() -> Self {
        Self {
            threshold: 0.4,
            location: 0,
            distance: 100,
            field_norm: true,
        }
    }
}

/// One search result: a catalog position and its score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexHit {
    /// Position of the record in the snapshot's record sequence.
    pub position: usize,
    /// Distance-like score, lower is better.
    pub score: f64,
}

#[derive(Debug, Clone)]
struct IndexEntry {
    position: usize,
    key: Vec<char>,
    norm: f64,
}

/// Fuzzy index over the names of one snapshot.
///
/// Every record contributes an entry, duplicates included, so a frequently
/// seen name can appear several times in a result list.
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    entries: Vec<IndexEntry>,
    options: SimilarityOptions,
}

impl SimilarityIndex {
    /// Index the names of `records`.
    pub fn build(records: &[OccurrenceRecord], options: SimilarityOptions) -> Self {
        let entries = records
            .iter()
            .enumerate()
            .map(|(position, record)| IndexEntry {
                position,
                key: record.name.to_lowercase().chars().collect(),
                norm: field_norm(&record.name),
            })
            .collect();
        Self { entries, options }
    }

    /// Number of indexed names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no names.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Search for names resembling `query`.
    ///
    /// Results are ordered best (lowest) score first; equal scores keep
    /// catalog order. An empty or blank query matches nothing.
    pub fn search(&self, query: &str) -> Vec<IndexHit> {
        let pattern: Vec<char> = query.trim().to_lowercase().chars().collect();
        if pattern.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<IndexHit> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let raw = raw_score(&pattern, &entry.key, &self.options)?;
                let score = if self.options.field_norm {
                    normalize(raw, entry.norm)
                } else {
                    raw
                };
                Some(IndexHit {
                    position: entry.position,
                    score,
                })
            })
            .collect();

        // Stable: ties stay in catalog order.
        hits.sort_by(|a, b| a.score.total_cmp(&b.score));
        hits
    }
}

/// Score a single name, `None` when it is above the threshold.
fn raw_score(pattern: &[char], text: &[char], options: &SimilarityOptions) -> Option<f64> {
    if pattern == text {
        return Some(0.0);
    }
    let best = best_alignment(pattern, text, options);
    if best > options.threshold {
        None
    } else {
        Some(best.max(MIN_INEXACT_SCORE))
    }
}

/// Lowest alignment score of `pattern` against any substring of `text`.
///
/// Column-wise Sellers DP: `cost[i]` is the fewest edits turning
/// `pattern[..i]` into some substring of `text` ending at the current
/// column, `start[i]` is where that substring begins.
fn best_alignment(pattern: &[char], text: &[char], options: &SimilarityOptions) -> f64 {
    let m = pattern.len();

    let mut cost: Vec<usize> = (0..=m).collect();
    let mut start: Vec<usize> = vec![0; m.saturating_add(1)];
    let mut best = alignment_score(m, m, 0, options);

    for (column, &ch) in text.iter().enumerate() {
        let end = column.saturating_add(1);
        let mut diag_cost = 0;
        let mut diag_start = end.saturating_sub(1);
        // Row 0: the empty pattern aligns anywhere at no cost.
        if let (Some(c0), Some(s0)) = (cost.first_mut(), start.first_mut()) {
            diag_cost = *c0;
            diag_start = *s0;
            *c0 = 0;
            *s0 = end;
        }

        for (row, &pc) in pattern.iter().enumerate() {
            let i = row.saturating_add(1);
            let (Some(&left_cost), Some(&left_start)) = (cost.get(i), start.get(i)) else {
                break;
            };
            let (Some(&up_cost), Some(&up_start)) = (cost.get(row), start.get(row)) else {
                break;
            };

            let substitution = diag_cost.saturating_add(usize::from(pc != ch));
            let deletion = up_cost.saturating_add(1);
            let insertion = left_cost.saturating_add(1);

            let (next_cost, next_start) = if substitution <= deletion && substitution <= insertion {
                (substitution, diag_start)
            } else if deletion <= insertion {
                (deletion, up_start)
            } else {
                (insertion, left_start)
            };

            diag_cost = left_cost;
            diag_start = left_start;
            if let (Some(c), Some(s)) = (cost.get_mut(i), start.get_mut(i)) {
                *c = next_cost;
                *s = next_start;
            }
        }

        if let (Some(&errors), Some(&from)) = (cost.last(), start.last()) {
            let score = alignment_score(errors, m, from, options);
            if score < best {
                best = score;
            }
        }
    }

    best
}

/// `errors / pattern_len + |start - location| / distance`.
fn alignment_score(errors: usize, pattern_len: usize, start: usize, options: &SimilarityOptions) -> f64 {
    let accuracy = ratio(errors, pattern_len);
    let proximity = start.abs_diff(options.location);
    if options.distance == 0 {
        return if proximity == 0 { accuracy } else { 1.0 };
    }
    accuracy + ratio(proximity, options.distance)
}

/// `1 / sqrt(word_count)`, rounded to three decimals.
fn field_norm(name: &str) -> f64 {
    let words = name.split_whitespace().count().max(1);
    let norm = 1.0 / ratio(words, 1).sqrt();
    (norm * 1000.0).round() / 1000.0
}

fn normalize(raw: f64, norm: f64) -> f64 {
    if raw <= 0.0 { 0.0 } else { raw.powf(norm) }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    let num = f64::from(u32::try_from(numerator).unwrap_or(u32::MAX));
    let den = f64::from(u32::try_from(denominator).unwrap_or(u32::MAX));
    if den <= 0.0 { 0.0 } else { num / den }
}
