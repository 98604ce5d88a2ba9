//! Ranking pipeline: hard time filter, soft preference partition, diversity
//! pruning.
//!
//! Each stage is a pure function over an ordered candidate list so the
//! ranking contract stays testable in isolation. Input order is the index's
//! score order; every stage preserves relative order within the groups it
//! forms.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::types::{RetrievedBlock, SoftFilters, TimeWindow};

/// Hard temporal filter.
///
/// A candidate survives iff its `[start, end]` span overlaps the window. A
/// missing side of the block span counts as unbounded; a block with no
/// resolvable timestamp at all is dropped whenever a window is requested.
pub fn filter_by_window(candidates: Vec<RetrievedBlock>, window: &TimeWindow) -> Vec<RetrievedBlock> {
    candidates
        .into_iter()
        .filter(|candidate| {
            let (start, end) = resolve_span(candidate);

            if start.is_none() && end.is_none() {
                return false;
            }

            if let Some(window_end) = window.end
                && start.is_some_and(|s| s > window_end)
            {
                return false;
            }

            if let Some(window_start) = window.start
                && end.is_some_and(|e| e < window_start)
            {
                return false;
            }

            true
        })
        .collect()
}

/// Soft preference partition: candidates matching ANY filter move ahead of
/// the rest, both groups keeping their score order. Never empties the list.
pub fn partition_by_preference(
    candidates: Vec<RetrievedBlock>,
    filters: &SoftFilters,
) -> Vec<RetrievedBlock> {
    let (mut preferred, other): (Vec<_>, Vec<_>) = candidates
        .into_iter()
        .partition(|candidate| matches_any_filter(candidate, filters));

    preferred.extend(other);
    preferred
}

/// Greedy near-duplicate suppression over the ordered list.
///
/// A candidate is rejected when its token overlap with any already-accepted
/// block exceeds `max_overlap` of its own token count; empty token sets are
/// always accepted. Stops at `top_k` accepted. The second return value
/// reports whether the skip-pruning fallback was taken (pruning rejected
/// everything while candidates existed) - callers log it.
pub fn prune_near_duplicates(
    candidates: Vec<RetrievedBlock>,
    top_k: usize,
    max_overlap: f32,
) -> (Vec<RetrievedBlock>, bool) {
    if candidates.is_empty() || top_k == 0 {
        return (Vec::new(), false);
    }

    let mut accepted = Vec::new();
    let mut accepted_tokens: Vec<HashSet<String>> = Vec::new();
    let mut rejected = Vec::new();

    for candidate in candidates {
        if accepted.len() == top_k {
            break;
        }

        let tokens = token_set(&candidate.block.flattened_text);
        let is_duplicate = !tokens.is_empty()
            && accepted_tokens.iter().any(|seen| {
                let overlap = tokens.intersection(seen).count() as f32;
                overlap / tokens.len() as f32 > max_overlap
            });

        if is_duplicate {
            rejected.push(candidate);
        } else {
            accepted_tokens.push(tokens);
            accepted.push(candidate);
        }
    }

    if accepted.is_empty() {
        // Retrieval must never come back empty when eligible candidates
        // exist: fall back to plain score order.
        rejected.truncate(top_k);
        return (rejected, true);
    }

    (accepted, false)
}

/// Case-folded word set of a block's flattened text.
fn token_set(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|word| word.to_lowercase())
        .collect()
}

fn resolve_span(
    candidate: &RetrievedBlock,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    // Live block fields win; the metadata snapshot backs them up.
    let (live_start, live_end) = candidate.block.time_span();
    let (meta_start, meta_end) = candidate.metadata.time_span();
    (live_start.or(meta_start), live_end.or(meta_end))
}

fn matches_any_filter(candidate: &RetrievedBlock, filters: &SoftFilters) -> bool {
    let block = &candidate.block;
    let metadata = &candidate.metadata;

    if let Some(variant) = &filters.variant {
        let live = block.dominant_variant.eq_ignore_ascii_case(variant);
        let snapshot = metadata.variant.eq_ignore_ascii_case(variant);
        if live || snapshot {
            return true;
        }
    }

    if let Some(sentiment) = &filters.sentiment {
        let live = block.dominant_sentiment.eq_ignore_ascii_case(sentiment);
        let snapshot = metadata.sentiment.eq_ignore_ascii_case(sentiment);
        if live || snapshot {
            return true;
        }
    }

    if !filters.tags.is_empty() {
        let block_tags: HashSet<String> = block
            .aggregated_tags
            .iter()
            .map(|tag| tag.to_lowercase())
            .collect();
        if filters
            .tags
            .iter()
            .any(|tag| block_tags.contains(&tag.to_lowercase()))
        {
            return true;
        }
    }

    false
}
