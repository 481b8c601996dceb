//! Ranking steps
//!
//! Each step is a pure function over a hypothesis list. [`rank_hypotheses`]
//! runs them in order: source weighting, agreement boost, confidence filter,
//! deduplication, sort, truncation.

use crate::constants::ranking::{AGREEMENT_BOOST_CAP, AGREEMENT_BOOST_STEP, AGREEMENT_RADIUS_KM};
use crate::coord::distance_km;
use crate::hypothesis::{AggregationRequest, LocationHypothesis};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Scale each confidence by its source's reliability weight
pub fn apply_source_weights(hypotheses: &mut [LocationHypothesis]) {
    for h in hypotheses.iter_mut() {
        h.confidence = (h.confidence * h.source.reliability_weight()).clamp(0.0, 1.0);
    }
}

/// Boost hypotheses that other hypotheses agree with spatially
///
/// Every other hypothesis strictly closer than 50 km adds 0.02, up to 0.1.
/// Neighbour counts are taken before any confidence changes.
pub fn apply_agreement_boost(hypotheses: &mut [LocationHypothesis]) {
    if hypotheses.len() < 2 {
        return;
    }

    let positions: Vec<_> = hypotheses.iter().map(|h| h.coords()).collect();
    for (i, h) in hypotheses.iter_mut().enumerate() {
        let neighbours = positions
            .iter()
            .enumerate()
            .filter(|(j, p)| *j != i && distance_km(positions[i], **p) < AGREEMENT_RADIUS_KM)
            .count();
        if neighbours > 0 {
            let boost = (neighbours as f64 * AGREEMENT_BOOST_STEP).min(AGREEMENT_BOOST_CAP);
            h.confidence = (h.confidence + boost).min(1.0);
        }
    }
}

/// Keep hypotheses with `confidence >= min_confidence`
pub fn filter_by_confidence(
    hypotheses: Vec<LocationHypothesis>,
    min_confidence: f64,
) -> Vec<LocationHypothesis> {
    hypotheses
        .into_iter()
        .filter(|h| h.confidence >= min_confidence)
        .collect()
}

/// Collapse hypotheses sharing a 4-decimal position, keeping the first seen
pub fn deduplicate(hypotheses: Vec<LocationHypothesis>) -> Vec<LocationHypothesis> {
    let mut seen = HashSet::new();
    hypotheses
        .into_iter()
        .filter(|h| seen.insert(h.coords().dedup_key()))
        .collect()
}

/// Stable sort: confidence descending, then source priority
pub fn rank(hypotheses: &mut [LocationHypothesis]) {
    hypotheses.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.source.priority().cmp(&b.source.priority()))
    });
}

/// Full ranking pipeline for one request
pub fn rank_hypotheses(
    mut hypotheses: Vec<LocationHypothesis>,
    request: &AggregationRequest,
) -> Vec<LocationHypothesis> {
    apply_source_weights(&mut hypotheses);
    apply_agreement_boost(&mut hypotheses);
    let mut hypotheses = deduplicate(filter_by_confidence(hypotheses, request.min_confidence));
    rank(&mut hypotheses);
    hypotheses.truncate(request.max_results);
    hypotheses
}
