//! Fusion utilities: RRF, weighted sum, concatenation, normalization.
//!
//! Pure functions over ranked per-source lists. Output depends only on the
//! lists and their declared weights, never on wall-clock completion order.

use std::collections::HashMap;

use scout_types::{Candidate, CandidateSource, FusionMethod};

/// RRF constant; combined score of item `x` is `Σ 1/(K + rank)`.
pub const RRF_K: f64 = 60.0;

/// One ranked list entering fusion.
#[derive(Debug, Clone)]
pub struct SourceList {
    /// Source label (e.g. `vector:tools`).
    pub label: String,
    /// Fusion weight; 1.0 primary, 0.6 secondary, 0.4 tertiary, 0.5 default.
    pub weight: f64,
    /// Candidates in source rank order, scores already normalized.
    pub candidates: Vec<Candidate>,
}

/// Rescale a cosine similarity from `[-1, 1]` to `[0, 1]`.
#[must_use]
pub fn normalize_cosine(similarity: f64) -> f64 {
    ((similarity + 1.0) / 2.0).clamp(0.0, 1.0)
}

/// Ordering key carried through fusion for deterministic tie-breaking:
/// higher source weight first, then smaller original rank, then id.
#[derive(Debug, Clone, Copy)]
struct TieBreak {
    weight: f64,
    rank: usize,
}

struct Fused {
    candidate: Candidate,
    tie: TieBreak,
}

/// Fuse ranked lists with the given method.
///
/// `rrf` and `weighted_sum` merge entries by id; `concat` and `none`
/// preserve the incoming lists. The result is sorted by descending score
/// with deterministic tie-breaking; callers truncate afterwards.
#[must_use]
pub fn fuse(method: FusionMethod, lists: &[SourceList]) -> Vec<Candidate> {
    match method {
        FusionMethod::Rrf => sort_fused(rrf(lists)),
        FusionMethod::WeightedSum => sort_fused(weighted_sum(lists)),
        FusionMethod::Concat | FusionMethod::None => sort_fused(concat(lists)),
    }
}

fn rrf(lists: &[SourceList]) -> Vec<Fused> {
    let mut merged: HashMap<String, Fused> = HashMap::new();
    for list in lists {
        for (rank, candidate) in list.candidates.iter().enumerate() {
            // Ranks are 1-based; items absent from a list contribute zero.
            let term = 1.0 / (RRF_K + (rank + 1) as f64);
            upsert(&mut merged, candidate, list, rank, term);
        }
    }
    merged.into_values().collect()
}

fn weighted_sum(lists: &[SourceList]) -> Vec<Fused> {
    let total_weight: f64 = lists.iter().map(|l| l.weight).sum();
    let scale = if total_weight > 0.0 { total_weight } else { 1.0 };
    let mut merged: HashMap<String, Fused> = HashMap::new();
    for list in lists {
        for (rank, candidate) in list.candidates.iter().enumerate() {
            // Normalized by total weight so the fused score stays in [0, 1].
            let term = list.weight * candidate.score / scale;
            upsert(&mut merged, candidate, list, rank, term);
        }
    }
    merged.into_values().collect()
}

fn concat(lists: &[SourceList]) -> Vec<Fused> {
    let mut out = Vec::new();
    for list in lists {
        for (rank, candidate) in list.candidates.iter().enumerate() {
            out.push(Fused {
                candidate: candidate.clone(),
                tie: TieBreak {
                    weight: list.weight,
                    rank,
                },
            });
        }
    }
    out
}

fn upsert(
    merged: &mut HashMap<String, Fused>,
    candidate: &Candidate,
    list: &SourceList,
    rank: usize,
    score_term: f64,
) {
    match merged.get_mut(&candidate.id) {
        Some(existing) => {
            existing.candidate.score += score_term;
            existing.candidate.source = CandidateSource::Fusion;
            existing.candidate.provenance.merge(&candidate.provenance);
            if list.weight > existing.tie.weight
                || (list.weight == existing.tie.weight && rank < existing.tie.rank)
            {
                existing.tie = TieBreak {
                    weight: list.weight,
                    rank,
                };
            }
        }
        None => {
            let mut fused = candidate.clone();
            fused.score = score_term;
            merged.insert(
                candidate.id.clone(),
                Fused {
                    candidate: fused,
                    tie: TieBreak {
                        weight: list.weight,
                        rank,
                    },
                },
            );
        }
    }
}

fn sort_fused(mut fused: Vec<Fused>) -> Vec<Candidate> {
    fused.sort_by(|a, b| {
        b.candidate
            .score
            .total_cmp(&a.candidate.score)
            .then_with(|| b.tie.weight.total_cmp(&a.tie.weight))
            .then_with(|| a.tie.rank.cmp(&b.tie.rank))
            .then_with(|| a.candidate.id.cmp(&b.candidate.id))
    });
    fused.into_iter().map(|f| f.candidate).collect()
}

/// Group candidates by id; the representative is the highest-score member,
/// provenance is merged by set union.
#[must_use]
pub fn dedupe(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut order: Vec<String> = Vec::new();
    let mut by_id: HashMap<String, Candidate> = HashMap::new();
    for candidate in candidates {
        match by_id.get_mut(&candidate.id) {
            Some(existing) => {
                existing.provenance.merge(&candidate.provenance);
                if candidate.score > existing.score {
                    let provenance = existing.provenance.clone();
                    *existing = candidate;
                    existing.provenance = provenance;
                }
            }
            None => {
                order.push(candidate.id.clone());
                by_id.insert(candidate.id.clone(), candidate);
            }
        }
    }
    order
        .into_iter()
        .filter_map(|id| by_id.remove(&id))
        .collect()
}

/// Final ordering and truncation: descending score, cut to `limit`.
///
/// The sort is stable, so equal-score candidates keep the weight/rank/id
/// tie-break order the fusion pass already established.
#[must_use]
pub fn sort_and_truncate(mut candidates: Vec<Candidate>, limit: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    candidates.truncate(limit);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_types::Provenance;

    fn candidate(id: &str, score: f64, collection: &str) -> Candidate {
        Candidate {
            id: id.to_string(),
            source: CandidateSource::Vector,
            score,
            metadata: serde_json::Value::Null,
            provenance: Provenance {
                collections: vec![collection.to_string()],
                query_vector_sources: Vec::new(),
                filters_applied: Vec::new(),
            },
        }
    }

    fn list(label: &str, weight: f64, candidates: Vec<Candidate>) -> SourceList {
        SourceList {
            label: label.to_string(),
            weight,
            candidates,
        }
    }

    #[test]
    fn cosine_normalization_rescales_and_clamps() {
        assert!((normalize_cosine(1.0) - 1.0).abs() < 1e-12);
        assert!((normalize_cosine(-1.0)).abs() < 1e-12);
        assert!((normalize_cosine(0.0) - 0.5).abs() < 1e-12);
        assert!((normalize_cosine(3.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rrf_sums_reciprocal_ranks() {
        let lists = vec![
            list("a", 1.0, vec![candidate("x", 0.9, "tools"), candidate("y", 0.8, "tools")]),
            list("b", 0.6, vec![candidate("y", 0.7, "functionality")]),
        ];
        let fused = fuse(FusionMethod::Rrf, &lists);
        // y: 1/62 + 1/61 > x: 1/61.
        assert_eq!(fused[0].id, "y");
        let expected_y = 1.0 / 62.0 + 1.0 / 61.0;
        assert!((fused[0].score - expected_y).abs() < 1e-12);
        assert_eq!(fused[0].source, CandidateSource::Fusion);
        assert_eq!(fused[0].provenance.collections, ["tools", "functionality"]);
        assert!((fused[1].score - 1.0 / 61.0).abs() < 1e-12);
    }

    #[test]
    fn weighted_sum_scales_by_source_weight() {
        let lists = vec![
            list("a", 1.0, vec![candidate("x", 0.8, "tools")]),
            list("b", 0.6, vec![candidate("x", 0.5, "functionality")]),
        ];
        let fused = fuse(FusionMethod::WeightedSum, &lists);
        assert_eq!(fused.len(), 1);
        let expected = (1.0 * 0.8 + 0.6 * 0.5) / 1.6;
        assert!((fused[0].score - expected).abs() < 1e-12);
        assert!(fused[0].score <= 1.0);
    }

    #[test]
    fn concat_keeps_every_entry() {
        let lists = vec![
            list("a", 1.0, vec![candidate("x", 0.9, "tools")]),
            list("b", 0.5, vec![candidate("x", 0.4, "structured")]),
        ];
        let fused = fuse(FusionMethod::Concat, &lists);
        assert_eq!(fused.len(), 2);
    }

    #[test]
    fn fusion_ignores_list_arrival_order() {
        let a = list("a", 1.0, vec![candidate("x", 0.9, "tools"), candidate("y", 0.8, "tools")]);
        let b = list("b", 0.6, vec![candidate("y", 0.7, "functionality")]);
        let forward = fuse(FusionMethod::Rrf, &[a.clone(), b.clone()]);
        let reverse = fuse(FusionMethod::Rrf, &[b, a]);
        let forward_ids: Vec<&str> = forward.iter().map(|c| c.id.as_str()).collect();
        let reverse_ids: Vec<&str> = reverse.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(forward_ids, reverse_ids);
        for (f, r) in forward.iter().zip(&reverse) {
            assert!((f.score - r.score).abs() < 1e-12);
        }
    }

    #[test]
    fn equal_scores_break_ties_by_weight_then_rank_then_id() {
        let lists = vec![
            list("high", 1.0, vec![candidate("b", 0.5, "tools")]),
            list("low", 0.4, vec![candidate("a", 0.5, "usecases")]),
        ];
        let fused = fuse(FusionMethod::Concat, &lists);
        // Same score: higher source weight wins even against a smaller id.
        assert_eq!(fused[0].id, "b");
        assert_eq!(fused[1].id, "a");
    }

    #[test]
    fn dedupe_keeps_highest_score_and_merges_provenance() {
        let candidates = vec![
            candidate("x", 0.4, "tools"),
            candidate("x", 0.9, "functionality"),
            candidate("y", 0.5, "tools"),
        ];
        let deduped = dedupe(candidates);
        assert_eq!(deduped.len(), 2);
        let x = deduped.iter().find(|c| c.id == "x").unwrap();
        assert!((x.score - 0.9).abs() < 1e-12);
        assert_eq!(x.provenance.collections, ["tools", "functionality"]);
    }

    #[test]
    fn sort_and_truncate_caps_the_list() {
        let candidates = vec![
            candidate("a", 0.2, "tools"),
            candidate("b", 0.9, "tools"),
            candidate("c", 0.5, "tools"),
        ];
        let top = sort_and_truncate(candidates, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].id, "b");
        assert_eq!(top[1].id, "c");
    }
}
