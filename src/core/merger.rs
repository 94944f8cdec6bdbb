use crate::models::{Candidate, CandidateKey, MergedCandidate};
use std::collections::{BTreeMap, BTreeSet};

/// Union candidate lists by (college id, course id).
///
/// The fold is commutative: any interleaving of the input lists yields the
/// same merged set. A source reporting the same pair twice keeps its best
/// score; the smallest observed distance is kept. Output is ordered by key.
pub fn merge_candidates<I>(lists: I) -> Vec<MergedCandidate>
where
    I: IntoIterator<Item = Vec<Candidate>>,
{
    let mut merged: BTreeMap<CandidateKey, MergedCandidate> = BTreeMap::new();

    for candidate in lists.into_iter().flatten() {
        let key = candidate.key();
        match merged.get_mut(&key) {
            Some(entry) => {
                entry.sources.insert(candidate.source);
                entry
                    .per_source_score
                    .entry(candidate.source)
                    .and_modify(|s| *s = s.max(candidate.score))
                    .or_insert(candidate.score);
                entry.distance_km = match (entry.distance_km, candidate.distance_km) {
                    (Some(a), Some(b)) => Some(a.min(b)),
                    (a, b) => a.or(b),
                };
            }
            None => {
                let mut sources = BTreeSet::new();
                sources.insert(candidate.source);
                let mut per_source_score = BTreeMap::new();
                per_source_score.insert(candidate.source, candidate.score);

                merged.insert(
                    key,
                    MergedCandidate {
                        college: candidate.college,
                        course_index: candidate.course_index,
                        distance_km: candidate.distance_km,
                        sources,
                        per_source_score,
                    },
                );
            }
        }
    }

    merged.into_values().collect()
}
