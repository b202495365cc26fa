use std::collections::HashSet;
use std::num::NonZeroUsize;

use tracing::debug;

use super::groundtruth::Groundtruth;
use crate::model::{CoverSet, MatchPositions, RankedCandidate, RankedResults};

pub fn normalize_id<'a>(id: &'a str, strip_suffix: Option<&str>) -> &'a str {
    let base = id.rsplit(['/', '\\']).next().unwrap_or(id);
    match strip_suffix {
        Some(suffix) if !suffix.is_empty() => base.strip_suffix(suffix).unwrap_or(base),
        _ => base,
    }
}

pub fn resolve_match_positions(
    query: &str,
    candidates: &[RankedCandidate],
    cover_set: &CoverSet,
    strip_suffix: Option<&str>,
) -> MatchPositions {
    let query_id = normalize_id(query, strip_suffix);
    let expected = cover_set.len().saturating_sub(1);

    let mut positions = Vec::with_capacity(expected);
    let mut seen = HashSet::<&str>::new();
    let mut rank = NonZeroUsize::MIN;

    for candidate in candidates {
        let candidate_id = normalize_id(&candidate.id, strip_suffix);
        if candidate_id == query_id {
            continue;
        }
        if cover_set.contains(candidate_id) && seen.insert(candidate_id) {
            positions.push(Some(rank));
        }
        rank = rank.saturating_add(1);
    }

    positions.resize(expected, None);

    MatchPositions {
        query: query.to_string(),
        positions,
    }
}

pub fn resolve_all(
    results: &RankedResults,
    groundtruth: &Groundtruth,
    strip_suffix: Option<&str>,
) -> Vec<MatchPositions> {
    let mut resolved = Vec::with_capacity(results.len());
    for group in results.queries() {
        let query_id = normalize_id(&group.query, strip_suffix);
        let Some(cover_set) = groundtruth.cover_set_of(query_id) else {
            debug!(query = %group.query, "query has no cover set; not evaluated");
            continue;
        };
        resolved.push(resolve_match_positions(
            &group.query,
            &group.candidates,
            cover_set,
            strip_suffix,
        ));
    }
    resolved
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use super::{normalize_id, resolve_all, resolve_match_positions};
    use crate::model::{CoverSet, QueryResult, RankedCandidate, RankedResults};
    use crate::ranking::groundtruth::load_groundtruth;

    fn ranked(ids: &[&str]) -> Vec<RankedCandidate> {
        ids.iter()
            .enumerate()
            .map(|(index, id)| RankedCandidate::new(*id, 1.0 / (index as f64 + 1.0)))
            .collect()
    }

    fn cover_set(members: &[&str]) -> CoverSet {
        CoverSet {
            label: "work".to_string(),
            members: members.iter().map(|id| id.to_string()).collect(),
        }
    }

    fn ranks(values: &[Option<usize>]) -> Vec<Option<NonZeroUsize>> {
        values
            .iter()
            .map(|value| value.and_then(NonZeroUsize::new))
            .collect()
    }

    #[test]
    fn query_itself_does_not_consume_a_rank_slot() {
        let positions = resolve_match_positions(
            "A",
            &ranked(&["A", "B", "X", "C"]),
            &cover_set(&["A", "B", "C"]),
            None,
        );
        assert_eq!(positions.positions, ranks(&[Some(1), Some(3)]));
    }

    #[test]
    fn missing_members_are_padded_with_not_found() {
        let positions = resolve_match_positions(
            "A",
            &ranked(&["X", "C", "Y"]),
            &cover_set(&["A", "B", "C", "D"]),
            None,
        );
        assert_eq!(positions.positions, ranks(&[Some(2), None, None]));
        assert_eq!(positions.not_found_count(), 2);
    }

    #[test]
    fn singleton_cover_set_yields_empty_positions() {
        let positions =
            resolve_match_positions("A", &ranked(&["A", "B"]), &cover_set(&["A"]), None);
        assert!(positions.positions.is_empty());
    }

    #[test]
    fn repeated_member_is_recorded_once() {
        let positions = resolve_match_positions(
            "A",
            &ranked(&["B", "B", "C"]),
            &cover_set(&["A", "B", "C"]),
            None,
        );
        assert_eq!(positions.positions, ranks(&[Some(1), Some(3)]));
    }

    #[test]
    fn suffix_and_directories_are_ignored_when_comparing_ids() {
        let positions = resolve_match_positions(
            "queries/A.mp3.chroma",
            &ranked(&["coll/A.mp3.chroma", "coll/Z.mp3.chroma", "coll/B.mp3.chroma"]),
            &cover_set(&["A", "B"]),
            Some(".mp3.chroma"),
        );
        assert_eq!(positions.positions, ranks(&[Some(2)]));
        assert_eq!(normalize_id("a/b/C.txt", Some(".mp3")), "C.txt");
        assert_eq!(normalize_id("C.mp3", Some("")), "C.mp3");
    }

    #[test]
    fn resolve_all_skips_queries_outside_the_groundtruth() {
        let groundtruth = load_groundtruth(["A,w,t", "B,w,t"]);
        let results = RankedResults::from_queries([
            QueryResult {
                query: "A".to_string(),
                candidates: ranked(&["A", "B"]),
            },
            QueryResult {
                query: "Q".to_string(),
                candidates: ranked(&["A"]),
            },
        ]);

        let resolved = resolve_all(&results, &groundtruth, None);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].query, "A");
        assert_eq!(resolved[0].positions, ranks(&[Some(1)]));
    }
}
