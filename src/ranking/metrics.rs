use std::num::NonZeroUsize;

use crate::error::MetricsError;
use crate::model::MatchPositions;

pub fn reciprocal_rank(positions: &[Option<NonZeroUsize>]) -> Option<f64> {
    let first = positions.first()?;
    Some(first.map_or(0.0, |rank| 1.0 / rank.get() as f64))
}

pub fn average_precision(positions: &[Option<NonZeroUsize>]) -> Option<f64> {
    if positions.is_empty() {
        return None;
    }

    let mut found = 0usize;
    let mut accumulator = 0.0_f64;
    for position in positions {
        if let Some(rank) = position {
            found += 1;
            accumulator += found as f64 / rank.get() as f64;
        }
    }
    Some(accumulator / positions.len() as f64)
}

pub fn mean_reciprocal_rank(all: &[MatchPositions]) -> Result<f64, MetricsError> {
    mean_over_queries(all, "mean reciprocal rank", reciprocal_rank)
}

pub fn mean_average_precision(all: &[MatchPositions]) -> Result<f64, MetricsError> {
    mean_over_queries(all, "mean average precision", average_precision)
}

fn mean_over_queries(
    all: &[MatchPositions],
    metric: &'static str,
    per_query: fn(&[Option<NonZeroUsize>]) -> Option<f64>,
) -> Result<f64, MetricsError> {
    let values = all
        .iter()
        .filter_map(|query| per_query(&query.positions))
        .collect::<Vec<f64>>();
    if values.is_empty() {
        return Err(MetricsError::EmptyDenominator { metric });
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
pub(crate) fn positions_from_ranks(
    query: &str,
    ranks: &[Option<usize>],
) -> Result<MatchPositions, MetricsError> {
    let positions = ranks
        .iter()
        .map(|rank| match rank {
            Some(value) => NonZeroUsize::new(*value)
                .map(Some)
                .ok_or_else(|| MetricsError::ZeroRank {
                    query: query.to_string(),
                }),
            None => Ok(None),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MatchPositions {
        query: query.to_string(),
        positions,
    })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{
        average_precision, mean_average_precision, mean_reciprocal_rank, positions_from_ranks,
        reciprocal_rank,
    };
    use crate::error::MetricsError;
    use crate::model::MatchPositions;

    fn query(ranks: &[Option<usize>]) -> MatchPositions {
        positions_from_ranks("q", ranks).expect("test ranks are 1-based")
    }

    #[test]
    fn reciprocal_rank_uses_first_position() {
        assert_eq!(reciprocal_rank(&query(&[Some(4), Some(9)]).positions), Some(0.25));
        assert_eq!(reciprocal_rank(&query(&[None, None]).positions), Some(0.0));
        assert_eq!(reciprocal_rank(&query(&[]).positions), None);
    }

    #[test]
    fn average_precision_penalizes_items_never_found() {
        let all_found = average_precision(&query(&[Some(1), Some(3)]).positions)
            .expect("non-empty positions");
        assert!((all_found - (1.0 + 2.0 / 3.0) / 2.0).abs() < 1e-12);

        let one_missing = average_precision(&query(&[Some(1), Some(3), None]).positions)
            .expect("non-empty positions");
        assert!((one_missing - (1.0 + 2.0 / 3.0) / 3.0).abs() < 1e-12);
    }

    #[test]
    fn means_skip_queries_without_relevant_items() {
        let all = vec![query(&[Some(2)]), query(&[]), query(&[Some(1), None])];

        let mrr = mean_reciprocal_rank(&all).expect("two queries qualify");
        assert!((mrr - 0.75).abs() < 1e-12);

        let map = mean_average_precision(&all).expect("two queries qualify");
        assert!((map - (0.5 + 0.5) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn means_over_no_queries_fail_with_empty_denominator() {
        assert_eq!(
            mean_reciprocal_rank(&[]),
            Err(MetricsError::EmptyDenominator {
                metric: "mean reciprocal rank"
            })
        );
        assert!(matches!(
            mean_average_precision(&[query(&[])]),
            Err(MetricsError::EmptyDenominator { .. })
        ));
    }

    #[test]
    fn zero_rank_is_rejected() {
        assert_eq!(
            positions_from_ranks("q7", &[Some(0)]),
            Err(MetricsError::ZeroRank {
                query: "q7".to_string()
            })
        );
    }

    fn arb_positions() -> impl Strategy<Value = Vec<Option<usize>>> {
        prop::collection::vec(prop::option::of(1usize..500), 1..12).prop_map(|mut values| {
            // Found ranks are discovered in ascending order, misses trail.
            let mut found = values.iter().flatten().copied().collect::<Vec<usize>>();
            found.sort_unstable();
            found.dedup();
            let misses = values.len() - found.len();
            values = found.into_iter().map(Some).collect();
            values.extend(std::iter::repeat_n(None, misses));
            values
        })
    }

    proptest! {
        #[test]
        fn metrics_stay_in_unit_interval(ranks in arb_positions()) {
            let positions = query(&ranks);
            let rr = reciprocal_rank(&positions.positions).expect("non-empty");
            let ap = average_precision(&positions.positions).expect("non-empty");
            prop_assert!((0.0..=1.0).contains(&rr));
            prop_assert!((0.0..=1.0).contains(&ap));
        }

        #[test]
        fn reciprocal_rank_is_inverse_of_first_rank(first in 1usize..1000) {
            let positions = query(&[Some(first), None]);
            prop_assert_eq!(reciprocal_rank(&positions.positions), Some(1.0 / first as f64));
        }

        #[test]
        fn average_precision_matches_textbook_formula(ranks in prop::collection::btree_set(1usize..300, 1..10)) {
            let sorted = ranks.into_iter().collect::<Vec<usize>>();
            let expected = sorted
                .iter()
                .enumerate()
                .map(|(index, rank)| (index + 1) as f64 / *rank as f64)
                .sum::<f64>()
                / sorted.len() as f64;
            let positions = query(&sorted.iter().copied().map(Some).collect::<Vec<_>>());
            let actual = average_precision(&positions.positions).expect("non-empty");
            prop_assert!((actual - expected).abs() < 1e-12);
        }
    }
}
