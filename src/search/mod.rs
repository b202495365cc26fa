pub mod local_search;
pub mod objective;
pub mod strategy;

pub use local_search::{ParameterSearch, SearchConfig};
pub use strategy::PruningStrategy;

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::path::PathBuf;

    use super::{ParameterSearch, PruningStrategy, SearchConfig};
    use crate::engine::{EngineParams, IndexHandle, RankedSearch};
    use crate::error::EngineError;
    use crate::model::{PruneStats, QueryResult, RankedCandidate, RankedResults};
    use crate::ranking::{Groundtruth, load_groundtruth};

    // Returns each query's cover mate at rank 1 when the first stage's weight
    // is high and at rank 5 otherwise; pruning grows with the first low bound.
    struct ScriptedEngine {
        calls: Cell<usize>,
        fail_every: Option<usize>,
    }

    impl ScriptedEngine {
        fn new(fail_every: Option<usize>) -> Self {
            Self {
                calls: Cell::new(0),
                fail_every,
            }
        }
    }

    impl RankedSearch for ScriptedEngine {
        fn search(
            &self,
            queries: &[PathBuf],
            _index: &IndexHandle,
            params: &EngineParams,
        ) -> Result<RankedResults, EngineError> {
            let call = self.calls.get() + 1;
            self.calls.set(call);
            if self.fail_every.is_some_and(|every| call % every == 0) {
                return Err(EngineError::NoQueryGroups);
            }

            let strategy = params.pruning.unwrap_or_default();
            let stage = strategy.stage(0);
            let mate_rank = if stage.weight > 0.5 { 0 } else { 4 };

            let mut results = RankedResults::from_queries(queries.iter().map(|path| {
                let query = path.display().to_string();
                let mate = mate_of(&query);
                let mut candidates = (0..6)
                    .map(|index| RankedCandidate::new(format!("filler{index}"), 0.1))
                    .collect::<Vec<RankedCandidate>>();
                candidates.insert(mate_rank, RankedCandidate::new(mate, 0.9));
                QueryResult { query, candidates }
            }));
            results.prune = PruneStats {
                pruned: (stage.low * 100.0).round() as u64,
                total: 100,
                lines: 1,
            };
            Ok(results)
        }
    }

    fn mate_of(query: &str) -> String {
        match query.strip_suffix('a') {
            Some(stem) => format!("{stem}b"),
            None => format!("{}a", query.trim_end_matches('b')),
        }
    }

    fn groundtruth() -> Groundtruth {
        load_groundtruth((0..8).flat_map(|work| {
            [
                format!("w{work}a,work{work},Song {work}"),
                format!("w{work}b,work{work},Song {work}"),
            ]
        }))
    }

    fn pool() -> Vec<PathBuf> {
        (0..8).map(|work| PathBuf::from(format!("w{work}a"))).collect()
    }

    fn params() -> EngineParams {
        EngineParams {
            segment_length: 300,
            segment_overlap: 150,
            subsampling: 2,
            transpositions: None,
            pruning: None,
        }
    }

    fn config(seed: u64) -> SearchConfig {
        SearchConfig {
            iterations: 25,
            moveset_size: 4,
            eval_subset_size: 3,
            validation_subset_size: 4,
            strip_suffix: None,
            seed: Some(seed),
        }
    }

    #[test]
    fn best_objective_never_decreases() {
        let engine = ScriptedEngine::new(None);
        let groundtruth = groundtruth();
        let mut search = ParameterSearch::new(
            &engine,
            &groundtruth,
            IndexHandle::new("idx"),
            params(),
            pool(),
            PruningStrategy::default(),
            config(11),
        )
        .expect("search should initialize");

        let records = search.run();
        assert_eq!(records.len(), 25);

        let mut previous: Option<f64> = None;
        for record in &records {
            assert!(record.best_objective.is_some());
            assert!(record.best_objective >= previous);
            previous = record.best_objective;
        }
        assert!(search.best().is_valid());
        assert_eq!(search.best_objective(), records.last().and_then(|r| r.best_objective));
    }

    #[test]
    fn same_seed_reproduces_the_run() {
        let groundtruth = groundtruth();
        let run = |seed| {
            let engine = ScriptedEngine::new(None);
            let mut search = ParameterSearch::new(
                &engine,
                &groundtruth,
                IndexHandle::new("idx"),
                params(),
                pool(),
                PruningStrategy::default(),
                config(seed),
            )
            .expect("search should initialize");
            (search.run(), search.best())
        };

        assert_eq!(run(3), run(3));
    }

    #[test]
    fn failing_candidates_are_worst_and_never_accepted() {
        let engine = ScriptedEngine::new(Some(3));
        let groundtruth = groundtruth();
        let mut search = ParameterSearch::new(
            &engine,
            &groundtruth,
            IndexHandle::new("idx"),
            params(),
            pool(),
            PruningStrategy::default(),
            config(5),
        )
        .expect("search should initialize");

        let records = search.run();
        for record in records {
            if let Some(index) = record.best_neighbour {
                assert!(record.moveset_objectives[index].is_some());
            }
            if record.accepted {
                assert!(record.validation_objective.is_some());
                assert_eq!(record.best_objective, record.validation_objective);
            }
        }
    }

    #[test]
    fn evaluate_combines_map_and_pruning() {
        let engine = ScriptedEngine::new(None);
        let groundtruth = groundtruth();
        let search = ParameterSearch::new(
            &engine,
            &groundtruth,
            IndexHandle::new("idx"),
            params(),
            pool(),
            PruningStrategy::default(),
            config(1),
        )
        .expect("search should initialize");

        let mut values = PruningStrategy::default().values().to_vec();
        values[0] = 0.9;
        let strong = PruningStrategy::from_values(&values).expect("valid strategy");

        let weak_score = search
            .evaluate(&PruningStrategy::default(), &pool())
            .expect("scripted engine always answers");
        let strong_score = search.evaluate(&strong, &pool()).expect("scripted engine always answers");
        assert!(strong_score > weak_score);
    }

    #[test]
    fn empty_query_pool_is_rejected() {
        let engine = ScriptedEngine::new(None);
        let groundtruth = groundtruth();
        let outcome = ParameterSearch::new(
            &engine,
            &groundtruth,
            IndexHandle::new("idx"),
            params(),
            Vec::new(),
            PruningStrategy::default(),
            config(1),
        );
        assert!(outcome.is_err());
    }

    #[test]
    fn validation_subset_smaller_than_evaluation_subset_is_rejected() {
        let engine = ScriptedEngine::new(None);
        let groundtruth = groundtruth();
        let outcome = ParameterSearch::new(
            &engine,
            &groundtruth,
            IndexHandle::new("idx"),
            params(),
            pool(),
            PruningStrategy::default(),
            SearchConfig {
                validation_subset_size: 2,
                ..config(1)
            },
        );
        let error = outcome.err().expect("smaller validation subset should be rejected");
        assert!(error.to_string().contains("validation subset size 2"));
    }
}
