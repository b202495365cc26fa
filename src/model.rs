use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub id: String,
    pub score: f64,
}

impl RankedCandidate {
    pub fn new(id: impl Into<String>, score: f64) -> Self {
        Self {
            id: id.into(),
            score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub query: String,
    pub candidates: Vec<RankedCandidate>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PruneStats {
    pub pruned: u64,
    pub total: u64,
    pub lines: usize,
}

impl PruneStats {
    pub fn record(&mut self, pruned: u64, total: u64) {
        self.pruned += pruned;
        self.total += total;
        self.lines += 1;
    }

    pub fn absorb(&mut self, other: &PruneStats) {
        self.pruned += other.pruned;
        self.total += other.total;
        self.lines += other.lines;
    }

    pub fn ratio(&self) -> Option<f64> {
        if self.lines == 0 || self.total == 0 {
            return None;
        }
        Some(self.pruned as f64 / self.total as f64)
    }
}

/// Parsed engine output. Query groups keep the order in which the engine
/// reported them; a repeated query identifier replaces the earlier group.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankedResults {
    queries: Vec<QueryResult>,
    pub prune: PruneStats,
    pub skipped_lines: usize,
}

impl RankedResults {
    pub fn from_queries(queries: impl IntoIterator<Item = QueryResult>) -> Self {
        let mut results = Self::default();
        for query in queries {
            results.insert(query);
        }
        results
    }

    pub(crate) fn insert(&mut self, group: QueryResult) {
        match self
            .queries
            .iter_mut()
            .find(|existing| existing.query == group.query)
        {
            Some(existing) => *existing = group,
            None => self.queries.push(group),
        }
    }

    pub fn queries(&self) -> &[QueryResult] {
        &self.queries
    }

    pub fn get(&self, query: &str) -> Option<&[RankedCandidate]> {
        self.queries
            .iter()
            .find(|group| group.query == query)
            .map(|group| group.candidates.as_slice())
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverSet {
    pub label: String,
    pub members: Vec<String>,
}

impl CoverSet {
    pub fn contains(&self, id: &str) -> bool {
        self.members.iter().any(|member| member == id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchPositions {
    pub query: String,
    pub positions: Vec<Option<NonZeroUsize>>,
}

impl MatchPositions {
    pub fn not_found_count(&self) -> usize {
        self.positions
            .iter()
            .filter(|position| position.is_none())
            .count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub generated_at: String,
    pub query_count: usize,
    pub evaluated_count: usize,
    pub queries: Vec<QueryEvaluation>,
    pub mean_average_precision: f64,
    pub mean_reciprocal_rank: f64,
    pub not_found_total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryEvaluation {
    pub query: String,
    pub title: Option<String>,
    pub positions: Vec<Option<usize>>,
    pub reciprocal_rank: Option<f64>,
    pub average_precision: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchReport {
    pub report_version: u32,
    pub run_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub groundtruth_path: String,
    pub groundtruth_sha256: String,
    pub index_path: String,
    pub seed: Option<u64>,
    pub iterations_requested: usize,
    pub moveset_size: usize,
    pub eval_subset_size: usize,
    pub validation_subset_size: usize,
    pub initial_strategy: Vec<f64>,
    pub initial_objective: Option<f64>,
    pub best_strategy: Vec<f64>,
    pub best_objective: Option<f64>,
    pub accepted_count: usize,
    pub iterations: Vec<SearchIterationRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchIterationRecord {
    pub iteration: usize,
    pub eval_queries: usize,
    pub moveset_objectives: Vec<Option<f64>>,
    pub best_neighbour: Option<usize>,
    pub validation_objective: Option<f64>,
    pub accepted: bool,
    pub best_objective: Option<f64>,
}
