use std::cmp::Ordering;
use std::collections::HashMap;
use std::num::NonZeroUsize;

use serde::Serialize;

use crate::model::RankedResults;

pub const WINDOW_LEN: usize = 4;
pub const RANK_FLOOR: usize = 3;
pub const NOT_FOUND_RANK: f64 = 1000.0;

pub fn fusion_id(raw: &str) -> &str {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    match base.find('.') {
        Some(position) if position > 0 => &base[..position],
        _ => base,
    }
}

pub fn chunk_number(query: &str) -> Option<u64> {
    let base = query.rsplit(['/', '\\']).next().unwrap_or(query);
    let rest = &base[base.rfind("chunk")? + "chunk".len()..];
    let digits = rest
        .find(|character: char| !character.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits == 0 || !(rest[digits..].is_empty() || rest[digits..].starts_with('.')) {
        return None;
    }
    rest[..digits].parse::<u64>().ok()
}

pub fn compare_candidate_ids(left: &str, right: &str) -> Ordering {
    match (left.parse::<u64>(), right.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b).then_with(|| left.cmp(right)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => left.cmp(right),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreMatrix {
    ids: Vec<String>,
    chunks: Vec<String>,
    cells: Vec<Vec<Option<f64>>>,
    relevance: Option<Vec<bool>>,
    relevant_not_detected: Vec<String>,
}

impl ScoreMatrix {
    pub fn from_results(results: &RankedResults) -> Self {
        let mut columns = results.queries().iter().collect::<Vec<_>>();
        // Stable: queries without a chunk number keep their reported order after numbered ones.
        columns.sort_by_key(|group| chunk_number(&group.query).map_or((1, 0), |k| (0, k)));

        let mut ids = columns
            .iter()
            .flat_map(|group| group.candidates.iter())
            .map(|candidate| fusion_id(&candidate.id).to_string())
            .collect::<Vec<String>>();
        ids.sort_by(|left, right| compare_candidate_ids(left, right));
        ids.dedup();

        let row_of = ids
            .iter()
            .enumerate()
            .map(|(row, id)| (id.as_str(), row))
            .collect::<HashMap<&str, usize>>();

        let mut cells = vec![vec![None; columns.len()]; ids.len()];
        for (column, group) in columns.iter().enumerate() {
            for candidate in &group.candidates {
                let row = row_of[fusion_id(&candidate.id)];
                // First occurrence wins when two files share a fusion id.
                if cells[row][column].is_none() {
                    cells[row][column] = Some(candidate.score);
                }
            }
        }

        Self {
            chunks: columns.iter().map(|group| group.query.clone()).collect(),
            ids,
            cells,
            relevance: None,
            relevant_not_detected: Vec::new(),
        }
    }

    pub fn with_relevance(mut self, relevant: &[String]) -> Self {
        let flags = self
            .ids
            .iter()
            .map(|id| relevant.iter().any(|candidate| candidate == id))
            .collect();
        self.relevant_not_detected = relevant
            .iter()
            .filter(|candidate| !self.ids.contains(*candidate))
            .cloned()
            .collect();
        self.relevance = Some(flags);
        self
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<f64> {
        self.cells[row][column]
    }

    pub fn score(&self, row: usize, column: usize) -> f64 {
        self.cell(row, column).unwrap_or(0.0)
    }

    pub fn relevant_not_detected(&self) -> &[String] {
        &self.relevant_not_detected
    }

    pub fn to_csv_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.ids.len() + self.relevant_not_detected.len());
        for (row, id) in self.ids.iter().enumerate() {
            let relevance = match &self.relevance {
                Some(flags) if flags[row] => "1",
                Some(_) => "0",
                None => "-1",
            };
            let mut fields = vec![id.clone(), relevance.to_string()];
            fields.extend((0..self.chunk_count()).map(|column| self.score(row, column).to_string()));
            lines.push(fields.join(","));
        }
        for id in &self.relevant_not_detected {
            let mut fields = vec![id.clone(), "1".to_string()];
            fields.extend(std::iter::repeat_n("0".to_string(), self.chunk_count()));
            lines.push(fields.join(","));
        }
        lines
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankMatrix {
    ranks: Vec<Vec<Option<NonZeroUsize>>>,
}

impl RankMatrix {
    pub fn from_scores(scores: &ScoreMatrix) -> Self {
        let mut ranks = vec![vec![None; scores.chunk_count()]; scores.ids().len()];

        for column in 0..scores.chunk_count() {
            let mut present = (0..scores.ids().len())
                // Adding 0.0 folds -0.0 into 0.0 so equal scores keep id order.
                .filter_map(|row| scores.cell(row, column).map(|score| (row, score + 0.0)))
                .collect::<Vec<(usize, f64)>>();
            present.sort_by(|left, right| right.1.total_cmp(&left.1));

            for (rank, (row, _)) in (1..).zip(present) {
                ranks[row][column] = NonZeroUsize::new(rank);
            }
        }

        Self { ranks }
    }

    pub fn row(&self, row: usize) -> &[Option<NonZeroUsize>] {
        &self.ranks[row]
    }

    pub fn rows(&self) -> usize {
        self.ranks.len()
    }
}

pub fn window_score(window: &[Option<NonZeroUsize>]) -> f64 {
    window
        .iter()
        .map(|rank| match rank {
            Some(rank) => 1.0 / (rank.get().max(RANK_FLOOR) as f64).powi(2),
            None => 1.0 / NOT_FOUND_RANK.powi(2),
        })
        .sum()
}

/// Best window score over every run of [`WINDOW_LEN`] consecutive chunks;
/// zero when the recording has fewer chunks than that.
pub fn fused_score(ranks: &[Option<NonZeroUsize>]) -> f64 {
    ranks
        .windows(WINDOW_LEN)
        .map(window_score)
        .fold(0.0, f64::max)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusedCandidate {
    pub id: String,
    pub score: f64,
    pub relevant: Option<bool>,
}

impl FusedCandidate {
    pub fn display_line(&self) -> String {
        format!("[{:6.4}] - {}", self.score, self.id)
    }
}

pub fn fuse_matrix(scores: &ScoreMatrix) -> Vec<FusedCandidate> {
    let ranks = RankMatrix::from_scores(scores);
    let mut fused = scores
        .ids()
        .iter()
        .enumerate()
        .map(|(row, id)| FusedCandidate {
            id: id.clone(),
            score: fused_score(ranks.row(row)),
            relevant: scores.relevance.as_ref().map(|flags| flags[row]),
        })
        .collect::<Vec<FusedCandidate>>();

    fused.sort_by(|left, right| {
        right
            .score
            .total_cmp(&left.score)
            .then_with(|| compare_candidate_ids(&left.id, &right.id))
    });
    fused
}

pub fn fuse(results: &RankedResults) -> Vec<FusedCandidate> {
    fuse_matrix(&ScoreMatrix::from_results(results))
}
