use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

use crate::model::{QueryResult, RankedCandidate, RankedResults};

pub struct ResultParser {
    query_line: Regex,
    rank_line: Regex,
    pruned_line: Regex,
}

impl ResultParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            query_line: Regex::new(r"^query:\s*(.*)$").context("failed to compile query-line regex")?,
            rank_line: Regex::new(r"^rank\s*(\d+)\s*:\s*(\S+)\s+-\s+(.*)$")
                .context("failed to compile rank-line regex")?,
            pruned_line: Regex::new(r"^pruned\s+(\d+)\s+(\d+)$")
                .context("failed to compile pruned-line regex")?,
        })
    }

    pub fn parse<I, S>(&self, lines: I) -> RankedResults
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut results = RankedResults::default();
        let mut current: Option<QueryResult> = None;

        for (line_no, raw) in lines.into_iter().enumerate() {
            let line = raw.as_ref().trim();

            if let Some(captures) = self.query_line.captures(line) {
                if let Some(group) = current.take() {
                    results.insert(group);
                }
                let query = captures.get(1).map_or("", |m| m.as_str()).trim();
                if query.is_empty() {
                    debug!(line = line_no + 1, "skipping query line without identifier");
                    results.skipped_lines += 1;
                    continue;
                }
                current = Some(QueryResult {
                    query: query.to_string(),
                    candidates: Vec::new(),
                });
                continue;
            }

            if has_marker(line, "rank") {
                match (self.parse_rank_line(line), current.as_mut()) {
                    (Some(candidate), Some(group)) => group.candidates.push(candidate),
                    (Some(_), None) => {
                        debug!(line = line_no + 1, "skipping rank line outside any query group");
                        results.skipped_lines += 1;
                    }
                    (None, _) => {
                        debug!(line = line_no + 1, content = %line, "skipping malformed rank line");
                        results.skipped_lines += 1;
                    }
                }
                continue;
            }

            if has_marker(line, "pruned") {
                match self.parse_pruned_line(line) {
                    Some((pruned, total)) => results.prune.record(pruned, total),
                    None => {
                        debug!(line = line_no + 1, content = %line, "skipping malformed pruned line");
                        results.skipped_lines += 1;
                    }
                }
            }
        }

        if let Some(group) = current.take() {
            results.insert(group);
        }

        results
    }

    fn parse_rank_line(&self, line: &str) -> Option<RankedCandidate> {
        let captures = self.rank_line.captures(line)?;
        let score = captures.get(2)?.as_str().parse::<f64>().ok()?;
        if !score.is_finite() {
            return None;
        }
        let id = captures.get(3)?.as_str().trim();
        if id.is_empty() {
            return None;
        }
        Some(RankedCandidate::new(id, score))
    }

    fn parse_pruned_line(&self, line: &str) -> Option<(u64, u64)> {
        let captures = self.pruned_line.captures(line)?;
        let pruned = captures.get(1)?.as_str().parse::<u64>().ok()?;
        let total = captures.get(2)?.as_str().parse::<u64>().ok()?;
        Some((pruned, total))
    }
}

fn has_marker(line: &str, marker: &str) -> bool {
    line.strip_prefix(marker)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|next| next.is_ascii_digit() || next.is_whitespace())
}
