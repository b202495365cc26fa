use anyhow::{Context, Result, bail};
use tracing::info;

use super::{load_relevance, write_lines};
use crate::cli::MatrixArgs;
use crate::ranking::{ResultParser, ScoreMatrix};
use crate::util::read_lines;

pub fn run(args: MatrixArgs) -> Result<()> {
    let lines = read_lines(args.results.as_deref()).context("failed to read chunk rankings")?;
    let results = ResultParser::new()?.parse(lines);
    if results.is_empty() {
        bail!("no query groups found in chunk rankings");
    }

    let mut matrix = ScoreMatrix::from_results(&results);
    if let (Some(path), Some(recording_id)) = (&args.relevance.lp_groundtruth, &args.relevance.lp_id) {
        let relevant = load_relevance(path, recording_id)?;
        matrix = matrix.with_relevance(&relevant);
    }

    info!(
        candidates = matrix.ids().len(),
        chunks = matrix.chunk_count(),
        undetected_relevant = matrix.relevant_not_detected().len(),
        "score matrix built"
    );
    write_lines(matrix.to_csv_lines())
}
