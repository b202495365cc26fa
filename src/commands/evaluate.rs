use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use super::write_lines;
use crate::cli::{EvaluateArgs, ReportMode};
use crate::model::{EvaluationReport, MatchPositions, QueryEvaluation, RankedResults};
use crate::ranking::matches::normalize_id;
use crate::ranking::metrics::{average_precision, reciprocal_rank};
use crate::ranking::{
    Groundtruth, ResultParser, load_groundtruth, mean_average_precision, mean_reciprocal_rank,
    resolve_all,
};
use crate::util::{now_utc_string, read_lines, write_json_pretty};

pub fn run(args: EvaluateArgs) -> Result<()> {
    let gt_lines = read_lines(Some(args.groundtruth.as_path()))
        .with_context(|| format!("failed to load groundtruth {}", args.groundtruth.display()))?;
    let groundtruth = load_groundtruth(gt_lines);
    if groundtruth.is_empty() {
        bail!(
            "groundtruth {} contains no cover sets",
            args.groundtruth.display()
        );
    }
    info!(
        cover_sets = groundtruth.cover_sets().len(),
        skipped_rows = groundtruth.skipped_rows,
        "groundtruth loaded"
    );

    let result_lines = read_lines(args.results.as_deref()).context("failed to read engine output")?;
    let results = ResultParser::new()?.parse(result_lines);
    info!(
        queries = results.len(),
        skipped_lines = results.skipped_lines,
        "engine output parsed"
    );

    let strip_suffix = Some(args.strip_suffix.as_str());
    let report = build_report(&results, &groundtruth, strip_suffix)
        .context("evaluation stage failed")?;

    if let Some(path) = &args.json {
        write_json_pretty(path, &report)?;
        info!(path = %path.display(), "wrote evaluation report");
    }

    match args.report {
        ReportMode::Mrr => write_lines([report.mean_reciprocal_rank.to_string()]),
        ReportMode::Map => write_lines([report.mean_average_precision.to_string()]),
        ReportMode::Full => write_lines(render_full(&report)),
    }
}

pub fn build_report(
    results: &RankedResults,
    groundtruth: &Groundtruth,
    strip_suffix: Option<&str>,
) -> Result<EvaluationReport> {
    let matches = resolve_all(results, groundtruth, strip_suffix);
    debug!(
        evaluated = matches.len(),
        parsed = results.len(),
        "match positions resolved"
    );

    let mean_average_precision = mean_average_precision(&matches)?;
    let mean_reciprocal_rank = mean_reciprocal_rank(&matches)?;

    let queries = matches
        .iter()
        .map(|positions| query_evaluation(positions, groundtruth, strip_suffix))
        .collect::<Vec<QueryEvaluation>>();

    Ok(EvaluationReport {
        generated_at: now_utc_string(),
        query_count: results.len(),
        evaluated_count: matches.len(),
        not_found_total: matches.iter().map(MatchPositions::not_found_count).sum(),
        queries,
        mean_average_precision,
        mean_reciprocal_rank,
    })
}

fn query_evaluation(
    positions: &MatchPositions,
    groundtruth: &Groundtruth,
    strip_suffix: Option<&str>,
) -> QueryEvaluation {
    let id = normalize_id(&positions.query, strip_suffix);
    QueryEvaluation {
        query: positions.query.clone(),
        title: groundtruth.title(id).map(str::to_string),
        positions: positions
            .positions
            .iter()
            .map(|position| position.map(|rank| rank.get()))
            .collect(),
        reciprocal_rank: reciprocal_rank(&positions.positions),
        average_precision: average_precision(&positions.positions),
    }
}

pub fn render_full(report: &EvaluationReport) -> Vec<String> {
    let mut lines = report
        .queries
        .iter()
        .map(|query| {
            let positions = query
                .positions
                .iter()
                .map(|position| position.map_or_else(|| "none".to_string(), |rank| rank.to_string()))
                .collect::<Vec<String>>()
                .join(", ");
            format!(
                "{} {} [{}]",
                query.query,
                query.title.as_deref().unwrap_or("-"),
                positions
            )
        })
        .collect::<Vec<String>>();

    lines.push(format!("MAP {}", report.mean_average_precision));
    lines.push(format!("MRR {}", report.mean_reciprocal_rank));
    lines.push(format!("not found {}", report.not_found_total));
    lines
}
