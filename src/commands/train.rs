use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{info, warn};

use super::write_lines;
use crate::cli::TrainArgs;
use crate::engine::{IndexHandle, ProcessEngine};
use crate::model::SearchReport;
use crate::ranking::matches::normalize_id;
use crate::ranking::{Groundtruth, load_groundtruth};
use crate::search::{ParameterSearch, PruningStrategy, SearchConfig};
use crate::util::{
    list_files_containing, now_utc_string, read_lines, sha256_file, utc_compact_string,
    write_json_pretty,
};

const REPORT_VERSION: u32 = 1;

pub fn run(args: TrainArgs) -> Result<()> {
    let started_ts = Utc::now();
    let run_id = format!("train-{}", utc_compact_string(started_ts));
    let started_at = now_utc_string();

    let gt_lines = read_lines(Some(args.groundtruth.as_path()))
        .with_context(|| format!("failed to load groundtruth {}", args.groundtruth.display()))?;
    let groundtruth = load_groundtruth(gt_lines);
    if groundtruth.is_empty() {
        bail!(
            "groundtruth {} contains no cover sets",
            args.groundtruth.display()
        );
    }
    let groundtruth_sha256 = sha256_file(&args.groundtruth)?;

    let listed = list_files_containing(&args.queries_dir, "")?;
    let listed_count = listed.len();
    let pool = queries_with_cover_set(listed, &groundtruth, &args.strip_suffix);
    if pool.len() < listed_count {
        warn!(
            dropped = listed_count - pool.len(),
            "query files without a cover set are left out of the search"
        );
    }
    if pool.is_empty() {
        bail!(
            "no query file in {} belongs to a cover set",
            args.queries_dir.display()
        );
    }

    let initial = match &args.initial_strategy {
        Some(raw) => PruningStrategy::parse(raw).context("invalid --initial-strategy")?,
        None => PruningStrategy::default(),
    };
    let config = SearchConfig {
        iterations: args.iterations,
        moveset_size: args.moveset_size,
        eval_subset_size: args.eval_subset_size,
        validation_subset_size: args.validation_subset_size,
        strip_suffix: Some(args.strip_suffix.clone()),
        seed: args.seed,
    };

    info!(
        run_id = %run_id,
        queries = pool.len(),
        iterations = config.iterations,
        moveset_size = config.moveset_size,
        seed = ?config.seed,
        "starting pruning-strategy search"
    );

    let engine = ProcessEngine::new(args.engine.engine_config())?;
    let mut search = ParameterSearch::new(
        &engine,
        &groundtruth,
        IndexHandle::new(&args.index),
        args.engine.params(),
        pool,
        initial,
        config.clone(),
    )?;
    let iterations = search.run();

    let best = search.best();
    let report = SearchReport {
        report_version: REPORT_VERSION,
        run_id,
        started_at,
        finished_at: now_utc_string(),
        groundtruth_path: args.groundtruth.display().to_string(),
        groundtruth_sha256,
        index_path: args.index.display().to_string(),
        seed: config.seed,
        iterations_requested: config.iterations,
        moveset_size: config.moveset_size,
        eval_subset_size: config.eval_subset_size,
        validation_subset_size: search.validation_queries().len(),
        initial_strategy: initial.values().to_vec(),
        initial_objective: search.initial_objective(),
        best_strategy: best.values().to_vec(),
        best_objective: search.best_objective(),
        accepted_count: iterations.iter().filter(|record| record.accepted).count(),
        iterations,
    };

    write_json_pretty(&args.report_path, &report)?;
    info!(
        path = %args.report_path.display(),
        accepted = report.accepted_count,
        best_objective = ?report.best_objective,
        "search finished"
    );

    write_lines([best.to_arg()])
}

fn queries_with_cover_set(
    listed: Vec<PathBuf>,
    groundtruth: &Groundtruth,
    strip_suffix: &str,
) -> Vec<PathBuf> {
    listed
        .into_iter()
        .filter(|path| {
            let raw = path.to_string_lossy();
            groundtruth
                .cover_set_of(normalize_id(&raw, Some(strip_suffix)))
                .is_some()
        })
        .collect()
}
