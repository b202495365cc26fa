use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::info;

use super::{load_relevance, write_fused};
use crate::cli::IdentifyArgs;
use crate::engine::{EngineParams, IndexHandle, Indexer, ProcessEngine, RankedSearch};
use crate::ranking::{FusedCandidate, ScoreMatrix, fuse_matrix};
use crate::search::PruningStrategy;
use crate::util::list_files_containing;

const CHUNK_MARKER: &str = "_chunk";

pub fn run(args: IdentifyArgs) -> Result<()> {
    let chunks = list_files_containing(&args.chunks_dir, CHUNK_MARKER)?;
    if chunks.is_empty() {
        bail!(
            "no chunk files (names containing {CHUNK_MARKER}) in {}",
            args.chunks_dir.display()
        );
    }

    let mut params = args.engine.params();
    if let Some(raw) = &args.strategy {
        params = params.with_pruning(PruningStrategy::parse(raw)?);
    }

    let engine = ProcessEngine::new(args.engine.engine_config())?;
    let index = match &args.collection {
        Some(collection) => engine
            .index(collection, &args.index, &params)
            .with_context(|| format!("indexing stage failed for {}", collection.display()))?,
        None => IndexHandle::new(&args.index),
    };

    let relevant = match (&args.relevance.lp_groundtruth, &args.relevance.lp_id) {
        (Some(path), Some(recording_id)) => Some(load_relevance(path, recording_id)?),
        _ => None,
    };

    let fused = identify(&engine, &chunks, &index, &params, relevant.as_deref())?;
    for (position, candidate) in fused.iter().enumerate() {
        if candidate.relevant == Some(true) {
            info!(id = %candidate.id, rank = position + 1, score = candidate.score, "relevant candidate");
        }
    }
    write_fused(&fused, args.limit)
}

pub fn identify<E: RankedSearch>(
    engine: &E,
    chunks: &[PathBuf],
    index: &IndexHandle,
    params: &EngineParams,
    relevant: Option<&[String]>,
) -> Result<Vec<FusedCandidate>> {
    let results = engine
        .search(chunks, index, params)
        .context("ranking stage failed")?;

    let mut matrix = ScoreMatrix::from_results(&results);
    if let Some(relevant) = relevant {
        matrix = matrix.with_relevance(relevant);
    }
    info!(
        chunks = matrix.chunk_count(),
        candidates = matrix.ids().len(),
        "chunk rankings collected"
    );
    Ok(fuse_matrix(&matrix))
}
