use std::path::{Path, PathBuf};

use crate::error::EngineError;
use crate::model::RankedResults;
use crate::search::strategy::PruningStrategy;

mod process;

pub use process::{EngineConfig, ProcessEngine};

#[derive(Debug, Clone, PartialEq)]
pub struct EngineParams {
    pub segment_length: u32,
    pub segment_overlap: u32,
    pub subsampling: u32,
    pub transpositions: Option<u32>,
    pub pruning: Option<PruningStrategy>,
}

impl EngineParams {
    pub fn with_pruning(&self, pruning: PruningStrategy) -> Self {
        Self {
            pruning: Some(pruning),
            ..self.clone()
        }
    }

    pub(crate) fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "-l".to_string(),
            self.segment_length.to_string(),
            "-o".to_string(),
            self.segment_overlap.to_string(),
            "-s".to_string(),
            self.subsampling.to_string(),
        ];
        if let Some(transpositions) = self.transpositions {
            args.push("-t".to_string());
            args.push(transpositions.to_string());
        }
        if let Some(pruning) = &self.pruning {
            args.push("-P".to_string());
            args.push(pruning.to_arg());
        }
        args
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHandle {
    path: PathBuf,
}

impl IndexHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub trait RankedSearch {
    fn search(
        &self,
        queries: &[PathBuf],
        index: &IndexHandle,
        params: &EngineParams,
    ) -> Result<RankedResults, EngineError>;
}

pub trait Indexer {
    fn index(
        &self,
        source: &Path,
        destination: &Path,
        params: &EngineParams,
    ) -> Result<IndexHandle, EngineError>;
}
