use std::path::PathBuf;

use anyhow::{Result, bail};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{debug, info};

use super::objective::objective;
use super::strategy::PruningStrategy;
use crate::engine::{EngineParams, IndexHandle, RankedSearch};
use crate::model::SearchIterationRecord;
use crate::ranking::{Groundtruth, mean_average_precision, resolve_all};

#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub iterations: usize,
    pub moveset_size: usize,
    pub eval_subset_size: usize,
    pub validation_subset_size: usize,
    pub strip_suffix: Option<String>,
    pub seed: Option<u64>,
}

/// Stochastic local search over pruning strategies. Candidates that cannot be
/// evaluated have no objective and lose against any that can.
pub struct ParameterSearch<'a, E: RankedSearch> {
    engine: &'a E,
    groundtruth: &'a Groundtruth,
    index: IndexHandle,
    base_params: EngineParams,
    config: SearchConfig,
    pool: Vec<PathBuf>,
    validation: Vec<PathBuf>,
    rng: StdRng,
    best: PruningStrategy,
    best_objective: Option<f64>,
    initial_objective: Option<f64>,
    iteration: usize,
}

impl<'a, E: RankedSearch> ParameterSearch<'a, E> {
    pub fn new(
        engine: &'a E,
        groundtruth: &'a Groundtruth,
        index: IndexHandle,
        base_params: EngineParams,
        pool: Vec<PathBuf>,
        initial: PruningStrategy,
        config: SearchConfig,
    ) -> Result<Self> {
        if pool.is_empty() {
            bail!("parameter search needs at least one query file");
        }
        if config.moveset_size == 0 || config.eval_subset_size == 0 {
            bail!("moveset size and evaluation subset size must be positive");
        }
        if config.validation_subset_size < config.eval_subset_size {
            bail!(
                "validation subset size {} is smaller than evaluation subset size {}",
                config.validation_subset_size,
                config.eval_subset_size
            );
        }
        if !initial.is_valid() {
            bail!("initial pruning strategy has an inverted stage");
        }

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let validation_size = config.validation_subset_size.clamp(1, pool.len());
        let validation = pool
            .choose_multiple(&mut rng, validation_size)
            .cloned()
            .collect();

        Ok(Self {
            engine,
            groundtruth,
            index,
            base_params,
            config,
            pool,
            validation,
            rng,
            best: initial,
            best_objective: None,
            initial_objective: None,
            iteration: 0,
        })
    }

    pub fn best(&self) -> PruningStrategy {
        self.best
    }

    pub fn best_objective(&self) -> Option<f64> {
        self.best_objective
    }

    pub fn initial_objective(&self) -> Option<f64> {
        self.initial_objective
    }

    pub fn validation_queries(&self) -> &[PathBuf] {
        &self.validation
    }

    pub fn initialize(&mut self) -> Option<f64> {
        let initial = self.evaluate(&self.best, &self.validation);
        info!(objective = ?initial, "initial strategy evaluated");
        self.best_objective = initial;
        self.initial_objective = initial;
        initial
    }

    pub fn evaluate(&self, strategy: &PruningStrategy, queries: &[PathBuf]) -> Option<f64> {
        let params = self.base_params.with_pruning(*strategy);
        let results = match self.engine.search(queries, &self.index, &params) {
            Ok(results) => results,
            Err(error) => {
                debug!(error = %error, strategy = %strategy.to_arg(), "candidate evaluation failed");
                return None;
            }
        };

        let matches = resolve_all(&results, self.groundtruth, self.config.strip_suffix.as_deref());
        let map = match mean_average_precision(&matches) {
            Ok(map) => map,
            Err(error) => {
                debug!(error = %error, strategy = %strategy.to_arg(), "candidate has no measurable queries");
                return None;
            }
        };
        let Some(prune_ratio) = results.prune.ratio() else {
            debug!(strategy = %strategy.to_arg(), "engine reported no pruning accounting");
            return None;
        };

        let value = objective(map, prune_ratio);
        debug!(map, prune_ratio, objective = value, "candidate evaluated");
        Some(value)
    }

    pub fn step(&mut self) -> SearchIterationRecord {
        let subset_size = self.config.eval_subset_size.min(self.pool.len());
        let subset = self
            .pool
            .choose_multiple(&mut self.rng, subset_size)
            .cloned()
            .collect::<Vec<PathBuf>>();
        let moveset = (0..self.config.moveset_size)
            .map(|_| self.best.perturb(&mut self.rng))
            .collect::<Vec<PruningStrategy>>();

        let objectives = moveset
            .iter()
            .map(|candidate| self.evaluate(candidate, &subset))
            .collect::<Vec<Option<f64>>>();

        let best_neighbour = best_index(&objectives);
        let mut validation_objective = None;
        let mut accepted = false;
        if let Some(index) = best_neighbour {
            validation_objective = self.evaluate(&moveset[index], &self.validation);
            if is_improvement(validation_objective, self.best_objective) {
                self.best = moveset[index];
                self.best_objective = validation_objective;
                accepted = true;
                info!(
                    iteration = self.iteration,
                    objective = ?validation_objective,
                    strategy = %self.best.to_arg(),
                    "new best strategy found"
                );
            }
        }

        let record = SearchIterationRecord {
            iteration: self.iteration,
            eval_queries: subset.len(),
            moveset_objectives: objectives,
            best_neighbour,
            validation_objective,
            accepted,
            best_objective: self.best_objective,
        };
        self.iteration += 1;
        record
    }

    pub fn run(&mut self) -> Vec<SearchIterationRecord> {
        self.initialize();
        let mut records = Vec::with_capacity(self.config.iterations);
        for _ in 0..self.config.iterations {
            let record = self.step();
            debug!(
                iteration = record.iteration,
                accepted = record.accepted,
                best_objective = ?record.best_objective,
                "search iteration finished"
            );
            records.push(record);
        }
        records
    }
}

fn best_index(objectives: &[Option<f64>]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, value) in objectives.iter().enumerate() {
        let Some(value) = value else {
            continue;
        };
        if best.is_none_or(|(_, current)| *value > current) {
            best = Some((index, *value));
        }
    }
    best.map(|(index, _)| index)
}

fn is_improvement(candidate: Option<f64>, incumbent: Option<f64>) -> bool {
    match (candidate, incumbent) {
        (Some(candidate), Some(incumbent)) => candidate > incumbent,
        (Some(_), None) => true,
        (None, _) => false,
    }
}
