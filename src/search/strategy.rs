use anyhow::{Context, Result, bail};
use rand::Rng;
use tracing::debug;

pub const STAGES: usize = 4;
pub const STAGE_WIDTH: usize = 3;
pub const POSITIONS: usize = STAGES * STAGE_WIDTH;

const WEIGHT: usize = 0;
const LOW: usize = 1;
const HIGH: usize = 2;

const POSITION_MIN: [f64; POSITIONS] = [0.0; POSITIONS];
const POSITION_MAX: [f64; POSITIONS] = [1.0; POSITIONS];
const NOISE_MAGNITUDE: [f64; POSITIONS] = [0.2; POSITIONS];
const SPILL_PROBABILITY: f64 = 0.25;

const DEFAULT_STAGE: [f64; STAGE_WIDTH] = [0.34, 0.0, 1.0];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stage {
    pub weight: f64,
    pub low: f64,
    pub high: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PruningStrategy {
    values: [f64; POSITIONS],
}

impl Default for PruningStrategy {
    fn default() -> Self {
        let mut values = [0.0; POSITIONS];
        for stage in values.chunks_exact_mut(STAGE_WIDTH) {
            stage.copy_from_slice(&DEFAULT_STAGE);
        }
        Self { values }
    }
}

impl PruningStrategy {
    pub fn from_values(values: &[f64]) -> Result<Self> {
        let values: [f64; POSITIONS] = values.try_into().with_context(|| {
            format!(
                "pruning strategy needs {POSITIONS} values, got {}",
                values.len()
            )
        })?;

        for (position, value) in values.iter().enumerate() {
            if !value.is_finite()
                || *value < POSITION_MIN[position]
                || *value > POSITION_MAX[position]
            {
                bail!(
                    "pruning strategy value {value} at position {position} is outside [{}, {}]",
                    POSITION_MIN[position],
                    POSITION_MAX[position]
                );
            }
        }

        let strategy = Self { values };
        if let Some(stage) = (0..STAGES).find(|stage| !strategy.stage_is_ordered(*stage)) {
            bail!("pruning strategy stage {stage} has low bound >= high bound");
        }
        Ok(strategy)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let values = raw
            .split(',')
            .map(|field| {
                field
                    .trim()
                    .parse::<f64>()
                    .with_context(|| format!("invalid pruning strategy value: {field:?}"))
            })
            .collect::<Result<Vec<f64>>>()?;
        Self::from_values(&values)
    }

    pub fn values(&self) -> &[f64; POSITIONS] {
        &self.values
    }

    pub fn stage(&self, stage: usize) -> Stage {
        let base = stage * STAGE_WIDTH;
        Stage {
            weight: self.values[base + WEIGHT],
            low: self.values[base + LOW],
            high: self.values[base + HIGH],
        }
    }

    pub fn is_valid(&self) -> bool {
        (0..STAGES).all(|stage| self.stage_is_ordered(stage))
    }

    pub fn to_arg(&self) -> String {
        self.values
            .iter()
            .map(f64::to_string)
            .collect::<Vec<String>>()
            .join(",")
    }

    /// A neighbouring strategy: noise on one randomly chosen stage, sometimes
    /// spilling into the following stages. Stages whose interval would invert
    /// get their bounds back; the result always differs from `self`.
    pub fn perturb<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        loop {
            let mut candidate = *self;

            let first = rng.gen_range(0..STAGES);
            let mut last = first;
            while last + 1 < STAGES && rng.gen_bool(SPILL_PROBABILITY) {
                last += 1;
            }

            for position in first * STAGE_WIDTH..(last + 1) * STAGE_WIDTH {
                let magnitude = NOISE_MAGNITUDE[position];
                let moved = candidate.values[position] + rng.gen_range(-magnitude..=magnitude);
                candidate.values[position] = clamp_position(position, moved);
            }

            for stage in first..=last {
                if !candidate.stage_is_ordered(stage) {
                    debug!(stage, "perturbed interval inverted; restoring its bounds");
                    let base = stage * STAGE_WIDTH;
                    candidate.values[base + LOW] = self.values[base + LOW];
                    candidate.values[base + HIGH] = self.values[base + HIGH];
                }
            }

            if candidate != *self {
                return candidate;
            }
        }
    }

    fn stage_is_ordered(&self, stage: usize) -> bool {
        let base = stage * STAGE_WIDTH;
        self.values[base + LOW] < self.values[base + HIGH]
    }
}

fn clamp_position(position: usize, value: f64) -> f64 {
    match position % STAGE_WIDTH {
        LOW => value.max(POSITION_MIN[position]),
        HIGH => value.min(POSITION_MAX[position]),
        _ => value.clamp(POSITION_MIN[position], POSITION_MAX[position]),
    }
}
