pub const PRUNE_WEIGHT: f64 = 0.2;
pub const QUALITY_STEEPNESS: f64 = 20.0;
pub const PRUNE_STEEPNESS: f64 = 10.0;
pub const MAP_MIN: f64 = 0.6;
pub const PRUNE_MIN: f64 = 0.5;

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

pub fn objective(mean_average_precision: f64, prune_ratio: f64) -> f64 {
    (1.0 - PRUNE_WEIGHT) * sigmoid(QUALITY_STEEPNESS * (mean_average_precision - MAP_MIN))
        + PRUNE_WEIGHT * sigmoid(PRUNE_STEEPNESS * (prune_ratio - PRUNE_MIN))
}
