pub mod fusion;
pub mod groundtruth;
pub mod matches;
pub mod metrics;
pub mod results;

pub use fusion::{FusedCandidate, ScoreMatrix, fuse, fuse_matrix};
pub use groundtruth::{Groundtruth, load_groundtruth, load_recording_relevance};
pub use matches::resolve_all;
pub use metrics::{mean_average_precision, mean_reciprocal_rank};
pub use results::ResultParser;
