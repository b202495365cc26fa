use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::engine::{EngineConfig, EngineParams};

#[derive(Parser, Debug)]
#[command(
    name = "coverrank",
    version,
    about = "Cover-song retrieval evaluation, chunk rank fusion and pruning-strategy search"
)]
pub struct Cli {
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Evaluate(EvaluateArgs),
    Fuse(FuseArgs),
    Matrix(MatrixArgs),
    Identify(IdentifyArgs),
    Train(TrainArgs),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ReportMode {
    Full,
    Mrr,
    Map,
}

#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    #[arg(long)]
    pub groundtruth: PathBuf,

    #[arg(long)]
    pub results: Option<PathBuf>,

    #[arg(long, default_value = ".mp3.chroma")]
    pub strip_suffix: String,

    #[arg(long, value_enum, default_value_t = ReportMode::Full)]
    pub report: ReportMode,

    #[arg(long)]
    pub json: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct FuseArgs {
    #[arg(long)]
    pub results: Option<PathBuf>,

    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct LpRelevanceArgs {
    #[arg(long, requires = "lp_id")]
    pub lp_groundtruth: Option<PathBuf>,

    #[arg(long, requires = "lp_groundtruth")]
    pub lp_id: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct MatrixArgs {
    #[arg(long)]
    pub results: Option<PathBuf>,

    #[command(flatten)]
    pub relevance: LpRelevanceArgs,
}

#[derive(Args, Debug, Clone)]
pub struct EngineArgs {
    #[arg(long, default_value = "falconeval")]
    pub engine_program: String,

    #[arg(long = "engine-arg", allow_hyphen_values = true)]
    pub engine_args: Vec<String>,

    #[arg(long, default_value_t = 300)]
    pub segment_length: u32,

    #[arg(long, default_value_t = 150)]
    pub segment_overlap: u32,

    #[arg(long, default_value_t = 2)]
    pub subsampling: u32,

    #[arg(long)]
    pub transpositions: Option<u32>,
}

impl EngineArgs {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            program: self.engine_program.clone(),
            args: self.engine_args.clone(),
        }
    }

    pub fn params(&self) -> EngineParams {
        EngineParams {
            segment_length: self.segment_length,
            segment_overlap: self.segment_overlap,
            subsampling: self.subsampling,
            transpositions: self.transpositions,
            pruning: None,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct IdentifyArgs {
    #[arg(long)]
    pub chunks_dir: PathBuf,

    #[arg(long)]
    pub index: PathBuf,

    #[arg(long)]
    pub collection: Option<PathBuf>,

    #[arg(long)]
    pub strategy: Option<String>,

    #[arg(long)]
    pub limit: Option<usize>,

    #[command(flatten)]
    pub relevance: LpRelevanceArgs,

    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    #[arg(long)]
    pub groundtruth: PathBuf,

    #[arg(long)]
    pub queries_dir: PathBuf,

    #[arg(long)]
    pub index: PathBuf,

    #[arg(long, default_value = ".mp3.chroma")]
    pub strip_suffix: String,

    #[arg(long, default_value_t = 100)]
    pub iterations: usize,

    #[arg(long, default_value_t = 8)]
    pub moveset_size: usize,

    #[arg(long, default_value_t = 50)]
    pub eval_subset_size: usize,

    #[arg(long, default_value_t = 100)]
    pub validation_subset_size: usize,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long)]
    pub initial_strategy: Option<String>,

    #[arg(long, default_value = "train_report.json")]
    pub report_path: PathBuf,

    #[command(flatten)]
    pub engine: EngineArgs,
}
