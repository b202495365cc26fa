pub mod evaluate;
pub mod fuse;
pub mod identify;
pub mod matrix;
pub mod train;

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::ranking::{FusedCandidate, load_recording_relevance};
use crate::util::read_lines;

fn write_lines<I, S>(lines: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut output = io::BufWriter::new(io::stdout().lock());
    for line in lines {
        writeln!(output, "{}", line.as_ref()).context("failed to write to standard output")?;
    }
    output.flush().context("failed to flush standard output")?;
    Ok(())
}

fn write_fused(fused: &[FusedCandidate], limit: Option<usize>) -> Result<()> {
    let shown = limit.map_or(fused.len(), |limit| limit.min(fused.len()));
    write_lines(fused[..shown].iter().map(FusedCandidate::display_line))
}

fn load_relevance(path: &Path, recording_id: &str) -> Result<Vec<String>> {
    let lines = read_lines(Some(path))
        .with_context(|| format!("failed to load recording groundtruth {}", path.display()))?;
    match load_recording_relevance(lines, recording_id) {
        Some(relevant) => {
            info!(recording = %recording_id, relevant = relevant.len(), "loaded recording relevance");
            Ok(relevant)
        }
        None => {
            warn!(recording = %recording_id, path = %path.display(), "recording not listed in groundtruth");
            Ok(Vec::new())
        }
    }
}
