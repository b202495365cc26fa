use anyhow::{Context, Result, bail};
use tracing::info;

use super::write_fused;
use crate::cli::FuseArgs;
use crate::ranking::{ResultParser, fuse};
use crate::util::read_lines;

pub fn run(args: FuseArgs) -> Result<()> {
    let lines = read_lines(args.results.as_deref()).context("failed to read chunk rankings")?;
    let results = ResultParser::new()?.parse(lines);
    if results.is_empty() {
        bail!("no query groups found in chunk rankings");
    }

    let fused = fuse(&results);
    info!(
        chunks = results.len(),
        candidates = fused.len(),
        skipped_lines = results.skipped_lines,
        "chunk rankings fused"
    );
    write_fused(&fused, args.limit)
}
