use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use anyhow::Result;
use tracing::debug;

use super::{EngineParams, IndexHandle, Indexer, RankedSearch};
use crate::error::EngineError;
use crate::model::RankedResults;
use crate::ranking::ResultParser;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub program: String,
    pub args: Vec<String>,
}

pub struct ProcessEngine {
    config: EngineConfig,
    parser: ResultParser,
}

impl ProcessEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        Ok(Self {
            config,
            parser: ResultParser::new()?,
        })
    }

    fn command(&self, params: &EngineParams) -> Command {
        let mut command = Command::new(&self.config.program);
        command.args(&self.config.args).args(params.to_args());
        command
    }

    fn run(&self, mut command: Command) -> Result<Output, EngineError> {
        let output = command.output().map_err(|source| EngineError::Spawn {
            program: self.config.program.clone(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::ExitStatus {
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(output)
    }
}

impl RankedSearch for ProcessEngine {
    fn search(
        &self,
        queries: &[PathBuf],
        index: &IndexHandle,
        params: &EngineParams,
    ) -> Result<RankedResults, EngineError> {
        // The query list must outlive the child process; the directory is
        // removed when `workdir` drops after `run` returns.
        let workdir = tempfile::Builder::new()
            .prefix("coverrank_queries_")
            .tempdir()
            .map_err(|source| EngineError::Io {
                path: std::env::temp_dir(),
                source,
            })?;
        let list_path = workdir.path().join("querylist.txt");
        let listing = queries
            .iter()
            .map(|path| format!("{}\n", path.display()))
            .collect::<String>();
        fs::write(&list_path, listing).map_err(|source| EngineError::Io {
            path: list_path.clone(),
            source,
        })?;
        let list_file = File::open(&list_path).map_err(|source| EngineError::Io {
            path: list_path.clone(),
            source,
        })?;

        let mut command = self.command(params);
        command
            .arg("-b")
            .arg(index.path())
            .stdin(Stdio::from(list_file));

        debug!(
            program = %self.config.program,
            queries = queries.len(),
            index = %index.path().display(),
            "invoking search engine"
        );
        let output = self.run(command)?;
        drop(workdir);

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut results = self.parser.parse(stdout.lines());
        let diagnostics = self.parser.parse(stderr.lines());
        results.prune.absorb(&diagnostics.prune);

        if results.is_empty() {
            return Err(EngineError::NoQueryGroups);
        }

        debug!(
            groups = results.len(),
            skipped_lines = results.skipped_lines,
            pruned = results.prune.pruned,
            total = results.prune.total,
            "search engine output parsed"
        );
        Ok(results)
    }
}

impl Indexer for ProcessEngine {
    fn index(
        &self,
        source: &Path,
        destination: &Path,
        params: &EngineParams,
    ) -> Result<IndexHandle, EngineError> {
        let mut command = self.command(params);
        command.arg("-i").arg(source).arg(destination);

        debug!(
            program = %self.config.program,
            source = %source.display(),
            destination = %destination.display(),
            "building index"
        );
        self.run(command)?;
        Ok(IndexHandle::new(destination))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::{EngineConfig, ProcessEngine};
    use crate::engine::{EngineParams, IndexHandle, RankedSearch};
    use crate::error::EngineError;

    fn params() -> EngineParams {
        EngineParams {
            segment_length: 300,
            segment_overlap: 150,
            subsampling: 2,
            transpositions: None,
            pruning: None,
        }
    }

    fn shell_engine(script: &str) -> ProcessEngine {
        ProcessEngine::new(EngineConfig {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string(), "engine".to_string()],
        })
        .expect("engine should build")
    }

    #[test]
    fn search_feeds_query_list_on_stdin_and_parses_stdout() {
        let engine = shell_engine(
            r#"while read q; do echo "query: $q"; echo "rank 1: 0.5 - hit"; done; echo "pruned 3 4" >&2"#,
        );
        let queries = vec![PathBuf::from("a_chunk1"), PathBuf::from("a_chunk2")];

        let results = engine
            .search(&queries, &IndexHandle::new("idx"), &params())
            .expect("shell engine should succeed");
        assert_eq!(results.len(), 2);
        assert_eq!(results.get("a_chunk2").expect("second query")[0].id, "hit");
        assert_eq!(results.prune.ratio(), Some(0.75));
    }

    #[test]
    fn non_zero_exit_is_reported_with_stderr() {
        let engine = shell_engine("echo broken index >&2; exit 3");
        let error = engine
            .search(&[PathBuf::from("q")], &IndexHandle::new("idx"), &params())
            .expect_err("exit status 3 should fail");
        match error {
            EngineError::ExitStatus { stderr, .. } => assert_eq!(stderr, "broken index"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn output_without_query_groups_is_an_error() {
        let engine = shell_engine("cat > /dev/null; echo nothing to see");
        let error = engine
            .search(&[PathBuf::from("q")], &IndexHandle::new("idx"), &params())
            .expect_err("no groups should fail");
        assert!(matches!(error, EngineError::NoQueryGroups));
    }

    #[test]
    fn indexer_passes_source_and_destination() {
        let dir = tempfile::tempdir().expect("tempdir");
        let marker = dir.path().join("args.txt");
        let engine = shell_engine(&format!(r#"echo "$@" > {}"#, marker.display()));

        let handle = crate::engine::Indexer::index(
            &engine,
            &dir.path().join("collection"),
            &dir.path().join("index"),
            &params(),
        )
        .expect("indexing should succeed");
        assert_eq!(handle.path(), dir.path().join("index"));

        let recorded = fs::read_to_string(&marker).expect("script should record its args");
        assert!(recorded.starts_with("-l 300 -o 150 -s 2 -i "));
        assert!(recorded.trim_end().ends_with("/index"));
    }
}
