use crate::error::PipelineError;
use crate::phase::Phase;
use crate::result::PhaseResult;

use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the output root directory
pub const OUTPUT_PATH_ENV: &str = "LENS_PIPELINE_OUTPUT";

const DEFAULT_OUTPUT_ROOT: &str = "./output";
const RESULT_FILE: &str = "result.json";

/// Where phase results land on disk
///
/// A phase's directory is
/// `root/<folders...>/<pipeline_name>/<pipeline_tag>/<phase_name>/<phase_tag>`,
/// so re-running a pipeline with different settings never overwrites an
/// earlier run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputPaths {
    root: PathBuf,
    folders: Vec<String>,
}

impl OutputPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            folders: Vec::new(),
        }
    }

    /// Root from `LENS_PIPELINE_OUTPUT`, falling back to `./output`
    pub fn from_env() -> Self {
        match std::env::var(OUTPUT_PATH_ENV) {
            Ok(root) if !root.is_empty() => Self::new(root),
            _ => Self::new(DEFAULT_OUTPUT_ROOT),
        }
    }

    /// Append a grouping folder, e.g. the dataset label
    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folders.push(folder.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn phase_directory(
        &self,
        pipeline_name: &str,
        pipeline_tag: &str,
        phase_name: &str,
        phase_tag: &str,
    ) -> PathBuf {
        let mut dir = self.root.clone();
        for folder in &self.folders {
            dir.push(folder);
        }
        dir.push(pipeline_name);
        if !pipeline_tag.is_empty() {
            dir.push(pipeline_tag);
        }
        dir.push(phase_name);
        if !phase_tag.is_empty() {
            dir.push(phase_tag);
        }
        dir
    }

    /// Serialize a phase result into its phase directory, creating the
    /// directory tree as needed; returns the path of the written file
    pub fn write_result(
        &self,
        pipeline_name: &str,
        pipeline_tag: &str,
        phase: &Phase,
        result: &PhaseResult,
    ) -> Result<PathBuf, PipelineError> {
        let dir = self.phase_directory(pipeline_name, pipeline_tag, &phase.name, &phase.tag());
        fs::create_dir_all(&dir)?;
        let path = dir.join(RESULT_FILE);
        let file = fs::File::create(&path)?;
        serde_json::to_writer_pretty(file, result)?;
        tracing::debug!(path = %path.display(), "wrote phase result");
        Ok(path)
    }

    pub fn read_result(path: &Path) -> Result<PhaseResult, PipelineError> {
        let file = fs::File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }
}

pub(crate) fn is_result_file(path: &Path) -> bool {
    path.file_name().is_some_and(|name| name == RESULT_FILE)
}
