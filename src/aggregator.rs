use crate::error::PipelineError;
use crate::model::GalaxiesInstance;
use crate::output;
use crate::result::PhaseResult;
use crate::stats::weighted_mean_and_standard_deviation;

use ndarray::Array1;
use std::fs;
use std::path::{Path, PathBuf};

/// A phase result loaded back from disk, together with where it was found
#[derive(Debug)]
pub struct AggregatorEntry {
    directory: PathBuf,
    result: PhaseResult,
}

impl AggregatorEntry {
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn result(&self) -> &PhaseResult {
        &self.result
    }
}

/// Loads every persisted phase result under an output root, for
/// post-hoc analysis across datasets and pipelines
#[derive(Debug, Default)]
pub struct Aggregator {
    entries: Vec<AggregatorEntry>,
}

impl Aggregator {
    /// Recursively scan `root` for result files; entries are ordered by
    /// path so repeated scans agree
    pub fn from_directory(root: &Path) -> Result<Self, PipelineError> {
        let mut entries = Vec::new();
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            let mut children: Vec<PathBuf> = fs::read_dir(&dir)?
                .map(|entry| entry.map(|e| e.path()))
                .collect::<Result<_, _>>()?;
            children.sort();
            for path in children {
                if path.is_dir() {
                    pending.push(path);
                } else if output::is_result_file(&path) {
                    let result = output::OutputPaths::read_result(&path)?;
                    let directory = path
                        .parent()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| dir.clone());
                    entries.push(AggregatorEntry { directory, result });
                }
            }
        }
        entries.sort_by(|a, b| a.directory.cmp(&b.directory));
        tracing::info!(root = %root.display(), results = entries.len(), "aggregated output");
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[AggregatorEntry] {
        &self.entries
    }

    pub fn results(&self) -> impl Iterator<Item = &PhaseResult> {
        self.entries.iter().map(AggregatorEntry::result)
    }

    /// Keep only the results of phases with the given name
    pub fn filter_phase(&self, name: &str) -> Vec<&PhaseResult> {
        self.results()
            .filter(|result| result.phase_name() == name)
            .collect()
    }

    /// For each result of the named phase, the weighted posterior mean and
    /// standard deviation of a derived quantity of the model
    pub fn marginals(
        &self,
        phase_name: &str,
        quantity: impl Fn(&GalaxiesInstance) -> f64,
    ) -> Result<Vec<(f64, f64)>, PipelineError> {
        self.filter_phase(phase_name)
            .into_iter()
            .map(|result| marginal(result, &quantity))
            .collect()
    }
}

/// Weighted posterior mean and standard deviation of `quantity` over one
/// result's samples
pub fn marginal(
    result: &PhaseResult,
    quantity: impl Fn(&GalaxiesInstance) -> f64,
) -> Result<(f64, f64), PipelineError> {
    let mut values = Vec::with_capacity(result.total_samples());
    let mut weights = Vec::with_capacity(result.total_samples());
    for (instance, weight) in result.sample_instances() {
        values.push(quantity(&instance));
        weights.push(weight);
    }
    weighted_mean_and_standard_deviation(&Array1::from(values), &Array1::from(weights))
        .ok_or(PipelineError::NonPositiveWeightSum)
}
