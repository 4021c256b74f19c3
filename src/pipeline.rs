use crate::error::PipelineError;
use crate::output::OutputPaths;
use crate::phase::Phase;
use crate::result::PhaseResult;
use crate::search::NonLinearSearch;
use crate::tracer::{ImagingData, TracerService};

use std::ops::Add;

/// The completed results of every phase run so far, in execution order
///
/// A stage builder receives this collection as an immutable snapshot, so a
/// phase's priors can only ever derive from phases that finished before it.
#[derive(Clone, Debug, Default)]
pub struct ResultsCollection {
    results: Vec<PhaseResult>,
}

impl ResultsCollection {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn last(&self) -> Option<&PhaseResult> {
        self.results.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhaseResult> {
        self.results.iter()
    }

    pub fn from_phase(&self, name: &str) -> Result<&PhaseResult, PipelineError> {
        self.results
            .iter()
            .find(|result| result.phase_name() == name)
            .ok_or_else(|| PipelineError::UnknownPhase {
                name: name.to_string(),
            })
    }

    pub(crate) fn push(&mut self, result: PhaseResult) {
        self.results.push(result);
    }
}

type StageBuilder = Box<dyn Fn(&ResultsCollection) -> Result<Phase, PipelineError>>;

/// A deferred phase constructor
///
/// Construction is deferred because a phase's model depends on the results
/// of the phases before it; the builder runs right before the phase does.
pub struct Stage {
    builder: StageBuilder,
}

impl Stage {
    pub fn new(
        builder: impl Fn(&ResultsCollection) -> Result<Phase, PipelineError> + 'static,
    ) -> Self {
        Self {
            builder: Box::new(builder),
        }
    }

    pub fn build(&self, results: &ResultsCollection) -> Result<Phase, PipelineError> {
        (self.builder)(results)
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage").finish_non_exhaustive()
    }
}

/// An ordered chain of phases with inter-phase prior dependencies
pub struct Pipeline {
    name: String,
    tag: String,
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
            stages: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn add_stage(
        mut self,
        builder: impl Fn(&ResultsCollection) -> Result<Phase, PipelineError> + 'static,
    ) -> Self {
        self.stages.push(Stage::new(builder));
        self
    }

    /// Run every phase in order, persisting each result before the next
    /// stage is built
    pub fn run(
        &self,
        data: &ImagingData,
        tracer: &dyn TracerService,
        search: &dyn NonLinearSearch,
        paths: &OutputPaths,
    ) -> Result<ResultsCollection, PipelineError> {
        let span = tracing::info_span!("pipeline", name = %self.name, tag = %self.tag);
        let _enter = span.enter();

        let mut results = ResultsCollection::default();
        for (index, stage) in self.stages.iter().enumerate() {
            let phase = stage.build(&results)?;
            if results.from_phase(&phase.name).is_ok() {
                return Err(PipelineError::DuplicatePhaseName { name: phase.name });
            }
            tracing::info!(stage = index, phase = %phase.name, "running phase");
            let result = phase.run(data, tracer, search)?;
            paths.write_result(&self.name, &self.tag, &phase, &result)?;
            results.push(result);
        }
        tracing::info!(phases = results.len(), "pipeline complete");
        Ok(results)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("stages", &self.stages.len())
            .finish()
    }
}

/// Concatenate two pipelines, the runner-script `pipeline_a + pipeline_b`
/// composition; the combined pipeline keeps the left pipeline's tag
impl Add for Pipeline {
    type Output = Pipeline;

    fn add(mut self, mut rhs: Pipeline) -> Pipeline {
        Pipeline {
            name: format!("{} + {}", self.name, rhs.name),
            tag: std::mem::take(&mut self.tag),
            stages: {
                self.stages.append(&mut rhs.stages);
                self.stages
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Galaxies, Galaxy};

    fn empty_phase(name: &str) -> Phase {
        Phase::new(name, Galaxies::new(Galaxy::new(0.5), Galaxy::new(1.0)))
    }

    #[test]
    fn from_phase_respects_completion_order() {
        let mut results = ResultsCollection::default();
        assert!(results.from_phase("phase_1").is_err());
        assert!(results.last().is_none());

        let output = crate::search::SearchOutput {
            samples: vec![crate::search::Sample {
                parameters: vec![],
                ln_likelihood: 0.0,
                weight: 1.0,
            }],
            ln_evidence: None,
        };
        let result = PhaseResult::new(
            "phase_1".into(),
            Galaxies::new(Galaxy::new(0.5), Galaxy::new(1.0)),
            output,
        )
        .unwrap();
        results.push(result);

        assert_eq!(results.from_phase("phase_1").unwrap().phase_name(), "phase_1");
        assert!(results.from_phase("phase_2").is_err());
    }

    #[test]
    fn stages_build_from_prior_results_only() {
        let stage = Stage::new(|results| {
            assert!(results.is_empty());
            Ok(empty_phase("phase_1"))
        });
        let phase = stage.build(&ResultsCollection::default()).unwrap();
        assert_eq!(phase.name, "phase_1");
    }

    #[test]
    fn pipelines_concatenate() {
        let first = Pipeline::new("pipeline_initialize", "tag_a")
            .add_stage(|_| Ok(empty_phase("phase_1")));
        let second = Pipeline::new("pipeline_inversion", "tag_b")
            .add_stage(|_| Ok(empty_phase("phase_2")))
            .add_stage(|_| Ok(empty_phase("phase_3")));
        let combined = first + second;
        assert_eq!(combined.name(), "pipeline_initialize + pipeline_inversion");
        assert_eq!(combined.tag(), "tag_a");
        assert_eq!(combined.len(), 3);
    }
}
