use crate::error::PipelineError;
use crate::model::{GalaxiesInstance, ModelMapper};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Flat settings of a nested-sampling style non-linear search
///
/// The names follow the MultiNest surface every workspace pipeline tunes
/// per phase: live-point count, target sampling efficiency, whether the
/// sampler assumes that efficiency is achieved, and the evidence tolerance
/// that stops the run.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SearchSettings {
    pub n_live_points: u32,
    pub sampling_efficiency: f64,
    pub const_efficiency_mode: bool,
    pub evidence_tolerance: f64,
}

impl SearchSettings {
    pub fn new(
        n_live_points: u32,
        sampling_efficiency: f64,
        const_efficiency_mode: bool,
        evidence_tolerance: f64,
    ) -> Self {
        Self {
            n_live_points,
            sampling_efficiency,
            const_efficiency_mode,
            evidence_tolerance,
        }
    }

    #[inline]
    pub fn default_n_live_points() -> u32 {
        50
    }

    #[inline]
    pub fn default_sampling_efficiency() -> f64 {
        0.5
    }

    #[inline]
    pub fn default_const_efficiency_mode() -> bool {
        false
    }

    #[inline]
    pub fn default_evidence_tolerance() -> f64 {
        0.8
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self::new(
            Self::default_n_live_points(),
            Self::default_sampling_efficiency(),
            Self::default_const_efficiency_mode(),
            Self::default_evidence_tolerance(),
        )
    }
}

/// One posterior sample of a completed search
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Sample {
    pub parameters: Vec<f64>,
    pub ln_likelihood: f64,
    pub weight: f64,
}

/// Everything a completed search hands back to the phase
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SearchOutput {
    pub samples: Vec<Sample>,
    pub ln_evidence: Option<f64>,
}

/// The parameter space and objective a search optimizes over
///
/// Borrows the phase's model mapper and its likelihood function; the search
/// may work either in the physical parameter space or in the unit
/// hypercube, whichever its algorithm prefers.
pub struct SearchProblem<'a> {
    mapper: &'a ModelMapper,
    ln_likelihood: &'a (dyn Fn(&GalaxiesInstance) -> Result<f64, PipelineError> + 'a),
}

impl<'a> SearchProblem<'a> {
    pub fn new(
        mapper: &'a ModelMapper,
        ln_likelihood: &'a (dyn Fn(&GalaxiesInstance) -> Result<f64, PipelineError> + 'a),
    ) -> Self {
        Self {
            mapper,
            ln_likelihood,
        }
    }

    pub fn mapper(&self) -> &ModelMapper {
        self.mapper
    }

    pub fn ln_likelihood_of_instance(
        &self,
        instance: &GalaxiesInstance,
    ) -> Result<f64, PipelineError> {
        (self.ln_likelihood)(instance)
    }

    pub fn ln_likelihood_of_vector(&self, vector: &[f64]) -> Result<f64, PipelineError> {
        let instance = self.mapper.instance_from_vector(vector)?;
        (self.ln_likelihood)(&instance)
    }

    pub fn ln_likelihood_of_unit_vector(&self, unit: &[f64]) -> Result<f64, PipelineError> {
        let instance = self.mapper.instance_from_unit_vector(unit)?;
        (self.ln_likelihood)(&instance)
    }

    /// Log posterior: log prior plus log likelihood; never evaluates the
    /// likelihood outside the prior support
    pub fn ln_posterior_of_vector(&self, vector: &[f64]) -> Result<f64, PipelineError> {
        let ln_prior = self.mapper.ln_prior(vector)?;
        if ln_prior.is_infinite() {
            return Ok(f64::NEG_INFINITY);
        }
        Ok(ln_prior + self.ln_likelihood_of_vector(vector)?)
    }
}

impl Debug for SearchProblem<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchProblem")
            .field("prior_count", &self.mapper.prior_count())
            .finish_non_exhaustive()
    }
}

/// An external non-linear optimizer service
///
/// Implementations wrap a sampler (MultiNest and friends); this crate only
/// composes the problem and consumes the returned samples.
pub trait NonLinearSearch {
    fn search(
        &self,
        problem: &SearchProblem<'_>,
        settings: &SearchSettings,
    ) -> Result<SearchOutput, PipelineError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EllipticalIsothermal, Galaxies, Galaxy, MassProfile};
    use approx::assert_relative_eq;

    fn mapper() -> ModelMapper {
        let galaxies = Galaxies::new(
            Galaxy::new(0.5).with_mass(EllipticalIsothermal::default()),
            Galaxy::new(1.0),
        );
        ModelMapper::new(&galaxies)
    }

    #[test]
    fn settings_defaults() {
        let settings = SearchSettings::default();
        assert_eq!(settings.n_live_points, 50);
        assert!(!settings.const_efficiency_mode);
        assert_relative_eq!(settings.evidence_tolerance, 0.8);
    }

    #[test]
    fn settings_serialization_round_trip() {
        let settings = SearchSettings::new(80, 0.2, true, 100.0);
        let serialized = serde_json::to_string(&settings).unwrap();
        let deserialized: SearchSettings = serde_json::from_str(&serialized).unwrap();
        assert_eq!(settings, deserialized);
    }

    #[test]
    fn problem_composes_prior_and_likelihood() {
        let mapper = mapper();
        let ln_likelihood =
            |instance: &GalaxiesInstance| -> Result<f64, PipelineError> {
                let Some(MassProfile::EllipticalIsothermal(mass)) = &instance.lens.mass else {
                    return Err(PipelineError::Tracer("missing mass".into()));
                };
                Ok(-mass.einstein_radius.powi(2))
            };
        let problem = SearchProblem::new(&mapper, &ln_likelihood);

        let vector = mapper.prior_means();
        let ln_like = problem.ln_likelihood_of_vector(&vector).unwrap();
        assert_relative_eq!(ln_like, -4.0); // einstein_radius prior mean is 2.0

        let ln_post = problem.ln_posterior_of_vector(&vector).unwrap();
        assert!(ln_post.is_finite());
        assert_relative_eq!(ln_post - ln_like, mapper.ln_prior(&vector).unwrap());
    }

    #[test]
    fn posterior_short_circuits_outside_support() {
        let mapper = mapper();
        let ln_likelihood = |_: &GalaxiesInstance| -> Result<f64, PipelineError> {
            panic!("likelihood must not be called outside the prior support")
        };
        let problem = SearchProblem::new(&mapper, &ln_likelihood);
        let mut vector = mapper.prior_means();
        vector[0] = -100.0;
        assert!(problem.ln_posterior_of_vector(&vector).unwrap().is_infinite());
    }
}
