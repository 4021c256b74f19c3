use crate::error::PipelineError;
use crate::model::{ComponentId, GalaxiesInstance, GalaxiesModel, ModelMapper, ParamPath};
use crate::prior::{Parameter, Prior, PriorTrait};
use crate::search::{Sample, SearchOutput};
use crate::stats::{weighted_mean, weighted_quantile};

use ndarray::Array1;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How a completed phase's posterior is transcribed into the priors of a
/// later phase
///
/// Each free parameter becomes a Gaussian centred on its most probable
/// value. The scatter is taken from the posterior errors at the `sigma`
/// confidence limit, from the originating prior's width, or the larger of
/// the two when both sources are enabled.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct PriorPasser {
    pub sigma: f64,
    pub use_errors: bool,
    pub use_widths: bool,
}

impl Default for PriorPasser {
    fn default() -> Self {
        Self {
            sigma: 3.0,
            use_errors: true,
            use_widths: true,
        }
    }
}

impl PriorPasser {
    pub fn at_sigma(sigma: f64) -> Self {
        Self {
            sigma,
            ..Self::default()
        }
    }

    fn scatter(&self, error: f64, width: f64) -> f64 {
        let sigma = match (self.use_errors, self.use_widths) {
            (true, true) => f64::max(error, width),
            (true, false) => error,
            _ => width,
        };
        // Degenerate posteriors (a single sample) give zero error; fall back
        // to the prior width, which is positive by construction.
        if sigma > 0.0 { sigma } else { width }
    }
}

/// The completed fit of one phase
///
/// Owns the phase's model snapshot together with the search's weighted
/// posterior samples, and derives every quantity later phases and the
/// aggregator consume: the most probable and maximum-likelihood instances,
/// error instances at a sigma limit, and the prior-passed forms of the
/// model.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct PhaseResult {
    phase_name: String,
    model: GalaxiesModel,
    samples: Vec<Sample>,
    ln_evidence: Option<f64>,
    most_probable: Vec<f64>,
    most_likely: Vec<f64>,
}

impl PhaseResult {
    pub fn new(
        phase_name: String,
        model: GalaxiesModel,
        output: SearchOutput,
    ) -> Result<Self, PipelineError> {
        let SearchOutput {
            samples,
            ln_evidence,
        } = output;
        if samples.is_empty() {
            return Err(PipelineError::EmptySamples);
        }
        let nparams = ModelMapper::new(&model).prior_count();
        for sample in &samples {
            if sample.parameters.len() != nparams {
                return Err(PipelineError::WrongParameterCount {
                    expected: nparams,
                    actual: sample.parameters.len(),
                });
            }
        }
        let weights: Array1<f64> = samples.iter().map(|s| s.weight).collect();
        if weights.sum() <= 0.0 {
            return Err(PipelineError::NonPositiveWeightSum);
        }

        let most_probable = (0..nparams)
            .map(|j| {
                let values: Array1<f64> = samples.iter().map(|s| s.parameters[j]).collect();
                weighted_mean(&values, &weights).ok_or(PipelineError::NonPositiveWeightSum)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let most_likely = samples
            .iter()
            .max_by(|a, b| {
                a.ln_likelihood
                    .partial_cmp(&b.ln_likelihood)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|s| s.parameters.clone())
            .ok_or(PipelineError::EmptySamples)?;

        Ok(Self {
            phase_name,
            model,
            samples,
            ln_evidence,
            most_probable,
            most_likely,
        })
    }

    pub fn phase_name(&self) -> &str {
        &self.phase_name
    }

    /// The model as it was fitted, priors and constants untouched
    pub fn model(&self) -> &GalaxiesModel {
        &self.model
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn total_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn ln_evidence(&self) -> Option<f64> {
        self.ln_evidence
    }

    pub fn ln_max_likelihood(&self) -> f64 {
        self.samples
            .iter()
            .map(|s| s.ln_likelihood)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn most_probable_vector(&self) -> &[f64] {
        &self.most_probable
    }

    pub fn most_likely_vector(&self) -> &[f64] {
        &self.most_likely
    }

    fn mapper(&self) -> ModelMapper {
        ModelMapper::new(&self.model)
    }

    fn instance_of(&self, vector: &[f64]) -> GalaxiesInstance {
        self.mapper()
            .instance_from_vector(vector)
            .expect("vector length is validated at construction")
    }

    /// Typed instance of the most probable (weighted posterior mean) model
    pub fn instance(&self) -> GalaxiesInstance {
        self.instance_of(&self.most_probable)
    }

    /// Typed instance of the maximum-likelihood sample
    pub fn most_likely_instance(&self) -> GalaxiesInstance {
        self.instance_of(&self.most_likely)
    }

    fn vector_at_quantile(&self, q: f64) -> Result<Vec<f64>, PipelineError> {
        let weights: Array1<f64> = self.samples.iter().map(|s| s.weight).collect();
        (0..self.most_probable.len())
            .map(|j| {
                let values: Array1<f64> =
                    self.samples.iter().map(|s| s.parameters[j]).collect();
                weighted_quantile(&values, &weights, q)
                    .ok_or(PipelineError::NonPositiveWeightSum)
            })
            .collect()
    }

    /// Per-parameter lower and upper bounds of the marginal posterior at a
    /// symmetric sigma confidence limit
    pub fn vector_at_sigma(&self, sigma: f64) -> Result<(Vec<f64>, Vec<f64>), PipelineError> {
        let (lo, hi) = crate::math::sigma_to_quantiles(sigma);
        Ok((self.vector_at_quantile(lo)?, self.vector_at_quantile(hi)?))
    }

    pub fn instance_at_lower_sigma(&self, sigma: f64) -> Result<GalaxiesInstance, PipelineError> {
        Ok(self.instance_of(&self.vector_at_sigma(sigma)?.0))
    }

    pub fn instance_at_upper_sigma(&self, sigma: f64) -> Result<GalaxiesInstance, PipelineError> {
        Ok(self.instance_of(&self.vector_at_sigma(sigma)?.1))
    }

    /// Per-parameter (lower, upper) error magnitudes relative to the most
    /// probable value
    pub fn errors_at_sigma(&self, sigma: f64) -> Result<Vec<(f64, f64)>, PipelineError> {
        let (lower, upper) = self.vector_at_sigma(sigma)?;
        Ok(self
            .most_probable
            .iter()
            .zip(lower.iter().zip(&upper))
            .map(|(&mp, (&lo, &hi))| (mp - lo, hi - mp))
            .collect())
    }

    /// Posterior samples as typed instances with their weights
    pub fn sample_instances(&self) -> impl Iterator<Item = (GalaxiesInstance, f64)> + '_ {
        self.samples
            .iter()
            .map(|s| (self.instance_of(&s.parameters), s.weight))
    }

    fn rewritten_model(
        &self,
        f: &mut impl FnMut(usize, &Prior) -> Parameter,
    ) -> GalaxiesModel {
        let mapper = self.mapper();
        let index_of: HashMap<ParamPath, usize> = mapper
            .paths()
            .iter()
            .enumerate()
            .map(|(i, &path)| (path, i))
            .collect();
        self.model.map_parameters(&mut |galaxy, component, parameter, p| match p {
            Parameter::Constant(value) => Parameter::Constant(*value),
            Parameter::Prior(prior) => {
                let path = ParamPath {
                    galaxy,
                    component,
                    parameter,
                };
                let index = index_of.get(&path).or_else(|| {
                    // A disk centre aligned to the bulge has no entry of its
                    // own; rewrite it like the bulge centre so the alignment
                    // survives the pass.
                    index_of.get(&ParamPath {
                        galaxy,
                        component: ComponentId::Bulge,
                        parameter,
                    })
                });
                match index {
                    Some(&i) => f(i, prior),
                    None => Parameter::Prior(prior.clone()),
                }
            }
        })
    }

    /// The model with every fitted parameter fixed to its most probable
    /// value: "instance -> next phase" passing
    pub fn instance_model(&self) -> GalaxiesModel {
        self.rewritten_model(&mut |i, _| Parameter::constant(self.most_probable[i]))
    }

    /// The model with every free parameter re-centred as a Gaussian prior:
    /// "model -> next phase" passing
    pub fn posterior_model(&self, passer: &PriorPasser) -> Result<GalaxiesModel, PipelineError> {
        let (lower, upper) = self.vector_at_sigma(passer.sigma)?;
        Ok(self.rewritten_model(&mut |i, prior| {
            let mean = self.most_probable[i];
            let error = f64::max(upper[i] - mean, mean - lower[i]);
            Parameter::gaussian(mean, passer.scatter(error, prior.width()))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        EllipticalIsothermal, EllipticalSersic, Galaxies, Galaxy, MassProfile,
    };
    use crate::search::SearchOutput;
    use approx::assert_relative_eq;

    fn model() -> GalaxiesModel {
        let mut lens = Galaxy::new(0.5).with_mass(EllipticalIsothermal::default());
        if let Some(MassProfile::EllipticalIsothermal(mass)) = &mut lens.mass {
            mass.centre_0 = Parameter::constant(0.0);
            mass.centre_1 = Parameter::constant(0.0);
            mass.axis_ratio = Parameter::constant(0.8);
            mass.phi = Parameter::constant(45.0);
        }
        // Only einstein_radius free on the lens, nothing on the source
        Galaxies::new(lens, Galaxy::new(1.0))
    }

    fn output_with(values: &[(f64, f64, f64)]) -> SearchOutput {
        SearchOutput {
            samples: values
                .iter()
                .map(|&(v, lnl, w)| Sample {
                    parameters: vec![v],
                    ln_likelihood: lnl,
                    weight: w,
                })
                .collect(),
            ln_evidence: Some(-10.0),
        }
    }

    fn result() -> PhaseResult {
        let output = output_with(&[
            (1.4, -2.0, 1.0),
            (1.6, -1.0, 1.0),
            (1.8, -3.0, 1.0),
        ]);
        PhaseResult::new("phase_1".into(), model(), output).unwrap()
    }

    #[test]
    fn empty_samples_are_rejected() {
        let output = SearchOutput {
            samples: vec![],
            ln_evidence: None,
        };
        assert!(matches!(
            PhaseResult::new("p".into(), model(), output),
            Err(PipelineError::EmptySamples)
        ));
    }

    #[test]
    fn wrong_sample_width_is_rejected() {
        let output = SearchOutput {
            samples: vec![Sample {
                parameters: vec![1.0, 2.0],
                ln_likelihood: 0.0,
                weight: 1.0,
            }],
            ln_evidence: None,
        };
        assert!(matches!(
            PhaseResult::new("p".into(), model(), output),
            Err(PipelineError::WrongParameterCount { expected: 1, actual: 2 })
        ));
    }

    #[test]
    fn zero_weights_are_rejected() {
        let output = output_with(&[(1.0, 0.0, 0.0), (2.0, 0.0, 0.0)]);
        assert!(matches!(
            PhaseResult::new("p".into(), model(), output),
            Err(PipelineError::NonPositiveWeightSum)
        ));
    }

    #[test]
    fn most_probable_is_the_weighted_mean() {
        let result = result();
        assert_relative_eq!(result.most_probable_vector()[0], 1.6, epsilon = 1e-12);
        assert_relative_eq!(result.most_likely_vector()[0], 1.6);
        assert_relative_eq!(result.ln_max_likelihood(), -1.0);
    }

    #[test]
    fn instances_are_typed() {
        let result = result();
        let Some(MassProfile::EllipticalIsothermal(mass)) = result.instance().lens.mass else {
            panic!("mass profile kind changed");
        };
        assert_relative_eq!(mass.einstein_radius, 1.6, epsilon = 1e-12);
        assert_relative_eq!(mass.axis_ratio, 0.8);
    }

    #[test]
    fn sigma_instances_bracket_the_most_probable() {
        let result = result();
        let lower = result.instance_at_lower_sigma(1.0).unwrap();
        let upper = result.instance_at_upper_sigma(1.0).unwrap();
        let radius = |g: GalaxiesInstance| match g.lens.mass {
            Some(MassProfile::EllipticalIsothermal(m)) => m.einstein_radius,
            _ => panic!("mass profile kind changed"),
        };
        assert!(radius(lower) <= 1.6);
        assert!(radius(upper) >= 1.6);
    }

    #[test]
    fn errors_at_sigma_are_non_negative() {
        let result = result();
        for (lo, hi) in result.errors_at_sigma(3.0).unwrap() {
            assert!(lo >= 0.0);
            assert!(hi >= 0.0);
        }
    }

    #[test]
    fn instance_model_fixes_fitted_parameters() {
        let result = result();
        let passed = result.instance_model();
        let Some(MassProfile::EllipticalIsothermal(mass)) = &passed.lens.mass else {
            panic!("mass profile kind changed");
        };
        assert_eq!(
            mass.einstein_radius.constant_value(),
            Some(result.most_probable_vector()[0])
        );
        // A parameter fixed before the fit stays fixed at its own value
        assert_eq!(mass.axis_ratio.constant_value(), Some(0.8));
        assert_eq!(passed.free_parameter_count(), 0);
    }

    #[test]
    fn posterior_model_recentres_priors() {
        let result = result();
        let passed = result.posterior_model(&PriorPasser::default()).unwrap();
        let Some(MassProfile::EllipticalIsothermal(mass)) = &passed.lens.mass else {
            panic!("mass profile kind changed");
        };
        let Some(Prior::Gaussian(prior)) = mass.einstein_radius.prior() else {
            panic!("passed prior is not Gaussian");
        };
        assert_relative_eq!(prior.mean(), 1.6, epsilon = 1e-12);
        // Default passer takes the larger of the error and the width of the
        // originating Uniform(0, 4) prior
        assert_relative_eq!(prior.sigma(), 2.0);
        assert_eq!(passed.free_parameter_count(), 1);
    }

    #[test]
    fn errors_only_passer_uses_the_posterior_spread() {
        let result = result();
        let passer = PriorPasser {
            sigma: 1.0,
            use_errors: true,
            use_widths: false,
        };
        let passed = result.posterior_model(&passer).unwrap();
        let Some(MassProfile::EllipticalIsothermal(mass)) = &passed.lens.mass else {
            panic!("mass profile kind changed");
        };
        let Some(Prior::Gaussian(prior)) = mass.einstein_radius.prior() else {
            panic!("passed prior is not Gaussian");
        };
        assert!(prior.sigma() < 0.5);
        assert!(prior.sigma() > 0.0);
    }

    #[test]
    fn degenerate_posterior_falls_back_to_the_width() {
        let output = output_with(&[(1.6, -1.0, 1.0)]);
        let result = PhaseResult::new("p".into(), model(), output).unwrap();
        let passer = PriorPasser {
            sigma: 3.0,
            use_errors: true,
            use_widths: false,
        };
        let passed = result.posterior_model(&passer).unwrap();
        let Some(MassProfile::EllipticalIsothermal(mass)) = &passed.lens.mass else {
            panic!("mass profile kind changed");
        };
        let Some(Prior::Gaussian(prior)) = mass.einstein_radius.prior() else {
            panic!("passed prior is not Gaussian");
        };
        assert_relative_eq!(prior.sigma(), 2.0);
    }

    #[test]
    fn aligned_centres_survive_prior_passing() {
        let lens = Galaxy::new(0.5)
            .with_bulge(EllipticalSersic::default())
            .with_disk(crate::model::EllipticalExponential::default())
            .with_aligned_bulge_disk_centre();
        let galaxies = Galaxies::new(lens, Galaxy::new(1.0));
        let nparams = ModelMapper::new(&galaxies).prior_count();
        let output = SearchOutput {
            samples: vec![Sample {
                parameters: (0..nparams).map(|i| i as f64 * 0.01).collect(),
                ln_likelihood: 0.0,
                weight: 1.0,
            }],
            ln_evidence: None,
        };
        let result = PhaseResult::new("p".into(), galaxies, output).unwrap();

        let passed = result.instance_model();
        let bulge = passed.lens.bulge.unwrap();
        let disk = passed.lens.disk.unwrap();
        assert_eq!(disk.centre_0.constant_value(), bulge.centre_0.constant_value());
        assert_eq!(disk.centre_1.constant_value(), bulge.centre_1.constant_value());
    }

    #[test]
    fn result_serialization_round_trip() {
        let result = result();
        let serialized = serde_json::to_string(&result).unwrap();
        let deserialized: PhaseResult = serde_json::from_str(&serialized).unwrap();
        assert_eq!(result, deserialized);
    }
}
