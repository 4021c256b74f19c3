use super::galaxy::{GalaxiesInstance, GalaxiesModel};
use crate::error::PipelineError;
use crate::prior::{Prior, PriorTrait};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GalaxyId {
    Lens,
    Source,
}

impl GalaxyId {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Lens => "lens",
            Self::Source => "source",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ComponentId {
    Bulge,
    Disk,
    Mass,
    Shear,
    Pixelization,
    Regularization,
    HyperGalaxy,
}

impl ComponentId {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Bulge => "bulge",
            Self::Disk => "disk",
            Self::Mass => "mass",
            Self::Shear => "shear",
            Self::Pixelization => "pixelization",
            Self::Regularization => "regularization",
            Self::HyperGalaxy => "hyper_galaxy",
        }
    }
}

/// Typed address of a single parameter in the galaxies model tree
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub struct ParamPath {
    pub galaxy: GalaxyId,
    pub component: ComponentId,
    pub parameter: &'static str,
}

impl fmt::Display for ParamPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}",
            self.galaxy.as_str(),
            self.component.as_str(),
            self.parameter
        )
    }
}

/// Mapping between a galaxies model and the flat parameter vector a
/// non-linear search samples
///
/// The mapper takes an immutable snapshot of the model at construction;
/// vector order is the deterministic traversal order of the model tree
/// (lens before source, components in declaration order), with constants
/// excluded.
#[derive(Clone, Debug)]
pub struct ModelMapper {
    model: GalaxiesModel,
    paths: Vec<ParamPath>,
    priors: Vec<Prior>,
}

impl ModelMapper {
    pub fn new(model: &GalaxiesModel) -> Self {
        let mut paths = Vec::new();
        let mut priors = Vec::new();
        model.for_each_parameter(&mut |galaxy, component, parameter, p| {
            if let Some(prior) = p.prior() {
                paths.push(ParamPath {
                    galaxy,
                    component,
                    parameter,
                });
                priors.push(prior.clone());
            }
        });
        Self {
            model: model.clone(),
            paths,
            priors,
        }
    }

    pub fn model(&self) -> &GalaxiesModel {
        &self.model
    }

    pub fn prior_count(&self) -> usize {
        self.priors.len()
    }

    pub fn paths(&self) -> &[ParamPath] {
        &self.paths
    }

    pub fn priors(&self) -> &[Prior] {
        &self.priors
    }

    pub fn parameter_names(&self) -> Vec<String> {
        self.paths.iter().map(|path| path.to_string()).collect()
    }

    /// Deterministic starting estimate: the mean of every prior
    pub fn prior_means(&self) -> Vec<f64> {
        self.priors.iter().map(|prior| prior.mean()).collect()
    }

    fn check_length(&self, actual: usize) -> Result<(), PipelineError> {
        if actual == self.prior_count() {
            Ok(())
        } else {
            Err(PipelineError::WrongParameterCount {
                expected: self.prior_count(),
                actual,
            })
        }
    }

    /// Rebuild a typed instance from a physical parameter vector
    pub fn instance_from_vector(&self, vector: &[f64]) -> Result<GalaxiesInstance, PipelineError> {
        self.check_length(vector.len())?;
        let mut index = 0;
        let instance = self.model.instance_from(&mut |_| {
            let value = vector[index];
            index += 1;
            value
        });
        debug_assert_eq!(index, vector.len());
        Ok(instance)
    }

    /// Rebuild a typed instance from a unit-hypercube vector
    pub fn instance_from_unit_vector(
        &self,
        unit: &[f64],
    ) -> Result<GalaxiesInstance, PipelineError> {
        self.check_length(unit.len())?;
        let mut index = 0;
        let instance = self.model.instance_from(&mut |prior| {
            let value = prior.value_for_unit(unit[index]);
            index += 1;
            value
        });
        Ok(instance)
    }

    /// Map a unit-hypercube vector to the physical parameter vector
    pub fn vector_from_unit_vector(&self, unit: &[f64]) -> Result<Vec<f64>, PipelineError> {
        self.check_length(unit.len())?;
        Ok(unit
            .iter()
            .zip(&self.priors)
            .map(|(&u, prior)| prior.value_for_unit(u))
            .collect())
    }

    /// Summed log prior density of a physical parameter vector
    pub fn ln_prior(&self, vector: &[f64]) -> Result<f64, PipelineError> {
        self.check_length(vector.len())?;
        Ok(vector
            .iter()
            .zip(&self.priors)
            .map(|(&x, prior)| prior.ln_prob(x))
            .sum())
    }
}
