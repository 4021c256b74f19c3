use crate::math::probit;

use enum_dispatch::enum_dispatch;
use ordered_float::NotNan;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

#[enum_dispatch]
pub trait PriorTrait: Clone + Debug + Serialize + DeserializeOwned + PartialEq {
    /// Natural logarithm of the prior density at `x`, negative infinity outside the support
    fn ln_prob(&self, x: f64) -> f64;

    /// Map a unit-hypercube coordinate in `[0, 1]` to a physical parameter value
    ///
    /// This is the transformation consumed by nested-sampling style non-linear searches.
    fn value_for_unit(&self, unit: f64) -> f64;

    /// The centre of the prior, used as a deterministic starting estimate
    fn mean(&self) -> f64;

    /// Characteristic width of the prior, used as a fallback scatter by
    /// [crate::PriorPasser] when a phase passes its result forward
    fn width(&self) -> f64;
}

/// Prior probability distribution of a single model parameter
#[enum_dispatch(PriorTrait)]
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Prior {
    Uniform(UniformPrior),
    LogUniform(LogUniformPrior),
    Gaussian(GaussianPrior),
}

impl Prior {
    pub fn uniform(lower: f64, upper: f64) -> Self {
        UniformPrior::new(lower, upper).into()
    }

    pub fn log_uniform(lower: f64, upper: f64) -> Self {
        LogUniformPrior::new(lower, upper).into()
    }

    pub fn gaussian(mean: f64, sigma: f64) -> Self {
        GaussianPrior::new(mean, sigma).into()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(into = "UniformPriorParameters", from = "UniformPriorParameters")]
pub struct UniformPrior {
    range: std::ops::RangeInclusive<NotNan<f64>>,
    ln_prob: NotNan<f64>,
}

impl UniformPrior {
    pub fn new(lower: f64, upper: f64) -> Self {
        let lower = NotNan::new(lower).expect("lower must be finite");
        let upper = NotNan::new(upper).expect("upper must be finite");
        Self {
            range: lower..=upper,
            ln_prob: NotNan::new(-f64::ln(upper.into_inner() - lower.into_inner()))
                .expect("upper must be larger than lower"),
        }
    }

    pub fn lower(&self) -> f64 {
        self.range.start().into_inner()
    }

    pub fn upper(&self) -> f64 {
        self.range.end().into_inner()
    }
}

impl PriorTrait for UniformPrior {
    fn ln_prob(&self, x: f64) -> f64 {
        match NotNan::new(x) {
            Ok(x) if self.range.contains(&x) => self.ln_prob.into_inner(),
            _ => f64::NEG_INFINITY,
        }
    }

    fn value_for_unit(&self, unit: f64) -> f64 {
        self.lower() + unit * (self.upper() - self.lower())
    }

    fn mean(&self) -> f64 {
        0.5 * (self.lower() + self.upper())
    }

    fn width(&self) -> f64 {
        0.5 * (self.upper() - self.lower())
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(rename = "UniformPrior")]
struct UniformPriorParameters {
    lower: f64,
    upper: f64,
}

impl From<UniformPrior> for UniformPriorParameters {
    fn from(f: UniformPrior) -> Self {
        Self {
            lower: f.lower(),
            upper: f.upper(),
        }
    }
}

impl From<UniformPriorParameters> for UniformPrior {
    fn from(f: UniformPriorParameters) -> Self {
        Self::new(f.lower, f.upper)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(into = "LogUniformPriorParameters", from = "LogUniformPriorParameters")]
pub struct LogUniformPrior {
    ln_range: std::ops::RangeInclusive<NotNan<f64>>,
    ln_prob_coeff: NotNan<f64>,
}

impl LogUniformPrior {
    pub fn new(lower: f64, upper: f64) -> Self {
        assert!(lower < upper);
        let ln_lower = NotNan::new(f64::ln(lower)).expect("lower must be positive and finite");
        let ln_upper = NotNan::new(f64::ln(upper)).expect("upper must be positive and finite");
        Self {
            ln_range: ln_lower..=ln_upper,
            ln_prob_coeff: NotNan::new(-f64::ln(ln_upper.into_inner() - ln_lower.into_inner()))
                .expect("upper must be larger than lower"),
        }
    }

    pub fn lower(&self) -> f64 {
        self.ln_range.start().into_inner().exp()
    }

    pub fn upper(&self) -> f64 {
        self.ln_range.end().into_inner().exp()
    }

    fn ln_lower(&self) -> f64 {
        self.ln_range.start().into_inner()
    }

    fn ln_upper(&self) -> f64 {
        self.ln_range.end().into_inner()
    }
}

impl PriorTrait for LogUniformPrior {
    fn ln_prob(&self, x: f64) -> f64 {
        let ln_x = match NotNan::new(f64::ln(x)) {
            Ok(ln_x) => ln_x,
            Err(_) => return f64::NEG_INFINITY,
        };
        if self.ln_range.contains(&ln_x) {
            self.ln_prob_coeff.into_inner() - ln_x.into_inner()
        } else {
            f64::NEG_INFINITY
        }
    }

    fn value_for_unit(&self, unit: f64) -> f64 {
        f64::exp(self.ln_lower() + unit * (self.ln_upper() - self.ln_lower()))
    }

    fn mean(&self) -> f64 {
        // Geometric mean, the midpoint in log-space
        f64::exp(0.5 * (self.ln_lower() + self.ln_upper()))
    }

    fn width(&self) -> f64 {
        0.5 * (self.ln_upper() - self.ln_lower()) * self.mean()
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(rename = "LogUniformPrior")]
struct LogUniformPriorParameters {
    lower: f64,
    upper: f64,
}

impl From<LogUniformPrior> for LogUniformPriorParameters {
    fn from(f: LogUniformPrior) -> Self {
        Self {
            lower: f.lower(),
            upper: f.upper(),
        }
    }
}

impl From<LogUniformPriorParameters> for LogUniformPrior {
    fn from(f: LogUniformPriorParameters) -> Self {
        Self::new(f.lower, f.upper)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(into = "GaussianPriorParameters", from = "GaussianPriorParameters")]
pub struct GaussianPrior {
    mu: NotNan<f64>,
    sigma: NotNan<f64>,
    ln_prob_coeff: NotNan<f64>,
}

impl GaussianPrior {
    pub fn new(mean: f64, sigma: f64) -> Self {
        assert!(sigma > 0.0, "sigma must be positive");
        Self {
            mu: NotNan::new(mean).expect("mean must be not NaN"),
            sigma: NotNan::new(sigma).expect("sigma must be positive and finite"),
            ln_prob_coeff: NotNan::new(-f64::ln(sigma) - 0.5 * f64::ln(std::f64::consts::TAU))
                .expect("sigma must be positive and finite"),
        }
    }

    pub fn sigma(&self) -> f64 {
        self.sigma.into_inner()
    }
}

impl PriorTrait for GaussianPrior {
    fn ln_prob(&self, x: f64) -> f64 {
        let diff = self.mu.into_inner() - x;
        self.ln_prob_coeff.into_inner() - 0.5 * diff.powi(2) / self.sigma().powi(2)
    }

    fn value_for_unit(&self, unit: f64) -> f64 {
        self.mu.into_inner() + self.sigma() * probit(unit)
    }

    fn mean(&self) -> f64 {
        self.mu.into_inner()
    }

    fn width(&self) -> f64 {
        self.sigma()
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(rename = "GaussianPrior")]
struct GaussianPriorParameters {
    mean: f64,
    sigma: f64,
}

impl From<GaussianPrior> for GaussianPriorParameters {
    fn from(f: GaussianPrior) -> Self {
        Self {
            mean: f.mean(),
            sigma: f.sigma(),
        }
    }
}

impl From<GaussianPriorParameters> for GaussianPrior {
    fn from(f: GaussianPriorParameters) -> Self {
        Self::new(f.mean, f.sigma)
    }
}

/// A single model parameter: either free with a [Prior] or fixed to a constant
///
/// A completed phase passes its result forward by rewriting each free
/// parameter into one of these two forms.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    Prior(Prior),
    Constant(f64),
}

impl Parameter {
    pub fn uniform(lower: f64, upper: f64) -> Self {
        Self::Prior(Prior::uniform(lower, upper))
    }

    pub fn log_uniform(lower: f64, upper: f64) -> Self {
        Self::Prior(Prior::log_uniform(lower, upper))
    }

    pub fn gaussian(mean: f64, sigma: f64) -> Self {
        Self::Prior(Prior::gaussian(mean, sigma))
    }

    pub fn constant(value: f64) -> Self {
        Self::Constant(value)
    }

    pub fn is_free(&self) -> bool {
        matches!(self, Self::Prior(_))
    }

    pub fn prior(&self) -> Option<&Prior> {
        match self {
            Self::Prior(prior) => Some(prior),
            Self::Constant(_) => None,
        }
    }

    pub fn constant_value(&self) -> Option<f64> {
        match self {
            Self::Prior(_) => None,
            Self::Constant(value) => Some(*value),
        }
    }
}

impl From<Prior> for Parameter {
    fn from(prior: Prior) -> Self {
        Self::Prior(prior)
    }
}

impl From<f64> for Parameter {
    fn from(value: f64) -> Self {
        Self::Constant(value)
    }
}
