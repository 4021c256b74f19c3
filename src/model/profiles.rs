use crate::prior::Parameter;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

profile_parameters! {
    /// Elliptical Sersic light profile parameters
    EllipticalSersic {
        centre_0,
        centre_1,
        axis_ratio,
        phi,
        intensity,
        effective_radius,
        sersic_index,
    }
}

impl Default for EllipticalSersic<Parameter> {
    fn default() -> Self {
        Self {
            centre_0: Parameter::uniform(-1.0, 1.0),
            centre_1: Parameter::uniform(-1.0, 1.0),
            axis_ratio: Parameter::uniform(0.2, 1.0),
            phi: Parameter::uniform(0.0, 180.0),
            intensity: Parameter::log_uniform(1e-6, 1e6),
            effective_radius: Parameter::uniform(0.0, 4.0),
            sersic_index: Parameter::uniform(0.8, 8.0),
        }
    }
}

profile_parameters! {
    /// Elliptical exponential light profile parameters, a Sersic with fixed index
    EllipticalExponential {
        centre_0,
        centre_1,
        axis_ratio,
        phi,
        intensity,
        effective_radius,
    }
}

impl Default for EllipticalExponential<Parameter> {
    fn default() -> Self {
        Self {
            centre_0: Parameter::uniform(-1.0, 1.0),
            centre_1: Parameter::uniform(-1.0, 1.0),
            axis_ratio: Parameter::uniform(0.2, 1.0),
            phi: Parameter::uniform(0.0, 180.0),
            intensity: Parameter::log_uniform(1e-6, 1e6),
            effective_radius: Parameter::uniform(0.0, 4.0),
        }
    }
}

profile_parameters! {
    /// Elliptical isothermal (SIE) mass profile parameters
    EllipticalIsothermal {
        centre_0,
        centre_1,
        axis_ratio,
        phi,
        einstein_radius,
    }
}

impl Default for EllipticalIsothermal<Parameter> {
    fn default() -> Self {
        Self {
            centre_0: Parameter::uniform(-1.0, 1.0),
            centre_1: Parameter::uniform(-1.0, 1.0),
            axis_ratio: Parameter::uniform(0.2, 1.0),
            phi: Parameter::uniform(0.0, 180.0),
            einstein_radius: Parameter::uniform(0.0, 4.0),
        }
    }
}

profile_parameters! {
    /// Spherical isothermal (SIS) mass profile parameters
    SphericalIsothermal {
        centre_0,
        centre_1,
        einstein_radius,
    }
}

impl Default for SphericalIsothermal<Parameter> {
    fn default() -> Self {
        Self {
            centre_0: Parameter::uniform(-1.0, 1.0),
            centre_1: Parameter::uniform(-1.0, 1.0),
            einstein_radius: Parameter::uniform(0.0, 4.0),
        }
    }
}

profile_parameters! {
    /// External shear contribution to the lens mass model
    ExternalShear {
        magnitude,
        phi,
    }
}

impl Default for ExternalShear<Parameter> {
    fn default() -> Self {
        Self {
            magnitude: Parameter::uniform(0.0, 0.3),
            phi: Parameter::uniform(0.0, 180.0),
        }
    }
}

profile_parameters! {
    /// Hyper-galaxy noise-scaling parameters
    HyperGalaxy {
        contribution_factor,
        noise_factor,
        noise_power,
    }
}

impl Default for HyperGalaxy<Parameter> {
    fn default() -> Self {
        Self {
            contribution_factor: Parameter::log_uniform(1e-4, 1e4),
            noise_factor: Parameter::uniform(0.0, 10.0),
            noise_power: Parameter::uniform(0.0, 2.0),
        }
    }
}

/// Total mass profile of a galaxy
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MassProfile<P> {
    EllipticalIsothermal(EllipticalIsothermal<P>),
    SphericalIsothermal(SphericalIsothermal<P>),
}

impl<P> MassProfile<P> {
    pub fn parameter_names(&self) -> &'static [&'static str] {
        match self {
            Self::EllipticalIsothermal(_) => EllipticalIsothermal::<P>::PARAMETER_NAMES,
            Self::SphericalIsothermal(_) => SphericalIsothermal::<P>::PARAMETER_NAMES,
        }
    }

    pub fn parameters(&self) -> Vec<&P> {
        match self {
            Self::EllipticalIsothermal(p) => p.parameters(),
            Self::SphericalIsothermal(p) => p.parameters(),
        }
    }

    pub fn map_named<Q>(&self, f: impl FnMut(&'static str, &P) -> Q) -> MassProfile<Q> {
        match self {
            Self::EllipticalIsothermal(p) => MassProfile::EllipticalIsothermal(p.map_named(f)),
            Self::SphericalIsothermal(p) => MassProfile::SphericalIsothermal(p.map_named(f)),
        }
    }
}

impl MassProfile<f64> {
    pub fn centre(&self) -> (f64, f64) {
        match self {
            Self::EllipticalIsothermal(p) => (p.centre_0, p.centre_1),
            Self::SphericalIsothermal(p) => (p.centre_0, p.centre_1),
        }
    }

    pub fn einstein_radius(&self) -> f64 {
        match self {
            Self::EllipticalIsothermal(p) => p.einstein_radius,
            Self::SphericalIsothermal(p) => p.einstein_radius,
        }
    }
}

impl<P> From<EllipticalIsothermal<P>> for MassProfile<P> {
    fn from(p: EllipticalIsothermal<P>) -> Self {
        Self::EllipticalIsothermal(p)
    }
}

impl<P> From<SphericalIsothermal<P>> for MassProfile<P> {
    fn from(p: SphericalIsothermal<P>) -> Self {
        Self::SphericalIsothermal(p)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PixelizationKind {
    Rectangular,
    VoronoiMagnification,
}

impl PixelizationKind {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Rectangular => "rect",
            Self::VoronoiMagnification => "voro_mag",
        }
    }
}

/// Source-plane pixelization of an inversion
///
/// The kind is pipeline configuration, not a fitted quantity; only the grid
/// shape enters the parameter space.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Pixelization<P> {
    pub kind: PixelizationKind,
    pub shape_0: P,
    pub shape_1: P,
}

impl<P> Pixelization<P> {
    pub const PARAMETER_NAMES: &'static [&'static str] = &["shape_0", "shape_1"];

    pub fn parameters(&self) -> Vec<&P> {
        vec![&self.shape_0, &self.shape_1]
    }

    pub fn map_named<Q>(&self, mut f: impl FnMut(&'static str, &P) -> Q) -> Pixelization<Q> {
        Pixelization {
            kind: self.kind,
            shape_0: f("shape_0", &self.shape_0),
            shape_1: f("shape_1", &self.shape_1),
        }
    }
}

impl Pixelization<Parameter> {
    pub fn model(kind: PixelizationKind) -> Self {
        Self {
            kind,
            shape_0: Parameter::uniform(10.0, 40.0),
            shape_1: Parameter::uniform(10.0, 40.0),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RegularizationKind {
    Constant,
    AdaptiveBrightness,
}

impl RegularizationKind {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Constant => "const",
            Self::AdaptiveBrightness => "adapt_bright",
        }
    }
}

/// Regularization scheme of an inversion
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Regularization<P> {
    pub kind: RegularizationKind,
    pub coefficient: P,
}

impl<P> Regularization<P> {
    pub const PARAMETER_NAMES: &'static [&'static str] = &["coefficient"];

    pub fn parameters(&self) -> Vec<&P> {
        vec![&self.coefficient]
    }

    pub fn map_named<Q>(&self, mut f: impl FnMut(&'static str, &P) -> Q) -> Regularization<Q> {
        Regularization {
            kind: self.kind,
            coefficient: f("coefficient", &self.coefficient),
        }
    }
}

impl Regularization<Parameter> {
    pub fn model(kind: RegularizationKind) -> Self {
        Self {
            kind,
            coefficient: Parameter::log_uniform(1e-6, 1e8),
        }
    }
}
