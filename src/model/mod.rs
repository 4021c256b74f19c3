//! Typed galaxy model trees
//!
//! Every profile is a struct generic over its parameter representation:
//! `Profile<Parameter>` is a model with free priors and fixed constants,
//! `Profile<f64>` is a concrete instance produced by a fit. The structure of
//! a model and of its instances is therefore identical by construction, and
//! prior passing between phases is a structure-preserving rewrite rather
//! than a stringly-typed attribute-path lookup.

#[macro_use]
mod macros;

mod galaxy;
pub use galaxy::{Galaxies, GalaxiesInstance, GalaxiesModel, Galaxy, GalaxyInstance, GalaxyModel};

mod mapper;
pub use mapper::{ComponentId, GalaxyId, ModelMapper, ParamPath};

mod profiles;
pub use profiles::{
    EllipticalExponential, EllipticalIsothermal, EllipticalSersic, ExternalShear, HyperGalaxy,
    MassProfile, Pixelization, PixelizationKind, Regularization, RegularizationKind,
    SphericalIsothermal,
};
