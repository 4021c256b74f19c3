use super::mapper::{ComponentId, GalaxyId};
use super::profiles::{
    EllipticalExponential, EllipticalSersic, ExternalShear, HyperGalaxy, MassProfile, Pixelization,
    Regularization,
};
use crate::prior::{Parameter, Prior};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A galaxy of the model: a redshift plus optional light, mass and inversion components
///
/// The redshift is a plain number, never a fitted parameter; pipeline
/// makers supply it as configuration.
/// `align_bulge_disk_centre` ties the disk centre to the bulge centre so the
/// pair shares a single set of free centre parameters.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Galaxy<P> {
    pub redshift: f64,
    pub bulge: Option<EllipticalSersic<P>>,
    pub disk: Option<EllipticalExponential<P>>,
    pub mass: Option<MassProfile<P>>,
    pub shear: Option<ExternalShear<P>>,
    pub pixelization: Option<Pixelization<P>>,
    pub regularization: Option<Regularization<P>>,
    pub hyper_galaxy: Option<HyperGalaxy<P>>,
    #[serde(default)]
    pub align_bulge_disk_centre: bool,
}

pub type GalaxyModel = Galaxy<Parameter>;
pub type GalaxyInstance = Galaxy<f64>;

impl<P> Galaxy<P> {
    pub fn new(redshift: f64) -> Self {
        Self {
            redshift,
            bulge: None,
            disk: None,
            mass: None,
            shear: None,
            pixelization: None,
            regularization: None,
            hyper_galaxy: None,
            align_bulge_disk_centre: false,
        }
    }

    pub fn with_bulge(mut self, bulge: EllipticalSersic<P>) -> Self {
        self.bulge = Some(bulge);
        self
    }

    pub fn with_disk(mut self, disk: EllipticalExponential<P>) -> Self {
        self.disk = Some(disk);
        self
    }

    pub fn with_mass(mut self, mass: impl Into<MassProfile<P>>) -> Self {
        self.mass = Some(mass.into());
        self
    }

    pub fn with_shear(mut self, shear: ExternalShear<P>) -> Self {
        self.shear = Some(shear);
        self
    }

    pub fn with_pixelization(mut self, pixelization: Pixelization<P>) -> Self {
        self.pixelization = Some(pixelization);
        self
    }

    pub fn with_regularization(mut self, regularization: Regularization<P>) -> Self {
        self.regularization = Some(regularization);
        self
    }

    pub fn with_hyper_galaxy(mut self, hyper_galaxy: HyperGalaxy<P>) -> Self {
        self.hyper_galaxy = Some(hyper_galaxy);
        self
    }

    pub fn with_aligned_bulge_disk_centre(mut self) -> Self {
        self.align_bulge_disk_centre = true;
        self
    }
}

impl Galaxy<Parameter> {
    fn centre_alignment_active(&self) -> bool {
        self.align_bulge_disk_centre && self.bulge.is_some() && self.disk.is_some()
    }

    /// Visit every independent parameter of this galaxy in model-vector order
    ///
    /// When the bulge/disk centres are aligned the disk centre is not an
    /// independent parameter and is skipped.
    pub fn for_each_parameter(
        &self,
        f: &mut impl FnMut(ComponentId, &'static str, &Parameter),
    ) {
        if let Some(bulge) = &self.bulge {
            bulge.map_named(|name, p| f(ComponentId::Bulge, name, p));
        }
        if let Some(disk) = &self.disk {
            let aligned = self.centre_alignment_active();
            disk.map_named(|name, p| {
                if !(aligned && (name == "centre_0" || name == "centre_1")) {
                    f(ComponentId::Disk, name, p);
                }
            });
        }
        if let Some(mass) = &self.mass {
            mass.map_named(|name, p| f(ComponentId::Mass, name, p));
        }
        if let Some(shear) = &self.shear {
            shear.map_named(|name, p| f(ComponentId::Shear, name, p));
        }
        if let Some(pixelization) = &self.pixelization {
            pixelization.map_named(|name, p| f(ComponentId::Pixelization, name, p));
        }
        if let Some(regularization) = &self.regularization {
            regularization.map_named(|name, p| f(ComponentId::Regularization, name, p));
        }
        if let Some(hyper_galaxy) = &self.hyper_galaxy {
            hyper_galaxy.map_named(|name, p| f(ComponentId::HyperGalaxy, name, p));
        }
    }

    pub fn free_parameter_count(&self) -> usize {
        let mut count = 0;
        self.for_each_parameter(&mut |_, _, p| {
            if p.is_free() {
                count += 1;
            }
        });
        count
    }

    /// Build a concrete instance, drawing a value from `next` for every free prior
    ///
    /// `next` is called once per free parameter in the same order as
    /// [Self::for_each_parameter]; constants keep their value.
    pub fn instance_from(&self, next: &mut impl FnMut(&Prior) -> f64) -> Galaxy<f64> {
        let mut resolve = |p: &Parameter| match p {
            Parameter::Constant(value) => *value,
            Parameter::Prior(prior) => next(prior),
        };

        let bulge = self.bulge.as_ref().map(|b| b.map_named(|_, p| resolve(p)));
        let bulge_centre = bulge.as_ref().map(|b| (b.centre_0, b.centre_1));
        let disk = self.disk.as_ref().map(|d| {
            match (self.align_bulge_disk_centre, bulge_centre) {
                (true, Some((centre_0, centre_1))) => d.map_named(|name, p| match name {
                    "centre_0" => centre_0,
                    "centre_1" => centre_1,
                    _ => resolve(p),
                }),
                _ => d.map_named(|_, p| resolve(p)),
            }
        });
        let mass = self.mass.as_ref().map(|m| m.map_named(|_, p| resolve(p)));
        let shear = self.shear.as_ref().map(|s| s.map_named(|_, p| resolve(p)));
        let pixelization = self
            .pixelization
            .as_ref()
            .map(|pix| pix.map_named(|_, p| resolve(p)));
        let regularization = self
            .regularization
            .as_ref()
            .map(|reg| reg.map_named(|_, p| resolve(p)));
        let hyper_galaxy = self
            .hyper_galaxy
            .as_ref()
            .map(|h| h.map_named(|_, p| resolve(p)));

        Galaxy {
            redshift: self.redshift,
            bulge,
            disk,
            mass,
            shear,
            pixelization,
            regularization,
            hyper_galaxy,
            align_bulge_disk_centre: self.align_bulge_disk_centre,
        }
    }

    /// Rewrite every parameter with `f`, preserving the component structure
    pub fn map_parameters(
        &self,
        f: &mut impl FnMut(ComponentId, &'static str, &Parameter) -> Parameter,
    ) -> Galaxy<Parameter> {
        Galaxy {
            redshift: self.redshift,
            bulge: self
                .bulge
                .as_ref()
                .map(|b| b.map_named(|name, p| f(ComponentId::Bulge, name, p))),
            disk: self
                .disk
                .as_ref()
                .map(|d| d.map_named(|name, p| f(ComponentId::Disk, name, p))),
            mass: self
                .mass
                .as_ref()
                .map(|m| m.map_named(|name, p| f(ComponentId::Mass, name, p))),
            shear: self
                .shear
                .as_ref()
                .map(|s| s.map_named(|name, p| f(ComponentId::Shear, name, p))),
            pixelization: self
                .pixelization
                .as_ref()
                .map(|pix| pix.map_named(|name, p| f(ComponentId::Pixelization, name, p))),
            regularization: self
                .regularization
                .as_ref()
                .map(|reg| reg.map_named(|name, p| f(ComponentId::Regularization, name, p))),
            hyper_galaxy: self
                .hyper_galaxy
                .as_ref()
                .map(|h| h.map_named(|name, p| f(ComponentId::HyperGalaxy, name, p))),
            align_bulge_disk_centre: self.align_bulge_disk_centre,
        }
    }
}

/// The two galaxy roles every pipeline in the workspace fits
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Galaxies<P> {
    pub lens: Galaxy<P>,
    pub source: Galaxy<P>,
}

pub type GalaxiesModel = Galaxies<Parameter>;
pub type GalaxiesInstance = Galaxies<f64>;

impl<P> Galaxies<P> {
    pub fn new(lens: Galaxy<P>, source: Galaxy<P>) -> Self {
        Self { lens, source }
    }
}

impl Galaxies<Parameter> {
    /// Visit every independent parameter, lens first, in model-vector order
    pub fn for_each_parameter(
        &self,
        f: &mut impl FnMut(GalaxyId, ComponentId, &'static str, &Parameter),
    ) {
        self.lens
            .for_each_parameter(&mut |component, name, p| f(GalaxyId::Lens, component, name, p));
        self.source
            .for_each_parameter(&mut |component, name, p| f(GalaxyId::Source, component, name, p));
    }

    pub fn free_parameter_count(&self) -> usize {
        self.lens.free_parameter_count() + self.source.free_parameter_count()
    }

    pub fn instance_from(&self, next: &mut impl FnMut(&Prior) -> f64) -> Galaxies<f64> {
        Galaxies {
            lens: self.lens.instance_from(next),
            source: self.source.instance_from(next),
        }
    }

    pub fn map_parameters(
        &self,
        f: &mut impl FnMut(GalaxyId, ComponentId, &'static str, &Parameter) -> Parameter,
    ) -> Galaxies<Parameter> {
        Galaxies {
            lens: self
                .lens
                .map_parameters(&mut |component, name, p| f(GalaxyId::Lens, component, name, p)),
            source: self
                .source
                .map_parameters(&mut |component, name, p| f(GalaxyId::Source, component, name, p)),
        }
    }
}
