//! Four-phase pipeline fitting a bulge+disk lens light profile, an SIE mass
//! model and a parametric source
//!
//! The phases alternate which part of the model is free: phase 1 fits the
//! lens light alone, phase 2 fits the mass and source with the light held
//! fixed and the mass centre anchored near phase 1's bulge centre, phase 3
//! refits the light from fresh priors against the fixed mass and source, and
//! phase 4 frees everything with priors derived from phases 2 and 3.

use super::PipelineSettings;
use crate::model::{
    EllipticalExponential, EllipticalIsothermal, EllipticalSersic, ExternalShear, Galaxies, Galaxy,
    HyperGalaxy,
};
use crate::phase::Phase;
use crate::pipeline::{Pipeline, ResultsCollection};
use crate::prior::Parameter;
use crate::result::PriorPasser;
use crate::search::SearchSettings;

pub const PIPELINE_NAME: &str = "pipeline_bulge_disk_parametric";

pub const PHASE_1: &str = "phase_1__lens_bulge_disk";
pub const PHASE_2: &str = "phase_2__lens_sie__source_sersic";
pub const PHASE_3: &str = "phase_3__lens_bulge_disk_sie";
pub const PHASE_4: &str = "phase_4__lens_bulge_disk_sie__source_sersic";

pub fn make_pipeline(settings: &PipelineSettings) -> Pipeline {
    let phase_1 = {
        let settings = settings.clone();
        move |_: &ResultsCollection| {
            let mut lens = Galaxy::new(settings.redshift_lens)
                .with_bulge(EllipticalSersic::default())
                .with_disk(EllipticalExponential::default());
            if settings.align_bulge_disk_centre {
                lens = lens.with_aligned_bulge_disk_centre();
            }
            let source = Galaxy::new(settings.redshift_source);

            Ok(Phase::new(PHASE_1, Galaxies::new(lens, source)).with_search_settings(
                SearchSettings {
                    n_live_points: 40,
                    sampling_efficiency: 0.3,
                    const_efficiency_mode: true,
                    ..SearchSettings::default()
                },
            ))
        }
    };

    let phase_2 = {
        let settings = settings.clone();
        move |results: &ResultsCollection| {
            let light = results.from_phase(PHASE_1)?;
            let mut lens = light.instance_model().lens;

            // Anchor the mass centre near the fitted bulge centre.
            let mut mass = EllipticalIsothermal::default();
            let fitted = light.instance();
            if let Some(bulge) = &fitted.lens.bulge {
                mass.centre_0 = Parameter::gaussian(bulge.centre_0, 0.1);
                mass.centre_1 = Parameter::gaussian(bulge.centre_1, 0.1);
            }
            lens.mass = Some(mass.into());
            if settings.include_shear {
                lens.shear = Some(ExternalShear::default());
            }
            let source =
                Galaxy::new(settings.redshift_source).with_bulge(EllipticalSersic::default());

            Ok(Phase::new(PHASE_2, Galaxies::new(lens, source)).with_search_settings(
                SearchSettings {
                    n_live_points: 50,
                    sampling_efficiency: 0.5,
                    ..SearchSettings::default()
                },
            ))
        }
    };

    let phase_3 = {
        let settings = settings.clone();
        move |results: &ResultsCollection| {
            // The light is refit from scratch so phase 1's systematics, fit
            // without a mass model, do not bias it.
            let mut lens = Galaxy::new(settings.redshift_lens)
                .with_bulge(EllipticalSersic::default())
                .with_disk(EllipticalExponential::default());
            if settings.align_bulge_disk_centre {
                lens = lens.with_aligned_bulge_disk_centre();
            }
            let fixed = results.from_phase(PHASE_2)?.instance_model();
            lens.mass = fixed.lens.mass;
            lens.shear = fixed.lens.shear;

            Ok(
                Phase::new(PHASE_3, Galaxies::new(lens, fixed.source)).with_search_settings(
                    SearchSettings {
                        n_live_points: 75,
                        sampling_efficiency: 0.5,
                        ..SearchSettings::default()
                    },
                ),
            )
        }
    };

    let phase_4 = {
        let settings = settings.clone();
        move |results: &ResultsCollection| {
            let passer = PriorPasser::default();
            let mut lens = results.from_phase(PHASE_3)?.posterior_model(&passer)?.lens;
            let passed = results.from_phase(PHASE_2)?.posterior_model(&passer)?;
            lens.mass = passed.lens.mass;
            lens.shear = passed.lens.shear;
            let mut source = passed.source;

            if settings.hyper_galaxies {
                lens.hyper_galaxy = Some(HyperGalaxy::default());
                source.hyper_galaxy = Some(HyperGalaxy::default());
            }

            Ok(Phase::new(PHASE_4, Galaxies::new(lens, source)).with_search_settings(
                SearchSettings {
                    n_live_points: 75,
                    sampling_efficiency: 0.3,
                    const_efficiency_mode: true,
                    ..SearchSettings::default()
                },
            ))
        }
    };

    Pipeline::new(PIPELINE_NAME, settings.tag())
        .add_stage(phase_1)
        .add_stage(phase_2)
        .add_stage(phase_3)
        .add_stage(phase_4)
}
