//! Three-phase pipeline fitting an SIE lens and an inversion source
//!
//! Phase 1 fits the lens mass and a parametric source to initialize the
//! mass model. Phase 2 holds the mass fixed at phase 1's posterior mean and
//! initializes the inversion. Phase 3 refits the mass with priors derived
//! from phase 1's posterior, and the inversion parameters stay variable with
//! priors derived from phase 2's posterior.

use super::PipelineSettings;
use crate::model::{
    EllipticalIsothermal, EllipticalSersic, ExternalShear, Galaxies, Galaxy, Pixelization,
    Regularization,
};
use crate::phase::{Mask, Phase};
use crate::pipeline::Pipeline;
use crate::prior::Parameter;
use crate::result::PriorPasser;
use crate::search::SearchSettings;

pub const PIPELINE_NAME: &str = "pipeline_source_inversion";

pub const PHASE_1: &str = "phase_1__lens_sie__source_sersic";
pub const PHASE_2: &str = "phase_2__source_inversion_initialize";
pub const PHASE_3: &str = "phase_3__source_inversion";

pub fn make_pipeline(settings: &PipelineSettings) -> Pipeline {
    let phase_1 = {
        let settings = settings.clone();
        move |_: &crate::pipeline::ResultsCollection| {
            let mut mass = EllipticalIsothermal::default();
            mass.centre_0 = Parameter::gaussian(0.0, 0.1);
            mass.centre_1 = Parameter::gaussian(0.0, 0.1);

            let mut lens = Galaxy::new(settings.redshift_lens).with_mass(mass);
            if settings.include_shear {
                lens = lens.with_shear(ExternalShear::default());
            }

            let mut bulge = EllipticalSersic::default();
            bulge.centre_0 = Parameter::gaussian(0.0, 0.1);
            bulge.centre_1 = Parameter::gaussian(0.0, 0.1);
            let source = Galaxy::new(settings.redshift_source).with_bulge(bulge);

            // An annular mask removes the lens light residuals at the centre.
            Ok(Phase::new(PHASE_1, Galaxies::new(lens, source))
                .with_mask(Mask::CircularAnnular {
                    inner_radius: 0.2,
                    outer_radius: 3.3,
                })
                .with_search_settings(SearchSettings {
                    n_live_points: 80,
                    sampling_efficiency: 0.2,
                    const_efficiency_mode: true,
                    ..SearchSettings::default()
                }))
        }
    };

    let phase_2 = {
        let settings = settings.clone();
        move |results: &crate::pipeline::ResultsCollection| {
            let lens = results.from_phase(PHASE_1)?.instance_model().lens;
            let source = Galaxy::new(settings.redshift_source)
                .with_pixelization(Pixelization::model(settings.pixelization))
                .with_regularization(Regularization::model(settings.regularization));

            Ok(Phase::new(PHASE_2, Galaxies::new(lens, source)).with_search_settings(
                SearchSettings {
                    n_live_points: 20,
                    sampling_efficiency: 0.8,
                    const_efficiency_mode: true,
                    ..SearchSettings::default()
                },
            ))
        }
    };

    let phase_3 = move |results: &crate::pipeline::ResultsCollection| {
        let passer = PriorPasser::default();
        let lens = results
            .from_phase(PHASE_1)?
            .posterior_model(&passer)?
            .lens;
        let source = results.from_phase(PHASE_2)?.posterior_model(&passer)?.source;

        Ok(
            Phase::new(PHASE_3, Galaxies::new(lens, source)).with_search_settings(
                SearchSettings {
                    n_live_points: 50,
                    sampling_efficiency: 0.5,
                    const_efficiency_mode: true,
                    ..SearchSettings::default()
                },
            ),
        )
    };

    Pipeline::new(PIPELINE_NAME, settings.tag())
        .add_stage(phase_1)
        .add_stage(phase_2)
        .add_stage(phase_3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelMapper;
    use crate::pipeline::ResultsCollection;
    use crate::prior::Prior;
    use crate::result::PhaseResult;
    use crate::search::{Sample, SearchOutput};

    fn fake_result(phase: &Phase, values: &[f64]) -> PhaseResult {
        let output = SearchOutput {
            samples: vec![
                Sample {
                    parameters: values.to_vec(),
                    ln_likelihood: -1.0,
                    weight: 1.0,
                },
                Sample {
                    parameters: values.iter().map(|v| v + 0.01).collect(),
                    ln_likelihood: -2.0,
                    weight: 1.0,
                },
            ],
            ln_evidence: Some(-10.0),
        };
        PhaseResult::new(phase.name.clone(), phase.galaxies.clone(), output).unwrap()
    }

    // Drive the stage builders by hand with synthetic results
    fn run_builders(settings: &PipelineSettings) -> Vec<Phase> {
        let pipeline = make_pipeline(settings);
        assert_eq!(pipeline.len(), 3);

        let mut results = ResultsCollection::default();
        let mut phases = Vec::new();
        for stage in pipeline.stages() {
            let phase = stage.build(&results).unwrap();
            let values = ModelMapper::new(&phase.galaxies).prior_means();
            results.push(fake_result(&phase, &values));
            phases.push(phase);
        }
        phases
    }

    #[test]
    fn phase_structure_matches_the_pipeline_design() {
        let phases = run_builders(&PipelineSettings::default());

        // Phase 1: SIE (5) + shear (2) + source Sersic (7)
        assert_eq!(ModelMapper::new(&phases[0].galaxies).prior_count(), 14);
        assert_eq!(phases[0].search_settings.n_live_points, 80);
        assert!(phases[0].search_settings.const_efficiency_mode);

        // Phase 2: mass fixed, pixelization shape (2) + regularization (1)
        let mapper = ModelMapper::new(&phases[1].galaxies);
        assert_eq!(mapper.prior_count(), 3);
        assert!(phases[1].galaxies.lens.mass.is_some());
        assert!(phases[1].galaxies.source.pixelization.is_some());
        assert!(phases[1].search_settings.const_efficiency_mode);

        // Phase 3: mass free again, inversion still variable
        let mapper = ModelMapper::new(&phases[2].galaxies);
        assert_eq!(mapper.prior_count(), 10);
        assert!(phases[2].galaxies.source.bulge.is_none());
        assert!(phases[2].search_settings.const_efficiency_mode);
    }

    #[test]
    fn phase_1_uses_an_annular_mask() {
        let phases = run_builders(&PipelineSettings::default());
        assert_eq!(
            phases[0].mask,
            Mask::CircularAnnular {
                inner_radius: 0.2,
                outer_radius: 3.3,
            }
        );
    }

    #[test]
    fn phase_3_inversion_parameters_stay_variable() {
        let phases = run_builders(&PipelineSettings::default());
        let source = &phases[2].galaxies.source;
        let pixelization = source.pixelization.as_ref().unwrap();
        let regularization = source.regularization.as_ref().unwrap();
        for parameter in pixelization
            .parameters()
            .into_iter()
            .chain(regularization.parameters())
        {
            match parameter.prior() {
                Some(Prior::Gaussian(_)) => {}
                other => panic!("expected a gaussian prior, got {other:?}"),
            }
        }
    }

    #[test]
    fn phase_3_mass_priors_are_recentred_gaussians() {
        let phases = run_builders(&PipelineSettings::default());
        let mass = phases[2].galaxies.lens.mass.as_ref().unwrap();
        for parameter in mass.parameters() {
            match parameter.prior() {
                Some(Prior::Gaussian(_)) => {}
                other => panic!("expected a gaussian prior, got {other:?}"),
            }
        }
    }

    #[test]
    fn shear_is_structural() {
        let settings = PipelineSettings {
            include_shear: false,
            ..PipelineSettings::default()
        };
        let phases = run_builders(&settings);
        assert!(phases[0].galaxies.lens.shear.is_none());
        assert_eq!(ModelMapper::new(&phases[0].galaxies).prior_count(), 12);
        assert!(phases[2].galaxies.lens.shear.is_none());
    }
}
