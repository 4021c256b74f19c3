//! End-to-end pipeline run with stand-in tracer and search implementations

use lens_pipeline::model::{Galaxies, Galaxy, SphericalIsothermal};
use lens_pipeline::prior::{Parameter, Prior};
use lens_pipeline::{
    Aggregator, ImagingData, NonLinearSearch, OutputPaths, Pipeline, PipelineError, PriorPasser,
    Sample, SearchOutput, SearchProblem, SearchSettings, TracerService,
};
use ndarray::Array1;

const TRUE_EINSTEIN_RADIUS: f64 = 2.0;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Every pixel of the model image is the lens Einstein radius, so the
/// likelihood peaks where the fitted radius matches the data
struct FlatTracer;

impl TracerService for FlatTracer {
    fn model_image(
        &self,
        galaxies: &lens_pipeline::GalaxiesInstance,
    ) -> Result<Array1<f64>, PipelineError> {
        let radius = galaxies
            .lens
            .mass
            .as_ref()
            .map(|mass| mass.einstein_radius())
            .ok_or_else(|| PipelineError::Tracer("lens has no mass profile".into()))?;
        Ok(Array1::from_elem(4, radius))
    }
}

/// Evaluates the posterior on a fixed grid along the unit-hypercube
/// diagonal; deterministic, and exact enough for one-parameter models
struct GridSearch {
    points: usize,
}

impl NonLinearSearch for GridSearch {
    fn search(
        &self,
        problem: &SearchProblem<'_>,
        _settings: &SearchSettings,
    ) -> Result<SearchOutput, PipelineError> {
        let dims = problem.mapper().prior_count();
        let mut samples = Vec::with_capacity(self.points);
        let mut max_ln_likelihood = f64::NEG_INFINITY;
        for k in 0..self.points {
            let u = (k as f64 + 0.5) / self.points as f64;
            let vector = problem.mapper().vector_from_unit_vector(&vec![u; dims])?;
            let ln_likelihood = problem.ln_likelihood_of_vector(&vector)?;
            max_ln_likelihood = max_ln_likelihood.max(ln_likelihood);
            samples.push(Sample {
                parameters: vector,
                ln_likelihood,
                weight: 0.0,
            });
        }
        for sample in &mut samples {
            sample.weight = (sample.ln_likelihood - max_ln_likelihood).exp();
        }
        Ok(SearchOutput {
            samples,
            ln_evidence: None,
        })
    }
}

fn imaging_data() -> ImagingData {
    ImagingData::new(
        Array1::from_elem(4, TRUE_EINSTEIN_RADIUS),
        Array1::from_elem(4, 0.1),
    )
    .unwrap()
}

fn initial_model() -> Galaxies<Parameter> {
    let mass = SphericalIsothermal {
        centre_0: Parameter::constant(0.0),
        centre_1: Parameter::constant(0.0),
        einstein_radius: Parameter::uniform(0.0, 4.0),
    };
    Galaxies::new(Galaxy::new(0.5).with_mass(mass), Galaxy::new(1.0))
}

fn two_phase_pipeline() -> Pipeline {
    Pipeline::new("pipeline_integration", "tag")
        .add_stage(|_| Ok(lens_pipeline::Phase::new("phase_1", initial_model())))
        .add_stage(|results| {
            let passer = PriorPasser::default();
            let galaxies = results.from_phase("phase_1")?.posterior_model(&passer)?;
            Ok(lens_pipeline::Phase::new("phase_2", galaxies))
        })
}

#[test]
fn two_phase_run_passes_priors_and_recovers_the_radius() {
    init_tracing();
    let tempdir = tempfile::tempdir().unwrap();
    let paths = OutputPaths::new(tempdir.path());
    let data = imaging_data();

    let results = two_phase_pipeline()
        .run(&data, &FlatTracer, &GridSearch { points: 33 }, &paths)
        .unwrap();
    assert_eq!(results.len(), 2);

    // Phase 1 localizes the Einstein radius
    let phase_1 = results.from_phase("phase_1").unwrap();
    let radius = phase_1.instance().lens.mass.as_ref().unwrap().einstein_radius();
    approx::assert_relative_eq!(radius, TRUE_EINSTEIN_RADIUS, epsilon = 0.05);

    // Phase 2's prior is a gaussian centred on phase 1's posterior
    let phase_2 = results.from_phase("phase_2").unwrap();
    let prior = phase_2
        .model()
        .lens
        .mass
        .as_ref()
        .unwrap()
        .parameters()
        .into_iter()
        .find_map(Parameter::prior)
        .unwrap();
    match prior {
        Prior::Gaussian(_) => {}
        other => panic!("expected a gaussian prior, got {other:?}"),
    }
    let radius = phase_2.instance().lens.mass.as_ref().unwrap().einstein_radius();
    approx::assert_relative_eq!(radius, TRUE_EINSTEIN_RADIUS, epsilon = 0.05);
}

#[test]
fn persisted_results_are_recovered_by_the_aggregator() {
    init_tracing();
    let tempdir = tempfile::tempdir().unwrap();
    let paths = OutputPaths::new(tempdir.path()).with_folder("simulated");
    let data = imaging_data();

    two_phase_pipeline()
        .run(&data, &FlatTracer, &GridSearch { points: 33 }, &paths)
        .unwrap();

    let aggregator = Aggregator::from_directory(tempdir.path()).unwrap();
    assert_eq!(aggregator.len(), 2);
    assert_eq!(aggregator.filter_phase("phase_1").len(), 1);

    let marginals = aggregator
        .marginals("phase_2", |instance| {
            instance.lens.mass.as_ref().unwrap().einstein_radius()
        })
        .unwrap();
    assert_eq!(marginals.len(), 1);
    let (mean, std) = marginals[0];
    approx::assert_relative_eq!(mean, TRUE_EINSTEIN_RADIUS, epsilon = 0.05);
    assert!(std >= 0.0);
}

#[test]
fn duplicate_phase_names_abort_the_run() {
    init_tracing();
    let tempdir = tempfile::tempdir().unwrap();
    let paths = OutputPaths::new(tempdir.path());
    let data = imaging_data();

    let pipeline = Pipeline::new("pipeline_duplicate", "tag")
        .add_stage(|_| Ok(lens_pipeline::Phase::new("phase_1", initial_model())))
        .add_stage(|_| Ok(lens_pipeline::Phase::new("phase_1", initial_model())));
    let err = pipeline
        .run(&data, &FlatTracer, &GridSearch { points: 9 }, &paths)
        .unwrap_err();
    assert!(matches!(err, PipelineError::DuplicatePhaseName { .. }));
}
