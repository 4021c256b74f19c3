#![doc = include_str!("../README.md")]

mod aggregator;
pub use aggregator::{marginal, Aggregator, AggregatorEntry};

mod error;
pub use error::PipelineError;

pub mod math;

pub mod model;
pub use model::{Galaxies, GalaxiesInstance, GalaxiesModel, Galaxy, ModelMapper, ParamPath};

mod output;
pub use output::{OutputPaths, OUTPUT_PATH_ENV};

mod phase;
pub use phase::{Mask, Phase, PhaseSettings};

mod pipeline;
pub use pipeline::{Pipeline, ResultsCollection, Stage};

pub mod pipelines;
pub use pipelines::PipelineSettings;

pub mod prior;
pub use prior::{Parameter, Prior, PriorTrait};

mod result;
pub use result::{PhaseResult, PriorPasser};

mod search;
pub use search::{NonLinearSearch, Sample, SearchOutput, SearchProblem, SearchSettings};

pub mod stats;

mod tracer;
pub use tracer::{ImagingData, TracerService};

pub use ndarray;
