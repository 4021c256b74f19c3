/// Error returned from pipeline composition and execution
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("no completed phase named '{name}' in the results collection")]
    UnknownPhase { name: String },

    #[error("pipeline already contains a phase named '{name}'")]
    DuplicatePhaseName { name: String },

    #[error("parameter vector has length {actual}, model has {expected} free parameters")]
    WrongParameterCount { expected: usize, actual: usize },

    #[error("non-linear search returned no samples")]
    EmptySamples,

    #[error("imaging data arrays have mismatched lengths: image {image}, noise map {noise_map}")]
    MismatchedLengths { image: usize, noise_map: usize },

    #[error("sample weights must sum to a positive number")]
    NonPositiveWeightSum,

    #[error("non-linear search failed: {0}")]
    Search(String),

    #[error("tracer service failed: {0}")]
    Tracer(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
