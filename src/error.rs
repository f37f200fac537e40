use thiserror::Error;

/// Result alias for the clustering engine
pub type ClusterResult<T> = std::result::Result<T, ClusterError>;

/// Result alias for the palette pipeline
pub type PaletteResult<T> = std::result::Result<T, PaletteError>;

/// Precondition failures of a k-means run, reported before iterating
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClusterError {
    #[error("No points to cluster")]
    EmptyInput,

    #[error("At least one axis is needed to cluster")]
    NoAxes,

    #[error("Invalid number of clusters: k = {k}, but the input holds {n_distinct} distinct points")]
    InvalidK { k: usize, n_distinct: usize },
}

/// Failures of the colour palette pipeline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaletteError {
    #[error("The colour catalogue is empty")]
    EmptyCatalogue,

    #[error("Unknown search method: {0}. Use \"tree\" or \"naive\".")]
    UnknownMethod(String),

    #[error("Colour reduction failed: {0}")]
    Cluster(#[from] ClusterError),
}
