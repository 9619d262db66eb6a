//! Tabular learning primitives: CSV ingestion, profiling, task advice,
//! splitting, preprocessing, the estimator roster and candidate training.

pub mod artifact;
pub mod estimators;
pub mod loader;
pub mod preprocessing;
pub mod profiler;
pub mod resolver;
pub mod split;
pub mod trainer;

pub use artifact::*;
pub use estimators::{EstimatorError, FittedEstimator};
pub use loader::*;
pub use preprocessing::*;
pub use profiler::*;
pub use resolver::*;
pub use split::*;
pub use trainer::*;
