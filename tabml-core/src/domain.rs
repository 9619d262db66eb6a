pub mod ids;
pub mod config;
pub mod dataset;
pub mod task;
pub mod model;
pub mod run;
pub mod api;

pub use ids::*;
pub use config::*;
pub use dataset::*;
pub use task::*;
pub use model::*;
pub use run::*;
pub use api::*;
