pub mod engine;
pub mod executor;
pub mod gateway;
pub mod platform;
pub mod serving;

pub use engine::*;
pub use executor::*;
pub use gateway::*;
pub use platform::*;
pub use serving::*;
