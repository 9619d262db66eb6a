pub mod classification;
pub mod regression;
pub mod latency;

pub use classification::*;
pub use regression::*;
pub use latency::*;
