pub mod calculators;
pub mod aggregators;
pub mod statistical;

pub use calculators::*;
pub use aggregators::*;
pub use statistical::*;
