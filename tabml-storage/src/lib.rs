pub mod artifacts;
pub mod ledger;
pub mod memory;
pub mod postgres;
pub mod repositories;

pub use artifacts::*;
pub use ledger::*;
pub use memory::*;
pub use repositories::*;
