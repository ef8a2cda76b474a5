pub mod schedule;
pub mod snapshot;
pub mod types;

pub use schedule::*;
pub use snapshot::*;
pub use types::*;
