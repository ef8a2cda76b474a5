pub mod chart;
pub mod grid;
pub mod totals;

pub use chart::*;
pub use grid::*;
pub use totals::*;
