//! Core business logic abstractions

pub mod align;
pub mod cache;
pub mod config;
pub mod forecast;
pub mod log;
pub mod nav;
pub mod normalize;
pub mod pipeline;
pub mod returns;
pub mod stats;
pub mod table;
pub mod window;

// Re-export main types for cleaner imports
pub use nav::{FundCatalog, NavFetch, NavHistory, NavSource, Observation, Series};
pub use table::AlignedTable;
