pub mod entry;
pub mod grid_model;

pub use entry::*;
pub use grid_model::*;
