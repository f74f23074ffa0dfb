//! Thumbnail pipeline for the grid.
//!
//! - `ThumbnailResolver` - decoded thumbnails with icon fallback
//! - `IconTheme` - synthesized themed icons with badge compositing

pub mod icons;
pub mod resolver;

pub use icons::{Badge, IconKind, IconTheme};
pub use resolver::ThumbnailResolver;
