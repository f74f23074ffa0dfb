//! pixgrid - the directory-thumbnail engine of a small picture viewer.
//!
//! The crate owns everything between the filesystem and the grid
//! widget: listing a directory, resolving thumbnails (decoded images
//! or synthesized icons), filling large directories in the background
//! across a fixed set of worker threads, and swapping the finished
//! model into view in a single step. The windowing shell drives it
//! through [`FillScheduler`] and drains the event channel it returns.

pub mod browse;
pub mod fill;
pub mod lister;
pub mod models;
pub mod thumbnails;

pub use fill::scheduler::{FillPhase, FillScheduler};
pub use fill::{FillConfig, FillEvent, Viewport};
pub use lister::{list_directory, ListError};
pub use models::{
    Entry, GridModel, IconSize, ModelSlots, NavigationTarget, ThumbKind, Thumbnail,
};
pub use thumbnails::ThumbnailResolver;
