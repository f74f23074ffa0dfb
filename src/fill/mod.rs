//! Background population of the thumbnail grid.
//!
//! - `FillScheduler` - the list / resolve / publish state machine
//! - `partition` - deterministic index split across fill workers
//! - Events flow to the view thread over a flume channel

pub mod partition;
pub mod scheduler;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{GridModel, IconSize};

/// Pixel geometry of the grid view, supplied by the collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Tuning knobs for a fill cycle.
///
/// The worker count and the prefetch multiplier are empirical desktop
/// tuning values, exposed here rather than frozen into the scheduler.
#[derive(Debug, Clone)]
pub struct FillConfig {
    /// Background workers per cycle; normalized to an even count of at
    /// least two by [`FillConfig::worker_count`].
    pub workers: usize,
    /// Multiplier on the on-screen item count for the synchronously
    /// resolved prefix, so a part-scrolled screen is already filled.
    pub prefetch_multiplier: f32,
    /// Cadence at which the owner is expected to call `poll`.
    pub poll_interval: Duration,
    /// Delay between consecutive worker starts.
    pub worker_stagger: Duration,
    /// Gap between grid cells in pixels.
    pub item_spacing: u32,
    /// Vertical room for the name label under each cell.
    pub label_height: u32,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            prefetch_multiplier: 2.0,
            poll_interval: Duration::from_millis(40),
            worker_stagger: Duration::from_millis(15),
            item_spacing: 8,
            label_height: 20,
        }
    }
}

impl FillConfig {
    /// Worker count rounded up to an even number, at least two.
    pub fn worker_count(&self) -> usize {
        let workers = self.workers.max(2);
        workers + workers % 2
    }
}

/// Notifications delivered to the view thread.
#[derive(Debug, Clone)]
pub enum FillEvent {
    /// A fresh listing is live with its visible prefix resolved.
    InitialReady {
        model: Arc<GridModel>,
        resolved: usize,
    },
    /// A background cycle finished; the grid should rebind to `model`.
    Published { model: Arc<GridModel> },
    /// Listing failed; the previous view stays untouched.
    DirectoryUnreadable { path: PathBuf, message: String },
}

/// Number of items likely visible in `viewport`, padded by the
/// prefetch multiplier.
pub fn visible_items(viewport: Viewport, icon_size: IconSize, config: &FillConfig) -> usize {
    let cell_w = icon_size.px() + config.item_spacing;
    let cell_h = icon_size.px() + config.label_height + config.item_spacing;
    let cols = viewport.width / cell_w + 1;
    let rows = viewport.height / cell_h + 1;
    ((cols * rows) as f32 * config.prefetch_multiplier).ceil() as usize
}
