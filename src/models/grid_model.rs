//! The grid's entry collection and the double-buffered live slot.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::entry::{Entry, IconSize};

/// What an activated grid item navigates to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationTarget {
    Directory(PathBuf),
    File(PathBuf),
}

impl NavigationTarget {
    pub fn path(&self) -> &Path {
        match self {
            NavigationTarget::Directory(p) | NavigationTarget::File(p) => p,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, NavigationTarget::Directory(_))
    }
}

/// Ordered entry collection backing the visible grid.
///
/// Built wholesale from a listing and replaced wholesale on any
/// structural change; only the per-entry thumbnail slots mutate in
/// place. Cloning duplicates every entry, carrying already-resolved
/// thumbnails over as ready.
#[derive(Debug, Clone)]
pub struct GridModel {
    dir: PathBuf,
    icon_size: IconSize,
    entries: Vec<Entry>,
}

impl GridModel {
    pub fn new(dir: PathBuf, icon_size: IconSize, entries: Vec<Entry>) -> Self {
        Self {
            dir,
            icon_size,
            entries,
        }
    }

    /// Directory this model was listed from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Icon size the thumbnails were resolved at.
    pub fn icon_size(&self) -> IconSize {
        self.icon_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub fn entry_by_path(&self, path: &Path) -> Option<&Entry> {
        self.entries.iter().find(|e| e.path() == path)
    }

    /// Entries with an assigned thumbnail.
    pub fn ready_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_ready()).count()
    }

    pub fn is_fully_ready(&self) -> bool {
        self.entries.iter().all(Entry::is_ready)
    }

    /// Navigation target for an activated item.
    pub fn activate(&self, index: usize) -> Option<NavigationTarget> {
        self.entries.get(index).map(|e| {
            if e.is_dir() {
                NavigationTarget::Directory(e.path().to_path_buf())
            } else {
                NavigationTarget::File(e.path().to_path_buf())
            }
        })
    }
}

/// Two interchangeable model buffers with an atomic live index.
///
/// Publication writes the back slot and then flips the index, so a
/// reader observes either the previous model in full or the new model
/// in full, never a mix. Writes come from the single interface thread;
/// any thread may read the live model.
#[derive(Debug)]
pub struct ModelSlots {
    slots: [RwLock<Option<Arc<GridModel>>>; 2],
    live: AtomicUsize,
}

impl ModelSlots {
    pub fn new() -> Self {
        Self {
            slots: [RwLock::new(None), RwLock::new(None)],
            live: AtomicUsize::new(0),
        }
    }

    /// The currently live model, if any.
    pub fn live(&self) -> Option<Arc<GridModel>> {
        let index = self.live.load(Ordering::Acquire);
        self.slots[index].read().clone()
    }

    /// Swap `model` in as the live one, returning the displaced model.
    pub fn publish(&self, model: Arc<GridModel>) -> Option<Arc<GridModel>> {
        let old_index = self.live.load(Ordering::Acquire);
        let back = 1 - old_index;
        *self.slots[back].write() = Some(model);
        self.live.store(back, Ordering::Release);
        self.slots[old_index].write().take()
    }

    /// Drop both buffers, e.g. when the window closes.
    pub fn clear(&self) {
        *self.slots[0].write() = None;
        *self.slots[1].write() = None;
    }
}

impl Default for ModelSlots {
    fn default() -> Self {
        Self::new()
    }
}
