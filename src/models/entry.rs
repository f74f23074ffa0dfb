use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbaImage;
use parking_lot::Mutex;

/// Discrete icon sizes the grid can render at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IconSize {
    Px24,
    Px32,
    Px48,
    Px64,
    Px96,
    Px128,
    Px256,
}

impl IconSize {
    pub const ALL: [IconSize; 7] = [
        IconSize::Px24,
        IconSize::Px32,
        IconSize::Px48,
        IconSize::Px64,
        IconSize::Px96,
        IconSize::Px128,
        IconSize::Px256,
    ];

    /// Edge length in pixels.
    pub fn px(self) -> u32 {
        match self {
            IconSize::Px24 => 24,
            IconSize::Px32 => 32,
            IconSize::Px48 => 48,
            IconSize::Px64 => 64,
            IconSize::Px96 => 96,
            IconSize::Px128 => 128,
            IconSize::Px256 => 256,
        }
    }

    /// Next size up, clamped at the largest step.
    pub fn larger(self) -> IconSize {
        let pos = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(pos + 1).min(Self::ALL.len() - 1)]
    }

    /// Next size down, clamped at the smallest step.
    pub fn smaller(self) -> IconSize {
        let pos = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[pos.saturating_sub(1)]
    }
}

impl Default for IconSize {
    fn default() -> Self {
        IconSize::Px128
    }
}

/// How a thumbnail was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbKind {
    /// Decoded from the file's own image data.
    Decoded,
    /// Synthesized icon fallback.
    Icon,
}

/// A decoded-or-icon image sized for grid display.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    image: RgbaImage,
    kind: ThumbKind,
}

impl Thumbnail {
    pub fn new(image: RgbaImage, kind: ThumbKind) -> Self {
        Self { image, kind }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn kind(&self) -> ThumbKind {
        self.kind
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn is_decoded(&self) -> bool {
        self.kind == ThumbKind::Decoded
    }
}

#[derive(Debug, Default)]
struct ThumbSlot {
    ready: bool,
    thumbnail: Option<Arc<Thumbnail>>,
}

/// One filesystem child of a listed directory.
///
/// Path and type flags are fixed at listing time; only the thumbnail
/// slot mutates afterwards. The slot has its own lock so background
/// workers can fill disjoint entries of a shared model concurrently.
#[derive(Debug)]
pub struct Entry {
    path: PathBuf,
    display_name: String,
    is_dir: bool,
    is_symlink: bool,
    slot: Mutex<ThumbSlot>,
}

impl Entry {
    pub fn new(path: PathBuf, display_name: String, is_dir: bool, is_symlink: bool) -> Self {
        Self {
            path,
            display_name,
            is_dir,
            is_symlink,
            slot: Mutex::new(ThumbSlot::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    pub fn is_symlink(&self) -> bool {
        self.is_symlink
    }

    /// Whether a thumbnail has been assigned.
    pub fn is_ready(&self) -> bool {
        self.slot.lock().ready
    }

    /// The assigned thumbnail, if any.
    pub fn thumbnail(&self) -> Option<Arc<Thumbnail>> {
        self.slot.lock().thumbnail.clone()
    }

    /// Assign a thumbnail and mark the entry ready.
    ///
    /// A ready entry always holds an image with non-zero dimensions.
    pub fn set_thumbnail(&self, thumbnail: Thumbnail) {
        debug_assert!(thumbnail.width() > 0 && thumbnail.height() > 0);
        let mut slot = self.slot.lock();
        slot.thumbnail = Some(Arc::new(thumbnail));
        slot.ready = true;
    }
}

impl Clone for Entry {
    fn clone(&self) -> Self {
        let slot = self.slot.lock();
        Self {
            path: self.path.clone(),
            display_name: self.display_name.clone(),
            is_dir: self.is_dir,
            is_symlink: self.is_symlink,
            slot: Mutex::new(ThumbSlot {
                ready: slot.ready,
                thumbnail: slot.thumbnail.clone(),
            }),
        }
    }
}
