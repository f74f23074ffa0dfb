//! Thumbnail resolution with an icon fallback chain.
//!
//! Resolution never fails outward: a picture directory is full of
//! files that are not images, not readable, or not even files, and
//! every one of them still gets a grid cell.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use image::imageops::FilterType;
use image::RgbaImage;
use mime_guess::mime;
use tracing::debug;

use super::icons::{Badge, IconKind, IconTheme};
use crate::models::{IconSize, ThumbKind, Thumbnail};

/// Resolves one entry's thumbnail. Cheap to clone; all clones share
/// the icon theme, and concurrent calls are safe as long as each call
/// targets a different entry.
#[derive(Clone)]
pub struct ThumbnailResolver {
    theme: Arc<IconTheme>,
}

impl ThumbnailResolver {
    pub fn new() -> Self {
        Self {
            theme: IconTheme::shared(),
        }
    }

    pub fn with_theme(theme: Arc<IconTheme>) -> Self {
        Self { theme }
    }

    /// Resolve a thumbnail for `path` at `size`.
    ///
    /// Image-typed files decode scaled to fit `size`×`size`; everything
    /// else (and every decode failure) resolves to a themed icon at
    /// exactly the requested size, badged when the entry is a symlink.
    pub fn resolve(&self, path: &Path, is_dir: bool, is_symlink: bool, size: IconSize) -> Thumbnail {
        let px = size.px();

        if !is_dir && is_image_type(path) {
            match decode_scaled(path, px) {
                Ok(image) => return Thumbnail::new(image, ThumbKind::Decoded),
                Err(err) => debug!(?path, %err, "image decode failed, falling back to icon"),
            }
        }

        let badge = if is_symlink {
            Some(if link_target_exists(path) {
                Badge::SymbolicLink
            } else {
                Badge::Broken
            })
        } else {
            None
        };

        let kind = if is_dir {
            IconKind::Folder
        } else {
            content_icon_kind(path)
        };

        let icon = self.theme.icon(kind, badge, px);
        Thumbnail::new((*icon).clone(), ThumbKind::Icon)
    }
}

impl Default for ThumbnailResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn is_image_type(path: &Path) -> bool {
    mime_guess::from_path(path)
        .first()
        .map(|m| m.type_() == mime::IMAGE)
        .unwrap_or(false)
}

/// Decode and scale to fit within `px`×`px`, preserving aspect ratio.
/// Sources already smaller than the target are not upscaled.
fn decode_scaled(path: &Path, px: u32) -> Result<RgbaImage> {
    let img = image::open(path)?;
    anyhow::ensure!(img.width() > 0 && img.height() > 0, "image has no pixels");

    let scaled = if img.width() <= px && img.height() <= px {
        img
    } else {
        img.resize(px, px, FilterType::CatmullRom)
    };
    Ok(scaled.to_rgba8())
}

/// Icon category for a non-image (or undecodable) entry, from the
/// path's content-type hint.
fn content_icon_kind(path: &Path) -> IconKind {
    let Some(m) = mime_guess::from_path(path).first() else {
        return IconKind::Unknown;
    };

    let top = m.type_();
    if top == mime::IMAGE {
        IconKind::Image
    } else if top == mime::TEXT {
        IconKind::Text
    } else if top == mime::AUDIO {
        IconKind::Audio
    } else if top == mime::VIDEO {
        IconKind::Video
    } else if top == mime::APPLICATION {
        match m.subtype().as_str() {
            "zip" | "gzip" | "x-tar" | "x-xz" | "x-bzip2" | "x-7z-compressed" => IconKind::Archive,
            _ => IconKind::Unknown,
        }
    } else {
        IconKind::Unknown
    }
}

/// Whether a symlink's target exists, resolving relative targets
/// against the link's own directory.
fn link_target_exists(path: &Path) -> bool {
    let Ok(target) = fs::read_link(path) else {
        return false;
    };
    if target.is_absolute() {
        target.exists()
    } else {
        path.parent()
            .map(|dir| dir.join(&target).exists())
            .unwrap_or(false)
    }
}
