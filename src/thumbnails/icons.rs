//! Built-in icon rendering for entries without a decodable image.
//!
//! A headless core has no desktop icon theme to query, so the handful
//! of categories the grid needs are rendered procedurally at the
//! requested size and memoized in an LRU cache.

use std::num::NonZeroUsize;
use std::sync::Arc;

use image::{imageops, Rgba, RgbaImage};
use lru::LruCache;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

/// Icon categories the resolver can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IconKind {
    Folder,
    Image,
    Text,
    Audio,
    Video,
    Archive,
    Unknown,
}

/// Emblem composited onto an icon for symlinked entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Badge {
    /// Link whose target exists.
    SymbolicLink,
    /// Dangling link.
    Broken,
}

/// Rendered icons cached by (kind, badge, size).
const CACHE_CAPACITY: usize = 64;

static SHARED_THEME: Lazy<Arc<IconTheme>> = Lazy::new(|| Arc::new(IconTheme::new()));

pub struct IconTheme {
    cache: Mutex<LruCache<(IconKind, Option<Badge>, u32), Arc<RgbaImage>>>,
}

impl IconTheme {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(CACHE_CAPACITY).expect("nonzero cache capacity"),
            )),
        }
    }

    /// Process-wide theme shared by all resolvers.
    pub fn shared() -> Arc<IconTheme> {
        SHARED_THEME.clone()
    }

    /// Look up (or render) an icon at exactly `px`×`px`.
    pub fn icon(&self, kind: IconKind, badge: Option<Badge>, px: u32) -> Arc<RgbaImage> {
        let px = px.max(8);
        let key = (kind, badge, px);
        if let Some(hit) = self.cache.lock().get(&key) {
            return hit.clone();
        }

        let mut icon = render_base(kind, px);
        if let Some(badge) = badge {
            composite_badge(&mut icon, badge);
        }
        let icon = Arc::new(icon);
        self.cache.lock().put(key, icon.clone());
        icon
    }
}

impl Default for IconTheme {
    fn default() -> Self {
        Self::new()
    }
}

const FOLDER_BODY: Rgba<u8> = Rgba([232, 163, 61, 255]);
const FOLDER_TAB: Rgba<u8> = Rgba([209, 139, 42, 255]);
const PAGE: Rgba<u8> = Rgba([245, 245, 245, 255]);
const PAGE_LINE: Rgba<u8> = Rgba([176, 176, 176, 255]);
const IMAGE_SKY: Rgba<u8> = Rgba([120, 158, 201, 255]);
const IMAGE_SUN: Rgba<u8> = Rgba([240, 220, 130, 255]);
const IMAGE_HILL: Rgba<u8> = Rgba([86, 128, 92, 255]);
const AUDIO_DISC: Rgba<u8> = Rgba([142, 110, 180, 255]);
const AUDIO_BAR: Rgba<u8> = Rgba([235, 231, 241, 255]);
const VIDEO_STRIP: Rgba<u8> = Rgba([70, 70, 78, 255]);
const VIDEO_HOLE: Rgba<u8> = Rgba([214, 214, 220, 255]);
const ARCHIVE_BOX: Rgba<u8> = Rgba([164, 126, 89, 255]);
const ARCHIVE_BAND: Rgba<u8> = Rgba([120, 90, 62, 255]);
const UNKNOWN_DOT: Rgba<u8> = Rgba([130, 130, 130, 255]);
const BADGE_LINK: Rgba<u8> = Rgba([68, 112, 186, 255]);
const BADGE_ERROR: Rgba<u8> = Rgba([186, 62, 54, 255]);
const BADGE_GLYPH: Rgba<u8> = Rgba([250, 250, 250, 255]);

fn render_base(kind: IconKind, px: u32) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(px, px, Rgba([0, 0, 0, 0]));
    match kind {
        IconKind::Folder => {
            fill_frect(&mut img, 0.08, 0.14, 0.48, 0.30, FOLDER_TAB);
            fill_frect(&mut img, 0.08, 0.24, 0.92, 0.86, FOLDER_BODY);
        }
        IconKind::Image => {
            fill_frect(&mut img, 0.10, 0.14, 0.90, 0.86, IMAGE_SKY);
            fill_fcircle(&mut img, 0.34, 0.36, 0.10, IMAGE_SUN);
            fill_ftriangle(&mut img, 0.10, 0.86, 0.90, IMAGE_HILL);
        }
        IconKind::Text => {
            page(&mut img);
            for row in 0..4 {
                let y = 0.30 + row as f32 * 0.14;
                fill_frect(&mut img, 0.28, y, 0.72, y + 0.05, PAGE_LINE);
            }
        }
        IconKind::Audio => {
            fill_fcircle(&mut img, 0.50, 0.50, 0.38, AUDIO_DISC);
            for (i, h) in [0.16f32, 0.26, 0.20].iter().enumerate() {
                let x = 0.38 + i as f32 * 0.12;
                fill_frect(&mut img, x, 0.50 - h, x + 0.06, 0.50 + h, AUDIO_BAR);
            }
        }
        IconKind::Video => {
            fill_frect(&mut img, 0.08, 0.22, 0.92, 0.78, VIDEO_STRIP);
            for i in 0..4 {
                let x = 0.12 + i as f32 * 0.20;
                fill_frect(&mut img, x, 0.26, x + 0.10, 0.34, VIDEO_HOLE);
                fill_frect(&mut img, x, 0.66, x + 0.10, 0.74, VIDEO_HOLE);
            }
        }
        IconKind::Archive => {
            fill_frect(&mut img, 0.14, 0.18, 0.86, 0.86, ARCHIVE_BOX);
            fill_frect(&mut img, 0.14, 0.34, 0.86, 0.46, ARCHIVE_BAND);
            fill_frect(&mut img, 0.44, 0.18, 0.56, 0.34, ARCHIVE_BAND);
        }
        IconKind::Unknown => {
            page(&mut img);
            for i in 0..3 {
                let x = 0.34 + i as f32 * 0.14;
                fill_fcircle(&mut img, x, 0.56, 0.04, UNKNOWN_DOT);
            }
        }
    }
    img
}

/// White page with a folded top-right corner.
fn page(img: &mut RgbaImage) {
    fill_frect(img, 0.20, 0.10, 0.80, 0.90, PAGE);
    fill_ftriangle_tr(img, 0.66, 0.10, 0.80, 0.24, PAGE_LINE);
}

fn composite_badge(icon: &mut RgbaImage, badge: Badge) {
    let px = icon.width();
    let badge_px = (px / 3).max(8);
    let mut tile = RgbaImage::from_pixel(
        badge_px,
        badge_px,
        match badge {
            Badge::SymbolicLink => BADGE_LINK,
            Badge::Broken => BADGE_ERROR,
        },
    );
    match badge {
        // diagonal arrow, lower-left to upper-right
        Badge::SymbolicLink => {
            fill_fline(&mut tile, 0.25, 0.75, 0.75, 0.25, 0.12, BADGE_GLYPH);
            fill_frect(&mut tile, 0.55, 0.20, 0.80, 0.32, BADGE_GLYPH);
            fill_frect(&mut tile, 0.68, 0.20, 0.80, 0.45, BADGE_GLYPH);
        }
        // exclamation mark
        Badge::Broken => {
            fill_frect(&mut tile, 0.44, 0.18, 0.56, 0.60, BADGE_GLYPH);
            fill_frect(&mut tile, 0.44, 0.70, 0.56, 0.82, BADGE_GLYPH);
        }
    }

    let offset = i64::from(px - badge_px);
    imageops::overlay(icon, &tile, offset, offset);
}

fn span(px: u32, f: f32) -> i64 {
    (px as f32 * f).round() as i64
}

fn fill_frect(img: &mut RgbaImage, x0: f32, y0: f32, x1: f32, y1: f32, color: Rgba<u8>) {
    let (w, h) = (img.width(), img.height());
    let (x0, y0) = (span(w, x0).max(0), span(h, y0).max(0));
    let (x1, y1) = (span(w, x1).min(w as i64), span(h, y1).min(h as i64));
    for y in y0..y1 {
        for x in x0..x1 {
            img.put_pixel(x as u32, y as u32, color);
        }
    }
}

fn fill_fcircle(img: &mut RgbaImage, cx: f32, cy: f32, r: f32, color: Rgba<u8>) {
    let (w, h) = (img.width() as i64, img.height() as i64);
    let (cx, cy, r) = (
        span(img.width(), cx),
        span(img.height(), cy),
        span(img.width(), r).max(1),
    );
    for y in (cy - r).max(0)..(cy + r + 1).min(h) {
        for x in (cx - r).max(0)..(cx + r + 1).min(w) {
            let (dx, dy) = (x - cx, y - cy);
            if dx * dx + dy * dy <= r * r {
                img.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

/// Isosceles triangle with a horizontal base at `base_y`, apex centered
/// between `x0` and `x1`.
fn fill_ftriangle(img: &mut RgbaImage, x0: f32, base_y: f32, x1: f32, color: Rgba<u8>) {
    let w = img.width();
    let (ix0, ix1) = (span(w, x0), span(w, x1));
    let base = span(img.height(), base_y);
    let apex = span(img.height(), base_y - (x1 - x0) * 0.5);
    let mid = (ix0 + ix1) / 2;
    for y in apex.max(0)..base.min(img.height() as i64) {
        let t = (y - apex) as f32 / (base - apex).max(1) as f32;
        let half = ((mid - ix0) as f32 * t) as i64;
        for x in (mid - half).max(0)..(mid + half).min(w as i64) {
            img.put_pixel(x as u32, y as u32, color);
        }
    }
}

/// Right triangle filling the top-right of the given box (page fold).
fn fill_ftriangle_tr(img: &mut RgbaImage, x0: f32, y0: f32, x1: f32, y1: f32, color: Rgba<u8>) {
    let w = img.width();
    let (ix0, iy0) = (span(w, x0), span(img.height(), y0));
    let (ix1, iy1) = (span(w, x1), span(img.height(), y1));
    let side = (ix1 - ix0).min(iy1 - iy0).max(1);
    for dy in 0..side {
        for dx in dy..side {
            let (x, y) = (ix0 + dx, iy0 + dy);
            if x >= 0 && y >= 0 && (x as u32) < w && (y as u32) < img.height() {
                img.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

fn fill_fline(img: &mut RgbaImage, x0: f32, y0: f32, x1: f32, y1: f32, thickness: f32, color: Rgba<u8>) {
    let w = img.width();
    let steps = w.max(img.height()) * 2;
    let half = (span(w, thickness) / 2).max(1) as f32;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        let fx = (x0 + (x1 - x0) * t) * w as f32;
        let fy = (y0 + (y1 - y0) * t) * img.height() as f32;
        fill_px_square(img, fx, fy, half, color);
    }
}

fn fill_px_square(img: &mut RgbaImage, cx: f32, cy: f32, half: f32, color: Rgba<u8>) {
    let (w, h) = (img.width() as i64, img.height() as i64);
    for y in ((cy - half) as i64).max(0)..((cy + half) as i64 + 1).min(h) {
        for x in ((cx - half) as i64).max(0)..((cx + half) as i64 + 1).min(w) {
            img.put_pixel(x as u32, y as u32, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opaque_pixels(img: &RgbaImage) -> usize {
        img.pixels().filter(|p| p.0[3] > 0).count()
    }

    #[test]
    fn test_icons_have_exact_size() {
        let theme = IconTheme::new();
        for kind in [
            IconKind::Folder,
            IconKind::Image,
            IconKind::Text,
            IconKind::Audio,
            IconKind::Video,
            IconKind::Archive,
            IconKind::Unknown,
        ] {
            for px in [24, 48, 128, 256] {
                let icon = theme.icon(kind, None, px);
                assert_eq!((icon.width(), icon.height()), (px, px));
                assert!(opaque_pixels(&icon) > 0, "{kind:?} at {px}px rendered empty");
            }
        }
    }

    #[test]
    fn test_lookup_is_memoized() {
        let theme = IconTheme::new();
        let a = theme.icon(IconKind::Folder, None, 64);
        let b = theme.icon(IconKind::Folder, None, 64);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_badge_changes_pixels() {
        let theme = IconTheme::new();
        let plain = theme.icon(IconKind::Text, None, 64);
        let linked = theme.icon(IconKind::Text, Some(Badge::SymbolicLink), 64);
        let broken = theme.icon(IconKind::Text, Some(Badge::Broken), 64);

        assert_ne!(plain.as_raw(), linked.as_raw());
        assert_ne!(linked.as_raw(), broken.as_raw());
        assert_eq!(linked.width(), 64);
    }

    #[test]
    fn test_tiny_sizes_clamped() {
        let theme = IconTheme::new();
        let icon = theme.icon(IconKind::Unknown, Some(Badge::Broken), 1);
        assert_eq!(icon.width(), 8);
    }
}
