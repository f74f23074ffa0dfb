//! Sequential navigation between a directory's files.
//!
//! Backs the viewer's forward/back controls, scroll-wheel stepping and
//! the slideshow tick: the neighbor of the current image among its
//! directory's regular files in collation order, wrapping at the end.
//! Hidden files are browsable here even though the grid hides them.

use std::path::{Path, PathBuf};

use lexical_sort::natural_lexical_cmp;
use tracing::warn;
use walkdir::WalkDir;

use crate::lister::{unreadable, ListError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Back,
}

/// Parent directory of `path`, for the "up" control.
pub fn parent(path: &Path) -> Option<PathBuf> {
    path.parent().map(Path::to_path_buf)
}

/// The file after `current` among its directory's regular files, in
/// collation order (reversed for [`Direction::Back`]), wrapping to the
/// first. `None` when the directory holds no regular files. A vanished
/// `current` restarts at the front.
pub fn neighbor(current: &Path, direction: Direction) -> Result<Option<PathBuf>, ListError> {
    let Some(dir) = current.parent() else {
        return Ok(None);
    };

    let mut files = regular_files(dir)?;
    if files.is_empty() {
        return Ok(None);
    }

    files.sort_by(|a, b| natural_lexical_cmp(&name_of(a), &name_of(b)));
    if direction == Direction::Back {
        files.reverse();
    }

    match files.iter().position(|f| f == current) {
        Some(pos) if pos + 1 < files.len() => Ok(Some(files[pos + 1].clone())),
        _ => Ok(files.first().cloned()),
    }
}

fn name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn regular_files(dir: &Path) -> Result<Vec<PathBuf>, ListError> {
    let mut files = Vec::new();
    for item in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
    {
        match item {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(err) if err.depth() == 0 => return Err(unreadable(dir, err)),
            Err(err) => warn!(%err, "skipping unreadable entry"),
        }
    }
    Ok(files)
}
