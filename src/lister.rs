//! Directory listing for the thumbnail grid.
//!
//! - Immediate children only, hidden names excluded
//! - One metadata query per child, symlinks never followed
//! - Directories first, then collation order of display names

use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use lexical_sort::natural_lexical_cmp;
use thiserror::Error;
use tracing::warn;
use walkdir::WalkDir;

use crate::models::Entry;

/// Listing failure surfaced to the collaborator as a warning dialog.
#[derive(Debug, Error)]
pub enum ListError {
    /// The directory could not be opened at all: missing path,
    /// permission denied, or not a directory.
    #[error("cannot read directory {path:?}: {source}")]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ListError {
    /// The system error text shown in the dialog.
    pub fn system_message(&self) -> String {
        match self {
            ListError::DirectoryUnreadable { source, .. } => source.to_string(),
        }
    }
}

pub(crate) fn unreadable(dir: &Path, err: walkdir::Error) -> ListError {
    ListError::DirectoryUnreadable {
        path: dir.to_path_buf(),
        source: err
            .into_io_error()
            .unwrap_or_else(|| io::Error::other("directory walk failed")),
    }
}

/// List a directory's immediate, non-hidden children in grid order.
///
/// Children that cannot be stat'd are skipped with a warning; only a
/// failure to open the directory itself is an error.
pub fn list_directory(dir: &Path) -> Result<Vec<Entry>, ListError> {
    let meta = fs::metadata(dir).map_err(|source| ListError::DirectoryUnreadable {
        path: dir.to_path_buf(),
        source,
    })?;
    if !meta.is_dir() {
        return Err(ListError::DirectoryUnreadable {
            path: dir.to_path_buf(),
            source: io::Error::other("Not a directory"),
        });
    }

    let mut entries = Vec::new();
    for item in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
    {
        let child = match item {
            Ok(child) => child,
            Err(err) => {
                if err.depth() == 0 {
                    return Err(unreadable(dir, err));
                }
                warn!(%err, "skipping unreadable entry");
                continue;
            }
        };

        let name = child.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }

        let file_type = child.file_type();
        entries.push(Entry::new(
            child.into_path(),
            name,
            file_type.is_dir(),
            file_type.is_symlink(),
        ));
    }

    sort_entries(&mut entries);
    Ok(entries)
}

/// Directories before files; collation order of display names within
/// each group, so numeric and accented names sort naturally.
pub fn sort_entries(entries: &mut [Entry]) {
    entries.sort_by(compare_entries);
}

fn compare_entries(a: &Entry, b: &Entry) -> Ordering {
    match (a.is_dir(), b.is_dir()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => natural_lexical_cmp(a.display_name(), b.display_name()),
    }
}
