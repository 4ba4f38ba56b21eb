//! Result locator: finds acquisition output in a workspace
//!
//! The acquisition tool exiting 0 does not mean it produced the requested
//! output, so the workspace is inspected after every run. Playlist entries
//! are ordered by the numeric position token the filename starts with, not by
//! plain string comparison, so playlists of ten or more items archive in
//! playlist order regardless of zero padding.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// List the files in `workspace` carrying `extension`, in archive order
///
/// Ordering is numeric-aware on the leading filename token: `10 - b.mp4`
/// sorts after `9 - a.mp4`. Files without a numeric prefix sort after the
/// prefixed ones, lexically among themselves.
pub fn locate(workspace: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut matches = Vec::new();
    for entry in std::fs::read_dir(workspace)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        let matched = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if matched {
            matches.push(path);
        }
    }

    matches.sort_by(|a, b| {
        let (an, af) = sort_key(a);
        let (bn, bf) = sort_key(b);
        match (an, bn) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| af.cmp(bf)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => af.cmp(bf),
        }
    });

    tracing::debug!(?workspace, extension, count = matches.len(), "located output files");
    Ok(matches)
}

/// Locate exactly one file carrying `extension`
///
/// Zero matches is [`Error::NoOutput`]; more than one is
/// [`Error::AmbiguousOutput`] (e.g. a partially merged video+audio artifact
/// pair) rather than an arbitrary pick.
pub fn locate_single(workspace: &Path, extension: &str) -> Result<PathBuf> {
    let mut matches = locate(workspace, extension)?;
    match matches.len() {
        0 => Err(Error::NoOutput {
            extension: extension.to_string(),
        }),
        1 => Ok(matches.remove(0)),
        count => Err(Error::AmbiguousOutput { count }),
    }
}

/// Locate at least one file carrying `extension`
pub fn locate_many(workspace: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let matches = locate(workspace, extension)?;
    if matches.is_empty() {
        return Err(Error::NoOutput {
            extension: extension.to_string(),
        });
    }
    Ok(matches)
}

/// Split a path into (leading numeric token, full filename) for ordering
fn sort_key(path: &Path) -> (Option<u64>, &str) {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let digits: &str = {
        let end = name
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map_or(name.len(), |(i, _)| i);
        &name[..end]
    };
    (digits.parse().ok(), name)
}
