//! Assembly of `.wastickers` bundles out of source items.

mod archive;
mod assembler;

#[cfg(test)]
pub(crate) mod testing;

use crate::prelude::*;
use crate::util::path::Utf8TempDir;

pub(crate) use archive::{Archiver, ZipArchiver};
pub(crate) use assembler::PackAssembler;

/// Name used when nothing is left of the title after sanitizing
const FALLBACK_NAME: &str = "sticker_pack";

const MAX_NAME_CHARS: usize = 50;

/// A single `.wastickers` archive ready for delivery.
///
/// The archive lives in a temporary directory owned by the bundle,
/// so it is removed from disk once the bundle is dropped.
#[derive(Debug)]
pub(crate) struct OutputBundle {
    pub(crate) path: Utf8PathBuf,
    pub(crate) title: String,
    pub(crate) author: String,
    pub(crate) sticker_count: usize,

    /// Size of the archive in bytes
    pub(crate) size: u64,

    _dir: Utf8TempDir,
}

/// Makes the title usable as a file name on any file system.
pub(crate) fn sanitize_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = replaced
        .trim_matches(|c: char| c.is_whitespace() || c == '.')
        .chars()
        .take(MAX_NAME_CHARS)
        .collect::<String>();

    if trimmed.is_empty() {
        return FALLBACK_NAME.to_owned();
    }

    trimmed
}

/// Number of bundles needed to hold all the items
pub(crate) fn bundle_count(items: usize, max_per_bundle: usize) -> usize {
    items.div_ceil(max_per_bundle.max(1))
}

/// Bundles get a running number suffix only when the pack is split
pub(crate) fn bundle_title(title: &str, index: usize, count: usize) -> String {
    if count > 1 {
        format!("{title} {}", index + 1)
    } else {
        title.to_owned()
    }
}
