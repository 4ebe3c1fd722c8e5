//! URL path to filesystem target.

use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Any of the owner, group or other execute bits.
const EXECUTE_BITS: u32 = 0o111;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    NotFound,
    /// The path named a directory; `ResolvedTarget::path` already points at
    /// its index document, which may or may not exist.
    Directory,
    StaticFile,
    Executable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub path: PathBuf,
    pub kind: TargetKind,
}

/// Maps `url_path` onto `document_root` and classifies what is there.
///
/// The two are joined by plain concatenation, so `url_path` is expected to
/// start with `/`. A trailing `/` gets `index` appended before the lookup.
/// Any stat failure counts as not found.
pub async fn resolve(
    document_root: &Path,
    index: &str,
    url_path: impl AsRef<OsStr>,
) -> ResolvedTarget {
    let url_path = url_path.as_ref();
    let mut joined: OsString = document_root.as_os_str().to_owned();
    joined.push(url_path);
    if url_path.as_bytes().ends_with(b"/") {
        joined.push(index);
    }
    let mut path = PathBuf::from(joined);

    let metadata = match tokio::fs::metadata(&path).await {
        Ok(metadata) => metadata,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "stat failed");
            return ResolvedTarget {
                path,
                kind: TargetKind::NotFound,
            };
        }
    };

    let kind = if metadata.is_dir() {
        path.push(index);
        TargetKind::Directory
    } else if metadata.permissions().mode() & EXECUTE_BITS != 0 {
        TargetKind::Executable
    } else {
        TargetKind::StaticFile
    };

    ResolvedTarget { path, kind }
}
