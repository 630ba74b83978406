//! Canonical directory paths.
//!
//! Object keys are flat strings such as `a/b/file.txt`. Directory paths in a
//! [`Tree`](crate::Tree) always start with `/` and never end with one, except
//! the root which is exactly `/`. Empty segments (`a//b`) are dropped.

use compact_str::CompactString;

/// Path of the root directory.
pub const ROOT: &str = "/";

/// Normalize a directory path or key prefix to its canonical form.
///
/// `""`, `"/"` and `"//"` all map to `/`; `"a/b/"` maps to `/a/b`.
pub fn normalize(path: &str) -> CompactString {
    let mut out = CompactString::default();
    for segment in segments(path) {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Iterate over the non-empty segments of a path.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Split a key or path at its last `/` into `(directory, name)`.
///
/// The directory is normalized; the name may be empty when the input ends
/// with `/` (a directory marker).
pub fn split(key: &str) -> (CompactString, &str) {
    match key.rfind('/') {
        Some(idx) => (normalize(&key[..idx]), &key[idx + 1..]),
        None => (CompactString::from(ROOT), key),
    }
}

/// Join a canonical directory path with a child name.
pub fn join(parent: &str, name: &str) -> CompactString {
    let mut out = CompactString::from(parent);
    if !out.ends_with('/') {
        out.push('/');
    }
    out.push_str(name);
    out
}

/// Parent of a canonical directory path; `None` for the root.
pub fn parent(path: &str) -> Option<&str> {
    if path == ROOT {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some(ROOT),
        Some(idx) => Some(&path[..idx]),
        None => Some(ROOT),
    }
}

/// Final segment of a canonical directory path (`/` for the root).
pub fn base_name(path: &str) -> &str {
    segments(path).last().unwrap_or(ROOT)
}

/// Every ancestor of a canonical directory path, from the root's first child
/// down to the path itself, as `(parent, name, path)` triples.
///
/// The root itself is not yielded.
pub fn ancestors(path: &str) -> Vec<(CompactString, &str, CompactString)> {
    let mut out = Vec::new();
    let mut current = CompactString::from(ROOT);
    for name in segments(path) {
        let next = join(&current, name);
        out.push((current, name, next.clone()));
        current = next;
    }
    out
}
