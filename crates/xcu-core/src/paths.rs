//! POSIX `basename`/`dirname` on raw path bytes.
//!
//! Both functions return a subslice of their input or a static `"."`/`"/"`,
//! and never allocate. Rules follow the XPG `basename` and `dirname` found
//! in glibc's `<libgen.h>`, including the special case of exactly two
//! leading slashes in `dirname`.

use std::borrow::Cow;
use std::path::Path;

use crate::config::PathsConfig;
use crate::error::{Result, XcuError};

/// Size of the working buffer a path is copied into, terminator included.
pub const PATH_MAX: usize = 4096;

/// Last component of `path`, with trailing slashes ignored.
pub fn basename(path: &[u8]) -> &[u8] {
    if path.is_empty() {
        return b".";
    }

    let trimmed_len = path.len() - path.iter().rev().take_while(|&&b| b == b'/').count();
    if trimmed_len == 0 {
        // Only slashes.
        return b"/";
    }

    let trimmed = &path[..trimmed_len];
    match trimmed.iter().rposition(|&b| b == b'/') {
        Some(slash) => &trimmed[slash + 1..],
        None => trimmed,
    }
}

/// Everything before the last component of `path`.
pub fn dirname(path: &[u8]) -> &[u8] {
    let Some(mut last_slash) = path.iter().rposition(|&b| b == b'/') else {
        return b".";
    };

    if last_slash != 0 && last_slash + 1 == path.len() {
        // Trailing slashes: skip them and look for the slash before the last component.
        let run_start = start_of_slash_run(path, last_slash);
        if run_start != 0 {
            match path[..run_start].iter().rposition(|&b| b == b'/') {
                Some(i) => last_slash = i,
                None => return b".",
            }
        }
    }

    let run_start = start_of_slash_run(path, last_slash);
    if run_start == 0 {
        // Exactly "//" at the start is implementation-defined and kept as is.
        if last_slash == 1 { &path[..2] } else { &path[..1] }
    } else {
        &path[..run_start]
    }
}

fn start_of_slash_run(path: &[u8], mut i: usize) -> usize {
    while i > 0 && path[i - 1] == b'/' {
        i -= 1;
    }
    i
}

/// Cut raw argument bytes the way a fixed C buffer would see them: stop at
/// the first NUL, then keep at most `max_len` bytes.
pub fn truncate(raw: &[u8], max_len: usize) -> &[u8] {
    let raw = match raw.iter().position(|&b| b == 0) {
        Some(nul) => &raw[..nul],
        None => raw,
    };
    &raw[..raw.len().min(max_len)]
}

/// Apply `limits` to a path argument.
///
/// Over-long input is truncated, or rejected when `strict_length` is set.
pub fn prepare<'a>(raw: &'a [u8], limits: &PathsConfig) -> Result<&'a [u8]> {
    let full = truncate(raw, usize::MAX);
    if full.len() > limits.max_len {
        if limits.strict_length {
            return Err(XcuError::PathTooLong {
                len: full.len(),
                max: limits.max_len,
            });
        }
        tracing::debug!("path of {} bytes truncated to {}", full.len(), limits.max_len);
    }
    Ok(&full[..full.len().min(limits.max_len)])
}

/// View path bytes as a filesystem path.
#[cfg(unix)]
pub fn as_path(bytes: &[u8]) -> Cow<'_, Path> {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    Cow::Borrowed(Path::new(OsStr::from_bytes(bytes)))
}

/// View path bytes as a filesystem path.
#[cfg(not(unix))]
pub fn as_path(bytes: &[u8]) -> Cow<'_, Path> {
    match String::from_utf8_lossy(bytes) {
        Cow::Borrowed(s) => Cow::Borrowed(Path::new(s)),
        Cow::Owned(s) => Cow::Owned(s.into()),
    }
}
