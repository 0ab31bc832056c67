//! URI syntax helpers: scheme detection, relative joining and normalization.
//!
//! Three schemes are recognized:
//! - `std:` names a bundled system library (`std:core`, `std:io/part.st`).
//! - `package:` is looked up under the configured package roots.
//! - `native-ext:` names a foreign native extension and is never loaded.
//!
//! Anything else is an ordinary path, either absolute (`/proj/app.st`) or
//! relative to the directory of the referencing source.

/// Scheme of system library URIs.
pub const SYSTEM_SCHEME: &str = "std";
/// Scheme of package URIs.
pub const PACKAGE_SCHEME: &str = "package";
/// Scheme of native extension imports, recognized and skipped.
pub const NATIVE_EXT_SCHEME: &str = "native-ext";

/// Returns the scheme of `uri` if it has one.
///
/// Single-letter schemes are rejected so Windows drive letters (`C:\x`) are
/// treated as paths.
pub fn scheme(uri: &str) -> Option<&str> {
    let colon = uri.find(':')?;
    let scheme = &uri[..colon];
    if scheme.len() < 2 {
        return None;
    }
    let valid = scheme
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '+' || c == '.');
    valid.then_some(scheme)
}

/// Returns `true` if `uri` cannot be interpreted relative to another URI.
pub fn is_absolute(uri: &str) -> bool {
    scheme(uri).is_some() || uri.starts_with('/')
}

/// Returns the portion of `uri` after its scheme, or the whole string.
pub fn path_of(uri: &str) -> &str {
    match scheme(uri) {
        Some(s) => &uri[s.len() + 1..],
        None => uri,
    }
}

/// Returns the last path segment of `uri`.
pub fn last_segment(uri: &str) -> &str {
    let path = path_of(uri);
    path.rsplit('/').next().unwrap_or(path)
}

/// Resolves `relative` against the URI of the source that references it.
///
/// A bare system library URI (`std:core`) acts as its own directory, so a
/// part `x.st` of `std:core` becomes `std:core/x.st`.
pub fn join(base: &str, relative: &str) -> String {
    if is_absolute(relative) {
        return normalize(relative);
    }
    let dir = match scheme(base) {
        Some(SYSTEM_SCHEME) if !path_of(base).contains('/') => base,
        _ => match base.rfind('/') {
            Some(idx) => &base[..idx],
            None => match scheme(base) {
                Some(s) => &base[..s.len() + 1],
                None => "",
            },
        },
    };
    if dir.is_empty() {
        normalize(relative)
    } else if dir.ends_with(':') {
        normalize(&format!("{dir}{relative}"))
    } else {
        normalize(&format!("{dir}/{relative}"))
    }
}

/// Removes `.` segments and folds `..` segments where possible.
pub fn normalize(uri: &str) -> String {
    let (prefix, path) = match scheme(uri) {
        Some(s) => (&uri[..s.len() + 1], &uri[s.len() + 1..]),
        None => ("", uri),
    };
    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if rooted => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }
    let mut out = String::from(prefix);
    if rooted {
        out.push('/');
    }
    out.push_str(&segments.join("/"));
    out
}
