//! Raw-reference normalization.
//!
//! Operators paste whatever they have at hand: a gateway URL, a subdomain
//! host, a bare domain, or a native path. [`normalize`] turns any of those
//! into the canonical `/ipfs/...` or `/ipns/...` text form that resolution
//! works on.

use cordon_core::{CoreError, CoreResult, PathScheme};

/// Lexically cleans a slash-separated path: resolves `.` and `..`, collapses
/// duplicate slashes, drops trailing slashes.
fn clean_path(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let rooted = path.starts_with('/');
    let mut out: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if let Some(last) = out.last() {
                    if *last == ".." {
                        out.push("..");
                    } else {
                        out.pop();
                    }
                } else if !rooted {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    let joined = out.join("/");
    if rooted {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Strips the query string and fragment from a raw reference.
///
/// Applied only on the single-item block path; search/purge/unblock take the
/// reference as given. Keep that asymmetry.
pub fn sanitize(raw: &str) -> &str {
    let without_query = raw.split('?').next().unwrap_or(raw);
    without_query.split('#').next().unwrap_or(without_query)
}

/// Normalizes a raw user reference into canonical path text.
///
/// Recognized shapes, in the order they are tried:
/// - a rooted native path, which must carry `/ipfs/` or `/ipns/`;
/// - a classic gateway URL whose path carries a recognized prefix, returned
///   verbatim;
/// - a subdomain-gateway host (`<id-labels>.<ipfs|ipns>.<gateway>`), where
///   the labels before the marker re-join with dots to form the identifier;
/// - anything else is assumed to be a DNSLink-style domain and wrapped as a
///   name path.
pub fn normalize(raw: &str) -> CoreResult<String> {
    let input = raw.strip_prefix("http://").unwrap_or(raw);
    let input = input.strip_prefix("https://").unwrap_or(input);
    let cleaned = clean_path(input);
    let input = match cleaned.find('#') {
        Some(idx) => &cleaned[..idx],
        None => cleaned.as_str(),
    };

    if input.starts_with('/') {
        if input.starts_with("/ipfs/") || input.starts_with("/ipns/") {
            return Ok(input.to_string());
        }
        return Err(CoreError::InvalidReference {
            reason: "direct path given, but path doesn't start with /ipfs/ or /ipns/".to_string(),
        });
    }

    let host = input.split('/').next().unwrap_or(input);
    let hostname = host.split(':').next().unwrap_or(host);

    // Classic gateway access: the URL path already names the content.
    let path = &input[host.len()..];
    if path.starts_with("/ipfs/") || path.starts_with("/ipns/") {
        return Ok(path.to_string());
    }

    // Subdomain gateway access. Identifiers too long for one DNS label are
    // split across several, so everything before the marker is re-joined.
    let labels: Vec<&str> = hostname.split('.').collect();
    let n = labels.len();
    if n >= 4 {
        if let Some(scheme) = PathScheme::from_keyword(labels[n - 3]) {
            let id = labels[..n - 3].join(".");
            return Ok(format!("{}/{}{}", scheme.prefix(), id, path));
        }
    }

    // A domain CNAME'd to a gateway, or an invalid reference we cannot tell
    // apart from one without knowing the gateway's own hostnames.
    Ok(clean_path(&format!("/ipns/{}", input)))
}
