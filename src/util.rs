use std::time::Duration;

pub(crate) fn retriable_status(code: u16) -> bool {
    matches!(code, 500 | 502 | 503 | 504 | 429 | 408)
}

pub(crate) fn backoff(current: Duration, max: Duration) -> Duration {
    let next = Duration::from_secs_f64((current.as_secs_f64() * 1.5).max(1.0));
    if next > max { max } else { next }
}

pub(crate) fn urljoin(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Returns the first parenthesized clause of `message`, if any.
///
/// GENESIS signals a partial match by appending a parenthesized remark to an
/// otherwise successful status message.
pub(crate) fn paren_clause(message: &str) -> Option<&str> {
    let open = message.find('(')?;
    let rest = &message[open + 1..];
    let close = rest.find(')')?;
    Some(&rest[..close])
}
