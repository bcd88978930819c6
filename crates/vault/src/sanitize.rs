//! Request path sanitization.
//!
//! First stage of the pipeline: turn the raw, untrusted query value into a
//! string that contains no traversal material. Sanitization never fails;
//! grammar enforcement happens afterwards in [`crate::validate`].

/// Sanitize the raw `file` query parameter.
///
/// Steps, in order:
/// 1. Strip every backslash.
/// 2. Remove literal `".."` and `"./"` substrings repeatedly until neither
///    occurs. A single pass is not enough: removing one occurrence can
///    join surrounding characters into a new one (`"..././"`, `".\\."`).
/// 3. Strip leading slashes.
/// 4. If the result is empty or ends in `/`, append `index.html`.
pub fn sanitize_request_path(raw: Option<&str>) -> String {
    let mut path = raw.unwrap_or("").replace('\\', "");

    loop {
        let next = path.replace("..", "").replace("./", "");
        if next == path {
            break;
        }
        path = next;
    }

    let mut path = path.trim_start_matches('/').to_string();

    if path.is_empty() || path.ends_with('/') {
        path.push_str("index.html");
    }

    path
}
