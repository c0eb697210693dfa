/// Join `root` and `rest` into one slash-separated path and clean it: empty
/// and `.` elements are dropped, `..` removes the previous element, and the
/// result never ends in a slash unless it is the root itself.
pub fn join_path(root: &str, rest: &str) -> String {
    let absolute = root.starts_with('/') || (root.is_empty() && rest.starts_with('/'));
    let mut parts: Vec<&str> = Vec::new();

    for part in root.split('/').chain(rest.split('/')) {
        match part {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() && !absolute {
                    parts.push("..");
                }
            }
            _ => parts.push(part),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Truncates a string to max_chars characters, appending "..." if truncated.
/// Safe for UTF-8 multi-byte characters.
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let truncate_at = max_chars.saturating_sub(3);
        let byte_index = s
            .char_indices()
            .nth(truncate_at)
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        format!("{}...", &s[..byte_index])
    }
}
