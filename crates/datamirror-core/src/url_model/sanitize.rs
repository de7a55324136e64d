//! Linux-safe file name sanitization for cached archive names.

const NAME_MAX: usize = 255;

/// Sanitizes a candidate file name for use inside a cache entry.
///
/// Path separators, NUL, whitespace and control characters become `_`, runs
/// of `_` collapse to one, leading/trailing dots and underscores are trimmed
/// and the result is capped at 255 bytes (Linux NAME_MAX).
pub fn sanitize_filename_for_linux(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let c = if c == '/' || c == '\\' || c.is_control() || c.is_whitespace() {
            '_'
        } else {
            c
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    let mut take = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    trimmed[..take].to_string()
}
