//! `Content-Type` helpers.

/// The media type without parameters, e.g. `multipart/form-data`.
pub fn media_type(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or_default().trim()
}

/// The `boundary` parameter, quoted or not. Parameter names are case-insensitive.
pub fn boundary(content_type: &str) -> Option<&str> {
    let lower = content_type.to_ascii_lowercase();
    let start = lower.find("boundary=")? + "boundary=".len();
    let rest = &content_type[start..];

    let boundary = match rest.strip_prefix('"') {
        Some(quoted) => &quoted[..quoted.find('"')?],
        None => rest.split(';').next().unwrap_or_default().trim(),
    };
    (!boundary.is_empty()).then_some(boundary)
}
