//! Destination file naming.

/// Name used when the upstream response omits one or it sanitises to nothing.
pub const DEFAULT_FILE_NAME: &str = "model.safetensors";

/// Reduce an upstream file name to `[A-Za-z0-9._-]`.
///
/// Path separators and other characters are dropped, so the result always
/// names a file directly inside the destination directory. Names that end up
/// empty or made only of dots fall back to [`DEFAULT_FILE_NAME`].
#[must_use]
pub fn sanitize_file_name(name: Option<&str>) -> String {
    let cleaned: String = name
        .unwrap_or_default()
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-'))
        .collect();
    if cleaned.chars().all(|ch| ch == '.') {
        DEFAULT_FILE_NAME.to_string()
    } else {
        cleaned
    }
}
