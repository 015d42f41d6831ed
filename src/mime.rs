//! File extension to media type mapping.

/// The media type for a file extension, used by the file response.
///
/// Unknown extensions fall back to `application/octet-stream`.
pub fn from_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "html" => "text/html",
        "txt" => "text/plain",
        "jpg" => "image/jpeg",
        "css" => "text/css",
        "js" => "text/javascript",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

/// The media type for a path, taken from its extension.
pub fn from_path(path: &std::path::Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(from_extension)
        .unwrap_or("application/octet-stream")
}

#[cfg(test)]
mod tests {
    use super::{from_extension, from_path};
    use std::path::Path;

    #[test]
    fn known_and_unknown_extensions() {
        assert_eq!(from_extension("html"), "text/html");
        assert_eq!(from_extension("JS"), "text/javascript");
        assert_eq!(from_extension("wasm"), "application/octet-stream");
        assert_eq!(from_path(Path::new("/srv/www/index.html")), "text/html");
        assert_eq!(from_path(Path::new("README")), "application/octet-stream");
    }
}
