//! Content-type inference for retrieved artifacts
//!
//! Artifact names carry hints that beat whatever the artifact server declares: report
//! artifacts are named `*-markdown`, `*-html` or `raw-result` but are typically served as
//! generic archives or octet streams.

/// Extension of archive-encoded artifacts (gzip-compressed tar)
pub const ARCHIVE_EXTENSION: &str = "tgz";

/// Fallback MIME type when nothing better is known
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

const NAME_HINTS: &[(&str, &str)] = &[
    ("markdown", "text/markdown"),
    ("html", "text/html"),
    ("raw-result", "application/json"),
];

const EXTENSIONS: &[(&str, &str)] = &[
    ("text/plain", "txt"),
    ("application/json", "json"),
    ("application/pdf", "pdf"),
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
];

/// Resolved MIME type plus an optional extension hint
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentType {
    /// MIME type
    pub mime_type: String,
    /// Extension without the leading dot, if the MIME type is in the table
    pub extension: Option<&'static str>,
}

/// Infer the MIME type of an artifact
///
/// First match wins: name contains `markdown`, `html`, `raw-result`; then the declared
/// content type; then `application/octet-stream`.
pub fn resolve(artifact_name: &str, declared: Option<&str>) -> ContentType {
    let hinted = NAME_HINTS
        .iter()
        .find(|(needle, _)| artifact_name.contains(needle))
        .map(|(_, mime)| (*mime).to_string());

    let mime_type = hinted
        .or_else(|| {
            declared
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());

    let extension = extension_for(&mime_type);
    ContentType {
        mime_type,
        extension,
    }
}

/// Extension for a MIME type, ignoring parameters such as `; charset=utf-8`
pub fn extension_for(mime_type: &str) -> Option<&'static str> {
    let essence = mime_type.split(';').next().unwrap_or_default().trim();
    EXTENSIONS
        .iter()
        .find(|(mime, _)| mime.eq_ignore_ascii_case(essence))
        .map(|(_, ext)| *ext)
}

/// Whether a file name carries the archive extension
pub fn is_archive(file_name: &str) -> bool {
    std::path::Path::new(file_name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
}
