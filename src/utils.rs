//! URL and header helpers shared by the submitters, the watch source and the fetcher

use url::Url;

/// Extract the file name from a `Content-Disposition` header value
///
/// Handles both `filename="bundle.tgz"` and the RFC 5987 form
/// `filename*=UTF-8''bundle%20v2.tgz`. The extended form wins when both are present.
/// Any directory components are stripped.
pub fn filename_from_content_disposition(value: &str) -> Option<String> {
    let mut plain = None;

    for part in value.split(';') {
        let part = part.trim();
        if let Some(encoded) = part.strip_prefix("filename*=") {
            // charset'lang'encoded-filename
            let encoded = encoded.rsplit('\'').next().unwrap_or(encoded);
            if let Ok(decoded) = urlencoding::decode(encoded.trim_matches('"'))
                && let Some(name) = base_name(&decoded)
            {
                return Some(name);
            }
        } else if let Some(raw) = part.strip_prefix("filename=") {
            plain = base_name(raw.trim_matches('"'));
        }
    }

    plain
}

fn base_name(name: &str) -> Option<String> {
    let name = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Lower-cased extension of a file name, without the dot
pub fn extension_of(file_name: &str) -> Option<String> {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// Substitute `{key}` placeholders in a path template
///
/// Values are percent-encoded so they always land in a single path segment.
/// Placeholders without a value are left in place.
pub fn render_template(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{}}}", key), &urlencoding::encode(value))
    })
}

/// Join a base URL and an absolute path, keeping any path prefix of the base
///
/// `join_url("http://host/api/", "/execution/1")` is `http://host/api/execution/1`,
/// unlike [`Url::join`] which would drop `/api`.
pub fn join_url(base: &str, path: &str) -> Result<Url, url::ParseError> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined)
}
