//! File and folder naming for downloaded media.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Extension used when the media URL carries none.
pub const FALLBACK_EXTENSION: &str = ".jpg";

/// Folder name used when an album has neither a caption nor a usable slug.
const FALLBACK_FOLDER: &str = "album";

#[allow(clippy::expect_used)]
static TRAILING_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\d+$").expect("trailing number regex is valid"));

/// Builds the on-disk name of one media item: sanitized caption plus the URL's extension.
///
/// Falls back to the URL's last path segment when the caption sanitizes to nothing.
#[must_use]
pub fn media_filename(caption: &str, url: &str) -> String {
    let extension = extension_from_url(url).unwrap_or_else(|| FALLBACK_EXTENSION.to_string());
    let stem = sanitize_filename(caption);

    if stem.is_empty() {
        return Url::parse(url)
            .ok()
            .and_then(|u| fallback_filename_from_url(&u))
            .map_or_else(
                || format!("download{extension}"),
                |name| with_extension(&name, &extension),
            );
    }
    with_extension(&stem, &extension)
}

/// Builds the album's folder name from its lead caption.
///
/// The per-photo counter that the site appends to captions (`"Title 1"`) is
/// stripped. Falls back to `slug`, then to a fixed name.
#[must_use]
pub fn album_folder_name(lead_caption: Option<&str>, slug: Option<&str>) -> String {
    lead_caption
        .map(|caption| sanitize_filename(&TRAILING_NUMBER_RE.replace(caption.trim(), "")))
        .filter(|name| !name.is_empty())
        .or_else(|| slug.map(sanitize_filename).filter(|name| !name.is_empty()))
        .unwrap_or_else(|| FALLBACK_FOLDER.to_string())
}

/// Removes characters that are invalid on common filesystems:
/// `/ \ : * ? " < > |` and control characters.
///
/// Dot-only names collapse to the empty string, so callers must supply a fallback.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .filter(|c| !c.is_control())
        .collect();
    // Windows drops trailing dots and spaces silently.
    sanitized
        .trim_start()
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace())
        .to_string()
}

pub(crate) fn extension_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last_segment = parsed.path_segments()?.next_back()?;
    let dot_index = last_segment.rfind('.')?;
    let ext = &last_segment[dot_index..];
    if ext.len() <= 1 || ext.len() > 6 || !ext[1..].chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Last path segment of `url`, sanitized, or `None` when empty.
pub(crate) fn fallback_filename_from_url(url: &Url) -> Option<String> {
    let last = url.path_segments()?.next_back()?;
    let name = sanitize_filename(last);
    (!name.is_empty()).then_some(name)
}

fn with_extension(stem: &str, extension: &str) -> String {
    if stem.to_lowercase().ends_with(extension) {
        stem.to_string()
    } else {
        format!("{stem}{extension}")
    }
}
