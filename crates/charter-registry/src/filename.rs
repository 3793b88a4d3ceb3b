//! Output file names for retrieved charts.
//!
//! The name is built from the last path segment of the locator, with any tag
//! dropped, and the version the caller passes in. No resolution happens here:
//! for `repo/chart:1.2.3` with version `0.1.0` the name is `chart-0.1.0.tgz`
//! even though the pull uses tag `1.2.3`.

use charter_core::ARCHIVE_EXTENSION;
use url::Url;

use crate::reference::parse_url;

/// Returns `<name>-<version>.tgz` for a parsed locator.
///
/// # Examples
///
/// ```
/// use charter_registry::filename;
/// use url::Url;
///
/// let url = Url::parse("oci://localhost:5000/testrepo/testchart:latest").unwrap();
/// assert_eq!(filename(&url, "0.1.0"), "testchart-0.1.0.tgz");
/// ```
#[must_use]
pub fn filename(locator: &Url, version: &str) -> String {
    format_name(locator.path(), version)
}

/// Like [`filename`], for an unparsed locator. Locators without a scheme are
/// read as `oci://`; strings that are not URLs at all are split as plain
/// paths.
#[must_use]
pub fn filename_str(locator: &str, version: &str) -> String {
    match parse_url(locator) {
        Ok(url) => filename(&url, version),
        Err(_) => format_name(locator, version),
    }
}

fn format_name(path: &str, version: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    let base = trimmed.rsplit('/').next().unwrap_or(trimmed);
    let base = if base.is_empty() { "." } else { base };
    let name = base.split_once(':').map_or(base, |(name, _)| name);
    format!("{name}-{version}.{ARCHIVE_EXTENSION}")
}
