//! Resolution of a locator and optional version into a single [`Reference`].
//!
//! Precedence:
//! 1. a tag already present in the locator (`repo/chart:1.2.3`) always wins,
//! 2. otherwise the caller's version is used as the tag,
//! 3. otherwise resolution fails; there is no implicit `latest`.

use url::Url;

use crate::error::GetterError;
use crate::reference::{Locator, Reference};

/// Where the tag of a resolved reference comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagSource<'a> {
    /// Tag embedded in the locator.
    Embedded(&'a str),
    /// Version supplied by the caller.
    Explicit(&'a str),
    /// No tag and no version.
    Missing,
}

impl<'a> TagSource<'a> {
    /// Applies the precedence rule. An empty explicit version counts as absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use charter_registry::TagSource;
    ///
    /// assert_eq!(TagSource::select(Some("1.2.3"), Some("9.9.9")), TagSource::Embedded("1.2.3"));
    /// assert_eq!(TagSource::select(None, Some("0.1.0")), TagSource::Explicit("0.1.0"));
    /// assert_eq!(TagSource::select(None, Some("")), TagSource::Missing);
    /// ```
    #[must_use]
    pub fn select(embedded: Option<&'a str>, explicit: Option<&'a str>) -> Self {
        match (embedded, explicit.filter(|v| !v.is_empty())) {
            (Some(tag), _) => Self::Embedded(tag),
            (None, Some(version)) => Self::Explicit(version),
            (None, None) => Self::Missing,
        }
    }

    /// Returns the selected tag, if any.
    #[must_use]
    pub const fn tag(self) -> Option<&'a str> {
        match self {
            Self::Embedded(tag) | Self::Explicit(tag) => Some(tag),
            Self::Missing => None,
        }
    }
}

/// Resolves a locator string and optional version into a [`Reference`].
///
/// # Examples
///
/// ```
/// use charter_registry::resolve;
///
/// let reference = resolve("oci://localhost:5000/testrepo/testchart", Some("0.1.0")).unwrap();
/// assert_eq!(reference.to_string(), "localhost:5000/testrepo/testchart:0.1.0");
///
/// let pinned = resolve("oci://localhost:5000/testrepo/testchart:1.2.3", Some("0.1.0")).unwrap();
/// assert_eq!(pinned.tag(), "1.2.3");
/// ```
///
/// # Errors
///
/// - [`GetterError::MalformedLocator`] if the locator is not a URL with a host
/// - [`GetterError::MalformedReference`] if host and path are not a valid reference
/// - [`GetterError::MissingVersion`] if neither a tag nor a version is given
pub fn resolve(locator: &str, explicit_version: Option<&str>) -> Result<Reference, GetterError> {
    let parsed = Locator::parse(locator)?;
    resolve_locator(parsed, locator, explicit_version)
}

/// Resolves an already parsed URL. See [`resolve`].
///
/// # Errors
///
/// See [`resolve`].
pub fn resolve_url(url: &Url, explicit_version: Option<&str>) -> Result<Reference, GetterError> {
    let parsed = Locator::from_url(url)?;
    resolve_locator(parsed, url.as_str(), explicit_version)
}

fn resolve_locator(
    locator: Locator,
    raw: &str,
    explicit_version: Option<&str>,
) -> Result<Reference, GetterError> {
    let source = TagSource::select(locator.tag.as_deref(), explicit_version);
    let tag = source.tag().ok_or_else(|| GetterError::MissingVersion {
        locator: raw.to_string(),
    })?;

    if let (TagSource::Embedded(tag), Some(version)) = (source, explicit_version) {
        if !version.is_empty() && version != tag {
            tracing::debug!(locator = raw, tag, version, "Locator tag overrides requested version");
        }
    }

    Reference::new(&locator.registry, &locator.repository, tag)
}
