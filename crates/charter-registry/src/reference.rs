//! Registry references and locator parsing.
//!
//! A [`Locator`] is what the caller typed (`oci://host/repo/chart:tag`, or the
//! same without a scheme). A [`Reference`] is the validated
//! `host/repository:tag` triple handed to registry clients.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::GetterError;

/// Scheme assumed for locators written without one.
pub const DEFAULT_SCHEME: &str = "oci";

const MAX_TAG_LEN: usize = 128;

/// A fully-qualified chart reference: registry host, repository path and tag.
///
/// A `Reference` always carries exactly one tag.
///
/// # Examples
///
/// ```
/// use charter_registry::Reference;
///
/// let reference: Reference = "localhost:5000/testrepo/testchart:1.2.3".parse().unwrap();
/// assert_eq!(reference.registry(), "localhost:5000");
/// assert_eq!(reference.repository(), "testrepo/testchart");
/// assert_eq!(reference.tag(), "1.2.3");
/// assert_eq!(reference.name(), "testchart");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    registry: String,
    repository: String,
    tag: String,
}

impl Reference {
    /// Creates a reference after validating the repository and tag.
    ///
    /// # Errors
    ///
    /// Returns [`GetterError::MalformedReference`] if the registry is empty,
    /// the repository is not a valid OCI repository name, or the tag is not a
    /// valid OCI tag.
    pub fn new(
        registry: impl Into<String>,
        repository: impl Into<String>,
        tag: impl Into<String>,
    ) -> Result<Self, GetterError> {
        let reference = Self {
            registry: registry.into(),
            repository: repository.into(),
            tag: tag.into(),
        };

        let malformed = |reason: String| GetterError::MalformedReference {
            reference: reference.to_string(),
            reason,
        };

        if reference.registry.is_empty() {
            return Err(malformed("registry host is empty".to_string()));
        }
        validate_repository(&reference.repository).map_err(malformed)?;
        validate_tag(&reference.tag).map_err(malformed)?;

        Ok(reference)
    }

    /// Registry host, including the port when one was given.
    #[must_use]
    pub fn registry(&self) -> &str {
        &self.registry
    }

    /// Repository path inside the registry.
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Version tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Last component of the repository path.
    #[must_use]
    pub fn name(&self) -> &str {
        self.repository
            .rsplit('/')
            .next()
            .unwrap_or(&self.repository)
    }

    /// Registry host as a single path component (`:` replaced by `_`).
    #[must_use]
    pub fn registry_dir(&self) -> String {
        self.registry.replace(':', "_")
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.registry, self.repository, self.tag)
    }
}

impl FromStr for Reference {
    type Err = GetterError;

    /// Parses `host/repository:tag`. The tag is required.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let locator = Locator::parse(s)?;
        match locator.tag {
            Some(tag) => Self::new(locator.registry, locator.repository, tag),
            None => Err(GetterError::MalformedReference {
                reference: s.to_string(),
                reason: "reference has no tag".to_string(),
            }),
        }
    }
}

/// A caller-supplied locator split into host, repository path and optional tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    /// Registry host, including the port when one was given.
    pub registry: String,

    /// Repository path with any tag removed.
    pub repository: String,

    /// Tag found after `:` in the last path segment.
    pub tag: Option<String>,
}

impl Locator {
    /// Parses a locator string.
    ///
    /// Strings without `://` are read as `oci://` locators, so
    /// `localhost:5000/repo/chart` and `oci://localhost:5000/repo/chart` are
    /// equivalent.
    ///
    /// # Errors
    ///
    /// Returns [`GetterError::MalformedLocator`] if the string is not a URL
    /// with a host, and [`GetterError::MalformedReference`] if the path holds
    /// a digest or an empty tag.
    pub fn parse(raw: &str) -> Result<Self, GetterError> {
        let url = parse_url(raw).map_err(|reason| GetterError::MalformedLocator {
            locator: raw.to_string(),
            reason,
        })?;
        Self::from_url(&url)
    }

    /// Splits an already parsed URL. Query and fragment are ignored.
    ///
    /// # Errors
    ///
    /// See [`Locator::parse`].
    pub fn from_url(url: &Url) -> Result<Self, GetterError> {
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| GetterError::MalformedLocator {
                locator: url.to_string(),
                reason: "missing registry host".to_string(),
            })?;
        let registry = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        let path = url.path().trim_start_matches('/');
        if path.contains('@') {
            return Err(GetterError::MalformedReference {
                reference: format!("{registry}/{path}"),
                reason: "digest references are not supported; use a tag".to_string(),
            });
        }

        let (parent, last) = match path.rsplit_once('/') {
            Some((parent, last)) => (Some(parent), last),
            None => (None, path),
        };

        let (name, tag) = match last.split_once(':') {
            Some((_, "")) => {
                return Err(GetterError::MalformedReference {
                    reference: format!("{registry}/{path}"),
                    reason: "tag is empty".to_string(),
                });
            }
            Some((name, tag)) => (name, Some(tag.to_string())),
            None => (last, None),
        };

        let repository = match parent {
            Some(parent) => format!("{parent}/{name}"),
            None => name.to_string(),
        };

        Ok(Self {
            registry,
            repository,
            tag,
        })
    }
}

/// Converts a chart version into a registry tag.
///
/// Tags cannot contain `+`, so semver build metadata (`1.0.0+build`) is
/// stored under `1.0.0_build`.
///
/// # Examples
///
/// ```
/// use charter_registry::version_tag;
///
/// assert_eq!(version_tag("1.0.0+build.5"), "1.0.0_build.5");
/// assert_eq!(version_tag("0.1.0"), "0.1.0");
/// ```
#[must_use]
pub fn version_tag(version: &str) -> String {
    version.replace('+', "_")
}

/// Parses `raw` as a URL, prefixing [`DEFAULT_SCHEME`] when it has no scheme.
pub(crate) fn parse_url(raw: &str) -> Result<Url, String> {
    let parsed = if raw.contains("://") {
        Url::parse(raw)
    } else {
        Url::parse(&format!("{DEFAULT_SCHEME}://{raw}"))
    };
    parsed.map_err(|e| e.to_string())
}

/// Checks an OCI repository name: `/`-separated components of lowercase
/// alphanumerics joined by `.`, `_`, `__` or runs of `-`.
fn validate_repository(repository: &str) -> Result<(), String> {
    if repository.is_empty() {
        return Err("repository path is empty".to_string());
    }

    for component in repository.split('/') {
        validate_component(component)
            .map_err(|reason| format!("repository component '{component}' {reason}"))?;
    }
    Ok(())
}

fn validate_component(component: &str) -> Result<(), String> {
    if component.is_empty() {
        return Err("is empty".to_string());
    }

    let is_alnum = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
    let mut separator = String::new();
    for (i, c) in component.chars().enumerate() {
        if is_alnum(c) {
            if !separator.is_empty() {
                let valid = matches!(separator.as_str(), "." | "_" | "__")
                    || separator.chars().all(|s| s == '-');
                if !valid {
                    return Err(format!("has invalid separator '{separator}'"));
                }
                separator.clear();
            }
        } else if matches!(c, '.' | '_' | '-') {
            if i == 0 {
                return Err("must start with a lowercase letter or digit".to_string());
            }
            separator.push(c);
        } else {
            return Err(format!("contains invalid character '{c}'"));
        }
    }

    if separator.is_empty() {
        Ok(())
    } else {
        Err("must end with a lowercase letter or digit".to_string())
    }
}

/// Checks an OCI tag: `[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}`.
fn validate_tag(tag: &str) -> Result<(), String> {
    let mut chars = tag.chars();
    let Some(first) = chars.next() else {
        return Err("tag is empty".to_string());
    };
    if tag.len() > MAX_TAG_LEN {
        return Err(format!("tag exceeds {MAX_TAG_LEN} characters"));
    }
    if !(first.is_ascii_alphanumeric() || first == '_') {
        return Err(format!("tag '{tag}' must start with a letter, digit or '_'"));
    }
    if let Some(bad) = chars.find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))) {
        return Err(format!("tag '{tag}' contains invalid character '{bad}'"));
    }
    Ok(())
}
