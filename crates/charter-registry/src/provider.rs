//! URL schemes served by the getter.

use crate::getter::Getter;
use crate::port::RegistryClientPort;

/// The scheme for OCI registry locators.
pub const OCI_SCHEME: &str = "oci";

/// Associates URL schemes with the chart getter.
///
/// # Examples
///
/// ```
/// use charter_registry::Provider;
///
/// let provider = Provider::oci();
/// assert!(provider.provides("oci"));
/// assert!(!provider.provides("https"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Provider {
    schemes: &'static [&'static str],
}

impl Provider {
    /// Provider for `oci://` locators.
    #[must_use]
    pub const fn oci() -> Self {
        Self {
            schemes: &[OCI_SCHEME],
        }
    }

    /// Schemes served by this provider.
    #[must_use]
    pub const fn schemes(&self) -> &'static [&'static str] {
        self.schemes
    }

    /// Returns true if `scheme` is served (case-insensitive).
    #[must_use]
    pub fn provides(&self, scheme: &str) -> bool {
        self.schemes.iter().any(|s| s.eq_ignore_ascii_case(scheme))
    }

    /// Builds a getter over `client`.
    #[must_use]
    pub const fn new_getter<C: RegistryClientPort>(&self, client: C) -> Getter<C> {
        Getter::new(client)
    }
}

impl Default for Provider {
    fn default() -> Self {
        Self::oci()
    }
}
