//! Version selection against installed and installable catalogs

#[cfg(test)]
use mockall::automock;

use pep508_rs::pep440_rs::{Version, VersionSpecifiers};

use crate::error::DetectError;
use crate::version::pragma::detect_version_specifier;

/// Read-only snapshot of the vyper versions known to the system.
///
/// Both sequences are sorted descending (newest first). The selector never
/// mutates or caches a catalog; the install layer populates it per call.
#[cfg_attr(test, automock)]
pub trait VersionCatalog: Send + Sync {
    /// Versions already present in the local install directory.
    fn installed(&self) -> &[Version];

    /// Versions available for download from the release index.
    fn installable(&self) -> &[Version];
}

/// Plain owned implementation of [`VersionCatalog`].
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    installed: Vec<Version>,
    installable: Vec<Version>,
}

impl CatalogSnapshot {
    /// Builds a snapshot, sorting both sequences newest-first.
    pub fn new(mut installed: Vec<Version>, mut installable: Vec<Version>) -> Self {
        installed.sort_by(|a, b| b.cmp(a));
        installable.sort_by(|a, b| b.cmp(a));
        Self {
            installed,
            installable,
        }
    }
}

impl VersionCatalog for CatalogSnapshot {
    fn installed(&self) -> &[Version] {
        &self.installed
    }

    fn installable(&self) -> &[Version] {
        &self.installable
    }
}

/// Picks the newest version satisfying `specifiers`.
///
/// Installed versions are searched first; the installable sequence is only
/// consulted when no installed version satisfies the constraint. Fails with
/// [`DetectError::UnsatisfiableConstraint`] when neither search yields a
/// candidate.
///
/// `prereleases` controls whether prerelease versions are eligible:
/// - `Some(true)`: always eligible.
/// - `Some(false)`: never eligible, even when nothing stable matches.
/// - `None`: eligible when the constraint itself pins a prerelease, or when
///   no stable candidate in the searched sequence satisfies the constraint.
pub fn pick_version(
    specifiers: &VersionSpecifiers,
    catalog: &dyn VersionCatalog,
    prereleases: Option<bool>,
) -> Result<Version, DetectError> {
    if let Some(version) = first_match(specifiers, catalog.installed(), prereleases) {
        return Ok(version.clone());
    }
    if let Some(version) = first_match(specifiers, catalog.installable(), prereleases) {
        return Ok(version.clone());
    }
    Err(DetectError::UnsatisfiableConstraint {
        specifier: specifiers.to_string(),
    })
}

/// Detects the pragma in `source` and picks a version for it.
///
/// Fails with [`DetectError::NoPragmaFound`] when the source carries no
/// pragma; parse and selection failures propagate unchanged. Never guesses a
/// version.
pub fn detect_version_from_source(
    source: &str,
    catalog: &dyn VersionCatalog,
    prereleases: Option<bool>,
) -> Result<Version, DetectError> {
    let specifiers = detect_version_specifier(source)?;
    pick_version(&specifiers, catalog, prereleases)
}

fn first_match<'a>(
    specifiers: &VersionSpecifiers,
    candidates: &'a [Version],
    prereleases: Option<bool>,
) -> Option<&'a Version> {
    let allow = prereleases
        .unwrap_or_else(|| specifiers.iter().any(|s| s.version().any_prerelease()));

    let found = candidates
        .iter()
        .find(|v| specifiers.contains(v) && (allow || !v.any_prerelease()));
    if found.is_some() {
        return found;
    }

    // Neutral policy: when nothing stable satisfies the constraint in this
    // sequence, prereleases become eligible.
    if prereleases.is_none() && !allow {
        return candidates.iter().find(|v| specifiers.contains(v));
    }

    None
}
