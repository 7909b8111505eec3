//! Local installation of vyper binaries
//!
//! Binaries live in the install directory as `vyper-<version>` (plus `.exe`
//! on Windows). This layer lists what is installed, downloads releases from
//! the [`releases::ReleaseIndex`], and assembles the catalog snapshot the
//! resolution core selects from.

pub mod releases;

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use pep508_rs::pep440_rs::Version;
use tracing::{info, warn};

use crate::compiler;
use crate::error::InstallError;
use crate::version::select::CatalogSnapshot;

use releases::ReleaseIndex;

const BINARY_PREFIX: &str = "vyper-";

/// Lists the vyper versions installed under `install_dir`, newest first.
///
/// A missing directory counts as nothing installed. Entries that do not look
/// like `vyper-<version>` are skipped.
pub fn installed_versions(install_dir: &Path) -> Result<Vec<Version>, InstallError> {
    let entries = match fs::read_dir(install_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut versions = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let Some(suffix) = name.strip_prefix(BINARY_PREFIX) else {
            continue;
        };
        let suffix = suffix.strip_suffix(".exe").unwrap_or(suffix);
        match Version::from_str(suffix) {
            Ok(version) => versions.push(version),
            Err(_) => warn!("Ignoring unversioned binary `{}` in install dir", name),
        }
    }

    versions.sort_by(|a, b| b.cmp(a));
    Ok(versions)
}

/// Path of the installed binary for `version`.
///
/// Fails with [`InstallError::NotInstalled`] when the binary is missing.
pub fn executable(install_dir: &Path, version: &Version) -> Result<PathBuf, InstallError> {
    let path = binary_path(install_dir, version);
    if !path.exists() {
        return Err(InstallError::NotInstalled(version.clone()));
    }
    Ok(path)
}

/// Path and version of the newest installed binary.
pub fn latest_executable(install_dir: &Path) -> Result<(Version, PathBuf), InstallError> {
    let version = installed_versions(install_dir)?
        .into_iter()
        .next()
        .ok_or(InstallError::NothingInstalled)?;
    let path = executable(install_dir, &version)?;
    Ok((version, path))
}

/// Downloads and installs a vyper binary, returning the installed version.
///
/// With `version` unset the newest installable release is used. Installing an
/// already-present version is a no-op. After writing the binary it is run
/// once to confirm it reports the expected version; a binary reporting a
/// different base version is removed again.
pub async fn install(
    index: &dyn ReleaseIndex,
    install_dir: &Path,
    version: Option<&Version>,
) -> Result<Version, InstallError> {
    let version = match version {
        Some(version) => version.clone(),
        None => index
            .installable_versions()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                InstallError::InvalidResponse("release index lists no installable versions".into())
            })?,
    };

    let path = binary_path(install_dir, &version);
    if path.exists() {
        info!("vyper {} already installed at: {}", version, path.display());
        return Ok(version);
    }

    let bytes = index.download_binary(&version).await?;
    fs::create_dir_all(install_dir)?;
    fs::write(&path, bytes)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    }

    validate_installation(&path, &version)?;
    info!("vyper {} successfully installed at: {}", version, path.display());
    Ok(version)
}

/// Builds the catalog the resolution core selects from: installed versions
/// read from disk, installable versions fetched from the release index.
pub async fn snapshot(
    index: &dyn ReleaseIndex,
    install_dir: &Path,
) -> Result<CatalogSnapshot, InstallError> {
    Ok(CatalogSnapshot::new(
        installed_versions(install_dir)?,
        index.installable_versions().await?,
    ))
}

fn binary_path(install_dir: &Path, version: &Version) -> PathBuf {
    install_dir.join(binary_name(version, cfg!(windows)))
}

// The `.exe` suffix is appended, never set via `Path::set_extension`: that
// would treat the version's patch component as an extension and replace it.
fn binary_name(version: &Version, windows: bool) -> String {
    let suffix = if windows { ".exe" } else { "" };
    format!("{BINARY_PREFIX}{version}{suffix}")
}

fn validate_installation(path: &Path, expected: &Version) -> Result<(), InstallError> {
    let actual = match compiler::vyper_version(path) {
        Ok(version) => version,
        Err(e) => {
            let _ = fs::remove_file(path);
            return Err(InstallError::BinaryCheck(e.to_string()));
        }
    };

    if actual.release() != expected.release() {
        let _ = fs::remove_file(path);
        return Err(InstallError::UnexpectedBinaryVersion {
            expected: expected.clone(),
            actual,
        });
    }

    // pre/post segment mismatches happen when a tag was cut from a slightly
    // newer build; keep the binary but say so
    if actual != *expected {
        warn!("Installed vyper binary reports version {}", actual);
    }

    Ok(())
}
