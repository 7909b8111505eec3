use std::path::{Path, PathBuf};

use crate::error::InstallError;

/// Environment variable overriding the default install directory.
pub const VVM_BINARY_PATH_VAR: &str = "VVM_BINARY_PATH";

/// Returns the directory where vvm stores installed vyper binaries.
///
/// Resolution order: the `VVM_BINARY_PATH` environment variable, then an
/// explicitly supplied path, then `~/.vvm`. The directory is not created
/// here; callers that write into it create it on demand.
pub fn install_dir(explicit: Option<&Path>) -> PathBuf {
    install_dir_from(
        std::env::var(VVM_BINARY_PATH_VAR).ok(),
        explicit,
        dirs::home_dir(),
    )
}

fn install_dir_from(
    env_override: Option<String>,
    explicit: Option<&Path>,
    home_dir: Option<PathBuf>,
) -> PathBuf {
    if let Some(path) = env_override {
        return PathBuf::from(path);
    }
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    home_dir
        .map(|home| home.join(".vvm"))
        .unwrap_or_else(|| PathBuf::from(".vvm"))
}

/// The substring identifying this platform's binary in a release asset name.
///
/// Vyper release assets are named like `vyper.0.3.10+commit.91361694.linux`.
pub fn platform_asset_id() -> Result<&'static str, InstallError> {
    match std::env::consts::OS {
        "linux" => Ok("linux"),
        "macos" => Ok("darwin"),
        "windows" => Ok("windows"),
        other => Err(InstallError::UnsupportedPlatform(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_dir_from_prefers_env_override() {
        let path = install_dir_from(
            Some("/opt/vvm".to_string()),
            Some(Path::new("/explicit")),
            Some(PathBuf::from("/home/user")),
        );

        assert_eq!(path, PathBuf::from("/opt/vvm"));
    }

    #[test]
    fn install_dir_from_uses_explicit_path_when_no_env() {
        let path = install_dir_from(
            None,
            Some(Path::new("/explicit")),
            Some(PathBuf::from("/home/user")),
        );

        assert_eq!(path, PathBuf::from("/explicit"));
    }

    #[test]
    fn install_dir_from_falls_back_to_home() {
        let path = install_dir_from(None, None, Some(PathBuf::from("/home/user")));

        assert_eq!(path, PathBuf::from("/home/user/.vvm"));
    }

    #[test]
    fn install_dir_from_falls_back_to_relative_dir_without_home() {
        let path = install_dir_from(None, None, None);

        assert_eq!(path, PathBuf::from(".vvm"));
    }
}
