//! Error types for pragma detection, binary installation and compiler runs.

use pep508_rs::pep440_rs::Version;
use thiserror::Error;

use crate::compiler::output::VyperDiagnostic;

/// Failures while resolving a vyper version from a source pragma.
///
/// All variants are local, recoverable outcomes: a caller may fall back to an
/// explicitly supplied version on [`DetectError::NoPragmaFound`], or report
/// the offending text carried by the other variants.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DetectError {
    #[error("no version pragma found in source")]
    NoPragmaFound,

    #[error("unparseable version specifier `{raw}`")]
    UnparseableConstraint { raw: String },

    #[error(
        "npm-style `~` is ambiguous for vyper versions >= 0.4.0 (hint: try `{suggestion}`)"
    )]
    AmbiguousLegacyOperator { raw: String, suggestion: String },

    #[error("no installed or installable vyper satisfies `{specifier}`")]
    UnsatisfiableConstraint { specifier: String },
}

/// Failures while listing, downloading or installing vyper binaries.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("github api rate limit exceeded; set GITHUB_TOKEN to raise the limit")]
    RateLimited,

    #[error("unexpected response from release index: {0}")]
    InvalidResponse(String),

    #[error("download of {url} failed with status {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("no vyper binary published for v{version} on {platform}")]
    NoBinaryAsset {
        version: Version,
        platform: &'static str,
    },

    #[error("vyper {0} is not installed; run `vvm install {0}`")]
    NotInstalled(Version),

    #[error("no vyper versions are installed; run `vvm install`")]
    NothingInstalled,

    #[error("downloaded binary would not execute: {0}")]
    BinaryCheck(String),

    #[error("attempted to install vyper v{expected}, but the binary reports v{actual}")]
    UnexpectedBinaryVersion { expected: Version, actual: Version },

    #[error("unsupported platform `{0}`; vvm supports linux, macos and windows")]
    UnsupportedPlatform(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures while invoking the vyper binary or shaping its output.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Detect(#[from] DetectError),

    #[error(transparent)]
    Install(#[from] InstallError),

    #[error("vyper {version} does not support the `{flag}` option")]
    UnknownOption { version: String, flag: String },

    #[error("vyper {version} does not accept `{value}` as a value for the `{flag}` flag")]
    UnknownValue {
        version: String,
        flag: String,
        value: String,
    },

    #[error("could not parse vyper --version output `{0}`")]
    BadVersionOutput(String),

    #[error(
        "{message}\n> command: `{command}`\n> return code: `{return_code}`\n> stdout:\n{stdout}\n> stderr:\n{stderr}"
    )]
    Vyper {
        message: String,
        command: String,
        return_code: i32,
        stdout: String,
        stderr: String,
        errors: Vec<VyperDiagnostic>,
    },

    #[error("vyper produced invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
