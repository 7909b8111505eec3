//! Subprocess wrapper around the vyper binary
//!
//! Builds vyper command lines, captures output, and maps compiler failures
//! to [`CompileError`]. Compilation goes through `--combined-json` or the
//! standard-JSON interface, mirroring what the vyper CLI itself offers.

pub mod output;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;

use pep508_rs::pep440_rs::Version;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::CompileError;

/// Queries a vyper binary for its version.
///
/// Build metadata after `+` (e.g. `0.3.10+commit.91361694`) is discarded so
/// the result compares equal to the release tag.
pub fn vyper_version(binary: &Path) -> Result<Version, CompileError> {
    let run = VyperCmd::new(binary).flag("version").run()?;
    let text = run.stdout.trim();
    let base = text.split('+').next().unwrap_or(text);
    Version::from_str(base).map_err(|_| CompileError::BadVersionOutput(text.to_string()))
}

/// Output of a successful vyper invocation.
#[derive(Debug)]
pub struct VyperRun {
    pub stdout: String,
    pub stderr: String,
    /// The full command line, for diagnostics.
    pub command: String,
}

/// Builder for a single vyper invocation.
///
/// Flag names are written the way vvm callers know them (`evm_version`) and
/// marshaled to the vyper CLI form (`--evm-version`; single letters become
/// short flags).
#[derive(Debug)]
pub struct VyperCmd {
    binary: PathBuf,
    args: Vec<String>,
    stdin: Option<String>,
}

impl VyperCmd {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    /// Appends a source file path.
    pub fn file(mut self, path: &Path) -> Self {
        self.args.push(path.to_string_lossy().into_owned());
        self
    }

    /// Appends a bare flag, e.g. `standard_json` becomes `--standard-json`.
    pub fn flag(mut self, name: &str) -> Self {
        self.args.push(flag_name(name));
        self
    }

    /// Appends a flag with a value.
    pub fn option(mut self, name: &str, value: impl AsRef<str>) -> Self {
        self.args.push(flag_name(name));
        self.args.push(value.as_ref().to_string());
        self
    }

    /// Data to pass on stdin.
    pub fn stdin(mut self, data: impl Into<String>) -> Self {
        self.stdin = Some(data.into());
        self
    }

    /// Runs vyper, failing on a non-zero exit code.
    pub fn run(self) -> Result<VyperRun, CompileError> {
        let command = format!("{} {}", self.binary.display(), self.args.join(" "));
        debug!("Running `{}`", command);

        let mut child = Command::new(&self.binary)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(data) = &self.stdin
            && let Some(mut stdin) = child.stdin.take()
        {
            stdin.write_all(data.as_bytes())?;
        }

        let output = child.wait_with_output()?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(failure_error(
                &self.binary,
                command,
                output.status.code().unwrap_or(-1),
                stdout,
                stderr,
            ));
        }

        Ok(VyperRun {
            stdout,
            stderr,
            command,
        })
    }
}

fn flag_name(name: &str) -> String {
    if name.len() == 1 {
        format!("-{name}")
    } else {
        format!("--{}", name.replace('_', "-"))
    }
}

/// Maps a failed invocation to the most specific error the stderr allows.
fn failure_error(
    binary: &Path,
    command: String,
    return_code: i32,
    stdout: String,
    stderr: String,
) -> CompileError {
    // `unrecognised option '--flag'`
    if stderr.starts_with("unrecognised option") {
        if let Some(flag) = stderr.split('\'').nth(1) {
            return CompileError::UnknownOption {
                version: binary_version_label(binary),
                flag: flag.to_string(),
            };
        }
    }

    // `Invalid option to --flag: value`
    if stderr.starts_with("Invalid option")
        && let Some((prefix, value)) = stderr.split_once(": ")
        && let Some(flag) = prefix.split(' ').next_back()
    {
        return CompileError::UnknownValue {
            version: binary_version_label(binary),
            flag: flag.to_string(),
            value: value.trim().to_string(),
        };
    }

    CompileError::Vyper {
        message: "An error occurred during execution".to_string(),
        command,
        return_code,
        stdout,
        stderr,
        errors: Vec::new(),
    }
}

fn binary_version_label(binary: &Path) -> String {
    vyper_version(binary)
        .map(|v| v.to_string())
        .unwrap_or_else(|_| "(unknown version)".to_string())
}

/// Compilation settings shared by the compile entrypoints.
#[derive(Debug, Clone, Default)]
pub struct CompileSettings {
    /// Root of the source tree, passed as `-p`.
    pub base_path: Option<PathBuf>,
    /// Target EVM version; valid values depend on the vyper version.
    pub evm_version: Option<String>,
}

/// Compiles source files via `--combined-json`, keyed by file path.
pub fn compile_files(
    binary: &Path,
    files: &[PathBuf],
    settings: &CompileSettings,
) -> Result<Value, CompileError> {
    let mut cmd = VyperCmd::new(binary);
    for file in files {
        cmd = cmd.file(file);
    }
    cmd = cmd.option("f", "combined_json");
    if let Some(base_path) = &settings.base_path {
        cmd = cmd.option("p", base_path.to_string_lossy());
    }
    if let Some(evm_version) = &settings.evm_version {
        cmd = cmd.option("evm_version", evm_version);
    }

    let run = cmd.run()?;
    output::parse_combined_json(&run.stdout)
}

/// Compiles a single in-memory source, returning output keyed by `<stdin>`.
pub fn compile_source(
    binary: &Path,
    source: &str,
    settings: &CompileSettings,
) -> Result<Value, CompileError> {
    let mut file = tempfile::Builder::new()
        .prefix("vyper-")
        .suffix(".vy")
        .tempfile()?;
    file.write_all(source.as_bytes())?;

    let combined = compile_files(binary, &[file.path().to_path_buf()], settings)?;
    Ok(json!({ "<stdin>": output::sole_contract(combined)? }))
}

/// Compiles through the standard-JSON interface.
///
/// Output `errors` with severity `error` are surfaced as
/// [`CompileError::Vyper`] carrying the shaped error objects.
pub fn compile_standard(
    binary: &Path,
    input: &Value,
    settings: &CompileSettings,
) -> Result<Value, CompileError> {
    let stdin_data = serde_json::to_string(input)?;
    let mut cmd = VyperCmd::new(binary).flag("standard_json");
    if let Some(base_path) = &settings.base_path {
        cmd = cmd.option("p", base_path.to_string_lossy());
    }

    let run = cmd.stdin(stdin_data).run()?;
    let parsed: Value = serde_json::from_str(&run.stdout)?;
    output::check_standard_errors(&parsed, &run)?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("f", "-f")]
    #[case("p", "-p")]
    #[case("version", "--version")]
    #[case("evm_version", "--evm-version")]
    #[case("standard_json", "--standard-json")]
    fn flag_name_marshals_cli_flags(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(flag_name(name), expected);
    }

    #[test]
    fn cmd_builds_argument_list_in_order() {
        let cmd = VyperCmd::new("/usr/bin/vyper")
            .file(Path::new("Foo.vy"))
            .option("f", "combined_json")
            .option("evm_version", "shanghai");

        assert_eq!(
            cmd.args,
            vec!["Foo.vy", "-f", "combined_json", "--evm-version", "shanghai"]
        );
    }

    #[test]
    fn failure_error_maps_unrecognised_option() {
        let err = failure_error(
            Path::new("/nonexistent/vyper"),
            "vyper --frobnicate".to_string(),
            1,
            String::new(),
            "unrecognised option '--frobnicate'".to_string(),
        );

        match err {
            CompileError::UnknownOption { flag, .. } => assert_eq!(flag, "--frobnicate"),
            other => panic!("expected UnknownOption, got {other:?}"),
        }
    }

    #[test]
    fn failure_error_maps_invalid_option_value() {
        let err = failure_error(
            Path::new("/nonexistent/vyper"),
            "vyper --evm-version pluto".to_string(),
            1,
            String::new(),
            "Invalid option to --evm-version: pluto".to_string(),
        );

        match err {
            CompileError::UnknownValue { flag, value, .. } => {
                assert_eq!(flag, "--evm-version");
                assert_eq!(value, "pluto");
            }
            other => panic!("expected UnknownValue, got {other:?}"),
        }
    }

    #[test]
    fn failure_error_falls_back_to_vyper_error() {
        let err = failure_error(
            Path::new("/nonexistent/vyper"),
            "vyper Foo.vy".to_string(),
            1,
            String::new(),
            "vyper.exceptions.SyntaxException: unexpected token".to_string(),
        );

        match err {
            CompileError::Vyper {
                return_code,
                stderr,
                ..
            } => {
                assert_eq!(return_code, 1);
                assert!(stderr.contains("SyntaxException"));
            }
            other => panic!("expected Vyper, got {other:?}"),
        }
    }
}
