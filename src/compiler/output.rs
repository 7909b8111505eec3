//! Shaping of vyper JSON output

use serde::Deserialize;
use serde_json::Value;

use super::VyperRun;
use crate::error::CompileError;

/// One entry of the `errors` array in standard-JSON output.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VyperDiagnostic {
    pub severity: String,
    pub message: String,
    #[serde(default)]
    pub formatted_message: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl VyperDiagnostic {
    fn is_error(&self) -> bool {
        self.severity == "error"
    }

    fn display_message(&self) -> &str {
        self.formatted_message.as_deref().unwrap_or(&self.message)
    }
}

/// Parses `--combined-json` stdout into a JSON object.
pub(crate) fn parse_combined_json(stdout: &str) -> Result<Value, CompileError> {
    let value: Value = serde_json::from_str(stdout)?;
    Ok(value)
}

/// Pulls the single contract entry out of combined-json output, discarding
/// the `version` bookkeeping key.
pub(crate) fn sole_contract(combined: Value) -> Result<Value, CompileError> {
    let Value::Object(map) = combined else {
        return Err(CompileError::Json(serde::de::Error::custom(
            "combined_json output is not an object",
        )));
    };
    map.into_iter()
        .find(|(key, _)| key != "version")
        .map(|(_, contract)| contract)
        .ok_or_else(|| {
            CompileError::Json(serde::de::Error::custom(
                "combined_json output contains no contract",
            ))
        })
}

/// Fails with [`CompileError::Vyper`] when standard-JSON output carries
/// errors of severity `error`; warnings pass through.
pub(crate) fn check_standard_errors(output: &Value, run: &VyperRun) -> Result<(), CompileError> {
    let Some(raw_errors) = output.get("errors") else {
        return Ok(());
    };
    let diagnostics: Vec<VyperDiagnostic> = Vec::<VyperDiagnostic>::deserialize(raw_errors)?;

    let errors: Vec<VyperDiagnostic> = diagnostics.into_iter().filter(|d| d.is_error()).collect();
    if errors.is_empty() {
        return Ok(());
    }

    let message = errors
        .iter()
        .map(|d| d.display_message().to_string())
        .collect::<Vec<_>>()
        .join("\n");

    Err(CompileError::Vyper {
        message,
        command: run.command.clone(),
        return_code: 0,
        stdout: run.stdout.clone(),
        stderr: run.stderr.clone(),
        errors,
    })
}
