//! Version pragma extraction and specifier normalization
//!
//! Vyper sources declare the compiler version they expect in a comment, in
//! one of two forms:
//!
//! ```text
//! # pragma version ~=0.3.0
//! # @version ^0.2.0
//! ```
//!
//! Contracts written before vyper 0.4.0 may use npm-style `^`/`~` prefixes;
//! those are rewritten to PEP 440 specifiers before parsing.

use std::str::FromStr;
use std::sync::LazyLock;

use pep508_rs::pep440_rs::{Version, VersionSpecifiers};
use regex::Regex;

use crate::error::DetectError;

/// Matches a pragma comment line and captures the raw constraint text.
///
/// The comment marker may be indented, and whitespace is allowed between the
/// marker and the `pragma version` / `@version` keyword.
static PRAGMA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*#\s*(?:pragma\s+version|@version)\s+(\S[^\r\n]*)")
        .expect("pragma regex is valid")
});

/// Plain `major.minor.patch` with no prerelease suffix.
static PLAIN_RELEASE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+\.\d+$").expect("release regex is valid"));

/// npm-style `~` stopped being well-defined at this release, where vyper
/// switched its pragma syntax to PEP 440.
static LEGACY_TILDE_CUTOFF: LazyLock<Version> =
    LazyLock::new(|| Version::from_str("0.4.0").expect("cutoff version is valid"));

/// Extracts the raw constraint text of the first version pragma in `source`.
///
/// Later pragma lines are ignored; returns `None` when no pragma exists.
/// The captured text is not validated here, see [`parse_specifier`].
pub fn extract_pragma(source: &str) -> Option<&str> {
    PRAGMA_RE
        .captures(source)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().trim_end())
}

/// Parses raw pragma text into a PEP 440 specifier set, normalizing
/// npm-style operators first.
///
/// Normalization rules:
/// - `^X.Y.Z` becomes `~=X.Y` (patch dropped); a prerelease anchor such as
///   `^0.1.0b16` keeps the full version, `~=0.1.0b16`.
/// - `~V` is equivalent to `~=V` for anchors below 0.4.0, and rejected as
///   [`DetectError::AmbiguousLegacyOperator`] at or above it.
/// - A bare version literal (starting with a digit or `v`) becomes `==V`.
/// - Comma-separated sets such as `>=0.3.10, <0.4.0` pass through unchanged.
///
/// Anything else PEP 440 rejects, including space-separated ranges, hyphen
/// ranges, `||` alternation and bare `=`, surfaces as
/// [`DetectError::UnparseableConstraint`].
pub fn parse_specifier(raw: &str) -> Result<VersionSpecifiers, DetectError> {
    let raw = raw.trim();
    let normalized = normalize_legacy(raw)?;
    VersionSpecifiers::from_str(&normalized).map_err(|_| DetectError::UnparseableConstraint {
        raw: raw.to_string(),
    })
}

/// Extracts and parses the version specifier of the first pragma in `source`.
pub fn detect_version_specifier(source: &str) -> Result<VersionSpecifiers, DetectError> {
    let raw = extract_pragma(source).ok_or(DetectError::NoPragmaFound)?;
    parse_specifier(raw)
}

fn normalize_legacy(raw: &str) -> Result<String, DetectError> {
    if let Some(version_str) = raw.strip_prefix('^') {
        return Ok(format!("~={}", caret_anchor(version_str.trim_start())));
    }

    if let Some(version_str) = raw.strip_prefix('~')
        && !version_str.starts_with('=')
    {
        let version_str = version_str.trim_start();
        let anchor =
            Version::from_str(version_str).map_err(|_| DetectError::UnparseableConstraint {
                raw: raw.to_string(),
            })?;
        let suggestion = format!("~={version_str}");
        if anchor >= *LEGACY_TILDE_CUTOFF {
            return Err(DetectError::AmbiguousLegacyOperator {
                raw: raw.to_string(),
                suggestion,
            });
        }
        // pre-0.4.0, `~` and `^` both meant "compatible release"
        return Ok(suggestion);
    }

    if raw
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || c == 'v')
    {
        return Ok(format!("=={raw}"));
    }

    Ok(raw.to_string())
}

/// The compatible-release anchor for a `^` constraint: `X.Y` for a plain
/// release, the version unchanged when it carries a prerelease suffix.
fn caret_anchor(version_str: &str) -> &str {
    if !PLAIN_RELEASE_RE.is_match(version_str) {
        return version_str;
    }
    match version_str.rsplit_once('.') {
        Some((anchor, _)) => anchor,
        None => version_str,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("# pragma version ~=0.3.0", Some("~=0.3.0"))]
    #[case("# @version ^0.2.0", Some("^0.2.0"))]
    #[case("#@version 0.3.10", Some("0.3.10"))]
    #[case("  # pragma version ==0.3.10", Some("==0.3.10"))]
    #[case("#  pragma  version  >=0.3.10, <0.4.0", Some(">=0.3.10, <0.4.0"))]
    #[case("# pragma version 0.3.10   ", Some("0.3.10"))]
    #[case("def foo() -> int128: return 42", None)]
    #[case("# version 0.3.10", None)]
    #[case("", None)]
    fn extract_pragma_captures_constraint_text(
        #[case] source: &str,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(extract_pragma(source), expected);
    }

    #[test]
    fn extract_pragma_finds_pragma_below_other_lines() {
        let source = "\n\nfrom ethereum.ercs import IERC20\n\n# pragma version ~=0.3.0\n";
        assert_eq!(extract_pragma(source), Some("~=0.3.0"));
    }

    #[test]
    fn extract_pragma_uses_first_of_multiple_pragmas() {
        let source = "# @version ^0.2.0\n# pragma version ~=0.3.0\n";
        assert_eq!(extract_pragma(source), Some("^0.2.0"));
    }

    #[rstest]
    #[case("^0.2.0", "~=0.2")]
    #[case("^0.1.0b16", "~=0.1.0b16")]
    #[case("~0.3.0", "~=0.3.0")]
    #[case("~0.1.0b17", "~=0.1.0b17")]
    #[case("0.3.10", "==0.3.10")]
    #[case("v0.3.10", "==0.3.10")]
    #[case("0.1.0b17", "==0.1.0b17")]
    #[case("0.4.0rc6", "==0.4.0rc6")]
    #[case(">=0.3.0-beta17", ">=0.3.0b17")]
    #[case("~=0.3.0", "~=0.3.0")]
    #[case("==0.3.10", "==0.3.10")]
    #[case(">=0.3.10, <0.4.0", ">=0.3.10, <0.4.0")]
    fn parse_specifier_normalizes_to_pep440(#[case] raw: &str, #[case] expected: &str) {
        let specifiers = parse_specifier(raw).unwrap();
        assert_eq!(specifiers.to_string(), expected);
    }

    /// Prerelease tag aliases all normalize to the same specifier value.
    #[rstest]
    #[case("0.1.0b17")]
    #[case("0.1.0beta17")]
    #[case("0.1.0-beta17")]
    #[case("0.1.0-beta.17")]
    #[case("0.1.0B17")]
    #[case("0.1.0.Beta.17")]
    fn parse_specifier_normalizes_prerelease_aliases(#[case] raw: &str) {
        let specifiers = parse_specifier(raw).unwrap();
        assert_eq!(specifiers.to_string(), "==0.1.0b17");
    }

    #[rstest]
    #[case(">= 0.3.1 < 0.4.0")]
    #[case("0.3.1 - 0.3.2")]
    #[case("0.3.1 || 0.3.2")]
    #[case("=0.3.1")]
    #[case("latest")]
    #[case("^pancake")]
    fn parse_specifier_rejects_unsupported_ranges(#[case] raw: &str) {
        assert_eq!(
            parse_specifier(raw),
            Err(DetectError::UnparseableConstraint {
                raw: raw.to_string()
            })
        );
    }

    #[rstest]
    #[case("~0.4.0", "~=0.4.0")]
    #[case("~0.4.1", "~=0.4.1")]
    #[case("~1.0.0", "~=1.0.0")]
    fn parse_specifier_rejects_ambiguous_tilde_at_cutoff(
        #[case] raw: &str,
        #[case] suggestion: &str,
    ) {
        assert_eq!(
            parse_specifier(raw),
            Err(DetectError::AmbiguousLegacyOperator {
                raw: raw.to_string(),
                suggestion: suggestion.to_string(),
            })
        );
    }

    #[test]
    fn detect_version_specifier_reports_missing_pragma() {
        assert_eq!(
            detect_version_specifier("def foo() -> int128: return 42"),
            Err(DetectError::NoPragmaFound)
        );
    }

    #[test]
    fn detect_version_specifier_parses_first_pragma_only() {
        let source = "# pragma version ==0.3.9\n# pragma version ==0.3.10\n";
        let specifiers = detect_version_specifier(source).unwrap();
        assert_eq!(specifiers.to_string(), "==0.3.9");
    }
}
