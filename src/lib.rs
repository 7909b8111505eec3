//! vvm — Vyper compiler version manager
//!
//! Installs precompiled `vyper` binaries, resolves the compiler version a
//! source file asks for via its version pragma, and invokes the binary.
//!
//! The resolution core ([`version`]) is pure and synchronous: it parses the
//! pragma, normalizes legacy npm-style operators to PEP 440, and picks the
//! newest satisfying version from a catalog snapshot. The [`install`] layer
//! supplies that catalog (local binaries plus the GitHub release index) and
//! the [`compiler`] layer wraps the selected binary as a subprocess.
//!
//! ```
//! use std::str::FromStr;
//! use vvm::{CatalogSnapshot, Version, detect_version_from_source};
//!
//! let source = "# pragma version ~=0.3.0\n\n@external\ndef foo() -> int128:\n    return 42\n";
//! let installed = vec![Version::from_str("0.3.10").unwrap()];
//! let catalog = CatalogSnapshot::new(installed, Vec::new());
//! let version = detect_version_from_source(source, &catalog, None)?;
//! assert_eq!(version.to_string(), "0.3.10");
//! # Ok::<(), vvm::DetectError>(())
//! ```

pub mod compiler;
pub mod config;
pub mod error;
pub mod install;
pub mod version;

pub use error::{CompileError, DetectError, InstallError};
pub use pep508_rs::pep440_rs::{Version, VersionSpecifier, VersionSpecifiers};
pub use version::pragma::{detect_version_specifier, extract_pragma, parse_specifier};
pub use version::select::{
    CatalogSnapshot, VersionCatalog, detect_version_from_source, pick_version,
};
