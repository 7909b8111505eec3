//! Version resolution engine
//!
//! Resolves the vyper version a source file asks for:
//!
//! ```text
//! source text ──▶ pragma (extract + normalize) ──▶ specifier set
//!                                                      │
//!                   installed / installable ──▶ select ┴──▶ Version
//! ```
//!
//! Versions and specifiers are PEP 440 values from `pep440_rs`, matching the
//! syntax vyper itself adopted in 0.4.0; npm-style pragmas from older
//! contracts are normalized before parsing.
//!
//! # Modules
//!
//! - [`pragma`]: pragma comment extraction and legacy-operator normalization
//! - [`select`]: catalog abstraction and version selection

pub mod pragma;
pub mod select;
