//! Bundle quality validation.
//!
//! Bundles are produced by an external translation pipeline. Problems in them
//! never stop a bundle from being installed, but they are reported so they can
//! be fixed upstream.

use crate::bundle::{TranslationBundle, DOT_PLACEHOLDER};
use crate::message_format::{argument_names, parse_pattern};
use regex::Regex;
use std::sync::OnceLock;

/// Validation report containing errors and warnings about a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    /// Entries that will render wrongly
    pub errors: Vec<String>,

    /// Entries that look suspicious
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        !self.has_errors() && !self.has_warnings()
    }
}

/// Validator for translation bundles.
pub struct BundleValidator;

static IDENTIFIER_REGEX: OnceLock<Regex> = OnceLock::new();

impl BundleValidator {
    /// Validate every entry of a bundle.
    ///
    /// Errors:
    /// - empty translation strings
    /// - patterns that do not parse as ICU MessageFormat (unbalanced braces,
    ///   a `plural` or `select` without an `other` branch, ...)
    ///
    /// Warnings:
    /// - keys containing a raw `.` instead of the dot placeholder
    /// - arguments whose name is not a plain identifier
    ///
    /// Findings are sorted by key so reports are stable.
    pub fn validate(bundle: &TranslationBundle) -> ValidationReport {
        let mut report = ValidationReport::new();

        let mut keys: Vec<&String> = bundle.keys().collect();
        keys.sort();

        for key in keys {
            let text = &bundle[key].string;

            if key.contains('.') {
                report.warnings.push(format!(
                    "Key '{}' contains an unencoded '.', expected '{}'",
                    key, DOT_PLACEHOLDER
                ));
            }

            if text.trim().is_empty() {
                report
                    .errors
                    .push(format!("Key '{}' has an empty translation", key));
                continue;
            }

            let segments = match parse_pattern(text) {
                Ok(segments) => segments,
                Err(reason) => {
                    report
                        .errors
                        .push(format!("Key '{}' is not a valid message: {}", key, reason));
                    continue;
                }
            };

            for name in argument_names(&segments) {
                if !Self::is_identifier(name) {
                    report.warnings.push(format!(
                        "Key '{}' has argument '{}' that is not a plain name",
                        key, name
                    ));
                }
            }
        }

        report
    }

    fn is_identifier(name: &str) -> bool {
        let regex =
            IDENTIFIER_REGEX.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());
        regex.is_match(name.trim())
    }
}
