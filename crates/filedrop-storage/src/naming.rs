//! Safe namer
//!
//! Turns an untrusted client filename into a name that is safe to create under
//! the storage root. Sanitizing is pure; collision resolution walks the suffix
//! sequence `name.ext`, `name_1.ext`, `name_2.ext`, ... against a set of names
//! already taken.

use std::collections::HashSet;

use filedrop_core::constants::{FALLBACK_BASE_NAME, MAX_BASE_NAME_CHARS};
use filedrop_core::split_file_name;

/// Sanitized stem plus the original-case extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedName {
    base: String,
    extension: Option<String>,
}

impl SanitizedName {
    pub fn new(base: impl Into<String>, extension: Option<String>) -> Self {
        let base = base.into();
        let base = if base.is_empty() {
            FALLBACK_BASE_NAME.to_string()
        } else {
            base
        };
        Self { base, extension }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    /// Same base with another extension.
    pub fn with_extension(&self, extension: &str) -> Self {
        Self {
            base: self.base.clone(),
            extension: Some(extension.to_string()),
        }
    }

    /// The n-th name in the collision sequence; `0` is the bare name.
    pub fn candidate(&self, n: u32) -> String {
        let stem = if n == 0 {
            self.base.clone()
        } else {
            format!("{}_{}", self.base, n)
        };
        match &self.extension {
            Some(ext) => format!("{stem}.{ext}"),
            None => stem,
        }
    }

    /// Lowest suffix index whose candidate is not in `taken`.
    pub fn first_free(&self, taken: &HashSet<String>) -> u32 {
        (0..)
            .find(|n| !taken.contains(&self.candidate(*n)))
            .unwrap_or(0)
    }
}

/// Strip directories, drop disallowed characters and cap the stem length.
///
/// Alphanumerics (any script), space, `-` and `_` survive. A stem that ends up
/// empty becomes `unnamed`.
pub fn sanitize(raw: &str) -> SanitizedName {
    let (stem, extension) = split_file_name(raw);

    let filtered: String = stem
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let base: String = filtered
        .trim_end()
        .chars()
        .take(MAX_BASE_NAME_CHARS)
        .collect::<String>()
        .trim_end()
        .to_string();

    let extension = extension
        .map(|e| e.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
        .filter(|e| !e.is_empty());

    SanitizedName::new(base, extension)
}

/// Final name for `raw` given the names currently present.
pub fn resolve(raw: &str, existing: &HashSet<String>) -> String {
    let name = sanitize(raw);
    name.candidate(name.first_free(existing))
}
