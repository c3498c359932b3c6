use std::collections::HashSet;

use filedrop_core::{extension_of, FileServiceConfig, ValidationOutcome};

/// Reasons an upload is refused by policy
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("file size {size} exceeds maximum allowed size {max}")]
    FileTooLarge { size: u64, max: u64 },

    /// The batch error text stays `extension not supported`; the rejected
    /// extension travels in `extension` (`None` when the name has none).
    #[error("extension not supported")]
    UnsupportedExtension { extension: Option<String> },
}

/// Upload policy check
///
/// Pure: looks only at the declared name and size, never at storage.
#[derive(Debug, Clone)]
pub struct FileValidator {
    max_file_size: u64,
    supported_extensions: HashSet<String>,
}

impl FileValidator {
    pub fn new<I, S>(max_file_size: u64, supported_extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            max_file_size,
            supported_extensions: supported_extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &FileServiceConfig) -> Self {
        Self::new(config.max_file_size_bytes, config.supported_extensions())
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    pub fn is_supported_extension(&self, extension: &str) -> bool {
        self.supported_extensions
            .contains(&extension.trim_start_matches('.').to_lowercase())
    }

    pub fn validate_file_size(&self, size: u64) -> Result<(), ValidationError> {
        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }
        Ok(())
    }

    pub fn validate_extension(&self, filename: &str) -> Result<(), ValidationError> {
        match extension_of(filename) {
            Some(ext) if self.supported_extensions.contains(&ext) => Ok(()),
            extension => Err(ValidationError::UnsupportedExtension { extension }),
        }
    }

    /// Size first, then extension.
    pub fn check(&self, filename: &str, declared_size: u64) -> Result<(), ValidationError> {
        self.validate_file_size(declared_size)?;
        self.validate_extension(filename)
    }

    pub fn validate(&self, filename: &str, declared_size: u64) -> ValidationOutcome {
        match self.check(filename, declared_size) {
            Ok(()) => ValidationOutcome::accept(),
            Err(e) => ValidationOutcome::reject(e.to_string()),
        }
    }
}
