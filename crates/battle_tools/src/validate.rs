//! Data validation utilities.

use std::path::Path;

use crate::loader::{load_content, DataLoadResult};

/// Validate all RON data files in a directory.
///
/// Returns the number of definitions loaded.
///
/// # Errors
///
/// Returns an error if any data file fails to load or validate.
pub fn validate_data_directory(path: &Path) -> DataLoadResult<usize> {
    let registry = load_content(path)?;
    Ok(registry.len())
}
