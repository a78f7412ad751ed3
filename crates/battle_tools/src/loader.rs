//! Content loading from RON files on disk.
//!
//! A content directory holds one file per definition kind. Each file is
//! a RON list:
//!
//! ```text
//! assets/data/
//!   abilities.ron   [Ability(..), ..]
//!   equipment.ron   [Equipment(..), ..]
//!   djinn.ron       [DjinnData(..), ..]
//!   units.ron       [UnitData(..), ..]
//!   enemies.ron     [EnemyData(..), ..]
//!   encounters.ron  [EncounterData(..), ..]
//! ```
//!
//! Missing files are skipped with a warning. Everything is validated once
//! all files are in, so cross-file references resolve.

use std::io::Read;
use std::path::Path;

use battle_core::data::{
    Ability, ContentRegistry, DjinnData, EncounterData, EnemyData, Equipment, UnitData,
};
use battle_core::error::BattleError;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors that can occur while loading content.
#[derive(Debug, Error)]
pub enum DataLoadError {
    /// Failed to read a file or directory.
    #[error("Failed to read '{path}': {source}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a RON file.
    #[error("Failed to parse RON file '{path}': {source}")]
    Parse {
        /// Path to the file.
        path: String,
        /// Underlying parse error.
        #[source]
        source: ron::error::SpannedError,
    },

    /// Content failed validation.
    #[error("Validation failed for '{path}': {errors:?}")]
    Validation {
        /// File or directory the errors belong to.
        path: String,
        /// Every problem found.
        errors: Vec<String>,
    },
}

/// Result type for data loading operations.
pub type DataLoadResult<T> = Result<T, DataLoadError>;

/// Read and parse one RON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_ron_file<T: DeserializeOwned>(path: &Path) -> DataLoadResult<T> {
    let path_str = path.display().to_string();

    let mut file = std::fs::File::open(path).map_err(|e| DataLoadError::Io {
        path: path_str.clone(),
        source: e,
    })?;

    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| DataLoadError::Io {
            path: path_str.clone(),
            source: e,
        })?;

    ron::from_str(&contents).map_err(|e| DataLoadError::Parse {
        path: path_str,
        source: e,
    })
}

/// Load a list file if present. Missing files yield an empty list.
fn load_list<T: DeserializeOwned>(dir: &Path, file_name: &str) -> DataLoadResult<Vec<T>> {
    let path = dir.join(file_name);
    if !path.exists() {
        tracing::warn!("Content file not found, skipping: {}", path.display());
        return Ok(Vec::new());
    }
    let items: Vec<T> = load_ron_file(&path)?;
    tracing::debug!(file = %path.display(), count = items.len(), "Loaded content file");
    Ok(items)
}

/// Register every item, collecting duplicate-id errors per file.
fn register_all<T>(
    dir: &Path,
    file_name: &str,
    items: Vec<T>,
    mut add: impl FnMut(T) -> battle_core::error::Result<()>,
) -> DataLoadResult<()> {
    let mut errors = Vec::new();
    for item in items {
        match add(item) {
            Ok(()) => {}
            Err(BattleError::Validation(mut found)) => errors.append(&mut found),
            Err(other) => errors.push(other.to_string()),
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(DataLoadError::Validation {
            path: dir.join(file_name).display().to_string(),
            errors,
        })
    }
}

/// Load and validate every content file in `dir`.
///
/// # Errors
///
/// Returns an error if the directory is missing, a file fails to load, or
/// the combined content fails validation.
pub fn load_content(dir: &Path) -> DataLoadResult<ContentRegistry> {
    if !dir.is_dir() {
        return Err(DataLoadError::Io {
            path: dir.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        });
    }

    let mut registry = ContentRegistry::new();
    let abilities: Vec<Ability> = load_list(dir, "abilities.ron")?;
    register_all(dir, "abilities.ron", abilities, |a| registry.add_ability(a))?;
    let equipment: Vec<Equipment> = load_list(dir, "equipment.ron")?;
    register_all(dir, "equipment.ron", equipment, |e| registry.add_equipment(e))?;
    let djinn: Vec<DjinnData> = load_list(dir, "djinn.ron")?;
    register_all(dir, "djinn.ron", djinn, |d| registry.add_djinn(d))?;
    let units: Vec<UnitData> = load_list(dir, "units.ron")?;
    register_all(dir, "units.ron", units, |u| registry.add_unit(u))?;
    let enemies: Vec<EnemyData> = load_list(dir, "enemies.ron")?;
    register_all(dir, "enemies.ron", enemies, |e| registry.add_enemy(e))?;
    let encounters: Vec<EncounterData> = load_list(dir, "encounters.ron")?;
    register_all(dir, "encounters.ron", encounters, |e| registry.add_encounter(e))?;

    let errors = registry.validate();
    if !errors.is_empty() {
        return Err(DataLoadError::Validation {
            path: dir.display().to_string(),
            errors,
        });
    }

    tracing::info!(
        "Loaded {} definitions from {}",
        registry.len(),
        dir.display()
    );
    Ok(registry)
}
