//! Djinn definitions.

use serde::{Deserialize, Serialize};

use crate::element::Element;

/// Data-driven Djinn definition.
///
/// # Example RON
///
/// ```ron
/// DjinnData(
///     id: "flint",
///     name: "Flint",
///     element: Venus,
///     granted_abilities: ["stone-spike"],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DjinnData {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Element driving stat compatibility.
    pub element: Element,
    /// Abilities usable only while this Djinn is Set.
    #[serde(default)]
    pub granted_abilities: Vec<String>,
}

impl DjinnData {
    /// Check local constraints.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.id.is_empty() {
            errors.push("Djinn with empty id".to_string());
        }
        if self.element == Element::Neutral {
            errors.push(format!("Djinn '{}' must have an element", self.id));
        }
        errors
    }
}
