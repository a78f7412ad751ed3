//! Elemental affinities and the advantage triangle.

use serde::{Deserialize, Serialize};

/// Damage multiplier when the attacking element beats the defender.
pub const ADVANTAGE_MULTIPLIER: f64 = 1.5;

/// Damage multiplier when the defender's element beats the attacker.
pub const DISADVANTAGE_MULTIPLIER: f64 = 0.67;

/// Elemental affinity of units, abilities and Djinn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Element {
    /// Earth.
    Venus,
    /// Fire.
    Mars,
    /// Wind.
    Jupiter,
    /// Water.
    Mercury,
    /// No affinity.
    #[default]
    Neutral,
}

impl Element {
    /// The element this one deals bonus damage to.
    #[must_use]
    pub const fn beats(self) -> Option<Element> {
        match self {
            Element::Venus => Some(Element::Jupiter),
            Element::Mars => Some(Element::Venus),
            Element::Mercury => Some(Element::Mars),
            Element::Jupiter => Some(Element::Mercury),
            Element::Neutral => None,
        }
    }

    /// Opposing element for Djinn compatibility (Venus/Mars, Jupiter/Mercury).
    #[must_use]
    pub const fn counter(self) -> Option<Element> {
        match self {
            Element::Venus => Some(Element::Mars),
            Element::Mars => Some(Element::Venus),
            Element::Jupiter => Some(Element::Mercury),
            Element::Mercury => Some(Element::Jupiter),
            Element::Neutral => None,
        }
    }
}

/// Damage multiplier for an attack of element `attack` against `defense`.
#[must_use]
pub fn element_modifier(attack: Element, defense: Element) -> f64 {
    if attack.beats() == Some(defense) {
        ADVANTAGE_MULTIPLIER
    } else if defense.beats() == Some(attack) {
        DISADVANTAGE_MULTIPLIER
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_forward_and_reverse() {
        assert_eq!(element_modifier(Element::Venus, Element::Jupiter), 1.5);
        assert_eq!(element_modifier(Element::Mars, Element::Venus), 1.5);
        assert_eq!(element_modifier(Element::Mercury, Element::Mars), 1.5);
        assert_eq!(element_modifier(Element::Jupiter, Element::Mercury), 1.5);

        assert_eq!(element_modifier(Element::Jupiter, Element::Venus), 0.67);
        assert_eq!(element_modifier(Element::Venus, Element::Mars), 0.67);
    }

    #[test]
    fn test_neutral_and_same_element() {
        assert_eq!(element_modifier(Element::Neutral, Element::Mars), 1.0);
        assert_eq!(element_modifier(Element::Mars, Element::Neutral), 1.0);
        assert_eq!(element_modifier(Element::Venus, Element::Venus), 1.0);
        // Non-adjacent pairs are neutral
        assert_eq!(element_modifier(Element::Venus, Element::Mercury), 1.0);
    }
}
