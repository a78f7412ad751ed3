//! Story flags and chapter gating driven by finished encounters.
//!
//! Every operation is idempotent: completing an encounter twice yields the
//! same flags, and the chapter never goes backwards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BattleError, Result};
use crate::events::BattleEvent;
use crate::turn_order::BattleOutcome;

/// Chapter reached after the final boss.
pub const CREDITS_CHAPTER: u32 = 4;

/// Narrative progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryState {
    /// Current chapter, starting at 1.
    pub chapter: u32,
    /// Flags set so far.
    pub flags: BTreeMap<String, bool>,
}

impl Default for StoryState {
    fn default() -> Self {
        Self {
            chapter: 1,
            flags: BTreeMap::new(),
        }
    }
}

impl StoryState {
    /// Whether `flag` is set.
    #[must_use]
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.get(flag).copied().unwrap_or(false)
    }

    /// Whether every flag in `required` is set.
    #[must_use]
    pub fn can_access(&self, required: &[&str]) -> bool {
        required.iter().all(|f| self.has_flag(f))
    }

    /// Snapshot with `flag` set to `value`.
    #[must_use]
    pub fn with_flag(&self, flag: impl Into<String>, value: bool) -> Self {
        let mut next = self.clone();
        next.flags.insert(flag.into(), value);
        next
    }
}

/// Map an encounter id to its story flag.
///
/// ```text
/// c1_boss       -> boss:ch1
/// c2_mini_boss  -> miniboss:ch2
/// c2_miniboss   -> miniboss:ch2
/// c3_normal_4   -> encounter:ch3:4
/// boss:ch1      -> boss:ch1
/// house-01      -> house-01
/// ```
#[must_use]
pub fn encounter_flag_key(encounter_id: &str) -> String {
    if let Some((chapter, rest)) = split_chapter(encounter_id) {
        match rest {
            "boss" => return format!("boss:ch{chapter}"),
            "mini_boss" | "miniboss" => return format!("miniboss:ch{chapter}"),
            _ => {
                if let Some(n) = rest.strip_prefix("normal_") {
                    return format!("encounter:ch{chapter}:{n}");
                }
            }
        }
    }
    encounter_id.to_string()
}

/// `c{n}_{rest}` with a numeric chapter.
fn split_chapter(encounter_id: &str) -> Option<(u32, &str)> {
    let (head, rest) = encounter_id.strip_prefix('c')?.split_once('_')?;
    head.parse().ok().map(|chapter| (chapter, rest))
}

/// Set the flag for a completed encounter.
#[must_use]
pub fn process_encounter_completion(state: &StoryState, encounter_id: &str) -> StoryState {
    let key = encounter_flag_key(encounter_id);
    debug!(encounter = %encounter_id, flag = %key, "Encounter completed");
    state.with_flag(key, true)
}

/// Move to the next chapter after beating the current chapter's boss.
///
/// Accepts an encounter id or a flag key. Fails when `completed` does not
/// close the current chapter.
pub fn advance_chapter(state: &StoryState, completed: &str) -> Result<StoryState> {
    let key = encounter_flag_key(completed);
    let closes_chapter = state.chapter < CREDITS_CHAPTER && key == format!("boss:ch{}", state.chapter);
    if !closes_chapter {
        return Err(BattleError::InvalidState(format!(
            "No chapter transition available for {completed} ({key}) at chapter {}",
            state.chapter
        )));
    }
    let mut next = state.with_flag(key, true);
    next.chapter += 1;
    debug!(chapter = next.chapter, "Chapter advanced");
    Ok(next)
}

/// Fold an `EncounterFinished` event into the story.
///
/// Defeats and other events leave the story untouched. A victory sets the
/// encounter flag and advances the chapter when it was the chapter boss.
#[must_use]
pub fn apply_battle_outcome(state: &StoryState, event: &BattleEvent) -> StoryState {
    match event {
        BattleEvent::EncounterFinished {
            encounter_id,
            outcome: BattleOutcome::PlayerVictory,
        } => {
            let next = process_encounter_completion(state, encounter_id);
            advance_chapter(&next, encounter_id).unwrap_or(next)
        }
        _ => state.clone(),
    }
}
