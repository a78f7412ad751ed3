//! Battle recordings.
//!
//! A replay stores the seed, the serialized starting state and every
//! round's plan. Re-running the plans against a fresh generator seeded
//! with the same value must reproduce the recorded final hash.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::battle::{execute_round, queue_action, queue_djinn, BattleState, QueuedAction};
use crate::error::{BattleError, Result};
use crate::rng::SeededRng;

/// Replay file format version.
pub const REPLAY_VERSION: u32 = 1;

/// What the player committed to in one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RoundPlan {
    /// Queued actions in roster order.
    pub actions: Vec<QueuedAction>,
    /// Djinn queued for summoning.
    pub djinn: Vec<String>,
}

impl RoundPlan {
    /// Capture the plan queued in `state`.
    #[must_use]
    pub fn from_state(state: &BattleState) -> Self {
        Self {
            actions: state.queued_actions.iter().flatten().cloned().collect(),
            djinn: state.queued_djinn.clone(),
        }
    }

    /// Queue this plan onto `state`.
    pub fn apply(&self, state: &BattleState) -> Result<BattleState> {
        let mut next = state.clone();
        for djinn_id in &self.djinn {
            next = queue_djinn(&next, djinn_id)?;
        }
        for action in &self.actions {
            next = queue_action(&next, &action.unit_id, &action.ability_id, &action.target_ids)?;
        }
        Ok(next)
    }
}

/// Serialize a battle state with bincode.
pub fn serialize_state(state: &BattleState) -> Result<Vec<u8>> {
    bincode::serialize(state)
        .map_err(|e| BattleError::InvalidState(format!("Failed to serialize battle: {e}")))
}

/// Deserialize a battle state written by [`serialize_state`].
pub fn deserialize_state(bytes: &[u8]) -> Result<BattleState> {
    bincode::deserialize(bytes)
        .map_err(|e| BattleError::InvalidState(format!("Failed to deserialize battle: {e}")))
}

/// Hash of the full battle state.
///
/// Computed over the bincode encoding, so every field contributes.
/// Returns 0 if the state cannot be encoded.
#[must_use]
pub fn state_hash(state: &BattleState) -> u64 {
    let mut hasher = DefaultHasher::new();
    match serialize_state(state) {
        Ok(bytes) => bytes.hash(&mut hasher),
        Err(e) => {
            warn!(error = %e, "State hash over unencodable state");
            return 0;
        }
    }
    hasher.finish()
}

/// Complete recorded battle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleReplay {
    /// Format version.
    pub version: u32,
    /// Encounter the battle belonged to.
    pub encounter_id: Option<String>,
    /// Seed of the battle's generator.
    pub seed: u64,
    /// Serialized starting state.
    pub initial_state: Vec<u8>,
    /// One plan per executed round.
    pub rounds: Vec<RoundPlan>,
    /// Round counter after the last recorded round.
    pub final_round: u32,
    /// [`state_hash`] of the final state.
    pub final_hash: u64,
}

impl BattleReplay {
    /// Start recording from `initial`.
    pub fn new(seed: u64, initial: &BattleState) -> Result<Self> {
        Ok(Self {
            version: REPLAY_VERSION,
            encounter_id: initial.config.encounter_id.clone(),
            seed,
            initial_state: serialize_state(initial)?,
            rounds: Vec::new(),
            final_round: initial.current_turn,
            final_hash: state_hash(initial),
        })
    }

    /// Record the plan about to be executed.
    pub fn record_round(&mut self, plan: RoundPlan) {
        self.rounds.push(plan);
    }

    /// Store the end state.
    pub fn finalize(&mut self, state: &BattleState) {
        self.final_round = state.current_turn;
        self.final_hash = state_hash(state);
    }

    /// Write the replay to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = bincode::serialize(self)
            .map_err(|e| BattleError::InvalidState(format!("Failed to serialize replay: {e}")))?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| BattleError::InvalidState(format!("Failed to write replay file: {e}")))
    }

    /// Read a replay from `path`, rejecting other format versions.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| BattleError::InvalidState(format!("Failed to read replay file: {e}")))?;
        let replay: Self = bincode::deserialize(&bytes)
            .map_err(|e| BattleError::InvalidState(format!("Failed to deserialize replay: {e}")))?;
        if replay.version != REPLAY_VERSION {
            return Err(BattleError::InvalidState(format!(
                "Replay version mismatch: expected {REPLAY_VERSION}, got {}",
                replay.version
            )));
        }
        Ok(replay)
    }

    /// Decode the starting state.
    pub fn restore_initial_state(&self) -> Result<BattleState> {
        deserialize_state(&self.initial_state)
    }

    /// Re-run every recorded round and return the final state.
    pub fn play(&self) -> Result<BattleState> {
        let mut rng = SeededRng::new(self.seed);
        let mut state = self.restore_initial_state()?;
        for (i, plan) in self.rounds.iter().enumerate() {
            let queued = plan.apply(&state)?;
            state = execute_round(&queued, &mut rng)?.state;
            debug!(round = i + 1, phase = ?state.phase, "Replayed round");
        }
        Ok(state)
    }

    /// Whether playback reproduces the recorded final hash.
    pub fn verify(&self) -> Result<bool> {
        let state = self.play()?;
        Ok(state.current_turn == self.final_round && state_hash(&state) == self.final_hash)
    }
}
