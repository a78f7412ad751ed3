//! Error types for the battle core.
//!
//! Errors fall into two families. Player-facing validation failures are
//! recoverable and leave battle state untouched; the orchestration layer
//! reports them to the UI. Everything else signals a caller bug or bad
//! content and should fail loudly.

use thiserror::Error;

/// Result type alias using [`BattleError`].
pub type Result<T> = std::result::Result<T, BattleError>;

/// Top-level error type for all battle core errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BattleError {
    /// Operation attempted in the wrong battle phase.
    #[error("Operation requires {expected} phase, battle is in {actual}")]
    WrongPhase {
        /// Phase the operation needs.
        expected: String,
        /// Phase the battle is actually in.
        actual: String,
    },

    /// No unit with this id takes part in the battle.
    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    /// The acting unit is knocked out.
    #[error("Unit {0} is knocked out")]
    UnitKnockedOut(String),

    /// The unit does not know or has not unlocked the ability.
    #[error("Unit {unit_id} cannot use ability {ability_id}")]
    AbilityUnavailable {
        /// Acting unit.
        unit_id: String,
        /// Requested ability.
        ability_id: String,
    },

    /// The ability is unlocked but temporarily inaccessible.
    #[error("Ability {ability_id} is locked: {reason}")]
    AbilityLocked {
        /// Requested ability.
        ability_id: String,
        /// Player-facing reason.
        reason: String,
    },

    /// An action was queued without any target.
    #[error("Action needs at least one target")]
    NoTargets,

    /// A target id does not name a unit in the battle.
    #[error("Unknown target: {0}")]
    UnknownTarget(String),

    /// Not enough shared mana left to queue the action.
    #[error("Cannot afford action: need {required} mana, have {available}")]
    InsufficientMana {
        /// Mana cost of the action.
        required: u32,
        /// Mana left in the pool.
        available: u32,
    },

    /// Round execution requested with living units still unqueued.
    #[error("Queue incomplete: no action queued for {0}")]
    QueueIncomplete(String),

    /// Queued actions cost more than the team can spend in one round.
    #[error("Queued actions cost {total} mana, budget is {budget}")]
    ManaBudgetExceeded {
        /// Total queued cost.
        total: u32,
        /// Team maximum mana.
        budget: u32,
    },

    /// Djinn cannot be queued or equipped in its current state.
    #[error("Djinn {djinn_id} unavailable: {reason}")]
    DjinnUnavailable {
        /// Djinn id.
        djinn_id: String,
        /// Why it cannot be used.
        reason: String,
    },

    /// Healing amount below zero.
    #[error("Healing amount must be non-negative, got {0}")]
    NegativeHealing(i64),

    /// Plain healing targeted a knocked out unit.
    #[error("Cannot heal knocked out unit {0} without a revive")]
    HealKnockedOut(String),

    /// Teams must have a fixed roster size.
    #[error("Team must have exactly {expected} units, got {actual}")]
    InvalidTeamSize {
        /// Required roster size.
        expected: usize,
        /// Provided roster size.
        actual: usize,
    },

    /// Internal state does not satisfy an invariant.
    #[error("Invalid battle state: {0}")]
    InvalidState(String),

    /// Content file could not be parsed.
    #[error("Failed to parse data '{path}': {message}")]
    DataParse {
        /// Source identifier.
        path: String,
        /// Parser message.
        message: String,
    },

    /// Content failed schema or cross-reference validation.
    #[error("Content validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

impl BattleError {
    /// Whether this error is a recoverable, player-facing validation failure.
    ///
    /// These leave the battle state exactly as it was before the call.
    #[must_use]
    pub const fn is_player_facing(&self) -> bool {
        matches!(
            self,
            Self::WrongPhase { .. }
                | Self::UnknownUnit(_)
                | Self::UnitKnockedOut(_)
                | Self::AbilityUnavailable { .. }
                | Self::AbilityLocked { .. }
                | Self::NoTargets
                | Self::UnknownTarget(_)
                | Self::InsufficientMana { .. }
                | Self::QueueIncomplete(_)
                | Self::ManaBudgetExceeded { .. }
                | Self::DjinnUnavailable { .. }
        )
    }
}
