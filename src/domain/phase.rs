//! Turn phases and the pure transition decision.
//!
//! The phase is not stored between turns; it is recomputed each turn from
//! the trip record's completeness, the session flags and the user's message.
//! Keeping the decision a pure function makes the controller's branching
//! directly testable without any I/O.

use serde::{Deserialize, Serialize};

/// Fixed acknowledgement vocabulary for confirmation detection.
///
/// Matching is case-insensitive substring membership. Deliberately no
/// negation handling: a phrase like "no, esperá" simply fails to match only
/// if none of these appear as substrings.
const AFFIRMATIVE_TOKENS: [&str; 8] = [
    "si",
    "sí",
    "ok",
    "dale",
    "listo",
    "estamos listos",
    "estamos bien",
    "perfecto",
];

/// The phase a turn resolves into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    /// Required trip fields are still missing; keep asking.
    Gathering,
    /// Record is complete; waiting for the user to confirm or amend.
    Confirming,
    /// User confirmed; run the search and produce the itinerary.
    Searching,
    /// An itinerary was already produced this session.
    Delivered,
}

/// What the controller should do this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnAction {
    /// Relay the model's follow-up question for missing fields.
    RelayModelReply,
    /// Show the confirmation summary of collected fields.
    AskConfirmation,
    /// Run the search aggregator and generate the itinerary.
    RunSearch,
}

/// Outcome of the per-turn phase decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnDecision {
    pub phase: TurnPhase,
    pub action: TurnAction,
}

/// True when the message contains one of the acknowledgement tokens.
pub fn is_affirmative(message: &str) -> bool {
    let lowered = message.to_lowercase();
    AFFIRMATIVE_TOKENS
        .iter()
        .any(|token| lowered.contains(token))
}

/// Pure transition: `(completeness, confirmation, flags) -> decision`.
pub fn plan_turn(
    record_complete: bool,
    user_confirmed: bool,
    search_completed: bool,
) -> TurnDecision {
    if !record_complete {
        return TurnDecision {
            phase: TurnPhase::Gathering,
            action: TurnAction::RelayModelReply,
        };
    }
    if user_confirmed && !search_completed {
        return TurnDecision {
            phase: TurnPhase::Searching,
            action: TurnAction::RunSearch,
        };
    }
    // Complete but unconfirmed, or the user came back after delivery:
    // re-show the summary and let them confirm or amend.
    TurnDecision {
        phase: if search_completed {
            TurnPhase::Delivered
        } else {
            TurnPhase::Confirming
        },
        action: TurnAction::AskConfirmation,
    }
}
