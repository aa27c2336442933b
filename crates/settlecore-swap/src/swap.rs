//! # Swap: one bilateral time-locked exchange
//!
//! ## State Machine
//!
//! ```text
//!   ┌─────────┐  complete (now < timeout)  ┌───────────┐
//!   │ CREATED ├───────────────────────────▶│ COMPLETED │
//!   └────┬────┘                            └───────────┘
//!        │ cancel (now ≥ timeout)
//!        ▼
//!   ┌───────────┐
//!   │ CANCELLED │
//!   └───────────┘
//! ```
//!
//! Both terminal states are absorbing. On entering either one the swap's
//! custody slots are emptied, and the record is kept for audit.

use serde::{Deserialize, Serialize};
use settlecore_ledger::Coin;
use settlecore_types::{AccountId, Result, SettleError, SwapId, TokenPair};

/// Lifecycle state of a swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapState {
    /// X is escrowed; waiting for the participant or the timeout.
    Created,
    /// Participant paid Y; X and Y were exchanged.
    Completed,
    /// Timeout passed and X went back to the initiator.
    Cancelled,
}

impl SwapState {
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Created, Self::Completed | Self::Cancelled)
        )
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Created)
    }
}

impl std::fmt::Display for SwapState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// A swap record together with the value it holds.
#[derive(Debug)]
pub struct Swap {
    pub(crate) id: SwapId,
    pub(crate) initiator: AccountId,
    pub(crate) participant: AccountId,
    pub(crate) pair: TokenPair,
    pub(crate) amount_x: u64,
    pub(crate) amount_y: u64,
    pub(crate) timeout: u64,
    pub(crate) state: SwapState,
    pub(crate) coin_x: Coin,
    pub(crate) coin_y: Coin,
}

impl Swap {
    pub(crate) fn new(
        id: SwapId,
        initiator: AccountId,
        participant: AccountId,
        pair: TokenPair,
        coin_x: Coin,
        amount_y: u64,
        timeout: u64,
    ) -> Self {
        let coin_y = Coin::zero(pair.y.clone());
        Self {
            id,
            initiator,
            participant,
            amount_x: coin_x.value(),
            pair,
            amount_y,
            timeout,
            state: SwapState::Created,
            coin_x,
            coin_y,
        }
    }

    #[must_use]
    pub fn is_expired_at(&self, now: u64) -> bool {
        now >= self.timeout
    }

    pub(crate) fn transition(&mut self, target: SwapState) -> Result<()> {
        if !self.state.can_transition_to(target) {
            return Err(SettleError::AlreadyTerminal);
        }
        self.state = target;
        Ok(())
    }

    /// Value of `asset` currently in this swap's custody.
    pub(crate) fn held(&self, asset: &str) -> u64 {
        [&self.coin_x, &self.coin_y]
            .into_iter()
            .filter(|c| c.asset() == asset)
            .map(Coin::value)
            .sum()
    }

    #[must_use]
    pub fn details(&self) -> SwapDetails {
        SwapDetails {
            swap_id: self.id,
            initiator: self.initiator,
            participant: self.participant,
            pair: self.pair.clone(),
            amount_x: self.amount_x,
            amount_y: self.amount_y,
            timeout: self.timeout,
            completed: self.state == SwapState::Completed,
            cancelled: self.state == SwapState::Cancelled,
            held_x: self.coin_x.value(),
            held_y: self.coin_y.value(),
        }
    }
}

/// Read-only copy of a swap returned by queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapDetails {
    pub swap_id: SwapId,
    pub initiator: AccountId,
    pub participant: AccountId,
    pub pair: TokenPair,
    pub amount_x: u64,
    pub amount_y: u64,
    pub timeout: u64,
    pub completed: bool,
    pub cancelled: bool,
    /// X still in custody (`amount_x` while open, 0 once terminal).
    pub held_x: u64,
    /// Y in custody (always 0 outside of `complete`).
    pub held_y: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_transitions_valid() {
        assert!(SwapState::Created.can_transition_to(SwapState::Completed));
        assert!(SwapState::Created.can_transition_to(SwapState::Cancelled));
    }

    #[test]
    fn terminal_states_are_absorbing() {
        for terminal in [SwapState::Completed, SwapState::Cancelled] {
            assert!(terminal.is_terminal());
            for target in [SwapState::Created, SwapState::Completed, SwapState::Cancelled] {
                assert!(!terminal.can_transition_to(target));
            }
        }
        assert!(!SwapState::Created.is_terminal());
    }

    #[test]
    fn state_display() {
        assert_eq!(SwapState::Cancelled.to_string(), "CANCELLED");
    }
}
