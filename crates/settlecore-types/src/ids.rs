//! Identifiers used throughout settlecore.
//!
//! Accounts use UUIDv7 for time-ordered sorting. Swap and venue ids are
//! small integers assigned by the engine that owns them.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// An account that can hold balances, initiate swaps and own pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AccountId(pub Uuid);

impl AccountId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// First eight hex characters, for compact log lines.
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0.as_bytes()[..4])
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// TokenPair
// ---------------------------------------------------------------------------

/// Type alias for asset identifiers (e.g., "APT", "USDC").
pub type Asset = String;

/// An ordered pair of assets. `x` is always the first side of a swap or pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct TokenPair {
    pub x: Asset,
    pub y: Asset,
}

impl TokenPair {
    #[must_use]
    pub fn new(x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
        }
    }

    #[must_use]
    pub fn symbol(&self) -> String {
        format!("{}/{}", self.x, self.y)
    }

    /// The (input, output) assets for a trade in `direction`.
    #[must_use]
    pub fn sides(&self, direction: Direction) -> (&str, &str) {
        match direction {
            Direction::XToY => (&self.x, &self.y),
            Direction::YToX => (&self.y, &self.x),
        }
    }
}

impl fmt::Display for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.x, self.y)
    }
}

/// Which way a trade crosses a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    XToY,
    YToX,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::XToY => write!(f, "X_TO_Y"),
            Self::YToX => write!(f, "Y_TO_X"),
        }
    }
}

// ---------------------------------------------------------------------------
// SwapId
// ---------------------------------------------------------------------------

/// Per-initiator swap sequence number. Starts at 0 and is never reused.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct SwapId(pub u64);

impl SwapId {
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SwapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "swap:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// VenueId
// ---------------------------------------------------------------------------

/// Identifier of a routing venue. Assigned 1..=N at registry initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct VenueId(pub u8);

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "venue:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// PoolKey
// ---------------------------------------------------------------------------

/// Pools are identified by their owning admin and the pair they trade.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PoolKey {
    pub owner: AccountId,
    pub pair: TokenPair,
}

impl PoolKey {
    #[must_use]
    pub fn new(owner: AccountId, pair: TokenPair) -> Self {
        Self { owner, pair }
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool:{}@{}", self.pair, self.owner.short())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
