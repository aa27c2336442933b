//! Structured event records for the settlement audit trail.
//!
//! Every state-changing operation appends one [`EventRecord`] to the log of
//! the registry it touched (the swap initiator, the pool owner or the
//! router admin). Records are a side channel: nothing in the core reads
//! them back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{AccountId, Direction, SwapId, TokenPair, VenueId};

/// The payload of an event record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SwapInitiated {
        swap_id: SwapId,
        initiator: AccountId,
        participant: AccountId,
        pair: TokenPair,
        amount_x: u64,
        amount_y: u64,
        timeout: u64,
        timestamp: u64,
    },
    SwapCompleted {
        swap_id: SwapId,
        initiator: AccountId,
        participant: AccountId,
        pair: TokenPair,
        amount_x: u64,
        amount_y: u64,
        timestamp: u64,
    },
    SwapCancelled {
        swap_id: SwapId,
        initiator: AccountId,
        participant: AccountId,
        pair: TokenPair,
        amount_x: u64,
        timestamp: u64,
    },
    PoolCreated {
        owner: AccountId,
        pair: TokenPair,
        reserve_x: u64,
        reserve_y: u64,
        timestamp: u64,
    },
    PoolSwap {
        owner: AccountId,
        user: AccountId,
        direction: Direction,
        amount_in: u64,
        amount_out: u64,
        fee: u64,
        timestamp: u64,
    },
    LiquidityAdded {
        owner: AccountId,
        amount_x: u64,
        amount_y: u64,
        timestamp: u64,
    },
    LiquidityRemoved {
        owner: AccountId,
        amount_x: u64,
        amount_y: u64,
        timestamp: u64,
    },
    PoolFeesCollected {
        owner: AccountId,
        amount_x: u64,
        amount_y: u64,
        timestamp: u64,
    },
    RouterInitialized {
        admin: AccountId,
        venues: u8,
        timestamp: u64,
    },
    VenueToggled {
        venue_id: VenueId,
        enabled: bool,
        timestamp: u64,
    },
    AggregatedSwap {
        user: AccountId,
        venue_id: VenueId,
        amount_in: u64,
        amount_out: u64,
        fee: u64,
        timestamp: u64,
    },
    RouteComparison {
        amount_in: u64,
        best_venue_id: VenueId,
        best_output: u64,
        worst_output: u64,
        price_diff_bps: u64,
        timestamp: u64,
    },
    RouterFeesCollected {
        admin: AccountId,
        amount: u64,
        timestamp: u64,
    },
}

impl Event {
    /// Stable name of the event kind, e.g. `"swap_initiated"`.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SwapInitiated { .. } => "swap_initiated",
            Self::SwapCompleted { .. } => "swap_completed",
            Self::SwapCancelled { .. } => "swap_cancelled",
            Self::PoolCreated { .. } => "pool_created",
            Self::PoolSwap { .. } => "pool_swap",
            Self::LiquidityAdded { .. } => "liquidity_added",
            Self::LiquidityRemoved { .. } => "liquidity_removed",
            Self::PoolFeesCollected { .. } => "pool_fees_collected",
            Self::RouterInitialized { .. } => "router_initialized",
            Self::VenueToggled { .. } => "venue_toggled",
            Self::AggregatedSwap { .. } => "aggregated_swap",
            Self::RouteComparison { .. } => "route_comparison",
            Self::RouterFeesCollected { .. } => "router_fees_collected",
        }
    }
}

/// One append-only audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Time-ordered record id.
    pub id: Uuid,
    /// Owner of the log this record belongs to.
    pub registry: AccountId,
    pub event: Event,
    pub emitted_at: DateTime<Utc>,
    /// SHA-256 over the domain tag and the JSON payload.
    pub digest: [u8; 32],
}

impl EventRecord {
    #[must_use]
    pub fn new(registry: AccountId, event: Event) -> Self {
        let digest = Self::compute_digest(&event);
        Self {
            id: Uuid::now_v7(),
            registry,
            event,
            emitted_at: Utc::now(),
            digest,
        }
    }

    fn compute_digest(event: &Event) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(b"settlecore:event:v1:");
        hasher.update(serde_json::to_vec(event).unwrap_or_default());
        hasher.finalize().into()
    }

    /// Whether `digest` still matches the payload.
    #[must_use]
    pub fn verify_digest(&self) -> bool {
        Self::compute_digest(&self.event) == self.digest
    }

    #[must_use]
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }
}
