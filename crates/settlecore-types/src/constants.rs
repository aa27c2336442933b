//! System-wide constants for settlecore.

/// One basis point is 1/10000.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Swap timeout applied when the initiator passes 0 seconds.
pub const DEFAULT_SWAP_TIMEOUT_SECS: u64 = 3600;

/// Escrow pool input fee (0.30%).
pub const POOL_FEE_BPS: u64 = 30;

/// Route aggregator fee taken from every routed swap (0.05%).
pub const AGGREGATOR_FEE_BPS: u64 = 5;

/// Fixed-point scale of pool spot prices (8 decimal places).
pub const PRICE_SCALE: u64 = 100_000_000;

/// Decimal places matching [`PRICE_SCALE`].
pub const PRICE_PRECISION: u32 = 8;

/// Venue ids are a `u8` starting at 1.
pub const MAX_VENUES: usize = 255;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
