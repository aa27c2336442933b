//! # settlecore-pool
//!
//! Admin-owned constant-product escrow pools. Traders sell one side of a
//! pair against the pool's reserves; a fee of `fee_bps` (30 by default) is
//! taken from every input before the curve is applied:
//!
//! ```text
//! net  = floor(amount_in * (10000 - fee_bps) / 10000)
//! out  = floor(reserve_out * net / (reserve_in + net))
//! ```
//!
//! Fees stay inside the input side's reserve until the admin collects
//! them, so every swap with a non-zero fee strictly grows
//! `reserve_x * reserve_y`.

pub mod engine;
pub mod pool;

pub use engine::EscrowPoolEngine;
pub use pool::{PoolInfo, SwapQuote};
