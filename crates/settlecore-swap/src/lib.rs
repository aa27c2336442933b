//! # settlecore-swap
//!
//! Bilateral time-locked atomic swaps: an initiator escrows asset X for a
//! named participant, who can claim it by paying asset Y before the
//! timeout. After the timeout the initiator can take X back instead.
//!
//! ## Flow
//!
//! ```text
//! initiate ──▶ CREATED ──complete (before timeout)──▶ COMPLETED
//!                 │
//!                 └──────cancel (at/after timeout)───▶ CANCELLED
//! ```
//!
//! There is no arbiter. Safety rests on `complete` moving both sides in
//! one step and on `cancel` being unreachable before the timeout.

pub mod engine;
pub mod swap;

pub use engine::AtomicSwapEngine;
pub use swap::{SwapDetails, SwapState};
