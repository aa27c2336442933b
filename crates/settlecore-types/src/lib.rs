//! # settlecore-types
//!
//! Shared types, errors, and configuration for the **settlecore** engines.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`AccountId`], [`SwapId`], [`VenueId`], [`PoolKey`], [`TokenPair`]
//! - **Authorization**: [`Authority`], [`AdminToken`]
//! - **Time**: [`Clock`], [`SystemClock`], [`ManualClock`]
//! - **Audit trail**: [`Event`], [`EventRecord`]
//! - **Configuration**: [`SwapConfig`], [`PoolConfig`], [`AggregatorConfig`], [`SettleConfig`]
//! - **Errors**: [`SettleError`] with `SC_ERR_` prefix codes
//! - **Math**: widening `u64` arithmetic in [`math`]
//! - **Constants**: fees, default timeout and price scale

pub mod auth;
pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod math;

pub use auth::*;
pub use clock::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;

// Constants and math helpers are accessed by module path
// (`settlecore_types::constants::FOO`, `settlecore_types::math::mul_div`).
