//! # settlecore-router
//!
//! Best-price routing for one token pair across a fixed list of venues.
//!
//! The [`RouteAggregator`] never prices or fills trades itself. It asks a
//! [`QuoteSource`] what each enabled venue would pay, picks the largest
//! output (lowest venue id on ties), takes its fee of `fee_bps` (5 by
//! default) from the input and hands the rest to a [`VenueExecutor`].
//! [`PoolVenues`] implements both ports over settlecore escrow pools.

pub mod aggregator;
pub mod pool_venues;
mod registry;
#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;
pub mod venue;

pub use aggregator::RouteAggregator;
pub use pool_venues::PoolVenues;
pub use venue::{
    AggregatorStats, BestRoute, ExecutedRoute, PriceComparison, Quote, QuoteSource, RouteInfo,
    VenueExecutor, VenueInfo,
};
