//! # settlecore-ledger
//!
//! The leaf collaborators every engine is built on:
//!
//! 1. **Coin**: exclusive custody of a balance, moved only by `merge`/`extract`
//! 2. **LedgerAccess**: withdraw coins from and deposit coins into accounts
//! 3. **EventSink**: append-only audit log
//! 4. **SupplyConservation**: minted supply vs. balances + custody
//!
//! ```text
//! account ──withdraw──▶ Coin ──held by swap / pool──▶ Coin ──deposit──▶ account
//! ```

pub mod coin;
pub mod ledger;
pub mod sink;
pub mod supply_conservation;

pub use coin::{Coin, CoinRejection};
pub use ledger::{InMemoryLedger, LedgerAccess};
pub use sink::{EventSink, MemoryEventSink, NullEventSink, TracingEventSink};
pub use supply_conservation::SupplyConservation;
