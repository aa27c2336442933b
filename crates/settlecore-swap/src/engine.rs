//! Atomic swap engine.
//!
//! Swaps are filed per `(initiator, pair)` in a [`SwapBook`] with its own
//! lock, so unrelated initiators never contend. Every operation holds the
//! book lock for its whole duration and performs all checks before the
//! first transfer, so a failed call leaves balances and records untouched.

use std::{collections::HashMap, sync::Arc};

use parking_lot::{Mutex, RwLock};
use settlecore_ledger::{EventSink, LedgerAccess};
use settlecore_types::{
    AccountId, Clock, Event, EventRecord, Result, SettleError, SwapConfig, SwapId, TokenPair,
};

use crate::swap::{Swap, SwapDetails, SwapState};

type BookKey = (AccountId, TokenPair);

/// All swaps of one initiator for one pair. `swaps[i].id == SwapId(i)`.
#[derive(Debug, Default)]
struct SwapBook {
    next_id: SwapId,
    swaps: Vec<Swap>,
}

impl SwapBook {
    fn get(&self, swap_id: SwapId) -> Result<&Swap> {
        usize::try_from(swap_id.0)
            .ok()
            .and_then(|i| self.swaps.get(i))
            .ok_or_else(|| SettleError::not_found(swap_id.to_string()))
    }

    fn get_mut(&mut self, swap_id: SwapId) -> Result<&mut Swap> {
        usize::try_from(swap_id.0)
            .ok()
            .and_then(|i| self.swaps.get_mut(i))
            .ok_or_else(|| SettleError::not_found(swap_id.to_string()))
    }
}

/// Escrows X from an initiator until the named participant pays Y, or
/// refunds X once the timeout has passed.
pub struct AtomicSwapEngine {
    config: SwapConfig,
    books: RwLock<HashMap<BookKey, Arc<Mutex<SwapBook>>>>,
    ledger: Arc<dyn LedgerAccess>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
}

impl AtomicSwapEngine {
    /// Create an engine over the given collaborators.
    ///
    /// # Errors
    /// Returns `Configuration` if `config` is invalid.
    pub fn new(
        config: SwapConfig,
        ledger: Arc<dyn LedgerAccess>,
        events: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            books: RwLock::new(HashMap::new()),
            ledger,
            events,
            clock,
        })
    }

    fn book(&self, initiator: AccountId, pair: &TokenPair) -> Option<Arc<Mutex<SwapBook>>> {
        self.books.read().get(&(initiator, pair.clone())).cloned()
    }

    fn book_or_create(&self, initiator: AccountId, pair: &TokenPair) -> Arc<Mutex<SwapBook>> {
        if let Some(book) = self.book(initiator, pair) {
            return book;
        }
        Arc::clone(
            self.books
                .write()
                .entry((initiator, pair.clone()))
                .or_default(),
        )
    }

    fn existing_book(
        &self,
        initiator: AccountId,
        pair: &TokenPair,
    ) -> Result<Arc<Mutex<SwapBook>>> {
        self.book(initiator, pair).ok_or_else(|| {
            SettleError::not_found(format!("no swaps of {} for {pair}", initiator.short()))
        })
    }

    /// Escrow `amount_x` of `pair.x` from `initiator` for `participant`.
    ///
    /// A `timeout_secs` of 0 uses the configured default (3600s).
    ///
    /// # Errors
    /// - `ZeroAmount` if either amount is 0
    /// - `NotAuthorized` if `participant == initiator`
    /// - `InsufficientBalance` if the initiator can't fund `amount_x`
    pub fn initiate(
        &self,
        initiator: AccountId,
        pair: &TokenPair,
        participant: AccountId,
        amount_x: u64,
        amount_y_expected: u64,
        timeout_secs: u64,
    ) -> Result<SwapId> {
        if amount_x == 0 || amount_y_expected == 0 {
            return Err(SettleError::ZeroAmount);
        }
        if participant == initiator {
            return Err(SettleError::NotAuthorized);
        }
        let secs = if timeout_secs == 0 {
            self.config.default_timeout_secs
        } else {
            timeout_secs
        };
        let now = self.clock.now();
        let timeout = now
            .checked_add(secs)
            .ok_or(SettleError::ArithmeticOverflow)?;

        let book = self.book_or_create(initiator, pair);
        let mut book = book.lock();

        let coin_x = self.ledger.withdraw(initiator, &pair.x, amount_x)?;

        let swap_id = book.next_id;
        book.next_id = swap_id.next();
        book.swaps.push(Swap::new(
            swap_id,
            initiator,
            participant,
            pair.clone(),
            coin_x,
            amount_y_expected,
            timeout,
        ));

        tracing::info!(
            swap = %swap_id,
            initiator = %initiator,
            participant = %participant,
            pair = %pair,
            amount_x,
            amount_y = amount_y_expected,
            timeout,
            "Swap initiated"
        );
        self.events.emit(EventRecord::new(
            initiator,
            Event::SwapInitiated {
                swap_id,
                initiator,
                participant,
                pair: pair.clone(),
                amount_x,
                amount_y: amount_y_expected,
                timeout,
                timestamp: now,
            },
        ));
        Ok(swap_id)
    }

    /// Pay `amount_y` and receive the escrowed X, crediting Y to the initiator
    /// in the same step.
    ///
    /// # Errors
    /// - `NotFound` if the swap doesn't exist
    /// - `NotAuthorized` if the caller isn't the swap's participant
    /// - `AlreadyTerminal` if the swap was completed or cancelled
    /// - `SwapExpired` if the timeout has passed (only `cancel` remains)
    /// - `InsufficientBalance` if the participant can't pay `amount_y`
    pub fn complete(
        &self,
        participant: AccountId,
        pair: &TokenPair,
        initiator: AccountId,
        swap_id: SwapId,
    ) -> Result<()> {
        let book = self.existing_book(initiator, pair)?;
        let mut book = book.lock();
        let swap = book.get_mut(swap_id)?;

        if swap.participant != participant {
            return Err(SettleError::NotAuthorized);
        }
        if swap.state.is_terminal() {
            return Err(SettleError::AlreadyTerminal);
        }
        let now = self.clock.now();
        if swap.is_expired_at(now) {
            tracing::warn!(
                swap = %swap_id,
                initiator = %initiator,
                timeout = swap.timeout,
                now,
                "Completion attempted after timeout"
            );
            return Err(SettleError::SwapExpired);
        }

        let coin_y = self.ledger.withdraw(participant, &pair.y, swap.amount_y)?;
        if let Err(rejection) = swap.coin_y.merge(coin_y) {
            let (err, refund) = rejection.into_parts();
            self.ledger.deposit(participant, refund);
            return Err(err);
        }

        swap.transition(SwapState::Completed)?;
        let paid_x = swap.coin_x.extract_all();
        let paid_y = swap.coin_y.extract_all();
        let (amount_x, amount_y) = (paid_x.value(), paid_y.value());
        self.ledger.deposit(participant, paid_x);
        self.ledger.deposit(initiator, paid_y);

        tracing::info!(
            swap = %swap_id,
            initiator = %initiator,
            participant = %participant,
            amount_x,
            amount_y,
            "Swap completed"
        );
        self.events.emit(EventRecord::new(
            initiator,
            Event::SwapCompleted {
                swap_id,
                initiator,
                participant,
                pair: pair.clone(),
                amount_x,
                amount_y,
                timestamp: now,
            },
        ));
        Ok(())
    }

    /// Refund the escrowed X to the initiator after the timeout.
    ///
    /// # Errors
    /// - `NotFound` if the caller has no such swap
    /// - `AlreadyTerminal` if the swap was completed or cancelled
    /// - `SwapNotExpired` if the timeout hasn't been reached
    pub fn cancel(&self, initiator: AccountId, pair: &TokenPair, swap_id: SwapId) -> Result<()> {
        let book = self.existing_book(initiator, pair)?;
        let mut book = book.lock();
        let swap = book.get_mut(swap_id)?;

        if swap.state.is_terminal() {
            return Err(SettleError::AlreadyTerminal);
        }
        let now = self.clock.now();
        if !swap.is_expired_at(now) {
            return Err(SettleError::SwapNotExpired);
        }

        swap.transition(SwapState::Cancelled)?;
        let refund = swap.coin_x.extract_all();
        let amount_x = refund.value();
        let participant = swap.participant;
        self.ledger.deposit(initiator, refund);

        tracing::info!(swap = %swap_id, initiator = %initiator, amount_x, "Swap cancelled");
        self.events.emit(EventRecord::new(
            initiator,
            Event::SwapCancelled {
                swap_id,
                initiator,
                participant,
                pair: pair.clone(),
                amount_x,
                timestamp: now,
            },
        ));
        Ok(())
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    pub fn get_swap_details(
        &self,
        initiator: AccountId,
        pair: &TokenPair,
        swap_id: SwapId,
    ) -> Result<SwapDetails> {
        let book = self.existing_book(initiator, pair)?;
        let book = book.lock();
        Ok(book.get(swap_id)?.details())
    }

    /// Whether the swap's timeout has been reached (`now >= timeout`).
    pub fn is_expired(
        &self,
        initiator: AccountId,
        pair: &TokenPair,
        swap_id: SwapId,
    ) -> Result<bool> {
        let book = self.existing_book(initiator, pair)?;
        let book = book.lock();
        Ok(book.get(swap_id)?.is_expired_at(self.clock.now()))
    }

    /// The id the initiator's next swap on `pair` will receive.
    #[must_use]
    pub fn next_swap_id(&self, initiator: AccountId, pair: &TokenPair) -> SwapId {
        self.book(initiator, pair)
            .map(|book| book.lock().next_id)
            .unwrap_or_default()
    }

    /// Every swap the initiator has opened on `pair`, oldest first.
    #[must_use]
    pub fn swaps_of(&self, initiator: AccountId, pair: &TokenPair) -> Vec<SwapDetails> {
        self.book(initiator, pair)
            .map(|book| book.lock().swaps.iter().map(Swap::details).collect())
            .unwrap_or_default()
    }

    /// Total value of `asset` escrowed across all open swaps.
    #[must_use]
    pub fn held_total(&self, asset: &str) -> u64 {
        let books: Vec<_> = self.books.read().values().cloned().collect();
        books
            .iter()
            .map(|book| book.lock().swaps.iter().map(|s| s.held(asset)).sum::<u64>())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use settlecore_ledger::{InMemoryLedger, MemoryEventSink};
    use settlecore_types::ManualClock;

    const START: u64 = 1_700_000_000;

    struct Fixture {
        engine: AtomicSwapEngine,
        ledger: Arc<InMemoryLedger>,
        events: Arc<MemoryEventSink>,
        clock: Arc<ManualClock>,
        pair: TokenPair,
        alice: AccountId,
        bob: AccountId,
    }

    fn setup() -> Fixture {
        let ledger = Arc::new(InMemoryLedger::new());
        let events = Arc::new(MemoryEventSink::new());
        let clock = Arc::new(ManualClock::new(START));
        let engine = AtomicSwapEngine::new(
            SwapConfig::default(),
            ledger.clone(),
            events.clone(),
            clock.clone(),
        )
        .unwrap();
        let pair = TokenPair::new("APT", "USDC");
        let alice = AccountId::new();
        let bob = AccountId::new();
        ledger.mint(alice, "APT", 1_000_000_000).unwrap();
        ledger.mint(bob, "USDC", 100_000_000).unwrap();
        Fixture {
            engine,
            ledger,
            events,
            clock,
            pair,
            alice,
            bob,
        }
    }

    #[test]
    fn initiate_escrows_exactly_amount_x() {
        let f = setup();
        let id = f
            .engine
            .initiate(f.alice, &f.pair, f.bob, 100_000_000, 10_000_000, 3600)
            .unwrap();
        assert_eq!(id, SwapId(0));
        assert_eq!(f.ledger.balance(f.alice, "APT"), 900_000_000);
        assert_eq!(f.ledger.balance(f.bob, "APT"), 0);
        assert_eq!(f.ledger.balance(f.bob, "USDC"), 100_000_000);
        assert_eq!(f.engine.held_total("APT"), 100_000_000);

        let details = f.engine.get_swap_details(f.alice, &f.pair, id).unwrap();
        assert_eq!(details.timeout, START + 3600);
        assert_eq!(details.held_x, 100_000_000);
        assert!(!details.completed && !details.cancelled);
        assert_eq!(f.events.of_kind("swap_initiated").len(), 1);
    }

    #[test]
    fn zero_timeout_uses_default() {
        let f = setup();
        let id = f.engine.initiate(f.alice, &f.pair, f.bob, 1, 1, 0).unwrap();
        let details = f.engine.get_swap_details(f.alice, &f.pair, id).unwrap();
        assert_eq!(details.timeout, START + 3600);
    }

    #[test]
    fn zero_amounts_rejected() {
        let f = setup();
        assert_eq!(
            f.engine.initiate(f.alice, &f.pair, f.bob, 0, 1, 0),
            Err(SettleError::ZeroAmount)
        );
        assert_eq!(
            f.engine.initiate(f.alice, &f.pair, f.bob, 1, 0, 0),
            Err(SettleError::ZeroAmount)
        );
        assert_eq!(f.engine.next_swap_id(f.alice, &f.pair), SwapId(0));
        assert!(f.events.is_empty());
    }

    #[test]
    fn self_swap_rejected() {
        let f = setup();
        let err = f
            .engine
            .initiate(f.alice, &f.pair, f.alice, 1, 1, 0)
            .unwrap_err();
        assert_eq!(err, SettleError::NotAuthorized);
    }

    #[test]
    fn underfunded_initiate_allocates_no_id() {
        let f = setup();
        let err = f
            .engine
            .initiate(f.bob, &f.pair, f.alice, 5, 5, 0)
            .unwrap_err();
        assert!(matches!(err, SettleError::InsufficientBalance { .. }));
        assert_eq!(f.engine.next_swap_id(f.bob, &f.pair), SwapId(0));
        assert!(f.engine.swaps_of(f.bob, &f.pair).is_empty());
    }

    #[test]
    fn ids_are_monotonic_per_initiator() {
        let f = setup();
        for expected in 0..3 {
            let id = f.engine.initiate(f.alice, &f.pair, f.bob, 10, 10, 0).unwrap();
            assert_eq!(id, SwapId(expected));
        }
        assert_eq!(f.engine.next_swap_id(f.alice, &f.pair), SwapId(3));
        // A different pair has its own counter.
        let other = TokenPair::new("APT", "BTC");
        assert_eq!(f.engine.next_swap_id(f.alice, &other), SwapId(0));
    }

    #[test]
    fn complete_exchanges_both_sides() {
        let f = setup();
        let id = f
            .engine
            .initiate(f.alice, &f.pair, f.bob, 100_000_000, 10_000_000, 3600)
            .unwrap();
        f.clock.advance(3599);
        f.engine.complete(f.bob, &f.pair, f.alice, id).unwrap();

        assert_eq!(f.ledger.balance(f.alice, "USDC"), 10_000_000);
        assert_eq!(f.ledger.balance(f.bob, "APT"), 100_000_000);
        assert_eq!(f.ledger.balance(f.bob, "USDC"), 90_000_000);
        let details = f.engine.get_swap_details(f.alice, &f.pair, id).unwrap();
        assert!(details.completed);
        assert!(!details.cancelled);
        assert_eq!((details.held_x, details.held_y), (0, 0));
        assert_eq!(f.engine.held_total("APT"), 0);
        f.ledger.verify_supply("APT", 0).unwrap();
        f.ledger.verify_supply("USDC", 0).unwrap();
    }

    #[test]
    fn complete_by_stranger_rejected() {
        let f = setup();
        let id = f.engine.initiate(f.alice, &f.pair, f.bob, 10, 10, 0).unwrap();
        let mallory = AccountId::new();
        f.ledger.mint(mallory, "USDC", 100).unwrap();
        let err = f.engine.complete(mallory, &f.pair, f.alice, id).unwrap_err();
        assert_eq!(err, SettleError::NotAuthorized);
        assert_eq!(f.ledger.balance(mallory, "USDC"), 100);
    }

    #[test]
    fn complete_at_timeout_is_expired() {
        let f = setup();
        let id = f.engine.initiate(f.alice, &f.pair, f.bob, 10, 10, 60).unwrap();
        f.clock.advance(60);
        let err = f.engine.complete(f.bob, &f.pair, f.alice, id).unwrap_err();
        assert_eq!(err, SettleError::SwapExpired);
        assert_eq!(f.ledger.balance(f.bob, "USDC"), 100_000_000);
        assert!(f.engine.is_expired(f.alice, &f.pair, id).unwrap());
    }

    #[test]
    fn underfunded_complete_changes_nothing() {
        let f = setup();
        let id = f
            .engine
            .initiate(f.alice, &f.pair, f.bob, 10, 200_000_000, 0)
            .unwrap();
        let err = f.engine.complete(f.bob, &f.pair, f.alice, id).unwrap_err();
        assert!(matches!(err, SettleError::InsufficientBalance { .. }));
        let details = f.engine.get_swap_details(f.alice, &f.pair, id).unwrap();
        assert!(!details.completed);
        assert_eq!(details.held_x, 10);
        assert_eq!(f.ledger.balance(f.bob, "USDC"), 100_000_000);
    }

    #[test]
    fn cancel_before_timeout_rejected() {
        let f = setup();
        let id = f.engine.initiate(f.alice, &f.pair, f.bob, 10, 10, 60).unwrap();
        f.clock.advance(59);
        assert_eq!(
            f.engine.cancel(f.alice, &f.pair, id),
            Err(SettleError::SwapNotExpired)
        );
        assert!(!f.engine.is_expired(f.alice, &f.pair, id).unwrap());
    }

    #[test]
    fn cancel_after_timeout_refunds_in_full() {
        let f = setup();
        let id = f
            .engine
            .initiate(f.alice, &f.pair, f.bob, 100_000_000, 10_000_000, 3600)
            .unwrap();
        f.clock.advance(3600);
        f.engine.cancel(f.alice, &f.pair, id).unwrap();

        assert_eq!(f.ledger.balance(f.alice, "APT"), 1_000_000_000);
        assert_eq!(f.ledger.balance(f.bob, "APT"), 0);
        let details = f.engine.get_swap_details(f.alice, &f.pair, id).unwrap();
        assert!(details.cancelled);
        assert_eq!(details.held_x, 0);

        // Completion is gone for good.
        let err = f.engine.complete(f.bob, &f.pair, f.alice, id).unwrap_err();
        assert_eq!(err, SettleError::AlreadyTerminal);
        assert_eq!(f.events.of_kind("swap_cancelled").len(), 1);
    }

    #[test]
    fn terminal_events_identify_the_swap() {
        let f = setup();
        let done = f.engine.initiate(f.alice, &f.pair, f.bob, 10, 10, 60).unwrap();
        let dropped = f.engine.initiate(f.alice, &f.pair, f.bob, 10, 10, 60).unwrap();
        f.engine.complete(f.bob, &f.pair, f.alice, done).unwrap();
        f.clock.advance(60);
        f.engine.cancel(f.alice, &f.pair, dropped).unwrap();

        match &f.events.of_kind("swap_completed")[0].event {
            Event::SwapCompleted {
                swap_id,
                participant,
                pair,
                ..
            } => {
                assert_eq!(*swap_id, done);
                assert_eq!(*participant, f.bob);
                assert_eq!(pair, &f.pair);
            }
            other => panic!("unexpected {other:?}"),
        }
        match &f.events.of_kind("swap_cancelled")[0].event {
            Event::SwapCancelled {
                swap_id,
                participant,
                pair,
                amount_x,
                ..
            } => {
                assert_eq!(*swap_id, dropped);
                assert_eq!(*participant, f.bob);
                assert_eq!(pair, &f.pair);
                assert_eq!(*amount_x, 10);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn terminal_operations_fail_second_time() {
        let f = setup();
        let a = f.engine.initiate(f.alice, &f.pair, f.bob, 10, 10, 60).unwrap();
        let b = f.engine.initiate(f.alice, &f.pair, f.bob, 10, 10, 60).unwrap();
        f.engine.complete(f.bob, &f.pair, f.alice, a).unwrap();
        assert_eq!(
            f.engine.complete(f.bob, &f.pair, f.alice, a),
            Err(SettleError::AlreadyTerminal)
        );
        f.clock.advance(60);
        assert_eq!(
            f.engine.cancel(f.alice, &f.pair, a),
            Err(SettleError::AlreadyTerminal)
        );
        f.engine.cancel(f.alice, &f.pair, b).unwrap();
        assert_eq!(
            f.engine.cancel(f.alice, &f.pair, b),
            Err(SettleError::AlreadyTerminal)
        );
    }

    #[test]
    fn unknown_swap_not_found() {
        let f = setup();
        assert!(matches!(
            f.engine.cancel(f.alice, &f.pair, SwapId(0)),
            Err(SettleError::NotFound { .. })
        ));
        f.engine.initiate(f.alice, &f.pair, f.bob, 1, 1, 0).unwrap();
        assert!(matches!(
            f.engine.get_swap_details(f.alice, &f.pair, SwapId(7)),
            Err(SettleError::NotFound { .. })
        ));
        // Only the initiator's own book is searched.
        assert!(matches!(
            f.engine.cancel(f.bob, &f.pair, SwapId(0)),
            Err(SettleError::NotFound { .. })
        ));
    }
}
