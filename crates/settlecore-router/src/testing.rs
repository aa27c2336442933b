//! Test doubles for routing without real venues.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use settlecore_ledger::{Coin, CoinRejection, LedgerAccess};
use settlecore_types::{AccountId, SettleError, TokenPair, VenueId};

use crate::venue::{Quote, QuoteSource, VenueExecutor};

/// Quotes a fixed output per venue regardless of size.
#[derive(Debug, Clone, Default)]
pub struct FixedQuoteSource {
    quotes: HashMap<VenueId, Quote>,
}

impl FixedQuoteSource {
    /// `outputs[i]` is the output of venue `i + 1`, with zero price impact.
    pub fn new(outputs: &[u64]) -> Self {
        let quotes = (1..=u8::MAX)
            .zip(outputs)
            .map(|(id, &out)| (VenueId(id), Quote::new(out, 0)))
            .collect();
        Self { quotes }
    }

    #[must_use]
    pub fn with_quote(mut self, venue: VenueId, quote: Quote) -> Self {
        self.quotes.insert(venue, quote);
        self
    }
}

impl QuoteSource for FixedQuoteSource {
    fn get_quote(&self, venue: VenueId, _amount_in: u64) -> Quote {
        self.quotes.get(&venue).copied().unwrap_or(Quote::NONE)
    }
}

/// Fills every venue from one market maker's ledger balance at whatever
/// the quote source says.
pub struct MakerExecutor {
    ledger: Arc<dyn LedgerAccess>,
    maker: AccountId,
    pair: TokenPair,
    quotes: Arc<dyn QuoteSource>,
    offline: Mutex<HashSet<VenueId>>,
}

impl MakerExecutor {
    pub fn new(
        ledger: Arc<dyn LedgerAccess>,
        maker: AccountId,
        pair: TokenPair,
        quotes: Arc<dyn QuoteSource>,
    ) -> Self {
        Self {
            ledger,
            maker,
            pair,
            quotes,
            offline: Mutex::new(HashSet::new()),
        }
    }

    pub fn maker(&self) -> AccountId {
        self.maker
    }

    /// Make `venue` reject every trade.
    pub fn set_offline(&self, venue: VenueId, offline: bool) {
        let mut set = self.offline.lock();
        if offline {
            set.insert(venue);
        } else {
            set.remove(&venue);
        }
    }
}

impl VenueExecutor for MakerExecutor {
    fn execute(
        &self,
        venue: VenueId,
        coin_in: Coin,
        min_amount_out: u64,
    ) -> Result<Coin, CoinRejection> {
        if self.offline.lock().contains(&venue) {
            let error = SettleError::Internal(format!("{venue} offline"));
            return Err(CoinRejection::new(error, coin_in));
        }
        let quote = self.quotes.get_quote(venue, coin_in.value());
        if !quote.has_liquidity() {
            return Err(CoinRejection::new(SettleError::InsufficientLiquidity, coin_in));
        }
        if quote.amount_out < min_amount_out {
            let error = SettleError::SlippageExceeded {
                min_amount_out,
                amount_out: quote.amount_out,
            };
            return Err(CoinRejection::new(error, coin_in));
        }
        match self.ledger.withdraw(self.maker, &self.pair.y, quote.amount_out) {
            Ok(coin_out) => {
                self.ledger.deposit(self.maker, coin_in);
                Ok(coin_out)
            }
            Err(error) => Err(CoinRejection::new(error, coin_in)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use settlecore_ledger::InMemoryLedger;

    #[test]
    fn fixed_quotes_by_position() {
        let q = FixedQuoteSource::new(&[10, 20]).with_quote(VenueId(5), Quote::new(7, 3));
        assert_eq!(q.get_quote(VenueId(2), 1).amount_out, 20);
        assert_eq!(q.get_quote(VenueId(3), 1), Quote::NONE);
        assert_eq!(q.get_quote(VenueId(5), 1).price_impact_bps, 3);
    }

    #[test]
    fn offline_venue_hands_coin_back() {
        let user = AccountId::new();
        let maker = AccountId::new();
        let ledger = Arc::new(InMemoryLedger::funded(&[
            (user, "APT", 10),
            (maker, "USDC", 100),
        ]));
        let exec = MakerExecutor::new(
            ledger.clone(),
            maker,
            TokenPair::new("APT", "USDC"),
            Arc::new(FixedQuoteSource::new(&[50])),
        );
        exec.set_offline(VenueId(1), true);
        let coin = ledger.withdraw(user, "APT", 10).unwrap();
        let rejection = exec.execute(VenueId(1), coin, 0).unwrap_err();
        assert_eq!(rejection.refund.value(), 10);
        ledger.deposit(user, rejection.refund);

        exec.set_offline(VenueId(1), false);
        let coin = ledger.withdraw(user, "APT", 10).unwrap();
        let out = exec.execute(VenueId(1), coin, 50).unwrap();
        assert_eq!(out.value(), 50);
        assert_eq!(ledger.balance(maker, "APT"), 10);
        ledger.deposit(user, out);
    }
}
