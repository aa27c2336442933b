//! End-to-end tests across the three engines sharing one ledger, one
//! clock and one event sink.
//!
//! Atomic swaps settle bilateral trades, two independently administered
//! escrow pools act as routing venues, and the aggregator routes between
//! them. After every flow the minted supply of each asset must equal the
//! account balances plus everything held in swap and pool custody.

use std::sync::Arc;

use settlecore_ledger::{InMemoryLedger, LedgerAccess, MemoryEventSink};
use settlecore_pool::EscrowPoolEngine;
use settlecore_router::{PoolVenues, RouteAggregator};
use settlecore_swap::AtomicSwapEngine;
use settlecore_types::*;

struct Deployment {
    ledger: Arc<InMemoryLedger>,
    events: Arc<MemoryEventSink>,
    clock: Arc<ManualClock>,
    swaps: AtomicSwapEngine,
    pools: [Arc<EscrowPoolEngine>; 2],
    keys: [PoolKey; 2],
    aggregator: RouteAggregator,
    router_admin: AccountId,
    alice: AccountId,
    bob: AccountId,
    carol: AccountId,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn deploy() -> Deployment {
    init_tracing();
    let pair = TokenPair::new("APT", "USDC");
    let [alice, bob, carol] = [AccountId::new(), AccountId::new(), AccountId::new()];
    let pool_admins = [AccountId::new(), AccountId::new()];
    let router_admin = AccountId::new();

    let ledger = Arc::new(InMemoryLedger::funded(&[
        (alice, "APT", 1_000_000_000),
        (bob, "USDC", 100_000_000),
        (carol, "APT", 100_000),
        (pool_admins[0], "APT", 10_000),
        (pool_admins[0], "USDC", 20_000),
        (pool_admins[1], "APT", 10_000),
        (pool_admins[1], "USDC", 25_000),
    ]));
    let events = Arc::new(MemoryEventSink::new());
    let clock = Arc::new(ManualClock::new(1_700_000_000));
    let config = SettleConfig::from_json(
        r#"{
            "swap": { "default_timeout_secs": 3600 },
            "pool": { "fee_bps": 30 },
            "aggregator": {
                "fee_bps": 5,
                "pair": { "x": "APT", "y": "USDC" },
                "venues": ["Liquidswap", "PancakeSwap", "Thala"]
            }
        }"#,
    )
    .unwrap();

    let swaps = AtomicSwapEngine::new(
        config.swap.clone(),
        ledger.clone(),
        events.clone(),
        clock.clone(),
    )
    .unwrap();

    let pools = pool_admins.map(|admin| {
        Arc::new(
            EscrowPoolEngine::new(
                config.pool.clone(),
                Authority::new(admin),
                ledger.clone(),
                events.clone(),
                clock.clone(),
            )
            .unwrap(),
        )
    });
    let keys = [
        pools[0].create_pool(pool_admins[0], &pair, 10_000, 20_000).unwrap(),
        pools[1].create_pool(pool_admins[1], &pair, 10_000, 25_000).unwrap(),
    ];

    // Venue 3 has no pool behind it and always quotes nothing.
    let venues = Arc::new(
        PoolVenues::new(router_admin)
            .with_venue(VenueId(1), pools[0].clone(), keys[0].clone(), Direction::XToY)
            .with_venue(VenueId(2), pools[1].clone(), keys[1].clone(), Direction::XToY),
    );
    let aggregator = RouteAggregator::new(
        config.aggregator.clone(),
        Authority::new(router_admin),
        venues.clone(),
        venues,
        ledger.clone(),
        events.clone(),
        clock.clone(),
    )
    .unwrap();
    aggregator.initialize(router_admin).unwrap();

    Deployment {
        ledger,
        events,
        clock,
        swaps,
        pools,
        keys,
        aggregator,
        router_admin,
        alice,
        bob,
        carol,
    }
}

impl Deployment {
    fn pair(&self) -> TokenPair {
        self.aggregator.pair().clone()
    }

    fn assert_conserved(&self) {
        for asset in ["APT", "USDC"] {
            let held = self.swaps.held_total(asset)
                + self.pools.iter().map(|p| p.held_total(asset)).sum::<u64>();
            self.ledger.verify_supply(asset, held).unwrap();
        }
    }
}

#[test]
fn atomic_swaps_settle_and_refund_on_shared_ledger() {
    let d = deploy();
    let pair = d.pair();

    let settled = d
        .swaps
        .initiate(d.alice, &pair, d.bob, 100_000_000, 10_000_000, 3600)
        .unwrap();
    d.clock.advance(60);
    d.swaps.complete(d.bob, &pair, d.alice, settled).unwrap();
    assert_eq!(d.ledger.balance(d.alice, "USDC"), 10_000_000);
    assert_eq!(d.ledger.balance(d.bob, "APT"), 100_000_000);

    let abandoned = d
        .swaps
        .initiate(d.alice, &pair, d.bob, 5_000, 500, 0)
        .unwrap();
    d.assert_conserved();
    d.clock.advance(3600);
    assert_eq!(
        d.swaps.complete(d.bob, &pair, d.alice, abandoned),
        Err(SettleError::SwapExpired)
    );
    d.swaps.cancel(d.alice, &pair, abandoned).unwrap();
    assert_eq!(d.ledger.balance(d.alice, "APT"), 900_000_000);
    d.assert_conserved();
}

#[test]
fn aggregator_routes_to_deepest_pool() {
    let d = deploy();

    let comparison = d.aggregator.compare_prices(10_000).unwrap();
    let (venue1_out, _) = d.pools[0].get_quote_x_to_y(&d.keys[0], 10_000).unwrap();
    let (venue2_out, _) = d.pools[1].get_quote_x_to_y(&d.keys[1], 10_000).unwrap();
    assert_eq!(comparison.best_venue_id, VenueId(2));
    assert_eq!(comparison.best_output, venue2_out);
    assert_eq!(comparison.worst_output, venue1_out);

    let routes = d.aggregator.get_all_routes(10_000).unwrap();
    assert_eq!(routes.len(), 2);

    // The venue only sees the input net of the aggregator fee.
    let (expected_out, _) = d.pools[1].get_quote_x_to_y(&d.keys[1], 9_995).unwrap();
    let route = d.aggregator.swap_best_route(d.carol, 10_000, 0).unwrap();
    assert_eq!(route.venue_id, VenueId(2));
    assert_eq!(route.fee, 5);
    assert_eq!(route.amount_out, expected_out);
    assert_eq!(d.ledger.balance(d.carol, "USDC"), expected_out);
    assert_eq!(d.ledger.balance(d.router_admin, "APT"), 5);

    let info = d.pools[1].get_pool_info(&d.keys[1]).unwrap();
    assert_eq!(info.swap_count, 1);
    assert_eq!(d.pools[0].get_pool_info(&d.keys[0]).unwrap().swap_count, 0);
    d.assert_conserved();

    d.aggregator
        .toggle_venue(d.router_admin, VenueId(2), false)
        .unwrap();
    assert_eq!(
        d.aggregator.find_best_route(10_000).unwrap().venue_id,
        VenueId(1)
    );
    assert_eq!(
        d.aggregator.swap_specific_venue(d.carol, VenueId(3), 10_000, 0),
        Err(SettleError::InsufficientLiquidity)
    );
    d.aggregator
        .swap_specific_venue(d.carol, VenueId(1), 10_000, 0)
        .unwrap();

    let stats = d.aggregator.stats().unwrap();
    assert_eq!(
        (stats.total_swaps, stats.total_volume, stats.fees_collected),
        (2, 20_000, 10)
    );
    d.assert_conserved();
}

#[test]
fn venue_slippage_after_fee_refunds_the_user() {
    let d = deploy();
    let (gross_out, _) = d.pools[1].get_quote_x_to_y(&d.keys[1], 10_000).unwrap();
    let (net_out, _) = d.pools[1].get_quote_x_to_y(&d.keys[1], 9_995).unwrap();
    assert!(net_out < gross_out);

    // The gross quote clears the minimum but the fee-reduced fill doesn't.
    assert_eq!(
        d.aggregator.swap_best_route(d.carol, 10_000, gross_out),
        Err(SettleError::SlippageExceeded {
            min_amount_out: gross_out,
            amount_out: net_out
        })
    );
    assert_eq!(d.ledger.balance(d.carol, "APT"), 100_000);
    assert_eq!(d.ledger.balance(d.router_admin, "APT"), 0);
    assert_eq!(d.aggregator.stats().unwrap().total_swaps, 0);
    assert_eq!(d.pools[1].get_pool_info(&d.keys[1]).unwrap().swap_count, 0);
    d.assert_conserved();
}

#[test]
fn every_emitted_record_is_attributed_and_verifiable() {
    let d = deploy();
    let pair = d.pair();
    let id = d
        .swaps
        .initiate(d.alice, &pair, d.bob, 1_000, 100, 0)
        .unwrap();
    d.swaps.complete(d.bob, &pair, d.alice, id).unwrap();
    d.aggregator.compare_prices(1_000).unwrap();
    d.aggregator.swap_best_route(d.carol, 1_000, 0).unwrap();

    let records = d.events.records();
    assert!(records.iter().all(EventRecord::verify_digest));
    for kind in [
        "pool_created",
        "router_initialized",
        "swap_initiated",
        "swap_completed",
        "route_comparison",
        "pool_swap",
        "aggregated_swap",
    ] {
        assert!(!d.events.of_kind(kind).is_empty(), "missing {kind}");
    }

    let pool_swap = &d.events.of_kind("pool_swap")[0];
    assert_eq!(pool_swap.registry, d.keys[1].owner);
    match &pool_swap.event {
        Event::PoolSwap { user, .. } => assert_eq!(*user, d.router_admin),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(
        d.events.of_kind("aggregated_swap")[0].registry,
        d.router_admin
    );
}
