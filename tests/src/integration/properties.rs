//! # Properties
//!
//! | Property | Statement |
//! |----------|-----------|
//! | Short-circuit | Once the peer's header at `i` equals the cached one, nothing at or below `i` is removed in that pass |
//! | Reorg | A superseded height yields one removal, each of its transactions reported once, and a refetch |
//! | Idempotence | Repeated block lookups return the same instance without new requests |
//! | Ledger delta | Applied balance adjustments net out the old state and sum to the new one |
//! | Disjointness | A transaction is never both pending and confirmed |

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use mirror_sync::domain::Step;
    use mirror_sync::protocol::{AccountResponse, BalanceEntry, DelegateEntry};
    use mirror_sync::{Command, Ledger, MockPeer, TxInclusion};
    use shared_bus::MirrorEvent;
    use shared_types::{Address, CurrencyId};

    use crate::fixtures::{removed_heights, Harness, LedgerOp};

    const ACCOUNT: &str = "0123456789abcdef0123456789abcdef01234567";

    // =============================================================================
    // SHORT-CIRCUIT
    // =============================================================================

    #[tokio::test]
    async fn test_agreeing_tip_short_circuits_below() {
        let h = Harness::new();
        h.peer.build_chain(20, 1, 1);
        h.handshake().await;
        for height in 5..20 {
            h.client.get_block_by_height(height).await.unwrap();
        }

        // Height 9 changes on the peer while 10..19 still agree.
        h.peer.put_block(9, 2, 1);
        let mut sub = h.subscribe();
        h.push_new_block().await;

        let events = sub.drain();
        assert!(removed_heights(&events).is_empty());
        assert_eq!(h.peer.request_count(Command::ChainGetBlockHeader), 16);
        assert_eq!(h.client.header_at(9).unwrap().hash, MockPeer::block_hash(9, 1));
    }

    #[tokio::test]
    async fn test_scan_stops_at_first_agreeing_height() {
        let h = Harness::new();
        h.peer.build_chain(20, 1, 0);
        h.handshake().await;

        for height in 16..20 {
            h.peer.put_block(height, 3, 0);
        }
        // Below the fork point the peer also changed height 7, which the
        // agreeing header at 15 vouches for.
        h.peer.put_block(7, 3, 0);
        let mut sub = h.subscribe();
        h.push_new_block().await;

        assert_eq!(removed_heights(&sub.drain()), vec![19, 18, 17, 16]);
        assert_eq!(h.client.header_at(7).unwrap().hash, MockPeer::block_hash(7, 1));
    }

    // =============================================================================
    // REORG
    // =============================================================================

    #[tokio::test]
    async fn test_each_transaction_reported_once() {
        let h = Harness::new();
        h.peer.build_chain(12, 1, 3);
        h.handshake().await;
        h.client.get_block_by_height(11).await.unwrap();

        // The peer also answered one of the block's transactions on its own.
        h.peer.serve_block_transactions(11);
        h.client
            .get_transaction_by_hash(MockPeer::tx_hash(11, 1, 1), false)
            .await
            .unwrap();

        h.peer.put_block(11, 4, 2);
        let mut sub = h.subscribe();
        h.push_new_block().await;
        let events = sub.drain();

        assert_eq!(removed_heights(&events), vec![11]);
        let mut reported: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                MirrorEvent::TransactionRemoved { hashes, .. } => Some(hashes.clone()),
                _ => None,
            })
            .flatten()
            .collect();
        reported.sort_unstable();
        let mut expected: Vec<_> = (0..3).map(|i| MockPeer::tx_hash(11, 1, i)).collect();
        expected.sort_unstable();
        assert_eq!(reported, expected);

        let block = h.client.get_block_by_height(11).await.unwrap().unwrap();
        assert_eq!(block.hash, MockPeer::block_hash(11, 4));
    }

    #[tokio::test]
    async fn test_uncached_body_is_not_fetched_for_new_headers() {
        let h = Harness::new();
        h.peer.build_chain(20, 1, 0);
        h.handshake().await;

        // First pass stores headers only; bodies are fetched on demand.
        assert_eq!(h.peer.request_count(Command::ChainGetBlockByHeight), 0);
        assert_eq!(h.client.cached_block_count(), 0);
    }

    // =============================================================================
    // IDEMPOTENCE
    // =============================================================================

    #[tokio::test]
    async fn test_repeated_lookups_share_one_instance() {
        let h = Harness::new();
        h.peer.build_chain(10, 1, 2);
        h.handshake().await;

        let first = h.client.get_block_by_height(6).await.unwrap().unwrap();
        for _ in 0..5 {
            let again = h.client.get_block_by_height(6).await.unwrap().unwrap();
            assert!(Arc::ptr_eq(&first, &again));
        }
        let by_hash = h.client.get_block_by_hash(first.hash).await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &by_hash));

        assert_eq!(h.peer.request_count(Command::ChainGetBlockByHeight), 1);
        assert_eq!(h.peer.request_count(Command::ChainGetBlockByHash), 0);
    }

    // =============================================================================
    // LEDGER DELTA
    // =============================================================================

    fn account_reply(balances: &BTreeMap<u8, u64>, nonce: u64, delegate_nonce: u64) -> AccountResponse {
        AccountResponse {
            balances: balances
                .iter()
                .map(|(seed, amount)| BalanceEntry {
                    currency: currency(*seed),
                    amount: *amount,
                })
                .collect(),
            nonce,
            delegate: Some(DelegateEntry {
                delegate_nonce,
                delegate_public_key: vec![9],
                delegate_stake_available: 1,
            }),
        }
    }

    fn currency(seed: u8) -> CurrencyId {
        if seed == 0 {
            CurrencyId::NATIVE
        } else {
            CurrencyId([seed; 20])
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_ledger_tracks_latest_report(
            states in prop::collection::vec(
                (prop::collection::btree_map(0u8..4, 1u64..1_000, 0..4), 0u64..20, 0u64..6),
                1..5,
            )
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                let h = Harness::new();
                let address = Address::new(ACCOUNT);
                let mut previous: BTreeMap<CurrencyId, u64> = BTreeMap::new();

                for (balances, nonce, delegate_nonce) in &states {
                    h.peer.with_state(|s| {
                        s.accounts.insert(ACCOUNT.into(), account_reply(balances, *nonce, *delegate_nonce))
                    });
                    let prev_nonce = h.ledger.snapshot(&address).await.nonce;
                    h.client.download_account_data(&address).await.unwrap().unwrap();

                    let ops = h.ledger.take_ops();
                    // Balance adjustments net the old state out and sum to the new one.
                    let mut net: BTreeMap<CurrencyId, i128> = previous
                        .iter()
                        .map(|(c, a)| (*c, i128::from(*a)))
                        .collect();
                    let mut nonce_steps = 0i128;
                    for op in &ops {
                        match op {
                            LedgerOp::Balance(c, a) => *net.entry(*c).or_insert(0) += a,
                            LedgerOp::Nonce(Step::Up) => nonce_steps += 1,
                            LedgerOp::Nonce(Step::Down) => nonce_steps -= 1,
                            _ => {}
                        }
                    }
                    net.retain(|_, a| *a != 0);
                    let expected: BTreeMap<CurrencyId, i128> = balances
                        .iter()
                        .map(|(seed, amount)| (currency(*seed), i128::from(*amount)))
                        .collect();
                    assert_eq!(net, expected);
                    assert_eq!(nonce_steps, i128::from(*nonce) - i128::from(prev_nonce));

                    let stored = h.ledger.snapshot(&address).await;
                    assert_eq!(stored.nonce, *nonce);
                    assert_eq!(stored.delegate_nonce(), *delegate_nonce);

                    previous = expected
                        .into_iter()
                        .map(|(c, a)| (c, u64::try_from(a).unwrap()))
                        .collect();
                    assert_eq!(stored.balances, previous);
                }
            });
        }
    }

    // =============================================================================
    // PENDING / CONFIRMED DISJOINTNESS
    // =============================================================================

    #[tokio::test]
    async fn test_views_agree_on_latest_state() {
        let h = Harness::new();
        h.peer.build_chain(6, 1, 1);
        h.handshake().await;
        let hash = [0x5a; 32];
        h.peer.put_pending_transaction(hash, true);

        let pending = h.client.get_transaction_by_hash(hash, true).await.unwrap().unwrap();
        assert!(matches!(pending.inclusion, TxInclusion::Pending { queued: true }));
        assert_eq!(pending.height(), None);

        // Mined at height 5.
        h.peer.with_state(|s| {
            let reply = s.transactions.get_mut(&hash).unwrap();
            reply.pending = false;
            reply.pending_queued = false;
            reply.block_height = Some(5);
            reply.block_timestamp = Some(1_600_000_300);
            reply.confirmations = 1;
        });

        let confirmed = h.client.get_transaction_by_hash(hash, false).await.unwrap().unwrap();
        // Asking for the pending view of a mined transaction gets the peer's
        // current answer, which is confirmed.
        let pending_view = h.client.get_transaction_by_hash(hash, true).await.unwrap().unwrap();

        for view in [&confirmed, &pending_view] {
            assert_eq!(view.height(), Some(5));
            assert!(!view.is_pending());
        }
        assert!(!h.client.cached_transaction(&hash).unwrap().is_pending());
    }

    #[tokio::test]
    async fn test_block_inclusion_overrides_pending_entry() {
        let h = Harness::new();
        h.peer.build_chain(6, 1, 1);
        h.handshake().await;

        let hash = MockPeer::tx_hash(4, 1, 0);
        h.peer.put_pending_transaction(hash, false);
        h.client.get_transaction_by_hash(hash, true).await.unwrap();
        assert!(h.client.cached_transaction(&hash).unwrap().is_pending());

        h.client.get_block_by_height(4).await.unwrap();
        let record = h.client.cached_transaction(&hash).unwrap();
        assert_eq!(record.height(), Some(4));
        assert!(!record.is_pending());
    }
}
