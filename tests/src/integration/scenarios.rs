//! # Scenarios
//!
//! 1. **Reorg inside the window**: blocks from height 9 up are replaced on
//!    the peer; the client rolls them back and refetches them.
//! 2. **Foreign peer**: a handshake from another application closes the
//!    connection before anything is requested.
//! 3. **Duplicate feed start**: starting the mempool feed twice yields a
//!    single polling sequence.

#[cfg(test)]
mod tests {
    use std::time::Duration;
    use tokio::sync::mpsc;

    use mirror_sync::{Command, Feed, MirrorConfig, MockPeer, PeerEvent, SessionStatus};
    use shared_bus::MirrorEvent;

    use crate::fixtures::{removed_heights, Harness};

    // =============================================================================
    // SCENARIO 1: REORG INSIDE THE LOOKBACK WINDOW
    // =============================================================================

    #[tokio::test]
    async fn test_reorg_from_height_nine() {
        let h = Harness::new();
        h.peer.build_chain(20, 1, 2);
        h.handshake().await;
        assert_eq!(h.client.status(), SessionStatus::Synced);

        // Window [5, 20) with lookback 15.
        assert!(h.client.header_at(4).is_none());
        for height in 5..20 {
            assert!(h.client.get_block_by_height(height).await.unwrap().is_some());
        }

        for height in 9..20 {
            h.peer.put_block(height, 2, 1);
        }
        let mut sub = h.subscribe();
        let fetched_before = h.peer.request_count(Command::ChainGetBlockByHeight);
        h.push_new_block().await;
        let events = sub.drain();

        // One removal per superseded height, highest first.
        assert_eq!(removed_heights(&events), (9..20).rev().collect::<Vec<_>>());

        // Every transaction of the old block 9 is reported once.
        let removed_at_nine: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                MirrorEvent::TransactionRemoved { height: 9, hashes } => Some(hashes.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            removed_at_nine,
            vec![vec![MockPeer::tx_hash(9, 1, 0), MockPeer::tx_hash(9, 1, 1)]]
        );

        // Block 9 was refetched under its new hash right after removal.
        let removed_pos = events
            .iter()
            .position(|e| matches!(e, MirrorEvent::BlockRemoved { height: 9, .. }))
            .unwrap();
        let downloaded_pos = events
            .iter()
            .position(|e| matches!(e, MirrorEvent::BlockDownloaded { height: 9, .. }))
            .unwrap();
        assert!(removed_pos < downloaded_pos);
        assert_eq!(
            h.peer.request_count(Command::ChainGetBlockByHeight) - fetched_before,
            11
        );

        // Scan stopped at the agreeing height 8.
        assert!(!events.iter().any(|e| matches!(
            e,
            MirrorEvent::HeaderDownloaded { height, .. } if *height < 9
        )));
        assert_eq!(h.client.header_at(8).unwrap().hash, MockPeer::block_hash(8, 1));
        assert_eq!(h.client.header_at(9).unwrap().hash, MockPeer::block_hash(9, 2));

        let block = h.client.get_block_by_height(9).await.unwrap().unwrap();
        assert_eq!(block.hash, MockPeer::block_hash(9, 2));
        assert_eq!(block.tx_hashes, vec![MockPeer::tx_hash(9, 2, 0)]);
        assert!(h.client.cached_transaction(&MockPeer::tx_hash(9, 1, 0)).is_none());
    }

    // =============================================================================
    // SCENARIO 2: FOREIGN PEER
    // =============================================================================

    #[tokio::test]
    async fn test_foreign_peer_is_dropped() {
        let h = Harness::new();
        h.peer.build_chain(20, 1, 0);
        let mut sub = h.subscribe();

        let (events, rx) = mpsc::channel(8);
        let session = tokio::spawn(h.client.clone().run(rx));
        events.send(PeerEvent::Connected).await.unwrap();
        events
            .send(PeerEvent::Handshake(MockPeer::identity_bytes("SOMETHING-ELSE")))
            .await
            .unwrap();
        events
            .send(PeerEvent::NewBlock(h.peer.chain_info_bytes()))
            .await
            .unwrap();
        drop(events);
        session.await.unwrap();

        assert_eq!(h.peer.close_count(), 1);
        assert_eq!(h.client.status(), SessionStatus::Offline);
        assert_eq!(h.peer.request_count(Command::ChainGetInfo), 0);
        assert_eq!(h.peer.total_requests(), 0);
        assert!(sub.drain().is_empty());
        // Only our own identity went out; no acknowledgement.
        assert!(h.peer.emits().iter().all(|(name, _)| name == "handshake"));
    }

    // =============================================================================
    // SCENARIO 3: DUPLICATE FEED START
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_mempool_started_twice() {
        let h = Harness::with_config(MirrorConfig {
            mempool_poll_interval_ms: 60_000,
            ..MirrorConfig::for_testing()
        });
        let ids = vec![[0x71u8; 32], [0x72; 32], [0x73; 32]];
        for id in &ids {
            h.peer.put_pending_transaction(*id, false);
        }
        h.peer.with_state(|s| {
            s.mempool = ids.clone();
            s.delay = Some(Duration::from_millis(10));
        });

        assert!(h.client.start_feed(Feed::Mempool));
        assert!(!h.client.start_feed(Feed::Mempool));
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(h.peer.request_count(Command::MempoolContentCount), 1);
        assert_eq!(h.peer.request_count(Command::MempoolContentIds), 2);
        assert_eq!(h.peer.request_count(Command::TxGetTransaction), 3);

        h.client.stop_feed(Feed::Mempool);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!h.client.feed_running(Feed::Mempool));
    }
}
