//! # Reconciliation Engine
//!
//! Compares local header records with the peer's over the lookback window,
//! highest height first, and stops at the first agreeing height. Headers are
//! hash-linked, so agreement at `i` vouches for everything below it.
//!
//! Reorgs deeper than the window are not reconciled.

use shared_bus::MirrorEvent;
use tracing::{debug, info, warn};

use mirror_telemetry::log_block_event;
use mirror_telemetry::metrics::{BLOCKS_REMOVED, RECONCILIATION_PASSES};

use super::service::MirrorClient;
use crate::algorithms::ScanWindow;
use crate::domain::{BlockHeaderRecord, MirrorError, ReconcileReport};
use crate::protocol::{BlockHeaderResponse, Command, HeaderRequest};

impl MirrorClient {
    /// Run one reconciliation pass against the current chain summary.
    ///
    /// An unreachable peer aborts the pass quietly (`report.aborted`). A
    /// reply that fails to decode costs only that height
    /// (`report.failed`); the scan goes on below it.
    pub async fn reconcile(&self) -> Result<ReconcileReport, MirrorError> {
        let _pass = self.reconcile_lock.lock().await;
        RECONCILIATION_PASSES.inc();

        let mut report = ReconcileReport::default();
        let Some((start_height, tip_height)) = self
            .mirror
            .read()
            .summary()
            .map(|s| (s.start_height, s.tip_height))
        else {
            return Ok(report);
        };

        let window = ScanWindow::new(start_height, tip_height, self.config.lookback_depth);
        debug!(
            starting = window.starting,
            ending = window.ending,
            "[mirror] Reconciliation pass"
        );

        // The peer's chain got shorter: everything at or above its tip is gone.
        let beyond_tip = self.mirror.read().heights_from(tip_height);
        for height in beyond_tip {
            self.roll_back(height, &mut report).await;
        }

        for height in window.descending() {
            let fetched = self
                .fetch_json::<_, BlockHeaderResponse>(
                    Command::ChainGetBlockHeader,
                    &HeaderRequest { height },
                )
                .await;
            let peer = match fetched {
                Ok(Some(peer)) => peer,
                Ok(None) => {
                    debug!(height, "[mirror] Header unavailable, pass aborted");
                    report.aborted = true;
                    break;
                }
                Err(err) => {
                    warn!(height, error = %err, "[mirror] Header rejected");
                    report.failed.push(height);
                    continue;
                }
            };

            let (local, cached_hash) = {
                let mirror = self.mirror.read();
                (mirror.header(height), mirror.cached_block_hash(height))
            };

            if local.is_some_and(|l| l.hash == peer.hash) {
                report.matched_at = Some(height);
                break;
            }

            let superseded = local.is_some() || cached_hash.is_some_and(|h| h != peer.hash);
            if superseded {
                self.roll_back(height, &mut report).await;
                match self.download_block_at(height, Some(peer.hash)).await {
                    Ok(Some(_)) => {}
                    Ok(None) => {
                        report.aborted = true;
                        break;
                    }
                    // The header still goes in: it is what the peer reports.
                    Err(err) => {
                        warn!(height, error = %err, "[mirror] Replacement block rejected");
                        report.failed.push(height);
                    }
                }
            }

            let header = BlockHeaderRecord::new(height, peer.hash, peer.kernel_hash);
            self.mirror.write().put_header(header);
            report.stored.push(height);
            self.publish(MirrorEvent::HeaderDownloaded {
                height,
                hash: header.hash,
                kernel_hash: header.kernel_hash,
            })
            .await;
        }

        if !report.removed.is_empty() {
            info!(
                removed = report.removed.len(),
                stored = report.stored.len(),
                "[mirror] Reorganization reconciled"
            );
        }
        Ok(report)
    }

    /// Evict one height and announce what left the mirror.
    async fn roll_back(&self, height: u64, report: &mut ReconcileReport) {
        let evicted = self.mirror.write().evict_height(height);
        let Some(eviction) = evicted else {
            return;
        };

        BLOCKS_REMOVED.inc();
        log_block_event!(
            info,
            "reconcile",
            "[mirror] Block rolled back",
            height,
            hex::encode(eviction.hash),
            transactions = eviction.tx_hashes.len()
        );

        self.publish(MirrorEvent::BlockRemoved {
            height,
            hash: eviction.hash,
        })
        .await;
        if !eviction.tx_hashes.is_empty() {
            self.publish(MirrorEvent::TransactionRemoved {
                height,
                hashes: eviction.tx_hashes,
            })
            .await;
        }
        report.removed.push(height);
    }
}
