//! # Block and Transaction Resolution
//!
//! Cache-first lookups that fall back to the peer and include whatever it
//! serves into the mirror.

use shared_bus::MirrorEvent;
use shared_types::Hash;
use std::sync::Arc;
use tracing::debug;

use mirror_telemetry::metrics::{BLOCKS_DOWNLOADED, TRANSACTIONS_DOWNLOADED};
use mirror_telemetry::{log_block_event, log_tx_event};

use super::service::MirrorClient;
use crate::domain::{
    invariant_block_hash, invariant_block_height, BlockRecord, DecodeError, DecodedBlock,
    FetchResult, TransactionRecord,
};
use crate::protocol::{
    BlockByHashRequest, BlockByHeightRequest, Command, TransactionRequest, TransactionResponse,
};

impl MirrorClient {
    /// Block at `height`.
    ///
    /// Served from the cache while it agrees with the header record there.
    /// A fetched block must carry the cached header's hash, so a peer reorg
    /// that no reconciliation pass has seen yet fails with
    /// `DecodeError::HashMismatch` until the next pass stores the new header.
    /// Heights at or above the peer's tip resolve to `Ok(None)`.
    pub async fn get_block_by_height(&self, height: u64) -> FetchResult<Arc<BlockRecord>> {
        let (cached, tip, expected) = {
            let mirror = self.mirror.read();
            (
                mirror.block_at(height),
                mirror.summary().map(|s| s.tip_height),
                mirror.header(height).map(|h| h.hash),
            )
        };

        if let Some(block) = cached {
            return Ok(Some(block));
        }
        if tip.is_some_and(|tip| height >= tip) {
            debug!(height, "[mirror] Height beyond peer tip");
            return Ok(None);
        }

        self.download_block_at(height, expected).await
    }

    /// Fetch the block at `height` and include it.
    ///
    /// With `expected` set, the served block must carry that hash.
    pub(crate) async fn download_block_at(
        &self,
        height: u64,
        expected: Option<Hash>,
    ) -> FetchResult<Arc<BlockRecord>> {
        let encoding = self.config.block_encoding;
        let Some(bytes) = self
            .fetch_raw(
                Command::ChainGetBlockByHeight,
                &BlockByHeightRequest { height, encoding },
            )
            .await?
        else {
            return Ok(None);
        };

        let block = self.decoder.decode_block(&bytes, encoding)?;
        invariant_block_height(height, &block)?;
        if let Some(expected) = expected {
            invariant_block_hash(&expected, &block)?;
        }

        Ok(Some(self.include_block(block).await))
    }

    /// Block with the given hash.
    pub async fn get_block_by_hash(&self, hash: Hash) -> FetchResult<Arc<BlockRecord>> {
        let cached = self.mirror.read().block_by_hash(&hash);
        if cached.is_some() {
            return Ok(cached);
        }

        let encoding = self.config.block_encoding;
        let Some(bytes) = self
            .fetch_raw(
                Command::ChainGetBlockByHash,
                &BlockByHashRequest { hash, encoding },
            )
            .await?
        else {
            return Ok(None);
        };

        let block = self.decoder.decode_block(&bytes, encoding)?;
        invariant_block_hash(&hash, &block)?;

        Ok(Some(self.include_block(block).await))
    }

    /// Cache a decoded block and announce it.
    ///
    /// The block is indexed by height only when it agrees with the header
    /// there, or, with no header yet, when no other block holds the height.
    async fn include_block(&self, block: DecodedBlock) -> Arc<BlockRecord> {
        let record = {
            let mut mirror = self.mirror.write();
            let index_height = match mirror.header(block.height) {
                Some(header) => header.hash == block.hash,
                None => mirror
                    .cached_block_hash(block.height)
                    .map_or(true, |cached| cached == block.hash),
            };
            mirror.include_block(block, index_height)
        };

        BLOCKS_DOWNLOADED.inc();
        TRANSACTIONS_DOWNLOADED.inc_by(record.tx_hashes.len() as f64);
        log_block_event!(
            debug,
            "resolve",
            "[mirror] Block included",
            record.height,
            hex::encode(record.hash),
            transactions = record.tx_hashes.len()
        );

        self.publish(MirrorEvent::BlockDownloaded {
            height: record.height,
            hash: record.hash,
            tx_count: record.tx_hashes.len(),
        })
        .await;
        if !record.tx_hashes.is_empty() {
            self.publish(MirrorEvent::TransactionDownloaded {
                hashes: record.tx_hashes.clone(),
            })
            .await;
        }
        record
    }

    /// Transaction with the given hash.
    ///
    /// The cache answers only when its classification matches
    /// `want_pending`; otherwise the peer's answer replaces the entry whole.
    pub async fn get_transaction_by_hash(
        &self,
        hash: Hash,
        want_pending: bool,
    ) -> FetchResult<Arc<TransactionRecord>> {
        let cached = self.mirror.read().transaction(&hash);
        if let Some(tx) = cached {
            if tx.is_pending() == want_pending {
                return Ok(Some(tx));
            }
        }

        let Some(reply) = self
            .fetch_json::<_, TransactionResponse>(
                Command::TxGetTransaction,
                &TransactionRequest { hash },
            )
            .await?
        else {
            return Ok(None);
        };

        let decoded = self.decoder.decode_transaction(&reply.tx)?;
        if decoded.hash != hash {
            return Err(DecodeError::Transaction(format!(
                "requested {}, peer served {}",
                hex::encode(hash),
                hex::encode(decoded.hash)
            ))
            .into());
        }

        let record = TransactionRecord::new(decoded, reply.inclusion());
        let record = self.mirror.write().put_transaction(record);

        TRANSACTIONS_DOWNLOADED.inc();
        log_tx_event!(
            debug,
            "resolve",
            "[mirror] Transaction cached",
            hex::encode(hash),
            pending = record.is_pending()
        );
        self.publish(MirrorEvent::TransactionDownloaded { hashes: vec![hash] })
            .await;
        Ok(Some(record))
    }
}
