//! # Account Tracking
//!
//! Tracked-address set, ledger deltas and per-account transaction lists.

use shared_bus::MirrorEvent;
use shared_types::{AccountSnapshot, Address, Hash};
use std::sync::Arc;
use tracing::{debug, warn};

use super::service::MirrorClient;
use crate::algorithms::compute_delta;
use crate::domain::{AccountWatch, FetchResult, MirrorError, TransactionRecord};
use crate::protocol::{
    AccountResponse, AddressRequest, Command, IdsPageRequest, IdsResponse, MempoolCountRequest,
};

/// Recent transactions of one account.
#[derive(Clone, Debug, Default)]
pub struct AccountTransactions {
    /// Confirmed transactions, most recent first.
    pub confirmed: Vec<Arc<TransactionRecord>>,
    /// Mempool transactions.
    pub pending: Vec<Arc<TransactionRecord>>,
}

impl AccountTransactions {
    /// Whether neither list holds anything.
    pub fn is_empty(&self) -> bool {
        self.confirmed.is_empty() && self.pending.is_empty()
    }
}

impl MirrorClient {
    /// Replace the tracked-address set.
    ///
    /// Either every address normalizes and the set is replaced, or nothing
    /// changes.
    pub fn set_accounts(&self, addresses: &[String]) -> Result<Vec<Address>, MirrorError> {
        let normalized = addresses
            .iter()
            .map(|a| self.codec.normalize(a))
            .collect::<Result<Vec<_>, _>>()?;

        let watch = AccountWatch::new(normalized.iter().cloned());
        debug!(tracked = watch.len(), "[mirror] Tracked accounts replaced");
        self.mirror.write().set_accounts(watch);
        Ok(normalized)
    }

    /// Fetch an account and move the ledger to the reported state.
    ///
    /// Every previously known balance is subtracted, then every reported one
    /// added. Nonces move by unit steps.
    pub async fn download_account_data(&self, address: &Address) -> FetchResult<AccountSnapshot> {
        let Some(reply) = self
            .fetch_json::<_, AccountResponse>(
                Command::AccountGetAccount,
                &AddressRequest {
                    address: address.clone(),
                },
            )
            .await?
        else {
            return Ok(None);
        };

        let next = AccountSnapshot::from(reply);
        let prev = self.ledger.snapshot(address).await;
        let delta = compute_delta(&prev, &next);

        for (currency, amount) in &delta.balance_ops {
            self.ledger.add_balance(address, *currency, *amount).await;
        }
        self.ledger.set_delegate(address, delta.delegate.clone()).await;
        for step in delta.nonce_steps() {
            self.ledger.step_nonce(address, step).await;
        }
        for step in delta.delegate_nonce_steps() {
            self.ledger.step_delegate_nonce(address, step).await;
        }

        debug!(
            %address,
            balance_ops = delta.balance_ops.len(),
            nonce_diff = %delta.nonce_diff,
            "[mirror] Account delta applied"
        );
        self.publish(MirrorEvent::AccountUpdated {
            address: address.clone(),
            snapshot: next.clone(),
        })
        .await;
        Ok(Some(next))
    }

    /// Account nonce counting its mempool transactions.
    pub async fn get_nonce_including_pending(&self, address: &Address) -> FetchResult<u64> {
        self.fetch_json(
            Command::AccountGetNonceIncludingPending,
            &AddressRequest {
                address: address.clone(),
            },
        )
        .await
    }

    /// Fetch an account's recent confirmed and pending transactions.
    ///
    /// The count event is published even when both counts are zero.
    pub async fn download_account_transactions(
        &self,
        address: &Address,
    ) -> FetchResult<AccountTransactions> {
        let Some(confirmed_count) = self
            .fetch_json::<_, u64>(
                Command::TxAccountTransactionCount,
                &AddressRequest {
                    address: address.clone(),
                },
            )
            .await?
        else {
            return Ok(None);
        };
        let Some(pending_count) = self
            .fetch_json::<_, u64>(
                Command::MempoolContentCount,
                &MempoolCountRequest {
                    address: Some(address.clone()),
                },
            )
            .await?
        else {
            return Ok(None);
        };

        self.publish(MirrorEvent::AccountTransactionCountUpdated {
            address: address.clone(),
            confirmed: confirmed_count,
            pending: pending_count,
        })
        .await;

        let mut result = AccountTransactions::default();
        if confirmed_count == 0 && pending_count == 0 {
            return Ok(Some(result));
        }

        let limit = self.config.account_history_limit;
        if confirmed_count > 0 {
            let Some(ids) = self
                .collect_ids(
                    Command::TxAccountTransactionIds,
                    address,
                    confirmed_count.min(limit),
                )
                .await?
            else {
                return Ok(None);
            };
            self.publish(MirrorEvent::AccountTransactionsUpdated {
                address: address.clone(),
                hashes: ids.clone(),
            })
            .await;
            let Some(records) = self.resolve_all(&ids, false).await? else {
                return Ok(None);
            };
            result.confirmed = records;
        }

        if pending_count > 0 {
            let Some(ids) = self
                .collect_ids(Command::MempoolContentIds, address, pending_count.min(limit))
                .await?
            else {
                return Ok(None);
            };
            self.publish(MirrorEvent::AccountPendingTransactionsUpdated {
                address: address.clone(),
                hashes: ids.clone(),
            })
            .await;
            let Some(records) = self.resolve_all(&ids, true).await? else {
                return Ok(None);
            };
            result.pending = records;
        }

        Ok(Some(result))
    }

    /// Page through an id list until `limit` ids are collected or the peer
    /// stops handing out pages.
    async fn collect_ids(
        &self,
        command: Command,
        address: &Address,
        limit: u64,
    ) -> FetchResult<Vec<Hash>> {
        let mut ids: Vec<Hash> = Vec::new();
        let mut index = 0u64;

        while (ids.len() as u64) < limit {
            let remaining = limit - ids.len() as u64;
            let request = IdsPageRequest {
                address: Some(address.clone()),
                index,
                limit: remaining.min(self.config.page_size),
            };
            let Some(page) = self.fetch_json::<_, IdsResponse>(command, &request).await? else {
                return Ok(None);
            };

            let empty = page.ids.is_empty();
            ids.extend(page.ids);
            match page.next {
                Some(next) if next > index && !empty => index = next,
                _ => break,
            }
        }

        ids.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(Some(ids))
    }

    /// Resolve every id. An id whose reply fails to decode is skipped.
    async fn resolve_all(
        &self,
        ids: &[Hash],
        want_pending: bool,
    ) -> FetchResult<Vec<Arc<TransactionRecord>>> {
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get_transaction_by_hash(*id, want_pending).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => return Ok(None),
                Err(err) => {
                    warn!(tx_hash = %hex::encode(id), error = %err, "[mirror] Account transaction skipped");
                }
            }
        }
        Ok(Some(records))
    }

    /// Re-download every tracked account after the chain moved.
    pub(crate) async fn refresh_accounts(&self) {
        let tracked = self.mirror.read().tracked_accounts();
        for address in tracked {
            if let Err(err) = self.download_account_data(&address).await {
                warn!(%address, error = %err, "[mirror] Account refresh failed");
            }
            if let Err(err) = self.download_account_transactions(&address).await {
                warn!(%address, error = %err, "[mirror] Account transactions refresh failed");
            }
        }
    }
}
