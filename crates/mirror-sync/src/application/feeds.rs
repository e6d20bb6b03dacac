//! # Feed Subscriptions
//!
//! Independent polling loops for the peer's mempool and exchange offers.
//!
//! Starting a running feed is a no-op. Stopping only clears the enable
//! flag: a request already issued completes and its result is cached, and
//! the loop exits at its next check.

use shared_bus::MirrorEvent;
use shared_types::{Hash, OfferType};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use super::service::MirrorClient;
use crate::domain::{DecodeError, ExchangeOfferRecord, FetchResult, MirrorError};
use crate::protocol::{
    Command, IdsPageRequest, IdsResponse, MempoolCountRequest, OfferRequest, OffersCountRequest,
    OffersIdsRequest,
};

/// A pollable feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Feed {
    /// Peer mempool contents.
    Mempool,
    /// Exchange offers, for every configured offer type.
    Offers,
}

impl Feed {
    /// Name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Mempool => "mempool",
            Self::Offers => "offers",
        }
    }
}

/// Enable flag and loop state of one feed.
#[derive(Debug, Default)]
pub struct FeedControl {
    enabled: AtomicBool,
    running: AtomicBool,
    wake: Notify,
}

impl FeedControl {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn stopped(gate: Option<&Self>) -> bool {
        gate.is_some_and(|g| !g.is_enabled())
    }
}

impl MirrorClient {
    fn feed_control(&self, feed: Feed) -> &FeedControl {
        match feed {
            Feed::Mempool => &self.mempool,
            Feed::Offers => &self.offers,
        }
    }

    fn feed_interval(&self, feed: Feed) -> Duration {
        match feed {
            Feed::Mempool => self.config.mempool_poll_interval(),
            Feed::Offers => self.config.offers_poll_interval(),
        }
    }

    /// Enable a feed and spawn its loop.
    ///
    /// Returns `false` when the loop was already running.
    pub fn start_feed(self: &Arc<Self>, feed: Feed) -> bool {
        let control = self.feed_control(feed);
        control.enabled.store(true, Ordering::SeqCst);
        if control.running.swap(true, Ordering::SeqCst) {
            debug!(feed = feed.name(), "[mirror] Feed already running");
            return false;
        }

        let client = Arc::clone(self);
        tokio::spawn(async move { client.feed_loop(feed).await });
        info!(feed = feed.name(), "[mirror] Feed started");
        true
    }

    /// Clear a feed's enable flag.
    pub fn stop_feed(&self, feed: Feed) {
        let control = self.feed_control(feed);
        control.enabled.store(false, Ordering::SeqCst);
        control.wake.notify_waiters();
        info!(feed = feed.name(), "[mirror] Feed stopping");
    }

    /// Whether a feed's loop is alive.
    pub fn feed_running(&self, feed: Feed) -> bool {
        self.feed_control(feed).running.load(Ordering::SeqCst)
    }

    /// Start polling the mempool.
    pub fn start_mempool(self: &Arc<Self>) -> bool {
        self.start_feed(Feed::Mempool)
    }

    /// Stop polling the mempool.
    pub fn stop_mempool(&self) {
        self.stop_feed(Feed::Mempool)
    }

    /// Start polling exchange offers.
    pub fn start_offers(self: &Arc<Self>) -> bool {
        self.start_feed(Feed::Offers)
    }

    /// Stop polling exchange offers.
    pub fn stop_offers(&self) {
        self.stop_feed(Feed::Offers)
    }

    async fn feed_loop(self: Arc<Self>, feed: Feed) {
        let control = self.feed_control(feed);
        let interval = self.feed_interval(feed);

        loop {
            if control.is_enabled() {
                if let Err(err) = self.poll_feed(feed, Some(control)).await {
                    warn!(feed = feed.name(), error = %err, "[mirror] Feed poll failed");
                }
            }

            if !control.is_enabled() {
                control.running.store(false, Ordering::SeqCst);
                // A start that raced with the clear above owns no loop yet.
                if control.is_enabled() && !control.running.swap(true, Ordering::SeqCst) {
                    continue;
                }
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = control.wake.notified() => {}
            }
        }
        info!(feed = feed.name(), "[mirror] Feed stopped");
    }

    /// Run one poll of a feed regardless of its enable flag.
    pub async fn poll_feed_once(&self, feed: Feed) -> Result<(), MirrorError> {
        self.poll_feed(feed, None).await
    }

    async fn poll_feed(&self, feed: Feed, gate: Option<&FeedControl>) -> Result<(), MirrorError> {
        match feed {
            Feed::Mempool => self.poll_mempool(gate).await,
            Feed::Offers => self.poll_offers(gate).await,
        }
    }

    async fn poll_mempool(&self, gate: Option<&FeedControl>) -> Result<(), MirrorError> {
        let Some(count) = self
            .fetch_json::<_, u64>(
                Command::MempoolContentCount,
                &MempoolCountRequest { address: None },
            )
            .await?
        else {
            return Ok(());
        };

        self.publish(MirrorEvent::PendingTransactionsCount { count }).await;
        if count == 0 {
            return Ok(());
        }

        let mut index = 0u64;
        loop {
            if FeedControl::stopped(gate) {
                return Ok(());
            }
            let request = IdsPageRequest {
                address: None,
                index,
                limit: self.config.page_size,
            };
            let Some(page) = self
                .fetch_json::<_, IdsResponse>(Command::MempoolContentIds, &request)
                .await?
            else {
                return Ok(());
            };

            self.publish(MirrorEvent::PendingTransactionsUpdated {
                hashes: page.ids.clone(),
            })
            .await;

            for id in &page.ids {
                if FeedControl::stopped(gate) {
                    return Ok(());
                }
                match self.get_transaction_by_hash(*id, true).await {
                    Ok(Some(_)) => {}
                    Ok(None) => return Ok(()),
                    Err(err) => {
                        warn!(tx_hash = %hex::encode(id), error = %err, "[mirror] Mempool entry skipped");
                    }
                }
            }

            match page.next {
                Some(next) if next > index && !page.ids.is_empty() => index = next,
                _ => return Ok(()),
            }
        }
    }

    async fn poll_offers(&self, gate: Option<&FeedControl>) -> Result<(), MirrorError> {
        for offer_type in self.config.offer_types.clone() {
            if FeedControl::stopped(gate) {
                return Ok(());
            }
            let Some(count) = self
                .fetch_json::<_, u64>(
                    Command::OffersContentCount,
                    &OffersCountRequest { offer_type },
                )
                .await?
            else {
                return Ok(());
            };

            self.publish(MirrorEvent::OffersCount { offer_type, count })
                .await;
            if count == 0 {
                continue;
            }

            if !self.poll_offer_pages(offer_type, gate).await? {
                return Ok(());
            }
        }
        Ok(())
    }

    /// Page through the offers of one type. Returns `false` when the peer
    /// became unavailable or the feed was stopped.
    async fn poll_offer_pages(
        &self,
        offer_type: OfferType,
        gate: Option<&FeedControl>,
    ) -> Result<bool, MirrorError> {
        let mut index = 0u64;
        loop {
            if FeedControl::stopped(gate) {
                return Ok(false);
            }
            let request = OffersIdsRequest {
                offer_type,
                index,
                limit: self.config.page_size,
            };
            let Some(page) = self
                .fetch_json::<_, IdsResponse>(Command::OffersContentIds, &request)
                .await?
            else {
                return Ok(false);
            };

            self.publish(MirrorEvent::OffersIds {
                offer_type,
                hashes: page.ids.clone(),
            })
            .await;

            let mut cached: Vec<Hash> = Vec::new();
            for id in &page.ids {
                if self.mirror.read().offer(id, offer_type).is_some() {
                    continue;
                }
                if FeedControl::stopped(gate) {
                    break;
                }
                match self.download_offer(*id, offer_type).await {
                    Ok(Some(())) => cached.push(*id),
                    Ok(None) => return Ok(false),
                    Err(err) => {
                        warn!(offer = %hex::encode(id), error = %err, "[mirror] Offer skipped");
                    }
                }
            }

            if !cached.is_empty() {
                self.publish(MirrorEvent::OffersUpdated {
                    offer_type,
                    hashes: cached,
                })
                .await;
            }

            match page.next {
                Some(next) if next > index && !page.ids.is_empty() => index = next,
                _ => return Ok(true),
            }
        }
    }

    async fn download_offer(&self, hash: Hash, offer_type: OfferType) -> FetchResult<()> {
        let Some(bytes) = self
            .fetch_raw(Command::OffersGetOffer, &OfferRequest { hash, offer_type })
            .await?
        else {
            return Ok(None);
        };

        let offer = self.decoder.decode_offer(&bytes)?;
        if offer.hash != hash || offer.offer_type != offer_type {
            return Err(DecodeError::Offer(format!(
                "requested {} of type {offer_type}, peer served {} of type {}",
                hex::encode(hash),
                hex::encode(offer.hash),
                offer.offer_type
            ))
            .into());
        }

        self.mirror.write().put_offer(ExchangeOfferRecord::from(offer));
        Ok(Some(()))
    }
}
