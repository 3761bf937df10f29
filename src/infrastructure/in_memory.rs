use crate::domain::amount::Amount;
use crate::domain::messages::SignedSettlement;
use crate::domain::ports::{Catalog, CatalogEntry, LedgerClient};
use crate::error::{ProtocolError, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

struct CacheSlot {
    inserted_at: Instant,
    cell: Arc<OnceCell<SignedSettlement>>,
}

/// Bounded map from settlement `request_id` to the settlement it produced.
///
/// [`SettlementCache::slot`] is an atomic insert-if-absent: concurrent callers
/// with the same request id share one cell, and `OnceCell` lets exactly one
/// of them run the settlement while the rest wait for its result.
pub struct SettlementCache {
    slots: Mutex<HashMap<String, CacheSlot>>,
    capacity: usize,
    max_age: Duration,
}

impl SettlementCache {
    pub fn new(capacity: usize, max_age: Duration) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            max_age,
        }
    }

    /// Returns the cell for `request_id`, creating it if absent.
    pub async fn slot(&self, request_id: &str) -> Arc<OnceCell<SignedSettlement>> {
        let mut slots = self.slots.lock().await;
        if let Some(slot) = slots.get(request_id) {
            return Arc::clone(&slot.cell);
        }

        Self::prune_locked(&mut slots, self.capacity.saturating_sub(1), self.max_age);
        let cell = Arc::new(OnceCell::new());
        slots.insert(
            request_id.to_string(),
            CacheSlot {
                inserted_at: Instant::now(),
                cell: Arc::clone(&cell),
            },
        );
        cell
    }

    /// The completed settlement for `request_id`, if any.
    pub async fn get(&self, request_id: &str) -> Option<SignedSettlement> {
        let slots = self.slots.lock().await;
        slots.get(request_id).and_then(|slot| slot.cell.get().cloned())
    }

    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drops completed entries older than the max age.
    pub async fn prune(&self) {
        let mut slots = self.slots.lock().await;
        Self::prune_locked(&mut slots, self.capacity, self.max_age);
    }

    // In-flight slots are never evicted; dropping one would let a retry
    // reach the ledger a second time.
    fn prune_locked(slots: &mut HashMap<String, CacheSlot>, keep: usize, max_age: Duration) {
        slots.retain(|_, slot| !slot.cell.initialized() || slot.inserted_at.elapsed() < max_age);

        if slots.len() > keep {
            let mut completed: Vec<(Instant, String)> = slots
                .iter()
                .filter(|(_, slot)| slot.cell.initialized())
                .map(|(id, slot)| (slot.inserted_at, id.clone()))
                .collect();
            completed.sort();
            let excess = slots.len() - keep;
            for (_, id) in completed.into_iter().take(excess) {
                debug!(request_id = %id, "Evicting cached settlement");
                slots.remove(&id);
            }
        }
    }
}

/// Catalog backed by a fixed list of entries.
///
/// An entry matches when it shares at least one word (three letters or more)
/// with the summary and its unit price fits within the requested amount.
/// The entry sharing the most words wins.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: Vec<CatalogEntry>,
}

impl StaticCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }
}

impl Catalog for StaticCatalog {
    fn find_match(&self, summary: &str, amount: Amount) -> Option<CatalogEntry> {
        let words: Vec<String> = summary
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() >= 3)
            .map(str::to_lowercase)
            .collect();

        self.entries
            .iter()
            .filter(|entry| entry.unit_price <= amount)
            .map(|entry| {
                let name = entry.name.to_lowercase();
                let score = words.iter().filter(|w| name.contains(w.as_str())).count();
                (score, entry)
            })
            .filter(|(score, _)| *score > 0)
            .max_by_key(|(score, _)| *score)
            .map(|(_, entry)| entry.clone())
    }
}

/// A transfer recorded by [`InMemoryLedger`].
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerTransfer {
    pub tx_ref: String,
    pub recipient: String,
    pub amount: Amount,
}

/// Simulated settlement network.
///
/// With a spendable balance set, transfers beyond it fail with
/// `insufficient funds`. Tx refs are derived from the transfer contents and
/// its sequence number.
pub struct InMemoryLedger {
    balance: Mutex<Option<Decimal>>,
    transfers: Mutex<Vec<LedgerTransfer>>,
    attempts: AtomicUsize,
    latency: Duration,
}

impl InMemoryLedger {
    /// A ledger with unlimited funds.
    pub fn new() -> Self {
        Self {
            balance: Mutex::new(None),
            transfers: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
            latency: Duration::ZERO,
        }
    }

    pub fn with_balance(balance: Decimal) -> Self {
        Self {
            balance: Mutex::new(Some(balance)),
            ..Self::new()
        }
    }

    /// Delays every transfer, to widen race windows in tests.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of times `transfer` was invoked, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub async fn transfers(&self) -> Vec<LedgerTransfer> {
        self.transfers.lock().await.clone()
    }

    pub async fn balance(&self) -> Option<Decimal> {
        *self.balance.lock().await
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn transfer(&self, recipient: &str, amount: Amount) -> Result<String> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut balance = self.balance.lock().await;
        if let Some(available) = balance.as_mut() {
            if *available < amount.value() {
                return Err(ProtocolError::Execution("insufficient funds".to_string()));
            }
            *available -= amount.value();
        }

        let mut transfers = self.transfers.lock().await;
        let sequence = transfers.len() + 1;
        let digest = Sha256::digest(format!("{}|{}|{}", recipient, amount, sequence).as_bytes());
        let tx_ref = hex::encode(digest);
        transfers.push(LedgerTransfer {
            tx_ref: tx_ref.clone(),
            recipient: recipient.to_string(),
            amount,
        });
        Ok(tx_ref)
    }
}
