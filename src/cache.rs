use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use crate::completion::{Completer, Completion};
use crate::encoder::encode;
use crate::metrics::{CACHE_HITS, CACHE_MISSES, CACHE_SIZE};
use crate::models::CacheRecord;
use crate::store::ReplyStore;

// Result of a cache lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    // served from the store
    Hit(CacheRecord),
    // computed now and stored
    Filled(CacheRecord),
    // completion failed; reply holds the error marker, nothing stored
    Failed(CacheRecord),
}

impl Lookup {
    pub fn record(&self) -> &CacheRecord {
        match self {
            Lookup::Hit(r) | Lookup::Filled(r) | Lookup::Failed(r) => r,
        }
    }

    pub fn into_record(self) -> CacheRecord {
        match self {
            Lookup::Hit(r) | Lookup::Filled(r) | Lookup::Failed(r) => r,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }
}

// One waiter's claim on an index lock; the table entry goes with the last claim,
// including when the request future is dropped mid-wait
struct InFlight<'a> {
    table: &'a DashMap<u64, Arc<Mutex<()>>>,
    index: u64,
    lock: Option<Arc<Mutex<()>>>,
}

impl<'a> InFlight<'a> {
    fn enter(table: &'a DashMap<u64, Arc<Mutex<()>>>, index: u64) -> Self {
        let lock = table
            .entry(index)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        Self {
            table,
            index,
            lock: Some(lock),
        }
    }

    async fn lock(&self) -> Option<MutexGuard<'_, ()>> {
        match &self.lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        drop(self.lock.take());
        self.table
            .remove_if(&self.index, |_, l| Arc::strong_count(l) == 1);
    }
}

// Replies keyed by hour index. One completion per missing index at a time;
// failed completions are not stored, so the next lookup retries them.
pub struct ReplyCache {
    store: Arc<dyn ReplyStore>,
    in_flight: DashMap<u64, Arc<Mutex<()>>>,
}

impl ReplyCache {
    pub fn new(store: Arc<dyn ReplyStore>) -> Self {
        Self {
            store,
            in_flight: DashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn ReplyStore> {
        &self.store
    }

    pub async fn get_or_create(&self, index: u64, completer: &dyn Completer) -> Lookup {
        self.store.load().await;
        if let Some(record) = self.store.get(index).await {
            CACHE_HITS.inc();
            tracing::debug!(index, "cache hit");
            return Lookup::Hit(record);
        }

        let slot = InFlight::enter(&self.in_flight, index);
        let _guard = slot.lock().await;
        self.fill(index, completer).await
    }

    // Caller holds the index lock
    async fn fill(&self, index: u64, completer: &dyn Completer) -> Lookup {
        // someone else may have filled it while we waited
        if let Some(record) = self.store.get(index).await {
            CACHE_HITS.inc();
            return Lookup::Hit(record);
        }
        CACHE_MISSES.inc();

        let prompt = encode(index);
        tracing::info!(index, prompt = %prompt, "cache miss, requesting completion");
        let completion = completer.complete(&prompt).await;

        let record = CacheRecord {
            prompt,
            reply: completion.text(),
        };
        if let Completion::Failed(_) = completion {
            return Lookup::Failed(record);
        }

        self.store.put(index, record.clone()).await;
        if let Err(e) = self.store.flush().await {
            tracing::warn!(index, error = %e, "failed to persist cache");
        }
        CACHE_SIZE.set(self.store.len().await as f64);

        Lookup::Filled(record)
    }
}
