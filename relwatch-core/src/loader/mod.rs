//! Request-scoped batch loading
//!
//! [`BatchLoader`] turns many single-key lookups made while serving one
//! request into one bulk call per collection window:
//!
//! 1. `load(key)` registers the key (or joins the slot already registered for
//!    it) and yields to the scheduler so sibling futures polled by the same
//!    task can register theirs.
//! 2. The first load to resume takes every pending key and issues a single
//!    [`BatchFn::load`] call.
//! 3. Results are fanned out per key. Keys missing from the sparse bulk result
//!    resolve to `None`. Resolved keys stay cached for the loader's lifetime.
//!
//! A failed bulk call fails every request in that batch with the same
//! [`StorageError`] and poisons the loader: later loads return the error
//! without calling the store again.
//!
//! Loaders cache per caller, so build fresh ones for every request (see
//! [`crate::context::RequestContext`]) and never share them.

pub mod batches;

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::future::{FutureExt, Shared};
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::error::StorageError;

pub use batches::{ReleaseBatch, SeenStatusBatch};

/// Scheduler yields before a load dispatches its batch
pub const DEFAULT_YIELD_COUNT: usize = 2;

/// Bulk lookup behind a [`BatchLoader`]
#[async_trait]
pub trait BatchFn: Send + Sync {
    type Key: Clone + Eq + Hash + fmt::Debug + Send + Sync;
    type Value: Clone + Send + Sync;

    /// Look up all `keys` at once. Keys without a value may be left out.
    /// Keys are distinct; their order carries no meaning.
    async fn load(
        &self,
        keys: &[Self::Key],
    ) -> Result<HashMap<Self::Key, Self::Value>, StorageError>;
}

type Outcome<V> = Result<Option<V>, StorageError>;
type Slot<V> = Shared<oneshot::Receiver<Outcome<V>>>;

struct LoaderState<K, V> {
    /// One slot per key ever requested; shared by every caller of that key.
    slots: HashMap<K, Slot<V>>,
    /// Keys registered in the current window, in first-request order.
    pending: Vec<(K, oneshot::Sender<Outcome<V>>)>,
    poisoned: Option<StorageError>,
}

/// Coalescing, caching loader for one kind of lookup.
pub struct BatchLoader<F: BatchFn> {
    name: &'static str,
    batch_fn: F,
    yield_count: usize,
    state: Mutex<LoaderState<F::Key, F::Value>>,
}

impl<F: BatchFn> BatchLoader<F> {
    pub fn new(name: &'static str, batch_fn: F) -> Self {
        Self {
            name,
            batch_fn,
            yield_count: DEFAULT_YIELD_COUNT,
            state: Mutex::new(LoaderState {
                slots: HashMap::new(),
                pending: Vec::new(),
                poisoned: None,
            }),
        }
    }

    /// Number of scheduler yields that make up the collection window.
    /// Zero dispatches on first poll, which disables batching across futures.
    pub fn with_yield_count(mut self, yield_count: usize) -> Self {
        self.yield_count = yield_count;
        self
    }

    /// Load one key. `Ok(None)` means the store has no value for it.
    pub async fn load(&self, key: F::Key) -> Result<Option<F::Value>, StorageError> {
        // a slot abandoned by a cancelled dispatcher is replaced once
        for _ in 0..2 {
            let slot = self.register(key.clone())?;
            match self.wait(&slot).await {
                Ok(outcome) => return outcome,
                Err(_) => self.evict(&key, &slot),
            }
        }
        Err(StorageError::Cancelled)
    }

    /// Load several keys, returning results in the order requested.
    /// Duplicate keys are allowed and share one slot.
    pub async fn load_many(&self, keys: &[F::Key]) -> Result<Vec<Option<F::Value>>, StorageError> {
        futures::future::try_join_all(keys.iter().cloned().map(|key| self.load(key))).await
    }

    fn lock(&self) -> MutexGuard<'_, LoaderState<F::Key, F::Value>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, key: F::Key) -> Result<Slot<F::Value>, StorageError> {
        let mut state = self.lock();

        if let Some(err) = &state.poisoned {
            return Err(err.clone());
        }

        if let Some(slot) = state.slots.get(&key) {
            trace!(loader = self.name, ?key, "joining existing slot");
            return Ok(slot.clone());
        }

        let (tx, rx) = oneshot::channel();
        let slot = rx.shared();
        state.slots.insert(key.clone(), slot.clone());
        state.pending.push((key, tx));
        Ok(slot)
    }

    async fn wait(&self, slot: &Slot<F::Value>) -> Result<Outcome<F::Value>, oneshot::error::RecvError> {
        if let Some(done) = slot.peek() {
            return done.clone();
        }

        for _ in 0..self.yield_count {
            tokio::task::yield_now().await;
        }
        self.dispatch().await;

        slot.clone().await
    }

    /// Forget `slot` so the next load of `key` registers afresh.
    fn evict(&self, key: &F::Key, slot: &Slot<F::Value>) {
        let mut state = self.lock();
        if state.slots.get(key).is_some_and(|current| current.ptr_eq(slot)) {
            debug!(loader = self.name, ?key, "dropping slot of a cancelled batch");
            state.slots.remove(key);
        }
    }

    /// Run the pending batch, if another load has not already taken it.
    async fn dispatch(&self) {
        let batch = std::mem::take(&mut self.lock().pending);
        if batch.is_empty() {
            return;
        }

        let keys: Vec<F::Key> = batch.iter().map(|(key, _)| key.clone()).collect();
        debug!(loader = self.name, keys = keys.len(), "dispatching batch");

        match self.batch_fn.load(&keys).await {
            Ok(mut found) => {
                for (key, tx) in batch {
                    // receiver gone means every caller of this key was dropped
                    let _ = tx.send(Ok(found.remove(&key)));
                }
            }
            Err(err) => {
                warn!(loader = self.name, error = %err, keys = keys.len(), "batch load failed");
                self.lock().poisoned = Some(err.clone());
                for (_, tx) in batch {
                    let _ = tx.send(Err(err.clone()));
                }
            }
        }
    }
}
