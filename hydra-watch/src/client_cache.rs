use fnv::FnvHashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::{
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc
    },
    time::Duration
};
use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior}
};
use tracing::{debug, trace};

/// Options for the [`ClientCache`](./struct.ClientCache.html).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientCacheOptions {
    /// How long an entry lives before the sweeper may remove it.
    pub ttl: Duration,
    /// How often the sweeper runs.
    pub sweep_interval: Duration
}

impl Default for ClientCacheOptions {
    fn default() -> Self {
        ClientCacheOptions {
            ttl: Duration::from_secs(1),
            sweep_interval: Duration::from_secs(1)
        }
    }
}

enum Slot<C: Clone> {
    Pending {
        generation: u64,
        client: Shared<BoxFuture<'static, C>>
    },
    Ready(C)
}

struct Entry<C: Clone> {
    slot: Slot<C>,
    expires: Instant
}

enum Lookup<C: Clone> {
    Ready(C),
    Pending(u64, Shared<BoxFuture<'static, C>>)
}

/// Holds one client per render context.
///
/// A client is built at most once per id, even when several queries of the same render ask for it
/// at the same time: the first caller stores the pending construction and everyone else awaits
/// it. Entries are removed by [`gc`](#method.gc) when the render is done, or by the
/// [sweeper](#method.start_sweeper) once they expire.
pub struct ClientCache<C: Clone> {
    entries: Mutex<FnvHashMap<String, Entry<C>>>,
    next_generation: AtomicU64,
    options: ClientCacheOptions
}

impl<C: Clone + Send + Sync + 'static> Default for ClientCache<C> {
    fn default() -> Self {
        Self::new(ClientCacheOptions::default())
    }
}

impl<C: Clone + Send + Sync + 'static> ClientCache<C> {
    pub fn new(options: ClientCacheOptions) -> Self {
        ClientCache {
            entries: Mutex::new(FnvHashMap::default()),
            next_generation: AtomicU64::new(0),
            options
        }
    }

    pub fn options(&self) -> &ClientCacheOptions {
        &self.options
    }

    fn lookup(&self, id: &str) -> Option<Lookup<C>> {
        self.entries.lock().get(id).map(|entry| match entry.slot {
            Slot::Ready(ref client) => Lookup::Ready(client.clone()),
            Slot::Pending {
                generation,
                ref client
            } => Lookup::Pending(generation, client.clone())
        })
    }

    async fn resolve(&self, id: &str, generation: u64, client: Shared<BoxFuture<'static, C>>) -> C {
        let client = client.await;

        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(id) {
            // Only promote the construction we awaited. A gc in the meantime wins.
            let current = matches!(entry.slot, Slot::Pending { generation: g, .. } if g == generation);
            if current {
                entry.slot = Slot::Ready(client.clone());
            }
        }
        client
    }

    /// Returns the client for `id`, calling `factory` to build it if there is none yet.
    ///
    /// `factory` is called at most once per id, while the entry is being created.
    pub async fn get_or_create<F, Fut>(&self, id: &str, factory: F) -> C
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = C> + Send + 'static
    {
        let (generation, client) = {
            let mut entries = self.entries.lock();
            match entries.get(id) {
                Some(Entry {
                    slot: Slot::Ready(client),
                    ..
                }) => return client.clone(),
                Some(Entry {
                    slot: Slot::Pending { generation, client },
                    ..
                }) => (*generation, client.clone()),
                None => {
                    let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                    let client = factory().boxed().shared();
                    entries.insert(
                        id.to_string(),
                        Entry {
                            slot: Slot::Pending {
                                generation,
                                client: client.clone()
                            },
                            expires: Instant::now() + self.options.ttl
                        }
                    );
                    debug!(id, "creating client");
                    (generation, client)
                }
            }
        };

        self.resolve(id, generation, client).await
    }

    /// Returns the client for `id` if one exists or is being built.
    pub async fn get_client(&self, id: &str) -> Option<C> {
        match self.lookup(id)? {
            Lookup::Ready(client) => Some(client),
            Lookup::Pending(generation, client) => Some(self.resolve(id, generation, client).await)
        }
    }

    /// Removes the client of a finished render context. Returns whether there was one.
    pub fn gc(&self, id: &str) -> bool {
        let removed = self.entries.lock().remove(id).is_some();
        if removed {
            debug!(id, "collected client");
        }
        removed
    }

    /// Removes every client that finished construction and has expired.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| matches!(entry.slot, Slot::Pending { .. }) || entry.expires > now);
        let swept = before - entries.len();
        if swept > 0 {
            trace!(swept, "swept expired clients");
        }
        swept
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Runs [`sweep`](#method.sweep) periodically on the tokio runtime. Meant for servers, where
    /// a render that never calls `gc` would otherwise leak its client.
    ///
    /// The task only holds a weak reference and stops once the cache is dropped.
    pub fn start_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let cache = Arc::downgrade(self);
        let period = self.options.sweep_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                match cache.upgrade() {
                    Some(cache) => {
                        cache.sweep();
                    }
                    None => break
                }
            }
        })
    }
}
