//! Distributed memory manager
//!
//! Layers a bounded LRU cache, a durable local store, and best-effort
//! peer replication/prefetch behind one key-value interface.
//!
//! Locking discipline: all owned state sits behind one mutex whose
//! critical sections never span I/O. Durable-store and transport calls
//! happen outside the lock, so operations on unrelated keys never block
//! each other; per-key atomicity comes from each operation reading or
//! replacing a single map entry in one critical section.

use crate::ports::codec::{CodecError, ValueCodec};
use crate::ports::local_store::{LocalStore, StoreError};
use crate::ports::peer_transport::{PeerTransport, TransportError};
use hivemind_domain::{
    BatchOptions, CacheEntry, CacheStats, Consistency, DeleteOptions, HealthReport, HiveError,
    MetricsRecorder, OperationKind, PerformanceMetrics, ReadOptions, WriteOptions, related_keys,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::cache::CacheMap;
use super::events::MemoryEvent;

/// Errors that can occur during memory operations
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Invalid: {0}")]
    Invalid(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Peer fetch timed out after {0:?}")]
    Timeout(Duration),
}

impl MemoryError {
    /// Map into the domain error taxonomy
    pub fn classify(&self) -> HiveError {
        match self {
            MemoryError::Invalid(msg) => HiveError::Invalid(msg.clone()),
            MemoryError::Store(e) => HiveError::Transport(e.to_string()),
            MemoryError::Codec(e) => HiveError::Internal(e.to_string()),
            MemoryError::Transport(TransportError::Timeout) => {
                HiveError::Timeout("peer transport".into())
            }
            MemoryError::Transport(e) => HiveError::Transport(e.to_string()),
            MemoryError::Timeout(d) => HiveError::Timeout(format!("peer fetch after {d:?}")),
        }
    }
}

/// Tuning knobs for a [`DistributedMemoryManager`]
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Cache capacity bound (entries)
    pub cache_capacity: usize,
    /// Encode values through the codec before the durable write
    pub enable_compression: bool,
    /// Derive and resolve related keys after each write
    pub enable_prefetch: bool,
    /// Honor `WriteOptions::batch`
    pub enable_batching: bool,
    /// Flush the batch queue once it reaches this many entries
    pub batch_flush_size: usize,
    /// Flush the batch queue at least this often
    pub batch_flush_interval: Duration,
    /// Period of the metrics tick
    pub metrics_interval: Duration,
    /// Average-latency level (ms) above which health degrades
    pub performance_threshold_ms: f64,
    /// Error-rate level above which health degrades
    pub error_threshold: f64,
    /// Default bound on the peer-fetch step of `get`
    pub peer_fetch_timeout: Duration,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 10_000,
            enable_compression: true,
            enable_prefetch: true,
            enable_batching: true,
            batch_flush_size: 50,
            batch_flush_interval: Duration::from_secs(1),
            metrics_interval: Duration::from_secs(10),
            performance_threshold_ms: 100.0,
            error_threshold: 0.05,
            peer_fetch_timeout: Duration::from_secs(2),
        }
    }
}

struct ManagerState {
    cache: CacheMap,
    metrics: MetricsRecorder,
    batch_queue: Vec<(String, Value)>,
    replication_peers: Vec<String>,
}

/// Distributed memory manager for one node
///
/// Construct inside an `Arc`: replication, prefetch, and the background
/// ticks clone the handle.
pub struct DistributedMemoryManager {
    node_id: String,
    store: Arc<dyn LocalStore>,
    transport: Arc<dyn PeerTransport>,
    codec: Arc<dyn ValueCodec>,
    config: MemoryConfig,
    state: Mutex<ManagerState>,
    events: broadcast::Sender<MemoryEvent>,
}

impl DistributedMemoryManager {
    pub fn new(
        node_id: impl Into<String>,
        store: Arc<dyn LocalStore>,
        transport: Arc<dyn PeerTransport>,
        codec: Arc<dyn ValueCodec>,
        config: MemoryConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        let cache = CacheMap::new(config.cache_capacity);
        Self {
            node_id: node_id.into(),
            store,
            transport,
            codec,
            config,
            state: Mutex::new(ManagerState {
                cache,
                metrics: MetricsRecorder::new(),
                batch_queue: Vec::new(),
                replication_peers: Vec::new(),
            }),
            events,
        }
    }

    /// Subscribe to manager events
    pub fn subscribe(&self) -> broadcast::Receiver<MemoryEvent> {
        self.events.subscribe()
    }

    /// This node's identifier
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Resolve a key: cache, then durable store, then peers.
    ///
    /// A miss on all three is `Ok(None)`, never an error. The
    /// caller-supplied timeout bounds only the peer-fetch step.
    pub async fn get(&self, key: &str, opts: ReadOptions) -> Result<Option<Value>, MemoryError> {
        let started = Instant::now();

        // 1. Bounded local cache
        {
            let mut state = self.lock();
            if let Some(entry) = state.cache.get(key) {
                let value = entry.value.clone();
                state.metrics.record_hit();
                state
                    .metrics
                    .record_operation(OperationKind::Read, elapsed_ms(started));
                return Ok(Some(value));
            }
        }

        // 2. Durable local store
        match self.store.get(key).await {
            Ok(Some(raw)) => {
                let value = self.codec.decode(&raw)?;
                let compressed = self.codec.is_encoded(&raw);
                let mut state = self.lock();
                state
                    .cache
                    .insert(CacheEntry::new(key, value.clone(), compressed));
                state
                    .metrics
                    .record_operation(OperationKind::Read, elapsed_ms(started));
                return Ok(Some(value));
            }
            Ok(None) => {}
            Err(e) => {
                self.record_failure(OperationKind::Read, started);
                return Err(e.into());
            }
        }

        // 3. Peer fetch, bounded by the read timeout
        let bound = opts.timeout.unwrap_or(self.config.peer_fetch_timeout);
        match tokio::time::timeout(bound, self.transport.fetch_remote(key, opts.consistency)).await
        {
            Ok(Ok(Some(raw))) => {
                let value = self.codec.decode(&raw)?;
                let compressed = self.codec.is_encoded(&raw);
                // Populate the durable store so the next read stays local
                if let Err(e) = self.store.put(key, &raw).await {
                    warn!(%key, error = %e, "could not persist remotely fetched value");
                }
                let mut state = self.lock();
                state
                    .cache
                    .insert(CacheEntry::new(key, value.clone(), compressed));
                state
                    .metrics
                    .record_operation(OperationKind::Read, elapsed_ms(started));
                return Ok(Some(value));
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => {
                if opts.consistency == Consistency::Strong {
                    self.record_failure(OperationKind::Read, started);
                    return Err(e.into());
                }
                debug!(%key, error = %e, "peer fetch failed, treating as miss");
            }
            Err(_) => {
                if opts.consistency == Consistency::Strong {
                    self.record_failure(OperationKind::Read, started);
                    return Err(MemoryError::Timeout(bound));
                }
                debug!(%key, "peer fetch timed out, treating as miss");
            }
        }

        // Full miss
        let mut state = self.lock();
        state.metrics.record_miss();
        state
            .metrics
            .record_operation(OperationKind::Read, elapsed_ms(started));
        Ok(None)
    }

    /// Write a key: encode, persist locally, cache, then replicate and
    /// prefetch in the background.
    ///
    /// The primary durable write is the only step whose failure fails the
    /// call; replication is best-effort and reported through events.
    pub async fn set(
        self: &Arc<Self>,
        key: &str,
        value: Value,
        opts: WriteOptions,
    ) -> Result<(), MemoryError> {
        let started = Instant::now();

        if opts.batch && self.config.enable_batching {
            let due = {
                let mut state = self.lock();
                state.batch_queue.push((key.to_string(), value));
                state
                    .metrics
                    .record_operation(OperationKind::Write, elapsed_ms(started));
                state.batch_queue.len() >= self.config.batch_flush_size
            };
            if due {
                self.flush_batch().await;
            }
            return Ok(());
        }

        let encoded = self.encode_value(&value)?;
        let compressed = self.codec.is_encoded(&encoded);

        if let Err(e) = self.store.put(key, &encoded).await {
            self.record_failure(OperationKind::Write, started);
            return Err(e.into());
        }

        {
            let mut state = self.lock();
            state
                .cache
                .insert(CacheEntry::new(key, value.clone(), compressed));
            state
                .metrics
                .record_operation(OperationKind::Write, elapsed_ms(started));
        }

        if opts.replicate {
            self.spawn_replication(key.to_string(), encoded);
        }

        if self.config.enable_prefetch {
            let serialized = serde_json::to_string(&value).unwrap_or_default();
            let candidates = related_keys(key, &serialized);
            if !candidates.is_empty() {
                self.spawn_prefetch(key.to_string(), candidates);
            }
        }

        Ok(())
    }

    /// Remove a key from the cache, the durable store, and (unless
    /// suppressed) the replication peers.
    pub async fn delete(
        self: &Arc<Self>,
        key: &str,
        opts: DeleteOptions,
    ) -> Result<(), MemoryError> {
        let started = Instant::now();

        if let Err(e) = self.store.delete(key, opts.cascade).await {
            self.record_failure(OperationKind::Delete, started);
            return Err(e.into());
        }

        {
            let mut state = self.lock();
            state.cache.remove(key);
            state
                .metrics
                .record_operation(OperationKind::Delete, elapsed_ms(started));
        }

        if !opts.local_only {
            let manager = Arc::clone(self);
            let key = key.to_string();
            tokio::spawn(async move {
                let peers = manager.peers();
                if peers.is_empty() {
                    return;
                }
                if let Err(e) = manager.transport.delete_remote(&peers, &key).await {
                    warn!(%key, error = %e, "remote delete failed");
                }
            });
        }

        Ok(())
    }

    /// Resolve many keys with bounded parallelism.
    ///
    /// Keys are processed in windows of `opts.parallelism`; a window's
    /// operations run concurrently and join before the next window starts.
    /// Per-key failures are logged and omitted — partial success is the
    /// contract.
    pub async fn get_batch(
        &self,
        keys: &[String],
        opts: BatchOptions,
    ) -> Result<HashMap<String, Value>, MemoryError> {
        let mut resolved = HashMap::new();

        for window in keys.chunks(opts.parallelism.max(1)) {
            let lookups = window
                .iter()
                .map(|key| async move { (key.clone(), self.get(key, ReadOptions::default()).await) });
            for (key, outcome) in futures::future::join_all(lookups).await {
                match outcome {
                    Ok(Some(value)) => {
                        resolved.insert(key, value);
                    }
                    Ok(None) => {}
                    Err(e) => warn!(%key, error = %e, "batch get failed for key"),
                }
            }
        }

        Ok(resolved)
    }

    /// Write many keys.
    ///
    /// With `opts.atomic` the whole batch is one durable-store
    /// transaction; otherwise windows run in parallel with the same
    /// partial-success contract as [`Self::get_batch`]. Returns the number
    /// of entries applied.
    pub async fn set_batch(
        self: &Arc<Self>,
        entries: &[(String, Value)],
        opts: BatchOptions,
    ) -> Result<usize, MemoryError> {
        if opts.atomic {
            let started = Instant::now();
            let mut encoded = Vec::with_capacity(entries.len());
            for (key, value) in entries {
                encoded.push((key.clone(), self.encode_value(value)?));
            }

            if let Err(e) = self.store.apply(&encoded).await {
                self.record_failure(OperationKind::Write, started);
                return Err(e.into());
            }

            let mut state = self.lock();
            for (key, value) in entries {
                let compressed = self.config.enable_compression;
                state
                    .cache
                    .insert(CacheEntry::new(key, value.clone(), compressed));
                state
                    .metrics
                    .record_operation(OperationKind::Write, elapsed_ms(started));
            }
            return Ok(entries.len());
        }

        let mut applied = 0;
        for window in entries.chunks(opts.parallelism.max(1)) {
            let writes = window.iter().map(|(key, value)| {
                let manager = Arc::clone(self);
                async move {
                    (
                        key.clone(),
                        manager.set(key, value.clone(), WriteOptions::default()).await,
                    )
                }
            });
            for (key, outcome) in futures::future::join_all(writes).await {
                match outcome {
                    Ok(()) => applied += 1,
                    Err(e) => warn!(%key, error = %e, "batch set failed for key"),
                }
            }
        }
        Ok(applied)
    }

    /// Flush queued batched writes as one durable-store transaction.
    ///
    /// Failures are recorded and reported, not propagated: the callers
    /// that enqueued these writes have long since returned.
    pub async fn flush_batch(self: &Arc<Self>) {
        let queued: Vec<(String, Value)> = {
            let mut state = self.lock();
            std::mem::take(&mut state.batch_queue)
        };
        if queued.is_empty() {
            return;
        }

        let mut encoded = Vec::with_capacity(queued.len());
        for (key, value) in &queued {
            match self.encode_value(value) {
                Ok(v) => encoded.push((key.clone(), v)),
                Err(e) => {
                    warn!(%key, error = %e, "dropping unencodable batched write");
                }
            }
        }

        match self.store.apply(&encoded).await {
            Ok(()) => {
                let count = encoded.len();
                let mut state = self.lock();
                for (key, value) in queued {
                    let compressed = self.config.enable_compression;
                    state.cache.insert(CacheEntry::new(&key, value, compressed));
                }
                drop(state);
                info!(entries = count, "batch queue flushed");
                self.emit(MemoryEvent::BatchFlushed { entries: count });
            }
            Err(e) => {
                warn!(error = %e, entries = encoded.len(), "batch flush failed, writes dropped");
                self.lock().metrics.record_error();
            }
        }
    }

    /// Current performance snapshot
    pub fn get_metrics(&self) -> PerformanceMetrics {
        self.lock().metrics.snapshot()
    }

    /// Cache occupancy summary
    pub fn get_cache_stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            entries: state.cache.len(),
            total_size_bytes: state.cache.total_size_bytes(),
            hits: state.metrics.hits(),
            misses: state.metrics.misses(),
            hit_ratio: state.metrics.hit_ratio(),
            utilization: state.cache.len() as f64 / state.cache.capacity() as f64,
        }
    }

    /// Health verdict from the current metrics against the configured
    /// thresholds. Degradation shows up here, not as operation errors.
    pub fn health_check(&self) -> HealthReport {
        let metrics = self.get_metrics();
        let issues = self.threshold_issues(&metrics);
        HealthReport {
            healthy: issues.is_empty(),
            issues,
            metrics,
        }
    }

    /// Refresh the replication peer list from the transport
    pub async fn refresh_peers(&self) {
        match self.transport.discover_peers().await {
            Ok(nodes) => {
                let peers: Vec<String> = nodes
                    .into_iter()
                    .filter(|n| n.is_available() && n.id != self.node_id)
                    .map(|n| n.id)
                    .collect();
                debug!(count = peers.len(), "replication peers refreshed");
                self.lock().replication_peers = peers;
            }
            Err(e) => warn!(error = %e, "peer discovery failed"),
        }
    }

    /// Start the background ticks; cancel the returned token to stop them
    pub fn start(self: &Arc<Self>) -> CancellationToken {
        let token = CancellationToken::new();

        // Metrics tick: recompute windows, warn on threshold crossings
        {
            let manager = Arc::clone(self);
            let token = token.clone();
            tokio::spawn(async move {
                let mut tick = tokio::time::interval(manager.config.metrics_interval);
                tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tick.tick() => {
                            manager.refresh_peers().await;
                            let metrics = manager.get_metrics();
                            let issues = manager.threshold_issues(&metrics);
                            if !issues.is_empty() {
                                warn!(?issues, "performance thresholds exceeded");
                                manager.emit(MemoryEvent::PerformanceWarning { issues, metrics });
                            }
                        }
                    }
                }
            });
        }

        // Batch flush tick
        if self.config.enable_batching {
            let manager = Arc::clone(self);
            let token = token.clone();
            tokio::spawn(async move {
                let mut tick = tokio::time::interval(manager.config.batch_flush_interval);
                tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tick.tick() => manager.flush_batch().await,
                    }
                }
            });
        }

        token
    }

    fn threshold_issues(&self, metrics: &PerformanceMetrics) -> Vec<String> {
        let mut issues = Vec::new();
        if metrics.avg_latency > self.config.performance_threshold_ms {
            issues.push(format!(
                "average latency {:.1}ms exceeds threshold {:.1}ms",
                metrics.avg_latency, self.config.performance_threshold_ms
            ));
        }
        if metrics.error_rate > self.config.error_threshold {
            issues.push(format!(
                "error rate {:.3} exceeds threshold {:.3}",
                metrics.error_rate, self.config.error_threshold
            ));
        }
        issues
    }

    fn spawn_replication(self: &Arc<Self>, key: String, encoded: Value) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let peers = manager.peers();
            if peers.is_empty() {
                return;
            }
            match manager.transport.replicate_to(&peers, &key, &encoded).await {
                Ok(()) => {
                    let mut state = manager.lock();
                    if let Some(entry) = state.cache.get_untouched_mut(&key) {
                        for peer in &peers {
                            entry.add_replica(peer.clone());
                        }
                    }
                    debug!(%key, peers = peers.len(), "replication completed");
                }
                Err(e) => {
                    warn!(%key, error = %e, "replication failed");
                    manager.lock().metrics.record_error();
                    manager.emit(MemoryEvent::ReplicationFailed {
                        key,
                        detail: e.to_string(),
                    });
                }
            }
        });
    }

    fn spawn_prefetch(self: &Arc<Self>, origin_key: String, candidates: Vec<String>) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut resolved = 0;
            for candidate in candidates {
                if manager.lock().cache.contains_key(&candidate) {
                    continue;
                }
                match manager.store.get(&candidate).await {
                    Ok(Some(raw)) => {
                        let Ok(value) = manager.codec.decode(&raw) else {
                            continue;
                        };
                        let compressed = manager.codec.is_encoded(&raw);
                        manager
                            .lock()
                            .cache
                            .insert(CacheEntry::new(&candidate, value, compressed));
                        resolved += 1;
                    }
                    Ok(None) => {}
                    Err(e) => debug!(key = %candidate, error = %e, "prefetch lookup failed"),
                }
            }
            debug!(origin = %origin_key, resolved, "prefetch pass completed");
            manager.emit(MemoryEvent::PrefetchCompleted {
                origin_key,
                resolved,
            });
        });
    }

    fn encode_value(&self, value: &Value) -> Result<Value, MemoryError> {
        if self.config.enable_compression {
            Ok(self.codec.encode(value)?)
        } else {
            Ok(value.clone())
        }
    }

    fn record_failure(&self, kind: OperationKind, started: Instant) {
        let mut state = self.lock();
        state.metrics.record_error();
        state.metrics.record_operation(kind, elapsed_ms(started));
    }

    fn peers(&self) -> Vec<String> {
        self.lock().replication_peers.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: MemoryEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hivemind_domain::DistributedNode;
    use serde_json::json;
    use std::collections::HashMap as StdHashMap;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const MARKER: &str = "hmc1:";

    /// Marker-tagging codec matching the production contract
    struct MarkerCodec;

    impl ValueCodec for MarkerCodec {
        fn encode(&self, value: &Value) -> Result<Value, CodecError> {
            let json = serde_json::to_string(value)
                .map_err(|e| CodecError::Encode(e.to_string()))?;
            Ok(Value::String(format!("{MARKER}{json}")))
        }

        fn decode(&self, value: &Value) -> Result<Value, CodecError> {
            match value {
                Value::String(s) if s.starts_with(MARKER) => {
                    serde_json::from_str(&s[MARKER.len()..])
                        .map_err(|e| CodecError::Decode(e.to_string()))
                }
                other => Ok(other.clone()),
            }
        }

        fn is_encoded(&self, value: &Value) -> bool {
            matches!(value, Value::String(s) if s.starts_with(MARKER))
        }
    }

    #[derive(Default)]
    struct StubStore {
        data: StdMutex<StdHashMap<String, Value>>,
        gets: AtomicUsize,
        applies: AtomicUsize,
        poison_key: Option<String>,
    }

    #[async_trait]
    impl LocalStore for StubStore {
        async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            if self.poison_key.as_deref() == Some(key) {
                return Err(StoreError::Storage("poisoned key".into()));
            }
            Ok(self.data.lock().unwrap().get(key).cloned())
        }

        async fn put(&self, key: &str, value: &Value) -> Result<(), StoreError> {
            if self.poison_key.as_deref() == Some(key) {
                return Err(StoreError::Storage("poisoned key".into()));
            }
            self.data
                .lock()
                .unwrap()
                .insert(key.to_string(), value.clone());
            Ok(())
        }

        async fn delete(&self, key: &str, _cascade: bool) -> Result<(), StoreError> {
            self.data.lock().unwrap().remove(key);
            Ok(())
        }

        async fn apply(&self, entries: &[(String, Value)]) -> Result<(), StoreError> {
            self.applies.fetch_add(1, Ordering::SeqCst);
            for (key, _) in entries {
                if self.poison_key.as_deref() == Some(key) {
                    return Err(StoreError::TransactionAborted("poisoned key".into()));
                }
            }
            let mut data = self.data.lock().unwrap();
            for (key, value) in entries {
                data.insert(key.clone(), value.clone());
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct StubTransport {
        remote: StdMutex<StdHashMap<String, Value>>,
        replicated: StdMutex<Vec<(Vec<String>, String)>>,
        deleted: StdMutex<Vec<String>>,
        peers: Vec<DistributedNode>,
        fetch_delay: Option<Duration>,
    }

    #[async_trait]
    impl PeerTransport for StubTransport {
        async fn fetch_remote(
            &self,
            key: &str,
            _consistency: Consistency,
        ) -> Result<Option<Value>, TransportError> {
            if let Some(delay) = self.fetch_delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.remote.lock().unwrap().get(key).cloned())
        }

        async fn replicate_to(
            &self,
            peers: &[String],
            key: &str,
            value: &Value,
        ) -> Result<(), TransportError> {
            self.remote
                .lock()
                .unwrap()
                .insert(key.to_string(), value.clone());
            self.replicated
                .lock()
                .unwrap()
                .push((peers.to_vec(), key.to_string()));
            Ok(())
        }

        async fn delete_remote(&self, _peers: &[String], key: &str) -> Result<(), TransportError> {
            self.remote.lock().unwrap().remove(key);
            self.deleted.lock().unwrap().push(key.to_string());
            Ok(())
        }

        async fn discover_peers(&self) -> Result<Vec<DistributedNode>, TransportError> {
            Ok(self.peers.clone())
        }
    }

    fn manager_with(
        store: StubStore,
        transport: StubTransport,
        config: MemoryConfig,
    ) -> (Arc<DistributedMemoryManager>, Arc<StubStore>, Arc<StubTransport>) {
        let store = Arc::new(store);
        let transport = Arc::new(transport);
        let manager = Arc::new(DistributedMemoryManager::new(
            "node-1",
            store.clone(),
            transport.clone(),
            Arc::new(MarkerCodec),
            config,
        ));
        (manager, store, transport)
    }

    fn manager() -> (Arc<DistributedMemoryManager>, Arc<StubStore>, Arc<StubTransport>) {
        manager_with(
            StubStore::default(),
            StubTransport::default(),
            MemoryConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_read_your_writes_with_compression() {
        let (manager, store, _) = manager();
        let value = json!({"name": "ada", "role": "queen"});

        manager
            .set("agent:1", value.clone(), WriteOptions::default())
            .await
            .unwrap();

        // The durable copy is marker-tagged, the read returns the original
        let stored = store.data.lock().unwrap().get("agent:1").cloned().unwrap();
        assert!(matches!(&stored, Value::String(s) if s.starts_with(MARKER)));

        let read = manager.get("agent:1", ReadOptions::default()).await.unwrap();
        assert_eq!(read, Some(value));
    }

    #[tokio::test]
    async fn test_read_your_writes_without_compression() {
        let (manager, store, _) = manager_with(
            StubStore::default(),
            StubTransport::default(),
            MemoryConfig {
                enable_compression: false,
                ..Default::default()
            },
        );
        let value = json!([1, 2, 3]);

        manager
            .set("list:1", value.clone(), WriteOptions::default())
            .await
            .unwrap();
        assert_eq!(
            store.data.lock().unwrap().get("list:1").cloned(),
            Some(value.clone())
        );
        assert_eq!(
            manager.get("list:1", ReadOptions::default()).await.unwrap(),
            Some(value)
        );
    }

    #[tokio::test]
    async fn test_store_hit_populates_cache() {
        let (manager, store, _) = manager();
        store
            .data
            .lock()
            .unwrap()
            .insert("seeded".into(), json!("value"));

        assert_eq!(
            manager.get("seeded", ReadOptions::default()).await.unwrap(),
            Some(json!("value"))
        );
        let gets_after_first = store.gets.load(Ordering::SeqCst);

        // Second read is served from cache
        assert_eq!(
            manager.get("seeded", ReadOptions::default()).await.unwrap(),
            Some(json!("value"))
        );
        assert_eq!(store.gets.load(Ordering::SeqCst), gets_after_first);

        let stats = manager.get_cache_stats();
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test]
    async fn test_full_miss_is_not_an_error() {
        let (manager, _, _) = manager();
        assert_eq!(
            manager.get("ghost", ReadOptions::default()).await.unwrap(),
            None
        );
        let stats = manager.get_cache_stats();
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_peer_hit_populates_store_and_cache() {
        let transport = StubTransport::default();
        transport
            .remote
            .lock()
            .unwrap()
            .insert("shared".into(), json!({"from": "peer"}));
        let (manager, store, _) = manager_with(StubStore::default(), transport, MemoryConfig::default());

        let read = manager.get("shared", ReadOptions::default()).await.unwrap();
        assert_eq!(read, Some(json!({"from": "peer"})));
        assert!(store.data.lock().unwrap().contains_key("shared"));

        // Next read never leaves the cache
        let gets = store.gets.load(Ordering::SeqCst);
        manager.get("shared", ReadOptions::default()).await.unwrap();
        assert_eq!(store.gets.load(Ordering::SeqCst), gets);
    }

    #[tokio::test]
    async fn test_strong_read_times_out() {
        let (manager, _, _) = manager_with(
            StubStore::default(),
            StubTransport {
                fetch_delay: Some(Duration::from_millis(200)),
                ..Default::default()
            },
            MemoryConfig::default(),
        );

        let opts = ReadOptions::default()
            .with_consistency(Consistency::Strong)
            .with_timeout(Duration::from_millis(5));
        let err = manager.get("slow", opts).await.unwrap_err();
        assert!(matches!(err, MemoryError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_eventual_read_swallows_peer_timeout() {
        let (manager, _, _) = manager_with(
            StubStore::default(),
            StubTransport {
                fetch_delay: Some(Duration::from_millis(200)),
                ..Default::default()
            },
            MemoryConfig::default(),
        );

        let opts = ReadOptions::default().with_timeout(Duration::from_millis(5));
        assert_eq!(manager.get("slow", opts).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_replication_reaches_peers() {
        let (manager, _, transport) = manager_with(
            StubStore::default(),
            StubTransport {
                peers: vec![
                    DistributedNode::new("node-2", "addr-2"),
                    DistributedNode::new("node-3", "addr-3"),
                ],
                ..Default::default()
            },
            MemoryConfig::default(),
        );
        manager.refresh_peers().await;

        manager
            .set("rep:1", json!(1), WriteOptions::default())
            .await
            .unwrap();
        // Replication is fire-and-forget; give the task a beat
        tokio::time::sleep(Duration::from_millis(50)).await;

        let replicated = transport.replicated.lock().unwrap();
        assert_eq!(replicated.len(), 1);
        assert_eq!(replicated[0].0, vec!["node-2", "node-3"]);
    }

    #[tokio::test]
    async fn test_discovery_excludes_self() {
        let (manager, _, _) = manager_with(
            StubStore::default(),
            StubTransport {
                peers: vec![
                    DistributedNode::new("node-1", "self"),
                    DistributedNode::new("node-2", "other"),
                ],
                ..Default::default()
            },
            MemoryConfig::default(),
        );
        manager.refresh_peers().await;
        assert_eq!(manager.peers(), vec!["node-2"]);
    }

    #[tokio::test]
    async fn test_replicate_false_skips_peers() {
        let (manager, _, transport) = manager_with(
            StubStore::default(),
            StubTransport {
                peers: vec![DistributedNode::new("node-2", "addr")],
                ..Default::default()
            },
            MemoryConfig::default(),
        );
        manager.refresh_peers().await;

        manager
            .set("local:1", json!(1), WriteOptions::default().without_replication())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(transport.replicated.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_everywhere() {
        let (manager, store, transport) = manager_with(
            StubStore::default(),
            StubTransport {
                peers: vec![DistributedNode::new("node-2", "addr-2")],
                ..Default::default()
            },
            MemoryConfig::default(),
        );
        // Remote deletes go to the discovered peer set, like replication
        manager.refresh_peers().await;
        manager
            .set("gone:1", json!(1), WriteOptions::default())
            .await
            .unwrap();

        manager.delete("gone:1", DeleteOptions::default()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!store.data.lock().unwrap().contains_key("gone:1"));
        assert_eq!(
            manager.get("gone:1", ReadOptions::default()).await.unwrap(),
            None
        );
        assert_eq!(*transport.deleted.lock().unwrap(), vec!["gone:1"]);
    }

    #[tokio::test]
    async fn test_get_batch_partial_success() {
        let (manager, store, _) = manager_with(
            StubStore {
                poison_key: Some("boom".into()),
                ..Default::default()
            },
            StubTransport::default(),
            MemoryConfig::default(),
        );
        {
            let mut data = store.data.lock().unwrap();
            data.insert("a".into(), json!(1));
            data.insert("b".into(), json!(2));
            data.insert("c".into(), json!(3));
        }

        let keys: Vec<String> = ["a", "boom", "b", "missing", "c"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let resolved = manager
            .get_batch(&keys, BatchOptions::default().with_parallelism(2))
            .await
            .unwrap();

        // Exactly the present keys; the poisoned key reduced nothing else
        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved["a"], json!(1));
        assert_eq!(resolved["b"], json!(2));
        assert_eq!(resolved["c"], json!(3));
    }

    #[tokio::test]
    async fn test_set_batch_atomic_uses_one_transaction() {
        let (manager, store, _) = manager();
        let entries = vec![
            ("x:1".to_string(), json!(1)),
            ("x:2".to_string(), json!(2)),
            ("x:3".to_string(), json!(3)),
        ];

        let applied = manager
            .set_batch(&entries, BatchOptions::default().atomic())
            .await
            .unwrap();
        assert_eq!(applied, 3);
        assert_eq!(store.applies.load(Ordering::SeqCst), 1);
        assert_eq!(
            manager.get("x:2", ReadOptions::default()).await.unwrap(),
            Some(json!(2))
        );
    }

    #[tokio::test]
    async fn test_set_batch_atomic_all_or_nothing() {
        let (manager, store, _) = manager_with(
            StubStore {
                poison_key: Some("x:2".into()),
                ..Default::default()
            },
            StubTransport::default(),
            MemoryConfig::default(),
        );
        let entries = vec![
            ("x:1".to_string(), json!(1)),
            ("x:2".to_string(), json!(2)),
        ];

        let err = manager
            .set_batch(&entries, BatchOptions::default().atomic())
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::Store(_)));
        assert!(store.data.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_batch_windowed_partial_success() {
        let (manager, _, _) = manager_with(
            StubStore {
                poison_key: Some("bad".into()),
                ..Default::default()
            },
            StubTransport::default(),
            MemoryConfig::default(),
        );
        let entries = vec![
            ("ok:1".to_string(), json!(1)),
            ("bad".to_string(), json!(2)),
            ("ok:2".to_string(), json!(3)),
        ];

        let applied = manager
            .set_batch(&entries, BatchOptions::default())
            .await
            .unwrap();
        assert_eq!(applied, 2);
    }

    #[tokio::test]
    async fn test_batched_writes_flush_at_size() {
        let (manager, store, _) = manager_with(
            StubStore::default(),
            StubTransport::default(),
            MemoryConfig {
                batch_flush_size: 2,
                ..Default::default()
            },
        );

        manager
            .set("q:1", json!(1), WriteOptions::default().batched())
            .await
            .unwrap();
        assert!(store.data.lock().unwrap().is_empty());

        // Second enqueue reaches the flush size
        manager
            .set("q:2", json!(2), WriteOptions::default().batched())
            .await
            .unwrap();
        assert_eq!(store.data.lock().unwrap().len(), 2);
        assert_eq!(store.applies.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_explicit_flush_drains_queue() {
        let (manager, store, _) = manager();
        manager
            .set("q:1", json!(1), WriteOptions::default().batched())
            .await
            .unwrap();

        manager.flush_batch().await;
        assert_eq!(store.data.lock().unwrap().len(), 1);

        // Empty queue flush is a no-op
        manager.flush_batch().await;
        assert_eq!(store.applies.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_prefetch_makes_siblings_cache_resident() {
        let (manager, store, _) = manager();
        // Seed the namespace siblings in the durable store
        {
            let mut data = store.data.lock().unwrap();
            data.insert("user:metadata".into(), json!({"version": 2}));
            data.insert("user:config".into(), json!({"theme": "dark"}));
        }

        manager
            .set("user:1", json!({"name": "ada"}), WriteOptions::default())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Siblings were resolved into the cache by the prefetch pass
        let gets_before = store.gets.load(Ordering::SeqCst);
        assert_eq!(
            manager
                .get("user:metadata", ReadOptions::default())
                .await
                .unwrap(),
            Some(json!({"version": 2}))
        );
        assert_eq!(store.gets.load(Ordering::SeqCst), gets_before);
    }

    #[tokio::test]
    async fn test_primary_write_failure_fails_call() {
        let (manager, _, _) = manager_with(
            StubStore {
                poison_key: Some("bad".into()),
                ..Default::default()
            },
            StubTransport::default(),
            MemoryConfig::default(),
        );

        let err = manager
            .set("bad", json!(1), WriteOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::Store(_)));
    }

    #[tokio::test]
    async fn test_health_check_degrades_on_errors() {
        let (manager, _, _) = manager_with(
            StubStore {
                poison_key: Some("bad".into()),
                ..Default::default()
            },
            StubTransport::default(),
            MemoryConfig {
                error_threshold: 0.01,
                ..Default::default()
            },
        );

        assert!(manager.health_check().healthy);
        let _ = manager.get("bad", ReadOptions::default()).await;

        let report = manager.health_check();
        assert!(!report.healthy);
        assert!(report.issues.iter().any(|i| i.contains("error rate")));
    }

    #[tokio::test]
    async fn test_metrics_count_operations() {
        let (manager, _, _) = manager();
        manager
            .set("m:1", json!(1), WriteOptions::default())
            .await
            .unwrap();
        manager.get("m:1", ReadOptions::default()).await.unwrap();
        manager.get("m:2", ReadOptions::default()).await.unwrap();

        let metrics = manager.get_metrics();
        assert_eq!(metrics.write_ops, 1);
        assert_eq!(metrics.read_ops, 2);
        assert_eq!(metrics.total_operations, 3);
        assert_eq!(metrics.cache_hits, 1);
        assert_eq!(metrics.cache_misses, 1);
    }

    #[tokio::test]
    async fn test_lru_eviction_at_capacity() {
        let (manager, _, _) = manager_with(
            StubStore::default(),
            StubTransport::default(),
            MemoryConfig {
                cache_capacity: 3,
                enable_prefetch: false,
                ..Default::default()
            },
        );

        for key in ["k:1", "k:2", "k:3"] {
            manager.set(key, json!(key), WriteOptions::default()).await.unwrap();
        }
        // Touch k:1 and k:2 so k:3 is least recently accessed
        manager.get("k:1", ReadOptions::default()).await.unwrap();
        manager.get("k:2", ReadOptions::default()).await.unwrap();

        manager.set("k:4", json!("new"), WriteOptions::default()).await.unwrap();

        let state = manager.lock();
        assert_eq!(state.cache.len(), 3);
        assert!(!state.cache.contains_key("k:3"));
        assert!(state.cache.contains_key("k:4"));
    }
}
