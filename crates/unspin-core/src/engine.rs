//! The batch engine: submission surface, dedupe, and the drain loop.
//!
//! Fragments enter through [`Engine::submit`], which validates shape,
//! drops duplicate handles, and queues the rest. A background drain
//! loop pulls batches of up to `batch_size` items, runs the whole batch
//! concurrently, sleeps `batch_delay` between batches when more work is
//! waiting, and delivers exactly one [`FragmentOutcome`] per accepted
//! fragment over its oneshot channel. Batch size is the only source of
//! parallelism toward the external service; there is no unbounded
//! fan-out.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use unspin_llm::Provider;
use unspin_types::{
    CacheRecord, EngineConfig, EngineError, Fragment, FragmentHandle, FragmentOutcome,
    NeutralizedFragment, ProcessingState, Result,
};

use crate::cache::ResultCache;
use crate::detector;
use crate::fingerprint::fingerprint;
use crate::neutralizer::Neutralizer;
use crate::scorer;

struct Job {
    fragment: Fragment,
    result_tx: oneshot::Sender<FragmentOutcome>,
}

/// Shared pieces the drain loop and its workers operate on.
#[derive(Clone)]
struct Pipeline {
    cache: Arc<ResultCache>,
    neutralizer: Arc<Neutralizer>,
    seen: Arc<DashMap<FragmentHandle, ProcessingState>>,
    auto_neutralize: bool,
}

/// Batch scheduler over the detection/neutralization pipeline.
pub struct Engine {
    config: EngineConfig,
    enabled: AtomicBool,
    cache: Arc<ResultCache>,
    seen: Arc<DashMap<FragmentHandle, ProcessingState>>,
    queue_tx: mpsc::UnboundedSender<Job>,
}

impl Engine {
    /// Build an engine and start its drain loop.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ConfigInvalid`] for configurations the
    /// engine cannot run with.
    pub fn new(config: EngineConfig, provider: Arc<dyn Provider>) -> Result<Arc<Engine>> {
        config.validate()?;

        let cache = Arc::new(ResultCache::new(config.cache_ttl(), config.cache_capacity));
        let seen = Arc::new(DashMap::new());
        let pipeline = Pipeline {
            cache: Arc::clone(&cache),
            neutralizer: Arc::new(Neutralizer::new(provider, &config)),
            seen: Arc::clone(&seen),
            auto_neutralize: config.auto_neutralize,
        };

        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        tokio::spawn(drain_loop(
            pipeline,
            queue_rx,
            config.batch_size,
            config.batch_delay(),
        ));

        Ok(Arc::new(Engine {
            enabled: AtomicBool::new(config.enabled),
            config,
            cache,
            seen,
            queue_tx,
        }))
    }

    /// Submit one fragment for processing.
    ///
    /// Returns a receiver for the fragment's terminal outcome, or
    /// `Ok(None)` when the handle was already seen and the submission
    /// is silently dropped.
    ///
    /// # Errors
    ///
    /// [`EngineError::Disabled`] when the engine is switched off,
    /// [`EngineError::InputRejected`] when the text length is out of
    /// bounds, and [`EngineError::Shutdown`] when the drain loop is
    /// gone.
    pub fn submit(&self, fragment: Fragment) -> Result<Option<oneshot::Receiver<FragmentOutcome>>> {
        if !self.enabled.load(Ordering::SeqCst) {
            return Err(EngineError::Disabled);
        }

        let chars = fragment.text.chars().count();
        if chars < self.config.min_fragment_chars {
            return Err(EngineError::InputRejected {
                reason: format!(
                    "fragment too short: {chars} chars (minimum {})",
                    self.config.min_fragment_chars
                ),
            });
        }
        if chars > self.config.max_fragment_chars {
            return Err(EngineError::InputRejected {
                reason: format!(
                    "fragment too long: {chars} chars (maximum {})",
                    self.config.max_fragment_chars
                ),
            });
        }

        let handle = fragment.handle.clone();
        match self.seen.entry(handle.clone()) {
            Entry::Occupied(entry) => {
                debug!(handle = %handle, state = ?entry.get(), "duplicate submission dropped");
                Ok(None)
            }
            Entry::Vacant(entry) => {
                entry.insert(ProcessingState::Pending);
                let (result_tx, result_rx) = oneshot::channel();
                if self
                    .queue_tx
                    .send(Job {
                        fragment,
                        result_tx,
                    })
                    .is_err()
                {
                    self.seen.remove(&handle);
                    return Err(EngineError::Shutdown);
                }
                Ok(Some(result_rx))
            }
        }
    }

    /// Flip the master switch at runtime.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Current lifecycle state for a handle, if it is tracked.
    pub fn state_of(&self, handle: &FragmentHandle) -> Option<ProcessingState> {
        self.seen.get(handle).map(|entry| *entry.value())
    }

    /// Forget one handle so it can be submitted again.
    pub fn forget(&self, handle: &FragmentHandle) {
        self.seen.remove(handle);
    }

    /// Forget every tracked handle. Cached results are unaffected.
    pub fn reset(&self) {
        self.seen.clear();
    }

    /// The engine's result cache, for stats and manual clearing.
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("enabled", &self.is_enabled())
            .field("batch_size", &self.config.batch_size)
            .field("tracked_handles", &self.seen.len())
            .finish()
    }
}

// ── Drain loop ───────────────────────────────────────────────────────

async fn drain_loop(
    pipeline: Pipeline,
    mut queue_rx: mpsc::UnboundedReceiver<Job>,
    batch_size: usize,
    batch_delay: std::time::Duration,
) {
    loop {
        // Idle until work arrives; a closed channel means the engine
        // is gone and the loop can end.
        let Some(first) = queue_rx.recv().await else {
            debug!("queue closed, drain loop ending");
            return;
        };

        let mut batch = vec![first];
        while batch.len() < batch_size {
            match queue_rx.try_recv() {
                Ok(job) => batch.push(job),
                Err(_) => break,
            }
        }

        debug!(batch_len = batch.len(), "draining batch");

        let mut in_flight = Vec::with_capacity(batch.len());
        for job in batch {
            let Job {
                fragment,
                result_tx,
            } = job;
            let handle = fragment.handle.clone();
            pipeline
                .seen
                .insert(handle.clone(), ProcessingState::InFlight);
            let worker = tokio::spawn(process_fragment(pipeline.clone(), fragment));
            in_flight.push((handle, result_tx, worker));
        }

        // The workers run concurrently; awaiting them in order only
        // serializes result delivery.
        for (handle, result_tx, worker) in in_flight {
            match worker.await {
                Ok(done) => {
                    pipeline.seen.insert(handle, ProcessingState::Done);
                    let _ = result_tx.send(FragmentOutcome::Done(done));
                }
                Err(err) => {
                    // A worker panic fails its own fragment only. The
                    // handle leaves the seen map so resubmission can
                    // retry.
                    warn!(handle = %handle, error = %err, "fragment processing failed");
                    pipeline.seen.remove(&handle);
                    let _ = result_tx.send(FragmentOutcome::Failed {
                        reason: format!("processing failed: {err}"),
                    });
                }
            }
        }

        if !queue_rx.is_empty() {
            tokio::time::sleep(batch_delay).await;
        }
    }
}

/// Process one fragment: cache, detect, neutralize, store.
async fn process_fragment(pipeline: Pipeline, fragment: Fragment) -> NeutralizedFragment {
    let key = fingerprint(&fragment.text);

    if let Some(record) = pipeline.cache.get(&key) {
        debug!(handle = %fragment.handle, "cache hit");
        return NeutralizedFragment {
            original: fragment.text,
            neutralized: record.neutralized,
            techniques: record.techniques,
            severity: record.severity,
            from_cache: true,
        };
    }

    let matches = detector::detect(&fragment.text);
    if matches.is_empty() {
        // Clean fragments never reach the external service and are not
        // worth a cache slot.
        return NeutralizedFragment {
            neutralized: fragment.text.clone(),
            original: fragment.text,
            techniques: Vec::new(),
            severity: 0,
            from_cache: false,
        };
    }

    let result = if pipeline.auto_neutralize {
        pipeline.neutralizer.neutralize(&fragment.text).await
    } else {
        // Local-only mode: deterministic rewrite, detector-attributed
        // techniques, no external call.
        let mut result = pipeline.neutralizer.fallback(&fragment.text);
        result.techniques = matches.iter().map(|m| m.technique).collect();
        result.severity = scorer::score(&fragment.text, &result.techniques).severity;
        result
    };

    pipeline.cache.put(
        key,
        CacheRecord {
            fingerprint: key.to_hex(),
            original: fragment.text.clone(),
            neutralized: result.neutralized.clone(),
            techniques: result.techniques.clone(),
            severity: result.severity,
            created_at: Utc::now(),
            hit_count: 0,
        },
    );

    NeutralizedFragment {
        original: fragment.text,
        neutralized: result.neutralized,
        techniques: result.techniques,
        severity: result.severity,
        from_cache: false,
    }
}
