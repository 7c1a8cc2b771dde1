//! Background training of the learned backend's parameters.
//!
//! The registry samples recent memory entries into a [`TrainingBatch`] and
//! hands it to the [`TrainingWorker`] without blocking. The worker runs each
//! epoch on the blocking pool under a timeout and publishes the result
//! through the shared [`ModelHandle`]. Epochs that time out or fail are
//! discarded whole.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rand::seq::SliceRandom;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::action::Action;
use crate::config::TrainingConfig;
use crate::error::{LineageError, Result};
use crate::memory::MemoryEntry;
use crate::metrics::LineageCounters;
use crate::policy::learned::{self, FeatureVector};
use crate::policy::{ModelHandle, ModelParameters};
use crate::types::EntityId;

/// Weights are clipped to `[-WEIGHT_LIMIT, WEIGHT_LIMIT]` after each step.
pub const WEIGHT_LIMIT: f32 = 10.0;

// ---------------------------------------------------------------------------
// Batches
// ---------------------------------------------------------------------------

/// One past decision and how it turned out.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingExample {
    /// Features recorded with the entry.
    pub features: FeatureVector,
    /// Index of the taken action in [`Action::ALL`].
    pub action_index: usize,
    /// `+learning_value` on success, `-learning_value` on failure.
    pub reward: f32,
}

impl TrainingExample {
    /// Convert a memory entry; `None` if its action label is not an [`Action`].
    #[must_use]
    pub fn from_entry(entry: &MemoryEntry) -> Option<Self> {
        let action: Action = entry.action.parse().ok()?;
        let magnitude = entry.learning_value;
        Some(Self {
            features: learned::from_context(&entry.context),
            action_index: action.index(),
            reward: if entry.success { magnitude } else { -magnitude },
        })
    }
}

/// Examples drawn from one entity's recent memory.
#[derive(Debug, Clone, Default)]
pub struct TrainingBatch {
    /// Entity the examples came from.
    pub entity_id: Option<EntityId>,
    /// The examples.
    pub examples: Vec<TrainingExample>,
}

impl TrainingBatch {
    /// Sample up to `config.batch_size` examples from the newest
    /// `config.recent_window` entries.
    pub fn sample<R: Rng + ?Sized>(
        entity_id: EntityId,
        entries: &[MemoryEntry],
        config: &TrainingConfig,
        rng: &mut R,
    ) -> Self {
        let window = &entries[entries.len().saturating_sub(config.recent_window)..];
        let examples = window
            .choose_multiple(rng, config.batch_size)
            .filter_map(TrainingExample::from_entry)
            .collect();
        Self {
            entity_id: Some(entity_id),
            examples,
        }
    }

    /// Number of examples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    /// Whether the batch holds no examples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }
}

/// One REINFORCE pass over `batch`, returning updated parameters.
///
/// For each example the gradient of `log p(action)` under the softmax over
/// all actions is scaled by the reward and the learning rate.
#[must_use]
pub fn train_epoch(
    mut params: ModelParameters,
    batch: &TrainingBatch,
    learning_rate: f32,
) -> ModelParameters {
    for example in &batch.examples {
        let logits: Vec<f32> =
            Action::ALL.iter().map(|a| params.logit(*a, &example.features)).collect();
        let probs = learned::softmax(&logits);
        let step = learning_rate * example.reward;

        for (index, (row, p)) in params.weights.iter_mut().zip(&probs).enumerate() {
            let indicator = if index == example.action_index { 1.0 } else { 0.0 };
            let scale = step * (indicator - p);
            for (w, x) in row.iter_mut().zip(example.features.iter()) {
                *w = (*w + scale * x).clamp(-WEIGHT_LIMIT, WEIGHT_LIMIT);
            }
        }
    }
    params
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// Owns a tokio runtime that trains in the background.
#[derive(Debug)]
pub struct TrainingWorker {
    runtime: Runtime,
    tx: mpsc::Sender<TrainingBatch>,
    handle: ModelHandle,
    counters: Arc<LineageCounters>,
}

impl TrainingWorker {
    /// Start the runtime and the epoch loop.
    ///
    /// # Errors
    /// Returns [`LineageError::TrainingUnavailable`] if training is disabled
    /// and [`LineageError::Io`] if the runtime cannot be built.
    pub fn start(config: &TrainingConfig, counters: Arc<LineageCounters>) -> Result<Self> {
        if !config.enabled {
            return Err(LineageError::TrainingUnavailable("disabled in config".to_string()));
        }
        let runtime = Builder::new_multi_thread()
            .worker_threads(config.worker_threads.max(1))
            .thread_name("lineage-training")
            .enable_all()
            .build()?;

        let handle = ModelHandle::new(ModelParameters::uniform())?;
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        runtime.spawn(run_epochs(
            rx,
            handle.clone(),
            config.learning_rate,
            Duration::from_millis(config.epoch_timeout_ms),
            Arc::clone(&counters),
        ));
        info!(threads = config.worker_threads.max(1), "training worker started");

        Ok(Self {
            runtime,
            tx,
            handle,
            counters,
        })
    }

    /// Queue a batch without blocking. Returns whether it was accepted.
    ///
    /// Empty batches are ignored; a full queue drops the batch.
    pub fn submit(&self, batch: TrainingBatch) -> bool {
        if batch.is_empty() {
            return false;
        }
        match self.tx.try_send(batch) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                LineageCounters::bump(&self.counters.training_dropped);
                debug!("training queue full, batch dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                LineageCounters::bump(&self.counters.training_dropped);
                warn!("training worker stopped, batch dropped");
                false
            }
        }
    }

    /// Parameter handle for learned backends.
    #[must_use]
    pub fn handle(&self) -> ModelHandle {
        self.handle.clone()
    }

    /// Close the queue and wait briefly for the current epoch.
    pub fn shutdown(self) {
        let Self { runtime, tx, .. } = self;
        drop(tx);
        runtime.shutdown_timeout(Duration::from_millis(500));
        info!("training worker stopped");
    }
}

async fn run_epochs(
    mut rx: mpsc::Receiver<TrainingBatch>,
    handle: ModelHandle,
    learning_rate: f32,
    epoch_timeout: Duration,
    counters: Arc<LineageCounters>,
) {
    while let Some(batch) = rx.recv().await {
        let params = (*handle.current()).clone();
        let examples = batch.len();
        let task = tokio::task::spawn_blocking(move || train_epoch(params, &batch, learning_rate));

        match tokio::time::timeout(epoch_timeout, task).await {
            Ok(Ok(updated)) => match handle.publish(updated) {
                Ok(version) => {
                    LineageCounters::bump(&counters.training_epochs);
                    debug!(version, examples, "training epoch published");
                }
                Err(e) => warn!(error = %e, "training produced invalid parameters"),
            },
            Ok(Err(e)) => warn!(error = %e, "training epoch panicked"),
            Err(_) => {
                LineageCounters::bump(&counters.training_timeouts);
                warn!(
                    timeout_ms = epoch_timeout.as_millis(),
                    "training epoch timed out, result discarded"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryCategory;
    use crate::types::ContextMap;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn entry(action: &str, success: bool) -> MemoryEntry {
        MemoryEntry::new(
            MemoryCategory::Combat,
            ContextMap::new(),
            action,
            ContextMap::new(),
            success,
            0.0,
        )
    }

    #[test]
    fn unknown_actions_are_skipped() {
        let entries = vec![entry("attack", true), entry("dance", true)];
        let config = TrainingConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let batch = TrainingBatch::sample(EntityId::new(), &entries, &config, &mut rng);
        assert_eq!(batch.len(), 1);
        assert!(batch.examples[0].reward > 0.0);
    }

    #[test]
    fn sampling_respects_window_and_size() {
        let entries: Vec<_> = (0..100).map(|_| entry("attack", false)).collect();
        let config =
            TrainingConfig { batch_size: 10, recent_window: 20, ..TrainingConfig::default() };
        let mut rng = StdRng::seed_from_u64(1);
        let batch = TrainingBatch::sample(EntityId::new(), &entries, &config, &mut rng);
        assert_eq!(batch.len(), 10);
        assert!(batch.examples.iter().all(|e| e.reward < 0.0));
    }

    #[test]
    fn rewarded_action_gains_probability() {
        let mut batch = TrainingBatch::default();
        for _ in 0..20 {
            let example = TrainingExample::from_entry(&entry("attack", true)).expect("example");
            batch.examples.push(example);
        }
        let before = ModelParameters::uniform();
        let after = train_epoch(before.clone(), &batch, 0.5);
        let x = batch.examples[0].features;
        assert!(after.logit(Action::Attack, &x) > before.logit(Action::Attack, &x));
        assert!(after.weights.iter().flatten().all(|w| w.abs() <= WEIGHT_LIMIT));
    }

    #[test]
    fn disabled_worker_does_not_start() {
        let config = TrainingConfig { enabled: false, ..TrainingConfig::default() };
        let err = TrainingWorker::start(&config, Arc::new(LineageCounters::new()))
            .expect_err("disabled");
        assert!(matches!(err, LineageError::TrainingUnavailable(_)));
    }

    #[test]
    fn worker_publishes_new_version() {
        let counters = Arc::new(LineageCounters::new());
        let worker = TrainingWorker::start(&TrainingConfig::default(), Arc::clone(&counters))
            .expect("start");
        let handle = worker.handle();
        let entries: Vec<_> = (0..8).map(|_| entry("attack", true)).collect();
        let mut rng = StdRng::seed_from_u64(2);
        let batch =
            TrainingBatch::sample(EntityId::new(), &entries, &TrainingConfig::default(), &mut rng);
        assert!(worker.submit(batch));

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while counters.snapshot().training_epochs == 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(counters.snapshot().training_epochs >= 1);
        assert!(handle.version() >= 1);
        worker.shutdown();
    }
}
