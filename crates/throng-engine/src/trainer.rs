//! Epoch loop, batch updates, and validation.
//!
//! One update per batch: every sequence's data-loss gradient is
//! computed by backpropagation through time on a worker thread, the
//! gradients are summed in batch order and averaged over the sequences
//! that had at least one valid pair, the L2 gradient is added once, the
//! result is clipped by global norm, and RMSProp applies it. A batch
//! in which no sequence has a valid pair leaves the weights untouched.

use crossbeam_channel::Receiver;
use throng_checkpoint::{Checkpoint, CheckpointMeta, CheckpointStore};
use throng_core::{SceneDimensions, Sequence};
use throng_data::{Batch, DataLoader};
use throng_model::{clip_by_global_norm, ModelError, Params, RmsProp, SequenceLoss, SocialLstm};
use throng_pool::{sequence_masks, PoolingGrid};
use tracing::{debug, info, warn};

use crate::config::TrainConfig;
use crate::error::TrainError;

/// Outcome of one batch update.
#[derive(Clone, Debug, PartialEq)]
pub struct StepReport {
    /// Mean total loss (data + L2) over the batch's sequences.
    pub loss: f64,
    /// Sequences that contributed a gradient.
    pub contributing: usize,
    /// Global gradient norm before clipping, or `None` if the update
    /// was skipped.
    pub grad_norm: Option<f64>,
}

impl StepReport {
    /// Whether the weights changed.
    pub fn updated(&self) -> bool {
        self.grad_norm.is_some()
    }
}

/// Summary of one epoch.
#[derive(Clone, Debug, PartialEq)]
pub struct EpochReport {
    /// Zero-based epoch.
    pub epoch: u32,
    /// Learning rate used.
    pub learning_rate: f64,
    /// Mean batch loss.
    pub train_loss: f64,
    /// Mean validation loss, if there were validation batches.
    pub validation_loss: Option<f64>,
    /// Training batches processed.
    pub batches: usize,
    /// Batches whose update was skipped for lack of valid pairs.
    pub skipped_updates: usize,
}

/// Result of [`Trainer::fit`].
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingSummary {
    /// Per-epoch reports, in order.
    pub epochs: Vec<EpochReport>,
    /// Epoch with the lowest validation loss, if validation ran.
    pub best_epoch: Option<u32>,
    /// That epoch's validation loss.
    pub best_validation_loss: Option<f64>,
}

/// Trains a [`SocialLstm`] against a [`DataLoader`].
#[derive(Debug)]
pub struct Trainer {
    config: TrainConfig,
    model: SocialLstm,
    optimizer: RmsProp,
    grid: PoolingGrid,
    store: Option<CheckpointStore>,
}

impl Trainer {
    /// A trainer for `model`.
    ///
    /// # Errors
    ///
    /// [`TrainError::Config`] if `config` or `dimensions` fails
    /// validation.
    pub fn new(
        model: SocialLstm,
        config: TrainConfig,
        dimensions: SceneDimensions,
    ) -> Result<Self, TrainError> {
        config.validate()?;
        dimensions.validate()?;
        let optimizer = RmsProp::new(model.config(), config.rms_decay, config.rms_epsilon);
        let grid = PoolingGrid::from_config(model.config(), dimensions);
        Ok(Self {
            config,
            model,
            optimizer,
            grid,
            store: None,
        })
    }

    /// Write checkpoints to `store` during [`fit`](Self::fit).
    pub fn with_store(mut self, store: CheckpointStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Training settings.
    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// The model being trained.
    pub fn model(&self) -> &SocialLstm {
        &self.model
    }

    /// Consume the trainer, returning the model.
    pub fn into_model(self) -> SocialLstm {
        self.model
    }

    /// Run every epoch.
    ///
    /// # Errors
    ///
    /// [`TrainError::NoTrainingBatches`] if the loader has no full
    /// batch, otherwise any model or checkpoint error.
    pub fn fit(&mut self, loader: &mut dyn DataLoader) -> Result<TrainingSummary, TrainError> {
        if loader.num_training_batches() == 0 {
            return Err(TrainError::NoTrainingBatches);
        }
        info!(
            epochs = self.config.epochs,
            batches = loader.num_training_batches(),
            validation_batches = loader.num_validate_batches(),
            params = self.model.params().num_params(),
            workers = self.config.resolved_worker_count(),
            "starting training"
        );

        let mut summary = TrainingSummary {
            epochs: Vec::with_capacity(self.config.epochs as usize),
            best_epoch: None,
            best_validation_loss: None,
        };
        for epoch in 0..self.config.epochs {
            let report = self.train_epoch(loader, epoch)?;
            if let Some(v) = report.validation_loss {
                if summary.best_validation_loss.is_none_or(|best| v < best) {
                    summary.best_validation_loss = Some(v);
                    summary.best_epoch = Some(epoch);
                }
            }
            info!(
                epoch,
                learning_rate = report.learning_rate,
                train_loss = report.train_loss,
                validation_loss = ?report.validation_loss,
                best_epoch = ?summary.best_epoch,
                "epoch complete"
            );
            self.maybe_save(&report)?;
            summary.epochs.push(report);
        }
        Ok(summary)
    }

    /// One pass over the training batches followed by validation.
    ///
    /// # Errors
    ///
    /// Any error from [`train_step`](Self::train_step) or
    /// [`validation_loss`](Self::validation_loss).
    pub fn train_epoch(
        &mut self,
        loader: &mut dyn DataLoader,
        epoch: u32,
    ) -> Result<EpochReport, TrainError> {
        let learning_rate = self.config.learning_rate_at(epoch);
        loader.reset_batch_pointer(false);

        let mut loss_sum = 0.0;
        let mut batches = 0usize;
        let mut skipped_updates = 0usize;
        while let Some(batch) = loader.next_training_batch() {
            let step = self.train_step(&batch, learning_rate)?;
            debug!(
                epoch,
                batch = batches,
                loss = step.loss,
                grad_norm = ?step.grad_norm,
                "batch"
            );
            if !step.updated() {
                skipped_updates += 1;
            }
            loss_sum += step.loss;
            batches += 1;
        }

        let validation_loss = self.validation_loss(loader)?;
        Ok(EpochReport {
            epoch,
            learning_rate,
            train_loss: if batches == 0 {
                0.0
            } else {
                loss_sum / batches as f64
            },
            validation_loss,
            batches,
            skipped_updates,
        })
    }

    /// Apply one update from `batch` at learning rate `lr`.
    ///
    /// # Errors
    ///
    /// [`TrainError::Model`] on a shape mismatch or non-finite loss,
    /// [`TrainError::WorkerPanicked`] if a gradient worker panicked.
    pub fn train_step(&mut self, batch: &Batch, lr: f64) -> Result<StepReport, TrainError> {
        let losses = self.batch_gradients(batch)?;
        let n = losses.len().max(1);

        let mut loss_sum = 0.0;
        let mut contributing = 0usize;
        let mut grad_sum: Option<Params> = None;
        for (index, loss) in losses.into_iter().enumerate() {
            loss_sum += loss.total();
            let Some(g) = loss.grad else {
                debug!(sequence = index, "no valid pairs in sequence");
                continue;
            };
            contributing += 1;
            match grad_sum.as_mut() {
                Some(sum) => sum.add_assign(&g),
                None => grad_sum = Some(g),
            }
        }
        let loss = loss_sum / n as f64;

        let Some(mut grad) = grad_sum else {
            warn!(sequences = batch.len(), "no valid pairs in batch, skipping update");
            return Ok(StepReport {
                loss,
                contributing,
                grad_norm: None,
            });
        };
        grad.scale(1.0 / contributing as f64);
        grad.add_l2_grad(self.model.params(), self.model.config().l2_param);
        let grad_norm = clip_by_global_norm(&mut grad, self.config.grad_clip);
        self.optimizer.step(self.model.params_mut(), &grad, lr);

        Ok(StepReport {
            loss,
            contributing,
            grad_norm: Some(grad_norm),
        })
    }

    /// Mean total loss over every validation sequence, or `None` if the
    /// loader has no validation batch. Forward only.
    ///
    /// # Errors
    ///
    /// [`TrainError::Model`] on a shape mismatch or non-finite loss.
    pub fn validation_loss(&self, loader: &mut dyn DataLoader) -> Result<Option<f64>, TrainError> {
        loader.reset_batch_pointer(true);
        let mut sum = 0.0;
        let mut count = 0usize;
        while let Some(batch) = loader.next_validate_batch() {
            for (input, target) in batch.input.iter().zip(&batch.target) {
                let masks = sequence_masks(input, &self.grid);
                sum += self.model.sequence_loss(input, target, &masks)?.total();
                count += 1;
            }
        }
        Ok((count > 0).then(|| sum / count as f64))
    }

    fn maybe_save(&self, report: &EpochReport) -> Result<(), TrainError> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let last = report.epoch + 1 == self.config.epochs;
        if !last && (report.epoch + 1) % self.config.save_every != 0 {
            return Ok(());
        }
        let meta = CheckpointMeta {
            epoch: report.epoch,
            train_loss: report.train_loss,
            validation_loss: report.validation_loss,
        };
        store.save(&Checkpoint::from_model(&self.model, meta))?;
        Ok(())
    }

    // ── Parallel gradients ──────────────────────────────────────

    fn sequence_gradient(&self, input: &Sequence, target: &Sequence) -> Result<SequenceLoss, ModelError> {
        let masks = sequence_masks(input, &self.grid);
        self.model.loss_and_grad(input, target, &masks)
    }

    /// Per-sequence losses and gradients in batch order.
    fn batch_gradients(&self, batch: &Batch) -> Result<Vec<SequenceLoss>, TrainError> {
        let n = batch.len();
        let workers = self.config.resolved_worker_count().min(n);
        if workers <= 1 {
            return batch
                .input
                .iter()
                .zip(&batch.target)
                .map(|(i, t)| self.sequence_gradient(i, t).map_err(TrainError::from))
                .collect();
        }

        let (task_tx, task_rx) = crossbeam_channel::bounded::<usize>(n);
        for k in 0..n {
            // Capacity `n` and a live receiver: never blocks or fails.
            let _ = task_tx.send(k);
        }
        drop(task_tx);

        let mut results: Vec<Option<Result<SequenceLoss, ModelError>>> =
            (0..n).map(|_| None).collect();
        let outcome = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    let task_rx = task_rx.clone();
                    scope.spawn(move || self.worker(batch, &task_rx))
                })
                .collect();
            let mut panicked = false;
            for handle in handles {
                match handle.join() {
                    Ok(done) => {
                        for (k, r) in done {
                            results[k] = Some(r);
                        }
                    }
                    Err(_) => panicked = true,
                }
            }
            panicked
        });
        if outcome {
            return Err(TrainError::WorkerPanicked);
        }

        results
            .into_iter()
            .map(|r| match r {
                Some(r) => r.map_err(TrainError::from),
                None => Err(TrainError::WorkerPanicked),
            })
            .collect()
    }

    fn worker(
        &self,
        batch: &Batch,
        tasks: &Receiver<usize>,
    ) -> Vec<(usize, Result<SequenceLoss, ModelError>)> {
        tasks
            .iter()
            .map(|k| (k, self.sequence_gradient(&batch.input[k], &batch.target[k])))
            .collect()
    }
}
