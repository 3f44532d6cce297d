//! Batch iteration over training and validation windows.

use std::path::Path;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use throng_core::{ConfigError, Sequence};
use tracing::info;

use crate::error::DataError;
use crate::parse::{read_observations, Layout};
use crate::windows::build_windows;

/// Parallel lists of input windows and their one-frame-shifted targets.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    /// `batch_size` sequences of `seq_length` frames.
    pub input: Vec<Sequence>,
    /// `input[k]` shifted forward by one frame.
    pub target: Vec<Sequence>,
}

impl Batch {
    /// Number of sequences.
    pub fn len(&self) -> usize {
        self.input.len()
    }

    /// Whether the batch holds no sequences.
    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    fn from_windows<'a>(windows: impl Iterator<Item = &'a Sequence>) -> Self {
        let (input, target) = windows.filter_map(Sequence::shifted_pair).unzip();
        Self { input, target }
    }
}

/// Source of training and validation batches.
pub trait DataLoader {
    /// Next training batch, or `None` once the epoch is exhausted.
    fn next_training_batch(&mut self) -> Option<Batch>;

    /// Next validation batch, or `None` once exhausted.
    fn next_validate_batch(&mut self) -> Option<Batch>;

    /// Restart iteration. Training order is reshuffled; validation
    /// order is always sequential.
    fn reset_batch_pointer(&mut self, validate: bool);

    /// Full training batches per epoch.
    fn num_training_batches(&self) -> usize;

    /// Full validation batches per pass.
    fn num_validate_batches(&self) -> usize;
}

/// Loader settings.
#[derive(Clone, Debug, PartialEq)]
pub struct LoaderConfig {
    /// Frames per input sequence; windows hold one more.
    pub seq_length: usize,
    /// Sequences per batch.
    pub batch_size: usize,
    /// Slot capacity of every frame.
    pub max_num_peds: usize,
    /// Share of each dataset's windows, taken from its end, held out for
    /// validation. Default: 0.2.
    pub validation_fraction: f64,
    /// Seed for the training shuffle.
    pub seed: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            seq_length: 12,
            batch_size: 16,
            max_num_peds: 40,
            validation_fraction: 0.2,
            seed: 0,
        }
    }
}

impl LoaderConfig {
    /// Validate all settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.seq_length == 0 {
            return Err(ConfigError::ZeroSize { name: "seq_length" });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroSize { name: "batch_size" });
        }
        if self.max_num_peds == 0 {
            return Err(ConfigError::ZeroSize {
                name: "max_num_peds",
            });
        }
        if !(0.0..=1.0).contains(&self.validation_fraction) {
            return Err(ConfigError::InvalidValue {
                name: "validation_fraction",
                value: self.validation_fraction,
                expected: "in [0, 1]",
            });
        }
        Ok(())
    }
}

/// In-memory [`DataLoader`] over pre-cut windows.
#[derive(Debug)]
pub struct SequenceLoader {
    config: LoaderConfig,
    train: Vec<Sequence>,
    validate: Vec<Sequence>,
    order: Vec<usize>,
    train_pointer: usize,
    validate_pointer: usize,
    rng: ChaCha8Rng,
}

impl SequenceLoader {
    /// Split each dataset's windows and build a loader.
    ///
    /// Every window must hold `seq_length + 1` frames.
    ///
    /// # Errors
    ///
    /// [`DataError::Config`] for invalid settings,
    /// [`DataError::TooFewSequences`] if no full training batch exists
    /// while some training windows were requested.
    pub fn new(datasets: Vec<Vec<Sequence>>, config: LoaderConfig) -> Result<Self, DataError> {
        config.validate()?;
        let mut train = Vec::new();
        let mut validate = Vec::new();
        for windows in datasets {
            let held_out = (windows.len() as f64 * config.validation_fraction).ceil() as usize;
            let split = windows.len() - held_out.min(windows.len());
            let mut windows = windows;
            validate.extend(windows.drain(split..));
            train.extend(windows);
        }

        if !train.is_empty() && train.len() < config.batch_size {
            return Err(DataError::TooFewSequences {
                available: train.len(),
                batch_size: config.batch_size,
            });
        }

        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let mut loader = Self {
            order: (0..train.len()).collect(),
            config,
            train,
            validate,
            train_pointer: 0,
            validate_pointer: 0,
            rng,
        };
        loader.reset_batch_pointer(false);
        Ok(loader)
    }

    /// Read, window, and split annotation files, one dataset per file.
    ///
    /// # Errors
    ///
    /// Any parse or windowing error from the individual files.
    pub fn from_files(
        paths: &[impl AsRef<Path>],
        layout: Layout,
        config: LoaderConfig,
    ) -> Result<Self, DataError> {
        let mut datasets = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let observations = read_observations(path, layout)?;
            let windows = build_windows(&observations, config.seq_length, config.max_num_peds)?;
            info!(
                path = %path.display(),
                observations = observations.len(),
                windows = windows.len(),
                "loaded dataset"
            );
            datasets.push(windows);
        }
        Self::new(datasets, config)
    }

    /// Loader settings.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Training windows, in load order.
    pub fn training_windows(&self) -> &[Sequence] {
        &self.train
    }

    /// Validation windows, in load order.
    pub fn validation_windows(&self) -> &[Sequence] {
        &self.validate
    }
}

impl DataLoader for SequenceLoader {
    fn next_training_batch(&mut self) -> Option<Batch> {
        let size = self.config.batch_size;
        if self.train_pointer + size > self.order.len() {
            return None;
        }
        let idx = &self.order[self.train_pointer..self.train_pointer + size];
        self.train_pointer += size;
        Some(Batch::from_windows(idx.iter().map(|&k| &self.train[k])))
    }

    fn next_validate_batch(&mut self) -> Option<Batch> {
        let size = self.config.batch_size;
        if self.validate_pointer + size > self.validate.len() {
            return None;
        }
        let window = &self.validate[self.validate_pointer..self.validate_pointer + size];
        self.validate_pointer += size;
        Some(Batch::from_windows(window.iter()))
    }

    fn reset_batch_pointer(&mut self, validate: bool) {
        if validate {
            self.validate_pointer = 0;
        } else {
            self.train_pointer = 0;
            self.order.shuffle(&mut self.rng);
        }
    }

    fn num_training_batches(&self) -> usize {
        self.train.len() / self.config.batch_size
    }

    fn num_validate_batches(&self) -> usize {
        self.validate.len() / self.config.batch_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use throng_test_utils::fixtures::straight_line_scene;

    fn windows(n: usize) -> Vec<Sequence> {
        (0..n).map(|k| straight_line_scene(k % 3 + 1, 4, 3)).collect()
    }

    fn config(batch_size: usize, validation_fraction: f64) -> LoaderConfig {
        LoaderConfig {
            seq_length: 3,
            batch_size,
            max_num_peds: 3,
            validation_fraction,
            seed: 5,
        }
    }

    #[test]
    fn split_takes_tail_of_each_dataset() {
        let loader = SequenceLoader::new(vec![windows(10), windows(5)], config(2, 0.2)).unwrap();
        assert_eq!(loader.validation_windows().len(), 2 + 1);
        assert_eq!(loader.training_windows().len(), 8 + 4);
        assert_eq!(loader.num_training_batches(), 6);
        assert_eq!(loader.num_validate_batches(), 1);
    }

    #[test]
    fn batches_are_shifted_pairs() {
        let mut loader = SequenceLoader::new(vec![windows(4)], config(2, 0.0)).unwrap();
        let batch = loader.next_training_batch().unwrap();
        assert_eq!(batch.len(), 2);
        for (input, target) in batch.input.iter().zip(&batch.target) {
            assert_eq!(input.len(), 3);
            assert_eq!(input.frames()[1], target.frames()[0]);
        }
    }

    #[test]
    fn epoch_exhausts_then_resets() {
        let mut loader = SequenceLoader::new(vec![windows(5)], config(2, 0.0)).unwrap();
        assert!(loader.next_training_batch().is_some());
        assert!(loader.next_training_batch().is_some());
        // Partial final batch is dropped.
        assert!(loader.next_training_batch().is_none());
        loader.reset_batch_pointer(false);
        assert!(loader.next_training_batch().is_some());
    }

    #[test]
    fn shuffle_is_seeded() {
        let collect = || {
            let mut loader = SequenceLoader::new(vec![windows(12)], config(1, 0.0)).unwrap();
            let mut seen = Vec::new();
            while let Some(batch) = loader.next_training_batch() {
                seen.push(batch.input[0].frames()[0].active_count());
            }
            seen
        };
        assert_eq!(collect(), collect());
    }

    #[test]
    fn validation_is_sequential() {
        let data = windows(6);
        let mut loader = SequenceLoader::new(vec![data.clone()], config(1, 1.0)).unwrap();
        assert_eq!(loader.num_training_batches(), 0);
        for expected in &data {
            let batch = loader.next_validate_batch().unwrap();
            let (input, _) = expected.shifted_pair().unwrap();
            assert_eq!(batch.input[0], input);
        }
        assert!(loader.next_validate_batch().is_none());
        loader.reset_batch_pointer(true);
        assert!(loader.next_validate_batch().is_some());
    }

    #[test]
    fn undersized_training_set_rejected() {
        assert!(matches!(
            SequenceLoader::new(vec![windows(3)], config(4, 0.0)),
            Err(DataError::TooFewSequences {
                available: 3,
                batch_size: 4
            })
        ));
        assert!(matches!(
            SequenceLoader::new(vec![windows(3)], config(0, 0.0)),
            Err(DataError::Config(_))
        ));
    }
}
