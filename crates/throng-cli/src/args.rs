//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use throng_core::{ModelConfig, SceneDimensions};
use throng_data::Layout;
use throng_engine::{SampleConfig, SampleMode, TrainConfig};

/// Social-LSTM pedestrian trajectory prediction
#[derive(Parser, Debug)]
#[command(name = "throng")]
#[command(about = "Train and sample Social-LSTM trajectory models")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Train a model and write per-epoch checkpoints
    Train(TrainArgs),
    /// Predict held-out trajectories from a checkpoint and report errors
    Sample(SampleArgs),
}

/// Annotation file layout.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LayoutArg {
    /// Detect from the file shape
    #[default]
    Auto,
    /// One `frame,ped,x,y` record per line
    Rows,
    /// Four lines: frames, pedestrians, y, x
    Transposed,
}

impl From<LayoutArg> for Layout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Auto => Layout::Auto,
            LayoutArg::Rows => Layout::Rows,
            LayoutArg::Transposed => Layout::Transposed,
        }
    }
}

/// Dataset selection shared by both subcommands.
#[derive(Args, Debug)]
pub struct DataArgs {
    /// Annotation files, one dataset each
    #[arg(short, long, required = true, num_args = 1..)]
    pub data: Vec<PathBuf>,

    /// Column layout of the annotation files
    #[arg(long, value_enum, default_value_t = LayoutArg::Auto)]
    pub layout: LayoutArg,

    /// Share of each dataset's windows held out for validation
    #[arg(long, default_value = "0.2")]
    pub validation_fraction: f64,

    /// Scene width, in neighborhood units
    #[arg(long, default_value = "640")]
    pub width: f64,

    /// Scene height, in neighborhood units
    #[arg(long, default_value = "480")]
    pub height: f64,

    /// Checkpoint directory
    #[arg(long, default_value = "save")]
    pub checkpoint_dir: PathBuf,
}

impl DataArgs {
    pub fn dimensions(&self) -> SceneDimensions {
        SceneDimensions::new(self.width, self.height)
    }
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// LSTM hidden state width
    #[arg(long, default_value = "128")]
    pub rnn_size: usize,

    /// Width of each input embedding
    #[arg(long, default_value = "64")]
    pub embedding_size: usize,

    /// Pooling grid cells per axis
    #[arg(long, default_value = "4")]
    pub grid_size: usize,

    /// Pedestrian slots per frame
    #[arg(long, default_value = "40")]
    pub max_num_peds: usize,

    /// Side of the pooling window, in scene units
    #[arg(long, default_value = "32")]
    pub neighborhood_size: f64,

    /// L2 regularization coefficient
    #[arg(long, default_value = "0.0005")]
    pub l2_param: f64,

    /// Number of training epochs
    #[arg(short, long, default_value = "50")]
    pub epochs: u32,

    /// Sequences per batch
    #[arg(short, long, default_value = "16")]
    pub batch_size: usize,

    /// Frames per training sequence
    #[arg(long, default_value = "12")]
    pub seq_length: usize,

    /// Initial learning rate
    #[arg(long, default_value = "0.005")]
    pub learning_rate: f64,

    /// Per-epoch learning rate decay
    #[arg(long, default_value = "0.95")]
    pub decay_rate: f64,

    /// Global gradient norm ceiling
    #[arg(long, default_value = "10.0")]
    pub grad_clip: f64,

    /// Save a checkpoint every N epochs (the last epoch is always saved)
    #[arg(long, default_value = "1")]
    pub save_every: u32,

    /// Seed for initialisation and shuffling
    #[arg(long, default_value = "0")]
    pub seed: u64,

    /// Gradient worker threads (default: available parallelism)
    #[arg(long)]
    pub workers: Option<usize>,
}

impl TrainArgs {
    pub fn model_config(&self) -> ModelConfig {
        ModelConfig {
            rnn_size: self.rnn_size,
            embedding_size: self.embedding_size,
            grid_size: self.grid_size,
            max_num_peds: self.max_num_peds,
            neighborhood_size: self.neighborhood_size,
            l2_param: self.l2_param,
        }
    }

    pub fn train_config(&self) -> TrainConfig {
        TrainConfig {
            epochs: self.epochs,
            batch_size: self.batch_size,
            seq_length: self.seq_length,
            learning_rate: self.learning_rate,
            decay_rate: self.decay_rate,
            grad_clip: self.grad_clip,
            save_every: self.save_every,
            seed: self.seed,
            worker_count: self.workers,
            ..TrainConfig::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct SampleArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Epoch to load (default: latest)
    #[arg(long)]
    pub epoch: Option<u32>,

    /// Observed frames per trajectory
    #[arg(long, default_value = "6")]
    pub obs_length: usize,

    /// Predicted frames per trajectory
    #[arg(long, default_value = "6")]
    pub pred_length: usize,

    /// Seed for stochastic draws
    #[arg(long, default_value = "1")]
    pub seed: u64,

    /// Predict distribution means instead of drawing
    #[arg(long)]
    pub mean: bool,
}

impl SampleArgs {
    pub fn sample_config(&self) -> SampleConfig {
        SampleConfig {
            obs_length: self.obs_length,
            pred_length: self.pred_length,
            seed: self.seed,
            mode: if self.mean {
                SampleMode::Mean
            } else {
                SampleMode::Stochastic
            },
        }
    }
}
