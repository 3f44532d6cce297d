//! `throng` - train Social-LSTM trajectory models and sample from them.
//!
//! Usage:
//!   throng train --data eth.csv hotel.csv --epochs 50
//!   throng sample --data zara.csv --epoch 49 --obs-length 8 --pred-length 12
//!
//! Logging goes to stderr through `tracing`; set `RUST_LOG` to adjust
//! (default `info`).

mod args;

use anyhow::{Context, Result};
use clap::Parser;
use throng_checkpoint::CheckpointStore;
use throng_data::{DataLoader, LoaderConfig, SequenceLoader};
use throng_engine::{evaluate, Sampler, Trainer};
use throng_model::SocialLstm;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::args::{Cli, Command, SampleArgs, TrainArgs};

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Train(args) => train(&args),
        Command::Sample(args) => sample(&args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn train(args: &TrainArgs) -> Result<()> {
    let model_config = args.model_config();
    let train_config = args.train_config();
    let loader_config =
        train_config.loader_config(model_config.max_num_peds, args.data.validation_fraction);

    let mut loader =
        SequenceLoader::from_files(args.data.data.as_slice(), args.data.layout.into(), loader_config)
            .context("loading training data")?;
    let model = SocialLstm::new(model_config, train_config.seed).context("building model")?;
    let store = CheckpointStore::new(&args.data.checkpoint_dir);

    let mut trainer = Trainer::new(model, train_config, args.data.dimensions())
        .context("configuring trainer")?
        .with_store(store);
    let summary = trainer.fit(&mut loader).context("training")?;

    match (summary.best_epoch, summary.best_validation_loss) {
        (Some(epoch), Some(loss)) => println!("best epoch {epoch}, validation loss {loss:.4}"),
        _ => println!("training complete (no validation data)"),
    }
    Ok(())
}

fn sample(args: &SampleArgs) -> Result<()> {
    let sample_config = args.sample_config();
    let store = CheckpointStore::new(&args.data.checkpoint_dir);
    let sampler = Sampler::from_checkpoint(
        &store,
        args.epoch,
        sample_config.clone(),
        args.data.dimensions(),
    )
    .with_context(|| format!("loading checkpoint from {}", store.dir().display()))?;

    let loader_config = LoaderConfig {
        seq_length: sample_config.total_length(),
        batch_size: 1,
        max_num_peds: sampler.model().config().max_num_peds,
        validation_fraction: args.data.validation_fraction,
        seed: sample_config.seed,
    };
    let mut loader =
        SequenceLoader::from_files(args.data.data.as_slice(), args.data.layout.into(), loader_config)
            .context("loading sampling data")?;
    info!(trajectories = loader.num_validate_batches(), "sampling");

    let report = evaluate(&sampler, &mut loader).context("sampling")?;
    println!(
        "{} trajectories: mean displacement error {:.4}, final displacement error {:.4}",
        report.trajectories.len(),
        report.mean_displacement_error,
        report.final_displacement_error
    );
    Ok(())
}
