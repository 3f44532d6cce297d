//! One-file-per-epoch checkpoint directory.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::codec::{decode_checkpoint, encode_checkpoint};
use crate::error::CheckpointError;
use crate::types::Checkpoint;

const PREFIX: &str = "checkpoint-";
const EXTENSION: &str = "thg";

/// A directory of `checkpoint-<epoch>.thg` files.
#[derive(Clone, Debug)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    /// Store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the checkpoint for `epoch`.
    pub fn path_for(&self, epoch: u32) -> PathBuf {
        self.dir.join(format!("{PREFIX}{epoch}.{EXTENSION}"))
    }

    /// Write `ckpt` to its epoch's path, replacing any previous file.
    ///
    /// The file is written under a temporary name and renamed into
    /// place, so readers never observe a partial checkpoint.
    pub fn save(&self, ckpt: &Checkpoint) -> Result<PathBuf, CheckpointError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(ckpt.meta.epoch);
        let tmp = path.with_extension(format!("{EXTENSION}.tmp"));
        {
            let mut w = BufWriter::new(File::create(&tmp)?);
            encode_checkpoint(&mut w, ckpt)?;
            w.flush()?;
        }
        fs::rename(&tmp, &path)?;
        info!(
            epoch = ckpt.meta.epoch,
            train_loss = ckpt.meta.train_loss,
            path = %path.display(),
            "saved checkpoint"
        );
        Ok(path)
    }

    /// Epochs with a checkpoint on disk, ascending. A missing directory
    /// holds no epochs.
    pub fn epochs(&self) -> Result<Vec<u32>, CheckpointError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut epochs = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            if let Some(epoch) = name.to_str().and_then(parse_epoch) {
                epochs.push(epoch);
            }
        }
        epochs.sort_unstable();
        Ok(epochs)
    }

    /// Highest saved epoch, if any.
    pub fn latest_epoch(&self) -> Result<Option<u32>, CheckpointError> {
        Ok(self.epochs()?.last().copied())
    }

    /// Load the checkpoint for `epoch`, or the latest one for `None`.
    ///
    /// # Errors
    ///
    /// [`CheckpointError::NotFound`] if no matching file exists, otherwise
    /// any decode error.
    pub fn load(&self, epoch: Option<u32>) -> Result<Checkpoint, CheckpointError> {
        let resolved = match epoch {
            Some(e) => e,
            None => self.latest_epoch()?.ok_or_else(|| CheckpointError::NotFound {
                dir: self.dir.clone(),
                epoch: None,
            })?,
        };
        let path = self.path_for(resolved);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CheckpointError::NotFound {
                    dir: self.dir.clone(),
                    epoch: Some(resolved),
                })
            }
            Err(e) => return Err(e.into()),
        };
        let ckpt = decode_checkpoint(&mut BufReader::new(file))?;
        if ckpt.meta.epoch != resolved {
            return Err(CheckpointError::Malformed {
                detail: format!(
                    "{} records epoch {}",
                    path.display(),
                    ckpt.meta.epoch
                ),
            });
        }
        debug!(epoch = resolved, path = %path.display(), "loaded checkpoint");
        Ok(ckpt)
    }
}

fn parse_epoch(name: &str) -> Option<u32> {
    name.strip_prefix(PREFIX)?
        .strip_suffix(EXTENSION)?
        .strip_suffix('.')?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CheckpointMeta;
    use throng_model::Params;
    use throng_test_utils::fixtures::tiny_config;
    use throng_test_utils::scratch_dir;

    fn ckpt(epoch: u32, seed: u64) -> Checkpoint {
        Checkpoint {
            meta: CheckpointMeta {
                epoch,
                train_loss: 1.0 / (epoch as f64 + 1.0),
                validation_loss: None,
            },
            config: tiny_config(),
            params: Params::init(&tiny_config(), seed),
        }
    }

    #[test]
    fn file_names() {
        assert_eq!(parse_epoch("checkpoint-12.thg"), Some(12));
        assert_eq!(parse_epoch("checkpoint-12.thg.tmp"), None);
        assert_eq!(parse_epoch("checkpoint-.thg"), None);
        assert_eq!(parse_epoch("model-3.thg"), None);
        let store = CheckpointStore::new("/tmp/x");
        assert_eq!(store.path_for(4), Path::new("/tmp/x/checkpoint-4.thg"));
    }

    #[test]
    fn save_list_and_load() {
        let dir = scratch_dir("store-save-load");
        let store = CheckpointStore::new(&dir);
        assert_eq!(store.epochs().unwrap(), Vec::<u32>::new());
        assert!(matches!(
            store.load(None),
            Err(CheckpointError::NotFound { epoch: None, .. })
        ));

        for epoch in [10, 2, 0] {
            store.save(&ckpt(epoch, epoch as u64)).unwrap();
        }
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        assert_eq!(store.epochs().unwrap(), vec![0, 2, 10]);
        assert_eq!(store.latest_epoch().unwrap(), Some(10));
        assert_eq!(store.load(None).unwrap(), ckpt(10, 10));
        assert_eq!(store.load(Some(2)).unwrap(), ckpt(2, 2));
        assert!(matches!(
            store.load(Some(5)),
            Err(CheckpointError::NotFound { epoch: Some(5), .. })
        ));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn resave_replaces() {
        let dir = scratch_dir("store-resave");
        let store = CheckpointStore::new(&dir);
        store.save(&ckpt(1, 1)).unwrap();
        store.save(&ckpt(1, 99)).unwrap();
        assert_eq!(store.load(Some(1)).unwrap().params, ckpt(1, 99).params);
        assert_eq!(store.epochs().unwrap(), vec![1]);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn renamed_file_rejected() {
        let dir = scratch_dir("store-renamed");
        let store = CheckpointStore::new(&dir);
        let path = store.save(&ckpt(3, 3)).unwrap();
        fs::rename(&path, store.path_for(4)).unwrap();
        assert!(matches!(
            store.load(Some(4)),
            Err(CheckpointError::Malformed { .. })
        ));
        fs::remove_dir_all(&dir).unwrap();
    }
}
