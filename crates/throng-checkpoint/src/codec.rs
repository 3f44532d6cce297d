//! Binary encode/decode for the checkpoint format.
//!
//! Generic over `Write`/`Read` so tests can use `Vec<u8>` and `&[u8]`
//! while the store uses buffered files.

use std::io::{Read, Write};

use throng_core::{ModelConfig, OUTPUT_SIZE};
use throng_model::{Params, PARAM_NAMES};

use crate::error::CheckpointError;
use crate::hash::weights_hash;
use crate::types::{Checkpoint, CheckpointMeta};
use crate::{FORMAT_VERSION, MAGIC};

// ── Primitive writers ───────────────────────────────────────────

fn write_u8(w: &mut dyn Write, v: u8) -> Result<(), CheckpointError> {
    w.write_all(&[v])?;
    Ok(())
}

fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), CheckpointError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_u64_le(w: &mut dyn Write, v: u64) -> Result<(), CheckpointError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_f64_le(w: &mut dyn Write, v: f64) -> Result<(), CheckpointError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_usize_as_u32(w: &mut dyn Write, v: usize, what: &str) -> Result<(), CheckpointError> {
    let v = u32::try_from(v).map_err(|_| CheckpointError::Malformed {
        detail: format!("{what} = {v} does not fit in u32"),
    })?;
    write_u32_le(w, v)
}

fn write_str(w: &mut dyn Write, s: &str) -> Result<(), CheckpointError> {
    write_usize_as_u32(w, s.len(), "string length")?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

// ── Primitive readers ───────────────────────────────────────────

fn read_u8(r: &mut dyn Read) -> Result<u8, CheckpointError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u32_le(r: &mut dyn Read) -> Result<u32, CheckpointError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64_le(r: &mut dyn Read) -> Result<u64, CheckpointError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_f64_le(r: &mut dyn Read) -> Result<f64, CheckpointError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

fn read_str(r: &mut dyn Read, max_len: usize) -> Result<String, CheckpointError> {
    let len = read_u32_le(r)? as usize;
    if len > max_len {
        return Err(CheckpointError::Malformed {
            detail: format!("string of {len} bytes exceeds limit {max_len}"),
        });
    }
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| CheckpointError::Malformed {
        detail: format!("invalid UTF-8 string: {e}"),
    })
}

// Truncation surfaces as `UnexpectedEof`; report it as a malformed file.
fn truncated(e: CheckpointError) -> CheckpointError {
    match e {
        CheckpointError::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
            CheckpointError::Malformed {
                detail: "unexpected end of checkpoint".to_string(),
            }
        }
        other => other,
    }
}

// ── Checkpoint encode/decode ────────────────────────────────────

/// Write one checkpoint.
///
/// # Errors
///
/// [`CheckpointError::Io`] on write failure,
/// [`CheckpointError::Malformed`] if a size does not fit the format.
pub fn encode_checkpoint(w: &mut dyn Write, ckpt: &Checkpoint) -> Result<(), CheckpointError> {
    w.write_all(&MAGIC)?;
    write_u8(w, FORMAT_VERSION)?;

    write_u32_le(w, ckpt.meta.epoch)?;
    write_f64_le(w, ckpt.meta.train_loss)?;
    match ckpt.meta.validation_loss {
        Some(v) => {
            write_u8(w, 1)?;
            write_f64_le(w, v)?;
        }
        None => write_u8(w, 0)?,
    }

    let cfg = &ckpt.config;
    write_usize_as_u32(w, cfg.rnn_size, "rnn_size")?;
    write_usize_as_u32(w, cfg.embedding_size, "embedding_size")?;
    write_usize_as_u32(w, cfg.grid_size, "grid_size")?;
    write_usize_as_u32(w, cfg.max_num_peds, "max_num_peds")?;
    write_f64_le(w, cfg.neighborhood_size)?;
    write_f64_le(w, cfg.l2_param)?;
    write_usize_as_u32(w, OUTPUT_SIZE, "output_size")?;

    let tensors = ckpt.params.tensors();
    write_usize_as_u32(w, tensors.len(), "tensor count")?;
    for (name, tensor) in PARAM_NAMES.iter().zip(tensors) {
        write_str(w, name)?;
        write_usize_as_u32(w, tensor.len(), name)?;
        for &v in tensor {
            write_f64_le(w, v)?;
        }
    }

    write_u64_le(w, weights_hash(&ckpt.params))?;
    Ok(())
}

/// Read and validate one checkpoint.
///
/// Tensor lengths are checked against the decoded hyperparameters
/// before any buffer is allocated.
///
/// # Errors
///
/// [`CheckpointError::InvalidMagic`], [`CheckpointError::UnsupportedVersion`],
/// [`CheckpointError::Malformed`] for truncated or inconsistent data,
/// [`CheckpointError::Model`] for weights that do not fit the
/// configuration, [`CheckpointError::HashMismatch`] for corrupted values.
pub fn decode_checkpoint(r: &mut dyn Read) -> Result<Checkpoint, CheckpointError> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic).map_err(|e| truncated(e.into()))?;
    if magic != MAGIC {
        return Err(CheckpointError::InvalidMagic);
    }
    let version = read_u8(r).map_err(truncated)?;
    if version != FORMAT_VERSION {
        return Err(CheckpointError::UnsupportedVersion { found: version });
    }
    decode_body(r).map_err(truncated)
}

fn decode_body(r: &mut dyn Read) -> Result<Checkpoint, CheckpointError> {
    let epoch = read_u32_le(r)?;
    let train_loss = read_f64_le(r)?;
    let validation_loss = match read_u8(r)? {
        0 => None,
        1 => Some(read_f64_le(r)?),
        flag => {
            return Err(CheckpointError::Malformed {
                detail: format!("invalid validation flag {flag}"),
            })
        }
    };

    let config = ModelConfig {
        rnn_size: read_u32_le(r)? as usize,
        embedding_size: read_u32_le(r)? as usize,
        grid_size: read_u32_le(r)? as usize,
        max_num_peds: read_u32_le(r)? as usize,
        neighborhood_size: read_f64_le(r)?,
        l2_param: read_f64_le(r)?,
    };
    let output_size = read_u32_le(r)? as usize;
    if output_size != OUTPUT_SIZE {
        return Err(CheckpointError::Malformed {
            detail: format!("output_size {output_size}, expected {OUTPUT_SIZE}"),
        });
    }
    config
        .validate()
        .map_err(throng_model::ModelError::from)?;

    let count = read_u32_le(r)? as usize;
    if count != PARAM_NAMES.len() {
        return Err(throng_model::ModelError::TensorCount {
            expected: PARAM_NAMES.len(),
            found: count,
        }
        .into());
    }

    let lengths = Params::lengths(&config);
    let mut tensors = Vec::with_capacity(count);
    for (&name, expected) in PARAM_NAMES.iter().zip(lengths) {
        let found_name = read_str(r, 64)?;
        if found_name != name {
            return Err(CheckpointError::Malformed {
                detail: format!("expected tensor '{name}', found '{found_name}'"),
            });
        }
        let len = read_u32_le(r)? as usize;
        if len != expected {
            return Err(throng_model::ModelError::ParamLength {
                name,
                expected,
                found: len,
            }
            .into());
        }
        // Grow as values arrive so a corrupt header cannot force a huge allocation.
        let mut values = Vec::with_capacity(len.min(1 << 16));
        for _ in 0..len {
            values.push(read_f64_le(r)?);
        }
        tensors.push(values);
    }
    let params = Params::from_tensors(&config, tensors)?;

    let recorded = read_u64_le(r)?;
    let computed = weights_hash(&params);
    if recorded != computed {
        return Err(CheckpointError::HashMismatch { recorded, computed });
    }

    Ok(Checkpoint {
        meta: CheckpointMeta {
            epoch,
            train_loss,
            validation_loss,
        },
        config,
        params,
    })
}
