//! FNV-1a over weight bits.
//!
//! Not cryptographic; only detects accidental corruption.

use throng_model::Params;

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x00000100000001B3;

#[inline]
fn fnv1a_u64(mut hash: u64, v: u64) -> u64 {
    for &b in &v.to_le_bytes() {
        hash = (hash ^ b as u64).wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Hash every weight, folding in tensor index and length at each
/// boundary so moving values between tensors changes the hash.
pub fn weights_hash(params: &Params) -> u64 {
    let mut hash = FNV_OFFSET;
    for (idx, tensor) in params.tensors().iter().enumerate() {
        hash = fnv1a_u64(hash, idx as u64);
        hash = fnv1a_u64(hash, tensor.len() as u64);
        for &v in tensor.iter() {
            hash = fnv1a_u64(hash, v.to_bits());
        }
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use throng_test_utils::fixtures::tiny_config;

    #[test]
    fn equal_weights_equal_hash() {
        let a = Params::init(&tiny_config(), 3);
        let b = a.clone();
        assert_eq!(weights_hash(&a), weights_hash(&b));
    }

    #[test]
    fn single_bit_flip_changes_hash() {
        let a = Params::init(&tiny_config(), 3);
        let mut b = a.clone();
        b.lstm_w[7] = f64::from_bits(b.lstm_w[7].to_bits() ^ 1);
        assert_ne!(weights_hash(&a), weights_hash(&b));
    }

    #[test]
    fn values_moved_between_tensors_change_hash() {
        let mut a = Params::zeros_like(&tiny_config());
        let mut b = a.clone();
        a.coord_b[0] = 1.0;
        b.tensor_b[0] = 1.0;
        assert_ne!(weights_hash(&a), weights_hash(&b));
    }
}
