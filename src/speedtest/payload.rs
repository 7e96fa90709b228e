use bytes::{Bytes, BytesMut};
use rand::{Rng, SeedableRng};

/// Size of the random block repeated to fill an upload payload.
const BLOCK_SIZE: usize = 64 * 1024;

/// Builds an opaque upload body of exactly `size_bytes`.
///
/// Only the length and transfer timing matter, so a single random block is
/// tiled rather than drawing fresh entropy for every byte.
pub fn generate(size_bytes: usize) -> Bytes {
    let mut rng = rand::rngs::StdRng::from_entropy();
    let mut block = vec![0u8; BLOCK_SIZE.min(size_bytes)];
    rng.fill(block.as_mut_slice());

    let mut payload = BytesMut::with_capacity(size_bytes);
    while payload.len() < size_bytes {
        let take = (size_bytes - payload.len()).min(block.len());
        payload.extend_from_slice(&block[..take]);
    }
    payload.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_length() {
        for size in [0, 1, BLOCK_SIZE - 1, BLOCK_SIZE, BLOCK_SIZE * 3 + 17] {
            assert_eq!(generate(size).len(), size);
        }
    }

    #[test]
    fn tail_repeats_block() {
        let payload = generate(BLOCK_SIZE + 10);
        assert_eq!(&payload[BLOCK_SIZE..], &payload[..10]);
    }
}
