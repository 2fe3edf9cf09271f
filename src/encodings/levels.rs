//! Encoder for repetition and definition levels.

use std::mem;

use crate::encodings::rle::RleEncoder;
use crate::util::bit_util::num_required_bits;

/// Computes the maximum buffer size for encoding `num_buffered_values`
/// levels bounded by `max_level`.
#[inline]
pub fn max_buffer_size(max_level: i16, num_buffered_values: usize) -> usize {
    let bit_width = num_required_bits(max_level as u64);
    RleEncoder::max_buffer_size(bit_width, num_buffered_values)
}

/// Encoder for definition/repetition levels. Levels are always RLE encoded;
/// v1 data pages prefix the payload with its little-endian length, v2 pages
/// store the bare payload.
pub enum LevelEncoder {
    Rle(RleEncoder),
    RleV2(RleEncoder),
}

impl LevelEncoder {
    /// Level encoder for data page v1: RLE with a 4-byte length header.
    pub fn v1(max_level: i16, capacity: usize) -> Self {
        let capacity_bytes = max_buffer_size(max_level, capacity);
        let mut buffer = Vec::with_capacity(capacity_bytes + 4);
        // reserve space for the length header
        buffer.extend_from_slice(&[0; 4]);
        let bit_width = num_required_bits(max_level as u64);
        LevelEncoder::Rle(RleEncoder::new_from_buf(bit_width, buffer))
    }

    /// Level encoder for data page v2: bare RLE payload.
    pub fn v2(max_level: i16, capacity: usize) -> Self {
        let capacity_bytes = max_buffer_size(max_level, capacity);
        let buffer = Vec::with_capacity(capacity_bytes);
        let bit_width = num_required_bits(max_level as u64);
        LevelEncoder::RleV2(RleEncoder::new_from_buf(bit_width, buffer))
    }

    /// Encodes the level slice. Must be called at most once per encoder.
    pub fn put(&mut self, levels: &[i16]) {
        match self {
            LevelEncoder::Rle(encoder) | LevelEncoder::RleV2(encoder) => {
                for &level in levels {
                    encoder.put(level as u64);
                }
            }
        }
    }

    /// Finalizes the encoder and returns the encoded buffer.
    pub fn consume(self) -> Vec<u8> {
        match self {
            LevelEncoder::Rle(encoder) => {
                let mut encoded_data = encoder.consume();
                let encoded_len = encoded_data.len() - mem::size_of::<i32>();
                encoded_data[0..4].copy_from_slice(&(encoded_len as i32).to_le_bytes());
                encoded_data
            }
            LevelEncoder::RleV2(encoder) => encoder.consume(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encodings::rle::RleDecoder;
    use crate::util::bit_util::num_required_bits;

    fn check(max_level: i16, levels: &[i16]) {
        let mut encoder = LevelEncoder::v1(max_level, levels.len());
        encoder.put(levels);
        let buf = encoder.consume();

        let rle_len = i32::from_le_bytes(buf[0..4].try_into().unwrap()) as usize;
        assert_eq!(rle_len, buf.len() - 4);

        let bit_width = num_required_bits(max_level as u64);
        let mut decoder = RleDecoder::new(bit_width, &buf[4..]);
        let mut out = vec![0u64; levels.len()];
        assert_eq!(decoder.get_batch(&mut out), levels.len());
        let decoded: Vec<i16> = out.iter().map(|&v| v as i16).collect();
        assert_eq!(decoded, levels);
    }

    #[test]
    fn test_v1_length_prefix_and_payload() {
        check(1, &[0, 1, 1, 0, 1]);
        check(1, &[1; 100]);
        check(3, &[0, 1, 2, 3, 3, 3, 2, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_v2_has_no_prefix() {
        let levels = [0i16, 1, 1, 1, 0];
        let mut v1 = LevelEncoder::v1(1, levels.len());
        v1.put(&levels);
        let v1_buf = v1.consume();

        let mut v2 = LevelEncoder::v2(1, levels.len());
        v2.put(&levels);
        let v2_buf = v2.consume();

        assert_eq!(&v1_buf[4..], &v2_buf[..]);
    }
}
