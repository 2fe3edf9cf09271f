//! Hybrid RLE / bit-packed encoding, used for repetition and definition
//! levels and for dictionary indices.
//!
//! The encoded stream is a sequence of runs:
//!
//! ```text
//! rle-run     := varint(count << 1) <value padded to ceil(bit_width / 8) bytes>
//! literal-run := varint((groups << 1) | 1) <groups * 8 values bit-packed>
//! ```
//!
//! Repeated runs shorter than 8 values are folded into literal groups.

use crate::util::bit_util::ceil;

/// Maximum number of 8-value groups in one literal run, chosen so the run
/// header always fits in a single varint byte.
const MAX_GROUPS_PER_LITERAL_RUN: usize = 63;

/// Hybrid RLE/bit-pack encoder for unsigned values of a fixed bit width.
pub struct RleEncoder {
    bit_width: u8,
    buffer: Vec<u8>,
    /// Values awaiting assignment to a run, at most one group.
    buffered_values: [u64; 8],
    num_buffered_values: usize,
    current_value: u64,
    repeat_count: usize,
    /// Groups written to the currently open literal run.
    literal_group_count: usize,
    /// Buffer position of the open literal run's header byte.
    literal_header_pos: Option<usize>,
}

impl RleEncoder {
    pub fn new(bit_width: u8, capacity: usize) -> Self {
        Self::new_from_buf(bit_width, Vec::with_capacity(capacity))
    }

    /// Creates an encoder appending to an existing buffer.
    pub fn new_from_buf(bit_width: u8, buffer: Vec<u8>) -> Self {
        assert!(bit_width <= 64, "bit width out of range: {bit_width}");
        Self {
            bit_width,
            buffer,
            buffered_values: [0; 8],
            num_buffered_values: 0,
            current_value: 0,
            repeat_count: 0,
            literal_group_count: 0,
            literal_header_pos: None,
        }
    }

    /// Conservative upper bound for the encoded size of `num_values` values.
    pub fn max_buffer_size(bit_width: u8, num_values: usize) -> usize {
        let groups = ceil(num_values, 8);
        let packed = groups * bit_width as usize;
        let headers = ceil(groups, MAX_GROUPS_PER_LITERAL_RUN) + 1;
        packed + headers + 8
    }

    /// Appends one value. `value` must fit in `bit_width` bits.
    pub fn put(&mut self, value: u64) {
        if self.repeat_count > 0 && value == self.current_value {
            self.repeat_count += 1;
            if self.repeat_count > 8 {
                // continuation of an established repeated run, nothing to buffer
                return;
            }
        } else {
            if self.repeat_count >= 8 {
                self.write_rle_run();
            }
            self.repeat_count = 1;
            self.current_value = value;
        }

        self.buffered_values[self.num_buffered_values] = value;
        self.num_buffered_values += 1;
        if self.num_buffered_values == 8 {
            self.flush_buffered_values();
        }
    }

    /// Finishes any open runs. The encoder can keep accepting values.
    pub fn flush(&mut self) {
        if self.repeat_count >= 8 {
            self.write_rle_run();
        } else if self.num_buffered_values > 0 {
            for i in self.num_buffered_values..8 {
                self.buffered_values[i] = 0;
            }
            self.num_buffered_values = 8;
            self.flush_buffered_values();
            self.end_literal_run();
        } else {
            self.end_literal_run();
        }
    }

    /// Flushes and consumes the encoder, returning the encoded bytes.
    pub fn consume(mut self) -> Vec<u8> {
        self.flush();
        self.buffer
    }

    fn flush_buffered_values(&mut self) {
        if self.repeat_count >= 8 {
            // the whole group belongs to the repeated run being accumulated
            self.num_buffered_values = 0;
            return;
        }
        self.append_literal_group();
        self.repeat_count = 0;
        self.num_buffered_values = 0;
    }

    fn append_literal_group(&mut self) {
        if self.literal_group_count >= MAX_GROUPS_PER_LITERAL_RUN {
            self.end_literal_run();
        }
        if self.literal_header_pos.is_none() {
            self.literal_header_pos = Some(self.buffer.len());
            self.buffer.push(0);
        }
        // pack 8 values LSB first; one group occupies exactly bit_width bytes
        let bw = self.bit_width as usize;
        let start = self.buffer.len();
        self.buffer.resize(start + bw, 0);
        let mut bit_pos = 0usize;
        for v in &self.buffered_values {
            for k in 0..bw {
                if (v >> k) & 1 == 1 {
                    let b = bit_pos + k;
                    self.buffer[start + b / 8] |= 1 << (b % 8);
                }
            }
            bit_pos += bw;
        }
        self.literal_group_count += 1;
    }

    fn end_literal_run(&mut self) {
        if let Some(pos) = self.literal_header_pos.take() {
            self.buffer[pos] = ((self.literal_group_count as u8) << 1) | 1;
            self.literal_group_count = 0;
        }
    }

    fn write_rle_run(&mut self) {
        self.end_literal_run();
        let mut header = (self.repeat_count as u64) << 1;
        while header > 0x7f {
            self.buffer.push(header as u8 | 0x80);
            header >>= 7;
        }
        self.buffer.push(header as u8);
        let value_bytes = ceil(self.bit_width as usize, 8);
        self.buffer
            .extend_from_slice(&self.current_value.to_le_bytes()[..value_bytes]);
        self.repeat_count = 0;
        self.num_buffered_values = 0;
    }
}

/// Decoder for the hybrid encoding. Used to read levels and dictionary
/// indices back out of written pages.
pub struct RleDecoder<'a> {
    bit_width: u8,
    data: &'a [u8],
    /// Remaining values in the current RLE run.
    rle_left: u64,
    rle_value: u64,
    /// Remaining values in the current literal run.
    literal_left: u64,
    /// Bit position into `data` for literal unpacking.
    literal_bit_pos: usize,
}

impl<'a> RleDecoder<'a> {
    pub fn new(bit_width: u8, data: &'a [u8]) -> Self {
        Self { bit_width, data, rle_left: 0, rle_value: 0, literal_left: 0, literal_bit_pos: 0 }
    }

    /// Reads up to `batch.len()` values, returning how many were decoded.
    pub fn get_batch(&mut self, batch: &mut [u64]) -> usize {
        let mut filled = 0;
        while filled < batch.len() {
            if self.rle_left > 0 {
                batch[filled] = self.rle_value;
                self.rle_left -= 1;
                filled += 1;
            } else if self.literal_left > 0 {
                batch[filled] = self.unpack_next();
                self.literal_left -= 1;
                filled += 1;
            } else if !self.next_run() {
                break;
            }
        }
        filled
    }

    fn next_run(&mut self) -> bool {
        if self.data.is_empty() {
            return false;
        }
        let mut header = 0u64;
        let mut shift = 0;
        loop {
            let Some((&byte, rest)) = self.data.split_first() else {
                return false;
            };
            self.data = rest;
            header |= ((byte & 0x7f) as u64) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
        }
        if header & 1 == 0 {
            // rle run
            let value_bytes = ceil(self.bit_width as usize, 8);
            if self.data.len() < value_bytes {
                return false;
            }
            let mut v = [0u8; 8];
            v[..value_bytes].copy_from_slice(&self.data[..value_bytes]);
            self.data = &self.data[value_bytes..];
            self.rle_value = u64::from_le_bytes(v);
            self.rle_left = header >> 1;
        } else {
            let groups = header >> 1;
            self.literal_left = groups * 8;
            self.literal_bit_pos = 0;
        }
        true
    }

    fn unpack_next(&mut self) -> u64 {
        let bw = self.bit_width as usize;
        let mut v = 0u64;
        for i in 0..bw {
            let bit = self.literal_bit_pos + i;
            let byte = self.data[bit / 8];
            v |= (((byte >> (bit % 8)) & 1) as u64) << i;
        }
        self.literal_bit_pos += bw;
        if self.literal_left == 1 {
            // release the fully consumed literal payload
            let consumed = ceil(self.literal_bit_pos, 8);
            self.data = &self.data[consumed..];
        }
        v
    }
}
