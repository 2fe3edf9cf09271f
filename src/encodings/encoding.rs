//! Value encoders for data and dictionary pages.

use std::collections::HashMap;

use bytes::Bytes;

use crate::basic::{Encoding, Type};
use crate::encodings::rle::RleEncoder;
use crate::errors::Result;
use crate::record::value::Value;
use crate::util::bit_util::{ceil, num_required_bits, BitWriter};

/// An encoder of dynamic values into one page's worth of encoded bytes.
///
/// `put` buffers values, `flush_buffer` drains the encoded form for the
/// current page and resets the encoder for the next one.
pub trait ValueEncoder: Send {
    fn put(&mut self, values: &[Value]) -> Result<()>;

    /// The encoding id recorded in the page header.
    fn encoding(&self) -> Encoding;

    /// Estimated encoded size of the values buffered so far.
    fn estimated_data_encoded_size(&self) -> usize;

    fn flush_buffer(&mut self) -> Result<Bytes>;
}

/// Creates an encoder for the given encoding and physical type.
pub fn get_encoder(
    encoding: Encoding,
    physical_type: Type,
    type_length: i32,
) -> Result<Box<dyn ValueEncoder>> {
    match encoding {
        Encoding::PLAIN => Ok(Box::new(PlainEncoder::new(physical_type, type_length))),
        Encoding::DELTA_BINARY_PACKED => match physical_type {
            Type::INT32 | Type::INT64 => Ok(Box::new(DeltaBitPackEncoder::new(physical_type))),
            _ => Err(schema_err!(
                "DELTA_BINARY_PACKED only applies to INT32 and INT64, not {}",
                physical_type
            )),
        },
        Encoding::BYTE_STREAM_SPLIT => match physical_type {
            Type::FLOAT | Type::DOUBLE => {
                Ok(Box::new(ByteStreamSplitEncoder::new(physical_type)))
            }
            _ => Err(schema_err!(
                "BYTE_STREAM_SPLIT only applies to FLOAT and DOUBLE, not {}",
                physical_type
            )),
        },
        other => Err(schema_err!("{} is not a value encoding this writer emits", other)),
    }
}

// ----------------------------------------------------------------------
// PLAIN

/// The PLAIN encoding: little-endian fixed width numerics, bit-packed
/// booleans, length-prefixed byte arrays and raw fixed-length byte arrays.
pub struct PlainEncoder {
    physical_type: Type,
    buffer: Vec<u8>,
    bit_writer: BitWriter,
}

impl PlainEncoder {
    pub fn new(physical_type: Type, _type_length: i32) -> Self {
        Self { physical_type, buffer: Vec::new(), bit_writer: BitWriter::new(16) }
    }

    fn put_one(&mut self, value: &Value) -> Result<()> {
        match (self.physical_type, value) {
            (Type::BOOLEAN, Value::Bool(v)) => self.bit_writer.put_value(*v as u64, 1),
            (Type::INT32, Value::I32(v)) => self.buffer.extend_from_slice(&v.to_le_bytes()),
            (Type::INT64, Value::I64(v)) => self.buffer.extend_from_slice(&v.to_le_bytes()),
            (Type::INT96, Value::I96(v)) => self.buffer.extend_from_slice(&v.to_le_bytes()),
            (Type::FLOAT, Value::F32(v)) => self.buffer.extend_from_slice(&v.to_le_bytes()),
            (Type::DOUBLE, Value::F64(v)) => self.buffer.extend_from_slice(&v.to_le_bytes()),
            (Type::BYTE_ARRAY, Value::Bytes(v)) => {
                self.buffer.extend_from_slice(&(v.len() as u32).to_le_bytes());
                self.buffer.extend_from_slice(v);
            }
            (Type::FIXED_LEN_BYTE_ARRAY, Value::Bytes(v)) => self.buffer.extend_from_slice(v),
            (expected, got) => {
                return Err(enc_err!(
                    "cannot PLAIN encode {} as {}",
                    got.type_name(),
                    expected
                ))
            }
        }
        Ok(())
    }
}

impl ValueEncoder for PlainEncoder {
    fn put(&mut self, values: &[Value]) -> Result<()> {
        for value in values {
            self.put_one(value)?;
        }
        Ok(())
    }

    fn encoding(&self) -> Encoding {
        Encoding::PLAIN
    }

    fn estimated_data_encoded_size(&self) -> usize {
        self.buffer.len() + self.bit_writer.bytes_written()
    }

    fn flush_buffer(&mut self) -> Result<Bytes> {
        if self.physical_type == Type::BOOLEAN {
            let bits = std::mem::replace(&mut self.bit_writer, BitWriter::new(16));
            return Ok(bits.consume().into());
        }
        Ok(std::mem::take(&mut self.buffer).into())
    }
}

// ----------------------------------------------------------------------
// Dictionary

/// Dictionary encoder: interns values in insertion order and buffers their
/// indices. The dictionary page is the unique values in PLAIN encoding; data
/// pages are the bit width in one byte followed by RLE encoded indices.
///
/// The full index stream for the chunk is retained so that a chunk which
/// outgrows its dictionary can be replayed through a PLAIN encoder.
pub struct DictEncoder {
    physical_type: Type,
    type_length: i32,
    uniques: Vec<Value>,
    lookup: HashMap<Value, u32>,
    indices: Vec<u32>,
    /// Plain-encoded size of the unique values.
    dict_encoded_size: usize,
}

impl DictEncoder {
    pub fn new(physical_type: Type, type_length: i32) -> Self {
        Self {
            physical_type,
            type_length,
            uniques: Vec::new(),
            lookup: HashMap::new(),
            indices: Vec::new(),
            dict_encoded_size: 0,
        }
    }

    /// Interns one value and buffers its index.
    pub fn put_one(&mut self, value: &Value) -> Result<()> {
        let index = match self.lookup.get(value) {
            Some(index) => *index,
            None => {
                let index = u32::try_from(self.uniques.len())
                    .map_err(|_| enc_err!("dictionary index overflow"))?;
                self.uniques.push(value.clone());
                self.lookup.insert(value.clone(), index);
                self.dict_encoded_size += value.plain_size();
                index
            }
        };
        self.indices.push(index);
        Ok(())
    }

    /// Number of unique values interned so far.
    pub fn num_entries(&self) -> usize {
        self.uniques.len()
    }

    /// Number of indices buffered so far.
    pub fn num_indices(&self) -> usize {
        self.indices.len()
    }

    /// Plain-encoded size of the dictionary itself.
    pub fn dict_encoded_size(&self) -> usize {
        self.dict_encoded_size
    }

    /// The interned value at dictionary position `index`.
    pub fn value(&self, index: u32) -> &Value {
        &self.uniques[index as usize]
    }

    /// Iterator over the buffered value stream, in append order.
    pub fn replay_values(&self) -> impl Iterator<Item = &Value> + '_ {
        self.indices.iter().map(|&i| &self.uniques[i as usize])
    }

    /// The value at stream position `pos` (append order).
    pub fn value_at_stream(&self, pos: usize) -> &Value {
        &self.uniques[self.indices[pos] as usize]
    }

    /// Serializes the dictionary page body: unique values, PLAIN encoded.
    pub fn write_dict(&self) -> Result<Bytes> {
        let mut plain = PlainEncoder::new(self.physical_type, self.type_length);
        plain.put(&self.uniques)?;
        plain.flush_buffer()
    }

    /// Serializes one data page body from the index range `[start, end)`:
    /// one byte of bit width followed by the RLE encoded indices.
    pub fn write_indices(&self, start: usize, end: usize) -> Result<Bytes> {
        let bit_width = self.bit_width();
        let mut buffer = Vec::with_capacity(
            1 + RleEncoder::max_buffer_size(bit_width, end - start),
        );
        buffer.push(bit_width);
        let mut encoder = RleEncoder::new_from_buf(bit_width, buffer);
        for &index in &self.indices[start..end] {
            encoder.put(index as u64);
        }
        Ok(encoder.consume().into())
    }

    fn bit_width(&self) -> u8 {
        num_required_bits(self.num_entries().saturating_sub(1) as u64)
    }
}

// ----------------------------------------------------------------------
// DELTA_BINARY_PACKED

const DELTA_BLOCK_SIZE: usize = 128;
const DELTA_MINIBLOCKS_PER_BLOCK: usize = 4;
const DELTA_MINIBLOCK_SIZE: usize = DELTA_BLOCK_SIZE / DELTA_MINIBLOCKS_PER_BLOCK;

/// DELTA_BINARY_PACKED encoder for INT32 and INT64 columns: a page header of
/// block size, miniblock count, value count and first value, followed by
/// blocks of zig-zag min-delta plus bit-packed adjusted deltas.
pub struct DeltaBitPackEncoder {
    physical_type: Type,
    first_value: i64,
    previous: i64,
    total_count: usize,
    deltas: Vec<i64>,
    blocks: Vec<u8>,
}

impl DeltaBitPackEncoder {
    pub fn new(physical_type: Type) -> Self {
        Self {
            physical_type,
            first_value: 0,
            previous: 0,
            total_count: 0,
            deltas: Vec::with_capacity(DELTA_BLOCK_SIZE),
            blocks: Vec::new(),
        }
    }

    fn put_i64(&mut self, value: i64) {
        if self.total_count == 0 {
            self.first_value = value;
        } else {
            self.deltas.push(value.wrapping_sub(self.previous));
            if self.deltas.len() == DELTA_BLOCK_SIZE {
                self.flush_block();
            }
        }
        self.previous = value;
        self.total_count += 1;
    }

    fn flush_block(&mut self) {
        if self.deltas.is_empty() {
            return;
        }
        let min_delta = *self.deltas.iter().min().unwrap();
        let mut writer = BitWriter::new_from_buf(std::mem::take(&mut self.blocks));
        writer.put_zigzag_vlq_int(min_delta);

        let adjusted: Vec<u64> = self
            .deltas
            .iter()
            .map(|&d| d.wrapping_sub(min_delta) as u64)
            .collect();
        let used_miniblocks = ceil(adjusted.len(), DELTA_MINIBLOCK_SIZE);
        let mut widths = [0u8; DELTA_MINIBLOCKS_PER_BLOCK];
        for (i, width) in widths.iter_mut().enumerate().take(used_miniblocks) {
            let start = i * DELTA_MINIBLOCK_SIZE;
            let end = (start + DELTA_MINIBLOCK_SIZE).min(adjusted.len());
            let max = adjusted[start..end].iter().copied().max().unwrap_or(0);
            *width = num_required_bits(max);
        }
        for &width in &widths {
            writer.put_aligned(width as u64, 1);
        }
        for (i, &width) in widths.iter().enumerate().take(used_miniblocks) {
            let start = i * DELTA_MINIBLOCK_SIZE;
            for pos in start..start + DELTA_MINIBLOCK_SIZE {
                let v = adjusted.get(pos).copied().unwrap_or(0);
                writer.put_value(v, width as usize);
            }
            writer.flush();
        }

        self.blocks = writer.consume();
        self.deltas.clear();
    }
}

impl ValueEncoder for DeltaBitPackEncoder {
    fn put(&mut self, values: &[Value]) -> Result<()> {
        for value in values {
            let v = match (self.physical_type, value) {
                (Type::INT32, Value::I32(v)) => *v as i64,
                (Type::INT64, Value::I64(v)) => *v,
                (expected, got) => {
                    return Err(enc_err!(
                        "cannot delta encode {} as {}",
                        got.type_name(),
                        expected
                    ))
                }
            };
            self.put_i64(v);
        }
        Ok(())
    }

    fn encoding(&self) -> Encoding {
        Encoding::DELTA_BINARY_PACKED
    }

    fn estimated_data_encoded_size(&self) -> usize {
        // header + closed blocks + a pessimistic open block
        16 + self.blocks.len() + self.deltas.len() * 8
    }

    fn flush_buffer(&mut self) -> Result<Bytes> {
        self.flush_block();
        let mut header = BitWriter::new(16);
        header.put_vlq_int(DELTA_BLOCK_SIZE as u64);
        header.put_vlq_int(DELTA_MINIBLOCKS_PER_BLOCK as u64);
        header.put_vlq_int(self.total_count as u64);
        header.put_zigzag_vlq_int(self.first_value);
        let mut out = header.consume();
        out.append(&mut self.blocks);

        self.first_value = 0;
        self.previous = 0;
        self.total_count = 0;
        Ok(out.into())
    }
}

// ----------------------------------------------------------------------
// BYTE_STREAM_SPLIT

/// BYTE_STREAM_SPLIT encoder for FLOAT and DOUBLE columns: the k-th bytes of
/// all values are grouped into the k-th of `width` streams.
pub struct ByteStreamSplitEncoder {
    physical_type: Type,
    raw: Vec<u8>,
}

impl ByteStreamSplitEncoder {
    pub fn new(physical_type: Type) -> Self {
        Self { physical_type, raw: Vec::new() }
    }

    fn width(&self) -> usize {
        match self.physical_type {
            Type::FLOAT => 4,
            _ => 8,
        }
    }
}

impl ValueEncoder for ByteStreamSplitEncoder {
    fn put(&mut self, values: &[Value]) -> Result<()> {
        for value in values {
            match (self.physical_type, value) {
                (Type::FLOAT, Value::F32(v)) => self.raw.extend_from_slice(&v.to_le_bytes()),
                (Type::DOUBLE, Value::F64(v)) => self.raw.extend_from_slice(&v.to_le_bytes()),
                (expected, got) => {
                    return Err(enc_err!(
                        "cannot byte-stream-split encode {} as {}",
                        got.type_name(),
                        expected
                    ))
                }
            }
        }
        Ok(())
    }

    fn encoding(&self) -> Encoding {
        Encoding::BYTE_STREAM_SPLIT
    }

    fn estimated_data_encoded_size(&self) -> usize {
        self.raw.len()
    }

    fn flush_buffer(&mut self) -> Result<Bytes> {
        let width = self.width();
        let raw = std::mem::take(&mut self.raw);
        let num_values = raw.len() / width;
        let mut out = vec![0u8; raw.len()];
        for (i, chunk) in raw.chunks_exact(width).enumerate() {
            for (k, &byte) in chunk.iter().enumerate() {
                out[k * num_values + i] = byte;
            }
        }
        Ok(out.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encodings::rle::RleDecoder;

    #[test]
    fn test_plain_int64_layout() {
        let mut encoder = PlainEncoder::new(Type::INT64, 0);
        encoder.put(&[Value::I64(1), Value::I64(-1)]).unwrap();
        let buf = encoder.flush_buffer().unwrap();
        assert_eq!(&buf[..8], &1i64.to_le_bytes());
        assert_eq!(&buf[8..], &(-1i64).to_le_bytes());
    }

    #[test]
    fn test_plain_byte_array_framing() {
        let mut encoder = PlainEncoder::new(Type::BYTE_ARRAY, 0);
        encoder.put(&[Value::from("ab"), Value::from("")]).unwrap();
        let buf = encoder.flush_buffer().unwrap();
        assert_eq!(&buf[..], &[2, 0, 0, 0, b'a', b'b', 0, 0, 0, 0]);
    }

    #[test]
    fn test_plain_fixed_has_no_prefix() {
        let mut encoder = PlainEncoder::new(Type::FIXED_LEN_BYTE_ARRAY, 2);
        encoder.put(&[Value::from(&b"xy"[..])]).unwrap();
        assert_eq!(&encoder.flush_buffer().unwrap()[..], b"xy");
    }

    #[test]
    fn test_plain_boolean_bit_packing() {
        let mut encoder = PlainEncoder::new(Type::BOOLEAN, 0);
        let values: Vec<Value> = [true, false, true, true, false, false, true, true, true]
            .iter()
            .map(|&b| Value::Bool(b))
            .collect();
        encoder.put(&values).unwrap();
        let buf = encoder.flush_buffer().unwrap();
        assert_eq!(&buf[..], &[0b1100_1101, 0b0000_0001]);
    }

    #[test]
    fn test_plain_type_mismatch() {
        let mut encoder = PlainEncoder::new(Type::INT32, 0);
        assert!(encoder.put(&[Value::I64(1)]).is_err());
    }

    #[test]
    fn test_plain_resets_after_flush() {
        let mut encoder = PlainEncoder::new(Type::INT32, 0);
        encoder.put(&[Value::I32(1)]).unwrap();
        encoder.flush_buffer().unwrap();
        encoder.put(&[Value::I32(2)]).unwrap();
        assert_eq!(&encoder.flush_buffer().unwrap()[..], &2i32.to_le_bytes());
    }

    #[test]
    fn test_dict_interning() {
        let mut dict = DictEncoder::new(Type::BYTE_ARRAY, 0);
        for v in ["a", "b", "a", "c", "b", "a"] {
            dict.put_one(&Value::from(v)).unwrap();
        }
        assert_eq!(dict.num_entries(), 3);
        assert_eq!(dict.num_indices(), 6);
        // insertion order preserved
        assert_eq!(dict.value(0), &Value::from("a"));
        assert_eq!(dict.value(2), &Value::from("c"));
        assert_eq!(dict.dict_encoded_size(), 3 * (4 + 1));
    }

    #[test]
    fn test_dict_indices_decode() {
        let mut dict = DictEncoder::new(Type::INT64, 0);
        let input = [7i64, 8, 7, 9, 9, 8];
        for v in input {
            dict.put_one(&Value::I64(v)).unwrap();
        }
        let page = dict.write_indices(0, input.len()).unwrap();
        let bit_width = page[0];
        assert_eq!(bit_width, 2);
        let mut decoder = RleDecoder::new(bit_width, &page[1..]);
        let mut out = vec![0u64; input.len()];
        assert_eq!(decoder.get_batch(&mut out), input.len());
        let decoded: Vec<i64> = out
            .iter()
            .map(|&i| match dict.value(i as u32) {
                Value::I64(v) => *v,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(decoded, input);
    }

    #[test]
    fn test_dict_replay_order() {
        let mut dict = DictEncoder::new(Type::INT32, 0);
        let input = [3i32, 1, 3, 2, 1];
        for v in input {
            dict.put_one(&Value::I32(v)).unwrap();
        }
        let replayed: Vec<i32> = dict
            .replay_values()
            .map(|v| match v {
                Value::I32(v) => *v,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(replayed, input);
    }

    #[test]
    fn test_delta_roundtrip() {
        fn decode_delta(buf: &[u8], count: usize) -> Vec<i64> {
            let mut pos = 0usize;
            let read_vlq = |buf: &[u8], pos: &mut usize| -> u64 {
                let mut v = 0u64;
                let mut shift = 0;
                loop {
                    let b = buf[*pos];
                    *pos += 1;
                    v |= ((b & 0x7f) as u64) << shift;
                    if b & 0x80 == 0 {
                        return v;
                    }
                    shift += 7;
                }
            };
            let block_size = read_vlq(buf, &mut pos) as usize;
            let miniblocks = read_vlq(buf, &mut pos) as usize;
            let total = read_vlq(buf, &mut pos) as usize;
            assert_eq!(total, count);
            let zz = read_vlq(buf, &mut pos);
            let first = (zz >> 1) as i64 ^ -((zz & 1) as i64);
            let mut out = vec![first];
            let miniblock_size = block_size / miniblocks;
            while out.len() < total {
                let zz = read_vlq(buf, &mut pos);
                let min_delta = (zz >> 1) as i64 ^ -((zz & 1) as i64);
                let widths: Vec<u8> = buf[pos..pos + miniblocks].to_vec();
                pos += miniblocks;
                'block: for &width in &widths {
                    for i in 0..miniblock_size {
                        let mut v = 0u64;
                        for k in 0..width as usize {
                            let b = i * width as usize + k;
                            if (buf[pos + b / 8] >> (b % 8)) & 1 == 1 {
                                v |= 1 << k;
                            }
                        }
                        if out.len() < total {
                            let prev = *out.last().unwrap();
                            out.push(prev.wrapping_add(min_delta).wrapping_add(v as i64));
                        }
                    }
                    pos += miniblock_size * width as usize / 8;
                    if out.len() >= total {
                        break 'block;
                    }
                }
            }
            out
        }

        let values: Vec<i64> = (0..300).map(|i| i * 3 - 50 + (i % 7)).collect();
        let mut encoder = DeltaBitPackEncoder::new(Type::INT64);
        let wrapped: Vec<Value> = values.iter().map(|&v| Value::I64(v)).collect();
        encoder.put(&wrapped).unwrap();
        let buf = encoder.flush_buffer().unwrap();
        assert_eq!(decode_delta(&buf, values.len()), values);
    }

    #[test]
    fn test_delta_single_value() {
        let mut encoder = DeltaBitPackEncoder::new(Type::INT32);
        encoder.put(&[Value::I32(42)]).unwrap();
        let buf = encoder.flush_buffer().unwrap();
        // header only: block size 128 (two varint bytes), miniblock count,
        // total count 1, first value
        assert_eq!(&buf[..2], &[0x80, 0x01]);
        assert_eq!(buf[2], 4);
        assert_eq!(buf[3], 1);
        assert_eq!(buf[4], 84); // zigzag(42)
        assert_eq!(buf.len(), 5);
    }

    #[test]
    fn test_byte_stream_split_streams() {
        let mut encoder = ByteStreamSplitEncoder::new(Type::FLOAT);
        encoder
            .put(&[Value::F32(f32::from_le_bytes([1, 2, 3, 4])), Value::F32(f32::from_le_bytes([5, 6, 7, 8]))])
            .unwrap();
        let buf = encoder.flush_buffer().unwrap();
        assert_eq!(&buf[..], &[1, 5, 2, 6, 3, 7, 4, 8]);
    }
}
