//! Shared helpers for reading written files back: footer and index
//! decoding, plus a small page decoder for the flat schemas under test.

#![allow(dead_code)]

use std::io::Write;
use std::sync::{Arc, Mutex};

use rowshred::basic::{Compression, PageType, Type};
use rowshred::compression::create_codec;
use rowshred::encodings::rle::RleDecoder;
use rowshred::format::{ColumnChunk, ColumnIndex, FileMetaData, OffsetIndex, PageHeader};
use rowshred::record::Value;
use rowshred::thrift::{ReadThrift, ThriftSliceInputProtocol};

/// Parses the footer of a finished file.
pub fn read_footer(bytes: &[u8]) -> FileMetaData {
    assert!(bytes.len() >= 12, "file too short: {} bytes", bytes.len());
    assert_eq!(&bytes[..4], b"PAR1", "missing leading magic");
    assert_eq!(&bytes[bytes.len() - 4..], b"PAR1", "missing trailing magic");
    let footer_len =
        u32::from_le_bytes(bytes[bytes.len() - 8..bytes.len() - 4].try_into().unwrap()) as usize;
    let start = bytes.len() - 8 - footer_len;
    let mut prot = ThriftSliceInputProtocol::new(&bytes[start..start + footer_len]);
    FileMetaData::read_thrift(&mut prot).expect("footer decodes")
}

pub fn read_column_index(bytes: &[u8], chunk: &ColumnChunk) -> Option<ColumnIndex> {
    let offset = chunk.column_index_offset? as usize;
    let length = chunk.column_index_length? as usize;
    let mut prot = ThriftSliceInputProtocol::new(&bytes[offset..offset + length]);
    Some(ColumnIndex::read_thrift(&mut prot).expect("column index decodes"))
}

pub fn read_offset_index(bytes: &[u8], chunk: &ColumnChunk) -> Option<OffsetIndex> {
    let offset = chunk.offset_index_offset? as usize;
    let length = chunk.offset_index_length? as usize;
    let mut prot = ThriftSliceInputProtocol::new(&bytes[offset..offset + length]);
    Some(OffsetIndex::read_thrift(&mut prot).expect("offset index decodes"))
}

fn num_required_bits(num: u64) -> u8 {
    (64 - num.leading_zeros()) as u8
}

/// Decodes every triple of one column chunk of a flat schema back into
/// optional values. Handles PLAIN and dictionary encoded pages of the
/// physical types the tests write.
pub fn read_column_values(
    bytes: &[u8],
    file: &FileMetaData,
    row_group: usize,
    column: usize,
) -> Vec<Option<Value>> {
    let chunk = &file.row_groups[row_group].columns[column];
    let meta = chunk.meta_data.as_ref().expect("chunk has metadata");

    // flat schema: leaf elements follow the root directly
    let element = &file.schema[column + 1];
    let max_def = match element.repetition_type {
        Some(rowshred::basic::Repetition::OPTIONAL) => 1i16,
        _ => 0i16,
    };
    let physical_type = element.type_.expect("leaf has a physical type");

    let mut pos = meta.dictionary_page_offset.unwrap_or(meta.data_page_offset) as usize;
    let mut dictionary: Vec<Value> = Vec::new();
    let mut out = Vec::new();

    while (out.len() as i64) < meta.num_values {
        let mut prot = ThriftSliceInputProtocol::new(&bytes[pos..]);
        let header = PageHeader::read_thrift(&mut prot).expect("page header decodes");
        let header_len = bytes.len() - pos - prot.as_slice().len();
        let body_start = pos + header_len;
        let compressed = &bytes[body_start..body_start + header.compressed_page_size as usize];
        pos = body_start + header.compressed_page_size as usize;

        let body = decompress(meta.codec, compressed, header.uncompressed_page_size as usize);

        match header.type_ {
            PageType::DICTIONARY_PAGE => {
                let dict_header = header.dictionary_page_header.expect("dictionary header");
                dictionary =
                    decode_plain(&body, physical_type, dict_header.num_values as usize);
            }
            PageType::DATA_PAGE => {
                let data_header = header.data_page_header.expect("data page header");
                let num_values = data_header.num_values as usize;

                let mut cursor = &body[..];
                let defs: Vec<u64> = if max_def > 0 {
                    let len = u32::from_le_bytes(cursor[..4].try_into().unwrap()) as usize;
                    let mut decoder =
                        RleDecoder::new(num_required_bits(max_def as u64), &cursor[4..4 + len]);
                    let mut defs = vec![0u64; num_values];
                    assert_eq!(decoder.get_batch(&mut defs), num_values);
                    cursor = &cursor[4 + len..];
                    defs
                } else {
                    vec![max_def as u64; num_values]
                };
                let num_non_null = defs.iter().filter(|&&d| d == max_def as u64).count();

                let values = match data_header.encoding {
                    rowshred::basic::Encoding::PLAIN => {
                        decode_plain(cursor, physical_type, num_non_null)
                    }
                    rowshred::basic::Encoding::PLAIN_DICTIONARY
                    | rowshred::basic::Encoding::RLE_DICTIONARY => {
                        if num_non_null == 0 {
                            Vec::new()
                        } else {
                            let bit_width = cursor[0];
                            let mut decoder = RleDecoder::new(bit_width, &cursor[1..]);
                            let mut indices = vec![0u64; num_non_null];
                            assert_eq!(decoder.get_batch(&mut indices), num_non_null);
                            indices
                                .iter()
                                .map(|&i| dictionary[i as usize].clone())
                                .collect()
                        }
                    }
                    other => panic!("test decoder does not handle {other}"),
                };

                let mut value_iter = values.into_iter();
                for def in defs {
                    if def == max_def as u64 {
                        out.push(Some(value_iter.next().expect("value for non-null triple")));
                    } else {
                        out.push(None);
                    }
                }
            }
            other => panic!("unexpected page type {other:?}"),
        }
    }
    out
}

fn decompress(codec: Compression, body: &[u8], uncompressed_size: usize) -> Vec<u8> {
    match create_codec(codec).expect("codec exists") {
        None => body.to_vec(),
        Some(mut codec) => {
            let mut out = Vec::with_capacity(uncompressed_size);
            codec
                .decompress(body, &mut out, uncompressed_size)
                .expect("page decompresses");
            out
        }
    }
}

fn decode_plain(body: &[u8], physical_type: Type, num_values: usize) -> Vec<Value> {
    let mut out = Vec::with_capacity(num_values);
    let mut cursor = body;
    for _ in 0..num_values {
        match physical_type {
            Type::INT64 => {
                out.push(Value::I64(i64::from_le_bytes(cursor[..8].try_into().unwrap())));
                cursor = &cursor[8..];
            }
            Type::INT32 => {
                out.push(Value::I32(i32::from_le_bytes(cursor[..4].try_into().unwrap())));
                cursor = &cursor[4..];
            }
            Type::DOUBLE => {
                out.push(Value::F64(f64::from_le_bytes(cursor[..8].try_into().unwrap())));
                cursor = &cursor[8..];
            }
            Type::BYTE_ARRAY => {
                let len = u32::from_le_bytes(cursor[..4].try_into().unwrap()) as usize;
                out.push(Value::from(&cursor[4..4 + len]));
                cursor = &cursor[4 + len..];
            }
            other => panic!("test decoder does not handle {other}"),
        }
    }
    out
}

/// A clonable sink whose contents can be inspected while a writer still
/// borrows it.
#[derive(Clone, Default)]
pub struct SharedSink(Arc<Mutex<Vec<u8>>>);

impl SharedSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }
}

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
