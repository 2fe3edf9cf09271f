//! Page body compression codecs.
//!
//! Each variant of [`crate::basic::Compression`] maps to a [`Codec`]; the
//! writer holds one codec instance per column chunk. Decompression exists so
//! written pages can be read back, primarily by the crate's tests.

use std::io::{Read, Write};

use crate::basic::Compression;
use crate::errors::{Error, Result};

/// A compression codec for page bodies. Implementations append to `output`
/// without clearing it.
pub trait Codec: Send {
    fn compress(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<()>;

    /// Decompresses `input`, whose uncompressed size is known from the page
    /// header, appending to `output`.
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut Vec<u8>,
        uncompressed_size: usize,
    ) -> Result<()>;
}

/// Creates the codec for `compression`, or `None` for UNCOMPRESSED.
pub fn create_codec(compression: Compression) -> Result<Option<Box<dyn Codec>>> {
    match compression {
        Compression::UNCOMPRESSED => Ok(None),
        Compression::SNAPPY => Ok(Some(Box::new(SnappyCodec::new()))),
        Compression::GZIP => Ok(Some(Box::new(GzipCodec::new()))),
        Compression::ZSTD => Ok(Some(Box::new(ZstdCodec::new()))),
        Compression::LZ4_RAW => Ok(Some(Box::new(Lz4RawCodec::new()))),
    }
}

/// Snappy codec, raw block format.
pub struct SnappyCodec {
    encoder: snap::raw::Encoder,
    decoder: snap::raw::Decoder,
}

impl SnappyCodec {
    fn new() -> Self {
        Self { encoder: snap::raw::Encoder::new(), decoder: snap::raw::Decoder::new() }
    }
}

impl Codec for SnappyCodec {
    fn compress(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<()> {
        let offset = output.len();
        let required = snap::raw::max_compress_len(input.len());
        output.resize(offset + required, 0);
        let n = self.encoder.compress(input, &mut output[offset..])?;
        output.truncate(offset + n);
        Ok(())
    }

    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut Vec<u8>,
        uncompressed_size: usize,
    ) -> Result<()> {
        let offset = output.len();
        output.resize(offset + uncompressed_size, 0);
        let n = self.decoder.decompress(input, &mut output[offset..])?;
        output.truncate(offset + n);
        Ok(())
    }
}

/// Gzip codec with the default compression level.
pub struct GzipCodec {}

impl GzipCodec {
    fn new() -> Self {
        Self {}
    }
}

impl Codec for GzipCodec {
    fn compress(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<()> {
        let mut encoder = flate2::write::GzEncoder::new(output, flate2::Compression::default());
        encoder.write_all(input)?;
        encoder.try_finish()?;
        Ok(())
    }

    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut Vec<u8>,
        _uncompressed_size: usize,
    ) -> Result<()> {
        let mut decoder = flate2::read::MultiGzDecoder::new(input);
        decoder.read_to_end(output)?;
        Ok(())
    }
}

/// Zstd codec with the default compression level.
pub struct ZstdCodec {}

impl ZstdCodec {
    fn new() -> Self {
        Self {}
    }
}

impl Codec for ZstdCodec {
    fn compress(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<()> {
        let mut encoder = zstd::Encoder::new(output, zstd::DEFAULT_COMPRESSION_LEVEL)
            .map_err(|e| Error::Io(Box::new(e)))?;
        encoder.write_all(input)?;
        encoder.finish().map_err(|e| Error::Io(Box::new(e)))?;
        Ok(())
    }

    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut Vec<u8>,
        _uncompressed_size: usize,
    ) -> Result<()> {
        let mut decoder = zstd::Decoder::new(input).map_err(|e| Error::Io(Box::new(e)))?;
        decoder.read_to_end(output)?;
        Ok(())
    }
}

/// LZ4 codec, raw block format without frame headers (LZ4_RAW, codec id 7).
pub struct Lz4RawCodec {}

impl Lz4RawCodec {
    fn new() -> Self {
        Self {}
    }
}

impl Codec for Lz4RawCodec {
    fn compress(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<()> {
        let offset = output.len();
        let required = lz4_flex::block::get_maximum_output_size(input.len());
        output.resize(offset + required, 0);
        let n = lz4_flex::block::compress_into(input, &mut output[offset..])
            .map_err(|e| Error::Io(Box::new(e)))?;
        output.truncate(offset + n);
        Ok(())
    }

    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut Vec<u8>,
        uncompressed_size: usize,
    ) -> Result<()> {
        let offset = output.len();
        output.resize(offset + uncompressed_size, 0);
        let n = lz4_flex::block::decompress_into(input, &mut output[offset..])
            .map_err(|e| Error::Io(Box::new(e)))?;
        output.truncate(offset + n);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(compression: Compression) {
        let input: Vec<u8> = (0..4096u32).map(|i| (i % 71) as u8).collect();
        let mut codec = create_codec(compression).unwrap().unwrap();

        let mut compressed = Vec::new();
        codec.compress(&input, &mut compressed).unwrap();
        assert!(compressed.len() < input.len());

        let mut decompressed = Vec::new();
        codec
            .decompress(&compressed, &mut decompressed, input.len())
            .unwrap();
        assert_eq!(decompressed, input);
    }

    #[test]
    fn test_snappy_roundtrip() {
        roundtrip(Compression::SNAPPY);
    }

    #[test]
    fn test_gzip_roundtrip() {
        roundtrip(Compression::GZIP);
    }

    #[test]
    fn test_zstd_roundtrip() {
        roundtrip(Compression::ZSTD);
    }

    #[test]
    fn test_lz4_raw_roundtrip() {
        roundtrip(Compression::LZ4_RAW);
    }

    #[test]
    fn test_uncompressed_has_no_codec() {
        assert!(create_codec(Compression::UNCOMPRESSED).unwrap().is_none());
    }

    #[test]
    fn test_compress_appends() {
        let mut codec = create_codec(Compression::SNAPPY).unwrap().unwrap();
        let mut out = vec![0xAA];
        codec.compress(b"hello hello hello", &mut out).unwrap();
        assert_eq!(out[0], 0xAA);
        assert!(out.len() > 1);
    }
}
