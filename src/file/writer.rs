//! Low-level file assembly: byte-counting sink wrapper, page serialization,
//! and the assembler that lays out chunk bodies, index blocks and the
//! footer.

use std::io::Write;

use log::debug;

use crate::basic::PageType;
use crate::column::page::{CompressedPage, Page, PageWriteSpec, PageWriter};
use crate::column::writer::ColumnCloseResult;
use crate::errors::Result;
use crate::file::metadata::RowGroupMetaData;
use crate::file::properties::WriterPropertiesPtr;
use crate::file::{FOOTER_SIZE, PARQUET_MAGIC};
use crate::format;
use crate::thrift::{ThriftCompactOutputProtocol, WriteThrift};

/// A [`Write`] wrapper that tracks the number of bytes written.
#[derive(Debug)]
pub struct TrackedWrite<W> {
    inner: W,
    bytes_written: usize,
}

impl<W: Write> TrackedWrite<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, bytes_written: 0 }
    }

    /// Bytes written through this wrapper so far.
    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for TrackedWrite<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let bytes = self.inner.write(buf)?;
        self.bytes_written += bytes;
        Ok(bytes)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Serializes pages into a sink: thrift-compact page header (never
/// compressed) followed by the page body.
pub struct SerializedPageWriter<'a, W> {
    sink: &'a mut TrackedWrite<W>,
}

impl<'a, W: Write> SerializedPageWriter<'a, W> {
    pub fn new(sink: &'a mut TrackedWrite<W>) -> Self {
        Self { sink }
    }

    fn serialize_page_header(&mut self, header: format::PageHeader) -> Result<usize> {
        let start_pos = self.sink.bytes_written();
        {
            let mut protocol = ThriftCompactOutputProtocol::new(&mut *self.sink);
            header.write_thrift(&mut protocol)?;
        }
        Ok(self.sink.bytes_written() - start_pos)
    }
}

impl<'a, W: Write> PageWriter for SerializedPageWriter<'a, W> {
    fn write_page(&mut self, page: CompressedPage) -> Result<PageWriteSpec> {
        let uncompressed_size = page.uncompressed_size();
        let compressed_size = page.compressed_size();
        let num_values = page.num_values();
        let page_type = page.page_type();

        let mut page_header = format::PageHeader {
            type_: page_type,
            uncompressed_page_size: uncompressed_size as i32,
            compressed_page_size: compressed_size as i32,
            crc: None,
            data_page_header: None,
            dictionary_page_header: None,
            data_page_header_v2: None,
        };

        match page.compressed_page() {
            Page::DataPage {
                encoding,
                def_level_encoding,
                rep_level_encoding,
                statistics,
                ..
            } => {
                page_header.data_page_header = Some(format::DataPageHeader {
                    num_values: num_values as i32,
                    encoding: *encoding,
                    definition_level_encoding: *def_level_encoding,
                    repetition_level_encoding: *rep_level_encoding,
                    statistics: statistics.clone(),
                });
            }
            Page::DataPageV2 {
                encoding,
                num_nulls,
                num_rows,
                def_levels_byte_len,
                rep_levels_byte_len,
                is_compressed,
                statistics,
                ..
            } => {
                page_header.data_page_header_v2 = Some(format::DataPageHeaderV2 {
                    num_values: num_values as i32,
                    num_nulls: *num_nulls as i32,
                    num_rows: *num_rows as i32,
                    encoding: *encoding,
                    definition_levels_byte_length: *def_levels_byte_len as i32,
                    repetition_levels_byte_length: *rep_levels_byte_len as i32,
                    is_compressed: Some(*is_compressed),
                    statistics: statistics.clone(),
                });
            }
            Page::DictionaryPage { encoding, is_sorted, .. } => {
                page_header.dictionary_page_header = Some(format::DictionaryPageHeader {
                    num_values: num_values as i32,
                    encoding: *encoding,
                    is_sorted: Some(*is_sorted),
                });
            }
        }

        let start_pos = self.sink.bytes_written() as u64;
        let header_size = self.serialize_page_header(page_header)?;
        self.sink.write_all(page.data())?;

        let mut spec = PageWriteSpec::new();
        spec.page_type = Some(page_type);
        spec.uncompressed_size = uncompressed_size + header_size;
        spec.compressed_size = compressed_size + header_size;
        spec.offset = start_pos;
        spec.bytes_written = self.sink.bytes_written() as u64 - start_pos;
        // values are only counted for data pages
        if page_type == PageType::DATA_PAGE || page_type == PageType::DATA_PAGE_V2 {
            spec.num_values = num_values;
        }
        Ok(spec)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// One column chunk encoded to an in-memory buffer by a worker. All offsets
/// inside `result` are relative to the start of `buf` until the assembler
/// rebases them.
pub struct EncodedColumnChunk {
    pub buf: Vec<u8>,
    pub result: ColumnCloseResult,
}

/// Writes the physical file: leading magic, row group bodies with their
/// index blocks, and finally the footer.
///
/// The assembler never seeks and never closes the sink.
#[derive(Debug)]
pub struct FileAssembler<W: Write> {
    buf: TrackedWrite<W>,
    row_groups: Vec<format::RowGroup>,
    num_rows: i64,
    props: WriterPropertiesPtr,
}

impl<W: Write> FileAssembler<W> {
    /// Creates the assembler and eagerly writes the header magic. A failing
    /// first write fails construction.
    pub fn new(sink: W, props: WriterPropertiesPtr) -> Result<Self> {
        let mut buf = TrackedWrite::new(sink);
        buf.write_all(&PARQUET_MAGIC)?;
        Ok(Self { buf, row_groups: Vec::new(), num_rows: 0, props })
    }

    pub fn num_row_groups(&self) -> usize {
        self.row_groups.len()
    }

    /// Appends one completed row group: chunk buffers in schema order, then
    /// the group's column index and offset index blocks.
    pub fn append_row_group(
        &mut self,
        chunks: Vec<EncodedColumnChunk>,
        num_rows: i64,
    ) -> Result<()> {
        let mut metadata = Vec::with_capacity(chunks.len());
        let mut column_indexes = Vec::with_capacity(chunks.len());
        let mut offset_indexes = Vec::with_capacity(chunks.len());
        let mut total_byte_size = 0i64;

        for chunk in chunks {
            let base = self.buf.bytes_written() as i64;
            self.buf.write_all(&chunk.buf)?;

            let mut result = chunk.result;
            result.metadata.rebase(base);
            if let Some(offset_index) = &mut result.offset_index {
                offset_index.rebase(base);
            }
            total_byte_size += result.metadata.total_uncompressed_size();
            metadata.push(result.metadata);
            column_indexes.push(result.column_index);
            offset_indexes.push(result.offset_index);
        }

        // index blocks follow the chunk bodies, column indexes first
        for (meta, column_index) in metadata.iter_mut().zip(&column_indexes) {
            if let Some(column_index) = column_index {
                let start = self.buf.bytes_written();
                let mut protocol = ThriftCompactOutputProtocol::new(&mut self.buf);
                column_index.write_thrift(&mut protocol)?;
                let len = self.buf.bytes_written() - start;
                meta.set_column_index_range(start as i64, len as i32);
            }
        }
        for (meta, offset_index) in metadata.iter_mut().zip(&offset_indexes) {
            if let Some(offset_index) = offset_index {
                let start = self.buf.bytes_written();
                let mut protocol = ThriftCompactOutputProtocol::new(&mut self.buf);
                offset_index.write_thrift(&mut protocol)?;
                let len = self.buf.bytes_written() - start;
                meta.set_offset_index_range(start as i64, len as i32);
            }
        }

        let ordinal = self.row_groups.len() as i16;
        let row_group = RowGroupMetaData::new(metadata, num_rows, total_byte_size, ordinal);
        self.row_groups.push(row_group.to_thrift());
        self.num_rows += num_rows;
        Ok(())
    }

    /// Writes the footer, its little-endian length and the trailing magic.
    /// The sink is flushed but left open for the caller.
    pub fn finish(&mut self, schema: Vec<format::SchemaElement>) -> Result<format::FileMetaData> {
        let num_leaves = schema.iter().filter(|e| e.num_children.unwrap_or(0) == 0).count();
        let file_metadata = format::FileMetaData {
            version: self.props.writer_version().as_num(),
            schema,
            num_rows: self.num_rows,
            row_groups: std::mem::take(&mut self.row_groups),
            key_value_metadata: self.props.key_value_metadata().cloned(),
            created_by: Some(self.props.created_by().to_string()),
            column_orders: Some(vec![format::ColumnOrder::TypeDefinedOrder; num_leaves]),
        };

        let start_pos = self.buf.bytes_written();
        {
            let mut protocol = ThriftCompactOutputProtocol::new(&mut self.buf);
            file_metadata.write_thrift(&mut protocol)?;
        }
        let end_pos = self.buf.bytes_written();

        let metadata_len = (end_pos - start_pos) as u32;
        let mut footer = [0u8; FOOTER_SIZE];
        footer[..4].copy_from_slice(&metadata_len.to_le_bytes());
        footer[4..].copy_from_slice(&PARQUET_MAGIC);
        self.buf.write_all(&footer)?;
        self.buf.flush()?;

        debug!(
            "wrote footer: {} rows, {} row groups, {} metadata bytes",
            file_metadata.num_rows,
            file_metadata.row_groups.len(),
            metadata_len
        );
        Ok(file_metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::Encoding;
    use crate::file::properties::WriterProperties;
    use std::sync::Arc;

    #[test]
    fn test_tracked_write_counts() {
        let mut sink = TrackedWrite::new(Vec::new());
        sink.write_all(b"abcd").unwrap();
        sink.write_all(b"ef").unwrap();
        assert_eq!(sink.bytes_written(), 6);
        assert_eq!(sink.into_inner(), b"abcdef");
    }

    #[test]
    fn test_assembler_writes_header_magic() {
        let props = Arc::new(WriterProperties::builder().build().unwrap());
        let mut sink = Vec::new();
        FileAssembler::new(&mut sink, props).unwrap();
        assert_eq!(&sink, b"PAR1");
    }

    #[test]
    fn test_empty_file_layout() {
        let props = Arc::new(WriterProperties::builder().build().unwrap());
        let mut sink = Vec::new();
        {
            let mut assembler = FileAssembler::new(&mut sink, props).unwrap();
            assembler.finish(vec![format::SchemaElement {
                type_: None,
                type_length: None,
                repetition_type: None,
                name: "schema".to_string(),
                num_children: Some(0),
                converted_type: None,
                scale: None,
                precision: None,
                field_id: None,
                logical_type: None,
            }]).unwrap();
        }
        assert_eq!(&sink[..4], b"PAR1");
        assert_eq!(&sink[sink.len() - 4..], b"PAR1");
        let footer_len =
            u32::from_le_bytes(sink[sink.len() - 8..sink.len() - 4].try_into().unwrap()) as usize;
        assert_eq!(4 + footer_len + 8, sink.len());
    }

    #[test]
    fn test_page_writer_roundtrip_header() {
        use crate::thrift::{ReadThrift, ThriftSliceInputProtocol};

        let mut sink = TrackedWrite::new(Vec::new());
        let mut page_writer = SerializedPageWriter::new(&mut sink);
        let page = CompressedPage::new(
            Page::DataPage {
                buf: vec![1, 2, 3, 4].into(),
                num_values: 7,
                encoding: Encoding::PLAIN,
                def_level_encoding: Encoding::RLE,
                rep_level_encoding: Encoding::RLE,
                statistics: None,
            },
            4,
        );
        let spec = page_writer.write_page(page).unwrap();
        assert_eq!(spec.offset, 0);
        assert_eq!(spec.num_values, 7);
        assert_eq!(spec.compressed_size, spec.bytes_written as usize);

        let buf = sink.into_inner();
        let mut prot = ThriftSliceInputProtocol::new(&buf);
        let header = format::PageHeader::read_thrift(&mut prot).unwrap();
        assert_eq!(header.compressed_page_size, 4);
        assert_eq!(header.data_page_header.unwrap().num_values, 7);
        assert_eq!(prot.as_slice(), &[1, 2, 3, 4]);
    }
}
