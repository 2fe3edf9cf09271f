//! In-memory metadata for column chunks and row groups, and the builders
//! that accumulate column/offset index entries page by page.

use crate::basic::{Compression, Encoding};
use crate::errors::Result;
use crate::file::statistics::{to_thrift as statistics_to_thrift, ValueStatistics};
use crate::format;
use crate::schema::types::ColumnDescPtr;

/// Metadata for one column chunk, gathered while its pages are written.
#[derive(Debug, Clone)]
pub struct ColumnChunkMetaData {
    column_descr: ColumnDescPtr,
    encodings: Vec<Encoding>,
    codec: Compression,
    num_values: i64,
    total_uncompressed_size: i64,
    total_compressed_size: i64,
    data_page_offset: i64,
    dictionary_page_offset: Option<i64>,
    statistics: Option<ValueStatistics>,
    column_index_offset: Option<i64>,
    column_index_length: Option<i32>,
    offset_index_offset: Option<i64>,
    offset_index_length: Option<i32>,
}

impl ColumnChunkMetaData {
    pub fn builder(column_descr: ColumnDescPtr) -> ColumnChunkMetaDataBuilder {
        ColumnChunkMetaDataBuilder::new(column_descr)
    }

    pub fn column_descr(&self) -> &ColumnDescPtr {
        &self.column_descr
    }

    pub fn num_values(&self) -> i64 {
        self.num_values
    }

    pub fn total_uncompressed_size(&self) -> i64 {
        self.total_uncompressed_size
    }

    pub fn total_compressed_size(&self) -> i64 {
        self.total_compressed_size
    }

    pub fn data_page_offset(&self) -> i64 {
        self.data_page_offset
    }

    pub fn dictionary_page_offset(&self) -> Option<i64> {
        self.dictionary_page_offset
    }

    pub fn statistics(&self) -> Option<&ValueStatistics> {
        self.statistics.as_ref()
    }

    /// The chunk's first byte: the dictionary page when present, otherwise
    /// the first data page.
    pub fn byte_range_start(&self) -> i64 {
        self.dictionary_page_offset.unwrap_or(self.data_page_offset)
    }

    /// Shifts all file offsets by `base`, rebasing chunk-relative offsets
    /// produced by an in-memory encode to absolute file positions.
    pub fn rebase(&mut self, base: i64) {
        self.data_page_offset += base;
        if let Some(offset) = &mut self.dictionary_page_offset {
            *offset += base;
        }
    }

    pub fn set_column_index_range(&mut self, offset: i64, length: i32) {
        self.column_index_offset = Some(offset);
        self.column_index_length = Some(length);
    }

    pub fn set_offset_index_range(&mut self, offset: i64, length: i32) {
        self.offset_index_offset = Some(offset);
        self.offset_index_length = Some(length);
    }

    pub fn to_thrift(&self) -> format::ColumnChunk {
        let meta_data = format::ColumnMetaData {
            type_: self.column_descr.physical_type(),
            encodings: self.encodings.clone(),
            path_in_schema: self.column_descr.path().parts().to_vec(),
            codec: self.codec,
            num_values: self.num_values,
            total_uncompressed_size: self.total_uncompressed_size,
            total_compressed_size: self.total_compressed_size,
            data_page_offset: self.data_page_offset,
            index_page_offset: None,
            dictionary_page_offset: self.dictionary_page_offset,
            statistics: statistics_to_thrift(
                self.statistics.as_ref(),
                self.column_descr.sort_order(),
            ),
        };
        format::ColumnChunk {
            file_path: None,
            file_offset: self.byte_range_start(),
            meta_data: Some(meta_data),
            offset_index_offset: self.offset_index_offset,
            offset_index_length: self.offset_index_length,
            column_index_offset: self.column_index_offset,
            column_index_length: self.column_index_length,
        }
    }
}

/// Builder for [`ColumnChunkMetaData`].
pub struct ColumnChunkMetaDataBuilder {
    column_descr: ColumnDescPtr,
    encodings: Vec<Encoding>,
    codec: Compression,
    num_values: i64,
    total_uncompressed_size: i64,
    total_compressed_size: i64,
    data_page_offset: i64,
    dictionary_page_offset: Option<i64>,
    statistics: Option<ValueStatistics>,
}

impl ColumnChunkMetaDataBuilder {
    fn new(column_descr: ColumnDescPtr) -> Self {
        Self {
            column_descr,
            encodings: Vec::new(),
            codec: Compression::UNCOMPRESSED,
            num_values: 0,
            total_uncompressed_size: 0,
            total_compressed_size: 0,
            data_page_offset: 0,
            dictionary_page_offset: None,
            statistics: None,
        }
    }

    pub fn set_encodings(mut self, encodings: Vec<Encoding>) -> Self {
        self.encodings = encodings;
        self
    }

    pub fn set_compression(mut self, codec: Compression) -> Self {
        self.codec = codec;
        self
    }

    pub fn set_num_values(mut self, num_values: i64) -> Self {
        self.num_values = num_values;
        self
    }

    pub fn set_total_uncompressed_size(mut self, value: i64) -> Self {
        self.total_uncompressed_size = value;
        self
    }

    pub fn set_total_compressed_size(mut self, value: i64) -> Self {
        self.total_compressed_size = value;
        self
    }

    pub fn set_data_page_offset(mut self, value: i64) -> Self {
        self.data_page_offset = value;
        self
    }

    pub fn set_dictionary_page_offset(mut self, value: Option<i64>) -> Self {
        self.dictionary_page_offset = value;
        self
    }

    pub fn set_statistics(mut self, value: Option<ValueStatistics>) -> Self {
        self.statistics = value;
        self
    }

    pub fn build(self) -> Result<ColumnChunkMetaData> {
        Ok(ColumnChunkMetaData {
            column_descr: self.column_descr,
            encodings: self.encodings,
            codec: self.codec,
            num_values: self.num_values,
            total_uncompressed_size: self.total_uncompressed_size,
            total_compressed_size: self.total_compressed_size,
            data_page_offset: self.data_page_offset,
            dictionary_page_offset: self.dictionary_page_offset,
            statistics: self.statistics,
            column_index_offset: None,
            column_index_length: None,
            offset_index_offset: None,
            offset_index_length: None,
        })
    }
}

/// Metadata for a completed row group.
#[derive(Debug, Clone)]
pub struct RowGroupMetaData {
    columns: Vec<ColumnChunkMetaData>,
    num_rows: i64,
    total_byte_size: i64,
    ordinal: i16,
}

impl RowGroupMetaData {
    pub fn new(
        columns: Vec<ColumnChunkMetaData>,
        num_rows: i64,
        total_byte_size: i64,
        ordinal: i16,
    ) -> Self {
        Self { columns, num_rows, total_byte_size, ordinal }
    }

    pub fn columns(&self) -> &[ColumnChunkMetaData] {
        &self.columns
    }

    pub fn num_rows(&self) -> i64 {
        self.num_rows
    }

    pub fn total_byte_size(&self) -> i64 {
        self.total_byte_size
    }

    pub fn to_thrift(&self) -> format::RowGroup {
        let total_compressed_size =
            self.columns.iter().map(|c| c.total_compressed_size()).sum();
        format::RowGroup {
            columns: self.columns.iter().map(|c| c.to_thrift()).collect(),
            total_byte_size: self.total_byte_size,
            num_rows: self.num_rows,
            file_offset: self.columns.first().map(|c| c.byte_range_start()),
            total_compressed_size: Some(total_compressed_size),
            ordinal: Some(self.ordinal),
        }
    }
}

/// Accumulates one [`format::ColumnIndex`] entry per page of a chunk.
///
/// A builder starts valid; a page without usable statistics invalidates it
/// and the chunk then produces no index at all. Null counts can be
/// suppressed for leaves whose statistics are omitted.
pub struct ColumnIndexBuilder {
    null_pages: Vec<bool>,
    min_values: Vec<Vec<u8>>,
    max_values: Vec<Vec<u8>>,
    null_counts: Vec<i64>,
    null_counts_enabled: bool,
    valid: bool,
}

impl Default for ColumnIndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnIndexBuilder {
    pub fn new() -> Self {
        Self {
            null_pages: Vec::new(),
            min_values: Vec::new(),
            max_values: Vec::new(),
            null_counts: Vec::new(),
            null_counts_enabled: true,
            valid: true,
        }
    }

    pub fn set_null_counts_enabled(&mut self, enabled: bool) {
        self.null_counts_enabled = enabled;
    }

    pub fn append(
        &mut self,
        null_page: bool,
        min_value: Vec<u8>,
        max_value: Vec<u8>,
        null_count: i64,
    ) {
        self.null_pages.push(null_page);
        self.min_values.push(min_value);
        self.max_values.push(max_value);
        self.null_counts.push(null_count);
    }

    /// Marks the chunk as unable to produce a column index.
    pub fn to_invalid(&mut self) {
        self.valid = false;
    }

    pub fn valid(&self) -> bool {
        self.valid
    }

    pub fn build(self) -> format::ColumnIndex {
        format::ColumnIndex {
            null_pages: self.null_pages,
            min_values: self.min_values,
            max_values: self.max_values,
            boundary_order: format::BoundaryOrder::Unordered,
            null_counts: self.null_counts_enabled.then_some(self.null_counts),
        }
    }
}

/// Accumulates one [`format::PageLocation`] per data page of a chunk.
#[derive(Default)]
pub struct OffsetIndexBuilder {
    offsets: Vec<i64>,
    compressed_sizes: Vec<i32>,
    row_counts: Vec<i64>,
}

impl OffsetIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the top-level row count of the next page. Called when the
    /// page is cut.
    pub fn append_row_count(&mut self, row_count: i64) {
        self.row_counts.push(row_count);
    }

    /// Records where the page landed. Called when the page is written.
    pub fn append_offset_and_size(&mut self, offset: i64, compressed_size: i32) {
        self.offsets.push(offset);
        self.compressed_sizes.push(compressed_size);
    }

    pub fn build(self) -> format::OffsetIndex {
        debug_assert_eq!(self.offsets.len(), self.row_counts.len());
        let mut first_row_index = 0i64;
        let page_locations = self
            .offsets
            .into_iter()
            .zip(self.compressed_sizes)
            .zip(self.row_counts)
            .map(|((offset, compressed_page_size), row_count)| {
                let location = format::PageLocation {
                    offset,
                    compressed_page_size,
                    first_row_index,
                };
                first_row_index += row_count;
                location
            })
            .collect();
        format::OffsetIndex { page_locations }
    }
}
