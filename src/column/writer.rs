//! The page builder and column chunk assembler for one leaf column.
//!
//! A [`ColumnChunkWriter`] consumes the leaf's `(value, repetition,
//! definition)` triples, slices them into data pages when the estimated
//! plain-encoded value size passes the page threshold, maintains running
//! statistics and the column/offset index entries, and on `close` produces
//! the chunk's pages (dictionary page first when one was built) together
//! with its metadata.
//!
//! Dictionary handling: while a chunk is dictionary-eligible, cut pages are
//! held back as index ranges into the growing dictionary. If the dictionary
//! outgrows its size limit the writer falls back, re-encoding everything
//! buffered as PLAIN; the finished chunk then contains PLAIN pages only.

use std::collections::BTreeSet;

use bytes::Bytes;
use log::trace;

use crate::basic::{Compression, Encoding, PageType, Type};
use crate::column::page::{CompressedPage, Page, PageWriteSpec, PageWriter};
use crate::compression::{create_codec, Codec};
use crate::encodings::encoding::{get_encoder, DictEncoder, ValueEncoder};
use crate::encodings::levels::LevelEncoder;
use crate::errors::Result;
use crate::file::metadata::{
    ColumnChunkMetaData, ColumnIndexBuilder, OffsetIndexBuilder,
};
use crate::file::properties::{WriterPropertiesPtr, WriterVersion};
use crate::file::statistics::{stat_bytes, to_thrift as statistics_to_thrift, truncate_max_binary, truncate_min_binary, ValueStatistics};
use crate::format;
use crate::record::value::Value;
use crate::schema::types::ColumnDescPtr;

/// Everything a finished column chunk hands back to the row group.
#[derive(Debug)]
pub struct ColumnCloseResult {
    /// Total bytes written for the chunk, headers included.
    pub bytes_written: u64,
    /// Top-level rows covered by the chunk.
    pub rows_written: u64,
    pub metadata: ColumnChunkMetaData,
    pub column_index: Option<format::ColumnIndex>,
    pub offset_index: Option<format::OffsetIndex>,
}

/// Nominal byte charge of a null triple in the page-size estimator.
const NULL_TRIPLE_SIZE: usize = 4;

// Metrics for the page being accumulated.
#[derive(Default)]
struct PageMetrics {
    num_buffered_values: u32,
    num_buffered_rows: u32,
    num_page_nulls: u64,
    /// Plain-encoded size of the page's values, the page-cut estimator.
    value_bytes: usize,
}

// A cut page whose value body has not been serialized yet. While the
// dictionary is live the values exist only as the index range
// [index_start, index_end) into it; for directly encoded pages the range is
// unused.
struct PendingPage {
    rep_levels: Vec<u8>,
    def_levels: Vec<u8>,
    index_start: usize,
    index_end: usize,
    num_values: u32,
    num_rows: u32,
    num_nulls: u64,
    statistics: Option<ValueStatistics>,
}

/// Writer for one column chunk.
pub struct ColumnChunkWriter<'a> {
    descr: ColumnDescPtr,
    props: WriterPropertiesPtr,
    page_writer: Box<dyn PageWriter + 'a>,
    codec: Compression,
    compressor: Option<Box<dyn Codec>>,

    /// Live while the chunk is still dictionary encoded.
    dict_encoder: Option<DictEncoder>,
    /// First dictionary index belonging to the page being accumulated.
    page_start_index: usize,
    pending_pages: Vec<PendingPage>,
    /// Direct encoder, used from the start for ineligible columns and after
    /// a dictionary fallback.
    encoder: Box<dyn ValueEncoder>,

    def_levels_sink: Vec<i16>,
    rep_levels_sink: Vec<i16>,
    page_metrics: PageMetrics,
    page_statistics: ValueStatistics,
    chunk_statistics: ValueStatistics,

    omit_stats: bool,
    encodings: BTreeSet<Encoding>,
    column_index_builder: ColumnIndexBuilder,
    offset_index_builder: OffsetIndexBuilder,

    total_bytes_written: u64,
    total_rows_written: u64,
    total_uncompressed_size: u64,
    total_compressed_size: u64,
    total_num_values: u64,
    data_page_offset: Option<u64>,
    dictionary_page_offset: Option<u64>,
}

impl<'a> ColumnChunkWriter<'a> {
    pub fn new(
        descr: ColumnDescPtr,
        props: WriterPropertiesPtr,
        page_writer: Box<dyn PageWriter + 'a>,
    ) -> Result<Self> {
        let codec = descr
            .compression()
            .unwrap_or_else(|| props.compression(descr.path()));
        let compressor = create_codec(codec)?;

        let requested_encoding = descr.encoding();
        let use_dictionary = match requested_encoding {
            Some(Encoding::PLAIN_DICTIONARY) | Some(Encoding::RLE_DICTIONARY) | None => {
                descr.dictionary_eligible()
            }
            Some(_) => false,
        };
        let direct_encoding = match requested_encoding {
            Some(Encoding::PLAIN_DICTIONARY) | Some(Encoding::RLE_DICTIONARY) | None => {
                Encoding::PLAIN
            }
            Some(encoding) => encoding,
        };
        let encoder = get_encoder(direct_encoding, descr.physical_type(), descr.type_length())?;
        let dict_encoder = use_dictionary
            .then(|| DictEncoder::new(descr.physical_type(), descr.type_length()));

        let omit_stats = descr.omit_stats();
        let mut column_index_builder = ColumnIndexBuilder::new();
        if props.disable_column_index() {
            column_index_builder.to_invalid();
        }
        if omit_stats {
            column_index_builder.set_null_counts_enabled(false);
        }

        // levels are always RLE encoded
        let mut encodings = BTreeSet::new();
        encodings.insert(Encoding::RLE);

        Ok(Self {
            descr,
            props,
            page_writer,
            codec,
            compressor,
            dict_encoder,
            page_start_index: 0,
            pending_pages: Vec::new(),
            encoder,
            def_levels_sink: Vec::new(),
            rep_levels_sink: Vec::new(),
            page_metrics: PageMetrics::default(),
            page_statistics: ValueStatistics::new(),
            chunk_statistics: ValueStatistics::new(),
            omit_stats,
            encodings,
            column_index_builder,
            offset_index_builder: OffsetIndexBuilder::new(),
            total_bytes_written: 0,
            total_rows_written: 0,
            total_uncompressed_size: 0,
            total_compressed_size: 0,
            total_num_values: 0,
            data_page_offset: None,
            dictionary_page_offset: None,
        })
    }

    /// Writes a batch of triples. `values` holds the non-null values only;
    /// a triple is null iff its definition level is below the maximum.
    /// Returns the number of values consumed.
    pub fn write_batch(
        &mut self,
        values: &[Value],
        def_levels: Option<&[i16]>,
        rep_levels: Option<&[i16]>,
    ) -> Result<usize> {
        let max_def_level = self.descr.max_def_level();
        let max_rep_level = self.descr.max_rep_level();

        if let (Some(def), Some(rep)) = (def_levels, rep_levels) {
            if def.len() != rep.len() {
                return Err(general_err!(
                    "inconsistent level counts: {} definition vs {} repetition",
                    def.len(),
                    rep.len()
                ));
            }
        }
        let num_levels = match (def_levels, rep_levels) {
            (Some(def), _) => def.len(),
            (None, Some(rep)) => rep.len(),
            (None, None) => values.len(),
        };
        if max_def_level > 0 && def_levels.is_none() {
            return Err(general_err!(
                "definition levels are required when max definition level is {}",
                max_def_level
            ));
        }
        if max_rep_level > 0 && rep_levels.is_none() {
            return Err(general_err!(
                "repetition levels are required when max repetition level is {}",
                max_rep_level
            ));
        }

        let mut values_consumed = 0;
        for i in 0..num_levels {
            let def = def_levels.map(|lv| lv[i]).unwrap_or(0);
            let rep = rep_levels.map(|lv| lv[i]).unwrap_or(0);
            if def < 0 || def > max_def_level {
                return Err(general_err!(
                    "definition level {} out of range 0..={}",
                    def,
                    max_def_level
                ));
            }
            if rep < 0 || rep > max_rep_level {
                return Err(general_err!(
                    "repetition level {} out of range 0..={}",
                    rep,
                    max_rep_level
                ));
            }

            if max_rep_level > 0 {
                self.rep_levels_sink.push(rep);
                self.page_metrics.num_buffered_rows += (rep == 0) as u32;
            } else {
                self.page_metrics.num_buffered_rows += 1;
            }
            if max_def_level > 0 {
                self.def_levels_sink.push(def);
            }

            if def == max_def_level {
                let value = values.get(values_consumed).ok_or_else(|| {
                    general_err!(
                        "expected at least {} values, got {}",
                        values_consumed + 1,
                        values.len()
                    )
                })?;
                self.write_value(value)?;
                values_consumed += 1;
            } else {
                self.page_metrics.num_page_nulls += 1;
                // a null triple still occupies a slot; charging it keeps
                // long null runs reaching the page threshold
                self.page_metrics.value_bytes += NULL_TRIPLE_SIZE;
            }
            self.page_metrics.num_buffered_values += 1;

            if self.should_add_data_page() {
                self.add_data_page()?;
            }
        }

        if values_consumed != values.len() {
            return Err(general_err!(
                "expected {} values from the level run, got {}",
                values_consumed,
                values.len()
            ));
        }
        Ok(values_consumed)
    }

    /// Finalizes the chunk: flushes the partial page, writes the dictionary
    /// page and any held-back pages, and assembles the metadata.
    pub fn close(mut self) -> Result<ColumnCloseResult> {
        if self.page_metrics.num_buffered_values > 0 {
            self.add_data_page()?;
        }

        match self.dict_encoder.take() {
            // an all-null or empty chunk gains nothing from a dictionary
            Some(dict) if dict.num_entries() == 0 => {
                self.dict_encoder = Some(dict);
                self.dict_fallback()?;
            }
            Some(dict) => {
                self.write_dictionary_page(&dict)?;
                let pending = std::mem::take(&mut self.pending_pages);
                for page in pending {
                    let body = dict.write_indices(page.index_start, page.index_end)?;
                    self.write_pending_page(page, body, Encoding::PLAIN_DICTIONARY)?;
                }
            }
            None => {}
        }

        let metadata = self.build_column_metadata()?;
        self.page_writer.close()?;

        let (column_index, offset_index) = if self.column_index_builder.valid() {
            (
                Some(self.column_index_builder.build()),
                Some(self.offset_index_builder.build()),
            )
        } else {
            (None, None)
        };

        trace!(
            "closed column chunk {}: {} values, {} bytes",
            metadata.column_descr().path(),
            metadata.num_values(),
            self.total_bytes_written
        );

        Ok(ColumnCloseResult {
            bytes_written: self.total_bytes_written,
            rows_written: self.total_rows_written,
            metadata,
            column_index,
            offset_index,
        })
    }

    fn write_value(&mut self, value: &Value) -> Result<()> {
        if !self.omit_stats {
            self.page_statistics.update(&self.descr, value);
        }
        self.page_metrics.value_bytes += value.plain_size();

        let overflow = match &mut self.dict_encoder {
            Some(dict) => {
                dict.put_one(value)?;
                dict.dict_encoded_size() > self.props.dictionary_page_size_limit()
            }
            None => {
                self.encoder.put(std::slice::from_ref(value))?;
                false
            }
        };
        if overflow {
            self.dict_fallback()?;
        }
        Ok(())
    }

    #[inline]
    fn should_add_data_page(&self) -> bool {
        self.page_metrics.num_buffered_values > 0
            && self.page_metrics.value_bytes >= self.props.page_size()
    }

    /// Cuts the accumulated triples into a page. While the dictionary is
    /// live the page is held back; otherwise it is encoded, compressed and
    /// written immediately.
    fn add_data_page(&mut self) -> Result<()> {
        let num_values = self.page_metrics.num_buffered_values;
        let num_rows = self.page_metrics.num_buffered_rows;
        let num_nulls = self.page_metrics.num_page_nulls;
        let null_page = num_values as u64 == num_nulls;

        let page_statistics = (!self.omit_stats).then(|| {
            let mut statistics = std::mem::take(&mut self.page_statistics);
            statistics.null_count = num_nulls;
            statistics
        });

        self.update_column_index(null_page, page_statistics.as_ref(), num_nulls as i64);
        self.offset_index_builder.append_row_count(num_rows as i64);
        if let Some(statistics) = &page_statistics {
            self.chunk_statistics.merge(&self.descr, statistics);
        }
        self.total_rows_written += num_rows as u64;

        let (rep_levels, def_levels) = self.encode_levels();
        self.rep_levels_sink.clear();
        self.def_levels_sink.clear();
        self.page_metrics = PageMetrics::default();
        self.page_statistics = ValueStatistics::new();

        if let Some(dict) = &self.dict_encoder {
            let index_end = dict.num_indices();
            self.pending_pages.push(PendingPage {
                rep_levels,
                def_levels,
                index_start: self.page_start_index,
                index_end,
                num_values,
                num_rows,
                num_nulls,
                statistics: page_statistics,
            });
            self.page_start_index = index_end;
            return Ok(());
        }

        let values = self.encoder.flush_buffer()?;
        let encoding = self.encoder.encoding();
        let page = PendingPage {
            rep_levels,
            def_levels,
            index_start: 0,
            index_end: 0,
            num_values,
            num_rows,
            num_nulls,
            statistics: page_statistics,
        };
        self.write_pending_page(page, values, encoding)
    }

    /// Assembles, compresses and writes one page from encoded levels and an
    /// encoded value body.
    fn write_pending_page(
        &mut self,
        page: PendingPage,
        values: Bytes,
        encoding: Encoding,
    ) -> Result<()> {
        let statistics =
            page.statistics.as_ref().and_then(|s| statistics_to_thrift(Some(s), self.descr.sort_order()));

        let compressed_page = match self.props.writer_version() {
            WriterVersion::PARQUET_1_0 => {
                let mut buffer = Vec::with_capacity(
                    page.rep_levels.len() + page.def_levels.len() + values.len(),
                );
                buffer.extend_from_slice(&page.rep_levels);
                buffer.extend_from_slice(&page.def_levels);
                buffer.extend_from_slice(&values);
                let uncompressed_size = buffer.len();

                if let Some(compressor) = &mut self.compressor {
                    let mut compressed = Vec::with_capacity(uncompressed_size);
                    compressor.compress(&buffer, &mut compressed)?;
                    buffer = compressed;
                }

                CompressedPage::new(
                    Page::DataPage {
                        buf: buffer.into(),
                        num_values: page.num_values,
                        encoding,
                        def_level_encoding: Encoding::RLE,
                        rep_level_encoding: Encoding::RLE,
                        statistics,
                    },
                    uncompressed_size,
                )
            }
            WriterVersion::PARQUET_2_0 => {
                let rep_levels_byte_len = page.rep_levels.len();
                let def_levels_byte_len = page.def_levels.len();
                let uncompressed_size =
                    rep_levels_byte_len + def_levels_byte_len + values.len();

                let mut buffer = Vec::with_capacity(uncompressed_size);
                buffer.extend_from_slice(&page.rep_levels);
                buffer.extend_from_slice(&page.def_levels);
                match &mut self.compressor {
                    Some(compressor) => compressor.compress(&values, &mut buffer)?,
                    None => buffer.extend_from_slice(&values),
                }

                CompressedPage::new(
                    Page::DataPageV2 {
                        buf: buffer.into(),
                        num_values: page.num_values,
                        encoding,
                        num_nulls: page.num_nulls as u32,
                        num_rows: page.num_rows,
                        def_levels_byte_len: def_levels_byte_len as u32,
                        rep_levels_byte_len: rep_levels_byte_len as u32,
                        is_compressed: self.compressor.is_some(),
                        statistics,
                    },
                    uncompressed_size,
                )
            }
        };

        self.write_data_page(compressed_page)
    }

    fn encode_levels(&self) -> (Vec<u8>, Vec<u8>) {
        let version = self.props.writer_version();
        let encode = |levels: &[i16], max_level: i16| -> Vec<u8> {
            let mut encoder = match version {
                WriterVersion::PARQUET_1_0 => LevelEncoder::v1(max_level, levels.len()),
                WriterVersion::PARQUET_2_0 => LevelEncoder::v2(max_level, levels.len()),
            };
            encoder.put(levels);
            encoder.consume()
        };

        let rep_levels = if self.descr.max_rep_level() > 0 {
            encode(&self.rep_levels_sink, self.descr.max_rep_level())
        } else {
            Vec::new()
        };
        let def_levels = if self.descr.max_def_level() > 0 {
            encode(&self.def_levels_sink, self.descr.max_def_level())
        } else {
            Vec::new()
        };
        (rep_levels, def_levels)
    }

    fn update_column_index(
        &mut self,
        null_page: bool,
        page_statistics: Option<&ValueStatistics>,
        null_count: i64,
    ) {
        if !self.column_index_builder.valid() {
            return;
        }
        if null_page {
            // writers must set the bounds of a null page to the empty string
            self.column_index_builder.append(true, Vec::new(), Vec::new(), null_count);
            return;
        }
        if self.omit_stats {
            self.column_index_builder.append(false, Vec::new(), Vec::new(), null_count);
            return;
        }
        match page_statistics {
            Some(ValueStatistics { min: Some(min), max: Some(max), .. }) => {
                let budget = self.props.column_index_truncate_length();
                let truncate = matches!(
                    self.descr.physical_type(),
                    Type::BYTE_ARRAY | Type::FIXED_LEN_BYTE_ARRAY
                );
                let mut min_bytes = stat_bytes(min);
                let mut max_bytes = stat_bytes(max);
                if truncate {
                    min_bytes = truncate_min_binary(&min_bytes, budget);
                    max_bytes = truncate_max_binary(&max_bytes, budget);
                }
                self.column_index_builder.append(false, min_bytes, max_bytes, null_count);
            }
            // no usable bounds for this page, e.g. INT96
            _ => self.column_index_builder.to_invalid(),
        }
    }

    /// Abandons the dictionary: everything buffered so far is re-encoded as
    /// PLAIN and written out, and the chunk continues with the direct
    /// encoder.
    fn dict_fallback(&mut self) -> Result<()> {
        let Some(dict) = self.dict_encoder.take() else {
            return Ok(());
        };
        trace!(
            "column {} falls back to PLAIN after {} dictionary entries",
            self.descr.path(),
            dict.num_entries()
        );

        let pending = std::mem::take(&mut self.pending_pages);
        for page in pending {
            let mut plain =
                get_encoder(Encoding::PLAIN, self.descr.physical_type(), self.descr.type_length())?;
            for pos in page.index_start..page.index_end {
                plain.put(std::slice::from_ref(dict.value_at_stream(pos)))?;
            }
            let body = plain.flush_buffer()?;
            self.write_pending_page(page, body, Encoding::PLAIN)?;
        }

        // values of the page still being accumulated move to the direct encoder
        for pos in self.page_start_index..dict.num_indices() {
            self.encoder.put(std::slice::from_ref(dict.value_at_stream(pos)))?;
        }
        self.page_start_index = 0;
        Ok(())
    }

    fn write_dictionary_page(&mut self, dict: &DictEncoder) -> Result<()> {
        let body = dict.write_dict()?;
        let uncompressed_size = body.len();
        let buf = match &mut self.compressor {
            Some(compressor) => {
                let mut compressed = Vec::with_capacity(uncompressed_size);
                compressor.compress(&body, &mut compressed)?;
                Bytes::from(compressed)
            }
            None => body,
        };
        let page = CompressedPage::new(
            Page::DictionaryPage {
                buf,
                num_values: dict.num_entries() as u32,
                encoding: Encoding::PLAIN_DICTIONARY,
                is_sorted: false,
            },
            uncompressed_size,
        );
        self.encodings.insert(page.encoding());
        let spec = self.page_writer.write_page(page)?;
        self.update_metrics_for_page(spec);
        Ok(())
    }

    fn write_data_page(&mut self, page: CompressedPage) -> Result<()> {
        self.encodings.insert(page.encoding());
        let spec = self.page_writer.write_page(page)?;
        self.offset_index_builder
            .append_offset_and_size(spec.offset as i64, spec.compressed_size as i32);
        self.update_metrics_for_page(spec);
        Ok(())
    }

    fn update_metrics_for_page(&mut self, spec: PageWriteSpec) {
        self.total_uncompressed_size += spec.uncompressed_size as u64;
        self.total_compressed_size += spec.compressed_size as u64;
        self.total_num_values += spec.num_values as u64;
        self.total_bytes_written += spec.bytes_written;

        match spec.page_type {
            Some(PageType::DATA_PAGE) | Some(PageType::DATA_PAGE_V2) => {
                if self.data_page_offset.is_none() {
                    self.data_page_offset = Some(spec.offset);
                }
            }
            Some(PageType::DICTIONARY_PAGE) => {
                debug_assert!(
                    self.dictionary_page_offset.is_none(),
                    "dictionary page offset is already set"
                );
                self.dictionary_page_offset = Some(spec.offset);
            }
            _ => {}
        }
    }

    fn build_column_metadata(&mut self) -> Result<ColumnChunkMetaData> {
        let statistics = (!self.omit_stats).then(|| self.chunk_statistics.clone());
        ColumnChunkMetaData::builder(self.descr.clone())
            .set_compression(self.codec)
            .set_encodings(self.encodings.iter().copied().collect())
            .set_num_values(self.total_num_values as i64)
            .set_total_uncompressed_size(self.total_uncompressed_size as i64)
            .set_total_compressed_size(self.total_compressed_size as i64)
            .set_data_page_offset(self.data_page_offset.unwrap_or(0) as i64)
            .set_dictionary_page_offset(self.dictionary_page_offset.map(|v| v as i64))
            .set_statistics(statistics)
            .build()
    }
}
