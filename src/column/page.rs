//! In-memory page representations passed between the column writer and the
//! page serializer.

use bytes::Bytes;

use crate::basic::{Encoding, PageType};
use crate::errors::Result;
use crate::format;

/// One page of a column chunk, with its body already encoded (and, by the
/// time it reaches a [`PageWriter`], compressed).
#[derive(Debug, Clone)]
pub enum Page {
    DataPage {
        buf: Bytes,
        num_values: u32,
        encoding: Encoding,
        def_level_encoding: Encoding,
        rep_level_encoding: Encoding,
        statistics: Option<format::Statistics>,
    },
    DataPageV2 {
        buf: Bytes,
        num_values: u32,
        encoding: Encoding,
        num_nulls: u32,
        num_rows: u32,
        def_levels_byte_len: u32,
        rep_levels_byte_len: u32,
        is_compressed: bool,
        statistics: Option<format::Statistics>,
    },
    DictionaryPage {
        buf: Bytes,
        num_values: u32,
        encoding: Encoding,
        is_sorted: bool,
    },
}

impl Page {
    pub fn page_type(&self) -> PageType {
        match self {
            Page::DataPage { .. } => PageType::DATA_PAGE,
            Page::DataPageV2 { .. } => PageType::DATA_PAGE_V2,
            Page::DictionaryPage { .. } => PageType::DICTIONARY_PAGE,
        }
    }

    pub fn buffer(&self) -> &Bytes {
        match self {
            Page::DataPage { buf, .. } => buf,
            Page::DataPageV2 { buf, .. } => buf,
            Page::DictionaryPage { buf, .. } => buf,
        }
    }

    pub fn num_values(&self) -> u32 {
        match self {
            Page::DataPage { num_values, .. } => *num_values,
            Page::DataPageV2 { num_values, .. } => *num_values,
            Page::DictionaryPage { num_values, .. } => *num_values,
        }
    }

    pub fn encoding(&self) -> Encoding {
        match self {
            Page::DataPage { encoding, .. } => *encoding,
            Page::DataPageV2 { encoding, .. } => *encoding,
            Page::DictionaryPage { encoding, .. } => *encoding,
        }
    }
}

/// A page whose body has been compressed, remembering the uncompressed body
/// size for the page header.
pub struct CompressedPage {
    compressed_page: Page,
    uncompressed_size: usize,
}

impl CompressedPage {
    pub fn new(compressed_page: Page, uncompressed_size: usize) -> Self {
        Self { compressed_page, uncompressed_size }
    }

    pub fn compressed_page(&self) -> &Page {
        &self.compressed_page
    }

    pub fn uncompressed_size(&self) -> usize {
        self.uncompressed_size
    }

    pub fn compressed_size(&self) -> usize {
        self.compressed_page.buffer().len()
    }

    pub fn num_values(&self) -> u32 {
        self.compressed_page.num_values()
    }

    pub fn encoding(&self) -> Encoding {
        self.compressed_page.encoding()
    }

    pub fn page_type(&self) -> PageType {
        self.compressed_page.page_type()
    }

    pub fn data(&self) -> &[u8] {
        self.compressed_page.buffer()
    }
}

/// Bookkeeping returned for every page written to a sink.
#[derive(Debug, Clone, Default)]
pub struct PageWriteSpec {
    pub page_type: Option<PageType>,
    /// Page size including the serialized header, before compression.
    pub uncompressed_size: usize,
    /// Page size including the serialized header, after compression.
    pub compressed_size: usize,
    pub num_values: u32,
    /// Offset of the page header within the sink.
    pub offset: u64,
    pub bytes_written: u64,
}

impl PageWriteSpec {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Writes compressed pages, headers included, to an underlying sink.
pub trait PageWriter {
    fn write_page(&mut self, page: CompressedPage) -> Result<PageWriteSpec>;

    fn close(&mut self) -> Result<()>;
}
