//! Writer configuration.

use std::collections::HashMap;
use std::sync::Arc;

use crate::basic::Compression;
use crate::errors::Result;
use crate::format::KeyValue;
use crate::schema::types::ColumnPath;

/// Soft page size threshold, in bytes of estimated plain-encoded values.
const DEFAULT_PAGE_SIZE: usize = 8 * 1024;
/// Soft row group threshold, in bytes of estimated raw input.
const DEFAULT_ROW_GROUP_SIZE: usize = 128 * 1024 * 1024;
const DEFAULT_COMPRESSION: Compression = Compression::SNAPPY;
const DEFAULT_DICTIONARY_PAGE_SIZE_LIMIT: usize = 1024 * 1024;
const DEFAULT_NP: usize = 1;
const DEFAULT_WRITER_VERSION: WriterVersion = WriterVersion::PARQUET_1_0;
/// Byte budget for min/max values in the column index; longer values are
/// truncated.
const DEFAULT_COLUMN_INDEX_TRUNCATE_LENGTH: usize = 64;
const DEFAULT_CREATED_BY: &str = concat!("rowshred version ", env!("CARGO_PKG_VERSION"));

/// Reference-counted pointer to writer properties.
pub type WriterPropertiesPtr = Arc<WriterProperties>;

/// The data page layout generation to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum WriterVersion {
    PARQUET_1_0,
    PARQUET_2_0,
}

impl WriterVersion {
    /// The version number written into the footer.
    pub fn as_num(&self) -> i32 {
        match self {
            WriterVersion::PARQUET_1_0 => 1,
            WriterVersion::PARQUET_2_0 => 2,
        }
    }
}

/// Immutable writer settings, built once via [`WriterProperties::builder`]
/// and shared by every column writer.
#[derive(Debug)]
pub struct WriterProperties {
    page_size: usize,
    row_group_size: usize,
    compression: Compression,
    column_compression: HashMap<ColumnPath, Compression>,
    dictionary_page_size_limit: usize,
    np: usize,
    writer_version: WriterVersion,
    disable_column_index: bool,
    column_index_truncate_length: usize,
    created_by: String,
    key_value_metadata: Option<Vec<KeyValue>>,
}

impl WriterProperties {
    pub fn builder() -> WriterPropertiesBuilder {
        WriterPropertiesBuilder::new()
    }

    /// Soft page size threshold in bytes. Only value bytes count toward it;
    /// level bytes do not.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Soft row group threshold in estimated raw input bytes.
    pub fn row_group_size(&self) -> usize {
        self.row_group_size
    }

    /// Codec for `col`, falling back to the writer-wide default.
    pub fn compression(&self, col: &ColumnPath) -> Compression {
        self.column_compression.get(col).copied().unwrap_or(self.compression)
    }

    /// Size at which a growing dictionary forces the chunk back to PLAIN.
    pub fn dictionary_page_size_limit(&self) -> usize {
        self.dictionary_page_size_limit
    }

    /// Worker pool parallelism for row group encoding.
    pub fn np(&self) -> usize {
        self.np
    }

    pub fn writer_version(&self) -> WriterVersion {
        self.writer_version
    }

    /// When set, no column or offset indexes are written.
    pub fn disable_column_index(&self) -> bool {
        self.disable_column_index
    }

    pub fn column_index_truncate_length(&self) -> usize {
        self.column_index_truncate_length
    }

    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    pub fn key_value_metadata(&self) -> Option<&Vec<KeyValue>> {
        self.key_value_metadata.as_ref()
    }
}

/// Builder for [`WriterProperties`].
pub struct WriterPropertiesBuilder {
    page_size: usize,
    row_group_size: usize,
    compression: Compression,
    column_compression: HashMap<ColumnPath, Compression>,
    dictionary_page_size_limit: usize,
    np: usize,
    writer_version: WriterVersion,
    disable_column_index: bool,
    column_index_truncate_length: usize,
    created_by: String,
    key_value_metadata: Option<Vec<KeyValue>>,
}

impl WriterPropertiesBuilder {
    fn new() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
            compression: DEFAULT_COMPRESSION,
            column_compression: HashMap::new(),
            dictionary_page_size_limit: DEFAULT_DICTIONARY_PAGE_SIZE_LIMIT,
            np: DEFAULT_NP,
            writer_version: DEFAULT_WRITER_VERSION,
            disable_column_index: false,
            column_index_truncate_length: DEFAULT_COLUMN_INDEX_TRUNCATE_LENGTH,
            created_by: DEFAULT_CREATED_BY.to_string(),
            key_value_metadata: None,
        }
    }

    pub fn build(self) -> Result<WriterProperties> {
        if self.np == 0 {
            return Err(schema_err!("np must be >= 1"));
        }
        Ok(WriterProperties {
            page_size: self.page_size,
            row_group_size: self.row_group_size,
            compression: self.compression,
            column_compression: self.column_compression,
            dictionary_page_size_limit: self.dictionary_page_size_limit,
            np: self.np,
            writer_version: self.writer_version,
            disable_column_index: self.disable_column_index,
            column_index_truncate_length: self.column_index_truncate_length,
            created_by: self.created_by,
            key_value_metadata: self.key_value_metadata,
        })
    }

    pub fn set_page_size(mut self, value: usize) -> Self {
        self.page_size = value;
        self
    }

    pub fn set_row_group_size(mut self, value: usize) -> Self {
        self.row_group_size = value;
        self
    }

    pub fn set_compression(mut self, value: Compression) -> Self {
        self.compression = value;
        self
    }

    pub fn set_column_compression(mut self, col: ColumnPath, value: Compression) -> Self {
        self.column_compression.insert(col, value);
        self
    }

    pub fn set_dictionary_page_size_limit(mut self, value: usize) -> Self {
        self.dictionary_page_size_limit = value;
        self
    }

    pub fn set_np(mut self, value: usize) -> Self {
        self.np = value;
        self
    }

    pub fn set_writer_version(mut self, value: WriterVersion) -> Self {
        self.writer_version = value;
        self
    }

    pub fn set_disable_column_index(mut self, value: bool) -> Self {
        self.disable_column_index = value;
        self
    }

    pub fn set_column_index_truncate_length(mut self, value: usize) -> Self {
        self.column_index_truncate_length = value;
        self
    }

    pub fn set_created_by(mut self, value: String) -> Self {
        self.created_by = value;
        self
    }

    pub fn set_key_value_metadata(mut self, value: Option<Vec<KeyValue>>) -> Self {
        self.key_value_metadata = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let props = WriterProperties::builder().build().unwrap();
        assert_eq!(props.page_size(), 8 * 1024);
        assert_eq!(props.row_group_size(), 128 * 1024 * 1024);
        assert_eq!(props.np(), 1);
        assert_eq!(props.writer_version(), WriterVersion::PARQUET_1_0);
        assert!(!props.disable_column_index());
        assert!(props.created_by().starts_with("rowshred version"));
        assert_eq!(
            props.compression(&ColumnPath::from("whatever")),
            Compression::SNAPPY
        );
    }

    #[test]
    fn test_zero_np_rejected() {
        assert!(WriterProperties::builder().set_np(0).build().is_err());
    }

    #[test]
    fn test_column_compression_override() {
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .set_column_compression(ColumnPath::from("big"), Compression::ZSTD)
            .build()
            .unwrap();
        assert_eq!(props.compression(&ColumnPath::from("big")), Compression::ZSTD);
        assert_eq!(props.compression(&ColumnPath::from("other")), Compression::SNAPPY);
    }
}
