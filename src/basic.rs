//! Rust mappings of the primitive enums in the Parquet format: physical
//! types, logical annotations, repetition, encodings, compression codecs and
//! page types, with the string forms used by tag-annotated schemas.

use std::{fmt, str};

use crate::errors::{Error, Result};

// ----------------------------------------------------------------------
// Physical type

/// The physical type of a leaf column as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(non_camel_case_types)]
pub enum Type {
    BOOLEAN,
    INT32,
    INT64,
    INT96,
    FLOAT,
    DOUBLE,
    BYTE_ARRAY,
    FIXED_LEN_BYTE_ARRAY,
}

impl Type {
    /// Thrift enum value as defined in the format IDL.
    pub fn as_i32(self) -> i32 {
        match self {
            Type::BOOLEAN => 0,
            Type::INT32 => 1,
            Type::INT64 => 2,
            Type::INT96 => 3,
            Type::FLOAT => 4,
            Type::DOUBLE => 5,
            Type::BYTE_ARRAY => 6,
            Type::FIXED_LEN_BYTE_ARRAY => 7,
        }
    }

    pub fn try_from_i32(value: i32) -> Result<Self> {
        Ok(match value {
            0 => Type::BOOLEAN,
            1 => Type::INT32,
            2 => Type::INT64,
            3 => Type::INT96,
            4 => Type::FLOAT,
            5 => Type::DOUBLE,
            6 => Type::BYTE_ARRAY,
            7 => Type::FIXED_LEN_BYTE_ARRAY,
            _ => return Err(general_err!("unexpected physical type {}", value)),
        })
    }
}

// ----------------------------------------------------------------------
// Converted type (legacy logical annotation)

/// Deprecated logical annotation kept for compatibility with older readers.
/// `NONE` stands for an unannotated column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum ConvertedType {
    NONE,
    UTF8,
    MAP,
    MAP_KEY_VALUE,
    LIST,
    ENUM,
    DECIMAL,
    DATE,
    TIME_MILLIS,
    TIME_MICROS,
    TIMESTAMP_MILLIS,
    TIMESTAMP_MICROS,
    UINT_8,
    UINT_16,
    UINT_32,
    UINT_64,
    INT_8,
    INT_16,
    INT_32,
    INT_64,
    JSON,
    BSON,
    INTERVAL,
}

impl ConvertedType {
    /// Thrift enum value, `None` for the unannotated case.
    pub fn as_i32(self) -> Option<i32> {
        match self {
            ConvertedType::NONE => None,
            ConvertedType::UTF8 => Some(0),
            ConvertedType::MAP => Some(1),
            ConvertedType::MAP_KEY_VALUE => Some(2),
            ConvertedType::LIST => Some(3),
            ConvertedType::ENUM => Some(4),
            ConvertedType::DECIMAL => Some(5),
            ConvertedType::DATE => Some(6),
            ConvertedType::TIME_MILLIS => Some(7),
            ConvertedType::TIME_MICROS => Some(8),
            ConvertedType::TIMESTAMP_MILLIS => Some(9),
            ConvertedType::TIMESTAMP_MICROS => Some(10),
            ConvertedType::UINT_8 => Some(11),
            ConvertedType::UINT_16 => Some(12),
            ConvertedType::UINT_32 => Some(13),
            ConvertedType::UINT_64 => Some(14),
            ConvertedType::INT_8 => Some(15),
            ConvertedType::INT_16 => Some(16),
            ConvertedType::INT_32 => Some(17),
            ConvertedType::INT_64 => Some(18),
            ConvertedType::JSON => Some(19),
            ConvertedType::BSON => Some(20),
            ConvertedType::INTERVAL => Some(21),
        }
    }

    pub fn try_from_i32(value: i32) -> Result<Self> {
        Ok(match value {
            0 => ConvertedType::UTF8,
            1 => ConvertedType::MAP,
            2 => ConvertedType::MAP_KEY_VALUE,
            3 => ConvertedType::LIST,
            4 => ConvertedType::ENUM,
            5 => ConvertedType::DECIMAL,
            6 => ConvertedType::DATE,
            7 => ConvertedType::TIME_MILLIS,
            8 => ConvertedType::TIME_MICROS,
            9 => ConvertedType::TIMESTAMP_MILLIS,
            10 => ConvertedType::TIMESTAMP_MICROS,
            11 => ConvertedType::UINT_8,
            12 => ConvertedType::UINT_16,
            13 => ConvertedType::UINT_32,
            14 => ConvertedType::UINT_64,
            15 => ConvertedType::INT_8,
            16 => ConvertedType::INT_16,
            17 => ConvertedType::INT_32,
            18 => ConvertedType::INT_64,
            19 => ConvertedType::JSON,
            20 => ConvertedType::BSON,
            21 => ConvertedType::INTERVAL,
            _ => return Err(general_err!("unexpected converted type {}", value)),
        })
    }
}

// ----------------------------------------------------------------------
// Logical type

/// Time unit for `Time` and `Timestamp` logical types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Millis,
    Micros,
    Nanos,
}

/// Logical annotation of a leaf column, replacing [`ConvertedType`] in
/// current format versions. Only annotations the writer can produce are
/// represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalType {
    String,
    Map,
    List,
    Enum,
    Decimal { scale: i32, precision: i32 },
    Date,
    Time { is_adjusted_to_utc: bool, unit: TimeUnit },
    Timestamp { is_adjusted_to_utc: bool, unit: TimeUnit },
    Integer { bit_width: i8, is_signed: bool },
    Unknown,
    Json,
    Bson,
    Uuid,
}

impl From<LogicalType> for ConvertedType {
    fn from(value: LogicalType) -> Self {
        match value {
            LogicalType::String => ConvertedType::UTF8,
            LogicalType::Map => ConvertedType::MAP,
            LogicalType::List => ConvertedType::LIST,
            LogicalType::Enum => ConvertedType::ENUM,
            LogicalType::Decimal { .. } => ConvertedType::DECIMAL,
            LogicalType::Date => ConvertedType::DATE,
            LogicalType::Time { unit, .. } => match unit {
                TimeUnit::Millis => ConvertedType::TIME_MILLIS,
                _ => ConvertedType::TIME_MICROS,
            },
            LogicalType::Timestamp { unit, .. } => match unit {
                TimeUnit::Millis => ConvertedType::TIMESTAMP_MILLIS,
                _ => ConvertedType::TIMESTAMP_MICROS,
            },
            LogicalType::Integer { bit_width, is_signed } => match (bit_width, is_signed) {
                (8, true) => ConvertedType::INT_8,
                (16, true) => ConvertedType::INT_16,
                (32, true) => ConvertedType::INT_32,
                (64, true) => ConvertedType::INT_64,
                (8, false) => ConvertedType::UINT_8,
                (16, false) => ConvertedType::UINT_16,
                (32, false) => ConvertedType::UINT_32,
                _ => ConvertedType::UINT_64,
            },
            LogicalType::Json => ConvertedType::JSON,
            LogicalType::Bson => ConvertedType::BSON,
            LogicalType::Unknown | LogicalType::Uuid => ConvertedType::NONE,
        }
    }
}

// ----------------------------------------------------------------------
// Repetition

/// Repetition of a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum Repetition {
    REQUIRED,
    OPTIONAL,
    REPEATED,
}

impl Repetition {
    pub fn as_i32(self) -> i32 {
        match self {
            Repetition::REQUIRED => 0,
            Repetition::OPTIONAL => 1,
            Repetition::REPEATED => 2,
        }
    }

    pub fn try_from_i32(value: i32) -> Result<Self> {
        Ok(match value {
            0 => Repetition::REQUIRED,
            1 => Repetition::OPTIONAL,
            2 => Repetition::REPEATED,
            _ => return Err(general_err!("unexpected repetition {}", value)),
        })
    }
}

// ----------------------------------------------------------------------
// Encoding

/// Page value encodings this writer can emit or record in metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(non_camel_case_types)]
pub enum Encoding {
    PLAIN,
    PLAIN_DICTIONARY,
    RLE,
    BIT_PACKED,
    DELTA_BINARY_PACKED,
    DELTA_LENGTH_BYTE_ARRAY,
    DELTA_BYTE_ARRAY,
    RLE_DICTIONARY,
    BYTE_STREAM_SPLIT,
}

impl Encoding {
    pub fn as_i32(self) -> i32 {
        match self {
            Encoding::PLAIN => 0,
            Encoding::PLAIN_DICTIONARY => 2,
            Encoding::RLE => 3,
            Encoding::BIT_PACKED => 4,
            Encoding::DELTA_BINARY_PACKED => 5,
            Encoding::DELTA_LENGTH_BYTE_ARRAY => 6,
            Encoding::DELTA_BYTE_ARRAY => 7,
            Encoding::RLE_DICTIONARY => 8,
            Encoding::BYTE_STREAM_SPLIT => 9,
        }
    }

    pub fn try_from_i32(value: i32) -> Result<Self> {
        Ok(match value {
            0 => Encoding::PLAIN,
            2 => Encoding::PLAIN_DICTIONARY,
            3 => Encoding::RLE,
            4 => Encoding::BIT_PACKED,
            5 => Encoding::DELTA_BINARY_PACKED,
            6 => Encoding::DELTA_LENGTH_BYTE_ARRAY,
            7 => Encoding::DELTA_BYTE_ARRAY,
            8 => Encoding::RLE_DICTIONARY,
            9 => Encoding::BYTE_STREAM_SPLIT,
            _ => return Err(general_err!("unexpected encoding {}", value)),
        })
    }
}

// ----------------------------------------------------------------------
// Compression

/// Compression codec applied to page bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum Compression {
    UNCOMPRESSED,
    SNAPPY,
    GZIP,
    ZSTD,
    LZ4_RAW,
}

impl Compression {
    pub fn as_i32(self) -> i32 {
        match self {
            Compression::UNCOMPRESSED => 0,
            Compression::SNAPPY => 1,
            Compression::GZIP => 2,
            Compression::ZSTD => 6,
            Compression::LZ4_RAW => 7,
        }
    }

    pub fn try_from_i32(value: i32) -> Result<Self> {
        Ok(match value {
            0 => Compression::UNCOMPRESSED,
            1 => Compression::SNAPPY,
            2 => Compression::GZIP,
            6 => Compression::ZSTD,
            7 => Compression::LZ4_RAW,
            _ => return Err(general_err!("unsupported compression codec {}", value)),
        })
    }
}

// ----------------------------------------------------------------------
// Page type

/// Page kinds appearing in a column chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum PageType {
    DATA_PAGE,
    INDEX_PAGE,
    DICTIONARY_PAGE,
    DATA_PAGE_V2,
}

impl PageType {
    pub fn as_i32(self) -> i32 {
        match self {
            PageType::DATA_PAGE => 0,
            PageType::INDEX_PAGE => 1,
            PageType::DICTIONARY_PAGE => 2,
            PageType::DATA_PAGE_V2 => 3,
        }
    }

    pub fn try_from_i32(value: i32) -> Result<Self> {
        Ok(match value {
            0 => PageType::DATA_PAGE,
            1 => PageType::INDEX_PAGE,
            2 => PageType::DICTIONARY_PAGE,
            3 => PageType::DATA_PAGE_V2,
            _ => return Err(general_err!("unexpected page type {}", value)),
        })
    }
}

// ----------------------------------------------------------------------
// Sort order

/// Ordering used when comparing values for statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Signed comparison (integers, IEEE-754 floats, signed decimals).
    Signed,
    /// Unsigned byte-wise or unsigned integer comparison.
    Unsigned,
    /// No defined order; min/max statistics are not produced.
    Undefined,
}

impl SortOrder {
    pub fn is_signed(self) -> bool {
        matches!(self, SortOrder::Signed)
    }
}

/// Resolve the sort order for a column from its annotations, falling back to
/// the physical type's natural order.
pub fn column_sort_order(
    physical_type: Type,
    converted_type: ConvertedType,
    logical_type: Option<LogicalType>,
) -> SortOrder {
    if let Some(logical) = logical_type {
        return match logical {
            LogicalType::String | LogicalType::Enum | LogicalType::Json | LogicalType::Bson => {
                SortOrder::Unsigned
            }
            LogicalType::Integer { is_signed, .. } => {
                if is_signed {
                    SortOrder::Signed
                } else {
                    SortOrder::Unsigned
                }
            }
            LogicalType::Decimal { .. } => SortOrder::Signed,
            LogicalType::Date | LogicalType::Time { .. } | LogicalType::Timestamp { .. } => {
                SortOrder::Signed
            }
            LogicalType::Uuid => SortOrder::Unsigned,
            LogicalType::Map | LogicalType::List | LogicalType::Unknown => SortOrder::Undefined,
        };
    }
    match converted_type {
        ConvertedType::UTF8 | ConvertedType::ENUM | ConvertedType::JSON | ConvertedType::BSON => {
            SortOrder::Unsigned
        }
        ConvertedType::UINT_8
        | ConvertedType::UINT_16
        | ConvertedType::UINT_32
        | ConvertedType::UINT_64 => SortOrder::Unsigned,
        ConvertedType::INT_8
        | ConvertedType::INT_16
        | ConvertedType::INT_32
        | ConvertedType::INT_64
        | ConvertedType::DECIMAL
        | ConvertedType::DATE
        | ConvertedType::TIME_MILLIS
        | ConvertedType::TIME_MICROS
        | ConvertedType::TIMESTAMP_MILLIS
        | ConvertedType::TIMESTAMP_MICROS => SortOrder::Signed,
        ConvertedType::INTERVAL | ConvertedType::MAP | ConvertedType::MAP_KEY_VALUE
        | ConvertedType::LIST => SortOrder::Undefined,
        ConvertedType::NONE => match physical_type {
            Type::BOOLEAN | Type::INT32 | Type::INT64 | Type::FLOAT | Type::DOUBLE => {
                SortOrder::Signed
            }
            Type::BYTE_ARRAY | Type::FIXED_LEN_BYTE_ARRAY => SortOrder::Unsigned,
            Type::INT96 => SortOrder::Undefined,
        },
    }
}

// ----------------------------------------------------------------------
// String forms used by tag-annotated schemas

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl fmt::Display for ConvertedType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl fmt::Display for Repetition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl str::FromStr for Type {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "BOOLEAN" => Type::BOOLEAN,
            "INT32" => Type::INT32,
            "INT64" => Type::INT64,
            "INT96" => Type::INT96,
            "FLOAT" => Type::FLOAT,
            "DOUBLE" => Type::DOUBLE,
            "BYTE_ARRAY" => Type::BYTE_ARRAY,
            "FIXED_LEN_BYTE_ARRAY" => Type::FIXED_LEN_BYTE_ARRAY,
            _ => return Err(schema_err!("unknown physical type {}", s)),
        })
    }
}

impl str::FromStr for ConvertedType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "NONE" => ConvertedType::NONE,
            "UTF8" => ConvertedType::UTF8,
            "MAP" => ConvertedType::MAP,
            "MAP_KEY_VALUE" => ConvertedType::MAP_KEY_VALUE,
            "LIST" => ConvertedType::LIST,
            "ENUM" => ConvertedType::ENUM,
            "DECIMAL" => ConvertedType::DECIMAL,
            "DATE" => ConvertedType::DATE,
            "TIME_MILLIS" => ConvertedType::TIME_MILLIS,
            "TIME_MICROS" => ConvertedType::TIME_MICROS,
            "TIMESTAMP_MILLIS" => ConvertedType::TIMESTAMP_MILLIS,
            "TIMESTAMP_MICROS" => ConvertedType::TIMESTAMP_MICROS,
            "UINT_8" => ConvertedType::UINT_8,
            "UINT_16" => ConvertedType::UINT_16,
            "UINT_32" => ConvertedType::UINT_32,
            "UINT_64" => ConvertedType::UINT_64,
            "INT_8" => ConvertedType::INT_8,
            "INT_16" => ConvertedType::INT_16,
            "INT_32" => ConvertedType::INT_32,
            "INT_64" => ConvertedType::INT_64,
            "JSON" => ConvertedType::JSON,
            "BSON" => ConvertedType::BSON,
            "INTERVAL" => ConvertedType::INTERVAL,
            _ => return Err(schema_err!("unknown converted type {}", s)),
        })
    }
}

impl str::FromStr for Repetition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "REQUIRED" => Repetition::REQUIRED,
            "OPTIONAL" => Repetition::OPTIONAL,
            "REPEATED" => Repetition::REPEATED,
            _ => return Err(schema_err!("unknown repetition type {}", s)),
        })
    }
}

impl str::FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "PLAIN" => Encoding::PLAIN,
            "PLAIN_DICTIONARY" => Encoding::PLAIN_DICTIONARY,
            "RLE" => Encoding::RLE,
            "DELTA_BINARY_PACKED" => Encoding::DELTA_BINARY_PACKED,
            "RLE_DICTIONARY" => Encoding::RLE_DICTIONARY,
            "BYTE_STREAM_SPLIT" => Encoding::BYTE_STREAM_SPLIT,
            _ => return Err(schema_err!("unsupported encoding {}", s)),
        })
    }
}

impl str::FromStr for Compression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "UNCOMPRESSED" => Compression::UNCOMPRESSED,
            "SNAPPY" => Compression::SNAPPY,
            "GZIP" => Compression::GZIP,
            "ZSTD" => Compression::ZSTD,
            "LZ4_RAW" => Compression::LZ4_RAW,
            _ => return Err(schema_err!("unsupported compression codec {}", s)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_string_roundtrip() {
        for t in [
            Type::BOOLEAN,
            Type::INT32,
            Type::INT64,
            Type::INT96,
            Type::FLOAT,
            Type::DOUBLE,
            Type::BYTE_ARRAY,
            Type::FIXED_LEN_BYTE_ARRAY,
        ] {
            assert_eq!(t.to_string().parse::<Type>().unwrap(), t);
            assert_eq!(Type::try_from_i32(t.as_i32()).unwrap(), t);
        }
        assert!("INT65".parse::<Type>().is_err());
    }

    #[test]
    fn test_encoding_ids() {
        // 1 (GROUP_VAR_INT) was never released and must not round-trip
        assert!(Encoding::try_from_i32(1).is_err());
        assert_eq!(Encoding::PLAIN_DICTIONARY.as_i32(), 2);
        assert_eq!(Encoding::RLE_DICTIONARY.as_i32(), 8);
    }

    #[test]
    fn test_compression_ids() {
        assert_eq!(Compression::LZ4_RAW.as_i32(), 7);
        assert_eq!(Compression::ZSTD.as_i32(), 6);
        // 3..=5 (LZO, BROTLI, LZ4 frame) are not supported
        assert!(Compression::try_from_i32(4).is_err());
    }

    #[test]
    fn test_logical_to_converted() {
        assert_eq!(
            ConvertedType::from(LogicalType::Integer { bit_width: 8, is_signed: false }),
            ConvertedType::UINT_8
        );
        assert_eq!(ConvertedType::from(LogicalType::String), ConvertedType::UTF8);
    }

    #[test]
    fn test_sort_order() {
        assert_eq!(
            column_sort_order(Type::BYTE_ARRAY, ConvertedType::UTF8, None),
            SortOrder::Unsigned
        );
        assert_eq!(
            column_sort_order(Type::INT32, ConvertedType::UINT_32, None),
            SortOrder::Unsigned
        );
        assert_eq!(
            column_sort_order(Type::INT96, ConvertedType::NONE, None),
            SortOrder::Undefined
        );
        assert!(column_sort_order(Type::DOUBLE, ConvertedType::NONE, None).is_signed());
    }
}
