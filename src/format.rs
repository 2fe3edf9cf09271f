//! The Thrift-defined metadata structures of the Parquet file format, with
//! compact-protocol serialization.
//!
//! Field ids follow the parquet.thrift IDL. Only the structures the write
//! path produces are defined; each also implements [`ReadThrift`] so that
//! written files can be decoded again for verification.

use std::io::Write;

use crate::basic::{
    Compression, ConvertedType, Encoding, LogicalType, PageType, Repetition, TimeUnit, Type,
};
use crate::errors::Result;
use crate::thrift::{
    read_thrift_vec, ElementType, FieldType, ReadThrift, ThriftCompactOutputProtocol,
    ThriftSliceInputProtocol, WriteThrift, WriteThriftField,
};

macro_rules! thrift_enum_impls {
    ($ty:ty) => {
        impl WriteThrift for $ty {
            const ELEMENT_TYPE: ElementType = ElementType::I32;

            fn write_thrift<W: Write>(
                &self,
                writer: &mut ThriftCompactOutputProtocol<W>,
            ) -> Result<()> {
                writer.write_i32(self.as_i32())
            }
        }

        impl WriteThriftField for $ty {
            fn write_thrift_field<W: Write>(
                &self,
                writer: &mut ThriftCompactOutputProtocol<W>,
                field_id: i16,
                last_field_id: i16,
            ) -> Result<i16> {
                writer.write_field_begin(FieldType::I32, field_id, last_field_id)?;
                self.write_thrift(writer)?;
                Ok(field_id)
            }
        }

        impl ReadThrift for $ty {
            fn read_thrift(prot: &mut ThriftSliceInputProtocol<'_>) -> Result<Self> {
                Self::try_from_i32(prot.read_i32()?)
            }
        }
    };
}

thrift_enum_impls!(Type);
thrift_enum_impls!(Repetition);
thrift_enum_impls!(Encoding);
thrift_enum_impls!(Compression);
thrift_enum_impls!(PageType);

// ----------------------------------------------------------------------
// Logical type union

// union TimeUnit { 1: MILLIS 2: MICROS 3: NANOS }
impl WriteThrift for TimeUnit {
    const ELEMENT_TYPE: ElementType = ElementType::Struct;

    fn write_thrift<W: Write>(&self, writer: &mut ThriftCompactOutputProtocol<W>) -> Result<()> {
        let field_id = match self {
            TimeUnit::Millis => 1,
            TimeUnit::Micros => 2,
            TimeUnit::Nanos => 3,
        };
        writer.write_empty_struct(field_id, 0)?;
        writer.write_struct_end()
    }
}

impl ReadThrift for TimeUnit {
    fn read_thrift(prot: &mut ThriftSliceInputProtocol<'_>) -> Result<Self> {
        let ident = prot.read_field_begin(0)?;
        let unit = match ident.id {
            1 => TimeUnit::Millis,
            2 => TimeUnit::Micros,
            3 => TimeUnit::Nanos,
            other => return Err(general_err!("unexpected TimeUnit variant {}", other)),
        };
        prot.skip_empty_struct()?;
        let stop = prot.read_field_begin(ident.id)?;
        if stop.field_type != FieldType::Stop {
            return Err(general_err!("TimeUnit union with more than one variant"));
        }
        Ok(unit)
    }
}

// union LogicalType, with struct payloads for DECIMAL, TIME, TIMESTAMP and
// INTEGER and empty structs for the remaining variants.
impl WriteThrift for LogicalType {
    const ELEMENT_TYPE: ElementType = ElementType::Struct;

    fn write_thrift<W: Write>(&self, writer: &mut ThriftCompactOutputProtocol<W>) -> Result<()> {
        match self {
            LogicalType::String => {
                writer.write_empty_struct(1, 0)?;
            }
            LogicalType::Map => {
                writer.write_empty_struct(2, 0)?;
            }
            LogicalType::List => {
                writer.write_empty_struct(3, 0)?;
            }
            LogicalType::Enum => {
                writer.write_empty_struct(4, 0)?;
            }
            LogicalType::Decimal { scale, precision } => {
                writer.write_field_begin(FieldType::Struct, 5, 0)?;
                scale.write_thrift_field(writer, 1, 0)?;
                precision.write_thrift_field(writer, 2, 1)?;
                writer.write_struct_end()?;
            }
            LogicalType::Date => {
                writer.write_empty_struct(6, 0)?;
            }
            LogicalType::Time { is_adjusted_to_utc, unit } => {
                writer.write_field_begin(FieldType::Struct, 7, 0)?;
                is_adjusted_to_utc.write_thrift_field(writer, 1, 0)?;
                writer.write_field_begin(FieldType::Struct, 2, 1)?;
                unit.write_thrift(writer)?;
                writer.write_struct_end()?;
            }
            LogicalType::Timestamp { is_adjusted_to_utc, unit } => {
                writer.write_field_begin(FieldType::Struct, 8, 0)?;
                is_adjusted_to_utc.write_thrift_field(writer, 1, 0)?;
                writer.write_field_begin(FieldType::Struct, 2, 1)?;
                unit.write_thrift(writer)?;
                writer.write_struct_end()?;
            }
            LogicalType::Integer { bit_width, is_signed } => {
                writer.write_field_begin(FieldType::Struct, 10, 0)?;
                bit_width.write_thrift_field(writer, 1, 0)?;
                is_signed.write_thrift_field(writer, 2, 1)?;
                writer.write_struct_end()?;
            }
            LogicalType::Unknown => {
                writer.write_empty_struct(11, 0)?;
            }
            LogicalType::Json => {
                writer.write_empty_struct(12, 0)?;
            }
            LogicalType::Bson => {
                writer.write_empty_struct(13, 0)?;
            }
            LogicalType::Uuid => {
                writer.write_empty_struct(14, 0)?;
            }
        }
        writer.write_struct_end()
    }
}

impl ReadThrift for LogicalType {
    fn read_thrift(prot: &mut ThriftSliceInputProtocol<'_>) -> Result<Self> {
        let ident = prot.read_field_begin(0)?;
        let logical = match ident.id {
            1 => {
                prot.skip_empty_struct()?;
                LogicalType::String
            }
            2 => {
                prot.skip_empty_struct()?;
                LogicalType::Map
            }
            3 => {
                prot.skip_empty_struct()?;
                LogicalType::List
            }
            4 => {
                prot.skip_empty_struct()?;
                LogicalType::Enum
            }
            5 => {
                let mut scale = 0;
                let mut precision = 0;
                let mut last_field_id = 0i16;
                loop {
                    let field = prot.read_field_begin(last_field_id)?;
                    match field.id {
                        _ if field.field_type == FieldType::Stop => break,
                        1 => scale = prot.read_i32()?,
                        2 => precision = prot.read_i32()?,
                        _ => prot.skip(field.field_type)?,
                    }
                    last_field_id = field.id;
                }
                LogicalType::Decimal { scale, precision }
            }
            6 => {
                prot.skip_empty_struct()?;
                LogicalType::Date
            }
            7 | 8 => {
                let mut is_adjusted_to_utc = false;
                let mut unit = TimeUnit::Millis;
                let mut last_field_id = 0i16;
                loop {
                    let field = prot.read_field_begin(last_field_id)?;
                    match field.id {
                        _ if field.field_type == FieldType::Stop => break,
                        1 => is_adjusted_to_utc = field.bool_val.unwrap_or_default(),
                        2 => unit = TimeUnit::read_thrift(prot)?,
                        _ => prot.skip(field.field_type)?,
                    }
                    last_field_id = field.id;
                }
                if ident.id == 7 {
                    LogicalType::Time { is_adjusted_to_utc, unit }
                } else {
                    LogicalType::Timestamp { is_adjusted_to_utc, unit }
                }
            }
            10 => {
                let mut bit_width = 0i8;
                let mut is_signed = false;
                let mut last_field_id = 0i16;
                loop {
                    let field = prot.read_field_begin(last_field_id)?;
                    match field.id {
                        _ if field.field_type == FieldType::Stop => break,
                        1 => bit_width = prot.read_byte()? as i8,
                        2 => is_signed = field.bool_val.unwrap_or_default(),
                        _ => prot.skip(field.field_type)?,
                    }
                    last_field_id = field.id;
                }
                LogicalType::Integer { bit_width, is_signed }
            }
            11 => {
                prot.skip_empty_struct()?;
                LogicalType::Unknown
            }
            12 => {
                prot.skip_empty_struct()?;
                LogicalType::Json
            }
            13 => {
                prot.skip_empty_struct()?;
                LogicalType::Bson
            }
            14 => {
                prot.skip_empty_struct()?;
                LogicalType::Uuid
            }
            other => return Err(general_err!("unexpected LogicalType variant {}", other)),
        };
        let stop = prot.read_field_begin(ident.id)?;
        if stop.field_type != FieldType::Stop {
            return Err(general_err!("LogicalType union with more than one variant"));
        }
        Ok(logical)
    }
}

impl WriteThriftField for LogicalType {
    fn write_thrift_field<W: Write>(
        &self,
        writer: &mut ThriftCompactOutputProtocol<W>,
        field_id: i16,
        last_field_id: i16,
    ) -> Result<i16> {
        writer.write_field_begin(FieldType::Struct, field_id, last_field_id)?;
        self.write_thrift(writer)?;
        Ok(field_id)
    }
}

// ----------------------------------------------------------------------
// KeyValue

// struct KeyValue {
//   1: required string key
//   2: optional string value
// }
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Option<String>,
}

impl KeyValue {
    pub fn new(key: String, value: impl Into<Option<String>>) -> Self {
        Self { key, value: value.into() }
    }
}

impl WriteThrift for KeyValue {
    const ELEMENT_TYPE: ElementType = ElementType::Struct;

    fn write_thrift<W: Write>(&self, writer: &mut ThriftCompactOutputProtocol<W>) -> Result<()> {
        let last_field_id = self.key.write_thrift_field(writer, 1, 0)?;
        if let Some(value) = &self.value {
            value.write_thrift_field(writer, 2, last_field_id)?;
        }
        writer.write_struct_end()
    }
}

impl ReadThrift for KeyValue {
    fn read_thrift(prot: &mut ThriftSliceInputProtocol<'_>) -> Result<Self> {
        let mut key = None;
        let mut value = None;
        let mut last_field_id = 0i16;
        loop {
            let field = prot.read_field_begin(last_field_id)?;
            if field.field_type == FieldType::Stop {
                break;
            }
            match field.id {
                1 => key = Some(prot.read_string()?),
                2 => value = Some(prot.read_string()?),
                _ => prot.skip(field.field_type)?,
            }
            last_field_id = field.id;
        }
        Ok(Self {
            key: key.ok_or_else(|| general_err!("KeyValue missing key"))?,
            value,
        })
    }
}

// ----------------------------------------------------------------------
// SchemaElement

// struct SchemaElement {
//   1: optional Type type;
//   2: optional i32 type_length;
//   3: optional FieldRepetitionType repetition_type;
//   4: required string name;
//   5: optional i32 num_children;
//   6: optional ConvertedType converted_type;
//   7: optional i32 scale
//   8: optional i32 precision
//   9: optional i32 field_id;
//   10: optional LogicalType logicalType
// }
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaElement {
    pub type_: Option<Type>,
    pub type_length: Option<i32>,
    pub repetition_type: Option<Repetition>,
    pub name: String,
    pub num_children: Option<i32>,
    pub converted_type: Option<ConvertedType>,
    pub scale: Option<i32>,
    pub precision: Option<i32>,
    pub field_id: Option<i32>,
    pub logical_type: Option<LogicalType>,
}

impl WriteThrift for SchemaElement {
    const ELEMENT_TYPE: ElementType = ElementType::Struct;

    fn write_thrift<W: Write>(&self, writer: &mut ThriftCompactOutputProtocol<W>) -> Result<()> {
        let mut last_field_id = 0i16;
        if let Some(t) = self.type_ {
            last_field_id = t.write_thrift_field(writer, 1, last_field_id)?;
        }
        if let Some(len) = self.type_length {
            last_field_id = len.write_thrift_field(writer, 2, last_field_id)?;
        }
        if let Some(rep) = self.repetition_type {
            last_field_id = rep.write_thrift_field(writer, 3, last_field_id)?;
        }
        last_field_id = self.name.write_thrift_field(writer, 4, last_field_id)?;
        if let Some(n) = self.num_children {
            last_field_id = n.write_thrift_field(writer, 5, last_field_id)?;
        }
        if let Some(ct) = self.converted_type {
            if let Some(id) = ct.as_i32() {
                writer.write_field_begin(FieldType::I32, 6, last_field_id)?;
                writer.write_i32(id)?;
                last_field_id = 6;
            }
        }
        if let Some(scale) = self.scale {
            last_field_id = scale.write_thrift_field(writer, 7, last_field_id)?;
        }
        if let Some(precision) = self.precision {
            last_field_id = precision.write_thrift_field(writer, 8, last_field_id)?;
        }
        if let Some(id) = self.field_id {
            last_field_id = id.write_thrift_field(writer, 9, last_field_id)?;
        }
        if let Some(logical) = &self.logical_type {
            logical.write_thrift_field(writer, 10, last_field_id)?;
        }
        writer.write_struct_end()
    }
}

impl ReadThrift for SchemaElement {
    fn read_thrift(prot: &mut ThriftSliceInputProtocol<'_>) -> Result<Self> {
        let mut element = SchemaElement {
            type_: None,
            type_length: None,
            repetition_type: None,
            name: String::new(),
            num_children: None,
            converted_type: None,
            scale: None,
            precision: None,
            field_id: None,
            logical_type: None,
        };
        let mut last_field_id = 0i16;
        loop {
            let field = prot.read_field_begin(last_field_id)?;
            if field.field_type == FieldType::Stop {
                break;
            }
            match field.id {
                1 => element.type_ = Some(Type::read_thrift(prot)?),
                2 => element.type_length = Some(prot.read_i32()?),
                3 => element.repetition_type = Some(Repetition::read_thrift(prot)?),
                4 => element.name = prot.read_string()?,
                5 => element.num_children = Some(prot.read_i32()?),
                6 => element.converted_type = Some(ConvertedType::try_from_i32(prot.read_i32()?)?),
                7 => element.scale = Some(prot.read_i32()?),
                8 => element.precision = Some(prot.read_i32()?),
                9 => element.field_id = Some(prot.read_i32()?),
                10 => element.logical_type = Some(LogicalType::read_thrift(prot)?),
                _ => prot.skip(field.field_type)?,
            }
            last_field_id = field.id;
        }
        Ok(element)
    }
}

// ----------------------------------------------------------------------
// Statistics

// struct Statistics {
//   1: optional binary max;
//   2: optional binary min;
//   3: optional i64 null_count;
//   4: optional i64 distinct_count;
//   5: optional binary max_value;
//   6: optional binary min_value;
// }
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statistics {
    pub max: Option<Vec<u8>>,
    pub min: Option<Vec<u8>>,
    pub null_count: Option<i64>,
    pub distinct_count: Option<i64>,
    pub max_value: Option<Vec<u8>>,
    pub min_value: Option<Vec<u8>>,
}

impl WriteThrift for Statistics {
    const ELEMENT_TYPE: ElementType = ElementType::Struct;

    fn write_thrift<W: Write>(&self, writer: &mut ThriftCompactOutputProtocol<W>) -> Result<()> {
        let mut last_field_id = 0i16;
        if let Some(max) = &self.max {
            last_field_id = max.as_slice().write_thrift_field(writer, 1, last_field_id)?;
        }
        if let Some(min) = &self.min {
            last_field_id = min.as_slice().write_thrift_field(writer, 2, last_field_id)?;
        }
        if let Some(null_count) = self.null_count {
            last_field_id = null_count.write_thrift_field(writer, 3, last_field_id)?;
        }
        if let Some(distinct_count) = self.distinct_count {
            last_field_id = distinct_count.write_thrift_field(writer, 4, last_field_id)?;
        }
        if let Some(max_value) = &self.max_value {
            last_field_id = max_value.as_slice().write_thrift_field(writer, 5, last_field_id)?;
        }
        if let Some(min_value) = &self.min_value {
            min_value.as_slice().write_thrift_field(writer, 6, last_field_id)?;
        }
        writer.write_struct_end()
    }
}

impl ReadThrift for Statistics {
    fn read_thrift(prot: &mut ThriftSliceInputProtocol<'_>) -> Result<Self> {
        let mut stats = Statistics::default();
        let mut last_field_id = 0i16;
        loop {
            let field = prot.read_field_begin(last_field_id)?;
            if field.field_type == FieldType::Stop {
                break;
            }
            match field.id {
                1 => stats.max = Some(prot.read_bytes()?.to_vec()),
                2 => stats.min = Some(prot.read_bytes()?.to_vec()),
                3 => stats.null_count = Some(prot.read_i64()?),
                4 => stats.distinct_count = Some(prot.read_i64()?),
                5 => stats.max_value = Some(prot.read_bytes()?.to_vec()),
                6 => stats.min_value = Some(prot.read_bytes()?.to_vec()),
                _ => prot.skip(field.field_type)?,
            }
            last_field_id = field.id;
        }
        Ok(stats)
    }
}

impl WriteThriftField for Statistics {
    fn write_thrift_field<W: Write>(
        &self,
        writer: &mut ThriftCompactOutputProtocol<W>,
        field_id: i16,
        last_field_id: i16,
    ) -> Result<i16> {
        writer.write_field_begin(FieldType::Struct, field_id, last_field_id)?;
        self.write_thrift(writer)?;
        Ok(field_id)
    }
}

// ----------------------------------------------------------------------
// Page headers

#[derive(Debug, Clone, PartialEq)]
pub struct DataPageHeader {
    pub num_values: i32,
    pub encoding: Encoding,
    pub definition_level_encoding: Encoding,
    pub repetition_level_encoding: Encoding,
    pub statistics: Option<Statistics>,
}

impl WriteThrift for DataPageHeader {
    const ELEMENT_TYPE: ElementType = ElementType::Struct;

    fn write_thrift<W: Write>(&self, writer: &mut ThriftCompactOutputProtocol<W>) -> Result<()> {
        self.num_values.write_thrift_field(writer, 1, 0)?;
        self.encoding.write_thrift_field(writer, 2, 1)?;
        self.definition_level_encoding.write_thrift_field(writer, 3, 2)?;
        let last_field_id = self.repetition_level_encoding.write_thrift_field(writer, 4, 3)?;
        if let Some(statistics) = &self.statistics {
            statistics.write_thrift_field(writer, 5, last_field_id)?;
        }
        writer.write_struct_end()
    }
}

impl ReadThrift for DataPageHeader {
    fn read_thrift(prot: &mut ThriftSliceInputProtocol<'_>) -> Result<Self> {
        let mut header = DataPageHeader {
            num_values: 0,
            encoding: Encoding::PLAIN,
            definition_level_encoding: Encoding::RLE,
            repetition_level_encoding: Encoding::RLE,
            statistics: None,
        };
        let mut last_field_id = 0i16;
        loop {
            let field = prot.read_field_begin(last_field_id)?;
            if field.field_type == FieldType::Stop {
                break;
            }
            match field.id {
                1 => header.num_values = prot.read_i32()?,
                2 => header.encoding = Encoding::read_thrift(prot)?,
                3 => header.definition_level_encoding = Encoding::read_thrift(prot)?,
                4 => header.repetition_level_encoding = Encoding::read_thrift(prot)?,
                5 => header.statistics = Some(Statistics::read_thrift(prot)?),
                _ => prot.skip(field.field_type)?,
            }
            last_field_id = field.id;
        }
        Ok(header)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DictionaryPageHeader {
    pub num_values: i32,
    pub encoding: Encoding,
    pub is_sorted: Option<bool>,
}

impl WriteThrift for DictionaryPageHeader {
    const ELEMENT_TYPE: ElementType = ElementType::Struct;

    fn write_thrift<W: Write>(&self, writer: &mut ThriftCompactOutputProtocol<W>) -> Result<()> {
        self.num_values.write_thrift_field(writer, 1, 0)?;
        let last_field_id = self.encoding.write_thrift_field(writer, 2, 1)?;
        if let Some(is_sorted) = self.is_sorted {
            is_sorted.write_thrift_field(writer, 3, last_field_id)?;
        }
        writer.write_struct_end()
    }
}

impl ReadThrift for DictionaryPageHeader {
    fn read_thrift(prot: &mut ThriftSliceInputProtocol<'_>) -> Result<Self> {
        let mut header =
            DictionaryPageHeader { num_values: 0, encoding: Encoding::PLAIN, is_sorted: None };
        let mut last_field_id = 0i16;
        loop {
            let field = prot.read_field_begin(last_field_id)?;
            if field.field_type == FieldType::Stop {
                break;
            }
            match field.id {
                1 => header.num_values = prot.read_i32()?,
                2 => header.encoding = Encoding::read_thrift(prot)?,
                3 => header.is_sorted = field.bool_val,
                _ => prot.skip(field.field_type)?,
            }
            last_field_id = field.id;
        }
        Ok(header)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataPageHeaderV2 {
    pub num_values: i32,
    pub num_nulls: i32,
    pub num_rows: i32,
    pub encoding: Encoding,
    pub definition_levels_byte_length: i32,
    pub repetition_levels_byte_length: i32,
    pub is_compressed: Option<bool>,
    pub statistics: Option<Statistics>,
}

impl WriteThrift for DataPageHeaderV2 {
    const ELEMENT_TYPE: ElementType = ElementType::Struct;

    fn write_thrift<W: Write>(&self, writer: &mut ThriftCompactOutputProtocol<W>) -> Result<()> {
        self.num_values.write_thrift_field(writer, 1, 0)?;
        self.num_nulls.write_thrift_field(writer, 2, 1)?;
        self.num_rows.write_thrift_field(writer, 3, 2)?;
        self.encoding.write_thrift_field(writer, 4, 3)?;
        self.definition_levels_byte_length.write_thrift_field(writer, 5, 4)?;
        let mut last_field_id =
            self.repetition_levels_byte_length.write_thrift_field(writer, 6, 5)?;
        if let Some(is_compressed) = self.is_compressed {
            last_field_id = is_compressed.write_thrift_field(writer, 7, last_field_id)?;
        }
        if let Some(statistics) = &self.statistics {
            statistics.write_thrift_field(writer, 8, last_field_id)?;
        }
        writer.write_struct_end()
    }
}

impl ReadThrift for DataPageHeaderV2 {
    fn read_thrift(prot: &mut ThriftSliceInputProtocol<'_>) -> Result<Self> {
        let mut header = DataPageHeaderV2 {
            num_values: 0,
            num_nulls: 0,
            num_rows: 0,
            encoding: Encoding::PLAIN,
            definition_levels_byte_length: 0,
            repetition_levels_byte_length: 0,
            is_compressed: None,
            statistics: None,
        };
        let mut last_field_id = 0i16;
        loop {
            let field = prot.read_field_begin(last_field_id)?;
            if field.field_type == FieldType::Stop {
                break;
            }
            match field.id {
                1 => header.num_values = prot.read_i32()?,
                2 => header.num_nulls = prot.read_i32()?,
                3 => header.num_rows = prot.read_i32()?,
                4 => header.encoding = Encoding::read_thrift(prot)?,
                5 => header.definition_levels_byte_length = prot.read_i32()?,
                6 => header.repetition_levels_byte_length = prot.read_i32()?,
                7 => header.is_compressed = field.bool_val,
                8 => header.statistics = Some(Statistics::read_thrift(prot)?),
                _ => prot.skip(field.field_type)?,
            }
            last_field_id = field.id;
        }
        Ok(header)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageHeader {
    pub type_: PageType,
    pub uncompressed_page_size: i32,
    pub compressed_page_size: i32,
    pub crc: Option<i32>,
    pub data_page_header: Option<DataPageHeader>,
    pub dictionary_page_header: Option<DictionaryPageHeader>,
    pub data_page_header_v2: Option<DataPageHeaderV2>,
}

impl WriteThrift for PageHeader {
    const ELEMENT_TYPE: ElementType = ElementType::Struct;

    fn write_thrift<W: Write>(&self, writer: &mut ThriftCompactOutputProtocol<W>) -> Result<()> {
        self.type_.write_thrift_field(writer, 1, 0)?;
        self.uncompressed_page_size.write_thrift_field(writer, 2, 1)?;
        let mut last_field_id = self.compressed_page_size.write_thrift_field(writer, 3, 2)?;
        if let Some(crc) = self.crc {
            last_field_id = crc.write_thrift_field(writer, 4, last_field_id)?;
        }
        if let Some(header) = &self.data_page_header {
            writer.write_field_begin(FieldType::Struct, 5, last_field_id)?;
            header.write_thrift(writer)?;
            last_field_id = 5;
        }
        if let Some(header) = &self.dictionary_page_header {
            writer.write_field_begin(FieldType::Struct, 7, last_field_id)?;
            header.write_thrift(writer)?;
            last_field_id = 7;
        }
        if let Some(header) = &self.data_page_header_v2 {
            writer.write_field_begin(FieldType::Struct, 8, last_field_id)?;
            header.write_thrift(writer)?;
        }
        writer.write_struct_end()
    }
}

impl ReadThrift for PageHeader {
    fn read_thrift(prot: &mut ThriftSliceInputProtocol<'_>) -> Result<Self> {
        let mut header = PageHeader {
            type_: PageType::DATA_PAGE,
            uncompressed_page_size: 0,
            compressed_page_size: 0,
            crc: None,
            data_page_header: None,
            dictionary_page_header: None,
            data_page_header_v2: None,
        };
        let mut last_field_id = 0i16;
        loop {
            let field = prot.read_field_begin(last_field_id)?;
            if field.field_type == FieldType::Stop {
                break;
            }
            match field.id {
                1 => header.type_ = PageType::read_thrift(prot)?,
                2 => header.uncompressed_page_size = prot.read_i32()?,
                3 => header.compressed_page_size = prot.read_i32()?,
                4 => header.crc = Some(prot.read_i32()?),
                5 => header.data_page_header = Some(DataPageHeader::read_thrift(prot)?),
                7 => {
                    header.dictionary_page_header = Some(DictionaryPageHeader::read_thrift(prot)?)
                }
                8 => header.data_page_header_v2 = Some(DataPageHeaderV2::read_thrift(prot)?),
                _ => prot.skip(field.field_type)?,
            }
            last_field_id = field.id;
        }
        Ok(header)
    }
}

// ----------------------------------------------------------------------
// Column chunk and row group

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetaData {
    pub type_: Type,
    pub encodings: Vec<Encoding>,
    pub path_in_schema: Vec<String>,
    pub codec: Compression,
    pub num_values: i64,
    pub total_uncompressed_size: i64,
    pub total_compressed_size: i64,
    pub data_page_offset: i64,
    pub index_page_offset: Option<i64>,
    pub dictionary_page_offset: Option<i64>,
    pub statistics: Option<Statistics>,
}

impl WriteThrift for ColumnMetaData {
    const ELEMENT_TYPE: ElementType = ElementType::Struct;

    fn write_thrift<W: Write>(&self, writer: &mut ThriftCompactOutputProtocol<W>) -> Result<()> {
        self.type_.write_thrift_field(writer, 1, 0)?;
        self.encodings.write_thrift_field(writer, 2, 1)?;
        writer.write_field_begin(FieldType::List, 3, 2)?;
        writer.write_list_begin(ElementType::Binary, self.path_in_schema.len())?;
        for part in &self.path_in_schema {
            writer.write_bytes(part.as_bytes())?;
        }
        self.codec.write_thrift_field(writer, 4, 3)?;
        self.num_values.write_thrift_field(writer, 5, 4)?;
        self.total_uncompressed_size.write_thrift_field(writer, 6, 5)?;
        self.total_compressed_size.write_thrift_field(writer, 7, 6)?;
        let mut last_field_id = self.data_page_offset.write_thrift_field(writer, 9, 7)?;
        if let Some(offset) = self.index_page_offset {
            last_field_id = offset.write_thrift_field(writer, 10, last_field_id)?;
        }
        if let Some(offset) = self.dictionary_page_offset {
            last_field_id = offset.write_thrift_field(writer, 11, last_field_id)?;
        }
        if let Some(statistics) = &self.statistics {
            statistics.write_thrift_field(writer, 12, last_field_id)?;
        }
        writer.write_struct_end()
    }
}

impl ReadThrift for ColumnMetaData {
    fn read_thrift(prot: &mut ThriftSliceInputProtocol<'_>) -> Result<Self> {
        let mut meta = ColumnMetaData {
            type_: Type::BOOLEAN,
            encodings: Vec::new(),
            path_in_schema: Vec::new(),
            codec: Compression::UNCOMPRESSED,
            num_values: 0,
            total_uncompressed_size: 0,
            total_compressed_size: 0,
            data_page_offset: 0,
            index_page_offset: None,
            dictionary_page_offset: None,
            statistics: None,
        };
        let mut last_field_id = 0i16;
        loop {
            let field = prot.read_field_begin(last_field_id)?;
            if field.field_type == FieldType::Stop {
                break;
            }
            match field.id {
                1 => meta.type_ = Type::read_thrift(prot)?,
                2 => meta.encodings = read_thrift_vec::<Encoding>(prot)?,
                3 => meta.path_in_schema = read_thrift_vec::<String>(prot)?,
                4 => meta.codec = Compression::read_thrift(prot)?,
                5 => meta.num_values = prot.read_i64()?,
                6 => meta.total_uncompressed_size = prot.read_i64()?,
                7 => meta.total_compressed_size = prot.read_i64()?,
                9 => meta.data_page_offset = prot.read_i64()?,
                10 => meta.index_page_offset = Some(prot.read_i64()?),
                11 => meta.dictionary_page_offset = Some(prot.read_i64()?),
                12 => meta.statistics = Some(Statistics::read_thrift(prot)?),
                _ => prot.skip(field.field_type)?,
            }
            last_field_id = field.id;
        }
        Ok(meta)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnChunk {
    pub file_path: Option<String>,
    pub file_offset: i64,
    pub meta_data: Option<ColumnMetaData>,
    pub offset_index_offset: Option<i64>,
    pub offset_index_length: Option<i32>,
    pub column_index_offset: Option<i64>,
    pub column_index_length: Option<i32>,
}

impl WriteThrift for ColumnChunk {
    const ELEMENT_TYPE: ElementType = ElementType::Struct;

    fn write_thrift<W: Write>(&self, writer: &mut ThriftCompactOutputProtocol<W>) -> Result<()> {
        let mut last_field_id = 0i16;
        if let Some(path) = &self.file_path {
            last_field_id = path.write_thrift_field(writer, 1, last_field_id)?;
        }
        last_field_id = self.file_offset.write_thrift_field(writer, 2, last_field_id)?;
        if let Some(meta) = &self.meta_data {
            writer.write_field_begin(FieldType::Struct, 3, last_field_id)?;
            meta.write_thrift(writer)?;
            last_field_id = 3;
        }
        if let Some(offset) = self.offset_index_offset {
            last_field_id = offset.write_thrift_field(writer, 4, last_field_id)?;
        }
        if let Some(len) = self.offset_index_length {
            last_field_id = len.write_thrift_field(writer, 5, last_field_id)?;
        }
        if let Some(offset) = self.column_index_offset {
            last_field_id = offset.write_thrift_field(writer, 6, last_field_id)?;
        }
        if let Some(len) = self.column_index_length {
            len.write_thrift_field(writer, 7, last_field_id)?;
        }
        writer.write_struct_end()
    }
}

impl ReadThrift for ColumnChunk {
    fn read_thrift(prot: &mut ThriftSliceInputProtocol<'_>) -> Result<Self> {
        let mut chunk = ColumnChunk {
            file_path: None,
            file_offset: 0,
            meta_data: None,
            offset_index_offset: None,
            offset_index_length: None,
            column_index_offset: None,
            column_index_length: None,
        };
        let mut last_field_id = 0i16;
        loop {
            let field = prot.read_field_begin(last_field_id)?;
            if field.field_type == FieldType::Stop {
                break;
            }
            match field.id {
                1 => chunk.file_path = Some(prot.read_string()?),
                2 => chunk.file_offset = prot.read_i64()?,
                3 => chunk.meta_data = Some(ColumnMetaData::read_thrift(prot)?),
                4 => chunk.offset_index_offset = Some(prot.read_i64()?),
                5 => chunk.offset_index_length = Some(prot.read_i32()?),
                6 => chunk.column_index_offset = Some(prot.read_i64()?),
                7 => chunk.column_index_length = Some(prot.read_i32()?),
                _ => prot.skip(field.field_type)?,
            }
            last_field_id = field.id;
        }
        Ok(chunk)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowGroup {
    pub columns: Vec<ColumnChunk>,
    pub total_byte_size: i64,
    pub num_rows: i64,
    pub file_offset: Option<i64>,
    pub total_compressed_size: Option<i64>,
    pub ordinal: Option<i16>,
}

impl WriteThrift for RowGroup {
    const ELEMENT_TYPE: ElementType = ElementType::Struct;

    fn write_thrift<W: Write>(&self, writer: &mut ThriftCompactOutputProtocol<W>) -> Result<()> {
        self.columns.write_thrift_field(writer, 1, 0)?;
        self.total_byte_size.write_thrift_field(writer, 2, 1)?;
        let mut last_field_id = self.num_rows.write_thrift_field(writer, 3, 2)?;
        if let Some(offset) = self.file_offset {
            last_field_id = offset.write_thrift_field(writer, 5, last_field_id)?;
        }
        if let Some(size) = self.total_compressed_size {
            last_field_id = size.write_thrift_field(writer, 6, last_field_id)?;
        }
        if let Some(ordinal) = self.ordinal {
            ordinal.write_thrift_field(writer, 7, last_field_id)?;
        }
        writer.write_struct_end()
    }
}

impl ReadThrift for RowGroup {
    fn read_thrift(prot: &mut ThriftSliceInputProtocol<'_>) -> Result<Self> {
        let mut group = RowGroup {
            columns: Vec::new(),
            total_byte_size: 0,
            num_rows: 0,
            file_offset: None,
            total_compressed_size: None,
            ordinal: None,
        };
        let mut last_field_id = 0i16;
        loop {
            let field = prot.read_field_begin(last_field_id)?;
            if field.field_type == FieldType::Stop {
                break;
            }
            match field.id {
                1 => group.columns = read_thrift_vec::<ColumnChunk>(prot)?,
                2 => group.total_byte_size = prot.read_i64()?,
                3 => group.num_rows = prot.read_i64()?,
                5 => group.file_offset = Some(prot.read_i64()?),
                6 => group.total_compressed_size = Some(prot.read_i64()?),
                7 => group.ordinal = Some(prot.read_i16()?),
                _ => prot.skip(field.field_type)?,
            }
            last_field_id = field.id;
        }
        Ok(group)
    }
}

// ----------------------------------------------------------------------
// Column orders

/// Ordering of statistics values within a column. The only defined variant
/// defers to the column's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnOrder {
    TypeDefinedOrder,
}

impl WriteThrift for ColumnOrder {
    const ELEMENT_TYPE: ElementType = ElementType::Struct;

    fn write_thrift<W: Write>(&self, writer: &mut ThriftCompactOutputProtocol<W>) -> Result<()> {
        writer.write_empty_struct(1, 0)?;
        writer.write_struct_end()
    }
}

impl ReadThrift for ColumnOrder {
    fn read_thrift(prot: &mut ThriftSliceInputProtocol<'_>) -> Result<Self> {
        let ident = prot.read_field_begin(0)?;
        if ident.id != 1 {
            return Err(general_err!("unexpected ColumnOrder variant {}", ident.id));
        }
        prot.skip_empty_struct()?;
        let stop = prot.read_field_begin(ident.id)?;
        if stop.field_type != FieldType::Stop {
            return Err(general_err!("ColumnOrder union with more than one variant"));
        }
        Ok(ColumnOrder::TypeDefinedOrder)
    }
}

// ----------------------------------------------------------------------
// File metadata

#[derive(Debug, Clone, PartialEq)]
pub struct FileMetaData {
    pub version: i32,
    pub schema: Vec<SchemaElement>,
    pub num_rows: i64,
    pub row_groups: Vec<RowGroup>,
    pub key_value_metadata: Option<Vec<KeyValue>>,
    pub created_by: Option<String>,
    pub column_orders: Option<Vec<ColumnOrder>>,
}

impl WriteThrift for FileMetaData {
    const ELEMENT_TYPE: ElementType = ElementType::Struct;

    fn write_thrift<W: Write>(&self, writer: &mut ThriftCompactOutputProtocol<W>) -> Result<()> {
        self.version.write_thrift_field(writer, 1, 0)?;
        self.schema.write_thrift_field(writer, 2, 1)?;
        self.num_rows.write_thrift_field(writer, 3, 2)?;
        let mut last_field_id = self.row_groups.write_thrift_field(writer, 4, 3)?;
        if let Some(kvs) = &self.key_value_metadata {
            last_field_id = kvs.write_thrift_field(writer, 5, last_field_id)?;
        }
        if let Some(created_by) = &self.created_by {
            last_field_id = created_by.write_thrift_field(writer, 6, last_field_id)?;
        }
        if let Some(orders) = &self.column_orders {
            orders.write_thrift_field(writer, 7, last_field_id)?;
        }
        writer.write_struct_end()
    }
}

impl ReadThrift for FileMetaData {
    fn read_thrift(prot: &mut ThriftSliceInputProtocol<'_>) -> Result<Self> {
        let mut meta = FileMetaData {
            version: 0,
            schema: Vec::new(),
            num_rows: 0,
            row_groups: Vec::new(),
            key_value_metadata: None,
            created_by: None,
            column_orders: None,
        };
        let mut last_field_id = 0i16;
        loop {
            let field = prot.read_field_begin(last_field_id)?;
            if field.field_type == FieldType::Stop {
                break;
            }
            match field.id {
                1 => meta.version = prot.read_i32()?,
                2 => meta.schema = read_thrift_vec::<SchemaElement>(prot)?,
                3 => meta.num_rows = prot.read_i64()?,
                4 => meta.row_groups = read_thrift_vec::<RowGroup>(prot)?,
                5 => meta.key_value_metadata = Some(read_thrift_vec::<KeyValue>(prot)?),
                6 => meta.created_by = Some(prot.read_string()?),
                7 => meta.column_orders = Some(read_thrift_vec::<ColumnOrder>(prot)?),
                _ => prot.skip(field.field_type)?,
            }
            last_field_id = field.id;
        }
        Ok(meta)
    }
}

// ----------------------------------------------------------------------
// Page indexes

/// Ordering of min/max values across the pages of a column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryOrder {
    Unordered,
    Ascending,
    Descending,
}

impl BoundaryOrder {
    pub fn as_i32(self) -> i32 {
        match self {
            BoundaryOrder::Unordered => 0,
            BoundaryOrder::Ascending => 1,
            BoundaryOrder::Descending => 2,
        }
    }

    pub fn try_from_i32(value: i32) -> Result<Self> {
        Ok(match value {
            0 => BoundaryOrder::Unordered,
            1 => BoundaryOrder::Ascending,
            2 => BoundaryOrder::Descending,
            _ => return Err(general_err!("unexpected boundary order {}", value)),
        })
    }
}

thrift_enum_impls!(BoundaryOrder);

#[derive(Debug, Clone, PartialEq)]
pub struct PageLocation {
    /// File offset of the page's header.
    pub offset: i64,
    /// Compressed page size, header included.
    pub compressed_page_size: i32,
    /// Row index within the row group of the page's first top-level row.
    pub first_row_index: i64,
}

impl WriteThrift for PageLocation {
    const ELEMENT_TYPE: ElementType = ElementType::Struct;

    fn write_thrift<W: Write>(&self, writer: &mut ThriftCompactOutputProtocol<W>) -> Result<()> {
        self.offset.write_thrift_field(writer, 1, 0)?;
        self.compressed_page_size.write_thrift_field(writer, 2, 1)?;
        self.first_row_index.write_thrift_field(writer, 3, 2)?;
        writer.write_struct_end()
    }
}

impl ReadThrift for PageLocation {
    fn read_thrift(prot: &mut ThriftSliceInputProtocol<'_>) -> Result<Self> {
        let mut location = PageLocation { offset: 0, compressed_page_size: 0, first_row_index: 0 };
        let mut last_field_id = 0i16;
        loop {
            let field = prot.read_field_begin(last_field_id)?;
            if field.field_type == FieldType::Stop {
                break;
            }
            match field.id {
                1 => location.offset = prot.read_i64()?,
                2 => location.compressed_page_size = prot.read_i32()?,
                3 => location.first_row_index = prot.read_i64()?,
                _ => prot.skip(field.field_type)?,
            }
            last_field_id = field.id;
        }
        Ok(location)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OffsetIndex {
    pub page_locations: Vec<PageLocation>,
}

impl OffsetIndex {
    /// Shifts every page location by `base`, rebasing chunk-relative offsets
    /// to absolute file offsets.
    pub fn rebase(&mut self, base: i64) {
        for location in &mut self.page_locations {
            location.offset += base;
        }
    }
}

impl WriteThrift for OffsetIndex {
    const ELEMENT_TYPE: ElementType = ElementType::Struct;

    fn write_thrift<W: Write>(&self, writer: &mut ThriftCompactOutputProtocol<W>) -> Result<()> {
        self.page_locations.write_thrift_field(writer, 1, 0)?;
        writer.write_struct_end()
    }
}

impl ReadThrift for OffsetIndex {
    fn read_thrift(prot: &mut ThriftSliceInputProtocol<'_>) -> Result<Self> {
        let mut index = OffsetIndex { page_locations: Vec::new() };
        let mut last_field_id = 0i16;
        loop {
            let field = prot.read_field_begin(last_field_id)?;
            if field.field_type == FieldType::Stop {
                break;
            }
            match field.id {
                1 => index.page_locations = read_thrift_vec::<PageLocation>(prot)?,
                _ => prot.skip(field.field_type)?,
            }
            last_field_id = field.id;
        }
        Ok(index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnIndex {
    pub null_pages: Vec<bool>,
    pub min_values: Vec<Vec<u8>>,
    pub max_values: Vec<Vec<u8>>,
    pub boundary_order: BoundaryOrder,
    pub null_counts: Option<Vec<i64>>,
}

impl WriteThrift for ColumnIndex {
    const ELEMENT_TYPE: ElementType = ElementType::Struct;

    fn write_thrift<W: Write>(&self, writer: &mut ThriftCompactOutputProtocol<W>) -> Result<()> {
        self.null_pages.write_thrift_field(writer, 1, 0)?;
        writer.write_field_begin(FieldType::List, 2, 1)?;
        writer.write_list_begin(ElementType::Binary, self.min_values.len())?;
        for value in &self.min_values {
            writer.write_bytes(value)?;
        }
        writer.write_field_begin(FieldType::List, 3, 2)?;
        writer.write_list_begin(ElementType::Binary, self.max_values.len())?;
        for value in &self.max_values {
            writer.write_bytes(value)?;
        }
        let last_field_id = self.boundary_order.write_thrift_field(writer, 4, 3)?;
        if let Some(null_counts) = &self.null_counts {
            null_counts.write_thrift_field(writer, 5, last_field_id)?;
        }
        writer.write_struct_end()
    }
}

impl ReadThrift for ColumnIndex {
    fn read_thrift(prot: &mut ThriftSliceInputProtocol<'_>) -> Result<Self> {
        let mut index = ColumnIndex {
            null_pages: Vec::new(),
            min_values: Vec::new(),
            max_values: Vec::new(),
            boundary_order: BoundaryOrder::Unordered,
            null_counts: None,
        };
        let mut last_field_id = 0i16;
        loop {
            let field = prot.read_field_begin(last_field_id)?;
            if field.field_type == FieldType::Stop {
                break;
            }
            match field.id {
                1 => index.null_pages = read_thrift_vec::<bool>(prot)?,
                2 => index.min_values = read_thrift_vec::<Vec<u8>>(prot)?,
                3 => index.max_values = read_thrift_vec::<Vec<u8>>(prot)?,
                4 => index.boundary_order = BoundaryOrder::read_thrift(prot)?,
                5 => index.null_counts = Some(read_thrift_vec::<i64>(prot)?),
                _ => prot.skip(field.field_type)?,
            }
            last_field_id = field.id;
        }
        Ok(index)
    }
}
