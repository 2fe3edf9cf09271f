//! The tag-string schema adapter.
//!
//! Field descriptors are comma separated `key=value` lists in the style of
//! struct-tag annotations:
//!
//! ```text
//! name=x, type=INT64, repetitiontype=OPTIONAL
//! name=name, type=BYTE_ARRAY, convertedtype=UTF8, encoding=PLAIN_DICTIONARY
//! name=amount, type=FIXED_LEN_BYTE_ARRAY, convertedtype=DECIMAL, length=12, scale=2, precision=20
//! ```
//!
//! Recognised keys: `name`, `inname`, `type`, `convertedtype`,
//! `repetitiontype`, `length`, `scale`, `precision`, `fieldid`, `encoding`,
//! `compression`, `omitstats`. A descriptor without `type` describes a group
//! and is only meaningful in nested schema documents.

use std::sync::Arc;

use crate::basic::{Compression, ConvertedType, Encoding, Repetition, Type};
use crate::errors::Result;
use crate::schema::types::{SchemaType, SchemaTypePtr};

/// A parsed field descriptor.
#[derive(Debug, Clone)]
pub struct FieldTag {
    pub name: String,
    pub in_name: Option<String>,
    /// `None` describes a group node.
    pub physical_type: Option<Type>,
    pub converted_type: ConvertedType,
    pub repetition: Repetition,
    pub length: i32,
    pub scale: i32,
    pub precision: i32,
    pub field_id: Option<i32>,
    pub encoding: Option<Encoding>,
    pub compression: Option<Compression>,
    pub omit_stats: bool,
}

/// Parses one descriptor string.
pub fn parse_field_tag(tag: &str) -> Result<FieldTag> {
    let mut parsed = FieldTag {
        name: String::new(),
        in_name: None,
        physical_type: None,
        converted_type: ConvertedType::NONE,
        repetition: Repetition::REQUIRED,
        length: -1,
        scale: -1,
        precision: -1,
        field_id: None,
        encoding: None,
        compression: None,
        omit_stats: false,
    };

    for part in tag.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| schema_err!("malformed tag entry '{}', expected key=value", part))?;
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();
        match key.as_str() {
            "name" => parsed.name = value.to_string(),
            "inname" => parsed.in_name = Some(value.to_string()),
            "type" => parsed.physical_type = Some(value.parse()?),
            "convertedtype" => parsed.converted_type = value.parse()?,
            "repetitiontype" => parsed.repetition = value.to_ascii_uppercase().parse()?,
            "length" => parsed.length = parse_i32(&key, value)?,
            "scale" => parsed.scale = parse_i32(&key, value)?,
            "precision" => parsed.precision = parse_i32(&key, value)?,
            "fieldid" => parsed.field_id = Some(parse_i32(&key, value)?),
            "encoding" => parsed.encoding = Some(value.to_ascii_uppercase().parse()?),
            "compression" => parsed.compression = Some(value.to_ascii_uppercase().parse()?),
            "omitstats" => parsed.omit_stats = parse_bool(&key, value)?,
            _ => return Err(schema_err!("unknown tag key '{}'", key)),
        }
    }

    if parsed.name.is_empty() {
        return Err(schema_err!("tag '{}' does not set a name", tag));
    }
    Ok(parsed)
}

/// Builds a primitive leaf from a parsed descriptor.
pub fn primitive_from_tag(tag: &FieldTag) -> Result<SchemaType> {
    let physical_type = tag
        .physical_type
        .ok_or_else(|| schema_err!("field '{}' does not declare a type", tag.name))?;
    let mut builder = SchemaType::primitive_type_builder(&tag.name, physical_type)
        .with_repetition(tag.repetition)
        .with_converted_type(tag.converted_type)
        .with_length(tag.length)
        .with_scale(tag.scale)
        .with_precision(tag.precision)
        .with_omit_stats(tag.omit_stats);
    if let Some(in_name) = &tag.in_name {
        builder = builder.with_in_name(in_name);
    }
    if let Some(id) = tag.field_id {
        builder = builder.with_id(id);
    }
    if let Some(encoding) = tag.encoding {
        builder = builder.with_encoding(encoding);
    }
    if let Some(compression) = tag.compression {
        builder = builder.with_compression(compression);
    }
    builder.build()
}

/// Builds a flat root schema from one descriptor per leaf.
pub fn schema_from_field_tags(tags: &[&str]) -> Result<SchemaTypePtr> {
    let mut fields = Vec::with_capacity(tags.len());
    for tag in tags {
        let parsed = parse_field_tag(tag)?;
        fields.push(Arc::new(primitive_from_tag(&parsed)?));
    }
    Ok(Arc::new(SchemaType::group_type_builder("schema").with_fields(fields).build()?))
}

fn parse_i32(key: &str, value: &str) -> Result<i32> {
    value
        .parse::<i32>()
        .map_err(|_| schema_err!("tag key '{}' has non-integer value '{}'", key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(schema_err!("tag key '{}' has non-boolean value '{}'", key, value)),
    }
}
