//! The JSON schema adapter.
//!
//! A schema document is a tree of nodes, each carrying a tag-string
//! descriptor and, for groups, a list of child nodes:
//!
//! ```json
//! {
//!   "Tag": "name=root",
//!   "Fields": [
//!     {"Tag": "name=id, type=INT64"},
//!     {
//!       "Tag": "name=tags, repetitiontype=REPEATED",
//!       "Fields": [{"Tag": "name=tag, type=BYTE_ARRAY, convertedtype=UTF8"}]
//!     }
//!   ]
//! }
//! ```

use std::sync::Arc;

use serde::Deserialize;

use crate::errors::Result;
use crate::schema::tag::{parse_field_tag, primitive_from_tag};
use crate::schema::types::{SchemaType, SchemaTypePtr};

#[derive(Debug, Deserialize)]
struct JsonSchemaNode {
    #[serde(rename = "Tag")]
    tag: String,
    #[serde(rename = "Fields", default)]
    fields: Vec<JsonSchemaNode>,
}

/// Parses a JSON schema document into a schema tree. The document's top
/// node becomes the root group; its repetition is ignored.
pub fn schema_from_json(json: &str) -> Result<SchemaTypePtr> {
    let root: JsonSchemaNode = serde_json::from_str(json)
        .map_err(|e| schema_err!("malformed JSON schema: {}", e))?;
    let tag = parse_field_tag(&root.tag)?;
    if root.fields.is_empty() {
        return Err(schema_err!("JSON schema root '{}' has no fields", tag.name));
    }
    let mut fields = Vec::with_capacity(root.fields.len());
    for field in &root.fields {
        fields.push(lower_node(field)?);
    }
    Ok(Arc::new(
        SchemaType::group_type_builder(&tag.name).with_fields(fields).build()?,
    ))
}

fn lower_node(node: &JsonSchemaNode) -> Result<SchemaTypePtr> {
    let tag = parse_field_tag(&node.tag)?;
    if node.fields.is_empty() {
        return Ok(Arc::new(primitive_from_tag(&tag)?));
    }
    if tag.physical_type.is_some() {
        return Err(schema_err!(
            "field '{}' declares a type but has children",
            tag.name
        ));
    }
    let mut fields = Vec::with_capacity(node.fields.len());
    for field in &node.fields {
        fields.push(lower_node(field)?);
    }
    let mut builder = SchemaType::group_type_builder(&tag.name)
        .with_repetition(tag.repetition)
        .with_converted_type(tag.converted_type);
    if let Some(in_name) = &tag.in_name {
        builder = builder.with_in_name(in_name);
    }
    Ok(Arc::new(builder.with_fields(fields).build()?))
}
