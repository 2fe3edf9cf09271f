//! The schema column tree and its flattened leaf view.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::basic::{
    column_sort_order, Compression, ConvertedType, Encoding, LogicalType, Repetition, SortOrder,
    Type,
};
use crate::errors::Result;
use crate::format::SchemaElement;

/// Reference-counted pointer to a schema node.
pub type SchemaTypePtr = Arc<SchemaType>;
/// Reference-counted pointer to a leaf descriptor.
pub type ColumnDescPtr = Arc<ColumnDescriptor>;
/// Reference-counted pointer to a schema descriptor.
pub type SchemaDescPtr = Arc<SchemaDescriptor>;

/// Information common to group and primitive nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    /// Name as written into the file.
    pub name: String,
    /// The caller-side field identifier, when it differs from `name`.
    pub in_name: Option<String>,
    /// `None` only for the schema root.
    pub repetition: Option<Repetition>,
    pub converted_type: ConvertedType,
    pub logical_type: Option<LogicalType>,
    pub id: Option<i32>,
}

/// A node of the schema tree: either a primitive leaf carrying a physical
/// type or a group of named fields.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaType {
    Primitive {
        field_info: FieldInfo,
        physical_type: Type,
        type_length: i32,
        scale: i32,
        precision: i32,
        /// Value encoding override for this leaf.
        encoding: Option<Encoding>,
        /// Compression override for this leaf.
        compression: Option<Compression>,
        /// Suppresses min/max and null-count statistics for this leaf.
        omit_stats: bool,
    },
    Group {
        field_info: FieldInfo,
        fields: Vec<SchemaTypePtr>,
    },
}

impl SchemaType {
    /// Creates a builder for a primitive leaf.
    pub fn primitive_type_builder(name: &str, physical_type: Type) -> PrimitiveTypeBuilder {
        PrimitiveTypeBuilder::new(name, physical_type)
    }

    /// Creates a builder for a group node.
    pub fn group_type_builder(name: &str) -> GroupTypeBuilder {
        GroupTypeBuilder::new(name)
    }

    pub fn field_info(&self) -> &FieldInfo {
        match self {
            SchemaType::Primitive { field_info, .. } => field_info,
            SchemaType::Group { field_info, .. } => field_info,
        }
    }

    pub fn name(&self) -> &str {
        &self.field_info().name
    }

    /// The caller-side identifier, defaulting to the file name.
    pub fn in_name(&self) -> &str {
        self.field_info().in_name.as_deref().unwrap_or_else(|| self.name())
    }

    /// The node's repetition; the root reports `REQUIRED`.
    pub fn repetition(&self) -> Repetition {
        self.field_info().repetition.unwrap_or(Repetition::REQUIRED)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, SchemaType::Primitive { .. })
    }

    pub fn is_group(&self) -> bool {
        matches!(self, SchemaType::Group { .. })
    }

    /// Physical type of a primitive node. Panics on groups.
    pub fn physical_type(&self) -> Type {
        match self {
            SchemaType::Primitive { physical_type, .. } => *physical_type,
            SchemaType::Group { .. } => panic!("cannot get physical type of a group"),
        }
    }

    pub fn fields(&self) -> &[SchemaTypePtr] {
        match self {
            SchemaType::Group { fields, .. } => fields,
            SchemaType::Primitive { .. } => &[],
        }
    }
}

/// Builder for primitive leaves, validating annotations against the physical
/// type before the node is constructed.
pub struct PrimitiveTypeBuilder {
    name: String,
    in_name: Option<String>,
    physical_type: Type,
    repetition: Repetition,
    converted_type: ConvertedType,
    logical_type: Option<LogicalType>,
    type_length: i32,
    scale: i32,
    precision: i32,
    id: Option<i32>,
    encoding: Option<Encoding>,
    compression: Option<Compression>,
    omit_stats: bool,
}

impl PrimitiveTypeBuilder {
    pub fn new(name: &str, physical_type: Type) -> Self {
        Self {
            name: name.to_string(),
            in_name: None,
            physical_type,
            repetition: Repetition::OPTIONAL,
            converted_type: ConvertedType::NONE,
            logical_type: None,
            type_length: -1,
            scale: -1,
            precision: -1,
            id: None,
            encoding: None,
            compression: None,
            omit_stats: false,
        }
    }

    pub fn with_repetition(mut self, repetition: Repetition) -> Self {
        self.repetition = repetition;
        self
    }

    pub fn with_in_name(mut self, in_name: &str) -> Self {
        self.in_name = Some(in_name.to_string());
        self
    }

    pub fn with_converted_type(mut self, converted_type: ConvertedType) -> Self {
        self.converted_type = converted_type;
        self
    }

    pub fn with_logical_type(mut self, logical_type: Option<LogicalType>) -> Self {
        self.logical_type = logical_type;
        self
    }

    pub fn with_length(mut self, length: i32) -> Self {
        self.type_length = length;
        self
    }

    pub fn with_scale(mut self, scale: i32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_precision(mut self, precision: i32) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_id(mut self, id: i32) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn with_omit_stats(mut self, omit_stats: bool) -> Self {
        self.omit_stats = omit_stats;
        self
    }

    pub fn build(self) -> Result<SchemaType> {
        // keep the legacy annotation in sync when only a logical type is set
        let converted_type = match (self.converted_type, self.logical_type) {
            (ConvertedType::NONE, Some(logical)) => ConvertedType::from(logical),
            (converted, _) => converted,
        };

        if self.physical_type == Type::FIXED_LEN_BYTE_ARRAY && self.type_length <= 0 {
            return Err(schema_err!(
                "invalid FIXED_LEN_BYTE_ARRAY length {} for field '{}'",
                self.type_length,
                self.name
            ));
        }

        match converted_type {
            ConvertedType::NONE => {}
            ConvertedType::UTF8 | ConvertedType::ENUM | ConvertedType::JSON
            | ConvertedType::BSON => {
                if self.physical_type != Type::BYTE_ARRAY {
                    return Err(schema_err!(
                        "{} cannot annotate field '{}' of type {}",
                        converted_type,
                        self.name,
                        self.physical_type
                    ));
                }
            }
            ConvertedType::DECIMAL => {
                self.check_decimal_precision_scale()?;
            }
            ConvertedType::DATE
            | ConvertedType::TIME_MILLIS
            | ConvertedType::UINT_8
            | ConvertedType::UINT_16
            | ConvertedType::UINT_32
            | ConvertedType::INT_8
            | ConvertedType::INT_16
            | ConvertedType::INT_32 => {
                if self.physical_type != Type::INT32 {
                    return Err(schema_err!(
                        "{} can only annotate INT32, not field '{}' of type {}",
                        converted_type,
                        self.name,
                        self.physical_type
                    ));
                }
            }
            ConvertedType::TIME_MICROS
            | ConvertedType::TIMESTAMP_MILLIS
            | ConvertedType::TIMESTAMP_MICROS
            | ConvertedType::UINT_64
            | ConvertedType::INT_64 => {
                if self.physical_type != Type::INT64 {
                    return Err(schema_err!(
                        "{} can only annotate INT64, not field '{}' of type {}",
                        converted_type,
                        self.name,
                        self.physical_type
                    ));
                }
            }
            ConvertedType::INTERVAL => {
                if self.physical_type != Type::FIXED_LEN_BYTE_ARRAY || self.type_length != 12 {
                    return Err(schema_err!(
                        "INTERVAL can only annotate FIXED_LEN_BYTE_ARRAY(12), field '{}'",
                        self.name
                    ));
                }
            }
            ConvertedType::MAP | ConvertedType::MAP_KEY_VALUE | ConvertedType::LIST => {
                return Err(schema_err!(
                    "{} cannot annotate the primitive field '{}'",
                    converted_type,
                    self.name
                ));
            }
        }

        if let Some(logical) = self.logical_type {
            match logical {
                LogicalType::Integer { bit_width, is_signed: _ } => {
                    let expected = if bit_width == 64 { Type::INT64 } else { Type::INT32 };
                    if self.physical_type != expected {
                        return Err(schema_err!(
                            "INTEGER({}) cannot annotate field '{}' of type {}",
                            bit_width,
                            self.name,
                            self.physical_type
                        ));
                    }
                }
                LogicalType::Uuid => {
                    if self.physical_type != Type::FIXED_LEN_BYTE_ARRAY || self.type_length != 16 {
                        return Err(schema_err!(
                            "UUID can only annotate FIXED_LEN_BYTE_ARRAY(16), field '{}'",
                            self.name
                        ));
                    }
                }
                _ => {}
            }
        }

        Ok(SchemaType::Primitive {
            field_info: FieldInfo {
                name: self.name,
                in_name: self.in_name,
                repetition: Some(self.repetition),
                converted_type,
                logical_type: self.logical_type,
                id: self.id,
            },
            physical_type: self.physical_type,
            type_length: self.type_length,
            scale: self.scale,
            precision: self.precision,
            encoding: self.encoding,
            compression: self.compression,
            omit_stats: self.omit_stats,
        })
    }

    fn check_decimal_precision_scale(&self) -> Result<()> {
        if self.precision < 1 {
            return Err(schema_err!(
                "DECIMAL precision must be at least 1, field '{}' has {}",
                self.name,
                self.precision
            ));
        }
        if self.scale < 0 || self.scale > self.precision {
            return Err(schema_err!(
                "DECIMAL scale must be in 0..=precision, field '{}' has scale {} precision {}",
                self.name,
                self.scale,
                self.precision
            ));
        }
        let max_precision = match self.physical_type {
            Type::INT32 => 9,
            Type::INT64 => 18,
            Type::FIXED_LEN_BYTE_ARRAY => {
                (2f64.powi(8 * self.type_length - 1) - 1f64).log10().floor() as i32
            }
            Type::BYTE_ARRAY => i32::MAX,
            other => {
                return Err(schema_err!(
                    "DECIMAL cannot annotate field '{}' of type {}",
                    self.name,
                    other
                ))
            }
        };
        if self.precision > max_precision {
            return Err(schema_err!(
                "DECIMAL precision {} too large for {} field '{}'",
                self.precision,
                self.physical_type,
                self.name
            ));
        }
        Ok(())
    }
}

/// Builder for group nodes.
pub struct GroupTypeBuilder {
    name: String,
    in_name: Option<String>,
    repetition: Option<Repetition>,
    converted_type: ConvertedType,
    logical_type: Option<LogicalType>,
    id: Option<i32>,
    fields: Vec<SchemaTypePtr>,
}

impl GroupTypeBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            in_name: None,
            repetition: None,
            converted_type: ConvertedType::NONE,
            logical_type: None,
            id: None,
            fields: Vec::new(),
        }
    }

    pub fn with_repetition(mut self, repetition: Repetition) -> Self {
        self.repetition = Some(repetition);
        self
    }

    pub fn with_in_name(mut self, in_name: &str) -> Self {
        self.in_name = Some(in_name.to_string());
        self
    }

    pub fn with_converted_type(mut self, converted_type: ConvertedType) -> Self {
        self.converted_type = converted_type;
        self
    }

    pub fn with_logical_type(mut self, logical_type: Option<LogicalType>) -> Self {
        self.logical_type = logical_type;
        self
    }

    pub fn with_id(mut self, id: i32) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_fields(mut self, fields: Vec<SchemaTypePtr>) -> Self {
        self.fields = fields;
        self
    }

    pub fn build(self) -> Result<SchemaType> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name()) {
                return Err(schema_err!(
                    "duplicate field name '{}' in group '{}'",
                    field.name(),
                    self.name
                ));
            }
        }
        Ok(SchemaType::Group {
            field_info: FieldInfo {
                name: self.name,
                in_name: self.in_name,
                repetition: self.repetition,
                converted_type: self.converted_type,
                logical_type: self.logical_type,
                id: self.id,
            },
            fields: self.fields,
        })
    }
}

// ----------------------------------------------------------------------
// Column path and descriptor

/// Path of a leaf from the schema root, excluding the root's name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnPath {
    parts: Vec<String>,
}

impl ColumnPath {
    pub fn new(parts: Vec<String>) -> Self {
        Self { parts }
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    pub fn string(&self) -> String {
        self.parts.join(".")
    }
}

impl fmt::Display for ColumnPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.string())
    }
}

impl From<&str> for ColumnPath {
    fn from(s: &str) -> Self {
        Self::new(s.split('.').map(|p| p.to_string()).collect())
    }
}

/// Everything the write path needs to know about one leaf column: the
/// primitive node, its path, and the maximum definition and repetition
/// levels accumulated along that path.
#[derive(Debug, PartialEq)]
pub struct ColumnDescriptor {
    primitive_type: SchemaTypePtr,
    max_def_level: i16,
    max_rep_level: i16,
    path: ColumnPath,
}

impl ColumnDescriptor {
    pub fn new(
        primitive_type: SchemaTypePtr,
        max_def_level: i16,
        max_rep_level: i16,
        path: ColumnPath,
    ) -> Self {
        Self { primitive_type, max_def_level, max_rep_level, path }
    }

    pub fn max_def_level(&self) -> i16 {
        self.max_def_level
    }

    pub fn max_rep_level(&self) -> i16 {
        self.max_rep_level
    }

    pub fn path(&self) -> &ColumnPath {
        &self.path
    }

    pub fn name(&self) -> &str {
        self.primitive_type.name()
    }

    pub fn self_type(&self) -> &SchemaType {
        self.primitive_type.as_ref()
    }

    pub fn physical_type(&self) -> Type {
        self.primitive_type.physical_type()
    }

    pub fn type_length(&self) -> i32 {
        match self.primitive_type.as_ref() {
            SchemaType::Primitive { type_length, .. } => *type_length,
            _ => -1,
        }
    }

    pub fn converted_type(&self) -> ConvertedType {
        self.primitive_type.field_info().converted_type
    }

    pub fn logical_type(&self) -> Option<LogicalType> {
        self.primitive_type.field_info().logical_type
    }

    /// Value encoding override declared on the leaf.
    pub fn encoding(&self) -> Option<Encoding> {
        match self.primitive_type.as_ref() {
            SchemaType::Primitive { encoding, .. } => *encoding,
            _ => None,
        }
    }

    /// Compression override declared on the leaf.
    pub fn compression(&self) -> Option<Compression> {
        match self.primitive_type.as_ref() {
            SchemaType::Primitive { compression, .. } => *compression,
            _ => None,
        }
    }

    pub fn omit_stats(&self) -> bool {
        match self.primitive_type.as_ref() {
            SchemaType::Primitive { omit_stats, .. } => *omit_stats,
            _ => false,
        }
    }

    pub fn sort_order(&self) -> SortOrder {
        column_sort_order(self.physical_type(), self.converted_type(), self.logical_type())
    }

    /// Whether values of this leaf may be dictionary encoded. Booleans and
    /// floating point columns never are; INT96 has no defined ordering and
    /// stays PLAIN as well.
    pub fn dictionary_eligible(&self) -> bool {
        matches!(
            self.physical_type(),
            Type::INT32 | Type::INT64 | Type::BYTE_ARRAY | Type::FIXED_LEN_BYTE_ARRAY
        )
    }
}

/// The flattened view of a schema tree: leaves in pre-order, each with its
/// computed levels and path, plus lookup tables by path and caller name.
#[derive(Debug)]
pub struct SchemaDescriptor {
    schema: SchemaTypePtr,
    leaves: Vec<ColumnDescPtr>,
    leaf_by_path: HashMap<String, usize>,
    /// Maps caller-side field paths to file paths when `in_name`s differ.
    path_by_in_name: HashMap<String, String>,
}

impl SchemaDescriptor {
    /// Builds the descriptor from a root group node.
    pub fn new(schema: SchemaTypePtr) -> Result<Self> {
        if !schema.is_group() {
            return Err(schema_err!("schema root must be a group"));
        }
        let mut descriptor = Self {
            schema: schema.clone(),
            leaves: Vec::new(),
            leaf_by_path: HashMap::new(),
            path_by_in_name: HashMap::new(),
        };
        for field in schema.fields() {
            descriptor.build_tree(field, 0, 0, &mut Vec::new(), &mut Vec::new())?;
        }
        Ok(descriptor)
    }

    fn build_tree(
        &mut self,
        node: &SchemaTypePtr,
        mut max_def_level: i16,
        mut max_rep_level: i16,
        path_so_far: &mut Vec<String>,
        in_path_so_far: &mut Vec<String>,
    ) -> Result<()> {
        match node.repetition() {
            Repetition::REQUIRED => {}
            Repetition::OPTIONAL => max_def_level += 1,
            Repetition::REPEATED => {
                max_def_level += 1;
                max_rep_level += 1;
            }
        }
        path_so_far.push(node.name().to_string());
        in_path_so_far.push(node.in_name().to_string());

        match node.as_ref() {
            SchemaType::Primitive { .. } => {
                let path = ColumnPath::new(path_so_far.clone());
                let index = self.leaves.len();
                self.leaf_by_path.insert(path.string(), index);
                self.path_by_in_name.insert(in_path_so_far.join("."), path.string());
                self.leaves.push(Arc::new(ColumnDescriptor::new(
                    node.clone(),
                    max_def_level,
                    max_rep_level,
                    path,
                )));
            }
            SchemaType::Group { fields, .. } => {
                for field in fields {
                    self.build_tree(
                        field,
                        max_def_level,
                        max_rep_level,
                        path_so_far,
                        in_path_so_far,
                    )?;
                }
            }
        }

        path_so_far.pop();
        in_path_so_far.pop();
        Ok(())
    }

    pub fn root_schema(&self) -> &SchemaTypePtr {
        &self.schema
    }

    pub fn num_columns(&self) -> usize {
        self.leaves.len()
    }

    /// The `i`-th leaf in schema pre-order.
    pub fn column(&self, i: usize) -> ColumnDescPtr {
        self.leaves[i].clone()
    }

    pub fn columns(&self) -> &[ColumnDescPtr] {
        &self.leaves
    }

    /// Leaf lookup by dotted file path.
    pub fn leaf(&self, path: &str) -> Option<ColumnDescPtr> {
        self.leaf_by_path.get(path).map(|&i| self.leaves[i].clone())
    }

    /// Resolves a caller-side dotted path to a file path.
    pub fn path_for_in_name(&self, in_name: &str) -> Option<&str> {
        self.path_by_in_name.get(in_name).map(|s| s.as_str())
    }

    /// Flattens the tree into the footer's schema element list, pre-order.
    pub fn to_thrift(&self) -> Vec<SchemaElement> {
        let mut elements = Vec::with_capacity(1 + self.leaves.len());
        flatten(self.schema.as_ref(), true, &mut elements);
        elements
    }
}

fn flatten(node: &SchemaType, is_root: bool, elements: &mut Vec<SchemaElement>) {
    let info = node.field_info();
    match node {
        SchemaType::Primitive { physical_type, type_length, scale, precision, .. } => {
            elements.push(SchemaElement {
                type_: Some(*physical_type),
                type_length: (*type_length >= 0).then_some(*type_length),
                repetition_type: Some(node.repetition()),
                name: info.name.clone(),
                num_children: None,
                converted_type: (info.converted_type != ConvertedType::NONE)
                    .then_some(info.converted_type),
                scale: (*scale >= 0).then_some(*scale),
                precision: (*precision >= 0).then_some(*precision),
                field_id: info.id,
                logical_type: info.logical_type,
            });
        }
        SchemaType::Group { fields, .. } => {
            elements.push(SchemaElement {
                type_: None,
                type_length: None,
                repetition_type: (!is_root).then(|| node.repetition()),
                name: info.name.clone(),
                num_children: Some(fields.len() as i32),
                converted_type: (info.converted_type != ConvertedType::NONE)
                    .then_some(info.converted_type),
                scale: None,
                precision: None,
                field_id: info.id,
                logical_type: info.logical_type,
            });
            for field in fields {
                flatten(field, false, elements);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, physical: Type, repetition: Repetition) -> SchemaTypePtr {
        Arc::new(
            SchemaType::primitive_type_builder(name, physical)
                .with_repetition(repetition)
                .build()
                .unwrap(),
        )
    }

    fn nested_schema() -> SchemaDescriptor {
        // message schema {
        //   required int64 a;
        //   optional group b {
        //     repeated group item {
        //       optional byte_array c (UTF8);
        //       required int32 d;
        //     }
        //   }
        // }
        let c = Arc::new(
            SchemaType::primitive_type_builder("c", Type::BYTE_ARRAY)
                .with_repetition(Repetition::OPTIONAL)
                .with_converted_type(ConvertedType::UTF8)
                .build()
                .unwrap(),
        );
        let d = leaf("d", Type::INT32, Repetition::REQUIRED);
        let item = Arc::new(
            SchemaType::group_type_builder("item")
                .with_repetition(Repetition::REPEATED)
                .with_fields(vec![c, d])
                .build()
                .unwrap(),
        );
        let b = Arc::new(
            SchemaType::group_type_builder("b")
                .with_repetition(Repetition::OPTIONAL)
                .with_fields(vec![item])
                .build()
                .unwrap(),
        );
        let a = leaf("a", Type::INT64, Repetition::REQUIRED);
        let root = Arc::new(
            SchemaType::group_type_builder("schema")
                .with_fields(vec![a, b])
                .build()
                .unwrap(),
        );
        SchemaDescriptor::new(root).unwrap()
    }

    #[test]
    fn test_levels_of_nested_schema() {
        let descriptor = nested_schema();
        assert_eq!(descriptor.num_columns(), 3);

        let a = descriptor.column(0);
        assert_eq!(a.path().string(), "a");
        assert_eq!(a.max_def_level(), 0);
        assert_eq!(a.max_rep_level(), 0);

        let c = descriptor.column(1);
        assert_eq!(c.path().string(), "b.item.c");
        assert_eq!(c.max_def_level(), 3);
        assert_eq!(c.max_rep_level(), 1);

        let d = descriptor.column(2);
        assert_eq!(d.path().string(), "b.item.d");
        assert_eq!(d.max_def_level(), 2);
        assert_eq!(d.max_rep_level(), 1);
    }

    #[test]
    fn test_leaf_lookup() {
        let descriptor = nested_schema();
        assert!(descriptor.leaf("b.item.c").is_some());
        assert!(descriptor.leaf("b.item.x").is_none());
    }

    #[test]
    fn test_flatten_pre_order() {
        let descriptor = nested_schema();
        let elements = descriptor.to_thrift();
        let names: Vec<&str> = elements.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["schema", "a", "b", "item", "c", "d"]);
        assert_eq!(elements[0].num_children, Some(2));
        assert_eq!(elements[0].repetition_type, None);
        assert_eq!(elements[2].num_children, Some(1));
        assert_eq!(elements[4].converted_type, Some(ConvertedType::UTF8));
    }

    #[test]
    fn test_duplicate_field_names_rejected() {
        let result = SchemaType::group_type_builder("g")
            .with_fields(vec![
                leaf("x", Type::INT32, Repetition::REQUIRED),
                leaf("x", Type::INT64, Repetition::REQUIRED),
            ])
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_fixed_length_must_be_positive() {
        let result = SchemaType::primitive_type_builder("f", Type::FIXED_LEN_BYTE_ARRAY)
            .with_repetition(Repetition::REQUIRED)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_decimal_validation() {
        let ok = SchemaType::primitive_type_builder("d", Type::INT32)
            .with_converted_type(ConvertedType::DECIMAL)
            .with_precision(9)
            .with_scale(2)
            .build();
        assert!(ok.is_ok());

        let too_wide = SchemaType::primitive_type_builder("d", Type::INT32)
            .with_converted_type(ConvertedType::DECIMAL)
            .with_precision(10)
            .with_scale(2)
            .build();
        assert!(too_wide.is_err());

        let bad_scale = SchemaType::primitive_type_builder("d", Type::INT64)
            .with_converted_type(ConvertedType::DECIMAL)
            .with_precision(10)
            .with_scale(11)
            .build();
        assert!(bad_scale.is_err());
    }

    #[test]
    fn test_utf8_requires_byte_array() {
        let result = SchemaType::primitive_type_builder("s", Type::INT64)
            .with_converted_type(ConvertedType::UTF8)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_root_must_be_group() {
        let result = SchemaDescriptor::new(leaf("x", Type::INT32, Repetition::REQUIRED));
        assert!(result.is_err());
    }

    #[test]
    fn test_in_name_mapping() {
        let x = Arc::new(
            SchemaType::primitive_type_builder("x_file", Type::INT64)
                .with_repetition(Repetition::REQUIRED)
                .with_in_name("XCaller")
                .build()
                .unwrap(),
        );
        let root = Arc::new(
            SchemaType::group_type_builder("schema").with_fields(vec![x]).build().unwrap(),
        );
        let descriptor = SchemaDescriptor::new(root).unwrap();
        assert_eq!(descriptor.path_for_in_name("XCaller"), Some("x_file"));
        assert_eq!(descriptor.column(0).name(), "x_file");
    }

    #[test]
    fn test_logical_type_sets_converted_type() {
        let node = SchemaType::primitive_type_builder("u", Type::INT32)
            .with_logical_type(Some(LogicalType::Integer { bit_width: 8, is_signed: false }))
            .build()
            .unwrap();
        assert_eq!(node.field_info().converted_type, ConvertedType::UINT_8);
    }
}
