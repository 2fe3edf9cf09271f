//! Shreds one record into per-leaf `(value, repetition, definition)`
//! triples.
//!
//! The walk follows the record-shredding rules of the Dremel model:
//!
//! - a REQUIRED field adds no levels and must be present;
//! - a present OPTIONAL field raises the definition level by one, an absent
//!   one contributes a null triple at the parent's definition level to every
//!   leaf beneath it;
//! - a REPEATED field with `k` items emits `k` shreddings, the first at the
//!   inherited repetition level and the rest at the field's own level; an
//!   empty or absent list contributes a single null triple at the parent's
//!   definition level.

use crate::errors::Result;
use crate::record::value::{Record, Value};
use crate::schema::types::{SchemaDescriptor, SchemaType};

/// Accumulated triples for one leaf column. Values are stored for non-null
/// triples only; a triple is null iff its definition level is below the
/// leaf's maximum.
#[derive(Debug, Default)]
pub struct TripleBuffer {
    pub values: Vec<Value>,
    pub def_levels: Vec<i16>,
    pub rep_levels: Vec<i16>,
    /// Running plain-encoded size of the buffered values.
    pub value_bytes: usize,
}

impl TripleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_triples(&self) -> usize {
        self.def_levels.len()
    }

    fn push(&mut self, value: Option<Value>, rep_level: i16, def_level: i16) {
        if let Some(value) = value {
            self.value_bytes += value.plain_size();
            self.values.push(value);
        }
        self.rep_levels.push(rep_level);
        self.def_levels.push(def_level);
    }

    fn checkpoint(&self) -> (usize, usize, usize) {
        (self.values.len(), self.def_levels.len(), self.value_bytes)
    }

    fn rollback(&mut self, checkpoint: (usize, usize, usize)) {
        self.values.truncate(checkpoint.0);
        self.def_levels.truncate(checkpoint.1);
        self.rep_levels.truncate(checkpoint.1);
        self.value_bytes = checkpoint.2;
    }
}

/// Shreds `record` against `schema`, appending exactly one triple run per
/// leaf to `buffers` (indexed in schema pre-order). On error no triples are
/// committed and the buffers are left exactly as they were.
pub fn shred_record(
    record: &Record,
    schema: &SchemaDescriptor,
    buffers: &mut [TripleBuffer],
) -> Result<()> {
    debug_assert_eq!(buffers.len(), schema.num_columns());
    let checkpoints: Vec<_> = buffers.iter().map(|b| b.checkpoint()).collect();

    let result = shred_group(schema.root_schema(), record, 0, 0, 0, 0, buffers).map(|_| ());
    if result.is_err() {
        for (buffer, checkpoint) in buffers.iter_mut().zip(checkpoints) {
            buffer.rollback(checkpoint);
        }
    }
    result
}

/// Shreds the content of `node` (repetition already accounted for by the
/// caller), starting at leaf `leaf_start`. Returns the leaf index following
/// this node's subtree.
fn shred_content(
    node: &SchemaType,
    value: &Record,
    rep_level: i16,
    def_level: i16,
    rep_depth: i16,
    leaf_start: usize,
    buffers: &mut [TripleBuffer],
) -> Result<usize> {
    match node {
        SchemaType::Primitive { physical_type, type_length, .. } => {
            let atom = match value {
                Record::Atom(v) => v,
                other => {
                    return Err(type_err!(
                        "leaf field '{}' expects a value, got a {}",
                        node.name(),
                        record_kind(other)
                    ))
                }
            };
            let coerced = atom.clone().coerce(*physical_type, *type_length).map_err(|e| {
                type_err!("field '{}': {}", node.name(), e)
            })?;
            buffers[leaf_start].push(Some(coerced), rep_level, def_level);
            Ok(leaf_start + 1)
        }
        SchemaType::Group { .. } => {
            shred_group(node, value, rep_level, def_level, rep_depth, leaf_start, buffers)
        }
    }
}

fn shred_group(
    node: &SchemaType,
    value: &Record,
    rep_level: i16,
    def_level: i16,
    rep_depth: i16,
    leaf_start: usize,
    buffers: &mut [TripleBuffer],
) -> Result<usize> {
    let group = match value {
        Record::Group(fields) => fields,
        other => {
            return Err(type_err!(
                "group field '{}' expects a group, got a {}",
                node.name(),
                record_kind(other)
            ))
        }
    };

    // reject paths the schema does not know
    for (name, _) in group {
        if !node
            .fields()
            .iter()
            .any(|f| f.in_name() == name.as_str() || f.name() == name.as_str())
        {
            return Err(type_err!(
                "record field '{}' has no counterpart in group '{}'",
                name,
                node.name()
            ));
        }
    }

    let mut leaf_index = leaf_start;
    for field in node.fields() {
        let field_value = group
            .iter()
            .find(|(name, _)| {
                name.as_str() == field.in_name() || name.as_str() == field.name()
            })
            .map(|(_, r)| r);
        leaf_index =
            shred_field(field, field_value, rep_level, def_level, rep_depth, leaf_index, buffers)?;
    }
    Ok(leaf_index)
}

/// Shreds one named field, applying its repetition. Returns the leaf index
/// following the field's subtree.
fn shred_field(
    node: &SchemaType,
    value: Option<&Record>,
    rep_level: i16,
    def_level: i16,
    rep_depth: i16,
    leaf_start: usize,
    buffers: &mut [TripleBuffer],
) -> Result<usize> {
    use crate::basic::Repetition::*;

    let present = matches!(value, Some(v) if !matches!(v, Record::Atom(Value::Null)));
    match node.repetition() {
        REQUIRED => {
            if !present {
                return Err(type_err!("required field '{}' is missing", node.name()));
            }
            shred_content(node, value.unwrap(), rep_level, def_level, rep_depth, leaf_start, buffers)
        }
        OPTIONAL => {
            if !present {
                return Ok(null_subtree(node, rep_level, def_level, leaf_start, buffers));
            }
            shred_content(
                node,
                value.unwrap(),
                rep_level,
                def_level + 1,
                rep_depth,
                leaf_start,
                buffers,
            )
        }
        REPEATED => {
            let items = match value {
                Some(Record::List(items)) => items.as_slice(),
                None | Some(Record::Atom(Value::Null)) => &[],
                Some(other) => {
                    return Err(type_err!(
                        "repeated field '{}' expects a list, got a {}",
                        node.name(),
                        record_kind(other)
                    ))
                }
            };
            if items.is_empty() {
                return Ok(null_subtree(node, rep_level, def_level, leaf_start, buffers));
            }
            let item_rep_depth = rep_depth + 1;
            let mut leaf_end = leaf_start;
            for (i, item) in items.iter().enumerate() {
                let item_rep = if i == 0 { rep_level } else { item_rep_depth };
                leaf_end = shred_content(
                    node,
                    item,
                    item_rep,
                    def_level + 1,
                    item_rep_depth,
                    leaf_start,
                    buffers,
                )?;
            }
            Ok(leaf_end)
        }
    }
}

/// Emits one null triple at `(rep_level, def_level)` to every leaf beneath
/// `node`, returning the leaf index following the subtree.
fn null_subtree(
    node: &SchemaType,
    rep_level: i16,
    def_level: i16,
    leaf_start: usize,
    buffers: &mut [TripleBuffer],
) -> usize {
    match node {
        SchemaType::Primitive { .. } => {
            buffers[leaf_start].push(None, rep_level, def_level);
            leaf_start + 1
        }
        SchemaType::Group { fields, .. } => {
            let mut leaf_index = leaf_start;
            for field in fields {
                leaf_index = null_subtree(field, rep_level, def_level, leaf_index, buffers);
            }
            leaf_index
        }
    }
}

fn record_kind(record: &Record) -> &'static str {
    match record {
        Record::Group(_) => "group",
        Record::List(_) => "list",
        Record::Atom(_) => "value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::json::schema_from_json;
    use crate::schema::tag::schema_from_field_tags;
    use crate::schema::types::SchemaDescriptor;

    fn buffers_for(schema: &SchemaDescriptor) -> Vec<TripleBuffer> {
        (0..schema.num_columns()).map(|_| TripleBuffer::new()).collect()
    }

    fn flat_optional_schema() -> SchemaDescriptor {
        let schema = schema_from_field_tags(&[
            "name=x, type=INT64, repetitiontype=OPTIONAL",
            "name=u, type=INT64",
        ])
        .unwrap();
        SchemaDescriptor::new(schema).unwrap()
    }

    #[test]
    fn test_flat_present_and_absent() {
        let schema = flat_optional_schema();
        let mut buffers = buffers_for(&schema);

        shred_record(
            &Record::group([("x", Record::from(5i64)), ("u", Record::from(1i64))]),
            &schema,
            &mut buffers,
        )
        .unwrap();
        shred_record(&Record::group([("u", Record::from(2i64))]), &schema, &mut buffers)
            .unwrap();
        shred_record(
            &Record::group([("x", Record::null()), ("u", Record::from(3i64))]),
            &schema,
            &mut buffers,
        )
        .unwrap();

        // x: (5,0,1) (⊥,0,0) (⊥,0,0)
        assert_eq!(buffers[0].values, vec![Value::I64(5)]);
        assert_eq!(buffers[0].def_levels, vec![1, 0, 0]);
        assert_eq!(buffers[0].rep_levels, vec![0, 0, 0]);
        // u: three required values
        assert_eq!(buffers[1].values.len(), 3);
        assert_eq!(buffers[1].def_levels, vec![0, 0, 0]);
    }

    #[test]
    fn test_required_missing() {
        let schema = flat_optional_schema();
        let mut buffers = buffers_for(&schema);
        let err = shred_record(
            &Record::group([("x", Record::from(5i64))]),
            &schema,
            &mut buffers,
        )
        .unwrap_err();
        assert!(err.to_string().contains("required field 'u'"));
        // rejection is atomic
        assert_eq!(buffers[0].num_triples(), 0);
        assert_eq!(buffers[1].num_triples(), 0);
    }

    #[test]
    fn test_type_mismatch_rolls_back() {
        let schema = flat_optional_schema();
        let mut buffers = buffers_for(&schema);
        let err = shred_record(
            &Record::group([("x", Record::from(5i64)), ("u", Record::from("oops"))]),
            &schema,
            &mut buffers,
        )
        .unwrap_err();
        assert!(matches!(err, crate::errors::Error::TypeMismatch(_)));
        assert_eq!(buffers[0].num_triples(), 0);
    }

    #[test]
    fn test_unknown_path_rejected() {
        let schema = flat_optional_schema();
        let mut buffers = buffers_for(&schema);
        let err = shred_record(
            &Record::group([("u", Record::from(1i64)), ("zz", Record::from(2i64))]),
            &schema,
            &mut buffers,
        )
        .unwrap_err();
        assert!(err.to_string().contains("zz"));
    }

    fn repeated_schema() -> SchemaDescriptor {
        let schema = schema_from_json(
            r#"{
                "Tag": "name=schema",
                "Fields": [
                    {
                        "Tag": "name=items, repetitiontype=REPEATED",
                        "Fields": [
                            {"Tag": "name=v, type=INT64"},
                            {"Tag": "name=w, type=INT64, repetitiontype=OPTIONAL"}
                        ]
                    }
                ]
            }"#,
        )
        .unwrap();
        SchemaDescriptor::new(schema).unwrap()
    }

    #[test]
    fn test_repeated_levels() {
        let schema = repeated_schema();
        let mut buffers = buffers_for(&schema);

        // row 1: three items, middle one without w
        let row = Record::group([(
            "items",
            Record::list([
                Record::group([("v", Record::from(1i64)), ("w", Record::from(10i64))]),
                Record::group([("v", Record::from(2i64))]),
                Record::group([("v", Record::from(3i64)), ("w", Record::from(30i64))]),
            ]),
        )]);
        shred_record(&row, &schema, &mut buffers).unwrap();
        // row 2: empty list
        shred_record(&Record::group([("items", Record::list([]))]), &schema, &mut buffers)
            .unwrap();

        // v (max_def 1, max_rep 1)
        assert_eq!(buffers[0].rep_levels, vec![0, 1, 1, 0]);
        assert_eq!(buffers[0].def_levels, vec![1, 1, 1, 0]);
        assert_eq!(buffers[0].values.len(), 3);

        // w (max_def 2, max_rep 1)
        assert_eq!(buffers[1].rep_levels, vec![0, 1, 1, 0]);
        assert_eq!(buffers[1].def_levels, vec![2, 1, 2, 0]);
        assert_eq!(
            buffers[1].values,
            vec![Value::I64(10), Value::I64(30)]
        );
    }

    #[test]
    fn test_levels_stay_bounded() {
        let schema = repeated_schema();
        let mut buffers = buffers_for(&schema);
        let row = Record::group([(
            "items",
            Record::list([
                Record::group([("v", Record::from(1i64)), ("w", Record::from(2i64))]),
                Record::group([("v", Record::from(3i64))]),
            ]),
        )]);
        shred_record(&row, &schema, &mut buffers).unwrap();

        for (buffer, column) in buffers.iter().zip(schema.columns()) {
            for (&rep, &def) in buffer.rep_levels.iter().zip(&buffer.def_levels) {
                assert!(rep >= 0 && rep <= column.max_rep_level());
                assert!(def >= 0 && def <= column.max_def_level());
            }
        }
    }

    #[test]
    fn test_optional_group_absent_nulls_all_leaves() {
        let schema = schema_from_json(
            r#"{
                "Tag": "name=schema",
                "Fields": [
                    {
                        "Tag": "name=pos, repetitiontype=OPTIONAL",
                        "Fields": [
                            {"Tag": "name=lat, type=DOUBLE"},
                            {"Tag": "name=lon, type=DOUBLE"}
                        ]
                    }
                ]
            }"#,
        )
        .unwrap();
        let schema = SchemaDescriptor::new(schema).unwrap();
        let mut buffers = buffers_for(&schema);

        shred_record(&Record::group::<[(&str, Record); 0], &str>([]), &schema, &mut buffers)
            .unwrap();
        shred_record(
            &Record::group([(
                "pos",
                Record::group([("lat", Record::from(1.0f64)), ("lon", Record::from(2.0f64))]),
            )]),
            &schema,
            &mut buffers,
        )
        .unwrap();

        for buffer in &buffers {
            assert_eq!(buffer.def_levels, vec![0, 1]);
            assert_eq!(buffer.values.len(), 1);
        }
    }

    #[test]
    fn test_lossless_widening() {
        let schema = flat_optional_schema();
        let mut buffers = buffers_for(&schema);
        shred_record(
            &Record::group([("x", Record::from(5i32)), ("u", Record::from(1i64))]),
            &schema,
            &mut buffers,
        )
        .unwrap();
        assert_eq!(buffers[0].values, vec![Value::I64(5)]);
    }
}
