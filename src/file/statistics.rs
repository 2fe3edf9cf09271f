//! Min/max/null-count statistics over dynamic values, with the logical
//! orderings and truncation rules the column index requires.

use crate::basic::{ConvertedType, SortOrder, Type};
use crate::format;
use crate::record::value::Value;
use crate::schema::types::ColumnDescriptor;

/// Statistics accumulated over a page or a column chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueStatistics {
    pub min: Option<Value>,
    pub max: Option<Value>,
    pub null_count: u64,
    pub distinct_count: Option<u64>,
}

impl ValueStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds another value into the min/max bounds, skipping NaN. Columns
    /// without a defined order (INT96, INTERVAL) never produce bounds.
    pub fn update(&mut self, descr: &ColumnDescriptor, value: &Value) {
        if descr.sort_order() == SortOrder::Undefined {
            return;
        }
        update_min(descr, value, &mut self.min);
        update_max(descr, value, &mut self.max);
    }

    /// Merges page statistics into chunk statistics.
    pub fn merge(&mut self, descr: &ColumnDescriptor, other: &ValueStatistics) {
        if let Some(min) = &other.min {
            update_min(descr, min, &mut self.min);
        }
        if let Some(max) = &other.max {
            update_max(descr, max, &mut self.max);
        }
        self.null_count += other.null_count;
        self.distinct_count = None;
    }
}

pub fn update_min(descr: &ColumnDescriptor, val: &Value, min: &mut Option<Value>) {
    update_stat(val, min, |cur| compare_greater(descr, cur, val))
}

pub fn update_max(descr: &ColumnDescriptor, val: &Value, max: &mut Option<Value>) {
    update_stat(val, max, |cur| compare_greater(descr, val, cur))
}

fn update_stat<F>(val: &Value, cur: &mut Option<Value>, should_update: F)
where
    F: Fn(&Value) -> bool,
{
    if is_nan(val) {
        return;
    }
    if cur.as_ref().map_or(true, should_update) {
        *cur = Some(val.clone());
    }
}

pub fn is_nan(val: &Value) -> bool {
    match val {
        Value::F32(v) => v.is_nan(),
        Value::F64(v) => v.is_nan(),
        _ => false,
    }
}

/// Evaluates `a > b` under the column's logical ordering: unsigned widths
/// compare as unsigned, decimals stored in byte arrays compare as signed
/// big-endian numbers, and plain byte arrays compare lexicographically.
pub fn compare_greater(descr: &ColumnDescriptor, a: &Value, b: &Value) -> bool {
    if descr.sort_order() == SortOrder::Unsigned {
        match (a, b) {
            (Value::I32(a), Value::I32(b)) => return (*a as u32) > (*b as u32),
            (Value::I64(a), Value::I64(b)) => return (*a as u64) > (*b as u64),
            _ => {}
        }
    }

    if is_decimal_bytes(descr) {
        if let (Value::Bytes(a), Value::Bytes(b)) = (a, b) {
            return compare_greater_byte_array_decimals(a, b);
        }
    }

    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => a > b,
        (Value::I32(a), Value::I32(b)) => a > b,
        (Value::I64(a), Value::I64(b)) => a > b,
        (Value::F32(a), Value::F32(b)) => a > b,
        (Value::F64(a), Value::F64(b)) => a > b,
        (Value::Bytes(a), Value::Bytes(b)) => a > b,
        // INT96 has no defined order and never reaches here
        _ => false,
    }
}

fn is_decimal_bytes(descr: &ColumnDescriptor) -> bool {
    matches!(descr.physical_type(), Type::BYTE_ARRAY | Type::FIXED_LEN_BYTE_ARRAY)
        && descr.converted_type() == ConvertedType::DECIMAL
}

/// Signed comparison of big-endian two's-complement byte arrays that may
/// differ in length.
fn compare_greater_byte_array_decimals(a: &[u8], b: &[u8]) -> bool {
    if a.is_empty() || b.is_empty() {
        return !a.is_empty();
    }
    let first_a = a[0];
    let first_b = b[0];

    // different signs, or equal length with different leading bytes
    if (0x80 & first_a) != (0x80 & first_b) || (a.len() == b.len() && first_a != first_b) {
        return (first_a as i8) > (first_b as i8);
    }

    // same sign, different length: the shorter value sign-extends
    let extension: u8 = if (first_a as i8) < 0 { 0xff } else { 0 };
    if a.len() != b.len() {
        let lead = a.len().abs_diff(b.len());
        if a.len() > b.len() {
            if a[..lead].iter().any(|&x| x != extension) {
                return extension == 0;
            }
            return a[lead..] > *b;
        }
        if b[..lead].iter().any(|&x| x != extension) {
            return extension != 0;
        }
        return *a > b[lead..];
    }

    a > b
}

/// The statistics byte form of a value: little-endian numerics, raw bytes
/// for byte arrays. INT96 values carry no statistics.
pub fn stat_bytes(value: &Value) -> Vec<u8> {
    match value {
        Value::Bool(v) => vec![*v as u8],
        Value::I32(v) => v.to_le_bytes().to_vec(),
        Value::I64(v) => v.to_le_bytes().to_vec(),
        Value::F32(v) => v.to_le_bytes().to_vec(),
        Value::F64(v) => v.to_le_bytes().to_vec(),
        Value::Bytes(v) => v.to_vec(),
        Value::I96(_) | Value::Null => Vec::new(),
    }
}

/// Truncates a lower bound to at most `len` bytes. A prefix of a byte
/// string never exceeds it, so plain truncation is sound.
pub fn truncate_min_binary(data: &[u8], len: usize) -> Vec<u8> {
    if data.len() <= len {
        return data.to_vec();
    }
    data[..len].to_vec()
}

/// Truncates an upper bound to at most `len` bytes: the truncated prefix is
/// incremented at its last byte (with carry) so it still bounds the value
/// from above. Returns the full value when every prefix byte is 0xff.
pub fn truncate_max_binary(data: &[u8], len: usize) -> Vec<u8> {
    if data.len() <= len {
        return data.to_vec();
    }
    let mut prefix = data[..len].to_vec();
    for i in (0..prefix.len()).rev() {
        if prefix[i] != 0xff {
            prefix[i] += 1;
            prefix.truncate(i + 1);
            return prefix;
        }
    }
    data.to_vec()
}

/// Converts accumulated statistics to the wire struct. Legacy `min`/`max`
/// are emitted alongside `min_value`/`max_value` only when the column's
/// order is signed, matching what older readers expect.
pub fn to_thrift(
    statistics: Option<&ValueStatistics>,
    sort_order: SortOrder,
) -> Option<format::Statistics> {
    let statistics = statistics?;
    let min_bytes = statistics.min.as_ref().map(stat_bytes);
    let max_bytes = statistics.max.as_ref().map(stat_bytes);
    Some(format::Statistics {
        max: sort_order.is_signed().then(|| max_bytes.clone()).flatten(),
        min: sort_order.is_signed().then(|| min_bytes.clone()).flatten(),
        null_count: Some(statistics.null_count as i64),
        distinct_count: statistics.distinct_count.map(|v| v as i64),
        max_value: max_bytes,
        min_value: min_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::Repetition;
    use crate::schema::types::{ColumnPath, SchemaType};
    use std::sync::Arc;

    fn descr(physical: Type, converted: ConvertedType) -> ColumnDescriptor {
        let mut builder = SchemaType::primitive_type_builder("c", physical)
            .with_repetition(Repetition::OPTIONAL)
            .with_converted_type(converted);
        if physical == Type::FIXED_LEN_BYTE_ARRAY {
            builder = builder.with_length(4);
        }
        if converted == ConvertedType::DECIMAL {
            builder = builder.with_precision(7).with_scale(2);
        }
        ColumnDescriptor::new(
            Arc::new(builder.build().unwrap()),
            1,
            0,
            ColumnPath::from("c"),
        )
    }

    #[test]
    fn test_signed_vs_unsigned_int_ordering() {
        let signed = descr(Type::INT32, ConvertedType::NONE);
        assert!(compare_greater(&signed, &Value::I32(1), &Value::I32(-1)));

        let unsigned = descr(Type::INT32, ConvertedType::UINT_32);
        // -1 is u32::MAX under the unsigned order
        assert!(compare_greater(&unsigned, &Value::I32(-1), &Value::I32(1)));
    }

    #[test]
    fn test_nan_skipped() {
        let d = descr(Type::DOUBLE, ConvertedType::NONE);
        let mut stats = ValueStatistics::new();
        stats.update(&d, &Value::F64(f64::NAN));
        assert_eq!(stats.min, None);
        stats.update(&d, &Value::F64(2.5));
        stats.update(&d, &Value::F64(f64::NAN));
        assert_eq!(stats.min, Some(Value::F64(2.5)));
        assert_eq!(stats.max, Some(Value::F64(2.5)));
    }

    #[test]
    fn test_byte_array_lexicographic() {
        let d = descr(Type::BYTE_ARRAY, ConvertedType::UTF8);
        let mut stats = ValueStatistics::new();
        stats.update(&d, &Value::from("pear"));
        stats.update(&d, &Value::from("apple"));
        stats.update(&d, &Value::from("fig"));
        assert_eq!(stats.min, Some(Value::from("apple")));
        assert_eq!(stats.max, Some(Value::from("pear")));
    }

    #[test]
    fn test_decimal_byte_compare() {
        let d = descr(Type::BYTE_ARRAY, ConvertedType::DECIMAL);
        // -1 (0xff) < 16 (0x10), despite 0xff > 0x10 bytewise
        assert!(compare_greater(
            &d,
            &Value::from(&[0x10u8][..]),
            &Value::from(&[0xffu8][..])
        ));
        // sign extension: 0xff10 == big-endian -240 < 0x10
        assert!(compare_greater(
            &d,
            &Value::from(&[0x10u8][..]),
            &Value::from(&[0xffu8, 0x10][..])
        ));
        // equal values of different widths are not greater
        assert!(!compare_greater(
            &d,
            &Value::from(&[0x00u8, 0x10][..]),
            &Value::from(&[0x10u8][..])
        ));
    }

    #[test]
    fn test_truncate_min() {
        assert_eq!(truncate_min_binary(b"abcdef", 3), b"abc".to_vec());
        assert_eq!(truncate_min_binary(b"ab", 3), b"ab".to_vec());
    }

    #[test]
    fn test_truncate_max_increments() {
        assert_eq!(truncate_max_binary(b"abcdef", 3), b"abd".to_vec());
        // carry across trailing 0xff
        assert_eq!(truncate_max_binary(&[0x41, 0xff, 0xff, 0x00], 3), vec![0x42]);
        // all-0xff prefix cannot be bounded by truncation
        assert_eq!(
            truncate_max_binary(&[0xff, 0xff, 0xff, 0x00], 3),
            vec![0xff, 0xff, 0xff, 0x00]
        );
        assert_eq!(truncate_max_binary(b"ab", 3), b"ab".to_vec());
    }

    #[test]
    fn test_to_thrift_legacy_fields() {
        let d = descr(Type::INT64, ConvertedType::NONE);
        let mut stats = ValueStatistics::new();
        stats.update(&d, &Value::I64(3));
        stats.null_count = 2;

        let thrift = to_thrift(Some(&stats), d.sort_order()).unwrap();
        assert_eq!(thrift.min_value, Some(3i64.to_le_bytes().to_vec()));
        assert_eq!(thrift.min, thrift.min_value);
        assert_eq!(thrift.null_count, Some(2));

        let unsigned = descr(Type::BYTE_ARRAY, ConvertedType::UTF8);
        let mut stats = ValueStatistics::new();
        stats.update(&unsigned, &Value::from("a"));
        let thrift = to_thrift(Some(&stats), unsigned.sort_order()).unwrap();
        assert_eq!(thrift.min_value, Some(b"a".to_vec()));
        assert_eq!(thrift.min, None);
    }

    #[test]
    fn test_merge() {
        let d = descr(Type::INT64, ConvertedType::NONE);
        let mut chunk = ValueStatistics::new();
        let mut page = ValueStatistics::new();
        page.update(&d, &Value::I64(5));
        page.null_count = 1;
        chunk.merge(&d, &page);
        let mut page2 = ValueStatistics::new();
        page2.update(&d, &Value::I64(-2));
        page2.null_count = 3;
        chunk.merge(&d, &page2);
        assert_eq!(chunk.min, Some(Value::I64(-2)));
        assert_eq!(chunk.max, Some(Value::I64(5)));
        assert_eq!(chunk.null_count, 4);
    }
}
