//! Dynamic value and record trees accepted by the writer.

use std::hash::{Hash, Hasher};

use bytes::Bytes;

use crate::basic::Type;
use crate::errors::Result;

/// A 96-bit value, stored as three little-endian 32-bit words. Kept for
/// compatibility with legacy writers; new schemas should prefer INT64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Int96 {
    value: [u32; 3],
}

impl Int96 {
    pub fn new(elem0: u32, elem1: u32, elem2: u32) -> Self {
        Self { value: [elem0, elem1, elem2] }
    }

    pub fn data(&self) -> &[u32; 3] {
        &self.value
    }

    pub fn to_le_bytes(&self) -> [u8; 12] {
        let mut out = [0u8; 12];
        for (i, v) in self.value.iter().enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
        }
        out
    }
}

/// A runtime value for exactly one leaf column, as a closed tagged variant
/// over the Parquet physical types. `FIXED_LEN_BYTE_ARRAY` values are
/// carried as [`Value::Bytes`] and validated against the leaf's declared
/// length when shredded.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    I32(i32),
    I64(i64),
    I96(Int96),
    F32(f32),
    F64(f64),
    Bytes(Bytes),
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "BOOLEAN",
            Value::I32(_) => "INT32",
            Value::I64(_) => "INT64",
            Value::I96(_) => "INT96",
            Value::F32(_) => "FLOAT",
            Value::F64(_) => "DOUBLE",
            Value::Bytes(_) => "BYTE_ARRAY",
            Value::Null => "NULL",
        }
    }

    /// Coerce this value to the given physical type, applying only lossless
    /// conversions (widening integers and floats).
    pub fn coerce(self, physical_type: Type, type_length: i32) -> Result<Value> {
        let coerced = match (physical_type, self) {
            (Type::BOOLEAN, v @ Value::Bool(_)) => v,
            (Type::INT32, v @ Value::I32(_)) => v,
            (Type::INT64, v @ Value::I64(_)) => v,
            (Type::INT64, Value::I32(v)) => Value::I64(v as i64),
            (Type::INT96, v @ Value::I96(_)) => v,
            (Type::FLOAT, v @ Value::F32(_)) => v,
            (Type::DOUBLE, v @ Value::F64(_)) => v,
            (Type::DOUBLE, Value::F32(v)) => Value::F64(v as f64),
            (Type::DOUBLE, Value::I32(v)) => Value::F64(v as f64),
            (Type::BYTE_ARRAY, v @ Value::Bytes(_)) => v,
            (Type::FIXED_LEN_BYTE_ARRAY, Value::Bytes(b)) => {
                if b.len() != type_length as usize {
                    return Err(type_err!(
                        "fixed length mismatch: got {} bytes, leaf declares {}",
                        b.len(),
                        type_length
                    ));
                }
                Value::Bytes(b)
            }
            (expected, got) => {
                return Err(type_err!(
                    "value of type {} does not fit leaf type {}",
                    got.type_name(),
                    expected
                ))
            }
        };
        Ok(coerced)
    }

    /// Plain-encoded byte size of this value, the unit of the page-size
    /// estimator. Booleans round up to one byte.
    pub fn plain_size(&self) -> usize {
        match self {
            Value::Bool(_) => 1,
            Value::I32(_) | Value::F32(_) => 4,
            Value::I64(_) | Value::F64(_) => 8,
            Value::I96(_) => 12,
            Value::Bytes(b) => 4 + b.len(),
            Value::Null => 0,
        }
    }
}

// Bit-pattern equality so values can key a dictionary. Floats compare by
// bits, which is stricter than IEEE equality and never groups distinct
// representations.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::I96(a), Value::I96(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a.to_bits() == b.to_bits(),
            (Value::F64(a), Value::F64(b)) => a.to_bits() == b.to_bits(),
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Null, Value::Null) => true,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Bool(v) => v.hash(state),
            Value::I32(v) => v.hash(state),
            Value::I64(v) => v.hash(state),
            Value::I96(v) => v.hash(state),
            Value::F32(v) => v.to_bits().hash(state),
            Value::F64(v) => v.to_bits().hash(state),
            Value::Bytes(v) => v.hash(state),
            Value::Null => {}
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<Int96> for Value {
    fn from(v: Int96) -> Self {
        Value::I96(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Bytes(Bytes::copy_from_slice(v.as_bytes()))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Bytes(Bytes::from(v.into_bytes()))
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(Bytes::copy_from_slice(v))
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Value::Bytes(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// One logical record: a tree of groups, lists and leaf values that mirrors
/// the shape of the schema it is written against.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// A group node: named fields in any order. Fields omitted from the
    /// group are treated as absent.
    Group(Vec<(String, Record)>),
    /// The items of a repeated field.
    List(Vec<Record>),
    /// A leaf value; [`Value::Null`] marks an absent optional.
    Atom(Value),
}

impl Record {
    pub fn group<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Record)>,
        S: Into<String>,
    {
        Record::Group(fields.into_iter().map(|(name, r)| (name.into(), r)).collect())
    }

    pub fn list<I: IntoIterator<Item = Record>>(items: I) -> Self {
        Record::List(items.into_iter().collect())
    }

    pub fn null() -> Self {
        Record::Atom(Value::Null)
    }

    /// Field lookup within a group; `None` for non-groups or missing names.
    pub fn field(&self, name: &str) -> Option<&Record> {
        match self {
            Record::Group(fields) => {
                fields.iter().find(|(n, _)| n == name).map(|(_, r)| r)
            }
            _ => None,
        }
    }
}

impl From<Value> for Record {
    fn from(v: Value) -> Self {
        Record::Atom(v)
    }
}

macro_rules! record_from_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Record {
                fn from(v: $ty) -> Self {
                    Record::Atom(v.into())
                }
            }

            impl From<Option<$ty>> for Record {
                fn from(v: Option<$ty>) -> Self {
                    Record::Atom(v.into())
                }
            }
        )*
    };
}

record_from_value!(bool, i32, i64, Int96, f32, f64, &str, String, &[u8], Bytes);
