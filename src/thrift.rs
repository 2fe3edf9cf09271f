//! A minimal implementation of the Thrift [compact] protocol.
//!
//! The write path serializes page headers, the footer and the page indexes
//! through [`ThriftCompactOutputProtocol`] and the [`WriteThrift`] /
//! [`WriteThriftField`] traits. The slice-based input half exists so written
//! files can be decoded again, primarily by the crate's own tests.
//!
//! [compact]: https://github.com/apache/thrift/blob/master/doc/specs/thrift-compact-protocol.md

use std::io::Write;

use crate::errors::{Error, Result};

/// Thrift compact protocol types for struct fields.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldType {
    Stop = 0,
    BooleanTrue = 1,
    BooleanFalse = 2,
    Byte = 3,
    I16 = 4,
    I32 = 5,
    I64 = 6,
    Double = 7,
    Binary = 8,
    List = 9,
    Set = 10,
    Map = 11,
    Struct = 12,
}

impl TryFrom<u8> for FieldType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Ok(match value {
            0 => Self::Stop,
            1 => Self::BooleanTrue,
            2 => Self::BooleanFalse,
            3 => Self::Byte,
            4 => Self::I16,
            5 => Self::I32,
            6 => Self::I64,
            7 => Self::Double,
            8 => Self::Binary,
            9 => Self::List,
            10 => Self::Set,
            11 => Self::Map,
            12 => Self::Struct,
            _ => return Err(general_err!("unexpected struct field type {}", value)),
        })
    }
}

/// Thrift compact protocol types for list elements.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ElementType {
    Bool = 2,
    Byte = 3,
    I16 = 4,
    I32 = 5,
    I64 = 6,
    Double = 7,
    Binary = 8,
    List = 9,
    Struct = 12,
}

impl TryFrom<u8> for ElementType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Ok(match value {
            // both values are seen in the wild for bool elements
            1 | 2 => Self::Bool,
            3 => Self::Byte,
            4 => Self::I16,
            5 => Self::I32,
            6 => Self::I64,
            7 => Self::Double,
            8 => Self::Binary,
            9 => Self::List,
            12 => Self::Struct,
            _ => return Err(general_err!("unexpected list element type {}", value)),
        })
    }
}

// ----------------------------------------------------------------------
// Output

/// Serializer for the Thrift compact output protocol, wrapping a [`Write`].
pub struct ThriftCompactOutputProtocol<W: Write> {
    writer: W,
}

impl<W: Write> ThriftCompactOutputProtocol<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    fn write_byte(&mut self, b: u8) -> Result<()> {
        self.writer.write_all(&[b])?;
        Ok(())
    }

    /// ULEB128 encoded unsigned varint.
    fn write_vlq(&mut self, val: u64) -> Result<()> {
        let mut v = val;
        while v > 0x7f {
            self.write_byte(v as u8 | 0x80)?;
            v >>= 7;
        }
        self.write_byte(v as u8)
    }

    /// Zig-zag encoded signed varint.
    fn write_zig_zag(&mut self, val: i64) -> Result<()> {
        let s = (val < 0) as i64;
        self.write_vlq((((val ^ -s) << 1) + s) as u64)
    }

    /// Mark the start of struct field `field_id` of type `field_type`,
    /// encoding a short delta to `last_field_id` when possible.
    pub fn write_field_begin(
        &mut self,
        field_type: FieldType,
        field_id: i16,
        last_field_id: i16,
    ) -> Result<()> {
        let delta = field_id.wrapping_sub(last_field_id);
        if delta > 0 && delta <= 0xf {
            self.write_byte((delta as u8) << 4 | field_type as u8)
        } else {
            self.write_byte(field_type as u8)?;
            self.write_i16(field_id)
        }
    }

    /// Mark the start of a list of `len` `element_type` elements.
    pub fn write_list_begin(&mut self, element_type: ElementType, len: usize) -> Result<()> {
        if len < 15 {
            self.write_byte((len as u8) << 4 | element_type as u8)
        } else {
            self.write_byte(0xf0u8 | element_type as u8)?;
            self.write_vlq(len as _)
        }
    }

    /// Terminate the current struct. Must follow the last field.
    pub fn write_struct_end(&mut self) -> Result<()> {
        self.write_byte(0)
    }

    /// Encode a struct with no fields: the field header followed directly by
    /// the end-of-struct marker. Used for union variants carrying no data.
    pub fn write_empty_struct(&mut self, field_id: i16, last_field_id: i16) -> Result<i16> {
        self.write_field_begin(FieldType::Struct, field_id, last_field_id)?;
        self.write_struct_end()?;
        Ok(field_id)
    }

    /// Length-prefixed binary.
    pub fn write_bytes(&mut self, val: &[u8]) -> Result<()> {
        self.write_vlq(val.len() as u64)?;
        self.writer.write_all(val)?;
        Ok(())
    }

    pub fn write_bool(&mut self, val: bool) -> Result<()> {
        match val {
            true => self.write_byte(1),
            false => self.write_byte(2),
        }
    }

    pub fn write_i8(&mut self, val: i8) -> Result<()> {
        self.write_byte(val as u8)
    }

    pub fn write_i16(&mut self, val: i16) -> Result<()> {
        self.write_zig_zag(val as _)
    }

    pub fn write_i32(&mut self, val: i32) -> Result<()> {
        self.write_zig_zag(val as _)
    }

    pub fn write_i64(&mut self, val: i64) -> Result<()> {
        self.write_zig_zag(val)
    }

    pub fn write_double(&mut self, val: f64) -> Result<()> {
        self.writer.write_all(&val.to_le_bytes())?;
        Ok(())
    }
}

/// Trait implemented by objects serializable as Thrift compact values.
pub trait WriteThrift {
    /// The [`ElementType`] to use when a list of this object is written.
    const ELEMENT_TYPE: ElementType;

    fn write_thrift<W: Write>(&self, writer: &mut ThriftCompactOutputProtocol<W>) -> Result<()>;
}

impl<T: WriteThrift> WriteThrift for Vec<T> {
    const ELEMENT_TYPE: ElementType = ElementType::List;

    fn write_thrift<W: Write>(&self, writer: &mut ThriftCompactOutputProtocol<W>) -> Result<()> {
        writer.write_list_begin(T::ELEMENT_TYPE, self.len())?;
        for item in self {
            item.write_thrift(writer)?;
        }
        Ok(())
    }
}

macro_rules! write_thrift_primitive {
    ($ty:ty, $elem:expr, $method:ident) => {
        impl WriteThrift for $ty {
            const ELEMENT_TYPE: ElementType = $elem;

            fn write_thrift<W: Write>(
                &self,
                writer: &mut ThriftCompactOutputProtocol<W>,
            ) -> Result<()> {
                writer.$method(*self)
            }
        }
    };
}

write_thrift_primitive!(bool, ElementType::Bool, write_bool);
write_thrift_primitive!(i8, ElementType::Byte, write_i8);
write_thrift_primitive!(i16, ElementType::I16, write_i16);
write_thrift_primitive!(i32, ElementType::I32, write_i32);
write_thrift_primitive!(i64, ElementType::I64, write_i64);
write_thrift_primitive!(f64, ElementType::Double, write_double);

impl WriteThrift for &[u8] {
    const ELEMENT_TYPE: ElementType = ElementType::Binary;

    fn write_thrift<W: Write>(&self, writer: &mut ThriftCompactOutputProtocol<W>) -> Result<()> {
        writer.write_bytes(self)
    }
}

impl WriteThrift for &str {
    const ELEMENT_TYPE: ElementType = ElementType::Binary;

    fn write_thrift<W: Write>(&self, writer: &mut ThriftCompactOutputProtocol<W>) -> Result<()> {
        writer.write_bytes(self.as_bytes())
    }
}

impl WriteThrift for String {
    const ELEMENT_TYPE: ElementType = ElementType::Binary;

    fn write_thrift<W: Write>(&self, writer: &mut ThriftCompactOutputProtocol<W>) -> Result<()> {
        writer.write_bytes(self.as_bytes())
    }
}

/// Trait implemented by objects that appear as fields of Thrift structs.
/// Writes the field header (threading `last_field_id` through for delta
/// encoding) followed by the value, returning `field_id` for chaining.
pub trait WriteThriftField {
    fn write_thrift_field<W: Write>(
        &self,
        writer: &mut ThriftCompactOutputProtocol<W>,
        field_id: i16,
        last_field_id: i16,
    ) -> Result<i16>;
}

// bool struct fields carry their value in the field header
impl WriteThriftField for bool {
    fn write_thrift_field<W: Write>(
        &self,
        writer: &mut ThriftCompactOutputProtocol<W>,
        field_id: i16,
        last_field_id: i16,
    ) -> Result<i16> {
        match *self {
            true => writer.write_field_begin(FieldType::BooleanTrue, field_id, last_field_id)?,
            false => writer.write_field_begin(FieldType::BooleanFalse, field_id, last_field_id)?,
        }
        Ok(field_id)
    }
}

macro_rules! write_thrift_field_impl {
    ($ty:ty, $field_type:expr) => {
        impl WriteThriftField for $ty {
            fn write_thrift_field<W: Write>(
                &self,
                writer: &mut ThriftCompactOutputProtocol<W>,
                field_id: i16,
                last_field_id: i16,
            ) -> Result<i16> {
                writer.write_field_begin($field_type, field_id, last_field_id)?;
                self.write_thrift(writer)?;
                Ok(field_id)
            }
        }
    };
}

write_thrift_field_impl!(i8, FieldType::Byte);
write_thrift_field_impl!(i16, FieldType::I16);
write_thrift_field_impl!(i32, FieldType::I32);
write_thrift_field_impl!(i64, FieldType::I64);
write_thrift_field_impl!(f64, FieldType::Double);
write_thrift_field_impl!(&str, FieldType::Binary);
write_thrift_field_impl!(String, FieldType::Binary);
write_thrift_field_impl!(&[u8], FieldType::Binary);

impl<T: WriteThrift> WriteThriftField for Vec<T> {
    fn write_thrift_field<W: Write>(
        &self,
        writer: &mut ThriftCompactOutputProtocol<W>,
        field_id: i16,
        last_field_id: i16,
    ) -> Result<i16> {
        writer.write_field_begin(FieldType::List, field_id, last_field_id)?;
        self.write_thrift(writer)?;
        Ok(field_id)
    }
}

// ----------------------------------------------------------------------
// Input

/// Identifier of a struct field read from the input.
pub struct FieldIdentifier {
    pub field_type: FieldType,
    pub id: i16,
    /// Boolean fields carry their value in the type nibble.
    pub bool_val: Option<bool>,
}

/// Identifier of a list read from the input.
pub struct ListIdentifier {
    pub element_type: ElementType,
    pub size: i32,
}

/// Thrift compact protocol reader over a byte slice.
pub struct ThriftSliceInputProtocol<'a> {
    buf: &'a [u8],
}

impl<'a> ThriftSliceInputProtocol<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// The unread remainder of the input.
    pub fn as_slice(&self) -> &'a [u8] {
        self.buf
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        let ret = *self
            .buf
            .first()
            .ok_or_else(|| general_err!("unexpected end of thrift input"))?;
        self.buf = &self.buf[1..];
        Ok(ret)
    }

    pub fn read_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.read_vlq()? as usize;
        let ret = self
            .buf
            .get(..len)
            .ok_or_else(|| general_err!("unexpected end of thrift input"))?;
        self.buf = &self.buf[len..];
        Ok(ret)
    }

    pub fn read_vlq(&mut self) -> Result<u64> {
        let mut in_progress = 0u64;
        let mut shift = 0;
        loop {
            let byte = self.read_byte()?;
            in_progress |= ((byte & 0x7f) as u64).wrapping_shl(shift);
            if byte & 0x80 == 0 {
                return Ok(in_progress);
            }
            shift += 7;
        }
    }

    pub fn read_zig_zag(&mut self) -> Result<i64> {
        let val = self.read_vlq()?;
        Ok((val >> 1) as i64 ^ -((val & 1) as i64))
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        match self.read_byte()? {
            0x01 => Ok(true),
            0x00 | 0x02 => Ok(false),
            b => Err(general_err!("cannot convert {} into bool", b)),
        }
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_zig_zag()? as _)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_zig_zag()? as _)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.read_zig_zag()
    }

    pub fn read_double(&mut self) -> Result<f64> {
        let slice = self
            .buf
            .get(..8)
            .ok_or_else(|| general_err!("unexpected end of thrift input"))?;
        self.buf = &self.buf[8..];
        Ok(f64::from_le_bytes(slice.try_into().unwrap()))
    }

    pub fn read_string(&mut self) -> Result<String> {
        let slice = self.read_bytes()?;
        String::from_utf8(slice.to_vec()).map_err(|_| general_err!("invalid utf8 string"))
    }

    pub fn read_list_begin(&mut self) -> Result<ListIdentifier> {
        let header = self.read_byte()?;
        // writers in the wild emit a bare 0 for an empty list
        if header == 0 {
            return Ok(ListIdentifier { element_type: ElementType::Byte, size: 0 });
        }
        let element_type = ElementType::try_from(header & 0x0f)?;
        let short_size = (header & 0xf0) >> 4;
        let size = if short_size != 15 { short_size as i32 } else { self.read_vlq()? as i32 };
        Ok(ListIdentifier { element_type, size })
    }

    pub fn read_field_begin(&mut self, last_field_id: i16) -> Result<FieldIdentifier> {
        let byte = self.read_byte()?;
        let field_delta = (byte & 0xf0) >> 4;
        let field_type = FieldType::try_from(byte & 0x0f)?;
        if field_type == FieldType::Stop {
            return Ok(FieldIdentifier { field_type, id: 0, bool_val: None });
        }
        let bool_val = match field_type {
            FieldType::BooleanTrue => Some(true),
            FieldType::BooleanFalse => Some(false),
            _ => None,
        };
        let id = if field_delta != 0 {
            last_field_id
                .checked_add(field_delta as i16)
                .ok_or_else(|| general_err!("field id delta overflow"))?
        } else {
            self.read_i16()?
        };
        Ok(FieldIdentifier { field_type, id, bool_val })
    }

    /// Skip a value of the given field type, recursing into nested structs
    /// and lists up to a fixed depth.
    pub fn skip(&mut self, field_type: FieldType) -> Result<()> {
        self.skip_till_depth(field_type, 16)
    }

    fn skip_till_depth(&mut self, field_type: FieldType, depth: i8) -> Result<()> {
        if depth == 0 {
            return Err(general_err!("thrift skip depth exceeded"));
        }
        match field_type {
            FieldType::BooleanTrue | FieldType::BooleanFalse => Ok(()),
            FieldType::Byte => self.read_byte().map(|_| ()),
            FieldType::I16 | FieldType::I32 | FieldType::I64 => self.read_vlq().map(|_| ()),
            FieldType::Double => self.read_double().map(|_| ()),
            FieldType::Binary => self.read_bytes().map(|_| ()),
            FieldType::Struct => {
                let mut last_field_id = 0i16;
                loop {
                    let ident = self.read_field_begin(last_field_id)?;
                    if ident.field_type == FieldType::Stop {
                        return Ok(());
                    }
                    self.skip_till_depth(ident.field_type, depth - 1)?;
                    last_field_id = ident.id;
                }
            }
            FieldType::List => {
                let ident = self.read_list_begin()?;
                let elem = FieldType::try_from(ident.element_type as u8)?;
                for _ in 0..ident.size {
                    self.skip_till_depth(elem, depth - 1)?;
                }
                Ok(())
            }
            other => Err(general_err!("cannot skip field type {:?}", other)),
        }
    }

    /// Consume the single stop byte of a struct with no fields.
    pub fn skip_empty_struct(&mut self) -> Result<()> {
        if self.read_byte()? != 0 {
            return Err(general_err!("expected empty struct"));
        }
        Ok(())
    }
}

/// Trait implemented by objects deserializable from the compact protocol.
pub trait ReadThrift: Sized {
    fn read_thrift(prot: &mut ThriftSliceInputProtocol<'_>) -> Result<Self>;
}

impl ReadThrift for bool {
    fn read_thrift(prot: &mut ThriftSliceInputProtocol<'_>) -> Result<Self> {
        prot.read_bool()
    }
}

impl ReadThrift for i32 {
    fn read_thrift(prot: &mut ThriftSliceInputProtocol<'_>) -> Result<Self> {
        prot.read_i32()
    }
}

impl ReadThrift for i64 {
    fn read_thrift(prot: &mut ThriftSliceInputProtocol<'_>) -> Result<Self> {
        prot.read_i64()
    }
}

impl ReadThrift for String {
    fn read_thrift(prot: &mut ThriftSliceInputProtocol<'_>) -> Result<Self> {
        prot.read_string()
    }
}

impl ReadThrift for Vec<u8> {
    fn read_thrift(prot: &mut ThriftSliceInputProtocol<'_>) -> Result<Self> {
        Ok(prot.read_bytes()?.to_vec())
    }
}

/// Read a Thrift encoded list of `T`.
pub fn read_thrift_vec<T: ReadThrift>(prot: &mut ThriftSliceInputProtocol<'_>) -> Result<Vec<T>> {
    let ident = prot.read_list_begin()?;
    let mut res = Vec::with_capacity(ident.size.max(0) as usize);
    for _ in 0..ident.size {
        res.push(T::read_thrift(prot)?);
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode<F>(f: F) -> Vec<u8>
    where
        F: FnOnce(&mut ThriftCompactOutputProtocol<&mut Vec<u8>>),
    {
        let mut buf = Vec::new();
        let mut writer = ThriftCompactOutputProtocol::new(&mut buf);
        f(&mut writer);
        buf
    }

    #[test]
    fn test_vlq_zig_zag_roundtrip() {
        for v in [0i64, 1, -1, 63, -64, 127, 128, -1000, i32::MAX as i64, i64::MIN] {
            let buf = encode(|w| w.write_i64(v).unwrap());
            let mut prot = ThriftSliceInputProtocol::new(&buf);
            assert_eq!(prot.read_i64().unwrap(), v);
        }
    }

    #[test]
    fn test_field_delta_encoding() {
        // deltas <= 15 use the single-byte form
        let buf = encode(|w| {
            w.write_field_begin(FieldType::I32, 1, 0).unwrap();
            w.write_i32(7).unwrap();
        });
        assert_eq!(buf[0], 0x15);
        let mut prot = ThriftSliceInputProtocol::new(&buf);
        let ident = prot.read_field_begin(0).unwrap();
        assert_eq!(ident.id, 1);
        assert_eq!(ident.field_type, FieldType::I32);
        assert_eq!(prot.read_i32().unwrap(), 7);
    }

    #[test]
    fn test_long_field_delta() {
        let buf = encode(|w| w.write_field_begin(FieldType::I64, 100, 0).unwrap());
        let mut prot = ThriftSliceInputProtocol::new(&buf);
        let ident = prot.read_field_begin(0).unwrap();
        assert_eq!(ident.id, 100);
    }

    #[test]
    fn test_bool_field_in_header() {
        let buf = encode(|w| {
            true.write_thrift_field(w, 3, 0).unwrap();
        });
        let mut prot = ThriftSliceInputProtocol::new(&buf);
        let ident = prot.read_field_begin(0).unwrap();
        assert_eq!(ident.id, 3);
        assert_eq!(ident.bool_val, Some(true));
    }

    #[test]
    fn test_list_roundtrip() {
        let values = vec![1i64, -5, 1 << 40];
        let buf = encode(|w| values.write_thrift(w).unwrap());
        let mut prot = ThriftSliceInputProtocol::new(&buf);
        assert_eq!(read_thrift_vec::<i64>(&mut prot).unwrap(), values);
    }

    #[test]
    fn test_long_list_header() {
        let values: Vec<i32> = (0..20).collect();
        let buf = encode(|w| values.write_thrift(w).unwrap());
        let mut prot = ThriftSliceInputProtocol::new(&buf);
        assert_eq!(read_thrift_vec::<i32>(&mut prot).unwrap(), values);
    }

    #[test]
    fn test_empty_list_decoding() {
        let mut prot = ThriftSliceInputProtocol::new(&[0u8]);
        let ident = prot.read_list_begin().unwrap();
        assert_eq!(ident.size, 0);
    }

    #[test]
    fn test_skip_struct() {
        let buf = encode(|w| {
            5i32.write_thrift_field(w, 1, 0).unwrap();
            "hello".write_thrift_field(w, 2, 1).unwrap();
            w.write_struct_end().unwrap();
        });
        let mut prot = ThriftSliceInputProtocol::new(&buf);
        prot.skip(FieldType::Struct).unwrap();
        assert!(prot.as_slice().is_empty());
    }
}
