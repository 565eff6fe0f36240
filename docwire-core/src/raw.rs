//! Capture of pre-encoded payloads for raw bodies.
//!
//! A raw body is never re-encoded. Strings and byte slices are copied as
//! they are, and byte sequences such as `Vec<u8>` or `[u8; N]` are collected
//! element by element straight into the output buffer. Every other shape is
//! rejected.

use std::fmt;

use serde::ser::{self, Impossible, Serialize, SerializeSeq, SerializeTuple, Serializer};

use crate::BodyError;

/// Collect the bytes of a string or byte sequence.
pub(crate) fn to_raw_bytes<T>(value: &T) -> Result<Vec<u8>, BodyError>
where
    T: Serialize + ?Sized,
{
    value
        .serialize(RawSerializer)
        .map_err(|e| BodyError::invalid_argument(e.0))
}

#[derive(Debug)]
struct RawError(String);

impl fmt::Display for RawError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for RawError {}

impl ser::Error for RawError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        RawError(msg.to_string())
    }
}

fn unsupported(what: &str) -> RawError {
    RawError(format!("raw body must be bytes or a string, got {what}"))
}

macro_rules! reject {
    ($($method:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method(self, _: $ty) -> Result<Self::Ok, Self::Error> {
                Err(unsupported(stringify!($ty)))
            }
        )*
    };
}

/// Serializes the whole body.
struct RawSerializer;

impl Serializer for RawSerializer {
    type Ok = Vec<u8>;
    type Error = RawError;
    type SerializeSeq = ByteSeq;
    type SerializeTuple = ByteSeq;
    type SerializeTupleStruct = Impossible<Vec<u8>, RawError>;
    type SerializeTupleVariant = Impossible<Vec<u8>, RawError>;
    type SerializeMap = Impossible<Vec<u8>, RawError>;
    type SerializeStruct = Impossible<Vec<u8>, RawError>;
    type SerializeStructVariant = Impossible<Vec<u8>, RawError>;

    reject!(
        serialize_bool: bool,
        serialize_i8: i8,
        serialize_i16: i16,
        serialize_i32: i32,
        serialize_i64: i64,
        serialize_u8: u8,
        serialize_u16: u16,
        serialize_u32: u32,
        serialize_u64: u64,
        serialize_f32: f32,
        serialize_f64: f64,
        serialize_char: char,
    );

    fn serialize_str(self, v: &str) -> Result<Vec<u8>, RawError> {
        Ok(v.as_bytes().to_vec())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Vec<u8>, RawError> {
        Ok(v.to_vec())
    }

    fn serialize_none(self) -> Result<Vec<u8>, RawError> {
        Err(unsupported("none"))
    }

    fn serialize_some<T>(self, value: &T) -> Result<Vec<u8>, RawError>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Vec<u8>, RawError> {
        Err(unsupported("unit"))
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<Vec<u8>, RawError> {
        Err(unsupported(name))
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<Vec<u8>, RawError> {
        Err(unsupported(name))
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<Vec<u8>, RawError>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Vec<u8>, RawError>
    where
        T: Serialize + ?Sized,
    {
        Err(unsupported(name))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<ByteSeq, RawError> {
        Ok(ByteSeq(Vec::with_capacity(len.unwrap_or(0))))
    }

    fn serialize_tuple(self, len: usize) -> Result<ByteSeq, RawError> {
        Ok(ByteSeq(Vec::with_capacity(len)))
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, RawError> {
        Err(unsupported(name))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, RawError> {
        Err(unsupported(name))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, RawError> {
        Err(unsupported("map"))
    }

    fn serialize_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, RawError> {
        Err(unsupported(name))
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, RawError> {
        Err(unsupported(name))
    }
}

/// Output buffer of a byte sequence.
struct ByteSeq(Vec<u8>);

impl SerializeSeq for ByteSeq {
    type Ok = Vec<u8>;
    type Error = RawError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), RawError>
    where
        T: Serialize + ?Sized,
    {
        self.0.push(value.serialize(ByteSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Vec<u8>, RawError> {
        Ok(self.0)
    }
}

impl SerializeTuple for ByteSeq {
    type Ok = Vec<u8>;
    type Error = RawError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), RawError>
    where
        T: Serialize + ?Sized,
    {
        SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Vec<u8>, RawError> {
        Ok(self.0)
    }
}

macro_rules! byte {
    ($($method:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method(self, v: $ty) -> Result<u8, RawError> {
                u8::try_from(v).map_err(|_| RawError(format!("raw body byte out of range: {v}")))
            }
        )*
    };
}

/// Serializes one element of a byte sequence.
struct ByteSerializer;

impl Serializer for ByteSerializer {
    type Ok = u8;
    type Error = RawError;
    type SerializeSeq = Impossible<u8, RawError>;
    type SerializeTuple = Impossible<u8, RawError>;
    type SerializeTupleStruct = Impossible<u8, RawError>;
    type SerializeTupleVariant = Impossible<u8, RawError>;
    type SerializeMap = Impossible<u8, RawError>;
    type SerializeStruct = Impossible<u8, RawError>;
    type SerializeStructVariant = Impossible<u8, RawError>;

    byte!(
        serialize_i8: i8,
        serialize_i16: i16,
        serialize_i32: i32,
        serialize_i64: i64,
        serialize_u16: u16,
        serialize_u32: u32,
        serialize_u64: u64,
    );

    reject!(
        serialize_bool: bool,
        serialize_f32: f32,
        serialize_f64: f64,
        serialize_char: char,
        serialize_str: &str,
        serialize_bytes: &[u8],
    );

    fn serialize_u8(self, v: u8) -> Result<u8, RawError> {
        Ok(v)
    }

    fn serialize_none(self) -> Result<u8, RawError> {
        Err(unsupported("none"))
    }

    fn serialize_some<T>(self, _value: &T) -> Result<u8, RawError>
    where
        T: Serialize + ?Sized,
    {
        Err(unsupported("option"))
    }

    fn serialize_unit(self) -> Result<u8, RawError> {
        Err(unsupported("unit"))
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<u8, RawError> {
        Err(unsupported(name))
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<u8, RawError> {
        Err(unsupported(name))
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<u8, RawError>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<u8, RawError>
    where
        T: Serialize + ?Sized,
    {
        Err(unsupported(name))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, RawError> {
        Err(unsupported("nested sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, RawError> {
        Err(unsupported("nested sequence"))
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, RawError> {
        Err(unsupported(name))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, RawError> {
        Err(unsupported(name))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, RawError> {
        Err(unsupported("map"))
    }

    fn serialize_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, RawError> {
        Err(unsupported(name))
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, RawError> {
        Err(unsupported(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strings_and_byte_sequences() {
        assert_eq!(to_raw_bytes("PK\u{3}\u{4}").unwrap(), b"PK\x03\x04");
        assert_eq!(to_raw_bytes(&vec![0u8, 255]).unwrap(), vec![0u8, 255]);
        assert_eq!(to_raw_bytes(&[1u8, 2, 3]).unwrap(), vec![1u8, 2, 3]);
        assert_eq!(to_raw_bytes(&b"abc"[..]).unwrap(), b"abc");
        assert_eq!(to_raw_bytes(&Some("x".to_string())).unwrap(), b"x");
        assert!(to_raw_bytes(&Vec::<u8>::new()).unwrap().is_empty());
    }

    #[test]
    fn test_integer_sequences_in_range() {
        assert_eq!(to_raw_bytes(&json!([1, 2, 255])).unwrap(), vec![1u8, 2, 255]);
        assert!(to_raw_bytes(&json!([256])).is_err());
        assert!(to_raw_bytes(&vec![-1i32]).is_err());
    }

    #[test]
    fn test_rejects_structured_values() {
        for value in [json!({"a": 1}), json!(1), json!(null), json!(true), json!([[1]])] {
            let err = to_raw_bytes(&value).unwrap_err();
            assert!(matches!(err, BodyError::InvalidArgument(_)), "{value}");
        }
        assert!(to_raw_bytes(&vec!["a"]).is_err());
    }
}
