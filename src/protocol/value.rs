//! # Native Values
//!
//! The closed set of value shapes the value encoder can serialize, and a
//! `serde` bridge that maps Rust data onto them.
//!
//! ## Shapes
//! `None`, `Bool`, `Int` (arbitrary precision), `Float`, `Bytes`, `Str`,
//! `Tuple`, `List`, `Dict`. Dict entries keep their insertion order, which is
//! the order they are emitted in.
//!
//! ## Serde Mapping
//! | Rust                          | PickleValue |
//! |-------------------------------|-------------|
//! | `()`, `None`                  | `None`      |
//! | `bool`                        | `Bool`      |
//! | integers (incl. 128-bit)      | `Int`       |
//! | `f32`, `f64`                  | `Float`     |
//! | `serialize_bytes`             | `Bytes`     |
//! | `char`, `str`, `String`       | `Str`       |
//! | tuples, tuple structs         | `Tuple`     |
//! | sequences                     | `List`      |
//! | maps, structs                 | `Dict`      |
//!
//! Unit structs and enum variants have no counterpart and are rejected with
//! `AssemblerError::UnsupportedType`.

use crate::error::{AssemblerError, Result};
use num_bigint::BigInt;
use serde::ser::{self, Serialize};

/// A value the value encoder knows how to emit
#[derive(Debug, Clone, PartialEq)]
pub enum PickleValue {
    None,
    Bool(bool),
    Int(BigInt),
    Float(f64),
    Bytes(Vec<u8>),
    Str(String),
    Tuple(Vec<PickleValue>),
    List(Vec<PickleValue>),
    /// Entries in insertion order. Keys must be pairwise distinct; the
    /// encoder rejects a repeated key instead of letting the decoder keep
    /// the last one.
    Dict(Vec<(PickleValue, PickleValue)>),
}

impl PickleValue {
    /// Name of the value's shape, for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            PickleValue::None => "none",
            PickleValue::Bool(_) => "bool",
            PickleValue::Int(_) => "int",
            PickleValue::Float(_) => "float",
            PickleValue::Bytes(_) => "bytes",
            PickleValue::Str(_) => "str",
            PickleValue::Tuple(_) => "tuple",
            PickleValue::List(_) => "list",
            PickleValue::Dict(_) => "dict",
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for PickleValue {
            fn from(v: $t) -> Self {
                PickleValue::Int(BigInt::from(v))
            }
        })*
    };
}

impl_from_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl From<BigInt> for PickleValue {
    fn from(v: BigInt) -> Self {
        PickleValue::Int(v)
    }
}

impl From<bool> for PickleValue {
    fn from(v: bool) -> Self {
        PickleValue::Bool(v)
    }
}

impl From<f64> for PickleValue {
    fn from(v: f64) -> Self {
        PickleValue::Float(v)
    }
}

impl From<&str> for PickleValue {
    fn from(v: &str) -> Self {
        PickleValue::Str(v.to_string())
    }
}

impl From<String> for PickleValue {
    fn from(v: String) -> Self {
        PickleValue::Str(v)
    }
}

impl From<&[u8]> for PickleValue {
    fn from(v: &[u8]) -> Self {
        PickleValue::Bytes(v.to_vec())
    }
}

impl<T: Into<PickleValue>> From<Option<T>> for PickleValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(PickleValue::None, Into::into)
    }
}

impl<T: Into<PickleValue>> From<Vec<T>> for PickleValue {
    fn from(v: Vec<T>) -> Self {
        PickleValue::List(v.into_iter().map(Into::into).collect())
    }
}

/// Convert any `Serialize` value into a [`PickleValue`].
///
/// # Errors
/// Returns `AssemblerError::UnsupportedType` for unit structs and enum
/// variants.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<PickleValue> {
    value.serialize(ValueSerializer)
}

/// `serde::Serializer` producing [`PickleValue`]s
pub struct ValueSerializer;

fn unsupported<T>(what: &str) -> Result<T> {
    Err(AssemblerError::UnsupportedType(what.to_string()))
}

impl ser::Serializer for ValueSerializer {
    type Ok = PickleValue;
    type Error = AssemblerError;

    type SerializeSeq = SeqBuilder;
    type SerializeTuple = SeqBuilder;
    type SerializeTupleStruct = SeqBuilder;
    type SerializeTupleVariant = ser::Impossible<PickleValue, AssemblerError>;
    type SerializeMap = MapBuilder;
    type SerializeStruct = MapBuilder;
    type SerializeStructVariant = ser::Impossible<PickleValue, AssemblerError>;

    fn serialize_bool(self, v: bool) -> Result<PickleValue> {
        Ok(PickleValue::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<PickleValue> {
        Ok(v.into())
    }

    fn serialize_i16(self, v: i16) -> Result<PickleValue> {
        Ok(v.into())
    }

    fn serialize_i32(self, v: i32) -> Result<PickleValue> {
        Ok(v.into())
    }

    fn serialize_i64(self, v: i64) -> Result<PickleValue> {
        Ok(v.into())
    }

    fn serialize_i128(self, v: i128) -> Result<PickleValue> {
        Ok(v.into())
    }

    fn serialize_u8(self, v: u8) -> Result<PickleValue> {
        Ok(v.into())
    }

    fn serialize_u16(self, v: u16) -> Result<PickleValue> {
        Ok(v.into())
    }

    fn serialize_u32(self, v: u32) -> Result<PickleValue> {
        Ok(v.into())
    }

    fn serialize_u64(self, v: u64) -> Result<PickleValue> {
        Ok(v.into())
    }

    fn serialize_u128(self, v: u128) -> Result<PickleValue> {
        Ok(v.into())
    }

    fn serialize_f32(self, v: f32) -> Result<PickleValue> {
        Ok(PickleValue::Float(f64::from(v)))
    }

    fn serialize_f64(self, v: f64) -> Result<PickleValue> {
        Ok(PickleValue::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<PickleValue> {
        Ok(PickleValue::Str(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<PickleValue> {
        Ok(v.into())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<PickleValue> {
        Ok(v.into())
    }

    fn serialize_none(self) -> Result<PickleValue> {
        Ok(PickleValue::None)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<PickleValue> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<PickleValue> {
        Ok(PickleValue::None)
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<PickleValue> {
        unsupported(name)
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<PickleValue> {
        unsupported(&format!("{name}::{variant}"))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<PickleValue> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _value: &T,
    ) -> Result<PickleValue> {
        unsupported(&format!("{name}::{variant}"))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqBuilder> {
        Ok(SeqBuilder::new(len, false))
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqBuilder> {
        Ok(SeqBuilder::new(Some(len), true))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SeqBuilder> {
        Ok(SeqBuilder::new(Some(len), true))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        unsupported(&format!("{name}::{variant}"))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<MapBuilder> {
        Ok(MapBuilder::new(len))
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<MapBuilder> {
        Ok(MapBuilder::new(Some(len)))
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        unsupported(&format!("{name}::{variant}"))
    }
}

/// Collects sequence and tuple elements
pub struct SeqBuilder {
    items: Vec<PickleValue>,
    tuple: bool,
}

impl SeqBuilder {
    fn new(len: Option<usize>, tuple: bool) -> Self {
        Self {
            items: Vec::with_capacity(len.unwrap_or(0)),
            tuple,
        }
    }

    fn push<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.items.push(to_value(value)?);
        Ok(())
    }

    fn finish(self) -> PickleValue {
        if self.tuple {
            PickleValue::Tuple(self.items)
        } else {
            PickleValue::List(self.items)
        }
    }
}

impl ser::SerializeSeq for SeqBuilder {
    type Ok = PickleValue;
    type Error = AssemblerError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<PickleValue> {
        Ok(self.finish())
    }
}

impl ser::SerializeTuple for SeqBuilder {
    type Ok = PickleValue;
    type Error = AssemblerError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<PickleValue> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleStruct for SeqBuilder {
    type Ok = PickleValue;
    type Error = AssemblerError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<PickleValue> {
        Ok(self.finish())
    }
}

/// Collects map entries and struct fields in insertion order
pub struct MapBuilder {
    entries: Vec<(PickleValue, PickleValue)>,
    pending_key: Option<PickleValue>,
}

impl MapBuilder {
    fn new(len: Option<usize>) -> Self {
        Self {
            entries: Vec::with_capacity(len.unwrap_or(0)),
            pending_key: None,
        }
    }
}

impl ser::SerializeMap for MapBuilder {
    type Ok = PickleValue;
    type Error = AssemblerError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<()> {
        self.pending_key = Some(to_value(key)?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let key = self.pending_key.take().ok_or_else(|| {
            AssemblerError::InvalidArgument("map value serialized before its key".to_string())
        })?;
        self.entries.push((key, to_value(value)?));
        Ok(())
    }

    fn end(self) -> Result<PickleValue> {
        Ok(PickleValue::Dict(self.entries))
    }
}

impl ser::SerializeStruct for MapBuilder {
    type Ok = PickleValue;
    type Error = AssemblerError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<()> {
        self.entries.push((key.into(), to_value(value)?));
        Ok(())
    }

    fn end(self) -> Result<PickleValue> {
        Ok(PickleValue::Dict(self.entries))
    }
}
