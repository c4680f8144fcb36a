// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Serde field names of a target type, read without a value.
//!
//! Undeclared fields are renamed by the naming strategy on write. Reading
//! them back needs the exact serde name, since `translate` is lossy
//! (`page_count` and `pageCount` both become `page_count` in snake case).
//!
//! Hits read from `fields` carry every value as an array, so the converter
//! also needs to know which fields hold sequences.

use serde::de::{self, Deserialize, DeserializeSeed, Deserializer, IntoDeserializer, MapAccess, Visitor};
use serde::forward_to_deserialize_any;

/// Field names serde expects for `T`, when `T` deserializes as a struct
pub fn serde_field_names<'de, T: Deserialize<'de>>() -> Option<&'static [&'static str]> {
    let mut names = FieldNames { fields: None };
    // Always fails: the deserializer only records what it was asked for
    let _ = T::deserialize(&mut names);
    names.fields
}

/// Serde field names of `T` whose values deserialize as sequences
/// (`Vec`, sets, arrays and tuples, also behind `Option`)
pub fn serde_sequence_fields<'de, T: Deserialize<'de>>() -> Vec<&'static str> {
    let Some(names) = serde_field_names::<T>() else {
        return Vec::new();
    };
    names
        .iter()
        .copied()
        .filter(|name| {
            let mut shape = FieldShape { field: *name, is_seq: false };
            let _ = T::deserialize(&mut shape);
            shape.is_seq
        })
        .collect()
}

struct FieldNames {
    fields: Option<&'static [&'static str]>,
}

impl<'de, 'a> Deserializer<'de> for &'a mut FieldNames {
    type Error = de::value::Error;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(de::Error::custom("no value"))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.fields = Some(fields);
        Err(de::Error::custom("no value"))
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map enum identifier ignored_any
    }
}

/// Feeds `T` a struct holding only `field`, recording how its value is read
struct FieldShape {
    field: &'static str,
    is_seq: bool,
}

impl<'de, 'a> Deserializer<'de> for &'a mut FieldShape {
    type Error = de::value::Error;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(de::Error::custom("no value"))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_map(OneField {
            field: Some(self.field),
            is_seq: &mut self.is_seq,
        })
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map enum identifier ignored_any
    }
}

struct OneField<'a> {
    field: Option<&'static str>,
    is_seq: &'a mut bool,
}

impl<'de, 'a> MapAccess<'de> for OneField<'a> {
    type Error = de::value::Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error> {
        match self.field.take() {
            Some(field) => seed.deserialize(field.into_deserializer()).map(Some),
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, Self::Error> {
        seed.deserialize(ValueShape { is_seq: self.is_seq })
    }
}

struct ValueShape<'a> {
    is_seq: &'a mut bool,
}

impl<'de, 'a> Deserializer<'de> for ValueShape<'a> {
    type Error = de::value::Error;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(de::Error::custom("no value"))
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        *self.is_seq = true;
        Err(de::Error::custom("no value"))
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, _visitor: V) -> Result<V::Value, Self::Error> {
        *self.is_seq = true;
        Err(de::Error::custom("no value"))
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct tuple_struct map struct enum
        identifier ignored_any
    }
}
