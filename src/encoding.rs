// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Binary-tolerant JSON encoding.
//!
//! Appliance wire frames are raw bytes, and byte payloads can end up nested
//! anywhere inside values exported as JSON (chiefly diagnostics). This
//! module provides a JSON encoder that substitutes a base64 text
//! representation for every binary scalar while encoding all other values
//! exactly as `serde_json` would.
//!
//! Binary scalars are classified structurally, at the [`Serializer`]
//! `serialize_bytes` seam, not by inspecting error messages after a failed
//! encode. Values without binary scalars produce output byte-identical to
//! `serde_json`, and any failure unrelated to binary data propagates
//! unchanged.
//!
//! The encoder is an explicit service: callers that need tolerant output
//! use [`to_string`]/[`to_vec`] (or wrap their own serializer in
//! [`ByteSafeSerializer`]). Nothing process-wide is replaced.
//!
//! # Examples
//!
//! ```
//! use pitboss_lib::encoding;
//! use pitboss_lib::protocol::RawFrame;
//! use std::collections::BTreeMap;
//!
//! let mut report = BTreeMap::new();
//! report.insert("frame", RawFrame::new(vec![0xFE, 0x0B, 0xFF]));
//!
//! let json = encoding::to_string(&report)?;
//! assert_eq!(json, r#"{"frame":"/gv/"}"#);
//! # Ok::<(), serde_json::Error>(())
//! ```

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::ser::{
    self, Serialize, SerializeMap, SerializeSeq, SerializeStruct, SerializeStructVariant,
    SerializeTuple, SerializeTupleStruct, SerializeTupleVariant, Serializer,
};

/// Encodes a value as a JSON string, substituting base64 text for binary
/// scalars.
///
/// # Errors
///
/// Returns any `serde_json` error that is not caused by binary data, for
/// example a map with non-string keys or a failing `Serialize`
/// implementation.
pub fn to_string<T>(value: &T) -> serde_json::Result<String>
where
    T: ?Sized + Serialize,
{
    let bytes = to_vec(value)?;
    String::from_utf8(bytes).map_err(|_| ser::Error::custom("serializer produced invalid UTF-8"))
}

/// Encodes a value as pretty-printed JSON, substituting base64 text for
/// binary scalars.
///
/// # Errors
///
/// See [`to_string`].
pub fn to_string_pretty<T>(value: &T) -> serde_json::Result<String>
where
    T: ?Sized + Serialize,
{
    let mut out = Vec::with_capacity(128);
    let mut serializer = serde_json::Serializer::pretty(&mut out);
    value.serialize(ByteSafeSerializer::new(&mut serializer))?;
    String::from_utf8(out).map_err(|_| ser::Error::custom("serializer produced invalid UTF-8"))
}

/// Encodes a value as a JSON byte vector, substituting base64 text for
/// binary scalars.
///
/// # Errors
///
/// See [`to_string`].
pub fn to_vec<T>(value: &T) -> serde_json::Result<Vec<u8>>
where
    T: ?Sized + Serialize,
{
    let mut out = Vec::with_capacity(128);
    let mut serializer = serde_json::Serializer::new(&mut out);
    value.serialize(ByteSafeSerializer::new(&mut serializer))?;
    Ok(out)
}

/// Serializer adapter that replaces binary scalars with base64 text.
///
/// Every other operation is forwarded to the wrapped serializer verbatim,
/// so output and errors for non-binary values are exactly those of the
/// inner serializer. Containers of any kind (maps, sequences, tuples,
/// structs, enum variants, options) are traversed, so binary scalars are
/// converted at arbitrary depth.
pub struct ByteSafeSerializer<S> {
    inner: S,
}

impl<S> ByteSafeSerializer<S> {
    /// Wraps a serializer.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

/// Re-enters the adapter for nested values.
struct ByteSafe<'a, T: ?Sized>(&'a T);

impl<T: ?Sized + Serialize> Serialize for ByteSafe<'_, T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(ByteSafeSerializer::new(serializer))
    }
}

impl<S: Serializer> Serializer for ByteSafeSerializer<S> {
    type Ok = S::Ok;
    type Error = S::Error;
    type SerializeSeq = SeqAdapter<S::SerializeSeq>;
    type SerializeTuple = TupleAdapter<S::SerializeTuple>;
    type SerializeTupleStruct = TupleStructAdapter<S::SerializeTupleStruct>;
    type SerializeTupleVariant = TupleVariantAdapter<S::SerializeTupleVariant>;
    type SerializeMap = MapAdapter<S::SerializeMap>;
    type SerializeStruct = StructAdapter<S::SerializeStruct>;
    type SerializeStructVariant = StructVariantAdapter<S::SerializeStructVariant>;

    fn serialize_bytes(self, v: &[u8]) -> Result<Self::Ok, Self::Error> {
        self.inner.serialize_str(&BASE64.encode(v))
    }

    fn serialize_bool(self, v: bool) -> Result<Self::Ok, Self::Error> {
        self.inner.serialize_bool(v)
    }

    fn serialize_i8(self, v: i8) -> Result<Self::Ok, Self::Error> {
        self.inner.serialize_i8(v)
    }

    fn serialize_i16(self, v: i16) -> Result<Self::Ok, Self::Error> {
        self.inner.serialize_i16(v)
    }

    fn serialize_i32(self, v: i32) -> Result<Self::Ok, Self::Error> {
        self.inner.serialize_i32(v)
    }

    fn serialize_i64(self, v: i64) -> Result<Self::Ok, Self::Error> {
        self.inner.serialize_i64(v)
    }

    fn serialize_i128(self, v: i128) -> Result<Self::Ok, Self::Error> {
        self.inner.serialize_i128(v)
    }

    fn serialize_u8(self, v: u8) -> Result<Self::Ok, Self::Error> {
        self.inner.serialize_u8(v)
    }

    fn serialize_u16(self, v: u16) -> Result<Self::Ok, Self::Error> {
        self.inner.serialize_u16(v)
    }

    fn serialize_u32(self, v: u32) -> Result<Self::Ok, Self::Error> {
        self.inner.serialize_u32(v)
    }

    fn serialize_u64(self, v: u64) -> Result<Self::Ok, Self::Error> {
        self.inner.serialize_u64(v)
    }

    fn serialize_u128(self, v: u128) -> Result<Self::Ok, Self::Error> {
        self.inner.serialize_u128(v)
    }

    fn serialize_f32(self, v: f32) -> Result<Self::Ok, Self::Error> {
        self.inner.serialize_f32(v)
    }

    fn serialize_f64(self, v: f64) -> Result<Self::Ok, Self::Error> {
        self.inner.serialize_f64(v)
    }

    fn serialize_char(self, v: char) -> Result<Self::Ok, Self::Error> {
        self.inner.serialize_char(v)
    }

    fn serialize_str(self, v: &str) -> Result<Self::Ok, Self::Error> {
        self.inner.serialize_str(v)
    }

    fn serialize_none(self) -> Result<Self::Ok, Self::Error> {
        self.inner.serialize_none()
    }

    fn serialize_some<T>(self, value: &T) -> Result<Self::Ok, Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.inner.serialize_some(&ByteSafe(value))
    }

    fn serialize_unit(self) -> Result<Self::Ok, Self::Error> {
        self.inner.serialize_unit()
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<Self::Ok, Self::Error> {
        self.inner.serialize_unit_struct(name)
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        variant_index: u32,
        variant: &'static str,
    ) -> Result<Self::Ok, Self::Error> {
        self.inner.serialize_unit_variant(name, variant_index, variant)
    }

    fn serialize_newtype_struct<T>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.inner.serialize_newtype_struct(name, &ByteSafe(value))
    }

    fn serialize_newtype_variant<T>(
        self,
        name: &'static str,
        variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.inner
            .serialize_newtype_variant(name, variant_index, variant, &ByteSafe(value))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        Ok(SeqAdapter {
            inner: self.inner.serialize_seq(len)?,
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple, Self::Error> {
        Ok(TupleAdapter {
            inner: self.inner.serialize_tuple(len)?,
        })
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        Ok(TupleStructAdapter {
            inner: self.inner.serialize_tuple_struct(name, len)?,
        })
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        Ok(TupleVariantAdapter {
            inner: self
                .inner
                .serialize_tuple_variant(name, variant_index, variant, len)?,
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        Ok(MapAdapter {
            inner: self.inner.serialize_map(len)?,
        })
    }

    fn serialize_struct(
        self,
        name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        Ok(StructAdapter {
            inner: self.inner.serialize_struct(name, len)?,
        })
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        Ok(StructVariantAdapter {
            inner: self
                .inner
                .serialize_struct_variant(name, variant_index, variant, len)?,
        })
    }

    fn collect_str<T>(self, value: &T) -> Result<Self::Ok, Self::Error>
    where
        T: ?Sized + std::fmt::Display,
    {
        self.inner.collect_str(value)
    }

    fn is_human_readable(&self) -> bool {
        self.inner.is_human_readable()
    }
}

/// Sequence adapter forwarding elements through the byte-safe wrapper.
pub struct SeqAdapter<S> {
    inner: S,
}

impl<S: SerializeSeq> SerializeSeq for SeqAdapter<S> {
    type Ok = S::Ok;
    type Error = S::Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.inner.serialize_element(&ByteSafe(value))
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        self.inner.end()
    }
}

/// Tuple adapter forwarding elements through the byte-safe wrapper.
pub struct TupleAdapter<S> {
    inner: S,
}

impl<S: SerializeTuple> SerializeTuple for TupleAdapter<S> {
    type Ok = S::Ok;
    type Error = S::Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.inner.serialize_element(&ByteSafe(value))
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        self.inner.end()
    }
}

/// Tuple struct adapter forwarding fields through the byte-safe wrapper.
pub struct TupleStructAdapter<S> {
    inner: S,
}

impl<S: SerializeTupleStruct> SerializeTupleStruct for TupleStructAdapter<S> {
    type Ok = S::Ok;
    type Error = S::Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.inner.serialize_field(&ByteSafe(value))
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        self.inner.end()
    }
}

/// Tuple variant adapter forwarding fields through the byte-safe wrapper.
pub struct TupleVariantAdapter<S> {
    inner: S,
}

impl<S: SerializeTupleVariant> SerializeTupleVariant for TupleVariantAdapter<S> {
    type Ok = S::Ok;
    type Error = S::Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.inner.serialize_field(&ByteSafe(value))
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        self.inner.end()
    }
}

/// Map adapter forwarding keys and values through the byte-safe wrapper.
pub struct MapAdapter<S> {
    inner: S,
}

impl<S: SerializeMap> SerializeMap for MapAdapter<S> {
    type Ok = S::Ok;
    type Error = S::Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.inner.serialize_key(&ByteSafe(key))
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.inner.serialize_value(&ByteSafe(value))
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        self.inner.end()
    }
}

/// Struct adapter forwarding fields through the byte-safe wrapper.
pub struct StructAdapter<S> {
    inner: S,
}

impl<S: SerializeStruct> SerializeStruct for StructAdapter<S> {
    type Ok = S::Ok;
    type Error = S::Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.inner.serialize_field(key, &ByteSafe(value))
    }

    fn skip_field(&mut self, key: &'static str) -> Result<(), Self::Error> {
        self.inner.skip_field(key)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        self.inner.end()
    }
}

/// Struct variant adapter forwarding fields through the byte-safe wrapper.
pub struct StructVariantAdapter<S> {
    inner: S,
}

impl<S: SerializeStructVariant> SerializeStructVariant for StructVariantAdapter<S> {
    type Ok = S::Ok;
    type Error = S::Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.inner.serialize_field(key, &ByteSafe(value))
    }

    fn skip_field(&mut self, key: &'static str) -> Result<(), Self::Error> {
        self.inner.skip_field(key)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        self.inner.end()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde::Serialize;

    use super::*;
    use crate::protocol::RawFrame;

    #[derive(Serialize)]
    struct Report {
        name: String,
        frame: RawFrame,
        nested: Vec<RawFrame>,
    }

    #[test]
    fn binary_scalar_becomes_base64() {
        let frame = RawFrame::new(vec![0xFE, 0x0B, 0xFF]);
        let json = to_string(&frame).unwrap();

        assert_eq!(json, "\"/gv/\"");
        let decoded = BASE64.decode("/gv/").unwrap();
        assert_eq!(decoded, vec![0xFE, 0x0B, 0xFF]);
    }

    #[test]
    fn binary_round_trips_at_depth() {
        let report = Report {
            name: "diag".to_string(),
            frame: RawFrame::new(vec![0x00, 0x01, 0x02]),
            nested: vec![RawFrame::new(vec![0xAB]), RawFrame::new(vec![0xCD, 0xEF])],
        };

        let json = to_string(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let frame = value["frame"].as_str().unwrap();
        assert_eq!(BASE64.decode(frame).unwrap(), vec![0x00, 0x01, 0x02]);

        let nested: Vec<Vec<u8>> = value["nested"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| BASE64.decode(v.as_str().unwrap()).unwrap())
            .collect();
        assert_eq!(nested, vec![vec![0xAB], vec![0xCD, 0xEF]]);
    }

    #[test]
    fn binary_inside_map_option_and_tuple() {
        let mut map: BTreeMap<String, Option<(RawFrame, u8)>> = BTreeMap::new();
        map.insert("a".to_string(), Some((RawFrame::new(vec![0xFF]), 7)));
        map.insert("b".to_string(), None);

        let json = to_string(&map).unwrap();
        assert_eq!(json, r#"{"a":["/w==",7],"b":null}"#);
    }

    #[derive(Serialize)]
    enum Record {
        Frame(RawFrame),
        Labeled { frame: RawFrame },
    }

    #[test]
    fn binary_inside_enum_variants() {
        let json = to_string(&Record::Frame(RawFrame::new(vec![0x01]))).unwrap();
        assert_eq!(json, r#"{"Frame":"AQ=="}"#);

        let json = to_string(&Record::Labeled {
            frame: RawFrame::new(vec![0x02]),
        })
        .unwrap();
        assert_eq!(json, r#"{"Labeled":{"frame":"Ag=="}}"#);
    }

    #[test]
    fn plain_values_match_serde_json_exactly() {
        let value = serde_json::json!({
            "device": "ABC123",
            "temps": [210, 225, null],
            "nested": {"on": true, "ratio": 0.5},
            "note": "grill \"ok\" ✓",
        });

        assert_eq!(to_string(&value).unwrap(), serde_json::to_string(&value).unwrap());
        assert_eq!(to_vec(&value).unwrap(), serde_json::to_vec(&value).unwrap());
        assert_eq!(
            to_string_pretty(&value).unwrap(),
            serde_json::to_string_pretty(&value).unwrap()
        );
    }

    struct Failing;

    impl Serialize for Failing {
        fn serialize<S>(&self, _serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            Err(ser::Error::custom("boom"))
        }
    }

    #[test]
    fn unrelated_errors_propagate_unchanged() {
        let err = to_string(&Failing).unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn non_string_map_keys_fail_like_serde_json() {
        let mut map: BTreeMap<Vec<u8>, u8> = BTreeMap::new();
        map.insert(vec![1, 2], 3);

        let ours = to_string(&map).unwrap_err().to_string();
        let theirs = serde_json::to_string(&map).unwrap_err().to_string();
        assert_eq!(ours, theirs);
    }

    #[test]
    fn byte_string_map_keys_become_base64() {
        let mut map: BTreeMap<RawFrame, u8> = BTreeMap::new();
        map.insert(RawFrame::new(vec![0x01]), 9);

        // Direct serde_json rejects the bytes key; the tolerant encoder
        // turns it into a base64 string key.
        assert!(serde_json::to_string(&map).is_err());
        assert_eq!(to_string(&map).unwrap(), r#"{"AQ==":9}"#);
    }

    #[test]
    fn empty_frame_encodes_as_empty_string() {
        let json = to_string(&RawFrame::new(Vec::new())).unwrap();
        assert_eq!(json, "\"\"");
    }
}
