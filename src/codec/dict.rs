// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Structural ("dict") format: records become maps keyed by field name,
//! map keys are stringified, delta output carries `null` tombstones for
//! removed map keys.

use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::codec::context::{DecodeContext, RefSite};
use crate::container::{Array, IdMap, Map, MapKey};
use crate::error::Error;
use crate::field::{exclude_oid_field, ContainerKind, Field, FieldFilter};
use crate::record::{PackOptions, Record};
use crate::types::PrimitiveKind;
use crate::value::Value;

pub(crate) type ValueEncoder = fn(&Value) -> Result<JsonValue, Error>;
pub(crate) type ValueDecoder = fn(&JsonValue) -> Result<Value, Error>;
pub(crate) type KeyEncoder = fn(&MapKey) -> Result<String, Error>;
pub(crate) type KeyDecoder = fn(&str) -> Result<MapKey, Error>;

// ---------------------------------------------------------------------------
// per-kind value codecs

fn type_mismatch(value: &Value, expected: &'static str) -> Error {
    Error::pack(format!("value {:?} is not {}", value, expected))
}

macro_rules! dict_int_codec {
    ($enc:ident, $dec:ident, $variant:ident, $ty:ty, $name:literal) => {
        fn $enc(value: &Value) -> Result<JsonValue, Error> {
            match value {
                Value::$variant(v) => Ok(JsonValue::from(*v)),
                _ => Err(type_mismatch(value, $name)),
            }
        }

        fn $dec(src: &JsonValue) -> Result<Value, Error> {
            src.as_i64()
                .and_then(|v| <$ty>::try_from(v).ok())
                .map(Value::$variant)
                .ok_or_else(|| Error::unpack(format!("cannot coerce {} to {}", src, $name)))
        }
    };
}

dict_int_codec!(enc_int8, dec_int8, I8, i8, "int8");
dict_int_codec!(enc_int16, dec_int16, I16, i16, "int16");
dict_int_codec!(enc_int32, dec_int32, I32, i32, "int32");
dict_int_codec!(enc_int64, dec_int64, I64, i64, "int64");
dict_int_codec!(enc_uint8, dec_uint8, U8, u8, "uint8");
dict_int_codec!(enc_uint16, dec_uint16, U16, u16, "uint16");
dict_int_codec!(enc_uint32, dec_uint32, U32, u32, "uint32");

fn enc_uint64(value: &Value) -> Result<JsonValue, Error> {
    match value {
        Value::U64(v) => Ok(JsonValue::from(*v)),
        _ => Err(type_mismatch(value, "uint64")),
    }
}

fn dec_uint64(src: &JsonValue) -> Result<Value, Error> {
    src.as_u64()
        .map(Value::U64)
        .ok_or_else(|| Error::unpack(format!("cannot coerce {} to uint64", src)))
}

fn enc_float(value: &Value) -> Result<JsonValue, Error> {
    match value {
        Value::F32(v) => serde_json::Number::from_f64(*v as f64)
            .map(JsonValue::Number)
            .ok_or_else(|| Error::pack("non-finite float value")),
        _ => Err(type_mismatch(value, "float")),
    }
}

fn dec_float(src: &JsonValue) -> Result<Value, Error> {
    src.as_f64()
        .map(|v| Value::F32(v as f32))
        .ok_or_else(|| Error::unpack(format!("cannot coerce {} to float", src)))
}

fn enc_double(value: &Value) -> Result<JsonValue, Error> {
    match value {
        Value::F64(v) => serde_json::Number::from_f64(*v)
            .map(JsonValue::Number)
            .ok_or_else(|| Error::pack("non-finite double value")),
        _ => Err(type_mismatch(value, "double")),
    }
}

fn dec_double(src: &JsonValue) -> Result<Value, Error> {
    src.as_f64()
        .map(Value::F64)
        .ok_or_else(|| Error::unpack(format!("cannot coerce {} to double", src)))
}

fn enc_bool(value: &Value) -> Result<JsonValue, Error> {
    match value {
        Value::Bool(v) => Ok(JsonValue::Bool(*v)),
        _ => Err(type_mismatch(value, "bool")),
    }
}

fn dec_bool(src: &JsonValue) -> Result<Value, Error> {
    src.as_bool()
        .map(Value::Bool)
        .ok_or_else(|| Error::unpack(format!("cannot coerce {} to bool", src)))
}

fn enc_string(value: &Value) -> Result<JsonValue, Error> {
    match value {
        Value::Str(v) => Ok(JsonValue::String(v.clone())),
        _ => Err(type_mismatch(value, "string")),
    }
}

fn dec_string(src: &JsonValue) -> Result<Value, Error> {
    src.as_str()
        .map(|v| Value::Str(v.to_string()))
        .ok_or_else(|| Error::unpack(format!("cannot coerce {} to string", src)))
}

pub(crate) fn value_encoder(kind: PrimitiveKind) -> ValueEncoder {
    match kind {
        PrimitiveKind::Int8 => enc_int8,
        PrimitiveKind::UInt8 => enc_uint8,
        PrimitiveKind::Int16 => enc_int16,
        PrimitiveKind::UInt16 => enc_uint16,
        PrimitiveKind::Int32 => enc_int32,
        PrimitiveKind::UInt32 => enc_uint32,
        PrimitiveKind::Int64 => enc_int64,
        PrimitiveKind::UInt64 => enc_uint64,
        PrimitiveKind::Float => enc_float,
        PrimitiveKind::Double => enc_double,
        PrimitiveKind::Bool => enc_bool,
        PrimitiveKind::String => enc_string,
    }
}

pub(crate) fn value_decoder(kind: PrimitiveKind) -> ValueDecoder {
    match kind {
        PrimitiveKind::Int8 => dec_int8,
        PrimitiveKind::UInt8 => dec_uint8,
        PrimitiveKind::Int16 => dec_int16,
        PrimitiveKind::UInt16 => dec_uint16,
        PrimitiveKind::Int32 => dec_int32,
        PrimitiveKind::UInt32 => dec_uint32,
        PrimitiveKind::Int64 => dec_int64,
        PrimitiveKind::UInt64 => dec_uint64,
        PrimitiveKind::Float => dec_float,
        PrimitiveKind::Double => dec_double,
        PrimitiveKind::Bool => dec_bool,
        PrimitiveKind::String => dec_string,
    }
}

// ---------------------------------------------------------------------------
// per-kind key codecs (map keys are strings in the structural format)

fn enc_key_int(key: &MapKey) -> Result<String, Error> {
    match key {
        MapKey::Int(v) => Ok(v.to_string()),
        MapKey::UInt(v) => Ok(v.to_string()),
        _ => Err(Error::pack(format!("map key {:?} is not an integer", key))),
    }
}

fn enc_key_bool(key: &MapKey) -> Result<String, Error> {
    match key {
        MapKey::Bool(v) => Ok(v.to_string()),
        _ => Err(Error::pack(format!("map key {:?} is not a bool", key))),
    }
}

fn enc_key_str(key: &MapKey) -> Result<String, Error> {
    match key {
        MapKey::Str(v) => Ok(v.clone()),
        _ => Err(Error::pack(format!("map key {:?} is not a string", key))),
    }
}

fn enc_key_unsupported(key: &MapKey) -> Result<String, Error> {
    Err(Error::pack(format!("unsupported map key {:?}", key)))
}

pub(crate) fn key_encoder(kind: PrimitiveKind) -> KeyEncoder {
    match kind {
        PrimitiveKind::Bool => enc_key_bool,
        PrimitiveKind::String => enc_key_str,
        kind if kind.is_integer() => enc_key_int,
        _ => enc_key_unsupported,
    }
}

macro_rules! dict_int_key_decoder {
    ($name:ident, $kind:expr) => {
        fn $name(src: &str) -> Result<MapKey, Error> {
            let wide: i128 = src
                .parse()
                .map_err(|_| Error::unpack(format!("bad integer map key `{}'", src)))?;
            let value = Value::from_i128($kind, wide)
                .map_err(|_| Error::unpack(format!("map key `{}' out of range", src)))?;
            value
                .to_map_key()
                .ok_or_else(|| Error::unpack(format!("map key `{}' is not hashable", src)))
        }
    };
}

dict_int_key_decoder!(dec_key_int8, PrimitiveKind::Int8);
dict_int_key_decoder!(dec_key_uint8, PrimitiveKind::UInt8);
dict_int_key_decoder!(dec_key_int16, PrimitiveKind::Int16);
dict_int_key_decoder!(dec_key_uint16, PrimitiveKind::UInt16);
dict_int_key_decoder!(dec_key_int32, PrimitiveKind::Int32);
dict_int_key_decoder!(dec_key_uint32, PrimitiveKind::UInt32);
dict_int_key_decoder!(dec_key_int64, PrimitiveKind::Int64);
dict_int_key_decoder!(dec_key_uint64, PrimitiveKind::UInt64);

fn dec_key_bool(src: &str) -> Result<MapKey, Error> {
    match src.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(MapKey::Bool(true)),
        "false" | "0" => Ok(MapKey::Bool(false)),
        _ => Err(Error::unpack(format!("bad bool map key `{}'", src))),
    }
}

fn dec_key_str(src: &str) -> Result<MapKey, Error> {
    Ok(MapKey::Str(src.to_string()))
}

fn dec_key_unsupported(src: &str) -> Result<MapKey, Error> {
    Err(Error::unpack(format!("unsupported map key `{}'", src)))
}

pub(crate) fn key_decoder(kind: PrimitiveKind) -> KeyDecoder {
    match kind {
        PrimitiveKind::Int8 => dec_key_int8,
        PrimitiveKind::UInt8 => dec_key_uint8,
        PrimitiveKind::Int16 => dec_key_int16,
        PrimitiveKind::UInt16 => dec_key_uint16,
        PrimitiveKind::Int32 => dec_key_int32,
        PrimitiveKind::UInt32 => dec_key_uint32,
        PrimitiveKind::Int64 => dec_key_int64,
        PrimitiveKind::UInt64 => dec_key_uint64,
        PrimitiveKind::Bool => dec_key_bool,
        PrimitiveKind::String => dec_key_str,
        _ => dec_key_unsupported,
    }
}

// ---------------------------------------------------------------------------
// encoding

/// Encode a record into a structural map. A top-level encode always yields
/// a map, possibly empty under delta packing.
pub(crate) fn encode_record(record: &Record, opts: &PackOptions) -> Result<JsonValue, Error> {
    let mut out = JsonMap::new();
    encode_into(
        &mut out,
        record,
        opts.recursive,
        opts.only_changed,
        opts.clear_changed,
        opts.field_filter.as_ref(),
        opts.fields.as_deref(),
    )?;
    Ok(JsonValue::Object(out))
}

/// The oid a ref field serializes: the target's `oid` value, or the raw oid
/// scalar if the slot still holds an unresolved reference.
pub(crate) fn ref_oid_value(value: &Value) -> Result<Value, Error> {
    match value {
        Value::Record(record) => record.get("oid"),
        other => Ok(other.clone()),
    }
}

/// Walk the field table and emit present, filter-accepted (and, under
/// delta, changed) fields. Returns whether anything was emitted so a parent
/// can elide the field entirely.
fn encode_into(
    out: &mut JsonMap<String, JsonValue>,
    record: &Record,
    recursive: bool,
    only_changed: bool,
    clear_changed: bool,
    filter: Option<&FieldFilter>,
    restrict: Option<&[String]>,
) -> Result<bool, Error> {
    let protocol = record.protocol();
    let mut have_data = !only_changed;

    for (pos, field) in protocol.fields().iter().enumerate() {
        let Some(value) = record.slot(pos) else {
            continue;
        };
        if let Some(names) = restrict {
            if !names.iter().any(|n| n == field.name()) {
                continue;
            }
        }
        if let Some(filter) = filter {
            if !filter.accepts(field) {
                continue;
            }
        }
        if only_changed && !record.field_changed_internal(field, recursive) {
            continue;
        }

        match field.container() {
            ContainerKind::Array => {
                let array = value
                    .as_array()
                    .ok_or_else(|| Error::pack(format!("field {} holds no array", field.name())))?;
                let mut items = Vec::with_capacity(array.len());
                for element in array.to_vec() {
                    // element positions stay aligned: "nothing to pack" is
                    // not elided inside a list
                    let encoded = field_value_to_dict(
                        field,
                        &element,
                        recursive,
                        only_changed,
                        clear_changed,
                        filter,
                        false,
                    )?;
                    items.push(encoded.unwrap_or(JsonValue::Null));
                }
                out.insert(field.name().to_string(), JsonValue::Array(items));
                have_data = true;
            }
            ContainerKind::Map => {
                let map = value
                    .as_map()
                    .ok_or_else(|| Error::pack(format!("field {} holds no map", field.name())))?;
                let kencoder = key_encoder_slot(field)?;
                let mut nested = JsonMap::new();
                for (key, element) in map.entries() {
                    let key = kencoder(&key)?;
                    let encoded = field_value_to_dict(
                        field,
                        &element,
                        recursive,
                        only_changed,
                        clear_changed,
                        filter,
                        true,
                    )?;
                    if let Some(encoded) = encoded {
                        nested.insert(key, encoded);
                        have_data = true;
                    }
                }
                if only_changed {
                    for key in map.removed_keys() {
                        nested.insert(kencoder(&key)?, JsonValue::Null);
                        have_data = true;
                    }
                }
                out.insert(field.name().to_string(), JsonValue::Object(nested));
            }
            ContainerKind::IdMap => {
                let map = value
                    .as_id_map()
                    .ok_or_else(|| Error::pack(format!("field {} holds no id map", field.name())))?;
                let kencoder = key_encoder_slot(field)?;
                let element_filter = filter
                    .cloned()
                    .unwrap_or_default()
                    .merged(&FieldFilter::with(exclude_oid_field));
                let mut nested = JsonMap::new();
                for (_, element) in map.entries() {
                    let child = element.as_record().ok_or_else(|| {
                        Error::pack(format!("id map {} holds a non-record element", field.name()))
                    })?;
                    let key = kencoder(&child.oid_key()?)?;
                    let encoded = field_value_to_dict(
                        field,
                        &element,
                        recursive,
                        only_changed,
                        clear_changed,
                        Some(&element_filter),
                        true,
                    )?;
                    if let Some(encoded) = encoded {
                        nested.insert(key, encoded);
                        have_data = true;
                    }
                }
                if only_changed {
                    for key in map.removed_keys() {
                        nested.insert(kencoder(&key)?, JsonValue::Null);
                        have_data = true;
                    }
                }
                out.insert(field.name().to_string(), JsonValue::Object(nested));
            }
            ContainerKind::Scalar => {
                let encoded = field_value_to_dict(
                    field,
                    &value,
                    recursive,
                    only_changed,
                    clear_changed,
                    filter,
                    true,
                )?;
                if let Some(encoded) = encoded {
                    out.insert(field.name().to_string(), encoded);
                    have_data = true;
                }
            }
        }
    }

    if clear_changed {
        record.clear_changed(&[], false);
    }

    Ok(have_data)
}

fn key_encoder_slot(field: &Field) -> Result<KeyEncoder, Error> {
    field
        .codecs
        .dict_key_encode
        .ok_or_else(|| Error::pack(format!("field {} has no key codec", field.name())))
}

/// Encode one field value. `Ok(None)` is the "nothing to pack" sentinel:
/// the nested record produced no keys under delta packing and the parent
/// elides the entry (`with_skip` false forces emission for list elements).
fn field_value_to_dict(
    field: &Field,
    value: &Value,
    recursive: bool,
    only_changed: bool,
    clear_changed: bool,
    filter: Option<&FieldFilter>,
    with_skip: bool,
) -> Result<Option<JsonValue>, Error> {
    if let Some(encoder) = field.codecs.dict_encode {
        return encoder(value).map(Some);
    }
    if !recursive {
        return Ok(Some(JsonValue::Null));
    }
    if field.is_ref() {
        let encoder = field
            .codecs
            .dict_ref_encode
            .ok_or_else(|| Error::pack(format!("field {} has no ref codec", field.name())))?;
        return encoder(&ref_oid_value(value)?).map(Some);
    }
    let nested_record = value
        .as_record()
        .ok_or_else(|| Error::pack(format!("field {} holds no record", field.name())))?;
    let mut nested = JsonMap::new();
    let have_data = encode_into(
        &mut nested,
        nested_record,
        recursive,
        only_changed,
        clear_changed,
        filter,
        None,
    )?;
    if !with_skip || have_data {
        Ok(Some(JsonValue::Object(nested)))
    } else {
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// decoding

/// Decode a structural map into `record`, walking the schema rather than
/// the input. `null` field values are treated as missing data.
pub(crate) fn decode_record(
    record: &Record,
    data: &JsonValue,
    ctx: &mut DecodeContext,
) -> Result<(), Error> {
    let src = data
        .as_object()
        .ok_or_else(|| Error::unpack(format!("expected a structural map, got {}", data)))?;
    let protocol = record.protocol();

    for (pos, field) in protocol.fields().iter().enumerate() {
        let Some(dvalue) = src.get(field.name()) else {
            continue;
        };
        if dvalue.is_null() {
            continue;
        }

        match field.container() {
            ContainerKind::Array => {
                let list = dvalue.as_array().ok_or_else(|| {
                    Error::unpack(format!("field {} expects a list", field.name()))
                })?;
                let array = Array::new();
                record.raw_set_slot(pos, Value::Array(array.clone()));
                for element in list {
                    if element.is_null() {
                        continue;
                    }
                    let value = field_value_from_dict(field, element, None, ctx)?;
                    array.raw_push(value.clone());
                    if field.is_ref() {
                        let oid = oid_key_of(field, &value)?;
                        ctx.add_ref_site(RefSite::ArrayAt {
                            array: array.clone(),
                            index: array.len() - 1,
                            oid,
                        });
                    }
                }
            }
            ContainerKind::Map => {
                let entries = dvalue.as_object().ok_or_else(|| {
                    Error::unpack(format!("field {} expects a map", field.name()))
                })?;
                let kdecoder = key_decoder_slot(field)?;
                let map = match (ctx.sync_mode(), record.slot(pos)) {
                    (true, Some(Value::Map(existing))) => existing,
                    _ => {
                        let fresh = Map::new();
                        record.raw_set_slot(pos, Value::Map(fresh.clone()));
                        fresh
                    }
                };
                for (raw_key, element) in entries {
                    let key = kdecoder(raw_key)?;
                    if element.is_null() {
                        // tombstone in sync mode, missing data otherwise
                        if ctx.sync_mode() && map.contains_key(&key) {
                            map.remove(&key);
                        }
                        continue;
                    }
                    let old = if ctx.sync_mode() { map.get(&key) } else { None };
                    let value = field_value_from_dict(field, element, old, ctx)?;
                    map.raw_insert(key.clone(), value.clone());
                    if field.is_ref() {
                        let oid = oid_key_of(field, &value)?;
                        ctx.add_ref_site(RefSite::MapAt {
                            map: map.clone(),
                            key,
                            oid,
                        });
                    }
                }
            }
            ContainerKind::IdMap => {
                let entries = dvalue.as_object().ok_or_else(|| {
                    Error::unpack(format!("field {} expects a map", field.name()))
                })?;
                let kdecoder = key_decoder_slot(field)?;
                let map = match (ctx.sync_mode(), record.slot(pos)) {
                    (true, Some(Value::IdMap(existing))) => existing,
                    _ => {
                        let fresh = IdMap::new();
                        record.raw_set_slot(pos, Value::IdMap(fresh.clone()));
                        fresh
                    }
                };
                for (raw_key, element) in entries {
                    let oid = kdecoder(raw_key)?;
                    if element.is_null() {
                        if ctx.sync_mode() && map.contains_key(&oid) {
                            map.remove_key(&oid);
                        }
                        continue;
                    }
                    let old = if ctx.sync_mode() { map.get(&oid) } else { None };
                    let value = field_object_from_dict(field, Some(&oid), element, old, ctx)?;
                    map.raw_insert(oid.clone(), value.clone());
                    if field.is_ref() {
                        let ref_oid = oid_key_of(field, &value)?;
                        ctx.add_ref_site(RefSite::IdMapAt {
                            map: map.clone(),
                            key: oid,
                            oid: ref_oid,
                        });
                    }
                }
            }
            ContainerKind::Scalar => {
                let old = if ctx.sync_mode() { record.slot(pos) } else { None };
                let value = field_value_from_dict(field, dvalue, old, ctx)?;
                record.raw_set_slot(pos, value.clone());
                if field.is_ref() {
                    let oid = oid_key_of(field, &value)?;
                    ctx.add_ref_site(RefSite::Slot {
                        owner: record.clone(),
                        pos,
                        oid,
                    });
                }
            }
        }

        if ctx.mark_change() {
            record.mark_dirty_index(field.index());
        }
    }

    Ok(())
}

fn key_decoder_slot(field: &Field) -> Result<KeyDecoder, Error> {
    field
        .codecs
        .dict_key_decode
        .ok_or_else(|| Error::pack(format!("field {} has no key codec", field.name())))
}

/// The map-key form of a decoded (not yet resolved) oid value.
pub(crate) fn oid_key_of(field: &Field, value: &Value) -> Result<MapKey, Error> {
    value
        .to_map_key()
        .ok_or_else(|| Error::unpack(format!("oid of field {} is not hashable", field.name())))
}

fn field_value_from_dict(
    field: &Field,
    src: &JsonValue,
    old: Option<Value>,
    ctx: &mut DecodeContext,
) -> Result<Value, Error> {
    if let Some(decoder) = field.codecs.dict_decode {
        return decoder(src);
    }
    field_object_from_dict(field, None, src, old, ctx)
}

fn field_object_from_dict(
    field: &Field,
    oid: Option<&MapKey>,
    src: &JsonValue,
    old: Option<Value>,
    ctx: &mut DecodeContext,
) -> Result<Value, Error> {
    if field.is_ref() {
        let decoder = field
            .codecs
            .dict_ref_decode
            .ok_or_else(|| Error::pack(format!("field {} has no ref codec", field.name())))?;
        return decoder(src);
    }
    let target = field.field_type().target_protocol().ok_or_else(|| {
        Error::unpack(format!("field {} cannot hold nested data", field.name()))
    })?;
    let (decoded, fresh) = match old {
        Some(Value::Record(existing)) => (existing, false),
        _ => (Record::new(target), true),
    };
    decode_record(&decoded, src, ctx)?;
    let record = ctx.finish_record_value(field, oid, decoded, fresh)?;
    Ok(Value::Record(record))
}
