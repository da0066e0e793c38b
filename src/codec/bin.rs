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

//! Binary format: a record body is a run of `<u16 field index, payload>`
//! pairs terminated by index `0`. Containers carry a head tag byte and a
//! `u32` element count. Everything is big-endian.

use crate::buffer::{Reader, Writer};
use crate::codec::context::{DecodeContext, RefSite};
use crate::codec::dict::{oid_key_of, ref_oid_value};
use crate::container::{Array, IdMap, Map, MapKey};
use crate::error::Error;
use crate::field::{exclude_oid_field, ContainerKind, Field, FieldFilter};
use crate::record::{PackOptions, Record};
use crate::types::{ContainerTag, PrimitiveKind, FIELD_INDEX_END};
use crate::value::Value;

pub(crate) type ValueEncoder = fn(&mut Writer, &Value) -> Result<(), Error>;
pub(crate) type ValueDecoder = fn(&mut Reader) -> Result<Value, Error>;
pub(crate) type KeyEncoder = fn(&mut Writer, &MapKey) -> Result<(), Error>;
pub(crate) type KeyDecoder = fn(&mut Reader) -> Result<MapKey, Error>;

// ---------------------------------------------------------------------------
// per-kind value codecs

macro_rules! bin_scalar_codec {
    ($enc:ident, $dec:ident, $variant:ident, $write:ident, $read:ident, $name:literal) => {
        fn $enc(writer: &mut Writer, value: &Value) -> Result<(), Error> {
            match value {
                Value::$variant(v) => {
                    writer.$write(*v);
                    Ok(())
                }
                _ => Err(Error::pack(format!("value {:?} is not {}", value, $name))),
            }
        }

        fn $dec(reader: &mut Reader) -> Result<Value, Error> {
            reader.$read().map(Value::$variant)
        }
    };
}

bin_scalar_codec!(enc_int8, dec_int8, I8, write_i8, read_i8, "int8");
bin_scalar_codec!(enc_uint8, dec_uint8, U8, write_u8, read_u8, "uint8");
bin_scalar_codec!(enc_int16, dec_int16, I16, write_i16, read_i16, "int16");
bin_scalar_codec!(enc_uint16, dec_uint16, U16, write_u16, read_u16, "uint16");
bin_scalar_codec!(enc_int32, dec_int32, I32, write_i32, read_i32, "int32");
bin_scalar_codec!(enc_uint32, dec_uint32, U32, write_u32, read_u32, "uint32");
bin_scalar_codec!(enc_int64, dec_int64, I64, write_i64, read_i64, "int64");
bin_scalar_codec!(enc_uint64, dec_uint64, U64, write_u64, read_u64, "uint64");
bin_scalar_codec!(enc_float, dec_float, F32, write_f32, read_f32, "float");
bin_scalar_codec!(enc_double, dec_double, F64, write_f64, read_f64, "double");
bin_scalar_codec!(enc_bool, dec_bool, Bool, write_bool, read_bool, "bool");

fn enc_string(writer: &mut Writer, value: &Value) -> Result<(), Error> {
    match value {
        Value::Str(v) => writer.write_str(v),
        _ => Err(Error::pack(format!("value {:?} is not string", value))),
    }
}

fn dec_string(reader: &mut Reader) -> Result<Value, Error> {
    reader.read_str().map(Value::Str)
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
// per-kind key codecs

macro_rules! bin_key_codec {
    ($enc:ident, $dec:ident, $kind:expr) => {
        fn $enc(writer: &mut Writer, key: &MapKey) -> Result<(), Error> {
            let value = key
                .to_value($kind)
                .map_err(|_| Error::pack(format!("map key {:?} does not fit its kind", key)))?;
            value_encoder($kind)(writer, &value)
        }

        fn $dec(reader: &mut Reader) -> Result<MapKey, Error> {
            let value = value_decoder($kind)(reader)?;
            value
                .to_map_key()
                .ok_or_else(|| Error::unpack("decoded map key is not hashable"))
        }
    };
}

bin_key_codec!(enc_key_int8, dec_key_int8, PrimitiveKind::Int8);
bin_key_codec!(enc_key_uint8, dec_key_uint8, PrimitiveKind::UInt8);
bin_key_codec!(enc_key_int16, dec_key_int16, PrimitiveKind::Int16);
bin_key_codec!(enc_key_uint16, dec_key_uint16, PrimitiveKind::UInt16);
bin_key_codec!(enc_key_int32, dec_key_int32, PrimitiveKind::Int32);
bin_key_codec!(enc_key_uint32, dec_key_uint32, PrimitiveKind::UInt32);
bin_key_codec!(enc_key_int64, dec_key_int64, PrimitiveKind::Int64);
bin_key_codec!(enc_key_uint64, dec_key_uint64, PrimitiveKind::UInt64);
bin_key_codec!(enc_key_bool, dec_key_bool, PrimitiveKind::Bool);
bin_key_codec!(enc_key_string, dec_key_string, PrimitiveKind::String);

fn enc_key_unsupported(_writer: &mut Writer, key: &MapKey) -> Result<(), Error> {
    Err(Error::pack(format!("unsupported map key {:?}", key)))
}

fn dec_key_unsupported(_reader: &mut Reader) -> Result<MapKey, Error> {
    Err(Error::unpack("unsupported map key kind"))
}

pub(crate) fn key_encoder(kind: PrimitiveKind) -> KeyEncoder {
    match kind {
        PrimitiveKind::Int8 => enc_key_int8,
        PrimitiveKind::UInt8 => enc_key_uint8,
        PrimitiveKind::Int16 => enc_key_int16,
        PrimitiveKind::UInt16 => enc_key_uint16,
        PrimitiveKind::Int32 => enc_key_int32,
        PrimitiveKind::UInt32 => enc_key_uint32,
        PrimitiveKind::Int64 => enc_key_int64,
        PrimitiveKind::UInt64 => enc_key_uint64,
        PrimitiveKind::Bool => enc_key_bool,
        PrimitiveKind::String => enc_key_string,
        _ => enc_key_unsupported,
    }
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
        PrimitiveKind::String => dec_key_string,
        _ => dec_key_unsupported,
    }
}

// ---------------------------------------------------------------------------
// encoding

pub(crate) fn encode_record(record: &Record, opts: &PackOptions) -> Result<Vec<u8>, Error> {
    let mut writer = Writer::new();
    encode_into(
        &mut writer,
        record,
        opts.recursive,
        opts.only_changed,
        opts.clear_changed,
        opts.field_filter.as_ref(),
    )?;
    Ok(writer.dump())
}

fn write_container_head(writer: &mut Writer, tag: ContainerTag, len: usize) {
    writer.write_u8(tag.into());
    writer.write_u32(len as u32);
}

fn encode_into(
    writer: &mut Writer,
    record: &Record,
    recursive: bool,
    only_changed: bool,
    clear_changed: bool,
    filter: Option<&FieldFilter>,
) -> Result<(), Error> {
    let protocol = record.protocol();

    for (pos, field) in protocol.fields().iter().enumerate() {
        let Some(value) = record.slot(pos) else {
            continue;
        };
        if let Some(filter) = filter {
            if !filter.accepts(field) {
                continue;
            }
        }
        if only_changed && !record.field_changed_internal(field, recursive) {
            continue;
        }
        // record-typed payloads only exist when recursion is on; a bare
        // field index with no payload would corrupt the stream
        if field.codecs.bin_encode.is_none() && !recursive {
            continue;
        }

        writer.write_u16(field.index());
        match field.container() {
            ContainerKind::Array => {
                let array = value
                    .as_array()
                    .ok_or_else(|| Error::pack(format!("field {} holds no array", field.name())))?;
                let items = array.to_vec();
                write_container_head(writer, ContainerTag::Array, items.len());
                for element in &items {
                    field_value_to_binary(
                        writer,
                        field,
                        element,
                        recursive,
                        only_changed,
                        clear_changed,
                        filter,
                    )?;
                }
            }
            ContainerKind::Map => {
                let map = value
                    .as_map()
                    .ok_or_else(|| Error::pack(format!("field {} holds no map", field.name())))?;
                let kencoder = key_encoder_slot(field)?;
                let entries = map.entries();
                write_container_head(writer, ContainerTag::Map, entries.len());
                for (key, element) in &entries {
                    kencoder(writer, key)?;
                    field_value_to_binary(
                        writer,
                        field,
                        element,
                        recursive,
                        only_changed,
                        clear_changed,
                        filter,
                    )?;
                }
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
                let entries = map.entries();
                write_container_head(writer, ContainerTag::IdMap, entries.len());
                for (_, element) in &entries {
                    let child = element.as_record().ok_or_else(|| {
                        Error::pack(format!("id map {} holds a non-record element", field.name()))
                    })?;
                    kencoder(writer, &child.oid_key()?)?;
                    field_value_to_binary(
                        writer,
                        field,
                        element,
                        recursive,
                        only_changed,
                        clear_changed,
                        Some(&element_filter),
                    )?;
                }
            }
            ContainerKind::Scalar => {
                field_value_to_binary(
                    writer,
                    field,
                    &value,
                    recursive,
                    only_changed,
                    clear_changed,
                    filter,
                )?;
            }
        }
    }

    if clear_changed {
        record.clear_changed(&[], false);
    }

    writer.write_u16(FIELD_INDEX_END);
    Ok(())
}

fn key_encoder_slot(field: &Field) -> Result<KeyEncoder, Error> {
    field
        .codecs
        .bin_key_encode
        .ok_or_else(|| Error::pack(format!("field {} has no key codec", field.name())))
}

fn field_value_to_binary(
    writer: &mut Writer,
    field: &Field,
    value: &Value,
    recursive: bool,
    only_changed: bool,
    clear_changed: bool,
    filter: Option<&FieldFilter>,
) -> Result<(), Error> {
    if let Some(encoder) = field.codecs.bin_encode {
        return encoder(writer, value);
    }
    if field.is_ref() {
        let encoder = field
            .codecs
            .bin_ref_encode
            .ok_or_else(|| Error::pack(format!("field {} has no ref codec", field.name())))?;
        return encoder(writer, &ref_oid_value(value)?);
    }
    let nested = value
        .as_record()
        .ok_or_else(|| Error::pack(format!("field {} holds no record", field.name())))?;
    encode_into(writer, nested, recursive, only_changed, clear_changed, filter)
}

// ---------------------------------------------------------------------------
// decoding

pub(crate) fn decode_record(
    record: &Record,
    reader: &mut Reader,
    ctx: &mut DecodeContext,
) -> Result<(), Error> {
    let protocol = record.protocol();

    loop {
        if reader.is_end() {
            break;
        }
        let index = reader.read_u16()?;
        if index == FIELD_INDEX_END {
            break;
        }
        let pos = protocol
            .field_pos_by_index(index)
            .ok_or_else(|| Error::pack(format!("unknown field index {}", index)))?;
        let field = protocol.fields()[pos].clone();

        match field.container() {
            ContainerKind::Array => {
                expect_head(reader, ContainerTag::Array)?;
                let len = reader.read_u32()?;
                let array = Array::new();
                record.raw_set_slot(pos, Value::Array(array.clone()));
                for _ in 0..len {
                    let value = field_value_from_binary(&field, None, None, reader, ctx)?;
                    array.raw_push(value.clone());
                    if field.is_ref() {
                        let oid = oid_key_of(&field, &value)?;
                        ctx.add_ref_site(RefSite::ArrayAt {
                            array: array.clone(),
                            index: array.len() - 1,
                            oid,
                        });
                    }
                }
            }
            ContainerKind::Map => {
                expect_head(reader, ContainerTag::Map)?;
                let len = reader.read_u32()?;
                let kdecoder = key_decoder_slot(&field)?;
                let map = match (ctx.sync_mode(), record.slot(pos)) {
                    (true, Some(Value::Map(existing))) => existing,
                    _ => {
                        let fresh = Map::new();
                        record.raw_set_slot(pos, Value::Map(fresh.clone()));
                        fresh
                    }
                };
                for _ in 0..len {
                    let key = kdecoder(reader)?;
                    let old = if ctx.sync_mode() { map.get(&key) } else { None };
                    let value = field_value_from_binary(&field, old, None, reader, ctx)?;
                    map.raw_insert(key.clone(), value.clone());
                    if field.is_ref() {
                        let oid = oid_key_of(&field, &value)?;
                        ctx.add_ref_site(RefSite::MapAt {
                            map: map.clone(),
                            key,
                            oid,
                        });
                    }
                }
            }
            ContainerKind::IdMap => {
                expect_head(reader, ContainerTag::IdMap)?;
                let len = reader.read_u32()?;
                let kdecoder = key_decoder_slot(&field)?;
                let map = match (ctx.sync_mode(), record.slot(pos)) {
                    (true, Some(Value::IdMap(existing))) => existing,
                    _ => {
                        let fresh = IdMap::new();
                        record.raw_set_slot(pos, Value::IdMap(fresh.clone()));
                        fresh
                    }
                };
                for _ in 0..len {
                    let oid = kdecoder(reader)?;
                    let old = if ctx.sync_mode() { map.get(&oid) } else { None };
                    let value = field_value_from_binary(&field, old, Some(&oid), reader, ctx)?;
                    map.raw_insert(oid.clone(), value.clone());
                    if field.is_ref() {
                        let ref_oid = oid_key_of(&field, &value)?;
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
                let value = field_value_from_binary(&field, old, None, reader, ctx)?;
                record.raw_set_slot(pos, value.clone());
                if field.is_ref() {
                    let oid = oid_key_of(&field, &value)?;
                    ctx.add_ref_site(RefSite::Slot {
                        owner: record.clone(),
                        pos,
                        oid,
                    });
                }
            }
        }

        if ctx.mark_change() {
            record.mark_dirty_index(index);
        }
    }

    Ok(())
}

fn expect_head(reader: &mut Reader, expected: ContainerTag) -> Result<(), Error> {
    let byte = reader.read_u8()?;
    match ContainerTag::try_from(byte) {
        Ok(tag) if tag == expected => Ok(()),
        _ => Err(Error::pack(format!(
            "malformed container head: 0x{:02X}",
            byte
        ))),
    }
}

fn key_decoder_slot(field: &Field) -> Result<KeyDecoder, Error> {
    field
        .codecs
        .bin_key_decode
        .ok_or_else(|| Error::pack(format!("field {} has no key codec", field.name())))
}

fn field_value_from_binary(
    field: &Field,
    old: Option<Value>,
    oid: Option<&MapKey>,
    reader: &mut Reader,
    ctx: &mut DecodeContext,
) -> Result<Value, Error> {
    if let Some(decoder) = field.codecs.bin_decode {
        return decoder(reader);
    }
    if field.is_ref() {
        let decoder = field
            .codecs
            .bin_ref_decode
            .ok_or_else(|| Error::pack(format!("field {} has no ref codec", field.name())))?;
        return decoder(reader);
    }
    let target = field.field_type().target_protocol().ok_or_else(|| {
        Error::unpack(format!("field {} cannot hold nested data", field.name()))
    })?;
    let (decoded, fresh) = match old {
        Some(Value::Record(existing)) => (existing, false),
        _ => (Record::new(target), true),
    };
    decode_record(&decoded, reader, ctx)?;
    let record = ctx.finish_record_value(field, oid, decoded, fresh)?;
    Ok(Value::Record(record))
}
