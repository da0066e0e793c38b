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

//! Record instances.
//!
//! A [`Record`] is a cheap-clone handle onto per-instance storage: one slot
//! per schema field plus the instance's [`DirtySet`]. Field access goes
//! through the metadata-driven accessor surface (`get`/`set`/`remove`/
//! `get_or_create`/`add`/`sub`), which is where dirty marking happens.
//! The pack/unpack surface drives the two codec pipelines.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::Value as JsonValue;

use crate::buffer::Reader;
use crate::codec::context::DecodeContext;
pub use crate::codec::context::{DecodeMode, ResolveRefFn, UnsolvedRefs};
use crate::codec::{bin, dict};
use crate::container::{Array, IdMap, Map, MapKey};
use crate::dirty::DirtySet;
use crate::error::Error;
use crate::field::{ContainerKind, Field, FieldFilter};
use crate::schema::Protocol;
use crate::value::Value;

/// Options for `pack` calls.
#[derive(Clone)]
pub struct PackOptions {
    /// Recurse into nested records. Without it, record-typed payloads are
    /// elided (structural output carries `null` placeholders).
    pub recursive: bool,
    /// Delta packing: emit only fields reported changed.
    pub only_changed: bool,
    /// Clear the record's dirty state (shallow) after encoding it.
    pub clear_changed: bool,
    /// Per-field predicate; rejected fields are skipped.
    pub field_filter: Option<FieldFilter>,
    /// Restrict the top-level encode to the named fields (structural only).
    pub fields: Option<Vec<String>>,
}

impl Default for PackOptions {
    fn default() -> Self {
        PackOptions {
            recursive: true,
            only_changed: false,
            clear_changed: false,
            field_filter: None,
            fields: None,
        }
    }
}

impl PackOptions {
    pub fn new() -> PackOptions {
        PackOptions::default()
    }

    pub fn recursive(mut self, recursive: bool) -> PackOptions {
        self.recursive = recursive;
        self
    }

    pub fn only_changed(mut self, only_changed: bool) -> PackOptions {
        self.only_changed = only_changed;
        self
    }

    pub fn clear_changed(mut self, clear_changed: bool) -> PackOptions {
        self.clear_changed = clear_changed;
        self
    }

    pub fn field_filter(mut self, filter: FieldFilter) -> PackOptions {
        self.field_filter = Some(filter);
        self
    }

    pub fn fields<S: Into<String>, I: IntoIterator<Item = S>>(mut self, names: I) -> PackOptions {
        self.fields = Some(names.into_iter().map(Into::into).collect());
        self
    }
}

/// Options for `unpack` calls.
#[derive(Default)]
pub struct UnpackOptions {
    pub mode: DecodeMode,
    /// Mark every decoded field dirty on the target.
    pub mark_change: bool,
    /// Authoritative resolver for `ref` oids; when set, the context's
    /// known-object index is not consulted.
    pub resolve_ref: Option<ResolveRefFn>,
}

impl UnpackOptions {
    pub fn new() -> UnpackOptions {
        UnpackOptions::default()
    }

    pub fn mode(mut self, mode: DecodeMode) -> UnpackOptions {
        self.mode = mode;
        self
    }

    pub fn mark_change(mut self, mark_change: bool) -> UnpackOptions {
        self.mark_change = mark_change;
        self
    }

    pub fn resolve_ref<F: Fn(&MapKey) -> Option<Record> + 'static>(
        mut self,
        resolve: F,
    ) -> UnpackOptions {
        self.resolve_ref = Some(Box::new(resolve));
        self
    }
}

/// Output of the format-selector [`Record::pack`] surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Packed {
    Dict(JsonValue),
    Bin(Vec<u8>),
}

struct RecordInner {
    protocol: Rc<Protocol>,
    slots: Vec<Option<Value>>,
    dirty: DirtySet,
}

/// A persistable nested record instance.
#[derive(Clone)]
pub struct Record {
    inner: Rc<RefCell<RecordInner>>,
}

impl Record {
    /// Default-construct an instance of the given protocol: every slot
    /// unset, dirty set empty.
    pub fn new(protocol: &Rc<Protocol>) -> Record {
        let slots = vec![None; protocol.num_fields()];
        Record {
            inner: Rc::new(RefCell::new(RecordInner {
                protocol: protocol.clone(),
                slots,
                dirty: DirtySet::new(),
            })),
        }
    }

    pub fn protocol(&self) -> Rc<Protocol> {
        self.inner.borrow().protocol.clone()
    }

    /// Whether two handles refer to the same instance.
    pub fn ptr_eq(&self, other: &Record) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn field(&self, name: &str) -> Result<Rc<Field>, Error> {
        self.protocol()
            .field_by_name(name)
            .cloned()
            .ok_or_else(|| Error::no_field(name.to_string()))
    }

    fn pos(&self, field: &Field) -> usize {
        // fields always come from this record's protocol
        self.protocol().field_pos(field.name()).unwrap_or(0)
    }

    // ------------------------------------------------------------------
    // accessors

    /// Stored value, or the field default. Container fields lazily install
    /// an empty container of the right kind and return its handle.
    pub fn get(&self, name: &str) -> Result<Value, Error> {
        let field = self.field(name)?;
        let pos = self.pos(&field);
        if field.is_container() {
            if let Some(value) = self.slot(pos) {
                return Ok(value);
            }
            let fresh = empty_container(&field);
            self.raw_set_slot(pos, fresh.clone());
            return Ok(fresh);
        }
        Ok(self.slot(pos).unwrap_or_else(|| field.default_value()))
    }

    /// Compare-and-store: assigning a value different from the stored one
    /// marks the field dirty. Assigning a container always marks dirty
    /// (container identity changed) and broadcasts to its elements.
    pub fn set<V: Into<Value>>(&self, name: &str, value: V) -> Result<(), Error> {
        let field = self.field(name)?;
        let value = value.into();
        check_assignable(&field, &value)?;
        let pos = self.pos(&field);
        if field.is_container() {
            match &value {
                Value::Array(a) => a.broadcast_changed(),
                Value::Map(m) => m.broadcast_changed(),
                Value::IdMap(m) => m.broadcast_changed(),
                _ => {}
            }
            self.raw_set_slot(pos, value);
            self.mark_field_dirty(&field);
            return Ok(());
        }
        if self.slot(pos).as_ref() != Some(&value) {
            self.raw_set_slot(pos, value);
            self.mark_field_dirty(&field);
        }
        Ok(())
    }

    /// Drop the storage slot and mark the field dirty. Deleting a container
    /// field is an illegal action.
    pub fn remove(&self, name: &str) -> Result<(), Error> {
        let field = self.field(name)?;
        if field.is_container() {
            return Err(Error::operate("cannot delete a container field"));
        }
        let pos = self.pos(&field);
        if self.slot(pos).is_some() {
            self.inner.borrow_mut().slots[pos] = None;
            self.mark_field_dirty(&field);
        }
        Ok(())
    }

    /// Auto-materializing companion getter: installs the default into the
    /// slot when unset (sub-records are default-constructed) and returns
    /// the stored value. Installation does not mark dirty.
    pub fn get_or_create(&self, name: &str) -> Result<Value, Error> {
        let field = self.field(name)?;
        if field.is_container() {
            return self.get(name);
        }
        let pos = self.pos(&field);
        if let Some(value) = self.slot(pos) {
            return Ok(value);
        }
        let fresh = match field.field_type().target_protocol() {
            Some(target) => Value::Record(Record::new(target)),
            None => field.default_value(),
        };
        self.raw_set_slot(pos, fresh.clone());
        Ok(fresh)
    }

    /// Whether the slot was never assigned (the getter would yield the
    /// declared default).
    pub fn is_default_value(&self, name: &str) -> Result<bool, Error> {
        let field = self.field(name)?;
        Ok(self.slot(self.pos(&field)).is_none())
    }

    /// Bulk raw assignment by field name. No dirty marking.
    pub fn set_data<V: Into<Value>>(
        &self,
        data: impl IntoIterator<Item = (&'static str, V)>,
    ) -> Result<(), Error> {
        for (name, value) in data {
            let field = self.field(name)?;
            let value = value.into();
            check_assignable(&field, &value)?;
            let pos = self.pos(&field);
            self.raw_set_slot(pos, value);
        }
        Ok(())
    }

    /// Drop every schema field slot from the instance.
    pub fn clear_data(&self) {
        let mut inner = self.inner.borrow_mut();
        for slot in inner.slots.iter_mut() {
            *slot = None;
        }
    }

    /// Insert the element default under `key` of the named map field when
    /// absent, and return the value under `key`.
    pub fn map_set_default(&self, name: &str, key: MapKey) -> Result<Value, Error> {
        let field = self.field(name)?;
        let map = match self.get(name)? {
            Value::Map(map) => map,
            _ => return Err(Error::operate(format!("field {} is not a map", name))),
        };
        let default = match field.field_type().target_protocol() {
            Some(target) => Value::Record(Record::new(target)),
            None => field.default_value(),
        };
        Ok(map.set_default(key, default))
    }

    // ------------------------------------------------------------------
    // arithmetic helpers

    /// Checked addition on an `arithm` field: stores the new value and
    /// returns `(delta, new_value)`.
    pub fn add<V: Into<Value>>(&self, name: &str, delta: V) -> Result<(Value, Value), Error> {
        self.arith(name, delta.into(), false)
    }

    /// Checked subtraction on an `arithm` field. Fails with
    /// [`Error::OverflowLower`] when the result would drop below the
    /// field's `min_value` (or below zero for unsigned kinds); the stored
    /// value is untouched on failure.
    pub fn sub<V: Into<Value>>(&self, name: &str, delta: V) -> Result<(Value, Value), Error> {
        self.arith(name, delta.into(), true)
    }

    fn arith(&self, name: &str, delta: Value, is_sub: bool) -> Result<(Value, Value), Error> {
        let field = self.field(name)?;
        if !field.is_arithm() {
            return Err(Error::operate(format!("field {} is not arithmetic", name)));
        }
        let kind = field
            .field_type()
            .primitive()
            .ok_or_else(|| Error::operate(format!("field {} is not numeric", name)))?;
        let current = self.get(name)?;

        if kind.is_float() {
            let cur = current
                .as_f64()
                .ok_or_else(|| Error::operate(format!("field {} holds a non-float value", name)))?;
            let d = delta
                .as_f64()
                .or_else(|| delta.as_i128().map(|v| v as f64))
                .ok_or_else(|| Error::operate("arithmetic delta is not numeric"))?;
            let new = if is_sub { cur - d } else { cur + d };
            if is_sub {
                if let Some(min) = field.min_value() {
                    if new < min as f64 {
                        return Err(Error::overflow_lower(format!(
                            "{}: {} - {} < {}",
                            name, cur, d, min
                        )));
                    }
                }
            }
            let new_value = Value::from_f64(kind, new)?;
            self.set(name, new_value.clone())?;
            return Ok((delta, new_value));
        }

        let cur = current
            .as_i128()
            .ok_or_else(|| Error::operate(format!("field {} holds a non-integer value", name)))?;
        let d = delta
            .as_i128()
            .ok_or_else(|| Error::operate("arithmetic delta is not an integer"))?;
        let new = if is_sub { cur - d } else { cur + d };
        if is_sub {
            let lower = match field.min_value() {
                Some(min) => Some(min as i128),
                None if kind.is_unsigned() => Some(0),
                None => None,
            };
            if let Some(min) = lower {
                if new < min {
                    return Err(Error::overflow_lower(format!(
                        "{}: {} - {} < {}",
                        name, cur, d, min
                    )));
                }
            }
        }
        let new_value = Value::from_i128(kind, new)?;
        self.set(name, new_value.clone())?;
        Ok((delta, new_value))
    }

    // ------------------------------------------------------------------
    // change tracking

    /// Fast path: any field index dirty on this record. With `recursive`,
    /// additionally scans record- and container-valued fields.
    pub fn has_changed(&self, recursive: bool) -> bool {
        if self.inner.borrow().dirty.has_any_dirty() {
            return true;
        }
        if recursive {
            let protocol = self.protocol();
            for field in protocol.fields() {
                if self.field_changed_internal(field, true) {
                    return true;
                }
            }
        }
        false
    }

    /// Whether one specific field is dirty; `recursive` descends into a
    /// nested record or container value.
    pub fn has_field_changed(&self, name: &str, recursive: bool) -> Result<bool, Error> {
        let field = self.field(name)?;
        Ok(self.field_changed_internal(&field, recursive))
    }

    pub(crate) fn field_changed_internal(&self, field: &Field, recursive: bool) -> bool {
        if field.is_skip_changed() {
            return false;
        }
        let dirty = self.inner.borrow().dirty.is_dirty(field.index());
        let slot = self.slot(self.pos(field));

        if field.is_container() {
            if dirty {
                return true;
            }
            // ref containers hold foreign objects: only the container's own
            // flag counts
            let descend = if field.is_ref() { false } else { recursive };
            return match slot {
                Some(Value::Array(a)) => a.has_changed(descend),
                Some(Value::Map(m)) => m.has_changed(descend),
                Some(Value::IdMap(m)) => m.has_changed(descend),
                _ => false,
            };
        }
        if field.is_record_type() && !field.is_ref() {
            if dirty {
                return true;
            }
            if recursive {
                if let Some(Value::Record(nested)) = slot {
                    return nested.has_changed(true);
                }
            }
            return false;
        }
        dirty
    }

    /// Clear the named (or all) field indices. With `recursive`, container
    /// flags and sub-record dirty sets in the subtree are cleared too.
    /// Unknown names are ignored; `skip_changed` fields are never cleared.
    pub fn clear_changed(&self, names: &[&str], recursive: bool) {
        let protocol = self.protocol();
        if names.is_empty() {
            for field in protocol.fields() {
                self.clear_field_changed(field, recursive);
            }
        } else {
            for name in names {
                if let Some(field) = protocol.field_by_name(name) {
                    self.clear_field_changed(field, recursive);
                }
            }
        }
    }

    fn clear_field_changed(&self, field: &Field, recursive: bool) {
        if field.is_skip_changed() {
            return;
        }
        self.inner.borrow_mut().dirty.clear_dirty(field.index());
        let slot = self.slot(self.pos(field));

        if field.is_container() {
            let descend = if field.is_ref() { false } else { recursive };
            match slot {
                Some(Value::Array(a)) => a.clear_changed(descend),
                Some(Value::Map(m)) => m.clear_changed(descend),
                Some(Value::IdMap(m)) => m.clear_changed(descend),
                _ => {}
            }
        } else if field.is_record_type() && !field.is_ref() && recursive {
            // ref slots hold foreign objects outside this subtree
            if let Some(Value::Record(nested)) = slot {
                nested.clear_changed(&[], recursive);
            }
        }
    }

    /// Mark the named fields dirty; an empty list marks every field.
    pub fn set_changed(&self, names: &[&str]) -> Result<(), Error> {
        let protocol = self.protocol();
        if names.is_empty() {
            for field in protocol.fields() {
                self.mark_field_dirty(field);
            }
            return Ok(());
        }
        for name in names {
            let field = protocol
                .field_by_name(name)
                .ok_or_else(|| Error::no_field(name.to_string()))?
                .clone();
            self.mark_field_dirty(&field);
        }
        Ok(())
    }

    fn mark_field_dirty(&self, field: &Field) {
        // skip_changed fields stay out of the dirty set entirely, keeping
        // has_any_dirty exact
        if field.is_skip_changed() {
            return;
        }
        self.inner.borrow_mut().dirty.set_dirty(field.index());
    }

    pub(crate) fn mark_all_changed(&self) {
        let protocol = self.protocol();
        for field in protocol.fields() {
            self.mark_field_dirty(field);
        }
    }

    // ------------------------------------------------------------------
    // identity

    /// The stored `oid` slot value, if the schema declares one and it was
    /// assigned.
    pub(crate) fn stored_oid(&self) -> Option<Value> {
        let protocol = self.protocol();
        let pos = protocol.field_pos("oid")?;
        self.slot(pos)
    }

    /// The record's identity as a map key (stored value or field default).
    pub fn oid_key(&self) -> Result<MapKey, Error> {
        let protocol = self.protocol();
        if protocol.oid_field().is_none() {
            return Err(Error::operate(format!(
                "record type {} declares no oid field",
                protocol.name()
            )));
        }
        self.get("oid")?
            .to_map_key()
            .ok_or_else(|| Error::operate("oid value is not hashable"))
    }

    pub(crate) fn raw_set_oid(&self, key: &MapKey) -> Result<(), Error> {
        let protocol = self.protocol();
        let field = protocol
            .oid_field()
            .ok_or_else(|| Error::unpack(format!(
                "record type {} declares no oid field",
                protocol.name()
            )))?
            .clone();
        let kind = field
            .field_type()
            .primitive()
            .ok_or_else(|| Error::unpack("oid field is not primitive"))?;
        let pos = self.pos(&field);
        self.raw_set_slot(pos, key.to_value(kind)?);
        Ok(())
    }

    // ------------------------------------------------------------------
    // raw storage (decoder surface)

    pub(crate) fn slot(&self, pos: usize) -> Option<Value> {
        self.inner.borrow().slots.get(pos).cloned().flatten()
    }

    pub(crate) fn raw_set_slot(&self, pos: usize, value: Value) {
        let mut inner = self.inner.borrow_mut();
        if let Some(slot) = inner.slots.get_mut(pos) {
            *slot = Some(value);
        }
    }

    pub(crate) fn mark_dirty_index(&self, index: u16) {
        self.inner.borrow_mut().dirty.set_dirty(index);
    }

    /// Adopt the set slots and dirty marks of `other` (same protocol),
    /// keeping this record's other slots. Used when a `create` factory
    /// replaces the freshly decoded instance.
    pub(crate) fn raw_splice_from(&self, other: &Record) {
        let protocol = self.protocol();
        for pos in 0..protocol.num_fields() {
            if let Some(value) = other.slot(pos) {
                self.raw_set_slot(pos, value);
            }
        }
        let other_dirty = other.inner.borrow().dirty.clone();
        let mut inner = self.inner.borrow_mut();
        for field in protocol.fields() {
            if other_dirty.is_dirty(field.index()) {
                inner.dirty.set_dirty(field.index());
            }
        }
    }

    // ------------------------------------------------------------------
    // cloning

    /// Structural copy with fresh identity for every record and container
    /// in the subtree, dirty state included.
    pub fn deep_clone(&self) -> Record {
        let inner = self.inner.borrow();
        let clone = Record::new(&inner.protocol);
        {
            let mut cloned = clone.inner.borrow_mut();
            cloned.slots = inner
                .slots
                .iter()
                .map(|slot| slot.as_ref().map(deep_clone_value))
                .collect();
            cloned.dirty = inner.dirty.clone();
        }
        clone
    }

    // ------------------------------------------------------------------
    // pack / unpack

    /// Format-selector pack surface; `fmt` is `"dict"` or `"bin"`.
    pub fn pack(&self, fmt: &str, opts: &PackOptions) -> Result<Packed, Error> {
        match fmt {
            "dict" => Ok(Packed::Dict(self.pack_to_dict(opts)?)),
            "bin" => Ok(Packed::Bin(self.pack_to_binary(opts)?)),
            _ => Err(Error::pack(format!("unsupported format: {}", fmt))),
        }
    }

    /// Format-selector unpack surface; the source must match `fmt`.
    pub fn unpack(&self, fmt: &str, src: &Packed, opts: UnpackOptions) -> Result<UnsolvedRefs, Error> {
        match (fmt, src) {
            ("dict", Packed::Dict(data)) => self.unpack_from_dict(data, opts),
            ("bin", Packed::Bin(data)) => self.unpack_from_binary(data, opts),
            ("dict", _) | ("bin", _) => Err(Error::pack(format!(
                "packed source does not match format {}",
                fmt
            ))),
            _ => Err(Error::pack(format!("unsupported format: {}", fmt))),
        }
    }

    pub fn pack_to_dict(&self, opts: &PackOptions) -> Result<JsonValue, Error> {
        dict::encode_record(self, opts)
    }

    pub fn pack_to_binary(&self, opts: &PackOptions) -> Result<Vec<u8>, Error> {
        bin::encode_record(self, opts)
    }

    /// Delta snapshot: the structural map of changed fields.
    pub fn get_changed_dict(&self, recursive: bool) -> Result<JsonValue, Error> {
        self.pack_to_dict(&PackOptions::new().recursive(recursive).only_changed(true))
    }

    pub fn unpack_from_dict(
        &self,
        data: &JsonValue,
        opts: UnpackOptions,
    ) -> Result<UnsolvedRefs, Error> {
        let mut ctx = DecodeContext::new(opts.mode, opts.resolve_ref, opts.mark_change);
        self.unpack_dict_with(data, &mut ctx)?;
        Ok(ctx.resolve())
    }

    pub fn unpack_from_binary(
        &self,
        data: &[u8],
        opts: UnpackOptions,
    ) -> Result<UnsolvedRefs, Error> {
        let mut ctx = DecodeContext::new(opts.mode, opts.resolve_ref, opts.mark_change);
        self.unpack_binary_with(data, &mut ctx)?;
        Ok(ctx.resolve())
    }

    /// Decode into a shared context; phase two runs when the caller invokes
    /// [`DecodeContext::resolve`]. Lets one context span several records of
    /// an object graph.
    pub fn unpack_dict_with(
        &self,
        data: &JsonValue,
        ctx: &mut DecodeContext,
    ) -> Result<(), Error> {
        dict::decode_record(self, data, ctx)?;
        self.register_root(ctx);
        Ok(())
    }

    pub fn unpack_binary_with(&self, data: &[u8], ctx: &mut DecodeContext) -> Result<(), Error> {
        let mut reader = Reader::new(data);
        bin::decode_record(self, &mut reader, ctx)?;
        self.register_root(ctx);
        Ok(())
    }

    /// Top-level decoded records join the context's known objects too, so
    /// references between separately unpacked roots resolve.
    fn register_root(&self, ctx: &mut DecodeContext) {
        let oid = self.stored_oid().and_then(|v| v.to_map_key());
        ctx.add_known_object(oid, self);
    }

    fn short_info(&self, nfields: usize) -> String {
        let protocol = self.protocol();
        let mut parts = Vec::new();
        for (pos, field) in protocol.fields().iter().enumerate() {
            if parts.len() >= nfields {
                break;
            }
            if field.is_container() {
                continue;
            }
            if let Some(value) = self.slot(pos) {
                parts.push(format!("{}={}", field.name(), value_short(&value)));
            }
        }
        format!("{}({})", protocol.name(), parts.join(","))
    }
}

fn value_short(value: &Value) -> String {
    match value {
        Value::Record(record) => record.short_info(2),
        Value::Str(s) => s.clone(),
        other => format!("{:?}", other),
    }
}

fn empty_container(field: &Field) -> Value {
    match field.container() {
        ContainerKind::Array => Value::Array(Array::new()),
        ContainerKind::Map => Value::Map(Map::new()),
        ContainerKind::IdMap => Value::IdMap(IdMap::new()),
        ContainerKind::Scalar => Value::Null,
    }
}

fn check_assignable(field: &Field, value: &Value) -> Result<(), Error> {
    match field.container() {
        ContainerKind::Array => {
            if !matches!(value, Value::Array(_)) {
                return Err(Error::operate(format!(
                    "field {} requires an array value",
                    field.name()
                )));
            }
        }
        ContainerKind::Map => {
            if !matches!(value, Value::Map(_)) {
                return Err(Error::operate(format!(
                    "field {} requires a map value",
                    field.name()
                )));
            }
        }
        ContainerKind::IdMap => {
            if !matches!(value, Value::IdMap(_)) {
                return Err(Error::operate(format!(
                    "field {} requires an id map value",
                    field.name()
                )));
            }
        }
        ContainerKind::Scalar => match field.field_type().target_protocol() {
            Some(target) => {
                let ok = value
                    .as_record()
                    .map(|r| r.protocol().name() == target.name())
                    .unwrap_or(false);
                if !ok {
                    return Err(Error::operate(format!(
                        "field {} requires a {} record",
                        field.name(),
                        target.name()
                    )));
                }
            }
            None => {
                let kind = field.field_type().primitive();
                if kind.is_some() && value.kind() != kind {
                    return Err(Error::operate(format!(
                        "field {} requires a {} value, got {:?}",
                        field.name(),
                        field.field_type().type_name(),
                        value
                    )));
                }
            }
        },
    }
    Ok(())
}

fn deep_clone_value(value: &Value) -> Value {
    match value {
        Value::Record(record) => Value::Record(record.deep_clone()),
        Value::Array(array) => Value::Array(array.deep_clone_with(&deep_clone_value)),
        Value::Map(map) => Value::Map(map.deep_clone_with(&deep_clone_value)),
        Value::IdMap(map) => Value::IdMap(map.deep_clone_with(&deep_clone_value)),
        other => other.clone(),
    }
}

impl PartialEq for Record {
    /// Structural equality: same protocol name, same slot contents.
    fn eq(&self, other: &Record) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let a = self.inner.borrow();
        let b = other.inner.borrow();
        a.protocol.name() == b.protocol.name() && a.slots == b.slots
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_info(4))
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_info(4))
    }
}
