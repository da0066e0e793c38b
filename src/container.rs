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

//! Container field values.
//!
//! `Array`, `Map` and `IdMap` are standalone wrapper types (not std
//! collections exposed directly): every public mutator flips the container's
//! own `changed` flag, while the `raw_*` variants used by the decoders do
//! not. Maps additionally record the keys removed since the last clear, the
//! source of delta tombstones.
//!
//! All three are cheap-clone handles; two clones mutate the same storage.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::error::Error;
use crate::record::Record;
use crate::types::PrimitiveKind;
use crate::value::Value;

/// Hashable primitive key for `Map`/`IdMap`, integer widths normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    Int(i64),
    UInt(u64),
    Bool(bool),
    Str(String),
}

impl MapKey {
    /// Rebuild the scalar value of the declared key kind.
    pub fn to_value(&self, kind: PrimitiveKind) -> Result<Value, Error> {
        match self {
            MapKey::Int(v) => Value::from_i128(kind, *v as i128),
            MapKey::UInt(v) => Value::from_i128(kind, *v as i128),
            MapKey::Bool(v) if kind == PrimitiveKind::Bool => Ok(Value::Bool(*v)),
            MapKey::Str(s) if kind == PrimitiveKind::String => Ok(Value::Str(s.clone())),
            _ => Err(Error::unpack(format!(
                "map key {:?} does not fit key kind {}",
                self,
                kind.name()
            ))),
        }
    }
}

impl From<&str> for MapKey {
    fn from(v: &str) -> MapKey {
        MapKey::Str(v.to_string())
    }
}

impl From<i64> for MapKey {
    fn from(v: i64) -> MapKey {
        MapKey::Int(v)
    }
}

impl From<u64> for MapKey {
    fn from(v: u64) -> MapKey {
        MapKey::UInt(v)
    }
}

pub(crate) fn try_set_changed(v: &Value) {
    match v {
        Value::Record(r) => r.mark_all_changed(),
        Value::Array(a) => a.set_changed(),
        Value::Map(m) => m.set_changed(),
        Value::IdMap(m) => m.set_changed(),
        _ => {}
    }
}

pub(crate) fn try_clear_changed(v: &Value) {
    match v {
        Value::Record(r) => r.clear_changed(&[], true),
        Value::Array(a) => a.clear_changed(true),
        Value::Map(m) => m.clear_changed(true),
        Value::IdMap(m) => m.clear_changed(true),
        _ => {}
    }
}

pub(crate) fn try_check_changed(v: &Value) -> bool {
    match v {
        Value::Record(r) => r.has_changed(true),
        Value::Array(a) => a.has_changed(true),
        Value::Map(m) => m.has_changed(true),
        Value::IdMap(m) => m.has_changed(true),
        _ => false,
    }
}

#[derive(Default)]
struct ArrayInner {
    items: Vec<Value>,
    changed: bool,
}

/// Ordered sequence of field values.
#[derive(Clone, Default)]
pub struct Array {
    inner: Rc<RefCell<ArrayInner>>,
}

impl Array {
    pub fn new() -> Array {
        Array::default()
    }

    /// Copy an iterable into a fresh array. The new container starts with a
    /// clean `changed` flag.
    pub fn from_values<I: IntoIterator<Item = Value>>(values: I) -> Array {
        let arr = Array::new();
        arr.inner.borrow_mut().items = values.into_iter().collect();
        arr
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.inner.borrow().items.get(index).cloned()
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.inner.borrow().items.clone()
    }

    pub fn set(&self, index: usize, value: Value) -> Result<(), Error> {
        {
            let mut inner = self.inner.borrow_mut();
            if index >= inner.items.len() {
                return Err(Error::operate(format!("array index {} out of range", index)));
            }
            inner.changed = true;
            inner.items[index] = value;
        }
        self.broadcast_changed();
        Ok(())
    }

    pub fn push(&self, value: Value) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.changed = true;
            inner.items.push(value);
        }
        self.broadcast_changed();
    }

    /// Decoder-internal append: no `changed` marking.
    pub fn raw_push(&self, value: Value) {
        self.inner.borrow_mut().items.push(value);
    }

    /// Decoder-internal index write: no `changed` marking. Out-of-range
    /// indices are ignored.
    pub fn raw_set(&self, index: usize, value: Value) {
        let mut inner = self.inner.borrow_mut();
        if let Some(slot) = inner.items.get_mut(index) {
            *slot = value;
        }
    }

    pub fn extend<I: IntoIterator<Item = Value>>(&self, values: I) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.changed = true;
            inner.items.extend(values);
        }
        self.broadcast_changed();
    }

    pub fn insert(&self, index: usize, value: Value) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.changed = true;
            let at = index.min(inner.items.len());
            inner.items.insert(at, value);
        }
        self.broadcast_changed();
    }

    pub fn pop(&self) -> Option<Value> {
        let popped = {
            let mut inner = self.inner.borrow_mut();
            let popped = inner.items.pop();
            if popped.is_some() {
                inner.changed = true;
            }
            popped
        };
        if popped.is_some() {
            self.broadcast_changed();
        }
        popped
    }

    pub fn remove_at(&self, index: usize) -> Option<Value> {
        let removed = {
            let mut inner = self.inner.borrow_mut();
            if index >= inner.items.len() {
                return None;
            }
            inner.changed = true;
            Some(inner.items.remove(index))
        };
        self.broadcast_changed();
        removed
    }

    /// Remove the first element equal to `value`; returns whether one was
    /// found.
    pub fn remove_value(&self, value: &Value) -> bool {
        let found = {
            let mut inner = self.inner.borrow_mut();
            match inner.items.iter().position(|v| v == value) {
                Some(pos) => {
                    inner.changed = true;
                    inner.items.remove(pos);
                    true
                }
                None => false,
            }
        };
        if found {
            self.broadcast_changed();
        }
        found
    }

    pub fn sort_by<F: FnMut(&Value, &Value) -> Ordering>(&self, compare: F) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.changed = true;
            inner.items.sort_by(compare);
        }
        self.broadcast_changed();
    }

    pub fn clear(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.changed = true;
        inner.items.clear();
    }

    pub fn set_changed(&self) {
        self.inner.borrow_mut().changed = true;
    }

    pub fn has_changed(&self, recursive: bool) -> bool {
        if self.inner.borrow().changed {
            return true;
        }
        if recursive {
            let items = self.to_vec();
            return items.iter().any(try_check_changed);
        }
        false
    }

    pub fn clear_changed(&self, recursive: bool) {
        self.inner.borrow_mut().changed = false;
        if recursive {
            for value in self.to_vec() {
                try_clear_changed(&value);
            }
        }
    }

    /// Mark every element record/container fully changed.
    pub fn broadcast_changed(&self) {
        for value in self.to_vec() {
            try_set_changed(&value);
        }
    }

    pub(crate) fn deep_clone_with(&self, clone_value: &dyn Fn(&Value) -> Value) -> Array {
        let inner = self.inner.borrow();
        Array {
            inner: Rc::new(RefCell::new(ArrayInner {
                items: inner.items.iter().map(clone_value).collect(),
                changed: inner.changed,
            })),
        }
    }
}

impl PartialEq for Array {
    fn eq(&self, other: &Array) -> bool {
        self.inner.borrow().items == other.inner.borrow().items
    }
}

impl std::fmt::Debug for Array {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.inner.borrow().items.iter()).finish()
    }
}

#[derive(Default)]
struct MapInner {
    items: HashMap<MapKey, Value>,
    removed: HashSet<MapKey>,
    changed: bool,
}

/// Mapping from a primitive key to field values.
#[derive(Clone, Default)]
pub struct Map {
    inner: Rc<RefCell<MapInner>>,
}

impl Map {
    pub fn new() -> Map {
        Map::default()
    }

    pub fn from_entries<I: IntoIterator<Item = (MapKey, Value)>>(entries: I) -> Map {
        let map = Map::new();
        map.inner.borrow_mut().items = entries.into_iter().collect();
        map
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().items.is_empty()
    }

    pub fn get(&self, key: &MapKey) -> Option<Value> {
        self.inner.borrow().items.get(key).cloned()
    }

    pub fn contains_key(&self, key: &MapKey) -> bool {
        self.inner.borrow().items.contains_key(key)
    }

    pub fn keys(&self) -> Vec<MapKey> {
        self.inner.borrow().items.keys().cloned().collect()
    }

    pub fn entries(&self) -> Vec<(MapKey, Value)> {
        self.inner
            .borrow()
            .items
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Keys deleted since the last `clear_changed`, emitted as delta
    /// tombstones.
    pub fn removed_keys(&self) -> Vec<MapKey> {
        self.inner.borrow().removed.iter().cloned().collect()
    }

    pub fn insert(&self, key: MapKey, value: Value) {
        try_set_changed(&value);
        let mut inner = self.inner.borrow_mut();
        inner.changed = true;
        inner.removed.remove(&key);
        inner.items.insert(key, value);
    }

    /// Decoder-internal install: no `changed` marking, no tombstone churn.
    pub fn raw_insert(&self, key: MapKey, value: Value) {
        self.inner.borrow_mut().items.insert(key, value);
    }

    pub fn raw_remove(&self, key: &MapKey) -> Option<Value> {
        self.inner.borrow_mut().items.remove(key)
    }

    pub fn remove(&self, key: &MapKey) -> Option<Value> {
        let mut inner = self.inner.borrow_mut();
        inner.changed = true;
        inner.removed.insert(key.clone());
        inner.items.remove(key)
    }

    pub fn clear(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.changed = true;
        let keys: Vec<MapKey> = inner.items.keys().cloned().collect();
        inner.removed.extend(keys);
        inner.items.clear();
    }

    pub fn update<I: IntoIterator<Item = (MapKey, Value)>>(&self, entries: I) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.changed = true;
            for (key, value) in entries {
                inner.removed.remove(&key);
                inner.items.insert(key, value);
            }
        }
        self.broadcast_changed();
    }

    /// Insert `default` when `key` is absent; returns the value under `key`.
    pub fn set_default(&self, key: MapKey, default: Value) -> Value {
        let mut inner = self.inner.borrow_mut();
        inner.changed = true;
        inner.items.entry(key).or_insert(default).clone()
    }

    pub fn set_changed(&self) {
        self.inner.borrow_mut().changed = true;
    }

    pub fn has_changed(&self, recursive: bool) -> bool {
        if self.inner.borrow().changed {
            return true;
        }
        if recursive {
            let values: Vec<Value> = self.inner.borrow().items.values().cloned().collect();
            return values.iter().any(try_check_changed);
        }
        false
    }

    pub fn clear_changed(&self, recursive: bool) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.changed = false;
            inner.removed.clear();
        }
        if recursive {
            let values: Vec<Value> = self.inner.borrow().items.values().cloned().collect();
            for value in values {
                try_clear_changed(&value);
            }
        }
    }

    pub fn broadcast_changed(&self) {
        let values: Vec<Value> = self.inner.borrow().items.values().cloned().collect();
        for value in values {
            try_set_changed(&value);
        }
    }

    pub(crate) fn deep_clone_with(&self, clone_value: &dyn Fn(&Value) -> Value) -> Map {
        let inner = self.inner.borrow();
        Map {
            inner: Rc::new(RefCell::new(MapInner {
                items: inner
                    .items
                    .iter()
                    .map(|(k, v)| (k.clone(), clone_value(v)))
                    .collect(),
                removed: inner.removed.clone(),
                changed: inner.changed,
            })),
        }
    }
}

impl PartialEq for Map {
    fn eq(&self, other: &Map) -> bool {
        self.inner.borrow().items == other.inner.borrow().items
    }
}

impl std::fmt::Debug for Map {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.inner.borrow().items.iter()).finish()
    }
}

/// Map keyed by each element record's `oid` field value.
#[derive(Clone, Default, PartialEq)]
pub struct IdMap {
    map: Map,
}

impl IdMap {
    pub fn new() -> IdMap {
        IdMap::default()
    }

    /// The underlying keyed storage.
    pub fn map(&self) -> &Map {
        &self.map
    }

    pub fn add(&self, record: &Record) -> Result<(), Error> {
        let key = record.oid_key()?;
        self.map.insert(key, Value::Record(record.clone()));
        Ok(())
    }

    pub fn remove(&self, record: &Record) -> Result<Option<Value>, Error> {
        let key = record.oid_key()?;
        Ok(self.map.remove(&key))
    }

    pub fn has(&self, record: &Record) -> Result<bool, Error> {
        let key = record.oid_key()?;
        Ok(self.map.contains_key(&key))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, key: &MapKey) -> Option<Value> {
        self.map.get(key)
    }

    pub fn contains_key(&self, key: &MapKey) -> bool {
        self.map.contains_key(key)
    }

    pub fn entries(&self) -> Vec<(MapKey, Value)> {
        self.map.entries()
    }

    pub fn removed_keys(&self) -> Vec<MapKey> {
        self.map.removed_keys()
    }

    pub fn remove_key(&self, key: &MapKey) -> Option<Value> {
        self.map.remove(key)
    }

    pub fn raw_insert(&self, key: MapKey, value: Value) {
        self.map.raw_insert(key, value);
    }

    pub fn raw_remove(&self, key: &MapKey) -> Option<Value> {
        self.map.raw_remove(key)
    }

    pub fn set_changed(&self) {
        self.map.set_changed();
    }

    pub fn has_changed(&self, recursive: bool) -> bool {
        self.map.has_changed(recursive)
    }

    pub fn clear_changed(&self, recursive: bool) {
        self.map.clear_changed(recursive);
    }

    pub fn broadcast_changed(&self) {
        self.map.broadcast_changed();
    }

    pub(crate) fn deep_clone_with(&self, clone_value: &dyn Fn(&Value) -> Value) -> IdMap {
        IdMap {
            map: self.map.deep_clone_with(clone_value),
        }
    }
}

impl std::fmt::Debug for IdMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.map.fmt(f)
    }
}
