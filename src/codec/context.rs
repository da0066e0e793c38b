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

use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::container::{Array, IdMap, Map, MapKey};
use crate::error::Error;
use crate::field::Field;
use crate::record::Record;
use crate::value::Value;

/// How incoming data merges into the target object graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    /// Containers are rebuilt; `null` entries are absent data.
    #[default]
    Override,
    /// Containers and sub-records are updated in place; a `null` map value
    /// deletes the key.
    Sync,
}

/// User-supplied authoritative reference resolver.
pub type ResolveRefFn = Box<dyn Fn(&MapKey) -> Option<Record>>;

/// Oids that could not be resolved after phase two; returned to the caller.
pub type UnsolvedRefs = HashSet<MapKey>;

/// A reference slot recorded during phase one, patched during phase two.
pub(crate) enum RefSite {
    Slot { owner: Record, pos: usize, oid: MapKey },
    ArrayAt { array: Array, index: usize, oid: MapKey },
    MapAt { map: Map, key: MapKey, oid: MapKey },
    IdMapAt { map: IdMap, key: MapKey, oid: MapKey },
}

/// Decode state shared across one or more `unpack_*_with` calls.
///
/// Phase one (decoding) registers every decoded record that carries an oid
/// and every reference site. Phase two ([`DecodeContext::resolve`]) patches
/// the sites, either through the caller's resolver or through the
/// known-object index.
pub struct DecodeContext {
    mode: DecodeMode,
    mark_change: bool,
    resolve_fn: Option<ResolveRefFn>,
    known_objects: HashMap<MapKey, Record>,
    pending: Vec<RefSite>,
}

impl DecodeContext {
    pub fn new(mode: DecodeMode, resolve_ref: Option<ResolveRefFn>, mark_change: bool) -> Self {
        DecodeContext {
            mode,
            mark_change,
            resolve_fn: resolve_ref,
            known_objects: HashMap::new(),
            pending: Vec::new(),
        }
    }

    #[inline(always)]
    pub fn sync_mode(&self) -> bool {
        self.mode == DecodeMode::Sync
    }

    #[inline(always)]
    pub fn mark_change(&self) -> bool {
        self.mark_change
    }

    /// Register a decoded record under its oid. Ignored when the caller
    /// supplied a resolver, which is authoritative.
    pub(crate) fn add_known_object(&mut self, oid: Option<MapKey>, record: &Record) {
        if self.resolve_fn.is_some() {
            return;
        }
        if let Some(oid) = oid {
            self.known_objects.insert(oid, record.clone());
        }
    }

    pub(crate) fn add_ref_site(&mut self, site: RefSite) {
        self.pending.push(site);
    }

    /// Phase two: patch every pending reference site. Sites whose target
    /// cannot be found are reported in the returned set.
    pub fn resolve(self) -> UnsolvedRefs {
        let mut unsolved = UnsolvedRefs::new();
        trace!(pending = self.pending.len(), "resolving deferred references");
        for site in self.pending {
            let oid = match &site {
                RefSite::Slot { oid, .. }
                | RefSite::ArrayAt { oid, .. }
                | RefSite::MapAt { oid, .. }
                | RefSite::IdMapAt { oid, .. } => oid,
            };
            let target = match &self.resolve_fn {
                Some(resolve) => resolve(oid),
                None => self.known_objects.get(oid).cloned(),
            };
            let Some(target) = target else {
                unsolved.insert(oid.clone());
                continue;
            };
            match site {
                RefSite::Slot { owner, pos, .. } => {
                    owner.raw_set_slot(pos, Value::Record(target));
                }
                RefSite::ArrayAt { array, index, .. } => {
                    array.raw_set(index, Value::Record(target));
                }
                RefSite::MapAt { map, key, .. } => {
                    map.raw_insert(key, Value::Record(target));
                }
                RefSite::IdMapAt { map, key, .. } => {
                    map.raw_insert(key, Value::Record(target));
                }
            }
        }
        unsolved
    }

    /// Finish decoding a record-valued field: route through the `create`
    /// factory for fresh instances, assign an externally-supplied oid
    /// (id-map elements), and register the result as a known object.
    pub(crate) fn finish_record_value(
        &mut self,
        field: &Field,
        oid: Option<&MapKey>,
        decoded: Record,
        fresh: bool,
    ) -> Result<Record, Error> {
        let record = if fresh {
            match field.create_fn() {
                Some(create) => {
                    let made = create(&decoded);
                    made.raw_splice_from(&decoded);
                    made
                }
                None => decoded,
            }
        } else {
            decoded
        };

        let oid_key = match oid {
            Some(key) => {
                record.raw_set_oid(key)?;
                Some(key.clone())
            }
            None => record.stored_oid().and_then(|v| v.to_map_key()),
        };
        self.add_known_object(oid_key, &record);
        Ok(record)
    }
}
