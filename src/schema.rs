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

//! Schema registration.
//!
//! [`Protocol::build`] is the registrar: it merges parent field tables,
//! validates every declaration invariant, derives storage keys and binds
//! the per-format codec slots. The resulting [`Protocol`] is the immutable
//! bound schema a [`crate::record::Record`] instance carries.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::codec::{bin, dict};
use crate::error::Error;
use crate::field::{ContainerKind, Field, FieldType};
use crate::types::{check_field_index, PrimitiveKind};

/// The bound field table of a record type: fields sorted by index plus
/// lookup indexes by wire index, name and storage key.
pub struct Protocol {
    name: String,
    fields: Vec<Rc<Field>>,
    by_index: HashMap<u16, usize>,
    by_name: HashMap<String, usize>,
    by_key: HashMap<String, usize>,
}

impl Protocol {
    /// Register a record type.
    ///
    /// `parents` contribute their full field tables (depth-first, first
    /// match wins); a duplicate name or index from two distinct definition
    /// sites fails with [`Error::DuplicateName`] / [`Error::DuplicateIndex`].
    /// The same inherited definition arriving through two parents is legal.
    pub fn build(
        name: &str,
        parents: &[&Rc<Protocol>],
        fields: Vec<Field>,
    ) -> Result<Rc<Protocol>, Error> {
        let mut merged: Vec<Rc<Field>> = Vec::new();
        let mut by_index: HashMap<u16, usize> = HashMap::new();
        let mut by_name: HashMap<String, usize> = HashMap::new();

        for parent in parents {
            for field in &parent.fields {
                merge_field(name, &mut merged, &mut by_index, &mut by_name, field.clone())?;
            }
        }

        for mut field in fields {
            validate_field(name, &field)?;
            field.key = format!("_{}", field.name);
            bind_codecs(&mut field)?;
            merge_field(name, &mut merged, &mut by_index, &mut by_name, Rc::new(field))?;
        }

        // Field-table order: ascending index, declaration order on ties.
        merged.sort_by_key(|f| f.index());

        let mut by_index = HashMap::new();
        let mut by_name = HashMap::new();
        let mut by_key = HashMap::new();
        for (pos, field) in merged.iter().enumerate() {
            by_index.insert(field.index(), pos);
            by_name.insert(field.name().to_string(), pos);
            by_key.insert(field.key().to_string(), pos);
        }

        debug!(
            protocol = name,
            fields = merged.len(),
            "registered record protocol"
        );

        Ok(Rc::new(Protocol {
            name: name.to_string(),
            fields: merged,
            by_index,
            by_name,
            by_key,
        }))
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All fields in field-table order (ascending index).
    #[inline(always)]
    pub fn fields(&self) -> &[Rc<Field>] {
        &self.fields
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Rc<Field>> {
        self.by_name.get(name).map(|pos| &self.fields[*pos])
    }

    pub fn field_by_index(&self, index: u16) -> Option<&Rc<Field>> {
        self.by_index.get(&index).map(|pos| &self.fields[*pos])
    }

    pub fn field_by_key(&self, key: &str) -> Option<&Rc<Field>> {
        self.by_key.get(key).map(|pos| &self.fields[*pos])
    }

    /// Position of a field in the sorted table; the slot coordinate used
    /// by record instances.
    pub(crate) fn field_pos(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub(crate) fn field_pos_by_index(&self, index: u16) -> Option<usize> {
        self.by_index.get(&index).copied()
    }

    /// The designated identity field, when declared.
    pub fn oid_field(&self) -> Option<&Rc<Field>> {
        self.field_by_name("oid")
    }
}

impl std::fmt::Debug for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<Protocol {} ({} fields)>", self.name, self.fields.len())
    }
}

fn merge_field(
    protocol_name: &str,
    merged: &mut Vec<Rc<Field>>,
    by_index: &mut HashMap<u16, usize>,
    by_name: &mut HashMap<String, usize>,
    field: Rc<Field>,
) -> Result<(), Error> {
    if let Some(pos) = by_index.get(&field.index()) {
        let existing = &merged[*pos];
        // One definition reachable through several parents is not a clash.
        if Rc::ptr_eq(existing, &field) {
            return Ok(());
        }
        return Err(Error::duplicate_index(format!(
            "field index {} claimed twice in protocol {} ({} vs {})",
            field.index(),
            protocol_name,
            existing.name(),
            field.name()
        )));
    }
    if let Some(pos) = by_name.get(field.name()) {
        let existing = &merged[*pos];
        if Rc::ptr_eq(existing, &field) {
            return Ok(());
        }
        return Err(Error::duplicate_name(format!(
            "field name `{}' claimed twice in protocol {}",
            field.name(),
            protocol_name
        )));
    }
    by_index.insert(field.index(), merged.len());
    by_name.insert(field.name().to_string(), merged.len());
    merged.push(field);
    Ok(())
}

fn validate_field(protocol_name: &str, field: &Field) -> Result<(), Error> {
    check_field_index(field.index).map_err(|_| {
        Error::define(format!(
            "invalid index {} for field {}.{}",
            field.index, protocol_name, field.name
        ))
    })?;

    if let FieldType::Unsupported(type_name) = &field.value_type {
        return Err(Error::define(format!(
            "unsupported type `{}' for field {}.{}",
            type_name, protocol_name, field.name
        )));
    }

    match field.container {
        ContainerKind::Scalar => {}
        ContainerKind::Array => {}
        ContainerKind::Map | ContainerKind::IdMap => {
            let key_kind = field.key_kind.ok_or_else(|| {
                Error::define(format!(
                    "map field {}.{} requires a primitive key type",
                    protocol_name, field.name
                ))
            })?;
            if !key_kind.is_key_kind() {
                return Err(Error::define(format!(
                    "key kind {} of field {}.{} is not hashable",
                    key_kind.name(),
                    protocol_name,
                    field.name
                )));
            }
        }
    }

    if field.is_ref && !field.value_type.is_record() {
        return Err(Error::define(format!(
            "ref field {}.{} must have a record type",
            protocol_name, field.name
        )));
    }

    if field.is_ref || field.container == ContainerKind::IdMap {
        let target = field.value_type.target_protocol().ok_or_else(|| {
            Error::define(format!(
                "field {}.{} requires a record element type",
                protocol_name, field.name
            ))
        })?;
        let oid = target.oid_field().ok_or_else(|| {
            Error::define(format!(
                "record type {} referenced by {}.{} declares no oid field",
                target.name(),
                protocol_name,
                field.name
            ))
        })?;
        let oid_kind = oid.field_type().primitive().ok_or_else(|| {
            Error::define(format!(
                "oid field of {} must be a primitive type",
                target.name()
            ))
        })?;
        if field.container == ContainerKind::IdMap && field.key_kind != Some(oid_kind) {
            return Err(Error::define(format!(
                "id_map field {}.{} key kind must match the {} oid kind {}",
                protocol_name,
                field.name,
                target.name(),
                oid_kind.name()
            )));
        }
    }

    if field.arithm {
        let numeric = field
            .value_type
            .primitive()
            .map(|kind| kind.is_numeric())
            .unwrap_or(false);
        if !numeric || field.is_container() {
            return Err(Error::define(format!(
                "arithm field {}.{} must be a numeric scalar",
                protocol_name, field.name
            )));
        }
    }

    Ok(())
}

/// Fill the per-format codec slots from the per-kind tables. Ref slots
/// mirror the codec of the target's `oid` field.
fn bind_codecs(field: &mut Field) -> Result<(), Error> {
    if let Some(kind) = field.value_type.primitive() {
        field.codecs.dict_encode = Some(dict::value_encoder(kind));
        field.codecs.dict_decode = Some(dict::value_decoder(kind));
        field.codecs.bin_encode = Some(bin::value_encoder(kind));
        field.codecs.bin_decode = Some(bin::value_decoder(kind));
    }

    if let Some(key_kind) = field.key_kind {
        field.codecs.dict_key_encode = Some(dict::key_encoder(key_kind));
        field.codecs.dict_key_decode = Some(dict::key_decoder(key_kind));
        field.codecs.bin_key_encode = Some(bin::key_encoder(key_kind));
        field.codecs.bin_key_decode = Some(bin::key_decoder(key_kind));
    }

    if field.is_ref {
        let oid_kind = field
            .value_type
            .target_protocol()
            .and_then(|target| target.oid_field())
            .and_then(|oid| oid.field_type().primitive());
        let oid_kind: PrimitiveKind = oid_kind
            .ok_or_else(|| Error::define(format!("ref field {} has no resolvable oid", field.name)))?;
        field.codecs.dict_ref_encode = Some(dict::value_encoder(oid_kind));
        field.codecs.dict_ref_decode = Some(dict::value_decoder(oid_kind));
        field.codecs.bin_ref_encode = Some(bin::value_encoder(oid_kind));
        field.codecs.bin_ref_decode = Some(bin::value_decoder(oid_kind));
    }

    Ok(())
}
