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

use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value as JsonValue;

use crate::codec::{bin, dict};
use crate::record::Record;
use crate::schema::Protocol;
use crate::types::PrimitiveKind;
use crate::value::Value;

/// Factory invoked during decode in place of default construction. It
/// receives the partially-populated record and returns the instance the
/// decoded data is spliced onto.
pub type CreateFn = Rc<dyn Fn(&Record) -> Record>;

/// Declared value type of a field.
#[derive(Clone)]
pub enum FieldType {
    Primitive(PrimitiveKind),
    Record(Rc<Protocol>),
    /// An unrecognized type name; rejected by the registrar.
    Unsupported(String),
}

impl FieldType {
    pub fn is_record(&self) -> bool {
        matches!(self, FieldType::Record(_))
    }

    pub fn primitive(&self) -> Option<PrimitiveKind> {
        match self {
            FieldType::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn target_protocol(&self) -> Option<&Rc<Protocol>> {
        match self {
            FieldType::Record(protocol) => Some(protocol),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            FieldType::Primitive(kind) => kind.name(),
            FieldType::Record(protocol) => protocol.name(),
            FieldType::Unsupported(name) => name,
        }
    }
}

impl From<&str> for FieldType {
    fn from(name: &str) -> FieldType {
        match PrimitiveKind::from_name(name) {
            Some(kind) => FieldType::Primitive(kind),
            None => FieldType::Unsupported(name.to_string()),
        }
    }
}

impl From<PrimitiveKind> for FieldType {
    fn from(kind: PrimitiveKind) -> FieldType {
        FieldType::Primitive(kind)
    }
}

impl From<&Rc<Protocol>> for FieldType {
    fn from(protocol: &Rc<Protocol>) -> FieldType {
        FieldType::Record(protocol.clone())
    }
}

/// Which container shape a field declares, if any. The three kinds are
/// mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Scalar,
    Array,
    Map,
    IdMap,
}

/// Per-format codec function slots, bound by the registrar from the
/// per-kind tables. Record-typed value slots stay empty: the encoders
/// recurse instead.
#[derive(Clone, Default)]
pub(crate) struct CodecSlots {
    pub dict_encode: Option<dict::ValueEncoder>,
    pub dict_decode: Option<dict::ValueDecoder>,
    pub dict_key_encode: Option<dict::KeyEncoder>,
    pub dict_key_decode: Option<dict::KeyDecoder>,
    pub dict_ref_encode: Option<dict::ValueEncoder>,
    pub dict_ref_decode: Option<dict::ValueDecoder>,
    pub bin_encode: Option<bin::ValueEncoder>,
    pub bin_decode: Option<bin::ValueDecoder>,
    pub bin_key_encode: Option<bin::KeyEncoder>,
    pub bin_key_decode: Option<bin::KeyDecoder>,
    pub bin_ref_encode: Option<bin::ValueEncoder>,
    pub bin_ref_decode: Option<bin::ValueDecoder>,
}

/// Immutable schema entry for one slot within a record.
///
/// Declared through the builder surface ([`Field::new`], [`Field::array`],
/// [`Field::map`], [`Field::id_map`] and the `with_*` options) and bound by
/// [`Protocol::build`], which validates the declaration, derives the storage
/// key and fills the codec slots.
#[derive(Clone)]
pub struct Field {
    pub(crate) name: String,
    pub(crate) index: u32,
    pub(crate) key: String,
    pub(crate) value_type: FieldType,
    pub(crate) container: ContainerKind,
    pub(crate) key_kind: Option<PrimitiveKind>,
    pub(crate) default: Option<Value>,
    pub(crate) arithm: bool,
    pub(crate) min_value: Option<i64>,
    pub(crate) is_unsigned: bool,
    pub(crate) is_ref: bool,
    pub(crate) skip_changed: bool,
    pub(crate) create: Option<CreateFn>,
    pub(crate) desc: Option<String>,
    pub(crate) extra: HashMap<String, JsonValue>,
    pub(crate) codecs: CodecSlots,
}

impl Field {
    /// Declare a scalar (or nested-record) field.
    pub fn new<T: Into<FieldType>>(name: &str, value_type: T, index: u32) -> Field {
        let value_type = value_type.into();
        let is_unsigned = value_type
            .primitive()
            .map(|kind| kind.is_unsigned())
            .unwrap_or(false);
        Field {
            name: name.to_string(),
            index,
            key: String::new(),
            value_type,
            container: ContainerKind::Scalar,
            key_kind: None,
            default: None,
            arithm: false,
            min_value: None,
            is_unsigned,
            is_ref: false,
            skip_changed: false,
            create: None,
            desc: None,
            extra: HashMap::new(),
            codecs: CodecSlots::default(),
        }
    }

    /// Declare an ordered-sequence field.
    pub fn array<T: Into<FieldType>>(name: &str, value_type: T, index: u32) -> Field {
        let mut field = Field::new(name, value_type, index);
        field.container = ContainerKind::Array;
        field
    }

    /// Declare a map field keyed by the named primitive kind.
    pub fn map<T: Into<FieldType>>(name: &str, value_type: T, index: u32, key: &str) -> Field {
        let mut field = Field::new(name, value_type, index);
        field.container = ContainerKind::Map;
        field.key_kind = PrimitiveKind::from_name(key);
        field
    }

    /// Declare an identity-keyed map field; elements are keyed by their own
    /// `oid` value.
    pub fn id_map<T: Into<FieldType>>(name: &str, value_type: T, index: u32, key: &str) -> Field {
        let mut field = Field::new(name, value_type, index);
        field.container = ContainerKind::IdMap;
        field.key_kind = PrimitiveKind::from_name(key);
        field
    }

    pub fn with_default<V: Into<Value>>(mut self, default: V) -> Field {
        self.default = Some(default.into());
        self
    }

    pub fn arithm(mut self) -> Field {
        self.arithm = true;
        self
    }

    /// Checked lower bound for the synthesized subtraction helper. Coerced
    /// to an integer even for float fields.
    pub fn with_min_value(mut self, min_value: i64) -> Field {
        self.min_value = Some(min_value);
        self
    }

    /// Store a record object, serialize it as the target's `oid`.
    pub fn reference(mut self) -> Field {
        self.is_ref = true;
        self
    }

    /// Exclude the field from delta detection entirely.
    pub fn skip_changed(mut self) -> Field {
        self.skip_changed = true;
        self
    }

    pub fn with_create(mut self, create: CreateFn) -> Field {
        self.create = Some(create);
        self
    }

    pub fn with_desc(mut self, desc: &str) -> Field {
        self.desc = Some(desc.to_string());
        self
    }

    /// Attach an arbitrary option, retained verbatim for consumer use.
    pub fn with_opt<V: Into<JsonValue>>(mut self, name: &str, value: V) -> Field {
        self.extra.insert(name.to_string(), value.into());
        self
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wire index. Valid after registration.
    #[inline(always)]
    pub fn index(&self) -> u16 {
        self.index as u16
    }

    /// Instance storage key, `"_" + name`.
    #[inline(always)]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline(always)]
    pub fn field_type(&self) -> &FieldType {
        &self.value_type
    }

    #[inline(always)]
    pub fn container(&self) -> ContainerKind {
        self.container
    }

    #[inline(always)]
    pub fn is_container(&self) -> bool {
        self.container != ContainerKind::Scalar
    }

    #[inline(always)]
    pub fn key_kind(&self) -> Option<PrimitiveKind> {
        self.key_kind
    }

    #[inline(always)]
    pub fn is_ref(&self) -> bool {
        self.is_ref
    }

    #[inline(always)]
    pub fn is_skip_changed(&self) -> bool {
        self.skip_changed
    }

    #[inline(always)]
    pub fn is_arithm(&self) -> bool {
        self.arithm
    }

    #[inline(always)]
    pub fn min_value(&self) -> Option<i64> {
        self.min_value
    }

    #[inline(always)]
    pub fn is_record_type(&self) -> bool {
        self.value_type.is_record()
    }

    pub fn desc(&self) -> Option<&str> {
        self.desc.as_deref()
    }

    /// A retained unrecognized option, by name.
    pub fn opt(&self, name: &str) -> Option<&JsonValue> {
        self.extra.get(name)
    }

    pub(crate) fn create_fn(&self) -> Option<&CreateFn> {
        self.create.as_ref()
    }

    /// The value a getter yields when the slot is unset: the declared
    /// default, else the primitive kind's zero value, else `Null` for
    /// record types.
    pub fn default_value(&self) -> Value {
        if let Some(default) = &self.default {
            return default.clone();
        }
        match &self.value_type {
            FieldType::Primitive(kind) => kind.default_value(),
            _ => Value::Null,
        }
    }
}

impl std::fmt::Debug for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<Field name={}, index={}, type={}>",
            self.name,
            self.index,
            self.value_type.type_name()
        )
    }
}

/// Conjunction of field predicates; a field is encoded only when every
/// predicate accepts it.
#[derive(Clone, Default)]
pub struct FieldFilter {
    filters: Vec<Rc<dyn Fn(&Field) -> bool>>,
}

impl FieldFilter {
    pub fn new() -> FieldFilter {
        FieldFilter::default()
    }

    pub fn with<F: Fn(&Field) -> bool + 'static>(filter: F) -> FieldFilter {
        FieldFilter {
            filters: vec![Rc::new(filter)],
        }
    }

    pub fn push<F: Fn(&Field) -> bool + 'static>(&mut self, filter: F) {
        self.filters.push(Rc::new(filter));
    }

    /// Combine two filters into one that requires both.
    pub fn merged(&self, other: &FieldFilter) -> FieldFilter {
        let mut filters = self.filters.clone();
        filters.extend(other.filters.iter().cloned());
        FieldFilter { filters }
    }

    pub fn accepts(&self, field: &Field) -> bool {
        self.filters.iter().all(|f| f(field))
    }
}

/// The id-map element filter: the `oid` field is the map key and is
/// suppressed from element bodies.
pub(crate) fn exclude_oid_field(field: &Field) -> bool {
    field.name() != "oid"
}
