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

use crate::container::{Array, IdMap, Map, MapKey};
use crate::error::Error;
use crate::record::Record;
use crate::types::PrimitiveKind;

/// Tagged union over everything a field slot can hold.
///
/// Record and container variants are cheap-clone handles; cloning a `Value`
/// never deep-copies an object graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent data. Getters yield this for an unset record-typed field.
    Null,
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Bool(bool),
    Str(String),
    Record(Record),
    Array(Array),
    Map(Map),
    IdMap(IdMap),
}

impl Value {
    #[inline(always)]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The primitive kind of a scalar value, `None` for records/containers.
    pub fn kind(&self) -> Option<PrimitiveKind> {
        Some(match self {
            Value::I8(_) => PrimitiveKind::Int8,
            Value::U8(_) => PrimitiveKind::UInt8,
            Value::I16(_) => PrimitiveKind::Int16,
            Value::U16(_) => PrimitiveKind::UInt16,
            Value::I32(_) => PrimitiveKind::Int32,
            Value::U32(_) => PrimitiveKind::UInt32,
            Value::I64(_) => PrimitiveKind::Int64,
            Value::U64(_) => PrimitiveKind::UInt64,
            Value::F32(_) => PrimitiveKind::Float,
            Value::F64(_) => PrimitiveKind::Double,
            Value::Bool(_) => PrimitiveKind::Bool,
            Value::Str(_) => PrimitiveKind::String,
            _ => return None,
        })
    }

    #[inline(always)]
    pub fn matches_kind(&self, kind: PrimitiveKind) -> bool {
        self.kind() == Some(kind)
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_id_map(&self) -> Option<&IdMap> {
        match self {
            Value::IdMap(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Widen any integer variant.
    pub fn as_i128(&self) -> Option<i128> {
        Some(match self {
            Value::I8(v) => *v as i128,
            Value::U8(v) => *v as i128,
            Value::I16(v) => *v as i128,
            Value::U16(v) => *v as i128,
            Value::I32(v) => *v as i128,
            Value::U32(v) => *v as i128,
            Value::I64(v) => *v as i128,
            Value::U64(v) => *v as i128,
            _ => return None,
        })
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F32(v) => Some(*v as f64),
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Narrow a wide integer back into the declared kind. Out-of-range
    /// values are an illegal runtime action.
    pub fn from_i128(kind: PrimitiveKind, v: i128) -> Result<Value, Error> {
        let out_of_range = || Error::operate(format!("value {} out of range for {}", v, kind.name()));
        Ok(match kind {
            PrimitiveKind::Int8 => Value::I8(i8::try_from(v).map_err(|_| out_of_range())?),
            PrimitiveKind::UInt8 => Value::U8(u8::try_from(v).map_err(|_| out_of_range())?),
            PrimitiveKind::Int16 => Value::I16(i16::try_from(v).map_err(|_| out_of_range())?),
            PrimitiveKind::UInt16 => Value::U16(u16::try_from(v).map_err(|_| out_of_range())?),
            PrimitiveKind::Int32 => Value::I32(i32::try_from(v).map_err(|_| out_of_range())?),
            PrimitiveKind::UInt32 => Value::U32(u32::try_from(v).map_err(|_| out_of_range())?),
            PrimitiveKind::Int64 => Value::I64(i64::try_from(v).map_err(|_| out_of_range())?),
            PrimitiveKind::UInt64 => Value::U64(u64::try_from(v).map_err(|_| out_of_range())?),
            _ => return Err(Error::operate(format!("{} is not an integer kind", kind.name()))),
        })
    }

    pub fn from_f64(kind: PrimitiveKind, v: f64) -> Result<Value, Error> {
        Ok(match kind {
            PrimitiveKind::Float => Value::F32(v as f32),
            PrimitiveKind::Double => Value::F64(v),
            _ => return Err(Error::operate(format!("{} is not a float kind", kind.name()))),
        })
    }

    /// Convert a scalar into a hashable map key, normalizing integer widths.
    pub fn to_map_key(&self) -> Option<MapKey> {
        Some(match self {
            Value::I8(v) => MapKey::Int(*v as i64),
            Value::I16(v) => MapKey::Int(*v as i64),
            Value::I32(v) => MapKey::Int(*v as i64),
            Value::I64(v) => MapKey::Int(*v),
            Value::U8(v) => MapKey::UInt(*v as u64),
            Value::U16(v) => MapKey::UInt(*v as u64),
            Value::U32(v) => MapKey::UInt(*v as u64),
            Value::U64(v) => MapKey::UInt(*v),
            Value::Bool(v) => MapKey::Bool(*v),
            Value::Str(s) => MapKey::Str(s.clone()),
            _ => return None,
        })
    }
}

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for Value {
            fn from(v: $ty) -> Value {
                Value::$variant(v)
            }
        })*
    };
}

impl_from_scalar!(
    i8 => I8, u8 => U8, i16 => I16, u16 => U16, i32 => I32, u32 => U32,
    i64 => I64, u64 => U64, f32 => F32, f64 => F64, bool => Bool, String => Str,
);

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::Str(v.to_string())
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Value {
        Value::Record(v)
    }
}

impl From<Array> for Value {
    fn from(v: Array) -> Value {
        Value::Array(v)
    }
}

impl From<Map> for Value {
    fn from(v: Map) -> Value {
        Value::Map(v)
    }
}

impl From<IdMap> for Value {
    fn from(v: IdMap) -> Value {
        Value::IdMap(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Value {
        Value::Array(Array::from_values(v))
    }
}
