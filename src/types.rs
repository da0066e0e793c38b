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

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::Error;
use crate::value::Value;

/// Highest legal field index. Index `0` is reserved as the end-of-record
/// marker on the binary wire.
pub const MAX_FIELD_INDEX: u32 = u16::MAX as u32;

/// Field index value that terminates a record body on the binary wire.
pub const FIELD_INDEX_END: u16 = 0;

/// Head tag byte written before a container payload on the binary wire,
/// followed by a `u32` element count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ContainerTag {
    Array = 0xD0,
    Map = 0xD1,
    IdMap = 0xD2,
}

/// The closed set of primitive field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float,
    Double,
    Bool,
    String,
}

impl PrimitiveKind {
    /// Resolve a declared type name, e.g. `"uint32"`.
    pub fn from_name(name: &str) -> Option<PrimitiveKind> {
        Some(match name {
            "int8" => PrimitiveKind::Int8,
            "uint8" => PrimitiveKind::UInt8,
            "int16" => PrimitiveKind::Int16,
            "uint16" => PrimitiveKind::UInt16,
            "int32" => PrimitiveKind::Int32,
            "uint32" => PrimitiveKind::UInt32,
            "int64" => PrimitiveKind::Int64,
            "uint64" => PrimitiveKind::UInt64,
            "float" => PrimitiveKind::Float,
            "double" => PrimitiveKind::Double,
            "bool" => PrimitiveKind::Bool,
            "string" => PrimitiveKind::String,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveKind::Int8 => "int8",
            PrimitiveKind::UInt8 => "uint8",
            PrimitiveKind::Int16 => "int16",
            PrimitiveKind::UInt16 => "uint16",
            PrimitiveKind::Int32 => "int32",
            PrimitiveKind::UInt32 => "uint32",
            PrimitiveKind::Int64 => "int64",
            PrimitiveKind::UInt64 => "uint64",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::String => "string",
        }
    }

    /// The value a getter yields for a field that was never assigned.
    pub fn default_value(&self) -> Value {
        match self {
            PrimitiveKind::Int8 => Value::I8(0),
            PrimitiveKind::UInt8 => Value::U8(0),
            PrimitiveKind::Int16 => Value::I16(0),
            PrimitiveKind::UInt16 => Value::U16(0),
            PrimitiveKind::Int32 => Value::I32(0),
            PrimitiveKind::UInt32 => Value::U32(0),
            PrimitiveKind::Int64 => Value::I64(0),
            PrimitiveKind::UInt64 => Value::U64(0),
            PrimitiveKind::Float => Value::F32(0.0),
            PrimitiveKind::Double => Value::F64(0.0),
            PrimitiveKind::Bool => Value::Bool(false),
            PrimitiveKind::String => Value::Str(String::new()),
        }
    }

    #[inline(always)]
    pub fn is_unsigned(&self) -> bool {
        matches!(
            self,
            PrimitiveKind::UInt8
                | PrimitiveKind::UInt16
                | PrimitiveKind::UInt32
                | PrimitiveKind::UInt64
        )
    }

    #[inline(always)]
    pub fn is_integer(&self) -> bool {
        !matches!(
            self,
            PrimitiveKind::Float | PrimitiveKind::Double | PrimitiveKind::Bool | PrimitiveKind::String
        )
    }

    #[inline(always)]
    pub fn is_float(&self) -> bool {
        matches!(self, PrimitiveKind::Float | PrimitiveKind::Double)
    }

    /// Numeric kinds are the legal targets of `arithm`.
    #[inline(always)]
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Kinds usable as map keys. Floats have no total hashable equality and
    /// are rejected at registration.
    #[inline(always)]
    pub fn is_key_kind(&self) -> bool {
        !self.is_float()
    }
}

/// Validate a declared field index, returning it narrowed to `u16`.
pub fn check_field_index(index: u32) -> Result<u16, Error> {
    if index == 0 || index > MAX_FIELD_INDEX {
        return Err(Error::define(format!("invalid field index: {}", index)));
    }
    Ok(index as u16)
}
