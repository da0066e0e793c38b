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

//! # datamodel
//!
//! Schema-driven persistable nested records with incremental ("delta")
//! serialization.
//!
//! A record type is registered once with [`Protocol::build`], declaring its
//! fields ([`Field`]) with wire indices, container shapes and options. Every
//! [`Record`] instance then tracks per-field dirtiness and can be packed two
//! ways: a self-describing structural map keyed by field name, or a compact
//! big-endian binary stream keyed by field index. Delta packing emits only
//! fields whose value changed since the last clear, with explicit `null`
//! tombstones for removed map keys.
//!
//! ## Usage
//!
//! ```rust
//! use datamodel::{Field, PackOptions, Protocol, Record};
//!
//! let point = Protocol::build(
//!     "Point",
//!     &[],
//!     vec![
//!         Field::new("x", "int32", 1),
//!         Field::new("y", "int32", 2),
//!     ],
//! )
//! .unwrap();
//!
//! let p = Record::new(&point);
//! p.set("x", 1i32).unwrap();
//! p.set("y", 2i32).unwrap();
//!
//! let full = p.pack_to_dict(&PackOptions::new()).unwrap();
//! assert_eq!(full, serde_json::json!({"x": 1, "y": 2}));
//!
//! p.clear_changed(&[], true);
//! p.set("y", 5i32).unwrap();
//! let delta = p
//!     .pack_to_dict(&PackOptions::new().only_changed(true))
//!     .unwrap();
//! assert_eq!(delta, serde_json::json!({"y": 5}));
//! ```
//!
//! ## Modules
//!
//! - **`schema`**: type registration and the bound field table
//! - **`record`**: instances, accessors, change tracking, pack/unpack
//! - **`container`**: `Array` / `Map` / `IdMap` wrapper types
//! - **`codec`**: the structural and binary pipelines plus the decode
//!   context with two-phase reference resolution
//! - **`buffer`**: big-endian wire primitives
//! - **`dirty`**: the per-instance dirty-index set

pub mod buffer;
pub mod codec;
pub mod container;
pub mod dirty;
pub mod error;
pub mod field;
pub mod record;
pub mod schema;
pub mod types;
pub mod value;

pub use codec::context::{DecodeContext, DecodeMode, ResolveRefFn, UnsolvedRefs};
pub use container::{Array, IdMap, Map, MapKey};
pub use dirty::DirtySet;
pub use error::Error;
pub use field::{ContainerKind, CreateFn, Field, FieldFilter, FieldType};
pub use record::{PackOptions, Packed, Record, UnpackOptions};
pub use schema::Protocol;
pub use types::PrimitiveKind;
pub use value::Value;
