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

use std::borrow::Cow;

use thiserror::Error;

/// Error type for every fallible model operation.
///
/// Construct variants through the static constructor functions
/// ([`Error::define`], [`Error::pack`], ...) rather than the enum syntax;
/// they accept anything convertible into a `Cow<'static, str>` and keep
/// error creation uniform across the codebase.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Invalid schema declaration (unsupported type, bad index, conflicting
    /// container flags, `ref` on a non-record type, ...).
    #[error("define error: {0}")]
    Define(Cow<'static, str>),

    /// Two distinct definition sites claim the same field index.
    #[error("duplicate field index: {0}")]
    DuplicateIndex(Cow<'static, str>),

    /// Two distinct definition sites claim the same field name.
    #[error("duplicate field name: {0}")]
    DuplicateName(Cow<'static, str>),

    /// Illegal runtime action, e.g. deleting a container field.
    #[error("operate error: {0}")]
    Operate(Cow<'static, str>),

    /// Lookup by a name that is not part of the schema.
    #[error("no such field: {0}")]
    NoField(Cow<'static, str>),

    /// Checked subtraction would go below the field's lower bound.
    #[error("overflow lower limit: {0}")]
    OverflowLower(Cow<'static, str>),

    /// A string value does not fit the `u16` length prefix of the wire.
    #[error("string too long for wire format: {0} bytes")]
    StringTooLong(usize),

    /// Encoding failure: unknown format selector, unknown field index on
    /// binary decode, malformed container head.
    #[error("pack error: {0}")]
    Pack(Cow<'static, str>),

    /// Structural decode received a value it cannot coerce.
    #[error("unpack error: {0}")]
    Unpack(Cow<'static, str>),

    /// Read past the end of the input buffer.
    #[error("buffer out of bound: {0} + {1} > {2}")]
    BufferOutOfBound(usize, usize, usize),
}

impl Error {
    /// Creates a new [`Error::Define`].
    #[cold]
    #[track_caller]
    pub fn define<S: Into<Cow<'static, str>>>(s: S) -> Self {
        Error::Define(s.into())
    }

    /// Creates a new [`Error::DuplicateIndex`].
    #[cold]
    #[track_caller]
    pub fn duplicate_index<S: Into<Cow<'static, str>>>(s: S) -> Self {
        Error::DuplicateIndex(s.into())
    }

    /// Creates a new [`Error::DuplicateName`].
    #[cold]
    #[track_caller]
    pub fn duplicate_name<S: Into<Cow<'static, str>>>(s: S) -> Self {
        Error::DuplicateName(s.into())
    }

    /// Creates a new [`Error::Operate`].
    #[cold]
    #[track_caller]
    pub fn operate<S: Into<Cow<'static, str>>>(s: S) -> Self {
        Error::Operate(s.into())
    }

    /// Creates a new [`Error::NoField`] for the given field name.
    #[cold]
    #[track_caller]
    pub fn no_field<S: Into<Cow<'static, str>>>(s: S) -> Self {
        Error::NoField(s.into())
    }

    /// Creates a new [`Error::OverflowLower`].
    #[cold]
    #[track_caller]
    pub fn overflow_lower<S: Into<Cow<'static, str>>>(s: S) -> Self {
        Error::OverflowLower(s.into())
    }

    /// Creates a new [`Error::StringTooLong`] with the offending byte length.
    #[cold]
    #[track_caller]
    pub fn string_too_long(len: usize) -> Self {
        Error::StringTooLong(len)
    }

    /// Creates a new [`Error::Pack`].
    #[cold]
    #[track_caller]
    pub fn pack<S: Into<Cow<'static, str>>>(s: S) -> Self {
        Error::Pack(s.into())
    }

    /// Creates a new [`Error::Unpack`].
    #[cold]
    #[track_caller]
    pub fn unpack<S: Into<Cow<'static, str>>>(s: S) -> Self {
        Error::Unpack(s.into())
    }

    /// Creates a new [`Error::BufferOutOfBound`] with the given bounds.
    #[cold]
    #[track_caller]
    pub fn buffer_out_of_bound(offset: usize, length: usize, capacity: usize) -> Self {
        Error::BufferOutOfBound(offset, length, capacity)
    }
}
