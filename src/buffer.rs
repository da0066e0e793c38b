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

//! Byte-buffer primitives for the binary wire format.
//!
//! All multi-byte values are big-endian (network order). Strings are
//! `u16` byte-length prefixed UTF-8.

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

use crate::error::Error;

/// Growable output buffer.
#[derive(Default)]
pub struct Writer {
    bf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Writer {
        Writer::default()
    }

    pub fn dump(self) -> Vec<u8> {
        self.bf
    }

    pub fn len(&self) -> usize {
        self.bf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bf.is_empty()
    }

    pub fn reserve(&mut self, additional: usize) {
        self.bf.reserve(additional);
    }

    pub fn write_bytes(&mut self, v: &[u8]) {
        self.bf.extend_from_slice(v);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.bf.write_u8(value).unwrap();
    }

    pub fn write_i8(&mut self, value: i8) {
        self.bf.write_i8(value).unwrap();
    }

    pub fn write_u16(&mut self, value: u16) {
        self.bf.write_u16::<BigEndian>(value).unwrap();
    }

    pub fn write_i16(&mut self, value: i16) {
        self.bf.write_i16::<BigEndian>(value).unwrap();
    }

    pub fn write_u32(&mut self, value: u32) {
        self.bf.write_u32::<BigEndian>(value).unwrap();
    }

    pub fn write_i32(&mut self, value: i32) {
        self.bf.write_i32::<BigEndian>(value).unwrap();
    }

    pub fn write_u64(&mut self, value: u64) {
        self.bf.write_u64::<BigEndian>(value).unwrap();
    }

    pub fn write_i64(&mut self, value: i64) {
        self.bf.write_i64::<BigEndian>(value).unwrap();
    }

    pub fn write_f32(&mut self, value: f32) {
        self.bf.write_f32::<BigEndian>(value).unwrap();
    }

    pub fn write_f64(&mut self, value: f64) {
        self.bf.write_f64::<BigEndian>(value).unwrap();
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(if value { 1 } else { 0 });
    }

    /// Length-prefixed string: `u16` byte length, then raw bytes.
    pub fn write_str(&mut self, value: &str) -> Result<(), Error> {
        let bytes = value.as_bytes();
        if bytes.len() > u16::MAX as usize {
            return Err(Error::string_too_long(bytes.len()));
        }
        self.write_u16(bytes.len() as u16);
        self.write_bytes(bytes);
        Ok(())
    }
}

/// Cursored reader over an immutable input slice.
pub struct Reader<'de> {
    bf: &'de [u8],
    cursor: usize,
}

impl<'de> Reader<'de> {
    pub fn new(bf: &'de [u8]) -> Reader<'de> {
        Reader { bf, cursor: 0 }
    }

    #[inline(always)]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[inline(always)]
    pub fn is_end(&self) -> bool {
        self.cursor >= self.bf.len()
    }

    /// Advance the cursor by `n` bytes, returning the byte offset the read
    /// starts at. Errors when fewer than `n` bytes remain.
    #[inline(always)]
    fn advance(&mut self, n: usize) -> Result<usize, Error> {
        let offset = self.cursor;
        let next = offset + n;
        if next > self.bf.len() {
            return Err(Error::buffer_out_of_bound(offset, n, self.bf.len()));
        }
        self.cursor = next;
        Ok(offset)
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        let offset = self.advance(1)?;
        Ok(self.bf[offset])
    }

    pub fn read_i8(&mut self) -> Result<i8, Error> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16, Error> {
        let offset = self.advance(2)?;
        Ok(BigEndian::read_u16(&self.bf[offset..]))
    }

    pub fn read_i16(&mut self) -> Result<i16, Error> {
        let offset = self.advance(2)?;
        Ok(BigEndian::read_i16(&self.bf[offset..]))
    }

    pub fn read_u32(&mut self) -> Result<u32, Error> {
        let offset = self.advance(4)?;
        Ok(BigEndian::read_u32(&self.bf[offset..]))
    }

    pub fn read_i32(&mut self) -> Result<i32, Error> {
        let offset = self.advance(4)?;
        Ok(BigEndian::read_i32(&self.bf[offset..]))
    }

    pub fn read_u64(&mut self) -> Result<u64, Error> {
        let offset = self.advance(8)?;
        Ok(BigEndian::read_u64(&self.bf[offset..]))
    }

    pub fn read_i64(&mut self) -> Result<i64, Error> {
        let offset = self.advance(8)?;
        Ok(BigEndian::read_i64(&self.bf[offset..]))
    }

    pub fn read_f32(&mut self) -> Result<f32, Error> {
        let offset = self.advance(4)?;
        Ok(BigEndian::read_f32(&self.bf[offset..]))
    }

    pub fn read_f64(&mut self) -> Result<f64, Error> {
        let offset = self.advance(8)?;
        Ok(BigEndian::read_f64(&self.bf[offset..]))
    }

    pub fn read_bool(&mut self) -> Result<bool, Error> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'de [u8], Error> {
        let offset = self.advance(len)?;
        Ok(&self.bf[offset..offset + len])
    }

    /// Inverse of [`Writer::write_str`].
    pub fn read_str(&mut self) -> Result<String, Error> {
        let len = self.read_u16()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| Error::unpack("string payload is not valid utf-8"))
    }
}
