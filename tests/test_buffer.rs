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

use datamodel::buffer::{Reader, Writer};
use datamodel::Error;

#[test]
fn test_fixed_width_round_trip() {
    let mut writer = Writer::new();
    writer.write_i8(-1);
    writer.write_u8(255);
    writer.write_i16(-2);
    writer.write_u16(65535);
    writer.write_i32(-3);
    writer.write_u32(4_000_000_000);
    writer.write_i64(-4);
    writer.write_u64(u64::MAX);
    writer.write_f32(1.5);
    writer.write_f64(-2.25);
    writer.write_bool(true);
    writer.write_bool(false);

    let bytes = writer.dump();
    let mut reader = Reader::new(&bytes);
    assert_eq!(reader.read_i8().unwrap(), -1);
    assert_eq!(reader.read_u8().unwrap(), 255);
    assert_eq!(reader.read_i16().unwrap(), -2);
    assert_eq!(reader.read_u16().unwrap(), 65535);
    assert_eq!(reader.read_i32().unwrap(), -3);
    assert_eq!(reader.read_u32().unwrap(), 4_000_000_000);
    assert_eq!(reader.read_i64().unwrap(), -4);
    assert_eq!(reader.read_u64().unwrap(), u64::MAX);
    assert_eq!(reader.read_f32().unwrap(), 1.5);
    assert_eq!(reader.read_f64().unwrap(), -2.25);
    assert!(reader.read_bool().unwrap());
    assert!(!reader.read_bool().unwrap());
    assert!(reader.is_end());
}

#[test]
fn test_big_endian_layout() {
    let mut writer = Writer::new();
    writer.write_u16(0x0102);
    writer.write_u32(0x0A0B0C0D);
    writer.write_i32(-2);
    assert_eq!(
        writer.dump(),
        vec![0x01, 0x02, 0x0A, 0x0B, 0x0C, 0x0D, 0xFF, 0xFF, 0xFF, 0xFE]
    );
}

#[test]
fn test_string_round_trip() {
    let mut writer = Writer::new();
    writer.write_str("hello").unwrap();
    writer.write_str("").unwrap();

    let bytes = writer.dump();
    // u16 length prefix then raw bytes
    assert_eq!(&bytes[..7], &[0x00, 0x05, b'h', b'e', b'l', b'l', b'o']);

    let mut reader = Reader::new(&bytes);
    assert_eq!(reader.read_str().unwrap(), "hello");
    assert_eq!(reader.read_str().unwrap(), "");
}

#[test]
fn test_string_too_long() {
    let mut writer = Writer::new();
    let huge = "x".repeat(65536);
    let err = writer.write_str(&huge).unwrap_err();
    assert!(matches!(err, Error::StringTooLong(65536)));

    // exactly u16::MAX bytes still fits
    let edge = "x".repeat(65535);
    assert!(writer.write_str(&edge).is_ok());
}

#[test]
fn test_read_past_end() {
    let bytes = [0x00u8, 0x01];
    let mut reader = Reader::new(&bytes);
    assert_eq!(reader.read_u16().unwrap(), 1);
    assert!(reader.is_end());
    let err = reader.read_u32().unwrap_err();
    assert!(matches!(err, Error::BufferOutOfBound(..)));
}

#[test]
fn test_truncated_string() {
    // length says 10 but only 3 payload bytes follow
    let bytes = [0x00u8, 0x0A, b'a', b'b', b'c'];
    let mut reader = Reader::new(&bytes);
    assert!(matches!(
        reader.read_str().unwrap_err(),
        Error::BufferOutOfBound(..)
    ));
}
