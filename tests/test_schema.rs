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

use datamodel::{Error, Field, Protocol, Record, Value};

fn point() -> std::rc::Rc<Protocol> {
    Protocol::build(
        "Point",
        &[],
        vec![
            Field::new("x", "int32", 1).arithm().with_min_value(-1),
            Field::new("y", "uint32", 2).arithm(),
        ],
    )
    .unwrap()
}

#[test]
fn test_field_table_order_and_lookup() {
    let proto = Protocol::build(
        "Mixed",
        &[],
        vec![
            Field::new("c", "int32", 30),
            Field::new("a", "int32", 10),
            Field::new("b", "int32", 20),
        ],
    )
    .unwrap();

    let names: Vec<&str> = proto.fields().iter().map(|f| f.name()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);

    assert_eq!(proto.field_by_index(20).unwrap().name(), "b");
    assert_eq!(proto.field_by_name("c").unwrap().index(), 30);
    assert_eq!(proto.field_by_key("_a").unwrap().name(), "a");
    assert_eq!(proto.field_by_name("a").unwrap().key(), "_a");
}

#[test]
fn test_invalid_index() {
    let err = Protocol::build("Bad", &[], vec![Field::new("x", "int32", 0)]).unwrap_err();
    assert!(matches!(err, Error::Define(_)));

    let err = Protocol::build("Bad", &[], vec![Field::new("x", "int32", 70000)]).unwrap_err();
    assert!(matches!(err, Error::Define(_)));
}

#[test]
fn test_unsupported_type() {
    let err = Protocol::build("Bad", &[], vec![Field::new("x", "int128", 1)]).unwrap_err();
    assert!(matches!(err, Error::Define(_)));
}

#[test]
fn test_arithm_on_string() {
    let err =
        Protocol::build("Bad", &[], vec![Field::new("x", "string", 1).arithm()]).unwrap_err();
    assert!(matches!(err, Error::Define(_)));
}

#[test]
fn test_map_requires_key_kind() {
    let err = Protocol::build("Bad", &[], vec![Field::map("m", "int32", 1, "nope")]).unwrap_err();
    assert!(matches!(err, Error::Define(_)));

    // float keys are not hashable
    let err = Protocol::build("Bad", &[], vec![Field::map("m", "int32", 1, "double")]).unwrap_err();
    assert!(matches!(err, Error::Define(_)));
}

#[test]
fn test_ref_requires_record_type() {
    let err =
        Protocol::build("Bad", &[], vec![Field::new("r", "int32", 1).reference()]).unwrap_err();
    assert!(matches!(err, Error::Define(_)));
}

#[test]
fn test_ref_target_needs_oid() {
    let p = point();
    let err =
        Protocol::build("Bad", &[], vec![Field::new("r", &p, 1).reference()]).unwrap_err();
    assert!(matches!(err, Error::Define(_)));
}

#[test]
fn test_id_map_key_must_match_oid_kind() {
    let obj = Protocol::build(
        "Object",
        &[],
        vec![
            Field::new("oid", "uint32", 1),
            Field::new("name", "string", 2),
        ],
    )
    .unwrap();

    let err = Protocol::build(
        "Bad",
        &[],
        vec![Field::id_map("objects", &obj, 1, "string")],
    )
    .unwrap_err();
    assert!(matches!(err, Error::Define(_)));

    assert!(Protocol::build(
        "Objects",
        &[],
        vec![Field::id_map("objects", &obj, 1, "uint32")],
    )
    .is_ok());
}

#[test]
fn test_duplicate_index_across_inheritance() {
    let base = point();
    let err = Protocol::build(
        "Point3d",
        &[&base],
        vec![Field::new("z", "int32", 1)],
    )
    .unwrap_err();
    assert!(matches!(err, Error::DuplicateIndex(_)));
}

#[test]
fn test_duplicate_name_across_inheritance() {
    let base = point();
    let err = Protocol::build(
        "Point3d",
        &[&base],
        vec![Field::new("x", "int32", 4)],
    )
    .unwrap_err();
    assert!(matches!(err, Error::DuplicateName(_)));
}

#[test]
fn test_duplicate_within_declaration() {
    let err = Protocol::build(
        "Bad",
        &[],
        vec![Field::new("x", "int32", 1), Field::new("y", "int32", 1)],
    )
    .unwrap_err();
    assert!(matches!(err, Error::DuplicateIndex(_)));
}

#[test]
fn test_inheritance_chain() {
    let px = Protocol::build("PointX", &[], vec![Field::new("x", "int32", 1)]).unwrap();
    let py = Protocol::build("PointY", &[&px], vec![]).unwrap();
    let pz = Protocol::build("PointZ", &[&py], vec![]).unwrap();
    let pa = Protocol::build("PointA", &[&pz], vec![]).unwrap();

    let p = Record::new(&pa);
    p.set("x", 1i32).unwrap();
    assert_eq!(p.get("x").unwrap(), Value::I32(1));
}

#[test]
fn test_diamond_inheritance_is_legal() {
    let base = Protocol::build("Base", &[], vec![Field::new("x", "int32", 1)]).unwrap();
    let left = Protocol::build("Left", &[&base], vec![Field::new("l", "int32", 2)]).unwrap();
    let right = Protocol::build("Right", &[&base], vec![Field::new("r", "int32", 3)]).unwrap();

    // the shared `x` definition arrives through both parents
    let merged = Protocol::build("Merged", &[&left, &right], vec![]).unwrap();
    assert_eq!(merged.num_fields(), 3);
    assert_eq!(merged.field_by_index(1).unwrap().name(), "x");
}

#[test]
fn test_inherited_fields_extend_subtype() {
    let base = point();
    let proto = Protocol::build(
        "Point3d",
        &[&base],
        vec![Field::new("z", "int32", 3)],
    )
    .unwrap();
    assert_eq!(proto.num_fields(), 3);

    let p = Record::new(&proto);
    p.set("x", 1i32).unwrap();
    p.set("z", 3i32).unwrap();
    assert_eq!(p.get("z").unwrap(), Value::I32(3));
}

#[test]
fn test_extra_options_retained() {
    let proto = Protocol::build(
        "Conf",
        &[],
        vec![
            Field::new("x", "int32", 1).with_opt("conf_name", "xx"),
            Field::new("y", "int32", 2).with_opt("conf_name", "yy"),
        ],
    )
    .unwrap();

    let names: Vec<String> = proto
        .fields()
        .iter()
        .filter_map(|f| f.opt("conf_name"))
        .filter_map(|v| v.as_str().map(|s| s.to_string()))
        .collect();
    assert_eq!(names, vec!["xx", "yy"]);
}

#[test]
fn test_desc_is_ignored_by_engine() {
    let proto = Protocol::build(
        "Doc",
        &[],
        vec![Field::new("x", "uint32", 1).with_desc("refresh batch id")],
    )
    .unwrap();
    assert_eq!(proto.field_by_name("x").unwrap().desc(), Some("refresh batch id"));
}

#[test]
fn test_default_values() {
    let coord = Protocol::build(
        "Coord",
        &[],
        vec![
            Field::new("oid", "string", 1),
            Field::new("x", "int32", 2).with_default(100i32),
            Field::new("y", "int32", 3).with_default(100i32),
        ],
    )
    .unwrap();

    let c = Record::new(&coord);
    assert_eq!(c.get("x").unwrap(), Value::I32(100));
    assert_eq!(c.get("oid").unwrap(), Value::Str(String::new()));
    assert!(c.is_default_value("x").unwrap());

    c.set("x", 5i32).unwrap();
    assert!(!c.is_default_value("x").unwrap());
}
