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

use std::rc::Rc;

use datamodel::{
    Error, Field, PackOptions, Protocol, Record, UnpackOptions, Value,
};
use serde_json::json;

fn point() -> Rc<Protocol> {
    Protocol::build(
        "Point",
        &[],
        vec![
            Field::new("x", "int32", 1),
            Field::new("y", "uint32", 2),
        ],
    )
    .unwrap()
}

fn rect() -> Rc<Protocol> {
    let p = point();
    Protocol::build(
        "Rect",
        &[],
        vec![Field::new("lt", &p, 1), Field::new("rb", &p, 2)],
    )
    .unwrap()
}

fn new_point(x: i32, y: u32) -> Record {
    let p = Record::new(&point());
    p.set_data([("x", Value::I32(x)), ("y", Value::U32(y))]).unwrap();
    p
}

#[test]
fn test_fresh_record_is_clean() {
    let p = Record::new(&point());
    assert!(!p.has_changed(false));
    assert!(!p.has_changed(true));
}

#[test]
fn test_changed() {
    let p = new_point(1, 0);
    p.set("y", 2u32).unwrap();
    assert!(p.has_field_changed("y", false).unwrap());
    assert!(!p.has_field_changed("x", false).unwrap());

    let out = p
        .pack_to_dict(&PackOptions::new().only_changed(true))
        .unwrap();
    assert_eq!(out, json!({"y": 2}));

    p.clear_changed(&[], true);
    assert!(!p.has_field_changed("x", false).unwrap());
    assert!(!p.has_field_changed("y", false).unwrap());
    assert!(!p.has_changed(false));

    p.set_changed(&["x", "y"]).unwrap();
    assert!(p.has_field_changed("x", false).unwrap());
    assert!(p.has_field_changed("y", false).unwrap());
    assert!(p.has_changed(false));

    p.clear_changed(&["y"], true);
    let out = p
        .pack_to_dict(&PackOptions::new().only_changed(true))
        .unwrap();
    assert_eq!(out, json!({"x": 1}));

    p.clear_changed(&[], true);

    p.set_changed(&[]).unwrap();
    assert!(p.has_field_changed("x", false).unwrap());
    assert!(p.has_field_changed("y", false).unwrap());
    assert!(p.has_changed(false));

    p.clear_changed(&[], true);
    let out = p
        .pack_to_dict(&PackOptions::new().only_changed(true))
        .unwrap();
    assert_eq!(out, json!({}));
}

#[test]
fn test_set_changed_unknown_name() {
    let p = new_point(1, 0);
    assert!(matches!(
        p.set_changed(&["zz"]).unwrap_err(),
        Error::NoField(_)
    ));
}

#[test]
fn test_nested_delta() {
    let r = Record::new(&rect());
    r.set("lt", new_point(1, 1)).unwrap();
    r.set("rb", new_point(2, 2)).unwrap();
    r.clear_changed(&[], true);

    let out = r
        .pack_to_dict(&PackOptions::new().only_changed(true))
        .unwrap();
    assert_eq!(out, json!({}));

    let lt = r.get("lt").unwrap();
    lt.as_record().unwrap().set("x", 100i32).unwrap();
    let rb = r.get("rb").unwrap();
    rb.as_record().unwrap().set("y", 100u32).unwrap();

    let out = r
        .pack_to_dict(&PackOptions::new().only_changed(true))
        .unwrap();
    assert_eq!(out, json!({"lt": {"x": 100}, "rb": {"y": 100}}));
}

#[test]
fn test_sibling_dirtiness_is_isolated() {
    let p = new_point(1, 2);
    p.clear_changed(&[], true);
    p.set("x", 9i32).unwrap();
    assert!(p.has_field_changed("x", false).unwrap());
    assert!(!p.has_field_changed("y", false).unwrap());
}

#[test]
fn test_nested_change_needs_recursive() {
    let r = Record::new(&rect());
    r.set("lt", new_point(1, 1)).unwrap();
    r.clear_changed(&[], true);

    let lt = r.get("lt").unwrap();
    lt.as_record().unwrap().set("x", 5i32).unwrap();

    // the parent's own dirty set is untouched
    assert!(!r.has_changed(false));
    assert!(r.has_changed(true));
    assert!(r.has_field_changed("lt", true).unwrap());
}

#[test]
fn test_clear_changed_recursive_leaves_subtree_clean() {
    let r = Record::new(&rect());
    r.set("lt", new_point(1, 1)).unwrap();
    r.set("rb", new_point(2, 2)).unwrap();

    // the assignments marked both fields on the parent
    assert!(r.has_changed(true));

    r.clear_changed(&[], true);
    assert!(!r.has_changed(true));
    let lt = r.get("lt").unwrap();
    assert!(!lt.as_record().unwrap().has_changed(true));
}

#[test]
fn test_skip_changed_field() {
    let proto = Protocol::build(
        "Session",
        &[],
        vec![
            Field::new("name", "string", 1),
            Field::new("ticks", "uint64", 2).skip_changed(),
        ],
    )
    .unwrap();

    let s = Record::new(&proto);
    s.set("ticks", 5u64).unwrap();
    assert!(!s.has_field_changed("ticks", false).unwrap());
    assert!(!s.has_changed(false));

    s.set_changed(&[]).unwrap();
    assert!(!s.has_field_changed("ticks", false).unwrap());

    // the value itself is stored fine and full packs carry it
    let out = s.pack_to_dict(&PackOptions::new()).unwrap();
    assert_eq!(out, json!({"ticks": 5}));
    let delta = s
        .pack_to_dict(&PackOptions::new().only_changed(true))
        .unwrap();
    assert_eq!(delta.get("ticks"), None);
}

#[test]
fn test_pack_clear_changed() {
    let p = new_point(0, 0);
    p.set("x", 3i32).unwrap();

    let out = p
        .pack_to_dict(&PackOptions::new().only_changed(true).clear_changed(true))
        .unwrap();
    assert_eq!(out, json!({"x": 3}));

    assert!(!p.has_changed(true));
    let out = p
        .pack_to_dict(&PackOptions::new().only_changed(true))
        .unwrap();
    assert_eq!(out, json!({}));
}

#[test]
fn test_mark_change_on_decode() {
    let p = new_point(1, 2);
    let out = p.pack_to_dict(&PackOptions::new()).unwrap();

    let q = Record::new(&point());
    q.unpack_from_dict(&out, UnpackOptions::new()).unwrap();
    assert!(!q.has_changed(true));

    let q2 = Record::new(&point());
    q2.unpack_from_dict(&out, UnpackOptions::new().mark_change(true))
        .unwrap();
    assert!(q2.has_field_changed("x", false).unwrap());
    assert!(q2.has_field_changed("y", false).unwrap());
}
