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
    DecodeContext, DecodeMode, Field, MapKey, PackOptions, Protocol, Record, UnpackOptions, Value,
};
use serde_json::json;

fn coord() -> Rc<Protocol> {
    Protocol::build(
        "Coord",
        &[],
        vec![
            Field::new("oid", "string", 1),
            Field::new("x", "int32", 2).with_default(100i32),
            Field::new("y", "int32", 3).with_default(100i32),
        ],
    )
    .unwrap()
}

fn scene() -> Rc<Protocol> {
    let c = coord();
    Protocol::build(
        "Scene",
        &[],
        vec![
            Field::map("coords", &c, 1, "string"),
            Field::map("refs", &c, 2, "string").reference(),
        ],
    )
    .unwrap()
}

fn new_coord(oid: &str, x: i32, y: i32) -> Record {
    let c = Record::new(&coord());
    c.set_data([
        ("oid", Value::Str(oid.into())),
        ("x", Value::I32(x)),
        ("y", Value::I32(y)),
    ])
    .unwrap();
    c
}

fn build_scene() -> Record {
    let s = Record::new(&scene());
    let coords = s.get("coords").unwrap();
    let coords = coords.as_map().unwrap().clone();
    for (oid, x, y) in [("a", 1, 2), ("b", 3, 4), ("c", 5, 6)] {
        coords.insert(MapKey::from(oid), Value::Record(new_coord(oid, x, y)));
    }
    let refs = s.get("refs").unwrap();
    let refs = refs.as_map().unwrap().clone();
    refs.insert(MapKey::from("1"), coords.get(&MapKey::from("a")).unwrap());
    refs.insert(MapKey::from("2"), coords.get(&MapKey::from("b")).unwrap());
    s.clear_changed(&[], true);
    s
}

#[test]
fn test_ref_fields_encode_as_oid() {
    let s = build_scene();
    let out = s.pack_to_dict(&PackOptions::new()).unwrap();
    assert_eq!(
        out,
        json!({
            "coords": {
                "a": {"oid": "a", "x": 1, "y": 2},
                "b": {"oid": "b", "x": 3, "y": 4},
                "c": {"oid": "c", "x": 5, "y": 6},
            },
            "refs": {"1": "a", "2": "b"},
        })
    );
}

#[test]
fn test_refs_resolve_against_known_objects() {
    let s = build_scene();
    let out = s.pack_to_dict(&PackOptions::new()).unwrap();

    let d = Record::new(&scene());
    let unsolved = d.unpack_from_dict(&out, UnpackOptions::new()).unwrap();
    assert!(unsolved.is_empty());

    // the ref entries alias the decoded coord objects
    let coords = d.get("coords").unwrap();
    let coords = coords.as_map().unwrap().clone();
    let refs = d.get("refs").unwrap();
    let refs = refs.as_map().unwrap().clone();
    let a = coords.get(&MapKey::from("a")).unwrap();
    let ref1 = refs.get(&MapKey::from("1")).unwrap();
    assert!(a.as_record().unwrap().ptr_eq(ref1.as_record().unwrap()));

    let d_out = d.pack_to_dict(&PackOptions::new()).unwrap();
    assert_eq!(out, d_out);
}

#[test]
fn test_resolve_ref_callback_is_authoritative() {
    let s = build_scene();
    let out = s.pack_to_dict(&PackOptions::new()).unwrap();

    let d = Record::new(&scene());
    d.unpack_from_dict(&out, UnpackOptions::new()).unwrap();

    // grow the source graph, ship a delta, resolve through the target
    let coords = s.get("coords").unwrap();
    let coords = coords.as_map().unwrap().clone();
    let refs = s.get("refs").unwrap();
    let refs = refs.as_map().unwrap().clone();
    refs.insert(MapKey::from("3"), coords.get(&MapKey::from("c")).unwrap());

    let delta = s
        .pack_to_dict(&PackOptions::new().only_changed(true))
        .unwrap();

    let resolver_target = d.clone();
    let unsolved = d
        .unpack_from_dict(
            &delta,
            UnpackOptions::new()
                .mode(DecodeMode::Sync)
                .resolve_ref(move |oid| {
                    let coords = resolver_target.get("coords").ok()?;
                    let coords = coords.as_map()?.clone();
                    coords.get(oid).and_then(|v| v.as_record().cloned())
                }),
        )
        .unwrap();
    assert!(unsolved.is_empty());

    let d_out = d.pack_to_dict(&PackOptions::new()).unwrap();
    let s_out = s.pack_to_dict(&PackOptions::new()).unwrap();
    assert_eq!(d_out, s_out);
}

#[test]
fn test_unresolved_refs_are_reported() {
    let d = Record::new(&scene());
    let unsolved = d
        .unpack_from_dict(&json!({"refs": {"1": "ghost"}}), UnpackOptions::new())
        .unwrap();
    assert_eq!(unsolved.len(), 1);
    assert!(unsolved.contains(&MapKey::from("ghost")));

    // the slot keeps the raw oid until something resolves it
    let refs = d.get("refs").unwrap();
    let refs = refs.as_map().unwrap().clone();
    assert_eq!(refs.get(&MapKey::from("1")).unwrap(), Value::Str("ghost".into()));
}

#[test]
fn test_shared_context_across_roots() {
    let peer_proto = Protocol::build(
        "Peer",
        &[],
        vec![
            Field::new("oid", "string", 1),
            Field::new("val", "int32", 2),
        ],
    )
    .unwrap();
    let node_proto = Protocol::build(
        "Node",
        &[],
        vec![
            Field::new("oid", "string", 1),
            Field::new("peer", &peer_proto, 2).reference(),
        ],
    )
    .unwrap();

    let b = Record::new(&peer_proto);
    b.set_data([("oid", Value::Str("b".into())), ("val", Value::I32(9))])
        .unwrap();
    let a = Record::new(&node_proto);
    a.set_data([("oid", Value::Str("a".into()))]).unwrap();
    a.set("peer", b.clone()).unwrap();

    let a_packed = a.pack_to_dict(&PackOptions::new()).unwrap();
    assert_eq!(a_packed, json!({"oid": "a", "peer": "b"}));
    let b_packed = b.pack_to_dict(&PackOptions::new()).unwrap();

    // one context spans both unpacks; resolution runs once at the end
    let a2 = Record::new(&node_proto);
    let b2 = Record::new(&peer_proto);
    let mut ctx = DecodeContext::new(DecodeMode::Override, None, false);
    a2.unpack_dict_with(&a_packed, &mut ctx).unwrap();
    b2.unpack_dict_with(&b_packed, &mut ctx).unwrap();
    let unsolved = ctx.resolve();
    assert!(unsolved.is_empty());

    let peer = a2.get("peer").unwrap();
    assert!(peer.as_record().unwrap().ptr_eq(&b2));
}

#[test]
fn test_ref_round_trip_binary() {
    let s = build_scene();
    let bytes = s.pack_to_binary(&PackOptions::new()).unwrap();

    let d = Record::new(&scene());
    let unsolved = d.unpack_from_binary(&bytes, UnpackOptions::new()).unwrap();
    assert!(unsolved.is_empty());

    let refs = d.get("refs").unwrap();
    let refs = refs.as_map().unwrap().clone();
    let ref2 = refs.get(&MapKey::from("2")).unwrap();
    let target = ref2.as_record().unwrap();
    assert_eq!(target.get("oid").unwrap(), Value::Str("b".into()));
    assert_eq!(target.get("x").unwrap(), Value::I32(3));
}

#[test]
fn test_ref_container_changes_do_not_descend() {
    let s = build_scene();
    // mutating a referenced object does not make the ref map report change
    let coords = s.get("coords").unwrap();
    let coords = coords.as_map().unwrap().clone();
    let a = coords.get(&MapKey::from("a")).unwrap();
    a.as_record().unwrap().set("x", 42i32).unwrap();

    assert!(!s.has_field_changed("refs", true).unwrap());
    assert!(s.has_field_changed("coords", true).unwrap());
}
