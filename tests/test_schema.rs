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

//! Version tolerance: the persisted structure of a type against the
//! structure known to the reading program.

use std::collections::HashMap;
use std::rc::Rc;

use heirloom::error::Drift;
use heirloom::{persist_object, Error, Heirloom, Settings, Tolerance};

// The writer's view of `Point`.
#[derive(Debug, PartialEq)]
struct PointV1 {
    x: i32,
}

persist_object!(PointV1 { x: i32 });

// A reader that gained a field.
#[derive(Debug, PartialEq)]
struct PointV2 {
    x: i32,
    y: i32,
}

persist_object!(PointV2 { x: i32, y: i32 });

// A reader that also renamed nothing but dropped `y` again.
#[derive(Debug, PartialEq)]
struct WidePointV1 {
    x: i32,
    y: i32,
}

persist_object!(WidePointV1 { x: i32, y: i32 });

#[derive(Debug, PartialEq)]
struct PointStringY {
    x: i32,
    y: String,
}

persist_object!(PointStringY { x: i32, y: String });

fn writer_v1() -> (Heirloom, Vec<u8>) {
    let mut h = Heirloom::default();
    h.register::<PointV1>("Point").unwrap();
    let bytes = h.serialize(&PointV1 { x: 1 }).unwrap();
    (h, bytes)
}

#[test]
fn added_field_defaults_under_the_flag() {
    let (_, bytes) = writer_v1();

    let mut reader = Heirloom::new(Settings::default().tolerance(Tolerance::FIELD_ADDITION));
    reader.register::<PointV2>("Point").unwrap();
    let back: PointV2 = reader.deserialize(&bytes).unwrap();
    assert_eq!(back, PointV2 { x: 1, y: 0 });
}

#[test]
fn added_field_without_the_flag_names_the_field() {
    let (_, bytes) = writer_v1();

    let mut reader = Heirloom::default();
    reader.register::<PointV2>("Point").unwrap();
    let err = reader.deserialize::<PointV2>(&bytes).unwrap_err();
    match err {
        Error::TypeStructureChanged { field, drift, .. } => {
            assert_eq!(field, "y");
            assert_eq!(drift, Drift::FieldAdded);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn removed_field_bytes_are_consumed_and_discarded() {
    let mut writer = Heirloom::default();
    writer.register::<WidePointV1>("Point").unwrap();
    let bytes = writer.serialize(&WidePointV1 { x: 1, y: 2 }).unwrap();

    let mut reader = Heirloom::new(Settings::default().tolerance(Tolerance::FIELD_REMOVAL));
    reader.register::<PointV1>("Point").unwrap();
    let mut session = reader.open_reader(&bytes[..]).unwrap();
    let back: PointV1 = session.read_object().unwrap();
    assert_eq!(back, PointV1 { x: 1 });
    // The skipped field's bytes were consumed, not left behind.
    assert_eq!(session.position(), bytes.len());
    assert!(session.peek_end());
}

#[test]
fn removed_field_without_the_flag_names_the_field() {
    let mut writer = Heirloom::default();
    writer.register::<WidePointV1>("Point").unwrap();
    let bytes = writer.serialize(&WidePointV1 { x: 1, y: 2 }).unwrap();

    let mut reader = Heirloom::default();
    reader.register::<PointV1>("Point").unwrap();
    let err = reader.deserialize::<PointV1>(&bytes).unwrap_err();
    match err {
        Error::TypeStructureChanged { field, drift, .. } => {
            assert_eq!(field, "y");
            assert_eq!(drift, Drift::FieldRemoved);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn changed_field_type_is_fatal_under_every_flag() {
    let mut writer = Heirloom::default();
    writer.register::<WidePointV1>("Point").unwrap();
    let bytes = writer.serialize(&WidePointV1 { x: 1, y: 2 }).unwrap();

    let mut reader = Heirloom::new(Settings::default().tolerance(Tolerance::all()));
    reader.register::<PointStringY>("Point").unwrap();
    let err = reader.deserialize::<PointStringY>(&bytes).unwrap_err();
    match err {
        Error::TypeStructureChanged { field, drift, .. } => {
            assert_eq!(field, "y");
            assert_eq!(drift, Drift::FieldTypeChanged);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn identical_registrations_reconcile_without_any_flags() {
    // Two separate instances with the same registrations derive the
    // same module id, so no tolerance is needed.
    let (_, bytes) = writer_v1();
    let mut reader = Heirloom::default();
    reader.register::<PointV1>("Point").unwrap();
    let back: PointV1 = reader.deserialize(&bytes).unwrap();
    assert_eq!(back, PointV1 { x: 1 });
}

#[derive(Debug, PartialEq)]
struct Catalog {
    items: Vec<String>,
    cache: Vec<u8>,
    count: i32,
}

impl Catalog {
    fn recount(&mut self) {
        self.count = self.items.len() as i32;
    }
}

persist_object!(Catalog {
    items: Vec<String>,
    @transient cache: Vec<u8>,
    @reinit count: i32,
} reinit = recount);

#[test]
fn transient_fields_skip_the_wire_and_reinit_runs() {
    let mut h = Heirloom::default();
    h.register::<Catalog>("Catalog").unwrap();

    let catalog = Catalog {
        items: vec!["a".into(), "b".into(), "c".into()],
        cache: vec![1, 2, 3],
        count: -1,
    };
    let back: Catalog = h.deserialize(&h.serialize(&catalog).unwrap()).unwrap();
    assert_eq!(back.items, catalog.items);
    // Transient bytes never traveled.
    assert!(back.cache.is_empty());
    // The constructor-recreated field came from the reinit hook, not
    // from the stream.
    assert_eq!(back.count, 3);
}

#[test]
fn nested_field_structures_evolve_independently() {
    #[derive(Debug, PartialEq)]
    struct HolderV1 {
        label: String,
        point: PointV1,
    }
    persist_object!(HolderV1 {
        label: String,
        point: PointV1,
    });

    #[derive(Debug, PartialEq)]
    struct HolderV2 {
        label: String,
        point: PointV2,
    }
    persist_object!(HolderV2 {
        label: String,
        point: PointV2,
    });

    let mut writer = Heirloom::default();
    writer.register::<HolderV1>("Holder").unwrap();
    writer.register::<PointV1>("Point").unwrap();
    let bytes = writer
        .serialize(&HolderV1 {
            label: "origin-ish".into(),
            point: PointV1 { x: 9 },
        })
        .unwrap();

    let mut reader = Heirloom::new(Settings::default().tolerance(Tolerance::FIELD_ADDITION));
    reader.register::<HolderV2>("Holder").unwrap();
    reader.register::<PointV2>("Point").unwrap();
    let back: HolderV2 = reader.deserialize(&bytes).unwrap();
    assert_eq!(back.label, "origin-ish");
    assert_eq!(back.point, PointV2 { x: 9, y: 0 });
}

#[test]
fn schema_drift_applies_inside_collections() {
    let mut writer = Heirloom::default();
    writer.register::<PointV1>("Point").unwrap();
    let bytes = writer
        .serialize(&vec![PointV1 { x: 1 }, PointV1 { x: 2 }])
        .unwrap();

    let mut reader = Heirloom::new(Settings::default().tolerance(Tolerance::FIELD_ADDITION));
    reader.register::<PointV2>("Point").unwrap();
    let back: Vec<PointV2> = reader.deserialize(&bytes).unwrap();
    assert_eq!(back, vec![PointV2 { x: 1, y: 0 }, PointV2 { x: 2, y: 0 }]);
}

#[derive(Debug, PartialEq)]
struct AnimalV1 {
    legs: i32,
}

persist_object!(AnimalV1 { legs: i32 });

#[derive(Debug, PartialEq)]
struct DogV1 {
    name: String,
}

persist_object!(DogV1 extends AnimalV1 { name: String });

#[derive(Debug, PartialEq)]
struct DogV2 {
    name: String,
}

persist_object!(DogV2 { name: String });

fn dog_bytes() -> Vec<u8> {
    let mut writer = Heirloom::default();
    writer.register::<AnimalV1>("Animal").unwrap();
    writer.register::<DogV1>("Dog").unwrap();
    writer.serialize(&DogV1 { name: "rex".into() }).unwrap()
}

#[test]
fn changed_base_identity_is_gated() {
    let bytes = dog_bytes();

    // The reading program dropped the base; the fields still line up.
    let mut reader = Heirloom::new(Settings::default().tolerance(Tolerance::FIELD_ADDITION));
    reader.register::<DogV2>("Dog").unwrap();
    let err = reader.deserialize::<DogV2>(&bytes).unwrap_err();
    match err {
        Error::TypeStructureChanged { drift, .. } => assert_eq!(drift, Drift::BaseChanged),
        other => panic!("unexpected error {other:?}"),
    }

    let mut reader =
        Heirloom::new(Settings::default().tolerance(Tolerance::INHERITANCE_CHAIN_CHANGE));
    reader.register::<DogV2>("Dog").unwrap();
    let back: DogV2 = reader.deserialize(&bytes).unwrap();
    assert_eq!(back.name, "rex");
}

#[test]
fn matching_base_identities_reconcile_verbatim() {
    let bytes = dog_bytes();

    let mut reader = Heirloom::default();
    reader.register::<AnimalV1>("Animal").unwrap();
    reader.register::<DogV1>("Dog").unwrap();
    let back: DogV1 = reader.deserialize(&bytes).unwrap();
    assert_eq!(back, DogV1 { name: "rex".into() });
}

#[derive(Debug)]
struct KeeperV1 {
    dropped: Rc<String>,
    kept: Rc<String>,
}

persist_object!(KeeperV1 {
    dropped: Rc<String>,
    kept: Rc<String>,
});

#[derive(Debug)]
struct KeeperV2 {
    kept: Rc<String>,
}

persist_object!(KeeperV2 { kept: Rc<String> });

fn keeper_bytes() -> Vec<u8> {
    let mut writer = Heirloom::default();
    writer.register::<KeeperV1>("Keeper").unwrap();
    let shared = Rc::new(String::from("first seen while skipped"));
    writer
        .serialize(&KeeperV1 {
            dropped: shared.clone(),
            kept: shared,
        })
        .unwrap()
}

#[test]
fn skipped_records_stay_addressable_when_their_type_resolves() {
    let bytes = keeper_bytes();

    // The shared string's record sits inside the skipped field; the
    // later live edge is a bare back reference into it.
    let mut reader = Heirloom::new(Settings::default().tolerance(Tolerance::FIELD_REMOVAL));
    reader.register::<KeeperV2>("Keeper").unwrap();
    reader.register_value::<String>().unwrap();
    let back: KeeperV2 = reader.deserialize(&bytes).unwrap();
    assert_eq!(*back.kept, "first seen while skipped");
}

#[test]
fn back_reference_into_an_unresolvable_skipped_record_fails() {
    let bytes = keeper_bytes();

    let mut reader = Heirloom::new(Settings::default().tolerance(Tolerance::FIELD_REMOVAL));
    reader.register::<KeeperV2>("Keeper").unwrap();
    // String is not registered for dynamic materialization, so the
    // skipped record's slot is opaque.
    let err = reader.deserialize::<KeeperV2>(&bytes).unwrap_err();
    assert!(matches!(err, Error::InvalidRef(_)));
}

#[test]
fn registered_maps_survive_schema_consistent_roundtrips() {
    let mut h = Heirloom::default();
    h.register::<PointV1>("Point").unwrap();
    let value = HashMap::from([(String::from("a"), PointV1 { x: 4 })]);
    let back: HashMap<String, PointV1> = h.deserialize(&h.serialize(&value).unwrap()).unwrap();
    assert_eq!(back, value);
}
