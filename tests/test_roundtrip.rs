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

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{NaiveDate, NaiveDateTime};
use heirloom::{
    persist_enum, persist_object, Bytes, Heirloom, MultiArray, OpaqueId, Settings, WalkMethod,
};

#[derive(Debug, PartialEq)]
struct Person {
    name: String,
    age: i32,
    nicknames: Vec<String>,
    scores: HashMap<String, i64>,
}

persist_object!(Person {
    name: String,
    age: i32,
    nicknames: Vec<String>,
    scores: HashMap<String, i64>,
});

#[derive(Debug, PartialEq)]
struct Company {
    title: String,
    founder: Person,
    staff: Vec<Person>,
    motto: Option<String>,
}

persist_object!(Company {
    title: String,
    founder: Person,
    staff: Vec<Person>,
    motto: Option<String>,
});

#[derive(Debug, PartialEq)]
enum Color {
    Red,
    Green,
    Blue,
}

persist_enum!(Color { Red, Green, Blue });

fn sample_person() -> Person {
    Person {
        name: "Ada".into(),
        age: 36,
        nicknames: vec!["the countess".into()],
        scores: HashMap::from([("analysis".into(), 100i64), ("engines".into(), 99)]),
    }
}

#[test]
fn primitive_roundtrips() {
    let h = Heirloom::default();
    assert_eq!(h.deserialize::<bool>(&h.serialize(&true).unwrap()).unwrap(), true);
    assert_eq!(h.deserialize::<i32>(&h.serialize(&-42i32).unwrap()).unwrap(), -42);
    assert_eq!(
        h.deserialize::<u64>(&h.serialize(&u64::MAX).unwrap()).unwrap(),
        u64::MAX
    );
    assert_eq!(
        h.deserialize::<f64>(&h.serialize(&2.5f64).unwrap()).unwrap(),
        2.5
    );
    assert_eq!(
        h.deserialize::<String>(&h.serialize(&String::from("héirloom")).unwrap())
            .unwrap(),
        "héirloom"
    );
    assert_eq!(
        h.deserialize::<Bytes>(&h.serialize(&Bytes(vec![0, 1, 255])).unwrap())
            .unwrap(),
        Bytes(vec![0, 1, 255])
    );
    let id = OpaqueId::from_words(0x0123_4567_89AB_CDEF, 42);
    assert_eq!(
        h.deserialize::<OpaqueId>(&h.serialize(&id).unwrap()).unwrap(),
        id
    );
}

#[test]
fn datetime_roundtrips() {
    let h = Heirloom::default();
    let date = NaiveDate::from_ymd_opt(1815, 12, 10).unwrap();
    assert_eq!(
        h.deserialize::<NaiveDate>(&h.serialize(&date).unwrap()).unwrap(),
        date
    );
    let stamp: NaiveDateTime = date.and_hms_micro_opt(13, 37, 11, 42).unwrap();
    assert_eq!(
        h.deserialize::<NaiveDateTime>(&h.serialize(&stamp).unwrap())
            .unwrap(),
        stamp
    );
}

#[test]
fn collection_roundtrips() {
    let h = Heirloom::default();
    let list = vec![vec![1i32, 2], vec![], vec![3]];
    assert_eq!(
        h.deserialize::<Vec<Vec<i32>>>(&h.serialize(&list).unwrap()).unwrap(),
        list
    );
    let set = HashSet::from([String::from("a"), String::from("b")]);
    assert_eq!(
        h.deserialize::<HashSet<String>>(&h.serialize(&set).unwrap()).unwrap(),
        set
    );
    let map = BTreeMap::from([(1i32, String::from("one")), (2, String::from("two"))]);
    assert_eq!(
        h.deserialize::<BTreeMap<i32, String>>(&h.serialize(&map).unwrap())
            .unwrap(),
        map
    );
}

#[test]
fn multi_dimensional_array_roundtrips() {
    let h = Heirloom::default();
    let grid = MultiArray::new(vec![2, 3], (0i32..6).collect()).unwrap();
    let back: MultiArray<i32> = h.deserialize(&h.serialize(&grid).unwrap()).unwrap();
    assert_eq!(back, grid);
    assert_eq!(back.get(&[1, 2]), Some(&5));
    assert_eq!(back.rank(), 2);
}

#[test]
fn nested_object_roundtrips() {
    let mut h = Heirloom::default();
    h.register::<Person>("Person").unwrap();
    h.register::<Company>("Company").unwrap();

    let company = Company {
        title: "Engines Ltd".into(),
        founder: sample_person(),
        staff: vec![sample_person()],
        motto: None,
    };
    let back: Company = h.deserialize(&h.serialize(&company).unwrap()).unwrap();
    assert_eq!(back, company);
}

#[test]
fn enum_roundtrips() {
    let mut h = Heirloom::default();
    h.register::<Color>("Color").unwrap();
    let back: Color = h.deserialize(&h.serialize(&Color::Green).unwrap()).unwrap();
    assert_eq!(back, Color::Green);
    let all: Vec<Color> = h
        .deserialize(&h.serialize(&vec![Color::Red, Color::Blue]).unwrap())
        .unwrap();
    assert_eq!(all, vec![Color::Red, Color::Blue]);
}

#[test]
fn option_roots_fold_into_the_null_token() {
    let mut h = Heirloom::default();
    h.register::<Person>("Person").unwrap();
    let none: Option<Person> = h.deserialize(&h.serialize(&None::<Person>).unwrap()).unwrap();
    assert_eq!(none, None);
    let some: Option<Person> = h
        .deserialize(&h.serialize(&Some(sample_person())).unwrap())
        .unwrap();
    assert_eq!(some, Some(sample_person()));
}

#[test]
fn bytes_are_deterministic_across_runs() {
    let build = || {
        let mut h = Heirloom::default();
        h.register::<Person>("Person").unwrap();
        h
    };
    // Hash-ordered containers included on purpose.
    let value = sample_person();
    let a = build().serialize(&value).unwrap();
    let b = build().serialize(&value).unwrap();
    assert_eq!(a, b);
}

#[test]
fn interpreted_and_generated_walks_write_identical_bytes() {
    let build = |method: WalkMethod| {
        let mut h = Heirloom::new(Settings::default().serialization_method(method));
        h.register::<Person>("Person").unwrap();
        h.register::<Company>("Company").unwrap();
        h
    };
    let company = Company {
        title: "Engines Ltd".into(),
        founder: sample_person(),
        staff: vec![sample_person(), sample_person()],
        motto: Some("difference".into()),
    };
    let generated = build(WalkMethod::Generated).serialize(&company).unwrap();
    let interpreted = build(WalkMethod::Reflection).serialize(&company).unwrap();
    assert_eq!(generated, interpreted);

    let back: Company = build(WalkMethod::Reflection).deserialize(&generated).unwrap();
    assert_eq!(back, company);
}

#[test]
fn collections_promoted_to_user_objects_still_round_trip() {
    // The knob adds structure stamps for collection types; bodies are
    // self-describing either way, so a plain reader copes too.
    let writer = Heirloom::new(Settings::default().treat_collections_as_user_objects(true));
    let value = vec![vec![1i64, 2], vec![3]];
    let bytes = writer.serialize(&value).unwrap();

    let promoted_reader =
        Heirloom::new(Settings::default().treat_collections_as_user_objects(true));
    assert_eq!(
        promoted_reader.deserialize::<Vec<Vec<i64>>>(&bytes).unwrap(),
        value
    );
    let plain_reader = Heirloom::default();
    assert_eq!(
        plain_reader.deserialize::<Vec<Vec<i64>>>(&bytes).unwrap(),
        value
    );
}

#[test]
fn type_stamp_appears_exactly_once_per_stream() {
    let mut h = Heirloom::default();
    h.register::<Person>("Person").unwrap();
    let bytes = h
        .serialize(&vec![sample_person(), sample_person(), sample_person()])
        .unwrap();
    assert_eq!(count_occurrences(&bytes, b"Person"), 1);
}

fn count_occurrences(haystack: &[u8], needle: &[u8]) -> usize {
    haystack
        .windows(needle.len())
        .filter(|window| *window == needle)
        .count()
}
