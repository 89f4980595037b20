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

//! Deep clone by round trip, and the per-object phase hooks.

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use heirloom::{persist_object, Heirloom, Settings};

#[derive(Debug, PartialEq)]
struct Inventory {
    name: String,
    stock: BTreeMap<String, i64>,
    tags: Vec<String>,
}

persist_object!(Inventory {
    name: String,
    stock: BTreeMap<String, i64>,
    tags: Vec<String>,
});

#[test]
fn deep_clone_consumes_every_produced_byte() {
    let mut h = Heirloom::default();
    h.register::<Inventory>("Inventory").unwrap();

    let value = Inventory {
        name: "warehouse".into(),
        stock: BTreeMap::from([("bolts".into(), 500i64), ("nuts".into(), 720)]),
        tags: vec!["hardware".into(), "bulk".into()],
    };
    let clone = h.deep_clone(&value).unwrap();
    assert_eq!(clone, value);
}

#[test]
fn deep_clone_preserves_aliasing() {
    #[derive(Debug)]
    struct Pair {
        left: Rc<String>,
        right: Rc<String>,
    }
    persist_object!(Pair {
        left: Rc<String>,
        right: Rc<String>,
    });

    let mut h = Heirloom::default();
    h.register::<Pair>("Pair").unwrap();

    let shared = Rc::new(String::from("one allocation"));
    let clone = h
        .deep_clone(&Pair {
            left: shared.clone(),
            right: shared,
        })
        .unwrap();
    assert!(Rc::ptr_eq(&clone.left, &clone.right));
}

#[test]
fn hooks_fire_once_per_unique_object() {
    let pre = Arc::new(AtomicUsize::new(0));
    let post = Arc::new(AtomicUsize::new(0));
    let materialized = Arc::new(AtomicUsize::new(0));

    let pre_probe = pre.clone();
    let post_probe = post.clone();
    let materialized_probe = materialized.clone();
    let mut h = Heirloom::new(Settings::default())
        .on_pre_serialize(move |_| {
            pre_probe.fetch_add(1, Ordering::Relaxed);
        })
        .on_post_serialize(move |_| {
            post_probe.fetch_add(1, Ordering::Relaxed);
        })
        .on_post_deserialize(move |_| {
            materialized_probe.fetch_add(1, Ordering::Relaxed);
        });
    h.register::<Shared>("Shared").unwrap();

    let target = Rc::new(String::from("once"));
    let value = Shared {
        first: target.clone(),
        second: target,
    };
    let bytes = h.serialize(&value).unwrap();
    // Two unique objects: the root record and the shared string. The
    // aliased second edge is a bare back reference.
    assert_eq!(pre.load(Ordering::Relaxed), 2);
    assert_eq!(post.load(Ordering::Relaxed), 2);

    let _back: Shared = h.deserialize(&bytes).unwrap();
    assert_eq!(materialized.load(Ordering::Relaxed), 2);
}

#[derive(Debug)]
struct Shared {
    first: Rc<String>,
    second: Rc<String>,
}

persist_object!(Shared {
    first: Rc<String>,
    second: Rc<String>,
});
