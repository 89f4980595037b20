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

//! Surrogate substitution in both directions.

use std::rc::Rc;

use heirloom::{persist_object, Error, Heirloom};

// A handle that cannot travel as-is.
#[derive(Debug, PartialEq)]
struct Session {
    token: u64,
    user: String,
}

persist_object!(Session {
    token: u64,
    user: String,
});

// What actually goes on the wire.
#[derive(Debug, PartialEq)]
struct SessionTicket {
    user: String,
}

persist_object!(SessionTicket { user: String });

fn swapping_instance() -> Heirloom {
    let mut h = Heirloom::default();
    h.register::<SessionTicket>("SessionTicket").unwrap();
    h.surrogate_for::<Session, SessionTicket>(|s| SessionTicket {
        user: s.user.clone(),
    })
    .unwrap();
    h.object_for::<SessionTicket, Session>(|t| Session {
        token: 0,
        user: t.user,
    })
    .unwrap();
    h
}

#[test]
fn surrogate_round_trip_restores_the_original_type() {
    let h = swapping_instance();
    let original = Session {
        token: 0xDEAD,
        user: "ada".into(),
    };
    let bytes = h.serialize(&original).unwrap();
    // The stream names the surrogate type, never the original.
    assert_eq!(count_occurrences(&bytes, b"SessionTicket"), 1);
    assert_eq!(count_occurrences(&bytes, b"Session"), 1);

    let back: Session = h.deserialize(&bytes).unwrap();
    assert_eq!(back.user, "ada");
    // The write-side conversion dropped the token; the inverse
    // rebuilt the instance from the ticket alone.
    assert_eq!(back.token, 0);
}

#[test]
fn surrogates_apply_to_shared_edges() {
    let h = swapping_instance();
    let original = Rc::new(Session {
        token: 1,
        user: "grace".into(),
    });
    let back: Rc<Session> = h.deserialize(&h.serialize(&original).unwrap()).unwrap();
    assert_eq!(back.user, "grace");
    assert_eq!(back.token, 0);
}

#[test]
fn reregistration_before_use_replaces_the_callable() {
    let mut h = Heirloom::default();
    h.register::<SessionTicket>("SessionTicket").unwrap();
    h.surrogate_for::<Session, SessionTicket>(|_| SessionTicket {
        user: "first".into(),
    })
    .unwrap();
    h.surrogate_for::<Session, SessionTicket>(|_| SessionTicket {
        user: "second".into(),
    })
    .unwrap();
    h.object_for::<SessionTicket, Session>(|t| Session {
        token: 0,
        user: t.user,
    })
    .unwrap();

    let back: Session = h
        .deserialize(
            &h.serialize(&Session {
                token: 9,
                user: "ignored".into(),
            })
            .unwrap(),
        )
        .unwrap();
    assert_eq!(back.user, "second");
}

#[derive(Debug, PartialEq)]
struct Animal {
    legs: i32,
}

persist_object!(Animal { legs: i32 });

#[derive(Debug, PartialEq)]
struct Dog {
    name: String,
}

persist_object!(Dog extends Animal { name: String });

#[derive(Debug, PartialEq)]
struct AnimalTicket {
    legs: i32,
}

persist_object!(AnimalTicket { legs: i32 });

#[derive(Debug, PartialEq)]
struct DogTicket {
    name: String,
}

persist_object!(DogTicket { name: String });

#[test]
fn most_derived_surrogate_wins_through_the_chain() {
    let mut h = Heirloom::default();
    h.register::<Animal>("Animal").unwrap();
    h.register::<Dog>("Dog").unwrap();
    h.register::<AnimalTicket>("AnimalTicket").unwrap();
    h.register::<DogTicket>("DogTicket").unwrap();
    h.surrogate_for::<Animal, AnimalTicket>(|a| AnimalTicket { legs: a.legs })
        .unwrap();
    h.surrogate_for::<Dog, DogTicket>(|d| DogTicket {
        name: d.name.clone(),
    })
    .unwrap();
    h.object_for::<AnimalTicket, Animal>(|t| Animal { legs: t.legs })
        .unwrap();
    h.object_for::<DogTicket, Dog>(|t| Dog { name: t.name }).unwrap();

    // The dog's own registration shadows the one inherited from its
    // base along the assignability chain.
    let bytes = h.serialize(&Dog { name: "rex".into() }).unwrap();
    assert_eq!(count_occurrences(&bytes, b"DogTicket"), 1);
    assert_eq!(count_occurrences(&bytes, b"AnimalTicket"), 0);
    let back: Dog = h.deserialize(&bytes).unwrap();
    assert_eq!(back, Dog { name: "rex".into() });

    let bytes = h.serialize(&Animal { legs: 4 }).unwrap();
    assert_eq!(count_occurrences(&bytes, b"AnimalTicket"), 1);
    let back: Animal = h.deserialize(&bytes).unwrap();
    assert_eq!(back, Animal { legs: 4 });
}

#[test]
fn swap_tables_freeze_at_first_use() {
    let mut h = swapping_instance();
    let _ = h
        .serialize(&Session {
            token: 1,
            user: "x".into(),
        })
        .unwrap();
    let err = h
        .surrogate_for::<Session, SessionTicket>(|s| SessionTicket {
            user: s.user.clone(),
        })
        .unwrap_err();
    assert!(matches!(err, Error::IllegalStateAfterUse(_)));
}

#[test]
fn registrations_freeze_at_first_use() {
    let mut h = Heirloom::default();
    h.register::<SessionTicket>("SessionTicket").unwrap();
    let _ = h
        .serialize(&SessionTicket { user: "x".into() })
        .unwrap();
    let err = h.register::<Session>("Session").unwrap_err();
    assert!(matches!(err, Error::IllegalStateAfterUse(_)));
}

#[test]
fn unregistered_surrogate_target_is_reported() {
    let mut h = Heirloom::default();
    // SessionTicket intentionally not registered.
    h.surrogate_for::<Session, SessionTicket>(|s| SessionTicket {
        user: s.user.clone(),
    })
    .unwrap();
    let err = h
        .serialize(&Session {
            token: 1,
            user: "x".into(),
        })
        .unwrap_err();
    assert!(matches!(err, Error::TypeError(_)));
}

fn count_occurrences(haystack: &[u8], needle: &[u8]) -> usize {
    haystack
        .windows(needle.len())
        .filter(|window| *window == needle)
        .count()
}
