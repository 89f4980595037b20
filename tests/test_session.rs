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

//! Open-stream sessions: many consecutive operations over one stream
//! sharing identity and type tables.

use std::rc::Rc;

use heirloom::{persist_object, Heirloom, Settings};

#[test]
fn consecutive_strings_share_the_type_table() {
    let h = Heirloom::default();
    let mut writer = h.open_writer(Vec::new()).unwrap();
    writer.write_object(&String::from("One")).unwrap();
    writer.write_object(&String::from("Two")).unwrap();
    let final_position = writer.position();
    let bytes = writer.finish().unwrap();
    assert_eq!(bytes.len(), final_position);

    // The `String` stamp went out once; the second record reuses the
    // type id.
    assert_eq!(count_occurrences(&bytes, b"String"), 1);

    let mut reader = h.open_reader(&bytes[..]).unwrap();
    assert_eq!(reader.read_object::<String>().unwrap(), "One");
    assert_eq!(reader.read_object::<String>().unwrap(), "Two");
    assert_eq!(reader.position(), final_position);
    assert!(reader.peek_end());
}

#[test]
fn many_boxed_values_in_order_then_eof() {
    let h = Heirloom::default();
    let mut writer = h.open_writer(Vec::new()).unwrap();
    let n = 16usize;
    for i in 0..n {
        writer.write_object(&Box::new(i as i64 * 3)).unwrap();
    }
    let bytes = writer.finish().unwrap();

    let mut reader = h.open_reader(&bytes[..]).unwrap();
    let values: Vec<Box<i64>> = reader.read_many(n).unwrap();
    for (i, value) in values.iter().enumerate() {
        assert_eq!(**value, i as i64 * 3);
    }
    assert!(reader.peek_end());
}

#[test]
fn mixed_types_flow_through_one_stream() {
    let mut h = Heirloom::default();
    h.register::<Tag>("Tag").unwrap();

    let mut writer = h.open_writer(Vec::new()).unwrap();
    writer.write_object(&17i32).unwrap();
    writer
        .write_object(&Tag {
            label: "mixed".into(),
        })
        .unwrap();
    writer.write_object(&vec![1u8, 2, 3]).unwrap();
    let bytes = writer.finish().unwrap();

    let mut reader = h.open_reader(&bytes[..]).unwrap();
    assert_eq!(reader.read_object::<i32>().unwrap(), 17);
    assert_eq!(reader.read_object::<Tag>().unwrap().label, "mixed");
    assert_eq!(reader.read_object::<Vec<u8>>().unwrap(), vec![1, 2, 3]);
    assert!(reader.peek_end());
}

#[derive(Debug, PartialEq)]
struct Tag {
    label: String,
}

persist_object!(Tag { label: String });

#[test]
fn identity_survives_across_operations() {
    let mut h = Heirloom::default();
    h.register::<Tag>("Tag").unwrap();

    let shared = Rc::new(Tag {
        label: "same".into(),
    });
    let mut writer = h.open_writer(Vec::new()).unwrap();
    writer.write_object(&shared).unwrap();
    writer.write_object(&shared).unwrap();
    let bytes = writer.finish().unwrap();

    let mut reader = h.open_reader(&bytes[..]).unwrap();
    let first: Rc<Tag> = reader.read_object().unwrap();
    let second: Rc<Tag> = reader.read_object().unwrap();
    assert!(Rc::ptr_eq(&first, &second));
}

#[test]
fn buffered_operations_start_on_block_boundaries() {
    let settings = Settings::default().use_buffering(true).block_size(64);
    let h = Heirloom::new(settings.clone());
    let mut writer = h.open_writer(Vec::new()).unwrap();
    writer.write_object(&String::from("padded")).unwrap();
    assert_eq!(writer.position() % 64, 0);
    writer.write_object(&String::from("aligned")).unwrap();
    assert_eq!(writer.position() % 64, 0);
    let bytes = writer.finish().unwrap();
    assert_eq!(bytes.len() % 64, 0);

    let reader_side = Heirloom::new(settings);
    let mut reader = reader_side.open_reader(&bytes[..]).unwrap();
    assert_eq!(reader.read_object::<String>().unwrap(), "padded");
    assert_eq!(reader.position() % 64, 0);
    assert_eq!(reader.read_object::<String>().unwrap(), "aligned");
    assert!(reader.peek_end());
}

fn count_occurrences(haystack: &[u8], needle: &[u8]) -> usize {
    haystack
        .windows(needle.len())
        .filter(|window| *window == needle)
        .count()
}
