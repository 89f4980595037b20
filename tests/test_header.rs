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

use heirloom::{Error, Heirloom, Preservation, Settings};

#[test]
fn header_is_magic_version_and_preserve_flag() {
    let h = Heirloom::default();
    let bytes = h.serialize(&42i32).unwrap();
    assert_eq!(&bytes[..5], &[0x32, 0x66, 0x34, 0x07, 0x01]);

    let h = Heirloom::new(Settings::default().preservation(Preservation::DoNotPreserve));
    let bytes = h.serialize(&42i32).unwrap();
    assert_eq!(&bytes[..5], &[0x32, 0x66, 0x34, 0x07, 0x00]);
}

#[test]
fn wrong_magic_is_rejected() {
    let h = Heirloom::default();
    let mut bytes = h.serialize(&1i32).unwrap();
    bytes[0] = 0x99;
    let err = h.deserialize::<i32>(&bytes).unwrap_err();
    assert!(matches!(err, Error::WrongMagic(0x99, 0x66, 0x34)));
}

#[test]
fn wrong_version_is_rejected() {
    let h = Heirloom::default();
    let mut bytes = h.serialize(&1i32).unwrap();
    bytes[3] = 6;
    let err = h.deserialize::<i32>(&bytes).unwrap_err();
    assert!(matches!(
        err,
        Error::WrongVersion {
            expected: 7,
            found: 6
        }
    ));
}

#[test]
fn invalid_preserve_flag_is_corrupt() {
    let h = Heirloom::default();
    let mut bytes = h.serialize(&1i32).unwrap();
    bytes[4] = 7;
    let err = h.deserialize::<i32>(&bytes).unwrap_err();
    assert!(matches!(err, Error::StreamCorrupted(_)));
}

#[test]
fn truncated_stream_is_corrupt() {
    let h = Heirloom::default();
    let bytes = h.serialize(&String::from("truncate me")).unwrap();
    let err = h.deserialize::<String>(&bytes[..bytes.len() - 4]).unwrap_err();
    assert!(matches!(err, Error::StreamCorrupted(_)));
}
