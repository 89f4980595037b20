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

use crate::error::Error;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Leading magic bytes of every stream.
pub const MAGIC: [u8; 3] = [0x32, 0x66, 0x34];

/// Protocol version written after the magic.
pub const STREAM_VERSION: u8 = 7;

/// Reference-token value reserved for null. Real object ids are
/// emitted as `id + 1`.
pub const NULL_TOKEN: u32 = 0;

/// Length of the stream header in bytes: magic, version, preserve
/// flag.
pub const HEADER_LEN: usize = 5;

/// Wire kind of a type. The kind decides how a body is encoded and
/// whether the type stamp carries a structure stamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Kind {
    Bool = 1,
    Int8 = 2,
    UInt8 = 3,
    Int16 = 4,
    UInt16 = 5,
    Int32 = 6,
    UInt32 = 7,
    Int64 = 8,
    UInt64 = 9,
    Float32 = 10,
    Float64 = 11,
    Str = 12,
    Bytes = 13,
    OpaqueId = 14,
    Date = 15,
    Timestamp = 16,
    List = 17,
    Set = 18,
    Map = 19,
    MultiArray = 20,
    /// A shared-reference slot: the body is a reference token, not an
    /// inline value. The single generic argument is the pointee.
    Ref = 21,
    /// A nullable inline slot: one presence byte, then the inner
    /// body. The single generic argument is the inner type.
    Nullable = 22,
    Object = 23,
    Enum = 24,
}

impl Kind {
    /// Reads a kind byte, mapping unknown tags to `StreamCorrupted`.
    pub fn from_wire(tag: u8) -> Result<Kind, Error> {
        Kind::try_from(tag)
            .map_err(|_| Error::stream_corrupted(format!("unknown type-kind tag byte {tag}")))
    }

    /// Whether a type stamp of this kind carries a structure stamp.
    /// Collections join in only when they are treated as user
    /// objects.
    pub fn needs_structure(self, collections_as_user_objects: bool) -> bool {
        match self {
            Kind::Object => true,
            Kind::List | Kind::Set | Kind::Map | Kind::MultiArray => collections_as_user_objects,
            _ => false,
        }
    }

    /// Whether this kind describes a built-in collection.
    pub fn is_collection(self) -> bool {
        matches!(self, Kind::List | Kind::Set | Kind::Map | Kind::MultiArray)
    }
}

/// A 16-byte opaque identifier, serialized raw. Also used as the
/// module id of an assembly descriptor.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OpaqueId(pub [u8; 16]);

impl OpaqueId {
    pub const ZERO: OpaqueId = OpaqueId([0; 16]);

    pub fn from_words(hi: u64, lo: u64) -> OpaqueId {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&hi.to_le_bytes());
        bytes[8..].copy_from_slice(&lo.to_le_bytes());
        OpaqueId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl std::fmt::Debug for OpaqueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OpaqueId({self})")
    }
}

impl std::fmt::Display for OpaqueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_wire_tag() {
        for kind in [Kind::Bool, Kind::Str, Kind::Map, Kind::Enum] {
            let tag: u8 = kind.into();
            assert_eq!(Kind::from_wire(tag).unwrap(), kind);
        }
        assert!(Kind::from_wire(0).is_err());
        assert!(Kind::from_wire(200).is_err());
    }

    #[test]
    fn opaque_id_formats_as_hex() {
        let id = OpaqueId::from_words(1, 0);
        assert_eq!(format!("{id}"), "01000000000000000000000000000000");
    }
}
