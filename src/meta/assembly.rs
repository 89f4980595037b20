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

//! Assembly descriptors: the identity of a registration unit.

use std::fmt::Write as _;
use std::sync::{Arc, OnceLock};

use crate::types::{OpaqueId, STREAM_VERSION};

/// A four-part assembly version.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Version4 {
    pub major: i32,
    pub minor: i32,
    pub build: i32,
    pub revision: i32,
}

impl Version4 {
    pub fn new(major: i32, minor: i32, build: i32, revision: i32) -> Version4 {
        Version4 {
            major,
            minor,
            build,
            revision,
        }
    }
}

impl std::fmt::Display for Version4 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

/// Identity of a compilation/registration unit: name, four-part
/// version, culture tag, public-key-token bytes (0 or 8) and a
/// 128-bit module id.
///
/// The wire carries the culture exactly as registered; the canonical
/// full-name form substitutes `neutral` for the empty string, and
/// comparisons go through the full name. This is part of the wire
/// contract.
///
/// The module id is either supplied by the caller or derived at
/// registry-freeze time from the structural fingerprint of every type
/// registered under the assembly, so that identical registrations
/// produce identical ids and any structural change produces a new
/// one.
pub struct AssemblyDescriptor {
    name: String,
    version: Version4,
    culture: String,
    token: Vec<u8>,
    module_id: OnceLock<OpaqueId>,
}

impl AssemblyDescriptor {
    pub fn new(name: impl Into<String>, version: Version4) -> AssemblyDescriptor {
        AssemblyDescriptor {
            name: name.into(),
            version,
            culture: String::new(),
            token: Vec::new(),
            module_id: OnceLock::new(),
        }
    }

    pub fn culture(mut self, culture: impl Into<String>) -> Self {
        self.culture = culture.into();
        self
    }

    /// Public-key token. Only empty or 8-byte tokens are
    /// representable on the wire; anything else is truncated at
    /// stamp time.
    pub fn token(mut self, token: [u8; 8]) -> Self {
        self.token = token.to_vec();
        self
    }

    pub fn module_id(self, id: OpaqueId) -> Self {
        let _ = self.module_id.set(id);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Version4 {
        self.version
    }

    pub fn culture_name(&self) -> &str {
        &self.culture
    }

    pub fn token_bytes(&self) -> &[u8] {
        &self.token
    }

    /// The module id, or [`OpaqueId::ZERO`] while the owning registry
    /// has not been frozen yet. Sessions freeze the registry before
    /// the first stamp is written, so zero never reaches the wire.
    pub fn resolved_module_id(&self) -> OpaqueId {
        self.module_id.get().copied().unwrap_or(OpaqueId::ZERO)
    }

    pub fn has_module_id(&self) -> bool {
        self.module_id.get().is_some()
    }

    /// Sets the module id if none was supplied at construction.
    pub fn seal_module_id(&self, id: OpaqueId) {
        let _ = self.module_id.set(id);
    }

    /// Canonical identity string; excludes the module id.
    pub fn full_name(&self) -> String {
        let culture = if self.culture.is_empty() {
            "neutral"
        } else {
            &self.culture
        };
        let mut s = String::new();
        let _ = write!(s, "{}, Version={}, Culture={}", self.name, self.version, culture);
        if self.token.is_empty() {
            s.push_str(", Token=null");
        } else {
            s.push_str(", Token=");
            for b in &self.token {
                let _ = write!(s, "{b:02x}");
            }
        }
        s
    }

    /// Rebuilds a descriptor from stamped wire fields.
    pub fn from_stamp(
        name: String,
        version: Version4,
        culture: String,
        token: Vec<u8>,
        module_id: OpaqueId,
    ) -> AssemblyDescriptor {
        let descriptor = AssemblyDescriptor {
            name,
            version,
            culture,
            token,
            module_id: OnceLock::new(),
        };
        let _ = descriptor.module_id.set(module_id);
        descriptor
    }
}

impl PartialEq for AssemblyDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.full_name() == other.full_name()
    }
}

impl Eq for AssemblyDescriptor {}

impl std::fmt::Debug for AssemblyDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AssemblyDescriptor({})", self.full_name())
    }
}

/// The reserved assembly owning every built-in kind. Its module id is
/// fixed: built-in layouts only change with the protocol version.
pub fn builtin_assembly() -> Arc<AssemblyDescriptor> {
    static BUILTIN: OnceLock<Arc<AssemblyDescriptor>> = OnceLock::new();
    BUILTIN
        .get_or_init(|| {
            let mut id = [0u8; 16];
            id[0] = STREAM_VERSION;
            Arc::new(
                AssemblyDescriptor::new(
                    "heirloom",
                    Version4::new(STREAM_VERSION as i32, 0, 0, 0),
                )
                .module_id(OpaqueId(id)),
            )
        })
        .clone()
}
