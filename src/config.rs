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

//! Settings that control serialization and deserialization behavior.
//! Shared between the [`crate::Heirloom`] instance and its write/read
//! contexts so both sides of a stream act consistently.

/// How object identity is retained between operations on a stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Preservation {
    /// No identity tracking: shared edges are written by value each
    /// time they are reached. Cyclic graphs are rejected with a depth
    /// error.
    DoNotPreserve,
    /// Identity tables survive across open-stream operations but hold
    /// the written objects weakly; collected entries are re-stamped
    /// under fresh ids.
    UseWeakReference,
    /// Identity tables survive across operations and hold strong
    /// references.
    Preserve,
}

/// Choice between the interpreted field walk and the monomorphized
/// one. Both produce identical bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkMethod {
    /// Drive the per-field accessor table registered for the type.
    Reflection,
    /// Call the per-type walker generated by `persist_object!`.
    Generated,
}

/// Schema-drift permissions consulted by the stamp comparator.
///
/// Flags combine with `|`:
///
/// ```rust
/// use heirloom::Tolerance;
///
/// let policy = Tolerance::FIELD_ADDITION | Tolerance::FIELD_REMOVAL;
/// assert!(policy.allows(Tolerance::FIELD_ADDITION));
/// assert!(!policy.allows(Tolerance::GUID_CHANGE));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tolerance(u32);

impl Tolerance {
    /// Accept a persisted type whose assembly module id differs from
    /// the runtime one. Without this flag any structural comparison
    /// is refused outright.
    pub const GUID_CHANGE: Tolerance = Tolerance(1);
    /// Accept a drifted assembly version.
    pub const ASSEMBLY_VERSION_CHANGE: Tolerance = Tolerance(1 << 1);
    /// Accept runtime fields missing from the stream; they are
    /// default-initialized.
    pub const FIELD_ADDITION: Tolerance = Tolerance(1 << 2);
    /// Accept stream fields missing at runtime; their bytes are
    /// decoded and discarded.
    pub const FIELD_REMOVAL: Tolerance = Tolerance(1 << 3);
    /// Accept a changed base-type identity.
    pub const INHERITANCE_CHAIN_CHANGE: Tolerance = Tolerance(1 << 4);

    /// No drift accepted.
    pub const NONE: Tolerance = Tolerance(0);

    /// Everything except field type changes, which are never
    /// tolerated.
    pub fn all() -> Tolerance {
        Tolerance::GUID_CHANGE
            | Tolerance::ASSEMBLY_VERSION_CHANGE
            | Tolerance::FIELD_ADDITION
            | Tolerance::FIELD_REMOVAL
            | Tolerance::INHERITANCE_CHAIN_CHANGE
    }

    pub fn allows(self, flag: Tolerance) -> bool {
        self.0 & flag.0 == flag.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for Tolerance {
    type Output = Tolerance;

    fn bitor(self, rhs: Tolerance) -> Tolerance {
        Tolerance(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Tolerance {
    fn bitor_assign(&mut self, rhs: Tolerance) {
        self.0 |= rhs.0;
    }
}

/// Configuration consumed by sessions. Built by chaining, the same
/// way the entry type itself is configured:
///
/// ```rust
/// use heirloom::{Preservation, Settings, Tolerance};
///
/// let settings = Settings::default()
///     .preservation(Preservation::Preserve)
///     .tolerance(Tolerance::FIELD_ADDITION)
///     .use_buffering(true);
/// ```
#[derive(Clone, Debug)]
pub struct Settings {
    /// Identity retention policy. `Preserve` by default.
    pub preservation: Preservation,
    /// Field walk used while writing.
    pub serialization_method: WalkMethod,
    /// Field walk used while reading.
    pub deserialization_method: WalkMethod,
    /// Emit structure stamps for built-in collections so they take
    /// part in schema comparison like user objects do.
    pub treat_collections_as_user_objects: bool,
    /// Pad every open-stream operation to a block boundary.
    pub use_buffering: bool,
    /// Block size used when `use_buffering` is set.
    pub block_size: usize,
    /// Schema-drift permissions.
    pub tolerance: Tolerance,
    /// Recursion guard for by-value nesting.
    pub max_depth: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            preservation: Preservation::Preserve,
            serialization_method: WalkMethod::Generated,
            deserialization_method: WalkMethod::Generated,
            treat_collections_as_user_objects: false,
            use_buffering: false,
            block_size: 4096,
            tolerance: Tolerance::NONE,
            max_depth: 64,
        }
    }
}

impl Settings {
    pub fn new() -> Settings {
        Settings::default()
    }

    pub fn preservation(mut self, preservation: Preservation) -> Self {
        self.preservation = preservation;
        self
    }

    pub fn serialization_method(mut self, method: WalkMethod) -> Self {
        self.serialization_method = method;
        self
    }

    pub fn deserialization_method(mut self, method: WalkMethod) -> Self {
        self.deserialization_method = method;
        self
    }

    pub fn treat_collections_as_user_objects(mut self, enabled: bool) -> Self {
        self.treat_collections_as_user_objects = enabled;
        self
    }

    pub fn use_buffering(mut self, enabled: bool) -> Self {
        self.use_buffering = enabled;
        self
    }

    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Whether the stream header advertises preserved references.
    #[inline(always)]
    pub fn preserves_references(&self) -> bool {
        self.preservation != Preservation::DoNotPreserve
    }
}
