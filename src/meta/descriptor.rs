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

//! Type and field descriptors.
//!
//! A descriptor is either *resolved-from-runtime* (built by the
//! registration machinery) or *resolved-from-stream* (built from a
//! type stamp). Both shapes share this representation. Field lists
//! and base links live behind a `OnceLock` so descriptors can be
//! created as shells first and completed afterwards; that two-phase
//! construction is what makes self-referential types (a struct
//! holding a `Link` to its own type) representable.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use crate::meta::assembly::{builtin_assembly, AssemblyDescriptor};
use crate::types::Kind;

/// Descriptor of a single field: declaring type, name, field type,
/// transience flag and constructor-recreated flag.
#[derive(Clone)]
pub struct FieldDescriptor {
    pub declaring: String,
    pub name: String,
    pub field_type: Arc<TypeDescriptor>,
    pub transient: bool,
    pub ctor_recreated: bool,
}

impl FieldDescriptor {
    pub fn new(
        declaring: impl Into<String>,
        name: impl Into<String>,
        field_type: Arc<TypeDescriptor>,
    ) -> FieldDescriptor {
        FieldDescriptor {
            declaring: declaring.into(),
            name: name.into(),
            field_type,
            transient: false,
            ctor_recreated: false,
        }
    }

    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    pub fn ctor_recreated(mut self) -> Self {
        self.transient = true;
        self.ctor_recreated = true;
        self
    }
}

impl std::fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}::{}: {}",
            self.declaring,
            self.name,
            self.field_type.qualified_name()
        )
    }
}

/// Descriptor of a type: name, owning assembly, ordered generic
/// arguments, optional base type and ordered fields.
///
/// Equality and hashing go through [`TypeDescriptor::qualified_name`],
/// which is a pure function of the descriptor tree.
pub struct TypeDescriptor {
    kind: Kind,
    name: String,
    assembly: Arc<AssemblyDescriptor>,
    generics: Vec<Arc<TypeDescriptor>>,
    base: OnceLock<Arc<TypeDescriptor>>,
    fields: OnceLock<Vec<FieldDescriptor>>,
}

impl TypeDescriptor {
    /// A structureless descriptor: primitives, strings, blobs.
    pub fn leaf(
        kind: Kind,
        name: impl Into<String>,
        assembly: Arc<AssemblyDescriptor>,
    ) -> TypeDescriptor {
        let descriptor = TypeDescriptor::unsealed(kind, name, assembly, Vec::new());
        let _ = descriptor.fields.set(Vec::new());
        descriptor
    }

    /// A generic instantiation: collections, nullable and reference
    /// wrappers.
    pub fn instantiated(
        kind: Kind,
        name: impl Into<String>,
        assembly: Arc<AssemblyDescriptor>,
        generics: Vec<Arc<TypeDescriptor>>,
    ) -> TypeDescriptor {
        let descriptor = TypeDescriptor::unsealed(kind, name, assembly, generics);
        let _ = descriptor.fields.set(Vec::new());
        descriptor
    }

    /// A shell whose base and field list are attached later with
    /// [`TypeDescriptor::seal_base`] and
    /// [`TypeDescriptor::seal_fields`]. Used for registered user
    /// types and for descriptors parsed from stream stamps.
    pub fn unsealed(
        kind: Kind,
        name: impl Into<String>,
        assembly: Arc<AssemblyDescriptor>,
        generics: Vec<Arc<TypeDescriptor>>,
    ) -> TypeDescriptor {
        TypeDescriptor {
            kind,
            name: name.into(),
            assembly,
            generics,
            base: OnceLock::new(),
            fields: OnceLock::new(),
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn assembly(&self) -> &Arc<AssemblyDescriptor> {
        &self.assembly
    }

    pub fn generics(&self) -> &[Arc<TypeDescriptor>] {
        &self.generics
    }

    pub fn base(&self) -> Option<&Arc<TypeDescriptor>> {
        self.base.get()
    }

    pub fn seal_base(&self, base: Arc<TypeDescriptor>) {
        let _ = self.base.set(base);
    }

    /// Ordered field list of this layer only, in declaration order.
    /// Empty until sealed. A base type's own fields live on the base
    /// descriptor reachable through [`TypeDescriptor::base`]; base
    /// layers contribute no inline fields to a body.
    pub fn fields(&self) -> &[FieldDescriptor] {
        self.fields.get().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn seal_fields(&self, fields: Vec<FieldDescriptor>) {
        let _ = self.fields.set(fields);
    }

    pub fn fields_sealed(&self) -> bool {
        self.fields.get().is_some()
    }

    /// The assembly-qualified identity string. Two descriptors
    /// compare equal iff these are equal.
    pub fn qualified_name(&self) -> String {
        let mut s = self.name.clone();
        if !self.generics.is_empty() {
            s.push('<');
            for (i, g) in self.generics.iter().enumerate() {
                if i > 0 {
                    s.push_str(", ");
                }
                s.push('[');
                s.push_str(&g.qualified_name());
                s.push(']');
            }
            s.push('>');
        }
        s.push_str(" @ ");
        s.push_str(&self.assembly.full_name());
        s
    }

    /// Identity with assembly versions stripped, used for field-type
    /// compatibility checks where version drift is tolerated
    /// separately.
    pub fn versionless_identity(&self) -> String {
        let mut s = self.name.clone();
        if !self.generics.is_empty() {
            s.push('<');
            for (i, g) in self.generics.iter().enumerate() {
                if i > 0 {
                    s.push_str(", ");
                }
                s.push_str(&g.versionless_identity());
            }
            s.push('>');
        }
        s.push_str(" @ ");
        s.push_str(self.assembly.name());
        s
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.qualified_name() == other.qualified_name()
    }
}

impl Eq for TypeDescriptor {}

impl std::hash::Hash for TypeDescriptor {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.qualified_name().hash(state);
    }
}

impl std::fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TypeDescriptor({})", self.qualified_name())
    }
}

/// Process-wide cache of the built-in leaf descriptors, keyed by
/// name. Insert-once; no removal API.
pub fn builtin_leaf(kind: Kind, name: &'static str) -> Arc<TypeDescriptor> {
    static CACHE: OnceLock<RwLock<HashMap<&'static str, Arc<TypeDescriptor>>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| RwLock::new(HashMap::new()));
    if let Some(found) = cache.read().expect("builtin cache poisoned").get(name) {
        return found.clone();
    }
    let mut guard = cache.write().expect("builtin cache poisoned");
    guard
        .entry(name)
        .or_insert_with(|| Arc::new(TypeDescriptor::leaf(kind, name, builtin_assembly())))
        .clone()
}
