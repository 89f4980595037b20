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

//! The type registry.
//!
//! Registration is collected by [`RegistryBuilder`] and resolved into
//! an immutable [`Registry`] the first time the owning serializer is
//! used. Freezing runs in two passes so mutually recursive types
//! resolve: shells carrying name and assembly identity first, field
//! lists second. Module ids of assemblies without an explicit id are
//! derived from the structural fingerprint of their registered types
//! during the same step.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, OnceLock, RwLock};

use crate::error::Error;
use crate::meta::assembly::{builtin_assembly, AssemblyDescriptor, Version4};
use crate::meta::compare::ReadPlan;
use crate::meta::descriptor::{FieldDescriptor, TypeDescriptor};
use crate::meta::fingerprint::murmur3_x64_128;
use crate::resolver::context::{ReadContext, WriteContext};
use crate::serializer::{FieldSchema, Persist, PersistObject};
use crate::types::{Kind, OpaqueId};

const FINGERPRINT_SEED: u64 = 47;

/// Type-erased entry points for one registered type, used wherever
/// the concrete type is only known from the stream: surrogate
/// targets, skipped records, the interpreted field walk.
#[derive(Clone, Copy)]
pub struct Harness {
    pub write_body: fn(&dyn Any, &mut WriteContext) -> Result<(), Error>,
    pub write_field: Option<fn(&dyn Any, usize, &mut WriteContext) -> Result<(), Error>>,
    pub read_planned: fn(&mut ReadContext, Option<&Arc<ReadPlan>>) -> Result<Box<dyn Any>, Error>,
    pub read_shared: fn(&mut ReadContext, Option<&Arc<ReadPlan>>) -> Result<Box<dyn Any>, Error>,
    pub schema: Option<&'static [FieldSchema]>,
}

impl Harness {
    pub fn of<T: Persist>() -> Harness {
        Harness {
            write_body: write_body_any::<T>,
            write_field: None,
            read_planned: read_planned_any::<T>,
            read_shared: read_shared_any::<T>,
            schema: None,
        }
    }

    pub fn of_object<T: PersistObject>() -> Harness {
        Harness {
            write_field: Some(write_field_any::<T>),
            schema: Some(T::schema()),
            ..Harness::of::<T>()
        }
    }
}

fn write_body_any<T: Persist>(value: &dyn Any, ctx: &mut WriteContext) -> Result<(), Error> {
    match value.downcast_ref::<T>() {
        Some(v) => v.write_body(ctx),
        None => Err(Error::type_error(
            "value does not match its registered runtime type",
        )),
    }
}

fn write_field_any<T: PersistObject>(
    value: &dyn Any,
    idx: usize,
    ctx: &mut WriteContext,
) -> Result<(), Error> {
    match value.downcast_ref::<T>() {
        Some(v) => v.write_field(idx, ctx),
        None => Err(Error::type_error(
            "value does not match its registered runtime type",
        )),
    }
}

fn read_planned_any<T: Persist>(
    ctx: &mut ReadContext,
    plan: Option<&Arc<ReadPlan>>,
) -> Result<Box<dyn Any>, Error> {
    Ok(Box::new(T::read_planned(ctx, plan)?))
}

/// Materializes a record in shareable form for an identity slot,
/// firing the post-deserialize hook and applying the
/// surrogate-for-object replacement before the slot is published.
fn read_shared_any<T: Persist>(
    ctx: &mut ReadContext,
    plan: Option<&Arc<ReadPlan>>,
) -> Result<Box<dyn Any>, Error> {
    let value = T::read_planned(ctx, plan)?;
    ctx.fire_post_deserialize(&value);
    let chain = ctx.env.registry.swap_chain(TypeId::of::<T>());
    if let Some(entry) = ctx.env.surrogate_swaps.find(&chain) {
        let converted = (entry.convert)(Box::new(value))?;
        return (entry.wrap_shared)(converted);
    }
    Ok(Box::new(Rc::new(value)))
}

/// One registered type: its runtime identity, descriptor and
/// harness.
pub struct RegisteredType {
    pub runtime: TypeId,
    pub rust_name: &'static str,
    pub descriptor: Arc<TypeDescriptor>,
    pub harness: Harness,
}

/// Immutable view produced by freezing a [`RegistryBuilder`].
pub struct Registry {
    default_assembly: Arc<AssemblyDescriptor>,
    assemblies: Vec<Arc<AssemblyDescriptor>>,
    by_type: HashMap<TypeId, Arc<RegisteredType>>,
    by_identity: HashMap<String, Arc<RegisteredType>>,
    generic_cache: RwLock<HashMap<TypeId, Arc<TypeDescriptor>>>,
}

impl Registry {
    pub fn default_assembly(&self) -> &Arc<AssemblyDescriptor> {
        &self.default_assembly
    }

    pub fn lookup_by_type(&self, runtime: TypeId) -> Option<&Arc<RegisteredType>> {
        self.by_type.get(&runtime)
    }

    /// Looks a stream type up by its version-insensitive identity.
    pub fn lookup_by_identity(&self, identity: &str) -> Option<&Arc<RegisteredType>> {
        self.by_identity.get(identity)
    }

    /// Descriptor of a registered type, for `Persist::type_desc` of
    /// user objects.
    pub fn registered_descriptor(
        &self,
        runtime: TypeId,
        rust_name: &str,
    ) -> Result<Arc<TypeDescriptor>, Error> {
        self.by_type
            .get(&runtime)
            .map(|r| r.descriptor.clone())
            .ok_or_else(|| {
                Error::type_error(format!(
                    "`{rust_name}` is not registered; register it before serializing"
                ))
            })
    }

    /// Per-registry insert-once memoization for generic built-in
    /// descriptors, keyed by the runtime type.
    pub fn memo_descriptor<T: 'static>(
        &self,
        build: impl FnOnce(&Registry) -> Result<Arc<TypeDescriptor>, Error>,
    ) -> Result<Arc<TypeDescriptor>, Error> {
        let key = TypeId::of::<T>();
        if let Some(found) = self
            .generic_cache
            .read()
            .expect("descriptor cache poisoned")
            .get(&key)
        {
            return Ok(found.clone());
        }
        let built = build(self)?;
        let mut guard = self
            .generic_cache
            .write()
            .expect("descriptor cache poisoned");
        Ok(guard.entry(key).or_insert(built).clone())
    }

    /// The query type followed by its registered ancestors, most
    /// derived first. Drives the most-derived-match rule of the swap
    /// tables.
    pub fn swap_chain(&self, runtime: TypeId) -> Vec<TypeId> {
        let mut chain = vec![runtime];
        let mut descriptor = match self.by_type.get(&runtime) {
            Some(r) => r.descriptor.clone(),
            None => return chain,
        };
        while let Some(base) = descriptor.base().cloned() {
            match self.lookup_by_identity(&base.versionless_identity()) {
                Some(reg) => {
                    chain.push(reg.runtime);
                    descriptor = base;
                }
                None => break,
            }
        }
        chain
    }
}

struct PendingObject {
    runtime: TypeId,
    rust_name: &'static str,
    kind: Kind,
    type_name: String,
    assembly_name: Option<String>,
    base_lookup: Box<dyn Fn(&Registry) -> Result<Option<Arc<TypeDescriptor>>, Error> + Send + Sync>,
    build_fields: Box<dyn Fn(&Registry) -> Result<Vec<FieldDescriptor>, Error> + Send + Sync>,
    harness: Harness,
}

struct PendingValue {
    runtime: TypeId,
    rust_name: &'static str,
    build: Box<dyn Fn(&Registry) -> Result<Arc<TypeDescriptor>, Error> + Send + Sync>,
    harness: Harness,
}

/// Collects registrations until the owning serializer is first used.
pub struct RegistryBuilder {
    default_assembly: Arc<AssemblyDescriptor>,
    extra_assemblies: Vec<Arc<AssemblyDescriptor>>,
    objects: Vec<PendingObject>,
    values: Vec<PendingValue>,
    frozen: OnceLock<Result<Registry, Error>>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        RegistryBuilder {
            default_assembly: Arc::new(AssemblyDescriptor::new("main", Version4::new(1, 0, 0, 0))),
            extra_assemblies: Vec::new(),
            objects: Vec::new(),
            values: Vec::new(),
            frozen: OnceLock::new(),
        }
    }
}

impl RegistryBuilder {
    fn guard_mutation(&self) -> Result<(), Error> {
        if self.frozen.get().is_some() {
            return Err(Error::illegal_state_after_use(
                "type registrations cannot change after the serializer's first use",
            ));
        }
        Ok(())
    }

    pub fn set_default_assembly(&mut self, assembly: AssemblyDescriptor) -> Result<(), Error> {
        self.guard_mutation()?;
        self.default_assembly = Arc::new(assembly);
        Ok(())
    }

    pub fn add_assembly(&mut self, assembly: AssemblyDescriptor) -> Result<(), Error> {
        self.guard_mutation()?;
        self.extra_assemblies.push(Arc::new(assembly));
        Ok(())
    }

    /// Registers a user object or enum under `type_name` in the named
    /// assembly (the default assembly when `None`).
    pub fn register_object<T: PersistObject>(
        &mut self,
        type_name: &str,
        assembly_name: Option<&str>,
    ) -> Result<(), Error> {
        self.guard_mutation()?;
        self.objects.push(PendingObject {
            runtime: TypeId::of::<T>(),
            rust_name: std::any::type_name::<T>(),
            kind: T::kind(),
            type_name: type_name.to_string(),
            assembly_name: assembly_name.map(str::to_string),
            base_lookup: Box::new(|reg| T::base_descriptor(reg)),
            build_fields: Box::new(move |reg| build_fields::<T>(reg)),
            harness: Harness::of_object::<T>(),
        });
        Ok(())
    }

    /// Registers a built-in-shaped type so records of it can be
    /// materialized dynamically, e.g. when a skipped region is later
    /// back-referenced.
    pub fn register_value<T: Persist>(&mut self) -> Result<(), Error> {
        self.guard_mutation()?;
        self.values.push(PendingValue {
            runtime: TypeId::of::<T>(),
            rust_name: std::any::type_name::<T>(),
            build: Box::new(|reg| T::type_desc(reg)),
            harness: Harness::of::<T>(),
        });
        Ok(())
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.get().is_some()
    }

    /// Freezes on first call and returns the immutable registry.
    pub fn frozen(&self) -> Result<&Registry, Error> {
        let result = self.frozen.get_or_init(|| self.do_freeze());
        match result {
            Ok(registry) => Ok(registry),
            Err(e) => Err(Error::type_error(format!("registry freeze failed: {e}"))),
        }
    }

    fn assembly_named(
        &self,
        registry: &Registry,
        name: Option<&str>,
    ) -> Result<Arc<AssemblyDescriptor>, Error> {
        match name {
            None => Ok(registry.default_assembly.clone()),
            Some(n) => registry
                .assemblies
                .iter()
                .find(|a| a.name() == n)
                .cloned()
                .ok_or_else(|| Error::type_error(format!("assembly `{n}` is not registered"))),
        }
    }

    fn do_freeze(&self) -> Result<Registry, Error> {
        let mut assemblies = vec![self.default_assembly.clone(), builtin_assembly()];
        assemblies.extend(self.extra_assemblies.iter().cloned());
        let mut registry = Registry {
            default_assembly: self.default_assembly.clone(),
            assemblies,
            by_type: HashMap::new(),
            by_identity: HashMap::new(),
            generic_cache: RwLock::new(HashMap::new()),
        };

        // Pass 1: shells, so field builders can resolve any
        // registered type by name, including their own.
        for pending in &self.objects {
            let assembly =
                self.assembly_named(&registry, pending.assembly_name.as_deref())?;
            let shell = Arc::new(TypeDescriptor::unsealed(
                pending.kind,
                &pending.type_name,
                assembly,
                Vec::new(),
            ));
            let entry = Arc::new(RegisteredType {
                runtime: pending.runtime,
                rust_name: pending.rust_name,
                descriptor: shell,
                harness: pending.harness,
            });
            insert_registered(&mut registry, entry)?;
        }

        // Pass 2: bases and field lists.
        for pending in &self.objects {
            let entry = registry
                .by_type
                .get(&pending.runtime)
                .expect("shell inserted in pass 1")
                .clone();
            if let Some(base) = (pending.base_lookup)(&registry)? {
                entry.descriptor.seal_base(base);
            }
            let fields = (pending.build_fields)(&registry)?;
            entry.descriptor.seal_fields(fields);
        }

        // Value registrations resolve against the sealed shells.
        for pending in &self.values {
            let descriptor = (pending.build)(&registry)?;
            let entry = Arc::new(RegisteredType {
                runtime: pending.runtime,
                rust_name: pending.rust_name,
                descriptor,
                harness: pending.harness,
            });
            insert_registered(&mut registry, entry)?;
        }

        seal_module_ids(&registry);
        Ok(registry)
    }
}

fn insert_registered(registry: &mut Registry, entry: Arc<RegisteredType>) -> Result<(), Error> {
    let identity = entry.descriptor.versionless_identity();
    if registry.by_type.contains_key(&entry.runtime) {
        return Err(Error::type_error(format!(
            "`{}` is registered twice",
            entry.rust_name
        )));
    }
    if registry.by_identity.contains_key(&identity) {
        return Err(Error::type_error(format!(
            "type identity `{identity}` is registered twice"
        )));
    }
    registry.by_type.insert(entry.runtime, entry.clone());
    registry.by_identity.insert(identity, entry);
    Ok(())
}

fn build_fields<T: PersistObject>(registry: &Registry) -> Result<Vec<FieldDescriptor>, Error> {
    let declaring = T::schema();
    let own = registry.registered_descriptor(TypeId::of::<T>(), std::any::type_name::<T>())?;
    let mut fields = Vec::with_capacity(declaring.len());
    for schema in declaring {
        let field_type = (schema.descriptor)(registry)?;
        let mut field = FieldDescriptor::new(own.name(), schema.name, field_type);
        if schema.ctor_recreated {
            field = field.ctor_recreated();
        } else if schema.transient {
            field = field.transient();
        }
        fields.push(field);
    }
    Ok(fields)
}

/// Derives the module id of every assembly that has none: the
/// fingerprint of the assembly full name plus the identity and field
/// layout of each type registered under it, in sorted order. Same
/// registrations, same id; any structural change, a new id.
fn seal_module_ids(registry: &Registry) {
    for assembly in &registry.assemblies {
        if assembly.has_module_id() {
            continue;
        }
        let mut lines: Vec<String> = registry
            .by_type
            .values()
            .filter(|r| Arc::ptr_eq(r.descriptor.assembly(), assembly))
            .map(|r| {
                let mut line = r.descriptor.qualified_name();
                if let Some(base) = r.descriptor.base() {
                    line.push_str("\n  extends ");
                    line.push_str(&base.versionless_identity());
                }
                for field in r.descriptor.fields() {
                    line.push('\n');
                    line.push_str(&format!(
                        "  {}:{}:{}:{}",
                        field.name,
                        field.field_type.versionless_identity(),
                        field.transient,
                        field.ctor_recreated
                    ));
                }
                line
            })
            .collect();
        lines.sort();
        let mut input = assembly.full_name();
        for line in lines {
            input.push('\n');
            input.push_str(&line);
        }
        let (hi, lo) = murmur3_x64_128(input.as_bytes(), FINGERPRINT_SEED);
        assembly.seal_module_id(OpaqueId::from_words(hi, lo));
    }
}
