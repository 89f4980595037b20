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

//! The entry type [`Heirloom`]: registration, surrogate installation,
//! one-shot serialize/deserialize and open-stream sessions.

use std::any::{Any, TypeId};
use std::io::{Read, Write};
use std::rc::Rc;

use crate::config::Settings;
use crate::error::Error;
use crate::meta::assembly::AssemblyDescriptor;
use crate::resolver::context::{HookFn, SessionEnv};
use crate::resolver::registry::RegistryBuilder;
use crate::resolver::swap::{ObjectToSurrogate, SurrogateToObject, SwapTable};
use crate::serializer::{Persist, PersistObject};
use crate::session::{ObjectReader, ObjectWriter};

/// A configured serializer instance.
///
/// Registrations and surrogate installations happen up front; the
/// instance freezes at its first serialize or deserialize, after
/// which further mutation is [`Error::IllegalStateAfterUse`].
///
/// ```rust,ignore
/// let mut h = Heirloom::new(Settings::default());
/// h.register::<Person>("Person")?;
///
/// let bytes = h.serialize(&person)?;
/// let back: Person = h.deserialize(&bytes)?;
/// ```
pub struct Heirloom {
    settings: Settings,
    types: RegistryBuilder,
    object_swaps: SwapTable<ObjectToSurrogate>,
    surrogate_swaps: SwapTable<SurrogateToObject>,
    pre_serialize: Option<Box<HookFn>>,
    post_serialize: Option<Box<HookFn>>,
    post_deserialize: Option<Box<HookFn>>,
}

impl Default for Heirloom {
    fn default() -> Self {
        Heirloom::new(Settings::default())
    }
}

impl Heirloom {
    pub fn new(settings: Settings) -> Heirloom {
        Heirloom {
            settings,
            types: RegistryBuilder::default(),
            object_swaps: SwapTable::default(),
            surrogate_swaps: SwapTable::default(),
            pre_serialize: None,
            post_serialize: None,
            post_deserialize: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Installs the pre-serialization callback, invoked exactly once
    /// per unique object per traversal, before its body is written.
    pub fn on_pre_serialize(mut self, hook: impl Fn(&dyn Any) + Send + Sync + 'static) -> Self {
        self.pre_serialize = Some(Box::new(hook));
        self
    }

    /// Installs the post-serialization callback.
    pub fn on_post_serialize(mut self, hook: impl Fn(&dyn Any) + Send + Sync + 'static) -> Self {
        self.post_serialize = Some(Box::new(hook));
        self
    }

    /// Installs the post-deserialization callback, invoked once per
    /// materialized object before any surrogate-for-object
    /// replacement.
    pub fn on_post_deserialize(mut self, hook: impl Fn(&dyn Any) + Send + Sync + 'static) -> Self {
        self.post_deserialize = Some(Box::new(hook));
        self
    }

    /// Replaces the default assembly identity that registered types
    /// fall under.
    pub fn set_default_assembly(&mut self, assembly: AssemblyDescriptor) -> Result<(), Error> {
        self.types.set_default_assembly(assembly)
    }

    /// Registers an additional assembly for use with
    /// [`Heirloom::register_in`].
    pub fn add_assembly(&mut self, assembly: AssemblyDescriptor) -> Result<(), Error> {
        self.types.add_assembly(assembly)
    }

    /// Registers a user type under `type_name` in the default
    /// assembly.
    pub fn register<T: PersistObject>(&mut self, type_name: &str) -> Result<(), Error> {
        self.types.register_object::<T>(type_name, None)
    }

    /// Registers a user type in a named assembly previously added
    /// with [`Heirloom::add_assembly`].
    pub fn register_in<T: PersistObject>(
        &mut self,
        assembly: &str,
        type_name: &str,
    ) -> Result<(), Error> {
        self.types.register_object::<T>(type_name, Some(assembly))
    }

    /// Registers a built-in-shaped type for dynamic materialization,
    /// e.g. so records of it inside skipped regions stay resolvable.
    pub fn register_value<T: Persist>(&mut self) -> Result<(), Error> {
        self.types.register_value::<T>()
    }

    /// Installs an object-to-surrogate conversion: whenever a value
    /// whose most-derived registered match is `T` reaches a record
    /// position during writing, `convert` runs and the result is
    /// serialized in its place. The original never receives an id.
    pub fn surrogate_for<T, S>(
        &mut self,
        convert: impl Fn(&T) -> S + Send + Sync + 'static,
    ) -> Result<(), Error>
    where
        T: Persist,
        S: Persist,
    {
        self.object_swaps.add_or_replace(
            TypeId::of::<T>(),
            Box::new(move |any| {
                let value = any.downcast_ref::<T>().ok_or_else(|| {
                    Error::type_error("surrogate conversion received a mismatched value")
                })?;
                Ok(Box::new(convert(value)) as Box<dyn Any>)
            }),
        )
    }

    /// Installs the inverse conversion: whenever a materialized
    /// record's type matches `S`, `convert` runs and its result
    /// replaces the instance before it reaches the identity slot or
    /// the caller.
    pub fn object_for<S, T>(
        &mut self,
        convert: impl Fn(S) -> T + Send + Sync + 'static,
    ) -> Result<(), Error>
    where
        S: Persist,
        T: Persist,
    {
        self.surrogate_swaps.add_or_replace(
            TypeId::of::<S>(),
            SurrogateToObject {
                convert: Box::new(move |boxed| {
                    let surrogate = boxed.downcast::<S>().map_err(|_| {
                        Error::type_error("surrogate conversion received a mismatched value")
                    })?;
                    Ok(Box::new(convert(*surrogate)) as Box<dyn Any>)
                }),
                wrap_shared: wrap_rc::<T>,
            },
        )
    }

    pub(crate) fn freeze_for_write(&self) -> Result<(), Error> {
        self.types.frozen()?;
        self.object_swaps.mark_used();
        Ok(())
    }

    pub(crate) fn freeze_for_read(&self) -> Result<(), Error> {
        self.types.frozen()?;
        self.surrogate_swaps.mark_used();
        Ok(())
    }

    pub(crate) fn session_env(&self) -> Result<SessionEnv<'_>, Error> {
        Ok(SessionEnv {
            registry: self.types.frozen()?,
            settings: &self.settings,
            object_swaps: &self.object_swaps,
            surrogate_swaps: &self.surrogate_swaps,
            pre_serialize: self.pre_serialize.as_deref(),
            post_serialize: self.post_serialize.as_deref(),
            post_deserialize: self.post_deserialize.as_deref(),
        })
    }

    /// Opens a long-lived writer session over `sink`.
    pub fn open_writer<W: Write>(&self, sink: W) -> Result<ObjectWriter<'_, W>, Error> {
        ObjectWriter::open(self, sink)
    }

    /// Opens a long-lived reader session over `source`.
    pub fn open_reader(&self, source: impl Read) -> Result<ObjectReader<'_>, Error> {
        ObjectReader::open(self, source)
    }

    /// Serializes one root value into a fresh byte vector.
    pub fn serialize<T: Persist>(&self, value: &T) -> Result<Vec<u8>, Error> {
        let mut session = self.open_writer(Vec::new())?;
        session.write_object(value)?;
        session.finish()
    }

    /// Serializes one root value into the given sink.
    pub fn serialize_into<T: Persist, W: Write>(
        &self,
        value: &T,
        sink: &mut W,
    ) -> Result<(), Error> {
        let mut session = self.open_writer(&mut *sink)?;
        session.write_object(value)?;
        session.finish()?;
        Ok(())
    }

    /// Reconstructs a root value from bytes produced by
    /// [`Heirloom::serialize`].
    pub fn deserialize<T: Persist>(&self, bytes: &[u8]) -> Result<T, Error> {
        let mut session = self.open_reader(bytes)?;
        session.read_object()
    }

    /// Reconstructs a root value from the given source.
    pub fn deserialize_from<T: Persist>(&self, source: impl Read) -> Result<T, Error> {
        let mut session = self.open_reader(source)?;
        session.read_object()
    }

    /// Clones a value by serializing and deserializing it, verifying
    /// that every produced byte was consumed.
    pub fn deep_clone<T: Persist>(&self, value: &T) -> Result<T, Error> {
        let bytes = self.serialize(value)?;
        let mut session = self.open_reader(&bytes[..])?;
        let clone = session.read_object()?;
        if session.position() != bytes.len() {
            return Err(Error::invariant_violation(format!(
                "deep clone consumed {} of {} produced bytes",
                session.position(),
                bytes.len()
            )));
        }
        Ok(clone)
    }
}

fn wrap_rc<T: Persist>(boxed: Box<dyn Any>) -> Result<Box<dyn Any>, Error> {
    boxed
        .downcast::<T>()
        .map(|value| Box::new(Rc::new(*value)) as Box<dyn Any>)
        .map_err(|_| Error::type_error("surrogate conversion produced a mismatched value"))
}
