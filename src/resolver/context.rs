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

//! Write and read contexts threading the per-session state through a
//! traversal: the buffer, the identity and stamp tables, and the
//! shared environment (registry, settings, swap tables, hooks).

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::buffer::{Reader, Writer};
use crate::config::Settings;
use crate::error::Error;
use crate::meta::compare::{compare_structures, ReadPlan};
use crate::meta::descriptor::TypeDescriptor;
use crate::resolver::identity::{IdentityReader, IdentityWriter};
use crate::resolver::registry::{RegisteredType, Registry};
use crate::resolver::stamp::{StampReader, StampWriter};
use crate::resolver::swap::{ObjectToSurrogate, SurrogateToObject, SwapTable};
use crate::types::Kind;

/// Phase callback invoked once per unique object per traversal.
pub type HookFn = dyn Fn(&dyn Any) + Send + Sync;

/// Shared, immutable session environment.
#[derive(Clone, Copy)]
pub struct SessionEnv<'a> {
    pub registry: &'a Registry,
    pub settings: &'a Settings,
    pub object_swaps: &'a SwapTable<ObjectToSurrogate>,
    pub surrogate_swaps: &'a SwapTable<SurrogateToObject>,
    pub pre_serialize: Option<&'a HookFn>,
    pub post_serialize: Option<&'a HookFn>,
    pub post_deserialize: Option<&'a HookFn>,
}

pub struct WriteContext<'a> {
    pub writer: &'a mut Writer,
    pub identity: &'a mut IdentityWriter,
    pub stamps: &'a mut StampWriter,
    pub env: SessionEnv<'a>,
    depth: u32,
}

impl<'a> WriteContext<'a> {
    pub fn new(
        writer: &'a mut Writer,
        identity: &'a mut IdentityWriter,
        stamps: &'a mut StampWriter,
        env: SessionEnv<'a>,
    ) -> WriteContext<'a> {
        WriteContext {
            writer,
            identity,
            stamps,
            env,
            depth: 0,
        }
    }

    pub fn write_type_ref(&mut self, descriptor: &Arc<TypeDescriptor>) -> Result<u32, Error> {
        self.stamps.write_type_ref(
            self.writer,
            descriptor,
            self.env.settings.treat_collections_as_user_objects,
        )
    }

    #[inline(always)]
    pub fn fire_pre_serialize(&self, value: &dyn Any) {
        if let Some(hook) = self.env.pre_serialize {
            hook(value);
        }
    }

    #[inline(always)]
    pub fn fire_post_serialize(&self, value: &dyn Any) {
        if let Some(hook) = self.env.post_serialize {
            hook(value);
        }
    }

    pub fn swap_chain_for(&self, runtime: TypeId) -> Vec<TypeId> {
        self.env.registry.swap_chain(runtime)
    }

    #[inline(always)]
    pub fn inc_depth(&mut self) -> Result<(), Error> {
        self.depth += 1;
        if self.depth > self.env.settings.max_depth {
            return Err(Error::depth_exceeded(format!(
                "nesting depth exceeded {}; a cyclic graph cannot be written without \
                 reference preservation",
                self.env.settings.max_depth
            )));
        }
        Ok(())
    }

    #[inline(always)]
    pub fn dec_depth(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

/// A stream type entry resolved against the runtime registry:
/// the registered counterpart, if any, and the comparator's read
/// plan for object kinds. Memoized per session by qualified name.
pub struct Resolved {
    pub registered: Option<Arc<RegisteredType>>,
    pub plan: Option<Arc<ReadPlan>>,
}

pub struct ReadContext<'a, 'de> {
    pub reader: Reader<'de>,
    pub identity: &'a mut IdentityReader,
    pub stamps: &'a mut StampReader,
    pub resolutions: &'a mut HashMap<String, Arc<Resolved>>,
    pub env: SessionEnv<'a>,
    inline: Vec<Option<Arc<TypeDescriptor>>>,
    depth: u32,
}

impl<'a, 'de> ReadContext<'a, 'de> {
    pub fn new(
        reader: Reader<'de>,
        identity: &'a mut IdentityReader,
        stamps: &'a mut StampReader,
        resolutions: &'a mut HashMap<String, Arc<Resolved>>,
        env: SessionEnv<'a>,
    ) -> ReadContext<'a, 'de> {
        ReadContext {
            reader,
            identity,
            stamps,
            resolutions,
            env,
            inline: Vec::new(),
            depth: 0,
        }
    }

    pub fn read_type_ref(&mut self) -> Result<Arc<TypeDescriptor>, Error> {
        self.stamps.read_type_ref(&mut self.reader)
    }

    /// Resolves a stream descriptor against the registry, computing
    /// the read plan on first sight of the type.
    pub fn resolve(&mut self, descriptor: &Arc<TypeDescriptor>) -> Result<Arc<Resolved>, Error> {
        let key = descriptor.qualified_name();
        if let Some(found) = self.resolutions.get(&key) {
            return Ok(found.clone());
        }
        let registered = self
            .env
            .registry
            .lookup_by_identity(&descriptor.versionless_identity())
            .cloned();
        let plan = match &registered {
            Some(reg)
                if descriptor.kind() == Kind::Object
                    && reg.descriptor.kind() == Kind::Object =>
            {
                Some(Arc::new(compare_structures(
                    descriptor,
                    &reg.descriptor,
                    self.env.settings.tolerance,
                )?))
            }
            _ => None,
        };
        let resolved = Arc::new(Resolved { registered, plan });
        self.resolutions.insert(key, resolved.clone());
        Ok(resolved)
    }

    /// Pushes the stream-side descriptor of the slot about to be
    /// read; `None` when the context carries no stream information.
    pub fn push_inline(&mut self, descriptor: Option<Arc<TypeDescriptor>>) {
        self.inline.push(descriptor);
    }

    pub fn pop_inline(&mut self) {
        self.inline.pop();
    }

    /// Stream descriptor of the slot currently being read.
    pub fn current_inline(&self) -> Option<Arc<TypeDescriptor>> {
        self.inline.last().cloned().flatten()
    }

    #[inline(always)]
    pub fn fire_post_deserialize(&self, value: &dyn Any) {
        if let Some(hook) = self.env.post_deserialize {
            hook(value);
        }
    }

    #[inline(always)]
    pub fn inc_depth(&mut self) -> Result<(), Error> {
        self.depth += 1;
        if self.depth > self.env.settings.max_depth {
            return Err(Error::depth_exceeded(format!(
                "record nesting depth exceeded {}",
                self.env.settings.max_depth
            )));
        }
        Ok(())
    }

    #[inline(always)]
    pub fn dec_depth(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}
