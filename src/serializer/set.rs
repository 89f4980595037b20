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

//! Sets: a varuint count, then element slots.
//!
//! Hash-ordered sets are emitted sorted by each element's encoded
//! bytes so the same set always produces the same stream.

use std::collections::{BTreeSet, HashSet};
use std::hash::Hash;
use std::sync::Arc;

use crate::buffer::Writer;
use crate::error::Error;
use crate::meta::assembly::builtin_assembly;
use crate::meta::descriptor::TypeDescriptor;
use crate::resolver::context::{ReadContext, SessionEnv, WriteContext};
use crate::resolver::identity::IdentityWriter;
use crate::resolver::registry::Registry;
use crate::resolver::stamp::StampWriter;
use crate::serializer::list::element_stream_type;
use crate::serializer::Persist;
use crate::types::Kind;

/// Encodes one slot against throwaway tables, for ordering only.
/// Hooks are stripped so they still fire exactly once per object.
pub(crate) fn scratch_encode<T: Persist>(value: &T, env: SessionEnv) -> Result<Vec<u8>, Error> {
    let mut writer = Writer::default();
    let mut identity = IdentityWriter::default();
    let mut stamps = StampWriter::default();
    let scratch_env = SessionEnv {
        pre_serialize: None,
        post_serialize: None,
        ..env
    };
    let mut ctx = WriteContext::new(&mut writer, &mut identity, &mut stamps, scratch_env);
    value.write_slot(&mut ctx)?;
    Ok(writer.into_bytes())
}

fn set_descriptor<S: 'static, T: Persist>(
    registry: &Registry,
) -> Result<Arc<TypeDescriptor>, Error> {
    registry.memo_descriptor::<S>(|reg| {
        Ok(Arc::new(TypeDescriptor::instantiated(
            Kind::Set,
            "Set",
            builtin_assembly(),
            vec![T::type_desc(reg)?],
        )))
    })
}

impl<T: Persist + Eq + Hash> Persist for HashSet<T> {
    fn kind() -> Kind {
        Kind::Set
    }

    fn type_desc(registry: &Registry) -> Result<Arc<TypeDescriptor>, Error> {
        set_descriptor::<Self, T>(registry)
    }

    fn default_value() -> Self {
        HashSet::new()
    }

    fn write_body(&self, ctx: &mut WriteContext) -> Result<(), Error> {
        let mut encoded: Vec<(Vec<u8>, &T)> = Vec::with_capacity(self.len());
        for element in self {
            encoded.push((scratch_encode(element, ctx.env)?, element));
        }
        encoded.sort_by(|a, b| a.0.cmp(&b.0));
        ctx.writer.write_varuint32(encoded.len() as u32);
        for (_, element) in encoded {
            element.write_slot(ctx)?;
        }
        Ok(())
    }

    fn read_body(ctx: &mut ReadContext) -> Result<Self, Error> {
        let count = ctx.reader.read_varuint32()? as usize;
        if count > ctx.reader.remaining() {
            return Err(Error::stream_corrupted("set count exceeds input"));
        }
        let element_type = element_stream_type(ctx);
        let mut items = HashSet::with_capacity(count);
        for _ in 0..count {
            ctx.push_inline(element_type.clone());
            let element = T::read_slot(ctx);
            ctx.pop_inline();
            items.insert(element?);
        }
        Ok(items)
    }
}

impl<T: Persist + Ord> Persist for BTreeSet<T> {
    fn kind() -> Kind {
        Kind::Set
    }

    fn type_desc(registry: &Registry) -> Result<Arc<TypeDescriptor>, Error> {
        set_descriptor::<Self, T>(registry)
    }

    fn default_value() -> Self {
        BTreeSet::new()
    }

    fn write_body(&self, ctx: &mut WriteContext) -> Result<(), Error> {
        ctx.writer.write_varuint32(self.len() as u32);
        for element in self {
            element.write_slot(ctx)?;
        }
        Ok(())
    }

    fn read_body(ctx: &mut ReadContext) -> Result<Self, Error> {
        let count = ctx.reader.read_varuint32()? as usize;
        if count > ctx.reader.remaining() {
            return Err(Error::stream_corrupted("set count exceeds input"));
        }
        let element_type = element_stream_type(ctx);
        let mut items = BTreeSet::new();
        for _ in 0..count {
            ctx.push_inline(element_type.clone());
            let element = T::read_slot(ctx);
            ctx.pop_inline();
            items.insert(element?);
        }
        Ok(items)
    }
}
