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

//! Maps: a varuint count, then alternating key and value slots.
//! Hash-ordered maps sort entries by the key's encoded bytes for
//! byte-deterministic output.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::Arc;

use crate::error::Error;
use crate::meta::assembly::builtin_assembly;
use crate::meta::descriptor::TypeDescriptor;
use crate::resolver::context::{ReadContext, WriteContext};
use crate::resolver::registry::Registry;
use crate::serializer::set::scratch_encode;
use crate::serializer::Persist;
use crate::types::Kind;

fn map_descriptor<M: 'static, K: Persist, V: Persist>(
    registry: &Registry,
) -> Result<Arc<TypeDescriptor>, Error> {
    registry.memo_descriptor::<M>(|reg| {
        Ok(Arc::new(TypeDescriptor::instantiated(
            Kind::Map,
            "Map",
            builtin_assembly(),
            vec![K::type_desc(reg)?, V::type_desc(reg)?],
        )))
    })
}

fn entry_stream_types(
    ctx: &ReadContext,
) -> (Option<Arc<TypeDescriptor>>, Option<Arc<TypeDescriptor>>) {
    match ctx.current_inline() {
        Some(desc) => (
            desc.generics().first().cloned(),
            desc.generics().get(1).cloned(),
        ),
        None => (None, None),
    }
}

impl<K: Persist + Eq + Hash, V: Persist> Persist for HashMap<K, V> {
    fn kind() -> Kind {
        Kind::Map
    }

    fn type_desc(registry: &Registry) -> Result<Arc<TypeDescriptor>, Error> {
        map_descriptor::<Self, K, V>(registry)
    }

    fn default_value() -> Self {
        HashMap::new()
    }

    fn write_body(&self, ctx: &mut WriteContext) -> Result<(), Error> {
        let mut encoded: Vec<(Vec<u8>, &K, &V)> = Vec::with_capacity(self.len());
        for (key, value) in self {
            encoded.push((scratch_encode(key, ctx.env)?, key, value));
        }
        encoded.sort_by(|a, b| a.0.cmp(&b.0));
        ctx.writer.write_varuint32(encoded.len() as u32);
        for (_, key, value) in encoded {
            key.write_slot(ctx)?;
            value.write_slot(ctx)?;
        }
        Ok(())
    }

    fn read_body(ctx: &mut ReadContext) -> Result<Self, Error> {
        let count = ctx.reader.read_varuint32()? as usize;
        if count > ctx.reader.remaining() {
            return Err(Error::stream_corrupted("map count exceeds input"));
        }
        let (key_type, value_type) = entry_stream_types(ctx);
        let mut map = HashMap::with_capacity(count);
        for _ in 0..count {
            ctx.push_inline(key_type.clone());
            let key = K::read_slot(ctx);
            ctx.pop_inline();
            ctx.push_inline(value_type.clone());
            let value = V::read_slot(ctx);
            ctx.pop_inline();
            map.insert(key?, value?);
        }
        Ok(map)
    }
}

impl<K: Persist + Ord, V: Persist> Persist for BTreeMap<K, V> {
    fn kind() -> Kind {
        Kind::Map
    }

    fn type_desc(registry: &Registry) -> Result<Arc<TypeDescriptor>, Error> {
        map_descriptor::<Self, K, V>(registry)
    }

    fn default_value() -> Self {
        BTreeMap::new()
    }

    fn write_body(&self, ctx: &mut WriteContext) -> Result<(), Error> {
        ctx.writer.write_varuint32(self.len() as u32);
        for (key, value) in self {
            key.write_slot(ctx)?;
            value.write_slot(ctx)?;
        }
        Ok(())
    }

    fn read_body(ctx: &mut ReadContext) -> Result<Self, Error> {
        let count = ctx.reader.read_varuint32()? as usize;
        if count > ctx.reader.remaining() {
            return Err(Error::stream_corrupted("map count exceeds input"));
        }
        let (key_type, value_type) = entry_stream_types(ctx);
        let mut map = BTreeMap::new();
        for _ in 0..count {
            ctx.push_inline(key_type.clone());
            let key = K::read_slot(ctx);
            ctx.pop_inline();
            ctx.push_inline(value_type.clone());
            let value = V::read_slot(ctx);
            ctx.pop_inline();
            map.insert(key?, value?);
        }
        Ok(map)
    }
}
