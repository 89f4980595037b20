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

//! One-dimensional sequences: a varuint count, then element slots.

use std::sync::Arc;

use crate::error::Error;
use crate::meta::assembly::builtin_assembly;
use crate::meta::descriptor::TypeDescriptor;
use crate::resolver::context::{ReadContext, WriteContext};
use crate::resolver::registry::Registry;
use crate::serializer::Persist;
use crate::types::Kind;

/// The stream descriptor of the current list's element slots, when
/// stream information is in scope.
pub(crate) fn element_stream_type(ctx: &ReadContext) -> Option<Arc<TypeDescriptor>> {
    ctx.current_inline()
        .and_then(|desc| desc.generics().first().cloned())
}

impl<T: Persist> Persist for Vec<T> {
    fn kind() -> Kind {
        Kind::List
    }

    fn type_desc(registry: &Registry) -> Result<Arc<TypeDescriptor>, Error> {
        registry.memo_descriptor::<Self>(|reg| {
            Ok(Arc::new(TypeDescriptor::instantiated(
                Kind::List,
                "Vec",
                builtin_assembly(),
                vec![T::type_desc(reg)?],
            )))
        })
    }

    fn default_value() -> Self {
        Vec::new()
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
            return Err(Error::stream_corrupted("list count exceeds input"));
        }
        let element_type = element_stream_type(ctx);
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            ctx.push_inline(element_type.clone());
            let element = T::read_slot(ctx);
            ctx.pop_inline();
            items.push(element?);
        }
        Ok(items)
    }
}
