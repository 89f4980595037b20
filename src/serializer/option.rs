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

//! `Option<T>`.
//!
//! Over a shared-reference inner type the absence folds into the
//! reference token (null id); over an inline value it is a one-byte
//! presence flag followed by the body. Nullability is therefore a
//! property of the slot, not a distinct stamped type, whenever the
//! inner type is a reference.

use std::sync::Arc;

use crate::error::Error;
use crate::meta::assembly::builtin_assembly;
use crate::meta::compare::ReadPlan;
use crate::meta::descriptor::TypeDescriptor;
use crate::resolver::context::{ReadContext, WriteContext};
use crate::resolver::registry::Registry;
use crate::serializer::{read_ref_token, Persist, RefToken};
use crate::types::{Kind, NULL_TOKEN};

impl<T: Persist> Persist for Option<T> {
    const REF: bool = T::REF;

    fn kind() -> Kind {
        if T::REF {
            Kind::Ref
        } else {
            Kind::Nullable
        }
    }

    fn type_desc(registry: &Registry) -> Result<Arc<TypeDescriptor>, Error> {
        if T::REF {
            return T::type_desc(registry);
        }
        registry.memo_descriptor::<Self>(|reg| {
            Ok(Arc::new(TypeDescriptor::instantiated(
                Kind::Nullable,
                "Option",
                builtin_assembly(),
                vec![T::type_desc(reg)?],
            )))
        })
    }

    fn default_value() -> Self {
        None
    }

    fn write_body(&self, ctx: &mut WriteContext) -> Result<(), Error> {
        self.write_slot(ctx)
    }

    fn read_body(ctx: &mut ReadContext) -> Result<Self, Error> {
        Self::read_slot(ctx)
    }

    fn read_planned(ctx: &mut ReadContext, _plan: Option<&Arc<ReadPlan>>) -> Result<Self, Error> {
        Self::read_slot(ctx)
    }

    fn write_slot(&self, ctx: &mut WriteContext) -> Result<(), Error> {
        match self {
            None => {
                if T::REF {
                    ctx.writer.write_varuint32(NULL_TOKEN);
                } else {
                    ctx.writer.write_bool(false);
                }
                Ok(())
            }
            Some(inner) => {
                if !T::REF {
                    ctx.writer.write_bool(true);
                }
                inner.write_slot(ctx)
            }
        }
    }

    fn read_slot(ctx: &mut ReadContext) -> Result<Self, Error> {
        if T::REF {
            let token = read_ref_token(ctx)?;
            return match token {
                RefToken::Null => Ok(None),
                other => Ok(Some(T::read_ref_slot(ctx, other)?)),
            };
        }
        if ctx.reader.read_bool()? {
            // Descend past the nullable wrapper so the inner slot
            // sees its own stream descriptor.
            let inner_type = ctx
                .current_inline()
                .and_then(|desc| desc.generics().first().cloned());
            ctx.push_inline(inner_type);
            let inner = T::read_slot(ctx);
            ctx.pop_inline();
            Ok(Some(inner?))
        } else {
            Ok(None)
        }
    }

    fn write_root(&self, ctx: &mut WriteContext) -> Result<(), Error> {
        match self {
            None => {
                ctx.writer.write_varuint32(NULL_TOKEN);
                Ok(())
            }
            Some(inner) => inner.write_root(ctx),
        }
    }

    fn read_root_tokened(ctx: &mut ReadContext, token: RefToken) -> Result<Self, Error> {
        match token {
            RefToken::Null => Ok(None),
            other => Ok(Some(T::read_root_tokened(ctx, other)?)),
        }
    }
}
