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

//! User-object plumbing shared by the `persist_object!` expansions:
//! the read-plan executor and the interpreted field walk.

use std::sync::Arc;

use crate::config::WalkMethod;
use crate::error::Error;
use crate::meta::compare::{PlanEntry, ReadPlan};
use crate::resolver::context::{ReadContext, WriteContext};
use crate::serializer::skip::skip_slot;
use crate::serializer::PersistObject;
use crate::types::Kind;

/// Writes the non-transient fields in declaration order, through the
/// configured walk. Both walks produce identical bytes.
pub fn write_object_body<T: PersistObject>(
    value: &T,
    ctx: &mut WriteContext,
) -> Result<(), Error> {
    if ctx.env.settings.serialization_method == WalkMethod::Reflection {
        for (idx, schema) in T::schema().iter().enumerate() {
            if !schema.transient {
                value.write_field(idx, ctx)?;
            }
        }
        return Ok(());
    }
    // Generated walk: the macro-monomorphized field sequence.
    value.write_generated(ctx)
}

/// Materializes a user object: starts from the type's default value,
/// applies the plan entries in stream order, then runs the
/// re-initialization hook when the plan carries constructor entries.
pub fn read_object_planned<T: PersistObject>(
    ctx: &mut ReadContext,
    plan: Option<&Arc<ReadPlan>>,
) -> Result<T, Error> {
    let mut value = T::default_value();
    match plan {
        Some(plan) => {
            for entry in &plan.entries {
                match entry {
                    PlanEntry::Read { local, field_type } => {
                        ctx.push_inline(Some(field_type.clone()));
                        let result = value.read_field(*local, ctx);
                        ctx.pop_inline();
                        result?;
                    }
                    PlanEntry::Skip { field_type } => {
                        skip_slot(ctx, field_type)?;
                    }
                    PlanEntry::ConstructorInit { .. } => {}
                }
            }
            if plan.reinitializes {
                value.reinit();
            }
        }
        None => {
            // No stream structure in scope: the writer's layout is
            // the declared one.
            for (idx, schema) in T::schema().iter().enumerate() {
                if schema.transient {
                    continue;
                }
                ctx.push_inline(None);
                let result = value.read_field(idx, ctx);
                ctx.pop_inline();
                result?;
            }
            if T::schema().iter().any(|f| f.ctor_recreated) {
                value.reinit();
            }
        }
    }
    Ok(value)
}

/// Inline-slot read for a user object: picks up the stream-side
/// structure pushed by the enclosing container or plan entry.
pub fn read_object_slot<T: PersistObject>(ctx: &mut ReadContext) -> Result<T, Error> {
    match ctx.current_inline() {
        Some(stream) if stream.kind() == Kind::Object => {
            let resolved = ctx.resolve(&stream)?;
            T::read_planned(ctx, resolved.plan.as_ref())
        }
        _ => T::read_planned(ctx, None),
    }
}
