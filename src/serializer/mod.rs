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

//! The [`Persist`] trait, its built-in implementations, and the
//! record framing shared by roots and shared-reference edges.
//!
//! Values occupy two kinds of wire positions. A *slot* is an inline
//! position typed by the enclosing structure stamp: struct fields,
//! collection elements, map keys and values. A *record* is a
//! self-describing position: a reference token, a type token
//! (stamping the type on first sight) and a body. Roots and
//! shared-reference edges are records; everything else is a slot.

use std::any::{Any, TypeId};
use std::sync::Arc;

use crate::error::Error;
use crate::meta::compare::ReadPlan;
use crate::meta::descriptor::TypeDescriptor;
use crate::resolver::context::{ReadContext, Resolved, WriteContext};
use crate::resolver::registry::Registry;
use crate::types::{Kind, NULL_TOKEN};

pub mod bytes;
pub mod datetime;
pub mod link;
pub mod list;
pub mod map;
pub mod multiarray;
pub mod object;
pub mod option;
pub mod primitive;
pub mod set;
pub mod shared;
pub mod skip;
pub mod string;

pub use bytes::Bytes;
pub use object::read_object_planned;
pub use skip::skip_slot;

/// Core serialization contract. Implementations for user structs and
/// enums come from [`crate::persist_object!`] and
/// [`crate::persist_enum!`].
pub trait Persist: Sized + 'static {
    /// Whether values of this type occupy shared-reference slots
    /// (reference tokens) rather than inline bodies.
    const REF: bool = false;

    fn kind() -> Kind;

    /// The runtime descriptor of this type.
    fn type_desc(registry: &Registry) -> Result<Arc<TypeDescriptor>, Error>;

    /// The value a field takes when the stream carries no bytes for
    /// it (schema additions, constructor-recreated fields).
    fn default_value() -> Self;

    /// Writes the body, without any record framing.
    fn write_body(&self, ctx: &mut WriteContext) -> Result<(), Error>;

    /// Reads the body, without any record framing.
    fn read_body(ctx: &mut ReadContext) -> Result<Self, Error>;

    /// Reads the body under a read plan. Only user objects interpret
    /// the plan; every other kind decodes its natural shape.
    fn read_planned(ctx: &mut ReadContext, plan: Option<&Arc<ReadPlan>>) -> Result<Self, Error> {
        let _ = plan;
        Self::read_body(ctx)
    }

    /// Writes this value into an inline slot.
    fn write_slot(&self, ctx: &mut WriteContext) -> Result<(), Error> {
        self.write_body(ctx)
    }

    /// Reads this value from an inline slot.
    fn read_slot(ctx: &mut ReadContext) -> Result<Self, Error> {
        Self::read_body(ctx)
    }

    /// Continues reading a shared-reference slot whose token has
    /// already been consumed. Only reference kinds support this.
    fn read_ref_slot(ctx: &mut ReadContext, token: RefToken) -> Result<Self, Error> {
        let _ = (ctx, token);
        Err(Error::type_error(
            "type does not occupy shared-reference slots",
        ))
    }

    /// Writes this value as a graph root.
    fn write_root(&self, ctx: &mut WriteContext) -> Result<(), Error> {
        write_value_record(self, ctx)
    }

    /// Reads a graph root.
    fn read_root(ctx: &mut ReadContext) -> Result<Self, Error> {
        let token = read_ref_token(ctx)?;
        Self::read_root_tokened(ctx, token)
    }

    /// Continues a root read after the reference token. Value kinds
    /// expect a fresh record; reference kinds accept back references
    /// and null.
    fn read_root_tokened(ctx: &mut ReadContext, token: RefToken) -> Result<Self, Error> {
        match token {
            RefToken::Null => Err(Error::invalid_ref(
                "null root for a type that cannot be null",
            )),
            RefToken::Back(_) => Err(Error::invalid_ref(
                "back reference to a value record",
            )),
            RefToken::Fresh(id) => {
                let value = read_record_value::<Self>(ctx, id)?;
                ctx.identity.mark_value(id);
                Ok(value)
            }
        }
    }
}

/// Schema row describing one declared field of a user object, in
/// declaration order, transient fields included.
pub struct FieldSchema {
    pub name: &'static str,
    pub transient: bool,
    pub ctor_recreated: bool,
    pub descriptor: fn(&Registry) -> Result<Arc<TypeDescriptor>, Error>,
}

/// Contract of macro-generated user objects: the field schema, the
/// per-field accessors driving the interpreted walk and read plans,
/// and the re-initialization hook for constructor-recreated fields.
pub trait PersistObject: Persist {
    fn schema() -> &'static [FieldSchema];

    /// Base-type descriptor for assignability chains and the
    /// inheritance-chain comparison.
    fn base_descriptor(_registry: &Registry) -> Result<Option<Arc<TypeDescriptor>>, Error> {
        Ok(None)
    }

    fn write_field(&self, idx: usize, ctx: &mut WriteContext) -> Result<(), Error>;

    /// The monomorphized field sequence, used by the `Generated`
    /// walk. Must write exactly the bytes of the interpreted walk.
    fn write_generated(&self, ctx: &mut WriteContext) -> Result<(), Error>;

    fn read_field(&mut self, idx: usize, ctx: &mut ReadContext) -> Result<(), Error>;

    /// Recreates constructor-recreated fields after the planned
    /// fields have been read.
    fn reinit(&mut self) {}
}

/// A decoded reference token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefToken {
    Null,
    /// An id seen earlier in the session.
    Back(u32),
    /// The next dense id; its slot is already reserved.
    Fresh(u32),
}

/// Reads a reference token, reserving the identity slot when the
/// token introduces a new record.
pub fn read_ref_token(ctx: &mut ReadContext) -> Result<RefToken, Error> {
    let token = ctx.reader.read_varuint32()?;
    if token == NULL_TOKEN {
        return Ok(RefToken::Null);
    }
    let id = token - 1;
    if ctx.identity.known(id) {
        Ok(RefToken::Back(id))
    } else {
        ctx.identity.expect_new(id)?;
        Ok(RefToken::Fresh(id))
    }
}

/// Writes a record for a value that cannot be shared: surrogate
/// substitution, a fresh dense id, the type token, the body, and the
/// serialization hooks around it.
pub fn write_value_record<T: Persist>(value: &T, ctx: &mut WriteContext) -> Result<(), Error> {
    if !ctx.env.object_swaps.is_empty() {
        let swaps = ctx.env.object_swaps;
        let chain = ctx.env.registry.swap_chain(TypeId::of::<T>());
        if let Some(convert) = swaps.find(&chain) {
            let surrogate = convert(value as &dyn Any)?;
            return write_dynamic_record(&*surrogate, ctx);
        }
    }
    let id = ctx.identity.alloc_id();
    write_record_at(value, id, ctx)
}

/// Record framing for an already-allocated id.
pub fn write_record_at<T: Persist>(value: &T, id: u32, ctx: &mut WriteContext) -> Result<(), Error> {
    ctx.writer.write_varuint32(id + 1);
    let descriptor = T::type_desc(ctx.env.registry)?;
    ctx.write_type_ref(&descriptor)?;
    ctx.fire_pre_serialize(value);
    value.write_body(ctx)?;
    ctx.fire_post_serialize(value);
    Ok(())
}

/// Writes a record whose concrete type is only known at runtime, e.g.
/// a surrogate produced by a swap-table callable. The type must be
/// registered.
pub fn write_dynamic_record(value: &dyn Any, ctx: &mut WriteContext) -> Result<(), Error> {
    let registered = ctx
        .env
        .registry
        .lookup_by_type(value.type_id())
        .cloned()
        .ok_or_else(|| {
            Error::type_error("surrogate value's runtime type is not registered")
        })?;
    let id = ctx.identity.alloc_id();
    ctx.writer.write_varuint32(id + 1);
    ctx.write_type_ref(&registered.descriptor)?;
    ctx.fire_pre_serialize(value);
    (registered.harness.write_body)(value, ctx)?;
    ctx.fire_post_serialize(value);
    Ok(())
}

/// Reads the remainder of a fresh record (type token and body) and
/// returns it as `T`, applying the read plan and, when the stream
/// type has a surrogate-for-object callback, the swap-back
/// conversion.
pub fn read_record_value<T: Persist>(ctx: &mut ReadContext, _id: u32) -> Result<T, Error> {
    ctx.inc_depth()?;
    let stream_type = ctx.read_type_ref()?;
    let resolved = ctx.resolve(&stream_type)?;
    ctx.push_inline(Some(stream_type.clone()));
    let result = read_record_dispatch::<T>(ctx, &stream_type, &resolved);
    ctx.pop_inline();
    ctx.dec_depth();
    result
}

fn read_record_dispatch<T: Persist>(
    ctx: &mut ReadContext,
    stream_type: &Arc<TypeDescriptor>,
    resolved: &Arc<Resolved>,
) -> Result<T, Error> {
    let swap = match &resolved.registered {
        Some(registered) => {
            let surrogate_table = ctx.env.surrogate_swaps;
            let chain = ctx.env.registry.swap_chain(registered.runtime);
            surrogate_table.find(&chain)
        }
        None => None,
    };

    // Identity match and no swap-back installed: decode straight into
    // the expected type, monomorphized.
    if swap.is_none() {
        if let Ok(runtime_desc) = T::type_desc(ctx.env.registry) {
            if runtime_desc.versionless_identity() == stream_type.versionless_identity() {
                let value = T::read_planned(ctx, resolved.plan.as_ref())?;
                ctx.fire_post_deserialize(&value);
                return Ok(value);
            }
        }
    }

    // Dynamic path: materialize the stream's type, then convert.
    if let Some(registered) = &resolved.registered {
        let materialized = (registered.harness.read_planned)(ctx, resolved.plan.as_ref())?;
        ctx.fire_post_deserialize(&*materialized);
        let converted = match swap {
            Some(entry) => (entry.convert)(materialized)?,
            None => materialized,
        };
        return converted.downcast::<T>().map(|b| *b).map_err(|_| {
            Error::type_error(format!(
                "stream object `{}` cannot be assigned to `{}`",
                stream_type.qualified_name(),
                std::any::type_name::<T>()
            ))
        });
    }

    match stream_type.kind() {
        Kind::Object | Kind::Enum => {
            Err(Error::assembly_resolve_failure(stream_type.qualified_name()))
        }
        _ => Err(Error::type_error(format!(
            "stream type `{}` cannot be read as `{}`",
            stream_type.qualified_name(),
            std::any::type_name::<T>()
        ))),
    }
}
