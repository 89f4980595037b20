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

//! Shared-reference edges (`Rc`, `Arc`) and the transparent wrappers
//! `Box` and `RefCell`.
//!
//! A shared edge is a record position: the first sight of an object
//! writes its record under a fresh dense id, every further sight
//! emits the id alone. Surrogate substitution happens before identity
//! is consulted, so a swapped object never receives an id of its own.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::config::Preservation;
use crate::error::Error;
use crate::meta::assembly::builtin_assembly;
use crate::meta::compare::ReadPlan;
use crate::meta::descriptor::TypeDescriptor;
use crate::resolver::context::{ReadContext, WriteContext};
use crate::resolver::identity::RefCheck;
use crate::resolver::registry::Registry;
use crate::serializer::{
    read_record_value, read_ref_token, write_dynamic_record, write_record_at, Persist, RefToken,
};
use crate::types::Kind;

pub(crate) fn shared_descriptor<S: 'static, T: Persist>(
    registry: &Registry,
) -> Result<Arc<TypeDescriptor>, Error> {
    registry.memo_descriptor::<S>(|reg| {
        Ok(Arc::new(TypeDescriptor::instantiated(
            Kind::Ref,
            "Ref",
            builtin_assembly(),
            vec![T::type_desc(reg)?],
        )))
    })
}

/// Writes one shared edge held through an `Rc`.
pub(crate) fn write_shared_rc<T: Persist>(rc: &Rc<T>, ctx: &mut WriteContext) -> Result<(), Error> {
    if !ctx.env.object_swaps.is_empty() {
        let swaps = ctx.env.object_swaps;
        let chain = ctx.env.registry.swap_chain(TypeId::of::<T>());
        if let Some(convert) = swaps.find(&chain) {
            let surrogate = convert(&**rc as &dyn Any)?;
            return write_dynamic_record(&*surrogate, ctx);
        }
    }
    match ctx.env.settings.preservation {
        Preservation::DoNotPreserve => {
            ctx.inc_depth()?;
            let id = ctx.identity.alloc_id();
            let result = write_record_at(&**rc, id, ctx);
            ctx.dec_depth();
            result
        }
        preservation => {
            let weak = preservation == Preservation::UseWeakReference;
            match ctx.identity.check_rc(rc, weak) {
                RefCheck::Existing(id) => {
                    ctx.writer.write_varuint32(id + 1);
                    Ok(())
                }
                RefCheck::New(id) => write_record_at(&**rc, id, ctx),
            }
        }
    }
}

pub(crate) fn write_shared_arc<T: Persist + Send + Sync>(
    arc: &Arc<T>,
    ctx: &mut WriteContext,
) -> Result<(), Error> {
    if !ctx.env.object_swaps.is_empty() {
        let swaps = ctx.env.object_swaps;
        let chain = ctx.env.registry.swap_chain(TypeId::of::<T>());
        if let Some(convert) = swaps.find(&chain) {
            let surrogate = convert(&**arc as &dyn Any)?;
            return write_dynamic_record(&*surrogate, ctx);
        }
    }
    match ctx.env.settings.preservation {
        Preservation::DoNotPreserve => {
            ctx.inc_depth()?;
            let id = ctx.identity.alloc_id();
            let result = write_record_at(&**arc, id, ctx);
            ctx.dec_depth();
            result
        }
        preservation => {
            let weak = preservation == Preservation::UseWeakReference;
            match ctx.identity.check_arc(arc, weak) {
                RefCheck::Existing(id) => {
                    ctx.writer.write_varuint32(id + 1);
                    Ok(())
                }
                RefCheck::New(id) => write_record_at(&**arc, id, ctx),
            }
        }
    }
}

pub(crate) fn resolve_rc_back_ref<T: Persist>(
    ctx: &ReadContext,
    id: u32,
) -> Result<Rc<T>, Error> {
    if ctx.identity.is_pending(id) {
        return Err(Error::invalid_ref(format!(
            "cyclic strong reference through id {id}; route cycles through Link or WeakLink"
        )));
    }
    ctx.identity.get_rc::<T>(id).ok_or_else(|| {
        Error::invalid_ref(format!("back reference {id} cannot be resolved"))
    })
}

impl<T: Persist> Persist for Rc<T> {
    const REF: bool = true;

    fn kind() -> Kind {
        Kind::Ref
    }

    fn type_desc(registry: &Registry) -> Result<Arc<TypeDescriptor>, Error> {
        shared_descriptor::<Self, T>(registry)
    }

    fn default_value() -> Self {
        Rc::new(T::default_value())
    }

    fn write_body(&self, ctx: &mut WriteContext) -> Result<(), Error> {
        self.write_slot(ctx)
    }

    fn read_body(ctx: &mut ReadContext) -> Result<Self, Error> {
        Self::read_slot(ctx)
    }

    fn write_slot(&self, ctx: &mut WriteContext) -> Result<(), Error> {
        write_shared_rc(self, ctx)
    }

    fn read_slot(ctx: &mut ReadContext) -> Result<Self, Error> {
        let token = read_ref_token(ctx)?;
        Self::read_ref_slot(ctx, token)
    }

    fn read_ref_slot(ctx: &mut ReadContext, token: RefToken) -> Result<Self, Error> {
        match token {
            RefToken::Null => Err(Error::invalid_ref(
                "shared reference cannot be null; wrap it in Option",
            )),
            RefToken::Back(id) => resolve_rc_back_ref::<T>(ctx, id),
            RefToken::Fresh(id) => {
                let value = read_record_value::<T>(ctx, id)?;
                let rc = Rc::new(value);
                ctx.identity.fill_rc(id, rc.clone());
                Ok(rc)
            }
        }
    }

    fn write_root(&self, ctx: &mut WriteContext) -> Result<(), Error> {
        self.write_slot(ctx)
    }

    fn read_root_tokened(ctx: &mut ReadContext, token: RefToken) -> Result<Self, Error> {
        Self::read_ref_slot(ctx, token)
    }
}

impl<T: Persist + Send + Sync> Persist for Arc<T> {
    const REF: bool = true;

    fn kind() -> Kind {
        Kind::Ref
    }

    fn type_desc(registry: &Registry) -> Result<Arc<TypeDescriptor>, Error> {
        shared_descriptor::<Self, T>(registry)
    }

    fn default_value() -> Self {
        Arc::new(T::default_value())
    }

    fn write_body(&self, ctx: &mut WriteContext) -> Result<(), Error> {
        self.write_slot(ctx)
    }

    fn read_body(ctx: &mut ReadContext) -> Result<Self, Error> {
        Self::read_slot(ctx)
    }

    fn write_slot(&self, ctx: &mut WriteContext) -> Result<(), Error> {
        write_shared_arc(self, ctx)
    }

    fn read_slot(ctx: &mut ReadContext) -> Result<Self, Error> {
        let token = read_ref_token(ctx)?;
        Self::read_ref_slot(ctx, token)
    }

    fn read_ref_slot(ctx: &mut ReadContext, token: RefToken) -> Result<Self, Error> {
        match token {
            RefToken::Null => Err(Error::invalid_ref(
                "shared reference cannot be null; wrap it in Option",
            )),
            RefToken::Back(id) => {
                if ctx.identity.is_pending(id) {
                    return Err(Error::invalid_ref(format!(
                        "cyclic strong reference through id {id}; route cycles through Link or WeakLink"
                    )));
                }
                ctx.identity.get_arc::<T>(id).ok_or_else(|| {
                    Error::invalid_ref(format!("back reference {id} cannot be resolved"))
                })
            }
            RefToken::Fresh(id) => {
                let value = read_record_value::<T>(ctx, id)?;
                let arc = Arc::new(value);
                ctx.identity.fill_arc(id, arc.clone());
                Ok(arc)
            }
        }
    }

    fn write_root(&self, ctx: &mut WriteContext) -> Result<(), Error> {
        self.write_slot(ctx)
    }

    fn read_root_tokened(ctx: &mut ReadContext, token: RefToken) -> Result<Self, Error> {
        Self::read_ref_slot(ctx, token)
    }
}

impl<T: Persist> Persist for Box<T> {
    const REF: bool = T::REF;

    fn kind() -> Kind {
        T::kind()
    }

    fn type_desc(registry: &Registry) -> Result<Arc<TypeDescriptor>, Error> {
        T::type_desc(registry)
    }

    fn default_value() -> Self {
        Box::new(T::default_value())
    }

    fn write_body(&self, ctx: &mut WriteContext) -> Result<(), Error> {
        (**self).write_body(ctx)
    }

    fn read_body(ctx: &mut ReadContext) -> Result<Self, Error> {
        Ok(Box::new(T::read_body(ctx)?))
    }

    fn read_planned(ctx: &mut ReadContext, plan: Option<&Arc<ReadPlan>>) -> Result<Self, Error> {
        Ok(Box::new(T::read_planned(ctx, plan)?))
    }

    fn write_slot(&self, ctx: &mut WriteContext) -> Result<(), Error> {
        (**self).write_slot(ctx)
    }

    fn read_slot(ctx: &mut ReadContext) -> Result<Self, Error> {
        Ok(Box::new(T::read_slot(ctx)?))
    }

    fn read_ref_slot(ctx: &mut ReadContext, token: RefToken) -> Result<Self, Error> {
        Ok(Box::new(T::read_ref_slot(ctx, token)?))
    }

    fn write_root(&self, ctx: &mut WriteContext) -> Result<(), Error> {
        (**self).write_root(ctx)
    }

    fn read_root_tokened(ctx: &mut ReadContext, token: RefToken) -> Result<Self, Error> {
        Ok(Box::new(T::read_root_tokened(ctx, token)?))
    }
}

impl<T: Persist> Persist for RefCell<T> {
    const REF: bool = T::REF;

    fn kind() -> Kind {
        T::kind()
    }

    fn type_desc(registry: &Registry) -> Result<Arc<TypeDescriptor>, Error> {
        T::type_desc(registry)
    }

    fn default_value() -> Self {
        RefCell::new(T::default_value())
    }

    fn write_body(&self, ctx: &mut WriteContext) -> Result<(), Error> {
        self.try_borrow()
            .map_err(|_| {
                Error::invariant_violation("RefCell is mutably borrowed during serialization")
            })?
            .write_body(ctx)
    }

    fn read_body(ctx: &mut ReadContext) -> Result<Self, Error> {
        Ok(RefCell::new(T::read_body(ctx)?))
    }

    fn read_planned(ctx: &mut ReadContext, plan: Option<&Arc<ReadPlan>>) -> Result<Self, Error> {
        Ok(RefCell::new(T::read_planned(ctx, plan)?))
    }

    fn write_slot(&self, ctx: &mut WriteContext) -> Result<(), Error> {
        self.try_borrow()
            .map_err(|_| {
                Error::invariant_violation("RefCell is mutably borrowed during serialization")
            })?
            .write_slot(ctx)
    }

    fn read_slot(ctx: &mut ReadContext) -> Result<Self, Error> {
        Ok(RefCell::new(T::read_slot(ctx)?))
    }

    fn read_ref_slot(ctx: &mut ReadContext, token: RefToken) -> Result<Self, Error> {
        Ok(RefCell::new(T::read_ref_slot(ctx, token)?))
    }
}
