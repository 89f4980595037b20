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

//! Patchable graph edges: [`Link`] (strong) and [`WeakLink`] (weak).
//!
//! Both wrappers share one interior cell across clones, which is what
//! makes cyclic graphs deserializable: a back reference into a slot
//! that is still materializing leaves an empty link and registers a
//! deferred fixup; once the referent's slot is populated, the fixup
//! patches every clone of the cell at once.
//!
//! `Link` owns its target strongly; a cycle built entirely of `Link`
//! edges keeps itself alive, which is the caller's choice to make.
//! `WeakLink` never keeps its target alive and serializes as null
//! once the target is gone.
//!
//! ```rust,ignore
//! struct Node {
//!     value: i32,
//!     next: Link<Node>,
//! }
//! persist_object!(Node { value: i32, next: Link<Node> });
//!
//! let a = Rc::new(Node { value: 1, next: Link::new() });
//! let b = Rc::new(Node { value: 2, next: Link::new() });
//! a.next.set(b.clone());
//! b.next.set(a.clone());
//!
//! let bytes = h.serialize(&a)?;
//! let back: Rc<Node> = h.deserialize(&bytes)?;
//! let second = back.next.get().unwrap();
//! assert!(Rc::ptr_eq(&second.next.get().unwrap(), &back));
//! ```

use std::cell::UnsafeCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::error::Error;
use crate::meta::descriptor::TypeDescriptor;
use crate::resolver::context::{ReadContext, WriteContext};
use crate::resolver::registry::Registry;
use crate::serializer::shared::{shared_descriptor, write_shared_rc};
use crate::serializer::{read_record_value, read_ref_token, Persist, RefToken};
use crate::types::{Kind, NULL_TOKEN};

/// A nullable strong edge to an `Rc` target. Clones share the same
/// cell, so a deserialization fixup updates all of them.
pub struct Link<T> {
    inner: Rc<UnsafeCell<Option<Rc<T>>>>,
}

impl<T> Link<T> {
    pub fn new() -> Link<T> {
        Link {
            inner: Rc::new(UnsafeCell::new(None)),
        }
    }

    pub fn to(target: &Rc<T>) -> Link<T> {
        let link = Link::new();
        link.set(target.clone());
        link
    }

    pub fn get(&self) -> Option<Rc<T>> {
        unsafe { (*self.inner.get()).clone() }
    }

    pub fn set(&self, target: Rc<T>) {
        unsafe {
            *self.inner.get() = Some(target);
        }
    }

    pub fn clear(&self) {
        unsafe {
            *self.inner.get() = None;
        }
    }

    pub fn is_empty(&self) -> bool {
        unsafe { (*self.inner.get()).is_none() }
    }
}

impl<T> Default for Link<T> {
    fn default() -> Self {
        Link::new()
    }
}

impl<T> Clone for Link<T> {
    fn clone(&self) -> Self {
        // Share the cell, not the target.
        Link {
            inner: self.inner.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Link<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link")
            .field("linked", &!self.is_empty())
            .finish()
    }
}

impl<T> PartialEq for Link<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self.get(), other.get()) {
            (None, None) => true,
            (Some(a), Some(b)) => Rc::ptr_eq(&a, &b),
            _ => false,
        }
    }
}

impl<T> Eq for Link<T> {}

impl<T: Persist> Persist for Link<T> {
    const REF: bool = true;

    fn kind() -> Kind {
        Kind::Ref
    }

    fn type_desc(registry: &Registry) -> Result<Arc<TypeDescriptor>, Error> {
        shared_descriptor::<Self, T>(registry)
    }

    fn default_value() -> Self {
        Link::new()
    }

    fn write_body(&self, ctx: &mut WriteContext) -> Result<(), Error> {
        self.write_slot(ctx)
    }

    fn read_body(ctx: &mut ReadContext) -> Result<Self, Error> {
        Self::read_slot(ctx)
    }

    fn write_slot(&self, ctx: &mut WriteContext) -> Result<(), Error> {
        match self.get() {
            None => {
                ctx.writer.write_varuint32(NULL_TOKEN);
                Ok(())
            }
            Some(target) => write_shared_rc(&target, ctx),
        }
    }

    fn read_slot(ctx: &mut ReadContext) -> Result<Self, Error> {
        let token = read_ref_token(ctx)?;
        Self::read_ref_slot(ctx, token)
    }

    fn read_ref_slot(ctx: &mut ReadContext, token: RefToken) -> Result<Self, Error> {
        match token {
            RefToken::Null => Ok(Link::new()),
            RefToken::Back(id) => {
                if let Some(target) = ctx.identity.get_rc::<T>(id) {
                    return Ok(Link::to(&target));
                }
                if ctx.identity.is_pending(id) {
                    let link = Link::new();
                    let cell = link.clone();
                    ctx.identity.add_fixup(Box::new(move |reader| {
                        if let Some(target) = reader.get_rc::<T>(id) {
                            cell.set(target);
                        }
                    }));
                    return Ok(link);
                }
                Err(Error::invalid_ref(format!(
                    "back reference {id} cannot be resolved"
                )))
            }
            RefToken::Fresh(id) => {
                let value = read_record_value::<T>(ctx, id)?;
                let rc = Rc::new(value);
                ctx.identity.fill_rc(id, rc.clone());
                Ok(Link::to(&rc))
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

/// A nullable weak edge to an `Rc` target. Serializes as a reference
/// to the target's record, or null once the target is gone; never
/// keeps the target alive.
pub struct WeakLink<T> {
    inner: Rc<UnsafeCell<Weak<T>>>,
}

impl<T> WeakLink<T> {
    pub fn new() -> WeakLink<T> {
        WeakLink {
            inner: Rc::new(UnsafeCell::new(Weak::new())),
        }
    }

    pub fn to(target: &Rc<T>) -> WeakLink<T> {
        WeakLink {
            inner: Rc::new(UnsafeCell::new(Rc::downgrade(target))),
        }
    }

    pub fn upgrade(&self) -> Option<Rc<T>> {
        unsafe { (*self.inner.get()).upgrade() }
    }

    pub fn update(&self, weak: Weak<T>) {
        unsafe {
            *self.inner.get() = weak;
        }
    }
}

impl<T> Default for WeakLink<T> {
    fn default() -> Self {
        WeakLink::new()
    }
}

impl<T> Clone for WeakLink<T> {
    fn clone(&self) -> Self {
        // Share the cell, not the target.
        WeakLink {
            inner: self.inner.clone(),
        }
    }
}

impl<T> std::fmt::Debug for WeakLink<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakLink")
            .field("alive", &self.upgrade().is_some())
            .finish()
    }
}

impl<T: Persist> Persist for WeakLink<T> {
    const REF: bool = true;

    fn kind() -> Kind {
        Kind::Ref
    }

    fn type_desc(registry: &Registry) -> Result<Arc<TypeDescriptor>, Error> {
        shared_descriptor::<Self, T>(registry)
    }

    fn default_value() -> Self {
        WeakLink::new()
    }

    fn write_body(&self, ctx: &mut WriteContext) -> Result<(), Error> {
        self.write_slot(ctx)
    }

    fn read_body(ctx: &mut ReadContext) -> Result<Self, Error> {
        Self::read_slot(ctx)
    }

    fn write_slot(&self, ctx: &mut WriteContext) -> Result<(), Error> {
        match self.upgrade() {
            None => {
                ctx.writer.write_varuint32(NULL_TOKEN);
                Ok(())
            }
            Some(target) => write_shared_rc(&target, ctx),
        }
    }

    fn read_slot(ctx: &mut ReadContext) -> Result<Self, Error> {
        let token = read_ref_token(ctx)?;
        Self::read_ref_slot(ctx, token)
    }

    fn read_ref_slot(ctx: &mut ReadContext, token: RefToken) -> Result<Self, Error> {
        match token {
            RefToken::Null => Ok(WeakLink::new()),
            RefToken::Back(id) => {
                if let Some(target) = ctx.identity.get_rc::<T>(id) {
                    return Ok(WeakLink::to(&target));
                }
                if ctx.identity.is_pending(id) {
                    let link = WeakLink::new();
                    let cell = link.clone();
                    ctx.identity.add_fixup(Box::new(move |reader| {
                        if let Some(target) = reader.get_rc::<T>(id) {
                            cell.update(Rc::downgrade(&target));
                        }
                    }));
                    return Ok(link);
                }
                Err(Error::invalid_ref(format!(
                    "back reference {id} cannot be resolved"
                )))
            }
            RefToken::Fresh(id) => {
                let value = read_record_value::<T>(ctx, id)?;
                let rc = Rc::new(value);
                ctx.identity.fill_rc(id, rc.clone());
                Ok(WeakLink::to(&rc))
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
