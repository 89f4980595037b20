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

//! Surrogate swap tables.
//!
//! An insertion-ordered registry mapping a declared type to a
//! user-supplied conversion. The same structure serves both
//! directions: object-to-surrogate at write time and
//! surrogate-to-object at read time, each with its own callable
//! shape. Tables freeze at the serializer's first operation in the
//! matching direction; later mutation is [`Error::IllegalStateAfterUse`].

use std::any::{Any, TypeId};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::Error;

/// Write-side conversion: borrows the original, produces the value to
/// serialize in its place.
pub type ObjectToSurrogate = Box<dyn Fn(&dyn Any) -> Result<Box<dyn Any>, Error> + Send + Sync>;

/// Read-side conversion: consumes the materialized surrogate and
/// produces the object that replaces it in the identity slot.
pub struct SurrogateToObject {
    pub convert: Box<dyn Fn(Box<dyn Any>) -> Result<Box<dyn Any>, Error> + Send + Sync>,
    /// Wraps the converted value in an `Rc` so skip-materialized
    /// records can land in identity slots in shareable form.
    pub wrap_shared: fn(Box<dyn Any>) -> Result<Box<dyn Any>, Error>,
}

pub struct SwapTable<C> {
    entries: Vec<(TypeId, C)>,
    used: AtomicBool,
}

impl<C> Default for SwapTable<C> {
    fn default() -> Self {
        SwapTable {
            entries: Vec::new(),
            used: AtomicBool::new(false),
        }
    }
}

impl<C> SwapTable<C> {
    /// Inserts a conversion for `declared`. Re-registering the same
    /// type replaces both the callable and its insertion-order
    /// position.
    pub fn add_or_replace(&mut self, declared: TypeId, callable: C) -> Result<(), Error> {
        if self.used.load(Ordering::Acquire) {
            return Err(Error::illegal_state_after_use(
                "surrogate table cannot change after the serializer's first use",
            ));
        }
        if let Some(pos) = self.entries.iter().position(|(t, _)| *t == declared) {
            self.entries.remove(pos);
        }
        self.entries.push((declared, callable));
        Ok(())
    }

    /// Freezes the table. Called once the owning serializer performs
    /// its first write (object-to-surrogate) or first read
    /// (surrogate-to-object).
    pub fn mark_used(&self) {
        self.used.store(true, Ordering::Release);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finds the callable whose declared type is the most-derived
    /// type assignable from the query. `chain` lists the query type
    /// first, then its ancestors in derivation order; within one
    /// chain level, the most recent insertion wins.
    pub fn find(&self, chain: &[TypeId]) -> Option<&C> {
        for candidate in chain {
            if let Some((_, callable)) = self.entries.iter().rev().find(|(t, _)| t == candidate) {
                return Some(callable);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct A;
    struct B;

    fn table_with(ids: &[TypeId]) -> SwapTable<usize> {
        let mut table = SwapTable::default();
        for (i, id) in ids.iter().enumerate() {
            table.add_or_replace(*id, i).unwrap();
        }
        table
    }

    #[test]
    fn most_derived_match_wins() {
        let (a, b) = (TypeId::of::<A>(), TypeId::of::<B>());
        let table = table_with(&[b, a]);
        // Chain lists the query type first; `a` shadows its ancestor.
        assert_eq!(table.find(&[a, b]), Some(&1));
        assert_eq!(table.find(&[b]), Some(&0));
        assert_eq!(table.find(&[TypeId::of::<u8>()]), None);
    }

    #[test]
    fn reregistration_replaces_in_place() {
        let a = TypeId::of::<A>();
        let mut table = table_with(&[a]);
        table.add_or_replace(a, 7).unwrap();
        assert_eq!(table.find(&[a]), Some(&7));
    }

    #[test]
    fn mutation_after_use_is_rejected() {
        let mut table = table_with(&[TypeId::of::<A>()]);
        table.mark_used();
        let err = table.add_or_replace(TypeId::of::<B>(), 1).unwrap_err();
        assert!(matches!(err, Error::IllegalStateAfterUse(_)));
    }
}
