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

//! The stamp comparator: reconciles a persisted type description
//! against the type known to the running program and produces an
//! ordered read plan.

use std::sync::Arc;

use crate::config::Tolerance;
use crate::error::{Drift, Error};
use crate::meta::descriptor::TypeDescriptor;

/// One step of a read plan, in stream order.
#[derive(Clone, Debug)]
pub enum PlanEntry {
    /// Decode the next stream field and assign it to the runtime
    /// field at `local` (an index into the runtime type's declared
    /// field list). `field_type` is the stream-side field descriptor
    /// driving nested resolution.
    Read {
        local: usize,
        field_type: Arc<TypeDescriptor>,
    },
    /// Decode the next stream field and discard it. Recursive descent
    /// still allocates identities and consumes stamps normally.
    Skip { field_type: Arc<TypeDescriptor> },
    /// Consume no bytes; the runtime field at `local` is recreated by
    /// the type's own re-initialization logic.
    ConstructorInit { local: usize },
}

/// Ordered read plan for one stream type, memoized per session type
/// entry.
#[derive(Debug)]
pub struct ReadPlan {
    pub entries: Vec<PlanEntry>,
    /// Stream structure provably identical to the runtime structure
    /// (matching module ids); drift checks were skipped.
    pub verbatim: bool,
    /// At least one `ConstructorInit` entry is present.
    pub reinitializes: bool,
}

/// Compares `prev` (resolved from the stream) against `cur` (resolved
/// from the runtime registry) for the same full name and returns the
/// read plan, or the first schema drift the `policy` forbids.
///
/// Field type changes are never tolerated; everything else is gated
/// on a [`Tolerance`] flag. Matching module ids mean the structures
/// are identical and every check is skipped. Differing module ids
/// with an all-empty policy fail outright, but the failure names the
/// most specific drift the walk found; any tolerance flag opens the
/// module-id gate, since tolerating a structural change subsumes
/// tolerating the recompilation that produced it.
pub fn compare_structures(
    prev: &Arc<TypeDescriptor>,
    cur: &Arc<TypeDescriptor>,
    policy: Tolerance,
) -> Result<ReadPlan, Error> {
    let type_name = cur.name().to_string();
    let verbatim = prev.assembly().resolved_module_id() == cur.assembly().resolved_module_id();

    if !verbatim {
        if prev.assembly().version() != cur.assembly().version()
            && !policy.allows(Tolerance::ASSEMBLY_VERSION_CHANGE)
        {
            return Err(Error::type_structure_changed(
                type_name,
                "",
                Drift::AssemblyVersionChanged,
            ));
        }
        let base_matches = match (prev.base(), cur.base()) {
            (None, None) => true,
            (Some(p), Some(c)) => p.versionless_identity() == c.versionless_identity(),
            _ => false,
        };
        if !base_matches && !policy.allows(Tolerance::INHERITANCE_CHAIN_CHANGE) {
            return Err(Error::type_structure_changed(type_name, "", Drift::BaseChanged));
        }
    }

    let cur_fields = cur.fields();
    let prev_fields = prev.fields();

    // Runtime fields with no stream counterpart are additions.
    for field in cur_fields.iter().filter(|f| !f.transient) {
        let present = prev_fields.iter().any(|p| p.name == field.name);
        if !present && !verbatim && !policy.allows(Tolerance::FIELD_ADDITION) {
            return Err(Error::type_structure_changed(
                type_name,
                field.name.clone(),
                Drift::FieldAdded,
            ));
        }
    }

    // The plan preserves the stream's field ordering; nothing else
    // can decode the byte sequence.
    let mut entries = Vec::with_capacity(prev_fields.len());
    for prev_field in prev_fields {
        match cur_fields.iter().position(|c| c.name == prev_field.name) {
            Some(local) => {
                let cur_field = &cur_fields[local];
                if cur_field.transient {
                    // A field demoted to transient reads as removed.
                    if !policy.allows(Tolerance::FIELD_REMOVAL) {
                        return Err(Error::type_structure_changed(
                            type_name,
                            prev_field.name.clone(),
                            Drift::FieldRemoved,
                        ));
                    }
                    entries.push(PlanEntry::Skip {
                        field_type: prev_field.field_type.clone(),
                    });
                    continue;
                }
                if !verbatim
                    && prev_field.field_type.versionless_identity()
                        != cur_field.field_type.versionless_identity()
                {
                    return Err(Error::type_structure_changed(
                        type_name,
                        prev_field.name.clone(),
                        Drift::FieldTypeChanged,
                    ));
                }
                entries.push(PlanEntry::Read {
                    local,
                    field_type: prev_field.field_type.clone(),
                });
            }
            None => {
                if !verbatim && !policy.allows(Tolerance::FIELD_REMOVAL) {
                    return Err(Error::type_structure_changed(
                        type_name,
                        prev_field.name.clone(),
                        Drift::FieldRemoved,
                    ));
                }
                entries.push(PlanEntry::Skip {
                    field_type: prev_field.field_type.clone(),
                });
            }
        }
    }

    // Constructor-recreated fields go to the end of the plan.
    let mut reinitializes = false;
    for (local, field) in cur_fields.iter().enumerate() {
        if field.ctor_recreated {
            entries.push(PlanEntry::ConstructorInit { local });
            reinitializes = true;
        }
    }

    // The structures reconciled under the flags, but a bare policy
    // does not even accept the recompilation itself.
    if !verbatim && policy.is_empty() {
        return Err(Error::type_structure_changed(
            type_name,
            "",
            Drift::ModuleIdChanged,
        ));
    }

    Ok(ReadPlan {
        entries,
        verbatim,
        reinitializes,
    })
}
