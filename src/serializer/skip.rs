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

//! Structural skipping: decode and discard a slot driven by its
//! stream-side descriptor.
//!
//! Skipping is not byte-blind. Recursive descent still allocates
//! identities and consumes type stamps, so a record first seen inside
//! a skipped field remains addressable by later back references.
//! When the record's type has a registered counterpart it is
//! materialized into its identity slot; otherwise the slot is marked
//! opaque and a later back reference to it fails.

use std::sync::Arc;

use crate::error::Error;
use crate::meta::descriptor::TypeDescriptor;
use crate::resolver::context::ReadContext;
use crate::serializer::{read_ref_token, RefToken};
use crate::types::Kind;

/// Skips one slot of the given stream type.
pub fn skip_slot(ctx: &mut ReadContext, field_type: &Arc<TypeDescriptor>) -> Result<(), Error> {
    match field_type.kind() {
        Kind::Ref => skip_record_slot(ctx),
        Kind::Nullable => {
            if ctx.reader.read_bool()? {
                let inner = nested_type(field_type, 0)?;
                skip_slot(ctx, &inner)
            } else {
                Ok(())
            }
        }
        _ => skip_body(ctx, field_type),
    }
}

/// Skips a body of the given stream type, record framing excluded.
fn skip_body(ctx: &mut ReadContext, stream_type: &Arc<TypeDescriptor>) -> Result<(), Error> {
    match stream_type.kind() {
        Kind::Bool | Kind::Int8 | Kind::UInt8 => ctx.reader.skip(1),
        Kind::Int16 | Kind::UInt16 => ctx.reader.skip(2),
        Kind::Float32 => ctx.reader.skip(4),
        Kind::Float64 => ctx.reader.skip(8),
        Kind::Int32 | Kind::Int64 | Kind::Date | Kind::Timestamp => {
            ctx.reader.read_varint64().map(|_| ())
        }
        Kind::UInt32 | Kind::UInt64 | Kind::Enum => ctx.reader.read_varuint64().map(|_| ()),
        Kind::Str | Kind::Bytes => ctx.reader.read_blob().map(|_| ()),
        Kind::OpaqueId => ctx.reader.skip(16),
        Kind::List | Kind::Set => {
            let count = ctx.reader.read_varuint32()? as usize;
            if count > ctx.reader.remaining() {
                return Err(Error::stream_corrupted("skipped collection count exceeds input"));
            }
            let element = nested_type(stream_type, 0)?;
            for _ in 0..count {
                skip_slot(ctx, &element)?;
            }
            Ok(())
        }
        Kind::Map => {
            let count = ctx.reader.read_varuint32()? as usize;
            if count > ctx.reader.remaining() {
                return Err(Error::stream_corrupted("skipped map count exceeds input"));
            }
            let key = nested_type(stream_type, 0)?;
            let value = nested_type(stream_type, 1)?;
            for _ in 0..count {
                skip_slot(ctx, &key)?;
                skip_slot(ctx, &value)?;
            }
            Ok(())
        }
        Kind::MultiArray => {
            let rank = ctx.reader.read_varuint32()? as usize;
            let mut total = if rank == 0 { 0 } else { 1usize };
            for _ in 0..rank {
                total = total.saturating_mul(ctx.reader.read_varuint32()? as usize);
            }
            if total > ctx.reader.remaining() {
                return Err(Error::stream_corrupted("skipped array size exceeds input"));
            }
            let element = nested_type(stream_type, 0)?;
            for _ in 0..total {
                skip_slot(ctx, &element)?;
            }
            Ok(())
        }
        Kind::Object => {
            for field in stream_type.fields() {
                skip_slot(ctx, &field.field_type)?;
            }
            Ok(())
        }
        // skip_slot dispatches these before skip_body is reached.
        Kind::Ref | Kind::Nullable => Err(Error::stream_corrupted(
            "reference and nullable kinds have no inline body",
        )),
    }
}

/// Skips a shared-reference slot, materializing fresh records so
/// their identities stay addressable.
fn skip_record_slot(ctx: &mut ReadContext) -> Result<(), Error> {
    match read_ref_token(ctx)? {
        RefToken::Null | RefToken::Back(_) => Ok(()),
        RefToken::Fresh(id) => {
            ctx.inc_depth()?;
            let stream_type = ctx.read_type_ref()?;
            let resolved = ctx.resolve(&stream_type)?;
            ctx.push_inline(Some(stream_type.clone()));
            let result = match &resolved.registered {
                Some(registered) => {
                    let handle = (registered.harness.read_shared)(ctx, resolved.plan.as_ref());
                    match handle {
                        Ok(handle) => {
                            ctx.identity.fill_boxed(id, handle);
                            Ok(())
                        }
                        Err(e) => Err(e),
                    }
                }
                None => {
                    // Full slot dispatch: a record's stamped type can
                    // itself be a reference or nullable kind (e.g. a
                    // shared edge to an optional value).
                    let skipped = skip_slot(ctx, &stream_type);
                    if skipped.is_ok() {
                        ctx.identity.mark_opaque(id);
                    }
                    skipped
                }
            };
            ctx.pop_inline();
            ctx.dec_depth();
            result
        }
    }
}

fn nested_type(
    stream_type: &Arc<TypeDescriptor>,
    index: usize,
) -> Result<Arc<TypeDescriptor>, Error> {
    stream_type.generics().get(index).cloned().ok_or_else(|| {
        Error::stream_corrupted(format!(
            "stream type `{}` is missing generic argument {index}",
            stream_type.qualified_name()
        ))
    })
}
