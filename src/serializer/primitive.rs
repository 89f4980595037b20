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

//! Fixed and variable-width primitives, and the 16-byte opaque id.

use std::sync::Arc;

use crate::error::Error;
use crate::meta::descriptor::{builtin_leaf, TypeDescriptor};
use crate::resolver::context::{ReadContext, WriteContext};
use crate::resolver::registry::Registry;
use crate::serializer::Persist;
use crate::types::{Kind, OpaqueId};

macro_rules! impl_primitive {
    ($ty:ty, $kind:ident, $name:literal, $write:ident, $read:ident) => {
        impl Persist for $ty {
            fn kind() -> Kind {
                Kind::$kind
            }

            fn type_desc(_registry: &Registry) -> Result<Arc<TypeDescriptor>, Error> {
                Ok(builtin_leaf(Kind::$kind, $name))
            }

            fn default_value() -> Self {
                Default::default()
            }

            fn write_body(&self, ctx: &mut WriteContext) -> Result<(), Error> {
                ctx.writer.$write(*self);
                Ok(())
            }

            fn read_body(ctx: &mut ReadContext) -> Result<Self, Error> {
                ctx.reader.$read()
            }
        }
    };
}

impl_primitive!(bool, Bool, "bool", write_bool, read_bool);
impl_primitive!(i8, Int8, "i8", write_i8, read_i8);
impl_primitive!(u8, UInt8, "u8", write_u8, read_u8);
impl_primitive!(i16, Int16, "i16", write_i16, read_i16);
impl_primitive!(u16, UInt16, "u16", write_u16, read_u16);
impl_primitive!(i32, Int32, "i32", write_varint32, read_varint32);
impl_primitive!(u32, UInt32, "u32", write_varuint32, read_varuint32);
impl_primitive!(i64, Int64, "i64", write_varint64, read_varint64);
impl_primitive!(u64, UInt64, "u64", write_varuint64, read_varuint64);
impl_primitive!(f32, Float32, "f32", write_f32, read_f32);
impl_primitive!(f64, Float64, "f64", write_f64, read_f64);

impl Persist for OpaqueId {
    fn kind() -> Kind {
        Kind::OpaqueId
    }

    fn type_desc(_registry: &Registry) -> Result<Arc<TypeDescriptor>, Error> {
        Ok(builtin_leaf(Kind::OpaqueId, "OpaqueId"))
    }

    fn default_value() -> Self {
        OpaqueId::ZERO
    }

    fn write_body(&self, ctx: &mut WriteContext) -> Result<(), Error> {
        ctx.writer.write_opaque_id(self);
        Ok(())
    }

    fn read_body(ctx: &mut ReadContext) -> Result<Self, Error> {
        ctx.reader.read_opaque_id()
    }
}
