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

//! Rectangular multi-dimensional arrays: rank, per-dimension lengths,
//! then elements in row-major order.

use std::sync::Arc;

use crate::error::Error;
use crate::meta::assembly::builtin_assembly;
use crate::meta::descriptor::TypeDescriptor;
use crate::resolver::context::{ReadContext, WriteContext};
use crate::resolver::registry::Registry;
use crate::serializer::list::element_stream_type;
use crate::serializer::Persist;
use crate::types::Kind;

/// A rectangular array of arbitrary rank stored row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultiArray<T> {
    dims: Vec<usize>,
    data: Vec<T>,
}

impl<T> MultiArray<T> {
    /// Builds an array from its dimensions and row-major data. The
    /// data length must equal the product of the dimensions.
    pub fn new(dims: Vec<usize>, data: Vec<T>) -> Result<MultiArray<T>, Error> {
        let expected: usize = if dims.is_empty() {
            0
        } else {
            dims.iter().product()
        };
        if expected != data.len() {
            return Err(Error::invariant_violation(format!(
                "multi-array data length {} does not match dimensions {:?}",
                data.len(),
                dims
            )));
        }
        Ok(MultiArray { dims, data })
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Element at the given multi-dimensional index.
    pub fn get(&self, index: &[usize]) -> Option<&T> {
        if index.len() != self.dims.len() {
            return None;
        }
        let mut flat = 0usize;
        for (&idx, &dim) in index.iter().zip(&self.dims) {
            if idx >= dim {
                return None;
            }
            flat = flat * dim + idx;
        }
        self.data.get(flat)
    }
}

impl<T: Persist> Persist for MultiArray<T> {
    fn kind() -> Kind {
        Kind::MultiArray
    }

    fn type_desc(registry: &Registry) -> Result<Arc<TypeDescriptor>, Error> {
        registry.memo_descriptor::<Self>(|reg| {
            Ok(Arc::new(TypeDescriptor::instantiated(
                Kind::MultiArray,
                "MultiArray",
                builtin_assembly(),
                vec![T::type_desc(reg)?],
            )))
        })
    }

    fn default_value() -> Self {
        MultiArray {
            dims: Vec::new(),
            data: Vec::new(),
        }
    }

    fn write_body(&self, ctx: &mut WriteContext) -> Result<(), Error> {
        ctx.writer.write_varuint32(self.dims.len() as u32);
        for &dim in &self.dims {
            ctx.writer.write_varuint32(dim as u32);
        }
        for element in &self.data {
            element.write_slot(ctx)?;
        }
        Ok(())
    }

    fn read_body(ctx: &mut ReadContext) -> Result<Self, Error> {
        let rank = ctx.reader.read_varuint32()? as usize;
        if rank > 32 {
            return Err(Error::stream_corrupted(format!(
                "implausible multi-array rank {rank}"
            )));
        }
        let mut dims = Vec::with_capacity(rank);
        let mut total = if rank == 0 { 0 } else { 1usize };
        for _ in 0..rank {
            let dim = ctx.reader.read_varuint32()? as usize;
            total = total.saturating_mul(dim);
            dims.push(dim);
        }
        if total > ctx.reader.remaining() {
            return Err(Error::stream_corrupted("multi-array size exceeds input"));
        }
        let element_type = element_stream_type(ctx);
        let mut data = Vec::with_capacity(total);
        for _ in 0..total {
            ctx.push_inline(element_type.clone());
            let element = T::read_slot(ctx);
            ctx.pop_inline();
            data.push(element?);
        }
        Ok(MultiArray { dims, data })
    }
}
