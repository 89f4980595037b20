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

//! Raw byte blobs. `Vec<u8>` encodes as a list of `u8` slots; wrap it
//! in [`Bytes`] for the compact length-prefixed blob form.

use std::sync::Arc;

use crate::error::Error;
use crate::meta::descriptor::{builtin_leaf, TypeDescriptor};
use crate::resolver::context::{ReadContext, WriteContext};
use crate::resolver::registry::Registry;
use crate::serializer::Persist;
use crate::types::Kind;

/// A byte blob with its own wire kind.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Bytes(pub Vec<u8>);

impl From<Vec<u8>> for Bytes {
    fn from(v: Vec<u8>) -> Bytes {
        Bytes(v)
    }
}

impl std::ops::Deref for Bytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl Persist for Bytes {
    fn kind() -> Kind {
        Kind::Bytes
    }

    fn type_desc(_registry: &Registry) -> Result<Arc<TypeDescriptor>, Error> {
        Ok(builtin_leaf(Kind::Bytes, "Bytes"))
    }

    fn default_value() -> Self {
        Bytes(Vec::new())
    }

    fn write_body(&self, ctx: &mut WriteContext) -> Result<(), Error> {
        ctx.writer.write_blob(&self.0);
        Ok(())
    }

    fn read_body(ctx: &mut ReadContext) -> Result<Self, Error> {
        Ok(Bytes(ctx.reader.read_blob()?.to_vec()))
    }
}
