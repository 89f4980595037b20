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

//! Resolution machinery: type registry, surrogate swap tables,
//! identity tables, per-session stamp tables and the write/read
//! contexts that tie them together.

pub mod context;
pub mod identity;
pub mod registry;
pub mod stamp;
pub mod swap;

pub use context::{ReadContext, Resolved, SessionEnv, WriteContext};
pub use identity::{IdentityReader, IdentityWriter, RefCheck};
pub use registry::{Harness, RegisteredType, Registry, RegistryBuilder};
pub use stamp::{StampReader, StampWriter};
pub use swap::{ObjectToSurrogate, SurrogateToObject, SwapTable};
