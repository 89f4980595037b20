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

//! # Heirloom
//!
//! A binary object-graph serializer with reference preservation,
//! user-defined surrogates, and schema-evolution (version tolerance)
//! support.
//!
//! A caller hands in a root value together with a byte sink; heirloom
//! writes a self-describing stream that, replayed against a byte
//! source, reconstructs the value and the full graph of objects
//! reachable from it, including shared and cyclic references. A
//! second mode attaches a single [`session::ObjectWriter`] or
//! [`session::ObjectReader`] to a long-lived stream and performs many
//! consecutive operations that share the identity and type tables
//! built by previous operations.
//!
//! ## Architecture
//!
//! - **`buffer`**: binary Writer/Reader with varint and string codecs
//! - **`meta`**: assembly/type/field descriptors, the stamp
//!   comparator and read plans
//! - **`resolver`**: type registry, surrogate swap tables, identity
//!   tables and per-session stamp tables
//! - **`serializer`**: the [`Persist`] trait and built-in
//!   implementations, plus structural skipping
//! - **`session`**: open-stream writer/reader sessions
//! - **`entry`**: the entry type [`Heirloom`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use heirloom::{Heirloom, persist_object};
//!
//! struct Point { x: i32, y: i32 }
//! persist_object!(Point { x: i32, y: i32 });
//!
//! let mut h = Heirloom::default();
//! h.register::<Point>("Point").unwrap();
//! let bytes = h.serialize(&Point { x: 1, y: 2 }).unwrap();
//! let back: Point = h.deserialize(&bytes).unwrap();
//! ```

pub mod buffer;
pub mod config;
pub mod entry;
pub mod error;
pub mod macros;
pub mod meta;
pub mod resolver;
pub mod serializer;
pub mod session;
pub mod types;

pub use config::{Preservation, Settings, Tolerance, WalkMethod};
pub use entry::Heirloom;
pub use error::Error;
pub use meta::assembly::{AssemblyDescriptor, Version4};
pub use serializer::link::{Link, WeakLink};
pub use serializer::multiarray::MultiArray;
pub use serializer::{Bytes, Persist, PersistObject};
pub use types::OpaqueId;
