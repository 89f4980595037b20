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

//! Error type for serialization and deserialization operations.
//!
//! Errors are created through the static constructor functions
//! ([`Error::stream_corrupted`], [`Error::type_error`], ...) rather
//! than by naming the variants directly; the constructors accept
//! anything convertible into a `Cow<'static, str>` and honor the
//! `HEIRLOOM_PANIC_ON_ERROR` debug switch.

use std::borrow::Cow;

use thiserror::Error;

/// Compile-time flag: set `HEIRLOOM_PANIC_ON_ERROR=1` when building to
/// panic at the exact site an error is constructed, which together
/// with `RUST_BACKTRACE=1` pinpoints the failure in a full stack
/// trace.
pub const PANIC_ON_ERROR: bool = option_env!("HEIRLOOM_PANIC_ON_ERROR").is_some();

/// The kind of schema drift the stamp comparator detected between a
/// persisted type description and the one discovered at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drift {
    /// Module ids differ and `Tolerance::GUID_CHANGE` is not set.
    ModuleIdChanged,
    /// Owning assembly versions differ.
    AssemblyVersionChanged,
    /// A field exists at runtime but not on the stream.
    FieldAdded,
    /// A field exists on the stream but not at runtime.
    FieldRemoved,
    /// A field kept its name but changed its type. Never tolerated.
    FieldTypeChanged,
    /// The base-type identity differs.
    BaseChanged,
}

impl std::fmt::Display for Drift {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Drift::ModuleIdChanged => "module id changed",
            Drift::AssemblyVersionChanged => "assembly version changed",
            Drift::FieldAdded => "field added",
            Drift::FieldRemoved => "field removed",
            Drift::FieldTypeChanged => "field type changed",
            Drift::BaseChanged => "inheritance chain changed",
        };
        f.write_str(s)
    }
}

/// Error type surfaced at the caller boundary. Nothing is swallowed:
/// a failure inside one read or write aborts the whole operation.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The stream does not start with the expected magic bytes.
    #[error("wrong magic: expected 32 66 34, found {0:02x} {1:02x} {2:02x}")]
    WrongMagic(u8, u8, u8),

    /// The stream was produced by an incompatible protocol version.
    #[error("wrong stream version: expected {expected}, found {found}")]
    WrongVersion { expected: u8, found: u8 },

    /// Unexpected EOF, malformed length prefix, unknown tag byte, or
    /// an impossible object/type id.
    #[error("stream corrupted: {0}")]
    StreamCorrupted(Cow<'static, str>),

    /// The comparator found a schema drift the configured tolerance
    /// flags forbid. Carries the first offending field name.
    #[error("type structure changed ({drift}): field `{field}` in `{type_name}`")]
    TypeStructureChanged {
        type_name: Cow<'static, str>,
        field: Cow<'static, str>,
        drift: Drift,
    },

    /// A stream-named assembly or type cannot be located in the
    /// registry of the running program.
    #[error("cannot resolve `{0}` against any registered assembly")]
    AssemblyResolveFailure(Cow<'static, str>),

    /// A swap table or the type registry was mutated after the
    /// serializer performed its first operation.
    #[error("{0}")]
    IllegalStateAfterUse(Cow<'static, str>),

    /// An internal self-check failed, e.g. bytes written differ from
    /// bytes consumed during a deep-clone round trip.
    #[error("invariant violation: {0}")]
    InvariantViolation(Cow<'static, str>),

    /// A value's runtime type does not fit the requested static type.
    #[error("{0}")]
    TypeError(Cow<'static, str>),

    /// A back reference names an id that is absent, still pending, or
    /// of the wrong shape.
    #[error("{0}")]
    InvalidRef(Cow<'static, str>),

    /// The operation or type is not supported by this serializer.
    #[error("{0}")]
    Unsupported(Cow<'static, str>),

    /// By-value nesting exceeded the configured maximum depth.
    #[error("{0}")]
    DepthExceeded(Cow<'static, str>),

    /// An I/O failure in the underlying sink or source.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Interop with context-carrying errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

macro_rules! cow_constructor {
    ($(#[$doc:meta])* $name:ident => $variant:ident) => {
        $(#[$doc])*
        #[inline(always)]
        #[cold]
        #[track_caller]
        pub fn $name<S: Into<Cow<'static, str>>>(s: S) -> Self {
            let err = Error::$variant(s.into());
            if PANIC_ON_ERROR {
                panic!("HEIRLOOM_PANIC_ON_ERROR: {}", err);
            }
            err
        }
    };
}

impl Error {
    /// Creates a [`Error::WrongMagic`] from the three observed bytes.
    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn wrong_magic(found: [u8; 3]) -> Self {
        let err = Error::WrongMagic(found[0], found[1], found[2]);
        if PANIC_ON_ERROR {
            panic!("HEIRLOOM_PANIC_ON_ERROR: {}", err);
        }
        err
    }

    /// Creates a [`Error::WrongVersion`].
    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn wrong_version(expected: u8, found: u8) -> Self {
        let err = Error::WrongVersion { expected, found };
        if PANIC_ON_ERROR {
            panic!("HEIRLOOM_PANIC_ON_ERROR: {}", err);
        }
        err
    }

    /// Creates a [`Error::TypeStructureChanged`] naming the first
    /// offending field and the kind of drift.
    #[inline(always)]
    #[cold]
    #[track_caller]
    pub fn type_structure_changed<T, F>(type_name: T, field: F, drift: Drift) -> Self
    where
        T: Into<Cow<'static, str>>,
        F: Into<Cow<'static, str>>,
    {
        let err = Error::TypeStructureChanged {
            type_name: type_name.into(),
            field: field.into(),
            drift,
        };
        if PANIC_ON_ERROR {
            panic!("HEIRLOOM_PANIC_ON_ERROR: {}", err);
        }
        err
    }

    cow_constructor! {
        /// Creates a [`Error::StreamCorrupted`].
        stream_corrupted => StreamCorrupted
    }
    cow_constructor! {
        /// Creates a [`Error::AssemblyResolveFailure`] naming the
        /// unresolvable assembly or type.
        assembly_resolve_failure => AssemblyResolveFailure
    }
    cow_constructor! {
        /// Creates a [`Error::IllegalStateAfterUse`].
        illegal_state_after_use => IllegalStateAfterUse
    }
    cow_constructor! {
        /// Creates a [`Error::InvariantViolation`].
        invariant_violation => InvariantViolation
    }
    cow_constructor! {
        /// Creates a [`Error::TypeError`].
        type_error => TypeError
    }
    cow_constructor! {
        /// Creates a [`Error::InvalidRef`].
        invalid_ref => InvalidRef
    }
    cow_constructor! {
        /// Creates a [`Error::Unsupported`].
        unsupported => Unsupported
    }
    cow_constructor! {
        /// Creates a [`Error::DepthExceeded`].
        depth_exceeded => DepthExceeded
    }
}

/// Ensures a condition holds; otherwise returns the given error.
///
/// ```rust
/// use heirloom::ensure;
/// use heirloom::error::Error;
///
/// fn check(n: usize, cap: usize) -> Result<(), Error> {
///     ensure!(n <= cap, Error::stream_corrupted("length prefix exceeds input"));
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err);
        }
    };
}

/// Returns early with a [`Error::StreamCorrupted`].
#[macro_export]
macro_rules! corrupted {
    ($msg:literal) => {
        return Err($crate::error::Error::stream_corrupted($msg))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::error::Error::stream_corrupted(format!($fmt, $($arg)*)))
    };
}
