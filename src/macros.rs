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

//! Declarative type registration.
//!
//! The runtime has no reflection, so a type's field order, transience
//! flags and constructor-recreated fields are declared once, next to
//! the struct, and the macro derives the serialization contract from
//! that declaration:
//!
//! ```rust,ignore
//! struct Person {
//!     name: String,
//!     age: i32,
//!     scratch: Vec<u8>,
//!     index: HashMap<String, i32>,
//! }
//!
//! persist_object!(Person {
//!     name: String,
//!     age: i32,
//!     @transient scratch: Vec<u8>,
//!     @reinit index: HashMap<String, i32>,
//! } reinit = rebuild_index);
//! ```
//!
//! `@transient` fields never reach the stream. `@reinit` fields are
//! transient too, but the read plan ends with constructor entries for
//! them and the named method runs once the planned fields are in
//! place.
//!
//! Unit enums use `persist_enum!`, which encodes the variant index:
//!
//! ```rust,ignore
//! enum Color { Red, Green, Blue }
//! persist_enum!(Color { Red, Green, Blue });
//! ```

/// Implements [`crate::Persist`] and [`crate::PersistObject`] for a
/// struct from its declared field list.
#[macro_export]
macro_rules! persist_object {
    ($ty:ident { $($fields:tt)* }) => {
        $crate::persist_object!(@parse $ty, (), (), [] ; $($fields)*);
    };
    ($ty:ident { $($fields:tt)* } reinit = $hook:ident) => {
        $crate::persist_object!(@parse $ty, (), ($hook), [] ; $($fields)*);
    };
    ($ty:ident extends $base:ty { $($fields:tt)* }) => {
        $crate::persist_object!(@parse $ty, ($base), (), [] ; $($fields)*);
    };
    ($ty:ident extends $base:ty { $($fields:tt)* } reinit = $hook:ident) => {
        $crate::persist_object!(@parse $ty, ($base), ($hook), [] ; $($fields)*);
    };

    // Field munchers: plain, @transient and @reinit, with or without
    // a trailing comma.
    (@parse $ty:ident, $base:tt, $hook:tt, [$($acc:tt)*] ; @transient $fname:ident : $fty:ty , $($rest:tt)*) => {
        $crate::persist_object!(@parse $ty, $base, $hook, [$($acc)* { transient $fname : $fty }] ; $($rest)*);
    };
    (@parse $ty:ident, $base:tt, $hook:tt, [$($acc:tt)*] ; @transient $fname:ident : $fty:ty) => {
        $crate::persist_object!(@parse $ty, $base, $hook, [$($acc)* { transient $fname : $fty }] ;);
    };
    (@parse $ty:ident, $base:tt, $hook:tt, [$($acc:tt)*] ; @reinit $fname:ident : $fty:ty , $($rest:tt)*) => {
        $crate::persist_object!(@parse $ty, $base, $hook, [$($acc)* { reinit $fname : $fty }] ; $($rest)*);
    };
    (@parse $ty:ident, $base:tt, $hook:tt, [$($acc:tt)*] ; @reinit $fname:ident : $fty:ty) => {
        $crate::persist_object!(@parse $ty, $base, $hook, [$($acc)* { reinit $fname : $fty }] ;);
    };
    (@parse $ty:ident, $base:tt, $hook:tt, [$($acc:tt)*] ; $fname:ident : $fty:ty , $($rest:tt)*) => {
        $crate::persist_object!(@parse $ty, $base, $hook, [$($acc)* { plain $fname : $fty }] ; $($rest)*);
    };
    (@parse $ty:ident, $base:tt, $hook:tt, [$($acc:tt)*] ; $fname:ident : $fty:ty) => {
        $crate::persist_object!(@parse $ty, $base, $hook, [$($acc)* { plain $fname : $fty }] ;);
    };
    (@parse $ty:ident, $base:tt, $hook:tt, [$($acc:tt)*] ;) => {
        $crate::persist_object!(@emit $ty, $base, $hook, $($acc)*);
    };

    (@emit $ty:ident, ($($base:ty)?), ($($hook:ident)?), $({ $marker:ident $fname:ident : $fty:ty })*) => {
        impl $crate::serializer::Persist for $ty {
            fn kind() -> $crate::types::Kind {
                $crate::types::Kind::Object
            }

            fn type_desc(
                registry: &$crate::resolver::registry::Registry,
            ) -> ::std::result::Result<
                ::std::sync::Arc<$crate::meta::descriptor::TypeDescriptor>,
                $crate::error::Error,
            > {
                registry.registered_descriptor(
                    ::std::any::TypeId::of::<Self>(),
                    ::std::any::type_name::<Self>(),
                )
            }

            fn default_value() -> Self {
                Self {
                    $( $fname: $crate::serializer::Persist::default_value(), )*
                }
            }

            fn write_body(
                &self,
                ctx: &mut $crate::resolver::context::WriteContext,
            ) -> ::std::result::Result<(), $crate::error::Error> {
                $crate::serializer::object::write_object_body(self, ctx)
            }

            fn read_body(
                ctx: &mut $crate::resolver::context::ReadContext,
            ) -> ::std::result::Result<Self, $crate::error::Error> {
                $crate::serializer::object::read_object_planned(ctx, ::std::option::Option::None)
            }

            fn read_planned(
                ctx: &mut $crate::resolver::context::ReadContext,
                plan: ::std::option::Option<&::std::sync::Arc<$crate::meta::compare::ReadPlan>>,
            ) -> ::std::result::Result<Self, $crate::error::Error> {
                $crate::serializer::object::read_object_planned(ctx, plan)
            }

            fn read_slot(
                ctx: &mut $crate::resolver::context::ReadContext,
            ) -> ::std::result::Result<Self, $crate::error::Error> {
                $crate::serializer::object::read_object_slot(ctx)
            }
        }

        impl $crate::serializer::PersistObject for $ty {
            fn schema() -> &'static [$crate::serializer::FieldSchema] {
                static SCHEMA: &[$crate::serializer::FieldSchema] = &[
                    $( $crate::serializer::FieldSchema {
                        name: ::std::stringify!($fname),
                        transient: $crate::__persist_is_transient!($marker),
                        ctor_recreated: $crate::__persist_is_reinit!($marker),
                        descriptor: |registry| {
                            <$fty as $crate::serializer::Persist>::type_desc(registry)
                        },
                    }, )*
                ];
                SCHEMA
            }

            $(
                fn base_descriptor(
                    registry: &$crate::resolver::registry::Registry,
                ) -> ::std::result::Result<
                    ::std::option::Option<
                        ::std::sync::Arc<$crate::meta::descriptor::TypeDescriptor>,
                    >,
                    $crate::error::Error,
                > {
                    <$base as $crate::serializer::Persist>::type_desc(registry)
                        .map(::std::option::Option::Some)
                }
            )?

            #[allow(unused_mut, unused_variables, unused_assignments)]
            fn write_field(
                &self,
                idx: usize,
                ctx: &mut $crate::resolver::context::WriteContext,
            ) -> ::std::result::Result<(), $crate::error::Error> {
                let mut cursor = 0usize;
                $(
                    if idx == cursor {
                        return $crate::__persist_write_field!($marker, (self.$fname), ctx);
                    }
                    cursor += 1;
                )*
                ::std::result::Result::Err($crate::error::Error::type_error(
                    "field index out of range",
                ))
            }

            #[allow(unused_variables)]
            fn write_generated(
                &self,
                ctx: &mut $crate::resolver::context::WriteContext,
            ) -> ::std::result::Result<(), $crate::error::Error> {
                $( $crate::__persist_write_inline!($marker, (self.$fname), ctx); )*
                ::std::result::Result::Ok(())
            }

            #[allow(unused_mut, unused_variables, unused_assignments)]
            fn read_field(
                &mut self,
                idx: usize,
                ctx: &mut $crate::resolver::context::ReadContext,
            ) -> ::std::result::Result<(), $crate::error::Error> {
                let mut cursor = 0usize;
                $(
                    if idx == cursor {
                        return $crate::__persist_read_field!($marker, (self.$fname), ctx);
                    }
                    cursor += 1;
                )*
                ::std::result::Result::Err($crate::error::Error::type_error(
                    "field index out of range",
                ))
            }

            fn reinit(&mut self) {
                $( self.$hook(); )?
            }
        }
    };
}

/// Implements [`crate::Persist`] and [`crate::PersistObject`] for a
/// unit enum. The body is the declared variant index.
#[macro_export]
macro_rules! persist_enum {
    ($ty:ident { $first:ident $(, $rest:ident)* $(,)? }) => {
        impl $crate::serializer::Persist for $ty {
            fn kind() -> $crate::types::Kind {
                $crate::types::Kind::Enum
            }

            fn type_desc(
                registry: &$crate::resolver::registry::Registry,
            ) -> ::std::result::Result<
                ::std::sync::Arc<$crate::meta::descriptor::TypeDescriptor>,
                $crate::error::Error,
            > {
                registry.registered_descriptor(
                    ::std::any::TypeId::of::<Self>(),
                    ::std::any::type_name::<Self>(),
                )
            }

            fn default_value() -> Self {
                $ty::$first
            }

            #[allow(unused_assignments, irrefutable_let_patterns, unreachable_code)]
            fn write_body(
                &self,
                ctx: &mut $crate::resolver::context::WriteContext,
            ) -> ::std::result::Result<(), $crate::error::Error> {
                let mut index = 0u32;
                loop {
                    if let $ty::$first = self {
                        break;
                    }
                    index += 1;
                    $(
                        if let $ty::$rest = self {
                            break;
                        }
                        index += 1;
                    )*
                    return ::std::result::Result::Err($crate::error::Error::unsupported(
                        "enum variant is not declared for serialization",
                    ));
                }
                ctx.writer.write_varuint32(index);
                ::std::result::Result::Ok(())
            }

            #[allow(unused_assignments)]
            fn read_body(
                ctx: &mut $crate::resolver::context::ReadContext,
            ) -> ::std::result::Result<Self, $crate::error::Error> {
                let index = ctx.reader.read_varuint32()?;
                let mut cursor = 0u32;
                if index == cursor {
                    return ::std::result::Result::Ok($ty::$first);
                }
                $(
                    cursor += 1;
                    if index == cursor {
                        return ::std::result::Result::Ok($ty::$rest);
                    }
                )*
                ::std::result::Result::Err($crate::error::Error::stream_corrupted(::std::format!(
                    "unknown enum variant index {index} for `{}`",
                    ::std::stringify!($ty)
                )))
            }
        }

        impl $crate::serializer::PersistObject for $ty {
            fn schema() -> &'static [$crate::serializer::FieldSchema] {
                &[]
            }

            fn write_field(
                &self,
                _idx: usize,
                _ctx: &mut $crate::resolver::context::WriteContext,
            ) -> ::std::result::Result<(), $crate::error::Error> {
                ::std::result::Result::Err($crate::error::Error::type_error(
                    "enums have no fields",
                ))
            }

            fn write_generated(
                &self,
                _ctx: &mut $crate::resolver::context::WriteContext,
            ) -> ::std::result::Result<(), $crate::error::Error> {
                ::std::result::Result::Ok(())
            }

            fn read_field(
                &mut self,
                _idx: usize,
                _ctx: &mut $crate::resolver::context::ReadContext,
            ) -> ::std::result::Result<(), $crate::error::Error> {
                ::std::result::Result::Err($crate::error::Error::type_error(
                    "enums have no fields",
                ))
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __persist_is_transient {
    (plain) => {
        false
    };
    (transient) => {
        true
    };
    (reinit) => {
        true
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __persist_is_reinit {
    (plain) => {
        false
    };
    (transient) => {
        false
    };
    (reinit) => {
        true
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __persist_write_field {
    (plain, ($($field:tt)*), $ctx:expr) => {
        $crate::serializer::Persist::write_slot(&$($field)*, $ctx)
    };
    ($other:ident, ($($field:tt)*), $ctx:expr) => {
        ::std::result::Result::Err($crate::error::Error::type_error(
            "transient field has no wire form",
        ))
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __persist_write_inline {
    (plain, ($($field:tt)*), $ctx:expr) => {
        $crate::serializer::Persist::write_slot(&$($field)*, $ctx)?;
    };
    ($other:ident, ($($field:tt)*), $ctx:expr) => {};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __persist_read_field {
    (plain, ($($field:tt)*), $ctx:expr) => {{
        $($field)* = $crate::serializer::Persist::read_slot($ctx)?;
        ::std::result::Result::Ok(())
    }};
    ($other:ident, ($($field:tt)*), $ctx:expr) => {
        ::std::result::Result::Err($crate::error::Error::type_error(
            "transient field has no wire form",
        ))
    };
}
