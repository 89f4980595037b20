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

//! Per-session type and assembly stamp tables.
//!
//! Both id spaces are dense and assigned in first-appearance order.
//! A token equal to the table length introduces an inline stamp;
//! a larger one is corrupt. Generic arguments complete their stamps
//! before the enclosing instantiation finishes writing its own, and
//! structure stamps may reference their own type through field
//! tokens, which the reader supports by publishing the shell entry
//! before parsing the structure.

use std::sync::Arc;

use crate::buffer::{Reader, Writer};
use crate::error::Error;
use crate::meta::assembly::{AssemblyDescriptor, Version4};
use crate::meta::descriptor::{FieldDescriptor, TypeDescriptor};
use crate::types::Kind;

const FIELD_FLAG_CTOR_RECREATED: u8 = 1;

/// Write-side tables: identity string to dense id.
#[derive(Default)]
pub struct StampWriter {
    types: std::collections::HashMap<String, u32>,
    assemblies: std::collections::HashMap<String, u32>,
}

impl StampWriter {
    /// Emits a type token, stamping the type inline on first sight.
    pub fn write_type_ref(
        &mut self,
        writer: &mut Writer,
        descriptor: &Arc<TypeDescriptor>,
        collections_as_user_objects: bool,
    ) -> Result<u32, Error> {
        let qualified = descriptor.qualified_name();
        if let Some(&id) = self.types.get(&qualified) {
            writer.write_varuint32(id);
            return Ok(id);
        }
        let id = self.types.len() as u32;
        self.types.insert(qualified, id);
        writer.write_varuint32(id);

        self.write_assembly_ref(writer, descriptor.assembly());
        writer.write_u8(descriptor.kind().into());
        writer.write_str(descriptor.name());
        writer.write_varuint32(descriptor.generics().len() as u32);
        for generic in descriptor.generics() {
            self.write_type_ref(writer, generic, collections_as_user_objects)?;
        }

        let has_structure = descriptor
            .kind()
            .needs_structure(collections_as_user_objects);
        writer.write_bool(has_structure);
        if has_structure {
            self.write_structure(writer, descriptor, collections_as_user_objects)?;
        }
        Ok(id)
    }

    fn write_structure(
        &mut self,
        writer: &mut Writer,
        descriptor: &Arc<TypeDescriptor>,
        collections_as_user_objects: bool,
    ) -> Result<(), Error> {
        match descriptor.base() {
            Some(base) => {
                writer.write_bool(true);
                self.write_type_ref(writer, base, collections_as_user_objects)?;
            }
            None => writer.write_bool(false),
        }

        if descriptor.kind().is_collection() {
            // Synthetic structure for collections promoted to user
            // objects: the element shape is all there is to compare.
            let generics = descriptor.generics();
            let named: Vec<(&str, &Arc<TypeDescriptor>)> = if descriptor.kind() == Kind::Map {
                vec![("keys", &generics[0]), ("values", &generics[1])]
            } else {
                vec![("items", &generics[0])]
            };
            writer.write_varuint32(named.len() as u32);
            for (name, field_type) in named {
                writer.write_str(name);
                self.write_type_ref(writer, field_type, collections_as_user_objects)?;
                writer.write_u8(0);
            }
            return Ok(());
        }

        let wire_fields: Vec<&FieldDescriptor> = descriptor
            .fields()
            .iter()
            .filter(|f| !f.transient)
            .collect();
        writer.write_varuint32(wire_fields.len() as u32);
        for field in wire_fields {
            writer.write_str(&field.name);
            self.write_type_ref(writer, &field.field_type, collections_as_user_objects)?;
            let flags = if field.ctor_recreated {
                FIELD_FLAG_CTOR_RECREATED
            } else {
                0
            };
            writer.write_u8(flags);
        }
        Ok(())
    }

    fn write_assembly_ref(&mut self, writer: &mut Writer, assembly: &Arc<AssemblyDescriptor>) {
        let full_name = assembly.full_name();
        if let Some(&id) = self.assemblies.get(&full_name) {
            writer.write_varuint32(id);
            return;
        }
        let id = self.assemblies.len() as u32;
        self.assemblies.insert(full_name, id);
        writer.write_varuint32(id);

        writer.write_str(assembly.name());
        let version = assembly.version();
        writer.write_i32(version.major);
        writer.write_i32(version.minor);
        writer.write_i32(version.build);
        writer.write_i32(version.revision);
        writer.write_str(assembly.culture_name());
        let token = assembly.token_bytes();
        let token = if token.len() == 8 { token } else { &[] };
        writer.write_u8(token.len() as u8);
        writer.write_bytes(token);
        writer.write_opaque_id(&assembly.resolved_module_id());
    }
}

/// Read-side tables: dense vectors of descriptors resolved from the
/// stream, grown as stamps appear.
#[derive(Default)]
pub struct StampReader {
    types: Vec<Option<Arc<TypeDescriptor>>>,
    assemblies: Vec<Arc<AssemblyDescriptor>>,
}

impl StampReader {
    /// Reads a type token, consuming an inline stamp when the token
    /// introduces a new id.
    pub fn read_type_ref(&mut self, reader: &mut Reader) -> Result<Arc<TypeDescriptor>, Error> {
        let token = reader.read_varuint32()? as usize;
        if token < self.types.len() {
            return self.types[token].clone().ok_or_else(|| {
                Error::stream_corrupted("type stamp refers to itself through its generic arguments")
            });
        }
        if token > self.types.len() {
            return Err(Error::stream_corrupted(format!(
                "impossible type id {token}, expected at most {}",
                self.types.len()
            )));
        }

        let index = token;
        self.types.push(None);

        let assembly = self.read_assembly_ref(reader)?;
        let kind = Kind::from_wire(reader.read_u8()?)?;
        let name = reader.read_str()?;
        let generic_count = reader.read_varuint32()? as usize;
        if generic_count > reader.remaining() {
            return Err(Error::stream_corrupted("generic argument count exceeds input"));
        }
        let mut generics = Vec::with_capacity(generic_count);
        for _ in 0..generic_count {
            generics.push(self.read_type_ref(reader)?);
        }

        let descriptor = Arc::new(TypeDescriptor::unsealed(kind, name, assembly, generics));
        // Publish before the structure parse so field tokens may
        // reference the type being stamped.
        self.types[index] = Some(descriptor.clone());

        let has_structure = reader.read_bool()?;
        if has_structure {
            if reader.read_bool()? {
                let base = self.read_type_ref(reader)?;
                descriptor.seal_base(base);
            }
            let field_count = reader.read_varuint32()? as usize;
            if field_count > reader.remaining() {
                return Err(Error::stream_corrupted("field count exceeds input"));
            }
            let mut fields = Vec::with_capacity(field_count);
            for _ in 0..field_count {
                let field_name = reader.read_str()?;
                let field_type = self.read_type_ref(reader)?;
                let flags = reader.read_u8()?;
                let mut field =
                    FieldDescriptor::new(descriptor.name(), field_name, field_type);
                if flags & FIELD_FLAG_CTOR_RECREATED != 0 {
                    field = field.ctor_recreated();
                }
                fields.push(field);
            }
            descriptor.seal_fields(fields);
        } else {
            descriptor.seal_fields(Vec::new());
        }
        Ok(descriptor)
    }

    fn read_assembly_ref(&mut self, reader: &mut Reader) -> Result<Arc<AssemblyDescriptor>, Error> {
        let token = reader.read_varuint32()? as usize;
        if token < self.assemblies.len() {
            return Ok(self.assemblies[token].clone());
        }
        if token > self.assemblies.len() {
            return Err(Error::stream_corrupted(format!(
                "impossible assembly id {token}, expected at most {}",
                self.assemblies.len()
            )));
        }

        let name = reader.read_str()?;
        let version = Version4::new(
            reader.read_i32()?,
            reader.read_i32()?,
            reader.read_i32()?,
            reader.read_i32()?,
        );
        let culture = reader.read_str()?;
        let token_len = reader.read_u8()? as usize;
        if token_len != 0 && token_len != 8 {
            return Err(Error::stream_corrupted(format!(
                "assembly token length must be 0 or 8, found {token_len}"
            )));
        }
        let token_bytes = reader.read_bytes(token_len)?.to_vec();
        let module_id = reader.read_opaque_id()?;

        let assembly = Arc::new(AssemblyDescriptor::from_stamp(
            name,
            version,
            culture,
            token_bytes,
            module_id,
        ));
        self.assemblies.push(assembly.clone());
        Ok(assembly)
    }
}
