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

//! Open-stream sessions.
//!
//! A session attaches one writer or reader to a long-lived stream and
//! performs many consecutive operations that share the identity and
//! type tables built by previous operations: a type stamped in the
//! first operation is a bare token in every later one, and with
//! reference preservation an object written earlier is a back
//! reference later.
//!
//! When buffering is enabled each operation is padded with zeros to
//! the next block boundary, so every operation after the first starts
//! block-aligned.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::Arc;

use crate::buffer::{Reader, Writer};
use crate::config::Preservation;
use crate::entry::Heirloom;
use crate::error::Error;
use crate::resolver::context::{ReadContext, Resolved, WriteContext};
use crate::resolver::identity::{IdentityReader, IdentityWriter};
use crate::resolver::stamp::{StampReader, StampWriter};
use crate::serializer::Persist;
use crate::types::{HEADER_LEN, MAGIC, STREAM_VERSION};

/// A long-lived writer over one stream. Obtained from
/// [`Heirloom::open_writer`]; emits the header on open and flushes
/// each completed operation to the sink.
pub struct ObjectWriter<'h, W: Write> {
    owner: &'h Heirloom,
    sink: W,
    writer: Writer,
    identity: IdentityWriter,
    stamps: StampWriter,
    flushed: usize,
}

impl<'h, W: Write> ObjectWriter<'h, W> {
    pub(crate) fn open(owner: &'h Heirloom, sink: W) -> Result<ObjectWriter<'h, W>, Error> {
        owner.freeze_for_write()?;
        let mut writer = Writer::default();
        writer.write_bytes(&MAGIC);
        writer.write_u8(STREAM_VERSION);
        writer.write_u8(owner.settings().preserves_references() as u8);
        Ok(ObjectWriter {
            owner,
            sink,
            writer,
            identity: IdentityWriter::default(),
            stamps: StampWriter::default(),
            flushed: 0,
        })
    }

    /// Serializes one root value as the next operation on the stream.
    pub fn write_object<T: Persist>(&mut self, value: &T) -> Result<(), Error> {
        let owner = self.owner;
        let env = owner.session_env()?;
        {
            let mut ctx =
                WriteContext::new(&mut self.writer, &mut self.identity, &mut self.stamps, env);
            value.write_root(&mut ctx)?;
        }
        if env.settings.use_buffering {
            self.writer.pad_to_block(env.settings.block_size);
        }
        if env.settings.preservation == Preservation::DoNotPreserve {
            self.identity.reset();
        }
        self.flush_pending()
    }

    fn flush_pending(&mut self) -> Result<(), Error> {
        let bytes = self.writer.as_bytes();
        if self.flushed < bytes.len() {
            self.sink.write_all(&bytes[self.flushed..])?;
            self.flushed = bytes.len();
        }
        Ok(())
    }

    /// Bytes emitted so far, header included.
    pub fn position(&self) -> usize {
        self.writer.len()
    }

    /// Flushes and returns the sink.
    pub fn finish(mut self) -> Result<W, Error> {
        self.flush_pending()?;
        self.sink.flush()?;
        Ok(self.sink)
    }
}

/// A long-lived reader over one stream. Obtained from
/// [`Heirloom::open_reader`]; validates the header on open.
pub struct ObjectReader<'h> {
    owner: &'h Heirloom,
    buf: Vec<u8>,
    pos: usize,
    identity: IdentityReader,
    stamps: StampReader,
    resolutions: HashMap<String, Arc<Resolved>>,
    preserve: bool,
}

impl<'h> ObjectReader<'h> {
    pub(crate) fn open(
        owner: &'h Heirloom,
        mut source: impl Read,
    ) -> Result<ObjectReader<'h>, Error> {
        owner.freeze_for_read()?;
        let mut buf = Vec::new();
        source.read_to_end(&mut buf)?;
        if buf.len() < HEADER_LEN {
            return Err(Error::stream_corrupted("stream shorter than its header"));
        }
        if buf[0..3] != MAGIC {
            return Err(Error::wrong_magic([buf[0], buf[1], buf[2]]));
        }
        if buf[3] != STREAM_VERSION {
            return Err(Error::wrong_version(STREAM_VERSION, buf[3]));
        }
        let preserve = match buf[4] {
            0 => false,
            1 => true,
            other => {
                return Err(Error::stream_corrupted(format!(
                    "invalid reference-preservation flag {other}"
                )))
            }
        };
        let weak = owner.settings().preservation == Preservation::UseWeakReference;
        Ok(ObjectReader {
            owner,
            buf,
            pos: HEADER_LEN,
            identity: IdentityReader::new(weak),
            stamps: StampReader::default(),
            resolutions: HashMap::new(),
            preserve,
        })
    }

    /// Deserializes the next root value from the stream.
    pub fn read_object<T: Persist>(&mut self) -> Result<T, Error> {
        let owner = self.owner;
        let env = owner.session_env()?;
        let mut ctx = ReadContext::new(
            Reader::new(&self.buf),
            &mut self.identity,
            &mut self.stamps,
            &mut self.resolutions,
            env,
        );
        ctx.reader.set_cursor(self.pos);
        let value = T::read_root(&mut ctx)?;
        if env.settings.use_buffering {
            ctx.reader.align_to_block(env.settings.block_size)?;
        }
        self.pos = ctx.reader.cursor();
        drop(ctx);
        self.identity.run_fixups();
        if !self.preserve {
            self.identity.reset();
        }
        Ok(value)
    }

    /// Reads the next `count` values of one type, in order.
    pub fn read_many<T: Persist>(&mut self, count: usize) -> Result<Vec<T>, Error> {
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.read_object()?);
        }
        Ok(values)
    }

    /// Whether every operation on the stream has been consumed.
    pub fn peek_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Current position, header included.
    pub fn position(&self) -> usize {
        self.pos
    }
}
