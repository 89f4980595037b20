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

//! Date and timestamp kinds: days since the Unix epoch and timestamp
//! microseconds.

use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use crate::error::Error;
use crate::meta::descriptor::{builtin_leaf, TypeDescriptor};
use crate::resolver::context::{ReadContext, WriteContext};
use crate::resolver::registry::Registry;
use crate::serializer::Persist;
use crate::types::Kind;

/// `num_days_from_ce` of 1970-01-01.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

impl Persist for NaiveDate {
    fn kind() -> Kind {
        Kind::Date
    }

    fn type_desc(_registry: &Registry) -> Result<Arc<TypeDescriptor>, Error> {
        Ok(builtin_leaf(Kind::Date, "NaiveDate"))
    }

    fn default_value() -> Self {
        NaiveDate::default()
    }

    fn write_body(&self, ctx: &mut WriteContext) -> Result<(), Error> {
        ctx.writer
            .write_varint32(self.num_days_from_ce() - EPOCH_DAYS_FROM_CE);
        Ok(())
    }

    fn read_body(ctx: &mut ReadContext) -> Result<Self, Error> {
        let days = ctx.reader.read_varint32()?;
        NaiveDate::from_num_days_from_ce_opt(days + EPOCH_DAYS_FROM_CE).ok_or_else(|| {
            Error::stream_corrupted(format!("date out of range: {days} days since epoch"))
        })
    }
}

impl Persist for NaiveDateTime {
    fn kind() -> Kind {
        Kind::Timestamp
    }

    fn type_desc(_registry: &Registry) -> Result<Arc<TypeDescriptor>, Error> {
        Ok(builtin_leaf(Kind::Timestamp, "NaiveDateTime"))
    }

    fn default_value() -> Self {
        NaiveDateTime::default()
    }

    fn write_body(&self, ctx: &mut WriteContext) -> Result<(), Error> {
        let utc = self.and_utc();
        let micros = utc.timestamp() * 1_000_000 + utc.timestamp_subsec_micros() as i64;
        ctx.writer.write_varint64(micros);
        Ok(())
    }

    fn read_body(ctx: &mut ReadContext) -> Result<Self, Error> {
        let micros = ctx.reader.read_varint64()?;
        let seconds = micros.div_euclid(1_000_000);
        let nanos = (micros.rem_euclid(1_000_000) as u32) * 1_000;
        DateTime::from_timestamp(seconds, nanos)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| {
                Error::stream_corrupted(format!("timestamp out of range: {micros} micros"))
            })
    }
}
