//! Output sinks for assembled records.
//!
//! The job hands every chunk of [`TypedRecord`]s to a [`RecordSink`]; the only container format
//! is the Avro object container ([`avro::AvroContainerWriter`]).

pub mod avro;

use crate::error::ConvertResult;
use crate::types::TypedRecord;

pub use avro::{avro_schema, to_avro_value, AvroContainerWriter};

/// Destination for assembled records.
pub trait RecordSink {
    /// Write one chunk and make it durable before returning.
    fn write_chunk(&mut self, records: &[TypedRecord]) -> ConvertResult<()>;

    /// Complete the output. No chunk may be written afterwards.
    fn finish(&mut self) -> ConvertResult<()>;
}

/// Collects records in memory.
#[derive(Debug, Default)]
pub struct VecSink {
    /// Records received so far.
    pub records: Vec<TypedRecord>,
    /// Size of every chunk received, in order.
    pub chunk_sizes: Vec<usize>,
    /// Whether [`RecordSink::finish`] was called.
    pub finished: bool,
}

impl RecordSink for VecSink {
    fn write_chunk(&mut self, records: &[TypedRecord]) -> ConvertResult<()> {
        self.chunk_sizes.push(records.len());
        self.records.extend_from_slice(records);
        Ok(())
    }

    fn finish(&mut self) -> ConvertResult<()> {
        self.finished = true;
        Ok(())
    }
}
