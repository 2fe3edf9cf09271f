//! The record-level writer: buffers shredded records, encodes row groups
//! column-parallel and drives the file assembler.

use std::io::Write;
use std::sync::Arc;

use log::debug;
use rayon::prelude::*;

use crate::column::writer::ColumnChunkWriter;
use crate::errors::{Error, Result};
use crate::file::properties::{WriterProperties, WriterPropertiesPtr};
use crate::file::writer::{EncodedColumnChunk, FileAssembler, SerializedPageWriter, TrackedWrite};
use crate::record::shred::{shred_record, TripleBuffer};
use crate::record::value::{Record, Value};
use crate::schema::json::schema_from_json;
use crate::schema::tag::schema_from_field_tags;
use crate::schema::types::{ColumnDescPtr, SchemaDescPtr, SchemaDescriptor, SchemaTypePtr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Open,
    Writing,
    Stopped,
}

/// Writes a stream of [`Record`]s as one Parquet file.
///
/// Records accumulate into an in-memory row group; when the estimated raw
/// size passes the row-group threshold (or on [`Self::flush_row_group`]) the
/// group's columns are encoded in parallel by a bounded worker pool and
/// appended to the file. [`Self::stop`] flushes the residual group and
/// writes the footer; it is idempotent and never closes the sink.
///
/// A rejected record (type mismatch, missing required field, unknown field)
/// leaves the writer fully usable. Encoding and sink errors latch the
/// writer: every later call returns the first such error.
#[derive(Debug)]
pub struct RecordWriter<W: Write> {
    assembler: FileAssembler<W>,
    schema: SchemaDescPtr,
    props: WriterPropertiesPtr,
    pool: rayon::ThreadPool,
    buffers: Vec<TripleBuffer>,
    buffered_rows: i64,
    state: WriterState,
    error: Option<Arc<Error>>,
}

impl<W: Write> RecordWriter<W> {
    /// Creates a writer over a prebuilt schema tree with default properties.
    pub fn new(sink: W, schema: SchemaTypePtr) -> Result<Self> {
        Self::with_properties(sink, schema, WriterProperties::builder().build()?)
    }

    /// Creates a writer over a prebuilt schema tree.
    pub fn with_properties(sink: W, schema: SchemaTypePtr, props: WriterProperties) -> Result<Self> {
        let schema = Arc::new(SchemaDescriptor::new(schema)?);
        let props = Arc::new(props);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(props.np())
            .build()
            .map_err(|e| Error::Io(Box::new(e)))?;
        let assembler = FileAssembler::new(sink, props.clone())?;
        let buffers = (0..schema.num_columns()).map(|_| TripleBuffer::new()).collect();
        Ok(Self {
            assembler,
            schema,
            props,
            pool,
            buffers,
            buffered_rows: 0,
            state: WriterState::Open,
            error: None,
        })
    }

    /// Creates a writer from tag-annotated field descriptors, one per leaf.
    pub fn from_fields(sink: W, fields: &[&str]) -> Result<Self> {
        Self::new(sink, schema_from_field_tags(fields)?)
    }

    /// Creates a writer from tag-annotated field descriptors with explicit
    /// properties.
    pub fn from_fields_with_properties(
        sink: W,
        fields: &[&str],
        props: WriterProperties,
    ) -> Result<Self> {
        Self::with_properties(sink, schema_from_field_tags(fields)?, props)
    }

    /// Creates a writer from a JSON schema document.
    pub fn from_json_schema(sink: W, json: &str) -> Result<Self> {
        Self::new(sink, schema_from_json(json)?)
    }

    /// Creates a writer from a JSON schema document with explicit
    /// properties.
    pub fn from_json_schema_with_properties(
        sink: W,
        json: &str,
        props: WriterProperties,
    ) -> Result<Self> {
        Self::with_properties(sink, schema_from_json(json)?, props)
    }

    /// The writer's schema.
    pub fn schema(&self) -> &SchemaDescPtr {
        &self.schema
    }

    /// Rows buffered in the current, not yet flushed row group.
    pub fn buffered_rows(&self) -> i64 {
        self.buffered_rows
    }

    /// Appends one record. The record is shredded immediately; a rejected
    /// record leaves the buffered data untouched.
    pub fn write(&mut self, record: Record) -> Result<()> {
        self.check_writable()?;
        shred_record(&record, &self.schema, &mut self.buffers)?;
        self.buffered_rows += 1;
        self.state = WriterState::Writing;

        if self.buffered_value_bytes() >= self.props.row_group_size() {
            let result = self.flush_buffered_rows();
            return self.latch(result);
        }
        Ok(())
    }

    /// Appends one record given as leaf values in schema order. Only flat
    /// schemas (every leaf directly under the root) accept tuples.
    pub fn write_tuple(&mut self, values: Vec<Value>) -> Result<()> {
        if values.len() != self.schema.num_columns() {
            return Err(type_err!(
                "tuple arity {} does not match the schema's {} leaves",
                values.len(),
                self.schema.num_columns()
            ));
        }
        if self.schema.columns().iter().any(|c| c.path().parts().len() > 1) {
            return Err(type_err!("tuples can only be written against a flat schema"));
        }
        let fields = self
            .schema
            .columns()
            .iter()
            .zip(values)
            .map(|(column, value)| (column.self_type().in_name().to_string(), Record::Atom(value)))
            .collect();
        self.write(Record::Group(fields))
    }

    /// Flushes the buffered rows as a row group, if any.
    pub fn flush_row_group(&mut self) -> Result<()> {
        self.check_writable()?;
        let result = self.flush_buffered_rows();
        self.latch(result)
    }

    /// Flushes the residual row group and writes the footer. Idempotent: a
    /// second call after success is a no-op. The sink stays open.
    pub fn stop(&mut self) -> Result<()> {
        if let Some(error) = &self.error {
            return Err(Error::Latched(error.clone()));
        }
        if self.state == WriterState::Stopped {
            return Ok(());
        }
        let result = self.finish();
        self.latch(result)?;
        self.state = WriterState::Stopped;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.flush_buffered_rows()?;
        self.assembler.finish(self.schema.to_thrift())?;
        Ok(())
    }

    fn check_writable(&self) -> Result<()> {
        if let Some(error) = &self.error {
            return Err(Error::Latched(error.clone()));
        }
        if self.state == WriterState::Stopped {
            return Err(state_err!("writer is stopped"));
        }
        Ok(())
    }

    /// Remembers the first fatal error so later calls replay it.
    fn latch<T>(&mut self, result: Result<T>) -> Result<T> {
        match result {
            Err(error) if error.is_fatal() && self.error.is_none() => {
                let error = Arc::new(error);
                self.error = Some(error.clone());
                Err(Error::Latched(error))
            }
            other => other,
        }
    }

    fn buffered_value_bytes(&self) -> usize {
        self.buffers.iter().map(|b| b.value_bytes).sum()
    }

    fn flush_buffered_rows(&mut self) -> Result<()> {
        if self.buffered_rows == 0 {
            return Ok(());
        }
        let num_rows = self.buffered_rows;
        let columns = std::mem::replace(
            &mut self.buffers,
            (0..self.schema.num_columns()).map(|_| TripleBuffer::new()).collect(),
        );
        self.buffered_rows = 0;

        let schema = self.schema.clone();
        let props = self.props.clone();
        let results: Vec<Result<EncodedColumnChunk>> = self.pool.install(|| {
            columns
                .into_par_iter()
                .enumerate()
                .map(|(i, buffer)| encode_chunk(schema.column(i), props.clone(), buffer))
                .collect()
        });

        let mut chunks = Vec::with_capacity(results.len());
        for result in results {
            chunks.push(result?);
        }
        for chunk in &chunks {
            if chunk.result.rows_written != num_rows as u64 {
                return Err(general_err!(
                    "column {} wrote {} rows, row group has {}",
                    chunk.result.metadata.column_descr().path(),
                    chunk.result.rows_written,
                    num_rows
                ));
            }
        }

        self.assembler.append_row_group(chunks, num_rows)?;
        debug!(
            "flushed row group {} with {} rows",
            self.assembler.num_row_groups() - 1,
            num_rows
        );
        Ok(())
    }
}

/// Encodes one column chunk into an in-memory buffer. Runs on a worker; all
/// offsets in the result are chunk-relative.
fn encode_chunk(
    descr: ColumnDescPtr,
    props: WriterPropertiesPtr,
    buffer: TripleBuffer,
) -> Result<EncodedColumnChunk> {
    let mut sink = TrackedWrite::new(Vec::new());
    let result = {
        let page_writer = Box::new(SerializedPageWriter::new(&mut sink));
        let mut writer = ColumnChunkWriter::new(descr, props, page_writer)?;
        writer.write_batch(
            &buffer.values,
            Some(&buffer.def_levels),
            Some(&buffer.rep_levels),
        )?;
        writer.close()?
    };
    Ok(EncodedColumnChunk { buf: sink.into_inner(), result })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_writer(buf: &mut Vec<u8>) -> RecordWriter<&mut Vec<u8>> {
        RecordWriter::from_fields(
            buf,
            &[
                "name=id, type=INT64",
                "name=name, type=BYTE_ARRAY, convertedtype=UTF8, repetitiontype=OPTIONAL",
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_write_after_stop_is_state_error() {
        let mut buf = Vec::new();
        let mut writer = sample_writer(&mut buf);
        writer.stop().unwrap();
        let err = writer.write(Record::group([("id", Record::from(1i64))])).unwrap_err();
        assert!(matches!(err, Error::State(_)));
        // the failed write does not unlatch stop idempotence
        writer.stop().unwrap();
    }

    #[test]
    fn test_rejected_record_keeps_writer_usable() {
        let mut buf = Vec::new();
        let mut writer = sample_writer(&mut buf);
        let err = writer
            .write(Record::group([("id", Record::from("not an int"))]))
            .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch(_)));
        assert_eq!(writer.buffered_rows(), 0);

        writer.write(Record::group([("id", Record::from(1i64))])).unwrap();
        assert_eq!(writer.buffered_rows(), 1);
        writer.stop().unwrap();
    }

    #[test]
    fn test_tuple_arity_checked() {
        let mut buf = Vec::new();
        let mut writer = sample_writer(&mut buf);
        assert!(writer.write_tuple(vec![Value::I64(1)]).is_err());
        writer.write_tuple(vec![Value::I64(1), Value::from("a")]).unwrap();
        writer.stop().unwrap();
    }

    #[test]
    fn test_constructor_propagates_sink_error() {
        #[derive(Debug)]
        struct FailingSink;
        impl Write for FailingSink {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("sink is broken"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let err = RecordWriter::from_fields(FailingSink, &["name=x, type=INT64"]).unwrap_err();
        assert!(err.to_string().contains("sink is broken"));
    }

    #[test]
    fn test_explicit_flush_creates_row_groups() {
        let mut buf = Vec::new();
        {
            let mut writer = sample_writer(&mut buf);
            writer.write(Record::group([("id", Record::from(1i64))])).unwrap();
            writer.flush_row_group().unwrap();
            writer.write(Record::group([("id", Record::from(2i64))])).unwrap();
            writer.stop().unwrap();
            assert_eq!(writer.assembler.num_row_groups(), 0); // taken by finish
        }
        assert_eq!(&buf[..4], b"PAR1");
        assert_eq!(&buf[buf.len() - 4..], b"PAR1");
    }
}
